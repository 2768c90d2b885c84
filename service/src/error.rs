//! API error types and responses.
//!
//! Services return typed errors; this is the single place where they
//! are translated to HTTP status codes.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

use pointmart_store::StoreError;

use crate::account::AccountError;
use crate::orders::OrderError;
use crate::withdrawals::WithdrawalError;

/// API error type.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// Missing or invalid credentials.
    #[error("unauthorized")]
    Unauthorized,

    /// Malformed request.
    #[error("bad request: {0}")]
    BadRequest(String),

    /// Well-formed request with invalid content (e.g. a bad order
    /// number).
    #[error("unprocessable: {0}")]
    Unprocessable(String),

    /// Uniqueness conflict.
    #[error("conflict: {0}")]
    Conflict(String),

    /// The user's balance does not cover the withdrawal.
    #[error("insufficient balance")]
    InsufficientBalance,

    /// The dispatch queue is full; the client should retry later.
    #[error("order processing queue is full")]
    QueueOverloaded,

    /// Internal server error.
    #[error("internal error: {0}")]
    Internal(String),
}

/// JSON error response body.
#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: ErrorBody,
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    code: String,
    message: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            Self::Unauthorized => (StatusCode::UNAUTHORIZED, "unauthorized", self.to_string()),
            Self::BadRequest(msg) => (StatusCode::BAD_REQUEST, "bad_request", msg.clone()),
            Self::Unprocessable(msg) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                "unprocessable",
                msg.clone(),
            ),
            Self::Conflict(msg) => (StatusCode::CONFLICT, "conflict", msg.clone()),
            Self::InsufficientBalance => (
                StatusCode::PAYMENT_REQUIRED,
                "insufficient_balance",
                self.to_string(),
            ),
            Self::QueueOverloaded => (
                StatusCode::SERVICE_UNAVAILABLE,
                "queue_overloaded",
                self.to_string(),
            ),
            Self::Internal(msg) => {
                tracing::error!(error = %msg, "internal server error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal_error",
                    "an internal error occurred".to_string(),
                )
            }
        };

        let body = ErrorResponse {
            error: ErrorBody {
                code: code.to_string(),
                message,
            },
        };

        (status, Json(body)).into_response()
    }
}

impl From<AccountError> for ApiError {
    fn from(err: AccountError) -> Self {
        match err {
            AccountError::EmptyPassword => Self::BadRequest(err.to_string()),
            AccountError::LoginOccupied => Self::Conflict(err.to_string()),
            AccountError::InvalidCredentials => Self::Unauthorized,
            AccountError::Hash(msg) => Self::Internal(msg),
            AccountError::Store(err) => err.into(),
        }
    }
}

impl From<OrderError> for ApiError {
    fn from(err: OrderError) -> Self {
        match err {
            // `AlreadyUploaded` is handled by the orders handler (it
            // collapses to a 200), so reaching here is a conflict.
            OrderError::AlreadyUploaded | OrderError::UploadedByAnotherUser => {
                Self::Conflict(err.to_string())
            }
            OrderError::QueueFull => Self::QueueOverloaded,
            OrderError::Store(err) => err.into(),
        }
    }
}

impl From<WithdrawalError> for ApiError {
    fn from(err: WithdrawalError) -> Self {
        match err {
            WithdrawalError::InvalidSum => Self::Unprocessable(err.to_string()),
            WithdrawalError::AlreadyRegistered => Self::Conflict(err.to_string()),
            WithdrawalError::InsufficientBalance => Self::InsufficientBalance,
            WithdrawalError::Store(err) => err.into(),
        }
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::LoginOccupied
            | StoreError::OrderAlreadyExists
            | StoreError::WithdrawalAlreadyRegistered => Self::Conflict(err.to_string()),
            StoreError::InsufficientBalance { .. } => Self::InsufficientBalance,
            other => Self::Internal(other.to_string()),
        }
    }
}
