//! Balance and withdrawal handlers.

use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use chrono::{DateTime, Utc};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use pointmart_core::{OrderNumber, Withdrawal, WithdrawalId};

use crate::auth::AuthUser;
use crate::error::ApiError;
use crate::state::AppState;

/// The caller's balances.
#[derive(Debug, Serialize)]
pub struct BalanceResponse {
    /// Points available for withdrawal.
    pub current: f64,
    /// Lifetime sum of completed withdrawals.
    pub withdrawn: f64,
}

/// Show the caller's current and withdrawn points.
pub async fn show_balance(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
) -> Result<Json<BalanceResponse>, ApiError> {
    let balance = state.accounts.balance(auth.user_id)?;
    Ok(Json(BalanceResponse {
        current: balance.current.to_f64().unwrap_or_default(),
        withdrawn: balance.withdrawn.to_f64().unwrap_or_default(),
    }))
}

/// Withdrawal request body.
#[derive(Debug, Deserialize)]
pub struct WithdrawRequest {
    /// Fresh order number to register the withdrawal against.
    pub order: String,
    /// Sum to withdraw.
    pub sum: f64,
}

/// A completed withdrawal.
#[derive(Debug, Serialize)]
pub struct WithdrawalResponse {
    /// Withdrawal id.
    pub id: WithdrawalId,
    /// Order number the withdrawal was registered against.
    pub order: String,
    /// Withdrawn sum.
    pub sum: f64,
    /// Completion timestamp.
    pub processed_at: DateTime<Utc>,
}

impl From<&Withdrawal> for WithdrawalResponse {
    fn from(withdrawal: &Withdrawal) -> Self {
        Self {
            id: withdrawal.id,
            order: withdrawal.number.as_str().to_string(),
            sum: withdrawal.sum.to_f64().unwrap_or_default(),
            processed_at: withdrawal.processed_at,
        }
    }
}

/// Withdraw points against a fresh order number.
///
/// Responses: 200 completed, 402 insufficient balance, 409 when the
/// number was already used, 422 on a malformed number or sum.
pub async fn request_withdrawal(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    Json(body): Json<WithdrawRequest>,
) -> Result<Json<WithdrawalResponse>, ApiError> {
    let number = OrderNumber::parse(body.order.trim()).map_err(|err| {
        tracing::debug!(number = %body.order, error = %err, "invalid withdrawal order number");
        ApiError::Unprocessable("order number does not conform to the format".into())
    })?;
    let sum = Decimal::from_f64_retain(body.sum)
        .ok_or_else(|| ApiError::Unprocessable("withdrawal sum is not a valid number".into()))?;

    let withdrawal = state
        .withdrawals
        .request_withdrawal(&number, auth.user_id, sum)
        .map_err(|err| {
            tracing::warn!(order = %number, user = %auth.user_id, sum = %sum, error = %err,
                "failed to request withdrawal");
            ApiError::from(err)
        })?;
    Ok(Json(WithdrawalResponse::from(&withdrawal)))
}

/// One withdrawal in a listing.
#[derive(Debug, Serialize)]
pub struct WithdrawalItem {
    /// Order number the withdrawal was registered against.
    pub order: String,
    /// Withdrawn sum.
    pub sum: f64,
    /// Completion timestamp.
    pub processed_at: DateTime<Utc>,
}

/// List the caller's withdrawals, oldest first. 204 when there are
/// none.
pub async fn list_withdrawals(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
) -> Result<Response, ApiError> {
    let withdrawals = state.withdrawals.list_user_withdrawals(auth.user_id)?;
    if withdrawals.is_empty() {
        return Ok(StatusCode::NO_CONTENT.into_response());
    }
    let items: Vec<WithdrawalItem> = withdrawals
        .iter()
        .map(|withdrawal| WithdrawalItem {
            order: withdrawal.number.as_str().to_string(),
            sum: withdrawal.sum.to_f64().unwrap_or_default(),
            processed_at: withdrawal.processed_at,
        })
        .collect();
    Ok(Json(items).into_response())
}
