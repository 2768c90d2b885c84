//! Order upload and listing handlers.

use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use chrono::{DateTime, Utc};
use rust_decimal::prelude::ToPrimitive;
use serde::Serialize;

use pointmart_core::{Order, OrderId, OrderNumber, OrderStatus};

use crate::auth::AuthUser;
use crate::error::ApiError;
use crate::orders::OrderError;
use crate::state::AppState;

/// Response to an accepted order upload.
#[derive(Debug, Serialize)]
pub struct UploadOrderResponse {
    /// Order id.
    pub id: OrderId,
    /// Order number.
    pub number: String,
    /// Initial status (`NEW`).
    pub status: OrderStatus,
    /// Upload timestamp.
    pub uploaded_at: DateTime<Utc>,
}

/// Upload a new order number.
///
/// The number arrives as the raw request body. Responses: 202 accepted,
/// 200 when the same user re-uploads a number, 409 when another user
/// owns it, 422 on a malformed number, 503 under backpressure.
pub async fn upload_order(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    body: String,
) -> Result<Response, ApiError> {
    let raw = body.trim();
    if raw.is_empty() {
        return Err(ApiError::BadRequest("order number is required".into()));
    }
    let number = OrderNumber::parse(raw).map_err(|err| {
        tracing::debug!(number = raw, error = %err, "invalid order number format");
        ApiError::Unprocessable("order number does not conform to the format".into())
    })?;

    match state.orders.submit_new_order(&number, auth.user_id) {
        Ok(order) => Ok((
            StatusCode::ACCEPTED,
            Json(UploadOrderResponse {
                id: order.id,
                number: order.number.as_str().to_string(),
                status: order.status,
                uploaded_at: order.uploaded_at,
            }),
        )
            .into_response()),
        // A repeat upload by the same user is not an error.
        Err(OrderError::AlreadyUploaded) => Ok(StatusCode::OK.into_response()),
        Err(err) => {
            tracing::warn!(order = %number, user = %auth.user_id, error = %err,
                "unable to upload new order");
            Err(err.into())
        }
    }
}

/// One order in a listing.
#[derive(Debug, Serialize)]
pub struct OrderItem {
    /// Order number.
    pub number: String,
    /// Current status.
    pub status: OrderStatus,
    /// Awarded points; zero until the order is processed.
    pub accrual: f64,
    /// Upload timestamp.
    pub uploaded_at: DateTime<Utc>,
}

impl From<&Order> for OrderItem {
    fn from(order: &Order) -> Self {
        Self {
            number: order.number.as_str().to_string(),
            status: order.status,
            accrual: order.accrual.to_f64().unwrap_or_default(),
            uploaded_at: order.uploaded_at,
        }
    }
}

/// List the caller's orders, oldest first. 204 when there are none.
pub async fn list_orders(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
) -> Result<Response, ApiError> {
    let orders = state.orders.list_user_orders(auth.user_id)?;
    if orders.is_empty() {
        return Ok(StatusCode::NO_CONTENT.into_response());
    }
    let items: Vec<OrderItem> = orders.iter().map(OrderItem::from).collect();
    Ok(Json(items).into_response())
}
