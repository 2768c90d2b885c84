//! Response types for the pointmart API.

use chrono::{DateTime, Utc};
use serde::Deserialize;

/// Public view of a user.
#[derive(Debug, Clone, Deserialize)]
pub struct UserSummary {
    /// User id.
    pub id: i64,
    /// User login, lower-cased by the service.
    pub login: String,
}

/// An accepted order upload.
#[derive(Debug, Clone, Deserialize)]
pub struct UploadedOrder {
    /// Order id.
    pub id: i64,
    /// Order number.
    pub number: String,
    /// Initial status (`NEW`).
    pub status: String,
    /// Upload timestamp.
    pub uploaded_at: DateTime<Utc>,
}

/// One order in a listing.
#[derive(Debug, Clone, Deserialize)]
pub struct OrderItem {
    /// Order number.
    pub number: String,
    /// Current status.
    pub status: String,
    /// Awarded points; zero until the order is processed.
    pub accrual: f64,
    /// Upload timestamp.
    pub uploaded_at: DateTime<Utc>,
}

/// The user's balances.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct Balance {
    /// Points available for withdrawal.
    pub current: f64,
    /// Lifetime sum of completed withdrawals.
    pub withdrawn: f64,
}

/// A completed withdrawal.
#[derive(Debug, Clone, Deserialize)]
pub struct WithdrawalReceipt {
    /// Withdrawal id.
    pub id: i64,
    /// Order number the withdrawal was registered against.
    pub order: String,
    /// Withdrawn sum.
    pub sum: f64,
    /// Completion timestamp.
    pub processed_at: DateTime<Utc>,
}

/// One withdrawal in a listing.
#[derive(Debug, Clone, Deserialize)]
pub struct WithdrawalItem {
    /// Order number the withdrawal was registered against.
    pub order: String,
    /// Withdrawn sum.
    pub sum: f64,
    /// Completion timestamp.
    pub processed_at: DateTime<Utc>,
}

/// Error payload returned by the service.
#[derive(Debug, Deserialize)]
pub(crate) struct ApiErrorResponse {
    pub error: ApiErrorBody,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ApiErrorBody {
    #[allow(dead_code)]
    pub code: String,
    pub message: String,
}
