//! Orders submitted for accrual.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::{OrderId, OrderNumber, UserId};

/// Processing status of an order.
///
/// Statuses move monotonically toward one of the two terminal states;
/// once an order is `Invalid` or `Processed` it never changes again.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum OrderStatus {
    /// Accepted, not yet checked against the accrual system.
    New,

    /// Currently being checked against the accrual system.
    Processing,

    /// Not eligible for accrual. Terminal.
    Invalid,

    /// Checked and rewarded. Terminal.
    Processed,
}

impl OrderStatus {
    /// Whether the status is terminal.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Invalid | Self::Processed)
    }
}

/// An order accepted into the ledger.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Order {
    /// Store-assigned id.
    pub id: OrderId,

    /// The user who uploaded the order.
    pub user_id: UserId,

    /// External order number, globally unique.
    pub number: OrderNumber,

    /// Current processing status.
    pub status: OrderStatus,

    /// Points awarded for the order; zero until the order is processed.
    pub accrual: Decimal,

    /// Upload timestamp, assigned by the store on insert.
    pub uploaded_at: DateTime<Utc>,
}

/// A not-yet-persisted order.
///
/// The store assigns the id and the upload timestamp and starts the
/// order in [`OrderStatus::New`] with zero accrual.
#[derive(Debug, Clone)]
pub struct OrderCandidate {
    /// The user submitting the order.
    pub user_id: UserId,

    /// External order number.
    pub number: OrderNumber,
}

impl OrderCandidate {
    /// Create a candidate order for the given user.
    #[must_use]
    pub const fn new(number: OrderNumber, user_id: UserId) -> Self {
        Self { user_id, number }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn terminal_statuses() {
        assert!(OrderStatus::Invalid.is_terminal());
        assert!(OrderStatus::Processed.is_terminal());
        assert!(!OrderStatus::New.is_terminal());
        assert!(!OrderStatus::Processing.is_terminal());
    }

    #[test]
    fn status_serializes_uppercase() {
        assert_eq!(
            serde_json::to_string(&OrderStatus::New).unwrap(),
            "\"NEW\""
        );
        assert_eq!(
            serde_json::to_string(&OrderStatus::Processed).unwrap(),
            "\"PROCESSED\""
        );
        let parsed: OrderStatus = serde_json::from_str("\"INVALID\"").unwrap();
        assert_eq!(parsed, OrderStatus::Invalid);
    }
}
