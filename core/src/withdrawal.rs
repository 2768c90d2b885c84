//! Point withdrawals.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::{OrderNumber, UserId, WithdrawalId};

/// A completed withdrawal.
///
/// Withdrawals are immutable once created; the balance debit and the
/// withdrawal record are written in the same transaction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Withdrawal {
    /// Store-assigned id.
    pub id: WithdrawalId,

    /// The user the points were withdrawn from.
    pub user_id: UserId,

    /// Order number the withdrawal is registered against, unique across
    /// all withdrawals.
    pub number: OrderNumber,

    /// Withdrawn sum, strictly positive.
    pub sum: Decimal,

    /// Completion timestamp, assigned by the store on insert.
    pub processed_at: DateTime<Utc>,
}

/// A not-yet-persisted withdrawal.
///
/// The store assigns the id and the completion timestamp.
#[derive(Debug, Clone)]
pub struct WithdrawalCandidate {
    /// The user withdrawing points.
    pub user_id: UserId,

    /// Order number to register the withdrawal against.
    pub number: OrderNumber,

    /// Sum to withdraw.
    pub sum: Decimal,
}

impl WithdrawalCandidate {
    /// Create a candidate withdrawal for the given user.
    #[must_use]
    pub const fn new(number: OrderNumber, user_id: UserId, sum: Decimal) -> Self {
        Self {
            user_id,
            number,
            sum,
        }
    }
}
