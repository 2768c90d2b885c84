//! User accounts and point balances.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::UserId;

/// Point balances of a user.
///
/// `current` is available for withdrawal and never drops below zero;
/// `withdrawn` accumulates every completed withdrawal and never
/// decreases. Their sum equals the user's lifetime accrual.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Balance {
    /// Points available for withdrawal.
    pub current: Decimal,

    /// Lifetime sum of completed withdrawals.
    pub withdrawn: Decimal,
}

impl Balance {
    /// Check whether the current balance covers a debit of `sum`.
    #[must_use]
    pub fn covers(&self, sum: Decimal) -> bool {
        self.current >= sum
    }
}

/// A registered user.
///
/// The store only ever holds password hashes; plain passwords are hashed
/// at the service layer before they reach a [`User`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    /// Store-assigned id.
    pub id: UserId,

    /// Unique login, stored lower-cased.
    pub login: String,

    /// Bcrypt hash of the user's password.
    pub password_hash: String,

    /// The user's point balances.
    pub balance: Balance,
}
