//! Error types for pointmart storage.

use rust_decimal::Decimal;

/// Result type for storage operations.
pub type Result<T> = std::result::Result<T, StoreError>;

/// Errors that can occur in storage operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    /// Database operation failed.
    #[error("database error: {0}")]
    Database(String),

    /// Serialization/deserialization failed.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// No user with the requested id or login.
    #[error("user not found")]
    UserNotFound,

    /// The login is taken, compared case-insensitively.
    #[error("login is occupied by another user")]
    LoginOccupied,

    /// No order with the requested number.
    #[error("order not found")]
    OrderNotFound,

    /// An order with the same number already exists.
    #[error("order with this number has already been uploaded")]
    OrderAlreadyExists,

    /// The order already reached a terminal status.
    #[error("order has already been finalized")]
    OrderFinalized,

    /// The order row is locked by another writer; the caller should
    /// retry later instead of queueing behind the lock.
    #[error("order row is locked by another writer")]
    RowLocked,

    /// No withdrawal registered against the requested number.
    #[error("withdrawal not found")]
    WithdrawalNotFound,

    /// A withdrawal against the same number already exists.
    #[error("withdrawal for this order has already been registered")]
    WithdrawalAlreadyRegistered,

    /// The user's current balance does not cover the requested debit.
    #[error("insufficient balance: current={current}, requested={requested}")]
    InsufficientBalance {
        /// Current balance at the time of the attempt.
        current: Decimal,
        /// The requested debit.
        requested: Decimal,
    },

    /// A negative accrual was passed to a status update.
    #[error("accrual cannot be negative")]
    NegativeAccrual,
}
