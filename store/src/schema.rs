//! Database schema definitions and column families.
//!
//! This module defines the column families used in `RocksDB` storage.

/// Column family names for the `RocksDB` database.
pub mod cf {
    /// User records, keyed by user id.
    pub const USERS: &str = "users";

    /// Index: lower-cased login to user id.
    pub const USERS_BY_LOGIN: &str = "users_by_login";

    /// Order records, keyed by order id.
    pub const ORDERS: &str = "orders";

    /// Index: order number to order id.
    pub const ORDERS_BY_NUMBER: &str = "orders_by_number";

    /// Index: orders by user, keyed by `user_id || uploaded_at || order_id`.
    /// Value is empty (index only).
    pub const ORDERS_BY_USER: &str = "orders_by_user";

    /// Index: orders in non-terminal status, keyed by
    /// `uploaded_at || order_id`. Value is empty; entries are removed
    /// when the order is finalized. Scanned by the startup recovery
    /// sweep.
    pub const ORDERS_UNFINISHED: &str = "orders_unfinished";

    /// Withdrawal records, keyed by withdrawal id.
    pub const WITHDRAWALS: &str = "withdrawals";

    /// Index: withdrawal number to withdrawal id.
    pub const WITHDRAWALS_BY_NUMBER: &str = "withdrawals_by_number";

    /// Index: withdrawals by user, keyed by
    /// `user_id || processed_at || withdrawal_id`. Value is empty.
    pub const WITHDRAWALS_BY_USER: &str = "withdrawals_by_user";
}

/// Returns all column family names for database initialization.
#[must_use]
pub fn all_column_families() -> Vec<&'static str> {
    vec![
        cf::USERS,
        cf::USERS_BY_LOGIN,
        cf::ORDERS,
        cf::ORDERS_BY_NUMBER,
        cf::ORDERS_BY_USER,
        cf::ORDERS_UNFINISHED,
        cf::WITHDRAWALS,
        cf::WITHDRAWALS_BY_NUMBER,
        cf::WITHDRAWALS_BY_USER,
    ]
}
