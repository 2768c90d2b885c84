//! Key encoding utilities for `RocksDB`.
//!
//! Row keys are big-endian encoded ids so that iteration order matches
//! numeric order. Per-user index keys embed the row timestamp (as
//! big-endian milliseconds) ahead of the id, which makes a forward scan
//! return rows oldest first.

use chrono::{DateTime, Utc};

use pointmart_core::{OrderId, OrderNumber, UserId, WithdrawalId};

/// Create a user row key from a user id.
#[must_use]
pub fn user_key(user_id: UserId) -> [u8; 8] {
    user_id.get().to_be_bytes()
}

/// Create a login index key. Logins are folded to lower case so that
/// uniqueness is case-insensitive.
#[must_use]
pub fn login_key(login: &str) -> Vec<u8> {
    login.to_lowercase().into_bytes()
}

/// Create an order row key from an order id.
#[must_use]
pub fn order_key(order_id: OrderId) -> [u8; 8] {
    order_id.get().to_be_bytes()
}

/// Create an order-number index key.
#[must_use]
pub fn order_number_key(number: &OrderNumber) -> Vec<u8> {
    number.as_str().as_bytes().to_vec()
}

/// Create a user-order index key.
///
/// Format: `user_id (8 bytes) || uploaded_at millis (8 bytes) || order_id (8 bytes)`
#[must_use]
pub fn user_order_key(user_id: UserId, uploaded_at: DateTime<Utc>, order_id: OrderId) -> Vec<u8> {
    let mut key = Vec::with_capacity(24);
    key.extend_from_slice(&user_id.get().to_be_bytes());
    key.extend_from_slice(&uploaded_at.timestamp_millis().to_be_bytes());
    key.extend_from_slice(&order_id.get().to_be_bytes());
    key
}

/// Create a prefix for iterating all orders of a user.
#[must_use]
pub fn user_orders_prefix(user_id: UserId) -> Vec<u8> {
    user_id.get().to_be_bytes().to_vec()
}

/// Create an unfinished-order index key.
///
/// Format: `uploaded_at millis (8 bytes) || order_id (8 bytes)`
#[must_use]
pub fn unfinished_order_key(uploaded_at: DateTime<Utc>, order_id: OrderId) -> Vec<u8> {
    let mut key = Vec::with_capacity(16);
    key.extend_from_slice(&uploaded_at.timestamp_millis().to_be_bytes());
    key.extend_from_slice(&order_id.get().to_be_bytes());
    key
}

/// Extract the order id from the trailing 8 bytes of an index key.
///
/// # Panics
///
/// Panics if the key is shorter than 8 bytes.
#[must_use]
pub fn order_id_from_index_key(key: &[u8]) -> OrderId {
    let mut bytes = [0u8; 8];
    bytes.copy_from_slice(&key[key.len() - 8..]);
    OrderId::new(i64::from_be_bytes(bytes))
}

/// Create a withdrawal row key from a withdrawal id.
#[must_use]
pub fn withdrawal_key(withdrawal_id: WithdrawalId) -> [u8; 8] {
    withdrawal_id.get().to_be_bytes()
}

/// Create a withdrawal-number index key.
#[must_use]
pub fn withdrawal_number_key(number: &OrderNumber) -> Vec<u8> {
    number.as_str().as_bytes().to_vec()
}

/// Create a user-withdrawal index key.
///
/// Format: `user_id (8 bytes) || processed_at millis (8 bytes) || withdrawal_id (8 bytes)`
#[must_use]
pub fn user_withdrawal_key(
    user_id: UserId,
    processed_at: DateTime<Utc>,
    withdrawal_id: WithdrawalId,
) -> Vec<u8> {
    let mut key = Vec::with_capacity(24);
    key.extend_from_slice(&user_id.get().to_be_bytes());
    key.extend_from_slice(&processed_at.timestamp_millis().to_be_bytes());
    key.extend_from_slice(&withdrawal_id.get().to_be_bytes());
    key
}

/// Create a prefix for iterating all withdrawals of a user.
#[must_use]
pub fn user_withdrawals_prefix(user_id: UserId) -> Vec<u8> {
    user_id.get().to_be_bytes().to_vec()
}

/// Extract the withdrawal id from the trailing 8 bytes of an index key.
///
/// # Panics
///
/// Panics if the key is shorter than 8 bytes.
#[must_use]
pub fn withdrawal_id_from_index_key(key: &[u8]) -> WithdrawalId {
    let mut bytes = [0u8; 8];
    bytes.copy_from_slice(&key[key.len() - 8..]);
    WithdrawalId::new(i64::from_be_bytes(bytes))
}
