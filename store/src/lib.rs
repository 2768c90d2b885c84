//! Transactional ledger storage for pointmart.
//!
//! This crate persists users, orders, and withdrawals and exposes the
//! row-locked, transactional operations the services are built on.
//!
//! # Architecture
//!
//! The capability set is split across two traits:
//!
//! - [`Ledger`] hands out transaction handles via [`Ledger::begin`].
//! - [`LedgerTx`] carries every read and write. Writes are buffered and
//!   applied atomically by [`LedgerTx::commit`]; dropping a transaction
//!   without committing rolls it back. Row locks acquired inside a
//!   transaction are held until commit or drop.
//!
//! Multi-step service operations join a single transaction by threading
//! the same handle through their calls.
//!
//! Two implementations are provided:
//!
//! - [`RocksLedger`]: durable storage on `RocksDB` with column families
//!   for rows and indexes.
//! - [`MemoryLedger`]: a hash-map implementation with identical locking
//!   and transaction semantics, for tests.
//!
//! # Example
//!
//! ```no_run
//! use pointmart_store::{Ledger, LedgerTx, RocksLedger};
//!
//! let store = RocksLedger::open("/tmp/pointmart-db").unwrap();
//!
//! let mut tx = store.begin().unwrap();
//! let user = tx.create_user("shopper", "<bcrypt hash>").unwrap();
//! tx.commit().unwrap();
//!
//! let mut tx = store.begin().unwrap();
//! let fetched = tx.get_user_by_id(user.id).unwrap();
//! assert_eq!(fetched.login, "shopper");
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod error;
pub mod keys;
mod locks;
pub mod memory;
pub mod rocks;
pub mod schema;

pub use error::{Result, StoreError};
pub use memory::MemoryLedger;
pub use rocks::RocksLedger;

use rust_decimal::Decimal;

use pointmart_core::{
    Order, OrderCandidate, OrderId, OrderNumber, OrderStatus, User, UserId, Withdrawal,
    WithdrawalCandidate,
};

/// A transactional ledger store.
///
/// Implementations are shared behind an `Arc` and may be used from many
/// threads; each transaction handle belongs to a single caller.
pub trait Ledger: Send + Sync {
    /// The transaction handle type.
    type Tx<'a>: LedgerTx
    where
        Self: 'a;

    /// Begin a transaction.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying database is unavailable.
    fn begin(&self) -> Result<Self::Tx<'_>>;
}

/// Operations available inside a ledger transaction.
///
/// Reads observe the committed state plus this transaction's own row
/// writes. All mutations take effect only on [`LedgerTx::commit`].
pub trait LedgerTx {
    /// Insert a new user with a zero balance.
    ///
    /// Logins are unique case-insensitively and stored lower-cased.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::LoginOccupied`] if a user with the same
    /// login (in any casing) exists.
    fn create_user(&mut self, login: &str, password_hash: &str) -> Result<User>;

    /// Fetch a user by id.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::UserNotFound`] if no such user exists.
    fn get_user_by_id(&mut self, id: UserId) -> Result<User>;

    /// Fetch a user by login, compared case-insensitively.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::UserNotFound`] if no such user exists.
    fn get_user_by_login(&mut self, login: &str) -> Result<User>;

    /// Add `points` to the user's current balance.
    ///
    /// Acquires an exclusive lock on the user row for the remainder of
    /// the transaction. `points` must be positive; this is enforced by
    /// callers.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::UserNotFound`] if no such user exists.
    fn accrue_points(&mut self, user_id: UserId, points: Decimal) -> Result<()>;

    /// Move `points` from the user's current balance to the withdrawn
    /// total.
    ///
    /// Acquires an exclusive lock on the user row for the remainder of
    /// the transaction, which serializes concurrent debits.
    ///
    /// # Errors
    ///
    /// - [`StoreError::UserNotFound`] if no such user exists.
    /// - [`StoreError::InsufficientBalance`] if the locked balance is
    ///   below `points`.
    fn withdraw_points(&mut self, user_id: UserId, points: Decimal) -> Result<()>;

    /// Insert a new order in `NEW` status with zero accrual.
    ///
    /// The store assigns the id and the upload timestamp.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::OrderAlreadyExists`] if an order with the
    /// same number exists, regardless of owner.
    fn add_order(&mut self, candidate: OrderCandidate) -> Result<Order>;

    /// Fetch an order by number.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::OrderNotFound`] if no such order exists.
    fn get_order_by_number(&mut self, number: &OrderNumber) -> Result<Order>;

    /// List the user's orders, oldest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying database fails.
    fn list_orders_for_user(&mut self, user_id: UserId) -> Result<Vec<Order>>;

    /// List all orders in non-terminal status, oldest first.
    ///
    /// Used by the startup sweep that re-enqueues unfinished orders.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying database fails.
    fn list_unfinished_orders(&mut self) -> Result<Vec<Order>>;

    /// Set an order's status and accrual.
    ///
    /// Acquires the order row lock without waiting so that concurrent
    /// writers fail fast instead of piling up.
    ///
    /// # Errors
    ///
    /// - [`StoreError::OrderNotFound`] if no such order exists.
    /// - [`StoreError::RowLocked`] if another transaction holds the row.
    /// - [`StoreError::OrderFinalized`] if the order already reached a
    ///   terminal status.
    /// - [`StoreError::NegativeAccrual`] if `accrual` is negative.
    fn update_order_status(
        &mut self,
        id: OrderId,
        status: OrderStatus,
        accrual: Decimal,
    ) -> Result<()>;

    /// Insert a new withdrawal.
    ///
    /// The store assigns the id and the completion timestamp.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::WithdrawalAlreadyRegistered`] if a
    /// withdrawal against the same number exists.
    fn add_withdrawal(&mut self, candidate: WithdrawalCandidate) -> Result<Withdrawal>;

    /// Fetch a withdrawal by the number it was registered against.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::WithdrawalNotFound`] if no such withdrawal
    /// exists.
    fn get_withdrawal_by_number(&mut self, number: &OrderNumber) -> Result<Withdrawal>;

    /// List the user's withdrawals, oldest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying database fails.
    fn list_withdrawals_for_user(&mut self, user_id: UserId) -> Result<Vec<Withdrawal>>;

    /// Commit the transaction, applying all buffered writes atomically
    /// and releasing every held row lock.
    ///
    /// # Errors
    ///
    /// Returns an error if the write fails; nothing is applied in that
    /// case.
    fn commit(self) -> Result<()>
    where
        Self: Sized;
}
