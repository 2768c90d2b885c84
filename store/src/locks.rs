//! In-process row locks for ledger transactions.
//!
//! Both ledger implementations serialize row access through a single
//! [`LockTable`]: a mutex-guarded set of held keys with a condvar for
//! waiters. User rows and uniqueness keys take blocking locks; order
//! rows take a fail-fast try-lock so that concurrent status writers
//! bail out instead of queueing.
//!
//! Locks are scoped to a [`RowGuard`] and released on drop, which ties
//! their lifetime to the owning transaction.

use std::collections::HashSet;
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};

/// A lockable row or uniqueness key.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum RowKey {
    /// A user row.
    User(i64),
    /// An order row.
    Order(i64),
    /// The uniqueness scope of an order number.
    OrderNumber(String),
    /// The uniqueness scope of a withdrawal number.
    WithdrawalNumber(String),
    /// The uniqueness scope of a (lower-cased) login.
    Login(String),
}

/// The set of currently held row locks.
#[derive(Debug, Default)]
pub struct LockTable {
    held: Mutex<HashSet<RowKey>>,
    released: Condvar,
}

impl LockTable {
    /// Create an empty lock table.
    #[must_use]
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Block until the lock on `key` is acquired.
    pub fn lock(self: &Arc<Self>, key: RowKey) -> RowGuard {
        let mut held = self.held_set();
        while held.contains(&key) {
            held = self
                .released
                .wait(held)
                .unwrap_or_else(PoisonError::into_inner);
        }
        held.insert(key.clone());
        RowGuard {
            table: Arc::clone(self),
            key,
        }
    }

    /// Acquire the lock on `key` without waiting.
    ///
    /// Returns `None` if the lock is held elsewhere.
    pub fn try_lock(self: &Arc<Self>, key: RowKey) -> Option<RowGuard> {
        let mut held = self.held_set();
        if held.contains(&key) {
            return None;
        }
        held.insert(key.clone());
        Some(RowGuard {
            table: Arc::clone(self),
            key,
        })
    }

    fn unlock(&self, key: &RowKey) {
        let mut held = self.held_set();
        held.remove(key);
        self.released.notify_all();
    }

    fn held_set(&self) -> MutexGuard<'_, HashSet<RowKey>> {
        self.held.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// A held row lock; released on drop.
#[derive(Debug)]
pub struct RowGuard {
    table: Arc<LockTable>,
    key: RowKey,
}

impl RowGuard {
    /// The key this guard holds.
    pub fn key(&self) -> &RowKey {
        &self.key
    }
}

impl Drop for RowGuard {
    fn drop(&mut self) {
        self.table.unlock(&self.key);
    }
}
