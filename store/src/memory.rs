//! In-memory ledger implementation.
//!
//! [`MemoryLedger`] mirrors the transaction and row-locking semantics of
//! the `RocksDB` store over plain hash maps. It exists so that service
//! tests can substitute a fake ledger without a database directory.

use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::Utc;
use rust_decimal::Decimal;

use pointmart_core::{
    Balance, Order, OrderCandidate, OrderId, OrderNumber, OrderStatus, User, UserId, Withdrawal,
    WithdrawalCandidate, WithdrawalId,
};

use crate::error::{Result, StoreError};
use crate::locks::{LockTable, RowGuard, RowKey};
use crate::{Ledger, LedgerTx};

#[derive(Debug, Default)]
struct MemoryState {
    users: BTreeMap<i64, User>,
    logins: HashMap<String, i64>,
    orders: BTreeMap<i64, Order>,
    order_numbers: HashMap<String, i64>,
    withdrawals: BTreeMap<i64, Withdrawal>,
    withdrawal_numbers: HashMap<String, i64>,
    user_seq: i64,
    order_seq: i64,
    withdrawal_seq: i64,
}

/// Hash-map ledger with the same semantics as the durable store.
#[derive(Debug, Default)]
pub struct MemoryLedger {
    state: Mutex<MemoryState>,
    locks: Arc<LockTable>,
}

impl MemoryLedger {
    /// Create an empty in-memory ledger.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, MemoryState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Ledger for MemoryLedger {
    type Tx<'a>
        = MemoryTx<'a>
    where
        Self: 'a;

    fn begin(&self) -> Result<Self::Tx<'_>> {
        Ok(MemoryTx {
            store: self,
            pending: Vec::new(),
            locks: Vec::new(),
        })
    }
}

/// Buffered writes applied on commit, in order.
#[derive(Debug)]
enum Pending {
    User(User),
    Login(String, i64),
    Order(Order),
    OrderNumber(String, i64),
    Withdrawal(Withdrawal),
    WithdrawalNumber(String, i64),
}

/// A buffered transaction against a [`MemoryLedger`].
#[derive(Debug)]
pub struct MemoryTx<'a> {
    store: &'a MemoryLedger,
    pending: Vec<Pending>,
    locks: Vec<RowGuard>,
}

impl MemoryTx<'_> {
    fn lock_row(&mut self, key: RowKey) {
        if self.holds(&key) {
            return;
        }
        let guard = self.store.locks.lock(key);
        self.locks.push(guard);
    }

    fn try_lock_row(&mut self, key: RowKey) -> Result<()> {
        if self.holds(&key) {
            return Ok(());
        }
        match self.store.locks.try_lock(key) {
            Some(guard) => {
                self.locks.push(guard);
                Ok(())
            }
            None => Err(StoreError::RowLocked),
        }
    }

    fn holds(&self, key: &RowKey) -> bool {
        self.locks.iter().any(|guard| guard.key() == key)
    }

    /// Latest version of the user row, including this transaction's own
    /// pending writes.
    fn find_user(&self, id: UserId) -> Option<User> {
        self.pending
            .iter()
            .rev()
            .find_map(|write| match write {
                Pending::User(user) if user.id == id => Some(user.clone()),
                _ => None,
            })
            .or_else(|| self.store.state().users.get(&id.get()).cloned())
    }

    fn find_order(&self, id: OrderId) -> Option<Order> {
        self.pending
            .iter()
            .rev()
            .find_map(|write| match write {
                Pending::Order(order) if order.id == id => Some(order.clone()),
                _ => None,
            })
            .or_else(|| self.store.state().orders.get(&id.get()).cloned())
    }

    fn order_id_by_number(&self, number: &OrderNumber) -> Option<OrderId> {
        self.pending
            .iter()
            .rev()
            .find_map(|write| match write {
                Pending::OrderNumber(n, id) if n == number.as_str() => Some(OrderId::new(*id)),
                _ => None,
            })
            .or_else(|| {
                self.store
                    .state()
                    .order_numbers
                    .get(number.as_str())
                    .map(|id| OrderId::new(*id))
            })
    }

    fn login_id(&self, login: &str) -> Option<UserId> {
        self.pending
            .iter()
            .rev()
            .find_map(|write| match write {
                Pending::Login(name, id) if name == login => Some(UserId::new(*id)),
                _ => None,
            })
            .or_else(|| self.store.state().logins.get(login).map(|id| UserId::new(*id)))
    }

    fn withdrawal_id_by_number(&self, number: &OrderNumber) -> Option<WithdrawalId> {
        self.pending
            .iter()
            .rev()
            .find_map(|write| match write {
                Pending::WithdrawalNumber(n, id) if n == number.as_str() => {
                    Some(WithdrawalId::new(*id))
                }
                _ => None,
            })
            .or_else(|| {
                self.store
                    .state()
                    .withdrawal_numbers
                    .get(number.as_str())
                    .map(|id| WithdrawalId::new(*id))
            })
    }
}

impl LedgerTx for MemoryTx<'_> {
    fn create_user(&mut self, login: &str, password_hash: &str) -> Result<User> {
        let login = login.to_lowercase();
        self.lock_row(RowKey::Login(login.clone()));

        if self.login_id(&login).is_some() {
            return Err(StoreError::LoginOccupied);
        }

        let id = {
            let mut state = self.store.state();
            state.user_seq += 1;
            UserId::new(state.user_seq)
        };
        let user = User {
            id,
            login: login.clone(),
            password_hash: password_hash.to_string(),
            balance: Balance::default(),
        };

        self.pending.push(Pending::User(user.clone()));
        self.pending.push(Pending::Login(login, id.get()));
        Ok(user)
    }

    fn get_user_by_id(&mut self, id: UserId) -> Result<User> {
        self.find_user(id).ok_or(StoreError::UserNotFound)
    }

    fn get_user_by_login(&mut self, login: &str) -> Result<User> {
        let id = self
            .login_id(&login.to_lowercase())
            .ok_or(StoreError::UserNotFound)?;
        self.get_user_by_id(id)
    }

    fn accrue_points(&mut self, user_id: UserId, points: Decimal) -> Result<()> {
        self.lock_row(RowKey::User(user_id.get()));

        let mut user = self.find_user(user_id).ok_or(StoreError::UserNotFound)?;
        user.balance.current += points;
        self.pending.push(Pending::User(user));
        Ok(())
    }

    fn withdraw_points(&mut self, user_id: UserId, points: Decimal) -> Result<()> {
        self.lock_row(RowKey::User(user_id.get()));

        let mut user = self.find_user(user_id).ok_or(StoreError::UserNotFound)?;
        if !user.balance.covers(points) {
            return Err(StoreError::InsufficientBalance {
                current: user.balance.current,
                requested: points,
            });
        }
        user.balance.current -= points;
        user.balance.withdrawn += points;
        self.pending.push(Pending::User(user));
        Ok(())
    }

    fn add_order(&mut self, candidate: OrderCandidate) -> Result<Order> {
        self.lock_row(RowKey::OrderNumber(candidate.number.as_str().to_string()));

        if self.order_id_by_number(&candidate.number).is_some() {
            return Err(StoreError::OrderAlreadyExists);
        }

        let id = {
            let mut state = self.store.state();
            state.order_seq += 1;
            OrderId::new(state.order_seq)
        };
        let order = Order {
            id,
            user_id: candidate.user_id,
            number: candidate.number,
            status: OrderStatus::New,
            accrual: Decimal::ZERO,
            uploaded_at: Utc::now(),
        };

        self.pending.push(Pending::Order(order.clone()));
        self.pending
            .push(Pending::OrderNumber(order.number.as_str().to_string(), id.get()));
        Ok(order)
    }

    fn get_order_by_number(&mut self, number: &OrderNumber) -> Result<Order> {
        let id = self
            .order_id_by_number(number)
            .ok_or(StoreError::OrderNotFound)?;
        self.find_order(id).ok_or(StoreError::OrderNotFound)
    }

    fn list_orders_for_user(&mut self, user_id: UserId) -> Result<Vec<Order>> {
        let mut orders: Vec<Order> = self
            .store
            .state()
            .orders
            .values()
            .filter(|order| order.user_id == user_id)
            .cloned()
            .collect();
        orders.sort_by_key(|order| (order.uploaded_at, order.id));
        Ok(orders)
    }

    fn list_unfinished_orders(&mut self) -> Result<Vec<Order>> {
        let mut orders: Vec<Order> = self
            .store
            .state()
            .orders
            .values()
            .filter(|order| !order.status.is_terminal())
            .cloned()
            .collect();
        orders.sort_by_key(|order| (order.uploaded_at, order.id));
        Ok(orders)
    }

    fn update_order_status(
        &mut self,
        id: OrderId,
        status: OrderStatus,
        accrual: Decimal,
    ) -> Result<()> {
        if accrual.is_sign_negative() {
            return Err(StoreError::NegativeAccrual);
        }
        self.try_lock_row(RowKey::Order(id.get()))?;

        let mut order = self.find_order(id).ok_or(StoreError::OrderNotFound)?;
        if order.status.is_terminal() {
            return Err(StoreError::OrderFinalized);
        }
        order.status = status;
        order.accrual = accrual;
        self.pending.push(Pending::Order(order));
        Ok(())
    }

    fn add_withdrawal(&mut self, candidate: WithdrawalCandidate) -> Result<Withdrawal> {
        self.lock_row(RowKey::WithdrawalNumber(
            candidate.number.as_str().to_string(),
        ));

        if self.withdrawal_id_by_number(&candidate.number).is_some() {
            return Err(StoreError::WithdrawalAlreadyRegistered);
        }

        let id = {
            let mut state = self.store.state();
            state.withdrawal_seq += 1;
            WithdrawalId::new(state.withdrawal_seq)
        };
        let withdrawal = Withdrawal {
            id,
            user_id: candidate.user_id,
            number: candidate.number,
            sum: candidate.sum,
            processed_at: Utc::now(),
        };

        self.pending.push(Pending::Withdrawal(withdrawal.clone()));
        self.pending.push(Pending::WithdrawalNumber(
            withdrawal.number.as_str().to_string(),
            id.get(),
        ));
        Ok(withdrawal)
    }

    fn get_withdrawal_by_number(&mut self, number: &OrderNumber) -> Result<Withdrawal> {
        let id = self
            .withdrawal_id_by_number(number)
            .ok_or(StoreError::WithdrawalNotFound)?;
        self.pending
            .iter()
            .rev()
            .find_map(|write| match write {
                Pending::Withdrawal(withdrawal) if withdrawal.id == id => {
                    Some(withdrawal.clone())
                }
                _ => None,
            })
            .or_else(|| self.store.state().withdrawals.get(&id.get()).cloned())
            .ok_or(StoreError::WithdrawalNotFound)
    }

    fn list_withdrawals_for_user(&mut self, user_id: UserId) -> Result<Vec<Withdrawal>> {
        let mut withdrawals: Vec<Withdrawal> = self
            .store
            .state()
            .withdrawals
            .values()
            .filter(|withdrawal| withdrawal.user_id == user_id)
            .cloned()
            .collect();
        withdrawals.sort_by_key(|withdrawal| (withdrawal.processed_at, withdrawal.id));
        Ok(withdrawals)
    }

    fn commit(self) -> Result<()> {
        let mut state = self.store.state();
        for write in self.pending {
            match write {
                Pending::User(user) => {
                    state.users.insert(user.id.get(), user);
                }
                Pending::Login(login, id) => {
                    state.logins.insert(login, id);
                }
                Pending::Order(order) => {
                    state.orders.insert(order.id.get(), order);
                }
                Pending::OrderNumber(number, id) => {
                    state.order_numbers.insert(number, id);
                }
                Pending::Withdrawal(withdrawal) => {
                    state.withdrawals.insert(withdrawal.id.get(), withdrawal);
                }
                Pending::WithdrawalNumber(number, id) => {
                    state.withdrawal_numbers.insert(number, id);
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use rust_decimal_macros::dec;

    use super::*;

    #[test]
    fn create_and_fetch_user() {
        let store = MemoryLedger::new();

        let mut tx = store.begin().unwrap();
        let user = tx.create_user("Shopper", "hash").unwrap();
        tx.commit().unwrap();

        let mut tx = store.begin().unwrap();
        assert_eq!(tx.get_user_by_login("shopper").unwrap().id, user.id);
        assert!(matches!(
            tx.create_user("SHOPPER", "hash"),
            Err(StoreError::LoginOccupied)
        ));
    }

    #[test]
    fn dropped_transaction_is_rolled_back() {
        let store = MemoryLedger::new();

        let mut tx = store.begin().unwrap();
        tx.create_user("shopper", "hash").unwrap();
        drop(tx);

        let mut tx = store.begin().unwrap();
        assert!(matches!(
            tx.get_user_by_login("shopper"),
            Err(StoreError::UserNotFound)
        ));
    }

    #[test]
    fn balance_arithmetic_matches_contract() {
        let store = MemoryLedger::new();
        let mut tx = store.begin().unwrap();
        let user = tx.create_user("shopper", "hash").unwrap();
        tx.accrue_points(user.id, dec!(10)).unwrap();
        tx.commit().unwrap();

        let mut tx = store.begin().unwrap();
        tx.withdraw_points(user.id, dec!(3.5)).unwrap();
        assert!(matches!(
            tx.withdraw_points(user.id, dec!(10)),
            Err(StoreError::InsufficientBalance { .. })
        ));
        let number = OrderNumber::parse("2377225624").unwrap();
        tx.add_withdrawal(WithdrawalCandidate::new(number.clone(), user.id, dec!(3.5)))
            .unwrap();
        // The transaction sees its own insert.
        assert_eq!(
            tx.get_withdrawal_by_number(&number).unwrap().sum,
            dec!(3.5)
        );
        tx.commit().unwrap();

        let mut tx = store.begin().unwrap();
        let balance = tx.get_user_by_id(user.id).unwrap().balance;
        assert_eq!(balance.current, dec!(6.5));
        assert_eq!(balance.withdrawn, dec!(3.5));
    }

    #[test]
    fn order_lifecycle() {
        let store = MemoryLedger::new();
        let number = OrderNumber::parse("79927398713").unwrap();

        let mut tx = store.begin().unwrap();
        let user = tx.create_user("shopper", "hash").unwrap();
        let order = tx
            .add_order(OrderCandidate::new(number.clone(), user.id))
            .unwrap();
        // The transaction sees its own insert.
        assert_eq!(tx.get_order_by_number(&number).unwrap().id, order.id);
        tx.commit().unwrap();

        let mut tx = store.begin().unwrap();
        assert!(matches!(
            tx.add_order(OrderCandidate::new(number.clone(), user.id)),
            Err(StoreError::OrderAlreadyExists)
        ));
        drop(tx);

        let mut tx = store.begin().unwrap();
        tx.update_order_status(order.id, OrderStatus::Processed, dec!(100.5))
            .unwrap();
        tx.commit().unwrap();

        let mut tx = store.begin().unwrap();
        assert!(tx.list_unfinished_orders().unwrap().is_empty());
        assert!(matches!(
            tx.update_order_status(order.id, OrderStatus::Invalid, Decimal::ZERO),
            Err(StoreError::OrderFinalized)
        ));
    }

    #[test]
    fn order_row_lock_fails_fast() {
        let store = MemoryLedger::new();
        let mut tx = store.begin().unwrap();
        let user = tx.create_user("shopper", "hash").unwrap();
        let order = tx
            .add_order(OrderCandidate::new(
                OrderNumber::parse("49927398716").unwrap(),
                user.id,
            ))
            .unwrap();
        tx.commit().unwrap();

        let mut holder = store.begin().unwrap();
        holder
            .update_order_status(order.id, OrderStatus::Processing, Decimal::ZERO)
            .unwrap();

        let mut other = store.begin().unwrap();
        assert!(matches!(
            other.update_order_status(order.id, OrderStatus::Invalid, Decimal::ZERO),
            Err(StoreError::RowLocked)
        ));
    }
}
