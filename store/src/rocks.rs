//! `RocksDB` ledger implementation.
//!
//! This module provides the [`RocksLedger`] implementation of the
//! [`Ledger`] trait. A transaction buffers its writes in a `WriteBatch`
//! (with an overlay so the transaction reads its own rows back) and
//! takes row locks through the shared [`LockTable`]; commit applies the
//! batch atomically and releases the locks.

use std::collections::HashMap;
use std::path::Path;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;

use chrono::Utc;
use rocksdb::{
    BoundColumnFamily, ColumnFamilyDescriptor, DBWithThreadMode, Direction, IteratorMode,
    MultiThreaded, Options, WriteBatch,
};
use rust_decimal::Decimal;

use pointmart_core::{
    Balance, Order, OrderCandidate, OrderId, OrderNumber, OrderStatus, User, UserId, Withdrawal,
    WithdrawalCandidate, WithdrawalId,
};

use crate::error::{Result, StoreError};
use crate::keys;
use crate::locks::{LockTable, RowGuard, RowKey};
use crate::schema::{all_column_families, cf};
use crate::{Ledger, LedgerTx};

type Db = DBWithThreadMode<MultiThreaded>;

/// RocksDB-backed ledger implementation.
pub struct RocksLedger {
    db: Arc<Db>,
    locks: Arc<LockTable>,
    user_seq: AtomicI64,
    order_seq: AtomicI64,
    withdrawal_seq: AtomicI64,
}

impl RocksLedger {
    /// Open or create a `RocksDB` database at the given path.
    ///
    /// Id sequences resume from the largest persisted id in each column
    /// family.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be opened or created.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut opts = Options::default();
        opts.create_if_missing(true);
        opts.create_missing_column_families(true);

        let cf_descriptors: Vec<_> = all_column_families()
            .into_iter()
            .map(|name| ColumnFamilyDescriptor::new(name, Options::default()))
            .collect();

        let db = DBWithThreadMode::open_cf_descriptors(&opts, path, cf_descriptors)
            .map_err(|e| StoreError::Database(e.to_string()))?;
        let db = Arc::new(db);

        Ok(Self {
            user_seq: AtomicI64::new(last_id(&db, cf::USERS)?),
            order_seq: AtomicI64::new(last_id(&db, cf::ORDERS)?),
            withdrawal_seq: AtomicI64::new(last_id(&db, cf::WITHDRAWALS)?),
            locks: LockTable::new(),
            db,
        })
    }

    /// Get a column family handle.
    fn cf(&self, name: &str) -> Result<Arc<BoundColumnFamily<'_>>> {
        self.db
            .cf_handle(name)
            .ok_or_else(|| StoreError::Database(format!("column family not found: {name}")))
    }

    /// Serialize a value using CBOR.
    fn serialize<T: serde::Serialize>(value: &T) -> Result<Vec<u8>> {
        let mut buf = Vec::new();
        ciborium::into_writer(value, &mut buf)
            .map_err(|e| StoreError::Serialization(e.to_string()))?;
        Ok(buf)
    }

    /// Deserialize a value from CBOR.
    fn deserialize<T: serde::de::DeserializeOwned>(data: &[u8]) -> Result<T> {
        ciborium::from_reader(data).map_err(|e| StoreError::Serialization(e.to_string()))
    }

    fn next_user_id(&self) -> UserId {
        UserId::new(self.user_seq.fetch_add(1, Ordering::SeqCst) + 1)
    }

    fn next_order_id(&self) -> OrderId {
        OrderId::new(self.order_seq.fetch_add(1, Ordering::SeqCst) + 1)
    }

    fn next_withdrawal_id(&self) -> WithdrawalId {
        WithdrawalId::new(self.withdrawal_seq.fetch_add(1, Ordering::SeqCst) + 1)
    }
}

/// Largest id present in a column family keyed by big-endian ids.
fn last_id(db: &Arc<Db>, name: &str) -> Result<i64> {
    let cf = db
        .cf_handle(name)
        .ok_or_else(|| StoreError::Database(format!("column family not found: {name}")))?;
    let mut iter = db.iterator_cf(&cf, IteratorMode::End);
    match iter.next() {
        Some(Ok((key, _))) if key.len() == 8 => {
            let mut bytes = [0u8; 8];
            bytes.copy_from_slice(&key);
            Ok(i64::from_be_bytes(bytes))
        }
        Some(Err(e)) => Err(StoreError::Database(e.to_string())),
        _ => Ok(0),
    }
}

impl Ledger for RocksLedger {
    type Tx<'a>
        = RocksTx<'a>
    where
        Self: 'a;

    fn begin(&self) -> Result<Self::Tx<'_>> {
        Ok(RocksTx {
            store: self,
            batch: WriteBatch::default(),
            overlay: HashMap::new(),
            locks: Vec::new(),
        })
    }
}

/// A buffered transaction against a [`RocksLedger`].
///
/// Dropping the transaction without committing discards the buffered
/// writes and releases every held row lock.
pub struct RocksTx<'a> {
    store: &'a RocksLedger,
    batch: WriteBatch,
    /// Pending writes by (column family, key); `None` marks a delete.
    /// Consulted before the database so the transaction reads its own
    /// row writes.
    overlay: HashMap<(&'static str, Vec<u8>), Option<Vec<u8>>>,
    locks: Vec<RowGuard>,
}

impl RocksTx<'_> {
    fn get(&self, cf_name: &'static str, key: &[u8]) -> Result<Option<Vec<u8>>> {
        if let Some(pending) = self.overlay.get(&(cf_name, key.to_vec())) {
            return Ok(pending.clone());
        }
        let cf = self.store.cf(cf_name)?;
        self.store
            .db
            .get_cf(&cf, key)
            .map_err(|e| StoreError::Database(e.to_string()))
    }

    fn put(&mut self, cf_name: &'static str, key: Vec<u8>, value: Vec<u8>) -> Result<()> {
        let cf = self.store.cf(cf_name)?;
        self.batch.put_cf(&cf, &key, &value);
        self.overlay.insert((cf_name, key), Some(value));
        Ok(())
    }

    fn delete(&mut self, cf_name: &'static str, key: Vec<u8>) -> Result<()> {
        let cf = self.store.cf(cf_name)?;
        self.batch.delete_cf(&cf, &key);
        self.overlay.insert((cf_name, key), None);
        Ok(())
    }

    /// Take a blocking row lock unless this transaction already holds it.
    fn lock_row(&mut self, key: RowKey) {
        if self.holds(&key) {
            return;
        }
        let guard = self.store.locks.lock(key);
        self.locks.push(guard);
    }

    /// Take a row lock without waiting; fails fast when held elsewhere.
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

    fn read_user(&self, id: UserId) -> Result<User> {
        self.get(cf::USERS, &keys::user_key(id))?
            .map(|data| RocksLedger::deserialize(&data))
            .transpose()?
            .ok_or(StoreError::UserNotFound)
    }

    fn write_user(&mut self, user: &User) -> Result<()> {
        let value = RocksLedger::serialize(user)?;
        self.put(cf::USERS, keys::user_key(user.id).to_vec(), value)
    }

    fn read_order(&self, id: OrderId) -> Result<Order> {
        self.get(cf::ORDERS, &keys::order_key(id))?
            .map(|data| RocksLedger::deserialize(&data))
            .transpose()?
            .ok_or(StoreError::OrderNotFound)
    }

    fn read_withdrawal(&self, id: WithdrawalId) -> Result<Withdrawal> {
        self.get(cf::WITHDRAWALS, &keys::withdrawal_key(id))?
            .map(|data| RocksLedger::deserialize(&data))
            .transpose()?
            .ok_or(StoreError::WithdrawalNotFound)
    }

    fn id_from_index(data: &[u8]) -> Result<i64> {
        let bytes: [u8; 8] = data
            .try_into()
            .map_err(|_| StoreError::Serialization("malformed index entry".into()))?;
        Ok(i64::from_be_bytes(bytes))
    }
}

impl LedgerTx for RocksTx<'_> {
    fn create_user(&mut self, login: &str, password_hash: &str) -> Result<User> {
        let login = login.to_lowercase();
        self.lock_row(RowKey::Login(login.clone()));

        if self.get(cf::USERS_BY_LOGIN, &keys::login_key(&login))?.is_some() {
            return Err(StoreError::LoginOccupied);
        }

        let id = self.store.next_user_id();
        let user = User {
            id,
            login,
            password_hash: password_hash.to_string(),
            balance: Balance::default(),
        };

        self.write_user(&user)?;
        self.put(
            cf::USERS_BY_LOGIN,
            keys::login_key(&user.login),
            id.get().to_be_bytes().to_vec(),
        )?;

        tracing::debug!(login = %user.login, id = %id, "created new user");
        Ok(user)
    }

    fn get_user_by_id(&mut self, id: UserId) -> Result<User> {
        self.read_user(id)
    }

    fn get_user_by_login(&mut self, login: &str) -> Result<User> {
        let data = self
            .get(cf::USERS_BY_LOGIN, &keys::login_key(login))?
            .ok_or(StoreError::UserNotFound)?;
        self.read_user(UserId::new(Self::id_from_index(&data)?))
    }

    fn accrue_points(&mut self, user_id: UserId, points: Decimal) -> Result<()> {
        self.lock_row(RowKey::User(user_id.get()));

        let mut user = self.read_user(user_id)?;
        let before = user.balance.current;
        user.balance.current += points;
        self.write_user(&user)?;

        tracing::info!(
            user = %user_id,
            points = %points,
            before = %before,
            after = %user.balance.current,
            "points accrued for user"
        );
        Ok(())
    }

    fn withdraw_points(&mut self, user_id: UserId, points: Decimal) -> Result<()> {
        self.lock_row(RowKey::User(user_id.get()));

        let mut user = self.read_user(user_id)?;
        if !user.balance.covers(points) {
            return Err(StoreError::InsufficientBalance {
                current: user.balance.current,
                requested: points,
            });
        }
        user.balance.current -= points;
        user.balance.withdrawn += points;
        self.write_user(&user)?;

        tracing::info!(
            user = %user_id,
            points = %points,
            current = %user.balance.current,
            withdrawn = %user.balance.withdrawn,
            "points withdrawn for user"
        );
        Ok(())
    }

    fn add_order(&mut self, candidate: OrderCandidate) -> Result<Order> {
        self.lock_row(RowKey::OrderNumber(candidate.number.as_str().to_string()));

        let number_key = keys::order_number_key(&candidate.number);
        if self.get(cf::ORDERS_BY_NUMBER, &number_key)?.is_some() {
            return Err(StoreError::OrderAlreadyExists);
        }

        let id = self.store.next_order_id();
        let order = Order {
            id,
            user_id: candidate.user_id,
            number: candidate.number,
            status: OrderStatus::New,
            accrual: Decimal::ZERO,
            uploaded_at: Utc::now(),
        };

        let value = RocksLedger::serialize(&order)?;
        self.put(cf::ORDERS, keys::order_key(id).to_vec(), value)?;
        self.put(cf::ORDERS_BY_NUMBER, number_key, id.get().to_be_bytes().to_vec())?;
        self.put(
            cf::ORDERS_BY_USER,
            keys::user_order_key(order.user_id, order.uploaded_at, id),
            Vec::new(),
        )?;
        self.put(
            cf::ORDERS_UNFINISHED,
            keys::unfinished_order_key(order.uploaded_at, id),
            Vec::new(),
        )?;

        tracing::debug!(number = %order.number, id = %id, "added new order");
        Ok(order)
    }

    fn get_order_by_number(&mut self, number: &OrderNumber) -> Result<Order> {
        let data = self
            .get(cf::ORDERS_BY_NUMBER, &keys::order_number_key(number))?
            .ok_or(StoreError::OrderNotFound)?;
        self.read_order(OrderId::new(Self::id_from_index(&data)?))
    }

    fn list_orders_for_user(&mut self, user_id: UserId) -> Result<Vec<Order>> {
        let cf_index = self.store.cf(cf::ORDERS_BY_USER)?;
        let prefix = keys::user_orders_prefix(user_id);
        let iter = self
            .store
            .db
            .iterator_cf(&cf_index, IteratorMode::From(&prefix, Direction::Forward));

        let mut orders = Vec::new();
        for item in iter {
            let (key, _) = item.map_err(|e| StoreError::Database(e.to_string()))?;
            if !key.starts_with(&prefix) {
                break;
            }
            orders.push(self.read_order(keys::order_id_from_index_key(&key))?);
        }
        Ok(orders)
    }

    fn list_unfinished_orders(&mut self) -> Result<Vec<Order>> {
        let cf_index = self.store.cf(cf::ORDERS_UNFINISHED)?;
        let iter = self.store.db.iterator_cf(&cf_index, IteratorMode::Start);

        let mut orders = Vec::new();
        for item in iter {
            let (key, _) = item.map_err(|e| StoreError::Database(e.to_string()))?;
            orders.push(self.read_order(keys::order_id_from_index_key(&key))?);
        }
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

        let mut order = self.read_order(id)?;
        if order.status.is_terminal() {
            return Err(StoreError::OrderFinalized);
        }
        order.status = status;
        order.accrual = accrual;

        let value = RocksLedger::serialize(&order)?;
        self.put(cf::ORDERS, keys::order_key(id).to_vec(), value)?;
        if status.is_terminal() {
            self.delete(
                cf::ORDERS_UNFINISHED,
                keys::unfinished_order_key(order.uploaded_at, id),
            )?;
        }
        Ok(())
    }

    fn add_withdrawal(&mut self, candidate: WithdrawalCandidate) -> Result<Withdrawal> {
        self.lock_row(RowKey::WithdrawalNumber(
            candidate.number.as_str().to_string(),
        ));

        let number_key = keys::withdrawal_number_key(&candidate.number);
        if self.get(cf::WITHDRAWALS_BY_NUMBER, &number_key)?.is_some() {
            return Err(StoreError::WithdrawalAlreadyRegistered);
        }

        let id = self.store.next_withdrawal_id();
        let withdrawal = Withdrawal {
            id,
            user_id: candidate.user_id,
            number: candidate.number,
            sum: candidate.sum,
            processed_at: Utc::now(),
        };

        let value = RocksLedger::serialize(&withdrawal)?;
        self.put(cf::WITHDRAWALS, keys::withdrawal_key(id).to_vec(), value)?;
        self.put(
            cf::WITHDRAWALS_BY_NUMBER,
            number_key,
            id.get().to_be_bytes().to_vec(),
        )?;
        self.put(
            cf::WITHDRAWALS_BY_USER,
            keys::user_withdrawal_key(withdrawal.user_id, withdrawal.processed_at, id),
            Vec::new(),
        )?;

        tracing::debug!(number = %withdrawal.number, id = %id, "registered new withdrawal");
        Ok(withdrawal)
    }

    fn get_withdrawal_by_number(&mut self, number: &OrderNumber) -> Result<Withdrawal> {
        let data = self
            .get(cf::WITHDRAWALS_BY_NUMBER, &keys::withdrawal_number_key(number))?
            .ok_or(StoreError::WithdrawalNotFound)?;
        self.read_withdrawal(WithdrawalId::new(Self::id_from_index(&data)?))
    }

    fn list_withdrawals_for_user(&mut self, user_id: UserId) -> Result<Vec<Withdrawal>> {
        let cf_index = self.store.cf(cf::WITHDRAWALS_BY_USER)?;
        let prefix = keys::user_withdrawals_prefix(user_id);
        let iter = self
            .store
            .db
            .iterator_cf(&cf_index, IteratorMode::From(&prefix, Direction::Forward));

        let mut withdrawals = Vec::new();
        for item in iter {
            let (key, _) = item.map_err(|e| StoreError::Database(e.to_string()))?;
            if !key.starts_with(&prefix) {
                break;
            }
            withdrawals.push(self.read_withdrawal(keys::withdrawal_id_from_index_key(&key))?);
        }
        Ok(withdrawals)
    }

    fn commit(self) -> Result<()> {
        let RocksTx {
            store,
            batch,
            locks,
            ..
        } = self;
        store
            .db
            .write(batch)
            .map_err(|e| StoreError::Database(e.to_string()))?;
        drop(locks);
        Ok(())
    }
}
