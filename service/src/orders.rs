//! Order submission and the processing state machine.
//!
//! Submission persists the order and schedules it on the dispatch queue
//! in one transaction. The processing side repeatedly pops an order,
//! asks the accrual system about it, and either finalizes the order
//! (`INVALID` or `PROCESSED` + balance credit) or returns it to the
//! queue for a later pass.

use std::sync::Arc;
use std::time::Duration;

use rust_decimal::Decimal;

use pointmart_core::{Order, OrderCandidate, OrderNumber, OrderStatus, UserId};
use pointmart_store::{Ledger, LedgerTx, StoreError};

use crate::accrual::{AccrualClient, AccrualError, AccrualStatus, OrderAccrual};
use crate::dispatch::{DispatchQueue, QueueError};

/// Wait before the next processing pass after a finished check.
pub const WAIT_ON_FINISHED: Duration = Duration::from_millis(50);

/// Wait before the next processing pass after an error.
pub const WAIT_ON_ERROR: Duration = Duration::from_millis(100);

/// Wait before the next processing pass when the queue is empty.
pub const WAIT_ON_EMPTY: Duration = Duration::from_secs(1);

/// Errors surfaced by order operations.
#[derive(Debug, thiserror::Error)]
pub enum OrderError {
    /// The same user already uploaded this order number.
    #[error("order has already been uploaded by the same user")]
    AlreadyUploaded,

    /// A different user already uploaded this order number.
    #[error("order has already been uploaded by another user")]
    UploadedByAnotherUser,

    /// The dispatch queue is at capacity.
    #[error("order processing queue is full")]
    QueueFull,

    /// Underlying storage failure.
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Order submission, listing, and one-step processing.
pub struct OrderService<L> {
    store: Arc<L>,
    queue: Arc<DispatchQueue>,
    accrual: Arc<AccrualClient>,
}

impl<L> Clone for OrderService<L> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            queue: Arc::clone(&self.queue),
            accrual: Arc::clone(&self.accrual),
        }
    }
}

impl<L: Ledger> OrderService<L> {
    /// Create the service over the given store, queue, and accrual
    /// client.
    pub fn new(store: Arc<L>, queue: Arc<DispatchQueue>, accrual: Arc<AccrualClient>) -> Self {
        Self {
            store,
            queue,
            accrual,
        }
    }

    /// Accept a new order and schedule it for processing.
    ///
    /// The insert and the enqueue commit or fail together, so a
    /// successful return implies the order is both persisted and
    /// scheduled.
    ///
    /// # Errors
    ///
    /// - [`OrderError::AlreadyUploaded`] if this user uploaded the
    ///   number before.
    /// - [`OrderError::UploadedByAnotherUser`] if another user owns the
    ///   number.
    /// - [`OrderError::QueueFull`] under backpressure; nothing is
    ///   persisted in that case.
    pub fn submit_new_order(
        &self,
        number: &OrderNumber,
        user_id: UserId,
    ) -> Result<Order, OrderError> {
        match self.insert_and_enqueue(number, user_id) {
            Err(OrderError::Store(StoreError::OrderAlreadyExists)) => {
                self.resolve_duplicate(number, user_id)
            }
            result => result,
        }
    }

    fn insert_and_enqueue(
        &self,
        number: &OrderNumber,
        user_id: UserId,
    ) -> Result<Order, OrderError> {
        let mut tx = self.store.begin()?;
        let order = tx.add_order(OrderCandidate::new(number.clone(), user_id))?;
        if let Err(err) = self.queue.push(order.number.clone()) {
            tracing::warn!(order = %order.number, user = %user_id, error = %err,
                "failed to submit new order to queue");
            // Dropping the transaction rolls the insert back: the order
            // must not persist without being enqueued.
            return Err(OrderError::QueueFull);
        }
        tx.commit()?;

        tracing::info!(order = %order.number, user = %user_id, "accepted new order");
        Ok(order)
    }

    fn resolve_duplicate(
        &self,
        number: &OrderNumber,
        user_id: UserId,
    ) -> Result<Order, OrderError> {
        let mut tx = self.store.begin()?;
        let existing = tx.get_order_by_number(number)?;
        if existing.user_id == user_id {
            Err(OrderError::AlreadyUploaded)
        } else {
            Err(OrderError::UploadedByAnotherUser)
        }
    }

    /// Set the status and accrual of the order with the given number.
    ///
    /// # Errors
    ///
    /// Propagates storage errors, including `OrderNotFound` and the
    /// fail-fast `RowLocked`.
    pub fn update_order_status(
        &self,
        number: &OrderNumber,
        status: OrderStatus,
        accrual: Decimal,
    ) -> Result<(), OrderError> {
        let mut tx = self.store.begin()?;
        let order = tx.get_order_by_number(number)?;
        tx.update_order_status(order.id, status, accrual)?;
        tx.commit()?;
        Ok(())
    }

    /// All orders submitted by the user, oldest first.
    ///
    /// # Errors
    ///
    /// Propagates storage errors.
    pub fn list_user_orders(&self, user_id: UserId) -> Result<Vec<Order>, OrderError> {
        let mut tx = self.store.begin()?;
        Ok(tx.list_orders_for_user(user_id)?)
    }

    /// Number of orders currently waiting in the dispatch queue.
    #[must_use]
    pub fn processing_length(&self) -> usize {
        self.queue.len()
    }

    /// Re-enqueue every stored order in non-terminal status.
    ///
    /// Called once at startup: the queue is not durable, so orders that
    /// were waiting when the process stopped must be rediscovered from
    /// stored state. Returns how many orders were enqueued.
    ///
    /// # Errors
    ///
    /// Propagates storage errors.
    pub fn recover_pending(&self) -> Result<usize, OrderError> {
        let mut tx = self.store.begin()?;
        let unfinished = tx.list_unfinished_orders()?;
        drop(tx);

        let mut enqueued = 0;
        for order in unfinished {
            if let Err(err) = self.queue.push(order.number.clone()) {
                tracing::warn!(order = %order.number, error = %err,
                    "queue filled up during recovery sweep");
                break;
            }
            enqueued += 1;
        }
        if enqueued > 0 {
            tracing::info!(count = enqueued, "re-enqueued unfinished orders");
        }
        Ok(enqueued)
    }

    /// Pop one order from the queue and drive it one step toward a
    /// terminal status.
    ///
    /// Returns the duration the caller should wait before the next
    /// invocation; the accrual system's `Retry-After` hint is passed
    /// through when it is rate-limiting us.
    pub async fn process_next_order(&self) -> Duration {
        let number = match self.queue.pop() {
            Ok(number) => number,
            Err(QueueError::Empty) => {
                tracing::debug!("accrual order queue is empty");
                return WAIT_ON_EMPTY;
            }
            Err(err) => {
                tracing::error!(error = %err, "unable to retrieve order from queue");
                return WAIT_ON_ERROR;
            }
        };

        tracing::info!(order = %number, "checking order in accrual system");
        match self.accrual.check_order(&number).await {
            Ok(reply) => self.handle_check_result(&number, &reply),
            Err(err) => self.handle_check_error(&number, &err),
        }
    }

    fn handle_check_error(&self, number: &OrderNumber, err: &AccrualError) -> Duration {
        match err {
            AccrualError::OrderNotRegistered => {
                tracing::warn!(order = %number, "order could not be found in accrual system");
                // Mark it invalid and never return to this order again,
                // unless there is a problem saving the status.
                if let Err(upd_err) =
                    self.update_order_status(number, OrderStatus::Invalid, Decimal::ZERO)
                {
                    tracing::error!(order = %number, error = %upd_err,
                        "failed to mark unknown order invalid");
                    self.requeue(number);
                }
                WAIT_ON_ERROR
            }
            AccrualError::TooManyRequests { retry_after } => {
                tracing::info!(order = %number, wait = retry_after, "accrual system is busy");
                self.requeue(number);
                Duration::from_secs(*retry_after)
            }
            other => {
                tracing::error!(order = %number, error = %other,
                    "failed to check order status at accrual system");
                self.requeue(number);
                WAIT_ON_ERROR
            }
        }
    }

    fn handle_check_result(&self, number: &OrderNumber, reply: &OrderAccrual) -> Duration {
        match reply.status {
            AccrualStatus::Invalid => {
                tracing::info!(order = %number, "order is not eligible for accrual");
                if let Err(err) =
                    self.update_order_status(number, OrderStatus::Invalid, Decimal::ZERO)
                {
                    tracing::warn!(order = %number, error = %err, "failed to handle checked order");
                    self.requeue(number);
                }
                WAIT_ON_FINISHED
            }
            AccrualStatus::Processed => {
                tracing::info!(order = %number, points = %reply.accrual, "points accrued for order");
                if let Err(err) = self.finalize_processed(number, reply.accrual) {
                    tracing::warn!(order = %number, error = %err,
                        "failed to credit processed order");
                    self.requeue(number);
                }
                WAIT_ON_FINISHED
            }
            AccrualStatus::Registered | AccrualStatus::Processing | AccrualStatus::Unknown => {
                // Not final yet; check again on a later pass.
                tracing::info!(order = %number, status = ?reply.status, "order is not processed yet");
                self.requeue(number);
                WAIT_ON_FINISHED
            }
        }
    }

    /// The status write, the owner lookup, and the balance credit join
    /// one transaction; either the order is finalized and paid out, or
    /// nothing happened.
    fn finalize_processed(&self, number: &OrderNumber, accrual: Decimal) -> Result<(), OrderError> {
        let mut tx = self.store.begin()?;
        let order = tx.get_order_by_number(number)?;
        tx.update_order_status(order.id, OrderStatus::Processed, accrual)?;
        if !accrual.is_zero() {
            tx.accrue_points(order.user_id, accrual)?;
        }
        tx.commit()?;
        Ok(())
    }

    fn requeue(&self, number: &OrderNumber) {
        tracing::info!(order = %number, "returning order to queue");
        if let Err(err) = self.queue.push(number.clone()) {
            // The order stays persisted with its prior status; the
            // startup sweep resurrects it on the next run.
            tracing::error!(order = %number, error = %err, "unable to return order to queue");
        }
    }
}

#[cfg(test)]
mod tests {
    use pointmart_store::MemoryLedger;

    use super::*;

    fn service(queue_capacity: usize) -> (OrderService<MemoryLedger>, Arc<MemoryLedger>) {
        let store = Arc::new(MemoryLedger::new());
        let queue = Arc::new(DispatchQueue::new(queue_capacity).unwrap());
        // The accrual system is never contacted by submission paths.
        let accrual = Arc::new(AccrualClient::new("http://localhost:8081").unwrap());
        (
            OrderService::new(Arc::clone(&store), queue, accrual),
            store,
        )
    }

    fn user(store: &MemoryLedger, login: &str) -> UserId {
        let mut tx = store.begin().unwrap();
        let user = tx.create_user(login, "hash").unwrap();
        tx.commit().unwrap();
        user.id
    }

    #[test]
    fn submit_persists_and_enqueues() {
        let (orders, store) = service(4);
        let shopper = user(&store, "shopper");
        let number = OrderNumber::parse("1234567812345670").unwrap();

        let order = orders.submit_new_order(&number, shopper).unwrap();
        assert_eq!(order.status, OrderStatus::New);
        assert_eq!(orders.processing_length(), 1);
        assert_eq!(orders.list_user_orders(shopper).unwrap().len(), 1);
    }

    #[test]
    fn duplicate_submission_reports_owner() {
        let (orders, store) = service(4);
        let alice = user(&store, "alice");
        let bob = user(&store, "bob");
        let number = OrderNumber::parse("1234567812345670").unwrap();

        orders.submit_new_order(&number, alice).unwrap();

        assert!(matches!(
            orders.submit_new_order(&number, alice),
            Err(OrderError::AlreadyUploaded)
        ));
        assert!(matches!(
            orders.submit_new_order(&number, bob),
            Err(OrderError::UploadedByAnotherUser)
        ));
        // The duplicate attempts did not schedule anything.
        assert_eq!(orders.processing_length(), 1);
    }

    #[test]
    fn full_queue_rolls_back_the_insert() {
        let (orders, store) = service(1);
        let shopper = user(&store, "shopper");

        let first = OrderNumber::parse("1234567812345670").unwrap();
        let second = OrderNumber::parse("79927398713").unwrap();

        orders.submit_new_order(&first, shopper).unwrap();
        assert!(matches!(
            orders.submit_new_order(&second, shopper),
            Err(OrderError::QueueFull)
        ));

        // Only the first order persists.
        let listed = orders.list_user_orders(shopper).unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].number, first);
        assert_eq!(orders.processing_length(), 1);

        // The rejected insert was rolled back: retrying reports the full
        // queue again, not a duplicate order.
        assert!(matches!(
            orders.submit_new_order(&second, shopper),
            Err(OrderError::QueueFull)
        ));
    }

    #[test]
    fn recover_pending_enqueues_unfinished_orders() {
        let (orders, store) = service(8);
        let shopper = user(&store, "shopper");

        let open = OrderNumber::parse("1234567812345670").unwrap();
        let done = OrderNumber::parse("79927398713").unwrap();
        orders.submit_new_order(&open, shopper).unwrap();
        orders.submit_new_order(&done, shopper).unwrap();
        orders
            .update_order_status(&done, OrderStatus::Processed, Decimal::ZERO)
            .unwrap();

        // Simulate a restart: the in-memory queue is empty again.
        while orders.queue.pop().is_ok() {}

        let recovered = orders.recover_pending().unwrap();
        assert_eq!(recovered, 1);
        assert_eq!(orders.processing_length(), 1);
        assert_eq!(orders.queue.pop().unwrap(), open);
    }
}
