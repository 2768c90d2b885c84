//! The dispatch queue of orders awaiting an accrual check.
//!
//! A fixed-capacity FIFO of order numbers. Submission pushes here in the
//! same transaction that persists the order; the processing runner pops.
//! A full queue rejects pushes, which surfaces to clients as
//! backpressure.

use std::sync::{Mutex, MutexGuard, PoisonError};

use pointmart_core::OrderNumber;

/// Errors that can occur on queue operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum QueueError {
    /// The queue is at capacity.
    #[error("order processing queue is full")]
    Full,

    /// The queue holds no orders.
    #[error("order processing queue is empty")]
    Empty,

    /// The requested capacity is zero.
    #[error("queue capacity must be positive")]
    ZeroCapacity,
}

/// Ring-buffer state: `len` entries starting at `head`.
#[derive(Debug)]
struct Ring {
    slots: Vec<Option<OrderNumber>>,
    head: usize,
    tail: usize,
    len: usize,
}

/// Bounded in-process FIFO of pending order numbers.
///
/// All operations lock a single mutex for O(1) work, so the queue is
/// linearizable under concurrent callers.
#[derive(Debug)]
pub struct DispatchQueue {
    ring: Mutex<Ring>,
    capacity: usize,
}

impl DispatchQueue {
    /// Create a queue with the given fixed capacity.
    ///
    /// # Errors
    ///
    /// Returns [`QueueError::ZeroCapacity`] if `capacity` is zero.
    pub fn new(capacity: usize) -> Result<Self, QueueError> {
        if capacity == 0 {
            return Err(QueueError::ZeroCapacity);
        }
        Ok(Self {
            ring: Mutex::new(Ring {
                slots: vec![None; capacity],
                head: 0,
                tail: 0,
                len: 0,
            }),
            capacity,
        })
    }

    /// Append an order number to the tail.
    ///
    /// # Errors
    ///
    /// Returns [`QueueError::Full`] when the queue is at capacity.
    pub fn push(&self, number: OrderNumber) -> Result<(), QueueError> {
        let mut ring = self.ring();
        if ring.len == self.capacity {
            return Err(QueueError::Full);
        }
        let tail = ring.tail;
        ring.slots[tail] = Some(number);
        ring.tail = (tail + 1) % self.capacity;
        ring.len += 1;
        Ok(())
    }

    /// Remove and return the order number at the head.
    ///
    /// # Errors
    ///
    /// Returns [`QueueError::Empty`] when the queue holds no orders.
    pub fn pop(&self) -> Result<OrderNumber, QueueError> {
        let mut ring = self.ring();
        if ring.len == 0 {
            return Err(QueueError::Empty);
        }
        let head = ring.head;
        let number = ring.slots[head].take();
        ring.head = (head + 1) % self.capacity;
        ring.len -= 1;
        number.ok_or(QueueError::Empty)
    }

    /// Current number of queued orders.
    #[must_use]
    pub fn len(&self) -> usize {
        self.ring().len
    }

    /// Whether the queue is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The fixed capacity.
    #[must_use]
    pub const fn capacity(&self) -> usize {
        self.capacity
    }

    fn ring(&self) -> MutexGuard<'_, Ring> {
        self.ring.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn number(input: &str) -> OrderNumber {
        OrderNumber::parse(input).unwrap()
    }

    #[test]
    fn rejects_zero_capacity() {
        assert!(matches!(DispatchQueue::new(0), Err(QueueError::ZeroCapacity)));
    }

    #[test]
    fn pop_follows_push_order() {
        let queue = DispatchQueue::new(4).unwrap();
        queue.push(number("79927398713")).unwrap();
        queue.push(number("49927398716")).unwrap();

        assert_eq!(queue.len(), 2);
        assert_eq!(queue.pop().unwrap().as_str(), "79927398713");
        assert_eq!(queue.pop().unwrap().as_str(), "49927398716");
        assert!(matches!(queue.pop(), Err(QueueError::Empty)));
    }

    #[test]
    fn full_queue_rejects_push() {
        let queue = DispatchQueue::new(1).unwrap();
        queue.push(number("79927398713")).unwrap();
        assert!(matches!(
            queue.push(number("49927398716")),
            Err(QueueError::Full)
        ));
        assert_eq!(queue.len(), 1);
    }

    #[test]
    fn ring_wraps_around() {
        let queue = DispatchQueue::new(2).unwrap();
        for round in 0..5 {
            queue.push(number("79927398713")).unwrap();
            queue.push(number("49927398716")).unwrap();
            assert_eq!(queue.len(), 2, "round {round}");
            assert_eq!(queue.pop().unwrap().as_str(), "79927398713");
            assert_eq!(queue.pop().unwrap().as_str(), "49927398716");
            assert!(queue.is_empty());
        }
    }

    #[test]
    fn length_never_exceeds_capacity() {
        let queue = DispatchQueue::new(3).unwrap();
        for _ in 0..10 {
            let _ = queue.push(number("79927398713"));
            assert!(queue.len() <= queue.capacity());
        }
    }
}
