//! Point withdrawals.

use std::sync::Arc;

use rust_decimal::Decimal;

use pointmart_core::{OrderNumber, UserId, Withdrawal, WithdrawalCandidate};
use pointmart_store::{Ledger, LedgerTx, StoreError};

/// Errors surfaced by withdrawal operations.
#[derive(Debug, thiserror::Error)]
pub enum WithdrawalError {
    /// Only positive sums can be withdrawn.
    #[error("can withdraw positive sum only")]
    InvalidSum,

    /// A withdrawal against the same order number already exists.
    #[error("withdrawal for this order has already been registered")]
    AlreadyRegistered,

    /// The user's current balance does not cover the requested sum.
    #[error("insufficient balance for withdrawal")]
    InsufficientBalance,

    /// Underlying storage failure.
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Withdrawal registration and listing.
pub struct WithdrawalService<L> {
    store: Arc<L>,
}

impl<L> Clone for WithdrawalService<L> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
        }
    }
}

impl<L: Ledger> WithdrawalService<L> {
    /// Create the service over the given store.
    pub fn new(store: Arc<L>) -> Self {
        Self { store }
    }

    /// Withdraw `sum` points from the user against a fresh order number.
    ///
    /// The balance debit and the withdrawal record are written in one
    /// transaction; the row lock taken by the debit serializes
    /// concurrent attempts for the same user, so the balance can never
    /// be spent twice.
    ///
    /// # Errors
    ///
    /// - [`WithdrawalError::InvalidSum`] if `sum` is not positive.
    /// - [`WithdrawalError::InsufficientBalance`] if the locked balance
    ///   is below `sum`.
    /// - [`WithdrawalError::AlreadyRegistered`] if the number was used
    ///   for a withdrawal before.
    pub fn request_withdrawal(
        &self,
        number: &OrderNumber,
        user_id: UserId,
        sum: Decimal,
    ) -> Result<Withdrawal, WithdrawalError> {
        if sum <= Decimal::ZERO {
            return Err(WithdrawalError::InvalidSum);
        }

        let mut tx = self.store.begin()?;
        match tx.withdraw_points(user_id, sum) {
            Ok(()) => {}
            Err(StoreError::InsufficientBalance { current, requested }) => {
                tracing::warn!(order = %number, user = %user_id, sum = %sum,
                    current = %current, requested = %requested,
                    "unable to withdraw requested sum from user balance");
                return Err(WithdrawalError::InsufficientBalance);
            }
            Err(err) => return Err(err.into()),
        }

        let withdrawal =
            match tx.add_withdrawal(WithdrawalCandidate::new(number.clone(), user_id, sum)) {
                Ok(withdrawal) => withdrawal,
                Err(StoreError::WithdrawalAlreadyRegistered) => {
                    return Err(WithdrawalError::AlreadyRegistered);
                }
                Err(err) => return Err(err.into()),
            };
        tx.commit()?;

        tracing::info!(order = %withdrawal.number, user = %user_id, sum = %sum,
            "registered new withdrawal");
        Ok(withdrawal)
    }

    /// All withdrawals completed by the user, oldest first.
    ///
    /// # Errors
    ///
    /// Propagates storage errors.
    pub fn list_user_withdrawals(&self, user_id: UserId) -> Result<Vec<Withdrawal>, WithdrawalError> {
        let mut tx = self.store.begin()?;
        Ok(tx.list_withdrawals_for_user(user_id)?)
    }
}

#[cfg(test)]
mod tests {
    use pointmart_store::MemoryLedger;
    use rust_decimal_macros::dec;

    use super::*;

    fn service() -> (WithdrawalService<MemoryLedger>, Arc<MemoryLedger>) {
        let store = Arc::new(MemoryLedger::new());
        (WithdrawalService::new(Arc::clone(&store)), store)
    }

    fn user_with_points(store: &MemoryLedger, points: Decimal) -> UserId {
        let mut tx = store.begin().unwrap();
        let user = tx.create_user("shopper", "hash").unwrap();
        if points > Decimal::ZERO {
            tx.accrue_points(user.id, points).unwrap();
        }
        tx.commit().unwrap();
        user.id
    }

    #[test]
    fn withdrawal_debits_balance_and_records() {
        let (withdrawals, store) = service();
        let shopper = user_with_points(&store, dec!(100.5));
        let number = OrderNumber::parse("2377225624").unwrap();

        let withdrawal = withdrawals
            .request_withdrawal(&number, shopper, dec!(30))
            .unwrap();
        assert_eq!(withdrawal.sum, dec!(30));

        let mut tx = store.begin().unwrap();
        let balance = tx.get_user_by_id(shopper).unwrap().balance;
        assert_eq!(balance.current, dec!(70.5));
        assert_eq!(balance.withdrawn, dec!(30));

        let listed = withdrawals.list_user_withdrawals(shopper).unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].number, number);
    }

    #[test]
    fn non_positive_sums_are_rejected() {
        let (withdrawals, store) = service();
        let shopper = user_with_points(&store, dec!(10));
        let number = OrderNumber::parse("2377225624").unwrap();

        assert!(matches!(
            withdrawals.request_withdrawal(&number, shopper, Decimal::ZERO),
            Err(WithdrawalError::InvalidSum)
        ));
        assert!(matches!(
            withdrawals.request_withdrawal(&number, shopper, dec!(-1)),
            Err(WithdrawalError::InvalidSum)
        ));
    }

    #[test]
    fn insufficient_balance_is_rejected_without_a_record() {
        let (withdrawals, store) = service();
        let shopper = user_with_points(&store, dec!(5));
        let number = OrderNumber::parse("2377225624").unwrap();

        assert!(matches!(
            withdrawals.request_withdrawal(&number, shopper, dec!(5.01)),
            Err(WithdrawalError::InsufficientBalance)
        ));
        assert!(withdrawals.list_user_withdrawals(shopper).unwrap().is_empty());
    }

    #[test]
    fn duplicate_number_rolls_back_the_debit() {
        let (withdrawals, store) = service();
        let shopper = user_with_points(&store, dec!(10));
        let number = OrderNumber::parse("2377225624").unwrap();

        withdrawals
            .request_withdrawal(&number, shopper, dec!(2))
            .unwrap();
        assert!(matches!(
            withdrawals.request_withdrawal(&number, shopper, dec!(2)),
            Err(WithdrawalError::AlreadyRegistered)
        ));

        // The second attempt's debit never took effect.
        let mut tx = store.begin().unwrap();
        let balance = tx.get_user_by_id(shopper).unwrap().balance;
        assert_eq!(balance.current, dec!(8));
        assert_eq!(balance.withdrawn, dec!(2));
    }
}
