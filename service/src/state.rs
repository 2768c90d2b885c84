//! Application state.

use std::sync::Arc;

use pointmart_store::RocksLedger;

use crate::account::{AccountService, PasswordHasher};
use crate::accrual::AccrualClient;
use crate::auth::TokenIssuer;
use crate::config::ServiceConfig;
use crate::dispatch::DispatchQueue;
use crate::orders::OrderService;
use crate::withdrawals::WithdrawalService;

/// Application state shared across handlers.
pub struct AppState {
    /// Registration, authentication, balances.
    pub accounts: AccountService<RocksLedger>,

    /// Order submission and processing.
    pub orders: OrderService<RocksLedger>,

    /// Withdrawal registration and listing.
    pub withdrawals: WithdrawalService<RocksLedger>,

    /// Auth token issuer.
    pub tokens: TokenIssuer,

    /// Service configuration.
    pub config: ServiceConfig,
}

impl AppState {
    /// Wire the services over a shared store, queue, and accrual client.
    #[must_use]
    pub fn new(
        store: Arc<RocksLedger>,
        queue: Arc<DispatchQueue>,
        accrual: Arc<AccrualClient>,
        hasher: PasswordHasher,
        config: ServiceConfig,
    ) -> Self {
        let tokens = TokenIssuer::new(config.secret_key.as_bytes());
        Self {
            accounts: AccountService::new(Arc::clone(&store), hasher),
            orders: OrderService::new(Arc::clone(&store), queue, accrual),
            withdrawals: WithdrawalService::new(store),
            tokens,
            config,
        }
    }
}
