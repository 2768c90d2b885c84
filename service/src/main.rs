//! Pointmart Service - loyalty points accounting for the marketplace.
//!
//! This is the main entry point for the pointmart service.

use std::sync::Arc;

use tokio::sync::watch;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use pointmart_service::{
    create_router, processing, AccrualClient, AppState, DispatchQueue, PasswordHasher,
    ServiceConfig,
};
use pointmart_store::RocksLedger;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,pointmart=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting Pointmart Service");

    // Load configuration from environment
    let config = ServiceConfig::from_env();

    tracing::info!(
        listen_addr = %config.listen_addr,
        data_dir = %config.data_dir,
        accrual_address = %config.accrual_address,
        queue_capacity = config.queue_capacity,
        "Service configuration loaded"
    );

    // Initialize the ledger store
    tracing::info!(path = %config.data_dir, "Opening RocksDB store");
    let store = Arc::new(RocksLedger::open(&config.data_dir)?);

    let queue = Arc::new(DispatchQueue::new(config.queue_capacity)?);
    let accrual = Arc::new(AccrualClient::new(&config.accrual_address)?);

    // Build app state
    let state = AppState::new(
        store,
        queue,
        accrual,
        PasswordHasher::default(),
        config.clone(),
    );

    // The dispatch queue is not durable: orders that were waiting when
    // the previous process stopped are rediscovered from stored state.
    let recovered = state.orders.recover_pending()?;
    if recovered > 0 {
        tracing::info!(count = recovered, "Recovered unfinished orders into the queue");
    }

    // Start the background processing runner
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let runner = tokio::spawn(processing::run(state.orders.clone(), shutdown_rx));

    // Create the router
    let app = create_router(state);
    tracing::info!("Router configured with all API endpoints");

    // Start HTTP server
    tracing::info!(listen_addr = %config.listen_addr, "Starting HTTP server");
    let listener = tokio::net::TcpListener::bind(&config.listen_addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    // Stop the runner once the server is down
    let _ = shutdown_tx.send(true);
    runner.await?;

    tracing::info!("Pointmart service stopped");
    Ok(())
}

/// Wait for SIGINT or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = tokio::signal::ctrl_c();

    #[cfg(unix)]
    {
        let mut sigterm = tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to register the SIGTERM handler");
        tokio::select! {
            _ = ctrl_c => {}
            _ = sigterm.recv() => {}
        }
    }

    #[cfg(not(unix))]
    {
        let _ = ctrl_c.await;
    }

    tracing::info!("Shutdown signal received");
}
