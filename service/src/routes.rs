//! Router configuration.
//!
//! This module sets up the Axum router with all routes and middleware.

use std::sync::Arc;
use std::time::Duration;

use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use crate::handlers::{balance, health, orders, users};
use crate::state::AppState;

/// Create the service router with all routes and middleware.
///
/// # Routes
///
/// ## Public
/// - `GET /health` - Health check
/// - `POST /api/user/register` - Register and log in
/// - `POST /api/user/login` - Log in
///
/// ## Authenticated (auth cookie or bearer token)
/// - `POST /api/user/orders` - Upload an order number
/// - `GET /api/user/orders` - List uploaded orders
/// - `GET /api/user/balance` - Current and withdrawn points
/// - `POST /api/user/balance/withdraw` - Withdraw points
/// - `GET /api/user/balance/withdrawals` - List withdrawals
pub fn create_router(state: AppState) -> Router {
    // Extract config values before moving state
    let cors_origins = state.config.cors_origins.clone();
    let max_body_bytes = state.config.max_body_bytes;
    let request_timeout_seconds = state.config.request_timeout_seconds;

    let cors = build_cors_layer(&cors_origins);

    let state = Arc::new(state);

    Router::new()
        // Health (public)
        .route("/health", get(health::health))
        // Accounts
        .route("/api/user/register", post(users::register))
        .route("/api/user/login", post(users::login))
        // Orders
        .route(
            "/api/user/orders",
            post(orders::upload_order).get(orders::list_orders),
        )
        // Balance
        .route("/api/user/balance", get(balance::show_balance))
        .route(
            "/api/user/balance/withdraw",
            post(balance::request_withdrawal),
        )
        .route(
            "/api/user/balance/withdrawals",
            get(balance::list_withdrawals),
        )
        // Middleware
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .layer(RequestBodyLimitLayer::new(max_body_bytes))
        .layer(TimeoutLayer::new(Duration::from_secs(
            request_timeout_seconds,
        )))
        .with_state(state)
}

/// Build the CORS layer from configured origins.
fn build_cors_layer(origins: &[String]) -> CorsLayer {
    if origins.iter().any(|origin| origin == "*") {
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any)
    } else {
        let origins: Vec<_> = origins.iter().filter_map(|origin| origin.parse().ok()).collect();

        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods(Any)
            .allow_headers(Any)
    }
}
