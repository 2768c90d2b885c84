//! Pointmart HTTP API service.
//!
//! This crate provides the HTTP API and background processing for the
//! pointmart loyalty service:
//!
//! - Registration, login, and signed auth cookies
//! - Order upload with Luhn validation and atomic store + enqueue
//! - The bounded dispatch queue feeding the accrual check loop
//! - The processing runner driving orders to a terminal status
//! - Balance reads and point withdrawals
//!
//! # Authentication
//!
//! Registration and login set an `auth` cookie carrying an HS256 JWT;
//! authenticated routes also accept the token as a bearer header.

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
// Allow some pedantic lints that are noisy for Axum handler functions
#![allow(clippy::missing_errors_doc)] // Axum handlers all return Result
#![allow(clippy::unused_async)] // Handlers over a blocking store stay async for routing

pub mod account;
pub mod accrual;
pub mod auth;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod handlers;
pub mod orders;
pub mod processing;
pub mod routes;
pub mod state;
pub mod withdrawals;

pub use account::{AccountService, PasswordHasher};
pub use accrual::AccrualClient;
pub use config::ServiceConfig;
pub use dispatch::DispatchQueue;
pub use error::ApiError;
pub use orders::OrderService;
pub use routes::create_router;
pub use state::AppState;
pub use withdrawals::WithdrawalService;
