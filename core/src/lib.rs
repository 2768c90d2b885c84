//! Core domain types for pointmart.
//!
//! This crate defines the entities shared by the storage layer and the
//! service layer:
//!
//! - Strongly-typed row identifiers ([`UserId`], [`OrderId`], [`WithdrawalId`])
//! - Order numbers with Luhn checksum validation ([`OrderNumber`])
//! - Users and their point balances ([`User`], [`Balance`])
//! - Orders and their processing status ([`Order`], [`OrderStatus`])
//! - Withdrawals ([`Withdrawal`])
//!
//! All monetary values are [`rust_decimal::Decimal`]; floats appear only in
//! wire representations owned by the HTTP layer.

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod ids;
pub mod number;
pub mod order;
pub mod user;
pub mod withdrawal;

pub use ids::{OrderId, UserId, WithdrawalId};
pub use number::{luhn_valid, NumberError, OrderNumber};
pub use order::{Order, OrderCandidate, OrderStatus};
pub use user::{Balance, User};
pub use withdrawal::{Withdrawal, WithdrawalCandidate};
