//! Client for the external accrual system.
//!
//! The accrual system is queried one order at a time over HTTP; see
//! [`AccrualClient::check_order`] for the full outcome mapping.

mod client;
mod types;

pub use client::{AccrualClient, AccrualError};
pub use types::{AccrualStatus, OrderAccrual};
