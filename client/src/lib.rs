//! Typed HTTP client for the pointmart API.
//!
//! Wraps the service's REST surface: registration, login, order upload,
//! order listing, balances, and withdrawals. Authentication is the
//! service's `auth` cookie, captured at registration/login and carried
//! as an [`AuthToken`].
//!
//! # Example
//!
//! ```no_run
//! use pointmart_client::PointmartClient;
//!
//! # async fn example() -> Result<(), pointmart_client::ClientError> {
//! let client = PointmartClient::new("http://localhost:8000");
//! let (user, token) = client.register("shopper", "secret").await?;
//! client.upload_order(&token, "1234567812345670").await?;
//! let balance = client.balance(&token).await?;
//! println!("{} has {} points", user.login, balance.current);
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

mod client;
mod error;
mod types;

pub use client::{AuthToken, PointmartClient, UploadOutcome};
pub use error::ClientError;
pub use types::{
    Balance, OrderItem, UploadedOrder, UserSummary, WithdrawalItem, WithdrawalReceipt,
};
