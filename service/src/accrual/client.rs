//! Accrual system HTTP client implementation.

use std::time::Duration;

use reqwest::{Client, StatusCode, Url};
use rust_decimal::Decimal;

use pointmart_core::OrderNumber;

use super::types::{OrderAccrual, OrderAccrualBody};

/// Errors that can occur when querying the accrual system.
#[derive(Debug, thiserror::Error)]
pub enum AccrualError {
    /// The configured address is empty or not a valid URL.
    #[error("accrual system address is empty or invalid")]
    InvalidAddress,

    /// The HTTP request could not be performed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The accrual system does not know the order (204).
    #[error("order is not registered in the accrual system")]
    OrderNotRegistered,

    /// The accrual system is rate-limiting us (429) and asked us to
    /// come back after the given number of seconds.
    #[error("accrual system is busy, retry after {retry_after} seconds")]
    TooManyRequests {
        /// Wait requested by the `Retry-After` header, in seconds.
        retry_after: u64,
    },

    /// A 429 arrived without a usable `Retry-After` header.
    #[error("Retry-After header is missing or has an invalid value")]
    InvalidWaitTime,

    /// A 200 arrived with a body we could not interpret.
    #[error("unexpected data in accrual system response")]
    InvalidData,

    /// A response status outside the documented set.
    #[error("unexpected response status from accrual system: {0}")]
    UnexpectedStatus(u16),
}

/// Accrual system API client.
///
/// Stateless: one `GET {base}/api/orders/{number}` per call.
#[derive(Debug, Clone)]
pub struct AccrualClient {
    client: Client,
    base_url: String,
}

impl AccrualClient {
    /// Create a new accrual client for the given base address.
    ///
    /// # Errors
    ///
    /// Returns [`AccrualError::InvalidAddress`] if the address is empty
    /// or does not parse as a URL.
    pub fn new(address: &str) -> Result<Self, AccrualError> {
        if address.is_empty() {
            return Err(AccrualError::InvalidAddress);
        }
        Url::parse(address).map_err(|_| AccrualError::InvalidAddress)?;

        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(AccrualError::Http)?;

        Ok(Self {
            client,
            base_url: address.trim_end_matches('/').to_string(),
        })
    }

    /// Query the accrual system for a single order.
    ///
    /// Outcome mapping:
    ///
    /// | Upstream | Result |
    /// |---|---|
    /// | 200 + valid body | `Ok(OrderAccrual)` |
    /// | 200 + malformed body or negative accrual | `InvalidData` |
    /// | 204 | `OrderNotRegistered` |
    /// | 429 + valid `Retry-After` | `TooManyRequests` |
    /// | 429 otherwise | `InvalidWaitTime` |
    /// | anything else | `UnexpectedStatus` |
    ///
    /// # Errors
    ///
    /// See the table above; transport failures surface as
    /// [`AccrualError::Http`].
    pub async fn check_order(&self, number: &OrderNumber) -> Result<OrderAccrual, AccrualError> {
        let url = format!("{}/api/orders/{}", self.base_url, number);
        let response = self
            .client
            .get(&url)
            .header("Accept", "application/json")
            .send()
            .await?;

        match response.status() {
            StatusCode::NO_CONTENT => Err(AccrualError::OrderNotRegistered),
            StatusCode::TOO_MANY_REQUESTS => {
                let retry_after = response
                    .headers()
                    .get("Retry-After")
                    .and_then(|value| value.to_str().ok())
                    .and_then(|value| value.parse::<u64>().ok());
                match retry_after {
                    Some(seconds) => Err(AccrualError::TooManyRequests {
                        retry_after: seconds,
                    }),
                    None => Err(AccrualError::InvalidWaitTime),
                }
            }
            StatusCode::OK => {
                let body: OrderAccrualBody = response.json().await.map_err(|err| {
                    tracing::warn!(order = %number, error = %err, "unable to parse accrual response");
                    AccrualError::InvalidData
                })?;
                let accrual = Decimal::from_f64_retain(body.accrual)
                    .filter(|value| !value.is_sign_negative())
                    .ok_or(AccrualError::InvalidData)?;
                Ok(OrderAccrual {
                    number: body.number,
                    status: body.status,
                    accrual,
                })
            }
            status => Err(AccrualError::UnexpectedStatus(status.as_u16())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_empty_address() {
        assert!(matches!(
            AccrualClient::new(""),
            Err(AccrualError::InvalidAddress)
        ));
    }

    #[test]
    fn rejects_unparsable_address() {
        assert!(matches!(
            AccrualClient::new("not a url"),
            Err(AccrualError::InvalidAddress)
        ));
    }

    #[test]
    fn trims_trailing_slash() {
        let client = AccrualClient::new("http://localhost:8081/").unwrap();
        assert_eq!(client.base_url, "http://localhost:8081");
    }
}
