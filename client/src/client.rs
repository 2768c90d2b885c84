//! Pointmart HTTP client implementation.

use std::time::Duration;

use reqwest::header::{COOKIE, SET_COOKIE};
use reqwest::{Client, Response, StatusCode};
use serde::Serialize;

use crate::error::ClientError;
use crate::types::{
    ApiErrorResponse, Balance, OrderItem, UploadedOrder, UserSummary, WithdrawalItem,
    WithdrawalReceipt,
};

/// Auth cookie value captured at registration or login.
#[derive(Debug, Clone)]
pub struct AuthToken(String);

impl AuthToken {
    fn cookie(&self) -> String {
        format!("auth={}", self.0)
    }
}

/// Result of an order upload.
#[derive(Debug, Clone)]
pub enum UploadOutcome {
    /// The order was accepted and scheduled for processing.
    Accepted(UploadedOrder),
    /// The caller uploaded this number before; nothing changed.
    AlreadyUploaded,
}

#[derive(Debug, Serialize)]
struct CredentialsRequest<'a> {
    login: &'a str,
    password: &'a str,
}

#[derive(Debug, Serialize)]
struct WithdrawRequest<'a> {
    order: &'a str,
    sum: f64,
}

/// Pointmart API client.
#[derive(Debug, Clone)]
pub struct PointmartClient {
    client: Client,
    base_url: String,
}

impl PointmartClient {
    /// Create a new client for the given base URL.
    ///
    /// # Panics
    ///
    /// Panics if the HTTP client cannot be built (should not happen with
    /// default settings).
    #[must_use]
    pub fn new(base_url: impl Into<String>) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .expect("Failed to build HTTP client");

        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    /// Register a new user; returns the user and their auth token.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the service rejects the
    /// registration (occupied login, empty password).
    pub async fn register(
        &self,
        login: &str,
        password: &str,
    ) -> Result<(UserSummary, AuthToken), ClientError> {
        self.authenticate("/api/user/register", login, password)
            .await
    }

    /// Log an existing user in; returns the user and their auth token.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the credentials are
    /// rejected.
    pub async fn login(
        &self,
        login: &str,
        password: &str,
    ) -> Result<(UserSummary, AuthToken), ClientError> {
        self.authenticate("/api/user/login", login, password).await
    }

    async fn authenticate(
        &self,
        path: &str,
        login: &str,
        password: &str,
    ) -> Result<(UserSummary, AuthToken), ClientError> {
        let url = format!("{}{path}", self.base_url);
        let response = self
            .client
            .post(&url)
            .json(&CredentialsRequest { login, password })
            .send()
            .await?;

        let token = auth_cookie(&response);
        let user: UserSummary = handle_response(response).await?;
        let token = token.ok_or(ClientError::MissingAuthCookie)?;
        Ok((user, token))
    }

    /// Upload an order number for accrual.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the service rejects the
    /// number (format, foreign owner, full queue).
    pub async fn upload_order(
        &self,
        token: &AuthToken,
        number: &str,
    ) -> Result<UploadOutcome, ClientError> {
        let url = format!("{}/api/user/orders", self.base_url);
        let response = self
            .client
            .post(&url)
            .header(COOKIE, token.cookie())
            .header("Content-Type", "text/plain")
            .body(number.to_string())
            .send()
            .await?;

        if response.status() == StatusCode::OK {
            return Ok(UploadOutcome::AlreadyUploaded);
        }
        let order: UploadedOrder = handle_response(response).await?;
        Ok(UploadOutcome::Accepted(order))
    }

    /// List the caller's orders, oldest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    pub async fn orders(&self, token: &AuthToken) -> Result<Vec<OrderItem>, ClientError> {
        let url = format!("{}/api/user/orders", self.base_url);
        let response = self
            .client
            .get(&url)
            .header(COOKIE, token.cookie())
            .send()
            .await?;

        if response.status() == StatusCode::NO_CONTENT {
            return Ok(Vec::new());
        }
        handle_response(response).await
    }

    /// The caller's current and withdrawn points.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    pub async fn balance(&self, token: &AuthToken) -> Result<Balance, ClientError> {
        let url = format!("{}/api/user/balance", self.base_url);
        let response = self
            .client
            .get(&url)
            .header(COOKIE, token.cookie())
            .send()
            .await?;
        handle_response(response).await
    }

    /// Withdraw points against a fresh order number.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the service rejects the
    /// withdrawal (insufficient balance, duplicate number, bad format).
    pub async fn withdraw(
        &self,
        token: &AuthToken,
        order: &str,
        sum: f64,
    ) -> Result<WithdrawalReceipt, ClientError> {
        let url = format!("{}/api/user/balance/withdraw", self.base_url);
        let response = self
            .client
            .post(&url)
            .header(COOKIE, token.cookie())
            .json(&WithdrawRequest { order, sum })
            .send()
            .await?;
        handle_response(response).await
    }

    /// List the caller's withdrawals, oldest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    pub async fn withdrawals(&self, token: &AuthToken) -> Result<Vec<WithdrawalItem>, ClientError> {
        let url = format!("{}/api/user/balance/withdrawals", self.base_url);
        let response = self
            .client
            .get(&url)
            .header(COOKIE, token.cookie())
            .send()
            .await?;

        if response.status() == StatusCode::NO_CONTENT {
            return Ok(Vec::new());
        }
        handle_response(response).await
    }
}

/// Extract the `auth` cookie from a response, if present.
fn auth_cookie(response: &Response) -> Option<AuthToken> {
    response
        .headers()
        .get_all(SET_COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .find_map(|cookie| {
            let (name, rest) = cookie.split_once('=')?;
            if name.trim() != "auth" {
                return None;
            }
            let value = rest.split(';').next()?.trim();
            Some(AuthToken(value.to_string()))
        })
}

/// Parse a success body or convert an error response.
async fn handle_response<T: serde::de::DeserializeOwned>(
    response: Response,
) -> Result<T, ClientError> {
    let status = response.status();

    if status.is_success() {
        return Ok(response.json().await?);
    }

    let message = match response.json::<ApiErrorResponse>().await {
        Ok(body) => body.error.message,
        Err(_) => format!("HTTP {status}"),
    };
    Err(ClientError::Api {
        status: status.as_u16(),
        message,
    })
}
