//! Authentication: signed auth cookies and the [`AuthUser`] extractor.
//!
//! Registration and login set an HS256 JWT in the `auth` cookie. The
//! extractor accepts that cookie or, equivalently, the token as a
//! bearer `Authorization` header.

use std::sync::Arc;

use axum::extract::FromRequestParts;
use axum::http::header;
use axum::http::request::Parts;
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

use pointmart_core::{User, UserId};

use crate::error::ApiError;
use crate::state::AppState;

/// Name of the cookie carrying the auth token.
pub const COOKIE_NAME: &str = "auth";

/// Token and cookie lifetime in seconds (one year).
const TOKEN_TTL_SECONDS: i64 = 365 * 24 * 60 * 60;

const ISSUER: &str = "pointmart";

/// Claims carried by an auth token.
#[derive(Debug, Serialize, Deserialize)]
pub struct TokenClaims {
    /// User id.
    pub sub: i64,
    /// User login.
    pub login: String,
    /// Expiry, seconds since the epoch.
    pub exp: i64,
    /// Issuer, always `pointmart`.
    pub iss: String,
}

/// Issues and validates HS256 auth tokens.
pub struct TokenIssuer {
    encoding: EncodingKey,
    decoding: DecodingKey,
}

impl TokenIssuer {
    /// Create an issuer from the configured secret key.
    #[must_use]
    pub fn new(secret: &[u8]) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
        }
    }

    /// Issue a signed token for the user.
    ///
    /// # Errors
    ///
    /// Returns an error if signing fails.
    pub fn issue(&self, user: &User) -> Result<String, jsonwebtoken::errors::Error> {
        let claims = TokenClaims {
            sub: user.id.get(),
            login: user.login.clone(),
            exp: (Utc::now() + Duration::seconds(TOKEN_TTL_SECONDS)).timestamp(),
            iss: ISSUER.to_string(),
        };
        encode(&Header::default(), &claims, &self.encoding)
    }

    /// Validate a token and return its claims.
    ///
    /// # Errors
    ///
    /// Returns an error if the signature, expiry, or issuer check fails.
    pub fn verify(&self, token: &str) -> Result<TokenClaims, jsonwebtoken::errors::Error> {
        let mut validation = Validation::default();
        validation.set_issuer(&[ISSUER]);
        decode::<TokenClaims>(token, &self.decoding, &validation).map(|data| data.claims)
    }

    /// Build the `Set-Cookie` value carrying the token.
    #[must_use]
    pub fn cookie(token: &str) -> String {
        format!("{COOKIE_NAME}={token}; Path=/; Max-Age={TOKEN_TTL_SECONDS}; HttpOnly; SameSite=Lax")
    }
}

/// An authenticated user extracted from the auth cookie or a bearer
/// header.
#[derive(Debug, Clone)]
pub struct AuthUser {
    /// The authenticated user's id.
    pub user_id: UserId,
    /// The authenticated user's login.
    pub login: String,
}

impl FromRequestParts<Arc<AppState>> for AuthUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let token = token_from_parts(parts).ok_or(ApiError::Unauthorized)?;
        let claims = state
            .tokens
            .verify(&token)
            .map_err(|_| ApiError::Unauthorized)?;
        Ok(Self {
            user_id: UserId::new(claims.sub),
            login: claims.login,
        })
    }
}

fn token_from_parts(parts: &Parts) -> Option<String> {
    if let Some(cookies) = parts
        .headers
        .get(header::COOKIE)
        .and_then(|value| value.to_str().ok())
    {
        for pair in cookies.split(';') {
            if let Some((name, value)) = pair.trim().split_once('=') {
                if name == COOKIE_NAME {
                    return Some(value.to_string());
                }
            }
        }
    }

    parts
        .headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(ToString::to_string)
}
