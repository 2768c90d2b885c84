//! Registration and login handlers.

use std::sync::Arc;

use axum::extract::State;
use axum::http::{header, HeaderName};
use axum::response::AppendHeaders;
use axum::Json;
use serde::{Deserialize, Serialize};

use pointmart_core::{User, UserId};

use crate::auth::TokenIssuer;
use crate::error::ApiError;
use crate::state::AppState;

/// Login/password pair used by both registration and login.
#[derive(Debug, Deserialize)]
pub struct CredentialsRequest {
    /// Desired or existing login.
    pub login: String,
    /// Plain password; hashed before it reaches the store.
    pub password: String,
}

/// Public view of a user.
#[derive(Debug, Serialize)]
pub struct UserResponse {
    /// User id.
    pub id: UserId,
    /// User login, lower-cased.
    pub login: String,
}

type AuthedResponse = (
    AppendHeaders<[(HeaderName, String); 1]>,
    Json<UserResponse>,
);

/// Register a new user and log them in.
pub async fn register(
    State(state): State<Arc<AppState>>,
    Json(body): Json<CredentialsRequest>,
) -> Result<AuthedResponse, ApiError> {
    let login = body.login.trim();
    let password = body.password.trim();
    if login.is_empty() {
        return Err(ApiError::BadRequest("login is required".into()));
    }
    if password.is_empty() {
        return Err(ApiError::BadRequest("password is required".into()));
    }

    let user = state.accounts.register(login, password)?;
    respond_with_auth(&state, &user)
}

/// Authenticate an existing user.
pub async fn login(
    State(state): State<Arc<AppState>>,
    Json(body): Json<CredentialsRequest>,
) -> Result<AuthedResponse, ApiError> {
    if body.login.trim().is_empty() || body.password.is_empty() {
        return Err(ApiError::BadRequest("login and password are required".into()));
    }

    let user = state
        .accounts
        .authenticate(body.login.trim(), &body.password)?;
    tracing::info!(login = %user.login, id = %user.id, "user logged in");
    respond_with_auth(&state, &user)
}

fn respond_with_auth(state: &AppState, user: &User) -> Result<AuthedResponse, ApiError> {
    let token = state
        .tokens
        .issue(user)
        .map_err(|err| ApiError::Internal(err.to_string()))?;
    Ok((
        AppendHeaders([(header::SET_COOKIE, TokenIssuer::cookie(&token))]),
        Json(UserResponse {
            id: user.id,
            login: user.login.clone(),
        }),
    ))
}
