//! User accounts: registration, authentication, balances.

use std::sync::Arc;

use pointmart_core::{Balance, User, UserId};
use pointmart_store::{Ledger, LedgerTx, StoreError};

/// Errors surfaced by account operations.
#[derive(Debug, thiserror::Error)]
pub enum AccountError {
    /// Registration or login was attempted with an empty password.
    #[error("password must not be empty")]
    EmptyPassword,

    /// The login is taken, compared case-insensitively.
    #[error("login is occupied by another user")]
    LoginOccupied,

    /// Login/password pair does not match any user.
    #[error("unable to authenticate user with this login/password")]
    InvalidCredentials,

    /// Password hashing failed.
    #[error("password hashing failed: {0}")]
    Hash(String),

    /// Underlying storage failure.
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Bcrypt password hasher with a configurable cost.
///
/// Tests lower the cost to keep registration fast; the service default
/// is bcrypt's `DEFAULT_COST`.
#[derive(Debug, Clone, Copy)]
pub struct PasswordHasher {
    cost: u32,
}

impl PasswordHasher {
    /// Create a hasher with the given bcrypt cost.
    #[must_use]
    pub const fn new(cost: u32) -> Self {
        Self { cost }
    }

    /// Hash a plain password.
    ///
    /// # Errors
    ///
    /// Returns [`AccountError::Hash`] if bcrypt fails.
    pub fn hash(&self, password: &str) -> Result<String, AccountError> {
        bcrypt::hash(password, self.cost).map_err(|err| AccountError::Hash(err.to_string()))
    }

    /// Check a plain password against a stored hash.
    ///
    /// Verification errors (for example a malformed stored hash) are
    /// logged and treated as a mismatch.
    #[must_use]
    pub fn verify(&self, password: &str, hash: &str) -> bool {
        match bcrypt::verify(password, hash) {
            Ok(matches) => matches,
            Err(err) => {
                tracing::error!(error = %err, "unable to verify password hash");
                false
            }
        }
    }
}

impl Default for PasswordHasher {
    fn default() -> Self {
        Self::new(bcrypt::DEFAULT_COST)
    }
}

/// Registration, authentication, and balance reads.
///
/// Passwords are hashed here, at the service layer; the store only ever
/// sees hashes.
pub struct AccountService<L> {
    store: Arc<L>,
    hasher: PasswordHasher,
}

impl<L> Clone for AccountService<L> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            hasher: self.hasher,
        }
    }
}

impl<L: Ledger> AccountService<L> {
    /// Create the service over the given store.
    pub fn new(store: Arc<L>, hasher: PasswordHasher) -> Self {
        Self { store, hasher }
    }

    /// Register a new user.
    ///
    /// # Errors
    ///
    /// - [`AccountError::EmptyPassword`] if the password is empty.
    /// - [`AccountError::LoginOccupied`] if the login is taken in any
    ///   casing.
    pub fn register(&self, login: &str, password: &str) -> Result<User, AccountError> {
        if password.is_empty() {
            return Err(AccountError::EmptyPassword);
        }
        let password_hash = self.hasher.hash(password)?;

        let mut tx = self.store.begin()?;
        let user = match tx.create_user(login, &password_hash) {
            Ok(user) => user,
            Err(StoreError::LoginOccupied) => return Err(AccountError::LoginOccupied),
            Err(err) => return Err(err.into()),
        };
        tx.commit()?;

        tracing::info!(login = %user.login, id = %user.id, "registered new user");
        Ok(user)
    }

    /// Authenticate a user by login and password.
    ///
    /// # Errors
    ///
    /// - [`AccountError::EmptyPassword`] if the password is empty.
    /// - [`AccountError::InvalidCredentials`] if the login is unknown or
    ///   the password does not match.
    pub fn authenticate(&self, login: &str, password: &str) -> Result<User, AccountError> {
        if password.is_empty() {
            return Err(AccountError::EmptyPassword);
        }

        let mut tx = self.store.begin()?;
        let user = match tx.get_user_by_login(login) {
            Ok(user) => user,
            Err(StoreError::UserNotFound) => return Err(AccountError::InvalidCredentials),
            Err(err) => return Err(err.into()),
        };

        if !self.hasher.verify(password, &user.password_hash) {
            tracing::debug!(login = %user.login, "password does not match");
            return Err(AccountError::InvalidCredentials);
        }
        Ok(user)
    }

    /// The user's current balances.
    ///
    /// # Errors
    ///
    /// Returns a storage error if the user does not exist.
    pub fn balance(&self, user_id: UserId) -> Result<Balance, AccountError> {
        let mut tx = self.store.begin()?;
        Ok(tx.get_user_by_id(user_id)?.balance)
    }
}
