//! Error types for the pointmart client.

/// Errors that can occur when talking to the pointmart service.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The service returned an error response.
    #[error("API error: {status} - {message}")]
    Api {
        /// HTTP status code.
        status: u16,
        /// Error message from the response body.
        message: String,
    },

    /// A login/registration response arrived without the auth cookie.
    #[error("response did not carry an auth cookie")]
    MissingAuthCookie,
}
