//! Session token error types.

use thiserror::Error;

/// Why an App Bridge session token was rejected.
#[derive(Debug, Error)]
pub enum SessionTokenError {
    /// No token on the request.
    #[error("missing session token")]
    Missing,

    /// Signature, expiry, audience or shape check failed.
    #[error("invalid session token: {0}")]
    Invalid(#[from] jsonwebtoken::errors::Error),

    /// `dest` is not a shop URL.
    #[error("session token destination is not a shop: {0}")]
    InvalidDestination(String),
}
