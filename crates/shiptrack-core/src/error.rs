//! Error types for the shipment tracking system
//!
//! This module defines all error types used throughout the crate.

use thiserror::Error;

/// Result type alias for tracking operations
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for the shipment tracking system
#[derive(Error, Debug)]
pub enum Error {
    /// Courier API errors (upstream fetch failures)
    #[error("courier API error: {0}")]
    CourierApi(String),

    /// Tracked-set store errors
    #[error("tracked-set store error: {0}")]
    TrackedStore(String),

    /// Configuration errors
    #[error("configuration error: {0}")]
    Config(String),

    /// Network-related errors
    #[error("network error: {0}")]
    Network(#[from] std::io::Error),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// HTTP client errors (from courier APIs)
    #[error("HTTP error: {0}")]
    Http(String),

    /// Authentication errors
    #[error("authentication failed: {0}")]
    Authentication(String),

    /// Rate limiting errors
    #[error("rate limited: {0}")]
    RateLimited(String),

    /// Resource not found
    #[error("not found: {0}")]
    NotFound(String),

    /// Invalid input
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// Courier-specific error
    #[error("courier error ({courier}): {message}")]
    Courier {
        /// Courier name
        courier: String,
        /// Error message
        message: String,
    },

    /// Generic error with context
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Create a courier API error
    pub fn courier_api(msg: impl Into<String>) -> Self {
        Self::CourierApi(msg.into())
    }

    /// Create a tracked-set store error
    pub fn tracked_store(msg: impl Into<String>) -> Self {
        Self::TrackedStore(msg.into())
    }

    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create an HTTP error
    pub fn http(msg: impl Into<String>) -> Self {
        Self::Http(msg.into())
    }

    /// Create an authentication error
    pub fn auth(msg: impl Into<String>) -> Self {
        Self::Authentication(msg.into())
    }

    /// Create a rate limit error
    pub fn rate_limited(msg: impl Into<String>) -> Self {
        Self::RateLimited(msg.into())
    }

    /// Create a "not found" error
    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    /// Create an invalid input error
    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Self::InvalidInput(msg.into())
    }

    /// Create a courier-specific error
    pub fn courier(courier: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Courier {
            courier: courier.into(),
            message: message.into(),
        }
    }

    /// Map an HTTP status from a courier API to the matching error variant
    ///
    /// Used by all courier client crates so they report failures uniformly:
    /// 401/403 as authentication, 404 as not-found, 429 as rate limit and
    /// 5xx as transient courier errors.
    pub fn from_http_status(courier: &str, status: u16, body: &str) -> Self {
        match status {
            401 | 403 => Self::Authentication(format!(
                "{} rejected credentials (status {})",
                courier, status
            )),
            404 => Self::NotFound(format!("{} resource not found (status {})", courier, status)),
            429 => Self::RateLimited(format!("{} rate limit exceeded (status {})", courier, status)),
            500..=599 => Self::Courier {
                courier: courier.to_string(),
                message: format!("server error (transient): {} - {}", status, body),
            },
            _ => Self::Courier {
                courier: courier.to_string(),
                message: format!("request failed: {} - {}", status, body),
            },
        }
    }
}

/// Helper for converting anyhow::Error to our Error type
impl From<anyhow::Error> for Error {
    fn from(err: anyhow::Error) -> Self {
        Self::Other(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn http_status_mapping() {
        assert!(matches!(
            Error::from_http_status("inpost", 401, ""),
            Error::Authentication(_)
        ));
        assert!(matches!(
            Error::from_http_status("dpd", 429, ""),
            Error::RateLimited(_)
        ));
        assert!(matches!(
            Error::from_http_status("dhl", 503, "maintenance"),
            Error::Courier { .. }
        ));
        assert!(matches!(
            Error::from_http_status("pocztex", 404, ""),
            Error::NotFound(_)
        ));
    }
}
