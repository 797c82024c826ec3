//! Remote API error types
//!
//! Structured errors for the drive and token endpoints. Maps HTTP status
//! codes to specific variants so callers can tell auth expiry apart from
//! transient failures.

/// Remote service error types
#[derive(Debug, thiserror::Error)]
pub enum RemoteError {
    #[error("Authentication expired — token needs refresh")]
    AuthExpired,

    #[error("Rate limited — try again later")]
    RateLimited,

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Server error ({0}): {1}")]
    Server(u16, String),

    #[error("Request timeout")]
    Timeout,

    #[error("Request error: {0}")]
    Request(String),
}

impl RemoteError {
    /// Create a RemoteError from an HTTP status code and response body
    pub fn from_status(status: u16, body: &str) -> Self {
        match status {
            401 => RemoteError::AuthExpired,
            403 => RemoteError::Forbidden(body.to_string()),
            404 => RemoteError::NotFound(body.to_string()),
            408 => RemoteError::Timeout,
            429 => RemoteError::RateLimited,
            500..=599 => RemoteError::Server(status, body.to_string()),
            _ => RemoteError::Request(format!("HTTP {}: {}", status, body)),
        }
    }

    /// Classify a transport-level failure from the HTTP client.
    pub fn from_transport(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            RemoteError::Timeout
        } else {
            RemoteError::Network(err.to_string())
        }
    }
}
