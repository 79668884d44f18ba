//! Error types for the storefront client.
//!
//! Library code returns [`Result`]; the binary wraps these in `anyhow` at
//! its edges.

use crate::storage::StorageError;

/// Result type for storefront operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Storefront errors with structured context.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
    /// Transport failure talking to the backend (DNS, connect, timeout).
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    /// Backend answered with a non-success status.
    #[error("backend returned {status}: {message}")]
    Backend { status: u16, message: String },

    /// Persistent store failure.
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),

    /// JSON encoding or decoding failure.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),

    /// An operation that needs a session was attempted without one.
    #[error("not authenticated")]
    Unauthenticated,

    /// Caller supplied something unusable.
    #[error("invalid input: {0}")]
    InvalidInput(String),
}

impl Error {
    /// Create a backend error from a status code and message.
    pub fn backend(status: u16, message: impl Into<String>) -> Self {
        Self::Backend {
            status,
            message: message.into(),
        }
    }

    /// Create a configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Whether the failure is transient (network or 5xx).
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Network(e) => e.is_timeout() || e.is_connect() || e.is_request(),
            Self::Backend { status, .. } => *status >= 500,
            _ => false,
        }
    }

    /// Whether the backend rejected the credentials.
    pub const fn is_unauthorized(&self) -> bool {
        matches!(
            self,
            Self::Unauthenticated | Self::Backend { status: 401 | 403, .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backend_error_display() {
        let err = Error::backend(404, "product not found");
        assert_eq!(err.to_string(), "backend returned 404: product not found");
    }

    #[test]
    fn test_retryable_classification() {
        assert!(Error::backend(503, "unavailable").is_retryable());
        assert!(!Error::backend(400, "bad request").is_retryable());
        assert!(!Error::Unauthenticated.is_retryable());
    }

    #[test]
    fn test_unauthorized_classification() {
        assert!(Error::backend(401, "expired").is_unauthorized());
        assert!(Error::backend(403, "forbidden").is_unauthorized());
        assert!(Error::Unauthenticated.is_unauthorized());
        assert!(!Error::backend(500, "boom").is_unauthorized());
    }
}
