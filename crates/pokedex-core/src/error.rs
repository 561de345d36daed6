//! Error types and result aliases shared across the pokedex services.
//!
//! Errors are structured for programmatic handling: the API layer maps each
//! variant onto an HTTP status, and the aggregator records per-identifier
//! failures as values instead of aborting sibling work.

use std::fmt;

/// The result type used throughout the pokedex services.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in pokedex operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The requested identifier range is not a valid domain of upstream ids.
    #[error("invalid range: {message}")]
    InvalidRange {
        /// Description of what made the range invalid.
        message: String,
    },

    /// An upstream catalog lookup failed (network, status, or decode).
    #[error("upstream error: {message}")]
    Upstream {
        /// Description of the upstream failure.
        message: String,
    },

    /// An operation exceeded its deadline.
    #[error("timed out: {message}")]
    Timeout {
        /// Description of the timed-out operation.
        message: String,
    },

    /// The requested resource was not found.
    #[error("not found: {0}")]
    NotFound(String),

    /// A local store query failed.
    #[error("store error: {message}")]
    Store {
        /// Description of the store failure.
        message: String,
        /// The underlying cause, if any.
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// A serialization or deserialization error occurred.
    #[error("serialization error: {message}")]
    Serialization {
        /// Description of the serialization failure.
        message: String,
    },

    /// Invalid input was provided (bad parameter or configuration value).
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// An internal error occurred that should not happen in normal operation.
    #[error("internal error: {message}")]
    Internal {
        /// Description of the internal error.
        message: String,
    },
}

impl Error {
    /// Creates a new invalid-range error with the given message.
    #[must_use]
    pub fn invalid_range(message: impl Into<String>) -> Self {
        Self::InvalidRange {
            message: message.into(),
        }
    }

    /// Creates a new upstream error with the given message.
    #[must_use]
    pub fn upstream(message: impl Into<String>) -> Self {
        Self::Upstream {
            message: message.into(),
        }
    }

    /// Creates a new timeout error with the given message.
    #[must_use]
    pub fn timeout(message: impl Into<String>) -> Self {
        Self::Timeout {
            message: message.into(),
        }
    }

    /// Creates a new store error with the given message.
    #[must_use]
    pub fn store(message: impl Into<String>) -> Self {
        Self::Store {
            message: message.into(),
            source: None,
        }
    }

    /// Creates a new store error with a source cause.
    #[must_use]
    pub fn store_with_source(
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::Store {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Creates a new not-found error for the given resource.
    #[must_use]
    pub fn not_found(resource: impl fmt::Display) -> Self {
        Self::NotFound(resource.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_includes_variant_context() {
        let err = Error::invalid_range("start 5 > end 3");
        assert_eq!(err.to_string(), "invalid range: start 5 > end 3");

        let err = Error::not_found("pokemon bulbasaur");
        assert_eq!(err.to_string(), "not found: pokemon bulbasaur");
    }

    #[test]
    fn store_error_preserves_source() {
        let io = std::io::Error::new(std::io::ErrorKind::Other, "disk gone");
        let err = Error::store_with_source("query failed", io);
        let source = std::error::Error::source(&err).expect("source should be set");
        assert!(source.to_string().contains("disk gone"));
    }
}
