//! Error types with credential sanitization.
//!
//! Errors raised while talking to the catalog service never carry the access
//! token. Persistence errors keep the underlying `sqlx` error as their source
//! so callers can inspect constraint violations.

use thiserror::Error;

/// Main error type for LakeSurveyor operations.
///
/// # Security
/// Error messages never include access tokens or authorization headers.
#[derive(Debug, Error)]
pub enum LakeSurveyorError {
    /// Catalog service unreachable or credentials rejected
    #[error("Catalog connection failed: {context}")]
    Connection {
        context: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// A single column statistic could not be computed
    #[error("Profiling failed: {context}")]
    Profiling { context: String },

    /// Local store write or read failed
    #[error("Persistence failed: {context}")]
    Persistence {
        context: String,
        #[source]
        source: sqlx::Error,
    },

    /// Configuration or validation error
    #[error("Configuration error: {message}")]
    Configuration { message: String },

    /// Remote SQL statement failed or returned an unusable result
    #[error("Query execution failed: {context}")]
    QueryExecution { context: String },

    /// I/O operation failed
    #[error("I/O operation failed: {context}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },

    /// Serialization or deserialization failed
    #[error("Serialization failed: {context}")]
    Serialization {
        context: String,
        #[source]
        source: serde_json::Error,
    },
}

/// Convenience type alias for Results with LakeSurveyorError
pub type Result<T> = std::result::Result<T, LakeSurveyorError>;

/// Masks a bearer token for display.
///
/// Keeps at most the first four characters so operators can tell tokens
/// apart without exposing them.
///
/// # Example
///
/// ```rust
/// use lakesurveyor_core::error::redact_token;
///
/// assert_eq!(redact_token("dapi0123456789abcdef"), "dapi****");
/// assert_eq!(redact_token("abc"), "****");
/// ```
pub fn redact_token(token: &str) -> String {
    if token.chars().count() <= 8 {
        return "****".to_string();
    }
    let prefix: String = token.chars().take(4).collect();
    format!("{}****", prefix)
}

/// Removes any occurrence of `secret` from `message`.
///
/// Used on messages that echo request details back from the remote
/// service.
pub fn scrub_secret(message: &str, secret: &str) -> String {
    if secret.is_empty() {
        return message.to_string();
    }
    message.replace(secret, "****")
}

impl LakeSurveyorError {
    /// Creates a connection error with sanitized context
    pub fn connection_failed<E>(context: impl Into<String>, error: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::Connection {
            context: context.into(),
            source: Box::new(error),
        }
    }

    /// Creates a connection error without an underlying source error.
    ///
    /// Used for HTTP status failures such as rejected credentials.
    pub fn connection_refused(context: impl Into<String>) -> Self {
        let context = context.into();
        Self::Connection {
            source: Box::new(std::io::Error::new(
                std::io::ErrorKind::ConnectionRefused,
                context.clone(),
            )),
            context,
        }
    }

    /// Creates a persistence error with context
    pub fn persistence_failed(context: impl Into<String>, error: sqlx::Error) -> Self {
        Self::Persistence {
            context: context.into(),
            source: error,
        }
    }

    /// Creates a profiling error
    pub fn profiling_failed(context: impl Into<String>) -> Self {
        Self::Profiling {
            context: context.into(),
        }
    }

    /// Creates a configuration error
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    /// Creates a query execution error
    pub fn query_failed(context: impl Into<String>) -> Self {
        Self::QueryExecution {
            context: context.into(),
        }
    }

    /// Returns true for errors raised by the remote catalog service.
    pub fn is_connection_error(&self) -> bool {
        matches!(self, Self::Connection { .. })
    }

    /// Returns true for local store failures.
    pub fn is_persistence_error(&self) -> bool {
        matches!(self, Self::Persistence { .. })
    }
}
