//! Error types for athena-glance.
//!
//! Defines the main error enum used throughout the application.

use thiserror::Error;

/// Main error type for athena-glance operations.
#[derive(Error, Debug)]
pub enum AthenaError {
    /// Transport or service errors returned by a remote call (throttling,
    /// access denied, invalid request, network failures).
    #[error("Service error: {0}")]
    Service(String),

    /// The query reached the FAILED state. Carries the service-reported
    /// reason, which may be empty.
    #[error("Query failed: {0}")]
    QueryFailed(String),

    /// The first result page carried no column metadata.
    #[error("Result set is missing column metadata")]
    MissingColumnMetadata,

    /// A credential supplier failed (unreadable file, malformed profile, etc.)
    #[error("Credentials error: {0}")]
    Credentials(String),

    /// Configuration errors (invalid config file, unknown connection, etc.)
    #[error("Configuration error: {0}")]
    Config(String),

    /// Local state database errors.
    #[error("Persistence error: {0}")]
    Persistence(String),

    /// Internal application errors (unexpected states, bugs, etc.)
    #[error("Internal error: {0}")]
    Internal(String),
}

impl AthenaError {
    /// Creates a service error with the given message.
    pub fn service(msg: impl Into<String>) -> Self {
        Self::Service(msg.into())
    }

    /// Creates a query-failed error with the given reason.
    pub fn query_failed(reason: impl Into<String>) -> Self {
        Self::QueryFailed(reason.into())
    }

    /// Creates a credentials error with the given message.
    pub fn credentials(msg: impl Into<String>) -> Self {
        Self::Credentials(msg.into())
    }

    /// Creates a configuration error with the given message.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Creates a persistence error with the given message.
    pub fn persistence(msg: impl Into<String>) -> Self {
        Self::Persistence(msg.into())
    }

    /// Creates an internal error with the given message.
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    /// Returns the error category as a string for display purposes.
    pub fn category(&self) -> &'static str {
        match self {
            Self::Service(_) => "Service Error",
            Self::QueryFailed(_) => "Query Error",
            Self::MissingColumnMetadata => "Result Error",
            Self::Credentials(_) => "Credentials Error",
            Self::Config(_) => "Configuration Error",
            Self::Persistence(_) => "Persistence Error",
            Self::Internal(_) => "Internal Error",
        }
    }
}

/// Result type alias using AthenaError.
pub type Result<T> = std::result::Result<T, AthenaError>;
