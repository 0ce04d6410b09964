//! Domain error types
//!
//! This module defines the error hierarchy for threat-migrate. Store adapters
//! convert driver errors into [`MigrateError`] so no third-party error type
//! leaks past the adapter layer.
//!
//! Two layers exist:
//! - [`MigrateError`] is the `Result` error of every fallible operation.
//! - [`MigrationError`] is a classified, per-document or per-batch record that
//!   the orchestrator counts and logs without aborting the run.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt;
use thiserror::Error;

/// Error message fragments that identify a transient fault.
///
/// Matched case-insensitively against the rendered error message.
pub const TRANSIENT_SIGNATURES: &[&str] = &[
    "connection refused",
    "connection reset",
    "timeout",
    "temporary failure",
    "network is unreachable",
    "no such host",
    "connection timed out",
    "i/o timeout",
    "broken pipe",
    "connection lost",
    "server closed the connection",
    "deadlock detected",
    "lock wait timeout",
    "too many connections",
];

/// Returns true when `message` contains one of the [`TRANSIENT_SIGNATURES`].
pub fn is_transient_message(message: &str) -> bool {
    let lowered = message.to_lowercase();
    TRANSIENT_SIGNATURES
        .iter()
        .any(|signature| lowered.contains(signature))
}

/// Main threat-migrate error type
#[derive(Debug, Error)]
pub enum MigrateError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Source store (MongoDB) errors
    #[error("Source error: {0}")]
    Source(String),

    /// Destination store errors
    #[error("Database error: {0}")]
    Database(String),

    /// Network/connection errors
    #[error("Connection error: {0}")]
    Connection(String),

    /// An operation exceeded its deadline
    #[error("Operation timeout: {0}")]
    Timeout(String),

    /// Malformed input document
    #[error("Validation error: {0}")]
    Validation(String),

    /// Normalization or dimension resolution failure
    #[error("Transformation error: {0}")]
    Transformation(String),

    /// Serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(String),

    /// Work abandoned because shutdown was requested
    #[error("Cancelled: {0}")]
    Cancelled(String),

    /// Generic errors with context
    #[error("{0}")]
    Other(String),
}

impl MigrateError {
    /// Whether retrying the failed operation may succeed.
    ///
    /// Connection and timeout errors are retryable by type. Everything else
    /// falls back to matching the message against [`TRANSIENT_SIGNATURES`].
    pub fn is_retryable(&self) -> bool {
        match self {
            MigrateError::Connection(_) | MigrateError::Timeout(_) => true,
            MigrateError::Configuration(_)
            | MigrateError::Validation(_)
            | MigrateError::Cancelled(_) => false,
            other => is_transient_message(&other.to_string()),
        }
    }

    /// The taxonomy class this error is reported under.
    pub fn kind(&self) -> ErrorKind {
        match self {
            MigrateError::Validation(_) => ErrorKind::Validation,
            MigrateError::Transformation(_) => ErrorKind::Transformation,
            MigrateError::Database(_) => ErrorKind::Database,
            MigrateError::Connection(_) | MigrateError::Timeout(_) | MigrateError::Source(_) => {
                ErrorKind::Network
            }
            _ => ErrorKind::Unknown,
        }
    }
}

/// Error classes counted by the orchestrator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum ErrorKind {
    Validation,
    Transformation,
    Database,
    Network,
    Unknown,
}

impl ErrorKind {
    /// All classes, in reporting order.
    pub const ALL: [ErrorKind; 5] = [
        ErrorKind::Validation,
        ErrorKind::Transformation,
        ErrorKind::Database,
        ErrorKind::Network,
        ErrorKind::Unknown,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::Validation => "VALIDATION_ERROR",
            ErrorKind::Transformation => "TRANSFORMATION_ERROR",
            ErrorKind::Database => "DATABASE_ERROR",
            ErrorKind::Network => "NETWORK_ERROR",
            ErrorKind::Unknown => "UNKNOWN_ERROR",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A classified failure attached to one source document or batch
#[derive(Debug, Clone, Serialize)]
pub struct MigrationError {
    /// Error class
    pub kind: ErrorKind,

    /// Source document identifier, or a batch label for batch-level failures
    pub document_id: String,

    /// Error message
    pub message: String,

    /// When the error was recorded
    pub timestamp: DateTime<Utc>,

    /// Whether the underlying cause looked transient
    pub retryable: bool,
}

impl MigrationError {
    /// Creates a new error record; retryability is derived from the message
    pub fn new(kind: ErrorKind, document_id: impl Into<String>, message: impl Into<String>) -> Self {
        let message = message.into();
        let retryable = kind != ErrorKind::Validation && is_transient_message(&message);
        Self {
            kind,
            document_id: document_id.into(),
            message,
            timestamp: Utc::now(),
            retryable,
        }
    }

    pub fn validation(document_id: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Validation, document_id, message)
    }

    pub fn transformation(document_id: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Transformation, document_id, message)
    }

    pub fn database(document_id: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Database, document_id, message)
    }

    /// Builds a record from a crate error, keeping its typed retryability
    pub fn from_error(document_id: impl Into<String>, err: &MigrateError) -> Self {
        let mut record = Self::new(err.kind(), document_id, err.to_string());
        record.retryable = err.is_retryable();
        record
    }

    /// Overrides the derived retryability
    pub fn with_retryable(mut self, retryable: bool) -> Self {
        self.retryable = retryable;
        self
    }
}

impl fmt::Display for MigrationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}] document {}: {} (retryable: {})",
            self.kind, self.document_id, self.message, self.retryable
        )
    }
}

// Conversion from std::io::Error
impl From<std::io::Error> for MigrateError {
    fn from(err: std::io::Error) -> Self {
        MigrateError::Io(err.to_string())
    }
}

// Conversion from serde_json::Error
impl From<serde_json::Error> for MigrateError {
    fn from(err: serde_json::Error) -> Self {
        MigrateError::Serialization(err.to_string())
    }
}

// Conversion from toml parse errors
impl From<toml::de::Error> for MigrateError {
    fn from(err: toml::de::Error) -> Self {
        MigrateError::Configuration(format!("TOML parse error: {err}"))
    }
}
