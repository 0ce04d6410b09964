//! Error context extension trait
//!
//! Works like `anyhow::Context` for `Result<T, MigrateError>`, except the
//! error keeps its variant. Retryability and the reported [`ErrorKind`]
//! survive the added context.
//!
//! [`ErrorKind`]: crate::domain::ErrorKind
//!
//! # Examples
//!
//! ```rust
//! use threat_migrate::domain::{MigrateError, Result};
//! use threat_migrate::domain::context::ResultExt;
//!
//! fn read_offset(batch: u64) -> Result<u64> {
//!     fetch(batch).with_context(|| format!("Failed to read batch {}", batch))
//! }
//! # fn fetch(batch: u64) -> Result<u64> { Ok(batch) }
//! ```

use crate::domain::errors::MigrateError;
use crate::domain::result::Result;

/// Adds context to errors while keeping the [`MigrateError`] variant
pub trait ResultExt<T> {
    /// Prefixes the error message with `context`
    fn context<C>(self, context: C) -> Result<T>
    where
        C: std::fmt::Display;

    /// Like [`ResultExt::context`], evaluated only on error
    fn with_context<C, F>(self, f: F) -> Result<T>
    where
        C: std::fmt::Display,
        F: FnOnce() -> C;
}

impl<T, E> ResultExt<T> for std::result::Result<T, E>
where
    E: Into<MigrateError>,
{
    fn context<C>(self, context: C) -> Result<T>
    where
        C: std::fmt::Display,
    {
        self.map_err(|e| prefixed(e.into(), &context))
    }

    fn with_context<C, F>(self, f: F) -> Result<T>
    where
        C: std::fmt::Display,
        F: FnOnce() -> C,
    {
        self.map_err(|e| prefixed(e.into(), &f()))
    }
}

fn prefixed(err: MigrateError, context: &dyn std::fmt::Display) -> MigrateError {
    let wrap = |message: String| format!("{context}: {message}");
    match err {
        MigrateError::Configuration(m) => MigrateError::Configuration(wrap(m)),
        MigrateError::Source(m) => MigrateError::Source(wrap(m)),
        MigrateError::Database(m) => MigrateError::Database(wrap(m)),
        MigrateError::Connection(m) => MigrateError::Connection(wrap(m)),
        MigrateError::Timeout(m) => MigrateError::Timeout(wrap(m)),
        MigrateError::Validation(m) => MigrateError::Validation(wrap(m)),
        MigrateError::Transformation(m) => MigrateError::Transformation(wrap(m)),
        MigrateError::Serialization(m) => MigrateError::Serialization(wrap(m)),
        MigrateError::Io(m) => MigrateError::Io(wrap(m)),
        MigrateError::Cancelled(m) => MigrateError::Cancelled(wrap(m)),
        MigrateError::Other(m) => MigrateError::Other(wrap(m)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};

    #[test]
    fn test_context_keeps_variant() {
        let result: Result<()> = Err(MigrateError::Connection("connection refused".to_string()));
        let err = result.context("Failed to reach destination").unwrap_err();

        assert!(matches!(err, MigrateError::Connection(_)));
        assert!(err.is_retryable());
        assert_eq!(
            err.to_string(),
            "Connection error: Failed to reach destination: connection refused"
        );
    }

    #[test]
    fn test_with_context_is_lazy() {
        let called = AtomicBool::new(false);
        let result: Result<i32> = Ok(42);
        let value = result
            .with_context(|| {
                called.store(true, Ordering::SeqCst);
                "never"
            })
            .unwrap();

        assert_eq!(value, 42);
        assert!(!called.load(Ordering::SeqCst));
    }

    #[test]
    fn test_context_from_io_error() {
        let result: std::result::Result<(), std::io::Error> = Err(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            "no such file",
        ));
        let err = result.context("Failed to read threat-migrate.toml").unwrap_err();

        assert!(matches!(err, MigrateError::Io(_)));
        assert!(err.to_string().contains("threat-migrate.toml"));
    }
}
