//! Logging and observability
//!
//! - JSON-formatted file logs with rotation
//! - Human-readable console output
//! - Configurable log levels, overridable with `RUST_LOG`
//!
//! # Example
//!
//! ```no_run
//! use threat_migrate::logging::init_logging;
//! use threat_migrate::config::LoggingConfig;
//!
//! let config = LoggingConfig::default();
//! let _guard = init_logging("info", &config).expect("Failed to initialize logging");
//!
//! tracing::info!(batch_id = 7, "Batch committed");
//! ```

pub mod structured;

pub use structured::{init_logging, LoggingGuard};

/// Log the final outcome of one batch
///
/// # Example
///
/// ```no_run
/// use threat_migrate::log_batch_result;
/// use std::time::Duration;
///
/// log_batch_result!(12, "committed", 9_998, 2, Duration::from_millis(850));
/// ```
#[macro_export]
macro_rules! log_batch_result {
    ($batch_id:expr, $state:expr, $processed:expr, $failed:expr, $duration:expr) => {
        tracing::debug!(
            batch_id = %$batch_id,
            state = %$state,
            processed = $processed,
            failed = $failed,
            duration_ms = $duration.as_millis() as u64,
            "Batch finished"
        );
    };
}

/// Log a retry attempt
///
/// # Example
///
/// ```no_run
/// use threat_migrate::log_retry_attempt;
/// use std::time::Duration;
///
/// log_retry_attempt!(4, 1, 3, Duration::from_secs(5), "connection reset by peer");
/// ```
#[macro_export]
macro_rules! log_retry_attempt {
    ($batch_id:expr, $attempt:expr, $max_attempts:expr, $delay:expr, $reason:expr) => {
        tracing::warn!(
            batch_id = %$batch_id,
            attempt = $attempt,
            max_attempts = $max_attempts,
            delay_ms = $delay.as_millis() as u64,
            reason = %$reason,
            "Retrying batch"
        );
    };
}
