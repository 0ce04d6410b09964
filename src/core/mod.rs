//! Core migration logic.
//!
//! # Modules
//!
//! - [`source`] - Resumable, offset-based reading from the source store
//! - [`transform`] - Validation, sanitization and normalization of documents
//! - [`dimension`] - Cached get-or-create of dimension rows
//! - [`load`] - Dual-path (COPY or row transaction) bulk loading
//! - [`migrate`] - Worker pool, retry, progress and the run summary
//! - [`shutdown`] - Cancellation helpers
//!
//! # Example
//!
//! ```rust,no_run
//! use threat_migrate::adapters::database::{create_destination, create_source_store};
//! use threat_migrate::config::load_config;
//! use threat_migrate::core::migrate::MigrationCoordinator;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = load_config("threat-migrate.toml")?;
//! let source = create_source_store(&config.source).await?;
//! let (events, dimensions) = create_destination(&config.postgresql).await?;
//!
//! let (_shutdown_tx, shutdown_rx) = tokio::sync::watch::channel(false);
//! let coordinator = MigrationCoordinator::new(
//!     config.migration.clone(),
//!     false,
//!     source,
//!     events,
//!     dimensions,
//!     shutdown_rx,
//! );
//!
//! let summary = coordinator.execute().await?;
//! println!("Processed: {}", summary.processed);
//! println!("Failed: {}", summary.failed);
//! # Ok(())
//! # }
//! ```

pub mod dimension;
pub mod load;
pub mod migrate;
pub mod shutdown;
pub mod source;
pub mod transform;
