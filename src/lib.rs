// Threat Migrate - MongoDB to PostgreSQL threat-intelligence migration
// Copyright (c) 2025 Threat Migrate Contributors
// Licensed under the MIT License

//! # Threat Migrate - MongoDB to PostgreSQL threat-intelligence migration
//!
//! Threat Migrate is a resumable bulk ETL engine that moves threat-intelligence
//! documents from a MongoDB collection into a normalized PostgreSQL schema.
//!
//! ## Overview
//!
//! This library provides the core functionality for:
//! - **Extracting** documents in stable `_id` order, resuming from the
//!   destination's row count
//! - **Transforming** each document: structural validation, text
//!   sanitization, and normalization of ASNs, categories, countries,
//!   protocols, ports and malware families
//! - **Resolving** natural keys to surrogate identifiers in four dimension
//!   tables through a shared, concurrency-safe cache
//! - **Loading** batches through `COPY FROM STDIN` or a prepared-insert
//!   transaction, selected by an adaptive size threshold
//!
//! ## Architecture
//!
//! - [`cli`] - Command-line interface and argument parsing
//! - [`core`] - Reader, transform, dimension resolver, loader and orchestrator
//! - [`adapters`] - MongoDB and PostgreSQL stores, plus an in-memory store
//! - [`domain`] - Documents, events, dimensions and the error taxonomy
//! - [`config`] - Configuration management
//! - [`logging`] - Structured logging
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use threat_migrate::adapters::database::{create_destination, create_source_store};
//! use threat_migrate::config::load_config;
//! use threat_migrate::core::migrate::MigrationCoordinator;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = load_config("threat-migrate.toml")?;
//!     let source = create_source_store(&config.source).await?;
//!     let (events, dimensions) = create_destination(&config.postgresql).await?;
//!
//!     let (_shutdown_tx, shutdown_rx) = tokio::sync::watch::channel(false);
//!     let summary = MigrationCoordinator::new(
//!         config.migration.clone(),
//!         config.application.dry_run,
//!         source,
//!         events,
//!         dimensions,
//!         shutdown_rx,
//!     )
//!     .execute()
//!     .await?;
//!
//!     println!("Migrated {} documents ({})", summary.processed, summary.status);
//!     Ok(())
//! }
//! ```
//!
//! ## Resuming
//!
//! There is no checkpoint file. The destination's exact row count is the
//! read offset of the next run, so a run stopped by a signal or a crash is
//! resumed by running `migrate` again. Documents rejected by validation are
//! not counted by the destination, so a resumed run may re-read a few
//! documents near the end of the previous one.
//!
//! ## Error Handling
//!
//! Fallible operations return [`domain::MigrateError`]. Per-document and
//! per-batch failures are recorded as [`domain::MigrationError`] values,
//! classified by [`domain::ErrorKind`], counted, and never abort the run.

pub mod adapters;
pub mod cli;
pub mod config;
pub mod core;
pub mod domain;
pub mod logging;
