//! Migrate command implementation
//!
//! This module implements the `migrate` command, which copies threat
//! documents from MongoDB into PostgreSQL, resuming from the destination's
//! current row count.

use crate::cli::commands::{connect_stores, EXIT_CONFIG, EXIT_CONNECTION, EXIT_FATAL};
use crate::config::{load_config, redact_connection_string};
use crate::core::migrate::{format_breakdown, MigrationCoordinator, RunStatus};
use crate::domain::MigrateError;
use clap::Args;
use secrecy::ExposeSecret;
use tokio::sync::watch;

/// Arguments for the migrate command
#[derive(Args, Debug)]
pub struct MigrateArgs {
    /// Skip confirmation prompt
    #[arg(short, long)]
    pub yes: bool,

    /// Dry run mode - transform everything but write nothing to PostgreSQL
    #[arg(long)]
    pub dry_run: bool,

    /// Override the number of documents per batch
    #[arg(long)]
    pub batch_size: Option<usize>,

    /// Override the number of worker tasks
    #[arg(long)]
    pub workers: Option<usize>,
}

impl MigrateArgs {
    /// Execute the migrate command
    pub async fn execute(
        &self,
        config_path: &str,
        shutdown_signal: watch::Receiver<bool>,
    ) -> anyhow::Result<i32> {
        tracing::info!("Starting migrate command");

        let mut config = match load_config(config_path) {
            Ok(c) => c,
            Err(e) => {
                tracing::error!(error = %e, "Failed to load configuration");
                eprintln!("Failed to load configuration: {e}");
                return Ok(EXIT_CONFIG);
            }
        };

        // Apply CLI overrides
        if let Some(batch_size) = self.batch_size {
            tracing::info!(batch_size, "Overriding batch size from CLI");
            config.migration.batch_size = batch_size;
        }
        if let Some(workers) = self.workers {
            tracing::info!(workers, "Overriding worker count from CLI");
            config.migration.worker_count = workers;
        }
        if self.dry_run {
            tracing::info!("Enabling dry-run mode from CLI");
            config.application.dry_run = true;
        }

        // Overrides must still be in range
        if let Err(e) = config.validate() {
            tracing::error!(error = %e, "Configuration validation failed");
            eprintln!("Configuration validation failed: {e}");
            return Ok(EXIT_CONFIG);
        }

        let dry_run = config.application.dry_run;
        if dry_run {
            tracing::info!("Dry run mode enabled - no data will be written");
            println!("🔍 DRY RUN MODE - No data will be written to PostgreSQL");
            println!();
        }

        // Confirmation prompt (unless --yes or dry-run)
        if !self.yes && !dry_run {
            println!("Migration Configuration:");
            println!(
                "  Source: {}",
                redact_connection_string(config.source.uri.expose_secret().as_ref())
            );
            println!(
                "  Collection: {}.{}",
                config.source.database, config.source.collection
            );
            println!(
                "  Destination: {}",
                redact_connection_string(config.postgresql.connection_string.expose_secret().as_ref())
            );
            println!("  Batch size: {}", config.migration.batch_size);
            println!("  Workers: {}", config.migration.worker_count);
            println!();
            print!("Proceed with migration? [y/N]: ");
            use std::io::{self, Write};
            io::stdout().flush()?;

            let mut input = String::new();
            io::stdin().read_line(&mut input)?;

            if !input.trim().eq_ignore_ascii_case("y") {
                println!("Migration cancelled.");
                return Ok(0);
            }
        }

        let stores = match connect_stores(&config).await {
            Ok(s) => s,
            Err(e) => {
                tracing::error!(error = %e, "Failed to connect to stores");
                eprintln!("Failed to connect: {e}");
                return Ok(EXIT_CONNECTION);
            }
        };
        tracing::info!(
            source = %stores.source.describe(),
            destination = %stores.events.describe(),
            "Connected to source and destination"
        );

        if config.postgresql.apply_schema && !dry_run {
            if let Err(e) = stores.events.ensure_schema().await {
                tracing::error!(error = %e, "Failed to apply destination schema");
                eprintln!("Failed to apply schema: {e}");
                return Ok(EXIT_FATAL);
            }
        }

        let coordinator = MigrationCoordinator::new(
            config.migration.clone(),
            dry_run,
            stores.source,
            stores.events,
            stores.dimensions,
            shutdown_signal,
        )
        .with_fallback_total(config.source.fallback_total_documents);

        println!("🚀 Starting migration...");
        println!();

        let summary = match coordinator.execute().await {
            Ok(s) => s,
            Err(e) => {
                tracing::error!(error = %e, "Migration failed");
                eprintln!("Migration failed: {e}");
                return Ok(match e {
                    MigrateError::Connection(_) | MigrateError::Timeout(_) => EXIT_CONNECTION,
                    _ => EXIT_FATAL,
                });
            }
        };

        // Display summary
        println!();
        println!("📊 Migration Summary:");
        println!("  Resumed at offset: {}", summary.start_offset);
        println!("  Estimated total: {}", summary.estimated_total);
        println!("  Documents read: {}", summary.documents_read);
        println!("  Processed: {}", summary.processed);
        println!("  Failed: {}", summary.failed);
        println!(
            "  Batches: {} committed, {} failed, {} retries",
            summary.batches_committed, summary.batches_failed, summary.retries
        );
        println!(
            "  Load paths: {} COPY, {} row, {} COPY fallbacks",
            summary.copy_batches, summary.row_batches, summary.copy_fallbacks
        );
        println!("  Duration: {:.2}s", summary.duration.as_secs_f64());
        println!("  Throughput: {:.1} rows/s", summary.throughput());
        println!("  Errors: {}", format_breakdown(&summary.error_counts));
        println!();

        match summary.status {
            RunStatus::Completed => println!("✅ Migration completed successfully!"),
            RunStatus::CompletedWithErrors => println!("⚠️  Migration completed with errors"),
            RunStatus::Failed => {
                println!("❌ Migration stopped early");
                if let Some(failure) = &summary.failure {
                    println!("   Error: {failure}");
                }
            }
            RunStatus::Interrupted => {
                println!("⚠️  Migration interrupted gracefully.");
                println!("   Run the same command to resume from the destination row count.");
            }
        }
        println!();

        Ok(summary.exit_code())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_migrate_args_defaults() {
        let args = MigrateArgs {
            yes: false,
            dry_run: false,
            batch_size: None,
            workers: None,
        };

        assert!(!args.yes);
        assert!(!args.dry_run);
        assert!(args.batch_size.is_none());
        assert!(args.workers.is_none());
    }

    #[tokio::test]
    async fn test_missing_config_is_config_error() {
        let args = MigrateArgs {
            yes: true,
            dry_run: true,
            batch_size: None,
            workers: None,
        };
        let (_tx, rx) = watch::channel(false);

        let code = args
            .execute("/nonexistent/threat-migrate.toml", rx)
            .await
            .unwrap();
        assert_eq!(code, EXIT_CONFIG);
    }
}
