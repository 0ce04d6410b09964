//! Status command implementation
//!
//! This module implements the `status` command, which shows where the next
//! `migrate` run will resume.

use crate::adapters::database::{create_destination, create_source_store};
use crate::cli::commands::{EXIT_CONFIG, EXIT_CONNECTION, EXIT_FATAL};
use crate::config::load_config;
use clap::Args;

/// Arguments for the status command
#[derive(Args, Debug)]
pub struct StatusArgs {}

impl StatusArgs {
    /// Execute the status command
    pub async fn execute(&self, config_path: &str) -> anyhow::Result<i32> {
        tracing::info!("Checking migration status");

        println!("📊 Migration Status");
        println!();

        let config = match load_config(config_path) {
            Ok(c) => c,
            Err(e) => {
                println!("❌ Failed to load configuration file");
                println!("   Error: {e}");
                return Ok(EXIT_CONFIG);
            }
        };

        let (events, _) = match create_destination(&config.postgresql).await {
            Ok(d) => d,
            Err(e) => {
                println!("❌ Failed to connect to PostgreSQL");
                println!("   Error: {e}");
                return Ok(EXIT_CONNECTION);
            }
        };

        let migrated = match events.count_events().await {
            Ok(n) => n,
            Err(e) => {
                println!("❌ Failed to count migrated rows");
                println!("   Error: {e}");
                return Ok(EXIT_FATAL);
            }
        };

        // The estimate is best effort; status still reports the offset without it
        let (total, estimated) = match create_source_store(&config.source).await {
            Ok(source) => match source.estimated_count().await {
                Ok(n) => (n, true),
                Err(e) => {
                    tracing::warn!(error = %e, "Source count estimate unavailable");
                    (config.source.fallback_total_documents, false)
                }
            },
            Err(e) => {
                tracing::warn!(error = %e, "Source unavailable");
                (config.source.fallback_total_documents, false)
            }
        };

        if migrated == 0 {
            println!("No migrated rows found.");
            println!("Run 'threat-migrate migrate' to start migrating data.");
            println!();
        }

        let percent = if total == 0 {
            100.0
        } else {
            migrated as f64 / total as f64 * 100.0
        };

        println!("  Resume offset: {migrated}");
        println!(
            "  Source total: {total}{}",
            if estimated { " (estimated)" } else { " (configured fallback)" }
        );
        println!("  Remaining: {}", total.saturating_sub(migrated));
        println!("  Progress: {percent:.2}%");
        println!();
        Ok(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_missing_config_is_config_error() {
        let code = StatusArgs {}
            .execute("/nonexistent/threat-migrate.toml")
            .await
            .unwrap();
        assert_eq!(code, EXIT_CONFIG);
    }
}
