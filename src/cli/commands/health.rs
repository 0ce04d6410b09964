//! Health command implementation
//!
//! Pings both stores and reports the source's exact document count next to
//! the destination's row count.

use crate::cli::commands::{connect_stores, EXIT_CONFIG, EXIT_CONNECTION};
use crate::config::load_config;
use clap::Args;

/// Arguments for the health command
#[derive(Args, Debug)]
pub struct HealthArgs {}

impl HealthArgs {
    /// Execute the health command
    pub async fn execute(&self, config_path: &str) -> anyhow::Result<i32> {
        tracing::info!("Checking store health");

        println!("🩺 Health Check");
        println!();

        let config = match load_config(config_path) {
            Ok(c) => c,
            Err(e) => {
                println!("❌ Failed to load configuration file");
                println!("   Error: {e}");
                return Ok(EXIT_CONFIG);
            }
        };

        let stores = match connect_stores(&config).await {
            Ok(s) => s,
            Err(e) => {
                println!("❌ Connection failed");
                println!("   Error: {e}");
                return Ok(EXIT_CONNECTION);
            }
        };
        println!("✅ Source reachable: {}", stores.source.describe());
        println!("✅ Destination reachable: {}", stores.events.describe());
        println!();

        let source_count = stores.source.exact_count().await;
        let destination_count = stores.events.count_events().await;

        match (&source_count, &destination_count) {
            (Ok(source), Ok(destination)) => {
                tracing::info!(
                    source_documents = source,
                    destination_rows = destination,
                    "Store counts"
                );
                println!("  Source documents: {source}");
                println!("  Destination rows: {destination}");
                println!("  Remaining: {}", source.saturating_sub(*destination));
                println!();
                Ok(0)
            }
            _ => {
                if let Err(e) = &source_count {
                    println!("❌ Failed to count source documents: {e}");
                }
                if let Err(e) = &destination_count {
                    println!("❌ Failed to count destination rows: {e}");
                }
                Ok(EXIT_CONNECTION)
            }
        }
    }
}
