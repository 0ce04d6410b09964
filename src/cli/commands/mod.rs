//! CLI command implementations
//!
//! Every command returns the process exit code: 0 success, 1 completed with
//! errors, 2 configuration error, 4 connection error, 5 fatal error, 130
//! interrupted.

pub mod health;
pub mod init;
pub mod migrate;
pub mod status;
pub mod validate;

use crate::adapters::database::{
    create_destination, create_source_store, DimensionStore, EventStore, SourceStore,
};
use crate::config::MigrateConfig;
use crate::domain::Result;
use std::sync::Arc;

/// Exit code for a configuration error
pub const EXIT_CONFIG: i32 = 2;
/// Exit code for a connection error
pub const EXIT_CONNECTION: i32 = 4;
/// Exit code for a fatal error
pub const EXIT_FATAL: i32 = 5;

/// Source and destination handles for one command
pub(crate) struct Stores {
    pub source: Arc<dyn SourceStore>,
    pub events: Arc<dyn EventStore>,
    pub dimensions: Arc<dyn DimensionStore>,
}

/// Builds both stores from configuration and pings them
pub(crate) async fn connect_stores(config: &MigrateConfig) -> Result<Stores> {
    let source = create_source_store(&config.source).await?;
    let (events, dimensions) = create_destination(&config.postgresql).await?;

    source.ping().await?;
    events.ping().await?;

    Ok(Stores {
        source,
        events,
        dimensions,
    })
}
