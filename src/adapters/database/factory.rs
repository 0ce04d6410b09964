//! Store factory
//!
//! Builds the concrete source and destination adapters from configuration.

use crate::adapters::database::traits::{DimensionStore, EventStore, SourceStore};
use crate::adapters::mongodb::MongoSource;
use crate::adapters::postgresql::adapter::PostgreSQLAdapter;
use crate::adapters::postgresql::client::PostgreSQLClient;
use crate::config::schema::{PostgreSQLConfig, SourceConfig};
use crate::domain::Result;
use std::sync::Arc;

/// Create the MongoDB source store
///
/// # Errors
///
/// Returns an error if the URI is invalid or the client cannot be built
pub async fn create_source_store(config: &SourceConfig) -> Result<Arc<dyn SourceStore>> {
    tracing::info!(
        database = %config.database,
        collection = %config.collection,
        "Creating MongoDB source client"
    );
    let source = MongoSource::connect(config).await?;
    Ok(Arc::new(source) as Arc<dyn SourceStore>)
}

/// Create the PostgreSQL event and dimension stores over one shared pool
///
/// # Errors
///
/// Returns an error if the connection string is invalid or the pool cannot
/// be created
pub async fn create_destination(
    config: &PostgreSQLConfig,
) -> Result<(Arc<dyn EventStore>, Arc<dyn DimensionStore>)> {
    tracing::info!(
        max_connections = config.max_connections,
        ssl_mode = %config.ssl_mode,
        "Creating PostgreSQL client"
    );
    let client = Arc::new(PostgreSQLClient::new(config.clone()).await?);
    let adapter = Arc::new(PostgreSQLAdapter::new_with_arc(client));

    Ok((
        adapter.clone() as Arc<dyn EventStore>,
        adapter as Arc<dyn DimensionStore>,
    ))
}
