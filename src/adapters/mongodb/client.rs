//! MongoDB source client
//!
//! Reads the threat-intelligence collection in `_id` order with offset and
//! limit. Documents are fetched raw and decoded one by one, so a single
//! malformed document is reported instead of failing the whole batch.

use crate::adapters::database::traits::{SourcePage, SourceStore};
use crate::adapters::mongodb::models::ThreatIntelRecord;
use crate::config::redact_connection_string;
use crate::config::schema::SourceConfig;
use crate::domain::{MigrateError, Result, SourceDocument};
use async_trait::async_trait;
use futures::TryStreamExt;
use mongodb::bson::{doc, RawDocumentBuf};
use mongodb::error::ErrorKind;
use mongodb::options::{ClientOptions, FindOptions};
use mongodb::{Client, Collection};
use secrecy::ExposeSecret;

/// MongoDB implementation of [`SourceStore`]
pub struct MongoSource {
    client: Client,
    database: String,
    collection: Collection<RawDocumentBuf>,
    location: String,
}

impl MongoSource {
    /// Builds the client; the driver connects lazily on first use
    ///
    /// # Errors
    ///
    /// Returns [`MigrateError::Configuration`] if the URI does not parse
    pub async fn connect(config: &SourceConfig) -> Result<Self> {
        let uri = config.uri.expose_secret();
        let mut options = ClientOptions::parse(uri.as_ref()).await.map_err(|e| {
            MigrateError::Configuration(format!("Invalid MongoDB connection URI: {}", e))
        })?;
        options.connect_timeout = Some(config.connect_timeout());
        options.server_selection_timeout = Some(config.connect_timeout());
        options.app_name = Some("threat-migrate".to_string());

        let client = Client::with_options(options)
            .map_err(|e| map_mongo_error("Failed to create MongoDB client", e))?;
        let collection = client
            .database(&config.database)
            .collection::<RawDocumentBuf>(&config.collection);

        Ok(Self {
            client,
            database: config.database.clone(),
            collection,
            location: format!(
                "{}/{}.{}",
                redact_connection_string(uri.as_ref()),
                config.database,
                config.collection
            ),
        })
    }
}

#[async_trait]
impl SourceStore for MongoSource {
    async fn ping(&self) -> Result<()> {
        self.client
            .database(&self.database)
            .run_command(doc! { "ping": 1 }, None)
            .await
            .map_err(|e| map_mongo_error("MongoDB ping failed", e))?;
        tracing::info!(source = %self.location, "MongoDB connection test successful");
        Ok(())
    }

    async fn estimated_count(&self) -> Result<u64> {
        self.collection
            .estimated_document_count(None)
            .await
            .map_err(|e| map_mongo_error("Failed to estimate document count", e))
    }

    async fn exact_count(&self) -> Result<u64> {
        self.collection
            .count_documents(doc! {}, None)
            .await
            .map_err(|e| map_mongo_error("Failed to count documents", e))
    }

    async fn read_batch(&self, batch_size: usize, offset: u64) -> Result<SourcePage> {
        let options = FindOptions::builder()
            .sort(doc! { "_id": 1 })
            .skip(offset)
            .limit(batch_size as i64)
            .batch_size(batch_size.min(u32::MAX as usize) as u32)
            .build();

        let mut cursor = self
            .collection
            .find(None, options)
            .await
            .map_err(|e| map_mongo_error("Failed to query documents", e))?;

        let mut page = SourcePage {
            documents: Vec::with_capacity(batch_size),
            ..Default::default()
        };

        while let Some(raw) = cursor
            .try_next()
            .await
            .map_err(|e| map_mongo_error("Failed to read document cursor", e))?
        {
            let position = offset + page.scanned as u64;
            page.scanned += 1;

            match mongodb::bson::from_slice_utf8_lossy::<ThreatIntelRecord>(raw.as_bytes()) {
                Ok(record) => page.documents.push(SourceDocument::from(record)),
                Err(e) => {
                    let id = raw
                        .get_object_id("_id")
                        .map(|oid| oid.to_hex())
                        .unwrap_or_else(|_| format!("offset:{position}"));
                    tracing::warn!(document_id = %id, error = %e, "Skipping undecodable document");
                    page.undecodable.push(id);
                }
            }
        }

        Ok(page)
    }

    fn describe(&self) -> String {
        self.location.clone()
    }
}

fn map_mongo_error(context: &str, err: mongodb::error::Error) -> MigrateError {
    match *err.kind {
        ErrorKind::Io(_) | ErrorKind::ServerSelection { .. } => {
            MigrateError::Connection(format!("{context}: {err}"))
        }
        _ => MigrateError::Source(format!("{context}: {err}")),
    }
}
