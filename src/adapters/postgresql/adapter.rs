//! PostgreSQL adapter implementing the destination traits

use crate::adapters::database::traits::{DimensionStore, EventStore};
use crate::adapters::postgresql::client::{map_pg_error, PostgreSQLClient};
use crate::adapters::postgresql::models::{
    copy_statement, encode_copy_rows, insert_statement, COPY_CHUNK_ROWS,
};
use crate::domain::{Dimension, DimensionAttributes, Result, ThreatEvent};
use async_trait::async_trait;
use bytes::Bytes;
use chrono::Utc;
use futures::{pin_mut, SinkExt};
use std::sync::Arc;
use tokio_postgres::CopyInSink;
use uuid::Uuid;

/// PostgreSQL implementation of [`EventStore`] and [`DimensionStore`]
pub struct PostgreSQLAdapter {
    client: Arc<PostgreSQLClient>,
}

impl PostgreSQLAdapter {
    /// Create a new PostgreSQL adapter with an Arc-wrapped client
    pub fn new_with_arc(client: Arc<PostgreSQLClient>) -> Self {
        Self { client }
    }
}

#[async_trait]
impl EventStore for PostgreSQLAdapter {
    async fn ping(&self) -> Result<()> {
        self.client.test_connection().await
    }

    async fn ensure_schema(&self) -> Result<()> {
        self.client.ensure_schema().await
    }

    async fn count_events(&self) -> Result<u64> {
        let conn = self.client.get_connection().await?;
        let row = conn
            .query_one(r#"SELECT COUNT(*) FROM "ThreatEvents""#, &[])
            .await
            .map_err(|e| map_pg_error("Failed to count threat events", &e))?;
        let count: i64 = row.get(0);
        Ok(count.max(0) as u64)
    }

    async fn copy_events(&self, events: &[ThreatEvent]) -> Result<u64> {
        if events.is_empty() {
            return Ok(0);
        }

        let mut conn = self.client.get_connection().await?;
        let tx = conn
            .transaction()
            .await
            .map_err(|e| map_pg_error("Failed to begin COPY transaction", &e))?;

        let statement = copy_statement();
        let sink: CopyInSink<Bytes> = tx
            .copy_in(statement.as_str())
            .await
            .map_err(|e| map_pg_error("Failed to start COPY", &e))?;
        pin_mut!(sink);

        for chunk in events.chunks(COPY_CHUNK_ROWS) {
            sink.send(Bytes::from(encode_copy_rows(chunk)))
                .await
                .map_err(|e| map_pg_error("Failed to stream COPY data", &e))?;
        }

        let copied = sink
            .finish()
            .await
            .map_err(|e| map_pg_error("Failed to finish COPY", &e))?;

        tx.commit()
            .await
            .map_err(|e| map_pg_error("Failed to commit COPY transaction", &e))?;

        tracing::debug!(rows = copied, "COPY committed");
        Ok(copied)
    }

    async fn insert_events(&self, events: &[ThreatEvent]) -> Result<u64> {
        if events.is_empty() {
            return Ok(0);
        }

        let mut conn = self.client.get_connection().await?;
        let tx = conn
            .transaction()
            .await
            .map_err(|e| map_pg_error("Failed to begin insert transaction", &e))?;

        let statement = tx
            .prepare_cached(&insert_statement())
            .await
            .map_err(|e| map_pg_error("Failed to prepare insert", &e))?;

        let mut inserted = 0u64;
        for event in events {
            inserted += tx
                .execute(
                    &statement,
                    &[
                        &event.id,
                        &event.timestamp,
                        &event.asn_registry_id,
                        &event.source_address,
                        &event.source_country_id,
                        &event.destination_address,
                        &event.destination_country_id,
                        &event.source_port,
                        &event.destination_port,
                        &event.protocol_id,
                        &event.category,
                        &event.malware_family_id,
                        &event.created_at,
                        &event.updated_at,
                    ],
                )
                .await
                .map_err(|e| map_pg_error("Failed to insert threat event", &e))?;
        }

        tx.commit()
            .await
            .map_err(|e| map_pg_error("Failed to commit insert transaction", &e))?;

        Ok(inserted)
    }

    fn describe(&self) -> String {
        self.client.connection_string_safe()
    }
}

#[async_trait]
impl DimensionStore for PostgreSQLAdapter {
    async fn load_keys(&self, dimension: Dimension, limit: i64) -> Result<Vec<(String, Uuid)>> {
        let conn = self.client.get_connection().await?;
        let query = format!(
            r#"SELECT {}, "Id" FROM {} LIMIT $1"#,
            dimension.key_column(),
            dimension.table()
        );
        let rows = conn
            .query(&query, &[&limit])
            .await
            .map_err(|e| map_pg_error(&format!("Failed to preload {dimension} keys"), &e))?;

        Ok(rows
            .iter()
            .map(|row| (row.get::<_, String>(0), row.get::<_, Uuid>(1)))
            .collect())
    }

    async fn find_key(&self, dimension: Dimension, key: &str) -> Result<Option<Uuid>> {
        let conn = self.client.get_connection().await?;
        let query = format!(
            r#"SELECT "Id" FROM {} WHERE {} = $1 LIMIT 1"#,
            dimension.table(),
            dimension.key_column()
        );
        let statement = conn
            .prepare_cached(&query)
            .await
            .map_err(|e| map_pg_error(&format!("Failed to prepare {dimension} lookup"), &e))?;
        let row = conn
            .query_opt(&statement, &[&key])
            .await
            .map_err(|e| map_pg_error(&format!("Failed to look up {dimension} '{key}'"), &e))?;

        Ok(row.map(|r| r.get(0)))
    }

    async fn insert_key(
        &self,
        dimension: Dimension,
        key: &str,
        attributes: &DimensionAttributes,
    ) -> Result<Option<Uuid>> {
        let conn = self.client.get_connection().await?;
        let id = Uuid::new_v4();
        let now = Utc::now();

        let row = match dimension.description_column() {
            Some(description_column) => {
                let query = format!(
                    r#"INSERT INTO {table} ("Id", {key_col}, {description_column}, "CreatedAt")
                       VALUES ($1, $2, $3, $4)
                       ON CONFLICT ({key_col}) DO NOTHING
                       RETURNING "Id""#,
                    table = dimension.table(),
                    key_col = dimension.key_column(),
                );
                let description = attributes
                    .description
                    .clone()
                    .unwrap_or_else(|| key.to_string());
                conn.query_opt(&query, &[&id, &key, &description, &now]).await
            }
            None => {
                let query = format!(
                    r#"INSERT INTO {table} ("Id", {key_col}, "CreatedAt")
                       VALUES ($1, $2, $3)
                       ON CONFLICT ({key_col}) DO NOTHING
                       RETURNING "Id""#,
                    table = dimension.table(),
                    key_col = dimension.key_column(),
                );
                conn.query_opt(&query, &[&id, &key, &now]).await
            }
        }
        .map_err(|e| map_pg_error(&format!("Failed to create {dimension} '{key}'"), &e))?;

        Ok(row.map(|r| r.get(0)))
    }
}
