//! PostgreSQL client implementation
//!
//! Owns the shared connection pool and maps driver errors into
//! [`MigrateError`] values that keep their retryability.

use crate::config::schema::PostgreSQLConfig;
use crate::config::redact_connection_string;
use crate::domain::{MigrateError, Result};
use deadpool_postgres::{Manager, ManagerConfig, Pool, PoolError, RecyclingMethod, Runtime};
use postgres_native_tls::MakeTlsConnector;
use secrecy::ExposeSecret;
use std::time::Duration;
use tokio_postgres::config::SslMode;
use tokio_postgres::error::SqlState;
use tokio_postgres::NoTls;

/// PostgreSQL client for threat-migrate
///
/// All workers share one bounded pool.
pub struct PostgreSQLClient {
    pool: Pool,
    config: PostgreSQLConfig,
}

impl PostgreSQLClient {
    /// Create a new PostgreSQL client
    ///
    /// No connection is opened until the first query.
    ///
    /// # Errors
    ///
    /// Returns an error if the connection string does not parse, the TLS
    /// connector cannot be built, or the pool cannot be created.
    pub async fn new(config: PostgreSQLConfig) -> Result<Self> {
        let mut pg_config: tokio_postgres::Config = config
            .connection_string
            .expose_secret()
            .as_ref()
            .parse()
            .map_err(|e| {
                MigrateError::Configuration(format!("Invalid PostgreSQL connection string: {}", e))
            })?;

        let timeout = Duration::from_secs(config.connection_timeout_seconds);
        pg_config.connect_timeout(timeout);
        if config.statement_timeout_seconds > 0 {
            pg_config.options(&format!(
                "-c statement_timeout={}",
                config.statement_timeout_seconds * 1000
            ));
        }
        pg_config.application_name("threat-migrate");

        let manager_config = ManagerConfig {
            recycling_method: RecyclingMethod::Fast,
        };

        let manager = match config.ssl_mode.as_str() {
            "disable" => {
                pg_config.ssl_mode(SslMode::Disable);
                Manager::from_config(pg_config, NoTls, manager_config)
            }
            mode => {
                pg_config.ssl_mode(if matches!(mode, "allow" | "prefer") {
                    SslMode::Prefer
                } else {
                    SslMode::Require
                });
                Manager::from_config(pg_config, tls_connector(mode)?, manager_config)
            }
        };

        let pool = Pool::builder(manager)
            .max_size(config.max_connections)
            .runtime(Runtime::Tokio1)
            .wait_timeout(Some(timeout))
            .create_timeout(Some(timeout))
            .recycle_timeout(Some(timeout))
            .build()
            .map_err(|e| {
                MigrateError::Database(format!("Failed to create connection pool: {}", e))
            })?;

        Ok(Self { pool, config })
    }

    /// Test the connection to PostgreSQL
    pub async fn test_connection(&self) -> Result<()> {
        let client = self.get_connection().await?;

        client
            .query_one("SELECT 1", &[])
            .await
            .map_err(|e| map_pg_error("Connection test failed", &e))?;

        tracing::info!(target_db = %self.connection_string_safe(), "PostgreSQL connection test successful");
        Ok(())
    }

    /// Create the dimension and event tables if they do not exist
    pub async fn ensure_schema(&self) -> Result<()> {
        let client = self.get_connection().await?;

        let migration_sql = include_str!("../../../migrations/001_initial_schema.sql");

        client
            .batch_execute(migration_sql)
            .await
            .map_err(|e| map_pg_error("Failed to apply schema", &e))?;

        tracing::info!("PostgreSQL schema verified");
        Ok(())
    }

    /// Get a connection from the pool
    pub async fn get_connection(&self) -> Result<deadpool_postgres::Object> {
        self.pool.get().await.map_err(map_pool_error)
    }

    /// Connection string with the password masked
    pub fn connection_string_safe(&self) -> String {
        redact_connection_string(self.config.connection_string.expose_secret().as_ref())
    }

    /// Get the pool statistics
    pub fn pool_status(&self) -> deadpool_postgres::Status {
        self.pool.status()
    }
}

fn tls_connector(ssl_mode: &str) -> Result<MakeTlsConnector> {
    let verify = ssl_mode.starts_with("verify-");
    let connector = native_tls::TlsConnector::builder()
        .danger_accept_invalid_certs(!verify)
        .danger_accept_invalid_hostnames(ssl_mode != "verify-full")
        .build()
        .map_err(|e| MigrateError::Configuration(format!("Failed to build TLS connector: {}", e)))?;
    Ok(MakeTlsConnector::new(connector))
}

/// Converts a driver error, keeping connection and timeout failures typed
pub(crate) fn map_pg_error(context: &str, err: &tokio_postgres::Error) -> MigrateError {
    if err.is_closed() {
        return MigrateError::Connection(format!("{context}: connection lost: {err}"));
    }

    if let Some(state) = err.code() {
        if state.code().starts_with("08")
            || *state == SqlState::TOO_MANY_CONNECTIONS
            || *state == SqlState::ADMIN_SHUTDOWN
            || *state == SqlState::CANNOT_CONNECT_NOW
        {
            return MigrateError::Connection(format!("{context}: {err}"));
        }
        if *state == SqlState::QUERY_CANCELED {
            return MigrateError::Timeout(format!("{context}: {err}"));
        }
        let detail = err
            .as_db_error()
            .map(|db| db.message().to_string())
            .unwrap_or_else(|| err.to_string());
        return MigrateError::Database(format!("{context}: {detail} (SQLSTATE {})", state.code()));
    }

    let io_failure = std::error::Error::source(err)
        .map(|source| source.is::<std::io::Error>())
        .unwrap_or(false);
    if io_failure {
        return MigrateError::Connection(format!("{context}: {err}"));
    }

    MigrateError::Database(format!("{context}: {err}"))
}

fn map_pool_error(err: PoolError) -> MigrateError {
    match err {
        PoolError::Backend(e) => map_pg_error("Failed to get connection from pool", &e),
        other => MigrateError::Connection(format!(
            "Failed to get connection from pool: {}",
            other
        )),
    }
}
