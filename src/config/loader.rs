//! Configuration loader with TOML parsing and environment variable overrides

use super::schema::MigrateConfig;
use crate::config::secret_string;
use crate::domain::errors::MigrateError;
use crate::domain::result::Result;
use regex::Regex;
use std::fs;
use std::path::Path;
use std::str::FromStr;

/// Prefix of environment variables that override file values
pub const ENV_PREFIX: &str = "THREAT_MIGRATE";

/// Loads configuration from a TOML file
///
/// This function:
/// 1. Reads the TOML file
/// 2. Performs environment variable substitution (`${VAR}` syntax)
/// 3. Parses the TOML into [`MigrateConfig`]
/// 4. Applies `THREAT_MIGRATE_<SECTION>_<KEY>` overrides
/// 5. Validates the configuration
///
/// # Errors
///
/// Returns [`MigrateError::Configuration`] if the file is missing or
/// unreadable, a referenced variable is unset, parsing fails, an override
/// does not parse, or validation fails.
///
/// # Examples
///
/// ```no_run
/// use threat_migrate::config::loader::load_config;
///
/// let config = load_config("threat-migrate.toml").expect("Failed to load config");
/// ```
pub fn load_config(path: impl AsRef<Path>) -> Result<MigrateConfig> {
    let path = path.as_ref();

    if !path.exists() {
        return Err(MigrateError::Configuration(format!(
            "Configuration file not found: {}",
            path.display()
        )));
    }

    let contents = fs::read_to_string(path).map_err(|e| {
        MigrateError::Configuration(format!(
            "Failed to read configuration file {}: {}",
            path.display(),
            e
        ))
    })?;

    let contents = substitute_env_vars(&contents)?;

    let mut config: MigrateConfig = toml::from_str(&contents)
        .map_err(|e| MigrateError::Configuration(format!("Failed to parse TOML: {}", e)))?;

    apply_env_overrides(&mut config)?;

    config.validate().map_err(|e| {
        MigrateError::Configuration(format!("Configuration validation failed: {}", e))
    })?;

    Ok(config)
}

/// Substitutes environment variables in the format `${VAR_NAME}`
///
/// Comment lines are copied untouched.
///
/// # Errors
///
/// Returns an error naming every referenced variable that is not set
fn substitute_env_vars(input: &str) -> Result<String> {
    let re = Regex::new(r"\$\{([A-Z_][A-Z0-9_]*)\}")
        .map_err(|e| MigrateError::Configuration(format!("Invalid substitution pattern: {e}")))?;
    let mut lines = Vec::new();
    let mut missing_vars: Vec<String> = Vec::new();

    for line in input.lines() {
        if line.trim_start().starts_with('#') {
            lines.push(line.to_string());
            continue;
        }

        let processed = re.replace_all(line, |caps: &regex::Captures<'_>| {
            match std::env::var(&caps[1]) {
                Ok(value) => value,
                Err(_) => {
                    if !missing_vars.iter().any(|v| v == &caps[1]) {
                        missing_vars.push(caps[1].to_string());
                    }
                    String::new()
                }
            }
        });
        lines.push(processed.into_owned());
    }

    if !missing_vars.is_empty() {
        return Err(MigrateError::Configuration(format!(
            "Missing required environment variables: {}",
            missing_vars.join(", ")
        )));
    }

    Ok(lines.join("\n"))
}

fn env_key(section: &str, key: &str) -> String {
    format!("{ENV_PREFIX}_{section}_{key}")
}

/// Overwrites `target` with the parsed value of an override variable, if set
fn override_parsed<T: FromStr>(section: &str, key: &str, target: &mut T) -> Result<()>
where
    T::Err: std::fmt::Display,
{
    let name = env_key(section, key);
    if let Ok(raw) = std::env::var(&name) {
        *target = raw.trim().parse().map_err(|e| {
            MigrateError::Configuration(format!("Invalid value for {name} ('{raw}'): {e}"))
        })?;
    }
    Ok(())
}

/// Applies `THREAT_MIGRATE_<SECTION>_<KEY>` overrides
///
/// For example `THREAT_MIGRATE_MIGRATION_WORKER_COUNT=4` or
/// `THREAT_MIGRATE_POSTGRESQL_CONNECTION_STRING=postgresql://...`.
fn apply_env_overrides(config: &mut MigrateConfig) -> Result<()> {
    override_parsed("APPLICATION", "LOG_LEVEL", &mut config.application.log_level)?;
    override_parsed("APPLICATION", "DRY_RUN", &mut config.application.dry_run)?;

    if let Ok(val) = std::env::var(env_key("SOURCE", "URI")) {
        config.source.uri = secret_string(val);
    }
    override_parsed("SOURCE", "DATABASE", &mut config.source.database)?;
    override_parsed("SOURCE", "COLLECTION", &mut config.source.collection)?;
    override_parsed(
        "SOURCE",
        "CONNECT_TIMEOUT_SECONDS",
        &mut config.source.connect_timeout_seconds,
    )?;
    override_parsed(
        "SOURCE",
        "FALLBACK_TOTAL_DOCUMENTS",
        &mut config.source.fallback_total_documents,
    )?;

    let pg = &mut config.postgresql;
    if let Ok(val) = std::env::var(env_key("POSTGRESQL", "CONNECTION_STRING")) {
        pg.connection_string = secret_string(val);
    }
    override_parsed("POSTGRESQL", "MAX_CONNECTIONS", &mut pg.max_connections)?;
    override_parsed(
        "POSTGRESQL",
        "CONNECTION_TIMEOUT_SECONDS",
        &mut pg.connection_timeout_seconds,
    )?;
    override_parsed(
        "POSTGRESQL",
        "STATEMENT_TIMEOUT_SECONDS",
        &mut pg.statement_timeout_seconds,
    )?;
    override_parsed("POSTGRESQL", "SSL_MODE", &mut pg.ssl_mode)?;
    override_parsed("POSTGRESQL", "APPLY_SCHEMA", &mut pg.apply_schema)?;

    let migration = &mut config.migration;
    override_parsed("MIGRATION", "BATCH_SIZE", &mut migration.batch_size)?;
    override_parsed("MIGRATION", "WORKER_COUNT", &mut migration.worker_count)?;
    override_parsed("MIGRATION", "QUEUE_DEPTH", &mut migration.queue_depth)?;
    override_parsed("MIGRATION", "MAX_RETRIES", &mut migration.max_retries)?;
    override_parsed(
        "MIGRATION",
        "RETRY_DELAY_SECONDS",
        &mut migration.retry_delay_seconds,
    )?;
    override_parsed(
        "MIGRATION",
        "BATCH_TIMEOUT_SECONDS",
        &mut migration.batch_timeout_seconds,
    )?;
    override_parsed(
        "MIGRATION",
        "PROGRESS_INTERVAL_SECONDS",
        &mut migration.progress_interval_seconds,
    )?;

    let copy = &mut migration.copy;
    override_parsed("MIGRATION", "COPY_ENABLED", &mut copy.enabled)?;
    override_parsed("MIGRATION", "COPY_THRESHOLD", &mut copy.threshold)?;
    override_parsed("MIGRATION", "COPY_ADAPTIVE", &mut copy.adaptive)?;
    override_parsed("MIGRATION", "COPY_MIN_THRESHOLD", &mut copy.min_threshold)?;
    override_parsed("MIGRATION", "COPY_MAX_THRESHOLD", &mut copy.max_threshold)?;
    override_parsed(
        "MIGRATION",
        "COPY_TARGET_ROWS_PER_SECOND",
        &mut copy.target_rows_per_second,
    )?;

    override_parsed("LOGGING", "LOCAL_ENABLED", &mut config.logging.local_enabled)?;
    override_parsed("LOGGING", "LOCAL_PATH", &mut config.logging.local_path)?;
    override_parsed("LOGGING", "LOCAL_ROTATION", &mut config.logging.local_rotation)?;

    Ok(())
}
