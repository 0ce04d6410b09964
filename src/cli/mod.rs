//! CLI interface and argument parsing
//!
//! This module provides the command-line interface for threat-migrate using clap.

pub mod commands;

use clap::{Parser, Subcommand};

/// Threat Migrate - MongoDB to PostgreSQL threat-intelligence migration
#[derive(Parser, Debug)]
#[command(name = "threat-migrate")]
#[command(version, about, long_about = None)]
#[command(author = "Threat Migrate Contributors")]
pub struct Cli {
    /// Path to configuration file
    #[arg(
        short,
        long,
        default_value = "threat-migrate.toml",
        env = "THREAT_MIGRATE_CONFIG"
    )]
    pub config: String,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, env = "THREAT_MIGRATE_LOG_LEVEL")]
    pub log_level: Option<String>,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Migrate threat documents from MongoDB to PostgreSQL, resuming where the last run stopped
    Migrate(commands::migrate::MigrateArgs),

    /// Ping both stores and report their counts
    Health(commands::health::HealthArgs),

    /// Show the resume position and remaining documents
    Status(commands::status::StatusArgs),

    /// Validate configuration file
    ValidateConfig(commands::validate::ValidateArgs),

    /// Initialize a new configuration file
    Init(commands::init::InitArgs),
}
