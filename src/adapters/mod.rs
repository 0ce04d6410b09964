//! External store integrations
//!
//! - [`mongodb`] - the threat-intelligence source collection
//! - [`postgresql`] - the normalized destination schema
//! - [`memory`] - an in-process store for tests and rehearsals
//! - [`database`] - the trait seams and factory shared by all of them
//!
//! # Example
//!
//! ```rust,no_run
//! use threat_migrate::adapters::database::{create_destination, create_source_store};
//! use threat_migrate::config::load_config;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = load_config("threat-migrate.toml")?;
//! let source = create_source_store(&config.source).await?;
//! let (events, _dimensions) = create_destination(&config.postgresql).await?;
//!
//! println!("{} documents, {} migrated", source.exact_count().await?, events.count_events().await?);
//! # Ok(())
//! # }
//! ```

pub mod database;
pub mod memory;
pub mod mongodb;
pub mod postgresql;
