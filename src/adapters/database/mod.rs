//! Store abstraction layer
//!
//! Trait seams between the migration engine and its stores, plus the factory
//! that builds the MongoDB and PostgreSQL implementations.

pub mod factory;
pub mod traits;

pub use factory::{create_destination, create_source_store};
pub use traits::{DimensionStore, EventStore, SourcePage, SourceStore};
