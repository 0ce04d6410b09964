//! Domain models and types for threat-migrate.
//!
//! The domain layer provides:
//! - **Source documents** ([`SourceDocument`]) as decoded from the source store
//! - **Destination rows** ([`ThreatEvent`]) and their [`Dimension`] references
//! - **Error types** ([`MigrateError`], [`MigrationError`], [`ErrorKind`])
//! - **Result type alias** ([`Result`])

pub mod context;
pub mod dimension;
pub mod document;
pub mod errors;
pub mod record;
pub mod result;

// Re-export commonly used types for convenience
pub use dimension::{Dimension, DimensionAttributes};
pub use document::{OptionalInformation, SourceDocument};
pub use errors::{ErrorKind, MigrateError, MigrationError};
pub use record::ThreatEvent;
pub use result::Result;
