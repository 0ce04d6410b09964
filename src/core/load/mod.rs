//! Bulk loading into the destination

pub mod loader;
pub mod threshold;

pub use loader::{BulkLoader, LoadOutcome, LoadPath};
pub use threshold::AdaptiveThreshold;
