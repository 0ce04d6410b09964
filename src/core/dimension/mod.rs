//! Dimension resolution with caching
//!
//! Maps free-text attributes to surrogate identifiers in the ASN, country,
//! protocol and malware-family tables.

pub mod resolver;

pub use resolver::{DimensionResolver, ResolverStats};
