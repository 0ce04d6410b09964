//! MongoDB source
//!
//! Offset/limit reads of the threat-intelligence collection in stable
//! `_id` order.

pub mod client;
pub mod models;

pub use client::MongoSource;
pub use models::ThreatIntelRecord;
