//! PostgreSQL destination
//!
//! Pooled client, COPY and row-insert loaders for `"ThreatEvents"`, and the
//! get-or-insert primitives for the dimension tables.

pub mod adapter;
pub mod client;
pub mod models;

pub use adapter::PostgreSQLAdapter;
pub use client::PostgreSQLClient;
