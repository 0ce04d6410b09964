//! Destination threat events

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::net::IpAddr;
use uuid::Uuid;

/// A normalized, destination-ready row of `"ThreatEvents"`
///
/// Every reference is a dimension surrogate id. The source document id is
/// not carried over; `id` is freshly generated.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ThreatEvent {
    pub id: Uuid,
    pub timestamp: DateTime<Utc>,
    pub asn_registry_id: Uuid,
    pub source_address: IpAddr,
    pub source_country_id: Option<Uuid>,
    pub destination_address: Option<IpAddr>,
    pub destination_country_id: Option<Uuid>,
    pub source_port: Option<i32>,
    pub destination_port: Option<i32>,
    pub protocol_id: Option<Uuid>,
    pub category: String,
    pub malware_family_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
