//! BSON shape of a threat-intelligence document
//!
//! Collectors were not consistent about scalar types (ports arrive as
//! strings or integers, timestamps as dates or strings), so every field is
//! read as a loose [`Bson`] value and rendered to text afterwards.

use crate::domain::{OptionalInformation, SourceDocument};
use chrono::{DateTime, TimeZone, Utc};
use mongodb::bson::Bson;
use serde::Deserialize;

/// Raw threat-intelligence document as stored in MongoDB
#[derive(Debug, Default, Deserialize)]
pub struct ThreatIntelRecord {
    #[serde(rename = "_id", default)]
    pub id: Option<Bson>,
    #[serde(default)]
    pub asn: Option<Bson>,
    #[serde(default)]
    pub timestamp: Option<Bson>,
    #[serde(default)]
    pub asninfo: Option<Bson>,
    #[serde(default)]
    pub category: Option<Bson>,
    #[serde(default)]
    pub source_address: Option<Bson>,
    #[serde(default)]
    pub source_country: Option<Bson>,
    #[serde(default)]
    pub optional_information: Option<OptionalInformationRecord>,
    #[serde(default)]
    pub created_at: Option<Bson>,
    #[serde(default)]
    pub updated_at: Option<Bson>,
}

/// Raw `optional_information` sub-document
#[derive(Debug, Default, Deserialize)]
pub struct OptionalInformationRecord {
    #[serde(default)]
    pub destination_address: Option<Bson>,
    #[serde(default)]
    pub destination_country: Option<Bson>,
    #[serde(default)]
    pub destination_port: Option<Bson>,
    #[serde(default)]
    pub source_port: Option<Bson>,
    #[serde(default)]
    pub protocol: Option<Bson>,
    #[serde(default)]
    pub family: Option<Bson>,
}

/// Renders a scalar BSON value as text; null, missing and nested values are empty
fn text(value: &Option<Bson>) -> String {
    match value {
        Some(Bson::String(s)) => s.clone(),
        Some(Bson::ObjectId(oid)) => oid.to_hex(),
        Some(Bson::Int32(n)) => n.to_string(),
        Some(Bson::Int64(n)) => n.to_string(),
        Some(Bson::Double(n)) if n.fract() == 0.0 => format!("{}", *n as i64),
        Some(Bson::Double(n)) => n.to_string(),
        Some(Bson::Boolean(b)) => b.to_string(),
        _ => String::new(),
    }
}

/// Reads a BSON date, epoch-millisecond integer, or RFC 3339 string
fn timestamp(value: &Option<Bson>) -> Option<DateTime<Utc>> {
    match value {
        Some(Bson::DateTime(dt)) => Utc.timestamp_millis_opt(dt.timestamp_millis()).single(),
        Some(Bson::Int64(millis)) => Utc.timestamp_millis_opt(*millis).single(),
        Some(Bson::String(s)) => DateTime::parse_from_rfc3339(s.trim())
            .ok()
            .map(|dt| dt.with_timezone(&Utc)),
        _ => None,
    }
}

impl From<ThreatIntelRecord> for SourceDocument {
    fn from(record: ThreatIntelRecord) -> Self {
        let optional = record.optional_information.unwrap_or_default();
        SourceDocument {
            id: text(&record.id),
            timestamp: timestamp(&record.timestamp),
            asn: text(&record.asn),
            asn_info: text(&record.asninfo),
            category: text(&record.category),
            source_address: text(&record.source_address),
            source_country: text(&record.source_country),
            optional: OptionalInformation {
                destination_address: text(&optional.destination_address),
                destination_country: text(&optional.destination_country),
                destination_port: text(&optional.destination_port),
                source_port: text(&optional.source_port),
                protocol: text(&optional.protocol),
                family: text(&optional.family),
            },
            created_at: timestamp(&record.created_at),
            updated_at: timestamp(&record.updated_at),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mongodb::bson::{doc, oid::ObjectId, DateTime as BsonDateTime};

    #[test]
    fn test_record_conversion() {
        let oid = ObjectId::new();
        let raw = doc! {
            "_id": oid,
            "asn": "AS138062",
            "timestamp": BsonDateTime::from_millis(1_714_552_200_000),
            "asninfo": "PT Example Network",
            "category": "BOT",
            "source_address": "103.129.222.46",
            "source_country": "ID",
            "optional_information": {
                "destination_address": "137.175.90.212",
                "destination_port": 80,
                "protocol": "tcp",
            },
        };

        let record: ThreatIntelRecord = mongodb::bson::from_document(raw).unwrap();
        let document = SourceDocument::from(record);

        assert_eq!(document.id, oid.to_hex());
        assert_eq!(document.asn, "AS138062");
        assert_eq!(
            document.timestamp.unwrap().timestamp_millis(),
            1_714_552_200_000
        );
        assert_eq!(document.optional.destination_port, "80");
        assert_eq!(document.optional.protocol, "tcp");
        assert_eq!(document.optional.family, "");
        assert!(document.created_at.is_none());
    }

    #[test]
    fn test_missing_fields_decode_empty() {
        let record: ThreatIntelRecord = mongodb::bson::from_document(doc! {}).unwrap();
        let document = SourceDocument::from(record);
        assert!(document.id.is_empty());
        assert!(document.timestamp.is_none());
        assert!(document.category.is_empty());
    }

    #[test]
    fn test_string_timestamp() {
        let value = Some(Bson::String("2024-05-01T08:30:00Z".to_string()));
        assert_eq!(timestamp(&value).unwrap().timestamp(), 1_714_552_200);
        assert!(timestamp(&Some(Bson::String("yesterday".into()))).is_none());
    }

    #[test]
    fn test_numeric_text() {
        assert_eq!(text(&Some(Bson::Double(443.0))), "443");
        assert_eq!(text(&Some(Bson::Int32(22))), "22");
        assert_eq!(text(&Some(Bson::Null)), "");
    }
}
