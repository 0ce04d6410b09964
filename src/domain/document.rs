//! Source documents as read from the threat-intelligence collection

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Identifier used in logs when a document carries no `_id`
pub const MISSING_ID: &str = "<missing>";

/// One threat-intelligence document
///
/// Fields absent in the source are empty strings or `None`; structural
/// checks happen in the validate stage, not while decoding.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SourceDocument {
    /// Source-native identifier (hex ObjectId)
    pub id: String,
    pub timestamp: Option<DateTime<Utc>>,
    pub asn: String,
    pub asn_info: String,
    pub category: String,
    pub source_address: String,
    pub source_country: String,
    pub optional: OptionalInformation,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

/// The nested `optional_information` block
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OptionalInformation {
    pub destination_address: String,
    pub destination_country: String,
    pub destination_port: String,
    pub source_port: String,
    pub protocol: String,
    pub family: String,
}

impl SourceDocument {
    /// Identifier for logs and error records
    pub fn log_id(&self) -> &str {
        if self.id.trim().is_empty() {
            MISSING_ID
        } else {
            &self.id
        }
    }

    /// Whether the timestamp is absent or the Unix epoch
    pub fn has_zero_timestamp(&self) -> bool {
        self.timestamp.map_or(true, |ts| ts.timestamp_millis() == 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_log_id_falls_back_when_missing() {
        let doc = SourceDocument::default();
        assert_eq!(doc.log_id(), MISSING_ID);

        let doc = SourceDocument {
            id: "65f0c0ffee".into(),
            ..Default::default()
        };
        assert_eq!(doc.log_id(), "65f0c0ffee");
    }

    #[test]
    fn test_zero_timestamp() {
        let mut doc = SourceDocument::default();
        assert!(doc.has_zero_timestamp());

        doc.timestamp = Some(Utc.timestamp_opt(0, 0).unwrap());
        assert!(doc.has_zero_timestamp());

        doc.timestamp = Some(Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap());
        assert!(!doc.has_zero_timestamp());
    }
}
