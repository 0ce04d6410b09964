//! PostgreSQL row encodings for threat events
//!
//! The COPY path sends rows in PostgreSQL's text format; the row path binds
//! the same columns as statement parameters.

use crate::domain::ThreatEvent;
use chrono::SecondsFormat;

/// Column list shared by both load paths, in bind order
pub const EVENT_COLUMNS: &str = r#""Id", "Timestamp", "AsnRegistryId", "SourceAddress", "SourceCountryId", "DestinationAddress", "DestinationCountryId", "SourcePort", "DestinationPort", "ProtocolId", "Category", "MalwareFamilyId", "CreatedAt", "UpdatedAt""#;

/// Rows sent per `CopyInSink::send` call
pub const COPY_CHUNK_ROWS: usize = 1_000;

pub fn copy_statement() -> String {
    format!(r#"COPY "ThreatEvents" ({EVENT_COLUMNS}) FROM STDIN WITH (FORMAT text)"#)
}

pub fn insert_statement() -> String {
    format!(
        r#"INSERT INTO "ThreatEvents" ({EVENT_COLUMNS}) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14)"#
    )
}

/// Escapes one field for COPY text format; `None` is the NULL marker
fn escape_copy_value(value: Option<&str>) -> String {
    match value {
        None => "\\N".to_string(),
        Some(s) => s
            .replace('\\', "\\\\")
            .replace('\t', "\\t")
            .replace('\n', "\\n")
            .replace('\r', "\\r"),
    }
}

fn optional<T: ToString>(value: Option<T>) -> Option<String> {
    value.map(|v| v.to_string())
}

/// Appends one event as a tab-separated, newline-terminated COPY row
pub fn append_copy_row(buffer: &mut String, event: &ThreatEvent) {
    let fields: [Option<String>; 14] = [
        Some(event.id.to_string()),
        Some(event.timestamp.to_rfc3339_opts(SecondsFormat::Micros, true)),
        Some(event.asn_registry_id.to_string()),
        Some(event.source_address.to_string()),
        optional(event.source_country_id),
        optional(event.destination_address),
        optional(event.destination_country_id),
        optional(event.source_port),
        optional(event.destination_port),
        optional(event.protocol_id),
        Some(event.category.clone()),
        optional(event.malware_family_id),
        Some(event.created_at.to_rfc3339_opts(SecondsFormat::Micros, true)),
        Some(event.updated_at.to_rfc3339_opts(SecondsFormat::Micros, true)),
    ];

    for (index, field) in fields.iter().enumerate() {
        if index > 0 {
            buffer.push('\t');
        }
        buffer.push_str(&escape_copy_value(field.as_deref()));
    }
    buffer.push('\n');
}

/// Encodes a slice of events as one COPY payload
pub fn encode_copy_rows(events: &[ThreatEvent]) -> String {
    let mut buffer = String::with_capacity(events.len() * 256);
    for event in events {
        append_copy_row(&mut buffer, event);
    }
    buffer
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use uuid::Uuid;

    fn event() -> ThreatEvent {
        let ts = Utc.with_ymd_and_hms(2024, 5, 1, 8, 30, 0).unwrap();
        ThreatEvent {
            id: Uuid::nil(),
            timestamp: ts,
            asn_registry_id: Uuid::nil(),
            source_address: "103.129.222.46".parse().unwrap(),
            source_country_id: None,
            destination_address: Some("137.175.90.212".parse().unwrap()),
            destination_country_id: None,
            source_port: None,
            destination_port: Some(80),
            protocol_id: None,
            category: "bot".to_string(),
            malware_family_id: None,
            created_at: ts,
            updated_at: ts,
        }
    }

    #[test]
    fn test_escape_copy_value() {
        assert_eq!(escape_copy_value(None), "\\N");
        assert_eq!(escape_copy_value(Some("a\tb\nc\\d\re")), "a\\tb\\nc\\\\d\\re");
    }

    #[test]
    fn test_copy_row_layout() {
        let row = encode_copy_rows(&[event()]);
        assert!(row.ends_with('\n'));

        let fields: Vec<&str> = row.trim_end_matches('\n').split('\t').collect();
        assert_eq!(fields.len(), 14);
        assert_eq!(fields[1], "2024-05-01T08:30:00.000000Z");
        assert_eq!(fields[3], "103.129.222.46");
        assert_eq!(fields[4], "\\N");
        assert_eq!(fields[5], "137.175.90.212");
        assert_eq!(fields[8], "80");
        assert_eq!(fields[10], "bot");
    }

    #[test]
    fn test_statements_share_columns() {
        assert!(copy_statement().contains(EVENT_COLUMNS));
        assert!(insert_statement().contains("$14"));
        assert!(!insert_statement().contains("$15"));
    }
}
