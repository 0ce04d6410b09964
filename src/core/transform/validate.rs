//! Structural validation of source documents

use crate::domain::{MigrateError, Result, SourceDocument};

/// Checks the fields every destination row requires
///
/// # Errors
///
/// Returns [`MigrateError::Validation`] naming the first missing field:
/// identifier, timestamp (absent or epoch zero), source address, or category.
pub fn validate_document(document: &SourceDocument) -> Result<()> {
    if document.id.trim().is_empty() {
        return Err(MigrateError::Validation(
            "document identifier is missing".to_string(),
        ));
    }
    if document.has_zero_timestamp() {
        return Err(MigrateError::Validation(
            "timestamp is missing or zero".to_string(),
        ));
    }
    if document.source_address.trim().is_empty() {
        return Err(MigrateError::Validation(
            "source_address is empty".to_string(),
        ));
    }
    if document.category.trim().is_empty() {
        return Err(MigrateError::Validation("category is empty".to_string()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn valid() -> SourceDocument {
        SourceDocument {
            id: "6630f0a1c2d3e4f5a6b7c8d9".to_string(),
            timestamp: Some(Utc.with_ymd_and_hms(2024, 5, 1, 8, 30, 0).unwrap()),
            source_address: "103.129.222.46".to_string(),
            category: "BOT".to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_valid_document() {
        assert!(validate_document(&valid()).is_ok());
    }

    #[test]
    fn test_missing_fields_rejected() {
        let cases: Vec<(&str, Box<dyn Fn(&mut SourceDocument)>)> = vec![
            ("identifier", Box::new(|d| d.id.clear())),
            ("timestamp", Box::new(|d| d.timestamp = None)),
            (
                "timestamp",
                Box::new(|d| d.timestamp = Utc.timestamp_opt(0, 0).single()),
            ),
            ("source_address", Box::new(|d| d.source_address = "  ".into())),
            ("category", Box::new(|d| d.category.clear())),
        ];

        for (field, mutate) in cases {
            let mut document = valid();
            mutate(&mut document);
            let err = validate_document(&document).unwrap_err();
            assert!(matches!(err, MigrateError::Validation(_)));
            assert!(err.to_string().contains(field), "{err} should name {field}");
        }
    }
}
