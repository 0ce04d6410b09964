//! Per-document transform pipeline
//!
//! Runs validation, sanitization, normalization and dimension resolution in
//! order and produces a destination-ready [`ThreatEvent`].

use crate::core::dimension::DimensionResolver;
use crate::core::transform::normalize::{
    normalize_asn, normalize_asn_info, normalize_category, normalize_country,
    normalize_malware_family, normalize_protocol, parse_ip, parse_port,
};
use crate::core::transform::sanitize::sanitize_text;
use crate::core::transform::validate::validate_document;
use crate::domain::context::ResultExt;
use crate::domain::{
    Dimension, DimensionAttributes, MigrateError, OptionalInformation, Result, SourceDocument,
    ThreatEvent,
};
use chrono::{DateTime, Utc};
use std::sync::Arc;
use uuid::Uuid;

/// Turns source documents into threat events
pub struct Transformer {
    resolver: Arc<DimensionResolver>,
}

impl Transformer {
    pub fn new(resolver: Arc<DimensionResolver>) -> Self {
        Self { resolver }
    }

    pub fn resolver(&self) -> &Arc<DimensionResolver> {
        &self.resolver
    }

    /// Transforms one document
    ///
    /// `now` fills `created_at`/`updated_at` when the source lacks them.
    ///
    /// # Errors
    ///
    /// - [`MigrateError::Validation`] when a required field is missing
    /// - [`MigrateError::Transformation`] when a required field cannot be
    ///   parsed, normalized or resolved
    /// - any retryable store error hit while resolving the ASN, so the
    ///   caller can retry the whole batch
    pub async fn transform(
        &self,
        document: &SourceDocument,
        now: DateTime<Utc>,
    ) -> Result<ThreatEvent> {
        validate_document(document)?;
        let timestamp = document
            .timestamp
            .ok_or_else(|| MigrateError::Validation("timestamp is missing".to_string()))?;

        let doc = sanitized(document);
        let id = doc.log_id().to_string();

        let source_address = parse_ip(&doc.source_address).context("source_address")?;

        let asn = normalize_asn(&doc.asn)?;
        let asn_info = normalize_asn_info(&doc.asn_info);
        let asn_registry_id = self
            .resolver
            .get_or_create(Dimension::Asn, &asn, &DimensionAttributes::described(asn_info))
            .await
            .map_err(|e| required_resolution_error(&asn, e))?;

        let category = normalize_category(&doc.category).ok_or_else(|| {
            MigrateError::Transformation("category is empty after normalization".to_string())
        })?;

        let optional = &doc.optional;
        let source_country_id = self
            .resolve_country(&id, "source_country", &doc.source_country)
            .await;
        let destination_country_id = self
            .resolve_country(&id, "destination_country", &optional.destination_country)
            .await;
        let protocol_id = self
            .resolve_optional(
                &id,
                "protocol",
                Dimension::Protocol,
                normalize_protocol(&optional.protocol),
                DimensionAttributes::default(),
            )
            .await;
        let malware_family_id = self
            .resolve_optional(
                &id,
                "family",
                Dimension::MalwareFamily,
                normalize_malware_family(&optional.family),
                DimensionAttributes::default(),
            )
            .await;

        Ok(ThreatEvent {
            id: Uuid::new_v4(),
            timestamp,
            asn_registry_id,
            source_address,
            source_country_id,
            destination_address: optional_field(
                &id,
                "destination_address",
                &optional.destination_address,
                parse_ip,
            ),
            destination_country_id,
            source_port: optional_field(&id, "source_port", &optional.source_port, parse_port),
            destination_port: optional_field(
                &id,
                "destination_port",
                &optional.destination_port,
                parse_port,
            ),
            protocol_id,
            category,
            malware_family_id,
            created_at: doc.created_at.unwrap_or(now),
            updated_at: doc.updated_at.unwrap_or(now),
        })
    }

    async fn resolve_country(&self, id: &str, field: &str, raw: &str) -> Option<Uuid> {
        if raw.trim().is_empty() {
            return None;
        }
        let Some(code) = normalize_country(raw) else {
            tracing::warn!(document_id = %id, field, value = %raw, "Unrecognized country, field dropped");
            return None;
        };
        self.resolve_optional(
            id,
            field,
            Dimension::Country,
            Some(code),
            DimensionAttributes::described(raw.trim()),
        )
        .await
    }

    async fn resolve_optional(
        &self,
        id: &str,
        field: &str,
        dimension: Dimension,
        key: Option<String>,
        attributes: DimensionAttributes,
    ) -> Option<Uuid> {
        let key = key?;
        match self.resolver.get_or_create(dimension, &key, &attributes).await {
            Ok(dimension_id) => Some(dimension_id),
            Err(e) => {
                tracing::warn!(
                    document_id = %id,
                    field,
                    key = %key,
                    error = %e,
                    "Failed to resolve optional dimension, field dropped"
                );
                None
            }
        }
    }
}

/// Retryable store faults pass through untouched; anything else fails the document
fn required_resolution_error(asn: &str, err: MigrateError) -> MigrateError {
    match err {
        MigrateError::Transformation(_) => err,
        e if e.is_retryable() => e,
        e => MigrateError::Transformation(format!("failed to resolve ASN '{asn}': {e}")),
    }
}

/// Parses an optional field; a parse failure logs a warning and yields `None`
fn optional_field<T>(
    id: &str,
    field: &str,
    raw: &str,
    parse: impl Fn(&str) -> Result<T>,
) -> Option<T> {
    if raw.trim().is_empty() {
        return None;
    }
    match parse(raw) {
        Ok(value) => Some(value),
        Err(e) => {
            tracing::warn!(document_id = %id, field, value = %raw, error = %e, "Invalid optional field dropped");
            None
        }
    }
}

fn sanitized(document: &SourceDocument) -> SourceDocument {
    let optional = &document.optional;
    SourceDocument {
        id: sanitize_text(&document.id),
        timestamp: document.timestamp,
        asn: sanitize_text(&document.asn),
        asn_info: sanitize_text(&document.asn_info),
        category: sanitize_text(&document.category),
        source_address: sanitize_text(&document.source_address),
        source_country: sanitize_text(&document.source_country),
        optional: OptionalInformation {
            destination_address: sanitize_text(&optional.destination_address),
            destination_country: sanitize_text(&optional.destination_country),
            destination_port: sanitize_text(&optional.destination_port),
            source_port: sanitize_text(&optional.source_port),
            protocol: sanitize_text(&optional.protocol),
            family: sanitize_text(&optional.family),
        },
        created_at: document.created_at,
        updated_at: document.updated_at,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::memory::MemoryStore;
    use chrono::TimeZone;

    fn transformer() -> (Arc<MemoryStore>, Transformer) {
        let store = Arc::new(MemoryStore::new());
        let resolver = Arc::new(DimensionResolver::new(store.clone()));
        (store, Transformer::new(resolver))
    }

    fn document() -> SourceDocument {
        SourceDocument {
            id: "6630f0a1c2d3e4f5a6b7c8d9".to_string(),
            timestamp: Some(Utc.with_ymd_and_hms(2024, 5, 1, 8, 30, 0).unwrap()),
            asn: "AS138062".to_string(),
            asn_info: "PT Example Network".to_string(),
            category: "BOT".to_string(),
            source_address: "103.129.222.46".to_string(),
            source_country: "ID".to_string(),
            optional: OptionalInformation {
                destination_address: "137.175.90.212".to_string(),
                destination_port: "80".to_string(),
                protocol: "tcp".to_string(),
                ..Default::default()
            },
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_transform_full_document() {
        let (store, transformer) = transformer();
        let now = Utc::now();

        let event = transformer.transform(&document(), now).await.unwrap();

        assert_eq!(event.category, "bot");
        assert_eq!(event.source_address.to_string(), "103.129.222.46");
        assert_eq!(
            event.destination_address.map(|ip| ip.to_string()),
            Some("137.175.90.212".to_string())
        );
        assert_eq!(event.destination_port, Some(80));
        assert_eq!(event.source_port, None);
        assert!(event.source_country_id.is_some());
        assert!(event.destination_country_id.is_none());
        assert!(event.malware_family_id.is_none());
        assert_eq!(event.created_at, now);

        let protocols = store.dimension_rows(Dimension::Protocol);
        assert_eq!(protocols.len(), 1);
        assert_eq!(protocols[0].key, "TCP");
        assert_eq!(Some(protocols[0].id), event.protocol_id);

        let asns = store.dimension_rows(Dimension::Asn);
        assert_eq!(asns[0].key, "AS138062");
        assert_eq!(asns[0].description.as_deref(), Some("PT Example Network"));
    }

    #[tokio::test]
    async fn test_invalid_optional_fields_are_dropped() {
        let (_, transformer) = transformer();
        let mut doc = document();
        doc.optional.destination_port = "70000".to_string();
        doc.optional.source_port = "abc".to_string();
        doc.optional.destination_address = "0.0.0.0".to_string();
        doc.optional.destination_country = "Atlantis".to_string();

        let event = transformer.transform(&doc, Utc::now()).await.unwrap();

        assert_eq!(event.destination_port, None);
        assert_eq!(event.source_port, None);
        assert_eq!(event.destination_address, None);
        assert_eq!(event.destination_country_id, None);
    }

    #[tokio::test]
    async fn test_invalid_source_address_is_transformation_error() {
        let (store, transformer) = transformer();
        let mut doc = document();
        doc.source_address = "not-an-ip".to_string();

        let err = transformer.transform(&doc, Utc::now()).await.unwrap_err();
        assert!(matches!(err, MigrateError::Transformation(_)));
        assert!(err.to_string().contains("source_address"));
        assert!(store.dimension_rows(Dimension::Asn).is_empty());
    }

    #[tokio::test]
    async fn test_invalid_asn_is_transformation_error() {
        let (_, transformer) = transformer();
        let mut doc = document();
        doc.asn = "unknown".to_string();

        let err = transformer.transform(&doc, Utc::now()).await.unwrap_err();
        assert!(matches!(err, MigrateError::Transformation(_)));
    }

    #[tokio::test]
    async fn test_missing_category_is_validation_error() {
        let (_, transformer) = transformer();
        let mut doc = document();
        doc.category = String::new();

        let err = transformer.transform(&doc, Utc::now()).await.unwrap_err();
        assert!(matches!(err, MigrateError::Validation(_)));
    }

    #[tokio::test]
    async fn test_control_characters_stripped_before_lookup() {
        let (store, transformer) = transformer();
        let mut doc = document();
        doc.category = "bot\0net".to_string();
        doc.optional.protocol = "u\u{1}dp".to_string();

        let event = transformer.transform(&doc, Utc::now()).await.unwrap();
        assert_eq!(event.category, "botnet");
        assert_eq!(store.dimension_rows(Dimension::Protocol)[0].key, "UDP");
    }

    #[test]
    fn test_required_resolution_error_mapping() {
        let err = required_resolution_error("AS1", MigrateError::Connection("reset".into()));
        assert!(matches!(err, MigrateError::Connection(_)));

        let err = required_resolution_error(
            "AS1",
            MigrateError::Database("value too long for type character varying".into()),
        );
        assert!(matches!(err, MigrateError::Transformation(_)));
    }
}
