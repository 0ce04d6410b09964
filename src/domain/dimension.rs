//! Dimension (lookup) tables referenced by threat events

use serde::Serialize;
use std::fmt;

/// A dimension table keyed by a unique natural key
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum Dimension {
    Asn,
    Country,
    Protocol,
    MalwareFamily,
}

impl Dimension {
    pub const ALL: [Dimension; 4] = [
        Dimension::Asn,
        Dimension::Country,
        Dimension::Protocol,
        Dimension::MalwareFamily,
    ];

    /// Quoted table name
    pub fn table(&self) -> &'static str {
        match self {
            Dimension::Asn => "\"AsnRegistries\"",
            Dimension::Country => "\"Countries\"",
            Dimension::Protocol => "\"Protocols\"",
            Dimension::MalwareFamily => "\"MalwareFamilies\"",
        }
    }

    /// Quoted natural key column
    pub fn key_column(&self) -> &'static str {
        match self {
            Dimension::Asn => "\"Number\"",
            Dimension::Country => "\"Code\"",
            Dimension::Protocol | Dimension::MalwareFamily => "\"Name\"",
        }
    }

    /// Quoted descriptive column, if the table has one
    pub fn description_column(&self) -> Option<&'static str> {
        match self {
            Dimension::Asn => Some("\"Description\""),
            Dimension::Country => Some("\"Name\""),
            Dimension::Protocol | Dimension::MalwareFamily => None,
        }
    }

    /// Maximum rows loaded into the cache at startup
    pub fn preload_limit(&self) -> i64 {
        match self {
            Dimension::Asn => 200_000,
            _ => 10_000,
        }
    }
}

impl fmt::Display for Dimension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Dimension::Asn => "asn",
            Dimension::Country => "country",
            Dimension::Protocol => "protocol",
            Dimension::MalwareFamily => "malware_family",
        };
        f.write_str(name)
    }
}

/// Descriptive values written alongside a newly created dimension row
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DimensionAttributes {
    /// ASN description or country name
    pub description: Option<String>,
}

impl DimensionAttributes {
    pub fn described(description: impl Into<String>) -> Self {
        Self {
            description: Some(description.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dimension_columns() {
        assert_eq!(Dimension::Asn.table(), "\"AsnRegistries\"");
        assert_eq!(Dimension::Country.key_column(), "\"Code\"");
        assert_eq!(Dimension::Country.description_column(), Some("\"Name\""));
        assert_eq!(Dimension::Protocol.description_column(), None);
        assert_eq!(Dimension::Asn.preload_limit(), 200_000);
        assert_eq!(Dimension::MalwareFamily.preload_limit(), 10_000);
    }
}
