//! Field normalization rules and lookup tables
//!
//! Each function takes an already sanitized field. Required fields return a
//! [`MigrateError::Transformation`] when they cannot be normalized; optional
//! fields return `None` (or an error the caller downgrades to a warning).

use crate::core::transform::sanitize::{collapse_whitespace, truncate_chars};
use crate::domain::{MigrateError, Result};
use std::net::IpAddr;

/// Maximum stored length of an ASN description
pub const ASN_INFO_MAX_CHARS: usize = 255;
/// Maximum stored length of a category
pub const CATEGORY_MAX_CHARS: usize = 50;
/// Maximum stored length of an unmapped protocol name
pub const PROTOCOL_MAX_CHARS: usize = 20;
/// Maximum stored length of an unmapped malware family name
pub const MALWARE_FAMILY_MAX_CHARS: usize = 100;

const UNKNOWN_ASN: &str = "Unknown ASN";

const CATEGORY_SYNONYMS: &[(&str, &str)] = &[
    ("malware", "malware"),
    ("botnet", "botnet"),
    ("phishing", "phishing"),
    ("spam", "spam"),
    ("c&c", "c2"),
    ("c2", "c2"),
    ("command", "c2"),
    ("control", "c2"),
    ("exploit", "exploit"),
    ("bruteforce", "brute_force"),
    ("brute force", "brute_force"),
    ("ddos", "ddos"),
    ("dos", "dos"),
    ("scanner", "scanner"),
    ("scan", "scanner"),
];

const COUNTRY_NAMES: &[(&str, &str)] = &[
    ("UNITED STATES", "US"),
    ("USA", "US"),
    ("AMERICA", "US"),
    ("UNITED KINGDOM", "GB"),
    ("UK", "GB"),
    ("GREAT BRITAIN", "GB"),
    ("CHINA", "CN"),
    ("RUSSIA", "RU"),
    ("RUSSIAN FEDERATION", "RU"),
    ("GERMANY", "DE"),
    ("FRANCE", "FR"),
    ("JAPAN", "JP"),
    ("CANADA", "CA"),
    ("AUSTRALIA", "AU"),
    ("BRAZIL", "BR"),
    ("INDIA", "IN"),
    ("SOUTH KOREA", "KR"),
    ("KOREA", "KR"),
    ("NETHERLANDS", "NL"),
    ("HOLLAND", "NL"),
    ("SPAIN", "ES"),
    ("ITALY", "IT"),
    ("SWEDEN", "SE"),
    ("NORWAY", "NO"),
    ("DENMARK", "DK"),
    ("FINLAND", "FI"),
    ("POLAND", "PL"),
    ("UKRAINE", "UA"),
    ("TURKEY", "TR"),
    ("ISRAEL", "IL"),
    ("SOUTH AFRICA", "ZA"),
    ("MEXICO", "MX"),
    ("ARGENTINA", "AR"),
    ("CHILE", "CL"),
    ("COLOMBIA", "CO"),
    ("VENEZUELA", "VE"),
    ("PERU", "PE"),
    ("ECUADOR", "EC"),
    ("BOLIVIA", "BO"),
    ("URUGUAY", "UY"),
    ("PARAGUAY", "PY"),
    ("THAILAND", "TH"),
    ("VIETNAM", "VN"),
    ("SINGAPORE", "SG"),
    ("MALAYSIA", "MY"),
    ("INDONESIA", "ID"),
    ("PHILIPPINES", "PH"),
    ("TAIWAN", "TW"),
    ("HONG KONG", "HK"),
    ("NEW ZEALAND", "NZ"),
    ("SWITZERLAND", "CH"),
    ("AUSTRIA", "AT"),
    ("BELGIUM", "BE"),
    ("PORTUGAL", "PT"),
    ("GREECE", "GR"),
    ("CZECH REPUBLIC", "CZ"),
    ("HUNGARY", "HU"),
    ("ROMANIA", "RO"),
    ("BULGARIA", "BG"),
    ("CROATIA", "HR"),
    ("SERBIA", "RS"),
    ("SLOVENIA", "SI"),
    ("SLOVAKIA", "SK"),
    ("ESTONIA", "EE"),
    ("LATVIA", "LV"),
    ("LITHUANIA", "LT"),
    ("IRELAND", "IE"),
    ("ICELAND", "IS"),
    ("LUXEMBOURG", "LU"),
    ("MALTA", "MT"),
    ("CYPRUS", "CY"),
];

const KNOWN_PROTOCOLS: &[&str] = &[
    "TCP", "UDP", "ICMP", "HTTP", "HTTPS", "FTP", "SSH", "DNS", "SMTP", "POP3", "IMAP", "TELNET",
    "SNMP", "DHCP", "TFTP", "NTP", "LDAP", "SIP", "RTP", "RTCP", "H323", "MGCP", "SCTP", "GRE",
    "ESP", "AH", "OSPF", "BGP", "RIP", "EIGRP", "ISIS", "VRRP", "HSRP", "GLBP", "LACP", "STP",
    "RSTP", "MSTP", "LLDP", "CDP", "VTP", "DTP", "PAGP", "UDLD", "BPDU", "ARP", "RARP", "BOOTP",
    "RADIUS", "TACACS", "TACACS+", "KERBEROS", "IPV6", "ICMPV6", "MLDV2", "IGMP", "PIM", "DVMRP",
    "MOSPF",
];

const IANA_PROTOCOL_NUMBERS: &[(u64, &str)] = &[
    (1, "ICMP"),
    (6, "TCP"),
    (17, "UDP"),
    (47, "GRE"),
    (50, "ESP"),
    (51, "AH"),
    (89, "OSPF"),
    (132, "SCTP"),
];

const MALWARE_FAMILY_SYNONYMS: &[(&str, &str)] = &[
    ("trojan", "trojan"),
    ("backdoor", "backdoor"),
    ("rootkit", "rootkit"),
    ("worm", "worm"),
    ("virus", "virus"),
    ("ransomware", "ransomware"),
    ("spyware", "spyware"),
    ("adware", "adware"),
    ("keylogger", "keylogger"),
    ("botnet", "botnet"),
    ("rat", "rat"),
    ("remote access", "rat"),
    ("banking", "banking_trojan"),
    ("banker", "banking_trojan"),
    ("infostealer", "infostealer"),
    ("info stealer", "infostealer"),
    ("stealer", "infostealer"),
    ("downloader", "downloader"),
    ("dropper", "dropper"),
    ("loader", "loader"),
    ("cryptominer", "cryptominer"),
    ("miner", "cryptominer"),
    ("coinminer", "cryptominer"),
    ("fileless", "fileless"),
    ("apt", "apt"),
    ("advanced persistent", "apt"),
    ("exploit kit", "exploit_kit"),
    ("exploit", "exploit"),
    ("zero day", "zero_day"),
    ("0day", "zero_day"),
    ("polymorphic", "polymorphic"),
    ("metamorphic", "metamorphic"),
    ("packed", "packed"),
    ("obfuscated", "obfuscated"),
    ("webshell", "webshell"),
    ("web shell", "webshell"),
    ("shell", "webshell"),
    ("phishing", "phishing"),
    ("scareware", "scareware"),
    ("fake av", "fake_antivirus"),
    ("fake antivirus", "fake_antivirus"),
    ("rogue", "rogue"),
    ("pup", "pup"),
    ("potentially unwanted", "pup"),
    ("greyware", "greyware"),
    ("suspicious", "suspicious"),
    ("generic", "generic"),
    ("heuristic", "heuristic"),
];

/// Looks `value` up in a synonym table: exact key first, then the longest
/// key contained in `value`. Ties go to the earlier table entry.
fn synonym<'a>(table: &[(&str, &'a str)], value: &str) -> Option<&'a str> {
    if let Some(&(_, canonical)) = table.iter().find(|(key, _)| *key == value) {
        return Some(canonical);
    }

    let mut best: Option<(&str, &'a str)> = None;
    for &(key, canonical) in table {
        if value.contains(key) && best.map_or(true, |(held, _)| key.len() > held.len()) {
            best = Some((key, canonical));
        }
    }
    best.map(|(_, canonical)| canonical)
}

/// Reads the leading unsigned integer of `value`, if any
fn leading_digits(value: &str) -> Option<&str> {
    let end = value
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(value.len());
    (end > 0).then(|| &value[..end])
}

/// Normalizes an ASN to its `AS<n>` natural key
pub fn normalize_asn(raw: &str) -> Result<String> {
    let upper = raw.trim().to_uppercase();
    let stripped = upper
        .strip_prefix("ASN")
        .or_else(|| upper.strip_prefix("AS"))
        .unwrap_or(&upper)
        .trim();

    let digits = leading_digits(stripped)
        .ok_or_else(|| MigrateError::Transformation(format!("invalid ASN '{raw}'")))?;
    let number: u64 = digits
        .parse()
        .map_err(|_| MigrateError::Transformation(format!("ASN '{raw}' is out of range")))?;

    if !(1..=u64::from(u32::MAX)).contains(&number) {
        return Err(MigrateError::Transformation(format!(
            "ASN '{raw}' is out of range"
        )));
    }

    Ok(format!("AS{number}"))
}

/// Cleans an ASN description; empty input becomes `Unknown ASN`
pub fn normalize_asn_info(raw: &str) -> String {
    let collapsed = collapse_whitespace(raw);
    if collapsed.is_empty() {
        return UNKNOWN_ASN.to_string();
    }
    if collapsed.chars().count() > ASN_INFO_MAX_CHARS {
        return format!(
            "{}...",
            truncate_chars(&collapsed, ASN_INFO_MAX_CHARS - 3)
        );
    }
    collapsed
}

/// Maps a category to its canonical token; `None` when nothing is left
pub fn normalize_category(raw: &str) -> Option<String> {
    let normalized = collapse_whitespace(&raw.to_lowercase());
    if normalized.is_empty() {
        return None;
    }
    let canonical = synonym(CATEGORY_SYNONYMS, &normalized)
        .map(str::to_string)
        .unwrap_or(normalized);
    Some(truncate_chars(&canonical, CATEGORY_MAX_CHARS))
}

/// Maps a country name or code to an ISO 3166-1 alpha-2 code
pub fn normalize_country(raw: &str) -> Option<String> {
    let normalized = collapse_whitespace(&raw.to_uppercase());
    if normalized.is_empty() {
        return None;
    }
    if let Some((_, code)) = COUNTRY_NAMES.iter().find(|(name, _)| *name == normalized) {
        return Some(code.to_string());
    }
    if normalized.len() == 2 && normalized.chars().all(|c| c.is_ascii_uppercase()) {
        return Some(normalized);
    }
    None
}

/// Maps a protocol name or IANA number to its canonical name
pub fn normalize_protocol(raw: &str) -> Option<String> {
    let normalized: String = raw
        .to_uppercase()
        .chars()
        .filter(|c| !c.is_whitespace())
        .collect();
    if normalized.is_empty() {
        return None;
    }

    if let Some(known) = KNOWN_PROTOCOLS.iter().find(|p| **p == normalized) {
        return Some(known.to_string());
    }
    if let Some(known) = KNOWN_PROTOCOLS
        .iter()
        .filter(|p| normalized.contains(**p))
        .fold(None::<&str>, |best, p| match best {
            Some(held) if held.len() >= p.len() => Some(held),
            _ => Some(*p),
        })
    {
        return Some(known.to_string());
    }

    if let Some(number) = leading_digits(&normalized).and_then(|d| d.parse::<u64>().ok()) {
        let name = IANA_PROTOCOL_NUMBERS
            .iter()
            .find(|(n, _)| *n == number)
            .map(|(_, name)| name.to_string())
            .unwrap_or_else(|| format!("PROTO_{number}"));
        return Some(name);
    }

    let cleaned: String = normalized
        .chars()
        .filter(|c| c.is_ascii_uppercase() || c.is_ascii_digit() || matches!(c, '_' | '-'))
        .take(PROTOCOL_MAX_CHARS)
        .collect();
    if cleaned.is_empty() {
        Some("UNKNOWN".to_string())
    } else {
        Some(cleaned)
    }
}

/// Maps a malware family to its canonical name
pub fn normalize_malware_family(raw: &str) -> Option<String> {
    let normalized = collapse_whitespace(&raw.to_lowercase());
    if normalized.is_empty() {
        return None;
    }
    if let Some(canonical) = synonym(MALWARE_FAMILY_SYNONYMS, &normalized) {
        return Some(canonical.to_string());
    }

    let cleaned: String = normalized
        .chars()
        .filter(|c| {
            c.is_ascii_lowercase() || c.is_ascii_digit() || matches!(c, ' ' | '_' | '-' | '.')
        })
        .collect();
    let cleaned = truncate_chars(&cleaned.trim().replace(' ', "_"), MALWARE_FAMILY_MAX_CHARS);
    if cleaned.is_empty() {
        Some("unknown".to_string())
    } else {
        Some(cleaned)
    }
}

/// Parses an IP literal, rejecting the unspecified address
pub fn parse_ip(raw: &str) -> Result<IpAddr> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(MigrateError::Transformation(
            "IP address is empty".to_string(),
        ));
    }
    let ip: IpAddr = trimmed.parse().map_err(|_| {
        MigrateError::Transformation(format!("invalid IP address '{trimmed}'"))
    })?;
    if ip.is_unspecified() {
        return Err(MigrateError::Transformation(format!(
            "unspecified IP address '{trimmed}'"
        )));
    }
    Ok(ip)
}

/// Parses the leading integer of a port field and checks it is in 1-65535
pub fn parse_port(raw: &str) -> Result<i32> {
    let trimmed = raw.trim();
    let (negative, unsigned) = match trimmed.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, trimmed.strip_prefix('+').unwrap_or(trimmed)),
    };
    let digits = leading_digits(unsigned)
        .ok_or_else(|| MigrateError::Transformation(format!("invalid port '{trimmed}'")))?;

    let port = digits.parse::<i64>().unwrap_or(i64::MAX);
    let port = if negative { -port } else { port };
    if !(1..=65535).contains(&port) {
        return Err(MigrateError::Transformation(format!(
            "port {trimmed} is out of range (1-65535)"
        )));
    }
    Ok(port as i32)
}
