//! Node records as kept by the controller's directory.
//!
//! The node id is the first 8 hex chars of `md5(lowercase(domain))`. It is a
//! stable lookup key, not a security token.

use crate::CodecError;
use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};
use serde::{Deserialize, Deserializer, Serialize};

const NODE_ID_LEN: usize = 8;
const MAX_DOMAIN_LEN: usize = 255;
const MAX_NAME_LEN: usize = 64;

/// Last observed reachability of a node agent.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeStatus {
    #[default]
    Unknown,
    Online,
    Offline,
}

/// One relay node registered with the controller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeRecord {
    /// Empty when the registry keeps the id only as the map key; the
    /// directory fills it in on read.
    #[serde(default)]
    pub id: String,
    pub name: String,
    pub domain: String,
    #[serde(rename = "https", default = "default_https")]
    pub use_https: bool,
    #[serde(default)]
    pub status: NodeStatus,
    #[serde(
        default,
        deserialize_with = "lenient_timestamp",
        skip_serializing_if = "Option::is_none"
    )]
    pub added_at: Option<DateTime<Utc>>,
    #[serde(
        default,
        deserialize_with = "lenient_timestamp",
        skip_serializing_if = "Option::is_none"
    )]
    pub last_check: Option<DateTime<Utc>>,
}

fn default_https() -> bool {
    true
}

/// RFC 3339, or a zone-less ISO 8601 datetime taken as UTC.
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
        .map(|naive| Utc.from_utc_datetime(&naive))
}

fn lenient_timestamp<'de, D>(de: D) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<String>::deserialize(de)? {
        None => Ok(None),
        Some(raw) if raw.trim().is_empty() => Ok(None),
        Some(raw) => parse_timestamp(&raw)
            .map(Some)
            .ok_or_else(|| serde::de::Error::custom(format!("invalid timestamp {raw:?}"))),
    }
}

impl NodeRecord {
    /// Validate operator input and build a fresh record with a derived id.
    pub fn new(name: &str, domain: &str, use_https: bool) -> Result<Self, CodecError> {
        let name = sanitize_name(name);
        let domain = sanitize_domain(domain)?;
        if name.is_empty() {
            return Err(CodecError::validation(
                format!("node {domain}"),
                "name is empty after sanitizing",
            ));
        }
        Ok(Self {
            id: node_id(&domain),
            name,
            domain,
            use_https,
            status: NodeStatus::Unknown,
            added_at: Some(Utc::now()),
            last_check: None,
        })
    }

    /// Record the outcome of a status probe.
    pub fn mark_checked(&mut self, reachable: bool, at: DateTime<Utc>) {
        self.status = if reachable {
            NodeStatus::Online
        } else {
            NodeStatus::Offline
        };
        self.last_check = Some(at);
    }
}

/// Derive the directory key for a domain.
pub fn node_id(domain: &str) -> String {
    let digest = md5::compute(domain.to_ascii_lowercase().as_bytes());
    let mut hex = format!("{digest:x}");
    hex.truncate(NODE_ID_LEN);
    hex
}

/// Accept `[A-Za-z0-9]([A-Za-z0-9.-]*[A-Za-z0-9])?`, no `..`, lowercased.
pub fn sanitize_domain(domain: &str) -> Result<String, CodecError> {
    let domain = domain.trim();
    let invalid = |reason: &str| CodecError::validation(format!("domain {domain:?}"), reason);

    if domain.is_empty() {
        return Err(invalid("empty"));
    }
    if domain.len() > MAX_DOMAIN_LEN {
        return Err(invalid("longer than 255 characters"));
    }
    if !domain
        .bytes()
        .all(|b| b.is_ascii_alphanumeric() || b == b'-' || b == b'.')
    {
        return Err(invalid("only letters, digits, '-' and '.' are allowed"));
    }
    let first = domain.as_bytes()[0];
    let last = domain.as_bytes()[domain.len() - 1];
    if !first.is_ascii_alphanumeric() || !last.is_ascii_alphanumeric() {
        return Err(invalid("must start and end with a letter or digit"));
    }
    if domain.contains("..") {
        return Err(invalid("empty label"));
    }
    Ok(domain.to_ascii_lowercase())
}

/// Keep alphanumerics, `-`, `_` and whitespace; cap at 64 chars.
pub fn sanitize_name(name: &str) -> String {
    name.chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == '-' || *c == '_' || c.is_whitespace())
        .take(MAX_NAME_LEN)
        .collect::<String>()
        .trim()
        .to_string()
}

/// Node ids are exactly 8 lowercase hex chars.
pub fn validate_node_id(id: &str) -> Result<&str, CodecError> {
    if id.len() == NODE_ID_LEN && id.bytes().all(|b| matches!(b, b'0'..=b'9' | b'a'..=b'f')) {
        Ok(id)
    } else {
        Err(CodecError::validation(
            format!("node {id:?}"),
            "node id must be 8 lowercase hex characters",
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn node_id_is_md5_prefix_of_lowercased_domain() {
        // md5("example.com") = 5ababd603b22780302dd8d83498e5172
        assert_eq!(node_id("example.com"), "5ababd60");
        assert_eq!(node_id("EXAMPLE.com"), "5ababd60");
    }

    #[test]
    fn new_record_derives_id_and_lowercases() {
        let rec = NodeRecord::new("Tokyo 1", "Node.Example.com", true).unwrap();
        assert_eq!(rec.domain, "node.example.com");
        assert_eq!(rec.id, node_id("node.example.com"));
        assert_eq!(rec.status, NodeStatus::Unknown);
        assert!(rec.added_at.is_some());
    }

    #[test]
    fn domain_validation() {
        assert!(sanitize_domain("a.b-c.d").is_ok());
        assert!(sanitize_domain("").is_err());
        assert!(sanitize_domain("-bad.com").is_err());
        assert!(sanitize_domain("bad-.com-").is_err());
        assert!(sanitize_domain("a..b").is_err());
        assert!(sanitize_domain("a.com; rm -rf /").is_err());
    }

    #[test]
    fn name_sanitizing() {
        assert_eq!(sanitize_name("HK <script>01"), "HK script01");
        assert_eq!(sanitize_name(&"x".repeat(100)).len(), 64);
        assert!(NodeRecord::new("<>", "a.com", true).is_err());
    }

    #[test]
    fn node_id_validation() {
        assert!(validate_node_id("5ababd60").is_ok());
        assert!(validate_node_id("5ABABD60").is_err());
        assert!(validate_node_id("5ababd6").is_err());
        assert!(validate_node_id("../etc/p").is_err());
    }

    #[test]
    fn record_json_uses_https_key() {
        let rec = NodeRecord::new("n", "a.com", false).unwrap();
        let v = serde_json::to_value(&rec).unwrap();
        assert_eq!(v["https"], false);
        assert_eq!(v["status"], "unknown");

        let back: NodeRecord =
            serde_json::from_str(r#"{"id":"x","name":"n","domain":"a.com"}"#).unwrap();
        assert!(back.use_https);
    }

    #[test]
    fn timestamps_with_or_without_zone() {
        let zoned = parse_timestamp("2024-05-01T12:00:00+02:00").unwrap();
        assert_eq!(zoned.to_rfc3339(), "2024-05-01T10:00:00+00:00");
        let naive = parse_timestamp("2024-05-01T12:00:00.123456").unwrap();
        assert_eq!(naive.timestamp(), 1_714_564_800);
        assert!(parse_timestamp("yesterday").is_none());

        let rec: NodeRecord = serde_json::from_str(
            r#"{"name":"n","domain":"a.com","added_at":"2024-05-01T12:00:00","status":"online"}"#,
        )
        .unwrap();
        assert_eq!(rec.id, "");
        assert_eq!(rec.added_at, Some(naive - chrono::Duration::microseconds(123_456)));
        assert_eq!(rec.status, NodeStatus::Online);

        let round: NodeRecord =
            serde_json::from_value(serde_json::to_value(&rec).unwrap()).unwrap();
        assert_eq!(round, rec);
    }
}
