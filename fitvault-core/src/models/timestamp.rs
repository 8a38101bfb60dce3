//! ISO-8601 timestamps with an explicit offset, truncated to whole seconds.
//!
//! Used as `#[serde(with = "crate::models::timestamp")]` on every date field
//! that ends up inside a portable document.

use chrono::{DateTime, SecondsFormat, Timelike, Utc};
use serde::{Deserialize, Deserializer, Serializer};

pub fn serialize<S>(value: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    serializer.serialize_str(&format(value))
}

pub fn deserialize<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    parse(&raw).map_err(serde::de::Error::custom)
}

/// Formats as `2025-01-15T07:30:00+00:00`.
pub fn format(value: &DateTime<Utc>) -> String {
    value.to_rfc3339_opts(SecondsFormat::Secs, false)
}

/// Parses any RFC 3339 timestamp, normalizing to UTC and dropping sub-second
/// precision.
pub fn parse(raw: &str) -> Result<DateTime<Utc>, String> {
    let parsed = DateTime::parse_from_rfc3339(raw)
        .map_err(|e| format!("invalid ISO-8601 timestamp '{}': {}", raw, e))?;
    Ok(truncate(parsed.with_timezone(&Utc)))
}

pub fn truncate(value: DateTime<Utc>) -> DateTime<Utc> {
    value.with_nanosecond(0).unwrap_or(value)
}
