//! Deserializers that default missing or malformed backend fields instead of failing.

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Deserializer};

/// Treats an explicit `null` the same as a missing field.
pub fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Accepts RFC 3339 or naive ISO-8601 timestamps (read as UTC); anything else is `None`.
pub fn timestamp<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<String>::deserialize(deserializer)?;
    Ok(raw.as_deref().and_then(parse_timestamp))
}

pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(parsed) = DateTime::parse_from_rfc3339(raw) {
        return Some(parsed.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
        .ok()
        .map(|naive| naive.and_utc())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Timelike;

    #[test]
    fn parses_offset_and_naive_forms() {
        let with_offset = parse_timestamp("2024-12-26T09:00:00+05:30").unwrap();
        assert_eq!(with_offset.hour(), 3);

        let naive = parse_timestamp("2024-12-26T14:30:00").unwrap();
        assert_eq!(naive.hour(), 14);

        let fractional = parse_timestamp("2024-12-26T14:30:00.250000").unwrap();
        assert_eq!(fractional.minute(), 30);
    }

    #[test]
    fn garbage_timestamp_is_absent() {
        assert!(parse_timestamp("yesterday").is_none());
        assert!(parse_timestamp("").is_none());
    }
}
