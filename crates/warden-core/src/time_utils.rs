use anyhow::{Context, Result};
use chrono::{DateTime, Utc};

/// Returns the current Unix timestamp in milliseconds.
pub fn current_unix_timestamp_ms() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis()
        .try_into()
        .unwrap_or(u64::MAX)
}

/// Parses an RFC 3339 timestamp (as emitted by webhook payloads and the
/// GraphQL API) and normalizes it to UTC.
pub fn parse_rfc3339_utc(raw: &str) -> Result<DateTime<Utc>> {
    let parsed = DateTime::parse_from_rfc3339(raw.trim())
        .with_context(|| format!("invalid RFC 3339 timestamp '{raw}'"))?;
    Ok(parsed.with_timezone(&Utc))
}

#[cfg(test)]
mod tests {
    use super::parse_rfc3339_utc;

    #[test]
    fn unit_parse_rfc3339_utc_normalizes_offsets() {
        let zulu = parse_rfc3339_utc("2026-01-01T10:00:00Z").expect("zulu");
        let offset = parse_rfc3339_utc("2026-01-01T12:00:00+02:00").expect("offset");
        assert_eq!(zulu, offset);
    }

    #[test]
    fn regression_parse_rfc3339_utc_rejects_date_only_values() {
        assert!(parse_rfc3339_utc("2026-01-01").is_err());
    }
}
