use anyhow::{Context, Result};
use chrono::{DateTime, SecondsFormat, Utc};

/// Fixed-width RFC 3339 text, so lexical order in SQLite is time order.
pub fn timestamp_text(value: &DateTime<Utc>) -> String {
    value.to_rfc3339_opts(SecondsFormat::Micros, true)
}

pub fn parse_datetime(value: &str, field: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .with_context(|| format!("failed to parse {field} '{value}'"))
}

pub fn limit_param(limit: usize) -> Result<i64> {
    i64::try_from(limit).with_context(|| format!("limit {limit} exceeds SQLite INTEGER range"))
}

/// Wraps a decode failure so it can be returned from a `query_map` closure.
pub fn invalid_data(err: anyhow::Error) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(
        0,
        rusqlite::types::Type::Text,
        Box::new(std::io::Error::new(
            std::io::ErrorKind::InvalidData,
            format!("{err:#}"),
        )),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn timestamp_text_is_fixed_width() {
        let whole = Utc.with_ymd_and_hms(2019, 8, 12, 9, 30, 0).unwrap();
        let fractional = whole + chrono::Duration::microseconds(1_500);

        let a = timestamp_text(&whole);
        let b = timestamp_text(&fractional);
        assert_eq!(a.len(), b.len());
        assert!(a < b);
        assert_eq!(parse_datetime(&b, "timestamp").unwrap(), fractional);
    }

    #[test]
    fn rejects_garbage_timestamps() {
        assert!(parse_datetime("yesterday", "timestamp").is_err());
    }
}
