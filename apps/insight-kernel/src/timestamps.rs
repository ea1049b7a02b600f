use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde_json::Value;

const OFFSET_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S%.f%:z",
    "%Y-%m-%d %H:%M:%S%.f%z",
    "%Y-%m-%dT%H:%M:%S%.f%z",
];

const NAIVE_FORMATS: &[&str] = &["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"];

/// Parses the date spellings seen across backends and market-data providers:
/// RFC 3339, space-separated datetimes with or without a trailing offset,
/// and bare dates. Naive values are taken as UTC.
pub fn parse_lenient(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }

    for fmt in OFFSET_FORMATS {
        if let Ok(dt) = DateTime::parse_from_str(raw, fmt) {
            return Some(dt.with_timezone(&Utc));
        }
    }

    for fmt in NAIVE_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(raw, fmt) {
            return Some(naive.and_utc());
        }
    }

    NaiveDate::parse_from_str(raw.get(..10)?, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

/// Same as [`parse_lenient`], also accepting epoch milliseconds
/// (pandas `to_dict` output).
pub fn parse_lenient_value(value: &Value) -> Option<DateTime<Utc>> {
    match value {
        Value::String(s) => parse_lenient(s),
        Value::Number(n) => n.as_i64().and_then(DateTime::from_timestamp_millis),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_trailing_offsets_are_tolerated() {
        let a = parse_lenient("2024-01-02 00:00:00-05:00").unwrap();
        let b = parse_lenient("2024-01-02T05:00:00Z").unwrap();
        assert_eq!(a, b);

        let compact = parse_lenient("2024-01-02T00:00:00-0500").unwrap();
        assert_eq!(compact, b);
    }

    #[test]
    fn test_naive_and_date_only() {
        assert!(parse_lenient("2023-12-31 00:00:00").is_some());
        assert_eq!(
            parse_lenient("2023-12-31"),
            parse_lenient("2023-12-31T00:00:00Z")
        );
        assert!(parse_lenient("last tuesday").is_none());
        assert!(parse_lenient("").is_none());
    }

    #[test]
    fn test_epoch_millis_value() {
        let dt = parse_lenient_value(&json!(1704067200000i64)).unwrap();
        assert_eq!(dt, parse_lenient("2024-01-01").unwrap());
        assert!(parse_lenient_value(&json!(true)).is_none());
    }
}
