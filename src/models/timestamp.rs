//! Timestamps are persisted as UTC RFC 3339 with fixed millisecond precision
//! (`2024-01-15T09:30:00.000Z`) so that comparing the stored text compares
//! the instants.

use chrono::{DateTime, NaiveDate, NaiveDateTime, SecondsFormat, SubsecRound, Utc};
use serde::{Deserialize, Deserializer, Serializer};

pub fn format(dt: &DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Current time at the precision timestamps are stored with.
pub fn now() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(3)
}

/// Parses the date shapes a browser form or API client typically sends.
/// Inputs without an offset are taken as UTC.
pub fn parse_lenient(input: &str) -> Option<DateTime<Utc>> {
    parse_any(input.trim()).map(|dt| dt.trunc_subsecs(3))
}

fn parse_any(s: &str) -> Option<DateTime<Utc>> {
    if s.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }

    if let Ok(date) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        return date.and_hms_opt(0, 0, 0).map(|n| n.and_utc());
    }

    const NAIVE_FORMATS: [&str; 5] = [
        "%Y-%m-%dT%H:%M:%S%.f",
        "%Y-%m-%dT%H:%M:%S",
        "%Y-%m-%dT%H:%M",
        "%Y-%m-%d %H:%M:%S",
        "%Y-%m-%d %H:%M",
    ];
    NAIVE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok())
        .map(|n| n.and_utc())
}

pub fn serialize<S: Serializer>(dt: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&format(dt))
}

pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<DateTime<Utc>, D::Error> {
    let raw = String::deserialize(deserializer)?;
    parse_lenient(&raw).ok_or_else(|| serde::de::Error::custom(format!("invalid timestamp: {raw}")))
}

pub mod option {
    use chrono::{DateTime, Utc};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(
        dt: &Option<DateTime<Utc>>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        match dt {
            Some(dt) => super::serialize(dt, serializer),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<DateTime<Utc>>, D::Error> {
        let raw: Option<String> = Option::deserialize(deserializer)?;
        match raw {
            Some(raw) => super::parse_lenient(&raw)
                .map(Some)
                .ok_or_else(|| serde::de::Error::custom(format!("invalid timestamp: {raw}"))),
            None => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_is_fixed_width() {
        let dt = parse_lenient("2024-01-05").unwrap();
        assert_eq!(format(&dt), "2024-01-05T00:00:00.000Z");

        let dt = parse_lenient("2024-01-05T10:15:30.5+02:00").unwrap();
        assert_eq!(format(&dt), "2024-01-05T08:15:30.500Z");
    }

    #[test]
    fn test_parse_naive_forms_as_utc() {
        assert_eq!(
            format(&parse_lenient("2024-03-01T14:30").unwrap()),
            "2024-03-01T14:30:00.000Z"
        );
        assert_eq!(
            format(&parse_lenient("2024-03-01 14:30:15").unwrap()),
            "2024-03-01T14:30:15.000Z"
        );
        assert_eq!(
            format(&parse_lenient(" 2024-03-01T14:30:15.250 ").unwrap()),
            "2024-03-01T14:30:15.250Z"
        );
    }

    #[test]
    fn test_parse_truncates_to_millis() {
        let dt = parse_lenient("2024-01-05T10:15:30.123456789Z").unwrap();
        assert_eq!(format(&dt), "2024-01-05T10:15:30.123Z");
        assert_eq!(parse_lenient(&format(&dt)), Some(dt));
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!(parse_lenient("").is_none());
        assert!(parse_lenient("   ").is_none());
        assert!(parse_lenient("next tuesday").is_none());
        assert!(parse_lenient("2024-02-30").is_none());
        assert!(parse_lenient("2024-13-01").is_none());
    }

    #[test]
    fn test_text_order_matches_time_order() {
        let earlier = format(&parse_lenient("2024-01-31T23:59:59.999Z").unwrap());
        let later = format(&parse_lenient("2024-02-01").unwrap());
        assert!(earlier < later);
    }
}
