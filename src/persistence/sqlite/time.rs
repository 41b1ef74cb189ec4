//! Timestamp encoding for stored rows.
//!
//! Timestamps are stored as RFC3339 UTC strings. Parsing tolerates the two
//! legacy layouts SQLite's `datetime('now')` and older writers produced;
//! anything unparseable degrades to the Unix epoch instead of failing the
//! read.

use chrono::{DateTime, NaiveDateTime, SecondsFormat, Utc};

/// Formats a timestamp the way the store writes it.
pub fn format_time(t: DateTime<Utc>) -> String {
    t.to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// Parses a stored timestamp, trying RFC3339, `YYYY-MM-DD HH:MM:SS`, and
/// `YYYY-MM-DDTHH:MM:SSZ` in that order. Returns the epoch on failure.
pub fn parse_stored_time(s: &str) -> DateTime<Utc> {
    if let Ok(t) = DateTime::parse_from_rfc3339(s) {
        return t.with_timezone(&Utc);
    }
    if let Ok(t) = NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S") {
        return t.and_utc();
    }
    if let Ok(t) = NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%SZ") {
        return t.and_utc();
    }
    DateTime::<Utc>::UNIX_EPOCH
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    #[test]
    fn round_trips_written_form() {
        let t = Utc.with_ymd_and_hms(2024, 6, 1, 12, 30, 45).unwrap();
        assert_eq!(parse_stored_time(&format_time(t)), t);
    }

    #[test]
    fn parses_sqlite_datetime_layout() {
        let t = parse_stored_time("2024-06-01 12:30:45");
        assert_eq!(t, Utc.with_ymd_and_hms(2024, 6, 1, 12, 30, 45).unwrap());
    }

    #[test]
    fn parses_zulu_layout() {
        let t = parse_stored_time("2024-06-01T12:30:45Z");
        assert_eq!(t, Utc.with_ymd_and_hms(2024, 6, 1, 12, 30, 45).unwrap());
    }

    #[test]
    fn unparseable_becomes_epoch() {
        assert_eq!(parse_stored_time("yesterday"), DateTime::<Utc>::UNIX_EPOCH);
        assert_eq!(parse_stored_time(""), DateTime::<Utc>::UNIX_EPOCH);
    }
}
