//! Serde helpers and small parsers used by the configuration types.

use std::time::Duration;

use serde::{Deserialize, Deserializer};

/// Custom deserializer for Duration from milliseconds.
pub fn deserialize_duration_from_ms<'de, D>(deserializer: D) -> Result<Duration, D::Error>
where
    D: Deserializer<'de>,
{
    let ms = u64::deserialize(deserializer)?;
    Ok(Duration::from_millis(ms))
}

/// Custom deserializer for Duration from seconds.
pub fn deserialize_duration_from_seconds<'de, D>(deserializer: D) -> Result<Duration, D::Error>
where
    D: Deserializer<'de>,
{
    let secs = u64::deserialize(deserializer)?;
    Ok(Duration::from_secs(secs))
}

/// Parses a human-entered duration: a bare integer is seconds, otherwise a
/// number with an `ms`, `s`, `m`, or `h` suffix.
pub fn parse_duration(s: &str) -> Option<Duration> {
    let s = s.trim();
    if s.is_empty() {
        return None;
    }
    if let Ok(secs) = s.parse::<u64>() {
        return Some(Duration::from_secs(secs));
    }
    let (value, unit) = s.split_at(s.find(|c: char| c.is_ascii_alphabetic())?);
    let value = value.parse::<u64>().ok()?;
    match unit {
        "ms" => Some(Duration::from_millis(value)),
        "s" => Some(Duration::from_secs(value)),
        "m" => Some(Duration::from_secs(value * 60)),
        "h" => Some(Duration::from_secs(value * 3600)),
        _ => None,
    }
}

/// Interprets an environment-variable string as a boolean. `1`, `true`, and
/// `yes` are true; everything else is false.
pub fn truthy(s: &str) -> bool {
    matches!(s, "1" | "true" | "yes")
}

#[cfg(test)]
mod tests {
    use serde::Deserialize;

    use super::*;

    #[derive(Debug, Deserialize, PartialEq)]
    struct TestDurationMs {
        #[serde(deserialize_with = "deserialize_duration_from_ms")]
        duration: Duration,
    }

    #[derive(Debug, Deserialize, PartialEq)]
    struct TestDurationSecs {
        #[serde(deserialize_with = "deserialize_duration_from_seconds")]
        duration: Duration,
    }

    #[test]
    fn deserialize_duration_from_ms_works() {
        let parsed: TestDurationMs = serde_json::from_str(r#"{"duration": 4000}"#).unwrap();
        assert_eq!(parsed.duration, Duration::from_millis(4000));
    }

    #[test]
    fn deserialize_duration_from_seconds_works() {
        let parsed: TestDurationSecs = serde_json::from_str(r#"{"duration": 20}"#).unwrap();
        assert_eq!(parsed.duration, Duration::from_secs(20));
    }

    #[test]
    fn parse_duration_accepts_suffixes() {
        assert_eq!(parse_duration("90"), Some(Duration::from_secs(90)));
        assert_eq!(parse_duration("90s"), Some(Duration::from_secs(90)));
        assert_eq!(parse_duration("1500ms"), Some(Duration::from_millis(1500)));
        assert_eq!(parse_duration("2m"), Some(Duration::from_secs(120)));
        assert_eq!(parse_duration("1h"), Some(Duration::from_secs(3600)));
        assert_eq!(parse_duration("abc"), None);
        assert_eq!(parse_duration(""), None);
        assert_eq!(parse_duration("90x"), None);
    }

    #[test]
    fn truthy_values() {
        assert!(truthy("1"));
        assert!(truthy("true"));
        assert!(truthy("yes"));
        assert!(!truthy("0"));
        assert!(!truthy("TRUE"));
        assert!(!truthy(""));
    }
}
