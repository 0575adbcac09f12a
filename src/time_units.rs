use std::time::Duration;

use chrono::{DateTime, Utc};

use crate::error::{GitLabToolingError, Result};

/// Seconds per unit suffix. Months and years use calendar averages
/// (30.44 and 365.25 days).
const TIME_UNITS: [(char, u64); 7] = [
    ('s', 1),
    ('m', 60),
    ('h', 3_600),
    ('d', 86_400),
    ('w', 604_800),
    ('M', 2_629_800),
    ('y', 31_557_600),
];

/// Converts a duration string such as `10s`, `5m` or `1d` to seconds.
///
/// The accepted grammar is `<integer><unit>` with the unit being one of
/// `s m h d w M y` (case sensitive: `m` is minutes, `M` is months).
///
/// # Errors
///
/// Returns [`GitLabToolingError::InvalidDuration`] for anything else, including
/// values that overflow `u64` seconds.
pub fn convert_to_seconds(time_string: &str) -> Result<u64> {
    let invalid = || GitLabToolingError::InvalidDuration(time_string.to_string());

    let mut chars = time_string.chars();
    let unit = chars.next_back().ok_or_else(invalid)?;
    let amount = chars.as_str();

    if amount.is_empty() || !amount.bytes().all(|b| b.is_ascii_digit()) {
        return Err(invalid());
    }

    let multiplier = TIME_UNITS
        .iter()
        .find(|(suffix, _)| *suffix == unit)
        .map(|(_, seconds)| *seconds)
        .ok_or_else(invalid)?;

    amount
        .parse::<u64>()
        .ok()
        .and_then(|value| value.checked_mul(multiplier))
        .ok_or_else(invalid)
}

/// Parses a duration string into a [`Duration`].
pub fn parse_duration(time_string: &str) -> Result<Duration> {
    convert_to_seconds(time_string).map(Duration::from_secs)
}

/// Human readable distance between `date` and `now` ("3 days ago").
///
/// Every step is rounded from the previous one, so 90 seconds reads as
/// "2 minutes ago". Dates in the future read as "just now".
#[allow(clippy::cast_precision_loss, clippy::cast_possible_truncation)]
pub fn elapsed_time(date: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let seconds = ((now - date).num_milliseconds() as f64 / 1000.0).round();
    let minutes = (seconds / 60.0).round();
    let hours = (minutes / 60.0).round();
    let days = (hours / 24.0).round();
    let weeks = (days / 7.0).round();
    let months = (weeks / 4.35).round();
    let years = (months / 12.0).round();

    if seconds < 60.0 {
        "just now".to_string()
    } else if minutes < 60.0 {
        format!("{} minutes ago", minutes as i64)
    } else if hours < 24.0 {
        format!("{} hours ago", hours as i64)
    } else if days < 7.0 {
        format!("{} days ago", days as i64)
    } else if weeks < 5.0 {
        format!("{} weeks ago", weeks as i64)
    } else if months < 12.0 {
        format!("{} months ago", months as i64)
    } else {
        format!("{} years ago", years as i64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration as ChronoDuration, TimeZone};

    #[test]
    fn test_convert_to_seconds_units() {
        assert_eq!(convert_to_seconds("10s").unwrap(), 10);
        assert_eq!(convert_to_seconds("5m").unwrap(), 300);
        assert_eq!(convert_to_seconds("1h").unwrap(), 3_600);
        assert_eq!(convert_to_seconds("1d").unwrap(), 86_400);
        assert_eq!(convert_to_seconds("2w").unwrap(), 1_209_600);
        assert_eq!(convert_to_seconds("1M").unwrap(), 2_629_800);
        assert_eq!(convert_to_seconds("1y").unwrap(), 31_557_600);
        assert_eq!(convert_to_seconds("0s").unwrap(), 0);
    }

    #[test]
    fn test_convert_to_seconds_rejects_malformed() {
        for input in ["5x", "", "m", "-5m", "5 m", " 5m", "5m ", "1.5h", "5mm", "d1"] {
            let err = convert_to_seconds(input).unwrap_err();
            assert!(
                matches!(err, GitLabToolingError::InvalidDuration(ref s) if s == input),
                "expected invalid duration for {input:?}"
            );
        }
    }

    #[test]
    fn test_convert_to_seconds_overflow() {
        assert!(convert_to_seconds("99999999999999999999y").is_err());
        assert!(convert_to_seconds("18446744073709551615y").is_err());
    }

    #[test]
    fn test_parse_duration() {
        assert_eq!(parse_duration("30s").unwrap(), Duration::from_secs(30));
    }

    #[test]
    fn test_elapsed_time_steps() {
        let now = Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap();
        let ago = |d: ChronoDuration| elapsed_time(now - d, now);

        assert_eq!(ago(ChronoDuration::seconds(30)), "just now");
        assert_eq!(ago(ChronoDuration::seconds(90)), "2 minutes ago");
        assert_eq!(ago(ChronoDuration::minutes(45)), "45 minutes ago");
        assert_eq!(ago(ChronoDuration::hours(5)), "5 hours ago");
        assert_eq!(ago(ChronoDuration::days(3)), "3 days ago");
        assert_eq!(ago(ChronoDuration::days(14)), "2 weeks ago");
        assert_eq!(ago(ChronoDuration::days(90)), "3 months ago");
        assert_eq!(ago(ChronoDuration::days(800)), "2 years ago");
    }

    #[test]
    fn test_elapsed_time_future_date() {
        let now = Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap();
        assert_eq!(elapsed_time(now + ChronoDuration::hours(1), now), "just now");
    }
}
