//! Date-text helpers.
//!
//! `to_text` is total: anything it cannot read becomes "now". `from_text` is
//! the strict inverse and hands `None` back to the caller instead.

use chrono::{DateTime, Datelike, NaiveDate, NaiveDateTime, NaiveTime, SecondsFormat, Utc};

use crate::snapshot::value::{ToDate, Value};

const MINUTE_SECS: i64 = 60;
const HOUR_SECS: i64 = 60 * MINUTE_SECS;
const DAY_SECS: i64 = 24 * HOUR_SECS;
const MONTH_SECS: i64 = 30 * DAY_SECS;

/// ISO-8601 UTC text with millisecond precision, e.g. `2024-01-02T03:04:05.678Z`.
///
/// Years outside 0000..=9999 use the expanded form with a sign and six
/// digits, e.g. `+012000-01-01T00:00:00.000Z`.
pub fn iso_text(instant: &DateTime<Utc>) -> String {
    let year = instant.year();
    if (0..=9999).contains(&year) {
        instant.to_rfc3339_opts(SecondsFormat::Millis, true)
    } else {
        format!("{:+07}-{}", year, instant.format("%m-%dT%H:%M:%S%.3fZ"))
    }
}

/// ISO text of the current instant.
pub fn now_text() -> String {
    iso_text(&Utc::now())
}

/// ISO text of a pseudo-date, or of "now" when its conversion fails.
pub fn timestamp_text(timestamp: &dyn ToDate) -> String {
    match timestamp.to_date() {
        Ok(instant) => iso_text(&instant),
        Err(e) => {
            tracing::debug!(error = %e, "timestamp conversion failed, substituting current time");
            now_text()
        }
    }
}

/// Normalize any date-like value to ISO text.
///
/// Text is parsed, numbers are epoch milliseconds, dates and timestamps are
/// converted. Everything else (and every parse failure) yields the current
/// instant.
pub fn to_text(value: &Value) -> String {
    let instant = match value {
        Value::Text(text) => from_text(text),
        Value::Date(instant) => Some(*instant),
        Value::Timestamp(timestamp) => timestamp.to_date().ok(),
        Value::Number(millis) => from_epoch_millis(*millis),
        _ => None,
    };

    match instant {
        Some(instant) => iso_text(&instant),
        None => {
            tracing::debug!(kind = value.kind_name(), "unreadable date value, substituting current time");
            now_text()
        }
    }
}

/// Parse ISO-8601 text. Accepts RFC 3339, the signed expanded-year UTC form
/// written by `iso_text`, a bare `YYYY-MM-DD`, or a zone-less
/// `YYYY-MM-DDTHH:MM:SS[.fff]` (read as UTC).
pub fn from_text(text: &str) -> Option<DateTime<Utc>> {
    let text = text.trim();

    if let Ok(instant) = DateTime::parse_from_rfc3339(text) {
        return Some(instant.with_timezone(&Utc));
    }
    if text.starts_with(['+', '-']) {
        return parse_expanded_year(text);
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(text, "%Y-%m-%dT%H:%M:%S%.f") {
        return Some(naive.and_utc());
    }
    NaiveDate::parse_from_str(text, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

/// `±YYYYYY-MM-DDTHH:MM:SS[.fff]Z`
fn parse_expanded_year(text: &str) -> Option<DateTime<Utc>> {
    let (sign, rest) = text.split_at(1);
    let digits = rest.find('-')?;
    if digits < 4 {
        return None;
    }
    let (year, rest) = rest.split_at(digits);
    let year: i32 = year.parse().ok()?;
    let year = if sign == "-" { -year } else { year };

    let (date, time) = rest[1..].split_once('T')?;
    let (month, day) = date.split_once('-')?;
    let date = NaiveDate::from_ymd_opt(year, month.parse().ok()?, day.parse().ok()?)?;
    let time = NaiveTime::parse_from_str(time.strip_suffix('Z')?, "%H:%M:%S%.f").ok()?;

    Some(date.and_time(time).and_utc())
}

fn from_epoch_millis(millis: f64) -> Option<DateTime<Utc>> {
    if !millis.is_finite() {
        return None;
    }
    DateTime::from_timestamp_millis(millis.trunc() as i64)
}

/// Human readable distance between `instant` and `now`.
pub fn format_relative(instant: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let elapsed = (now - instant).num_seconds();

    if elapsed < MINUTE_SECS {
        "just now".to_string()
    } else if elapsed < HOUR_SECS {
        units_ago(elapsed / MINUTE_SECS, "minute")
    } else if elapsed < DAY_SECS {
        units_ago(elapsed / HOUR_SECS, "hour")
    } else if elapsed < MONTH_SECS {
        units_ago(elapsed / DAY_SECS, "day")
    } else {
        instant.format("%b %-d, %Y").to_string()
    }
}

/// `format_relative` against the current clock.
pub fn format_relative_now(instant: DateTime<Utc>) -> String {
    format_relative(instant, Utc::now())
}

fn units_ago(count: i64, unit: &str) -> String {
    if count == 1 {
        format!("1 {} ago", unit)
    } else {
        format!("{} {}s ago", count, unit)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::snapshot::value::{DateError, RemoteTimestamp};
    use chrono::{Duration, TimeZone};

    #[derive(Debug)]
    struct BrokenTimestamp;

    impl ToDate for BrokenTimestamp {
        fn to_date(&self) -> Result<DateTime<Utc>, DateError> {
            Err(DateError::Conversion("corrupt".into()))
        }
    }

    fn sample() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 2, 3, 4, 5).unwrap() + Duration::milliseconds(678)
    }

    fn assert_near_now(text: &str) {
        let parsed = from_text(text).expect("fallback must be valid ISO text");
        let drift = (Utc::now() - parsed).num_seconds().abs();
        assert!(drift < 5, "fallback {} is not close to now", text);
    }

    #[test]
    fn test_iso_text_format() {
        assert_eq!(iso_text(&sample()), "2024-01-02T03:04:05.678Z");
    }

    #[test]
    fn test_round_trip() {
        let instant = sample();
        assert_eq!(from_text(&to_text(&Value::Date(instant))), Some(instant));

        let ts = RemoteTimestamp::from_date(instant);
        assert_eq!(from_text(&to_text(&Value::from(ts))), Some(instant));
    }

    #[test]
    fn test_round_trip_expanded_years() {
        let far = Utc.with_ymd_and_hms(12000, 1, 1, 0, 0, 0).unwrap();
        assert_eq!(iso_text(&far), "+012000-01-01T00:00:00.000Z");
        assert_eq!(from_text(&to_text(&Value::Date(far))), Some(far));

        let ancient = Utc.with_ymd_and_hms(-50, 3, 15, 12, 30, 0).unwrap() + Duration::milliseconds(250);
        assert_eq!(iso_text(&ancient), "-000050-03-15T12:30:00.250Z");
        assert_eq!(from_text(&to_text(&Value::Date(ancient))), Some(ancient));

        let year_zero = Utc.with_ymd_and_hms(0, 2, 29, 0, 0, 0).unwrap();
        assert_eq!(from_text(&iso_text(&year_zero)), Some(year_zero));

        assert_eq!(from_text("+12-01-01T00:00:00Z"), None);
        assert_eq!(from_text("-000050-02-30T00:00:00.000Z"), None);
    }

    #[test]
    fn test_to_text_inputs() {
        assert_eq!(
            to_text(&Value::text("2024-01-02T04:04:05.678+01:00")),
            "2024-01-02T03:04:05.678Z"
        );
        assert_eq!(to_text(&Value::text("2024-06-30")), "2024-06-30T00:00:00.000Z");
        assert_eq!(
            to_text(&Value::text("2024-06-30T10:15:00")),
            "2024-06-30T10:15:00.000Z"
        );
        assert_eq!(to_text(&Value::Number(0.0)), "1970-01-01T00:00:00.000Z");
    }

    #[test]
    fn test_to_text_falls_back_to_now() {
        assert_near_now(&to_text(&Value::text("not-a-date")));
        assert_near_now(&to_text(&Value::Null));
        assert_near_now(&to_text(&Value::Number(f64::NAN)));
        assert_near_now(&to_text(&Value::timestamp(BrokenTimestamp)));
        assert_near_now(&timestamp_text(&BrokenTimestamp));
    }

    #[test]
    fn test_from_text_invalid() {
        assert_eq!(from_text("not-a-date"), None);
        assert_eq!(from_text(""), None);
        assert_eq!(from_text("2024-13-45"), None);
    }

    #[test]
    fn test_format_relative_buckets() {
        let now = sample();
        assert_eq!(format_relative(now - Duration::seconds(59), now), "just now");
        assert_eq!(format_relative(now + Duration::seconds(30), now), "just now");
        assert_eq!(format_relative(now - Duration::seconds(60), now), "1 minute ago");
        assert_eq!(format_relative(now - Duration::minutes(59), now), "59 minutes ago");
        assert_eq!(format_relative(now - Duration::hours(1), now), "1 hour ago");
        assert_eq!(format_relative(now - Duration::hours(23), now), "23 hours ago");
        assert_eq!(format_relative(now - Duration::days(1), now), "1 day ago");
        assert_eq!(format_relative(now - Duration::days(29), now), "29 days ago");
        assert_eq!(
            format_relative(Utc.with_ymd_and_hms(2023, 11, 5, 8, 0, 0).unwrap(), now),
            "Nov 5, 2023"
        );
    }
}
