//! Date/time utilities for feedcache.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use chrono_tz::Tz;

/// Parse an RSS `pubDate` value.
///
/// Accepts RFC 2822 (the RSS 2.0 format), RFC 3339, `YYYY-MM-DD HH:MM:SS`
/// and bare `YYYY-MM-DD` dates. Naive values are taken as UTC.
pub fn parse_pub_date(value: &str) -> Option<DateTime<Utc>> {
    let value = value.trim();
    if value.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc2822(value) {
        return Some(dt.with_timezone(&Utc));
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Some(dt.with_timezone(&Utc));
    }

    if let Ok(naive) = NaiveDateTime::parse_from_str(value, "%Y-%m-%d %H:%M:%S") {
        return Some(naive.and_utc());
    }

    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

/// Format a UTC datetime as an RFC 2822 string for RSS output.
pub fn to_rfc2822(dt: &DateTime<Utc>) -> String {
    dt.to_rfc2822()
}

/// Format a DateTime<Utc> in the specified timezone.
///
/// Falls back to UTC when the timezone name is unknown.
pub fn format_utc_datetime(dt: &DateTime<Utc>, timezone: &str, format: &str) -> String {
    let tz: Tz = match timezone.parse() {
        Ok(tz) => tz,
        Err(_) => return dt.format(format).to_string(),
    };
    dt.with_timezone(&tz).format(format).to_string()
}

/// Format a raw `pubDate` string for display.
///
/// Returns the original string if it cannot be parsed.
pub fn format_pub_date(value: &str, timezone: &str, format: &str) -> String {
    match parse_pub_date(value) {
        Some(dt) => format_utc_datetime(&dt, timezone, format),
        None => value.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_parse_pub_date_rfc2822() {
        let dt = parse_pub_date("Tue, 02 Jan 2024 10:30:00 +0000").unwrap();
        assert_eq!(dt, Utc.with_ymd_and_hms(2024, 1, 2, 10, 30, 0).unwrap());
    }

    #[test]
    fn test_parse_pub_date_rfc2822_offset() {
        let dt = parse_pub_date("Tue, 02 Jan 2024 19:30:00 +0900").unwrap();
        assert_eq!(dt, Utc.with_ymd_and_hms(2024, 1, 2, 10, 30, 0).unwrap());
    }

    #[test]
    fn test_parse_pub_date_rfc3339() {
        let dt = parse_pub_date("2024-01-02T10:30:00Z").unwrap();
        assert_eq!(dt, Utc.with_ymd_and_hms(2024, 1, 2, 10, 30, 0).unwrap());
    }

    #[test]
    fn test_parse_pub_date_sqlite_format() {
        let dt = parse_pub_date("2024-01-02 10:30:00").unwrap();
        assert_eq!(dt, Utc.with_ymd_and_hms(2024, 1, 2, 10, 30, 0).unwrap());
    }

    #[test]
    fn test_parse_pub_date_date_only() {
        let dt = parse_pub_date("2024-01-02").unwrap();
        assert_eq!(dt, Utc.with_ymd_and_hms(2024, 1, 2, 0, 0, 0).unwrap());
    }

    #[test]
    fn test_parse_pub_date_invalid() {
        assert!(parse_pub_date("").is_none());
        assert!(parse_pub_date("   ").is_none());
        assert!(parse_pub_date("yesterday").is_none());
    }

    #[test]
    fn test_to_rfc2822() {
        let dt = Utc.with_ymd_and_hms(2024, 1, 2, 10, 30, 0).unwrap();
        let formatted = to_rfc2822(&dt);
        assert!(formatted.starts_with("Tue, "));
        assert!(formatted.ends_with("10:30:00 +0000"));
        assert_eq!(parse_pub_date(&formatted), Some(dt));
    }

    #[test]
    fn test_format_utc_datetime() {
        let dt = Utc.with_ymd_and_hms(2024, 1, 15, 10, 30, 0).unwrap();
        let result = format_utc_datetime(&dt, "Asia/Tokyo", "%Y/%m/%d %H:%M");
        assert_eq!(result, "2024/01/15 19:30"); // UTC+9
    }

    #[test]
    fn test_format_utc_datetime_invalid_timezone() {
        let dt = Utc.with_ymd_and_hms(2024, 1, 15, 10, 30, 0).unwrap();
        let result = format_utc_datetime(&dt, "Invalid/Zone", "%Y/%m/%d %H:%M");
        assert_eq!(result, "2024/01/15 10:30");
    }

    #[test]
    fn test_format_pub_date() {
        let result = format_pub_date("2024-01-15T10:30:00Z", "UTC", "%Y-%m-%d %H:%M");
        assert_eq!(result, "2024-01-15 10:30");
    }

    #[test]
    fn test_format_pub_date_unparseable() {
        assert_eq!(format_pub_date("not a date", "UTC", "%Y"), "not a date");
    }
}
