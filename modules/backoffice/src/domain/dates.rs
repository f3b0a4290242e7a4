//! Lenient parsing for caller-supplied dates.
//!
//! Accepted forms: RFC 3339, `YYYY-MM-DDTHH:MM:SS[.fff]` (taken as UTC), `YYYY-MM-DD`.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};

pub fn parse_datetime(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f") {
        return Some(naive.and_utc());
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

/// UTC calendar date of a caller-supplied date string.
pub fn parse_calendar_date(raw: &str) -> Option<NaiveDate> {
    parse_datetime(raw).map(|dt| dt.date_naive())
}

/// `January 05, 2026` style; falls back to the raw text when it does not parse.
pub fn format_long_date(raw: Option<&str>) -> String {
    match raw {
        None => String::new(),
        Some(s) => parse_datetime(s)
            .map(|dt| dt.format("%B %d, %Y").to_string())
            .unwrap_or_else(|| s.to_string()),
    }
}
