//! # Time-of-Day Helpers
//!
//! The backend returns check-in/out times in whatever shape the endpoint
//! happened to produce: full RFC 3339 timestamps, SQL datetimes, or bare
//! clock strings (sometimes with a dot separator). The local projection
//! always stores `HH:MM`.

use chrono::{DateTime, Local, NaiveDate, NaiveDateTime, NaiveTime, TimeZone};

/// `YYYY-MM-DD`
pub fn date_key(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

/// Parses a `YYYY-MM-DD` key.
pub fn parse_date_key(raw: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d").ok()
}

/// Normalises a bare clock string to `HH:MM`.
///
/// ```rust
/// use presensi_core::time::normalize_clock;
///
/// assert_eq!(normalize_clock("08.15").as_deref(), Some("08:15"));
/// assert_eq!(normalize_clock("8:05:59").as_deref(), Some("08:05"));
/// assert_eq!(normalize_clock("late"), None);
/// ```
pub fn normalize_clock(raw: &str) -> Option<String> {
    let cleaned = raw.trim().replace('.', ":");
    let time = ["%H:%M:%S", "%H:%M"]
        .iter()
        .find_map(|fmt| NaiveTime::parse_from_str(&cleaned, fmt).ok())?;
    Some(time.format("%H:%M").to_string())
}

/// Formats any backend time representation as local `HH:MM`.
pub fn format_local_time(raw: &str) -> Option<String> {
    format_time_in(raw, &Local)
}

/// [`format_local_time`] against an explicit zone.
pub fn format_time_in<Tz: TimeZone>(raw: &str, tz: &Tz) -> Option<String>
where
    Tz::Offset: std::fmt::Display,
{
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }

    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Some(ts.with_timezone(tz).format("%H:%M").to_string());
    }

    // Naive datetimes are already wall-clock times.
    for fmt in ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M"] {
        if let Ok(ndt) = NaiveDateTime::parse_from_str(raw, fmt) {
            return Some(ndt.format("%H:%M").to_string());
        }
    }

    normalize_clock(raw)
}
