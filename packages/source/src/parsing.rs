//! Parsing helpers for free-form sheet cells.
//!
//! Branch sheets are edited by hand, so the same column may hold ISO dates
//! in one branch and day-first dates in another.

use chrono::{NaiveDate, NaiveDateTime};

/// Date formats seen in branch sheets, tried in order.
const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%d/%m/%Y", "%d-%m-%Y", "%d.%m.%Y", "%Y/%m/%d"];

/// Date-time formats whose date part is kept.
const DATE_TIME_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S",
    "%d/%m/%Y %H:%M:%S",
    "%d/%m/%Y %H:%M",
];

/// Parses a sheet date cell. Returns `None` for blanks and unrecognised
/// formats.
#[must_use]
pub fn parse_sheet_date(s: &str) -> Option<NaiveDate> {
    let s = s.trim();
    if s.is_empty() {
        return None;
    }

    for format in DATE_FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(s, format) {
            return Some(date);
        }
    }

    for format in DATE_TIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, format) {
            return Some(dt.date());
        }
    }

    None
}

/// Parses a `YYYY-MM-DD` query parameter or CLI argument.
///
/// # Errors
///
/// Returns a message naming the rejected value.
pub fn parse_iso_date(s: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d")
        .map_err(|e| format!("invalid date '{s}' (expected YYYY-MM-DD): {e}"))
}
