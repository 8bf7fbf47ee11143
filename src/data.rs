//! Cell-level coercion for extract values.
//!
//! Every function here is total: malformed input degrades to `None` instead of
//! producing an error, so callers decide what an absent value means for the
//! row as a whole.

use chrono::{DateTime, NaiveDate, NaiveDateTime};

/// Cell contents treated as "no value", matching what common data tooling
/// writes for nulls.
pub const MISSING_SENTINELS: &[&str] = &[
    "", "NA", "N/A", "n/a", "NaN", "nan", "-NaN", "-nan", "NULL", "null", "None", "#N/A", "<NA>",
];

const DATE_FORMATS: &[&str] = &[
    "%Y-%m-%d",
    "%Y/%m/%d",
    "%m/%d/%Y",
    "%d-%m-%Y",
    "%d.%m.%Y",
    "%B %d, %Y",
    "%b %d, %Y",
    "%d %B %Y",
    "%d %b %Y",
];

const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M",
    "%m/%d/%Y %H:%M:%S",
    "%m/%d/%Y %H:%M",
];

pub fn is_missing(value: &str) -> bool {
    MISSING_SENTINELS.contains(&value.trim())
}

/// Trimmed text, or `None` for blank and sentinel cells.
pub fn parse_text(value: &str) -> Option<String> {
    if is_missing(value) {
        None
    } else {
        Some(value.trim().to_string())
    }
}

/// Permissive calendar-date parser. Datetime inputs keep only their date part.
pub fn parse_naive_date(value: &str) -> Option<NaiveDate> {
    let trimmed = value.trim();
    if is_missing(trimmed) {
        return None;
    }
    if let Some(date) = parse_compact_date(trimmed) {
        return Some(date);
    }
    for fmt in DATE_FORMATS {
        if let Ok(parsed) = NaiveDate::parse_from_str(trimmed, fmt) {
            return Some(parsed);
        }
    }
    for fmt in DATETIME_FORMATS {
        if let Ok(parsed) = NaiveDateTime::parse_from_str(trimmed, fmt) {
            return Some(parsed.date());
        }
    }
    DateTime::parse_from_rfc3339(trimmed)
        .ok()
        .map(|parsed| parsed.date_naive())
}

// `YYYYMMDD`, split by hand so an eight-digit run is never read as a year.
fn parse_compact_date(value: &str) -> Option<NaiveDate> {
    if value.len() != 8 || !value.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let year = value[..4].parse().ok()?;
    let month = value[4..6].parse().ok()?;
    let day = value[6..].parse().ok()?;
    NaiveDate::from_ymd_opt(year, month, day)
}

/// Float-then-integer coercion for case and death counts.
///
/// Fractions truncate toward zero. Blank, sentinel, non-numeric, non-finite,
/// negative and out-of-range inputs all yield `None`.
pub fn parse_count(value: &str) -> Option<i64> {
    let trimmed = value.trim();
    if is_missing(trimmed) {
        return None;
    }
    if let Ok(exact) = trimmed.parse::<i64>() {
        return (exact >= 0).then_some(exact);
    }
    let parsed: f64 = trimmed.parse().ok()?;
    if !parsed.is_finite() {
        return None;
    }
    let truncated = parsed.trunc();
    // i64::MAX is not representable as f64; 2^63 is the first value past it.
    if truncated < 0.0 || truncated >= 9_223_372_036_854_775_808.0 {
        return None;
    }
    Some(truncated as i64)
}
