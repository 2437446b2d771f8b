// Validation utilities module
// Provides custom validation functions for booking-specific rules

use std::sync::OnceLock;

use chrono::{DateTime, NaiveDate};
use regex::Regex;
use validator::ValidationError;

fn currency_pattern() -> Option<&'static Regex> {
    static PATTERN: OnceLock<Option<Regex>> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^[A-Z]{3}$").ok()).as_ref()
}

/// Validates that a string is not empty after trimming
pub fn validate_not_blank(value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        Err(ValidationError::new("must_not_be_blank"))
    } else {
        Ok(())
    }
}

/// Validates an ISO 4217 style currency code (three upper-case letters)
pub fn validate_currency_code(code: &str) -> Result<(), ValidationError> {
    if currency_pattern().map_or(false, |pattern| pattern.is_match(code)) {
        Ok(())
    } else {
        Err(ValidationError::new("invalid_currency_code"))
    }
}

/// Parses a calendar date
///
/// Accepts `YYYY-MM-DD` and full RFC 3339 timestamps (the date part is kept).
pub fn parse_calendar_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .or_else(|| DateTime::parse_from_rfc3339(raw).ok().map(|dt| dt.date_naive()))
}
