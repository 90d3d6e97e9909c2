//! Field parsing utilities for raw pump readings
//!
//! Day-first timestamp coercion and locale-tolerant decimal parsing. Every
//! parser reports failure as a reason string; the caller decides that a
//! failure makes the row unusable.

use crate::constants::{
    DATE_ONLY_FORMATS, DAY_FIRST_DATETIME_FORMATS, DAY_FIRST_SHORT_YEAR_FORMATS,
    ISO_DATETIME_FORMATS, MIN_FOUR_DIGIT_YEAR,
};
use crate::error::{MalformedRowError, RawField};
use crate::models::{RawReading, Reading};
use chrono::{Datelike, NaiveDate, NaiveDateTime};

/// Parse a timestamp, day-first
///
/// Two-digit year layouts (`dd/mm/yy`) are tried first, then four-digit
/// day-first layouts, then year-first ISO layouts; a bare date is read as
/// midnight. A year written with neither two nor four digits is rejected.
pub fn parse_day_first_timestamp(text: &str) -> std::result::Result<NaiveDateTime, String> {
    let value = text.trim();
    if value.is_empty() {
        return Err("empty value".to_string());
    }

    let mut short_year = false;

    let datetime_formats = DAY_FIRST_SHORT_YEAR_FORMATS
        .iter()
        .chain(DAY_FIRST_DATETIME_FORMATS)
        .chain(ISO_DATETIME_FORMATS);
    for format in datetime_formats {
        if let Ok(timestamp) = NaiveDateTime::parse_from_str(value, format) {
            if timestamp.year() >= MIN_FOUR_DIGIT_YEAR {
                return Ok(timestamp);
            }
            short_year = true;
        }
    }

    for format in DATE_ONLY_FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(value, format) {
            if date.year() < MIN_FOUR_DIGIT_YEAR {
                short_year = true;
                continue;
            }
            if let Some(timestamp) = date.and_hms_opt(0, 0, 0) {
                return Ok(timestamp);
            }
        }
    }

    if short_year {
        return Err("year must be written with two or four digits".to_string());
    }

    Err("unrecognized date/time layout (expected day-first, e.g. 'dd/mm/yyyy HH:MM')".to_string())
}

/// Parse a decimal number, treating a comma as the decimal point
pub fn parse_decimal(text: &str) -> std::result::Result<f64, String> {
    let value = text.trim();
    if value.is_empty() {
        return Err("empty value".to_string());
    }

    let normalized = value.replace(',', ".");
    let number = normalized
        .parse::<f64>()
        .map_err(|e| format!("not a number: {}", e))?;

    if !number.is_finite() {
        return Err("not a finite number".to_string());
    }

    Ok(number)
}

/// Turn a raw row into a reading, or report the first field that failed
pub fn parse_reading(raw: &RawReading) -> std::result::Result<Reading, MalformedRowError> {
    let malformed = |field: RawField, value: &str, reason: String| MalformedRowError {
        line: raw.line,
        field,
        value: value.to_string(),
        reason,
    };

    let timestamp = parse_day_first_timestamp(&raw.timestamp_text)
        .map_err(|reason| malformed(RawField::Timestamp, &raw.timestamp_text, reason))?;
    let voltage_v = parse_decimal(&raw.voltage_text)
        .map_err(|reason| malformed(RawField::Voltage, &raw.voltage_text, reason))?;
    let current_a = parse_decimal(&raw.current_text)
        .map_err(|reason| malformed(RawField::Current, &raw.current_text, reason))?;
    let active_power_kw = parse_decimal(&raw.power_text)
        .map_err(|reason| malformed(RawField::Power, &raw.power_text, reason))?;

    Ok(Reading::new(timestamp, voltage_v, current_a, active_power_kw))
}
