//! Value coercion between column types and their text form.
//!
//! Everything that is not a secure value travels through the data file as a
//! string. [`to_wire`] and [`from_wire`] define that text form; [`convert`]
//! re-types an in-memory value to a column's declared type.

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, SecondsFormat, TimeZone, Utc};
use uuid::Uuid;

use crate::error::{Result, StoreError};
use crate::storage::types::{ColumnType, SecureText, Value};

/// Naive layouts accepted for DateTime values, interpreted as UTC.
const NAIVE_DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%m/%d/%Y %H:%M:%S",
    "%m/%d/%Y %I:%M:%S %p",
];

/// Convert a value to the requested column type.
///
/// `Null` always stays `Null`. Values already of the target type pass
/// through unchanged.
///
/// # Errors
///
/// Returns `StoreError::Conversion` when there is no sensible mapping (for
/// example a UUID into an integer column) or the text does not parse.
pub fn convert(value: &Value, target: ColumnType) -> Result<Value> {
    if value.column_type() == Some(target) {
        return Ok(value.clone());
    }

    match (value, target) {
        (Value::Null, _) => Ok(Value::Null),
        (Value::Secure(text), _) => from_wire(text.expose(), target),
        (Value::String(text), _) => from_wire(text, target),
        (other, ColumnType::String) => Ok(Value::String(to_wire(other).unwrap_or_default())),
        (other, ColumnType::Secure) => Ok(Value::Secure(SecureText::new(
            to_wire(other).unwrap_or_default(),
        ))),
        (Value::Integer(i), ColumnType::Float) => Ok(Value::Float(*i as f64)),
        (Value::Float(f), ColumnType::Integer) => float_to_integer(*f),
        (Value::Integer(i), ColumnType::Boolean) => Ok(Value::Boolean(*i != 0)),
        (Value::Boolean(b), ColumnType::Integer) => Ok(Value::Integer(i64::from(*b))),
        (Value::Boolean(b), ColumnType::Float) => Ok(Value::Float(if *b { 1.0 } else { 0.0 })),
        (other, _) => Err(StoreError::Conversion(format!(
            "Cannot convert {} to {}",
            other.column_type().map(ColumnType::name).unwrap_or("Null"),
            target
        ))),
    }
}

/// Canonical text form of a value, `None` for `Null`.
///
/// Secure values yield their plaintext; encrypting them is the converter's
/// job, not this function's.
pub fn to_wire(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::Uuid(id) => Some(id.hyphenated().to_string()),
        Value::String(s) => Some(s.clone()),
        Value::Integer(i) => Some(i.to_string()),
        Value::Float(f) => Some(f.to_string()),
        Value::Boolean(b) => Some(b.to_string()),
        Value::DateTime(dt) => Some(dt.to_rfc3339_opts(SecondsFormat::AutoSi, true)),
        Value::Secure(text) => Some(text.expose().to_string()),
    }
}

/// Parse the text form of a value of the given type.
///
/// Blank text becomes `Null` for every type except `String` and `Secure`,
/// where it is kept as an empty string.
pub fn from_wire(text: &str, target: ColumnType) -> Result<Value> {
    let trimmed = text.trim();
    if trimmed.is_empty() && !matches!(target, ColumnType::String | ColumnType::Secure) {
        return Ok(Value::Null);
    }

    match target {
        ColumnType::String => Ok(Value::String(text.to_string())),
        ColumnType::Secure => Ok(Value::Secure(SecureText::new(text))),
        ColumnType::Uuid => Uuid::parse_str(trimmed)
            .map(Value::Uuid)
            .map_err(|e| conversion_error(text, target, e)),
        ColumnType::Integer => match trimmed.parse::<i64>() {
            Ok(i) => Ok(Value::Integer(i)),
            Err(e) => trimmed
                .parse::<f64>()
                .map_err(|_| conversion_error(text, target, e))
                .and_then(float_to_integer),
        },
        ColumnType::Float => trimmed
            .parse::<f64>()
            .map(Value::Float)
            .map_err(|e| conversion_error(text, target, e)),
        ColumnType::Boolean => parse_bool(trimmed)
            .map(Value::Boolean)
            .ok_or_else(|| conversion_error(text, target, "expected true/false, yes/no or 1/0")),
        ColumnType::DateTime => parse_datetime(trimmed).map(Value::DateTime),
    }
}

/// Parse a timestamp.
///
/// Accepts RFC 3339 and a handful of common naive layouts. Naive values
/// (without an offset) are taken as UTC.
pub fn parse_datetime(text: &str) -> Result<DateTime<FixedOffset>> {
    let text = text.trim();

    if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
        return Ok(dt);
    }

    for format in NAIVE_DATETIME_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(text, format) {
            return Ok(Utc.from_utc_datetime(&naive).fixed_offset());
        }
    }

    if let Ok(date) = NaiveDate::parse_from_str(text, "%Y-%m-%d") {
        if let Some(naive) = date.and_hms_opt(0, 0, 0) {
            return Ok(Utc.from_utc_datetime(&naive).fixed_offset());
        }
    }

    Err(conversion_error(
        text,
        ColumnType::DateTime,
        "unrecognized date/time format",
    ))
}

fn parse_bool(text: &str) -> Option<bool> {
    match text.to_ascii_lowercase().as_str() {
        "true" | "yes" | "1" => Some(true),
        "false" | "no" | "0" => Some(false),
        _ => None,
    }
}

fn float_to_integer(f: f64) -> Result<Value> {
    if f.is_finite() && f.fract() == 0.0 && f >= i64::MIN as f64 && f <= i64::MAX as f64 {
        Ok(Value::Integer(f as i64))
    } else {
        Err(StoreError::Conversion(format!(
            "{} is not a whole number",
            f
        )))
    }
}

fn conversion_error(text: &str, target: ColumnType, reason: impl std::fmt::Display) -> StoreError {
    StoreError::Conversion(format!("'{}' is not a valid {}: {}", text, target, reason))
}
