//! Permissive numeric parsing shared by the document model and the CLI.
//!
//! Field values that cannot be read as numbers collapse to a safe default
//! (usually zero) instead of failing the whole document.

use serde::{Deserialize, Deserializer};
use serde_json::Value;

/// Parses a dollar amount or fraction, returning `0.0` for anything unreadable.
///
/// Currency symbols, grouping commas and surrounding whitespace are ignored.
/// A trailing `%` divides the value by 100, so `"13%"` reads as `0.13`.
pub fn parse_number(raw: &str) -> f64 {
    let trimmed = raw.trim();
    let (body, percent) = match trimmed.strip_suffix('%') {
        Some(rest) => (rest, true),
        None => (trimmed, false),
    };
    let cleaned: String = body
        .chars()
        .filter(|ch| !matches!(ch, '$' | ',' | ' ' | '_'))
        .collect();
    let value = cleaned.parse::<f64>().ok().filter(|v| v.is_finite());
    match value {
        Some(v) if percent => v / 100.0,
        Some(v) => v,
        None => 0.0,
    }
}

/// Parses a week count; negative, fractional-below-one or garbage input yields `0`.
pub fn parse_weeks(raw: &str) -> u32 {
    weeks_from_f64(parse_number(raw))
}

pub(crate) fn weeks_from_f64(value: f64) -> u32 {
    if !value.is_finite() || value <= 0.0 {
        return 0;
    }
    value.floor().min(u32::MAX as f64) as u32
}

fn number_from_value(value: &Value) -> f64 {
    match value {
        Value::Number(n) => n.as_f64().filter(|v| v.is_finite()).unwrap_or(0.0),
        Value::String(s) => parse_number(s),
        _ => 0.0,
    }
}

pub(crate) fn lenient_f64<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(number_from_value(&value))
}

pub(crate) fn lenient_u32<'de, D>(deserializer: D) -> Result<u32, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(weeks_from_f64(number_from_value(&value)))
}

pub(crate) fn lenient_bool<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(match value {
        Value::Bool(b) => b,
        Value::Number(n) => n.as_f64().map(|v| v != 0.0).unwrap_or(false),
        Value::String(s) => matches!(
            s.trim().to_ascii_lowercase().as_str(),
            "true" | "yes" | "on" | "1"
        ),
        _ => false,
    })
}

/// Rounds to whole cents.
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
