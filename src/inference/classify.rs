//! Scalar classification: integer, then float, then date, then string
//!
//! The order is fixed. An all-digit string such as `"20240101"` is claimed by
//! the integer rule before date patterns are ever tried.

use chrono::{NaiveDate, NaiveDateTime};

use super::types::{RawValue, TypedValue};

/// Date patterns tried in order; the first that parses wins
pub const DATE_PATTERNS: &[DatePattern] = &[
    DatePattern::DateTime("%Y-%m-%d %H:%M:%S"),
    DatePattern::Date("%Y-%m-%d"),
    DatePattern::Date("%d/%m/%Y"),
    DatePattern::Date("%Y%m%d"),
];

/// A chrono format string, tagged with whether it carries a time part
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DatePattern {
    DateTime(&'static str),
    Date(&'static str),
}

impl DatePattern {
    /// Parse `text` with this pattern
    pub fn parse(&self, text: &str) -> Option<NaiveDateTime> {
        match self {
            DatePattern::DateTime(fmt) => NaiveDateTime::parse_from_str(text, fmt).ok(),
            DatePattern::Date(fmt) => NaiveDate::parse_from_str(text, fmt)
                .ok()
                .and_then(|d| d.and_hms_opt(0, 0, 0)),
        }
    }
}

/// Classify a normalized value. `None` means the value is skipped.
pub fn classify(value: &RawValue) -> Option<TypedValue> {
    match value {
        RawValue::Null | RawValue::List(_) | RawValue::Object(_) => None,
        RawValue::Boolean(b) => {
            let text = if *b { "True" } else { "False" };
            Some(TypedValue::Text(text.to_string()))
        }
        RawValue::Integer(n) => Some(TypedValue::Integer(i128::from(*n))),
        RawValue::Float(f) => classify_float(*f),
        RawValue::Text(s) => classify_text(s),
    }
}

fn classify_float(value: f64) -> Option<TypedValue> {
    if !value.is_finite() {
        return None;
    }
    match integral(value) {
        Some(n) => Some(TypedValue::Integer(n)),
        None => Some(float_value(value)),
    }
}

/// 2^127, the first magnitude an `i128` cannot hold
const I128_LIMIT: f64 = 170_141_183_460_469_231_731_687_303_715_884_105_728.0;

/// Whole-number floats that fit in an `i128`
fn integral(value: f64) -> Option<i128> {
    if value.fract() != 0.0 || value >= I128_LIMIT || value < -I128_LIMIT {
        return None;
    }
    Some(value as i128)
}

fn classify_text(text: &str) -> Option<TypedValue> {
    let text = text.trim();
    if text.is_empty() {
        return None;
    }

    if let Some(n) = parse_integer(text) {
        return Some(TypedValue::Integer(n));
    }

    if let Some(f) = parse_float(text) {
        return Some(float_value(f));
    }

    if let Some(date) = parse_date(text) {
        return Some(TypedValue::Date(date));
    }

    Some(TypedValue::Text(text.to_string()))
}

/// Integer rule for text: no `.`, parses as a finite number with no fractional part.
/// Whole numbers beyond the `i128` range are left to the float rule.
pub fn parse_integer(text: &str) -> Option<i128> {
    if text.contains('.') {
        return None;
    }
    if let Ok(n) = text.parse::<i128>() {
        return Some(n);
    }
    integral(parse_float(text)?)
}

/// Float rule for text: parses as a finite floating-point number
pub fn parse_float(text: &str) -> Option<f64> {
    text.parse::<f64>().ok().filter(|f| f.is_finite())
}

/// Date rule for text: matches one of [`DATE_PATTERNS`]
pub fn parse_date(text: &str) -> Option<NaiveDateTime> {
    DATE_PATTERNS.iter().find_map(|pattern| pattern.parse(text))
}

fn float_value(value: f64) -> TypedValue {
    TypedValue::Float {
        value,
        fraction_digits: fraction_digits(value),
    }
}

/// Digits after the decimal point in the shortest round-trip rendering.
/// An integral float renders as `7.0` and counts one digit.
pub fn fraction_digits(value: f64) -> usize {
    let rendered = value.to_string();
    rendered
        .split_once('.')
        .map(|(_, fraction)| fraction.len())
        .unwrap_or(1)
}
