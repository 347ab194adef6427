//! Shared value normalization for extracted fields.
//!
//! Extraction output writes numbers in many shapes: `"1,234.50 ₪"`,
//! `"12,5"`, `"$ 99"`. Every numeric read in the crate goes through
//! [`coerce_decimal`] so that currency stripping and separator handling
//! are decided in one place.

use std::str::FromStr;

use lazy_static::lazy_static;
use regex::Regex;
use rust_decimal::Decimal;
use tracing::warn;

use crate::models::record::FieldValue;

lazy_static! {
    /// Currency symbols and codes that may surround an amount.
    pub static ref CURRENCY: Regex = Regex::new(
        r"(?i)[₪$€£¥]|\b(?:ILS|NIS|USD|EUR|GBP|PLN)\b|zł|ש״ח|ש\x22ח"
    ).unwrap();

    /// Runs of whitespace, including non-breaking spaces.
    pub static ref WHITESPACE: Regex = Regex::new(r"[\s\u{00a0}]+").unwrap();
}

/// Outcome of reading a field as a number.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Coerced {
    /// Field absent or blank.
    Missing,
    /// Parsed value.
    Value(Decimal),
    /// Present but not a number; carries the raw text.
    Unparseable(String),
}

/// Read a field value as a decimal without applying any default.
pub fn coerce_decimal(value: Option<&FieldValue>) -> Coerced {
    match value {
        None => Coerced::Missing,
        Some(FieldValue::Integer(v)) => Coerced::Value(Decimal::from(*v)),
        Some(FieldValue::Decimal(v)) => Coerced::Value(*v),
        Some(FieldValue::Text(s)) if s.trim().is_empty() => Coerced::Missing,
        Some(FieldValue::Text(s)) => match parse_amount(s) {
            Some(v) => Coerced::Value(v),
            None => Coerced::Unparseable(s.clone()),
        },
    }
}

/// Read a field as a decimal, falling back to `default` when absent or
/// unparseable. Unparseable values are logged.
pub fn decimal_or(value: Option<&FieldValue>, field: &str, default: Decimal) -> Decimal {
    match coerce_decimal(value) {
        Coerced::Value(v) => v,
        Coerced::Missing => default,
        Coerced::Unparseable(raw) => {
            warn!("Could not read {} value {:?} as a number, using {}", field, raw, default);
            default
        }
    }
}

/// Parse a free-form amount such as `"1 234,56 ₪"` or `"$1,234.56"`.
///
/// Currency markers and whitespace are dropped. When only commas are present a
/// single comma is the decimal point and several commas are thousands
/// separators; when both commas and dots are present the last one is the
/// decimal point.
pub fn parse_amount(s: &str) -> Option<Decimal> {
    let stripped = CURRENCY.replace_all(s, "");
    let stripped = WHITESPACE.replace_all(&stripped, "");

    let negative = stripped.starts_with('-') || stripped.ends_with('-')
        || (stripped.starts_with('(') && stripped.ends_with(')'));

    let cleaned: String = stripped
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == ',' || *c == '.' || *c == 'e' || *c == 'E')
        .collect();

    if !cleaned.chars().any(|c| c.is_ascii_digit()) {
        return None;
    }

    // Anything other than digits, separators, sign or exponent means this is text
    if stripped
        .chars()
        .any(|c| !(c.is_ascii_digit() || matches!(c, ',' | '.' | '-' | '+' | '(' | ')' | 'e' | 'E' | '\'')))
    {
        return None;
    }

    let commas = cleaned.matches(',').count();
    let dots = cleaned.matches('.').count();

    let normalized = match (commas, dots) {
        (0, 0) | (0, 1) => cleaned,
        (0, _) => cleaned.replace('.', ""),
        (1, 0) => cleaned.replace(',', "."),
        (_, 0) => cleaned.replace(',', ""),
        _ => {
            let comma_pos = cleaned.rfind(',');
            let dot_pos = cleaned.rfind('.');
            match (comma_pos, dot_pos) {
                (Some(c), Some(d)) if c > d => cleaned.replace('.', "").replace(',', "."),
                _ => cleaned.replace(',', ""),
            }
        }
    };

    let value = Decimal::from_str(&normalized)
        .or_else(|_| Decimal::from_scientific(&normalized))
        .ok()?;

    Some(if negative { -value } else { value })
}

/// Sum decimals, returning `None` when the total leaves the representable range.
pub fn checked_sum(values: impl IntoIterator<Item = Decimal>) -> Option<Decimal> {
    values
        .into_iter()
        .try_fold(Decimal::ZERO, |acc, v| acc.checked_add(v))
}

/// Trim and collapse internal whitespace runs to single spaces.
pub fn normalize_whitespace(s: &str) -> String {
    WHITESPACE.replace_all(s.trim(), " ").into_owned()
}
