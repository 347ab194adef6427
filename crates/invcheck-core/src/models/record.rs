//! Extracted and reference line-item records.

use std::collections::BTreeMap;
use std::fmt;

use rust_decimal::Decimal;
use serde::Serialize;

/// Field name to value mapping shared by records, headers and summary blocks.
pub type Fields = BTreeMap<String, FieldValue>;

/// A scalar extracted for one field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum FieldValue {
    /// Whole number, as emitted by the extraction pipeline.
    Integer(i64),
    /// Fractional number; keeps the scale it was written with.
    Decimal(Decimal),
    /// Free text (also used for blanks and non-scalar leftovers).
    Text(String),
}

impl FieldValue {
    /// String form used for character comparison.
    pub fn to_text(&self) -> String {
        self.to_string()
    }

    /// True when the string form is empty after trimming.
    pub fn is_blank(&self) -> bool {
        match self {
            FieldValue::Text(s) => s.trim().is_empty(),
            _ => false,
        }
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::Integer(v) => write!(f, "{}", v),
            FieldValue::Decimal(v) => write!(f, "{}", v),
            FieldValue::Text(v) => f.write_str(v),
        }
    }
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        FieldValue::Text(value.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(value: String) -> Self {
        FieldValue::Text(value)
    }
}

impl From<i64> for FieldValue {
    fn from(value: i64) -> Self {
        FieldValue::Integer(value)
    }
}

impl From<i32> for FieldValue {
    fn from(value: i32) -> Self {
        FieldValue::Integer(value as i64)
    }
}

impl From<Decimal> for FieldValue {
    fn from(value: Decimal) -> Self {
        FieldValue::Decimal(value)
    }
}

/// One invoice line item, extracted or reference.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Record {
    /// Line number used to align candidates against the reference.
    pub line: i64,

    /// Field values keyed by field name.
    pub fields: Fields,
}

impl Record {
    /// Create an empty record for a line.
    pub fn new(line: i64) -> Self {
        Self {
            line,
            fields: Fields::new(),
        }
    }

    /// Builder-style field setter.
    pub fn with(mut self, name: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        self.fields.insert(name.into(), value.into());
        self
    }

    pub fn get(&self, name: &str) -> Option<&FieldValue> {
        self.fields.get(name)
    }

    /// String form of a field, empty when absent.
    pub fn text(&self, name: &str) -> String {
        self.fields.get(name).map(FieldValue::to_text).unwrap_or_default()
    }
}

/// Ordered records belonging to one candidate file or to the reference.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RecordSet {
    /// Line items in document order.
    pub records: Vec<Record>,

    /// Intro metadata (supplier, invoice number, ...), if the file carries any.
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub header: Fields,

    /// Explicit summary block (subtotal, vat_amount, total), if present.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<Fields>,
}

impl RecordSet {
    pub fn new(records: Vec<Record>) -> Self {
        Self {
            records,
            header: Fields::new(),
            summary: None,
        }
    }

    /// Attach intro metadata.
    pub fn with_header(mut self, header: Fields) -> Self {
        self.header = header;
        self
    }

    /// Attach an explicit summary block.
    pub fn with_summary(mut self, summary: Fields) -> Self {
        self.summary = Some(summary);
        self
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Record> {
        self.records.iter()
    }
}

impl FromIterator<Record> for RecordSet {
    fn from_iter<I: IntoIterator<Item = Record>>(iter: I) -> Self {
        RecordSet::new(iter.into_iter().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_field_value_text() {
        assert_eq!(FieldValue::from(2).to_text(), "2");
        assert_eq!(
            FieldValue::from(Decimal::from_str("20.0").unwrap()).to_text(),
            "20.0"
        );
        assert_eq!(FieldValue::from(" Apple ").to_text(), " Apple ");
    }

    #[test]
    fn test_blank_detection() {
        assert!(FieldValue::from("   ").is_blank());
        assert!(!FieldValue::from("0").is_blank());
        assert!(!FieldValue::from(0).is_blank());
    }

    #[test]
    fn test_record_text_for_missing_field() {
        let record = Record::new(1).with("description", "Apple");
        assert_eq!(record.text("description"), "Apple");
        assert_eq!(record.text("barcode"), "");
    }
}
