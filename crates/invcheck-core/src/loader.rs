//! JSON boundary: extraction documents in, record sets out.
//!
//! Extraction output comes in a few shapes. Items are looked up at
//! `main.main_items`, `main_items`, `ground_truth`, `data`, or the document
//! is itself an array. A filled-in reference template (`{"line_1": {..}}`)
//! is accepted as well. Anything else that is an object is one record.

use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;
use std::str::FromStr;

use rust_decimal::Decimal;
use serde_json::{Map, Value};
use tracing::{debug, info};

use crate::accuracy::DEFAULT_MEASURED_FIELDS;
use crate::error::{InputError, Result};
use crate::models::record::{FieldValue, Fields, Record, RecordSet};

/// Intro keys read from the document root.
const ROOT_HEADER_KEYS: [&str; 3] = ["supplier_name", "invoice_number", "invoice_date"];

/// Read and parse an extraction document.
pub fn load_record_set(path: &Path) -> Result<RecordSet> {
    let content = std::fs::read_to_string(path)?;
    let records = parse_record_set(&content)?;
    info!("Loaded {} records from {}", records.len(), path.display());
    Ok(records)
}

/// Parse an extraction document from a JSON string.
pub fn parse_record_set(json: &str) -> std::result::Result<RecordSet, InputError> {
    let value: Value = serde_json::from_str(json)?;
    record_set_from_value(&value)
}

/// Build a record set from an already-parsed JSON document.
pub fn record_set_from_value(value: &Value) -> std::result::Result<RecordSet, InputError> {
    let items = locate_items(value)?;

    let records = items
        .iter()
        .enumerate()
        .map(|(index, item)| record_from_value(index, item))
        .collect::<std::result::Result<Vec<_>, _>>()?;

    let mut set = RecordSet::new(records);
    if let Value::Object(root) = value {
        set.header = extract_header(root);
        set.summary = extract_summary(root);
    }

    Ok(set)
}

/// Identifier of a candidate file: its stem.
pub fn file_id(path: &Path) -> String {
    path.file_stem()
        .or_else(|| path.file_name())
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

/// Identifiers for a batch of candidate files, one per path and all distinct.
///
/// A stem shared by several paths is qualified with its parent directory
/// name (`run1/invoice`); anything still colliding gets a `#n` suffix.
pub fn file_ids<P: AsRef<Path>>(paths: &[P]) -> Vec<String> {
    let stems: Vec<String> = paths.iter().map(|p| file_id(p.as_ref())).collect();
    let mut stem_counts: BTreeMap<&str, usize> = BTreeMap::new();
    for stem in &stems {
        *stem_counts.entry(stem.as_str()).or_default() += 1;
    }

    let mut seen = BTreeSet::new();
    paths
        .iter()
        .zip(&stems)
        .map(|(path, stem)| {
            let base = if stem_counts[stem.as_str()] > 1 {
                qualified_file_id(path.as_ref(), stem)
            } else {
                stem.clone()
            };

            let mut id = base.clone();
            let mut n = 2;
            while !seen.insert(id.clone()) {
                id = format!("{}#{}", base, n);
                n += 1;
            }
            if id != *stem {
                debug!("File {} gets id {}", path.as_ref().display(), id);
            }
            id
        })
        .collect()
}

fn qualified_file_id(path: &Path, stem: &str) -> String {
    match path.parent().and_then(|p| p.file_name()) {
        Some(parent) => format!("{}/{}", parent.to_string_lossy(), stem),
        None => stem.to_string(),
    }
}

fn locate_items(value: &Value) -> std::result::Result<Vec<Value>, InputError> {
    let root = match value {
        Value::Array(items) => return Ok(items.clone()),
        Value::Object(root) => root,
        other => {
            return Err(InputError::Document(format!(
                "expected an object or array, found {}",
                json_kind(other)
            )))
        }
    };

    let candidates = [
        root.get("main").and_then(|m| m.get("main_items")),
        root.get("main_items"),
        root.get("ground_truth"),
        root.get("data"),
    ];
    if let Some(Value::Array(items)) = candidates.into_iter().flatten().find(|v| v.is_array()) {
        return Ok(items.clone());
    }

    if let Some(items) = template_items(root) {
        debug!("Reading line-keyed template document");
        return Ok(items);
    }

    debug!("No item collection found, treating document as a single record");
    Ok(vec![value.clone()])
}

/// `{"line_1": {...}, "line_2": {...}}` back into items carrying `line`.
fn template_items(root: &Map<String, Value>) -> Option<Vec<Value>> {
    if root.is_empty() {
        return None;
    }

    let mut items = Vec::with_capacity(root.len());
    for (key, value) in root {
        let line: i64 = key.strip_prefix("line_")?.parse().ok()?;
        let mut fields = value.as_object()?.clone();
        fields.insert("line".to_string(), Value::from(line));
        items.push((line, Value::Object(fields)));
    }

    items.sort_by_key(|(line, _)| *line);
    Some(items.into_iter().map(|(_, v)| v).collect())
}

fn record_from_value(index: usize, item: &Value) -> std::result::Result<Record, InputError> {
    let Value::Object(map) = item else {
        return Err(InputError::InvalidRecord { index });
    };

    let line = match map.get("line") {
        None | Some(Value::Null) => index as i64 + 1,
        Some(raw) => line_number(raw).ok_or_else(|| InputError::InvalidLine {
            index,
            value: raw.to_string(),
        })?,
    };

    let fields = map
        .iter()
        .filter(|(key, _)| key.as_str() != "line")
        .map(|(key, value)| (key.clone(), field_value(value)))
        .collect();

    Ok(Record { line, fields })
}

fn line_number(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().filter(|f| f.fract() == 0.0).map(|f| f as i64)),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// JSON scalar to field value. `null` reads as blank.
pub fn field_value(value: &Value) -> FieldValue {
    match value {
        Value::Null => FieldValue::Text(String::new()),
        Value::String(s) => FieldValue::Text(s.clone()),
        Value::Bool(b) => FieldValue::Text(if *b { "True" } else { "False" }.to_string()),
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                return FieldValue::Integer(i);
            }
            let repr = n.to_string();
            Decimal::from_str(&repr)
                .or_else(|_| Decimal::from_scientific(&repr))
                .map(FieldValue::Decimal)
                .unwrap_or(FieldValue::Text(repr))
        }
        other => FieldValue::Text(other.to_string()),
    }
}

fn object_fields(map: &Map<String, Value>) -> Fields {
    map.iter()
        .map(|(key, value)| (key.clone(), field_value(value)))
        .collect()
}

fn extract_header(root: &Map<String, Value>) -> Fields {
    let mut header = Fields::new();
    for key in ROOT_HEADER_KEYS {
        if let Some(value) = root.get(key) {
            header.insert(key.to_string(), field_value(value));
        }
    }
    if let Some(Value::Object(map)) = root.get("header") {
        header.extend(object_fields(map));
    }
    header
}

fn extract_summary(root: &Map<String, Value>) -> Option<Fields> {
    let scopes = [Some(root), root.get("main").and_then(Value::as_object)];
    scopes
        .into_iter()
        .flatten()
        .flat_map(|scope| [scope.get("summary"), scope.get("totals")])
        .flatten()
        .find_map(Value::as_object)
        .map(object_fields)
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

/// Blank reference skeleton covering every field and line the candidates use.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReferenceTemplate {
    /// Canonical fields first, then any extra fields in sorted order.
    pub fields: Vec<String>,
    /// Every line number seen, ascending. Never empty.
    pub lines: Vec<i64>,
}

impl ReferenceTemplate {
    /// Collect fields and line numbers from the loaded candidates.
    pub fn from_candidates<'a>(candidates: impl IntoIterator<Item = &'a RecordSet>) -> Self {
        let mut seen_fields = BTreeSet::new();
        let mut lines = BTreeSet::new();

        for set in candidates {
            for record in set.iter() {
                lines.insert(record.line);
                seen_fields.extend(record.fields.keys().cloned());
            }
        }

        if lines.is_empty() {
            lines.insert(1);
        }

        let mut fields: Vec<String> = DEFAULT_MEASURED_FIELDS.iter().map(|f| f.to_string()).collect();
        fields.extend(
            seen_fields
                .into_iter()
                .filter(|f| !DEFAULT_MEASURED_FIELDS.contains(&f.as_str())),
        );

        info!("Generated template: {} lines, {} fields", lines.len(), fields.len());

        Self {
            fields,
            lines: lines.into_iter().collect(),
        }
    }

    /// `{"line_<n>": {"<field>": "", ...}, ...}` in line order.
    pub fn to_json(&self) -> Value {
        let mut template = Map::new();
        for line in &self.lines {
            let blank: Map<String, Value> = self
                .fields
                .iter()
                .map(|f| (f.clone(), Value::String(String::new())))
                .collect();
            template.insert(format!("line_{}", line), Value::Object(blank));
        }
        Value::Object(template)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_parse_main_items() {
        let json = r#"{
            "supplier_name": "Acme",
            "main": {"main_items": [
                {"line": 1, "description": "Apple", "quantity": 2, "unit_price": 10.5},
                {"line": 2, "description": null}
            ]}
        }"#;

        let set = parse_record_set(json).unwrap();
        assert_eq!(set.len(), 2);
        assert_eq!(set.records[0].text("unit_price"), "10.5");
        assert_eq!(set.records[0].get("quantity"), Some(&FieldValue::Integer(2)));
        assert!(set.records[1].get("description").unwrap().is_blank());
        assert_eq!(set.header["supplier_name"], FieldValue::from("Acme"));
    }

    #[test]
    fn test_booleans_read_as_capitalized_text() {
        assert_eq!(field_value(&Value::Bool(true)), FieldValue::from("True"));
        assert_eq!(field_value(&Value::Bool(false)), FieldValue::from("False"));
    }

    #[test]
    fn test_file_ids_are_stems_when_unique() {
        let ids = file_ids(&["out/a.json", "out/b.json"]);
        assert_eq!(ids, vec!["a", "b"]);
    }

    #[test]
    fn test_file_ids_qualify_shared_stems() {
        let ids = file_ids(&["run1/invoice.json", "run2/invoice.json", "run2/other.json"]);
        assert_eq!(ids, vec!["run1/invoice", "run2/invoice", "other"]);

        let ids = file_ids(&["invoice.json", "x/invoice.json", "y/x/invoice.json"]);
        assert_eq!(ids, vec!["invoice", "x/invoice", "x/invoice#2"]);
    }

    #[test]
    fn test_parse_top_level_array_numbers_lines() {
        let json = r#"[{"description": "A"}, {"description": "B"}]"#;
        let set = parse_record_set(json).unwrap();
        let lines: Vec<i64> = set.iter().map(|r| r.line).collect();
        assert_eq!(lines, vec![1, 2]);
    }

    #[test]
    fn test_parse_ground_truth_and_data_keys() {
        let gt = parse_record_set(r#"{"ground_truth": [{"line": 4, "description": "X"}]}"#).unwrap();
        assert_eq!(gt.records[0].line, 4);

        let data = parse_record_set(r#"{"data": [{"line": "7", "description": "Y"}]}"#).unwrap();
        assert_eq!(data.records[0].line, 7);
    }

    #[test]
    fn test_parse_single_object_is_one_record() {
        let set = parse_record_set(r#"{"description": "Lonely", "quantity": 1}"#).unwrap();
        assert_eq!(set.len(), 1);
        assert_eq!(set.records[0].line, 1);
    }

    #[test]
    fn test_parse_filled_template() {
        let json = r#"{
            "line_2": {"description": "Pear"},
            "line_1": {"description": "Apple"}
        }"#;
        let set = parse_record_set(json).unwrap();
        let lines: Vec<i64> = set.iter().map(|r| r.line).collect();
        assert_eq!(lines, vec![1, 2]);
        assert_eq!(set.records[0].text("description"), "Apple");
    }

    #[test]
    fn test_summary_and_header_blocks() {
        let json = r#"{
            "header": {"customer_name": "Beta Ltd", "currency": "EUR"},
            "main_items": [{"line": 1, "description": "A"}],
            "totals": {"subtotal": "100.00", "vat_amount": 17, "total": 117}
        }"#;
        let set = parse_record_set(json).unwrap();
        assert_eq!(set.header["currency"], FieldValue::from("EUR"));
        let summary = set.summary.unwrap();
        assert_eq!(summary["subtotal"], FieldValue::from("100.00"));
        assert_eq!(summary["total"], FieldValue::Integer(117));
    }

    #[test]
    fn test_invalid_documents() {
        assert!(matches!(parse_record_set("not json"), Err(InputError::Json(_))));
        assert!(matches!(parse_record_set("42"), Err(InputError::Document(_))));
        assert!(matches!(
            parse_record_set(r#"[{"line": 1}, "oops"]"#),
            Err(InputError::InvalidRecord { index: 1 })
        ));
        assert!(matches!(
            parse_record_set(r#"[{"line": "first"}]"#),
            Err(InputError::InvalidLine { index: 0, .. })
        ));
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("invoice_a.json");
        std::fs::write(&path, r#"[{"line": 1, "description": "Apple"}]"#).unwrap();

        let set = load_record_set(&path).unwrap();
        assert_eq!(set.len(), 1);
        assert_eq!(file_id(&path), "invoice_a");
    }

    #[test]
    fn test_template_collects_fields_and_lines() {
        let a = RecordSet::new(vec![
            Record::new(2).with("description", "A").with("unit", "kg"),
        ]);
        let b = RecordSet::new(vec![
            Record::new(1).with("description", "B").with("color", "red"),
        ]);

        let template = ReferenceTemplate::from_candidates([&a, &b]);
        assert_eq!(template.lines, vec![1, 2]);
        assert_eq!(template.fields.len(), 10);
        assert_eq!(template.fields[0], "barcode");
        assert_eq!(&template.fields[8..], &["color".to_string(), "unit".to_string()]);

        let json = template.to_json();
        assert_eq!(json["line_1"]["description"], Value::String(String::new()));
        assert_eq!(json["line_2"]["unit"], Value::String(String::new()));
    }

    #[test]
    fn test_template_without_candidates_has_one_line() {
        let template = ReferenceTemplate::from_candidates(std::iter::empty::<&RecordSet>());
        assert_eq!(template.lines, vec![1]);
        assert_eq!(template.fields.len(), 8);
    }
}
