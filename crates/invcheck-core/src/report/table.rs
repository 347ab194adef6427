//! Field-by-field comparison table across candidate files.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::models::record::RecordSet;
use crate::orchestrator::CombinedReport;

/// One file's result for one field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldCell {
    /// `correct/total`, or `-` when the field was not measured in this file.
    pub result: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub accuracy: Option<f64>,
}

/// Table row for one field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldRow {
    pub field: String,
    /// Reference values for the field, abbreviated.
    pub source_data: String,
    pub results: BTreeMap<String, FieldCell>,
    /// Mean accuracy over every file; unmeasured files count 0.
    pub overall_score: f64,
}

/// Expanded comparison table: fields down, files across.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldTable {
    pub files: Vec<String>,
    pub rows: Vec<FieldRow>,
}

impl FieldTable {
    /// Build the table from the reference and the character reports.
    ///
    /// Only fields measured in at least one file get a row.
    pub fn build(reference: &RecordSet, files: &BTreeMap<String, CombinedReport>) -> Self {
        let measured: BTreeSet<&String> = files
            .values()
            .filter_map(|f| f.character.as_ref())
            .flat_map(|r| r.field_accuracies.keys())
            .collect();

        let rows = measured
            .into_iter()
            .map(|field| {
                let mut results = BTreeMap::new();
                let mut sum = 0.0;

                for (file_id, report) in files {
                    let cell = match report
                        .character
                        .as_ref()
                        .and_then(|r| r.field_accuracies.get(field))
                    {
                        Some(acc) => {
                            sum += acc.accuracy;
                            FieldCell {
                                result: format!("{}/{}", acc.correct_chars, acc.total_chars),
                                accuracy: Some(acc.accuracy),
                            }
                        }
                        None => FieldCell {
                            result: "-".to_string(),
                            accuracy: None,
                        },
                    };
                    results.insert(file_id.clone(), cell);
                }

                let overall_score = if files.is_empty() {
                    0.0
                } else {
                    sum / files.len() as f64
                };

                FieldRow {
                    field: field.clone(),
                    source_data: source_data(reference, field),
                    results,
                    overall_score,
                }
            })
            .collect();

        Self {
            files: files.keys().cloned().collect(),
            rows,
        }
    }
}

/// Up to two reference values, then a count of the rest.
fn source_data(reference: &RecordSet, field: &str) -> String {
    let values: Vec<String> = reference
        .iter()
        .filter_map(|r| r.get(field))
        .filter(|v| !v.is_blank())
        .map(|v| v.to_text())
        .collect();

    match values.len() {
        0 => "-".to_string(),
        1 | 2 => values.join(", "),
        n => format!("{} and {} more", values[..2].join(", "), n - 2),
    }
}
