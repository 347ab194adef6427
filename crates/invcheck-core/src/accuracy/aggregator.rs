//! Roll-up of field comparisons into per-field and per-file accuracy.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, warn};

use crate::models::record::{Record, RecordSet};

use super::aligner::{self, LineIndex, SkippedLine};
use super::comparator::{compare, FieldComparison};

/// Fields measured when the caller does not choose.
pub const DEFAULT_MEASURED_FIELDS: [&str; 8] = [
    "barcode",
    "item_code",
    "description",
    "quantity",
    "unit_price",
    "discount_percent",
    "price_after_discount",
    "total_amount",
];

/// Comparison of one aligned line.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LineComparison {
    pub line: i64,
    /// Per-field results; reference-blank fields are absent.
    pub fields: BTreeMap<String, FieldComparison>,
    pub total_chars: usize,
    pub correct_chars: usize,
    pub measured_fields: usize,
    /// `correct / total`, or 1.0 when nothing was measured on this line.
    pub accuracy: f64,
}

/// Accuracy of one field across every line of a file.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FieldAccuracy {
    pub accuracy: f64,
    pub total_chars: usize,
    pub correct_chars: usize,
    /// Lines where the reference asserted this field.
    pub measured_in_lines: usize,
}

/// Character accuracy of one candidate file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileAccuracyReport {
    /// `correct_characters / total_characters`, or 0.0 when nothing was measured.
    pub overall_accuracy: f64,
    pub total_characters: usize,
    pub correct_characters: usize,
    /// Lines present in both the reference and the file.
    pub processed_lines: usize,
    /// Field comparisons actually scored, over all lines.
    pub total_measured_fields: usize,
    /// Only fields measured at least once appear.
    pub field_accuracies: BTreeMap<String, FieldAccuracy>,
    /// Lines that could not be aligned.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub skipped_lines: Vec<SkippedLine>,
}

impl FileAccuracyReport {
    /// True when at least one character was measured.
    pub fn has_measurements(&self) -> bool {
        self.total_characters > 0
    }
}

#[derive(Default)]
struct Tally {
    total: usize,
    correct: usize,
    lines: usize,
}

/// Scores candidate record sets against a reference, field by field.
#[derive(Debug, Clone)]
pub struct FieldAccuracyAggregator {
    measured_fields: Vec<String>,
}

impl FieldAccuracyAggregator {
    /// Create an aggregator measuring the canonical fields.
    pub fn new() -> Self {
        Self {
            measured_fields: DEFAULT_MEASURED_FIELDS.iter().map(|f| f.to_string()).collect(),
        }
    }

    /// Replace the measured field list.
    pub fn with_fields<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.measured_fields = fields.into_iter().map(Into::into).collect();
        self
    }

    /// Add fields on top of the current list, skipping duplicates.
    pub fn with_extra_fields<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        for field in fields {
            let field = field.into();
            if !self.measured_fields.contains(&field) {
                self.measured_fields.push(field);
            }
        }
        self
    }

    pub fn measured_fields(&self) -> &[String] {
        &self.measured_fields
    }

    /// Compare one reference line with one candidate line.
    ///
    /// A field whose reference value is blank is not asserted and is skipped.
    /// A field missing from the candidate compares as empty.
    pub fn compare_line(&self, reference: &Record, candidate: &Record) -> LineComparison {
        let mut fields = BTreeMap::new();
        let mut total_chars = 0;
        let mut correct_chars = 0;

        for field in &self.measured_fields {
            let expected = reference.text(field);
            if expected.trim().is_empty() {
                debug!("Skipping empty reference field '{}' on line {}", field, reference.line);
                continue;
            }

            let result = compare(&expected, &candidate.text(field));
            total_chars += result.total_chars;
            correct_chars += result.correct_chars;
            fields.insert(field.clone(), result);
        }

        let measured_fields = fields.len();
        let accuracy = if total_chars > 0 {
            correct_chars as f64 / total_chars as f64
        } else {
            1.0
        };

        LineComparison {
            line: reference.line,
            fields,
            total_chars,
            correct_chars,
            measured_fields,
            accuracy,
        }
    }

    /// Score one candidate against an indexed reference over `lines`.
    ///
    /// `reference_index` must be built from `reference`.
    pub fn score_file(
        &self,
        file_id: &str,
        reference: &RecordSet,
        reference_index: &LineIndex<'_>,
        candidate: &RecordSet,
        lines: &BTreeSet<i64>,
    ) -> FileAccuracyReport {
        if record_counts_differ(reference, candidate) {
            error!(
                "Length mismatch: {} has {} lines, reference has {}",
                file_id,
                candidate.len(),
                reference.len()
            );
        }

        let candidate_index = aligner::index(candidate);
        let alignment = aligner::align(reference_index, &candidate_index, lines, file_id);

        let mut tallies: BTreeMap<String, Tally> = BTreeMap::new();
        let mut total_characters = 0;
        let mut correct_characters = 0;
        let mut total_measured_fields = 0;

        for pair in &alignment.pairs {
            let line = self.compare_line(pair.reference, pair.candidate);
            if line.measured_fields == 0 {
                warn!("No fields to measure on line {} for file {}", pair.line, file_id);
            }

            total_characters += line.total_chars;
            correct_characters += line.correct_chars;
            total_measured_fields += line.measured_fields;

            for (field, result) in line.fields {
                let tally = tallies.entry(field).or_default();
                tally.total += result.total_chars;
                tally.correct += result.correct_chars;
                tally.lines += 1;
            }
        }

        let field_accuracies = tallies
            .into_iter()
            .map(|(field, t)| {
                let accuracy = if t.total > 0 {
                    t.correct as f64 / t.total as f64
                } else {
                    0.0
                };
                (
                    field,
                    FieldAccuracy {
                        accuracy,
                        total_chars: t.total,
                        correct_chars: t.correct,
                        measured_in_lines: t.lines,
                    },
                )
            })
            .collect();

        // Nothing measurable means nothing verified, not a perfect match
        let overall_accuracy = if total_characters > 0 {
            correct_characters as f64 / total_characters as f64
        } else {
            0.0
        };

        info!(
            "File {}: {:.3} accuracy ({}/{} chars, {} fields measured)",
            file_id, overall_accuracy, correct_characters, total_characters, total_measured_fields
        );

        FileAccuracyReport {
            overall_accuracy,
            total_characters,
            correct_characters,
            processed_lines: alignment.pairs.len(),
            total_measured_fields,
            field_accuracies,
            skipped_lines: alignment.skipped,
        }
    }

    /// Score every candidate against the reference.
    pub fn aggregate(
        &self,
        reference: &RecordSet,
        candidates: &BTreeMap<String, RecordSet>,
    ) -> BTreeMap<String, FileAccuracyReport> {
        let reference_index = aligner::index(reference);
        let lines = aligner::union_lines(std::iter::once(reference).chain(candidates.values()));
        info!("Processing {} unique lines across {} files", lines.len(), candidates.len());

        candidates
            .iter()
            .map(|(file_id, candidate)| {
                let report = self.score_file(file_id, reference, &reference_index, candidate, &lines);
                (file_id.clone(), report)
            })
            .collect()
    }
}

/// Raw record counts, duplicates included.
fn record_counts_differ(reference: &RecordSet, candidate: &RecordSet) -> bool {
    reference.len() != candidate.len()
}

impl Default for FieldAccuracyAggregator {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn apple(description: &str) -> Record {
        Record::new(1)
            .with("description", description)
            .with("quantity", 2)
            .with("unit_price", 10)
            .with("total_amount", 20)
    }

    fn files(entries: Vec<(&str, RecordSet)>) -> BTreeMap<String, RecordSet> {
        entries.into_iter().map(|(k, v)| (k.to_string(), v)).collect()
    }

    #[test]
    fn test_record_counts_include_duplicate_lines() {
        let reference = RecordSet::new(vec![apple("Apple"), apple("Apple")]);
        let same_count = RecordSet::new(vec![apple("Apple"), apple("Apple")]);
        let one_record = RecordSet::new(vec![apple("Apple")]);

        assert_eq!(aligner::index(&reference).len(), 1);
        assert!(!record_counts_differ(&reference, &same_count));
        assert!(record_counts_differ(&reference, &one_record));
    }

    #[test]
    fn test_compare_line_skips_blank_reference_fields() {
        let aggregator = FieldAccuracyAggregator::new();
        let reference = apple("Apple").with("barcode", "  ");
        let candidate = apple("Apple").with("barcode", "123");

        let line = aggregator.compare_line(&reference, &candidate);
        assert_eq!(line.measured_fields, 4);
        assert!(!line.fields.contains_key("barcode"));
        assert_eq!(line.accuracy, 1.0);
    }

    #[test]
    fn test_compare_line_absent_candidate_field_is_empty() {
        let aggregator = FieldAccuracyAggregator::new();
        let reference = Record::new(1).with("item_code", "AB12");
        let candidate = Record::new(1);

        let line = aggregator.compare_line(&reference, &candidate);
        assert_eq!(line.fields["item_code"].total_chars, 4);
        assert_eq!(line.fields["item_code"].correct_chars, 0);
    }

    #[test]
    fn test_perfect_file_scores_one() {
        let reference = RecordSet::new(vec![apple("Apple")]);
        let candidates = files(vec![("a", RecordSet::new(vec![apple("Apple")]))]);

        let reports = FieldAccuracyAggregator::new().aggregate(&reference, &candidates);
        assert_eq!(reports["a"].overall_accuracy, 1.0);
        assert_eq!(reports["a"].processed_lines, 1);
        assert_eq!(reports["a"].total_measured_fields, 4);
    }

    #[test]
    fn test_all_wrong_file_scores_zero() {
        let reference = RecordSet::new(vec![Record::new(1).with("item_code", "AAAA")]);
        let candidates = files(vec![(
            "a",
            RecordSet::new(vec![Record::new(1).with("item_code", "BBBB")]),
        )]);

        let reports = FieldAccuracyAggregator::new().aggregate(&reference, &candidates);
        assert_eq!(reports["a"].overall_accuracy, 0.0);
        assert_eq!(reports["a"].total_characters, 4);
    }

    #[test]
    fn test_nothing_measurable_scores_zero_not_one() {
        // Every reference field blank: each line is a vacuous match,
        // but the file as a whole verified nothing.
        let reference = RecordSet::new(vec![Record::new(1).with("description", "")]);
        let candidates = files(vec![(
            "a",
            RecordSet::new(vec![Record::new(1).with("description", "")]),
        )]);

        let aggregator = FieldAccuracyAggregator::new();
        let line = aggregator.compare_line(&reference.records[0], &candidates["a"].records[0]);
        assert_eq!(line.accuracy, 1.0);

        let reports = aggregator.aggregate(&reference, &candidates);
        assert_eq!(reports["a"].overall_accuracy, 0.0);
        assert_eq!(reports["a"].total_characters, 0);
        assert!(reports["a"].field_accuracies.is_empty());
    }

    #[test]
    fn test_field_breakdown() {
        let reference = RecordSet::new(vec![apple("Apple")]);
        let candidates = files(vec![("b", RecordSet::new(vec![apple("Aplle")]))]);

        let reports = FieldAccuracyAggregator::new().aggregate(&reference, &candidates);
        let report = &reports["b"];

        assert_eq!(
            report.field_accuracies["description"],
            FieldAccuracy {
                accuracy: 0.8,
                total_chars: 5,
                correct_chars: 4,
                measured_in_lines: 1,
            }
        );
        assert!(report.overall_accuracy > 0.8 && report.overall_accuracy < 1.0);
    }

    #[test]
    fn test_missing_lines_are_skipped_not_zeroed() {
        let reference = RecordSet::new(vec![
            Record::new(1).with("description", "Apple"),
            Record::new(2).with("description", "Pear"),
        ]);
        let candidates = files(vec![(
            "a",
            RecordSet::new(vec![Record::new(1).with("description", "Apple")]),
        )]);

        let reports = FieldAccuracyAggregator::new().aggregate(&reference, &candidates);
        assert_eq!(reports["a"].overall_accuracy, 1.0);
        assert_eq!(reports["a"].processed_lines, 1);
        assert_eq!(reports["a"].skipped_lines.len(), 1);
    }

    #[test]
    fn test_extra_fields_are_measured() {
        let aggregator = FieldAccuracyAggregator::new().with_extra_fields(["unit"]);
        let reference = Record::new(1).with("unit", "kg");
        let candidate = Record::new(1).with("unit", "kg");

        let line = aggregator.compare_line(&reference, &candidate);
        assert_eq!(line.measured_fields, 1);
        assert_eq!(aggregator.measured_fields().len(), 9);
    }
}
