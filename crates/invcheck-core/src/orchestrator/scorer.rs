//! Per-file scoring strategies, one per validation method.

use std::collections::BTreeSet;

use tracing::{info, warn};

use crate::accuracy::{aligner, FieldAccuracyAggregator, LineIndex};
use crate::business::{BusinessRuleEngine, InvoiceAdapter};
use crate::models::record::RecordSet;

use super::result::{BusinessOutcome, BusinessValidation, CombinedReport};

/// One validation method applied to one candidate file.
///
/// A scorer fills in its own side of the report and never touches the other,
/// so scorers compose and a failure in one leaves the other intact.
pub trait FileScorer: Send + Sync {
    /// Short method name for logs.
    fn name(&self) -> &'static str;

    /// Score `records` and record the outcome on `report`.
    fn score(&self, records: &RecordSet, report: &mut CombinedReport);
}

/// Character accuracy against a shared, pre-indexed reference.
pub struct CharacterScorer<'a> {
    aggregator: FieldAccuracyAggregator,
    reference: &'a RecordSet,
    reference_index: LineIndex<'a>,
    lines: BTreeSet<i64>,
}

impl<'a> CharacterScorer<'a> {
    /// `lines` is the union of line numbers across the reference and every candidate.
    pub fn new(aggregator: FieldAccuracyAggregator, reference: &'a RecordSet, lines: BTreeSet<i64>) -> Self {
        Self {
            aggregator,
            reference,
            reference_index: aligner::index(reference),
            lines,
        }
    }
}

impl FileScorer for CharacterScorer<'_> {
    fn name(&self) -> &'static str {
        "character_level"
    }

    fn score(&self, records: &RecordSet, report: &mut CombinedReport) {
        let accuracy = self.aggregator.score_file(
            &report.file_id,
            self.reference,
            &self.reference_index,
            records,
            &self.lines,
        );
        report.character = Some(accuracy);
    }
}

/// Invoice conversion followed by the business rule engine.
pub struct BusinessScorer {
    adapter: InvoiceAdapter,
    engine: BusinessRuleEngine,
}

impl BusinessScorer {
    pub fn new(engine: BusinessRuleEngine) -> Self {
        let adapter = InvoiceAdapter::new().with_default_vat(engine.settings().default_vat_pct);
        Self { adapter, engine }
    }
}

impl FileScorer for BusinessScorer {
    fn name(&self) -> &'static str {
        "business_logic"
    }

    fn score(&self, records: &RecordSet, report: &mut CombinedReport) {
        let outcome = match self.adapter.to_invoice_draft(records) {
            Ok(conversion) => {
                let business = self.engine.validate(&conversion.invoice);
                info!(
                    "File {}: business score {} ({}), {} issues",
                    report.file_id,
                    business.score,
                    business.status,
                    business.issues.len()
                );
                BusinessOutcome::Validated(BusinessValidation {
                    report: business,
                    lines_validated: conversion.invoice.lines.len(),
                    dropped_lines: conversion.dropped_lines,
                    warnings: conversion.warnings,
                })
            }
            Err(e) => {
                warn!("Business validation skipped for {}: {}", report.file_id, e);
                BusinessOutcome::Failed { error: e.to_string() }
            }
        };
        report.business = Some(outcome);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::business::Status;
    use crate::models::record::Record;

    #[test]
    fn test_business_scorer_records_failure() {
        let scorer = BusinessScorer::new(BusinessRuleEngine::new());
        let mut report = CombinedReport::new("empty");
        scorer.score(&RecordSet::new(vec![Record::new(1)]), &mut report);

        assert_eq!(report.business_error(), Some("no usable invoice lines (1 dropped)"));
        assert!(report.character.is_none());
    }

    #[test]
    fn test_business_scorer_validates() {
        let scorer = BusinessScorer::new(BusinessRuleEngine::new());
        let mut report = CombinedReport::new("a");
        let records = RecordSet::new(vec![Record::new(1)
            .with("description", "Apple")
            .with("quantity", 2)
            .with("unit_price", 10)
            .with("total_amount", 20)]);
        scorer.score(&records, &mut report);

        assert_eq!(report.business_score(), Some(100));
        assert_eq!(report.business_status(), Some(Status::Pass));
        assert_eq!(report.business_validation().unwrap().lines_validated, 1);
    }

    #[test]
    fn test_character_scorer_fills_only_its_side() {
        let reference = RecordSet::new(vec![Record::new(1).with("description", "Apple")]);
        let lines = aligner::union_lines([&reference]);
        let scorer = CharacterScorer::new(FieldAccuracyAggregator::new(), &reference, lines);

        let mut report = CombinedReport::new("a");
        scorer.score(&reference.clone(), &mut report);

        assert_eq!(report.character_accuracy(), Some(1.0));
        assert!(report.business.is_none());
    }
}
