//! Per-file and per-run results produced by the orchestrator.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::accuracy::FileAccuracyReport;
use crate::business::{BusinessReport, Status};
use crate::report::FieldTable;

use super::ValidationMethod;

/// Business side of a file's result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum BusinessOutcome {
    /// The file converted and the rules ran.
    Validated(BusinessValidation),
    /// Conversion produced no usable line.
    Failed { error: String },
}

/// A completed business validation of one file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BusinessValidation {
    pub report: BusinessReport,
    pub lines_validated: usize,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub dropped_lines: Vec<i64>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
}

/// Everything a run learned about one candidate file.
///
/// Every loaded file gets one, even when its input was unusable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CombinedReport {
    pub file_id: String,

    /// Input problem that kept the file from being evaluated at all.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub character: Option<FileAccuracyReport>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub business: Option<BusinessOutcome>,

    /// Weighted blend, present only when both sides scored.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub combined_score: Option<f64>,
}

impl CombinedReport {
    pub fn new(file_id: impl Into<String>) -> Self {
        Self {
            file_id: file_id.into(),
            error: None,
            character: None,
            business: None,
            combined_score: None,
        }
    }

    /// A file whose input could not be read.
    pub fn input_failure(file_id: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            error: Some(error.into()),
            ..Self::new(file_id)
        }
    }

    pub fn character_accuracy(&self) -> Option<f64> {
        self.character.as_ref().map(|r| r.overall_accuracy)
    }

    pub fn business_validation(&self) -> Option<&BusinessValidation> {
        match &self.business {
            Some(BusinessOutcome::Validated(v)) => Some(v),
            _ => None,
        }
    }

    pub fn business_error(&self) -> Option<&str> {
        match &self.business {
            Some(BusinessOutcome::Failed { error }) => Some(error),
            _ => None,
        }
    }

    pub fn business_score(&self) -> Option<u32> {
        self.business_validation().map(|v| v.report.score)
    }

    pub fn business_status(&self) -> Option<Status> {
        self.business_validation().map(|v| v.report.status)
    }

    /// True when nothing was scored for this file.
    pub fn is_failed(&self) -> bool {
        self.error.is_some() || (self.character.is_none() && self.business_validation().is_none())
    }

    /// Blend character accuracy and business score when both exist.
    pub fn compute_combined(&mut self, character_weight: f64, business_weight: f64) {
        self.combined_score = match (self.character_accuracy(), self.business_score()) {
            (Some(accuracy), Some(score)) => {
                Some(character_weight * accuracy + business_weight * (score as f64 / 100.0))
            }
            _ => None,
        };
    }
}

/// Aggregate figures over the business side of a run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BusinessStatistics {
    pub total_files: usize,
    pub successful_validations: usize,
    pub failed_validations: usize,
    /// Mean score of the successful validations; 0 when there are none.
    pub average_score: f64,
}

impl BusinessStatistics {
    pub fn from_files<'a>(files: impl IntoIterator<Item = &'a CombinedReport>) -> Self {
        let mut total_files = 0;
        let mut scores = Vec::new();
        for file in files {
            total_files += 1;
            if let Some(score) = file.business_score() {
                scores.push(score);
            }
        }

        let average_score = if scores.is_empty() {
            0.0
        } else {
            scores.iter().map(|&s| s as f64).sum::<f64>() / scores.len() as f64
        };

        Self {
            total_files,
            successful_validations: scores.len(),
            failed_validations: total_files - scores.len(),
            average_score,
        }
    }
}

/// Run-wide averages when both methods ran.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OverallSummary {
    /// Mean over every file; a file without a character report counts 0.
    pub average_character_accuracy: f64,
    /// Mean business score of successful validations, normalized to 0 - 1.
    pub average_business_score: f64,
    pub files_analyzed: usize,
}

impl OverallSummary {
    pub fn from_files(files: &BTreeMap<String, CombinedReport>, statistics: &BusinessStatistics) -> Self {
        let files_analyzed = files.len();
        let average_character_accuracy = if files_analyzed == 0 {
            0.0
        } else {
            files
                .values()
                .map(|f| f.character_accuracy().unwrap_or(0.0))
                .sum::<f64>()
                / files_analyzed as f64
        };

        Self {
            average_character_accuracy,
            average_business_score: statistics.average_score / 100.0,
            files_analyzed,
        }
    }
}

/// One file's place in the comparison ranking.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankedFile {
    pub file_id: String,
    /// Method-appropriate accuracy in 0 - 1; absent when the file failed.
    pub accuracy: Option<f64>,
    /// 1-based.
    pub rank: usize,
}

/// Rank files by descending accuracy. Ties keep file order; failed files come last.
pub fn rank_files(files: &BTreeMap<String, CombinedReport>, method: ValidationMethod) -> Vec<RankedFile> {
    let mut entries: Vec<(&String, Option<f64>)> = files
        .iter()
        .map(|(file_id, report)| {
            let accuracy = match method {
                ValidationMethod::Character => report.character_accuracy(),
                ValidationMethod::Business => report.business_score().map(|s| s as f64 / 100.0),
                ValidationMethod::Both => report.combined_score,
            };
            (file_id, accuracy)
        })
        .collect();

    entries.sort_by(|(_, a), (_, b)| match (a, b) {
        (Some(a), Some(b)) => b.total_cmp(a),
        (Some(_), None) => std::cmp::Ordering::Less,
        (None, Some(_)) => std::cmp::Ordering::Greater,
        (None, None) => std::cmp::Ordering::Equal,
    });

    entries
        .into_iter()
        .enumerate()
        .map(|(i, (file_id, accuracy))| RankedFile {
            file_id: file_id.clone(),
            accuracy,
            rank: i + 1,
        })
        .collect()
}

/// The complete, immutable outcome of one orchestrator run.
///
/// Carries no timestamps: running twice on the same inputs yields an
/// identical value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationRun {
    pub method_used: ValidationMethod,
    pub files_processed: usize,

    /// Reference record count, when reference data was loaded.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reference_lines: Option<usize>,

    /// Per-file results in file-id order.
    pub files: BTreeMap<String, CombinedReport>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub business_statistics: Option<BusinessStatistics>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub overall_summary: Option<OverallSummary>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub field_table: Option<FieldTable>,

    pub ranking: Vec<RankedFile>,

    /// Human-readable report for the method used.
    pub detailed_report: String,
}

impl ValidationRun {
    /// True when every file failed every method it ran.
    pub fn all_failed(&self) -> bool {
        !self.files.is_empty() && self.files.values().all(CombinedReport::is_failed)
    }

    pub fn file(&self, file_id: &str) -> Option<&CombinedReport> {
        self.files.get(file_id)
    }
}
