//! Persisted forms of a finished run.
//!
//! The full JSON document wraps the run with a timestamp and export
//! metadata. The tabular forms flatten it to one row per issue or per file.

use std::collections::BTreeMap;
use std::io::Write;
use std::path::Path;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::ExportError;
use crate::orchestrator::{
    BusinessStatistics, CombinedReport, OverallSummary, RankedFile, ValidationMethod, ValidationRun,
};

use super::FieldTable;

/// Column order of the issues table.
pub const ISSUE_COLUMNS: [&str; 7] = ["file", "code", "severity", "path", "found", "expected", "message"];

/// Column order of the per-file summary table.
pub const SUMMARY_COLUMNS: [&str; 6] = [
    "file",
    "character_accuracy",
    "business_score",
    "business_status",
    "combined_score",
    "rank",
];

/// Metadata describing the export itself.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExportMetadata {
    pub exported_at: String,
    pub files_exported: usize,
    pub reference_required: bool,
}

/// Full-fidelity export of a run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExportDocument {
    pub method_used: ValidationMethod,
    pub timestamp: String,
    pub files_processed: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reference_lines: Option<usize>,
    pub results: BTreeMap<String, CombinedReport>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub business_statistics: Option<BusinessStatistics>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub overall_summary: Option<OverallSummary>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub field_table: Option<FieldTable>,
    pub ranking: Vec<RankedFile>,
    pub detailed_report: String,
    pub export_metadata: ExportMetadata,
}

impl ExportDocument {
    /// Wrap a run, stamping it with the current time.
    pub fn new(run: &ValidationRun) -> Self {
        let now = Utc::now().to_rfc3339();
        Self {
            method_used: run.method_used,
            timestamp: now.clone(),
            files_processed: run.files_processed,
            reference_lines: run.reference_lines,
            results: run.files.clone(),
            business_statistics: run.business_statistics.clone(),
            overall_summary: run.overall_summary.clone(),
            field_table: run.field_table.clone(),
            ranking: run.ranking.clone(),
            detailed_report: run.detailed_report.clone(),
            export_metadata: ExportMetadata {
                exported_at: now,
                files_exported: run.files.len(),
                reference_required: run.method_used.requires_reference(),
            },
        }
    }

    /// The run this document was made from, without the wrapping metadata.
    pub fn into_run(self) -> ValidationRun {
        ValidationRun {
            method_used: self.method_used,
            files_processed: self.files_processed,
            reference_lines: self.reference_lines,
            files: self.results,
            business_statistics: self.business_statistics,
            overall_summary: self.overall_summary,
            field_table: self.field_table,
            ranking: self.ranking,
            detailed_report: self.detailed_report,
        }
    }
}

/// One issue, flattened for tabular export.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IssueRow {
    pub file: String,
    pub code: String,
    pub severity: String,
    pub path: String,
    pub found: String,
    pub expected: String,
    pub message: String,
}

impl IssueRow {
    fn record(&self) -> [&str; 7] {
        [
            &self.file,
            &self.code,
            &self.severity,
            &self.path,
            &self.found,
            &self.expected,
            &self.message,
        ]
    }
}

/// One file's headline figures, flattened for tabular export.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SummaryRow {
    pub file: String,
    pub character_accuracy: Option<f64>,
    pub business_score: Option<u32>,
    pub business_status: Option<String>,
    pub combined_score: Option<f64>,
    pub rank: usize,
}

/// Every issue of every file, in file order then rule order.
pub fn issue_rows(run: &ValidationRun) -> Vec<IssueRow> {
    run.files
        .iter()
        .filter_map(|(file_id, file)| file.business_validation().map(|v| (file_id, v)))
        .flat_map(|(file_id, v)| {
            v.report.issues.iter().map(move |issue| IssueRow {
                file: file_id.clone(),
                code: issue.code.clone(),
                severity: issue.severity.to_string(),
                path: issue.path.clone(),
                found: issue.found.clone(),
                expected: issue.expected.clone(),
                message: issue.message.clone(),
            })
        })
        .collect()
}

/// One row per file, in ranking order.
pub fn summary_rows(run: &ValidationRun) -> Vec<SummaryRow> {
    run.ranking
        .iter()
        .filter_map(|entry| {
            let file = run.files.get(&entry.file_id)?;
            Some(SummaryRow {
                file: entry.file_id.clone(),
                character_accuracy: file.character_accuracy(),
                business_score: file.business_score(),
                business_status: file.business_status().map(|s| s.to_string()),
                combined_score: file.combined_score,
                rank: entry.rank,
            })
        })
        .collect()
}

/// Writes runs to disk in the supported formats.
pub struct ReportExporter;

impl ReportExporter {
    /// Write the full JSON document.
    pub fn write_json(run: &ValidationRun, path: &Path) -> Result<ExportDocument, ExportError> {
        let document = ExportDocument::new(run);
        let content = serde_json::to_string_pretty(&document)?;
        std::fs::write(path, content)?;
        info!("Results exported to {}", path.display());
        Ok(document)
    }

    /// Read a full JSON document back.
    pub fn read_json(path: &Path) -> Result<ExportDocument, ExportError> {
        let content = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }

    /// Write the issues table as CSV. The header is written even with no issues.
    pub fn write_issues_csv<W: Write>(run: &ValidationRun, writer: W) -> Result<usize, ExportError> {
        let mut wtr = csv::Writer::from_writer(writer);
        wtr.write_record(ISSUE_COLUMNS)?;

        let rows = issue_rows(run);
        for row in &rows {
            wtr.write_record(row.record())?;
        }
        wtr.flush()?;
        Ok(rows.len())
    }

    pub fn write_issues_csv_file(run: &ValidationRun, path: &Path) -> Result<usize, ExportError> {
        let file = std::fs::File::create(path)?;
        let count = Self::write_issues_csv(run, file)?;
        info!("{} issues exported to {}", count, path.display());
        Ok(count)
    }

    /// Write the issues as a JSON array.
    pub fn write_issues_json(run: &ValidationRun, path: &Path) -> Result<usize, ExportError> {
        let rows = issue_rows(run);
        std::fs::write(path, serde_json::to_string_pretty(&rows)?)?;
        Ok(rows.len())
    }

    /// Write the per-file summary table as CSV.
    pub fn write_summary_csv<W: Write>(run: &ValidationRun, writer: W) -> Result<(), ExportError> {
        let mut wtr = csv::Writer::from_writer(writer);
        wtr.write_record(SUMMARY_COLUMNS)?;

        for row in summary_rows(run) {
            wtr.write_record([
                row.file,
                row.character_accuracy.map(|v| v.to_string()).unwrap_or_default(),
                row.business_score.map(|v| v.to_string()).unwrap_or_default(),
                row.business_status.unwrap_or_default(),
                row.combined_score.map(|v| v.to_string()).unwrap_or_default(),
                row.rank.to_string(),
            ])?;
        }
        wtr.flush()?;
        Ok(())
    }

    /// Read issue rows back from CSV.
    pub fn read_issues_csv<R: std::io::Read>(reader: R) -> Result<Vec<IssueRow>, ExportError> {
        let mut rdr = csv::Reader::from_reader(reader);
        let rows = rdr.deserialize().collect::<Result<Vec<IssueRow>, csv::Error>>()?;
        Ok(rows)
    }

    /// Read summary rows back from CSV.
    pub fn read_summary_csv<R: std::io::Read>(reader: R) -> Result<Vec<SummaryRow>, ExportError> {
        let mut rdr = csv::Reader::from_reader(reader);
        let rows = rdr.deserialize().collect::<Result<Vec<SummaryRow>, csv::Error>>()?;
        Ok(rows)
    }
}
