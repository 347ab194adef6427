//! Core library for validating invoice extraction results.
//!
//! This crate provides:
//! - Character-level accuracy of extracted line items against reference data
//! - Business arithmetic validation (line totals, subtotal, VAT, discounts)
//! - An orchestrator running one or both methods over a batch of files
//! - Text reports and JSON/CSV export of finished runs

pub mod accuracy;
pub mod business;
pub mod error;
pub mod loader;
pub mod models;
pub mod numeric;
pub mod orchestrator;
pub mod report;

pub use accuracy::{compare, FieldAccuracyAggregator, FieldComparison, FileAccuracyReport};
pub use business::{
    BusinessReport, BusinessRuleEngine, InvoiceAdapter, Severity, Status, ValidationIssue,
};
pub use error::{ConversionError, ExportError, InputError, InvcheckError, Result, RunError};
pub use loader::{file_id, file_ids, load_record_set, parse_record_set, ReferenceTemplate};
pub use models::config::ValidationConfig;
pub use models::invoice::{InvoiceDraft, InvoiceFinal, InvoiceIntro, LineItem};
pub use models::record::{FieldValue, Fields, Record, RecordSet};
pub use orchestrator::{
    CombinedReport, RunObserver, RunState, ValidationMethod, ValidationOrchestrator, ValidationRun,
};
pub use report::{ExportDocument, ReportExporter};
