//! Rendering and export of finished validation runs.

pub mod export;
pub mod table;
pub mod text;

pub use export::{ExportDocument, ExportMetadata, IssueRow, ReportExporter, SummaryRow};
pub use table::{FieldCell, FieldRow, FieldTable};
