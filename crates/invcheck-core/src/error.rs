//! Error types for the invcheck-core library.

use thiserror::Error;

/// Main error type for the invcheck library.
#[derive(Error, Debug)]
pub enum InvcheckError {
    /// Malformed or missing candidate/reference data.
    #[error("input error: {0}")]
    Input(#[from] InputError),

    /// Record collection could not be turned into an invoice.
    #[error("conversion error: {0}")]
    Conversion(#[from] ConversionError),

    /// Orchestrator rejected a state transition.
    #[error("run error: {0}")]
    Run(#[from] RunError),

    /// Report export failed.
    #[error("export error: {0}")]
    Export(#[from] ExportError),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),
}

/// Errors in the extracted or reference data handed to the engine.
#[derive(Error, Debug)]
pub enum InputError {
    /// The document is not valid JSON.
    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    /// The document has no recognizable record collection.
    #[error("unsupported document shape: {0}")]
    Document(String),

    /// An item in the record collection is not an object.
    #[error("record {index} is not an object")]
    InvalidRecord { index: usize },

    /// The `line` key is present but not an integer.
    #[error("record {index} has a non-integer line number: {value}")]
    InvalidLine { index: usize, value: String },

    /// A candidate file carries no records at all.
    #[error("no records found in {0}")]
    NoRecords(String),

    /// The reference record set is empty.
    #[error("reference data contains no records")]
    EmptyReference,

    /// No candidate files were supplied.
    #[error("at least one candidate file is required")]
    NoCandidates,

    /// More candidate files than a run accepts.
    #[error("too many candidate files: {count} (maximum {max})")]
    TooManyFiles { count: usize, max: usize },

    /// Two candidates share the same file id.
    #[error("duplicate candidate file id: {0}")]
    DuplicateFile(String),
}

/// Errors converting a record collection into an invoice draft.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConversionError {
    /// A record has a blank description and was dropped.
    #[error("line {line}: missing description")]
    MissingDescription { line: i64 },

    /// A computed line total is outside the decimal range; the line was dropped.
    #[error("line {line}: computed total is out of range")]
    AmountOverflow { line: i64 },

    /// Summing the kept lines left the decimal range.
    #[error("invoice totals are out of range")]
    SummaryOverflow,

    /// Every record was dropped.
    #[error("no usable invoice lines ({dropped} dropped)")]
    NoUsableLines { dropped: usize },
}

/// Rejected orchestrator transitions. Caller errors, never crashes.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RunError {
    /// `run` was called before any files were loaded.
    #[error("no candidate files loaded")]
    NotLoaded,

    /// The method needs reference data and none was loaded.
    #[error("{method} validation requires reference data")]
    MissingReference { method: String },

    /// The observer asked to abandon the run.
    #[error("run cancelled after {completed} of {total} files")]
    Cancelled { completed: usize, total: usize },
}

/// Errors writing or reading exported reports.
#[derive(Error, Debug)]
pub enum ExportError {
    /// JSON serialization failed.
    #[error("JSON export failed: {0}")]
    Json(#[from] serde_json::Error),

    /// CSV serialization failed.
    #[error("CSV export failed: {0}")]
    Csv(#[from] csv::Error),

    /// Writing the export file failed.
    #[error("failed to write export: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for the invcheck library.
pub type Result<T> = std::result::Result<T, InvcheckError>;
