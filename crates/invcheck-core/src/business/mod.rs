//! Deterministic business-arithmetic validation of converted invoices.

mod adapter;
mod engine;
pub mod rules;

pub use adapter::{ConversionOutcome, InvoiceAdapter};
pub use engine::BusinessRuleEngine;

use std::fmt;

use serde::{Deserialize, Serialize};

/// Severity of a rule violation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Severity {
    Error,
    Warn,
    Info,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Error => "ERROR",
            Severity::Warn => "WARN",
            Severity::Info => "INFO",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One rule violation found in an invoice.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationIssue {
    /// Stable identifier such as `E-LINE-TOTAL-MISMATCH`.
    pub code: String,
    pub severity: Severity,
    /// Locator into the invoice, e.g. `lines[0].line_total`.
    pub path: String,
    pub found: String,
    pub expected: String,
    pub message: String,
}

impl ValidationIssue {
    pub fn new(
        severity: Severity,
        code: &str,
        path: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            code: code.to_string(),
            severity,
            path: path.into(),
            found: String::new(),
            expected: String::new(),
            message: message.into(),
        }
    }

    /// Attach the found and expected values.
    pub fn with_values(mut self, found: impl ToString, expected: impl ToString) -> Self {
        self.found = found.to_string();
        self.expected = expected.to_string();
        self
    }
}

/// Overall verdict of a business validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Status {
    Pass,
    Review,
    Fail,
}

impl Status {
    pub fn as_str(&self) -> &'static str {
        match self {
            Status::Pass => "PASS",
            Status::Review => "REVIEW",
            Status::Fail => "FAIL",
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of validating one invoice.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BusinessReport {
    pub issues: Vec<ValidationIssue>,
    /// 0 - 100.
    pub score: u32,
    pub status: Status,
}

impl BusinessReport {
    pub fn count(&self, severity: Severity) -> usize {
        self.issues.iter().filter(|i| i.severity == severity).count()
    }

    pub fn has_errors(&self) -> bool {
        self.count(Severity::Error) > 0
    }
}
