//! Severity-weighted scoring of business rule violations.

use tracing::debug;

use crate::models::config::BusinessConfig;
use crate::models::invoice::InvoiceDraft;

use super::rules::{default_rules, BusinessRule};
use super::{BusinessReport, Severity, Status, ValidationIssue};

/// Runs the rule set over an invoice and turns violations into a verdict.
pub struct BusinessRuleEngine {
    settings: BusinessConfig,
    rules: Vec<Box<dyn BusinessRule>>,
}

impl BusinessRuleEngine {
    /// Create an engine with the standard rules and default settings.
    pub fn new() -> Self {
        Self::with_settings(BusinessConfig::default())
    }

    /// Create an engine with the standard rules and custom settings.
    pub fn with_settings(settings: BusinessConfig) -> Self {
        Self {
            settings,
            rules: default_rules(),
        }
    }

    /// Append an extra rule after the standard ones.
    pub fn with_rule(mut self, rule: Box<dyn BusinessRule>) -> Self {
        self.rules.push(rule);
        self
    }

    pub fn settings(&self) -> &BusinessConfig {
        &self.settings
    }

    /// Validate an invoice. Every rule runs; no violation hides another.
    pub fn validate(&self, invoice: &InvoiceDraft) -> BusinessReport {
        let mut issues = Vec::new();
        for rule in &self.rules {
            let found = rule.check(invoice, &self.settings);
            debug!("Rule {} reported {} issues", rule.name(), found.len());
            issues.extend(found);
        }

        let score = self.score(&issues);
        let status = self.status(score, &issues);

        BusinessReport {
            issues,
            score,
            status,
        }
    }

    /// `max(0, 100 - sum of severity weights)`.
    pub fn score(&self, issues: &[ValidationIssue]) -> u32 {
        let weights = &self.settings.weights;
        let penalty = issues
            .iter()
            .map(|issue| match issue.severity {
                Severity::Error => weights.error,
                Severity::Warn => weights.warn,
                Severity::Info => weights.info,
            })
            .fold(0u32, u32::saturating_add);
        100u32.saturating_sub(penalty)
    }

    /// PASS needs a high score and no errors; REVIEW only a middling score.
    pub fn status(&self, score: u32, issues: &[ValidationIssue]) -> Status {
        let has_error = issues.iter().any(|i| i.severity == Severity::Error);
        if score >= self.settings.pass_threshold && !has_error {
            Status::Pass
        } else if score >= self.settings.review_threshold {
            Status::Review
        } else {
            Status::Fail
        }
    }
}

impl Default for BusinessRuleEngine {
    fn default() -> Self {
        Self::new()
    }
}
