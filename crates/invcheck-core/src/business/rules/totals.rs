//! Arithmetic consistency of line totals, subtotal and grand total.

use crate::business::{Severity, ValidationIssue};
use crate::models::config::BusinessConfig;
use crate::models::invoice::InvoiceDraft;

use crate::numeric::checked_sum;

use super::{approx_equal, codes, money_or_overflow, BusinessRule};

/// Each line total must equal `qty * unit_price * (1 - discount_pct / 100)`.
pub struct LineTotalRule;

impl BusinessRule for LineTotalRule {
    fn name(&self) -> &'static str {
        "line-total"
    }

    fn check(&self, invoice: &InvoiceDraft, settings: &BusinessConfig) -> Vec<ValidationIssue> {
        invoice
            .lines
            .iter()
            .enumerate()
            .filter_map(|(i, line)| {
                let expected = line.expected_total();
                if expected.is_some_and(|e| approx_equal(line.line_total, e, settings.tolerance)) {
                    return None;
                }
                Some(
                    ValidationIssue::new(
                        Severity::Error,
                        codes::LINE_TOTAL_MISMATCH,
                        format!("lines[{}].line_total", i),
                        "Line total does not match qty x price x (1 - discount).",
                    )
                    .with_values(line.line_total, money_or_overflow(expected)),
                )
            })
            .collect()
    }
}

/// The summary subtotal must equal the sum of line totals.
pub struct SubtotalRule;

impl BusinessRule for SubtotalRule {
    fn name(&self) -> &'static str {
        "subtotal"
    }

    fn check(&self, invoice: &InvoiceDraft, settings: &BusinessConfig) -> Vec<ValidationIssue> {
        let Some(summary) = &invoice.final_summary else {
            return Vec::new();
        };

        let sum_lines = checked_sum(invoice.lines.iter().map(|l| l.line_total));
        if sum_lines.is_some_and(|s| approx_equal(summary.subtotal, s, settings.tolerance)) {
            return Vec::new();
        }

        vec![
            ValidationIssue::new(
                Severity::Error,
                codes::SUBTOTAL_MISMATCH,
                "final.subtotal",
                "Subtotal differs from sum of line totals.",
            )
            .with_values(summary.subtotal, money_or_overflow(sum_lines)),
        ]
    }
}

/// The summary total must equal subtotal plus VAT amount.
pub struct TotalRule;

impl BusinessRule for TotalRule {
    fn name(&self) -> &'static str {
        "total"
    }

    fn check(&self, invoice: &InvoiceDraft, settings: &BusinessConfig) -> Vec<ValidationIssue> {
        let Some(summary) = &invoice.final_summary else {
            return Vec::new();
        };

        let expected = summary.subtotal.checked_add(summary.vat_amount);
        if expected.is_some_and(|e| approx_equal(summary.total, e, settings.tolerance)) {
            return Vec::new();
        }

        vec![
            ValidationIssue::new(
                Severity::Error,
                codes::TOTAL_MISMATCH,
                "final.total",
                "Total differs from subtotal + VAT amount.",
            )
            .with_values(summary.total, money_or_overflow(expected)),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::invoice::{InvoiceFinal, LineItem};
    use rust_decimal::Decimal;
    use std::str::FromStr;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    fn item(qty: &str, price: &str, discount: &str, total: &str) -> LineItem {
        LineItem {
            line_no: 1,
            barcode: None,
            item_code: None,
            description: "Item".to_string(),
            qty: dec(qty),
            unit_price: dec(price),
            discount_pct: dec(discount),
            price_after_discount: None,
            vat_pct: dec("17"),
            line_total: dec(total),
        }
    }

    fn invoice(lines: Vec<LineItem>, summary: Option<(&str, &str, &str)>) -> InvoiceDraft {
        InvoiceDraft {
            intro: None,
            lines,
            final_summary: summary.map(|(s, v, t)| InvoiceFinal {
                subtotal: dec(s),
                vat_amount: dec(v),
                total: dec(t),
            }),
        }
    }

    #[test]
    fn test_line_total_within_tolerance() {
        let inv = invoice(vec![item("3", "3.33", "0", "10.00")], None);
        assert!(LineTotalRule.check(&inv, &BusinessConfig::default()).is_empty());
    }

    #[test]
    fn test_line_total_mismatch() {
        let inv = invoice(
            vec![item("2", "10", "0", "20"), item("2", "100", "10", "200")],
            None,
        );
        let issues = LineTotalRule.check(&inv, &BusinessConfig::default());

        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].code, codes::LINE_TOTAL_MISMATCH);
        assert_eq!(issues[0].path, "lines[1].line_total");
        assert_eq!(issues[0].found, "200");
        assert_eq!(issues[0].expected, "180.00");
    }

    #[test]
    fn test_summary_rules_skip_without_summary() {
        let inv = invoice(vec![item("1", "1", "0", "1")], None);
        let settings = BusinessConfig::default();
        assert!(SubtotalRule.check(&inv, &settings).is_empty());
        assert!(TotalRule.check(&inv, &settings).is_empty());
    }

    #[test]
    fn test_subtotal_mismatch() {
        let inv = invoice(
            vec![item("1", "10", "0", "10"), item("1", "5", "0", "5")],
            Some(("16", "0", "16")),
        );
        let issues = SubtotalRule.check(&inv, &BusinessConfig::default());
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].path, "final.subtotal");
        assert_eq!(issues[0].expected, "15.00");
    }

    #[test]
    fn test_total_mismatch() {
        let inv = invoice(vec![item("1", "100", "0", "100")], Some(("100", "17", "118")));
        let issues = TotalRule.check(&inv, &BusinessConfig::default());
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].code, codes::TOTAL_MISMATCH);
        assert_eq!(issues[0].found, "118");
        assert_eq!(issues[0].expected, "117.00");
    }

    #[test]
    fn test_overflowing_amounts_are_reported_not_computed() {
        let huge = "70000000000000000000000000000";
        let inv = invoice(
            vec![
                item("729000000000001", "729000000000001", "0", "1"),
                item("1", huge, "0", huge),
                item("1", huge, "0", huge),
            ],
            Some(("0", huge, huge)),
        );
        let settings = BusinessConfig::default();

        let line_issues = LineTotalRule.check(&inv, &settings);
        assert_eq!(line_issues.len(), 1);
        assert_eq!(line_issues[0].expected, "overflow");

        let subtotal = SubtotalRule.check(&inv, &settings);
        assert_eq!(subtotal[0].expected, "overflow");

        assert!(TotalRule.check(&inv, &settings).is_empty());
    }
}
