//! Range checks on VAT and discount percentages.

use crate::business::{Severity, ValidationIssue};
use crate::models::config::BusinessConfig;
use crate::models::invoice::InvoiceDraft;

use super::{codes, in_percent_range, BusinessRule};

/// VAT must lie in 0 - 100; a rate other than the default is unusual.
pub struct VatRateRule;

impl BusinessRule for VatRateRule {
    fn name(&self) -> &'static str {
        "vat-rate"
    }

    fn check(&self, invoice: &InvoiceDraft, settings: &BusinessConfig) -> Vec<ValidationIssue> {
        let mut issues = Vec::new();

        for (i, line) in invoice.lines.iter().enumerate() {
            let path = format!("lines[{}].vat_pct", i);
            if !in_percent_range(line.vat_pct) {
                issues.push(
                    ValidationIssue::new(
                        Severity::Error,
                        codes::VAT_RATE,
                        path,
                        "VAT percent out of range.",
                    )
                    .with_values(line.vat_pct, "0-100"),
                );
            } else if line.vat_pct != settings.default_vat_pct {
                issues.push(
                    ValidationIssue::new(
                        Severity::Warn,
                        codes::VAT_UNUSUAL,
                        path,
                        "VAT percent differs from default.",
                    )
                    .with_values(line.vat_pct, settings.default_vat_pct),
                );
            }
        }

        issues
    }
}

/// Discount must lie in 0 - 100; very high discounts are flagged.
pub struct DiscountRule;

impl BusinessRule for DiscountRule {
    fn name(&self) -> &'static str {
        "discount"
    }

    fn check(&self, invoice: &InvoiceDraft, settings: &BusinessConfig) -> Vec<ValidationIssue> {
        let mut issues = Vec::new();

        for (i, line) in invoice.lines.iter().enumerate() {
            let path = format!("lines[{}].discount_pct", i);
            if !in_percent_range(line.discount_pct) {
                issues.push(
                    ValidationIssue::new(
                        Severity::Error,
                        codes::DISCOUNT_RANGE,
                        path,
                        "Discount percent out of range.",
                    )
                    .with_values(line.discount_pct, "0-100"),
                );
            } else if line.discount_pct > settings.high_discount_pct {
                issues.push(
                    ValidationIssue::new(
                        Severity::Warn,
                        codes::DISCOUNT_HIGH,
                        path,
                        "Unusually high discount.",
                    )
                    .with_values(line.discount_pct, format!("<= {}", settings.high_discount_pct)),
                );
            }
        }

        issues
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::invoice::LineItem;
    use rust_decimal::Decimal;

    fn invoice(vat: i64, discount: i64) -> InvoiceDraft {
        InvoiceDraft {
            intro: None,
            lines: vec![LineItem {
                line_no: 1,
                barcode: None,
                item_code: None,
                description: "Item".to_string(),
                qty: Decimal::ONE,
                unit_price: Decimal::ONE_HUNDRED,
                discount_pct: Decimal::from(discount),
                price_after_discount: None,
                vat_pct: Decimal::from(vat),
                line_total: Decimal::ONE_HUNDRED,
            }],
            final_summary: None,
        }
    }

    #[test]
    fn test_default_vat_is_clean() {
        assert!(VatRateRule.check(&invoice(17, 0), &BusinessConfig::default()).is_empty());
    }

    #[test]
    fn test_unusual_vat_warns() {
        let issues = VatRateRule.check(&invoice(18, 0), &BusinessConfig::default());
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].code, codes::VAT_UNUSUAL);
        assert_eq!(issues[0].severity, Severity::Warn);
        assert_eq!(issues[0].expected, "17");
    }

    #[test]
    fn test_vat_out_of_range_is_error_only() {
        let issues = VatRateRule.check(&invoice(120, 0), &BusinessConfig::default());
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].code, codes::VAT_RATE);
        assert_eq!(issues[0].severity, Severity::Error);
    }

    #[test]
    fn test_high_discount_warns() {
        let issues = DiscountRule.check(&invoice(17, 95), &BusinessConfig::default());
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].code, codes::DISCOUNT_HIGH);
        assert_eq!(issues[0].path, "lines[0].discount_pct");
    }

    #[test]
    fn test_discount_at_threshold_is_clean() {
        assert!(DiscountRule.check(&invoice(17, 90), &BusinessConfig::default()).is_empty());
    }

    #[test]
    fn test_negative_discount_is_error() {
        let issues = DiscountRule.check(&invoice(17, -5), &BusinessConfig::default());
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].code, codes::DISCOUNT_RANGE);
        assert_eq!(issues[0].found, "-5");
    }
}
