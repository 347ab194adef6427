//! Business rules checked against every converted invoice.

pub mod rates;
pub mod totals;

pub use rates::{DiscountRule, VatRateRule};
pub use totals::{LineTotalRule, SubtotalRule, TotalRule};

use rust_decimal::Decimal;

use crate::models::config::BusinessConfig;
use crate::models::invoice::InvoiceDraft;

use super::ValidationIssue;

/// Stable issue codes.
pub mod codes {
    pub const LINE_TOTAL_MISMATCH: &str = "E-LINE-TOTAL-MISMATCH";
    pub const SUBTOTAL_MISMATCH: &str = "E-SUBTOTAL-MISMATCH";
    pub const TOTAL_MISMATCH: &str = "E-TOTAL-MISMATCH";
    pub const VAT_RATE: &str = "E-VAT-RATE";
    pub const VAT_UNUSUAL: &str = "W-VAT-UNUSUAL";
    pub const DISCOUNT_RANGE: &str = "E-DISCOUNT-RANGE";
    pub const DISCOUNT_HIGH: &str = "W-DISCOUNT-HIGH";
}

/// Trait for business rules.
///
/// Rules never fail: a violation is reported as a [`ValidationIssue`].
pub trait BusinessRule: Send + Sync {
    /// Short rule name for logs.
    fn name(&self) -> &'static str;

    /// Check the invoice and return every violation found.
    fn check(&self, invoice: &InvoiceDraft, settings: &BusinessConfig) -> Vec<ValidationIssue>;
}

/// The standard rule set, in reporting order.
pub fn default_rules() -> Vec<Box<dyn BusinessRule>> {
    vec![
        Box::new(LineTotalRule),
        Box::new(SubtotalRule),
        Box::new(TotalRule),
        Box::new(VatRateRule),
        Box::new(DiscountRule),
    ]
}

/// Run every standard rule without short-circuiting.
pub fn run_all_rules(invoice: &InvoiceDraft, settings: &BusinessConfig) -> Vec<ValidationIssue> {
    default_rules()
        .iter()
        .flat_map(|rule| rule.check(invoice, settings))
        .collect()
}

/// `|a - b| <= tolerance`. Amounts too far apart to subtract are unequal.
pub fn approx_equal(a: Decimal, b: Decimal, tolerance: Decimal) -> bool {
    a.checked_sub(b).is_some_and(|diff| diff.abs() <= tolerance)
}

/// Expected value for an issue, or `"overflow"` when it cannot be computed.
pub fn money_or_overflow(value: Option<Decimal>) -> String {
    value.map_or_else(|| "overflow".to_string(), money)
}

/// Money amount rendered with two decimals.
pub fn money(value: Decimal) -> String {
    format!("{:.2}", value.round_dp(2))
}

fn in_percent_range(value: Decimal) -> bool {
    value >= Decimal::ZERO && value <= Decimal::ONE_HUNDRED
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_approx_equal() {
        let tol = Decimal::new(5, 2);
        let a = Decimal::from_str("10.00").unwrap();
        assert!(approx_equal(a, Decimal::from_str("10.05").unwrap(), tol));
        assert!(approx_equal(a, Decimal::from_str("9.95").unwrap(), tol));
        assert!(!approx_equal(a, Decimal::from_str("10.06").unwrap(), tol));
        assert!(!approx_equal(Decimal::MAX, Decimal::MIN, tol));
    }

    #[test]
    fn test_money_pads_two_decimals() {
        assert_eq!(money(Decimal::from(20)), "20.00");
        assert_eq!(money(Decimal::from_str("3.456").unwrap()), "3.46");
        assert_eq!(money_or_overflow(None), "overflow");
    }

    #[test]
    fn test_percent_range() {
        assert!(in_percent_range(Decimal::ZERO));
        assert!(in_percent_range(Decimal::ONE_HUNDRED));
        assert!(!in_percent_range(Decimal::from(-1)));
        assert!(!in_percent_range(Decimal::from(101)));
    }
}
