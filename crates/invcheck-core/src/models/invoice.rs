//! Invoice shape consumed by the business rule engine.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::numeric::checked_sum;

/// An invoice converted from one file's extracted records.
///
/// Built fresh for each validation run and never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InvoiceDraft {
    /// Intro metadata, when the file carries any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub intro: Option<InvoiceIntro>,

    /// Converted line items.
    pub lines: Vec<LineItem>,

    /// Money summary, explicit or computed from the lines.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub final_summary: Option<InvoiceFinal>,
}

/// Intro block: who issued the invoice and when.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvoiceIntro {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub supplier_name: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub supplier_vat_id: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub invoice_number: Option<String>,

    /// Invoice date as written in the source document.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub invoice_date: Option<String>,

    /// Currency code (default: ILS).
    #[serde(default = "default_currency")]
    pub currency: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub customer_name: Option<String>,
}

fn default_currency() -> String {
    "ILS".to_string()
}

impl Default for InvoiceIntro {
    fn default() -> Self {
        Self {
            supplier_name: None,
            supplier_vat_id: None,
            invoice_number: None,
            invoice_date: None,
            currency: default_currency(),
            customer_name: None,
        }
    }
}

impl InvoiceIntro {
    /// Check if no intro field was found.
    pub fn is_empty(&self) -> bool {
        self.supplier_name.is_none()
            && self.supplier_vat_id.is_none()
            && self.invoice_number.is_none()
            && self.invoice_date.is_none()
            && self.customer_name.is_none()
    }
}

/// A single converted line item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineItem {
    /// Line number from the source record.
    pub line_no: i64,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub barcode: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub item_code: Option<String>,

    /// Product description, whitespace-normalized.
    pub description: String,

    pub qty: Decimal,

    pub unit_price: Decimal,

    /// Discount percentage (0 - 100).
    pub discount_pct: Decimal,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub price_after_discount: Option<Decimal>,

    /// VAT percentage (0 - 100).
    pub vat_pct: Decimal,

    /// Line total after discount, before VAT.
    pub line_total: Decimal,
}

impl LineItem {
    /// `qty * unit_price * (1 - discount_pct / 100)`, or `None` on overflow.
    pub fn expected_total(&self) -> Option<Decimal> {
        let remaining = Decimal::ONE.checked_sub(self.discount_pct.checked_div(Decimal::ONE_HUNDRED)?)?;
        self.qty.checked_mul(self.unit_price)?.checked_mul(remaining)
    }

    /// VAT owed on this line: `line_total * vat_pct / 100`, or `None` on overflow.
    pub fn vat_amount(&self) -> Option<Decimal> {
        self.line_total
            .checked_mul(self.vat_pct)?
            .checked_div(Decimal::ONE_HUNDRED)
    }
}

/// Invoice money summary.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvoiceFinal {
    /// Sum of line totals, before VAT.
    pub subtotal: Decimal,

    /// Total VAT amount.
    pub vat_amount: Decimal,

    /// Amount due, after VAT.
    pub total: Decimal,
}

impl InvoiceFinal {
    /// Compute a summary from the lines alone. `None` when a sum overflows.
    pub fn from_lines(lines: &[LineItem]) -> Option<Self> {
        let subtotal = checked_sum(lines.iter().map(|l| l.line_total))?;
        let vat_amount = lines
            .iter()
            .try_fold(Decimal::ZERO, |acc, l| acc.checked_add(l.vat_amount()?))?;
        Some(Self {
            subtotal,
            vat_amount,
            total: subtotal.checked_add(vat_amount)?,
        })
    }
}
