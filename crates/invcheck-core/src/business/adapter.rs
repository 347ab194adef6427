//! Conversion of extracted record sets into invoice drafts.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::error::ConversionError;
use crate::models::config::BusinessConfig;
use crate::models::invoice::{InvoiceDraft, InvoiceFinal, InvoiceIntro, LineItem};
use crate::models::record::{Fields, Record, RecordSet};
use crate::numeric::{checked_sum, coerce_decimal, decimal_or, normalize_whitespace, Coerced};

/// A converted invoice plus what had to be dropped or defaulted on the way.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversionOutcome {
    pub invoice: InvoiceDraft,
    /// Line numbers of records that could not be converted.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub dropped_lines: Vec<i64>,
    /// Coercion and drop warnings, in record order.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
}

/// Converts one file's records into the shape the rule engine checks.
#[derive(Debug, Clone)]
pub struct InvoiceAdapter {
    default_vat_pct: Decimal,
}

impl InvoiceAdapter {
    /// Create an adapter defaulting missing VAT to 17%.
    pub fn new() -> Self {
        Self {
            default_vat_pct: BusinessConfig::default().default_vat_pct,
        }
    }

    /// Set the VAT percentage used when a record carries none.
    pub fn with_default_vat(mut self, vat_pct: Decimal) -> Self {
        self.default_vat_pct = vat_pct;
        self
    }

    /// Convert a record set. Fails only when no record is usable.
    pub fn to_invoice_draft(&self, records: &RecordSet) -> Result<ConversionOutcome, ConversionError> {
        let mut lines = Vec::with_capacity(records.len());
        let mut dropped_lines = Vec::new();
        let mut warnings = Vec::new();

        for record in records.iter() {
            match self.convert_line(record, &mut warnings) {
                Ok(line) => lines.push(line),
                Err(e) => {
                    warn!("Dropping record: {}", e);
                    warnings.push(e.to_string());
                    dropped_lines.push(record.line);
                }
            }
        }

        if lines.is_empty() {
            return Err(ConversionError::NoUsableLines {
                dropped: dropped_lines.len(),
            });
        }

        let intro = extract_intro(&records.header);
        let final_summary = match &records.summary {
            Some(summary) => explicit_final(summary, &lines),
            None => InvoiceFinal::from_lines(&lines),
        }
        .ok_or(ConversionError::SummaryOverflow)?;

        info!("Converted invoice with {} lines ({} dropped)", lines.len(), dropped_lines.len());

        Ok(ConversionOutcome {
            invoice: InvoiceDraft {
                intro,
                lines,
                final_summary: Some(final_summary),
            },
            dropped_lines,
            warnings,
        })
    }

    fn convert_line(&self, record: &Record, warnings: &mut Vec<String>) -> Result<LineItem, ConversionError> {
        let description = normalize_whitespace(&record.text("description"));
        if description.is_empty() {
            return Err(ConversionError::MissingDescription { line: record.line });
        }

        let mut number = |field: &str, default: Decimal| match coerce_decimal(record.get(field)) {
            Coerced::Value(v) => v,
            Coerced::Missing => default,
            Coerced::Unparseable(raw) => {
                let message = format!(
                    "line {}: {} value {:?} is not a number, using {}",
                    record.line, field, raw, default
                );
                warn!("{}", message);
                warnings.push(message);
                default
            }
        };

        let qty = number("quantity", Decimal::ZERO);
        let unit_price = number("unit_price", Decimal::ZERO);
        let discount_pct = number("discount_percent", Decimal::ZERO);
        let vat_pct = number("vat_percent", self.default_vat_pct);
        let price_after_discount = match number("price_after_discount", Decimal::ZERO) {
            v if v.is_zero() => None,
            v => Some(v),
        };
        let line_total = number("total_amount", Decimal::ZERO);

        let mut item = LineItem {
            line_no: record.line,
            barcode: optional_text(record, "barcode"),
            item_code: optional_text(record, "item_code"),
            description,
            qty,
            unit_price,
            discount_pct,
            price_after_discount,
            vat_pct,
            line_total,
        };

        if item.line_total.is_zero() {
            item.line_total = item
                .expected_total()
                .ok_or(ConversionError::AmountOverflow { line: record.line })?;
            debug!("Line {}: computed missing total {}", record.line, item.line_total);
        }

        Ok(item)
    }
}

impl Default for InvoiceAdapter {
    fn default() -> Self {
        Self::new()
    }
}

fn optional_text(record: &Record, field: &str) -> Option<String> {
    let value = record.text(field);
    let trimmed = value.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

fn header_text(header: &Fields, field: &str) -> Option<String> {
    header
        .get(field)
        .map(|v| v.to_text().trim().to_string())
        .filter(|s| !s.is_empty())
}

fn extract_intro(header: &Fields) -> Option<InvoiceIntro> {
    let mut intro = InvoiceIntro {
        supplier_name: header_text(header, "supplier_name"),
        supplier_vat_id: header_text(header, "supplier_vat_id"),
        invoice_number: header_text(header, "invoice_number"),
        invoice_date: header_text(header, "invoice_date"),
        customer_name: header_text(header, "customer_name"),
        ..Default::default()
    };
    if let Some(currency) = header_text(header, "currency") {
        intro.currency = currency;
    }

    (!intro.is_empty()).then_some(intro)
}

/// Use the file's own summary block, filling gaps from the lines.
fn explicit_final(summary: &Fields, lines: &[LineItem]) -> Option<InvoiceFinal> {
    let subtotal = match coerce_decimal(summary.get("subtotal")) {
        Coerced::Value(v) => v,
        _ => decimal_or(
            summary.get("subtotal"),
            "subtotal",
            checked_sum(lines.iter().map(|l| l.line_total))?,
        ),
    };
    let vat_amount = decimal_or(summary.get("vat_amount"), "vat_amount", Decimal::ZERO);
    let total = match coerce_decimal(summary.get("total")) {
        Coerced::Value(v) => v,
        _ => decimal_or(summary.get("total"), "total", subtotal.checked_add(vat_amount)?),
    };

    Some(InvoiceFinal {
        subtotal,
        vat_amount,
        total,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    #[test]
    fn test_converts_and_computes_missing_total() {
        let records = RecordSet::new(vec![Record::new(1)
            .with("description", "Product A")
            .with("quantity", 2)
            .with("unit_price", 100)
            .with("discount_percent", 10)]);

        let outcome = InvoiceAdapter::new().to_invoice_draft(&records).unwrap();
        let line = &outcome.invoice.lines[0];

        assert_eq!(line.line_total, dec("180"));
        assert_eq!(line.vat_pct, dec("17"));
        assert!(outcome.warnings.is_empty());
    }

    #[test]
    fn test_defaults_when_fields_absent() {
        let records = RecordSet::new(vec![Record::new(3).with("description", "Widget")]);
        let outcome = InvoiceAdapter::new().to_invoice_draft(&records).unwrap();
        let line = &outcome.invoice.lines[0];

        assert_eq!(line.line_no, 3);
        assert_eq!(line.qty, Decimal::ZERO);
        assert_eq!(line.unit_price, Decimal::ZERO);
        assert_eq!(line.line_total, Decimal::ZERO);
    }

    #[test]
    fn test_normalizes_description_and_amounts() {
        let records = RecordSet::new(vec![Record::new(1)
            .with("description", "  Red \n apple ")
            .with("quantity", "1,5")
            .with("unit_price", "₪ 1,000.00")
            .with("total_amount", "1500")]);

        let outcome = InvoiceAdapter::new().to_invoice_draft(&records).unwrap();
        let line = &outcome.invoice.lines[0];

        assert_eq!(line.description, "Red apple");
        assert_eq!(line.qty, dec("1.5"));
        assert_eq!(line.unit_price, dec("1000.00"));
    }

    #[test]
    fn test_unparseable_number_becomes_default_with_warning() {
        let records = RecordSet::new(vec![Record::new(1)
            .with("description", "Widget")
            .with("quantity", "lots")
            .with("vat_percent", "n/a")]);

        let outcome = InvoiceAdapter::new().to_invoice_draft(&records).unwrap();
        let line = &outcome.invoice.lines[0];

        assert_eq!(line.qty, Decimal::ZERO);
        assert_eq!(line.vat_pct, dec("17"));
        assert_eq!(outcome.warnings.len(), 2);
    }

    #[test]
    fn test_drops_lines_without_description() {
        let records = RecordSet::new(vec![
            Record::new(1).with("description", "   "),
            Record::new(2).with("description", "Pear").with("total_amount", 4),
        ]);

        let outcome = InvoiceAdapter::new().to_invoice_draft(&records).unwrap();
        assert_eq!(outcome.invoice.lines.len(), 1);
        assert_eq!(outcome.dropped_lines, vec![1]);
        assert_eq!(outcome.warnings, vec!["line 1: missing description".to_string()]);
    }

    #[test]
    fn test_no_usable_lines_fails() {
        let records = RecordSet::new(vec![Record::new(1).with("quantity", 2)]);
        let err = InvoiceAdapter::new().to_invoice_draft(&records).unwrap_err();
        assert_eq!(err, ConversionError::NoUsableLines { dropped: 1 });

        let err = InvoiceAdapter::new().to_invoice_draft(&RecordSet::default()).unwrap_err();
        assert_eq!(err, ConversionError::NoUsableLines { dropped: 0 });
    }

    #[test]
    fn test_out_of_range_line_total_is_dropped() {
        let records = RecordSet::new(vec![
            Record::new(1)
                .with("description", "Barcode in the wrong column")
                .with("quantity", "729000000000001")
                .with("unit_price", "729000000000001"),
            Record::new(2).with("description", "Pear").with("total_amount", 4),
        ]);

        let outcome = InvoiceAdapter::new().to_invoice_draft(&records).unwrap();
        assert_eq!(outcome.invoice.lines.len(), 1);
        assert_eq!(outcome.dropped_lines, vec![1]);
        assert_eq!(
            outcome.warnings,
            vec!["line 1: computed total is out of range".to_string()]
        );
    }

    #[test]
    fn test_out_of_range_sum_fails_conversion() {
        let huge = "70000000000000000000000000000";
        let records = RecordSet::new(vec![
            Record::new(1).with("description", "A").with("total_amount", huge),
            Record::new(2).with("description", "B").with("total_amount", huge),
        ]);

        let err = InvoiceAdapter::new().to_invoice_draft(&records).unwrap_err();
        assert_eq!(err, ConversionError::SummaryOverflow);
    }

    #[test]
    fn test_final_computed_from_lines() {
        let records = RecordSet::new(vec![
            Record::new(1).with("description", "A").with("total_amount", 100),
            Record::new(2).with("description", "B").with("total_amount", 50).with("vat_percent", 0),
        ]);

        let outcome = InvoiceAdapter::new().to_invoice_draft(&records).unwrap();
        let summary = outcome.invoice.final_summary.unwrap();

        assert_eq!(summary.subtotal, dec("150"));
        assert_eq!(summary.vat_amount, dec("17"));
        assert_eq!(summary.total, dec("167"));
    }

    #[test]
    fn test_explicit_summary_block_wins() {
        let mut summary = Fields::new();
        summary.insert("subtotal".into(), "100".into());
        summary.insert("vat_amount".into(), "17".into());
        summary.insert("total".into(), "120".into());

        let records = RecordSet::new(vec![
            Record::new(1).with("description", "A").with("total_amount", 100),
        ])
        .with_summary(summary);

        let outcome = InvoiceAdapter::new().to_invoice_draft(&records).unwrap();
        let summary = outcome.invoice.final_summary.unwrap();
        assert_eq!(summary.total, dec("120"));
    }

    #[test]
    fn test_intro_from_header() {
        let mut header = Fields::new();
        header.insert("supplier_name".into(), "Acme".into());
        header.insert("invoice_number".into(), 1042.into());

        let records = RecordSet::new(vec![Record::new(1).with("description", "A")])
            .with_header(header);

        let outcome = InvoiceAdapter::new().to_invoice_draft(&records).unwrap();
        let intro = outcome.invoice.intro.unwrap();
        assert_eq!(intro.supplier_name.as_deref(), Some("Acme"));
        assert_eq!(intro.invoice_number.as_deref(), Some("1042"));
        assert_eq!(intro.currency, "ILS");
    }
}
