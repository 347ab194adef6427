//! Data models for records, invoices and configuration.

pub mod config;
pub mod invoice;
pub mod record;

pub use config::ValidationConfig;
pub use invoice::{InvoiceDraft, InvoiceFinal, InvoiceIntro, LineItem};
pub use record::{FieldValue, Fields, Record, RecordSet};
