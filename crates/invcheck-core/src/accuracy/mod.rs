//! Character-level accuracy of extracted records against a reference.

pub mod aggregator;
pub mod aligner;
pub mod comparator;

pub use aggregator::{
    FieldAccuracy, FieldAccuracyAggregator, FileAccuracyReport, LineComparison,
    DEFAULT_MEASURED_FIELDS,
};
pub use aligner::{align, index, union_lines, Alignment, LineIndex, SkipReason, SkippedLine};
pub use comparator::{compare, FieldComparison};
