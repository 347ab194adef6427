//! Line-number alignment of candidate records against the reference.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::models::record::{Record, RecordSet};

/// Records of one set keyed by line number.
pub type LineIndex<'a> = BTreeMap<i64, &'a Record>;

/// Index a record set by line number. Duplicate lines: last one wins.
pub fn index(records: &RecordSet) -> LineIndex<'_> {
    let mut map = LineIndex::new();
    for record in records.iter() {
        if map.insert(record.line, record).is_some() {
            warn!("Duplicate line {} in record set, keeping the last occurrence", record.line);
        }
    }
    map
}

/// Sorted union of every line number across the given sets.
pub fn union_lines<'a>(sets: impl IntoIterator<Item = &'a RecordSet>) -> BTreeSet<i64> {
    sets.into_iter()
        .flat_map(|set| set.iter().map(|r| r.line))
        .collect()
}

/// Why a line was left out of a candidate's score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    /// The candidate has the line, the reference does not.
    MissingFromReference,
    /// The reference has the line, the candidate does not.
    MissingFromCandidate,
}

/// A line that could not be scored for one candidate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkippedLine {
    pub line: i64,
    pub reason: SkipReason,
}

/// A reference record paired with the candidate record on the same line.
#[derive(Debug, Clone, Copy)]
pub struct AlignedPair<'a> {
    pub line: i64,
    pub reference: &'a Record,
    pub candidate: &'a Record,
}

/// Result of aligning one candidate against the reference.
#[derive(Debug, Clone, Default)]
pub struct Alignment<'a> {
    /// Lines present on both sides, in ascending line order.
    pub pairs: Vec<AlignedPair<'a>>,
    /// Lines present on exactly one side.
    pub skipped: Vec<SkippedLine>,
}

/// Pair reference and candidate records over `lines`.
///
/// Lines missing from either side are skipped and logged, never scored as
/// zero. Lines absent from both sides (present only in some other candidate)
/// are ignored for this candidate.
pub fn align<'a>(
    reference: &LineIndex<'a>,
    candidate: &LineIndex<'a>,
    lines: &BTreeSet<i64>,
    file_id: &str,
) -> Alignment<'a> {
    let mut alignment = Alignment::default();

    for &line in lines {
        match (reference.get(&line), candidate.get(&line)) {
            (Some(r), Some(c)) => alignment.pairs.push(AlignedPair {
                line,
                reference: r,
                candidate: c,
            }),
            (None, Some(_)) => {
                warn!("Line {} missing from reference, skipped for {}", line, file_id);
                alignment.skipped.push(SkippedLine {
                    line,
                    reason: SkipReason::MissingFromReference,
                });
            }
            (Some(_), None) => {
                warn!("Line {} missing from file {}", line, file_id);
                alignment.skipped.push(SkippedLine {
                    line,
                    reason: SkipReason::MissingFromCandidate,
                });
            }
            (None, None) => {}
        }
    }

    alignment
}

#[cfg(test)]
mod tests {
    use super::*;

    fn set(lines: &[i64]) -> RecordSet {
        lines
            .iter()
            .map(|&l| Record::new(l).with("description", format!("item {}", l)))
            .collect()
    }

    #[test]
    fn test_index_last_wins() {
        let records = RecordSet::new(vec![
            Record::new(1).with("description", "first"),
            Record::new(1).with("description", "second"),
        ]);
        let idx = index(&records);
        assert_eq!(idx.len(), 1);
        assert_eq!(idx[&1].text("description"), "second");
    }

    #[test]
    fn test_union_lines_sorted() {
        let a = set(&[3, 1]);
        let b = set(&[2, 5]);
        let lines: Vec<i64> = union_lines([&a, &b]).into_iter().collect();
        assert_eq!(lines, vec![1, 2, 3, 5]);
    }

    #[test]
    fn test_align_skips_one_sided_lines() {
        let reference = set(&[1, 2, 3]);
        let candidate = set(&[2, 3, 4]);
        let other = set(&[9]);
        let lines = union_lines([&reference, &candidate, &other]);

        let ref_idx = index(&reference);
        let cand_idx = index(&candidate);
        let alignment = align(&ref_idx, &cand_idx, &lines, "a");

        let paired: Vec<i64> = alignment.pairs.iter().map(|p| p.line).collect();
        assert_eq!(paired, vec![2, 3]);
        assert_eq!(
            alignment.skipped,
            vec![
                SkippedLine { line: 1, reason: SkipReason::MissingFromCandidate },
                SkippedLine { line: 4, reason: SkipReason::MissingFromReference },
            ]
        );
    }
}
