//! Positional character comparison of one field value.

use serde::{Deserialize, Serialize};

/// Result of comparing one reference value with one candidate value.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FieldComparison {
    /// Positions compared: the longer of the two trimmed values.
    pub total_chars: usize,
    /// Positions where both values carry the same character.
    pub correct_chars: usize,
    /// `correct_chars / total_chars`, or 1.0 when both values are empty.
    pub accuracy: f64,
}

impl FieldComparison {
    /// Both sides empty: a vacuous match.
    pub const VACUOUS: FieldComparison = FieldComparison {
        total_chars: 0,
        correct_chars: 0,
        accuracy: 1.0,
    };

    pub fn is_exact(&self) -> bool {
        self.correct_chars == self.total_chars
    }
}

/// Compare two values character by character.
///
/// Both inputs are trimmed; nothing else is normalized, so case, inner
/// whitespace and punctuation defects stay visible. A position past the end of
/// the shorter value counts as a mismatch.
pub fn compare(reference: &str, candidate: &str) -> FieldComparison {
    let reference: Vec<char> = reference.trim().chars().collect();
    let candidate: Vec<char> = candidate.trim().chars().collect();

    match (reference.is_empty(), candidate.is_empty()) {
        (true, true) => FieldComparison::VACUOUS,
        (false, true) | (true, false) => FieldComparison {
            total_chars: reference.len().max(candidate.len()),
            correct_chars: 0,
            accuracy: 0.0,
        },
        (false, false) => {
            let total_chars = reference.len().max(candidate.len());
            let correct_chars = reference
                .iter()
                .zip(candidate.iter())
                .filter(|(r, c)| r == c)
                .count();

            FieldComparison {
                total_chars,
                correct_chars,
                accuracy: correct_chars as f64 / total_chars as f64,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identical_values() {
        for s in ["Apple", "7290000000017", "12.50", "x"] {
            let result = compare(s, s);
            assert_eq!(result.accuracy, 1.0);
            assert_eq!(result.correct_chars, s.chars().count());
            assert_eq!(result.total_chars, s.chars().count());
        }
    }

    #[test]
    fn test_both_empty_is_vacuous_match() {
        assert_eq!(compare("", ""), FieldComparison::VACUOUS);
        assert_eq!(compare("  ", "\t"), FieldComparison::VACUOUS);
    }

    #[test]
    fn test_one_side_empty() {
        let result = compare("Apple", "");
        assert_eq!(result.total_chars, 5);
        assert_eq!(result.correct_chars, 0);
        assert_eq!(result.accuracy, 0.0);

        let result = compare("", "Pear");
        assert_eq!(result.total_chars, 4);
        assert_eq!(result.accuracy, 0.0);
    }

    #[test]
    fn test_transposition_is_positional() {
        let result = compare("Apple", "Aplle");
        assert_eq!(result.correct_chars, 4);
        assert_eq!(result.total_chars, 5);
        assert_eq!(result.accuracy, 0.8);
    }

    #[test]
    fn test_length_difference_counts_as_mismatch() {
        let result = compare("20", "20.0");
        assert_eq!(result.total_chars, 4);
        assert_eq!(result.correct_chars, 2);
        assert_eq!(result.accuracy, 0.5);
    }

    #[test]
    fn test_accuracy_symmetric() {
        let pairs = [("Apple", "Aplle"), ("20", "20.0"), ("abc", "xbz"), ("abc", "")];
        for (a, b) in pairs {
            assert_eq!(compare(a, b).accuracy, compare(b, a).accuracy);
            assert_eq!(compare(a, b).total_chars, compare(b, a).total_chars);
        }
    }

    #[test]
    fn test_no_case_folding() {
        let result = compare("apple", "Apple");
        assert_eq!(result.correct_chars, 4);
    }

    #[test]
    fn test_counts_unicode_scalars() {
        let result = compare("תפוח", "תפוח");
        assert_eq!(result.total_chars, 4);
        assert!(result.is_exact());
    }
}
