use itertools::{EitherOrBoth, Itertools};
use log::warn;

/// Classification of a single reference position against the typed prefix
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Verdict {
    Correct,
    Incorrect,
    /// The next character the participant is expected to type
    PendingCurrent,
    Untyped,
}

impl Verdict {
    pub fn is_typed(&self) -> bool {
        matches!(self, Verdict::Correct | Verdict::Incorrect)
    }
}

/// Result of comparing a typed prefix with a reference text.
///
/// There is exactly one verdict per reference position. Typed characters past
/// the end of the reference are not classified; their count is kept in
/// `overflow` so callers can tell the input was longer than expected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Classification {
    pub verdicts: Vec<Verdict>,
    pub overflow: usize,
}

impl Classification {
    pub fn error_count(&self) -> usize {
        self.count(Verdict::Incorrect)
    }

    /// Every reference position typed correctly and nothing extra
    pub fn is_complete(&self) -> bool {
        self.overflow == 0 && self.verdicts.iter().all(|v| *v == Verdict::Correct)
    }

    fn count(&self, verdict: Verdict) -> usize {
        self.verdicts.iter().filter(|v| **v == verdict).count()
    }
}

/// Classify every reference position against `typed`.
///
/// Comparison is exact: case and whitespace are significant.
pub fn classify(reference: &[char], typed: &[char]) -> Classification {
    let mut verdicts = Vec::with_capacity(reference.len());
    let mut overflow = 0;

    for pair in reference.iter().zip_longest(typed.iter()) {
        match pair {
            EitherOrBoth::Both(expected, actual) => verdicts.push(if expected == actual {
                Verdict::Correct
            } else {
                Verdict::Incorrect
            }),
            EitherOrBoth::Left(_) => verdicts.push(if verdicts.len() == typed.len() {
                Verdict::PendingCurrent
            } else {
                Verdict::Untyped
            }),
            EitherOrBoth::Right(_) => overflow += 1,
        }
    }

    if overflow > 0 {
        warn!(
            "typed input exceeds reference by {} char(s); only {} position(s) classified",
            overflow,
            reference.len()
        );
    }

    Classification { verdicts, overflow }
}

/// Number of mismatched positions, always a full rescan of `typed`.
pub fn error_count(reference: &[char], typed: &[char]) -> usize {
    reference
        .iter()
        .zip(typed.iter())
        .filter(|(expected, actual)| expected != actual)
        .count()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chars(s: &str) -> Vec<char> {
        s.chars().collect()
    }

    #[test]
    fn test_classify_empty_prefix() {
        let c = classify(&chars("cat"), &[]);

        assert_eq!(
            c.verdicts,
            vec![Verdict::PendingCurrent, Verdict::Untyped, Verdict::Untyped]
        );
        assert_eq!(c.overflow, 0);
        assert_eq!(c.error_count(), 0);
    }

    #[test]
    fn test_classify_partial_prefix_with_error() {
        let c = classify(&chars("hello"), &chars("hx"));

        assert_eq!(
            c.verdicts,
            vec![
                Verdict::Correct,
                Verdict::Incorrect,
                Verdict::PendingCurrent,
                Verdict::Untyped,
                Verdict::Untyped,
            ]
        );
        assert_eq!(c.error_count(), 1);
        assert!(!c.is_complete());
    }

    #[test]
    fn test_classify_full_match_has_no_pending() {
        let c = classify(&chars("cat"), &chars("cat"));

        assert_eq!(c.verdicts, vec![Verdict::Correct; 3]);
        assert!(c.is_complete());
    }

    #[test]
    fn test_classify_is_case_sensitive() {
        let c = classify(&chars("Cat"), &chars("cat"));
        assert_eq!(c.verdicts[0], Verdict::Incorrect);
    }

    #[test]
    fn test_classify_compares_spaces_literally() {
        let c = classify(&chars("a b"), &chars("a\u{a0}b"));
        assert_eq!(c.verdicts[1], Verdict::Incorrect);

        let c = classify(&chars("a  b"), &chars("a b"));
        assert_eq!(c.verdicts[2], Verdict::Incorrect);
    }

    #[test]
    fn test_classify_reports_overflow() {
        let c = classify(&chars("ab"), &chars("abcd"));

        assert_eq!(c.verdicts, vec![Verdict::Correct, Verdict::Correct]);
        assert_eq!(c.overflow, 2);
        assert!(!c.is_complete());
    }

    #[test]
    fn test_classify_shape_for_every_prefix_length() {
        let reference = chars("The quick fox.");
        let typed_full = chars("Thx quick fix!");

        for len in 0..=reference.len() {
            let typed = &typed_full[..len];
            let c = classify(&reference, typed);

            assert_eq!(c.verdicts.len(), reference.len());
            assert_eq!(c.verdicts.iter().filter(|v| v.is_typed()).count(), len);
            let pending = c
                .verdicts
                .iter()
                .filter(|v| **v == Verdict::PendingCurrent)
                .count();
            assert_eq!(pending, usize::from(len < reference.len()));

            for (i, verdict) in c.verdicts.iter().enumerate() {
                if i < len {
                    assert_eq!(*verdict == Verdict::Correct, typed[i] == reference[i]);
                } else if i == len {
                    assert_eq!(*verdict, Verdict::PendingCurrent);
                } else {
                    assert_eq!(*verdict, Verdict::Untyped);
                }
            }
        }
    }

    #[test]
    fn test_classify_is_pure() {
        let reference = chars("same input");
        let typed = chars("sane");
        assert_eq!(classify(&reference, &typed), classify(&reference, &typed));
    }

    #[test]
    fn test_error_count_matches_classification() {
        let reference = chars("typing test");
        let typed = chars("tipyng");
        assert_eq!(
            error_count(&reference, &typed),
            classify(&reference, &typed).error_count()
        );
        assert_eq!(error_count(&reference, &typed), 2);
    }

    #[test]
    fn test_error_count_after_correction() {
        let reference = chars("cat");
        assert_eq!(error_count(&reference, &chars("cx")), 1);
        assert_eq!(error_count(&reference, &chars("c")), 0);
        assert_eq!(error_count(&reference, &chars("ca")), 0);
    }
}
