//! Character-level alignment of a typed buffer against its reference text.
//!
//! The scan is a two-pointer walk rather than a general edit distance so it
//! stays O(n) and can be re-run on every keystroke.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Characters treated as punctuation when classifying a mismatch.
pub const PUNCTUATION: &[char] = &[
    '.', ',', '/', '#', '!', '$', '%', '^', '&', '*', ';', ':', '{', '}', '=', '-', '_', '`', '~',
    '(', ')', '?', '\'', '"', '[', ']',
];

pub fn is_punctuation(c: char) -> bool {
    PUNCTUATION.contains(&c)
}

/// Character-level error categories. All of them count towards
/// [`ErrorReport::total`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum_macros::Display)]
#[strum(serialize_all = "snake_case")]
pub enum ErrorKind {
    Substitution,
    Insertion,
    Deletion,
    Transposition,
    Capitalization,
    Punctuation,
}

/// A recurring `expected -> typed` substitution, for diagnostic display.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommonError {
    pub expected: char,
    pub typed: char,
    pub count: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorReport {
    pub total: usize,
    pub substitutions: usize,
    pub insertions: usize,
    pub deletions: usize,
    pub transpositions: usize,
    /// Word-level count, kept apart from `total`.
    pub misspelled: usize,
    pub punctuation: usize,
    pub capitalization: usize,
    #[serde(with = "common_pairs", default)]
    pub common: HashMap<(char, char), usize>,
}

impl ErrorReport {
    fn count(&mut self, kind: ErrorKind) {
        let slot = match kind {
            ErrorKind::Substitution => &mut self.substitutions,
            ErrorKind::Insertion => &mut self.insertions,
            ErrorKind::Deletion => &mut self.deletions,
            ErrorKind::Transposition => &mut self.transpositions,
            ErrorKind::Capitalization => &mut self.capitalization,
            ErrorKind::Punctuation => &mut self.punctuation,
        };
        *slot += 1;
        self.total += 1;
    }

    pub fn count_of(&self, kind: ErrorKind) -> usize {
        match kind {
            ErrorKind::Substitution => self.substitutions,
            ErrorKind::Insertion => self.insertions,
            ErrorKind::Deletion => self.deletions,
            ErrorKind::Transposition => self.transpositions,
            ErrorKind::Capitalization => self.capitalization,
            ErrorKind::Punctuation => self.punctuation,
        }
    }

    pub fn is_clean(&self) -> bool {
        self.total == 0
    }

    /// Most frequent substitutions, highest count first.
    pub fn most_common(&self, limit: usize) -> Vec<CommonError> {
        let mut pairs = common_pairs::sorted(&self.common);
        pairs.truncate(limit);
        pairs
    }
}

/// Align `typed` against `reference` and classify every discrepancy.
pub fn diff(reference: &str, typed: &str) -> ErrorReport {
    let expected: Vec<char> = reference.chars().collect();
    let actual: Vec<char> = typed.chars().collect();
    let mut report = ErrorReport::default();

    let (mut i, mut j) = (0, 0);
    while i < expected.len() || j < actual.len() {
        if j >= actual.len() {
            report.count(ErrorKind::Deletion);
            i += 1;
            continue;
        }
        if i >= expected.len() {
            report.count(ErrorKind::Insertion);
            j += 1;
            continue;
        }

        let (e, t) = (expected[i], actual[j]);
        if e == t {
            i += 1;
            j += 1;
        } else if is_transposition(&expected, &actual, i, j) {
            report.count(ErrorKind::Transposition);
            i += 2;
            j += 2;
        } else {
            if same_ignoring_case(e, t) {
                report.count(ErrorKind::Capitalization);
            } else if is_punctuation(e) || is_punctuation(t) {
                report.count(ErrorKind::Punctuation);
            } else {
                report.count(ErrorKind::Substitution);
                *report.common.entry((e, t)).or_insert(0) += 1;
            }
            i += 1;
            j += 1;
        }
    }

    report.misspelled = count_misspelled(reference, typed);
    report
}

/// Diff against only as much of the reference as has been typed, so unseen
/// text is never counted as deleted.
pub fn diff_prefix(reference: &str, typed: &str) -> ErrorReport {
    let seen: String = reference.chars().take(typed.chars().count()).collect();
    diff(&seen, typed)
}

fn is_transposition(expected: &[char], actual: &[char], i: usize, j: usize) -> bool {
    match (expected.get(i + 1), actual.get(j + 1)) {
        (Some(&next_expected), Some(&next_actual)) => {
            expected[i] == next_actual && next_expected == actual[j]
        }
        _ => false,
    }
}

fn same_ignoring_case(a: char, b: char) -> bool {
    a.to_lowercase().eq(b.to_lowercase())
}

fn is_punctuation_token(word: &str) -> bool {
    word.chars().all(is_punctuation)
}

fn count_misspelled(reference: &str, typed: &str) -> usize {
    reference
        .split_whitespace()
        .zip(typed.split_whitespace())
        .filter(|(expected, actual)| {
            expected != actual && !is_punctuation_token(expected) && !is_punctuation_token(actual)
        })
        .count()
}

// `common` is keyed by a tuple, which JSON maps cannot hold.
mod common_pairs {
    use super::CommonError;
    use itertools::Itertools;
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::collections::HashMap;

    pub fn sorted(map: &HashMap<(char, char), usize>) -> Vec<CommonError> {
        map.iter()
            .map(|(&(expected, typed), &count)| CommonError {
                expected,
                typed,
                count,
            })
            .sorted_by(|a, b| {
                b.count
                    .cmp(&a.count)
                    .then(a.expected.cmp(&b.expected))
                    .then(a.typed.cmp(&b.typed))
            })
            .collect()
    }

    pub fn serialize<S: Serializer>(
        map: &HashMap<(char, char), usize>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        sorted(map).serialize(serializer)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<HashMap<(char, char), usize>, D::Error> {
        let entries = Vec::<CommonError>::deserialize(deserializer)?;
        let mut map = HashMap::new();
        for entry in entries {
            *map.entry((entry.expected, entry.typed)).or_insert(0) += entry.count;
        }
        Ok(map)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sum_of_categories(report: &ErrorReport) -> usize {
        report.substitutions
            + report.insertions
            + report.deletions
            + report.transpositions
            + report.capitalization
            + report.punctuation
    }

    #[test]
    fn test_identical_text_has_no_errors() {
        let report = diff("the quick brown fox", "the quick brown fox");
        assert!(report.is_clean());
        assert_eq!(report, ErrorReport::default());
    }

    #[test]
    fn test_empty_inputs() {
        assert_eq!(diff("", ""), ErrorReport::default());
    }

    #[test]
    fn test_single_substitution() {
        let report = diff("hello world", "hrllo world");
        assert_eq!(report.total, 1);
        assert_eq!(report.substitutions, 1);
        assert_eq!(report.common.get(&('e', 'r')), Some(&1));
        assert_eq!(report.misspelled, 1);
    }

    #[test]
    fn test_transposition_counts_once() {
        let report = diff("the", "teh");
        assert_eq!(report.transpositions, 1);
        assert_eq!(report.total, 1);
        assert!(report.common.is_empty());
    }

    #[test]
    fn test_transposition_needs_both_lookaheads() {
        // 'h' and 'e' swapped but the reference stops before the pair completes
        let report = diff("th", "teh");
        assert_eq!(report.transpositions, 0);
        assert_eq!(report.substitutions, 1);
        assert_eq!(report.insertions, 1);
    }

    #[test]
    fn test_capitalization() {
        let report = diff("Hello", "hello");
        assert_eq!(report.capitalization, 1);
        assert_eq!(report.substitutions, 0);
        assert_eq!(report.total, 1);
    }

    #[test]
    fn test_capitalization_non_ascii() {
        let report = diff("Über", "über");
        assert_eq!(report.capitalization, 1);
        assert_eq!(report.total, 1);
    }

    #[test]
    fn test_punctuation() {
        let report = diff("hi, there", "hi. there");
        assert_eq!(report.punctuation, 1);
        assert_eq!(report.total, 1);

        let report = diff("hi there", "hi!there");
        assert_eq!(report.punctuation, 1);
    }

    #[test]
    fn test_deletions_when_typed_is_short() {
        let report = diff("abc", "ab");
        assert_eq!(report.deletions, 1);
        assert_eq!(report.total, 1);

        let report = diff("abc", "");
        assert_eq!(report.deletions, 3);
    }

    #[test]
    fn test_insertions_when_typed_overruns() {
        let report = diff("ab", "abcd");
        assert_eq!(report.insertions, 2);
        assert_eq!(report.total, 2);
    }

    #[test]
    fn test_total_is_sum_of_categories() {
        let cases = [
            ("Hello, world", "hello. wrold!"),
            ("abc def", "abd cef"),
            ("short", "much longer text"),
            ("much longer text", "short"),
        ];
        for (reference, typed) in cases {
            let report = diff(reference, typed);
            assert_eq!(report.total, sum_of_categories(&report), "{reference:?} / {typed:?}");
        }
    }

    #[test]
    fn test_misspelled_skips_punctuation_tokens() {
        let report = diff("wait , what", "wait . what");
        assert_eq!(report.misspelled, 0);
        assert_eq!(report.punctuation, 1);
    }

    #[test]
    fn test_misspelled_stops_at_shorter_word_list() {
        let report = diff("one two three", "one twp");
        assert_eq!(report.misspelled, 1);
    }

    #[test]
    fn test_diff_prefix_ignores_unseen_text() {
        let report = diff_prefix("hello world", "hel");
        assert!(report.is_clean());

        let report = diff_prefix("hello world", "hex");
        assert_eq!(report.total, 1);
        assert_eq!(report.deletions, 0);
    }

    #[test]
    fn test_diff_prefix_is_monotonic() {
        let reference = "The quick, brown fox jumps";
        for typed in ["Teh quick. brwon fox jupms over", "tHE qucik brown", "xxxxxxxxxx yyy"] {
            let mut previous = 0;
            for end in 0..=typed.chars().count() {
                let prefix: String = typed.chars().take(end).collect();
                let total = diff_prefix(reference, &prefix).total;
                assert!(total >= previous, "{prefix:?}: {total} < {previous}");
                previous = total;
            }
        }
    }

    #[test]
    fn test_diff_is_idempotent() {
        assert_eq!(diff("abc def", "abd xef"), diff("abc def", "abd xef"));
    }

    #[test]
    fn test_most_common_orders_by_count() {
        let report = diff("aaa b", "xxx y");
        let common = report.most_common(2);
        assert_eq!(
            common[0],
            CommonError {
                expected: 'a',
                typed: 'x',
                count: 3
            }
        );
        assert_eq!(common[1].expected, 'b');
    }

    #[test]
    fn test_common_serializes_as_list() {
        let report = diff("hello", "hrllo");
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["common"][0]["expected"], "e");
        assert_eq!(json["common"][0]["typed"], "r");
        assert_eq!(json["common"][0]["count"], 1);

        let back: ErrorReport = serde_json::from_value(json).unwrap();
        assert_eq!(back, report);
    }

    #[test]
    fn test_error_kind_display() {
        assert_eq!(ErrorKind::Transposition.to_string(), "transposition");
        assert_eq!(diff("ab", "ba").count_of(ErrorKind::Transposition), 1);
    }
}
