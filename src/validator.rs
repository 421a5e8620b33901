//! Heuristics that separate human typing from padding, key-mashing and bots.
//!
//! Two tiers: a cheap accept-time check run on every keystroke, and a
//! stricter invalid-pattern check run once when a session is scored.

use itertools::Itertools;
use once_cell::sync::Lazy;
use regex::Regex;

/// "x x x x" style input: single characters separated by single spaces.
static ALTERNATING: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(?:\S\s)+\S?$").expect("alternating pattern is a valid regex"));

pub const MAX_CHAR_RUN: usize = 10;
pub const MIN_WORDS_FOR_RATIO: usize = 5;
pub const SINGLE_CHAR_WORD_RATIO: f64 = 0.7;

/// Which scoring-time rule flagged the input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum_macros::Display)]
#[strum(serialize_all = "snake_case")]
pub enum PatternFlag {
    Alternating,
    RepeatedRun,
    SingleCharWords,
}

/// True when `typed` looks like something a person could have typed.
pub fn is_plausible_human_input(typed: &str) -> bool {
    !has_consecutive_whitespace(typed)
        && !is_whitespace_only(typed)
        && has_multi_char_word(typed)
        && !is_single_repeated_char(typed)
}

/// Per-keystroke form of [`is_plausible_human_input`], applied to the buffer
/// as it would be after the keystroke.
///
/// The word-length and repeated-character rules only kick in once the buffer
/// holds `min_context` characters; every passage starts with a short prefix
/// that would fail them.
pub fn accepts_keystroke(candidate: &str, min_context: usize) -> bool {
    if has_consecutive_whitespace(candidate) || is_whitespace_only(candidate) {
        return false;
    }
    if candidate.chars().count() < min_context {
        return true;
    }
    has_multi_char_word(candidate) && !is_single_repeated_char(candidate)
}

/// True when `typed` should be scored as suspicious.
pub fn detect_invalid_pattern(typed: &str) -> bool {
    invalid_pattern(typed).is_some()
}

/// The first scoring-time rule that `typed` trips, if any.
pub fn invalid_pattern(typed: &str) -> Option<PatternFlag> {
    if ALTERNATING.is_match(typed) {
        return Some(PatternFlag::Alternating);
    }
    if longest_run(typed) >= MAX_CHAR_RUN {
        return Some(PatternFlag::RepeatedRun);
    }

    let words: Vec<&str> = typed.split_whitespace().collect();
    if words.len() >= MIN_WORDS_FOR_RATIO {
        let single = words.iter().filter(|w| w.chars().count() == 1).count();
        if single as f64 / words.len() as f64 > SINGLE_CHAR_WORD_RATIO {
            return Some(PatternFlag::SingleCharWords);
        }
    }
    None
}

fn has_consecutive_whitespace(typed: &str) -> bool {
    typed
        .chars()
        .tuple_windows()
        .any(|(a, b)| a.is_whitespace() && b.is_whitespace())
}

fn is_whitespace_only(typed: &str) -> bool {
    !typed.is_empty() && typed.trim().is_empty()
}

fn has_multi_char_word(typed: &str) -> bool {
    typed.split_whitespace().any(|w| w.chars().count() > 1)
}

fn is_single_repeated_char(typed: &str) -> bool {
    typed.chars().count() >= 2 && typed.chars().all_equal()
}

fn longest_run(typed: &str) -> usize {
    typed
        .chars()
        .dedup_with_count()
        .map(|(count, _)| count)
        .max()
        .unwrap_or(0)
}
