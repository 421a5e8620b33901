use serde::{Deserialize, Serialize};

use crate::diff::{diff_prefix, ErrorReport};

/// Thresholds used when turning a typed buffer into speed and accuracy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringPolicy {
    /// Sustained speeds above this are treated as implausible and clamped.
    pub wpm_ceiling: u32,
    /// Below this accuracy the conservative, accuracy-weighted formula is used.
    pub low_accuracy_threshold: u32,
    /// Minimum length of a whitespace token for it to count as a real word.
    pub real_word_min_len: usize,
    /// Real-word counting is used only above this many real words.
    pub real_word_threshold: usize,
}

impl Default for ScoringPolicy {
    fn default() -> Self {
        Self {
            wpm_ceiling: 220,
            low_accuracy_threshold: 15,
            real_word_min_len: 2,
            real_word_threshold: 5,
        }
    }
}

/// The frozen outcome of one timed session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TestResult {
    pub wpm: u32,
    pub accuracy: u32,
    pub errors: usize,
    pub chars_typed: usize,
    pub correct_chars: usize,
    /// Seconds elapsed.
    pub time: f64,
    pub invalid_pattern: bool,
    pub text: String,
    pub error_details: ErrorReport,
}

/// Score `typed` against `reference` after `elapsed_secs` of typing.
pub fn compute_result(
    reference: &str,
    typed: &str,
    elapsed_secs: f64,
    invalid_pattern: bool,
    policy: &ScoringPolicy,
) -> TestResult {
    let report = diff_prefix(reference, typed);
    let chars_typed = typed.chars().count();
    let accuracy = accuracy_percent(chars_typed, report.total);
    let wpm = words_per_minute(
        typed,
        chars_typed,
        accuracy,
        elapsed_secs,
        invalid_pattern,
        policy,
    );

    TestResult {
        wpm,
        accuracy,
        errors: report.total,
        chars_typed,
        correct_chars: chars_typed.saturating_sub(report.total),
        time: elapsed_secs.max(0.0),
        invalid_pattern,
        text: reference.to_string(),
        error_details: report,
    }
}

pub fn compute_result_default(
    reference: &str,
    typed: &str,
    elapsed_secs: f64,
    invalid_pattern: bool,
) -> TestResult {
    compute_result(
        reference,
        typed,
        elapsed_secs,
        invalid_pattern,
        &ScoringPolicy::default(),
    )
}

/// Floored percentage of typed characters that were not errors.
pub fn accuracy_percent(chars_typed: usize, errors: usize) -> u32 {
    if chars_typed == 0 {
        return 0;
    }
    let ratio = (chars_typed as f64 - errors as f64) / chars_typed as f64;
    (ratio.max(0.0) * 100.0).floor() as u32
}

pub fn words_per_minute(
    typed: &str,
    chars_typed: usize,
    accuracy: u32,
    elapsed_secs: f64,
    invalid_pattern: bool,
    policy: &ScoringPolicy,
) -> u32 {
    let minutes = elapsed_secs / 60.0;
    if !minutes.is_finite() || minutes <= 0.0 {
        return 0;
    }

    let chars = chars_typed as f64;
    let raw = if invalid_pattern || accuracy < policy.low_accuracy_threshold {
        (chars / 5.0) * accuracy as f64 / 100.0 / minutes
    } else {
        let real_words = typed
            .split_whitespace()
            .filter(|w| w.chars().count() >= policy.real_word_min_len)
            .count();
        if real_words > policy.real_word_threshold {
            real_words as f64 / minutes
        } else {
            (chars / 5.0) / minutes
        }
    };

    (raw.floor() as u32).min(policy.wpm_ceiling)
}
