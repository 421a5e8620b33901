//! Policy deciding whether a computed result may be persisted or counted.
//!
//! The same rule table runs on the client side, over a [`TestResult`], and
//! on the server side, over a [`Submission`] that may have been tampered
//! with. Both go through [`admit`].

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::diff::ErrorReport;
use crate::metrics::TestResult;

pub const MIN_ACCURACY: u32 = 15;
pub const INCONSISTENT_WPM: u32 = 60;
pub const MAX_ERROR_RATIO: f64 = 0.7;
pub const HARD_ERROR_RATIO: f64 = 0.9;
pub const WPM_CEILING: u32 = 220;
pub const LOW_ACCURACY_WPM_CEILING: u32 = 120;
pub const LOW_ACCURACY_CAP_BELOW: u32 = 50;

/// The fields the gate looks at, whichever side produced them.
pub trait Admissible {
    fn wpm(&self) -> u32;
    fn accuracy(&self) -> u32;
    fn errors(&self) -> usize;
    fn characters(&self) -> usize;
    /// Seconds.
    fn duration(&self) -> f64;
    fn invalid_pattern(&self) -> bool;
}

impl Admissible for TestResult {
    fn wpm(&self) -> u32 {
        self.wpm
    }
    fn accuracy(&self) -> u32 {
        self.accuracy
    }
    fn errors(&self) -> usize {
        self.errors
    }
    fn characters(&self) -> usize {
        self.chars_typed
    }
    fn duration(&self) -> f64 {
        self.time
    }
    fn invalid_pattern(&self) -> bool {
        self.invalid_pattern
    }
}

/// Payload sent to the "save result" endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Submission {
    pub text: String,
    pub wpm: u32,
    pub accuracy: u32,
    /// Seconds.
    pub duration: f64,
    pub error_count: usize,
    pub characters: usize,
    #[serde(default)]
    pub error_details: ErrorReport,
    #[serde(default)]
    pub invalid_pattern: bool,
}

impl Submission {
    pub fn from_result(result: &TestResult) -> Self {
        Self {
            text: result.text.clone(),
            wpm: result.wpm,
            accuracy: result.accuracy,
            duration: result.time,
            error_count: result.errors,
            characters: result.chars_typed,
            error_details: result.error_details.clone(),
            invalid_pattern: result.invalid_pattern,
        }
    }
}

impl Admissible for Submission {
    fn wpm(&self) -> u32 {
        self.wpm
    }
    fn accuracy(&self) -> u32 {
        self.accuracy
    }
    fn errors(&self) -> usize {
        self.error_count
    }
    fn characters(&self) -> usize {
        self.characters
    }
    fn duration(&self) -> f64 {
        self.duration
    }
    fn invalid_pattern(&self) -> bool {
        self.invalid_pattern
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, strum_macros::Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum RejectReason {
    InvalidPattern,
    OutOfRange,
    InconsistentSpeed,
    LowAccuracy,
    TooManyErrors,
    ErrorRatio,
}

impl RejectReason {
    /// User-facing explanation.
    pub fn message(&self) -> &'static str {
        match self {
            RejectReason::InvalidPattern => "Invalid typing pattern detected",
            RejectReason::OutOfRange => "Result fields are outside their valid range",
            RejectReason::InconsistentSpeed => {
                "High speed with very low accuracy is not a plausible result"
            }
            RejectReason::LowAccuracy => "Accuracy too low to record this result",
            RejectReason::TooManyErrors => "Too many errors to record this result",
            RejectReason::ErrorRatio => "Error count too close to the number of characters typed",
        }
    }
}

pub struct Rule {
    pub reason: RejectReason,
    pub rejects: fn(&dyn Admissible) -> bool,
}

/// Evaluated in order; the first matching rule names the rejection.
pub const RULES: &[Rule] = &[
    Rule {
        reason: RejectReason::InvalidPattern,
        rejects: flagged_pattern,
    },
    Rule {
        reason: RejectReason::OutOfRange,
        rejects: out_of_range,
    },
    Rule {
        reason: RejectReason::InconsistentSpeed,
        rejects: fast_but_inaccurate,
    },
    Rule {
        reason: RejectReason::LowAccuracy,
        rejects: low_accuracy,
    },
    Rule {
        reason: RejectReason::TooManyErrors,
        rejects: too_many_errors,
    },
    Rule {
        reason: RejectReason::ErrorRatio,
        rejects: error_ratio,
    },
];

fn flagged_pattern(result: &dyn Admissible) -> bool {
    result.invalid_pattern()
}

/// Accuracy above 100 % or a duration that is not a positive number.
fn out_of_range(result: &dyn Admissible) -> bool {
    let duration = result.duration();
    result.accuracy() > 100 || !duration.is_finite() || duration <= 0.0
}

fn fast_but_inaccurate(result: &dyn Admissible) -> bool {
    result.accuracy() < MIN_ACCURACY && result.wpm() > INCONSISTENT_WPM
}

fn low_accuracy(result: &dyn Admissible) -> bool {
    result.accuracy() < MIN_ACCURACY
}

fn too_many_errors(result: &dyn Admissible) -> bool {
    result.errors() as f64 > result.characters() as f64 * MAX_ERROR_RATIO
}

fn error_ratio(result: &dyn Admissible) -> bool {
    result.errors() as f64 >= result.characters() as f64 * HARD_ERROR_RATIO
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Admission {
    pub accept: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<RejectReason>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<&'static str>,
    /// Speed re-clamped by the gate, present only when accepted.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub capped_wpm: Option<u32>,
}

impl Admission {
    fn rejected(reason: RejectReason) -> Self {
        Self {
            accept: false,
            reason: Some(reason),
            message: Some(reason.message()),
            capped_wpm: None,
        }
    }

    fn accepted(capped_wpm: u32) -> Self {
        Self {
            accept: true,
            reason: None,
            message: None,
            capped_wpm: Some(capped_wpm),
        }
    }
}

pub fn admit(result: &dyn Admissible) -> Admission {
    if let Some(rule) = RULES.iter().find(|rule| (rule.rejects)(result)) {
        warn!(
            reason = %rule.reason,
            wpm = result.wpm(),
            accuracy = result.accuracy(),
            errors = result.errors(),
            characters = result.characters(),
            "result rejected"
        );
        return Admission::rejected(rule.reason);
    }
    Admission::accepted(capped_wpm(result.wpm(), result.accuracy()))
}

/// Second clamp, independent of whatever ceiling the client applied.
pub fn capped_wpm(wpm: u32, accuracy: u32) -> u32 {
    let ceiling = if accuracy < LOW_ACCURACY_CAP_BELOW {
        LOW_ACCURACY_WPM_CEILING
    } else {
        WPM_CEILING
    };
    wpm.min(ceiling)
}
