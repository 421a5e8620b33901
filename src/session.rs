use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::diff::{diff_prefix, ErrorReport};
use crate::metrics::{accuracy_percent, compute_result, words_per_minute, ScoringPolicy, TestResult};
use crate::validator::{accepts_keystroke, invalid_pattern};

#[derive(Debug, Clone, PartialEq)]
pub struct SessionConfig {
    pub duration_secs: f64,
    /// Buffer length from which the context-dependent accept rules apply.
    pub min_context: usize,
    /// How many characters past the end of the reference may be typed.
    pub overrun: usize,
    pub policy: ScoringPolicy,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            duration_secs: 60.0,
            min_context: 5,
            overrun: 20,
            policy: ScoringPolicy::default(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Waiting,
    Running,
    Finished,
}

/// Speed at a whole second into the session.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WpmSample {
    pub t: f64,
    pub wpm: u32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LiveFeedback {
    pub report: ErrorReport,
    pub accuracy: u32,
    pub wpm: u32,
    pub remaining_secs: f64,
}

/// One timed run: the reference, the buffer typed so far and the countdown.
#[derive(Debug)]
pub struct Session {
    reference: String,
    reference_len: usize,
    typed: String,
    config: SessionConfig,
    elapsed_secs: f64,
    phase: Phase,
    evaluated: bool,
    samples: Vec<WpmSample>,
}

impl Session {
    pub fn new(reference: impl Into<String>, config: SessionConfig) -> Self {
        let reference = reference.into();
        Self {
            reference_len: reference.chars().count(),
            reference,
            typed: String::new(),
            config,
            elapsed_secs: 0.0,
            phase: Phase::Waiting,
            evaluated: false,
            samples: Vec::new(),
        }
    }

    pub fn reference(&self) -> &str {
        &self.reference
    }

    pub fn typed(&self) -> &str {
        &self.typed
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn has_started(&self) -> bool {
        self.phase != Phase::Waiting
    }

    pub fn has_finished(&self) -> bool {
        self.phase == Phase::Finished
    }

    pub fn elapsed_secs(&self) -> f64 {
        self.elapsed_secs
    }

    pub fn remaining_secs(&self) -> f64 {
        (self.config.duration_secs - self.elapsed_secs).max(0.0)
    }

    pub fn samples(&self) -> &[WpmSample] {
        &self.samples
    }

    /// Apply one keystroke. Returns false when it was dropped.
    pub fn type_char(&mut self, c: char) -> bool {
        if self.has_finished() || c.is_control() {
            return false;
        }
        if self.typed.chars().count() >= self.reference_len + self.config.overrun {
            debug!(%c, "keystroke past overrun limit dropped");
            return false;
        }

        self.typed.push(c);
        if !accepts_keystroke(&self.typed, self.config.min_context) {
            self.typed.pop();
            debug!(%c, len = self.typed.chars().count(), "implausible keystroke dropped");
            return false;
        }

        if self.phase == Phase::Waiting {
            debug!(duration = self.config.duration_secs, "session started");
            self.phase = Phase::Running;
        }
        true
    }

    pub fn backspace(&mut self) -> bool {
        if self.has_finished() {
            return false;
        }
        self.typed.pop().is_some()
    }

    /// Advance the countdown. Time only runs once the first key is accepted.
    pub fn on_tick(&mut self, secs: f64) {
        if self.phase != Phase::Running || secs.is_nan() || secs <= 0.0 {
            return;
        }

        let before = self.elapsed_secs;
        self.elapsed_secs = (self.elapsed_secs + secs).min(self.config.duration_secs);
        if self.elapsed_secs.floor() > before.floor() {
            let wpm = self.live().wpm;
            self.samples.push(WpmSample {
                t: self.elapsed_secs.floor(),
                wpm,
            });
        }

        if self.elapsed_secs >= self.config.duration_secs {
            debug!("session time expired");
            self.phase = Phase::Finished;
        }
    }

    /// End the session early.
    pub fn stop(&mut self) {
        if !self.has_finished() {
            debug!(elapsed = self.elapsed_secs, "session stopped");
            self.phase = Phase::Finished;
        }
    }

    pub fn live(&self) -> LiveFeedback {
        let report = diff_prefix(&self.reference, &self.typed);
        let chars = self.typed.chars().count();
        let accuracy = accuracy_percent(chars, report.total);
        let wpm = words_per_minute(
            &self.typed,
            chars,
            accuracy,
            self.elapsed_secs,
            false,
            &self.config.policy,
        );
        LiveFeedback {
            report,
            accuracy,
            wpm,
            remaining_secs: self.remaining_secs(),
        }
    }

    /// Score the session. Only the first call yields a result, so a manual
    /// stop racing the timer cannot score twice.
    pub fn finish(&mut self) -> Option<TestResult> {
        if self.evaluated {
            return None;
        }
        self.evaluated = true;
        self.phase = Phase::Finished;

        let flag = invalid_pattern(&self.typed);
        let result = compute_result(
            &self.reference,
            &self.typed,
            self.elapsed_secs.min(self.config.duration_secs),
            flag.is_some(),
            &self.config.policy,
        );
        debug!(
            wpm = result.wpm,
            accuracy = result.accuracy,
            errors = result.errors,
            invalid_pattern = ?flag,
            "session scored"
        );
        Some(result)
    }
}
