//! Milestones unlocked by admitted results.

use chrono::{DateTime, Days, Local, NaiveDate};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashSet};
use std::fmt;

/// Results at or above this length are long enough for a perfect run to count.
pub const PERFECT_RUN_MIN_CHARS: usize = 50;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AchievementKind {
    #[serde(rename = "first_test")]
    FirstTest,
    #[serde(rename = "speed_50")]
    Speed50,
    #[serde(rename = "speed_80")]
    Speed80,
    #[serde(rename = "speed_100")]
    Speed100,
    #[serde(rename = "perfect_accuracy")]
    PerfectAccuracy,
    #[serde(rename = "dedicated")]
    Dedicated,
    #[serde(rename = "streak_3")]
    Streak3,
    #[serde(rename = "streak_7")]
    Streak7,
}

pub const ALL: [AchievementKind; 8] = [
    AchievementKind::FirstTest,
    AchievementKind::Speed50,
    AchievementKind::Speed80,
    AchievementKind::Speed100,
    AchievementKind::PerfectAccuracy,
    AchievementKind::Dedicated,
    AchievementKind::Streak3,
    AchievementKind::Streak7,
];

impl AchievementKind {
    /// Stable key used in storage and on the wire.
    pub fn key(&self) -> &'static str {
        match self {
            AchievementKind::FirstTest => "first_test",
            AchievementKind::Speed50 => "speed_50",
            AchievementKind::Speed80 => "speed_80",
            AchievementKind::Speed100 => "speed_100",
            AchievementKind::PerfectAccuracy => "perfect_accuracy",
            AchievementKind::Dedicated => "dedicated",
            AchievementKind::Streak3 => "streak_3",
            AchievementKind::Streak7 => "streak_7",
        }
    }

    pub fn from_key(key: &str) -> Option<Self> {
        ALL.into_iter().find(|kind| kind.key() == key)
    }

    pub fn title(&self) -> &'static str {
        match self {
            AchievementKind::FirstTest => "First Steps",
            AchievementKind::Speed50 => "Getting Quick",
            AchievementKind::Speed80 => "Fast Fingers",
            AchievementKind::Speed100 => "Triple Digits",
            AchievementKind::PerfectAccuracy => "Flawless",
            AchievementKind::Dedicated => "Dedicated",
            AchievementKind::Streak3 => "On a Roll",
            AchievementKind::Streak7 => "Week Streak",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            AchievementKind::FirstTest => "Complete your first typing test",
            AchievementKind::Speed50 => "Reach 50 wpm",
            AchievementKind::Speed80 => "Reach 80 wpm",
            AchievementKind::Speed100 => "Reach 100 wpm",
            AchievementKind::PerfectAccuracy => "Finish a test of 50+ characters with 100% accuracy",
            AchievementKind::Dedicated => "Complete 10 typing tests",
            AchievementKind::Streak3 => "Practice three days in a row",
            AchievementKind::Streak7 => "Practice seven days in a row",
        }
    }

    pub fn is_earned(&self, progress: &Progress) -> bool {
        match self {
            AchievementKind::FirstTest => progress.tests >= 1,
            AchievementKind::Speed50 => progress.best_wpm >= 50,
            AchievementKind::Speed80 => progress.best_wpm >= 80,
            AchievementKind::Speed100 => progress.best_wpm >= 100,
            AchievementKind::PerfectAccuracy => progress.perfect_runs >= 1,
            AchievementKind::Dedicated => progress.tests >= 10,
            AchievementKind::Streak3 => progress.streak_days >= 3,
            AchievementKind::Streak7 => progress.streak_days >= 7,
        }
    }
}

impl fmt::Display for AchievementKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Achievement {
    pub kind: AchievementKind,
    pub title: String,
    pub description: String,
    pub unlocked_at: DateTime<Local>,
}

impl Achievement {
    pub fn new(kind: AchievementKind, unlocked_at: DateTime<Local>) -> Self {
        Self {
            kind,
            title: kind.title().to_string(),
            description: kind.description().to_string(),
            unlocked_at,
        }
    }
}

/// Aggregate history the achievement rules look at.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Progress {
    pub tests: usize,
    pub best_wpm: u32,
    pub perfect_runs: usize,
    pub streak_days: u32,
}

/// Achievements earned by `progress` that are not yet in `unlocked`.
pub fn newly_earned(
    progress: &Progress,
    unlocked: &HashSet<AchievementKind>,
) -> Vec<AchievementKind> {
    ALL.into_iter()
        .filter(|kind| !unlocked.contains(kind) && kind.is_earned(progress))
        .collect()
}

/// Consecutive practice days ending today, or yesterday when nothing has
/// been typed yet today.
pub fn current_streak(days: &BTreeSet<NaiveDate>, today: NaiveDate) -> u32 {
    let start = if days.contains(&today) {
        today
    } else {
        match today.checked_sub_days(Days::new(1)) {
            Some(yesterday) if days.contains(&yesterday) => yesterday,
            _ => return 0,
        }
    };

    let mut streak = 0;
    let mut day = start;
    while days.contains(&day) {
        streak += 1;
        match day.checked_sub_days(Days::new(1)) {
            Some(previous) => day = previous,
            None => break,
        }
    }
    streak
}
