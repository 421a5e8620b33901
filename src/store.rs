use chrono::{DateTime, Local, NaiveDate};
use rusqlite::{params, Connection, OptionalExtension, Row};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashSet};
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::info;

use crate::achievements::{
    self, Achievement, AchievementKind, Progress, PERFECT_RUN_MIN_CHARS,
};
use crate::admission::{admit, Submission};
use crate::app_dirs::AppDirs;
use crate::diff::ErrorReport;
use crate::error::Result;

const SCHEMA: &str = r#"
    CREATE TABLE IF NOT EXISTS results (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        text TEXT NOT NULL,
        wpm INTEGER NOT NULL,
        submitted_wpm INTEGER NOT NULL,
        accuracy INTEGER NOT NULL,
        duration REAL NOT NULL,
        error_count INTEGER NOT NULL,
        characters INTEGER NOT NULL,
        error_details TEXT NOT NULL,
        created_at TEXT NOT NULL
    );
    CREATE INDEX IF NOT EXISTS idx_results_created_at ON results(created_at);
    CREATE TABLE IF NOT EXISTS achievements (
        key TEXT PRIMARY KEY,
        unlocked_at TEXT NOT NULL
    );
"#;

const RESULT_COLUMNS: &str =
    "id, text, wpm, accuracy, duration, error_count, characters, error_details, created_at";

/// Reply of the "save result" endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SaveResponse {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unlocked_achievements: Option<Vec<Achievement>>,
}

/// One admitted result as kept in history. `wpm` is the gate-capped value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredResult {
    pub id: i64,
    pub text: String,
    pub wpm: u32,
    pub accuracy: u32,
    pub duration: f64,
    pub error_count: usize,
    pub characters: usize,
    pub error_details: ErrorReport,
    pub created_at: DateTime<Local>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Summary {
    pub tests: usize,
    pub best_wpm: u32,
    pub average_wpm: f64,
    pub average_accuracy: f64,
    /// Population standard deviation of wpm across all tests.
    pub wpm_std_dev: f64,
    pub current_streak_days: u32,
}

#[derive(Debug, Serialize)]
struct CsvRow<'a> {
    id: i64,
    created_at: String,
    wpm: u32,
    accuracy: u32,
    duration: f64,
    error_count: usize,
    characters: usize,
    text: &'a str,
}

/// SQLite-backed history of admitted results and unlocked achievements.
#[derive(Debug)]
pub struct ResultStore {
    conn: Connection,
}

impl ResultStore {
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        Self::init(Connection::open(path)?)
    }

    /// Open the database at the platform default location.
    pub fn open_default() -> Result<Self> {
        let path = AppDirs::db_path().unwrap_or_else(|| PathBuf::from("typomaster_results.db"));
        Self::open(&path)
    }

    pub fn open_in_memory() -> Result<Self> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> Result<Self> {
        conn.execute_batch(SCHEMA)?;
        Ok(Self { conn })
    }

    pub fn save_result(&mut self, submission: &Submission) -> Result<SaveResponse> {
        self.save_result_at(submission, Local::now())
    }

    /// Gate, persist and evaluate achievements as of `now`. A rejected
    /// submission writes nothing.
    pub fn save_result_at(
        &mut self,
        submission: &Submission,
        now: DateTime<Local>,
    ) -> Result<SaveResponse> {
        let admission = admit(submission);
        let capped_wpm = match (admission.accept, admission.capped_wpm) {
            (true, Some(wpm)) => wpm,
            _ => {
                return Ok(SaveResponse {
                    success: false,
                    message: admission.message.map(str::to_string),
                    unlocked_achievements: None,
                })
            }
        };

        let tx = self.conn.transaction()?;
        tx.execute(
            r#"
            INSERT INTO results
            (text, wpm, submitted_wpm, accuracy, duration, error_count, characters, error_details, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
            "#,
            params![
                submission.text,
                capped_wpm,
                submission.wpm,
                submission.accuracy,
                submission.duration,
                submission.error_count as i64,
                submission.characters as i64,
                serde_json::to_string(&submission.error_details)?,
                now.to_rfc3339(),
            ],
        )?;

        let progress = progress(&tx, now.date_naive())?;
        let unlocked = unlocked_kinds(&tx)?;
        let earned = achievements::newly_earned(&progress, &unlocked);
        for kind in &earned {
            tx.execute(
                "INSERT INTO achievements (key, unlocked_at) VALUES (?1, ?2)",
                params![kind.key(), now.to_rfc3339()],
            )?;
        }
        tx.commit()?;

        info!(
            wpm = capped_wpm,
            accuracy = submission.accuracy,
            unlocked = earned.len(),
            "result saved"
        );

        Ok(SaveResponse {
            success: true,
            message: Some("Result saved".to_string()),
            unlocked_achievements: Some(
                earned
                    .into_iter()
                    .map(|kind| Achievement::new(kind, now))
                    .collect(),
            ),
        })
    }

    /// Most recent results first.
    pub fn history(&self, limit: usize) -> Result<Vec<StoredResult>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {RESULT_COLUMNS} FROM results ORDER BY id DESC LIMIT ?1"
        ))?;
        let rows = stmt.query_map([limit as i64], stored_result_from_row)?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    fn all_results(&self) -> Result<Vec<StoredResult>> {
        let mut stmt = self
            .conn
            .prepare(&format!("SELECT {RESULT_COLUMNS} FROM results ORDER BY id ASC"))?;
        let rows = stmt.query_map([], stored_result_from_row)?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    pub fn summary(&self) -> Result<Summary> {
        self.summary_at(Local::now().date_naive())
    }

    pub fn summary_at(&self, today: NaiveDate) -> Result<Summary> {
        let wpms: Vec<f64> = self
            .all_results()?
            .iter()
            .map(|r| r.wpm as f64)
            .collect();
        if wpms.is_empty() {
            return Ok(Summary::default());
        }

        let (best_wpm, average_accuracy): (u32, f64) = self.conn.query_row(
            "SELECT MAX(wpm), AVG(accuracy) FROM results",
            [],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )?;
        let average_wpm = wpms.iter().sum::<f64>() / wpms.len() as f64;

        Ok(Summary {
            tests: wpms.len(),
            best_wpm,
            average_wpm,
            average_accuracy,
            wpm_std_dev: population_std_dev(&wpms, average_wpm),
            current_streak_days: achievements::current_streak(&practice_days(&self.conn)?, today),
        })
    }

    pub fn achievements(&self) -> Result<Vec<Achievement>> {
        let mut stmt = self
            .conn
            .prepare("SELECT key, unlocked_at FROM achievements ORDER BY unlocked_at, key")?;
        let rows = stmt.query_map([], |row| {
            let key: String = row.get(0)?;
            let unlocked_at: String = row.get(1)?;
            Ok((key, unlocked_at))
        })?;

        let mut unlocked = Vec::new();
        for row in rows {
            let (key, unlocked_at) = row?;
            if let Some(kind) = AchievementKind::from_key(&key) {
                unlocked.push(Achievement::new(kind, parse_timestamp(&unlocked_at, 1)?));
            }
        }
        Ok(unlocked)
    }

    /// Write the full history, oldest first, as CSV.
    pub fn export_csv<W: Write>(&self, writer: W) -> Result<()> {
        let mut csv = csv::Writer::from_writer(writer);
        for result in self.all_results()? {
            csv.serialize(CsvRow {
                id: result.id,
                created_at: result.created_at.to_rfc3339(),
                wpm: result.wpm,
                accuracy: result.accuracy,
                duration: result.duration,
                error_count: result.error_count,
                characters: result.characters,
                text: &result.text,
            })?;
        }
        csv.flush()?;
        Ok(())
    }

    pub fn clear(&self) -> Result<()> {
        self.conn
            .execute_batch("DELETE FROM results; DELETE FROM achievements;")?;
        Ok(())
    }

    pub fn latest(&self) -> Result<Option<StoredResult>> {
        Ok(self
            .conn
            .query_row(
                &format!("SELECT {RESULT_COLUMNS} FROM results ORDER BY id DESC LIMIT 1"),
                [],
                stored_result_from_row,
            )
            .optional()?)
    }
}

fn stored_result_from_row(row: &Row<'_>) -> rusqlite::Result<StoredResult> {
    let details: String = row.get(7)?;
    let error_details = serde_json::from_str(&details).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(7, rusqlite::types::Type::Text, Box::new(e))
    })?;
    let created_at: String = row.get(8)?;

    Ok(StoredResult {
        id: row.get(0)?,
        text: row.get(1)?,
        wpm: row.get(2)?,
        accuracy: row.get(3)?,
        duration: row.get(4)?,
        error_count: row.get::<_, i64>(5)? as usize,
        characters: row.get::<_, i64>(6)? as usize,
        error_details,
        created_at: parse_timestamp(&created_at, 8)?,
    })
}

fn parse_timestamp(value: &str, column: usize) -> rusqlite::Result<DateTime<Local>> {
    DateTime::parse_from_rfc3339(value)
        .map(|ts| ts.with_timezone(&Local))
        .map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(
                column,
                rusqlite::types::Type::Text,
                Box::new(e),
            )
        })
}

fn practice_days(conn: &Connection) -> rusqlite::Result<BTreeSet<NaiveDate>> {
    let mut stmt = conn.prepare("SELECT created_at FROM results")?;
    let rows = stmt.query_map([], |row| row.get::<_, String>(0))?;
    let mut days = BTreeSet::new();
    for row in rows {
        days.insert(parse_timestamp(&row?, 0)?.date_naive());
    }
    Ok(days)
}

fn progress(conn: &Connection, today: NaiveDate) -> rusqlite::Result<Progress> {
    let (tests, best_wpm, perfect_runs): (i64, Option<u32>, i64) = conn.query_row(
        r#"
        SELECT
            COUNT(*),
            MAX(wpm),
            SUM(CASE WHEN accuracy = 100 AND characters >= ?1 THEN 1 ELSE 0 END)
        FROM results
        "#,
        [PERFECT_RUN_MIN_CHARS as i64],
        |row| Ok((row.get(0)?, row.get(1)?, row.get::<_, Option<i64>>(2)?.unwrap_or(0))),
    )?;

    Ok(Progress {
        tests: tests as usize,
        best_wpm: best_wpm.unwrap_or(0),
        perfect_runs: perfect_runs as usize,
        streak_days: achievements::current_streak(&practice_days(conn)?, today),
    })
}

fn unlocked_kinds(conn: &Connection) -> rusqlite::Result<HashSet<AchievementKind>> {
    let mut stmt = conn.prepare("SELECT key FROM achievements")?;
    let rows = stmt.query_map([], |row| row.get::<_, String>(0))?;
    let mut kinds = HashSet::new();
    for key in rows {
        if let Some(kind) = AchievementKind::from_key(&key?) {
            kinds.insert(kind);
        }
    }
    Ok(kinds)
}

fn population_std_dev(values: &[f64], mean: f64) -> f64 {
    let variance = values
        .iter()
        .map(|value| {
            let diff = mean - value;
            diff * diff
        })
        .sum::<f64>()
        / values.len() as f64;
    variance.sqrt()
}
