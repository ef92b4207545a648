//! Database module - SQLite storage for finished sessions

use std::collections::BTreeSet;

use anyhow::Result;
use chrono::{DateTime, Local, NaiveDate, Utc};
use rusqlite::{Connection, params};
use serde::{Deserialize, Serialize};

use crate::session::SessionReport;

/// Finished session record
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionRecord {
    pub id: Option<i64>,
    pub workout: String,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub finish: String, // "completed" | "early"
    pub completed_sets: i32,
    pub total_sets: i32,
    pub notes: Option<String>,
}

/// Per-exercise outcome of a session
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExerciseRecord {
    pub exercise_id: String,
    pub name: String,
    pub info: String,
    pub category: String,
    pub original_id: Option<String>,
    pub sets_done: i32,
    pub sets_total: i32,
}

/// Note attached to an exercise via `@mention`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExerciseNote {
    pub exercise_id: String,
    pub exercise_name: String,
    pub note: String,
}

fn parse_date(s: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(s)
        .map(|d| d.with_timezone(&Utc))
        .unwrap_or_else(|_| Utc::now())
}

/// Database wrapper
pub struct Database {
    conn: Connection,
}

impl Database {
    /// Open or create database (":memory:" for a throwaway one)
    pub fn open(path: &str) -> Result<Self> {
        let conn = Connection::open(path)?;
        let db = Self { conn };
        db.init_schema()?;
        Ok(db)
    }

    /// Initialize database schema
    fn init_schema(&self) -> Result<()> {
        self.conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS sessions (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                workout TEXT NOT NULL,
                started_at TEXT NOT NULL,
                finished_at TEXT NOT NULL,
                finish TEXT NOT NULL,
                completed_sets INTEGER NOT NULL,
                total_sets INTEGER NOT NULL,
                notes TEXT
            );
            CREATE TABLE IF NOT EXISTS session_exercises (
                session_id INTEGER NOT NULL REFERENCES sessions(id),
                position INTEGER NOT NULL,
                exercise_id TEXT NOT NULL,
                name TEXT NOT NULL,
                info TEXT NOT NULL,
                category TEXT NOT NULL,
                original_id TEXT,
                sets_done INTEGER NOT NULL,
                sets_total INTEGER NOT NULL
            );
            CREATE TABLE IF NOT EXISTS exercise_notes (
                session_id INTEGER NOT NULL REFERENCES sessions(id),
                exercise_id TEXT NOT NULL,
                exercise_name TEXT NOT NULL,
                note TEXT NOT NULL
            );",
        )?;
        Ok(())
    }

    /// Store a finished session with its exercises and mention notes
    pub fn add_session(&self, report: &SessionReport) -> Result<i64> {
        let tx = self.conn.unchecked_transaction()?;

        let notes = Some(report.notes.trim()).filter(|n| !n.is_empty());
        tx.execute(
            "INSERT INTO sessions (workout, started_at, finished_at, finish, completed_sets, total_sets, notes) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                report.workout_name,
                report.started_at.to_rfc3339(),
                report.finished_at.to_rfc3339(),
                report.finish.as_str(),
                report.completed_sets as i64,
                report.total_sets as i64,
                notes,
            ],
        )?;
        let session_id = tx.last_insert_rowid();

        for (position, exercise) in report.exercises.iter().enumerate() {
            let sets = report.progress.get(&exercise.id);
            let sets_done = sets.map(|s| s.iter().filter(|d| **d).count()).unwrap_or(0);
            let sets_total = sets.map(Vec::len).unwrap_or(0);
            tx.execute(
                "INSERT INTO session_exercises (session_id, position, exercise_id, name, info, category, original_id, sets_done, sets_total) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
                params![
                    session_id,
                    position as i64,
                    exercise.id,
                    exercise.name,
                    exercise.info,
                    exercise.category.label(),
                    exercise.original_id,
                    sets_done as i64,
                    sets_total as i64,
                ],
            )?;
        }

        for (exercise_id, note) in &report.exercise_notes {
            let name = report
                .exercises
                .iter()
                .find(|e| &e.id == exercise_id)
                .map(|e| e.name.as_str())
                .unwrap_or(exercise_id.as_str());
            tx.execute(
                "INSERT INTO exercise_notes (session_id, exercise_id, exercise_name, note) VALUES (?1, ?2, ?3, ?4)",
                params![session_id, exercise_id, name, note],
            )?;
        }

        tx.commit()?;
        Ok(session_id)
    }

    /// Most recent sessions first
    pub fn get_sessions(&self, limit: usize) -> Result<Vec<SessionRecord>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, workout, started_at, finished_at, finish, completed_sets, total_sets, notes FROM sessions ORDER BY finished_at DESC, id DESC LIMIT ?1"
        )?;

        let sessions = stmt
            .query_map(params![limit as i64], |row| {
                let started: String = row.get(2)?;
                let finished: String = row.get(3)?;
                Ok(SessionRecord {
                    id: Some(row.get(0)?),
                    workout: row.get(1)?,
                    started_at: parse_date(&started),
                    finished_at: parse_date(&finished),
                    finish: row.get(4)?,
                    completed_sets: row.get(5)?,
                    total_sets: row.get(6)?,
                    notes: row.get(7)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(sessions)
    }

    pub fn session_exercises(&self, session_id: i64) -> Result<Vec<ExerciseRecord>> {
        let mut stmt = self.conn.prepare(
            "SELECT exercise_id, name, info, category, original_id, sets_done, sets_total FROM session_exercises WHERE session_id = ?1 ORDER BY position"
        )?;

        let exercises = stmt
            .query_map(params![session_id], |row| {
                Ok(ExerciseRecord {
                    exercise_id: row.get(0)?,
                    name: row.get(1)?,
                    info: row.get(2)?,
                    category: row.get(3)?,
                    original_id: row.get(4)?,
                    sets_done: row.get(5)?,
                    sets_total: row.get(6)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(exercises)
    }

    pub fn exercise_notes(&self, session_id: i64) -> Result<Vec<ExerciseNote>> {
        let mut stmt = self.conn.prepare(
            "SELECT exercise_id, exercise_name, note FROM exercise_notes WHERE session_id = ?1 ORDER BY rowid"
        )?;

        let notes = stmt
            .query_map(params![session_id], |row| {
                Ok(ExerciseNote {
                    exercise_id: row.get(0)?,
                    exercise_name: row.get(1)?,
                    note: row.get(2)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(notes)
    }

    /// Consecutive days with a finished session, counting back from `today`.
    /// A streak that ended yesterday is still alive.
    pub fn streak_days(&self, today: NaiveDate) -> Result<u32> {
        let mut stmt = self.conn.prepare("SELECT finished_at FROM sessions")?;
        let days: BTreeSet<NaiveDate> = stmt
            .query_map([], |row| row.get::<_, String>(0))?
            .collect::<Result<Vec<_>, _>>()?
            .iter()
            .map(|s| parse_date(s).with_timezone(&Local).date_naive())
            .collect();

        let mut day = if days.contains(&today) {
            today
        } else {
            today - chrono::Duration::days(1)
        };

        let mut streak = 0;
        while days.contains(&day) {
            streak += 1;
            day -= chrono::Duration::days(1);
        }
        Ok(streak)
    }
}
