//! Session history - the completion handler that persists finished sessions

use std::sync::{Arc, Mutex};

use anyhow::{Result, anyhow};
use chrono::Local;
use tracing::info;

use crate::db::Database;
use crate::session::{CompletionHandler, SessionReport};

/// Writes finished sessions to the database and tracks the streak
pub struct HistoryRecorder {
    db: Arc<Mutex<Database>>,
}

impl HistoryRecorder {
    pub fn new(db: Arc<Mutex<Database>>) -> Self {
        Self { db }
    }

    /// Current streak of training days
    pub fn streak(&self) -> Result<u32> {
        let db = self.db.lock().map_err(|e| anyhow!("database lock poisoned: {e}"))?;
        db.streak_days(Local::now().date_naive())
    }
}

impl CompletionHandler for HistoryRecorder {
    fn on_complete(&self, report: &SessionReport) -> Result<()> {
        let db = self.db.lock().map_err(|e| anyhow!("database lock poisoned: {e}"))?;
        let id = db.add_session(report)?;
        let streak = db.streak_days(Local::now().date_naive())?;
        info!(
            session_id = id,
            notes = report.exercise_notes.len(),
            streak,
            "session saved"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::FinishKind;
    use crate::workout::default_workout;
    use chrono::Utc;
    use std::collections::BTreeMap;

    fn create_report() -> SessionReport {
        let workout = default_workout();
        let progress = workout
            .exercises
            .iter()
            .map(|e| (e.id.clone(), vec![true]))
            .collect();
        SessionReport {
            workout_name: workout.name,
            started_at: Utc::now(),
            finished_at: Utc::now(),
            finish: FinishKind::Completed,
            exercises: workout.exercises,
            progress,
            completed_sets: 6,
            total_sets: 6,
            notes: String::new(),
            exercise_notes: BTreeMap::new(),
        }
    }

    #[test]
    fn test_recorder_persists_and_counts_streak() {
        let db = Arc::new(Mutex::new(Database::open(":memory:").unwrap()));
        let recorder = HistoryRecorder::new(db.clone());
        assert_eq!(recorder.streak().unwrap(), 0);

        recorder.on_complete(&create_report()).unwrap();
        assert_eq!(recorder.streak().unwrap(), 1);

        let sessions = db.lock().unwrap().get_sessions(5).unwrap();
        assert_eq!(sessions.len(), 1);
        assert_eq!(sessions[0].workout, "Full Body Basics");
        assert_eq!(sessions[0].notes, None);
    }
}
