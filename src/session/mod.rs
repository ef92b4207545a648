//! Workout session - live progress of one workout attempt
//!
//! [`SessionState`] holds the raw state and its transitions. [`WorkoutSession`]
//! wraps it, runs the auto-advance policy after every mutation and owns the
//! one-shot completion handoff.

pub mod error;
pub mod progress;
pub mod state;

pub use error::SessionError;
pub use progress::{AdvanceStep, CategoryProgress, ProgressSummary};
pub use state::{MAX_SETS, ProgressMap, SessionEvent, SessionState, SetProgress, derive_set_count};

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::exercises::{Category, Exercise, Replacement};
use crate::mentions;
use crate::timer::{CancelToken, Timer};
use crate::workout::WorkoutDefinition;

/// Default pause between reaching 100% and handing the session off
pub const DEFAULT_HANDOFF_DELAY: Duration = Duration::from_millis(1500);

/// Discrete signals for haptics / notifications
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Feedback {
    SetCompleted,
    ExerciseCompleted,
    SessionCompleted,
}

/// Receives feedback signals. Errors are logged and otherwise ignored.
pub trait FeedbackSink: Send + Sync {
    fn signal(&self, feedback: Feedback) -> anyhow::Result<()>;
}

/// Takes over a finished session (persistence, streaks, history)
pub trait CompletionHandler: Send + Sync {
    fn on_complete(&self, report: &SessionReport) -> anyhow::Result<()>;
}

/// Moves the app to the reflection step after handoff
pub trait Navigator: Send + Sync {
    fn open_reflection(&self, report: &SessionReport);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FinishKind {
    /// Every set was checked
    Completed,
    /// User finished with sets remaining
    Early,
}

impl FinishKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            FinishKind::Completed => "completed",
            FinishKind::Early => "early",
        }
    }
}

/// Immutable snapshot handed to the completion handler
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionReport {
    pub workout_name: String,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub finish: FinishKind,
    pub exercises: Vec<Exercise>,
    pub progress: ProgressMap,
    pub completed_sets: usize,
    pub total_sets: usize,
    pub notes: String,
    /// Exercise id -> note fragment from `@mentions`
    pub exercise_notes: BTreeMap<String, String>,
}

#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub handoff_delay: Duration,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            handoff_delay: DEFAULT_HANDOFF_DELAY,
        }
    }
}

/// External collaborators of a session
#[derive(Clone)]
pub struct Collaborators {
    pub feedback: Arc<dyn FeedbackSink>,
    pub completion: Arc<dyn CompletionHandler>,
    pub navigator: Arc<dyn Navigator>,
    pub timer: Arc<dyn Timer>,
}

/// An in-progress workout
pub struct WorkoutSession {
    workout_name: String,
    started_at: DateTime<Utc>,
    state: SessionState,
    config: SessionConfig,
    collaborators: Collaborators,
    /// Set once the handoff has been triggered; never reset
    finished: bool,
    /// Handoff waiting on its delay, with the snapshot taken at latch time
    pending_handoff: Option<(CancelToken, SessionReport)>,
}

impl WorkoutSession {
    pub fn start(
        workout: WorkoutDefinition,
        config: SessionConfig,
        collaborators: Collaborators,
    ) -> Self {
        info!(
            workout = %workout.name,
            exercises = workout.exercises.len(),
            "session started"
        );
        Self {
            workout_name: workout.name,
            started_at: Utc::now(),
            state: SessionState::new(workout.exercises),
            config,
            collaborators,
            finished: false,
            pending_handoff: None,
        }
    }

    pub fn workout_name(&self) -> &str {
        &self.workout_name
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn summary(&self) -> ProgressSummary {
        ProgressSummary::of(&self.state)
    }

    /// The completion handoff has fired (automatically or by early finish)
    pub fn is_finished(&self) -> bool {
        self.finished
    }

    pub fn toggle_set(&mut self, exercise_id: &str, set_index: usize) -> Result<(), SessionError> {
        self.apply(|state| state.toggle_set(exercise_id, set_index))
    }

    pub fn toggle_all_sets(&mut self, exercise_id: &str) -> Result<(), SessionError> {
        self.apply(|state| state.toggle_all_sets(exercise_id))
    }

    /// Swap the exercise in slot `original_id`. On `NotFound` nothing changes.
    pub fn swap_exercise(
        &mut self,
        original_id: &str,
        replacement: Replacement,
    ) -> Result<(), SessionError> {
        self.apply(|state| state.swap_exercise(original_id, replacement).map(|_| Vec::new()))
    }

    /// Collapse or expand a category on the user's behalf
    pub fn set_collapsed(&mut self, category: Category, collapsed: bool) {
        self.state.set_collapsed(category, collapsed, true);
    }

    pub fn toggle_category(&mut self, category: Category) {
        let collapsed = self.state.is_collapsed(category);
        self.set_collapsed(category, !collapsed);
    }

    pub fn set_notes(&mut self, text: &str) {
        self.state.set_notes(text);
    }

    /// Autocomplete candidates for the mention being typed in the notes
    pub fn mention_suggestions(&self) -> Vec<&Exercise> {
        mentions::suggest(self.state.notes(), self.state.exercises())
    }

    /// Accept a suggestion: rewrite the trailing mention to the exercise name
    pub fn complete_mention(&mut self, exercise_id: &str) -> Result<(), SessionError> {
        let Some(exercise) = self.state.exercise(exercise_id) else {
            return Err(SessionError::InvalidArgument(format!(
                "unknown exercise '{exercise_id}'"
            )));
        };
        let text = mentions::complete_mention(self.state.notes(), exercise);
        self.state.set_notes(&text);
        Ok(())
    }

    /// Early finish is allowed once at least one set is done
    pub fn can_finish(&self) -> bool {
        !self.finished && self.summary().completed_sets > 0
    }

    /// Finish now, before every set is done. Returns `false` (and does
    /// nothing) when no set has been completed or the session already ended.
    pub fn finish(&mut self) -> bool {
        if !self.can_finish() {
            debug!("finish ignored");
            return false;
        }
        self.finished = true;
        let report = self.report(FinishKind::Early);
        info!(
            completed = report.completed_sets,
            total = report.total_sets,
            "session finished early"
        );
        deliver(&self.collaborators, &report);
        true
    }

    /// Leave the session. A completed workout whose handoff is still
    /// waiting on its delay is delivered now, so it is never lost.
    pub fn exit(&mut self) {
        match self.pending_handoff.take() {
            Some((token, report)) if token.claim() => {
                info!("session exited during handoff delay, delivering now");
                deliver(&self.collaborators, &report);
            }
            _ => debug!("session exited"),
        }
    }

    /// Snapshot of the session as it is right now
    pub fn report(&self, finish: FinishKind) -> SessionReport {
        let summary = self.summary();
        let exercises: Vec<Exercise> = self.state.exercises().cloned().collect();
        let exercise_notes = mentions::resolve_exercise_notes(self.state.notes(), &exercises);
        SessionReport {
            workout_name: self.workout_name.clone(),
            started_at: self.started_at,
            finished_at: Utc::now(),
            finish,
            exercises,
            progress: self.state.progress().clone(),
            completed_sets: summary.completed_sets,
            total_sets: summary.total_sets,
            notes: self.state.notes().to_string(),
            exercise_notes,
        }
    }

    /// Run one mutation, then auto-advance, feedback and completion checks
    fn apply<F>(&mut self, mutation: F) -> Result<(), SessionError>
    where
        F: FnOnce(&mut SessionState) -> Result<Vec<SessionEvent>, SessionError>,
    {
        let before = progress::category_completion(&self.state);
        let events = mutation(&mut self.state)?;
        progress::auto_advance(&mut self.state, &before);

        for event in &events {
            let feedback = match event {
                SessionEvent::SetChecked { .. } => Feedback::SetCompleted,
                SessionEvent::SetsCompleted(_) => Feedback::ExerciseCompleted,
            };
            self.signal(feedback);
        }

        self.check_completion();
        Ok(())
    }

    fn check_completion(&mut self) {
        if self.finished || !self.summary().is_complete() {
            return;
        }
        self.finished = true;
        self.signal(Feedback::SessionCompleted);

        let report = self.report(FinishKind::Completed);
        info!(
            total = report.total_sets,
            delay_ms = self.config.handoff_delay.as_millis() as u64,
            "workout complete, scheduling handoff"
        );

        let token = CancelToken::new();
        let claim = token.clone();
        let collaborators = self.collaborators.clone();
        let snapshot = report.clone();
        self.collaborators.timer.schedule(
            self.config.handoff_delay,
            token.clone(),
            Box::new(move || {
                if claim.claim() {
                    deliver(&collaborators, &snapshot);
                }
            }),
        );
        self.pending_handoff = Some((token, report));
    }

    fn signal(&self, feedback: Feedback) {
        if let Err(e) = self.collaborators.feedback.signal(feedback) {
            warn!("feedback {:?} failed: {:#}", feedback, e);
        }
    }
}

fn deliver(collaborators: &Collaborators, report: &SessionReport) {
    info!(
        workout = %report.workout_name,
        finish = report.finish.as_str(),
        "handing off session"
    );
    if let Err(e) = collaborators.completion.on_complete(report) {
        warn!("completion handler failed: {:#}", e);
    }
    collaborators.navigator.open_reflection(report);
}
