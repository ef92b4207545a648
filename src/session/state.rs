//! Session state store - set progress, swaps, collapse flags and notes

use std::collections::{BTreeMap, BTreeSet, HashMap};

use tracing::debug;

use super::error::SessionError;
use crate::exercises::{Category, Exercise, Replacement};

/// Upper bound on toggleable sets per exercise
pub const MAX_SETS: usize = 4;

/// Tokens that mark a time/distance prescription (one "set")
const DURATION_UNITS: &[&str] = &["min", "km", "sec"];

/// One boolean per set, fixed length per exercise
pub type SetProgress = Vec<bool>;

/// Progress of every exercise, keyed by the stable exercise id
pub type ProgressMap = BTreeMap<String, SetProgress>;

/// Derive the number of toggleable sets from a prescription like "3x12".
///
/// Time/distance prescriptions count as one set. Otherwise the leading
/// integer before the first `x` is used, falling back to 1 and capped at
/// [`MAX_SETS`]: a 5x10 exercise is complete after four taps.
pub fn derive_set_count(info: &str) -> usize {
    let lower = info.to_lowercase();
    if has_duration_unit(&lower) {
        return 1;
    }

    let head = lower.split('x').next().unwrap_or_default().trim_start();
    let digits: String = head.chars().take_while(|c| c.is_ascii_digit()).collect();

    match digits.parse::<usize>() {
        Ok(n) if n > 0 => n.min(MAX_SETS),
        // Overflowing digit runs are still "many sets"
        Err(_) if !digits.is_empty() => MAX_SETS,
        _ => 1,
    }
}

/// A word (digits stripped, so "20min" counts) starting with a unit.
/// "dominant" or "reminder" contain "min" but are not units.
fn has_duration_unit(lower: &str) -> bool {
    lower
        .split(|c: char| !c.is_alphanumeric())
        .map(|word| word.trim_start_matches(|c: char| c.is_ascii_digit()))
        .any(|word| DURATION_UNITS.iter().any(|unit| word.starts_with(unit)))
}

/// Things the store reports back after a mutation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    /// A single set was checked (not unchecked)
    SetChecked { exercise_id: String, set_index: usize },
    /// The exercise just became fully complete
    SetsCompleted(String),
}

/// Live state of an in-progress workout
#[derive(Debug, Clone, PartialEq)]
pub struct SessionState {
    /// Seeded slots, in plan order
    exercises: Vec<Exercise>,
    /// Original id -> replacement currently occupying that slot
    swaps: HashMap<String, Exercise>,
    progress: ProgressMap,
    collapsed: BTreeMap<Category, bool>,
    user_touched: BTreeSet<Category>,
    notes: String,
}

impl SessionState {
    /// Seed a session from the workout's exercise list.
    ///
    /// The first category that has exercises starts expanded, the rest
    /// start collapsed.
    pub fn new(exercises: Vec<Exercise>) -> Self {
        let progress = exercises
            .iter()
            .map(|e| (e.id.clone(), vec![false; derive_set_count(&e.info)]))
            .collect();

        let first_active = Category::all()
            .iter()
            .copied()
            .find(|c| exercises.iter().any(|e| e.category == *c))
            .unwrap_or(Category::Warmup);

        let collapsed = Category::all()
            .iter()
            .map(|c| (*c, *c != first_active))
            .collect();

        Self {
            exercises,
            swaps: HashMap::new(),
            progress,
            collapsed,
            user_touched: BTreeSet::new(),
            notes: String::new(),
        }
    }

    /// Current exercises (swaps applied), in plan order
    pub fn exercises(&self) -> impl Iterator<Item = &Exercise> {
        self.exercises
            .iter()
            .map(|e| self.swaps.get(&e.id).unwrap_or(e))
    }

    /// Current exercises of one category, in plan order
    pub fn exercises_in(&self, category: Category) -> impl Iterator<Item = &Exercise> {
        self.exercises().filter(move |e| e.category == category)
    }

    pub fn exercise(&self, id: &str) -> Option<&Exercise> {
        self.exercises().find(|e| e.id == id)
    }

    pub fn swaps(&self) -> &HashMap<String, Exercise> {
        &self.swaps
    }

    pub fn progress(&self) -> &ProgressMap {
        &self.progress
    }

    pub fn sets(&self, exercise_id: &str) -> Option<&[bool]> {
        self.progress.get(exercise_id).map(Vec::as_slice)
    }

    pub fn is_exercise_done(&self, exercise_id: &str) -> bool {
        self.sets(exercise_id)
            .is_some_and(|sets| sets.iter().all(|done| *done))
    }

    pub fn is_collapsed(&self, category: Category) -> bool {
        self.collapsed.get(&category).copied().unwrap_or(true)
    }

    pub fn is_user_touched(&self, category: Category) -> bool {
        self.user_touched.contains(&category)
    }

    pub fn notes(&self) -> &str {
        &self.notes
    }

    /// Flip one set of an exercise
    pub fn toggle_set(
        &mut self,
        exercise_id: &str,
        set_index: usize,
    ) -> Result<Vec<SessionEvent>, SessionError> {
        let sets = self.sets_mut(exercise_id)?;
        let len = sets.len();
        let Some(set) = sets.get_mut(set_index) else {
            return Err(SessionError::InvalidArgument(format!(
                "set {set_index} out of range for '{exercise_id}' ({len} sets)"
            )));
        };

        *set = !*set;
        let checked = *set;
        let now_done = sets.iter().all(|done| *done);
        debug!(exercise_id, set_index, checked, "toggled set");

        let mut events = Vec::new();
        if checked {
            events.push(SessionEvent::SetChecked {
                exercise_id: exercise_id.to_string(),
                set_index,
            });
            if now_done {
                events.push(SessionEvent::SetsCompleted(exercise_id.to_string()));
            }
        }
        Ok(events)
    }

    /// Complete every set, or clear them all if they are already complete
    pub fn toggle_all_sets(&mut self, exercise_id: &str) -> Result<Vec<SessionEvent>, SessionError> {
        let sets = self.sets_mut(exercise_id)?;
        let target = !sets.iter().all(|done| *done);
        sets.iter_mut().for_each(|s| *s = target);
        debug!(exercise_id, completed = target, "toggled all sets");

        Ok(if target {
            vec![SessionEvent::SetsCompleted(exercise_id.to_string())]
        } else {
            Vec::new()
        })
    }

    /// Put a replacement into the slot of `original_id`, resetting its sets
    pub fn swap_exercise(
        &mut self,
        original_id: &str,
        replacement: Replacement,
    ) -> Result<&Exercise, SessionError> {
        let Some(category) = self
            .exercises
            .iter()
            .find(|e| e.id == original_id)
            .map(|e| e.category)
        else {
            return Err(SessionError::NotFound(original_id.to_string()));
        };

        let swapped = Exercise {
            id: original_id.to_string(),
            name: replacement.name,
            info: replacement.info,
            category,
            original_id: Some(original_id.to_string()),
        };
        let count = derive_set_count(&swapped.info);
        debug!(original_id, name = %swapped.name, sets = count, "swapped exercise");

        self.progress.insert(original_id.to_string(), vec![false; count]);
        let entry = self.swaps.entry(original_id.to_string()).insert_entry(swapped);
        Ok(entry.into_mut())
    }

    /// Set a category's visibility. User-initiated calls opt the category
    /// out of auto-advance for the rest of the session.
    pub fn set_collapsed(&mut self, category: Category, collapsed: bool, user_initiated: bool) {
        self.collapsed.insert(category, collapsed);
        if user_initiated {
            self.user_touched.insert(category);
        }
    }

    pub fn set_notes(&mut self, text: &str) {
        self.notes = text.to_string();
    }

    fn sets_mut(&mut self, exercise_id: &str) -> Result<&mut SetProgress, SessionError> {
        self.progress
            .get_mut(exercise_id)
            .ok_or_else(|| SessionError::InvalidArgument(format!("unknown exercise '{exercise_id}'")))
    }
}
