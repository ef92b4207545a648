//! Derived progress values and the auto-advance policy

use std::collections::BTreeMap;

use tracing::debug;

use super::state::SessionState;
use crate::exercises::Category;

/// Completion of one category
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CategoryProgress {
    pub category: Category,
    pub exercises: usize,
    pub completed: usize,
    pub all_done: bool,
}

/// Aggregate progress, recomputed from the state on every call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProgressSummary {
    pub total_sets: usize,
    pub completed_sets: usize,
    /// 0..=100, rounded
    pub percent: u8,
    pub categories: Vec<CategoryProgress>,
    /// First unfinished exercise in category order, then list order
    pub next_exercise_id: Option<String>,
}

impl ProgressSummary {
    pub fn of(state: &SessionState) -> Self {
        let total_sets: usize = state.progress().values().map(Vec::len).sum();
        let completed_sets: usize = state
            .progress()
            .values()
            .map(|sets| sets.iter().filter(|done| **done).count())
            .sum();

        let categories = Category::all()
            .iter()
            .map(|c| CategoryProgress {
                category: *c,
                exercises: state.exercises_in(*c).count(),
                completed: completed_count(state, *c),
                all_done: all_done(state, *c),
            })
            .collect();

        Self {
            total_sets,
            completed_sets,
            percent: percent(completed_sets, total_sets),
            categories,
            next_exercise_id: next_exercise_id(state),
        }
    }

    /// Every set done, and there was at least one set to do
    pub fn is_complete(&self) -> bool {
        self.total_sets > 0 && self.completed_sets == self.total_sets
    }

    pub fn category(&self, category: Category) -> Option<&CategoryProgress> {
        self.categories.iter().find(|c| c.category == category)
    }
}

fn percent(completed: usize, total: usize) -> u8 {
    if total == 0 {
        return 0;
    }
    (100.0 * completed as f64 / total as f64).round() as u8
}

/// Every exercise in the category is fully complete (vacuously true when empty)
pub fn all_done(state: &SessionState, category: Category) -> bool {
    state
        .exercises_in(category)
        .all(|e| state.is_exercise_done(&e.id))
}

/// Number of fully complete exercises in the category
pub fn completed_count(state: &SessionState, category: Category) -> usize {
    state
        .exercises_in(category)
        .filter(|e| state.is_exercise_done(&e.id))
        .count()
}

pub fn next_exercise_id(state: &SessionState) -> Option<String> {
    Category::all()
        .iter()
        .flat_map(|c| state.exercises_in(*c))
        .find(|e| !state.is_exercise_done(&e.id))
        .map(|e| e.id.clone())
}

/// `all_done` for every category, taken before a mutation
pub fn category_completion(state: &SessionState) -> BTreeMap<Category, bool> {
    Category::all()
        .iter()
        .map(|c| (*c, all_done(state, *c)))
        .collect()
}

/// A collapse/expand performed by the policy
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdvanceStep {
    Collapsed(Category),
    Expanded(Category),
}

/// Collapse categories that just finished and open the next one.
///
/// Categories the user toggled by hand are never touched. Runs over all
/// categories once; `before` is the completion map from before the mutation.
pub fn auto_advance(
    state: &mut SessionState,
    before: &BTreeMap<Category, bool>,
) -> Vec<AdvanceStep> {
    let after = category_completion(state);
    let mut steps = Vec::new();

    for category in Category::all().iter().copied() {
        if state.is_user_touched(category) {
            continue;
        }
        let was_done = before.get(&category).copied().unwrap_or(false);
        let is_done = after.get(&category).copied().unwrap_or(false);
        if was_done || !is_done || state.is_collapsed(category) {
            continue;
        }

        state.set_collapsed(category, true, false);
        steps.push(AdvanceStep::Collapsed(category));

        if let Some(next) = category.next()
            && !state.is_user_touched(next)
        {
            state.set_collapsed(next, false, false);
            steps.push(AdvanceStep::Expanded(next));
        }
    }

    if !steps.is_empty() {
        debug!(?steps, "auto-advance");
    }
    steps
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::exercises::Exercise;

    /// warmup(2) / main(3) / cooldown(1)
    fn create_state() -> SessionState {
        SessionState::new(vec![
            Exercise::new("wu-1", "Jump Rope", "5 min", Category::Warmup),
            Exercise::new("wu-2", "Leg Swings", "2x10", Category::Warmup),
            Exercise::new("main-1", "Bench Press", "3x8", Category::Main),
            Exercise::new("main-2", "Squat", "3x5", Category::Main),
            Exercise::new("main-3", "Pull-ups", "2x6", Category::Main),
            Exercise::new("cd-1", "Foam Rolling", "10 min", Category::Cooldown),
        ])
    }

    fn complete(state: &mut SessionState, id: &str) -> Vec<AdvanceStep> {
        let before = category_completion(state);
        state.toggle_all_sets(id).unwrap();
        auto_advance(state, &before)
    }

    #[test]
    fn test_summary_counts() {
        let mut state = create_state();
        let summary = ProgressSummary::of(&state);
        assert_eq!(summary.total_sets, 1 + 2 + 3 + 3 + 2 + 1);
        assert_eq!(summary.completed_sets, 0);
        assert_eq!(summary.percent, 0);
        assert_eq!(summary.next_exercise_id.as_deref(), Some("wu-1"));

        state.toggle_all_sets("wu-1").unwrap();
        state.toggle_set("main-1", 0).unwrap();
        let summary = ProgressSummary::of(&state);
        assert_eq!(summary.completed_sets, 2);
        assert_eq!(summary.percent, 17); // 2 / 12
        assert_eq!(summary.next_exercise_id.as_deref(), Some("wu-2"));
        assert_eq!(summary.category(Category::Warmup).unwrap().completed, 1);
        assert!(!summary.is_complete());
    }

    #[test]
    fn test_next_exercise_follows_category_order() {
        // Plan lists cooldown first; main still comes before it
        let mut state = SessionState::new(vec![
            Exercise::new("cd", "Stretch", "2 min", Category::Cooldown),
            Exercise::new("m", "Row", "3x8", Category::Main),
        ]);
        assert_eq!(next_exercise_id(&state).as_deref(), Some("m"));
        state.toggle_all_sets("m").unwrap();
        assert_eq!(next_exercise_id(&state).as_deref(), Some("cd"));
        state.toggle_all_sets("cd").unwrap();
        assert_eq!(next_exercise_id(&state), None);
        assert!(ProgressSummary::of(&state).is_complete());
    }

    #[test]
    fn test_empty_workout_never_complete() {
        let state = SessionState::new(Vec::new());
        let summary = ProgressSummary::of(&state);
        assert_eq!(summary.total_sets, 0);
        assert_eq!(summary.percent, 0);
        assert!(!summary.is_complete());
        assert_eq!(summary.next_exercise_id, None);
    }

    #[test]
    fn test_counts_stay_bounded() {
        let mut state = create_state();
        let ids = ["wu-2", "main-1", "main-2", "main-3", "cd-1", "wu-1"];
        for (step, id) in ids.iter().cycle().take(40).enumerate() {
            if step % 3 == 0 {
                state.toggle_all_sets(id).unwrap();
            } else {
                state.toggle_set(id, 0).unwrap();
            }
            let summary = ProgressSummary::of(&state);
            assert!(summary.completed_sets <= summary.total_sets);
            assert!(summary.percent <= 100);
        }
    }

    #[test]
    fn test_auto_advance_warmup_to_main() {
        let mut state = create_state();
        assert!(complete(&mut state, "wu-1").is_empty());

        let steps = complete(&mut state, "wu-2");
        assert_eq!(
            steps,
            vec![
                AdvanceStep::Collapsed(Category::Warmup),
                AdvanceStep::Expanded(Category::Main)
            ]
        );
        assert!(state.is_collapsed(Category::Warmup));
        assert!(!state.is_collapsed(Category::Main));
        assert!(state.is_collapsed(Category::Cooldown));
    }

    #[test]
    fn test_auto_advance_skips_collapsed_category() {
        let mut state = create_state();
        // Main is collapsed (not active); finishing it does not open cooldown
        for id in ["main-1", "main-2", "main-3"] {
            assert!(complete(&mut state, id).is_empty());
        }
        assert!(state.is_collapsed(Category::Cooldown));
    }

    #[test]
    fn test_auto_advance_respects_user_expanded() {
        let mut state = create_state();
        state.set_collapsed(Category::Warmup, false, true);
        complete(&mut state, "wu-1");
        let steps = complete(&mut state, "wu-2");
        assert!(steps.is_empty());
        assert!(!state.is_collapsed(Category::Warmup));
        assert!(state.is_collapsed(Category::Main));
    }

    #[test]
    fn test_auto_advance_does_not_reopen_user_collapsed_next() {
        let mut state = create_state();
        state.set_collapsed(Category::Main, true, true);
        complete(&mut state, "wu-1");
        let steps = complete(&mut state, "wu-2");
        assert_eq!(steps, vec![AdvanceStep::Collapsed(Category::Warmup)]);
        assert!(state.is_collapsed(Category::Main));
    }

    #[test]
    fn test_auto_advance_only_on_transition() {
        let mut state = create_state();
        complete(&mut state, "wu-1");
        complete(&mut state, "wu-2");

        // Re-expanding automatically-managed warmup and toggling inside it
        // must not collapse it again without a fresh transition
        state.set_collapsed(Category::Warmup, false, false);
        let before = category_completion(&state);
        state.toggle_set("main-1", 0).unwrap();
        assert!(auto_advance(&mut state, &before).is_empty());
        assert!(!state.is_collapsed(Category::Warmup));
    }
}
