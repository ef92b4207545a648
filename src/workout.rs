//! Workout source - the plan a session is seeded from

use std::collections::HashSet;
use std::path::Path;

use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};

use crate::exercises::{Category, Exercise};

/// A prescribed workout as delivered by the plan generator
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkoutDefinition {
    pub name: String,
    pub exercises: Vec<Exercise>,
}

impl WorkoutDefinition {
    /// Load a workout from a JSON file
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("reading workout {}", path.display()))?;
        Self::from_json(&raw)
    }

    pub fn from_json(raw: &str) -> Result<Self> {
        let workout: WorkoutDefinition =
            serde_json::from_str(raw).context("parsing workout JSON")?;
        workout.validate()?;
        Ok(workout)
    }

    /// Ids are progress keys, so they must be present and unique
    pub fn validate(&self) -> Result<()> {
        let mut seen = HashSet::new();
        for ex in &self.exercises {
            if ex.id.trim().is_empty() {
                bail!("exercise '{}' has an empty id", ex.name);
            }
            if !seen.insert(ex.id.as_str()) {
                bail!("duplicate exercise id '{}'", ex.id);
            }
        }
        Ok(())
    }

    /// Exercises of one category, in list order
    pub fn in_category(&self, category: Category) -> impl Iterator<Item = &Exercise> {
        self.exercises.iter().filter(move |e| e.category == category)
    }
}

/// Built-in full-body plan used when no plan file is given
pub fn default_workout() -> WorkoutDefinition {
    WorkoutDefinition {
        name: "Full Body Basics".to_string(),
        exercises: vec![
            Exercise::new("wu-1", "Jump Rope", "5 min", Category::Warmup),
            Exercise::new("wu-2", "Leg Swings", "2x10", Category::Warmup),
            Exercise::new("main-1", "Bench Press", "4x8", Category::Main),
            Exercise::new("main-2", "Squat", "5x5", Category::Main),
            Exercise::new("main-3", "Pull-ups", "3x6", Category::Main),
            Exercise::new("cd-1", "Foam Rolling", "10 min", Category::Cooldown),
        ],
    }
}
