//! Exercise definitions - workout slots and the swap catalog

use serde::{Deserialize, Serialize};

/// Fixed partition of a workout's exercises
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Warmup,   // Разминка
    Main,     // Основная часть
    Cooldown, // Заминка
}

impl Category {
    /// Categories in session order
    pub fn all() -> &'static [Category] {
        &[Category::Warmup, Category::Main, Category::Cooldown]
    }

    /// The category that follows this one, if any
    pub fn next(&self) -> Option<Category> {
        match self {
            Category::Warmup => Some(Category::Main),
            Category::Main => Some(Category::Cooldown),
            Category::Cooldown => None,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Category::Warmup => "Warm-up",
            Category::Main => "Main",
            Category::Cooldown => "Cool-down",
        }
    }

    pub fn emoji(&self) -> &'static str {
        match self {
            Category::Warmup => "🔥",
            Category::Main => "💪",
            Category::Cooldown => "🧘",
        }
    }

    /// Parse a category name as typed on the command line
    pub fn parse(s: &str) -> Option<Category> {
        match s.trim().to_lowercase().as_str() {
            "warmup" | "warm-up" => Some(Category::Warmup),
            "main" => Some(Category::Main),
            "cooldown" | "cool-down" => Some(Category::Cooldown),
            _ => None,
        }
    }
}

/// One exercise slot of a session.
///
/// `id` is the progress-tracking key and never changes for a slot; a swap
/// produces a new `Exercise` with the same `id` and `original_id` set.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Exercise {
    pub id: String,
    pub name: String,
    /// Free-text prescription, e.g. "3x12" or "20 min"
    pub info: String,
    pub category: Category,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub original_id: Option<String>,
}

impl Exercise {
    pub fn new(id: &str, name: &str, info: &str, category: Category) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            info: info.to_string(),
            category,
            original_id: None,
        }
    }

    /// Name with all whitespace removed, as used by `@mentions`
    pub fn mention_name(&self) -> String {
        self.name.chars().filter(|c| !c.is_whitespace()).collect()
    }
}

/// A pre-authored replacement offered by the swap picker
#[derive(Debug, Clone)]
pub struct Alternative {
    pub name: &'static str,
    pub info: &'static str,
    pub category: Category,
    pub description: Option<&'static str>,
}

/// Name and prescription of a replacement, however it was produced
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Replacement {
    pub name: String,
    pub info: String,
}

impl Replacement {
    pub fn new(name: &str, info: &str) -> Self {
        Self {
            name: name.to_string(),
            info: info.to_string(),
        }
    }
}

impl From<&Alternative> for Replacement {
    fn from(alt: &Alternative) -> Self {
        Replacement::new(alt.name, alt.info)
    }
}

/// Warm-up replacements
pub const WARMUP_ALTERNATIVES: &[Alternative] = &[
    Alternative {
        name: "Jumping Jacks",
        info: "2x30",
        category: Category::Warmup,
        description: None,
    },
    Alternative {
        name: "Arm Circles",
        info: "2x15",
        category: Category::Warmup,
        description: Some("Small circles forward, then backward"),
    },
    Alternative {
        name: "Light Jog",
        info: "5 min",
        category: Category::Warmup,
        description: None,
    },
    Alternative {
        name: "Hip Openers",
        info: "2x10",
        category: Category::Warmup,
        description: Some("Knee up, rotate out, alternate legs"),
    },
];

/// Main-block replacements
pub const MAIN_ALTERNATIVES: &[Alternative] = &[
    Alternative {
        name: "Push-ups",
        info: "3x12",
        category: Category::Main,
        description: None,
    },
    Alternative {
        name: "Dumbbell Row",
        info: "3x10",
        category: Category::Main,
        description: Some("One arm at a time, flat back, pull to the hip"),
    },
    Alternative {
        name: "Goblet Squat",
        info: "4x10",
        category: Category::Main,
        description: None,
    },
    Alternative {
        name: "Walking Lunges",
        info: "3x12",
        category: Category::Main,
        description: None,
    },
    Alternative {
        name: "Plank",
        info: "3x45 sec",
        category: Category::Main,
        description: Some("Elbows under shoulders, squeeze glutes"),
    },
];

/// Cool-down replacements
pub const COOLDOWN_ALTERNATIVES: &[Alternative] = &[
    Alternative {
        name: "Hamstring Stretch",
        info: "2 min",
        category: Category::Cooldown,
        description: None,
    },
    Alternative {
        name: "Child's Pose",
        info: "90 sec",
        category: Category::Cooldown,
        description: None,
    },
    Alternative {
        name: "Easy Walk",
        info: "1 km",
        category: Category::Cooldown,
        description: None,
    },
];

/// Candidate replacements for an exercise of the given category
pub fn alternatives_for(category: Category) -> &'static [Alternative] {
    match category {
        Category::Warmup => WARMUP_ALTERNATIVES,
        Category::Main => MAIN_ALTERNATIVES,
        Category::Cooldown => COOLDOWN_ALTERNATIVES,
    }
}

pub fn get_all_alternatives() -> Vec<&'static Alternative> {
    WARMUP_ALTERNATIVES
        .iter()
        .chain(MAIN_ALTERNATIVES.iter())
        .chain(COOLDOWN_ALTERNATIVES.iter())
        .collect()
}

/// Find alternative by name (case-insensitive)
pub fn find_alternative(name: &str) -> Option<&'static Alternative> {
    let name = name.to_lowercase();
    get_all_alternatives()
        .into_iter()
        .find(|a| a.name.to_lowercase() == name)
}
