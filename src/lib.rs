//! setwise - Workout session tracker
//!
//! Follow a prescribed workout set by set, swap exercises mid-session and
//! leave notes that point at exercises with `@mentions`.

pub mod db;
pub mod exercises;
pub mod history;
pub mod mentions;
pub mod session;
pub mod timer;
pub mod tui;
pub mod workout;

pub use db::Database;
pub use session::{SessionConfig, WorkoutSession};
