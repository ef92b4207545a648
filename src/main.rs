//! setwise - Workout session tracker

use std::fs::File;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::{Result, anyhow};
use clap::{Parser, Subcommand};

use setwise::db::Database;
use setwise::exercises::{Category, alternatives_for};
use setwise::history::HistoryRecorder;
use setwise::session::{SessionConfig, derive_set_count};
use setwise::timer::TokioTimer;
use setwise::tui::App;
use setwise::workout::{WorkoutDefinition, default_workout};

#[derive(Parser)]
#[command(name = "setwise")]
#[command(author, version, about = "Workout session tracker")]
struct Cli {
    /// SQLite file for session history
    #[arg(long, env = "SETWISE_DB", default_value = "setwise.db", global = true)]
    db: String,

    /// Write logs here. Without it the TUI discards logs and the other
    /// commands print warnings to stderr.
    #[arg(long, env = "SETWISE_LOG_FILE", global = true)]
    log_file: Option<PathBuf>,

    /// Pause between finishing the last set and the reflection screen
    #[arg(
        long,
        env = "SETWISE_HANDOFF_DELAY_MS",
        default_value = "1500",
        global = true
    )]
    handoff_delay_ms: u64,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start a workout session in the terminal
    Start {
        /// Workout plan JSON (built-in plan when omitted)
        #[arg(short, long)]
        plan: Option<PathBuf>,
    },

    /// Show a plan with its derived set counts
    Plan {
        #[arg(short, long)]
        plan: Option<PathBuf>,
    },

    /// List swap candidates for a category (warmup, main, cooldown)
    Alternatives { category: String },

    /// List finished sessions
    History {
        /// Number of records to show
        #[arg(short, long, default_value = "10")]
        limit: usize,
    },
}

fn load_plan(path: Option<PathBuf>) -> Result<WorkoutDefinition> {
    match path {
        Some(path) => WorkoutDefinition::load(&path),
        None => Ok(default_workout()),
    }
}

impl Cli {
    /// Bare `setwise` starts a session just like `setwise start`
    fn runs_tui(&self) -> bool {
        matches!(self.command, None | Some(Commands::Start { .. }))
    }

    fn handoff_delay(&self) -> Duration {
        Duration::from_millis(self.handoff_delay_ms)
    }
}

fn init_logging(log_file: Option<&Path>, tui: bool) -> Result<()> {
    match log_file {
        Some(path) => {
            let file = File::create(path)?;
            tracing_subscriber::fmt()
                .with_writer(Mutex::new(file))
                .with_ansi(false)
                .init();
        }
        // stderr would draw over the alternate screen
        None if tui => tracing_subscriber::fmt().with_writer(std::io::sink).init(),
        None => tracing_subscriber::fmt()
            .with_max_level(tracing::Level::WARN)
            .with_writer(std::io::stderr)
            .init(),
    }
    Ok(())
}

fn run_session(db: Database, plan: Option<PathBuf>, handoff_delay: Duration) -> Result<()> {
    let workout = load_plan(plan)?;
    let recorder = Arc::new(HistoryRecorder::new(Arc::new(Mutex::new(db))));
    let config = SessionConfig { handoff_delay };
    let mut app = App::new(workout, config, recorder, Arc::new(TokioTimer::current()?));
    app.run()
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    init_logging(cli.log_file.as_deref(), cli.runs_tui())?;
    let handoff_delay = cli.handoff_delay();

    let db = Database::open(&cli.db)?;

    match cli.command {
        Some(Commands::Start { plan }) => {
            run_session(db, plan, handoff_delay)?;
        }

        Some(Commands::Plan { plan }) => {
            let workout = load_plan(plan)?;
            println!("{}", workout.name);
            println!("{:-<50}", "");
            for category in Category::all() {
                let exercises: Vec<_> = workout.in_category(*category).collect();
                if exercises.is_empty() {
                    continue;
                }
                println!("{} {}", category.emoji(), category.label());
                for ex in exercises {
                    println!(
                        "  {:24} | {:10} | {} set(s)",
                        ex.name,
                        ex.info,
                        derive_set_count(&ex.info)
                    );
                }
            }
        }

        Some(Commands::Alternatives { category }) => {
            let category = Category::parse(&category)
                .ok_or_else(|| anyhow!("unknown category '{}'", category))?;
            println!("{} {} alternatives:", category.emoji(), category.label());
            for alt in alternatives_for(category) {
                println!("  {:20} | {}", alt.name, alt.info);
                if let Some(description) = alt.description {
                    println!("  {:20}   {}", "", description);
                }
            }
        }

        Some(Commands::History { limit }) => {
            let sessions = db.get_sessions(limit)?;
            println!("Recent sessions:");
            println!("{:-<60}", "");
            for s in &sessions {
                println!(
                    "{} | {:20} | {}/{} sets | {}",
                    s.finished_at.format("%Y-%m-%d %H:%M"),
                    s.workout,
                    s.completed_sets,
                    s.total_sets,
                    s.finish
                );
                if let Some(id) = s.id {
                    for ex in db.session_exercises(id)? {
                        println!("    {:20} {}/{}", ex.name, ex.sets_done, ex.sets_total);
                    }
                    for note in db.exercise_notes(id)? {
                        println!("    @{}: {}", note.exercise_name, note.note);
                    }
                }
            }
            let streak = db.streak_days(chrono::Local::now().date_naive())?;
            println!("Streak: {} day(s)", streak);
        }

        None => {
            // Default: start a session with the built-in plan
            run_session(db, None, handoff_delay)?;
        }
    }

    Ok(())
}
