//! TUI module - Terminal workout screen with ratatui
//!
//! The screen only reads derived values from [`WorkoutSession`]; every key
//! press maps to one session operation.

mod view;

use std::io::{Stdout, stdout};
use std::sync::mpsc::{Receiver, Sender, channel};
use std::sync::{Arc, Mutex};

use anyhow::Result;
use crossterm::{
    ExecutableCommand,
    event::{self, Event, KeyCode, KeyEventKind},
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use ratatui::prelude::*;
use tracing::warn;

use crate::exercises::{Category, Replacement, alternatives_for};
use crate::history::HistoryRecorder;
use crate::session::{
    Collaborators, Feedback, FeedbackSink, Navigator, SessionConfig, SessionReport, WorkoutSession,
};
use crate::timer::Timer;
use crate::workout::WorkoutDefinition;

type Tui = Terminal<CrosstermBackend<Stdout>>;

/// One selectable line of the exercise list
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RowKind {
    Header(Category),
    Exercise(String),
}

#[derive(Debug, Clone, PartialEq)]
pub enum Mode {
    Browse,
    /// Picking a replacement for the exercise in `slot`
    Swap { slot: String, selected: usize },
    /// Editing the notes; `selected` is the highlighted suggestion
    Notes { selected: usize },
    Reflection(Box<SessionReport>),
}

/// Shows feedback signals in the footer
struct FlashFeedback {
    flash: Arc<Mutex<Option<String>>>,
}

impl FeedbackSink for FlashFeedback {
    fn signal(&self, feedback: Feedback) -> Result<()> {
        let text = match feedback {
            Feedback::SetCompleted => "✓ set done",
            Feedback::ExerciseCompleted => "✓✓ exercise done",
            Feedback::SessionCompleted => "🏁 workout complete!",
        };
        let mut flash = self
            .flash
            .lock()
            .map_err(|e| anyhow::anyhow!("flash lock poisoned: {e}"))?;
        *flash = Some(text.to_string());
        Ok(())
    }
}

/// Hands the report back to the UI thread to open the reflection screen
struct ChannelNavigator {
    tx: Mutex<Sender<SessionReport>>,
}

impl Navigator for ChannelNavigator {
    fn open_reflection(&self, report: &SessionReport) {
        let sent = self
            .tx
            .lock()
            .map(|tx| tx.send(report.clone()).is_ok())
            .unwrap_or(false);
        if !sent {
            warn!("reflection screen is gone, report dropped");
        }
    }
}

/// App state for TUI
pub struct App {
    session: WorkoutSession,
    recorder: Arc<HistoryRecorder>,
    mode: Mode,
    cursor: usize,
    flash: Arc<Mutex<Option<String>>>,
    reflections: Receiver<SessionReport>,
    should_quit: bool,
}

impl App {
    pub fn new(
        workout: WorkoutDefinition,
        config: SessionConfig,
        recorder: Arc<HistoryRecorder>,
        timer: Arc<dyn Timer>,
    ) -> Self {
        let flash = Arc::new(Mutex::new(None));
        let (tx, reflections) = channel();
        let collaborators = Collaborators {
            feedback: Arc::new(FlashFeedback {
                flash: flash.clone(),
            }),
            completion: recorder.clone(),
            navigator: Arc::new(ChannelNavigator { tx: Mutex::new(tx) }),
            timer,
        };

        Self {
            session: WorkoutSession::start(workout, config, collaborators),
            recorder,
            mode: Mode::Browse,
            cursor: 0,
            flash,
            reflections,
            should_quit: false,
        }
    }

    pub fn session(&self) -> &WorkoutSession {
        &self.session
    }

    pub fn mode(&self) -> &Mode {
        &self.mode
    }

    /// Run the TUI application
    pub fn run(&mut self) -> Result<()> {
        let mut terminal = init_terminal()?;

        while !self.should_quit {
            self.poll_reflection();
            terminal.draw(|frame| view::render(self, frame))?;
            self.handle_events()?;
        }

        restore_terminal()?;
        Ok(())
    }

    /// Lines of the exercise list: category headers, plus exercises of
    /// expanded categories
    pub fn rows(&self) -> Vec<RowKind> {
        let state = self.session.state();
        let mut rows = Vec::new();
        for category in Category::all() {
            if state.exercises_in(*category).next().is_none() {
                continue;
            }
            rows.push(RowKind::Header(*category));
            if !state.is_collapsed(*category) {
                rows.extend(
                    state
                        .exercises_in(*category)
                        .map(|e| RowKind::Exercise(e.id.clone())),
                );
            }
        }
        rows
    }

    fn current_row(&self) -> Option<RowKind> {
        self.rows().get(self.cursor).cloned()
    }

    fn flash_text(&self) -> Option<String> {
        self.flash.lock().ok().and_then(|f| f.clone())
    }

    fn poll_reflection(&mut self) {
        if let Ok(report) = self.reflections.try_recv() {
            self.mode = Mode::Reflection(Box::new(report));
        }
    }

    fn handle_events(&mut self) -> Result<()> {
        if event::poll(std::time::Duration::from_millis(100))?
            && let Event::Key(key) = event::read()?
            && key.kind == KeyEventKind::Press
        {
            self.handle_key(key.code);
        }
        Ok(())
    }

    pub fn handle_key(&mut self, code: KeyCode) {
        match self.mode.clone() {
            Mode::Browse => self.handle_browse_key(code),
            Mode::Swap { slot, selected } => self.handle_swap_key(code, &slot, selected),
            Mode::Notes { selected } => self.handle_notes_key(code, selected),
            Mode::Reflection(_) => {
                if matches!(code, KeyCode::Char('q') | KeyCode::Esc | KeyCode::Enter) {
                    self.should_quit = true;
                }
            }
        }
    }

    fn handle_browse_key(&mut self, code: KeyCode) {
        let rows = self.rows().len();
        match code {
            KeyCode::Char('q') | KeyCode::Esc => {
                self.session.exit();
                self.should_quit = true;
            }
            KeyCode::Up | KeyCode::Char('k') => self.cursor = self.cursor.saturating_sub(1),
            KeyCode::Down | KeyCode::Char('j') => {
                if self.cursor + 1 < rows {
                    self.cursor += 1;
                }
            }
            KeyCode::Enter => match self.current_row() {
                Some(RowKind::Header(category)) => self.session.toggle_category(category),
                Some(RowKind::Exercise(id)) => self.toggle_next_set(&id),
                None => {}
            },
            KeyCode::Char(c @ '1'..='4') => {
                if let Some(RowKind::Exercise(id)) = self.current_row() {
                    let index = c as usize - '1' as usize;
                    let in_range = self
                        .session
                        .state()
                        .sets(&id)
                        .is_some_and(|sets| index < sets.len());
                    if in_range {
                        let result = self.session.toggle_set(&id, index);
                        self.report_error(result);
                    }
                }
            }
            KeyCode::Char('a') => {
                if let Some(RowKind::Exercise(id)) = self.current_row() {
                    let result = self.session.toggle_all_sets(&id);
                    self.report_error(result);
                }
            }
            KeyCode::Char('s') => {
                if let Some(RowKind::Exercise(slot)) = self.current_row() {
                    self.mode = Mode::Swap { slot, selected: 0 };
                }
            }
            KeyCode::Char('n') => self.mode = Mode::Notes { selected: 0 },
            KeyCode::Char('f') => {
                if !self.session.finish() {
                    self.set_flash("complete at least one set to finish");
                }
            }
            _ => {}
        }
        self.clamp_cursor();
    }

    fn handle_swap_key(&mut self, code: KeyCode, slot: &str, selected: usize) {
        let Some(category) = self.session.state().exercise(slot).map(|e| e.category) else {
            self.mode = Mode::Browse;
            return;
        };
        let alternatives = alternatives_for(category);
        match code {
            KeyCode::Esc => self.mode = Mode::Browse,
            KeyCode::Up | KeyCode::Char('k') => {
                self.mode = Mode::Swap {
                    slot: slot.to_string(),
                    selected: selected.saturating_sub(1),
                }
            }
            KeyCode::Down | KeyCode::Char('j') => {
                self.mode = Mode::Swap {
                    slot: slot.to_string(),
                    selected: (selected + 1).min(alternatives.len().saturating_sub(1)),
                }
            }
            KeyCode::Enter => {
                if let Some(alt) = alternatives.get(selected) {
                    let result = self.session.swap_exercise(slot, Replacement::from(alt));
                    if result.is_ok() {
                        self.set_flash(&format!("swapped in {}", alt.name));
                    }
                    self.report_error(result);
                }
                self.mode = Mode::Browse;
            }
            _ => {}
        }
    }

    fn handle_notes_key(&mut self, code: KeyCode, selected: usize) {
        let mut notes = self.session.state().notes().to_string();
        let suggestions = self.session.mention_suggestions().len();
        match code {
            KeyCode::Esc => {
                self.mode = Mode::Browse;
                return;
            }
            KeyCode::Tab => {
                let chosen = self
                    .session
                    .mention_suggestions()
                    .get(selected)
                    .map(|e| e.id.clone());
                if let Some(id) = chosen {
                    let result = self.session.complete_mention(&id);
                    self.report_error(result);
                }
                self.mode = Mode::Notes { selected: 0 };
                return;
            }
            KeyCode::Up => {
                self.mode = Mode::Notes {
                    selected: selected.saturating_sub(1),
                };
                return;
            }
            KeyCode::Down => {
                self.mode = Mode::Notes {
                    selected: (selected + 1).min(suggestions.saturating_sub(1)),
                };
                return;
            }
            KeyCode::Enter => notes.push('\n'),
            KeyCode::Backspace => {
                notes.pop();
            }
            KeyCode::Char(c) => notes.push(c),
            _ => return,
        }
        self.session.set_notes(&notes);
        self.mode = Mode::Notes { selected: 0 };
    }

    /// Enter on an exercise checks its first open set, or clears the last
    /// one when all are done
    fn toggle_next_set(&mut self, id: &str) {
        let Some(sets) = self.session.state().sets(id) else {
            return;
        };
        let index = match sets.iter().position(|done| !done) {
            Some(open) => open,
            None => sets.len().saturating_sub(1),
        };
        if !sets.is_empty() {
            let result = self.session.toggle_set(id, index);
            self.report_error(result);
        }
    }

    fn clamp_cursor(&mut self) {
        let rows = self.rows().len();
        if self.cursor >= rows {
            self.cursor = rows.saturating_sub(1);
        }
    }

    fn set_flash(&self, text: &str) {
        if let Ok(mut flash) = self.flash.lock() {
            *flash = Some(text.to_string());
        }
    }

    fn report_error<E: std::fmt::Display>(&self, result: std::result::Result<(), E>) {
        if let Err(e) = result {
            warn!("session operation failed: {}", e);
            self.set_flash(&e.to_string());
        }
    }
}

fn init_terminal() -> Result<Tui> {
    enable_raw_mode()?;
    stdout().execute(EnterAlternateScreen)?;
    let terminal = Terminal::new(CrosstermBackend::new(stdout()))?;
    Ok(terminal)
}

fn restore_terminal() -> Result<()> {
    disable_raw_mode()?;
    stdout().execute(LeaveAlternateScreen)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::Database;
    use crate::session::DEFAULT_HANDOFF_DELAY;
    use crate::timer::ManualTimer;
    use crate::workout::default_workout;

    fn create_app() -> (App, Arc<ManualTimer>, Arc<Mutex<Database>>) {
        let db = Arc::new(Mutex::new(Database::open(":memory:").unwrap()));
        let timer = Arc::new(ManualTimer::new());
        let app = App::new(
            default_workout(),
            SessionConfig::default(),
            Arc::new(HistoryRecorder::new(db.clone())),
            timer.clone(),
        );
        (app, timer, db)
    }

    fn press(app: &mut App, keys: &[KeyCode]) {
        for key in keys {
            app.handle_key(*key);
        }
    }

    #[test]
    fn test_rows_follow_collapse_state() {
        let (app, _, _) = create_app();
        assert_eq!(
            app.rows(),
            vec![
                RowKind::Header(Category::Warmup),
                RowKind::Exercise("wu-1".to_string()),
                RowKind::Exercise("wu-2".to_string()),
                RowKind::Header(Category::Main),
                RowKind::Header(Category::Cooldown),
            ]
        );
    }

    #[test]
    fn test_keys_drive_auto_advance() {
        let (mut app, _, _) = create_app();
        // wu-1: single timed set; wu-2: toggle all
        press(&mut app, &[KeyCode::Down, KeyCode::Enter, KeyCode::Down, KeyCode::Char('a')]);

        let state = app.session().state();
        assert!(state.is_collapsed(Category::Warmup));
        assert!(!state.is_collapsed(Category::Main));
        assert_eq!(app.rows().len(), 6);
    }

    #[test]
    fn test_header_enter_is_user_toggle() {
        let (mut app, _, _) = create_app();
        press(&mut app, &[KeyCode::Enter]);
        assert!(app.session().state().is_collapsed(Category::Warmup));
        assert!(app.session().state().is_user_touched(Category::Warmup));
    }

    #[test]
    fn test_swap_picker() {
        let (mut app, _, _) = create_app();
        press(
            &mut app,
            &[KeyCode::Down, KeyCode::Char('s'), KeyCode::Down, KeyCode::Enter],
        );
        assert_eq!(app.mode(), &Mode::Browse);
        let swapped = app.session().state().exercise("wu-1").unwrap();
        assert_eq!(swapped.name, alternatives_for(Category::Warmup)[1].name);
    }

    #[test]
    fn test_set_keys_ignore_out_of_range() {
        let (mut app, _, _) = create_app();
        press(&mut app, &[KeyCode::Down, KeyCode::Char('4')]);
        assert_eq!(app.session().summary().completed_sets, 0);
    }

    #[test]
    fn test_notes_autocomplete() {
        let (mut app, _, _) = create_app();
        press(&mut app, &[KeyCode::Char('n')]);
        for c in "ok @squ".chars() {
            app.handle_key(KeyCode::Char(c));
        }
        assert_eq!(app.session().mention_suggestions().len(), 1);
        press(&mut app, &[KeyCode::Tab]);
        assert_eq!(app.session().state().notes(), "ok @Squat ");
        press(&mut app, &[KeyCode::Esc]);
        assert_eq!(app.mode(), &Mode::Browse);
    }

    #[test]
    fn test_finish_opens_reflection_and_saves() {
        let (mut app, _, db) = create_app();
        press(&mut app, &[KeyCode::Char('f')]);
        assert_eq!(app.mode(), &Mode::Browse);

        press(&mut app, &[KeyCode::Down, KeyCode::Enter, KeyCode::Char('f')]);
        app.poll_reflection();
        assert!(matches!(app.mode(), Mode::Reflection(_)));
        assert_eq!(db.lock().unwrap().get_sessions(5).unwrap().len(), 1);
    }

    #[test]
    fn test_full_completion_waits_for_timer() {
        let (mut app, timer, db) = create_app();
        let ids: Vec<String> = app
            .session()
            .state()
            .exercises()
            .map(|e| e.id.clone())
            .collect();
        for id in &ids {
            app.session.toggle_all_sets(id).unwrap();
        }
        app.poll_reflection();
        assert_eq!(app.mode(), &Mode::Browse);

        timer.advance(DEFAULT_HANDOFF_DELAY);
        app.poll_reflection();
        assert!(matches!(app.mode(), Mode::Reflection(_)));
        assert_eq!(db.lock().unwrap().get_sessions(5).unwrap()[0].finish, "completed");
    }

    #[test]
    fn test_quit_during_handoff_delay_still_saves() {
        let (mut app, timer, db) = create_app();
        let ids: Vec<String> = app
            .session()
            .state()
            .exercises()
            .map(|e| e.id.clone())
            .collect();
        for id in &ids {
            app.session.toggle_all_sets(id).unwrap();
        }
        assert!(app.session().is_finished());

        press(&mut app, &[KeyCode::Char('q')]);
        assert!(app.should_quit);
        assert_eq!(db.lock().unwrap().get_sessions(5).unwrap().len(), 1);

        timer.advance(DEFAULT_HANDOFF_DELAY * 2);
        assert_eq!(db.lock().unwrap().get_sessions(5).unwrap().len(), 1);
    }
}
