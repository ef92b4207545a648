//! Rendering of the workout screen. Reads derived values only.

use ratatui::{
    prelude::*,
    widgets::{Block, Borders, Clear, Gauge, List, ListItem, ListState, Paragraph, Wrap},
};

use super::{App, Mode, RowKind};
use crate::exercises::{Category, alternatives_for};
use crate::session::{FinishKind, ProgressSummary, SessionReport, SessionState};

pub(super) fn render(app: &App, frame: &mut Frame) {
    if let Mode::Reflection(report) = &app.mode {
        render_reflection(app, report, frame);
        return;
    }

    let area = frame.area();
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Min(8),
            Constraint::Length(7),
            Constraint::Length(3),
        ])
        .split(area);

    let summary = app.session.summary();

    // Progress
    let gauge = Gauge::default()
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title(format!(" {} ", app.session.workout_name())),
        )
        .gauge_style(Style::default().fg(Color::Green))
        .percent(u16::from(summary.percent))
        .label(format!(
            "{}/{} sets · {}%",
            summary.completed_sets, summary.total_sets, summary.percent
        ));
    frame.render_widget(gauge, chunks[0]);

    // Exercises
    let state = app.session.state();
    let items: Vec<ListItem> = app
        .rows()
        .iter()
        .map(|row| match row {
            RowKind::Header(category) => header_item(state, &summary, *category),
            RowKind::Exercise(id) => exercise_item(state, &summary, id),
        })
        .collect();

    let list = List::new(items)
        .block(Block::default().borders(Borders::ALL).title("Workout"))
        .highlight_style(Style::default().bg(Color::DarkGray));
    let mut list_state = ListState::default();
    if matches!(app.mode, Mode::Browse | Mode::Swap { .. }) {
        list_state.select(Some(app.cursor));
    }
    frame.render_stateful_widget(list, chunks[1], &mut list_state);

    render_notes(app, frame, chunks[2]);

    // Footer
    let help = match app.mode {
        Mode::Browse => {
            "q: exit | ↑↓: move | enter: toggle | 1-4: set | a: all | s: swap | n: notes | f: finish"
        }
        Mode::Swap { .. } => "↑↓: choose | enter: swap | esc: cancel",
        Mode::Notes { .. } => "type | @: mention | ↑↓: pick | tab: accept | esc: done",
        Mode::Reflection(_) => "",
    };
    let footer_text = match app.flash_text() {
        Some(flash) => format!("{help}   {flash}"),
        None => help.to_string(),
    };
    let footer = Paragraph::new(footer_text)
        .style(Style::default().fg(Color::DarkGray))
        .block(Block::default().borders(Borders::ALL));
    frame.render_widget(footer, chunks[3]);

    if let Mode::Swap { slot, selected } = &app.mode {
        render_swap_picker(app, frame, slot, *selected);
    }
}

fn header_item<'a>(state: &SessionState, summary: &ProgressSummary, category: Category) -> ListItem<'a> {
    let arrow = if state.is_collapsed(category) { "▸" } else { "▾" };
    let (done, total, all_done) = summary
        .category(category)
        .map(|c| (c.completed, c.exercises, c.all_done))
        .unwrap_or_default();

    let mut spans = vec![
        Span::raw(format!("{arrow} {} ", category.emoji())),
        Span::styled(category.label(), Style::default().bold()),
        Span::styled(format!("  {done}/{total}"), Style::default().fg(Color::DarkGray)),
    ];
    if all_done {
        spans.push(Span::styled("  ✓", Style::default().fg(Color::Green)));
    }
    if state.is_user_touched(category) {
        spans.push(Span::styled("  (manual)", Style::default().fg(Color::DarkGray)));
    }
    ListItem::new(Line::from(spans))
}

fn exercise_item<'a>(state: &SessionState, summary: &ProgressSummary, id: &str) -> ListItem<'a> {
    let Some(exercise) = state.exercise(id) else {
        return ListItem::new(Line::from(format!("   ? {id}")));
    };
    let sets = state.sets(id).unwrap_or_default();
    let circles: String = sets
        .iter()
        .map(|done| if *done { "● " } else { "○ " })
        .collect();

    let is_next = summary.next_exercise_id.as_deref() == Some(id);
    let name_style = if state.is_exercise_done(id) {
        Style::default().fg(Color::Green)
    } else if is_next {
        Style::default().fg(Color::Cyan).bold()
    } else {
        Style::default()
    };

    let mut spans = vec![
        Span::raw(if is_next { "  ▶ " } else { "    " }),
        Span::styled(format!("{circles:<8}"), Style::default().fg(Color::Yellow)),
        Span::styled(exercise.name.clone(), name_style),
        Span::styled(format!("  {}", exercise.info), Style::default().fg(Color::DarkGray)),
    ];
    if exercise.original_id.is_some() {
        spans.push(Span::styled("  ⇄", Style::default().fg(Color::Magenta)));
    }
    ListItem::new(Line::from(spans))
}

fn render_notes(app: &App, frame: &mut Frame, area: Rect) {
    let editing = matches!(app.mode, Mode::Notes { .. });
    let title = if editing { "Notes (editing)" } else { "Notes" };
    let notes = app.session.state().notes();

    let mut lines: Vec<Line> = if notes.is_empty() && !editing {
        vec![Line::styled(
            "n to add notes, @ to mention an exercise",
            Style::default().fg(Color::DarkGray),
        )]
    } else {
        let mut text: Vec<Line> = notes.split('\n').map(|l| Line::from(l.to_string())).collect();
        if editing && let Some(last) = text.last_mut() {
            last.push_span(Span::styled("▏", Style::default().fg(Color::Cyan)));
        }
        text
    };

    if let Mode::Notes { selected } = app.mode {
        let suggestions = app.session.mention_suggestions();
        if !suggestions.is_empty() {
            let mut spans = vec![Span::styled("@ ", Style::default().fg(Color::Cyan))];
            for (i, exercise) in suggestions.iter().enumerate() {
                let style = if i == selected {
                    Style::default().fg(Color::Black).bg(Color::Cyan)
                } else {
                    Style::default().fg(Color::Cyan)
                };
                spans.push(Span::styled(format!(" {} ", exercise.name), style));
                spans.push(Span::raw(" "));
            }
            lines.push(Line::from(spans));
        }
    }

    let paragraph = Paragraph::new(lines)
        .wrap(Wrap { trim: false })
        .block(Block::default().borders(Borders::ALL).title(title));
    frame.render_widget(paragraph, area);
}

fn render_swap_picker(app: &App, frame: &mut Frame, slot: &str, selected: usize) {
    let Some(exercise) = app.session.state().exercise(slot) else {
        return;
    };
    let alternatives = alternatives_for(exercise.category);
    let area = centered_rect(60, 50, frame.area());

    let items: Vec<ListItem> = alternatives
        .iter()
        .map(|alt| {
            let mut lines = vec![Line::from(vec![
                Span::styled(alt.name, Style::default().bold()),
                Span::styled(format!("  {}", alt.info), Style::default().fg(Color::DarkGray)),
            ])];
            if let Some(description) = alt.description {
                lines.push(Line::styled(
                    format!("  {description}"),
                    Style::default().fg(Color::DarkGray),
                ));
            }
            ListItem::new(lines)
        })
        .collect();

    let list = List::new(items)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title(format!(" Swap {} ", exercise.name)),
        )
        .highlight_style(Style::default().bg(Color::DarkGray));
    let mut list_state = ListState::default();
    list_state.select(Some(selected));

    frame.render_widget(Clear, area);
    frame.render_stateful_widget(list, area, &mut list_state);
}

fn render_reflection(app: &App, report: &SessionReport, frame: &mut Frame) {
    let area = frame.area();
    let minutes = (report.finished_at - report.started_at).num_minutes();
    let headline = match report.finish {
        FinishKind::Completed => "Workout complete! 🏁",
        FinishKind::Early => "Workout finished",
    };

    let mut lines = vec![
        Line::styled(headline, Style::default().fg(Color::Green).bold()),
        Line::from(""),
        Line::from(report.workout_name.clone()),
        Line::from(format!(
            "Sets: {}/{}   Time: {} min",
            report.completed_sets, report.total_sets, minutes
        )),
    ];
    if let Ok(streak) = app.recorder.streak() {
        lines.push(Line::from(format!("Streak: {streak} day(s)")));
    }

    if !report.exercise_notes.is_empty() {
        lines.push(Line::from(""));
        lines.push(Line::styled("Exercise notes", Style::default().bold()));
        for (id, note) in &report.exercise_notes {
            let name = report
                .exercises
                .iter()
                .find(|e| &e.id == id)
                .map(|e| e.name.as_str())
                .unwrap_or(id.as_str());
            lines.push(Line::from(format!("• {name}: {note}")));
        }
    }

    if !report.notes.trim().is_empty() {
        lines.push(Line::from(""));
        lines.push(Line::styled("Notes", Style::default().bold()));
        lines.extend(report.notes.lines().map(|l| Line::from(l.to_string())));
    }

    lines.push(Line::from(""));
    lines.push(Line::styled("q: close", Style::default().fg(Color::DarkGray)));

    let paragraph = Paragraph::new(lines)
        .wrap(Wrap { trim: false })
        .block(Block::default().borders(Borders::ALL).title("Reflection"));
    frame.render_widget(paragraph, area);
}

fn centered_rect(percent_x: u16, percent_y: u16, area: Rect) -> Rect {
    let vertical = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(area);
    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(vertical[1])[1]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::Database;
    use crate::history::HistoryRecorder;
    use crate::session::SessionConfig;
    use crate::timer::ManualTimer;
    use crate::workout::default_workout;
    use crossterm::event::KeyCode;
    use ratatui::backend::TestBackend;
    use std::sync::{Arc, Mutex};

    fn create_app() -> App {
        let db = Arc::new(Mutex::new(Database::open(":memory:").unwrap()));
        App::new(
            default_workout(),
            SessionConfig::default(),
            Arc::new(HistoryRecorder::new(db)),
            Arc::new(ManualTimer::new()),
        )
    }

    fn screen(app: &App) -> String {
        let mut terminal = Terminal::new(TestBackend::new(100, 30)).unwrap();
        terminal.draw(|frame| render(app, frame)).unwrap();
        let buffer = terminal.backend().buffer().clone();
        buffer
            .content()
            .chunks(buffer.area.width as usize)
            .map(|row| row.iter().map(|c| c.symbol()).collect::<String>())
            .collect::<Vec<_>>()
            .join("\n")
    }

    #[test]
    fn test_render_browse() {
        let app = create_app();
        let text = screen(&app);
        assert!(text.contains("Full Body Basics"));
        assert!(text.contains("Jump Rope"));
        assert!(text.contains("0/15 sets"));
        // Main is collapsed
        assert!(!text.contains("Bench Press"));
    }

    #[test]
    fn test_render_swap_picker() {
        let mut app = create_app();
        app.handle_key(KeyCode::Down);
        app.handle_key(KeyCode::Char('s'));
        let text = screen(&app);
        assert!(text.contains("Swap Jump Rope"));
        assert!(text.contains("Jumping Jacks"));
    }

    #[test]
    fn test_render_reflection() {
        let mut app = create_app();
        app.handle_key(KeyCode::Char('n'));
        for c in "@JumpRope smooth".chars() {
            app.handle_key(KeyCode::Char(c));
        }
        app.handle_key(KeyCode::Esc);
        app.handle_key(KeyCode::Down);
        app.handle_key(KeyCode::Enter);
        app.handle_key(KeyCode::Char('f'));
        app.poll_reflection();

        let text = screen(&app);
        assert!(text.contains("Workout finished"));
        assert!(text.contains("Jump Rope: smooth"));
        assert!(text.contains("Streak: 1 day(s)"));
    }
}
