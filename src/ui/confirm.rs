use std::path::PathBuf;

use anyhow::{Context, Result};
use crossterm::event::{self, Event, KeyCode, KeyEventKind};
use ratatui::{
    Frame,
    layout::{Constraint, Direction, Layout},
    style::{Color, Modifier, Style},
    text::Line,
    widgets::{Block, Borders, Cell, Paragraph, Row, Table, Wrap},
};

use crate::wizard::state::SelectionState;

use super::render_controls;
use super::terminal::Tui;

/// What happened after the user confirmed.
#[derive(Debug)]
pub(super) enum Outcome {
    Executed(String),
    Exported(PathBuf),
    PartialSuccess(String),
    Failed(String),
}

impl Outcome {
    fn title(&self) -> &'static str {
        match self {
            Outcome::Executed(_) | Outcome::Exported(_) => " Done ",
            Outcome::PartialSuccess(_) => " Warning ",
            Outcome::Failed(_) => " Failed ",
        }
    }

    fn color(&self) -> Color {
        match self {
            Outcome::Executed(_) | Outcome::Exported(_) => Color::Green,
            Outcome::PartialSuccess(_) => Color::Yellow,
            Outcome::Failed(_) => Color::Red,
        }
    }

    pub(super) fn message(&self) -> String {
        match self {
            Outcome::Executed(summary) => summary.clone(),
            Outcome::Exported(path) => format!("Terraform written to {}", path.display()),
            Outcome::PartialSuccess(message) | Outcome::Failed(message) => message.clone(),
        }
    }
}

fn render_overview(frame: &mut Frame, state: &SelectionState, note: Option<&str>) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(5), Constraint::Length(3), Constraint::Length(1)])
        .split(frame.area());

    let rows: Vec<Row> = state
        .overview()
        .into_iter()
        .map(|(label, value)| {
            Row::new(vec![
                Cell::from(label).style(Style::default().add_modifier(Modifier::BOLD)),
                Cell::from(value),
            ])
        })
        .collect();
    let table = Table::new(rows, [Constraint::Length(14), Constraint::Min(10)])
        .block(Block::default().borders(Borders::ALL).title(" Overview "));
    frame.render_widget(table, chunks[0]);

    let prompt = note.unwrap_or("Apply this change?");
    frame.render_widget(
        Paragraph::new(Line::styled(prompt.to_string(), Style::default().fg(Color::Yellow)))
            .block(Block::default().borders(Borders::ALL))
            .wrap(Wrap { trim: true }),
        chunks[1],
    );

    render_controls(
        frame,
        chunks[2],
        &[("y", Color::Green, "Execute"), ("n/ESC", Color::Red, "Quit")],
    );
}

/// Shows the overview and waits for `y` (true) or `n`/Esc (false).
pub(super) fn confirm(terminal: &mut Tui, state: &SelectionState, note: Option<&str>) -> Result<bool> {
    loop {
        terminal
            .draw(|frame| render_overview(frame, state, note))
            .context("Failed to draw UI")?;

        if let Event::Key(key) = event::read().context("Failed to read event")? {
            if key.kind != KeyEventKind::Press {
                continue;
            }
            match key.code {
                KeyCode::Char('y') | KeyCode::Char('Y') => return Ok(true),
                KeyCode::Char('n') | KeyCode::Char('N') | KeyCode::Char('q') | KeyCode::Esc => {
                    return Ok(false);
                }
                _ => {}
            }
        }
    }
}

/// Shows the outcome until any key is pressed.
pub(super) fn show_outcome(terminal: &mut Tui, outcome: &Outcome) -> Result<()> {
    loop {
        terminal
            .draw(|frame| {
                let chunks = Layout::default()
                    .direction(Direction::Vertical)
                    .constraints([Constraint::Min(3), Constraint::Length(1)])
                    .split(frame.area());
                let panel = Paragraph::new(outcome.message())
                    .style(Style::default().fg(outcome.color()))
                    .block(Block::default().borders(Borders::ALL).title(outcome.title()))
                    .wrap(Wrap { trim: false });
                frame.render_widget(panel, chunks[0]);
                render_controls(frame, chunks[1], &[("any key", Color::Cyan, "Exit")]);
            })
            .context("Failed to draw UI")?;

        if let Event::Key(key) = event::read().context("Failed to read event")? {
            if key.kind == KeyEventKind::Press {
                return Ok(());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exported_outcome_names_the_file() {
        let outcome = Outcome::Exported(PathBuf::from("ReadLogs.tf"));
        assert_eq!(outcome.message(), "Terraform written to ReadLogs.tf");
        assert_eq!(outcome.color(), Color::Green);
    }

    #[test]
    fn failed_outcome_shows_error_verbatim() {
        let outcome = Outcome::Failed("AttachUserPolicy failed: AccessDenied".to_string());
        assert_eq!(outcome.message(), "AttachUserPolicy failed: AccessDenied");
        assert_eq!(outcome.title(), " Failed ");
    }

    #[test]
    fn partial_success_is_a_warning() {
        let outcome = Outcome::PartialSuccess("orphaned".to_string());
        assert_eq!(outcome.title(), " Warning ");
        assert_eq!(outcome.color(), Color::Yellow);
    }
}
