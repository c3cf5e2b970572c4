use std::error::Error;

use anyhow::{Context, Result};
use crossterm::event::{self, Event, KeyCode, KeyEventKind};
use ratatui::{
    layout::{Constraint, Direction, Layout},
    style::{Color, Style},
    widgets::{Block, Borders, Paragraph, Wrap},
};

use crate::wizard::loader::LoadFailed;
use crate::wizard::navigator::ScreenRequest;

use super::render_controls;
use super::terminal::Tui;

fn draw_panel(
    terminal: &mut Tui,
    title: &str,
    message: &str,
    color: Color,
    controls: &[(&str, Color, &str)],
) -> Result<()> {
    terminal
        .draw(|frame| {
            let chunks = Layout::default()
                .direction(Direction::Vertical)
                .constraints([Constraint::Min(3), Constraint::Length(1)])
                .split(frame.area());
            let panel = Paragraph::new(message.to_string())
                .style(Style::default().fg(color))
                .block(Block::default().borders(Borders::ALL).title(format!(" {title} ")))
                .wrap(Wrap { trim: false });
            frame.render_widget(panel, chunks[0]);
            render_controls(frame, chunks[1], controls);
        })
        .context("Failed to draw UI")?;
    Ok(())
}

/// Draws a busy panel; returns immediately.
pub(super) fn draw_busy(terminal: &mut Tui, message: &str) -> Result<()> {
    draw_panel(terminal, "Targe", message, Color::Yellow, &[])
}

/// Shows a fetch failure. Returns true to retry, false to quit.
pub(super) fn show_load_failed(terminal: &mut Tui, error: &LoadFailed) -> Result<bool> {
    let message = error_chain(error);
    loop {
        draw_panel(
            terminal,
            "Error",
            &message,
            Color::Red,
            &[("r", Color::Green, "Retry"), ("ESC", Color::Red, "Quit")],
        )?;

        if let Event::Key(key) = event::read().context("Failed to read event")? {
            if key.kind != KeyEventKind::Press {
                continue;
            }
            match key.code {
                KeyCode::Char('r') | KeyCode::Char('R') => return Ok(true),
                KeyCode::Esc | KeyCode::Char('q') => return Ok(false),
                _ => {}
            }
        }
    }
}

/// Joins an error and its sources, skipping causes already in the message.
fn error_chain(error: &dyn Error) -> String {
    let mut message = error.to_string();
    let mut source = error.source();
    while let Some(cause) = source {
        let text = cause.to_string();
        if !message.contains(&text) {
            message.push_str(": ");
            message.push_str(&text);
        }
        source = cause.source();
    }
    message
}

/// Shows the empty state of a list with nothing to fall back to, until quit.
pub(super) fn show_empty(terminal: &mut Tui, request: &ScreenRequest) -> Result<()> {
    let message = format!("{}: nothing to select.", request.title());
    loop {
        draw_panel(terminal, "Empty", &message, Color::Yellow, &[("ESC", Color::Red, "Quit")])?;

        if let Event::Key(key) = event::read().context("Failed to read event")? {
            if key.kind == KeyEventKind::Press && matches!(key.code, KeyCode::Esc | KeyCode::Char('q')) {
                return Ok(());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::iam::IamError;

    #[test]
    fn error_chain_does_not_repeat_causes() {
        let error = LoadFailed::Provider {
            what: "users",
            source: IamError::Api {
                operation: "ListUsers",
                message: "AccessDenied".to_string(),
            },
        };

        assert_eq!(
            error_chain(&error),
            "Failed to load users: ListUsers failed: AccessDenied"
        );
    }
}
