//! Terminal front end of the wizard, built on ratatui and crossterm.

mod app;
mod confirm;
mod message;
mod policy_form;
mod selector;
mod terminal;

pub use app::{WizardContext, WizardOutcome, run_wizard};

use ratatui::{
    Frame,
    layout::Rect,
    style::{Color, Style},
    text::{Line, Span},
    widgets::Paragraph,
};

/// Renders a one-line key hint bar, e.g. `[ENTER] Select  [ESC] Quit`.
fn render_controls(frame: &mut Frame, area: Rect, controls: &[(&str, Color, &str)]) {
    let mut spans = Vec::with_capacity(controls.len() * 2);
    for (key, color, label) in controls {
        spans.push(Span::styled(format!("[{key}]"), Style::default().fg(*color)));
        spans.push(Span::raw(format!(" {label}  ")));
    }
    frame.render_widget(Paragraph::new(Line::from(spans)), area);
}
