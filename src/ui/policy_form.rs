use anyhow::{Context, Result};
use crossterm::event::{self, Event, KeyCode, KeyEventKind};
use log::debug;
use ratatui::{
    Frame,
    layout::{Constraint, Direction, Layout},
    style::{Color, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph, Wrap},
};

use crate::iam::{PolicyRef, PrincipalRef};
use crate::synth::{GeneratedPolicy, PolicySynthesizer};
use crate::terraform::render_snippet;
use crate::wizard::loader::generate_policy;
use crate::wizard::navigator::ScreenRequest;

use super::render_controls;
use super::terminal::Tui;

/// Free-text description plus the last generation attempt.
pub(super) struct PolicyForm {
    description: String,
    generated: Option<GeneratedPolicy>,
    error: Option<String>,
    /// Set when the description changed after the last generation.
    stale: bool,
}

impl PolicyForm {
    pub(super) fn new() -> Self {
        Self {
            description: String::new(),
            generated: None,
            error: None,
            stale: false,
        }
    }

    pub(super) fn add_char(&mut self, c: char) {
        self.description.push(c);
        self.stale = self.generated.is_some();
    }

    pub(super) fn remove_char(&mut self) {
        if self.description.pop().is_some() {
            self.stale = self.generated.is_some();
        }
    }

    pub(super) fn generate(&mut self, synthesizer: &dyn PolicySynthesizer, request: &ScreenRequest) {
        match generate_policy(synthesizer, request, &self.description) {
            Ok(policy) => {
                debug!("Generated policy {}", policy.name);
                self.generated = Some(policy);
                self.error = None;
                self.stale = false;
            }
            Err(err) => {
                self.generated = None;
                self.error = Some(err.to_string());
                self.stale = false;
            }
        }
    }

    pub(super) fn can_accept(&self) -> bool {
        self.generated.is_some() && !self.stale
    }

    /// The generated policy, if it matches the current description.
    pub(super) fn accept(self) -> Option<PolicyRef> {
        if !self.can_accept() {
            return None;
        }
        self.generated
            .map(|policy| PolicyRef::generated(policy.name, policy.json))
    }
}

fn render(
    frame: &mut Frame,
    form: &PolicyForm,
    title: &str,
    terraform_for: Option<&PrincipalRef>,
    busy: bool,
) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(3), Constraint::Min(5), Constraint::Length(1)])
        .split(frame.area());

    let input = Paragraph::new(form.description.as_str())
        .block(Block::default().borders(Borders::ALL).title(format!(" {title} ")));
    frame.render_widget(input, chunks[0]);

    let (body, body_title) = if busy {
        (
            vec![Line::styled("Generating policy...", Style::default().fg(Color::Yellow))],
            " Policy ".to_string(),
        )
    } else if let Some(error) = &form.error {
        (
            vec![Line::styled(error.clone(), Style::default().fg(Color::Red))],
            " Error ".to_string(),
        )
    } else if let Some(policy) = &form.generated {
        let mut lines: Vec<Line> = policy.json.lines().map(|l| Line::raw(l.to_string())).collect();
        if let Some(principal) = terraform_for {
            lines.push(Line::raw(""));
            lines.extend(
                render_snippet(&policy.name, &policy.json, principal)
                    .lines()
                    .map(|l| Line::styled(l.to_string(), Style::default().fg(Color::Cyan))),
            );
        }
        if form.stale {
            lines.insert(
                0,
                Line::styled(
                    "Description changed, press ENTER to regenerate",
                    Style::default().fg(Color::Yellow),
                ),
            );
        }
        (lines, format!(" {} ", policy.name))
    } else {
        (
            vec![Line::from(vec![
                Span::raw("Describe the permissions in plain words, then press "),
                Span::styled("ENTER", Style::default().fg(Color::Green)),
            ])],
            " Policy ".to_string(),
        )
    };
    let preview = Paragraph::new(body)
        .block(Block::default().borders(Borders::ALL).title(body_title))
        .wrap(Wrap { trim: false });
    frame.render_widget(preview, chunks[1]);

    let accept_color = if form.can_accept() {
        Color::Green
    } else {
        Color::DarkGray
    };
    render_controls(
        frame,
        chunks[2],
        &[
            ("ENTER", Color::Green, "Generate"),
            ("TAB", accept_color, "Accept"),
            ("ESC", Color::Red, "Quit"),
        ],
    );
}

/// Runs the form until a generated policy is accepted (`Some`) or the user quits.
pub(super) fn run(
    terminal: &mut Tui,
    synthesizer: &dyn PolicySynthesizer,
    request: &ScreenRequest,
    terraform_for: Option<&PrincipalRef>,
) -> Result<Option<PolicyRef>> {
    let mut form = PolicyForm::new();
    let title = request.title();

    loop {
        terminal
            .draw(|frame| render(frame, &form, &title, terraform_for, false))
            .context("Failed to draw UI")?;

        if let Event::Key(key) = event::read().context("Failed to read event")? {
            if key.kind != KeyEventKind::Press {
                continue;
            }

            match key.code {
                KeyCode::Enter => {
                    terminal
                        .draw(|frame| render(frame, &form, &title, terraform_for, true))
                        .context("Failed to draw UI")?;
                    form.generate(synthesizer, request);
                }
                KeyCode::Tab => {
                    if form.can_accept() {
                        return Ok(form.accept());
                    }
                }
                KeyCode::Backspace => form.remove_char(),
                KeyCode::Esc => return Ok(None),
                KeyCode::Char(c) => form.add_char(c),
                _ => {}
            }
        }
    }
}
