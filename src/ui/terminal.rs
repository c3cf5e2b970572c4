use std::io::{Stdout, stdout};

use anyhow::{Context, Result};
use crossterm::{
    ExecutableCommand,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use ratatui::{Terminal, backend::CrosstermBackend};

pub(super) type Tui = Terminal<CrosstermBackend<Stdout>>;

/// RAII guard to ensure terminal state is restored even on panic
pub(super) struct TerminalGuard {
    active: bool,
}

impl TerminalGuard {
    pub(super) fn new() -> Result<Self> {
        enable_raw_mode().context("Failed to enable raw mode")?;
        stdout()
            .execute(EnterAlternateScreen)
            .context("Failed to enter alternate screen")?;
        Ok(Self { active: true })
    }
}

impl Drop for TerminalGuard {
    fn drop(&mut self) {
        if self.active {
            let _ = stdout().execute(LeaveAlternateScreen);
            let _ = disable_raw_mode();
        }
    }
}

pub(super) fn create_terminal() -> Result<Tui> {
    Terminal::new(CrosstermBackend::new(stdout())).context("Failed to create terminal")
}
