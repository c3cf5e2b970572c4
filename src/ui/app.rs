use std::path::PathBuf;

use anyhow::Result;
use log::debug;

use crate::iam::IamProvider;
use crate::synth::PolicySynthesizer;
use crate::terraform;
use crate::wizard::dispatcher::{self, OperationError};
use crate::wizard::loader::{LoadedScreen, ScreenLoader};
use crate::wizard::navigator::ScreenRequest;
use crate::wizard::operation::OperationKind;
use crate::wizard::state::SelectionState;

use super::confirm::{self, Outcome};
use super::terminal::{TerminalGuard, Tui, create_terminal};
use super::{message, policy_form, selector};

/// Collaborators for one wizard run.
pub struct WizardContext<'a> {
    pub provider: &'a dyn IamProvider,
    pub synthesizer: &'a dyn PolicySynthesizer,
    /// Where `--terraform` writes its `.tf` file.
    pub output_dir: PathBuf,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WizardOutcome {
    Cancelled,
    Executed(String),
    Exported(PathBuf),
}

/// Drives the wizard from `state` to completion or until the user quits.
///
/// A failed IAM change is shown on the outcome panel and then returned as
/// the error.
pub fn run_wizard(mut state: SelectionState, context: &WizardContext) -> Result<WizardOutcome> {
    let _guard = TerminalGuard::new()?;
    let mut terminal = create_terminal()?;
    let loader = ScreenLoader::new(context.provider);

    loop {
        message::draw_busy(&mut terminal, "Loading...")?;
        let screen = match loader.resolve(&mut state) {
            Ok(screen) => screen,
            Err(err) => {
                debug!("Screen failed to load: {err}");
                if message::show_load_failed(&mut terminal, &err)? {
                    continue;
                }
                return Ok(WizardOutcome::Cancelled);
            }
        };

        match screen {
            LoadedScreen::List { request, items } => {
                let filterable = !matches!(
                    request,
                    ScreenRequest::OperationList { .. } | ScreenRequest::PolicyScopeList
                );
                match selector::select(&mut terminal, &request.title(), items, filterable)? {
                    Some(selection) => {
                        debug!("Selected {selection:?}");
                        state.apply(selection);
                    }
                    None => return Ok(WizardOutcome::Cancelled),
                }
            }
            LoadedScreen::Empty { request } => {
                message::show_empty(&mut terminal, &request)?;
                return Ok(WizardOutcome::Cancelled);
            }
            LoadedScreen::Form { request } => {
                let terraform_for = if state.terraform() {
                    state.principal()
                } else {
                    None
                };
                match policy_form::run(&mut terminal, context.synthesizer, &request, terraform_for)? {
                    Some(policy) => state.set_policy(policy),
                    None => return Ok(WizardOutcome::Cancelled),
                }
            }
            LoadedScreen::Result => return finish(&mut terminal, state, context),
        }
    }
}

fn exports_terraform(state: &SelectionState) -> bool {
    state.terraform() && state.operation() == Some(OperationKind::AttachCustomPolicy)
}

fn finish(terminal: &mut Tui, state: SelectionState, context: &WizardContext) -> Result<WizardOutcome> {
    let note = exports_terraform(&state).then(|| {
        format!(
            "Write the policy as Terraform to {} instead of changing IAM?",
            context.output_dir.display()
        )
    });
    if !confirm::confirm(terminal, &state, note.as_deref())? {
        return Ok(WizardOutcome::Cancelled);
    }

    if exports_terraform(&state) {
        return match terraform::export(&state, &context.output_dir) {
            Ok(path) => {
                confirm::show_outcome(terminal, &Outcome::Exported(path.clone()))?;
                Ok(WizardOutcome::Exported(path))
            }
            Err(err) => {
                confirm::show_outcome(terminal, &Outcome::Failed(err.to_string()))?;
                Err(err.into())
            }
        };
    }

    message::draw_busy(terminal, "Applying change...")?;
    match dispatcher::execute(state, context.provider) {
        Ok(summary) => {
            confirm::show_outcome(terminal, &Outcome::Executed(summary.clone()))?;
            Ok(WizardOutcome::Executed(summary))
        }
        Err(err) => {
            let outcome = match &err {
                OperationError::PartialSuccess { .. } => Outcome::PartialSuccess(err.to_string()),
                _ => Outcome::Failed(err.to_string()),
            };
            confirm::show_outcome(terminal, &outcome)?;
            Err(err.into())
        }
    }
}
