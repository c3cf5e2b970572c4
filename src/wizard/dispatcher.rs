//! Executes a completed selection against IAM.

use std::mem;

use log::{info, warn};
use thiserror::Error;

use crate::iam::{IamError, IamProvider, PrincipalKind, PrincipalRef};

use super::operation::OperationKind;
use super::state::SelectionState;

#[derive(Debug, Error)]
pub enum OperationError {
    #[error("Selection is incomplete: no {0} selected")]
    Incomplete(&'static str),

    #[error("Inline policy '{0}' has no ARN and cannot be attached")]
    InlineAttach(String),

    #[error("Operation failed: {0}")]
    Iam(#[from] IamError),

    #[error(
        "Policy {created_arn} was created but could not be attached: {cause}. \
         It now exists unattached; attach or delete it manually"
    )]
    PartialSuccess {
        created_arn: String,
        #[source]
        cause: IamError,
    },
}

/// The single IAM change a completed selection stands for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    AttachPolicy {
        principal: PrincipalRef,
        policy_name: String,
        policy_arn: String,
    },
    DetachPolicy {
        principal: PrincipalRef,
        policy_name: String,
        policy_arn: String,
    },
    DeleteInlinePolicy {
        principal: PrincipalRef,
        policy_name: String,
    },
    AddToGroup {
        user: String,
        group: String,
    },
    RemoveFromGroup {
        user: String,
        group: String,
    },
    CreateAndAttach {
        principal: PrincipalRef,
        policy_name: String,
        document: String,
    },
}

impl Action {
    /// Past-tense summary shown after success.
    pub fn summary(&self) -> String {
        match self {
            Action::AttachPolicy {
                principal,
                policy_name,
                ..
            } => format!("Attached policy {policy_name} to {} {}", principal.kind, principal.name),
            Action::DetachPolicy {
                principal,
                policy_name,
                ..
            } => format!("Detached policy {policy_name} from {} {}", principal.kind, principal.name),
            Action::DeleteInlinePolicy {
                principal,
                policy_name,
            } => format!(
                "Deleted inline policy {policy_name} from {} {}",
                principal.kind, principal.name
            ),
            Action::AddToGroup { user, group } => format!("Added user {user} to group {group}"),
            Action::RemoveFromGroup { user, group } => {
                format!("Removed user {user} from group {group}")
            }
            Action::CreateAndAttach {
                principal,
                policy_name,
                ..
            } => format!(
                "Created policy {policy_name} and attached it to {} {}",
                principal.kind, principal.name
            ),
        }
    }
}

/// Maps a completed selection to its action.
pub fn resolve_action(state: &SelectionState) -> Result<Action, OperationError> {
    let principal = state.principal().ok_or(OperationError::Incomplete("principal"))?;
    let operation = state.operation().ok_or(OperationError::Incomplete("operation"))?;

    match operation {
        OperationKind::AddToGroup | OperationKind::RemoveFromGroup => {
            if principal.kind != PrincipalKind::User {
                return Err(OperationError::Incomplete("user"));
            }
            let group = state.group().ok_or(OperationError::Incomplete("group"))?;
            let user = principal.name.clone();
            let group = group.name.clone();
            Ok(if operation == OperationKind::AddToGroup {
                Action::AddToGroup { user, group }
            } else {
                Action::RemoveFromGroup { user, group }
            })
        }
        OperationKind::AttachPolicy => {
            let policy = state.policy().ok_or(OperationError::Incomplete("policy"))?;
            if policy.is_inline() {
                return Err(OperationError::InlineAttach(policy.name.clone()));
            }
            Ok(Action::AttachPolicy {
                principal: principal.clone(),
                policy_name: policy.name.clone(),
                policy_arn: policy.arn.clone(),
            })
        }
        OperationKind::DetachPolicy => {
            let policy = state.policy().ok_or(OperationError::Incomplete("policy"))?;
            if policy.is_inline() {
                Ok(Action::DeleteInlinePolicy {
                    principal: principal.clone(),
                    policy_name: policy.name.clone(),
                })
            } else {
                Ok(Action::DetachPolicy {
                    principal: principal.clone(),
                    policy_name: policy.name.clone(),
                    policy_arn: policy.arn.clone(),
                })
            }
        }
        OperationKind::AttachCustomPolicy => {
            let policy = state.policy().ok_or(OperationError::Incomplete("policy"))?;
            let document = policy
                .document
                .clone()
                .ok_or(OperationError::Incomplete("policy document"))?;
            Ok(Action::CreateAndAttach {
                principal: principal.clone(),
                policy_name: policy.name.clone(),
                document,
            })
        }
    }
}

/// Progress of the create-then-attach sequence for a generated policy.
#[derive(Debug)]
pub enum SagaStep {
    Pending,
    Created { arn: String },
    CreatedAndAttached { arn: String },
    CreateFailed { cause: IamError },
    AttachFailedAfterCreate { arn: String, cause: IamError },
}

impl SagaStep {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, SagaStep::Pending | SagaStep::Created { .. })
    }

    /// The outcome of a terminal step; non-terminal steps are handed back.
    fn into_outcome(self) -> Result<SagaOutcome, SagaStep> {
        match self {
            SagaStep::CreatedAndAttached { arn } => Ok(SagaOutcome::Attached { arn }),
            SagaStep::CreateFailed { cause } => Ok(SagaOutcome::CreateFailed { cause }),
            SagaStep::AttachFailedAfterCreate { arn, cause } => {
                Ok(SagaOutcome::AttachFailedAfterCreate { arn, cause })
            }
            step @ (SagaStep::Pending | SagaStep::Created { .. }) => Err(step),
        }
    }
}

/// How a finished saga ended.
#[derive(Debug)]
pub enum SagaOutcome {
    Attached { arn: String },
    CreateFailed { cause: IamError },
    AttachFailedAfterCreate { arn: String, cause: IamError },
}

pub struct CustomPolicySaga<'a> {
    provider: &'a dyn IamProvider,
    principal: &'a PrincipalRef,
    policy_name: &'a str,
    document: &'a str,
    step: SagaStep,
}

impl<'a> CustomPolicySaga<'a> {
    pub fn new(
        provider: &'a dyn IamProvider,
        principal: &'a PrincipalRef,
        policy_name: &'a str,
        document: &'a str,
    ) -> Self {
        Self {
            provider,
            principal,
            policy_name,
            document,
            step: SagaStep::Pending,
        }
    }

    pub fn step(&self) -> &SagaStep {
        &self.step
    }

    /// Performs the next IAM call. Terminal steps are left unchanged.
    pub fn advance(&mut self) -> &SagaStep {
        self.step = match mem::replace(&mut self.step, SagaStep::Pending) {
            SagaStep::Pending => {
                info!("Creating policy {}", self.policy_name);
                match self.provider.create_managed_policy(self.policy_name, self.document) {
                    Ok(arn) => SagaStep::Created { arn },
                    Err(cause) => SagaStep::CreateFailed { cause },
                }
            }
            SagaStep::Created { arn } => {
                info!(
                    "Attaching policy {} to {} {}",
                    arn, self.principal.kind, self.principal.name
                );
                match self.provider.attach_managed_policy(self.principal, &arn) {
                    Ok(()) => SagaStep::CreatedAndAttached { arn },
                    Err(cause) => {
                        warn!("Policy {} was created but attaching it failed: {}", arn, cause);
                        SagaStep::AttachFailedAfterCreate { arn, cause }
                    }
                }
            }
            terminal => terminal,
        };
        &self.step
    }

    pub fn run(mut self) -> SagaOutcome {
        loop {
            match mem::replace(&mut self.step, SagaStep::Pending).into_outcome() {
                Ok(outcome) => return outcome,
                Err(step) => {
                    self.step = step;
                    self.advance();
                }
            }
        }
    }
}

/// Runs the action for a completed selection, consuming it.
///
/// Not retried on failure: a second `CreatePolicy` with the same name would
/// conflict with the first.
pub fn execute(state: SelectionState, provider: &dyn IamProvider) -> Result<String, OperationError> {
    let action = resolve_action(&state)?;
    run_action(&action, provider)?;
    Ok(action.summary())
}

fn run_action(action: &Action, provider: &dyn IamProvider) -> Result<(), OperationError> {
    match action {
        Action::AttachPolicy {
            principal,
            policy_arn,
            ..
        } => {
            info!("Attaching policy {} to {} {}", policy_arn, principal.kind, principal.name);
            provider.attach_managed_policy(principal, policy_arn)?;
        }
        Action::DetachPolicy {
            principal,
            policy_arn,
            ..
        } => {
            info!("Detaching policy {} from {} {}", policy_arn, principal.kind, principal.name);
            provider.detach_managed_policy(principal, policy_arn)?;
        }
        Action::DeleteInlinePolicy {
            principal,
            policy_name,
        } => {
            info!(
                "Deleting inline policy {} from {} {}",
                policy_name, principal.kind, principal.name
            );
            provider.delete_inline_policy(principal, policy_name)?;
        }
        Action::AddToGroup { user, group } => {
            info!("Adding user {} to group {}", user, group);
            provider.add_user_to_group(user, group)?;
        }
        Action::RemoveFromGroup { user, group } => {
            info!("Removing user {} from group {}", user, group);
            provider.remove_user_from_group(user, group)?;
        }
        Action::CreateAndAttach {
            principal,
            policy_name,
            document,
        } => match CustomPolicySaga::new(provider, principal, policy_name, document).run() {
            SagaOutcome::Attached { .. } => {}
            SagaOutcome::CreateFailed { cause } => return Err(OperationError::Iam(cause)),
            SagaOutcome::AttachFailedAfterCreate { arn, cause } => {
                return Err(OperationError::PartialSuccess {
                    created_arn: arn,
                    cause,
                });
            }
        },
    }
    Ok(())
}
