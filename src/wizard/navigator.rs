//! Decides which screen follows a given selection state.

use crate::iam::{PolicyOrigin, PrincipalKind, PrincipalRef, ResourceRef, ServiceRef};

use super::operation::{KindProfile, OperationKind, PolicyScope};
use super::state::SelectionState;

/// A screen together with the inputs its loader needs.
#[derive(Debug, Clone, PartialEq)]
pub enum ScreenRequest {
    PrincipalList {
        kind: PrincipalKind,
    },
    OperationList {
        kind: PrincipalKind,
    },
    /// Groups the user can join (`for_add`) or leave.
    GroupList {
        user: PrincipalRef,
        for_add: bool,
    },
    PolicyScopeList,
    ServiceList,
    ResourceList {
        service: ServiceRef,
    },
    CreatePolicyForm {
        service: Option<ServiceRef>,
        resource: Option<ResourceRef>,
    },
    PolicyList {
        principal: PrincipalRef,
        for_attach: bool,
    },
    Result,
}

impl ScreenRequest {
    pub fn title(&self) -> String {
        match self {
            ScreenRequest::PrincipalList { kind } => format!("Select a {kind}"),
            ScreenRequest::OperationList { .. } => "Select an operation".to_string(),
            ScreenRequest::GroupList { for_add: true, .. } => "Select a group to join".to_string(),
            ScreenRequest::GroupList { for_add: false, .. } => "Select a group to leave".to_string(),
            ScreenRequest::PolicyScopeList => "Select a policy option".to_string(),
            ScreenRequest::ServiceList => "Select a service".to_string(),
            ScreenRequest::ResourceList { service } => format!("Select a resource of {}", service.name),
            ScreenRequest::CreatePolicyForm { .. } => "Describe the policy".to_string(),
            ScreenRequest::PolicyList { for_attach: true, .. } => "Select a policy to attach".to_string(),
            ScreenRequest::PolicyList { for_attach: false, .. } => "Select a policy to detach".to_string(),
            ScreenRequest::Result => "Overview".to_string(),
        }
    }
}

/// Returns the next screen for `state`.
///
/// Total over every state: an operation the kind does not support is treated
/// as unset, and so is a policy the operation cannot use. A resource without a
/// service still reaches the form.
pub fn next(state: &SelectionState) -> ScreenRequest {
    let profile = KindProfile::of(state.kind());

    let Some(principal) = state.principal() else {
        return ScreenRequest::PrincipalList { kind: state.kind() };
    };

    let operation = match state.operation() {
        Some(op) if profile.allows(op) => op,
        _ => return ScreenRequest::OperationList { kind: state.kind() },
    };

    if operation.is_group_operation() {
        return match state.group() {
            None => ScreenRequest::GroupList {
                user: principal.clone(),
                for_add: operation == OperationKind::AddToGroup,
            },
            Some(_) => ScreenRequest::Result,
        };
    }

    let generated = state
        .policy()
        .map(|policy| policy.origin == PolicyOrigin::NewlyGenerated);

    if operation == OperationKind::AttachCustomPolicy {
        if generated == Some(true) {
            return ScreenRequest::Result;
        }
        return match state.policy_scope() {
            None => ScreenRequest::PolicyScopeList,
            Some(PolicyScope::WithoutResource) => ScreenRequest::CreatePolicyForm {
                service: None,
                resource: None,
            },
            Some(PolicyScope::WithResource) => match (state.service(), state.resource()) {
                (service, Some(resource)) => ScreenRequest::CreatePolicyForm {
                    service: service.cloned(),
                    resource: Some(resource.clone()),
                },
                (Some(service), None) => ScreenRequest::ResourceList {
                    service: service.clone(),
                },
                (None, None) => ScreenRequest::ServiceList,
            },
        };
    }

    if generated != Some(false) {
        return ScreenRequest::PolicyList {
            principal: principal.clone(),
            for_attach: operation == OperationKind::AttachPolicy,
        };
    }

    ScreenRequest::Result
}

/// Clears whatever led to `screen` after it loaded no items, so that the
/// next call to [`next`] leaves it. Returns `false` when there is nothing to
/// fall back to and the empty screen must be shown.
pub fn fallback_for_empty(screen: &ScreenRequest, state: &mut SelectionState) -> bool {
    match screen {
        ScreenRequest::ResourceList { .. } => {
            state.clear_service();
            true
        }
        ScreenRequest::ServiceList => {
            state.clear_policy_scope();
            true
        }
        ScreenRequest::GroupList { .. } | ScreenRequest::PolicyList { .. } => {
            state.clear_operation();
            true
        }
        ScreenRequest::PrincipalList { .. }
        | ScreenRequest::OperationList { .. }
        | ScreenRequest::PolicyScopeList
        | ScreenRequest::CreatePolicyForm { .. }
        | ScreenRequest::Result => false,
    }
}
