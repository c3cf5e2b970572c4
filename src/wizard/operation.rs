//! Operations and the per-kind capability table.

use std::fmt;

use thiserror::Error;

use crate::iam::PrincipalKind;

#[derive(Debug, Error, PartialEq, Eq)]
#[error("Unsupported operation '{slug}' for {kind}; expected one of: {expected}")]
pub struct UnsupportedOperation {
    pub slug: String,
    pub kind: PrincipalKind,
    pub expected: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OperationKind {
    AttachPolicy,
    DetachPolicy,
    AddToGroup,
    RemoveFromGroup,
    AttachCustomPolicy,
}

impl OperationKind {
    pub fn slug(&self) -> &'static str {
        match self {
            OperationKind::AttachPolicy => "attach_policy",
            OperationKind::DetachPolicy => "detach_policy",
            OperationKind::AddToGroup => "add_to_group",
            OperationKind::RemoveFromGroup => "remove_from_group",
            OperationKind::AttachCustomPolicy => "attach_custom_policy",
        }
    }

    pub fn title(&self) -> &'static str {
        match self {
            OperationKind::AttachPolicy => "Attach Policy",
            OperationKind::DetachPolicy => "Detach Policy",
            OperationKind::AddToGroup => "Add to Group",
            OperationKind::RemoveFromGroup => "Remove from Group",
            OperationKind::AttachCustomPolicy => "Attach Custom Policy",
        }
    }

    /// One-line description shown under the title, phrased for `kind`.
    pub fn description(&self, kind: PrincipalKind) -> String {
        match self {
            OperationKind::AttachPolicy => format!("Assign a policy to the {kind}."),
            OperationKind::DetachPolicy => format!("Remove a policy from the {kind}."),
            OperationKind::AddToGroup => format!("Include the {kind} in a group."),
            OperationKind::RemoveFromGroup => format!("Exclude the {kind} from a group."),
            OperationKind::AttachCustomPolicy => "Create and attach a custom policy.".to_string(),
        }
    }

    pub fn is_group_operation(&self) -> bool {
        matches!(self, OperationKind::AddToGroup | OperationKind::RemoveFromGroup)
    }

    /// Resolves a slug against the operations `kind` supports.
    pub fn parse(kind: PrincipalKind, slug: &str) -> Result<Self, UnsupportedOperation> {
        let profile = KindProfile::of(kind);
        profile
            .operations
            .iter()
            .copied()
            .find(|op| op.slug() == slug)
            .ok_or_else(|| UnsupportedOperation {
                slug: slug.to_string(),
                kind,
                expected: profile
                    .operations
                    .iter()
                    .map(OperationKind::slug)
                    .collect::<Vec<_>>()
                    .join(", "),
            })
    }
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.title())
    }
}

/// Whether a generated policy is bound to a specific resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PolicyScope {
    WithoutResource,
    WithResource,
}

impl PolicyScope {
    pub const ALL: [PolicyScope; 2] = [PolicyScope::WithoutResource, PolicyScope::WithResource];

    pub fn slug(&self) -> &'static str {
        match self {
            PolicyScope::WithoutResource => "without_resource",
            PolicyScope::WithResource => "with_resource",
        }
    }

    pub fn title(&self) -> &'static str {
        match self {
            PolicyScope::WithoutResource => "Without Resource",
            PolicyScope::WithResource => "With Resource",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            PolicyScope::WithoutResource => "Applies globally without a resource.",
            PolicyScope::WithResource => "Scoped to a specific resource.",
        }
    }

    pub fn parse(slug: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|scope| scope.slug() == slug)
    }
}

impl fmt::Display for PolicyScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.title())
    }
}

/// What differs between principal kinds.
#[derive(Debug)]
pub struct KindProfile {
    pub kind: PrincipalKind,
    pub operations: &'static [OperationKind],
    pub has_group_branch: bool,
}

const USER_OPERATIONS: [OperationKind; 5] = [
    OperationKind::AttachPolicy,
    OperationKind::DetachPolicy,
    OperationKind::AddToGroup,
    OperationKind::RemoveFromGroup,
    OperationKind::AttachCustomPolicy,
];

const POLICY_OPERATIONS: [OperationKind; 3] = [
    OperationKind::AttachPolicy,
    OperationKind::DetachPolicy,
    OperationKind::AttachCustomPolicy,
];

static USER_PROFILE: KindProfile = KindProfile {
    kind: PrincipalKind::User,
    operations: &USER_OPERATIONS,
    has_group_branch: true,
};

static GROUP_PROFILE: KindProfile = KindProfile {
    kind: PrincipalKind::Group,
    operations: &POLICY_OPERATIONS,
    has_group_branch: false,
};

static ROLE_PROFILE: KindProfile = KindProfile {
    kind: PrincipalKind::Role,
    operations: &POLICY_OPERATIONS,
    has_group_branch: false,
};

impl KindProfile {
    pub fn of(kind: PrincipalKind) -> &'static KindProfile {
        match kind {
            PrincipalKind::User => &USER_PROFILE,
            PrincipalKind::Group => &GROUP_PROFILE,
            PrincipalKind::Role => &ROLE_PROFILE,
        }
    }

    pub fn allows(&self, operation: OperationKind) -> bool {
        self.operations.contains(&operation)
    }
}
