//! IAM data model and the provider capability the wizard talks to.
//!
//! Everything the wizard knows about an AWS account flows through
//! [`IamProvider`]. The real implementation lives in [`aws`]; tests use the
//! in-memory provider in `fake`.

pub mod aws;
#[cfg(test)]
pub(crate) mod fake;

use std::fmt;
use std::sync::LazyLock;

use regex::Regex;
use thiserror::Error;

use crate::catalog::CatalogError;

/// ARN sentinel for inline policies, which are addressed by name only.
pub const INLINE_POLICY_ARN: &str = "inline";

/// ARN placeholder shown for a generated policy that does not exist yet.
pub const NEW_POLICY_ARN: &str = "new";

/// Error types for IAM provider calls.
#[derive(Debug, Error)]
pub enum IamError {
    #[error("{kind} '{name}' not found")]
    NotFound { kind: &'static str, name: String },

    #[error("{operation} failed: {message}")]
    Api {
        operation: &'static str,
        message: String,
    },

    #[error("Unexpected response from {operation}: {message}")]
    MalformedResponse {
        operation: &'static str,
        message: String,
    },

    #[error("Catalog error: {0}")]
    Catalog(#[from] CatalogError),

    #[error("Failed to start AWS runtime: {0}")]
    Runtime(#[from] std::io::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PrincipalKind {
    User,
    Group,
    Role,
}

impl PrincipalKind {
    pub const ALL: [PrincipalKind; 3] = [PrincipalKind::User, PrincipalKind::Group, PrincipalKind::Role];

    pub fn as_str(&self) -> &'static str {
        match self {
            PrincipalKind::User => "user",
            PrincipalKind::Group => "group",
            PrincipalKind::Role => "role",
        }
    }

    pub fn plural(&self) -> &'static str {
        match self {
            PrincipalKind::User => "users",
            PrincipalKind::Group => "groups",
            PrincipalKind::Role => "roles",
        }
    }

    /// Capitalised label used in screen titles and overview rows.
    pub fn label(&self) -> &'static str {
        match self {
            PrincipalKind::User => "User",
            PrincipalKind::Group => "Group",
            PrincipalKind::Role => "Role",
        }
    }
}

impl fmt::Display for PrincipalKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The entity whose permissions are being changed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrincipalRef {
    pub kind: PrincipalKind,
    pub name: String,
    pub arn: String,
}

impl PrincipalRef {
    pub fn new(kind: PrincipalKind, name: impl Into<String>, arn: impl Into<String>) -> Self {
        Self {
            kind,
            name: name.into(),
            arn: arn.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupRef {
    pub name: String,
    pub arn: String,
}

impl GroupRef {
    pub fn new(name: impl Into<String>, arn: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            arn: arn.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceRef {
    pub name: String,
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceRef {
    pub name: String,
    pub arn: String,
}

impl ResourceRef {
    /// Builds a resource reference whose display name is the last ARN segment.
    pub fn from_arn(arn: impl Into<String>) -> Self {
        let arn = arn.into();
        Self {
            name: resource_name_from_arn(&arn),
            arn,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PolicyOrigin {
    /// Provider-managed policy from the AWS catalog.
    AwsManaged,
    /// Policy created in this account.
    CustomerManaged,
    Inline,
    NewlyGenerated,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PolicyRef {
    pub name: String,
    pub arn: String,
    /// Policy JSON, only present for newly generated policies.
    pub document: Option<String>,
    pub origin: PolicyOrigin,
}

impl PolicyRef {
    pub fn aws_managed(name: impl Into<String>, arn: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            arn: arn.into(),
            document: None,
            origin: PolicyOrigin::AwsManaged,
        }
    }

    pub fn customer_managed(name: impl Into<String>, arn: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            arn: arn.into(),
            document: None,
            origin: PolicyOrigin::CustomerManaged,
        }
    }

    pub fn inline(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            arn: INLINE_POLICY_ARN.to_string(),
            document: None,
            origin: PolicyOrigin::Inline,
        }
    }

    pub fn generated(name: impl Into<String>, document: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            arn: NEW_POLICY_ARN.to_string(),
            document: Some(document.into()),
            origin: PolicyOrigin::NewlyGenerated,
        }
    }

    pub fn is_inline(&self) -> bool {
        self.arn == INLINE_POLICY_ARN
    }

    /// Builds a managed policy reference, telling AWS-managed ARNs apart from
    /// account-local ones.
    pub fn from_arn(name: impl Into<String>, arn: impl Into<String>) -> Self {
        let arn = arn.into();
        if is_aws_managed_arn(&arn) {
            Self::aws_managed(name, arn)
        } else {
            Self::customer_managed(name, arn)
        }
    }
}

fn is_aws_managed_arn(arn: &str) -> bool {
    arn.starts_with("arn:aws:iam::aws:policy/")
}

static RESOURCE_NAME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"([^/:]+)$").expect("valid regex"));

/// Extracts the trailing name component of an ARN, falling back to the full ARN.
pub fn resource_name_from_arn(arn: &str) -> String {
    RESOURCE_NAME
        .captures(arn)
        .and_then(|captures| captures.get(1))
        .map(|m| m.as_str().to_string())
        .unwrap_or_else(|| arn.to_string())
}

/// Everything the wizard needs from IAM, Resource Explorer and the local catalogs.
///
/// Calls are synchronous: the wizard always waits for one round trip before
/// rendering the next screen.
pub trait IamProvider {
    fn list_principals(&self, kind: PrincipalKind) -> Result<Vec<PrincipalRef>, IamError>;

    /// Resolves a principal by name, returning [`IamError::NotFound`] if it does not exist.
    fn find_principal(&self, kind: PrincipalKind, name: &str) -> Result<PrincipalRef, IamError>;

    /// Resolves a managed policy by ARN.
    fn find_policy(&self, arn: &str) -> Result<PolicyRef, IamError>;

    /// Customer-managed policies of this account.
    fn list_managed_policies(&self) -> Result<Vec<PolicyRef>, IamError>;

    /// AWS-managed policy catalog.
    fn list_managed_policy_catalog(&self) -> Result<Vec<PolicyRef>, IamError>;

    fn list_attached_policy_names(&self, principal: &PrincipalRef) -> Result<Vec<String>, IamError>;

    fn list_inline_policy_names(&self, principal: &PrincipalRef) -> Result<Vec<String>, IamError>;

    fn list_groups(&self) -> Result<Vec<GroupRef>, IamError>;

    fn list_groups_for_user(&self, user_name: &str) -> Result<Vec<String>, IamError>;

    fn attach_managed_policy(&self, principal: &PrincipalRef, policy_arn: &str) -> Result<(), IamError>;

    fn detach_managed_policy(&self, principal: &PrincipalRef, policy_arn: &str) -> Result<(), IamError>;

    fn delete_inline_policy(&self, principal: &PrincipalRef, policy_name: &str) -> Result<(), IamError>;

    /// Creates a customer-managed policy and returns its ARN.
    fn create_managed_policy(&self, name: &str, document: &str) -> Result<String, IamError>;

    fn add_user_to_group(&self, user_name: &str, group_name: &str) -> Result<(), IamError>;

    fn remove_user_from_group(&self, user_name: &str, group_name: &str) -> Result<(), IamError>;

    fn list_resources_for_service(&self, service_name: &str) -> Result<Vec<ResourceRef>, IamError>;

    fn list_service_catalog(&self) -> Result<Vec<ServiceRef>, IamError>;
}
