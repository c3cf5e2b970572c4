//! Pre-seeding a selection from command-line flags.
//!
//! Every flag is validated before the wizard starts. Operation and option
//! slugs are checked first so a typo fails before any IAM call is made.

use log::debug;
use thiserror::Error;

use crate::iam::{GroupRef, IamError, IamProvider, PolicyRef, PrincipalKind, ResourceRef, ServiceRef};

use super::operation::{KindProfile, OperationKind, PolicyScope, UnsupportedOperation};
use super::state::SelectionState;

#[derive(Debug, Error)]
pub enum SeedError {
    #[error(transparent)]
    Unsupported(#[from] UnsupportedOperation),

    #[error("Unknown policy option '{0}'; expected one of: without_resource, with_resource")]
    UnknownPolicyOption(String),

    #[error("Conflicting flags: {0}")]
    Conflict(String),

    #[error("Lookup failed: {0}")]
    Lookup(#[from] IamError),

    #[error("Policy '{0}' not found in account policies or the AWS managed catalog")]
    PolicyNotFound(String),

    #[error("Service '{0}' not found in the service catalog")]
    ServiceNotFound(String),

    #[error("Resource '{resource}' not found for service {service}")]
    ResourceNotFound { service: String, resource: String },
}

/// Raw flag values for one `aws <kind>` invocation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SeedFlags {
    /// `--user`, `--group` or `--role`, depending on the kind.
    pub principal: Option<String>,
    pub operation: Option<String>,
    /// Target group for membership operations (users only).
    pub group: Option<String>,
    pub policy: Option<String>,
    pub service: Option<String>,
    pub resource: Option<String>,
    pub policy_option: Option<String>,
    pub terraform: bool,
}

fn is_arn(value: &str) -> bool {
    value.starts_with("arn:")
}

/// Parses slugs and rejects flag combinations no path through the wizard can use.
///
/// Needs no provider, so callers can run it before connecting to AWS.
pub fn check_flags(
    kind: PrincipalKind,
    flags: &SeedFlags,
) -> Result<(Option<OperationKind>, Option<PolicyScope>), SeedError> {
    let operation = flags
        .operation
        .as_deref()
        .map(|slug| OperationKind::parse(kind, slug))
        .transpose()?;
    let mut scope = flags
        .policy_option
        .as_deref()
        .map(|slug| PolicyScope::parse(slug).ok_or_else(|| SeedError::UnknownPolicyOption(slug.to_string())))
        .transpose()?;

    if flags.group.is_some() {
        if !KindProfile::of(kind).has_group_branch {
            return Err(SeedError::Conflict(format!(
                "--group cannot be used as a target for {}",
                kind.plural()
            )));
        }
        if operation.is_some_and(|op| !op.is_group_operation()) {
            return Err(SeedError::Conflict(
                "--group requires --operation add_to_group or remove_from_group".to_string(),
            ));
        }
    }

    if flags.policy.is_some() {
        match operation {
            Some(OperationKind::AttachCustomPolicy) => {
                return Err(SeedError::Conflict(
                    "--policy cannot be combined with attach_custom_policy; the policy is generated"
                        .to_string(),
                ));
            }
            Some(op) if op.is_group_operation() => {
                return Err(SeedError::Conflict(format!(
                    "--policy cannot be combined with {}",
                    op.slug()
                )));
            }
            _ => {}
        }
    }

    let binds_resource = flags.service.is_some() || flags.resource.is_some();
    if binds_resource || scope.is_some() {
        if let Some(op) = operation.filter(|op| *op != OperationKind::AttachCustomPolicy) {
            return Err(SeedError::Conflict(format!(
                "--service, --resource and --policy-option only apply to attach_custom_policy, not {}",
                op.slug()
            )));
        }
    }
    if binds_resource {
        match scope {
            Some(PolicyScope::WithoutResource) => {
                return Err(SeedError::Conflict(
                    "--service and --resource cannot be combined with --policy-option without_resource"
                        .to_string(),
                ));
            }
            Some(PolicyScope::WithResource) => {}
            None if operation.is_some() => scope = Some(PolicyScope::WithResource),
            None => {}
        }
    }
    if let Some(resource) = &flags.resource {
        if flags.service.is_none() && !is_arn(resource) {
            return Err(SeedError::Conflict(
                "--resource by name requires --service; pass an ARN otherwise".to_string(),
            ));
        }
    }

    Ok((operation, scope))
}

/// Builds the initial selection for `kind` from `flags`, resolving every
/// name against the provider.
pub fn seed_state(
    kind: PrincipalKind,
    flags: &SeedFlags,
    provider: &dyn IamProvider,
) -> Result<SelectionState, SeedError> {
    let (operation, scope) = check_flags(kind, flags)?;
    let mut state = SelectionState::new(kind);
    state.set_terraform(flags.terraform);

    if let Some(name) = &flags.principal {
        debug!("Resolving {} '{}'", kind, name);
        state.set_principal(provider.find_principal(kind, name)?);
    }
    if let Some(operation) = operation {
        state.set_operation(operation);
    }
    if let Some(name) = &flags.group {
        let group = provider.find_principal(PrincipalKind::Group, name)?;
        state.set_group(GroupRef::new(group.name, group.arn));
    }
    if let Some(scope) = scope {
        state.set_policy_scope(scope);
    }

    if let Some(name) = &flags.service {
        state.set_service(resolve_service(provider, name)?);
    }
    if let Some(resource) = &flags.resource {
        let resource = resolve_resource(provider, state.service(), resource)?;
        state.set_resource(resource);
    }

    if let Some(policy) = &flags.policy {
        state.set_policy(resolve_policy(provider, policy)?);
    }

    Ok(state)
}

fn resolve_service(provider: &dyn IamProvider, name: &str) -> Result<ServiceRef, SeedError> {
    provider
        .list_service_catalog()?
        .into_iter()
        .find(|service| service.name == name)
        .ok_or_else(|| SeedError::ServiceNotFound(name.to_string()))
}

fn resolve_resource(
    provider: &dyn IamProvider,
    service: Option<&ServiceRef>,
    resource: &str,
) -> Result<ResourceRef, SeedError> {
    if is_arn(resource) {
        return Ok(ResourceRef::from_arn(resource));
    }
    let Some(service) = service else {
        return Err(SeedError::Conflict("--resource by name requires --service".to_string()));
    };
    provider
        .list_resources_for_service(&service.name)?
        .into_iter()
        .find(|candidate| candidate.name == resource)
        .ok_or_else(|| SeedError::ResourceNotFound {
            service: service.name.clone(),
            resource: resource.to_string(),
        })
}

fn resolve_policy(provider: &dyn IamProvider, policy: &str) -> Result<PolicyRef, SeedError> {
    if is_arn(policy) {
        return match provider.find_policy(policy) {
            Ok(found) => Ok(found),
            Err(IamError::NotFound { .. }) => Err(SeedError::PolicyNotFound(policy.to_string())),
            Err(err) => Err(err.into()),
        };
    }

    if let Some(found) = provider
        .list_managed_policies()?
        .into_iter()
        .find(|candidate| candidate.name == policy)
    {
        return Ok(found);
    }
    provider
        .list_managed_policy_catalog()?
        .into_iter()
        .find(|candidate| candidate.name == policy)
        .ok_or_else(|| SeedError::PolicyNotFound(policy.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::iam::PolicyOrigin;
    use crate::iam::fake::FakeIamProvider;
    use crate::wizard::navigator::{ScreenRequest, next};
    use crate::wizard::state::Selection;

    fn provider() -> FakeIamProvider {
        FakeIamProvider::new()
            .with_principal(PrincipalKind::User, "alice")
            .with_principal(PrincipalKind::Group, "admins")
            .with_principal(PrincipalKind::Role, "deployer")
            .with_account_policy("team")
            .with_catalog_policy("ReadOnlyAccess")
            .with_service("AWS::S3::Bucket")
            .with_resource("AWS::S3::Bucket", "arn:aws:s3:::logs")
    }

    fn flags() -> SeedFlags {
        SeedFlags::default()
    }

    #[test]
    fn empty_flags_give_empty_state() {
        let state = seed_state(PrincipalKind::User, &flags(), &provider()).unwrap();
        assert_eq!(state, SelectionState::new(PrincipalKind::User));
    }

    #[test]
    fn principal_flag_is_resolved() {
        let flags = SeedFlags {
            principal: Some("alice".to_string()),
            ..flags()
        };
        let state = seed_state(PrincipalKind::User, &flags, &provider()).unwrap();

        assert_eq!(state.principal().unwrap().arn, "arn:aws:iam::123456789012:user/alice");
        assert_eq!(next(&state), ScreenRequest::OperationList { kind: PrincipalKind::User });
    }

    #[test]
    fn unknown_principal_is_lookup_error() {
        let flags = SeedFlags {
            principal: Some("mallory".to_string()),
            ..flags()
        };
        let err = seed_state(PrincipalKind::User, &flags, &provider()).unwrap_err();

        assert!(matches!(err, SeedError::Lookup(IamError::NotFound { .. })));
    }

    #[test]
    fn unsupported_operation_fails_before_lookups() {
        let provider = provider().failing("ListManagedPolicies");
        let flags = SeedFlags {
            principal: Some("mallory".to_string()),
            operation: Some("add_to_group".to_string()),
            ..flags()
        };
        let err = seed_state(PrincipalKind::Role, &flags, &provider).unwrap_err();

        assert!(matches!(err, SeedError::Unsupported(_)));
    }

    #[test]
    fn policy_by_name_checks_account_then_catalog() {
        let flags = SeedFlags {
            principal: Some("deployer".to_string()),
            operation: Some("attach_policy".to_string()),
            policy: Some("ReadOnlyAccess".to_string()),
            ..flags()
        };
        let state = seed_state(PrincipalKind::Role, &flags, &provider()).unwrap();

        let policy = state.policy().unwrap();
        assert_eq!(policy.origin, PolicyOrigin::AwsManaged);
        assert_eq!(next(&state), ScreenRequest::Result);
    }

    #[test]
    fn policy_by_arn_uses_lookup() {
        let flags = SeedFlags {
            policy: Some("arn:aws:iam::123456789012:policy/team".to_string()),
            ..flags()
        };
        let state = seed_state(PrincipalKind::Group, &flags, &provider()).unwrap();

        assert_eq!(state.policy().unwrap().name, "team");
    }

    #[test]
    fn unknown_policy_is_reported() {
        let flags = SeedFlags {
            policy: Some("Nope".to_string()),
            ..flags()
        };
        let err = seed_state(PrincipalKind::User, &flags, &provider()).unwrap_err();

        assert!(matches!(err, SeedError::PolicyNotFound(name) if name == "Nope"));
    }

    #[test]
    fn policy_with_custom_operation_conflicts() {
        let flags = SeedFlags {
            operation: Some("attach_custom_policy".to_string()),
            policy: Some("team".to_string()),
            ..flags()
        };
        let err = seed_state(PrincipalKind::User, &flags, &provider()).unwrap_err();

        assert!(matches!(err, SeedError::Conflict(_)));
    }

    #[test]
    fn seeded_policy_is_replaced_when_custom_operation_is_picked() {
        let flags = SeedFlags {
            principal: Some("alice".to_string()),
            policy: Some("team".to_string()),
            ..flags()
        };
        let mut state = seed_state(PrincipalKind::User, &flags, &provider()).unwrap();
        state.apply(Selection::Operation(OperationKind::AttachCustomPolicy));

        assert_eq!(next(&state), ScreenRequest::PolicyScopeList);

        state.apply(Selection::PolicyScope(PolicyScope::WithoutResource));
        assert!(matches!(next(&state), ScreenRequest::CreatePolicyForm { .. }));

        state.apply(Selection::Policy(PolicyRef::generated("TeamLogs", "{}")));
        assert_eq!(next(&state), ScreenRequest::Result);
    }

    #[test]
    fn group_flag_requires_group_operation() {
        let flags = SeedFlags {
            operation: Some("attach_policy".to_string()),
            group: Some("admins".to_string()),
            ..flags()
        };
        let err = seed_state(PrincipalKind::User, &flags, &provider()).unwrap_err();

        assert!(matches!(err, SeedError::Conflict(_)));
    }

    #[test]
    fn group_target_on_role_conflicts() {
        let flags = SeedFlags {
            group: Some("admins".to_string()),
            ..flags()
        };
        let err = seed_state(PrincipalKind::Role, &flags, &provider()).unwrap_err();

        assert!(matches!(err, SeedError::Conflict(_)));
    }

    #[test]
    fn full_group_membership_seed_reaches_result() {
        let flags = SeedFlags {
            principal: Some("alice".to_string()),
            operation: Some("add_to_group".to_string()),
            group: Some("admins".to_string()),
            ..flags()
        };
        let state = seed_state(PrincipalKind::User, &flags, &provider()).unwrap();

        assert_eq!(state.group().unwrap().name, "admins");
        assert_eq!(next(&state), ScreenRequest::Result);
    }

    #[test]
    fn resource_by_name_implies_with_resource_scope() {
        let flags = SeedFlags {
            principal: Some("alice".to_string()),
            operation: Some("attach_custom_policy".to_string()),
            service: Some("AWS::S3::Bucket".to_string()),
            resource: Some("logs".to_string()),
            ..flags()
        };
        let state = seed_state(PrincipalKind::User, &flags, &provider()).unwrap();

        assert_eq!(state.policy_scope(), Some(PolicyScope::WithResource));
        assert_eq!(state.resource().unwrap().arn, "arn:aws:s3:::logs");
        assert!(matches!(next(&state), ScreenRequest::CreatePolicyForm { .. }));
    }

    #[test]
    fn unknown_service_is_reported() {
        let flags = SeedFlags {
            service: Some("AWS::Nope::Thing".to_string()),
            ..flags()
        };
        let err = seed_state(PrincipalKind::User, &flags, &provider()).unwrap_err();

        assert!(matches!(err, SeedError::ServiceNotFound(_)));
    }

    #[test]
    fn unknown_resource_is_reported() {
        let flags = SeedFlags {
            service: Some("AWS::S3::Bucket".to_string()),
            resource: Some("missing".to_string()),
            ..flags()
        };
        let err = seed_state(PrincipalKind::User, &flags, &provider()).unwrap_err();

        assert!(matches!(err, SeedError::ResourceNotFound { .. }));
    }

    #[test]
    fn resource_name_without_service_conflicts() {
        let flags = SeedFlags {
            resource: Some("logs".to_string()),
            ..flags()
        };
        let err = seed_state(PrincipalKind::User, &flags, &provider()).unwrap_err();

        assert!(matches!(err, SeedError::Conflict(_)));
    }

    #[test]
    fn service_with_without_resource_option_conflicts() {
        let flags = SeedFlags {
            service: Some("AWS::S3::Bucket".to_string()),
            policy_option: Some("without_resource".to_string()),
            ..flags()
        };
        let err = seed_state(PrincipalKind::User, &flags, &provider()).unwrap_err();

        assert!(matches!(err, SeedError::Conflict(_)));
    }

    #[test]
    fn unknown_policy_option_is_reported() {
        let flags = SeedFlags {
            policy_option: Some("sometimes".to_string()),
            ..flags()
        };
        let err = seed_state(PrincipalKind::User, &flags, &provider()).unwrap_err();

        assert!(matches!(err, SeedError::UnknownPolicyOption(_)));
    }

    #[test]
    fn terraform_flag_is_carried() {
        let flags = SeedFlags {
            terraform: true,
            ..flags()
        };
        let state = seed_state(PrincipalKind::Role, &flags, &provider()).unwrap();
        assert!(state.terraform());
    }
}
