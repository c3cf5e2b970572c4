//! The selection record for one wizard run.

use crate::iam::{GroupRef, PolicyRef, PrincipalKind, PrincipalRef, ResourceRef, ServiceRef};

use super::operation::{OperationKind, PolicyScope};

/// One confirmed pick from a list screen or form.
#[derive(Debug, Clone, PartialEq)]
pub enum Selection {
    Principal(PrincipalRef),
    Operation(OperationKind),
    Group(GroupRef),
    PolicyScope(PolicyScope),
    Service(ServiceRef),
    Resource(ResourceRef),
    Policy(PolicyRef),
}

/// Everything chosen so far.
///
/// Fields fill in the order principal, operation, then either group or
/// policy scope, service and resource, then policy. Replacing a field with a
/// different value clears every field that depends on it.
#[derive(Debug, Clone, PartialEq)]
pub struct SelectionState {
    kind: PrincipalKind,
    principal: Option<PrincipalRef>,
    operation: Option<OperationKind>,
    group: Option<GroupRef>,
    policy_scope: Option<PolicyScope>,
    service: Option<ServiceRef>,
    resource: Option<ResourceRef>,
    policy: Option<PolicyRef>,
    terraform: bool,
}

impl SelectionState {
    pub fn new(kind: PrincipalKind) -> Self {
        Self {
            kind,
            principal: None,
            operation: None,
            group: None,
            policy_scope: None,
            service: None,
            resource: None,
            policy: None,
            terraform: false,
        }
    }

    pub fn kind(&self) -> PrincipalKind {
        self.kind
    }

    pub fn principal(&self) -> Option<&PrincipalRef> {
        self.principal.as_ref()
    }

    pub fn operation(&self) -> Option<OperationKind> {
        self.operation
    }

    pub fn group(&self) -> Option<&GroupRef> {
        self.group.as_ref()
    }

    pub fn policy_scope(&self) -> Option<PolicyScope> {
        self.policy_scope
    }

    pub fn service(&self) -> Option<&ServiceRef> {
        self.service.as_ref()
    }

    pub fn resource(&self) -> Option<&ResourceRef> {
        self.resource.as_ref()
    }

    pub fn policy(&self) -> Option<&PolicyRef> {
        self.policy.as_ref()
    }

    pub fn terraform(&self) -> bool {
        self.terraform
    }

    pub fn set_terraform(&mut self, terraform: bool) {
        self.terraform = terraform;
    }

    pub fn apply(&mut self, selection: Selection) {
        match selection {
            Selection::Principal(principal) => self.set_principal(principal),
            Selection::Operation(operation) => self.set_operation(operation),
            Selection::Group(group) => self.set_group(group),
            Selection::PolicyScope(scope) => self.set_policy_scope(scope),
            Selection::Service(service) => self.set_service(service),
            Selection::Resource(resource) => self.set_resource(resource),
            Selection::Policy(policy) => self.set_policy(policy),
        }
    }

    pub fn set_principal(&mut self, principal: PrincipalRef) {
        if self.principal.as_ref().is_some_and(|p| *p != principal) {
            self.clear_operation();
        }
        self.principal = Some(principal);
    }

    pub fn set_operation(&mut self, operation: OperationKind) {
        if self.operation.is_some_and(|op| op != operation) {
            self.clear_operation_dependents();
        }
        self.operation = Some(operation);
    }

    pub fn set_group(&mut self, group: GroupRef) {
        self.group = Some(group);
    }

    pub fn set_policy_scope(&mut self, scope: PolicyScope) {
        if self.policy_scope.is_some_and(|s| s != scope) {
            self.clear_service();
            self.policy = None;
        }
        self.policy_scope = Some(scope);
    }

    pub fn set_service(&mut self, service: ServiceRef) {
        if self.service.as_ref().is_some_and(|s| *s != service) {
            self.resource = None;
            self.policy = None;
        }
        self.service = Some(service);
    }

    pub fn set_resource(&mut self, resource: ResourceRef) {
        if self.resource.as_ref().is_some_and(|r| *r != resource) {
            self.policy = None;
        }
        self.resource = Some(resource);
    }

    pub fn set_policy(&mut self, policy: PolicyRef) {
        self.policy = Some(policy);
    }

    /// Clears the operation and everything chosen after it.
    pub fn clear_operation(&mut self) {
        self.operation = None;
        self.clear_operation_dependents();
    }

    fn clear_operation_dependents(&mut self) {
        self.group = None;
        self.policy_scope = None;
        self.service = None;
        self.resource = None;
        self.policy = None;
    }

    /// Clears the policy scope, the service and resource below it, and any generated policy.
    pub fn clear_policy_scope(&mut self) {
        self.policy_scope = None;
        self.clear_service();
    }

    /// Clears the service, its resource and any generated policy.
    pub fn clear_service(&mut self) {
        self.service = None;
        self.resource = None;
        self.policy = None;
    }

    pub fn clear_policy(&mut self) {
        self.policy = None;
    }

    /// Label/value rows for every field that is set, in selection order.
    pub fn overview(&self) -> Vec<(&'static str, String)> {
        let mut rows = Vec::new();
        if let Some(principal) = &self.principal {
            rows.push((self.kind.label(), principal.name.clone()));
            rows.push(("ARN", principal.arn.clone()));
        }
        if let Some(operation) = self.operation {
            rows.push(("Operation", operation.title().to_string()));
        }
        if let Some(group) = &self.group {
            rows.push(("Group", group.name.clone()));
        }
        if let Some(scope) = self.policy_scope {
            rows.push(("Policy Option", scope.title().to_string()));
        }
        if let Some(service) = &self.service {
            rows.push(("Service", service.name.clone()));
        }
        if let Some(resource) = &self.resource {
            rows.push(("Resource", resource.arn.clone()));
        }
        if let Some(policy) = &self.policy {
            rows.push(("Policy", policy.name.clone()));
            rows.push(("Policy ARN", policy.arn.clone()));
        }
        if self.terraform {
            rows.push(("Terraform", "yes".to_string()));
        }
        rows
    }
}
