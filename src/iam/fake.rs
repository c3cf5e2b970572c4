//! In-memory [`IamProvider`] used by unit tests.
//!
//! Records every mutation so tests can assert exactly which IAM calls a
//! dispatch produced, and can be told to fail individual operations.

use std::cell::{Cell, RefCell};
use std::collections::{HashMap, HashSet};

use super::{
    GroupRef, IamError, IamProvider, PolicyRef, PrincipalKind, PrincipalRef, ResourceRef,
    ServiceRef,
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    Attach { principal: String, arn: String },
    Detach { principal: String, arn: String },
    DeleteInline { principal: String, name: String },
    Create { name: String, document: String },
    AddToGroup { user: String, group: String },
    RemoveFromGroup { user: String, group: String },
}

#[derive(Default)]
pub struct FakeIamProvider {
    principals: Vec<PrincipalRef>,
    account_policies: Vec<PolicyRef>,
    catalog_policies: Vec<PolicyRef>,
    attached: HashMap<String, Vec<String>>,
    inline: HashMap<String, Vec<String>>,
    memberships: HashMap<String, Vec<String>>,
    resources: HashMap<String, Vec<ResourceRef>>,
    services: Vec<ServiceRef>,
    failing: HashSet<&'static str>,
    created: Cell<usize>,
    calls: RefCell<Vec<Call>>,
}

fn arn_for(kind: PrincipalKind, name: &str) -> String {
    format!("arn:aws:iam::123456789012:{}/{}", kind.as_str(), name)
}

impl FakeIamProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_principal(mut self, kind: PrincipalKind, name: &str) -> Self {
        self.principals
            .push(PrincipalRef::new(kind, name, arn_for(kind, name)));
        self
    }

    pub fn with_account_policy(mut self, name: &str) -> Self {
        self.account_policies.push(PolicyRef::customer_managed(
            name,
            format!("arn:aws:iam::123456789012:policy/{name}"),
        ));
        self
    }

    pub fn with_catalog_policy(mut self, name: &str) -> Self {
        self.catalog_policies.push(PolicyRef::aws_managed(
            name,
            format!("arn:aws:iam::aws:policy/{name}"),
        ));
        self
    }

    pub fn with_attached(mut self, principal: &str, policy: &str) -> Self {
        self.attached
            .entry(principal.to_string())
            .or_default()
            .push(policy.to_string());
        self
    }

    pub fn with_inline(mut self, principal: &str, policy: &str) -> Self {
        self.inline
            .entry(principal.to_string())
            .or_default()
            .push(policy.to_string());
        self
    }

    pub fn with_membership(mut self, user: &str, group: &str) -> Self {
        self.memberships
            .entry(user.to_string())
            .or_default()
            .push(group.to_string());
        self
    }

    pub fn with_service(mut self, name: &str) -> Self {
        self.services.push(ServiceRef {
            name: name.to_string(),
            description: format!("{name} resources"),
        });
        self
    }

    pub fn with_resource(mut self, service: &str, arn: &str) -> Self {
        self.resources
            .entry(service.to_string())
            .or_default()
            .push(ResourceRef::from_arn(arn));
        self
    }

    /// Makes every call of the named operation fail, e.g. `"AttachManagedPolicy"`.
    pub fn failing(mut self, operation: &'static str) -> Self {
        self.failing.insert(operation);
        self
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.borrow().clone()
    }

    fn check(&self, operation: &'static str) -> Result<(), IamError> {
        if self.failing.contains(operation) {
            return Err(IamError::Api {
                operation,
                message: "simulated failure".to_string(),
            });
        }
        Ok(())
    }

    fn record(&self, call: Call) {
        self.calls.borrow_mut().push(call);
    }
}

impl IamProvider for FakeIamProvider {
    fn list_principals(&self, kind: PrincipalKind) -> Result<Vec<PrincipalRef>, IamError> {
        self.check("ListPrincipals")?;
        Ok(self
            .principals
            .iter()
            .filter(|p| p.kind == kind)
            .cloned()
            .collect())
    }

    fn find_principal(&self, kind: PrincipalKind, name: &str) -> Result<PrincipalRef, IamError> {
        self.principals
            .iter()
            .find(|p| p.kind == kind && p.name == name)
            .cloned()
            .ok_or_else(|| IamError::NotFound {
                kind: kind.as_str(),
                name: name.to_string(),
            })
    }

    fn find_policy(&self, arn: &str) -> Result<PolicyRef, IamError> {
        self.account_policies
            .iter()
            .chain(self.catalog_policies.iter())
            .find(|p| p.arn == arn)
            .cloned()
            .ok_or_else(|| IamError::NotFound {
                kind: "policy",
                name: arn.to_string(),
            })
    }

    fn list_managed_policies(&self) -> Result<Vec<PolicyRef>, IamError> {
        self.check("ListManagedPolicies")?;
        Ok(self.account_policies.clone())
    }

    fn list_managed_policy_catalog(&self) -> Result<Vec<PolicyRef>, IamError> {
        self.check("ListManagedPolicyCatalog")?;
        Ok(self.catalog_policies.clone())
    }

    fn list_attached_policy_names(&self, principal: &PrincipalRef) -> Result<Vec<String>, IamError> {
        self.check("ListAttachedPolicyNames")?;
        Ok(self.attached.get(&principal.name).cloned().unwrap_or_default())
    }

    fn list_inline_policy_names(&self, principal: &PrincipalRef) -> Result<Vec<String>, IamError> {
        self.check("ListInlinePolicyNames")?;
        Ok(self.inline.get(&principal.name).cloned().unwrap_or_default())
    }

    fn list_groups(&self) -> Result<Vec<GroupRef>, IamError> {
        self.check("ListGroups")?;
        Ok(self
            .principals
            .iter()
            .filter(|p| p.kind == PrincipalKind::Group)
            .map(|p| GroupRef::new(p.name.clone(), p.arn.clone()))
            .collect())
    }

    fn list_groups_for_user(&self, user_name: &str) -> Result<Vec<String>, IamError> {
        self.check("ListGroupsForUser")?;
        Ok(self.memberships.get(user_name).cloned().unwrap_or_default())
    }

    fn attach_managed_policy(&self, principal: &PrincipalRef, policy_arn: &str) -> Result<(), IamError> {
        self.check("AttachManagedPolicy")?;
        self.record(Call::Attach {
            principal: principal.name.clone(),
            arn: policy_arn.to_string(),
        });
        Ok(())
    }

    fn detach_managed_policy(&self, principal: &PrincipalRef, policy_arn: &str) -> Result<(), IamError> {
        self.check("DetachManagedPolicy")?;
        self.record(Call::Detach {
            principal: principal.name.clone(),
            arn: policy_arn.to_string(),
        });
        Ok(())
    }

    fn delete_inline_policy(&self, principal: &PrincipalRef, policy_name: &str) -> Result<(), IamError> {
        self.check("DeleteInlinePolicy")?;
        self.record(Call::DeleteInline {
            principal: principal.name.clone(),
            name: policy_name.to_string(),
        });
        Ok(())
    }

    fn create_managed_policy(&self, name: &str, document: &str) -> Result<String, IamError> {
        self.check("CreateManagedPolicy")?;
        self.created.set(self.created.get() + 1);
        self.record(Call::Create {
            name: name.to_string(),
            document: document.to_string(),
        });
        Ok(format!("arn:aws:iam::123456789012:policy/{name}"))
    }

    fn add_user_to_group(&self, user_name: &str, group_name: &str) -> Result<(), IamError> {
        self.check("AddUserToGroup")?;
        self.record(Call::AddToGroup {
            user: user_name.to_string(),
            group: group_name.to_string(),
        });
        Ok(())
    }

    fn remove_user_from_group(&self, user_name: &str, group_name: &str) -> Result<(), IamError> {
        self.check("RemoveUserFromGroup")?;
        self.record(Call::RemoveFromGroup {
            user: user_name.to_string(),
            group: group_name.to_string(),
        });
        Ok(())
    }

    fn list_resources_for_service(&self, service_name: &str) -> Result<Vec<ResourceRef>, IamError> {
        self.check("ListResourcesForService")?;
        Ok(self.resources.get(service_name).cloned().unwrap_or_default())
    }

    fn list_service_catalog(&self) -> Result<Vec<ServiceRef>, IamError> {
        self.check("ListServiceCatalog")?;
        Ok(self.services.clone())
    }
}
