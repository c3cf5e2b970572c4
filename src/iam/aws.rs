//! [`IamProvider`] backed by the AWS SDK.
//!
//! The SDK is async; the wizard is not. Each provider owns a current-thread
//! tokio runtime and blocks on one request at a time.

use aws_config::{BehaviorVersion, Region, SdkConfig};
use aws_sdk_iam::error::DisplayErrorContext;
use aws_sdk_iam::types::PolicyScopeType;
use log::debug;
use tokio::runtime::{Builder, Runtime};

use super::{
    GroupRef, IamError, IamProvider, PolicyRef, PrincipalKind, PrincipalRef, ResourceRef,
    ServiceRef,
};
use crate::catalog::Catalog;

const CREATED_POLICY_DESCRIPTION: &str = "created by targe";

pub fn build_runtime() -> std::io::Result<Runtime> {
    Builder::new_current_thread().enable_all().build()
}

/// Loads credentials and region from the standard AWS environment, optionally
/// pinning the region.
pub async fn load_sdk_config(region: Option<&'static str>) -> SdkConfig {
    let mut loader = aws_config::defaults(BehaviorVersion::latest());
    if let Some(region) = region {
        loader = loader.region(Region::new(region));
    }
    loader.load().await
}

pub(crate) fn api_error<E: std::error::Error>(operation: &'static str, err: E) -> IamError {
    IamError::Api {
        operation,
        message: DisplayErrorContext(&err).to_string(),
    }
}

fn missing(operation: &'static str, field: &str) -> IamError {
    IamError::MalformedResponse {
        operation,
        message: format!("response has no {field}"),
    }
}

/// The marker for the next page, if the listing was truncated.
fn next_marker(is_truncated: bool, marker: Option<String>) -> Option<String> {
    marker.filter(|_| is_truncated)
}

fn not_found(kind: &'static str, name: &str) -> IamError {
    IamError::NotFound {
        kind,
        name: name.to_string(),
    }
}

/// Maps a CloudFormation type name to a Resource Explorer resource type,
/// e.g. `AWS::Logs::LogGroup` becomes `logs:log-group`.
pub fn cloudformation_to_explorer_type(type_name: &str) -> Option<String> {
    let mut parts = type_name.split("::");
    let (Some("AWS"), Some(service), Some(resource), None) =
        (parts.next(), parts.next(), parts.next(), parts.next())
    else {
        return None;
    };

    let mut kebab = String::new();
    let chars: Vec<char> = resource.chars().collect();
    for (i, c) in chars.iter().enumerate() {
        if c.is_ascii_uppercase() && i > 0 && chars[i - 1].is_ascii_lowercase() {
            kebab.push('-');
        }
        kebab.push(c.to_ascii_lowercase());
    }

    Some(format!("{}:{}", service.to_ascii_lowercase(), kebab))
}

pub struct AwsIamProvider {
    runtime: Runtime,
    iam: aws_sdk_iam::Client,
    explorer: aws_sdk_resourceexplorer2::Client,
    catalog: Catalog,
}

impl AwsIamProvider {
    /// Builds SDK clients from the ambient AWS configuration.
    pub fn connect(catalog: Catalog) -> Result<Self, IamError> {
        let runtime = build_runtime()?;
        let config = runtime.block_on(load_sdk_config(None));
        debug!(
            "Loaded AWS configuration for region {}",
            config.region().map(|r| r.as_ref()).unwrap_or("<unset>")
        );

        Ok(Self {
            iam: aws_sdk_iam::Client::new(&config),
            explorer: aws_sdk_resourceexplorer2::Client::new(&config),
            runtime,
            catalog,
        })
    }

    async fn list_users(&self) -> Result<Vec<PrincipalRef>, IamError> {
        let mut principals = Vec::new();
        let mut marker = None;
        loop {
            let page = self
                .iam
                .list_users()
                .set_marker(marker.take())
                .send()
                .await
                .map_err(|err| api_error("ListUsers", err))?;
            principals.extend(
                page.users()
                    .iter()
                    .map(|u| PrincipalRef::new(PrincipalKind::User, u.user_name(), u.arn())),
            );
            match page.marker() {
                Some(next) if page.is_truncated() => marker = Some(next.to_string()),
                _ => break,
            }
        }
        Ok(principals)
    }

    async fn list_all_groups(&self) -> Result<Vec<GroupRef>, IamError> {
        let mut groups = Vec::new();
        let mut marker = None;
        loop {
            let page = self
                .iam
                .list_groups()
                .set_marker(marker.take())
                .send()
                .await
                .map_err(|err| api_error("ListGroups", err))?;
            groups.extend(
                page.groups()
                    .iter()
                    .map(|g| GroupRef::new(g.group_name(), g.arn())),
            );
            match page.marker() {
                Some(next) if page.is_truncated() => marker = Some(next.to_string()),
                _ => break,
            }
        }
        Ok(groups)
    }

    async fn list_roles(&self) -> Result<Vec<PrincipalRef>, IamError> {
        let mut principals = Vec::new();
        let mut marker = None;
        loop {
            let page = self
                .iam
                .list_roles()
                .set_marker(marker.take())
                .send()
                .await
                .map_err(|err| api_error("ListRoles", err))?;
            principals.extend(
                page.roles()
                    .iter()
                    .map(|r| PrincipalRef::new(PrincipalKind::Role, r.role_name(), r.arn())),
            );
            match page.marker() {
                Some(next) if page.is_truncated() => marker = Some(next.to_string()),
                _ => break,
            }
        }
        Ok(principals)
    }

    async fn get_principal(&self, kind: PrincipalKind, name: &str) -> Result<PrincipalRef, IamError> {
        match kind {
            PrincipalKind::User => {
                let output = self
                    .iam
                    .get_user()
                    .user_name(name)
                    .send()
                    .await
                    .map_err(|err| {
                        if err
                            .as_service_error()
                            .is_some_and(|e| e.is_no_such_entity_exception())
                        {
                            not_found(kind.as_str(), name)
                        } else {
                            api_error("GetUser", err)
                        }
                    })?;
                let user = output.user().ok_or_else(|| missing("GetUser", "user"))?;
                Ok(PrincipalRef::new(kind, user.user_name(), user.arn()))
            }
            PrincipalKind::Group => {
                let output = self
                    .iam
                    .get_group()
                    .group_name(name)
                    .send()
                    .await
                    .map_err(|err| {
                        if err
                            .as_service_error()
                            .is_some_and(|e| e.is_no_such_entity_exception())
                        {
                            not_found(kind.as_str(), name)
                        } else {
                            api_error("GetGroup", err)
                        }
                    })?;
                let group = output.group().ok_or_else(|| missing("GetGroup", "group"))?;
                Ok(PrincipalRef::new(kind, group.group_name(), group.arn()))
            }
            PrincipalKind::Role => {
                let output = self
                    .iam
                    .get_role()
                    .role_name(name)
                    .send()
                    .await
                    .map_err(|err| {
                        if err
                            .as_service_error()
                            .is_some_and(|e| e.is_no_such_entity_exception())
                        {
                            not_found(kind.as_str(), name)
                        } else {
                            api_error("GetRole", err)
                        }
                    })?;
                let role = output.role().ok_or_else(|| missing("GetRole", "role"))?;
                Ok(PrincipalRef::new(kind, role.role_name(), role.arn()))
            }
        }
    }

    async fn attached_policy_names(&self, principal: &PrincipalRef) -> Result<Vec<String>, IamError> {
        let name = principal.name.as_str();
        let mut names = Vec::new();
        let mut marker = None;
        loop {
            let (attached, next) = match principal.kind {
                PrincipalKind::User => {
                    let page = self
                        .iam
                        .list_attached_user_policies()
                        .user_name(name)
                        .set_marker(marker.take())
                        .send()
                        .await
                        .map_err(|err| api_error("ListAttachedUserPolicies", err))?;
                    (page.attached_policies, next_marker(page.is_truncated, page.marker))
                }
                PrincipalKind::Group => {
                    let page = self
                        .iam
                        .list_attached_group_policies()
                        .group_name(name)
                        .set_marker(marker.take())
                        .send()
                        .await
                        .map_err(|err| api_error("ListAttachedGroupPolicies", err))?;
                    (page.attached_policies, next_marker(page.is_truncated, page.marker))
                }
                PrincipalKind::Role => {
                    let page = self
                        .iam
                        .list_attached_role_policies()
                        .role_name(name)
                        .set_marker(marker.take())
                        .send()
                        .await
                        .map_err(|err| api_error("ListAttachedRolePolicies", err))?;
                    (page.attached_policies, next_marker(page.is_truncated, page.marker))
                }
            };
            names.extend(
                attached
                    .unwrap_or_default()
                    .into_iter()
                    .filter_map(|policy| policy.policy_name),
            );
            match next {
                Some(next) => marker = Some(next),
                None => break,
            }
        }
        Ok(names)
    }

    async fn inline_policy_names(&self, principal: &PrincipalRef) -> Result<Vec<String>, IamError> {
        let name = principal.name.as_str();
        let mut names = Vec::new();
        let mut marker = None;
        loop {
            let (page_names, next) = match principal.kind {
                PrincipalKind::User => {
                    let page = self
                        .iam
                        .list_user_policies()
                        .user_name(name)
                        .set_marker(marker.take())
                        .send()
                        .await
                        .map_err(|err| api_error("ListUserPolicies", err))?;
                    (page.policy_names, next_marker(page.is_truncated, page.marker))
                }
                PrincipalKind::Group => {
                    let page = self
                        .iam
                        .list_group_policies()
                        .group_name(name)
                        .set_marker(marker.take())
                        .send()
                        .await
                        .map_err(|err| api_error("ListGroupPolicies", err))?;
                    (page.policy_names, next_marker(page.is_truncated, page.marker))
                }
                PrincipalKind::Role => {
                    let page = self
                        .iam
                        .list_role_policies()
                        .role_name(name)
                        .set_marker(marker.take())
                        .send()
                        .await
                        .map_err(|err| api_error("ListRolePolicies", err))?;
                    (page.policy_names, next_marker(page.is_truncated, page.marker))
                }
            };
            names.extend(page_names);
            match next {
                Some(next) => marker = Some(next),
                None => break,
            }
        }
        Ok(names)
    }

    async fn search_resources(&self, query: String) -> Result<Vec<ResourceRef>, IamError> {
        let mut resources = Vec::new();
        let mut next_token = None;
        loop {
            let page = self
                .explorer
                .search()
                .query_string(query.clone())
                .set_next_token(next_token.take())
                .send()
                .await
                .map_err(|err| api_error("Search", err))?;
            resources.extend(
                page.resources()
                    .iter()
                    .filter_map(|resource| resource.arn())
                    .map(ResourceRef::from_arn),
            );
            match page.next_token() {
                Some(next) => next_token = Some(next.to_string()),
                None => break,
            }
        }
        Ok(resources)
    }
}

impl IamProvider for AwsIamProvider {
    fn list_principals(&self, kind: PrincipalKind) -> Result<Vec<PrincipalRef>, IamError> {
        debug!("Listing IAM {}", kind.plural());
        self.runtime.block_on(async {
            match kind {
                PrincipalKind::User => self.list_users().await,
                PrincipalKind::Group => Ok(self
                    .list_all_groups()
                    .await?
                    .into_iter()
                    .map(|g| PrincipalRef::new(PrincipalKind::Group, g.name, g.arn))
                    .collect()),
                PrincipalKind::Role => self.list_roles().await,
            }
        })
    }

    fn find_principal(&self, kind: PrincipalKind, name: &str) -> Result<PrincipalRef, IamError> {
        self.runtime.block_on(self.get_principal(kind, name))
    }

    fn find_policy(&self, arn: &str) -> Result<PolicyRef, IamError> {
        self.runtime.block_on(async {
            let output = self
                .iam
                .get_policy()
                .policy_arn(arn)
                .send()
                .await
                .map_err(|err| {
                    if err
                        .as_service_error()
                        .is_some_and(|e| e.is_no_such_entity_exception())
                    {
                        not_found("policy", arn)
                    } else {
                        api_error("GetPolicy", err)
                    }
                })?;
            let policy = output.policy().ok_or_else(|| missing("GetPolicy", "policy"))?;
            let name = policy
                .policy_name()
                .ok_or_else(|| missing("GetPolicy", "policy name"))?;
            Ok(PolicyRef::from_arn(name, policy.arn().unwrap_or(arn)))
        })
    }

    fn list_managed_policies(&self) -> Result<Vec<PolicyRef>, IamError> {
        debug!("Listing customer managed policies");
        self.runtime.block_on(async {
            let mut policies = Vec::new();
            let mut marker = None;
            loop {
                let page = self
                    .iam
                    .list_policies()
                    .scope(PolicyScopeType::Local)
                    .set_marker(marker.take())
                    .send()
                    .await
                    .map_err(|err| api_error("ListPolicies", err))?;
                policies.extend(page.policies().iter().filter_map(|p| {
                    Some(PolicyRef::customer_managed(p.policy_name()?, p.arn()?))
                }));
                match page.marker() {
                    Some(next) if page.is_truncated() => marker = Some(next.to_string()),
                    _ => break,
                }
            }
            Ok(policies)
        })
    }

    fn list_managed_policy_catalog(&self) -> Result<Vec<PolicyRef>, IamError> {
        Ok(self.catalog.managed_policies()?)
    }

    fn list_attached_policy_names(&self, principal: &PrincipalRef) -> Result<Vec<String>, IamError> {
        self.runtime.block_on(self.attached_policy_names(principal))
    }

    fn list_inline_policy_names(&self, principal: &PrincipalRef) -> Result<Vec<String>, IamError> {
        self.runtime.block_on(self.inline_policy_names(principal))
    }

    fn list_groups(&self) -> Result<Vec<GroupRef>, IamError> {
        self.runtime.block_on(self.list_all_groups())
    }

    fn list_groups_for_user(&self, user_name: &str) -> Result<Vec<String>, IamError> {
        self.runtime.block_on(async {
            let mut groups = Vec::new();
            let mut marker = None;
            loop {
                let page = self
                    .iam
                    .list_groups_for_user()
                    .user_name(user_name)
                    .set_marker(marker.take())
                    .send()
                    .await
                    .map_err(|err| api_error("ListGroupsForUser", err))?;
                groups.extend(page.groups().iter().map(|g| g.group_name().to_string()));
                match page.marker() {
                    Some(next) if page.is_truncated() => marker = Some(next.to_string()),
                    _ => break,
                }
            }
            Ok(groups)
        })
    }

    fn attach_managed_policy(&self, principal: &PrincipalRef, policy_arn: &str) -> Result<(), IamError> {
        let name = principal.name.as_str();
        self.runtime.block_on(async {
            match principal.kind {
                PrincipalKind::User => self
                    .iam
                    .attach_user_policy()
                    .user_name(name)
                    .policy_arn(policy_arn)
                    .send()
                    .await
                    .map(|_| ())
                    .map_err(|err| api_error("AttachUserPolicy", err)),
                PrincipalKind::Group => self
                    .iam
                    .attach_group_policy()
                    .group_name(name)
                    .policy_arn(policy_arn)
                    .send()
                    .await
                    .map(|_| ())
                    .map_err(|err| api_error("AttachGroupPolicy", err)),
                PrincipalKind::Role => self
                    .iam
                    .attach_role_policy()
                    .role_name(name)
                    .policy_arn(policy_arn)
                    .send()
                    .await
                    .map(|_| ())
                    .map_err(|err| api_error("AttachRolePolicy", err)),
            }
        })
    }

    fn detach_managed_policy(&self, principal: &PrincipalRef, policy_arn: &str) -> Result<(), IamError> {
        let name = principal.name.as_str();
        self.runtime.block_on(async {
            match principal.kind {
                PrincipalKind::User => self
                    .iam
                    .detach_user_policy()
                    .user_name(name)
                    .policy_arn(policy_arn)
                    .send()
                    .await
                    .map(|_| ())
                    .map_err(|err| api_error("DetachUserPolicy", err)),
                PrincipalKind::Group => self
                    .iam
                    .detach_group_policy()
                    .group_name(name)
                    .policy_arn(policy_arn)
                    .send()
                    .await
                    .map(|_| ())
                    .map_err(|err| api_error("DetachGroupPolicy", err)),
                PrincipalKind::Role => self
                    .iam
                    .detach_role_policy()
                    .role_name(name)
                    .policy_arn(policy_arn)
                    .send()
                    .await
                    .map(|_| ())
                    .map_err(|err| api_error("DetachRolePolicy", err)),
            }
        })
    }

    fn delete_inline_policy(&self, principal: &PrincipalRef, policy_name: &str) -> Result<(), IamError> {
        let name = principal.name.as_str();
        self.runtime.block_on(async {
            match principal.kind {
                PrincipalKind::User => self
                    .iam
                    .delete_user_policy()
                    .user_name(name)
                    .policy_name(policy_name)
                    .send()
                    .await
                    .map(|_| ())
                    .map_err(|err| api_error("DeleteUserPolicy", err)),
                PrincipalKind::Group => self
                    .iam
                    .delete_group_policy()
                    .group_name(name)
                    .policy_name(policy_name)
                    .send()
                    .await
                    .map(|_| ())
                    .map_err(|err| api_error("DeleteGroupPolicy", err)),
                PrincipalKind::Role => self
                    .iam
                    .delete_role_policy()
                    .role_name(name)
                    .policy_name(policy_name)
                    .send()
                    .await
                    .map(|_| ())
                    .map_err(|err| api_error("DeleteRolePolicy", err)),
            }
        })
    }

    fn create_managed_policy(&self, name: &str, document: &str) -> Result<String, IamError> {
        self.runtime.block_on(async {
            let output = self
                .iam
                .create_policy()
                .policy_name(name)
                .policy_document(document)
                .description(CREATED_POLICY_DESCRIPTION)
                .send()
                .await
                .map_err(|err| api_error("CreatePolicy", err))?;
            output
                .policy()
                .and_then(|policy| policy.arn())
                .map(str::to_string)
                .ok_or_else(|| missing("CreatePolicy", "policy ARN"))
        })
    }

    fn add_user_to_group(&self, user_name: &str, group_name: &str) -> Result<(), IamError> {
        self.runtime.block_on(async {
            self.iam
                .add_user_to_group()
                .user_name(user_name)
                .group_name(group_name)
                .send()
                .await
                .map(|_| ())
                .map_err(|err| api_error("AddUserToGroup", err))
        })
    }

    fn remove_user_from_group(&self, user_name: &str, group_name: &str) -> Result<(), IamError> {
        self.runtime.block_on(async {
            self.iam
                .remove_user_from_group()
                .user_name(user_name)
                .group_name(group_name)
                .send()
                .await
                .map(|_| ())
                .map_err(|err| api_error("RemoveUserFromGroup", err))
        })
    }

    fn list_resources_for_service(&self, service_name: &str) -> Result<Vec<ResourceRef>, IamError> {
        let resource_type = cloudformation_to_explorer_type(service_name)
            .unwrap_or_else(|| service_name.to_string());
        debug!("Searching resources of type {}", resource_type);
        self.runtime
            .block_on(self.search_resources(format!("resourcetype:{resource_type}")))
    }

    fn list_service_catalog(&self) -> Result<Vec<ServiceRef>, IamError> {
        Ok(self.catalog.services()?)
    }
}
