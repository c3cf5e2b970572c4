//! Turns provider responses into the items each screen lists.

use log::debug;
use thiserror::Error;

use crate::iam::{IamError, IamProvider, PolicyRef, PrincipalRef};
use crate::synth::{GeneratedPolicy, PolicyRequest, PolicySynthesizer, SynthError};

use super::differ::offerable;
use super::navigator::{self, ScreenRequest};
use super::operation::{KindProfile, PolicyScope};
use super::state::{Selection, SelectionState};

/// A screen's data could not be fetched. The screen shows the cause and
/// lets the user retry or quit.
#[derive(Debug, Error)]
pub enum LoadFailed {
    #[error("Failed to load {what}: {source}")]
    Provider {
        what: &'static str,
        #[source]
        source: IamError,
    },

    #[error("Failed to generate policy: {0}")]
    Synth(#[from] SynthError),
}

fn provider_error(what: &'static str) -> impl FnOnce(IamError) -> LoadFailed {
    move |source| LoadFailed::Provider { what, source }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ListItem {
    pub title: String,
    pub description: String,
    pub selection: Selection,
}

/// The screen to render after resolving empty lists.
#[derive(Debug, Clone, PartialEq)]
pub enum LoadedScreen {
    List {
        request: ScreenRequest,
        items: Vec<ListItem>,
    },
    /// Nothing to list and nothing to fall back to.
    Empty { request: ScreenRequest },
    Form { request: ScreenRequest },
    Result,
}

pub struct ScreenLoader<'a> {
    provider: &'a dyn IamProvider,
}

impl<'a> ScreenLoader<'a> {
    pub fn new(provider: &'a dyn IamProvider) -> Self {
        Self { provider }
    }

    /// Finds the next screen for `state` and loads its items.
    ///
    /// A list screen that loads no items triggers the navigator's fallback,
    /// which clears the fields that led there, and the next screen is tried.
    pub fn resolve(&self, state: &mut SelectionState) -> Result<LoadedScreen, LoadFailed> {
        loop {
            let request = navigator::next(state);
            match request {
                ScreenRequest::Result => return Ok(LoadedScreen::Result),
                ScreenRequest::CreatePolicyForm { .. } => return Ok(LoadedScreen::Form { request }),
                _ => {
                    let items = self.load(&request)?;
                    if !items.is_empty() {
                        return Ok(LoadedScreen::List { request, items });
                    }
                    if !navigator::fallback_for_empty(&request, state) {
                        return Ok(LoadedScreen::Empty { request });
                    }
                    debug!("{} has no items, falling back", request.title());
                }
            }
        }
    }

    /// Loads the items of a list screen; other screens have none.
    pub fn load(&self, request: &ScreenRequest) -> Result<Vec<ListItem>, LoadFailed> {
        debug!("Loading items for screen: {}", request.title());
        match request {
            ScreenRequest::PrincipalList { kind } => {
                let principals = self
                    .provider
                    .list_principals(*kind)
                    .map_err(provider_error(kind.plural()))?;
                Ok(principals
                    .into_iter()
                    .map(|principal| ListItem {
                        title: principal.name.clone(),
                        description: principal.arn.clone(),
                        selection: Selection::Principal(principal),
                    })
                    .collect())
            }
            ScreenRequest::OperationList { kind } => Ok(KindProfile::of(*kind)
                .operations
                .iter()
                .map(|&operation| ListItem {
                    title: operation.title().to_string(),
                    description: operation.description(*kind),
                    selection: Selection::Operation(operation),
                })
                .collect()),
            ScreenRequest::GroupList { user, for_add } => self.load_groups(user, *for_add),
            ScreenRequest::PolicyScopeList => Ok(PolicyScope::ALL
                .into_iter()
                .map(|scope| ListItem {
                    title: scope.title().to_string(),
                    description: scope.description().to_string(),
                    selection: Selection::PolicyScope(scope),
                })
                .collect()),
            ScreenRequest::ServiceList => {
                let services = self
                    .provider
                    .list_service_catalog()
                    .map_err(provider_error("services"))?;
                Ok(services
                    .into_iter()
                    .map(|service| ListItem {
                        title: service.name.clone(),
                        description: service.description.clone(),
                        selection: Selection::Service(service),
                    })
                    .collect())
            }
            ScreenRequest::ResourceList { service } => {
                let resources = self
                    .provider
                    .list_resources_for_service(&service.name)
                    .map_err(provider_error("resources"))?;
                Ok(resources
                    .into_iter()
                    .map(|resource| ListItem {
                        title: resource.name.clone(),
                        description: resource.arn.clone(),
                        selection: Selection::Resource(resource),
                    })
                    .collect())
            }
            ScreenRequest::PolicyList {
                principal,
                for_attach,
            } => self.load_policies(principal, *for_attach),
            ScreenRequest::CreatePolicyForm { .. } | ScreenRequest::Result => Ok(Vec::new()),
        }
    }

    fn load_groups(&self, user: &PrincipalRef, for_add: bool) -> Result<Vec<ListItem>, LoadFailed> {
        let groups = self.provider.list_groups().map_err(provider_error("groups"))?;
        let membership = self
            .provider
            .list_groups_for_user(&user.name)
            .map_err(provider_error("group memberships"))?;

        Ok(groups
            .into_iter()
            .filter(|group| membership.contains(&group.name) != for_add)
            .map(|group| ListItem {
                title: group.name.clone(),
                description: group.arn.clone(),
                selection: Selection::Group(group),
            })
            .collect())
    }

    fn load_policies(&self, principal: &PrincipalRef, for_attach: bool) -> Result<Vec<ListItem>, LoadFailed> {
        let mut all_policies = self
            .provider
            .list_managed_policies()
            .map_err(provider_error("account policies"))?;
        all_policies.extend(
            self.provider
                .list_managed_policy_catalog()
                .map_err(provider_error("managed policy catalog"))?,
        );
        let attached = self
            .provider
            .list_attached_policy_names(principal)
            .map_err(provider_error("attached policies"))?;
        let inline = if for_attach {
            Vec::new()
        } else {
            self.provider
                .list_inline_policy_names(principal)
                .map_err(provider_error("inline policies"))?
        };

        Ok(offerable(&all_policies, &attached, &inline, for_attach)
            .into_iter()
            .map(|policy| ListItem {
                title: policy.name.clone(),
                description: policy_description(&policy),
                selection: Selection::Policy(policy),
            })
            .collect())
    }
}

fn policy_description(policy: &PolicyRef) -> String {
    if policy.is_inline() {
        "Inline policy".to_string()
    } else {
        policy.arn.clone()
    }
}

/// Runs the synthesizer for the create-policy form.
pub fn generate_policy(
    synthesizer: &dyn PolicySynthesizer,
    request: &ScreenRequest,
    description: &str,
) -> Result<GeneratedPolicy, LoadFailed> {
    let (service, resource) = match request {
        ScreenRequest::CreatePolicyForm { service, resource } => (service, resource),
        _ => (&None, &None),
    };
    let policy_request = PolicyRequest {
        description: description.to_string(),
        service: service.as_ref().map(|s| s.name.clone()),
        resource_arn: resource.as_ref().map(|r| r.arn.clone()),
    };
    Ok(synthesizer.generate(&policy_request)?)
}
