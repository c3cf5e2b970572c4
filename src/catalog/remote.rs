use std::time::Duration;

use aws_sdk_cloudformation::types::{ProvisioningType, RegistryType, Visibility};
use log::debug;

use super::{CatalogError, CatalogSource, ManagedPolicyEntry, ServiceEntry};
use crate::iam::aws::{build_runtime, load_sdk_config};

const MANAGED_POLICIES_URL: &str =
    "https://aws-managed-policies-list.s3.eu-central-1.amazonaws.com/policies.json";
const HTTP_TIMEOUT_SECONDS: u64 = 30;
/// The CloudFormation registry is global; public types are identical in every region.
const REGISTRY_REGION: &str = "us-east-1";
const LIST_TYPES_PAGE_SIZE: i32 = 100;

/// Downloads the managed policy list over HTTPS and reads resource types from
/// the CloudFormation registry.
pub struct RemoteCatalogSource;

impl CatalogSource for RemoteCatalogSource {
    fn fetch_managed_policies(&self) -> Result<Vec<ManagedPolicyEntry>, CatalogError> {
        debug!("Downloading managed policy list from {}", MANAGED_POLICIES_URL);

        let download_error = |message: String| CatalogError::Download {
            what: "managed policy list",
            message,
        };

        let agent = ureq::Agent::config_builder()
            .timeout_per_call(Some(Duration::from_secs(HTTP_TIMEOUT_SECONDS)))
            .user_agent(format!("targe/{}", env!("CARGO_PKG_VERSION")))
            .build()
            .new_agent();

        let mut response = agent
            .get(MANAGED_POLICIES_URL)
            .header("Accept", "application/json")
            .call()
            .map_err(|err| download_error(err.to_string()))?;

        let body = response
            .body_mut()
            .read_to_string()
            .map_err(|err| download_error(err.to_string()))?;

        let policies: Vec<ManagedPolicyEntry> =
            serde_json::from_str(&body).map_err(|err| download_error(format!("invalid JSON: {err}")))?;

        debug!("Downloaded {} managed policies", policies.len());
        Ok(policies)
    }

    fn fetch_services(&self) -> Result<Vec<ServiceEntry>, CatalogError> {
        debug!("Listing public CloudFormation resource types");

        let download_error = |message: String| CatalogError::Download {
            what: "service catalog",
            message,
        };

        let runtime = build_runtime()?;
        runtime.block_on(async {
            let config = load_sdk_config(Some(REGISTRY_REGION)).await;
            let client = aws_sdk_cloudformation::Client::new(&config);

            let mut services = Vec::new();
            let mut next_token = None;
            loop {
                let page = client
                    .list_types()
                    .r#type(RegistryType::Resource)
                    .visibility(Visibility::Public)
                    .provisioning_type(ProvisioningType::FullyMutable)
                    .max_results(LIST_TYPES_PAGE_SIZE)
                    .set_next_token(next_token.take())
                    .send()
                    .await
                    .map_err(|err| {
                        download_error(
                            aws_sdk_cloudformation::error::DisplayErrorContext(&err).to_string(),
                        )
                    })?;

                services.extend(page.type_summaries().iter().filter_map(|summary| {
                    Some(ServiceEntry {
                        name: summary.type_name()?.to_string(),
                        description: summary.description().unwrap_or_default().to_string(),
                    })
                }));

                match page.next_token() {
                    Some(next) => next_token = Some(next.to_string()),
                    None => break,
                }
            }

            debug!("Found {} resource types", services.len());
            Ok(services)
        })
    }
}
