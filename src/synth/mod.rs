//! Natural-language to IAM policy generation.

pub mod document;
#[cfg(test)]
pub(crate) mod fake;
pub mod openai;

use std::sync::LazyLock;

use regex::Regex;
use thiserror::Error;

use document::PolicyDocument;

const DERIVED_NAME_PREFIX: &str = "targe-";
const MAX_SLUG_LENGTH: usize = 64;

/// Error types for policy generation.
#[derive(Debug, Error)]
pub enum SynthError {
    #[error("No OpenAI API key configured (set OPENAI_API_KEY or run `targe config set openai_api_key <key>`)")]
    MissingApiKey,

    #[error("Please provide a description of the policy")]
    EmptyDescription,

    #[error("Request to policy generator failed: {0}")]
    Http(String),

    #[error("Policy generator returned status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Policy generator returned no content")]
    EmptyResponse,

    #[error("Failed to parse generated policy: {0}")]
    InvalidContent(#[from] serde_json::Error),
}

/// What the user asked for on the create-policy form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PolicyRequest {
    pub description: String,
    pub service: Option<String>,
    pub resource_arn: Option<String>,
}

impl PolicyRequest {
    /// The user message sent to the generator.
    pub fn prompt(&self) -> String {
        let mut prompt = self.description.trim().to_string();
        if let Some(service) = &self.service {
            prompt.push_str(&format!("\n\nThe policy is for the AWS resource type {service}."));
        }
        if let Some(arn) = &self.resource_arn {
            prompt.push_str(&format!(
                "\nScope every statement's Resource to {arn} (and its sub-resources where the action requires it)."
            ));
        }
        prompt.push_str("\nSet Id to a short PascalCase name for the policy.");
        prompt
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct GeneratedPolicy {
    pub name: String,
    pub document: PolicyDocument,
    /// Pretty-printed document, as sent to IAM.
    pub json: String,
}

impl GeneratedPolicy {
    /// Names the policy after the document's `Id`, deriving one from the
    /// description when the Id is missing or not a legal IAM policy name.
    pub fn from_document(description: &str, document: PolicyDocument) -> Result<Self, SynthError> {
        let name = match document.id.as_deref() {
            Some(id) if is_valid_policy_name(id) => id.to_string(),
            _ => derive_policy_name(description),
        };
        let json = document.to_pretty_json()?;
        Ok(Self {
            name,
            document,
            json,
        })
    }
}

pub trait PolicySynthesizer {
    fn generate(&self, request: &PolicyRequest) -> Result<GeneratedPolicy, SynthError>;
}

static POLICY_NAME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[\w+=,.@-]{1,128}$").expect("valid regex"));

pub fn is_valid_policy_name(name: &str) -> bool {
    POLICY_NAME.is_match(name)
}

/// `targe-<slug>` from the first words of the description.
pub fn derive_policy_name(description: &str) -> String {
    let mut slug = String::new();
    for c in description.chars() {
        if c.is_ascii_alphanumeric() {
            slug.push(c.to_ascii_lowercase());
        } else if !slug.is_empty() && !slug.ends_with('-') {
            slug.push('-');
        }
        if slug.len() >= MAX_SLUG_LENGTH {
            break;
        }
    }
    let slug = slug.trim_end_matches('-');

    if slug.is_empty() {
        format!("{DERIVED_NAME_PREFIX}policy")
    } else {
        format!("{DERIVED_NAME_PREFIX}{slug}")
    }
}
