//! Terraform rendering for generated policies.
//!
//! Instead of creating the policy through the IAM API, `--terraform` writes an
//! `aws_iam_policy` resource plus the attachment for the selected principal.

use std::fs::OpenOptions;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use log::info;
use thiserror::Error;

use crate::iam::{PrincipalKind, PrincipalRef};
use crate::wizard::state::SelectionState;

const POLICY_DESCRIPTION: &str = "Policy generated by Targe";

#[derive(Debug, Error)]
pub enum TerraformError {
    #[error("Cannot export Terraform: no {0} selected")]
    Incomplete(&'static str),

    #[error("Invalid filename: {0}")]
    InvalidFilename(String),

    #[error("Refusing to overwrite existing file {}", .0.display())]
    AlreadyExists(PathBuf),

    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

/// Turns a policy name into a Terraform resource label.
fn resource_label(name: &str) -> String {
    let mut label: String = name
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '_' || c == '-' { c } else { '_' })
        .collect();
    if !label.starts_with(|c: char| c.is_ascii_alphabetic() || c == '_') {
        label.insert(0, '_');
    }
    label
}

/// Heredocs are templates, so IAM policy variables like `${aws:username}`
/// must not be read as interpolations.
fn escape_template(text: &str) -> String {
    text.replace("${", "$${").replace("%{", "%%{")
}

/// Renders the policy resource and its attachment to `principal`.
pub fn render_snippet(policy_name: &str, document: &str, principal: &PrincipalRef) -> String {
    let label = resource_label(policy_name);
    let (attachment, attribute) = match principal.kind {
        PrincipalKind::User => ("aws_iam_user_policy_attachment", "user"),
        PrincipalKind::Group => ("aws_iam_group_policy_attachment", "group"),
        PrincipalKind::Role => ("aws_iam_role_policy_attachment", "role"),
    };

    format!(
        r#"resource "aws_iam_policy" "{label}" {{
  name        = "{policy_name}"
  path        = "/"
  description = "{POLICY_DESCRIPTION}"
  policy      = <<EOF
{document}
EOF
}}

resource "{attachment}" "{label}" {{
  {attribute:<10} = "{principal}"
  policy_arn = aws_iam_policy.{label}.arn
}}
"#,
        document = escape_template(document.trim_end()),
        principal = principal.name,
    )
}

/// Renders the snippet for a completed custom-policy selection.
pub fn snippet_for(state: &SelectionState) -> Result<String, TerraformError> {
    let principal = state.principal().ok_or(TerraformError::Incomplete("principal"))?;
    let policy = state.policy().ok_or(TerraformError::Incomplete("policy"))?;
    let document = policy
        .document
        .as_deref()
        .ok_or(TerraformError::Incomplete("policy document"))?;
    Ok(render_snippet(&policy.name, document, principal))
}

/// Sanitizes a filename so it cannot leave the target directory.
fn sanitize_filename(name: &str) -> Option<String> {
    let sanitized: String = name
        .chars()
        .map(|c| match c {
            '/' | '\\' | '\0' => '_',
            _ => c,
        })
        .collect();

    let trimmed = sanitized.trim().trim_matches('.');
    if trimmed.is_empty() || trimmed.contains("..") {
        return None;
    }
    Some(trimmed.to_string())
}

/// Writes `<policy-name>.tf` into `dir` and returns its path. Never overwrites.
pub fn export(state: &SelectionState, dir: &Path) -> Result<PathBuf, TerraformError> {
    let snippet = snippet_for(state)?;
    let name = state
        .policy()
        .map(|policy| policy.name.as_str())
        .unwrap_or_default();
    let safe_name = sanitize_filename(name).ok_or_else(|| {
        TerraformError::InvalidFilename(format!("Policy name '{name}' cannot be used as a filename"))
    })?;

    let path = dir.join(format!("{safe_name}.tf"));
    let mut file = match OpenOptions::new().write(true).create_new(true).open(&path) {
        Ok(file) => file,
        Err(err) if err.kind() == io::ErrorKind::AlreadyExists => {
            return Err(TerraformError::AlreadyExists(path));
        }
        Err(err) => return Err(err.into()),
    };
    file.write_all(snippet.as_bytes())?;

    info!("Written: {}", path.display());
    Ok(path)
}
