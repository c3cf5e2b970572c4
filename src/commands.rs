//! Entry points behind each subcommand.

use std::path::Path;

use anyhow::Context;
use colored::Colorize;
use log::{debug, info};

use crate::catalog::remote::RemoteCatalogSource;
use crate::catalog::{Catalog, CatalogSource, InstallOutcome};
use crate::cli::{AwsTarget, ConfigAction, RequirementsAction};
use crate::config::{self, Config, ConfigFile, ConfigKey};
use crate::error::Result;
use crate::iam::IamProvider;
use crate::iam::aws::AwsIamProvider;
use crate::synth::openai::OpenAiSynthesizer;
use crate::ui::{WizardContext, WizardOutcome, run_wizard};
use crate::wizard::seed::{check_flags, seed_state};
use crate::wizard::state::SelectionState;

/// `config set` stores the value; `config get` returns the `key=value` line.
pub fn run_config(action: &ConfigAction, targe_home: &Path) -> Result<Option<String>> {
    let path = config::config_path(targe_home);
    let mut file = ConfigFile::load(&path)?;

    match action {
        ConfigAction::Set { key, value } => {
            let key = ConfigKey::parse(key)?;
            file.set(key, value.clone());
            file.save(&path)?;
            info!("Set {} in {}", key, path.display());
            Ok(None)
        }
        ConfigAction::Get { key } => {
            let key = ConfigKey::parse(key)?;
            let value = config::effective_value(&file, key, targe_home).unwrap_or_default();
            Ok(Some(format!("{key}={value}")))
        }
    }
}

pub fn run_requirements(
    action: &RequirementsAction,
    catalog: &Catalog,
    source: &dyn CatalogSource,
) -> Result<InstallOutcome> {
    match action {
        RequirementsAction::Install { force } => Ok(catalog.install_with(source, *force)?),
    }
}

/// Validates the flags and resolves them into the wizard's starting state.
pub fn prepare_wizard(target: &AwsTarget, provider: &dyn IamProvider) -> Result<SelectionState> {
    let flags = target.seed_flags();
    let state = seed_state(target.kind(), &flags, provider)?;
    debug!("Seeded selection: {:?}", state);
    Ok(state)
}

/// Runs the `aws <kind>` wizard against the real account.
pub fn run_aws(target: &AwsTarget, config: &Config) -> anyhow::Result<WizardOutcome> {
    check_flags(target.kind(), &target.seed_flags())?;

    let catalog = Catalog::new(&config.requirements_dir);
    if catalog.ensure_installed(&RemoteCatalogSource)? == InstallOutcome::Installed {
        info!("Installed requirement files into {}", catalog.dir().display());
    }

    let provider = AwsIamProvider::connect(catalog)?;
    let state = prepare_wizard(target, &provider)?;
    let synthesizer = OpenAiSynthesizer::new(config.openai_api_key.clone(), config.openai_model.clone());
    let output_dir = std::env::current_dir().context("Failed to get current working directory")?;

    run_wizard(
        state,
        &WizardContext {
            provider: &provider,
            synthesizer: &synthesizer,
            output_dir,
        },
    )
}

/// One line for stdout after the terminal is restored.
pub fn describe_outcome(outcome: &WizardOutcome) -> Option<String> {
    match outcome {
        WizardOutcome::Cancelled => None,
        WizardOutcome::Executed(summary) => Some(format!("{} {}", "✔".green(), summary)),
        WizardOutcome::Exported(path) => Some(format!(
            "{} Terraform written to {}",
            "✔".green(),
            path.display()
        )),
    }
}

pub fn describe_install(outcome: InstallOutcome, catalog: &Catalog) -> String {
    match outcome {
        InstallOutcome::UpToDate => format!(
            "Requirement files in {} are up to date",
            catalog.dir().display()
        ),
        InstallOutcome::Installed => format!(
            "{} Installed requirement files into {}",
            "✔".green(),
            catalog.dir().display()
        ),
        InstallOutcome::KeptStale => format!(
            "{} Refresh failed, keeping existing files in {}",
            "!".yellow(),
            catalog.dir().display()
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{CatalogError, ManagedPolicyEntry, ServiceEntry};
    use crate::cli::{Cli, Command};
    use crate::error::TargeError;
    use crate::iam::PrincipalKind;
    use crate::iam::fake::FakeIamProvider;
    use crate::wizard::operation::OperationKind;
    use clap::Parser;
    use tempfile::TempDir;

    struct OneEntrySource;

    impl CatalogSource for OneEntrySource {
        fn fetch_managed_policies(&self) -> std::result::Result<Vec<ManagedPolicyEntry>, CatalogError> {
            Ok(vec![ManagedPolicyEntry {
                name: "ReadOnlyAccess".to_string(),
                arn: "arn:aws:iam::aws:policy/ReadOnlyAccess".to_string(),
            }])
        }

        fn fetch_services(&self) -> std::result::Result<Vec<ServiceEntry>, CatalogError> {
            Ok(vec![ServiceEntry {
                name: "AWS::S3::Bucket".to_string(),
                description: String::new(),
            }])
        }
    }

    fn aws_target(args: &[&str]) -> AwsTarget {
        match Cli::try_parse_from(args).unwrap().command {
            Command::Aws { target } => target,
            other => panic!("expected aws command, got {other:?}"),
        }
    }

    #[test]
    fn config_set_then_get() {
        let temp = TempDir::new().unwrap();
        let set = ConfigAction::Set {
            key: "openai_model".to_string(),
            value: "gpt-4o-mini".to_string(),
        };
        assert_eq!(run_config(&set, temp.path()).unwrap(), None);

        let get = ConfigAction::Get {
            key: "openai_model".to_string(),
        };
        assert_eq!(
            run_config(&get, temp.path()).unwrap().as_deref(),
            Some("openai_model=gpt-4o-mini")
        );
    }

    #[test]
    fn config_rejects_unknown_key() {
        let temp = TempDir::new().unwrap();
        let set = ConfigAction::Set {
            key: "region".to_string(),
            value: "eu-central-1".to_string(),
        };

        let err = run_config(&set, temp.path()).unwrap_err();
        assert!(matches!(err, TargeError::Config(_)));
        assert!(!config::config_path(temp.path()).exists());
    }

    #[test]
    fn requirements_install_writes_catalog() {
        let temp = TempDir::new().unwrap();
        let catalog = Catalog::new(temp.path().join("requirements"));

        let outcome = run_requirements(
            &RequirementsAction::Install { force: false },
            &catalog,
            &OneEntrySource,
        )
        .unwrap();

        assert_eq!(outcome, InstallOutcome::Installed);
        assert_eq!(catalog.services().unwrap()[0].name, "AWS::S3::Bucket");
    }

    #[test]
    fn prepare_wizard_seeds_principal_and_operation() {
        let provider = FakeIamProvider::new().with_principal(PrincipalKind::Role, "deployer");
        let target = aws_target(&[
            "targe",
            "aws",
            "roles",
            "--role",
            "deployer",
            "--operation",
            "detach_policy",
        ]);

        let state = prepare_wizard(&target, &provider).unwrap();

        assert_eq!(state.principal().unwrap().name, "deployer");
        assert_eq!(state.operation(), Some(OperationKind::DetachPolicy));
    }

    #[test]
    fn prepare_wizard_rejects_group_operation_for_roles() {
        let provider = FakeIamProvider::new().with_principal(PrincipalKind::Role, "deployer");
        let target = aws_target(&["targe", "aws", "roles", "--operation", "add_to_group"]);

        let err = prepare_wizard(&target, &provider).unwrap_err();
        assert!(matches!(err, TargeError::Seed(_)));
        assert!(provider.calls().is_empty());
    }

    #[test]
    fn cancelled_wizard_prints_nothing() {
        assert_eq!(describe_outcome(&WizardOutcome::Cancelled), None);
    }
}
