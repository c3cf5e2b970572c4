use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::iam::PrincipalKind;
use crate::wizard::seed::SeedFlags;

/// Targe
///
/// Interactive terminal wizard for granting and revoking AWS IAM permissions.
/// Pick a user, group or role, choose what to change, confirm, and Targe
/// makes the IAM calls. Flags pre-fill the wizard's steps.
///
/// AWS credentials and region are read from the standard AWS environment
/// (profiles, environment variables, instance metadata).
#[derive(Parser, Debug)]
#[command(name = "targe")]
#[command(version)]
#[command(about, long_about)]
pub struct Cli {
    /// Suppress colored output
    #[arg(short = 'n', long = "no-color", global = true)]
    pub no_color: bool,

    /// Enable verbose output for debugging
    #[arg(long = "verbose", global = true)]
    pub verbose: bool,

    /// OpenAI API key used to generate custom policies
    #[arg(long = "openai-api-key", env = "OPENAI_API_KEY", hide_env_values = true, global = true)]
    pub openai_api_key: Option<String>,

    /// Directory holding the managed policy and service catalogs
    #[arg(long = "requirements-dir", env = "TARGE_REQUIREMENTS_DIR", global = true)]
    pub requirements_dir: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Change permissions of an AWS IAM principal
    Aws {
        #[command(subcommand)]
        target: AwsTarget,
    },

    /// Read or write ~/.targe/config.yml
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },

    /// Manage the local managed policy and service catalogs
    Requirements {
        #[command(subcommand)]
        action: RequirementsAction,
    },
}

#[derive(Subcommand, Debug)]
pub enum AwsTarget {
    /// Attach or detach policies, or change group membership, of a user
    Users(UserArgs),

    /// Attach or detach policies of a group
    Groups(GroupArgs),

    /// Attach or detach policies of a role
    Roles(RoleArgs),
}

impl AwsTarget {
    pub fn kind(&self) -> PrincipalKind {
        match self {
            AwsTarget::Users(_) => PrincipalKind::User,
            AwsTarget::Groups(_) => PrincipalKind::Group,
            AwsTarget::Roles(_) => PrincipalKind::Role,
        }
    }

    pub fn seed_flags(&self) -> SeedFlags {
        let (principal, group, policy) = match self {
            AwsTarget::Users(args) => (args.user.clone(), args.group.clone(), &args.policy),
            AwsTarget::Groups(args) => (args.group.clone(), None, &args.policy),
            AwsTarget::Roles(args) => (args.role.clone(), None, &args.policy),
        };
        SeedFlags {
            principal,
            operation: policy.operation.clone(),
            group,
            policy: policy.policy.clone(),
            service: policy.service.clone(),
            resource: policy.resource.clone(),
            policy_option: policy.policy_option.clone(),
            terraform: policy.terraform,
        }
    }
}

#[derive(Args, Debug)]
pub struct UserArgs {
    /// User name to pre-select
    #[arg(long)]
    pub user: Option<String>,

    /// Group to join or leave (add_to_group / remove_from_group)
    #[arg(long)]
    pub group: Option<String>,

    #[command(flatten)]
    pub policy: PolicyArgs,
}

#[derive(Args, Debug)]
pub struct GroupArgs {
    /// Group name to pre-select
    #[arg(long)]
    pub group: Option<String>,

    #[command(flatten)]
    pub policy: PolicyArgs,
}

#[derive(Args, Debug)]
pub struct RoleArgs {
    /// Role name to pre-select
    #[arg(long)]
    pub role: Option<String>,

    #[command(flatten)]
    pub policy: PolicyArgs,
}

/// Flags shared by every principal kind.
#[derive(Args, Debug)]
pub struct PolicyArgs {
    /// Operation: attach_policy, detach_policy, attach_custom_policy,
    /// add_to_group, remove_from_group (users only)
    #[arg(long)]
    pub operation: Option<String>,

    /// Policy name or ARN
    #[arg(long)]
    pub policy: Option<String>,

    /// Service (CloudFormation resource type, e.g. AWS::S3::Bucket) for a custom policy
    #[arg(long)]
    pub service: Option<String>,

    /// Resource name or ARN for a custom policy
    #[arg(long)]
    pub resource: Option<String>,

    /// Custom policy option: without_resource or with_resource
    #[arg(long = "policy-option")]
    pub policy_option: Option<String>,

    /// Write a generated policy as Terraform instead of creating it
    #[arg(long)]
    pub terraform: bool,
}

#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Store a value (openai_api_key, openai_model, requirements_dir)
    Set { key: String, value: String },

    /// Print a value as key=value
    Get { key: String },
}

#[derive(Subcommand, Debug)]
pub enum RequirementsAction {
    /// Download the catalogs, refreshing them when older than a day
    Install {
        /// Download even if the catalogs are fresh
        #[arg(long)]
        force: bool,
    },
}
