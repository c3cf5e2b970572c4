use thiserror::Error;

use crate::catalog::CatalogError;
use crate::config::ConfigError;
use crate::iam::IamError;
use crate::synth::SynthError;
use crate::terraform::TerraformError;
use crate::wizard::dispatcher::OperationError;
use crate::wizard::loader::LoadFailed;
use crate::wizard::seed::SeedError;

#[derive(Error, Debug)]
pub enum TargeError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Requirements error: {0}")]
    Catalog(#[from] CatalogError),

    #[error("{0}")]
    Iam(#[from] IamError),

    #[error("{0}")]
    Seed(#[from] SeedError),

    #[error("{0}")]
    Load(#[from] LoadFailed),

    #[error("{0}")]
    Synth(#[from] SynthError),

    #[error("{0}")]
    Operation(#[from] OperationError),

    #[error("{0}")]
    Terraform(#[from] TerraformError),
}

pub type Result<T> = std::result::Result<T, TargeError>;
