//! Local requirement files: the AWS-managed policy catalog and the service catalog.
//!
//! Both lists are bootstrapped once into the requirements directory and then
//! read from disk by the wizard. A `.last_update` timestamp tracks the 24-hour
//! freshness window.

pub mod remote;

use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use log::{debug, warn};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::iam::{PolicyRef, ServiceRef};

pub const MANAGED_POLICIES_FILE: &str = "managed_policies.json";
pub const SERVICES_FILE: &str = "services.json";
const TIMESTAMP_FILE: &str = ".last_update";

/// Catalog expiry in hours.
const CATALOG_MAX_AGE_HOURS: i64 = 24;

/// Error types for catalog operations.
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("Requirement file not found: {} (run `targe requirements install`)", .0.display())]
    Missing(PathBuf),

    #[error("Malformed requirement file {}: {source}", path.display())]
    Malformed {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("Failed to download {what}: {message}")]
    Download { what: &'static str, message: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManagedPolicyEntry {
    pub name: String,
    pub arn: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceEntry {
    pub name: String,
    #[serde(default)]
    pub description: String,
}

/// Where catalog contents come from when installing.
pub trait CatalogSource {
    fn fetch_managed_policies(&self) -> Result<Vec<ManagedPolicyEntry>, CatalogError>;

    fn fetch_services(&self) -> Result<Vec<ServiceEntry>, CatalogError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InstallOutcome {
    /// Files exist and are younger than the freshness window.
    UpToDate,
    Installed,
    /// Refresh failed; the previous files are still in place.
    KeptStale,
}

/// Handle on a requirements directory.
#[derive(Debug, Clone)]
pub struct Catalog {
    dir: PathBuf,
}

impl Catalog {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn is_installed(&self) -> bool {
        self.dir.join(MANAGED_POLICIES_FILE).is_file() && self.dir.join(SERVICES_FILE).is_file()
    }

    /// True when the timestamp file exists and is younger than 24 hours.
    pub fn is_fresh(&self) -> bool {
        match self.last_update() {
            Some(last_update) => (Utc::now() - last_update).num_hours() < CATALOG_MAX_AGE_HOURS,
            None => false,
        }
    }

    fn last_update(&self) -> Option<DateTime<Utc>> {
        let content = fs::read_to_string(self.dir.join(TIMESTAMP_FILE)).ok()?;
        content
            .trim()
            .parse::<DateTime<Utc>>()
            .map_err(|err| warn!("Failed to parse catalog timestamp: {}", err))
            .ok()
    }

    pub fn managed_policies(&self) -> Result<Vec<PolicyRef>, CatalogError> {
        let entries: Vec<ManagedPolicyEntry> = self.read_json(MANAGED_POLICIES_FILE)?;
        Ok(entries
            .into_iter()
            .map(|entry| PolicyRef::aws_managed(entry.name, entry.arn))
            .collect())
    }

    pub fn services(&self) -> Result<Vec<ServiceRef>, CatalogError> {
        let entries: Vec<ServiceEntry> = self.read_json(SERVICES_FILE)?;
        Ok(entries
            .into_iter()
            .map(|entry| ServiceRef {
                name: entry.name,
                description: entry.description,
            })
            .collect())
    }

    fn read_json<T: for<'de> Deserialize<'de>>(&self, file_name: &str) -> Result<T, CatalogError> {
        let path = self.dir.join(file_name);
        if !path.is_file() {
            return Err(CatalogError::Missing(path));
        }
        let content = fs::read_to_string(&path)?;
        serde_json::from_str(&content).map_err(|source| CatalogError::Malformed { path, source })
    }

    /// Installs the catalog only when it is not present at all.
    pub fn ensure_installed(&self, source: &dyn CatalogSource) -> Result<InstallOutcome, CatalogError> {
        if self.is_installed() {
            debug!("Requirement files present in {}", self.dir.display());
            return Ok(InstallOutcome::UpToDate);
        }
        self.install_with(source, true)
    }

    /// Downloads both catalogs and writes them with a fresh timestamp.
    ///
    /// Without `force`, fresh files are left alone. When a download fails and
    /// older files exist they are kept and a warning is logged.
    pub fn install_with(&self, source: &dyn CatalogSource, force: bool) -> Result<InstallOutcome, CatalogError> {
        if !force && self.is_installed() && self.is_fresh() {
            debug!("Requirement files are up to date");
            return Ok(InstallOutcome::UpToDate);
        }

        let fetched = source
            .fetch_managed_policies()
            .and_then(|policies| Ok((policies, source.fetch_services()?)));

        let (policies, services) = match fetched {
            Ok(lists) => lists,
            Err(err) if self.is_installed() => {
                warn!("Failed to refresh requirement files: {}. Keeping existing files", err);
                return Ok(InstallOutcome::KeptStale);
            }
            Err(err) => return Err(err),
        };

        fs::create_dir_all(&self.dir)?;
        self.write_json(MANAGED_POLICIES_FILE, &policies)?;
        self.write_json(SERVICES_FILE, &services)?;
        fs::write(self.dir.join(TIMESTAMP_FILE), Utc::now().to_rfc3339())?;

        debug!(
            "Installed {} managed policies and {} services into {}",
            policies.len(),
            services.len(),
            self.dir.display()
        );
        Ok(InstallOutcome::Installed)
    }

    fn write_json<T: Serialize>(&self, file_name: &str, value: &T) -> Result<(), CatalogError> {
        let path = self.dir.join(file_name);
        let json = serde_json::to_string_pretty(value)
            .map_err(|source| CatalogError::Malformed { path: path.clone(), source })?;
        fs::write(path, json)?;
        Ok(())
    }
}
