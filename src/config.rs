//! Runtime configuration: `~/.targe/config.yml` overlaid by flags and environment.

use std::fmt::{self, Write as _};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use log::{debug, warn};
use saphyr::{LoadableYamlNode, Yaml};
use thiserror::Error;

pub const TARGE_DIR: &str = ".targe";
pub const CONFIG_FILE: &str = "config.yml";
pub const REQUIREMENTS_DIR: &str = "requirements";
pub const DEFAULT_OPENAI_MODEL: &str = "gpt-4o";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Cannot determine home directory")]
    NoHomeDir,

    #[error("Unknown configuration key '{0}'; expected one of: openai_api_key, openai_model, requirements_dir")]
    UnknownKey(String),

    #[error("Failed to parse {}: {message}", path.display())]
    Parse { path: PathBuf, message: String },

    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigKey {
    OpenAiApiKey,
    OpenAiModel,
    RequirementsDir,
}

impl ConfigKey {
    pub const ALL: [ConfigKey; 3] = [
        ConfigKey::OpenAiApiKey,
        ConfigKey::OpenAiModel,
        ConfigKey::RequirementsDir,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ConfigKey::OpenAiApiKey => "openai_api_key",
            ConfigKey::OpenAiModel => "openai_model",
            ConfigKey::RequirementsDir => "requirements_dir",
        }
    }

    pub fn parse(key: &str) -> Result<Self, ConfigError> {
        Self::ALL
            .into_iter()
            .find(|candidate| candidate.as_str() == key)
            .ok_or_else(|| ConfigError::UnknownKey(key.to_string()))
    }
}

impl fmt::Display for ConfigKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Values stored in the config file. Unset keys are `None`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConfigFile {
    openai_api_key: Option<String>,
    openai_model: Option<String>,
    requirements_dir: Option<String>,
}

impl ConfigFile {
    /// Reads the file at `path`. A missing file yields an empty config.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = match fs::read_to_string(path) {
            Ok(content) => content,
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                debug!("No config file at {}", path.display());
                return Ok(Self::default());
            }
            Err(err) => return Err(err.into()),
        };
        Self::parse(&content).map_err(|message| ConfigError::Parse {
            path: path.to_path_buf(),
            message,
        })
    }

    pub fn parse(content: &str) -> Result<Self, String> {
        let docs = Yaml::load_from_str(content).map_err(|e| e.to_string())?;
        let mut config = Self::default();

        let Some(doc) = docs.first() else {
            return Ok(config);
        };
        if doc.is_null() {
            return Ok(config);
        }
        let mapping = doc
            .as_mapping()
            .ok_or_else(|| "Root document must be a mapping".to_string())?;

        for (key, value) in mapping {
            let Some(key) = key.as_str() else {
                continue;
            };
            let Ok(config_key) = ConfigKey::parse(key) else {
                warn!("Ignoring unknown config key '{}'", key);
                continue;
            };
            let value = value
                .as_str()
                .map(str::to_string)
                .ok_or_else(|| format!("Value of '{key}' must be a string"))?;
            config.set(config_key, value);
        }
        Ok(config)
    }

    pub fn get(&self, key: ConfigKey) -> Option<&str> {
        match key {
            ConfigKey::OpenAiApiKey => self.openai_api_key.as_deref(),
            ConfigKey::OpenAiModel => self.openai_model.as_deref(),
            ConfigKey::RequirementsDir => self.requirements_dir.as_deref(),
        }
    }

    pub fn set(&mut self, key: ConfigKey, value: String) {
        let slot = match key {
            ConfigKey::OpenAiApiKey => &mut self.openai_api_key,
            ConfigKey::OpenAiModel => &mut self.openai_model,
            ConfigKey::RequirementsDir => &mut self.requirements_dir,
        };
        *slot = Some(value);
    }

    pub fn to_yaml(&self) -> String {
        let mut yaml = String::new();
        for key in ConfigKey::ALL {
            if let Some(value) = self.get(key) {
                let escaped = value.replace('\\', "\\\\").replace('"', "\\\"");
                let _ = writeln!(yaml, "{key}: \"{escaped}\"");
            }
        }
        yaml
    }

    /// Writes the file, creating its directory if needed.
    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, self.to_yaml())?;
        debug!("Written config to {}", path.display());
        Ok(())
    }
}

/// `~/.targe`
pub fn targe_home() -> Result<PathBuf, ConfigError> {
    dirs::home_dir()
        .map(|home| home.join(TARGE_DIR))
        .ok_or(ConfigError::NoHomeDir)
}

pub fn config_path(targe_home: &Path) -> PathBuf {
    targe_home.join(CONFIG_FILE)
}

/// The value `config get` reports: the stored value, or the built-in default.
pub fn effective_value(file: &ConfigFile, key: ConfigKey, targe_home: &Path) -> Option<String> {
    file.get(key).map(str::to_string).or_else(|| match key {
        ConfigKey::OpenAiApiKey => None,
        ConfigKey::OpenAiModel => Some(DEFAULT_OPENAI_MODEL.to_string()),
        ConfigKey::RequirementsDir => Some(targe_home.join(REQUIREMENTS_DIR).display().to_string()),
    })
}

/// Settings for one run after applying precedence.
#[derive(Debug)]
pub struct Config {
    pub openai_api_key: Option<String>,
    pub openai_model: String,
    pub requirements_dir: PathBuf,
}

impl Config {
    /// Flag or environment value (already merged by clap) wins over the file,
    /// which wins over the default.
    pub fn resolve(
        api_key_flag: Option<String>,
        requirements_dir_flag: Option<PathBuf>,
        file: &ConfigFile,
        targe_home: &Path,
    ) -> Self {
        let openai_api_key = api_key_flag
            .filter(|key| !key.is_empty())
            .or_else(|| file.get(ConfigKey::OpenAiApiKey).map(str::to_string));
        let openai_model = file
            .get(ConfigKey::OpenAiModel)
            .map(str::to_string)
            .unwrap_or_else(|| DEFAULT_OPENAI_MODEL.to_string());
        let requirements_dir = requirements_dir_flag
            .or_else(|| file.get(ConfigKey::RequirementsDir).map(PathBuf::from))
            .unwrap_or_else(|| targe_home.join(REQUIREMENTS_DIR));

        Self {
            openai_api_key,
            openai_model,
            requirements_dir,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn parse_reads_known_keys() {
        let config = ConfigFile::parse(
            "openai_api_key: \"sk-test\"\nopenai_model: gpt-4o-mini\nrequirements_dir: /opt/targe\n",
        )
        .unwrap();

        assert_eq!(config.get(ConfigKey::OpenAiApiKey), Some("sk-test"));
        assert_eq!(config.get(ConfigKey::OpenAiModel), Some("gpt-4o-mini"));
        assert_eq!(config.get(ConfigKey::RequirementsDir), Some("/opt/targe"));
    }

    #[test]
    fn parse_ignores_unknown_keys() {
        let config = ConfigFile::parse("theme: dark\nopenai_model: o3\n").unwrap();
        assert_eq!(config.get(ConfigKey::OpenAiModel), Some("o3"));
    }

    #[test]
    fn parse_empty_document() {
        assert_eq!(ConfigFile::parse("").unwrap(), ConfigFile::default());
    }

    #[test]
    fn parse_rejects_non_mapping_root() {
        let err = ConfigFile::parse("- a\n- b\n").unwrap_err();
        assert!(err.contains("mapping"));
    }

    #[test]
    fn parse_rejects_non_string_values() {
        let err = ConfigFile::parse("openai_model:\n  - a\n").unwrap_err();
        assert!(err.contains("openai_model"));
    }

    #[test]
    fn save_then_load_keeps_values_with_quotes() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join(".targe").join(CONFIG_FILE);
        let mut config = ConfigFile::default();
        config.set(ConfigKey::OpenAiApiKey, "sk-\"quoted\"\\x".to_string());

        config.save(&path).unwrap();
        let loaded = ConfigFile::load(&path).unwrap();

        assert_eq!(loaded, config);
    }

    #[test]
    fn load_missing_file_is_empty() {
        let temp = TempDir::new().unwrap();
        let config = ConfigFile::load(&temp.path().join("missing.yml")).unwrap();
        assert_eq!(config, ConfigFile::default());
    }

    #[test]
    fn load_malformed_file_names_path() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join(CONFIG_FILE);
        fs::write(&path, "just a string").unwrap();

        let err = ConfigFile::load(&path).unwrap_err();
        assert!(err.to_string().contains("config.yml"));
    }

    #[test]
    fn unknown_key_is_rejected() {
        let err = ConfigKey::parse("region").unwrap_err();
        assert!(matches!(err, ConfigError::UnknownKey(key) if key == "region"));
    }

    #[test]
    fn resolve_prefers_flag_over_file() {
        let mut file = ConfigFile::default();
        file.set(ConfigKey::OpenAiApiKey, "from-file".to_string());
        file.set(ConfigKey::RequirementsDir, "/from/file".to_string());

        let config = Config::resolve(
            Some("from-flag".to_string()),
            Some(PathBuf::from("/from/flag")),
            &file,
            Path::new("/home/me/.targe"),
        );

        assert_eq!(config.openai_api_key.as_deref(), Some("from-flag"));
        assert_eq!(config.requirements_dir, PathBuf::from("/from/flag"));
    }

    #[test]
    fn resolve_falls_back_to_file_then_default() {
        let mut file = ConfigFile::default();
        file.set(ConfigKey::OpenAiApiKey, "from-file".to_string());

        let config = Config::resolve(None, None, &file, Path::new("/home/me/.targe"));

        assert_eq!(config.openai_api_key.as_deref(), Some("from-file"));
        assert_eq!(config.openai_model, DEFAULT_OPENAI_MODEL);
        assert_eq!(
            config.requirements_dir,
            PathBuf::from("/home/me/.targe/requirements")
        );
    }

    #[test]
    fn effective_value_reports_defaults() {
        let file = ConfigFile::default();
        let home = Path::new("/home/me/.targe");

        assert_eq!(effective_value(&file, ConfigKey::OpenAiApiKey, home), None);
        assert_eq!(
            effective_value(&file, ConfigKey::OpenAiModel, home).as_deref(),
            Some("gpt-4o")
        );
    }
}
