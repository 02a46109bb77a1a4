use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use backdrop_common::{BackdropError, ConfigStore, Settings, error::ConfigError, Result};

/// Host-side configuration: where the vault is, where the settings record
/// lives and where the background style is written.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct DaemonConfig {
    #[serde(default = "default_vault_root")]
    pub vault_root: PathBuf,
    #[serde(default = "default_settings_file")]
    pub settings_file: PathBuf,
    #[serde(default = "default_snippet_path")]
    pub snippet_path: PathBuf,
}

fn config_dir() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("backdrop")
}

fn default_vault_root() -> PathBuf {
    PathBuf::from(".")
}

fn default_settings_file() -> PathBuf {
    config_dir().join("data.json")
}

fn default_snippet_path() -> PathBuf {
    config_dir().join("background.css")
}

impl Default for DaemonConfig {
    fn default() -> Self {
        Self {
            vault_root: default_vault_root(),
            settings_file: default_settings_file(),
            snippet_path: default_snippet_path(),
        }
    }
}

impl DaemonConfig {
    pub fn load() -> Result<Self> {
        Self::load_from_path(&Self::config_path()?)
    }

    /// A missing file yields the defaults.
    pub fn load_from_path(config_path: &Path) -> Result<Self> {
        if !config_path.exists() {
            log::info!("No config file at {:?}, using defaults", config_path);
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(config_path)
            .map_err(|e| BackdropError::Config(ConfigError::FileRead {
                path: config_path.to_path_buf(),
                source: e,
            }))?;

        let config: DaemonConfig = toml::from_str(&content)?;

        config.validate()?;
        log::debug!("Loaded config from {:?}: {:?}", config_path, config);

        Ok(config)
    }

    pub fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or(BackdropError::Config(ConfigError::NoConfigDir))?
            .join("backdrop");

        Ok(config_dir.join("config.toml"))
    }

    pub fn validate(&self) -> Result<()> {
        if self.vault_root.as_os_str().is_empty() {
            return Err(BackdropError::Config(ConfigError::InvalidValue {
                field: "vault_root".to_string(),
                value: String::new(),
            }));
        }

        if self.settings_file.as_os_str().is_empty() {
            return Err(BackdropError::Config(ConfigError::InvalidValue {
                field: "settings_file".to_string(),
                value: String::new(),
            }));
        }

        if self.snippet_path.as_os_str().is_empty() {
            return Err(BackdropError::Config(ConfigError::InvalidValue {
                field: "snippet_path".to_string(),
                value: String::new(),
            }));
        }

        Ok(())
    }

    pub fn settings_store(&self) -> JsonConfigStore {
        JsonConfigStore::new(&self.settings_file)
    }
}

/// Settings record kept as a JSON file.
#[derive(Debug, Clone)]
pub struct JsonConfigStore {
    path: PathBuf,
}

impl JsonConfigStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl ConfigStore for JsonConfigStore {
    fn load(&self) -> Result<Settings> {
        if !self.path.exists() {
            log::info!("No settings record at {:?}, using defaults", self.path);
            return Ok(Settings::default());
        }

        let content = std::fs::read_to_string(&self.path)
            .map_err(|e| BackdropError::Config(ConfigError::FileRead {
                path: self.path.clone(),
                source: e,
            }))?;

        if content.trim().is_empty() {
            return Ok(Settings::default());
        }

        Ok(serde_json::from_str(&content)?)
    }

    fn save(&self, settings: &Settings) -> Result<()> {
        let write_error = |e| BackdropError::Config(ConfigError::FileWrite {
            path: self.path.clone(),
            source: e,
        });

        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent).map_err(write_error)?;
        }

        let json = serde_json::to_string_pretty(settings)?;
        std::fs::write(&self.path, json).map_err(write_error)?;
        log::debug!("Saved settings to {:?}", self.path);

        Ok(())
    }
}
