use crate::providers::mfapi::DEFAULT_BASE_URL;
use anyhow::{Context, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::{fs, path::PathBuf};
use tracing::debug;

/// A fund on the watchlist, identified by its mfapi scheme code.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct FundRef {
    pub code: String,
    /// Display name overriding the scheme name reported by the source.
    #[serde(default)]
    pub name: Option<String>,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct MfApiProviderConfig {
    pub base_url: String,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ProvidersConfig {
    pub mfapi: Option<MfApiProviderConfig>,
}

impl Default for ProvidersConfig {
    fn default() -> Self {
        ProvidersConfig {
            mfapi: Some(MfApiProviderConfig {
                base_url: DEFAULT_BASE_URL.to_string(),
            }),
        }
    }
}

impl ProvidersConfig {
    pub fn mfapi_base_url(&self) -> &str {
        self.mfapi.as_ref().map_or(DEFAULT_BASE_URL, |p| &p.base_url)
    }
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct WindowConfig {
    /// Length of the comparison window when no start date is given.
    #[serde(default = "default_lookback_days")]
    pub lookback_days: u32,
    /// Start the window on the first date every fund has data.
    #[serde(default = "default_require_common_start")]
    pub require_common_start: bool,
}

fn default_lookback_days() -> u32 {
    365
}

fn default_require_common_start() -> bool {
    true
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            lookback_days: default_lookback_days(),
            require_common_start: default_require_common_start(),
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub funds: Vec<FundRef>,
    #[serde(default)]
    pub providers: ProvidersConfig,
    #[serde(default)]
    pub window: WindowConfig,
    #[serde(default)]
    pub data_path: Option<String>,
}

impl AppConfig {
    /// Loads the config from the default location, or the built-in defaults
    /// when no config file has been created yet.
    pub fn load() -> Result<Self> {
        debug!("Loading default config");
        let config_path = Self::default_config_path()?;
        if !config_path.exists() {
            debug!(
                "No config at {}, using defaults",
                config_path.display()
            );
            return Ok(Self::default());
        }
        Self::load_from_path(&config_path)
    }

    pub fn default_config_path() -> Result<PathBuf> {
        let proj_dirs = ProjectDirs::from("in", "fundsight", "fundsight")
            .context("Could not determine project directories")?;
        Ok(proj_dirs.config_dir().join("config.yaml"))
    }

    pub fn default_data_path(&self) -> Result<PathBuf> {
        if let Some(custom_path) = &self.data_path {
            return Ok(PathBuf::from(custom_path));
        }
        let proj_dirs = ProjectDirs::from("in", "fundsight", "fundsight")
            .context("Could not determine project directories")?;
        Ok(proj_dirs.data_dir().to_path_buf())
    }

    pub fn load_from_path<P: AsRef<std::path::Path>>(path: P) -> Result<Self> {
        let config_str = fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read config file: {}", path.as_ref().display()))?;

        let config: Self = serde_yaml::from_str(&config_str)
            .with_context(|| format!("Failed to parse config file: {}", path.as_ref().display()))?;
        debug!("Successfully loaded config");
        Ok(config)
    }
}
