//! Sync configuration: a TOML file plus environment overrides.

use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;

use crate::family::FamilyConfig;
use crate::session::RemoteMetadataSession;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error reading {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Invalid TOML: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, Deserialize)]
pub struct SyncConfig {
    /// CDN root, e.g. `https://autopatch.example.com/game/1.2_live`.
    #[serde(default)]
    pub base_url: String,

    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Sessions driven at once by `sync_all`.
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,

    /// Extra headers sent with every metadata request.
    #[serde(default)]
    pub headers: Vec<(String, String)>,

    #[serde(default = "FamilyConfig::builtin")]
    pub families: Vec<FamilyConfig>,
}

fn default_user_agent() -> String {
    crate::USER_AGENT.to_string()
}

fn default_concurrency() -> usize {
    4
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            base_url: String::new(),
            user_agent: default_user_agent(),
            concurrency: default_concurrency(),
            headers: Vec::new(),
            families: FamilyConfig::builtin(),
        }
    }
}

impl SyncConfig {
    /// `<config dir>/assetsync/config.toml`.
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|d| d.join("assetsync").join("config.toml"))
    }

    pub fn from_toml(s: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(s)?)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&text)
    }

    /// Load from `path`, or from [`SyncConfig::default_path`] when it exists,
    /// or fall back to defaults; then apply process environment overrides.
    pub fn resolve(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = match path {
            Some(p) => Self::load(p)?,
            None => match Self::default_path().filter(|p| p.exists()) {
                Some(p) => Self::load(&p)?,
                None => Self::default(),
            },
        };
        config.apply_env(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// Apply `ASSETSYNC_BASE_URL` / `ASSETSYNC_CONCURRENCY` from `lookup`.
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<(), ConfigError> {
        if let Some(url) = lookup("ASSETSYNC_BASE_URL") {
            self.base_url = url;
        }
        if let Some(raw) = lookup("ASSETSYNC_CONCURRENCY") {
            self.concurrency = raw
                .parse()
                .map_err(|_| ConfigError::Invalid(format!("ASSETSYNC_CONCURRENCY='{raw}' is not a number")))?;
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.base_url.is_empty() {
            return Err(ConfigError::Invalid(
                "base_url is not set (config file or ASSETSYNC_BASE_URL)".to_string(),
            ));
        }
        if !self.base_url.starts_with("http") {
            return Err(ConfigError::Invalid(format!(
                "base_url must start with http(s): '{}'",
                self.base_url
            )));
        }
        if self.concurrency == 0 {
            return Err(ConfigError::Invalid("concurrency must be at least 1".to_string()));
        }
        Ok(())
    }

    pub fn family(&self, name: &str) -> Option<&FamilyConfig> {
        self.families.iter().find(|f| f.name == name)
    }

    /// One fresh session per requested family, or per configured family when
    /// `names` is empty.
    pub fn sessions(&self, names: &[String]) -> Result<Vec<RemoteMetadataSession>, ConfigError> {
        let selected: Vec<&FamilyConfig> = if names.is_empty() {
            self.families.iter().collect()
        } else {
            names
                .iter()
                .map(|n| {
                    self.family(n)
                        .ok_or_else(|| ConfigError::Invalid(format!("unknown family '{n}'")))
                })
                .collect::<Result<_, _>>()?
        };

        Ok(selected
            .into_iter()
            .map(|f| RemoteMetadataSession::new(f.clone(), self.base_url.clone()).with_headers(self.headers.clone()))
            .collect())
    }
}
