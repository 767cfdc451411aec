//! User configuration and repository location
//!
//! The repository root is resolved in this order:
//!
//! 1. An explicit path (the `--repo` flag or `AIMGR_REPO_PATH`)
//! 2. `repo.path` in `<config_dir>/aimgr/aimgr.yaml` (or `.yml`, `.toml`)
//! 3. `<data_dir>/ai-config/repo`

use std::path::{Path, PathBuf};

use aimgr_fs::{ConfigStore, NormalizedPath};
use serde::{Deserialize, Serialize};

use crate::{Error, Result};

const APP_DIR: &str = "aimgr";
const CONFIG_FILES: &[&str] = &["aimgr.yaml", "aimgr.yml", "aimgr.toml"];
const DEFAULT_REPO_DIR: &str = "ai-config/repo";

/// Contents of the user configuration file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub repo: RepoSection,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepoSection {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
}

/// Resolves the repository root from flags, user config and platform dirs.
#[derive(Debug, Clone, Default)]
pub struct ConfigResolver {
    /// Override for the user config directory (used for testing).
    /// When `None`, `dirs::config_dir()/aimgr` is used.
    config_dir_override: Option<PathBuf>,
    data_dir_override: Option<PathBuf>,
}

impl ConfigResolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Use `config_dir` instead of the platform config directory.
    pub fn with_config_dir(mut self, config_dir: impl Into<PathBuf>) -> Self {
        self.config_dir_override = Some(config_dir.into());
        self
    }

    /// Use `data_dir` instead of the platform data directory.
    pub fn with_data_dir(mut self, data_dir: impl Into<PathBuf>) -> Self {
        self.data_dir_override = Some(data_dir.into());
        self
    }

    fn config_dir(&self) -> Option<PathBuf> {
        match &self.config_dir_override {
            Some(dir) => Some(dir.clone()),
            None => dirs::config_dir().map(|d| d.join(APP_DIR)),
        }
    }

    /// Load the first config file present, if any.
    pub fn load(&self) -> Result<Option<AppConfig>> {
        let Some(dir) = self.config_dir() else {
            return Ok(None);
        };
        let store = ConfigStore::new();
        for file in CONFIG_FILES {
            let path = NormalizedPath::new(dir.join(file));
            if let Some(config) = store.load_optional::<AppConfig>(&path)? {
                tracing::debug!(path = %path, "loaded user config");
                return Ok(Some(config));
            }
        }
        Ok(None)
    }

    /// Resolve the repository root.
    pub fn repo_path(&self, explicit: Option<&Path>) -> Result<NormalizedPath> {
        if let Some(path) = explicit {
            return NormalizedPath::absolute(expand_tilde(&path.to_string_lossy())).map_err(Into::into);
        }

        if let Some(path) = self.load()?.and_then(|c| c.repo.path).filter(|p| !p.trim().is_empty()) {
            return NormalizedPath::absolute(expand_tilde(path.trim())).map_err(Into::into);
        }

        let data_dir = self
            .data_dir_override
            .clone()
            .or_else(dirs::data_dir)
            .ok_or_else(|| Error::invalid("configuration", "cannot determine a data directory"))?;
        Ok(NormalizedPath::new(data_dir.join(DEFAULT_REPO_DIR)))
    }
}

/// Expand a leading `~` to the home directory.
pub fn expand_tilde(path: &str) -> PathBuf {
    if path == "~" {
        if let Some(home) = dirs::home_dir() {
            return home;
        }
    }
    if let Some(rest) = path.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(rest);
        }
    }
    PathBuf::from(path)
}
