//! YAML configuration for the headless host.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Config file picked up from the working directory when `--config` is absent.
pub const DEFAULT_CONFIG_FILE: &str = "dropli.yaml";

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub save_path: PathBuf,
    pub archive_url: String,
    pub log_filter: String,
    pub pet_name: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            save_path: PathBuf::from("./saves/dropli_save.json"),
            archive_url: persistence::archive::default_sqlite_url().to_string(),
            log_filter: "info".to_string(),
            pet_name: pet_core::DEFAULT_NAME.to_string(),
        }
    }
}

impl Config {
    pub fn from_yaml(text: &str) -> Result<Self> {
        serde_yaml::from_str(text).context("invalid config")
    }

    /// Read `path`, or the default file if present, or fall back to defaults.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let path = match path {
            Some(p) => p.to_path_buf(),
            None => {
                let p = PathBuf::from(DEFAULT_CONFIG_FILE);
                if !p.exists() {
                    return Ok(Self::default());
                }
                p
            }
        };
        let text = std::fs::read_to_string(&path)
            .with_context(|| format!("reading config {}", path.display()))?;
        Self::from_yaml(&text)
    }
}
