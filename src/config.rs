// ABOUTME: YAML config loading and validation
// ABOUTME: Defines sync targets and the polling interval; fatal on bad input

use crate::{Error, Result};
use directories::BaseDirs;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TargetKind {
    Database,
    Page,
}

impl fmt::Display for TargetKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            TargetKind::Database => f.write_str("database"),
            TargetKind::Page => f.write_str("page"),
        }
    }
}

/// A remote collection or single page kept mirrored locally. `name` becomes
/// the output subdirectory.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SyncTarget {
    #[serde(rename = "type")]
    pub kind: TargetKind,
    pub id: String,
    pub name: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    pub notion_api_key: String,
    pub output_dir: PathBuf,
    #[serde(default = "default_sync_interval")]
    pub sync_interval: u64,
    #[serde(default)]
    pub targets: Vec<SyncTarget>,
}

fn default_sync_interval() -> u64 {
    60
}

pub fn default_config_path() -> PathBuf {
    BaseDirs::new()
        .map(|dirs| dirs.home_dir().join(".pagemill.yaml"))
        .unwrap_or_else(|| PathBuf::from(".pagemill.yaml"))
}

/// Expand a leading `~` against the home directory.
pub fn expand_home(path: &Path) -> PathBuf {
    if let Ok(stripped) = path.strip_prefix("~") {
        if let Some(dirs) = BaseDirs::new() {
            return dirs.home_dir().join(stripped);
        }
    }
    path.to_path_buf()
}

pub fn load_config(path: &Path) -> Result<Config> {
    if !path.exists() {
        return Err(Error::Config(format!(
            "Config file not found at {}. Create it before syncing.",
            path.display()
        )));
    }

    let raw = fs::read_to_string(path)
        .map_err(|e| Error::Config(format!("Failed to read {}: {}", path.display(), e)))?;

    let mut config: Config = serde_yaml::from_str(&raw)
        .map_err(|e| Error::Config(format!("Failed to parse {}: {}", path.display(), e)))?;

    validate(&config)?;
    config.output_dir = expand_home(&config.output_dir);
    Ok(config)
}

fn validate(config: &Config) -> Result<()> {
    let mut issues = Vec::new();

    if config.notion_api_key.trim().is_empty() {
        issues.push("notion_api_key: must not be empty".to_string());
    }
    if config.output_dir.as_os_str().is_empty() {
        issues.push("output_dir: must not be empty".to_string());
    }
    if config.sync_interval == 0 {
        issues.push("sync_interval: must be positive".to_string());
    }
    for (i, target) in config.targets.iter().enumerate() {
        if target.id.trim().is_empty() {
            issues.push(format!("targets[{}].id: must not be empty", i));
        }
        if target.name.trim().is_empty() {
            issues.push(format!("targets[{}].name: must not be empty", i));
        }
    }

    if issues.is_empty() {
        Ok(())
    } else {
        Err(Error::Config(format!(
            "Invalid config:\n  {}",
            issues.join("\n  ")
        )))
    }
}
