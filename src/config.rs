use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

use crate::period::Period;
use crate::search::DEFAULT_MAX_RESULTS;

/// User preferences written once on first run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Settings {
    pub default_period: Period,
    pub max_history_items: usize,
    pub enable_analytics: bool,
    /// Unix milliseconds of the first run.
    pub installed_date: i64,
}

impl Settings {
    pub fn new(installed_date: i64) -> Self {
        Self {
            default_period: Period::Week,
            max_history_items: DEFAULT_MAX_RESULTS,
            enable_analytics: true,
            installed_date,
        }
    }

    /// Reads settings from `path`, writing defaults there first if the file
    /// does not exist yet.
    pub fn load_or_init(path: &Path, now_ms: i64) -> Result<Self> {
        if path.exists() {
            let content = fs::read_to_string(path)
                .with_context(|| format!("Failed to read settings from {:?}", path))?;
            let settings: Settings = serde_json::from_str(&content)
                .with_context(|| format!("Failed to parse settings in {:?}", path))?;
            info!(action = "load", component = "settings", file_path = ?path, "Loaded settings");
            return Ok(settings);
        }

        let settings = Settings::new(now_ms);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create settings directory {:?}", parent))?;
        }
        let content = serde_json::to_string_pretty(&settings)?;
        fs::write(path, content)
            .with_context(|| format!("Failed to write settings to {:?}", path))?;
        info!(action = "init", component = "settings", file_path = ?path, "Initialized default settings");
        Ok(settings)
    }
}

pub fn default_settings_path() -> Result<PathBuf> {
    if let Ok(config_home) = env::var("XDG_CONFIG_HOME") {
        return Ok(PathBuf::from(config_home).join("timecapsule/settings.json"));
    }
    if let Ok(app_data) = env::var("APPDATA") {
        return Ok(PathBuf::from(app_data).join("timecapsule/settings.json"));
    }
    let home = env::var("HOME")
        .or_else(|_| env::var("USERPROFILE"))
        .context("Cannot locate home directory for settings")?;
    Ok(PathBuf::from(home).join(".config/timecapsule/settings.json"))
}
