//! Settings file parsing and loading
//!
//! The settings file is an optional TOML document. Every key may be omitted;
//! unknown keys are rejected so typos surface instead of being ignored.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// Name of the settings file inside the `devyan` config directory.
pub const SETTINGS_FILE: &str = "config.toml";

#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    #[error("Failed to read settings file {path}: {reason}")]
    Io { path: String, reason: String },

    #[error("Invalid settings file: {0}")]
    Parse(String),
}

/// Values read from the settings file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Settings {
    pub ollama_url: Option<String>,
    pub model: Option<String>,
    pub max_retries: Option<u32>,
    pub output_dir: Option<String>,
}

/// Parse the contents of a settings file.
pub fn parse_settings(text: &str) -> Result<Settings, SettingsError> {
    toml::from_str(text).map_err(|e| SettingsError::Parse(e.message().to_string()))
}

/// `<config_dir>/devyan/config.toml`
pub fn settings_path(config_dir: &Path) -> PathBuf {
    config_dir.join("devyan").join(SETTINGS_FILE)
}

/// Load settings from `path`. A missing file yields empty settings.
pub fn load_settings(path: &Path) -> Result<Settings, SettingsError> {
    if !path.exists() {
        return Ok(Settings::default());
    }

    let text = fs::read_to_string(path).map_err(|e| SettingsError::Io {
        path: path.display().to_string(),
        reason: e.to_string(),
    })?;

    parse_settings(&text)
}
