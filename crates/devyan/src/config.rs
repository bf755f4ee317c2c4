use crate::prelude::*;
use devyan_core::project::{RetryPolicy, DEFAULT_OUTPUT_DIR};
use devyan_core::settings::{load_settings, settings_path, Settings};
use std::path::{Path, PathBuf};

/// Resolved configuration for a generation run.
///
/// Precedence: CLI flag or environment variable, then the settings file, then
/// the built-in defaults.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DevyanConfig {
    pub ollama_url: String,
    pub model: String,
    pub max_retries: u32,
    pub output_dir: PathBuf,
}

impl DevyanConfig {
    pub const DEFAULT_OLLAMA_URL: &'static str = "http://localhost:11434";
    pub const DEFAULT_MODEL: &'static str = "llama3.1:8b";

    /// Load the settings file. `path` replaces the default location.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let path = match path {
            Some(path) => path.to_path_buf(),
            None => match dirs_next::config_dir() {
                Some(dir) => settings_path(&dir),
                None => {
                    log::debug!("No config directory on this platform, using defaults");
                    return Ok(Self::from_settings(Settings::default()));
                }
            },
        };

        log::debug!("Loading settings from {}", path.display());
        let settings = load_settings(&path)
            .with_context(|| format!("Failed to load settings from {}", path.display()))?;

        Ok(Self::from_settings(settings))
    }

    pub fn from_settings(settings: Settings) -> Self {
        Self {
            ollama_url: settings
                .ollama_url
                .unwrap_or_else(|| Self::DEFAULT_OLLAMA_URL.to_string()),
            model: settings
                .model
                .unwrap_or_else(|| Self::DEFAULT_MODEL.to_string()),
            max_retries: settings
                .max_retries
                .unwrap_or(RetryPolicy::DEFAULT_MAX_RETRIES),
            output_dir: PathBuf::from(
                settings
                    .output_dir
                    .unwrap_or_else(|| DEFAULT_OUTPUT_DIR.to_string()),
            ),
        }
    }

    /// Apply CLI overrides to the configuration
    pub fn with_overrides(
        mut self,
        ollama_url: Option<String>,
        model: Option<String>,
        max_retries: Option<u32>,
        output_dir: Option<PathBuf>,
    ) -> Self {
        if let Some(url) = ollama_url {
            self.ollama_url = url;
        }
        if let Some(model) = model {
            self.model = model;
        }
        if let Some(retries) = max_retries {
            self.max_retries = retries;
        }
        if let Some(dir) = output_dir {
            self.output_dir = dir;
        }
        self
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(self.max_retries)
    }
}
