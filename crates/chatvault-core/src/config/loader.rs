//! Configuration loading and persistence.

use super::Config;
use crate::env::{get_var, vars};
use crate::error::ConfigError;
use crate::paths;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

impl Config {
    /// Load configuration from the default path, falling back to defaults
    /// when no file exists yet. The environment overlay is applied either way.
    pub fn load_default() -> Result<Self, ConfigError> {
        let path = paths::config_file()?;
        let mut config = if path.exists() {
            Self::load(&path)?
        } else {
            debug!(path = %path.display(), "no config file, using defaults");
            Self::default()
        };
        config.apply_env();
        Ok(config)
    }

    /// Load configuration from a file path.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Err(ConfigError::NotFound(path.to_path_buf()));
        }

        let content = fs::read_to_string(path)?;
        Self::parse(&content)
    }

    /// Parse configuration from a string.
    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        json5::from_str(content).map_err(|e| ConfigError::Json5(e.to_string()))
    }

    /// Save configuration to the default path.
    pub fn save_default(&self) -> Result<(), ConfigError> {
        let path = paths::config_file()?;
        self.save(&path)
    }

    /// Save configuration to a file path.
    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        let content = self.to_json5()?;

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        // Write atomically
        let temp_path = path.with_extension("tmp");
        fs::write(&temp_path, &content)?;
        fs::rename(&temp_path, path)?;

        Ok(())
    }

    /// Serialize to JSON5 string.
    pub fn to_json5(&self) -> Result<String, ConfigError> {
        // json5 has no serializer; JSON is valid JSON5.
        serde_json::to_string_pretty(self).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    /// Override settings from the environment.
    pub fn apply_env(&mut self) {
        if let Some(url) = get_var(vars::OLLAMA_API_URL) {
            self.generator.base_url = url;
        }
        if let Some(model) = get_var(vars::CHATVAULT_MODEL) {
            self.generator.model = model;
        }
        if let Some(level) = get_var(vars::CHATVAULT_LOG) {
            match level.parse() {
                Ok(level) => self.logging.level = level,
                Err(e) => warn!("ignoring {}: {e}", vars::CHATVAULT_LOG),
            }
        }
    }

    /// Directory holding the vault document.
    pub fn data_dir(&self) -> Result<PathBuf, ConfigError> {
        match &self.storage.data_dir {
            Some(dir) => Ok(paths::expand_tilde(&dir.to_string_lossy())),
            None => paths::data_dir(),
        }
    }

    /// Validate the configuration, collecting all errors before returning.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut errors = Vec::new();

        if self.vault.min_token_length == 0 {
            errors.push("vault.min_token_length must be at least 1".to_string());
        }

        if self.vault.max_name_length == 0 {
            errors.push("vault.max_name_length must be at least 1".to_string());
        }

        if self.chat.channel_capacity == 0 {
            errors.push("chat.channel_capacity must be at least 1".to_string());
        }

        let url = &self.generator.base_url;
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            errors.push(format!(
                "generator.base_url must be an http(s) URL, got '{url}'"
            ));
        }

        if self.generator.model.trim().is_empty() {
            errors.push("generator.model must not be empty".to_string());
        }

        if !(0.0..=2.0).contains(&self.generator.temperature) {
            errors.push(format!(
                "generator.temperature must be 0.0-2.0, got {}",
                self.generator.temperature
            ));
        }

        if !(0.0..=1.0).contains(&self.generator.top_p) {
            errors.push(format!(
                "generator.top_p must be 0.0-1.0, got {}",
                self.generator.top_p
            ));
        }

        if self.generator.timeout_secs == 0 {
            errors.push("generator.timeout_secs must be at least 1".to_string());
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(ConfigError::Validation(errors.join("; ")))
        }
    }
}
