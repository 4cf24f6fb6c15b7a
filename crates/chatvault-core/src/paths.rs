//! Path resolution utilities.

use crate::env::{get_var, vars};
use crate::error::ConfigError;
use std::path::PathBuf;

/// Get the ChatVault base directory (`$CHATVAULT_HOME` or `~/.chatvault`).
pub fn base_dir() -> Result<PathBuf, ConfigError> {
    if let Some(home) = get_var(vars::CHATVAULT_HOME) {
        return Ok(expand_tilde(&home));
    }
    let home = dirs::home_dir().ok_or_else(|| {
        ConfigError::Validation("Could not determine home directory".to_string())
    })?;
    Ok(home.join(".chatvault"))
}

/// Get the main config file path (`~/.chatvault/chatvault.json5`).
pub fn config_file() -> Result<PathBuf, ConfigError> {
    Ok(base_dir()?.join("chatvault.json5"))
}

/// Get the default data directory (`~/.chatvault/data`).
pub fn data_dir() -> Result<PathBuf, ConfigError> {
    Ok(base_dir()?.join("data"))
}

/// Expand tilde (~) in a path.
pub fn expand_tilde(path: &str) -> PathBuf {
    if let Some(rest) = path.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(rest);
        }
    }
    PathBuf::from(path)
}
