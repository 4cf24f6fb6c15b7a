//! Environment variable handling.

use std::env;

/// Get an environment variable, returning None if not set or empty.
pub fn get_var(name: &str) -> Option<String> {
    env::var(name).ok().filter(|v| !v.is_empty())
}

/// Load environment variables from a .env file in the working directory.
///
/// Variables that are already set are left untouched.
pub fn load_dotenv() -> Result<(), std::io::Error> {
    let path = std::path::Path::new(".env");
    if path.exists() {
        let content = std::fs::read_to_string(path)?;
        for (key, value) in parse_dotenv(&content) {
            if env::var(&key).is_err() {
                env::set_var(key, value);
            }
        }
    }
    Ok(())
}

/// Parse `KEY=value` lines, skipping blanks and comments and stripping quotes.
fn parse_dotenv(content: &str) -> Vec<(String, String)> {
    content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .filter_map(|line| line.split_once('='))
        .map(|(key, value)| {
            let value = value.trim();
            let value = value
                .strip_prefix('"')
                .and_then(|v| v.strip_suffix('"'))
                .or_else(|| value.strip_prefix('\'').and_then(|v| v.strip_suffix('\'')))
                .unwrap_or(value);
            (key.trim().to_string(), value.to_string())
        })
        .collect()
}

/// Environment variable names recognized by ChatVault.
pub mod vars {
    /// Master key material for the envelope engine (required).
    pub const ENVELOPE_MASTER_KEY: &str = "ENVELOPE_MASTER_KEY";

    /// Pepper for the blind index (required).
    pub const PEPPER_HASH: &str = "PEPPER_HASH";

    /// Downstream generator base URL override.
    pub const OLLAMA_API_URL: &str = "OLLAMA_API_URL";

    /// Downstream model override.
    pub const CHATVAULT_MODEL: &str = "CHATVAULT_MODEL";

    /// ChatVault home directory override.
    pub const CHATVAULT_HOME: &str = "CHATVAULT_HOME";

    /// ChatVault config file override.
    pub const CHATVAULT_CONFIG: &str = "CHATVAULT_CONFIG";

    /// ChatVault log level.
    pub const CHATVAULT_LOG: &str = "CHATVAULT_LOG";
}
