//! CLI command implementations.

pub mod audits;
pub mod chat;
pub mod config;
pub mod secrets;

use std::sync::Arc;

use chatvault_core::config::Config;
use chatvault_secrets::{FileSecretStore, SecretVault, VaultKeys};

/// Open the file-backed vault named by `config`.
///
/// Key material comes from the environment and is checked before the
/// store is touched.
pub(crate) async fn open_vault(config: &Config) -> anyhow::Result<SecretVault> {
    let keys = VaultKeys::from_env()?;
    let store = Arc::new(
        FileSecretStore::open(config.data_dir()?)
            .await
            .map_err(|e| anyhow::anyhow!("Failed to open vault: {}", e))?,
    );
    Ok(SecretVault::new(store.clone(), store, keys).with_config(config.vault.clone()))
}
