//! Key material resolution.
//!
//! Two independent secrets drive the vault:
//! 1. `ENVELOPE_MASTER_KEY` - input to the master key derivation
//! 2. `PEPPER_HASH` - key of the blind-index MAC
//!
//! Both come from the environment only; they are never read from the config
//! file and never written anywhere. A missing or empty value is a fatal
//! configuration error, and so is using the same value for both.

use chatvault_core::env::{get_var, vars};
use chatvault_core::SecretString;
use tracing::debug;

use crate::blind_index::BlindIndexer;
use crate::crypto::EnvelopeCipher;
use crate::error::{Result, SecretError};

/// Raw key material, zeroed on drop.
#[derive(Debug, Clone)]
pub struct KeyMaterial {
    pub master_key: SecretString,
    pub pepper: SecretString,
}

impl KeyMaterial {
    /// Read both values from the environment.
    pub fn from_env() -> Result<Self> {
        let master_key = require(vars::ENVELOPE_MASTER_KEY)?;
        let pepper = require(vars::PEPPER_HASH)?;
        debug!("loaded key material from environment");
        Ok(Self { master_key, pepper })
    }

    /// Build from explicit values.
    pub fn new(master_key: impl Into<String>, pepper: impl Into<String>) -> Self {
        Self {
            master_key: SecretString::new(master_key),
            pepper: SecretString::new(pepper),
        }
    }
}

fn require(name: &'static str) -> Result<SecretString> {
    match get_var(name) {
        Some(value) if !value.is_empty() => Ok(SecretString::new(value)),
        _ => Err(SecretError::Configuration(format!("{name} is not set"))),
    }
}

/// The two crypto engines, ready to use.
#[derive(Debug)]
pub struct VaultKeys {
    pub cipher: EnvelopeCipher,
    pub indexer: BlindIndexer,
}

impl VaultKeys {
    /// Resolve key material from the environment and build both engines.
    pub fn from_env() -> Result<Self> {
        Self::from_material(&KeyMaterial::from_env()?)
    }

    /// Build both engines from explicit key material.
    pub fn from_material(material: &KeyMaterial) -> Result<Self> {
        if material.master_key.is_empty() {
            return Err(SecretError::Configuration(format!(
                "{} is empty",
                vars::ENVELOPE_MASTER_KEY
            )));
        }
        if material.pepper.is_empty() {
            return Err(SecretError::Configuration(format!(
                "{} is empty",
                vars::PEPPER_HASH
            )));
        }
        if material.master_key == material.pepper {
            return Err(SecretError::Configuration(format!(
                "{} and {} must differ",
                vars::ENVELOPE_MASTER_KEY,
                vars::PEPPER_HASH
            )));
        }

        Ok(Self {
            cipher: EnvelopeCipher::from_secret(&material.master_key)?,
            indexer: BlindIndexer::new(&material.pepper)?,
        })
    }
}
