//! Deterministic keyed digests for equality matching.
//!
//! The blind index is `hex(HMAC-SHA256(pepper, token))`. Equal tokens always
//! give equal indices, so candidate words from chat text can be matched
//! against stored secrets without decrypting anything. Without the pepper an
//! index cannot be recomputed from a guessed token.

use chatvault_core::SecretString;
use hmac::{Hmac, Mac};
use sha2::Sha256;

use crate::error::{Result, SecretError};

type HmacSha256 = Hmac<Sha256>;

/// Computes blind indices under a fixed pepper.
#[derive(Clone)]
pub struct BlindIndexer {
    mac: HmacSha256,
}

impl BlindIndexer {
    /// Create an indexer keyed with `pepper`.
    pub fn new(pepper: &SecretString) -> Result<Self> {
        if pepper.is_empty() {
            return Err(SecretError::Configuration(
                "blind index pepper is empty".to_string(),
            ));
        }
        let mac = HmacSha256::new_from_slice(pepper.expose_secret().as_bytes())
            .map_err(|e| SecretError::Configuration(e.to_string()))?;
        Ok(Self { mac })
    }

    /// Index of `token`: 64 lowercase hex characters.
    pub fn index(&self, token: &str) -> String {
        let mut mac = self.mac.clone();
        mac.update(token.as_bytes());
        hex::encode(mac.finalize().into_bytes())
    }

    /// Whether `token` hashes to `index`.
    pub fn matches(&self, token: &str, index: &str) -> bool {
        let Ok(expected) = hex::decode(index) else {
            return false;
        };
        let mut mac = self.mac.clone();
        mac.update(token.as_bytes());
        mac.verify_slice(&expected).is_ok()
    }
}

impl std::fmt::Debug for BlindIndexer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("BlindIndexer([REDACTED])")
    }
}
