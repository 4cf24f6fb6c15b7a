//! Value types returned by the vault.
//!
//! Plaintext only ever travels inside [`DecryptedSecret`]; everything else
//! here is safe to log or serialize.

use chatvault_core::{Secret, SecretString};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A decrypted token held in memory.
///
/// Wraps `SecretString` so the plaintext is zeroed on drop. Debug and Display
/// both emit `[REDACTED]`.
pub struct DecryptedSecret {
    inner: SecretString,
}

impl DecryptedSecret {
    /// Create a new decrypted secret from raw plaintext.
    pub fn new(value: impl Into<String>) -> Self {
        Self {
            inner: SecretString::new(value),
        }
    }

    /// Expose the plaintext value. Use sparingly.
    pub fn expose(&self) -> &str {
        self.inner.expose_secret()
    }
}

impl fmt::Debug for DecryptedSecret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("[REDACTED]")
    }
}

impl fmt::Display for DecryptedSecret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("[REDACTED]")
    }
}

/// Output projection of a stored secret.
///
/// Never carries ciphertext or the blind index. `token` is only filled in by
/// [`SecretView::with_token`] after a successful reveal.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SecretView {
    pub id: String,
    pub name: String,
    pub breach_count: u64,
    pub org_id: String,
    pub user_id: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
}

impl SecretView {
    /// Attach a revealed token.
    pub fn with_token(mut self, token: &DecryptedSecret) -> Self {
        self.token = Some(token.expose().to_string());
        self
    }
}

impl fmt::Debug for SecretView {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SecretView")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("breach_count", &self.breach_count)
            .field("org_id", &self.org_id)
            .field("user_id", &self.user_id)
            .field("token", &self.token.as_ref().map(|_| "[REDACTED]"))
            .finish()
    }
}

impl From<&Secret> for SecretView {
    fn from(secret: &Secret) -> Self {
        Self {
            id: secret.id.clone(),
            name: secret.name.clone(),
            breach_count: secret.breach_count,
            org_id: secret.org_id.clone(),
            user_id: secret.user_id.clone(),
            created_at: secret.created_at,
            updated_at: secret.updated_at,
            token: None,
        }
    }
}

impl From<Secret> for SecretView {
    fn from(secret: Secret) -> Self {
        Self::from(&secret)
    }
}

/// Outcome of a breach check.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BreachReport {
    /// Distinct stored secrets that matched.
    pub breaches_found: usize,

    /// Candidates examined, duplicates included.
    pub total_checked: usize,

    /// Ids of the matched secrets.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub secret_ids: Vec<String>,
}

impl BreachReport {
    /// Whether any stored secret matched.
    pub fn is_breach(&self) -> bool {
        self.breaches_found > 0
    }
}
