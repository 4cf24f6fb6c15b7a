//! The stored secret record.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::filter::Scoped;

/// A protected credential as held by the persistence collaborator.
///
/// Only ciphertext and the blind index are carried; the plaintext token is
/// never part of this type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Secret {
    /// Opaque unique identifier.
    pub id: String,

    /// Human-readable label, unique within `(org_id, user_id)`.
    pub name: String,

    /// `nonce || tag || ciphertext` of the token under the data key, hex.
    pub encrypted_token: String,

    /// `nonce || tag || ciphertext` of the data key under the master key, hex.
    pub encrypted_dek: String,

    /// Keyed digest of the plaintext, used only for equality matching.
    pub blind_index: String,

    /// Confirmed exposure events. Never decreases.
    #[serde(default)]
    pub breach_count: u64,

    /// Owning organization.
    pub org_id: String,

    /// Owning user.
    pub user_id: String,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Scoped for Secret {
    fn org_id(&self) -> &str {
        &self.org_id
    }

    fn user_id(&self) -> &str {
        &self.user_id
    }

    fn blind_index(&self) -> Option<&str> {
        Some(&self.blind_index)
    }
}
