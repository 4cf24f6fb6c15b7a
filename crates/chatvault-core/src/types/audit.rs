//! Audit record types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::filter::Scoped;
use crate::types::Secret;

/// Kind of audited event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AuditAction {
    /// A stored secret was found in outbound chat text.
    Breach,

    /// A secret was unmasked.
    View,

    /// A secret was created.
    Create,
}

impl fmt::Display for AuditAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Breach => "BREACH",
            Self::View => "VIEW",
            Self::Create => "CREATE",
        })
    }
}

/// An append-only audit record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditRecord {
    pub id: String,

    /// Weak reference; the secret may since have been deleted.
    pub secret_id: String,

    pub user_id: String,
    pub org_id: String,
    pub action: AuditAction,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,

    pub created_at: DateTime<Utc>,
}

impl AuditRecord {
    /// Create a record about `secret`, owned by the secret's owner.
    pub fn for_secret(secret: &Secret, action: AuditAction) -> Self {
        Self {
            id: crate::id::uuid(),
            secret_id: secret.id.clone(),
            user_id: secret.user_id.clone(),
            org_id: secret.org_id.clone(),
            action,
            details: None,
            created_at: Utc::now(),
        }
    }

    /// Set details.
    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }
}

impl Scoped for AuditRecord {
    fn org_id(&self) -> &str {
        &self.org_id
    }

    fn user_id(&self) -> &str {
        &self.user_id
    }
}
