//! Authenticated identity and typed scopes.
//!
//! The identity source hands over a verified claims object
//! `{id, email, scopes, orgId}`. Scopes arrive as free-form strings and are
//! parsed once into [`Scope`] so that authorization matches on a closed set.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use crate::error::SecurityError;

/// Prefix carrying organization membership inside the scope set.
const ORG_SCOPE_PREFIX: &str = "org:";

/// A single parsed scope.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Scope {
    /// Organization administrator.
    Admin,

    /// Organization manager (read-only visibility).
    Manager,

    /// Chat-only user with no secret visibility.
    Viewer,

    /// Organization membership (`org:<id>`).
    Org(String),

    /// Any tag not recognized above. Grants nothing.
    Unknown(String),
}

impl FromStr for Scope {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "admin" => Self::Admin,
            "manager" => Self::Manager,
            "viewer" => Self::Viewer,
            other => match other.strip_prefix(ORG_SCOPE_PREFIX) {
                Some(id) if !id.is_empty() => Self::Org(id.to_string()),
                _ => Self::Unknown(other.to_string()),
            },
        })
    }
}

impl From<String> for Scope {
    fn from(s: String) -> Self {
        match s.parse() {
            Ok(scope) => scope,
            Err(never) => match never {},
        }
    }
}

impl From<Scope> for String {
    fn from(scope: Scope) -> Self {
        scope.to_string()
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Admin => f.write_str("admin"),
            Self::Manager => f.write_str("manager"),
            Self::Viewer => f.write_str("viewer"),
            Self::Org(id) => write!(f, "{ORG_SCOPE_PREFIX}{id}"),
            Self::Unknown(raw) => f.write_str(raw),
        }
    }
}

/// Effective role of an identity.
///
/// Ordered by precedence: when several role scopes coexist the highest wins.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Viewer,
    Manager,
    Admin,
}

/// The authenticated actor, as handed over by the identity source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Identity {
    /// User ID.
    pub id: String,

    /// Email address.
    #[serde(default)]
    pub email: String,

    /// Parsed scopes.
    #[serde(default)]
    pub scopes: BTreeSet<Scope>,

    /// Organization the identity acts within.
    #[serde(default)]
    pub org_id: String,
}

impl Identity {
    /// Create an identity from raw scope strings.
    pub fn new<I, S>(
        id: impl Into<String>,
        email: impl Into<String>,
        scopes: I,
        org_id: impl Into<String>,
    ) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            id: id.into(),
            email: email.into(),
            scopes: scopes.into_iter().map(|s| s.as_ref().to_string().into()).collect(),
            org_id: org_id.into(),
        }
    }

    /// Parse a verified claims JSON object.
    pub fn from_claims(json: &str) -> Result<Self, SecurityError> {
        let identity: Self =
            serde_json::from_str(json).map_err(|e| SecurityError::InvalidClaims(e.to_string()))?;
        if identity.id.is_empty() {
            return Err(SecurityError::InvalidClaims("missing id".to_string()));
        }
        Ok(identity)
    }

    /// Highest-precedence role present in the scope set.
    pub fn role(&self) -> Option<Role> {
        self.scopes
            .iter()
            .filter_map(|scope| match scope {
                Scope::Admin => Some(Role::Admin),
                Scope::Manager => Some(Role::Manager),
                Scope::Viewer => Some(Role::Viewer),
                Scope::Org(_) | Scope::Unknown(_) => None,
            })
            .max()
    }

    /// Organization this identity acts within.
    ///
    /// The `orgId` claim wins; an `org:<id>` scope is the fallback when the
    /// claim is empty.
    pub fn org(&self) -> Option<&str> {
        if !self.org_id.is_empty() {
            return Some(&self.org_id);
        }
        self.scopes.iter().find_map(|scope| match scope {
            Scope::Org(id) => Some(id.as_str()),
            _ => None,
        })
    }

    /// Check if a scope is present.
    pub fn has_scope(&self, scope: &Scope) -> bool {
        self.scopes.contains(scope)
    }
}
