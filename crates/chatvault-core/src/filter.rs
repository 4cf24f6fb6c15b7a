//! Filter predicates over scoped records.
//!
//! A [`SecretFilter`] is what the ability set hands to persistence: stores
//! with a query engine translate it (see [`SecretFilter::to_where`]), stores
//! without one evaluate it in memory with [`SecretFilter::matches`]. Both
//! paths see the same predicate, so the gate and the query cannot disagree.

use serde_json::{json, Value};
use std::collections::BTreeSet;

/// Attributes that authorization predicates are evaluated against.
pub trait Scoped {
    /// Owning organization.
    fn org_id(&self) -> &str;

    /// Owning user.
    fn user_id(&self) -> &str;

    /// Blind index, for record kinds that carry one.
    fn blind_index(&self) -> Option<&str> {
        None
    }
}

/// A predicate over [`Scoped`] records.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SecretFilter {
    /// Every record.
    All,

    /// `orgId = value`.
    OrgEq(String),

    /// `userId = value`.
    UserEq(String),

    /// `blindIndex IN set`.
    BlindIndexIn(BTreeSet<String>),

    /// Conjunction. An empty conjunction is [`SecretFilter::All`].
    And(Vec<SecretFilter>),

    /// Disjunction. An empty disjunction matches nothing.
    Or(Vec<SecretFilter>),
}

impl SecretFilter {
    /// Evaluate the predicate against a record.
    pub fn matches<R: Scoped + ?Sized>(&self, record: &R) -> bool {
        match self {
            Self::All => true,
            Self::OrgEq(org) => record.org_id() == org,
            Self::UserEq(user) => record.user_id() == user,
            Self::BlindIndexIn(set) => record
                .blind_index()
                .map(|index| set.contains(index))
                .unwrap_or(false),
            Self::And(parts) => parts.iter().all(|p| p.matches(record)),
            Self::Or(parts) => parts.iter().any(|p| p.matches(record)),
        }
    }

    /// Combine with another predicate, flattening nested conjunctions.
    pub fn and(self, other: SecretFilter) -> SecretFilter {
        match (self, other) {
            (Self::All, f) | (f, Self::All) => f,
            (Self::And(mut a), Self::And(b)) => {
                a.extend(b);
                Self::And(a)
            }
            (Self::And(mut a), f) | (f, Self::And(mut a)) => {
                a.push(f);
                Self::And(a)
            }
            (a, b) => Self::And(vec![a, b]),
        }
    }

    /// Render as a JSON where-clause (`{"orgId": "..."}`, `{"AND": [...]}`,
    /// `{"blindIndex": {"in": [...]}}`) for query-capable collaborators.
    pub fn to_where(&self) -> Value {
        match self {
            Self::All => json!({}),
            Self::OrgEq(org) => json!({ "orgId": org }),
            Self::UserEq(user) => json!({ "userId": user }),
            Self::BlindIndexIn(set) => json!({ "blindIndex": { "in": set } }),
            Self::And(parts) => {
                let parts: Vec<Value> = parts.iter().map(Self::to_where).collect();
                json!({ "AND": parts })
            }
            Self::Or(parts) => {
                let parts: Vec<Value> = parts.iter().map(Self::to_where).collect();
                json!({ "OR": parts })
            }
        }
    }
}
