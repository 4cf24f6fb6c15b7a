//! Capability-scoped authorization.
//!
//! [`derive_abilities`] turns an identity into an [`AbilitySet`]: a list of
//! rules `(action, subject, conditions)`. The same rules answer the yes/no
//! gate ([`AbilitySet::can`]) and produce the persistence predicate
//! ([`AbilitySet::filter`]). The set is cheap to build and is derived fresh
//! for every request.
//!
//! | Role    | Create | Read       | Unmask     | Update/Delete      | Read audits |
//! |---------|--------|------------|------------|--------------------|-------------|
//! | none    | -      | -          | -          | -                  | -           |
//! | viewer  | -      | -          | -          | -                  | -           |
//! | manager | -      | own org    | -          | -                  | own org     |
//! | admin   | yes    | own org    | own org    | own org + own user | own org     |

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::SecurityError;
use crate::filter::{Scoped, SecretFilter};
use crate::types::{Identity, Role};

/// Something an identity may attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Action {
    Create,
    Read,
    Update,
    Delete,
    /// Decrypt and display the plaintext token.
    Unmask,
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Create => "create",
            Self::Read => "read",
            Self::Update => "update",
            Self::Delete => "delete",
            Self::Unmask => "unmask",
        })
    }
}

/// Resource type an action targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Subject {
    Secret,
    Audit,
}

impl fmt::Display for Subject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Secret => "Secret",
            Self::Audit => "Audit",
        })
    }
}

#[derive(Debug, Clone)]
struct Rule {
    action: Action,
    subject: Subject,
    conditions: SecretFilter,
}

/// The permitted actions of one identity.
#[derive(Debug, Clone, Default)]
pub struct AbilitySet {
    rules: Vec<Rule>,
    authenticated: bool,
}

impl AbilitySet {
    fn grant(&mut self, action: Action, subject: Subject, conditions: SecretFilter) {
        self.rules.push(Rule {
            action,
            subject,
            conditions,
        });
    }

    fn rules_for(&self, action: Action, subject: Subject) -> impl Iterator<Item = &Rule> {
        self.rules
            .iter()
            .filter(move |r| r.action == action && r.subject == subject)
    }

    /// Whether any rule grants `action` on `subject`, regardless of conditions.
    pub fn can(&self, action: Action, subject: Subject) -> bool {
        self.rules_for(action, subject).next().is_some()
    }

    /// Whether `action` on this concrete record is granted.
    pub fn can_on<R: Scoped + ?Sized>(&self, action: Action, subject: Subject, record: &R) -> bool {
        self.rules_for(action, subject)
            .any(|r| r.conditions.matches(record))
    }

    /// Push-down predicate equivalent to [`AbilitySet::can_on`].
    ///
    /// `None` means no access at all; callers should short-circuit to an
    /// empty result instead of querying.
    pub fn filter(&self, action: Action, subject: Subject) -> Option<SecretFilter> {
        let mut conditions: Vec<SecretFilter> = self
            .rules_for(action, subject)
            .map(|r| r.conditions.clone())
            .collect();
        match conditions.len() {
            0 => None,
            1 => conditions.pop(),
            _ => Some(SecretFilter::Or(conditions)),
        }
    }

    /// Gate form of [`AbilitySet::can`].
    pub fn ensure(&self, action: Action, subject: Subject) -> Result<(), SecurityError> {
        if self.can(action, subject) {
            Ok(())
        } else {
            Err(self.denied(action, subject))
        }
    }

    /// Gate form of [`AbilitySet::can_on`].
    pub fn ensure_on<R: Scoped + ?Sized>(
        &self,
        action: Action,
        subject: Subject,
        record: &R,
    ) -> Result<(), SecurityError> {
        if self.can_on(action, subject, record) {
            Ok(())
        } else {
            Err(self.denied(action, subject))
        }
    }

    /// Whether the set was derived from an authenticated identity.
    pub fn is_authenticated(&self) -> bool {
        self.authenticated
    }

    fn denied(&self, action: Action, subject: Subject) -> SecurityError {
        if !self.authenticated {
            return SecurityError::Unauthenticated;
        }
        SecurityError::Forbidden {
            action: action.to_string(),
            subject: subject.to_string(),
        }
    }
}

/// Compute the ability set for an identity (`None` = unauthenticated).
pub fn derive_abilities(identity: Option<&Identity>) -> AbilitySet {
    let mut abilities = AbilitySet::default();
    let Some(identity) = identity else {
        return abilities;
    };
    abilities.authenticated = true;

    let org = identity.org().map(|o| SecretFilter::OrgEq(o.to_string()));

    match identity.role() {
        Some(Role::Admin) => {
            abilities.grant(Action::Create, Subject::Secret, SecretFilter::All);
            if let Some(in_org) = org {
                let owned = in_org.clone().and(SecretFilter::UserEq(identity.id.clone()));
                abilities.grant(Action::Read, Subject::Secret, in_org.clone());
                abilities.grant(Action::Unmask, Subject::Secret, in_org.clone());
                abilities.grant(Action::Update, Subject::Secret, owned.clone());
                abilities.grant(Action::Delete, Subject::Secret, owned);
                abilities.grant(Action::Read, Subject::Audit, in_org);
            }
        }
        Some(Role::Manager) => {
            if let Some(in_org) = org {
                abilities.grant(Action::Read, Subject::Secret, in_org.clone());
                abilities.grant(Action::Read, Subject::Audit, in_org);
            }
        }
        // Viewers chat but have no secret visibility.
        Some(Role::Viewer) | None => {}
    }

    abilities
}
