//! The secret vault service.
//!
//! Composes the envelope engine, the blind-index engine and the ability set
//! over a [`SecretRepository`] and an [`AuditSink`]. Methods named `*_for`
//! take the caller's identity and enforce capabilities; the bare variants
//! are the raw operations used after authorization has been settled
//! elsewhere (the chat pipeline's breach check, for example, is not
//! identity-scoped).

use std::collections::BTreeSet;
use std::sync::Arc;

use chatvault_core::config::VaultConfig;
use chatvault_core::{
    derive_abilities, id, Action, AuditAction, AuditRecord, Identity, Secret, SecretFilter,
    SecretString, SecurityError, Subject,
};
use chrono::Utc;
use tracing::{debug, info, warn};

use crate::error::{SecretError, VaultError, VaultResult};
use crate::keys::VaultKeys;
use crate::store::{AuditSink, MemorySecretStore, SecretRepository};
use crate::types::{BreachReport, DecryptedSecret};

/// Audit limit used when the caller does not pass one.
pub const DEFAULT_AUDIT_LIMIT: usize = 100;

const BREACH_DETAILS: &str = "Secret token found in outbound chat message";

/// Secret vault service.
#[derive(Clone)]
pub struct SecretVault {
    repo: Arc<dyn SecretRepository>,
    audits: Arc<dyn AuditSink>,
    keys: Arc<VaultKeys>,
    config: VaultConfig,
}

impl SecretVault {
    /// Create a vault over the given collaborators with default limits.
    pub fn new(
        repo: Arc<dyn SecretRepository>,
        audits: Arc<dyn AuditSink>,
        keys: VaultKeys,
    ) -> Self {
        Self {
            repo,
            audits,
            keys: Arc::new(keys),
            config: VaultConfig::default(),
        }
    }

    /// Create a vault backed by a fresh [`MemorySecretStore`].
    pub fn in_memory(keys: VaultKeys) -> Self {
        let store = Arc::new(MemorySecretStore::new());
        Self::new(store.clone(), store, keys)
    }

    /// Override the validation limits.
    pub fn with_config(mut self, config: VaultConfig) -> Self {
        self.config = config;
        self
    }

    /// Store a new secret owned by `identity`.
    ///
    /// Rejects tokens shorter than the configured minimum, empty or overlong
    /// names, and names already used by the same `(org, user)`. Returns the
    /// stored record, which never contains the plaintext.
    pub async fn create(
        &self,
        identity: &Identity,
        name: &str,
        token: &SecretString,
    ) -> VaultResult<Secret> {
        let name = name.trim();
        if name.is_empty() {
            return Err(VaultError::Validation("Name must not be empty".to_string()));
        }
        if name.chars().count() > self.config.max_name_length {
            return Err(VaultError::Validation(format!(
                "Name must be at most {} characters long",
                self.config.max_name_length
            )));
        }
        if token.char_len() < self.config.min_token_length {
            return Err(VaultError::Validation(format!(
                "Token must be at least {} characters long",
                self.config.min_token_length
            )));
        }
        let org_id = identity.org().ok_or_else(|| {
            VaultError::Validation("Identity is not a member of any organization".to_string())
        })?;

        if self
            .repo
            .find_by_name(org_id, &identity.id, name)
            .await?
            .is_some()
        {
            return Err(duplicate_name(name));
        }

        let envelope = self.keys.cipher.encrypt(token.expose_secret())?;
        let blind_index = self.keys.indexer.index(token.expose_secret());
        let now = Utc::now();
        let secret = Secret {
            id: id::uuid(),
            name: name.to_string(),
            encrypted_token: envelope.encrypted_token,
            encrypted_dek: envelope.encrypted_dek,
            blind_index,
            breach_count: 0,
            org_id: org_id.to_string(),
            user_id: identity.id.clone(),
            created_at: now,
            updated_at: now,
        };

        let secret = match self.repo.insert(secret).await {
            Ok(secret) => secret,
            // Lost a race with a concurrent create of the same name.
            Err(SecretError::Conflict(_)) => return Err(duplicate_name(name)),
            Err(e) => return Err(e.into()),
        };
        info!(secret_id = %secret.id, org_id = %secret.org_id, user_id = %secret.user_id, "created secret");

        self.audit(AuditRecord::for_secret(&secret, AuditAction::Create))
            .await;
        Ok(secret)
    }

    /// [`SecretVault::create`] behind the `Create` capability.
    pub async fn create_for(
        &self,
        identity: Option<&Identity>,
        name: &str,
        token: &SecretString,
    ) -> VaultResult<Secret> {
        derive_abilities(identity).ensure(Action::Create, Subject::Secret)?;
        let Some(identity) = identity else {
            return Err(SecurityError::Unauthenticated.into());
        };
        self.create(identity, name, token).await
    }

    /// Fetch the encrypted record. Nothing is decrypted here.
    pub async fn get_by_id(&self, id: &str) -> VaultResult<Option<Secret>> {
        Ok(self.repo.find_by_id(id).await?)
    }

    /// Fetch a record the identity may read. Records outside its read scope
    /// are reported as absent.
    pub async fn get_for(&self, identity: Option<&Identity>, id: &str) -> VaultResult<Option<Secret>> {
        let abilities = derive_abilities(identity);
        if !abilities.can(Action::Read, Subject::Secret) {
            return Ok(None);
        }
        let secret = self.repo.find_by_id(id).await?;
        Ok(secret.filter(|s| abilities.can_on(Action::Read, Subject::Secret, s)))
    }

    /// Secrets visible to `identity`. Unauthenticated or unprivileged callers
    /// get an empty list, not an error.
    pub async fn list(&self, identity: Option<&Identity>) -> VaultResult<Vec<Secret>> {
        let Some(filter) = derive_abilities(identity).filter(Action::Read, Subject::Secret) else {
            debug!("no read capability, returning empty list");
            return Ok(Vec::new());
        };
        Ok(self.repo.find_many(&filter).await?)
    }

    /// Total number of stored secrets.
    pub async fn count(&self) -> VaultResult<usize> {
        Ok(self.repo.count().await?)
    }

    /// Match candidate words against every stored secret.
    ///
    /// Each matched secret has its breach counter incremented exactly once
    /// per call, however many times it appears among the candidates, and
    /// gets a `BREACH` audit record.
    pub async fn check_breaches(&self, candidates: &[String]) -> VaultResult<BreachReport> {
        let indices: BTreeSet<String> = candidates
            .iter()
            .map(|candidate| self.keys.indexer.index(candidate))
            .collect();

        let mut report = BreachReport {
            total_checked: candidates.len(),
            ..Default::default()
        };
        if indices.is_empty() {
            return Ok(report);
        }

        let matched = self
            .repo
            .find_many(&SecretFilter::BlindIndexIn(indices))
            .await?;

        for secret in matched {
            match self.repo.increment_breach_count(&secret.id).await? {
                Some(count) => {
                    warn!(secret_id = %secret.id, org_id = %secret.org_id, breach_count = count, "secret found in outbound message");
                    self.audit(
                        AuditRecord::for_secret(&secret, AuditAction::Breach)
                            .with_details(BREACH_DETAILS),
                    )
                    .await;
                    report.secret_ids.push(secret.id);
                }
                None => debug!(secret_id = %secret.id, "matched secret deleted before increment"),
            }
        }

        report.breaches_found = report.secret_ids.len();
        debug!(
            total_checked = report.total_checked,
            breaches_found = report.breaches_found,
            "breach check complete"
        );
        Ok(report)
    }

    /// Decrypt a token for an identity allowed to unmask it, recording a
    /// `VIEW` audit.
    pub async fn reveal(
        &self,
        identity: Option<&Identity>,
        secret: &Secret,
    ) -> VaultResult<DecryptedSecret> {
        derive_abilities(identity).ensure_on(Action::Unmask, Subject::Secret, secret)?;

        let plaintext = self
            .keys
            .cipher
            .decrypt(&secret.encrypted_token, &secret.encrypted_dek)?;

        let mut record = AuditRecord::for_secret(secret, AuditAction::View);
        if let Some(identity) = identity {
            record.user_id = identity.id.clone();
        }
        info!(secret_id = %secret.id, viewer = %record.user_id, "revealed secret");
        self.audit(record).await;
        Ok(plaintext)
    }

    /// Remove a secret without any capability check.
    pub async fn delete(&self, id: &str) -> VaultResult<bool> {
        let removed = self.repo.delete(id).await?;
        if removed {
            info!(secret_id = %id, "deleted secret");
        }
        Ok(removed)
    }

    /// Remove a secret the identity owns.
    pub async fn delete_for(&self, identity: Option<&Identity>, id: &str) -> VaultResult<()> {
        let abilities = derive_abilities(identity);
        let secret = self
            .repo
            .find_by_id(id)
            .await?
            .filter(|s| abilities.can_on(Action::Read, Subject::Secret, s))
            .ok_or_else(|| VaultError::NotFound(id.to_string()))?;

        abilities.ensure_on(Action::Delete, Subject::Secret, &secret)?;
        if self.delete(id).await? {
            Ok(())
        } else {
            Err(VaultError::NotFound(id.to_string()))
        }
    }

    /// Audit records visible to `identity`, newest first.
    pub async fn list_audits(
        &self,
        identity: Option<&Identity>,
        limit: Option<usize>,
    ) -> VaultResult<Vec<AuditRecord>> {
        let Some(filter) = derive_abilities(identity).filter(Action::Read, Subject::Audit) else {
            return Ok(Vec::new());
        };
        let limit = limit.unwrap_or(DEFAULT_AUDIT_LIMIT);
        Ok(self.audits.list(&filter, limit).await?)
    }

    /// Append an audit record. The counter on the secret is authoritative, so
    /// a failing sink is logged rather than failing the operation.
    async fn audit(&self, record: AuditRecord) {
        let action = record.action;
        let secret_id = record.secret_id.clone();
        if let Err(e) = self.audits.append(record).await {
            warn!(%secret_id, %action, error = %e, "failed to write audit record");
        }
    }
}

fn duplicate_name(name: &str) -> VaultError {
    VaultError::Validation(format!("A secret named '{name}' already exists"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keys::KeyMaterial;

    const TOKEN: &str = "sk-abcdef0123456789";

    fn keys() -> VaultKeys {
        VaultKeys::from_material(&KeyMaterial::new("test-master-key", "test-pepper")).unwrap()
    }

    fn vault() -> SecretVault {
        SecretVault::in_memory(keys())
    }

    fn admin(id: &str, org: &str) -> Identity {
        Identity::new(id, format!("{id}@example.com"), ["admin".to_string(), format!("org:{org}")], org)
    }

    fn manager(org: &str) -> Identity {
        Identity::new("m1", "m@example.com", ["manager".to_string(), format!("org:{org}")], org)
    }

    fn viewer(org: &str) -> Identity {
        Identity::new("v1", "v@example.com", ["viewer".to_string(), format!("org:{org}")], org)
    }

    fn token(value: &str) -> SecretString {
        SecretString::new(value)
    }

    #[tokio::test]
    async fn test_create_returns_encrypted_record() {
        let vault = vault();
        let secret = vault
            .create(&admin("1", "org1"), "api-key", &token(TOKEN))
            .await
            .unwrap();

        assert_eq!(secret.name, "api-key");
        assert_eq!(secret.org_id, "org1");
        assert_eq!(secret.user_id, "1");
        assert_eq!(secret.breach_count, 0);
        assert!(!secret.encrypted_token.contains(TOKEN));
        assert!(!secret.blind_index.contains(TOKEN));
        assert_eq!(vault.count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_create_rejects_short_token() {
        let vault = vault();
        let err = vault
            .create(&admin("1", "org1"), "short", &token("fifteen-chars-x"))
            .await
            .unwrap_err();
        assert!(matches!(err, VaultError::Validation(_)));

        // Exactly the minimum is accepted.
        vault
            .create(&admin("1", "org1"), "exact", &token("sixteen-chars-xx"))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_create_rejects_bad_names() {
        let vault = vault().with_config(VaultConfig {
            min_token_length: 16,
            max_name_length: 8,
        });
        let identity = admin("1", "org1");
        for name in ["", "   ", "much-too-long-name"] {
            let err = vault.create(&identity, name, &token(TOKEN)).await.unwrap_err();
            assert!(matches!(err, VaultError::Validation(_)), "{name:?} accepted");
        }
    }

    #[tokio::test]
    async fn test_duplicate_name_is_scoped_to_owner() {
        let vault = vault();
        vault
            .create(&admin("1", "org1"), "api-key", &token(TOKEN))
            .await
            .unwrap();

        let err = vault
            .create(&admin("1", "org1"), "api-key", &token("another-token-value"))
            .await
            .unwrap_err();
        assert!(matches!(err, VaultError::Validation(_)));
        assert_eq!(err.code(), "BAD_USER_INPUT");

        vault
            .create(&admin("2", "org1"), "api-key", &token(TOKEN))
            .await
            .unwrap();
        vault
            .create(&admin("1", "org2"), "api-key", &token(TOKEN))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_create_for_requires_admin() {
        let vault = vault();
        let err = vault
            .create_for(Some(&manager("org1")), "api-key", &token(TOKEN))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            VaultError::Authorization(SecurityError::Forbidden { .. })
        ));

        let err = vault
            .create_for(None, "api-key", &token(TOKEN))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            VaultError::Authorization(SecurityError::Unauthenticated)
        ));

        vault
            .create_for(Some(&admin("1", "org1")), "api-key", &token(TOKEN))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_list_is_org_scoped() {
        let vault = vault();
        vault
            .create(&admin("1", "org1"), "a", &token(TOKEN))
            .await
            .unwrap();
        vault
            .create(&admin("2", "org2"), "b", &token("org2-token-value-000"))
            .await
            .unwrap();

        let listed = vault.list(Some(&manager("org1"))).await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].org_id, "org1");

        let listed = vault.list(Some(&admin("9", "org2"))).await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].org_id, "org2");

        assert!(vault.list(None).await.unwrap().is_empty());
        assert!(vault.list(Some(&viewer("org1"))).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_get_for_hides_other_orgs() {
        let vault = vault();
        let secret = vault
            .create(&admin("1", "org1"), "a", &token(TOKEN))
            .await
            .unwrap();

        assert!(vault
            .get_for(Some(&manager("org1")), &secret.id)
            .await
            .unwrap()
            .is_some());
        assert!(vault
            .get_for(Some(&manager("org2")), &secret.id)
            .await
            .unwrap()
            .is_none());
        assert!(vault.get_for(None, &secret.id).await.unwrap().is_none());
        assert!(vault.get_by_id(&secret.id).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_check_breaches_dedupes_candidates() {
        let vault = vault();
        let secret = vault
            .create(&admin("1", "org1"), "api-key", &token(TOKEN))
            .await
            .unwrap();

        let candidates = vec![
            TOKEN.to_string(),
            TOKEN.to_string(),
            "harmless-long-word-here".to_string(),
        ];
        let report = vault.check_breaches(&candidates).await.unwrap();
        assert_eq!(report.total_checked, 3);
        assert_eq!(report.breaches_found, 1);
        assert_eq!(report.secret_ids, vec![secret.id.clone()]);

        let stored = vault.get_by_id(&secret.id).await.unwrap().unwrap();
        assert_eq!(stored.breach_count, 1);

        vault.check_breaches(&candidates).await.unwrap();
        let stored = vault.get_by_id(&secret.id).await.unwrap().unwrap();
        assert_eq!(stored.breach_count, 2);
    }

    #[tokio::test]
    async fn test_check_breaches_clear_and_empty() {
        let vault = vault();
        vault
            .create(&admin("1", "org1"), "api-key", &token(TOKEN))
            .await
            .unwrap();

        let report = vault.check_breaches(&[]).await.unwrap();
        assert_eq!(report, BreachReport::default());

        let report = vault
            .check_breaches(&["sk-abcdef012345678".to_string()])
            .await
            .unwrap();
        assert!(!report.is_breach());
        assert_eq!(report.total_checked, 1);
    }

    #[tokio::test]
    async fn test_check_breaches_writes_audits() {
        let vault = vault();
        let owner = admin("1", "org1");
        let secret = vault.create(&owner, "api-key", &token(TOKEN)).await.unwrap();
        vault.check_breaches(&[TOKEN.to_string()]).await.unwrap();

        let audits = vault.list_audits(Some(&owner), None).await.unwrap();
        assert_eq!(audits.len(), 2);
        assert_eq!(audits[0].action, AuditAction::Breach);
        assert_eq!(audits[0].secret_id, secret.id);
        assert_eq!(audits[0].details.as_deref(), Some(BREACH_DETAILS));
        assert_eq!(audits[1].action, AuditAction::Create);

        assert!(vault.list_audits(Some(&viewer("org1")), None).await.unwrap().is_empty());
        assert!(vault.list_audits(Some(&manager("org2")), None).await.unwrap().is_empty());
        assert_eq!(
            vault.list_audits(Some(&manager("org1")), Some(1)).await.unwrap().len(),
            1
        );
    }

    #[tokio::test]
    async fn test_reveal_is_gated() {
        let vault = vault();
        let owner = admin("1", "org1");
        let secret = vault.create(&owner, "api-key", &token(TOKEN)).await.unwrap();

        let plain = vault.reveal(Some(&admin("2", "org1")), &secret).await.unwrap();
        assert_eq!(plain.expose(), TOKEN);

        for identity in [Some(manager("org1")), Some(admin("3", "org2")), Some(viewer("org1"))] {
            let err = vault.reveal(identity.as_ref(), &secret).await.unwrap_err();
            assert_eq!(err.code(), "FORBIDDEN");
        }
        let err = vault.reveal(None, &secret).await.unwrap_err();
        assert_eq!(err.code(), "UNAUTHENTICATED");

        let audits = vault.list_audits(Some(&owner), None).await.unwrap();
        assert_eq!(audits[0].action, AuditAction::View);
        assert_eq!(audits[0].user_id, "2");
    }

    #[tokio::test]
    async fn test_reveal_detects_tampering() {
        let vault = vault();
        let owner = admin("1", "org1");
        let mut secret = vault.create(&owner, "api-key", &token(TOKEN)).await.unwrap();
        let mut raw = hex::decode(&secret.encrypted_token).unwrap();
        let last = raw.len() - 1;
        raw[last] ^= 0xff;
        secret.encrypted_token = hex::encode(raw);

        let err = vault.reveal(Some(&owner), &secret).await.unwrap_err();
        assert!(err.is_integrity());
        assert_eq!(err.code(), "INTEGRITY");
    }

    #[tokio::test]
    async fn test_delete_for_requires_ownership() {
        let vault = vault();
        let owner = admin("1", "org1");
        let secret = vault.create(&owner, "api-key", &token(TOKEN)).await.unwrap();

        let err = vault
            .delete_for(Some(&admin("2", "org1")), &secret.id)
            .await
            .unwrap_err();
        assert_eq!(err.code(), "FORBIDDEN");

        let err = vault
            .delete_for(Some(&admin("1", "org2")), &secret.id)
            .await
            .unwrap_err();
        assert!(matches!(err, VaultError::NotFound(_)));

        vault.delete_for(Some(&owner), &secret.id).await.unwrap();
        assert_eq!(vault.count().await.unwrap(), 0);
        assert!(!vault.delete(&secret.id).await.unwrap());
    }
}
