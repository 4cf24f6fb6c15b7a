//! Persistence collaborators.
//!
//! Defines the [`SecretRepository`] and [`AuditSink`] traits and two
//! implementations of both:
//!
//! - [`MemorySecretStore`]: lock-guarded in-process state, for tests and
//!   embedding.
//! - [`FileSecretStore`]: a single JSON document at `{data_dir}/vault.json`,
//!   re-read and rewritten atomically under an OS file lock on every
//!   mutation.
//!
//! Both serialize mutations, so `increment_breach_count` is atomic per secret
//! and the `(org_id, user_id, name)` uniqueness check cannot race an insert.
//! For the file store this holds across processes sharing a data directory.

use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chatvault_core::{AuditRecord, Secret, SecretFilter};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tokio::sync::{Mutex, RwLock};
use tracing::debug;

use crate::error::{Result, SecretError};

/// File name of the vault document inside the data directory.
const VAULT_FILE: &str = "vault.json";

/// Lock file guarding read-modify-write cycles on [`VAULT_FILE`].
const LOCK_FILE: &str = "vault.lock";

/// Storage of [`Secret`] records.
#[async_trait]
pub trait SecretRepository: Send + Sync {
    /// Look up a secret by id.
    async fn find_by_id(&self, id: &str) -> Result<Option<Secret>>;

    /// Look up a secret by its unique `(org_id, user_id, name)` key.
    async fn find_by_name(&self, org_id: &str, user_id: &str, name: &str)
        -> Result<Option<Secret>>;

    /// All secrets matching `filter`, oldest first.
    async fn find_many(&self, filter: &SecretFilter) -> Result<Vec<Secret>>;

    /// Persist a new secret. Fails with [`SecretError::Conflict`] when the
    /// id or the `(org_id, user_id, name)` key is already taken.
    async fn insert(&self, secret: Secret) -> Result<Secret>;

    /// Atomically add one to `breach_count`. Returns the new value, or `None`
    /// when the secret no longer exists.
    async fn increment_breach_count(&self, id: &str) -> Result<Option<u64>>;

    /// Remove a secret. Returns whether anything was removed.
    async fn delete(&self, id: &str) -> Result<bool>;

    /// Total number of stored secrets.
    async fn count(&self) -> Result<usize>;
}

/// Append-only audit storage.
#[async_trait]
pub trait AuditSink: Send + Sync {
    /// Append a record.
    async fn append(&self, record: AuditRecord) -> Result<()>;

    /// Records matching `filter`, newest first, at most `limit`.
    async fn list(&self, filter: &SecretFilter, limit: usize) -> Result<Vec<AuditRecord>>;
}

/// The whole persisted state.
#[derive(Debug, Default, Serialize, Deserialize)]
struct VaultDocument {
    #[serde(default)]
    secrets: Vec<Secret>,
    #[serde(default)]
    audits: Vec<AuditRecord>,
}

impl VaultDocument {
    fn find_by_id(&self, id: &str) -> Option<&Secret> {
        self.secrets.iter().find(|s| s.id == id)
    }

    fn find_by_name(&self, org_id: &str, user_id: &str, name: &str) -> Option<&Secret> {
        self.secrets
            .iter()
            .find(|s| s.org_id == org_id && s.user_id == user_id && s.name == name)
    }

    fn find_many(&self, filter: &SecretFilter) -> Vec<Secret> {
        self.secrets
            .iter()
            .filter(|s| filter.matches(*s))
            .cloned()
            .collect()
    }

    fn insert(&mut self, secret: Secret) -> Result<Secret> {
        if self.find_by_id(&secret.id).is_some() {
            return Err(SecretError::Conflict(format!(
                "secret id already exists: {}",
                secret.id
            )));
        }
        if self
            .find_by_name(&secret.org_id, &secret.user_id, &secret.name)
            .is_some()
        {
            return Err(SecretError::Conflict(format!(
                "secret name already exists for this owner: {}",
                secret.name
            )));
        }
        self.secrets.push(secret.clone());
        Ok(secret)
    }

    fn increment_breach_count(&mut self, id: &str) -> Option<u64> {
        let secret = self.secrets.iter_mut().find(|s| s.id == id)?;
        secret.breach_count = secret.breach_count.saturating_add(1);
        secret.updated_at = Utc::now();
        Some(secret.breach_count)
    }

    fn delete(&mut self, id: &str) -> bool {
        let before = self.secrets.len();
        self.secrets.retain(|s| s.id != id);
        self.secrets.len() != before
    }

    fn list_audits(&self, filter: &SecretFilter, limit: usize) -> Vec<AuditRecord> {
        // Appended in time order, so newest first is reverse insertion order.
        self.audits
            .iter()
            .rev()
            .filter(|a| filter.matches(*a))
            .take(limit)
            .cloned()
            .collect()
    }
}

/// In-memory store.
#[derive(Debug, Default)]
pub struct MemorySecretStore {
    doc: RwLock<VaultDocument>,
}

impl MemorySecretStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SecretRepository for MemorySecretStore {
    async fn find_by_id(&self, id: &str) -> Result<Option<Secret>> {
        Ok(self.doc.read().await.find_by_id(id).cloned())
    }

    async fn find_by_name(
        &self,
        org_id: &str,
        user_id: &str,
        name: &str,
    ) -> Result<Option<Secret>> {
        Ok(self.doc.read().await.find_by_name(org_id, user_id, name).cloned())
    }

    async fn find_many(&self, filter: &SecretFilter) -> Result<Vec<Secret>> {
        Ok(self.doc.read().await.find_many(filter))
    }

    async fn insert(&self, secret: Secret) -> Result<Secret> {
        self.doc.write().await.insert(secret)
    }

    async fn increment_breach_count(&self, id: &str) -> Result<Option<u64>> {
        Ok(self.doc.write().await.increment_breach_count(id))
    }

    async fn delete(&self, id: &str) -> Result<bool> {
        Ok(self.doc.write().await.delete(id))
    }

    async fn count(&self) -> Result<usize> {
        Ok(self.doc.read().await.secrets.len())
    }
}

#[async_trait]
impl AuditSink for MemorySecretStore {
    async fn append(&self, record: AuditRecord) -> Result<()> {
        self.doc.write().await.audits.push(record);
        Ok(())
    }

    async fn list(&self, filter: &SecretFilter, limit: usize) -> Result<Vec<AuditRecord>> {
        Ok(self.doc.read().await.list_audits(filter, limit))
    }
}

/// A file-system-backed store.
///
/// The vault lives in `{data_dir}/vault.json`; nothing is cached in memory.
/// Every mutation takes an exclusive OS lock on `{data_dir}/vault.lock`,
/// re-reads the document, applies the change and writes it back with a
/// tmp-then-rename, so several processes sharing a data directory never lose
/// each other's updates. Reads load the current document without the lock.
/// The directory is created with mode `0700` and the files with mode `0600`
/// on Unix.
pub struct FileSecretStore {
    path: PathBuf,
    lock_path: PathBuf,
    writer: Mutex<()>,
}

impl FileSecretStore {
    /// Open the store in `data_dir`, validating the existing document if any.
    pub async fn open(data_dir: impl Into<PathBuf>) -> Result<Self> {
        let data_dir = data_dir.into();
        ensure_dir(&data_dir).await?;

        let store = Self {
            path: data_dir.join(VAULT_FILE),
            lock_path: data_dir.join(LOCK_FILE),
            writer: Mutex::new(()),
        };
        let doc = store.load().await?;
        debug!(
            path = %store.path.display(),
            secrets = doc.secrets.len(),
            audits = doc.audits.len(),
            "opened vault document"
        );

        Ok(store)
    }

    /// Path of the vault document.
    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn load(&self) -> Result<VaultDocument> {
        match tokio::fs::read_to_string(&self.path).await {
            Ok(data) => Ok(serde_json::from_str(&data)?),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(VaultDocument::default()),
            Err(e) => Err(e.into()),
        }
    }

    /// Read-modify-write under the vault lock.
    ///
    /// `apply` returns its result and whether the document changed. The
    /// document is written back only when it did; a failed write leaves the
    /// file as it was.
    async fn update<T, F>(&self, apply: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce(&mut VaultDocument) -> Result<(T, bool)> + Send + 'static,
    {
        // Keeps this handle's writers off the blocking pool while one waits
        // on the file lock.
        let _serial = self.writer.lock().await;
        let path = self.path.clone();
        let lock_path = self.lock_path.clone();

        tokio::task::spawn_blocking(move || {
            let lock_file = open_lock_file(&lock_path)?;
            let mut lock = fd_lock::RwLock::new(lock_file);
            let _guard = lock.write()?;

            let mut doc = read_document(&path)?;
            let (value, changed) = apply(&mut doc)?;
            if changed {
                write_document(&path, &doc)?;
            }
            Ok(value)
        })
        .await
        .map_err(|e| SecretError::Storage(format!("vault writer task failed: {e}")))?
    }
}

/// Ensure `dir` exists with restrictive permissions.
async fn ensure_dir(dir: &Path) -> Result<()> {
    tokio::fs::create_dir_all(dir).await?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let perms = std::fs::Permissions::from_mode(0o700);
        tokio::fs::set_permissions(dir, perms).await?;
    }

    Ok(())
}

fn open_lock_file(path: &Path) -> Result<File> {
    let mut options = OpenOptions::new();
    options.create(true).truncate(false).write(true);

    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(0o600);
    }

    Ok(options.open(path)?)
}

fn read_document(path: &Path) -> Result<VaultDocument> {
    match std::fs::read_to_string(path) {
        Ok(data) => Ok(serde_json::from_str(&data)?),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(VaultDocument::default()),
        Err(e) => Err(e.into()),
    }
}

fn write_document(path: &Path, doc: &VaultDocument) -> Result<()> {
    let json = serde_json::to_vec_pretty(doc)?;
    let temp_path = path.with_extension("json.tmp");
    write_private_file(&temp_path, &json)?;
    std::fs::rename(&temp_path, path)?;
    debug!(path = %path.display(), "persisted vault document");
    Ok(())
}

/// Write `data` to `path` with mode 0600 on Unix.
fn write_private_file(path: &Path, data: &[u8]) -> Result<()> {
    std::fs::write(path, data)?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let perms = std::fs::Permissions::from_mode(0o600);
        std::fs::set_permissions(path, perms)?;
    }

    Ok(())
}

#[async_trait]
impl SecretRepository for FileSecretStore {
    async fn find_by_id(&self, id: &str) -> Result<Option<Secret>> {
        Ok(self.load().await?.find_by_id(id).cloned())
    }

    async fn find_by_name(
        &self,
        org_id: &str,
        user_id: &str,
        name: &str,
    ) -> Result<Option<Secret>> {
        Ok(self.load().await?.find_by_name(org_id, user_id, name).cloned())
    }

    async fn find_many(&self, filter: &SecretFilter) -> Result<Vec<Secret>> {
        Ok(self.load().await?.find_many(filter))
    }

    async fn insert(&self, secret: Secret) -> Result<Secret> {
        self.update(move |doc| Ok((doc.insert(secret)?, true))).await
    }

    async fn increment_breach_count(&self, id: &str) -> Result<Option<u64>> {
        let id = id.to_string();
        self.update(move |doc| {
            let count = doc.increment_breach_count(&id);
            Ok((count, count.is_some()))
        })
        .await
    }

    async fn delete(&self, id: &str) -> Result<bool> {
        let id = id.to_string();
        self.update(move |doc| {
            let removed = doc.delete(&id);
            Ok((removed, removed))
        })
        .await
    }

    async fn count(&self) -> Result<usize> {
        Ok(self.load().await?.secrets.len())
    }
}

#[async_trait]
impl AuditSink for FileSecretStore {
    async fn append(&self, record: AuditRecord) -> Result<()> {
        self.update(move |doc| {
            doc.audits.push(record);
            Ok(((), true))
        })
        .await
    }

    async fn list(&self, filter: &SecretFilter, limit: usize) -> Result<Vec<AuditRecord>> {
        Ok(self.load().await?.list_audits(filter, limit))
    }
}
