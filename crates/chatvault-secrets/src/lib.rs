//! Secret vault for ChatVault.
//!
//! Tokens are stored under two-tier AES-256-GCM envelope encryption and
//! carry an HMAC blind index, so outbound chat text can be screened for
//! stored secrets without decrypting anything.

pub mod blind_index;
pub mod crypto;
pub mod error;
pub mod keys;
pub mod store;
pub mod types;
pub mod vault;

pub use blind_index::BlindIndexer;
pub use crypto::{Envelope, EnvelopeCipher, MasterKey};
pub use error::{Result, SecretError, VaultError, VaultResult};
pub use keys::{KeyMaterial, VaultKeys};
pub use store::{AuditSink, FileSecretStore, MemorySecretStore, SecretRepository};
pub use types::{BreachReport, DecryptedSecret, SecretView};
pub use vault::{SecretVault, DEFAULT_AUDIT_LIMIT};
