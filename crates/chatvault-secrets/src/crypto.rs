//! AES-256-GCM envelope encryption.
//!
//! Every token is sealed under its own random 256-bit data key (DEK); the DEK
//! is then sealed under the master key. The master key is SHA-256 of the
//! operator-supplied secret, so any length of input yields exactly 32 bytes.
//!
//! Each sealed value is `hex(nonce || tag || ciphertext)` with a 16-byte
//! nonce and a 16-byte tag. The DEK is sealed in its hex form, matching the
//! records written by earlier deployments of this vault.

use aes_gcm::aead::consts::U16;
use aes_gcm::aead::{AeadInPlace, KeyInit};
use aes_gcm::aes::Aes256;
use aes_gcm::{AesGcm, Nonce, Tag};
use chatvault_core::SecretString;
use rand::RngCore;
use sha2::{Digest, Sha256};
use zeroize::{Zeroize, ZeroizeOnDrop, Zeroizing};

use crate::error::{Result, SecretError};
use crate::types::DecryptedSecret;

const NONCE_SIZE: usize = 16;
const TAG_SIZE: usize = 16;
const KEY_SIZE: usize = 32;

/// AES-256-GCM with a 128-bit nonce.
type Aes256Gcm16 = AesGcm<Aes256, U16>;

/// The process-wide key-encryption key.
#[derive(Zeroize, ZeroizeOnDrop)]
pub struct MasterKey([u8; KEY_SIZE]);

impl MasterKey {
    /// Derive the master key from the supplied secret.
    pub fn derive(secret: &SecretString) -> Result<Self> {
        if secret.is_empty() {
            return Err(SecretError::Configuration(
                "master key material is empty".to_string(),
            ));
        }
        let digest = Sha256::digest(secret.expose_secret().as_bytes());
        let mut key = [0u8; KEY_SIZE];
        key.copy_from_slice(&digest);
        Ok(Self(key))
    }
}

impl std::fmt::Debug for MasterKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("MasterKey([REDACTED])")
    }
}

/// Ciphertext pair produced by [`EnvelopeCipher::encrypt`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Envelope {
    /// The token sealed under the DEK.
    pub encrypted_token: String,
    /// The DEK sealed under the master key.
    pub encrypted_dek: String,
}

/// Two-tier envelope encryption engine.
#[derive(Debug)]
pub struct EnvelopeCipher {
    master_key: MasterKey,
}

impl EnvelopeCipher {
    /// Create an engine around an already-derived master key.
    pub fn new(master_key: MasterKey) -> Self {
        Self { master_key }
    }

    /// Derive the master key from `secret` and create an engine.
    pub fn from_secret(secret: &SecretString) -> Result<Self> {
        Ok(Self::new(MasterKey::derive(secret)?))
    }

    /// Seal `plaintext` under a fresh DEK and seal the DEK under the master key.
    pub fn encrypt(&self, plaintext: &str) -> Result<Envelope> {
        let dek = generate_dek();
        let encrypted_token = seal(&dek, plaintext.as_bytes())?;
        let dek_hex = Zeroizing::new(hex::encode(&*dek));
        let encrypted_dek = seal(&self.master_key.0, dek_hex.as_bytes())?;
        Ok(Envelope {
            encrypted_token,
            encrypted_dek,
        })
    }

    /// Recover the DEK with the master key, then the token with the DEK.
    ///
    /// Any tag mismatch, wrong key, or malformed input fails with
    /// [`SecretError::Integrity`]; no partial plaintext is ever returned.
    pub fn decrypt(&self, encrypted_token: &str, encrypted_dek: &str) -> Result<DecryptedSecret> {
        let dek_hex = open(&self.master_key.0, encrypted_dek)?;
        let dek_bytes = Zeroizing::new(
            hex::decode(&*dek_hex)
                .map_err(|e| SecretError::Integrity(format!("data key is not hex: {e}")))?,
        );
        if dek_bytes.len() != KEY_SIZE {
            return Err(SecretError::Integrity(format!(
                "data key has wrong length: {} (expected {KEY_SIZE})",
                dek_bytes.len()
            )));
        }
        let mut dek = Zeroizing::new([0u8; KEY_SIZE]);
        dek.copy_from_slice(&dek_bytes);

        let plaintext = open(&dek, encrypted_token)?;
        let value = String::from_utf8(plaintext.to_vec())
            .map_err(|e| SecretError::Integrity(format!("token is not UTF-8: {e}")))?;
        Ok(DecryptedSecret::new(value))
    }
}

/// Generate a new random 256-bit data key.
fn generate_dek() -> Zeroizing<[u8; KEY_SIZE]> {
    let mut key = Zeroizing::new([0u8; KEY_SIZE]);
    rand::thread_rng().fill_bytes(&mut *key);
    key
}

/// Encrypt under `key`, returning `hex(nonce || tag || ciphertext)`.
fn seal(key: &[u8; KEY_SIZE], plaintext: &[u8]) -> Result<String> {
    let cipher = Aes256Gcm16::new_from_slice(key)
        .map_err(|e| SecretError::Encryption(e.to_string()))?;

    let mut nonce_bytes = [0u8; NONCE_SIZE];
    rand::thread_rng().fill_bytes(&mut nonce_bytes);

    let mut buffer = plaintext.to_vec();
    let tag = cipher
        .encrypt_in_place_detached(Nonce::<U16>::from_slice(&nonce_bytes), b"", &mut buffer)
        .map_err(|e| SecretError::Encryption(e.to_string()))?;

    let mut out = Vec::with_capacity(NONCE_SIZE + TAG_SIZE + buffer.len());
    out.extend_from_slice(&nonce_bytes);
    out.extend_from_slice(&tag);
    out.extend_from_slice(&buffer);
    buffer.zeroize();
    Ok(hex::encode(out))
}

/// Decrypt `hex(nonce || tag || ciphertext)` under `key`.
fn open(key: &[u8; KEY_SIZE], encoded: &str) -> Result<Zeroizing<Vec<u8>>> {
    let raw = hex::decode(encoded)
        .map_err(|e| SecretError::Integrity(format!("ciphertext is not hex: {e}")))?;
    if raw.len() < NONCE_SIZE + TAG_SIZE {
        return Err(SecretError::Integrity("ciphertext too short".to_string()));
    }

    let (nonce_bytes, rest) = raw.split_at(NONCE_SIZE);
    let (tag_bytes, ciphertext) = rest.split_at(TAG_SIZE);

    let cipher = Aes256Gcm16::new_from_slice(key)
        .map_err(|e| SecretError::Integrity(e.to_string()))?;

    let mut buffer = Zeroizing::new(ciphertext.to_vec());
    cipher
        .decrypt_in_place_detached(
            Nonce::<U16>::from_slice(nonce_bytes),
            b"",
            &mut *buffer,
            Tag::from_slice(tag_bytes),
        )
        .map_err(|_| {
            SecretError::Integrity("authentication tag mismatch".to_string())
        })?;
    Ok(buffer)
}
