//! File-backed vault across restarts, and integrity failures on stored data.

use std::sync::Arc;

use chatvault_core::SecretString;
use chatvault_integration_tests::{admin, test_keys, MASTER_KEY};
use chatvault_secrets::{
    FileSecretStore, KeyMaterial, MemorySecretStore, SecretRepository, SecretVault, VaultKeys,
};
use tempfile::TempDir;

const TOKEN: &str = "sk-persist0123456789";

async fn file_vault(dir: &TempDir, keys: VaultKeys) -> SecretVault {
    let store = Arc::new(FileSecretStore::open(dir.path()).await.unwrap());
    SecretVault::new(store.clone(), store, keys)
}

#[tokio::test]
async fn test_breach_matching_survives_restart() {
    let dir = TempDir::new().unwrap();
    let id = {
        let vault = file_vault(&dir, test_keys()).await;
        vault
            .create(&admin("u1", "org1"), "api-key", &SecretString::new(TOKEN))
            .await
            .unwrap()
            .id
    };

    // Fresh engines from the same key material, fresh store handle.
    let vault = file_vault(&dir, test_keys()).await;
    let report = vault
        .check_breaches(&[TOKEN.to_string(), format!("{TOKEN} ")])
        .await
        .unwrap();
    assert_eq!(report.breaches_found, 1);
    assert_eq!(report.secret_ids, vec![id.clone()]);

    let vault = file_vault(&dir, test_keys()).await;
    let secret = vault.get_by_id(&id).await.unwrap().unwrap();
    assert_eq!(secret.breach_count, 1);

    let token = vault.reveal(Some(&admin("u2", "org1")), &secret).await.unwrap();
    assert_eq!(token.expose(), TOKEN);
}

#[tokio::test]
async fn test_stored_file_never_contains_plaintext() {
    let dir = TempDir::new().unwrap();
    let vault = file_vault(&dir, test_keys()).await;
    vault
        .create(&admin("u1", "org1"), "api-key", &SecretString::new(TOKEN))
        .await
        .unwrap();

    let raw = std::fs::read_to_string(dir.path().join("vault.json")).unwrap();
    assert!(!raw.contains(TOKEN));
    assert!(!raw.contains(MASTER_KEY));
    assert!(raw.contains("api-key"));
}

#[tokio::test]
async fn test_changed_pepper_stops_matching() {
    let dir = TempDir::new().unwrap();
    file_vault(&dir, test_keys())
        .await
        .create(&admin("u1", "org1"), "api-key", &SecretString::new(TOKEN))
        .await
        .unwrap();

    let rotated = VaultKeys::from_material(&KeyMaterial::new(MASTER_KEY, "another-pepper")).unwrap();
    let vault = file_vault(&dir, rotated).await;
    let report = vault.check_breaches(&[TOKEN.to_string()]).await.unwrap();
    assert_eq!(report.breaches_found, 0);
}

#[tokio::test]
async fn test_wrong_master_key_is_integrity_error() {
    let dir = TempDir::new().unwrap();
    let id = file_vault(&dir, test_keys())
        .await
        .create(&admin("u1", "org1"), "api-key", &SecretString::new(TOKEN))
        .await
        .unwrap()
        .id;

    let wrong = VaultKeys::from_material(&KeyMaterial::new("not-the-master-key", "integration-pepper"))
        .unwrap();
    let vault = file_vault(&dir, wrong).await;
    let secret = vault.get_by_id(&id).await.unwrap().unwrap();

    let err = vault.reveal(Some(&admin("u1", "org1")), &secret).await.unwrap_err();
    assert!(err.is_integrity());
    assert_eq!(err.code(), "INTEGRITY");
}

#[tokio::test]
async fn test_tampered_record_is_integrity_error() {
    let store = Arc::new(MemorySecretStore::new());
    let vault = SecretVault::new(store.clone(), store.clone(), test_keys());
    let mut secret = vault
        .create(&admin("u1", "org1"), "api-key", &SecretString::new(TOKEN))
        .await
        .unwrap();

    // Flip one bit of the last ciphertext byte.
    let mut bytes: Vec<char> = secret.encrypted_token.chars().collect();
    let last = bytes.len() - 1;
    bytes[last] = if bytes[last] == '0' { '1' } else { '0' };
    secret.encrypted_token = bytes.into_iter().collect();
    secret.id = "tampered".to_string();
    secret.name = "tampered".to_string();
    store.insert(secret).await.unwrap();

    let tampered = vault.get_by_id("tampered").await.unwrap().unwrap();
    let err = vault.reveal(Some(&admin("u1", "org1")), &tampered).await.unwrap_err();
    assert!(err.is_integrity());
}
