//! Config save/load roundtrip integration tests.
//!
//! These tests verify that configuration can be serialized, written to disk,
//! and loaded back with identical field values, and that the loaded values
//! reach the pipeline and vault.

use chatvault_agent::ChatPipeline;
use chatvault_core::config::{Config, LogLevel};
use chatvault_core::{SecretString, SecretFilter};
use chatvault_integration_tests::{admin, test_keys, CountingProvider};
use chatvault_secrets::SecretVault;
use std::path::Path;
use tempfile::TempDir;

#[test]
fn test_config_save_and_load() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("chatvault.json5");

    let config = Config::default();
    config.save(&path).unwrap();

    let loaded = Config::load(&path).unwrap();
    assert_eq!(loaded.vault.min_token_length, config.vault.min_token_length);
    assert_eq!(loaded.chat.candidate_min_length, config.chat.candidate_min_length);
    assert_eq!(loaded.generator.base_url, config.generator.base_url);
    assert_eq!(loaded.generator.system_prompt, config.generator.system_prompt);
    assert_eq!(loaded.logging.level, LogLevel::Info);
}

#[test]
fn test_config_modify_and_reload() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("chatvault.json5");

    let mut config = Config::default();
    config.chat.candidate_min_length = 24;
    config.generator.model = "mistral".to_string();
    config.save(&path).unwrap();

    let loaded = Config::load(&path).unwrap();
    assert_eq!(loaded.chat.candidate_min_length, 24);
    assert_eq!(loaded.generator.model, "mistral");
}

#[test]
fn test_config_parses_json5() {
    let config = Config::parse(
        r#"{
            // comments and unquoted keys are fine
            vault: { min_token_length: 20 },
            logging: { level: "debug", json: true },
        }"#,
    )
    .unwrap();
    assert_eq!(config.vault.min_token_length, 20);
    assert_eq!(config.vault.max_name_length, 128);
    assert_eq!(config.logging.level, LogLevel::Debug);
    assert!(config.logging.json);
}

#[test]
fn test_config_load_nonexistent() {
    let result = Config::load(Path::new("/nonexistent/chatvault.json5"));
    assert!(result.is_err());
}

#[test]
fn test_config_parse_invalid() {
    let result = Config::parse("not valid json");
    assert!(result.is_err());
}

#[tokio::test]
async fn test_loaded_limits_reach_vault_and_pipeline() {
    let config = Config::parse(
        "{ vault: { min_token_length: 24 }, chat: { candidate_min_length: 24 } }",
    )
    .unwrap();

    let vault = SecretVault::in_memory(test_keys()).with_config(config.vault.clone());
    let owner = admin("u1", "org1");

    let short = SecretString::new("twenty-chars-token-x");
    let err = vault.create(&owner, "short", &short).await.unwrap_err();
    assert_eq!(err.code(), "BAD_USER_INPUT");

    let token = "a-token-of-twenty-five-ch";
    vault
        .create(&owner, "long", &SecretString::new(token))
        .await
        .unwrap();

    let pipeline = ChatPipeline::new(vault.clone(), CountingProvider::replying(&[]))
        .with_chat_config(&config.chat)
        .with_generator_config(&config.generator);
    let report = pipeline.scan(&format!("leaking {token}")).await.unwrap();
    assert_eq!(report.breaches_found, 1);

    let all = vault.list(Some(&owner)).await.unwrap();
    assert!(all.iter().all(|s| SecretFilter::OrgEq("org1".into()).matches(s)));
}
