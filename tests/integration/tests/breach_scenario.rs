//! End-to-end breach interception: vault, pipeline and generator together.

use std::sync::Arc;

use chatvault_agent::{ChatPipeline, StreamChunk};
use chatvault_core::SecretString;
use chatvault_integration_tests::{admin, manager, test_keys, CountingProvider};
use chatvault_providers::{MessageRole, OllamaProvider};
use chatvault_secrets::SecretVault;
use futures::StreamExt;

const TOKEN: &str = "sk-abcdef0123456789";

async fn vault_with_api_key() -> (SecretVault, String) {
    let vault = SecretVault::in_memory(test_keys());
    let secret = vault
        .create(&admin("u1", "org1"), "api-key", &SecretString::new(TOKEN))
        .await
        .unwrap();
    (vault, secret.id)
}

#[tokio::test]
async fn test_leaked_token_is_halted() {
    let (vault, id) = vault_with_api_key().await;

    let listed = vault.list(Some(&manager("m1", "org1"))).await.unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].breach_count, 0);

    let provider = CountingProvider::replying(&["never sent"]);
    let pipeline = ChatPipeline::new(vault.clone(), provider.clone());
    let chunks: Vec<StreamChunk> = pipeline
        .stream("my key is sk-abcdef0123456789 thanks")
        .collect()
        .await;

    assert_eq!(chunks.len(), 1);
    assert!(chunks[0].done);
    assert_eq!(chunks[0].breach, Some(true));
    assert_eq!(provider.calls(), 0);

    let secret = vault.get_by_id(&id).await.unwrap().unwrap();
    assert_eq!(secret.breach_count, 1);
}

#[tokio::test]
async fn test_clear_message_streams_from_generator() {
    let (vault, id) = vault_with_api_key().await;
    let provider = CountingProvider::replying(&["I'm ", "fine, ", "thanks!"]);
    let pipeline = ChatPipeline::new(vault.clone(), provider.clone());

    let chunks: Vec<StreamChunk> = pipeline.stream("hello, how are you").collect().await;

    let text: String = chunks.iter().map(|c| c.content.as_str()).collect();
    assert_eq!(text, "I'm fine, thanks!");
    assert_eq!(chunks.last(), Some(&StreamChunk::done()));
    assert!(chunks[..chunks.len() - 1].iter().all(|c| !c.done));
    assert!(chunks.iter().all(|c| c.breach.is_none()));
    assert_eq!(provider.calls(), 1);

    // System prompt first, then the message verbatim.
    let request = &provider.requests()[0];
    assert_eq!(request.len(), 2);
    assert_eq!(request[0].role, MessageRole::System);
    assert_eq!(request[1].role, MessageRole::User);
    assert_eq!(request[1].content, "hello, how are you");

    let secret = vault.get_by_id(&id).await.unwrap().unwrap();
    assert_eq!(secret.breach_count, 0);
}

#[tokio::test]
async fn test_duplicate_token_counts_once_per_scan() {
    let (vault, id) = vault_with_api_key().await;
    let pipeline = ChatPipeline::new(vault.clone(), CountingProvider::replying(&[]));

    let message = format!("{TOKEN} and again {TOKEN}");
    let report = pipeline.scan(&message).await.unwrap();
    assert_eq!(report.total_checked, 2);
    assert_eq!(report.breaches_found, 1);
    assert_eq!(vault.get_by_id(&id).await.unwrap().unwrap().breach_count, 1);

    // A second turn is a new scan and counts again.
    let chunks: Vec<StreamChunk> = pipeline.stream(message).collect().await;
    assert!(chunks[0].is_breach());
    assert_eq!(vault.get_by_id(&id).await.unwrap().unwrap().breach_count, 2);
}

#[tokio::test]
async fn test_concurrent_turns_count_every_leak() {
    let (vault, id) = vault_with_api_key().await;
    let provider = CountingProvider::replying(&["ok"]);
    let pipeline = ChatPipeline::new(vault.clone(), provider.clone());

    let turns = (0..20).map(|i| {
        let pipeline = pipeline.clone();
        async move {
            let message = if i % 2 == 0 {
                format!("leak {TOKEN}")
            } else {
                "nothing to see".to_string()
            };
            pipeline.stream(message).collect::<Vec<_>>().await
        }
    });
    let results = futures::future::join_all(turns).await;

    let halted = results.iter().filter(|chunks| chunks[0].is_breach()).count();
    assert_eq!(halted, 10);
    assert_eq!(provider.calls(), 10);
    assert_eq!(vault.get_by_id(&id).await.unwrap().unwrap().breach_count, 10);
}

#[tokio::test]
async fn test_generator_failure_terminates_cleanly() {
    let (vault, _) = vault_with_api_key().await;
    let provider = CountingProvider::failing();
    let pipeline = ChatPipeline::new(vault, provider.clone());

    let chunks: Vec<StreamChunk> = pipeline.stream("hello there").collect().await;
    assert_eq!(chunks, vec![StreamChunk::done()]);
    assert_eq!(provider.calls(), 1);
}

#[tokio::test]
async fn test_unreachable_generator_terminates_cleanly() {
    let (vault, _) = vault_with_api_key().await;
    let provider = OllamaProvider::new("llama3.2")
        .unwrap()
        .with_base_url("http://127.0.0.1:9");
    let pipeline = ChatPipeline::new(vault, Arc::new(provider));

    let chunks: Vec<StreamChunk> = pipeline.stream("hello there").collect().await;
    assert_eq!(chunks, vec![StreamChunk::done()]);
}

#[tokio::test]
async fn test_breach_audit_is_visible_to_owner_org() {
    let (vault, id) = vault_with_api_key().await;
    let pipeline = ChatPipeline::new(vault.clone(), CountingProvider::replying(&[]));
    let _: Vec<StreamChunk> = pipeline.stream(TOKEN).collect().await;

    let audits = vault
        .list_audits(Some(&manager("m1", "org1")), None)
        .await
        .unwrap();
    let breach = audits
        .iter()
        .find(|a| a.action.to_string() == "BREACH")
        .unwrap();
    assert_eq!(breach.secret_id, id);
    assert!(breach.details.is_some());

    let other_org = vault
        .list_audits(Some(&manager("m2", "org2")), None)
        .await
        .unwrap();
    assert!(other_org.is_empty());
}
