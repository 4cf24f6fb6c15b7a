//! Shared fixtures for the cross-crate tests.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chatvault_core::Identity;
use chatvault_providers::{
    ChatOptions, CompletionStream, Message, Provider, ProviderError, Result, StreamEvent,
};
use chatvault_secrets::{KeyMaterial, VaultKeys};

pub const MASTER_KEY: &str = "integration-master-key";
pub const PEPPER: &str = "integration-pepper";

/// Engines built from the fixed test key material.
pub fn test_keys() -> VaultKeys {
    VaultKeys::from_material(&KeyMaterial::new(MASTER_KEY, PEPPER)).unwrap()
}

pub fn admin(id: &str, org: &str) -> Identity {
    Identity::new(id, format!("{id}@example.com"), ["admin".to_string(), format!("org:{org}")], org)
}

pub fn manager(id: &str, org: &str) -> Identity {
    Identity::new(id, format!("{id}@example.com"), ["manager".to_string(), format!("org:{org}")], org)
}

pub fn viewer(id: &str, org: &str) -> Identity {
    Identity::new(id, format!("{id}@example.com"), ["viewer".to_string(), format!("org:{org}")], org)
}

/// Generator that replays a fixed reply and records every request.
pub struct CountingProvider {
    reply: Vec<String>,
    fail: bool,
    calls: AtomicUsize,
    requests: Mutex<Vec<Vec<Message>>>,
}

impl CountingProvider {
    pub fn replying(reply: &[&str]) -> Arc<Self> {
        Arc::new(Self {
            reply: reply.iter().map(|s| s.to_string()).collect(),
            fail: false,
            calls: AtomicUsize::new(0),
            requests: Mutex::new(Vec::new()),
        })
    }

    pub fn failing() -> Arc<Self> {
        Arc::new(Self {
            reply: Vec::new(),
            fail: true,
            calls: AtomicUsize::new(0),
            requests: Mutex::new(Vec::new()),
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Messages of every request, in call order.
    pub fn requests(&self) -> Vec<Vec<Message>> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl Provider for CountingProvider {
    fn name(&self) -> &str {
        "counting"
    }

    fn model(&self) -> &str {
        "counting-1"
    }

    async fn chat_stream(
        &self,
        messages: &[Message],
        _options: &ChatOptions,
    ) -> Result<CompletionStream> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.requests.lock().unwrap().push(messages.to_vec());
        if self.fail {
            return Err(ProviderError::stream("connection reset"));
        }

        let mut events: Vec<Result<StreamEvent>> = self
            .reply
            .iter()
            .map(|t| Ok(StreamEvent::Text(t.clone())))
            .collect();
        events.push(Ok(StreamEvent::Done));
        Ok(Box::pin(futures::stream::iter(events)))
    }
}
