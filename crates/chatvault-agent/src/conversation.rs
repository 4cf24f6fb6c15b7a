//! Per-conversation message history.
//!
//! Owned by whoever drives the conversation; the chat pipeline itself is
//! stateless and never reads or writes it.

use serde::{Deserialize, Serialize};

/// Author of a history entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    User,
    Assistant,
}

/// One entry in the history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    /// Sequential id, starting at `"1"`.
    pub id: String,
    pub content: String,
    pub role: ChatRole,
}

/// Message history of a single conversation.
#[derive(Debug, Clone, Default)]
pub struct Conversation {
    messages: Vec<ChatMessage>,
}

impl Conversation {
    /// Create an empty conversation.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a user message.
    pub fn send_message(&mut self, content: impl Into<String>) -> ChatMessage {
        self.push(content.into(), ChatRole::User)
    }

    /// Record an assistant reply.
    pub fn record_reply(&mut self, content: impl Into<String>) -> ChatMessage {
        self.push(content.into(), ChatRole::Assistant)
    }

    /// All messages, oldest first.
    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    fn push(&mut self, content: String, role: ChatRole) -> ChatMessage {
        let message = ChatMessage {
            id: (self.messages.len() + 1).to_string(),
            content,
            role,
        };
        self.messages.push(message.clone());
        message
    }
}
