//! Downstream text-generation clients for ChatVault.
//!
//! The chat pipeline only ever talks to a [`Provider`]. The one shipped
//! implementation is [`OllamaProvider`], which streams line-delimited JSON
//! from an Ollama-compatible `/api/chat` endpoint.
//!
//! # Example
//!
//! ```rust,ignore
//! use chatvault_providers::{ChatOptions, Message, OllamaProvider, Provider, StreamEvent};
//! use futures::StreamExt;
//!
//! let provider = OllamaProvider::new("llama3.2")?;
//! let mut stream = provider
//!     .chat_stream(&[Message::user("Hello!")], &ChatOptions::default())
//!     .await?;
//! while let Some(Ok(StreamEvent::Text(text))) = stream.next().await {
//!     print!("{text}");
//! }
//! ```

mod error;
pub mod ollama;
mod types;

pub use error::{ProviderError, Result};
pub use ollama::OllamaProvider;
pub use types::*;

use async_trait::async_trait;
use futures::Stream;
use std::pin::Pin;

/// Stream of completion events for streaming responses.
pub type CompletionStream = Pin<Box<dyn Stream<Item = Result<StreamEvent>> + Send>>;

/// A text generator that can stream completions.
#[async_trait]
pub trait Provider: Send + Sync {
    /// Get provider name.
    fn name(&self) -> &str;

    /// Model requests are sent to.
    fn model(&self) -> &str;

    /// Start a streaming chat completion.
    ///
    /// Dropping the returned stream releases the underlying connection.
    async fn chat_stream(
        &self,
        messages: &[Message],
        options: &ChatOptions,
    ) -> Result<CompletionStream>;
}
