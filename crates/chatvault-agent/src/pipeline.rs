//! Breach-intercepting chat pipeline.
//!
//! One turn runs through a small state machine:
//!
//! ```text
//! Scanning ──clear──▶ ClearStreaming ──▶ Done
//!     │
//!     └──match──▶ BreachHalted
//! ```
//!
//! The scan always finishes before the generator is contacted, so a message
//! containing a stored secret never leaves the process. Generator failures
//! end the turn with an empty terminal chunk instead of an error.

use std::fmt;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use chatvault_core::config::{ChatConfig, GeneratorConfig};
use chatvault_core::id;
use chatvault_providers::{ChatOptions, Message, Provider, StreamEvent};
use chatvault_secrets::{BreachReport, SecretVault};
use futures::{Stream, StreamExt};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::candidates::extract_candidates;
use crate::Result;

/// Text sent when the breach check itself could not run.
const SCAN_FAILED_NOTICE: &str =
    "⚠️ Unable to screen your message for secrets right now. Please try again later.";

/// One unit of output of a chat turn.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreamChunk {
    pub content: String,
    pub done: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub breach: Option<bool>,
}

impl StreamChunk {
    /// A piece of generated text.
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            done: false,
            breach: None,
        }
    }

    /// The terminal chunk of a clear turn.
    pub fn done() -> Self {
        Self {
            content: String::new(),
            done: true,
            breach: None,
        }
    }

    /// The single chunk of a halted turn.
    pub fn breach(found: usize) -> Self {
        Self {
            content: format!(
                "⚠️ Breach detected: {found} secret(s) found in your message. \
                 Please remove sensitive tokens to continue."
            ),
            done: true,
            breach: Some(true),
        }
    }

    fn scan_failed() -> Self {
        Self {
            content: SCAN_FAILED_NOTICE.to_string(),
            done: true,
            breach: Some(true),
        }
    }

    /// Whether this chunk reports a breach.
    pub fn is_breach(&self) -> bool {
        self.breach == Some(true)
    }
}

/// State of one chat turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineState {
    Scanning,
    ClearStreaming,
    BreachHalted,
    Done,
}

impl PipelineState {
    /// Whether `next` is a legal successor.
    pub fn can_transition_to(self, next: PipelineState) -> bool {
        matches!(
            (self, next),
            (Self::Scanning, Self::ClearStreaming)
                | (Self::Scanning, Self::BreachHalted)
                | (Self::ClearStreaming, Self::Done)
        )
    }

    /// No chunk follows a terminal state.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::BreachHalted | Self::Done)
    }
}

impl fmt::Display for PipelineState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Scanning => "scanning",
            Self::ClearStreaming => "clear_streaming",
            Self::BreachHalted => "breach_halted",
            Self::Done => "done",
        })
    }
}

/// Book-keeping for one turn.
struct Turn {
    id: String,
    state: PipelineState,
}

impl Turn {
    fn new() -> Self {
        let turn = Self {
            id: id::short_id(),
            state: PipelineState::Scanning,
        };
        debug!(turn = %turn.id, state = %turn.state, "turn started");
        turn
    }

    fn transition(&mut self, next: PipelineState) {
        debug_assert!(self.state.can_transition_to(next), "{} -> {next}", self.state);
        debug!(turn = %self.id, from = %self.state, to = %next, "turn state changed");
        self.state = next;
    }
}

/// Screens each message against the vault, then relays the generator's
/// reply as a stream of [`StreamChunk`]s.
#[derive(Clone)]
pub struct ChatPipeline {
    vault: SecretVault,
    provider: Arc<dyn Provider>,
    options: ChatOptions,
    system_prompt: String,
    candidate_min_length: usize,
    channel_capacity: usize,
}

impl ChatPipeline {
    /// Create a pipeline with default chat and generator settings.
    pub fn new(vault: SecretVault, provider: Arc<dyn Provider>) -> Self {
        let chat = ChatConfig::default();
        let generator = GeneratorConfig::default();
        Self {
            vault,
            provider,
            options: ChatOptions::from(&generator),
            system_prompt: generator.system_prompt,
            candidate_min_length: chat.candidate_min_length,
            channel_capacity: chat.channel_capacity,
        }
    }

    /// Apply the `chat` config section.
    pub fn with_chat_config(mut self, config: &ChatConfig) -> Self {
        self.candidate_min_length = config.candidate_min_length;
        self.channel_capacity = config.channel_capacity.max(1);
        self
    }

    /// Apply sampling options and system prompt from the `generator` section.
    pub fn with_generator_config(mut self, config: &GeneratorConfig) -> Self {
        self.options = ChatOptions::from(config);
        self.system_prompt = config.system_prompt.clone();
        self
    }

    /// Run the breach check for `message` without generating anything.
    pub async fn scan(&self, message: &str) -> Result<BreachReport> {
        let candidates = extract_candidates(message, self.candidate_min_length);
        Ok(self.vault.check_breaches(&candidates).await?)
    }

    /// Start a turn. The work happens on a spawned task; chunks arrive on
    /// the returned stream, which ends after the terminal chunk.
    ///
    /// Dropping the stream or calling [`ChunkStream::cancel`] stops the task
    /// and releases the generator connection.
    pub fn stream(&self, message: impl Into<String>) -> ChunkStream {
        let (tx, rx) = mpsc::channel(self.channel_capacity);
        let cancel = CancellationToken::new();

        let pipeline = self.clone();
        let message = message.into();
        let token = cancel.clone();
        tokio::spawn(async move {
            tokio::select! {
                biased;
                _ = token.cancelled() => debug!("turn cancelled"),
                _ = pipeline.run(&message, &tx) => {}
            }
        });

        ChunkStream { rx, cancel }
    }

    async fn run(&self, message: &str, tx: &mpsc::Sender<StreamChunk>) {
        let mut turn = Turn::new();

        let report = match self.scan(message).await {
            Ok(report) => report,
            Err(e) => {
                warn!(turn = %turn.id, error = %e, "breach check failed, refusing message");
                turn.transition(PipelineState::BreachHalted);
                let _ = tx.send(StreamChunk::scan_failed()).await;
                return;
            }
        };

        if report.is_breach() {
            turn.transition(PipelineState::BreachHalted);
            info!(turn = %turn.id, breaches = report.breaches_found, "message halted");
            let _ = tx.send(StreamChunk::breach(report.breaches_found)).await;
            return;
        }

        turn.transition(PipelineState::ClearStreaming);
        if !self.relay(message, tx, &turn).await {
            debug!(turn = %turn.id, "receiver dropped, stopping");
            return;
        }

        turn.transition(PipelineState::Done);
        let _ = tx.send(StreamChunk::done()).await;
    }

    /// Forward generated text. Returns `false` when the receiver is gone.
    async fn relay(&self, message: &str, tx: &mpsc::Sender<StreamChunk>, turn: &Turn) -> bool {
        let messages = [Message::system(&self.system_prompt), Message::user(message)];
        let mut stream = match self.provider.chat_stream(&messages, &self.options).await {
            Ok(stream) => stream,
            Err(e) => {
                warn!(turn = %turn.id, provider = self.provider.name(), error = %e, "generator unavailable");
                return true;
            }
        };

        while let Some(event) = stream.next().await {
            match event {
                Ok(StreamEvent::Text(text)) => {
                    if tx.send(StreamChunk::text(text)).await.is_err() {
                        return false;
                    }
                }
                Ok(StreamEvent::Done) => break,
                Err(e) => {
                    warn!(turn = %turn.id, error = %e, "generator stream failed");
                    break;
                }
            }
        }
        true
    }
}

/// Output of [`ChatPipeline::stream`].
pub struct ChunkStream {
    rx: mpsc::Receiver<StreamChunk>,
    cancel: CancellationToken,
}

impl ChunkStream {
    /// Stop the turn. Chunks already buffered may still be delivered.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// Token that cancels this turn, for wiring to a client disconnect.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Receive the next chunk.
    pub async fn recv(&mut self) -> Option<StreamChunk> {
        self.rx.recv().await
    }
}

impl Stream for ChunkStream {
    type Item = StreamChunk;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.rx.poll_recv(cx)
    }
}

impl Drop for ChunkStream {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}
