//! Ollama provider for local open-source models.
//!
//! Talks to `POST {base_url}/api/chat` with `stream: true`. The response body
//! is newline-delimited JSON, one object per line:
//!
//! ```text
//! {"message":{"role":"assistant","content":"Hel"},"done":false}
//! {"message":{"role":"assistant","content":"lo"},"done":false}
//! {"done":true}
//! ```
//!
//! Lines can be split across network chunks, so a carry buffer is kept
//! between reads. Blank and malformed lines are skipped.

use std::collections::VecDeque;
use std::pin::Pin;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use chatvault_core::config::GeneratorConfig;
use futures::{Stream, StreamExt};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::{ProviderError, Result};
use crate::types::{ChatOptions, Message, StreamEvent};
use crate::{CompletionStream, Provider};

const DEFAULT_BASE_URL: &str = "http://localhost:11434";
const DEFAULT_TIMEOUT_SECS: u64 = 120;

/// Longest NDJSON line buffered before it is dropped as malformed.
const MAX_LINE_BYTES: usize = 1 << 20;

type ByteStream = Pin<Box<dyn Stream<Item = reqwest::Result<Bytes>> + Send>>;

/// Ollama provider for local models.
#[derive(Debug, Clone)]
pub struct OllamaProvider {
    /// Base URL for Ollama server.
    base_url: String,

    /// HTTP client.
    client: Client,

    /// Model to use.
    model: String,

    /// Whole-request timeout, in seconds.
    timeout_secs: u64,
}

impl OllamaProvider {
    /// Create a new Ollama provider with the default URL.
    pub fn new(model: impl Into<String>) -> Result<Self> {
        Ok(Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            client: build_client(DEFAULT_TIMEOUT_SECS)?,
            model: model.into(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        })
    }

    /// Create a provider from the generator section of the config.
    pub fn from_config(config: &GeneratorConfig) -> Result<Self> {
        Ok(Self::new(config.model.clone())?
            .with_base_url(config.base_url.clone())
            .with_timeout(config.timeout_secs)?)
    }

    /// Set the base URL for Ollama server.
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into().trim_end_matches('/').to_string();
        self
    }

    /// Set the model.
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Set the whole-request timeout.
    pub fn with_timeout(mut self, secs: u64) -> Result<Self> {
        self.client = build_client(secs)?;
        self.timeout_secs = secs;
        Ok(self)
    }

    fn build_request<'a>(&'a self, messages: &'a [Message], options: &ChatOptions) -> ApiRequest<'a> {
        ApiRequest {
            model: &self.model,
            messages,
            stream: true,
            options: ApiOptions {
                temperature: options.temperature,
                top_p: options.top_p,
                repeat_penalty: options.repeat_penalty,
            },
        }
    }

    fn map_send_error(&self, e: reqwest::Error) -> ProviderError {
        if e.is_timeout() {
            ProviderError::Timeout(self.timeout_secs)
        } else {
            if e.is_connect() {
                warn!(base_url = %self.base_url, "cannot connect to Ollama, is it running?");
            }
            ProviderError::Network(e)
        }
    }
}

fn build_client(timeout_secs: u64) -> Result<Client> {
    Client::builder()
        .timeout(Duration::from_secs(timeout_secs))
        .build()
        .map_err(|e| ProviderError::config(format!("failed to build HTTP client: {e}")))
}

#[async_trait]
impl Provider for OllamaProvider {
    fn name(&self) -> &str {
        "ollama"
    }

    fn model(&self) -> &str {
        &self.model
    }

    async fn chat_stream(
        &self,
        messages: &[Message],
        options: &ChatOptions,
    ) -> Result<CompletionStream> {
        let request = self.build_request(messages, options);
        let url = format!("{}/api/chat", self.base_url);
        debug!(%url, model = %self.model, messages = messages.len(), "sending chat request");

        let response = self
            .client
            .post(&url)
            .json(&request)
            .send()
            .await
            .map_err(|e| self.map_send_error(e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<ApiError>(&body)
                .map(|e| e.error)
                .unwrap_or(body);
            if status.as_u16() == 404 && message.contains("not found") {
                return Err(ProviderError::model_not_found(self.model.clone()));
            }
            return Err(ProviderError::server_error(status.as_u16(), message));
        }

        Ok(Box::pin(ndjson_events(Box::pin(response.bytes_stream()))))
    }
}

/// Parser state carried across reads of the response body.
struct NdjsonState {
    body: ByteStream,
    buffer: Vec<u8>,
    pending: VecDeque<StreamEvent>,
    /// Inside an oversized line; bytes up to the next newline are dropped.
    discarding: bool,
    eof: bool,
    finished: bool,
}

/// Turn a raw NDJSON body into stream events. Always ends with exactly one
/// [`StreamEvent::Done`] unless the body fails first.
fn ndjson_events(body: ByteStream) -> impl Stream<Item = Result<StreamEvent>> + Send {
    let state = NdjsonState {
        body,
        buffer: Vec::new(),
        pending: VecDeque::new(),
        discarding: false,
        eof: false,
        finished: false,
    };

    futures::stream::unfold(state, |mut state| async move {
        loop {
            if let Some(event) = state.pending.pop_front() {
                if event == StreamEvent::Done {
                    state.finished = true;
                    state.pending.clear();
                }
                return Some((Ok(event), state));
            }
            if state.finished {
                return None;
            }

            if let Some(pos) = state.buffer.iter().position(|&b| b == b'\n') {
                let line: Vec<u8> = state.buffer.drain(..=pos).collect();
                if state.discarding {
                    state.discarding = false;
                } else {
                    parse_line(&line, &mut state.pending);
                }
                continue;
            }

            if state.buffer.len() > MAX_LINE_BYTES {
                if !state.discarding {
                    warn!(limit = MAX_LINE_BYTES, "skipping oversized stream line");
                    state.discarding = true;
                }
                state.buffer.clear();
            }

            if state.eof {
                state.pending.push_back(StreamEvent::Done);
                continue;
            }

            match state.body.next().await {
                Some(Ok(chunk)) => state.buffer.extend_from_slice(&chunk),
                Some(Err(e)) => {
                    state.finished = true;
                    return Some((Err(ProviderError::stream(e.to_string())), state));
                }
                None => {
                    state.eof = true;
                    if !state.buffer.is_empty() {
                        // Flush a final line that had no trailing newline.
                        state.buffer.push(b'\n');
                    }
                }
            }
        }
    })
}

fn parse_line(line: &[u8], out: &mut VecDeque<StreamEvent>) {
    let Ok(line) = std::str::from_utf8(line) else {
        debug!("skipping non UTF-8 stream line");
        return;
    };
    let line = line.trim();
    if line.is_empty() {
        return;
    }

    let chunk: ApiChunk = match serde_json::from_str(line) {
        Ok(chunk) => chunk,
        Err(e) => {
            debug!(error = %e, "skipping malformed stream line");
            return;
        }
    };

    if let Some(content) = chunk.message.map(|m| m.content) {
        if !content.is_empty() {
            out.push_back(StreamEvent::Text(content));
        }
    }
    if chunk.done {
        out.push_back(StreamEvent::Done);
    }
}

// API types

#[derive(Debug, Serialize)]
struct ApiRequest<'a> {
    model: &'a str,
    messages: &'a [Message],
    stream: bool,
    options: ApiOptions,
}

#[derive(Debug, Serialize)]
struct ApiOptions {
    temperature: f32,
    top_p: f32,
    repeat_penalty: f32,
}

#[derive(Debug, Deserialize)]
struct ApiChunk {
    #[serde(default)]
    message: Option<ApiChunkMessage>,
    #[serde(default)]
    done: bool,
}

#[derive(Debug, Deserialize)]
struct ApiChunkMessage {
    #[serde(default)]
    content: String,
}

#[derive(Debug, Deserialize)]
struct ApiError {
    error: String,
}
