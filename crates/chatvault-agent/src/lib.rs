//! Chat interception for ChatVault.
//!
//! This crate provides:
//! - The breach-intercepting streaming pipeline
//! - Candidate extraction from outbound messages
//! - Per-conversation message history

pub mod candidates;
pub mod conversation;
pub mod error;
pub mod pipeline;

pub use candidates::extract_candidates;
pub use conversation::{ChatMessage, ChatRole, Conversation};
pub use error::AgentError;
pub use pipeline::{ChatPipeline, ChunkStream, PipelineState, StreamChunk};

/// Result type for agent operations.
pub type Result<T> = std::result::Result<T, AgentError>;
