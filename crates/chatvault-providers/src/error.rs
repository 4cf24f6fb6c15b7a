//! Error types for downstream generators.

use thiserror::Error;

/// Result type for provider operations.
pub type Result<T> = std::result::Result<T, ProviderError>;

/// Provider error types. All of them are transport failures from the point
/// of view of the chat pipeline.
#[derive(Debug, Error)]
pub enum ProviderError {
    /// Model not found or not pulled.
    #[error("Model not found: {0}")]
    ModelNotFound(String),

    /// Non-success status from the generator.
    #[error("Server error: {status} - {message}")]
    ServerError { status: u16, message: String },

    /// Connection or protocol failure.
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    /// Timeout error.
    #[error("Request timed out after {0} seconds")]
    Timeout(u64),

    /// The response body broke off mid-stream.
    #[error("Stream error: {0}")]
    Stream(String),

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),
}

impl ProviderError {
    /// Create a model not found error.
    pub fn model_not_found(model: impl Into<String>) -> Self {
        Self::ModelNotFound(model.into())
    }

    /// Create a server error.
    pub fn server_error(status: u16, message: impl Into<String>) -> Self {
        Self::ServerError {
            status,
            message: message.into(),
        }
    }

    /// Create a stream error.
    pub fn stream(message: impl Into<String>) -> Self {
        Self::Stream(message.into())
    }

    /// Create a config error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }
}
