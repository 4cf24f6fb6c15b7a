//! Agent error types.

use chatvault_secrets::VaultError;
use thiserror::Error;

/// Errors that can occur while running a chat turn.
///
/// The streaming entry point never surfaces these; they are turned into
/// terminal chunks. They are returned by the step-wise API
/// ([`crate::ChatPipeline::scan`]).
#[derive(Debug, Error)]
pub enum AgentError {
    /// The breach check could not be performed.
    #[error("Breach check failed: {0}")]
    Vault(#[from] VaultError),
}

impl AgentError {
    /// Stable machine-readable code for outer transports.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Vault(e) => e.code(),
        }
    }
}
