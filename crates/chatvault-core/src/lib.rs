//! # chatvault-core
//!
//! Core types, authorization, and configuration for ChatVault.
//!
//! This crate provides shared functionality used across all ChatVault crates:
//!
//! - **Types**: Identity claims, typed scopes, stored secret records, audit records
//! - **Authorization**: The ability set derived per request, usable both as a
//!   yes/no gate and as a push-down [`SecretFilter`] for persistence queries
//! - **Configuration**: Loading, validation, and environment overlay
//! - **Utilities**: Path resolution, ID generation, and environment handling

pub mod abilities;
pub mod config;
pub mod env;
pub mod error;
pub mod filter;
pub mod id;
pub mod paths;
pub mod secret;
pub mod types;

// Re-exports for convenience
pub use abilities::{derive_abilities, AbilitySet, Action, Subject};
pub use config::Config;
pub use error::{ConfigError, Error, Result, SecurityError};
pub use filter::{Scoped, SecretFilter};
pub use secret::SecretString;
pub use types::*;
