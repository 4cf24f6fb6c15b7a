//! Core types for ChatVault.

mod audit;
mod auth;
mod record;

pub use audit::*;
pub use auth::*;
pub use record::*;
