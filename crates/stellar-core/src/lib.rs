//! Domain layer of the Stellar consultation service.
//!
//! Sessions, their message histories, capability-token authentication, and the
//! contracts of the external collaborators live here; storage, HTTP clients,
//! and transports are provided by the sibling crates.

pub mod auth;
pub mod collaborator;
pub mod config;
pub mod error;
pub mod session;

// Re-export common error type
pub use error::{Result, StellarError};
