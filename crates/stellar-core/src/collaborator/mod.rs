//! Contracts of the third-party computation services.
//!
//! - `profile`: one-time profile snapshot at session creation (`ProfileProvider`)
//! - `generation`: advisor reply generation (`TextGenerator`)
//!
//! Both return a typed [`CollaboratorError`] instead of panicking or leaking
//! transport errors, so the caller decides whether a failure is fatal
//! (profile) or degrades to a fallback (generation).

mod generation;
mod profile;

pub use generation::{ChatTurn, GenerationRequest, TextGenerator};
pub use profile::{ProfileProvider, ProfileRequest};

use thiserror::Error;

/// Failure outcome of a collaborator call.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CollaboratorError {
    /// The call did not finish within the allotted time
    #[error("request timed out")]
    Timeout,
    /// Connection-level failure before a response was received
    #[error("transport failure: {message}")]
    Transport { message: String, is_retryable: bool },
    /// Non-success HTTP status
    #[error("HTTP {status}: {message}")]
    Http {
        status: u16,
        message: String,
        is_retryable: bool,
    },
    /// The service answered but produced no usable content
    #[error("empty response")]
    EmptyResponse,
    /// The response body could not be interpreted
    #[error("malformed response: {0}")]
    Malformed(String),
}

impl CollaboratorError {
    /// Whether a later attempt could plausibly succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Timeout => true,
            Self::Transport { is_retryable, .. } | Self::Http { is_retryable, .. } => *is_retryable,
            Self::EmptyResponse | Self::Malformed(_) => false,
        }
    }
}
