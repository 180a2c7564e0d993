//! Application layer for Stellar.
//!
//! Coordinates the session core with the text-generation collaborator to
//! turn one inbound message into a persisted exchange.

pub mod pipeline;
pub mod prompt;

pub use pipeline::MessagePipeline;
pub use prompt::{FALLBACK_TEXT, PERSONA_INSTRUCTION, build_generation_request};
