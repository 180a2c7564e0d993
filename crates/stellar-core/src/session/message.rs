//! Conversation message types.
//!
//! Messages are value records owned by their session's history; they carry no
//! identity or lifecycle of their own.

use crate::error::{Result, StellarError};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Who authored a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Sender {
    /// Message from the user.
    User,
    /// Generated reply.
    #[serde(alias = "ai")]
    Advisor,
}

/// A single entry of a session history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    /// The author of the message.
    pub sender: Sender,
    /// Non-empty content.
    pub text: String,
    /// Set when the message is appended.
    pub timestamp: DateTime<Utc>,
}

impl Message {
    /// Creates a message stamped with the current time.
    ///
    /// # Errors
    ///
    /// Returns `InvalidInput` if `text` is empty or whitespace only.
    pub fn new(sender: Sender, text: impl Into<String>) -> Result<Self> {
        let text = text.into();
        if text.trim().is_empty() {
            return Err(StellarError::invalid_input("message text must not be empty"));
        }
        Ok(Self {
            sender,
            text,
            timestamp: Utc::now(),
        })
    }

    pub fn user(text: impl Into<String>) -> Result<Self> {
        Self::new(Sender::User, text)
    }

    pub fn advisor(text: impl Into<String>) -> Result<Self> {
        Self::new(Sender::Advisor, text)
    }
}
