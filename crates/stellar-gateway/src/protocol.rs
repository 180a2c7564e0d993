//! Real-time wire format: JSON text frames tagged by `type`.

use serde::{Deserialize, Serialize};
use stellar_core::session::{Message, Sender};

pub const NO_ACTIVE_SESSION_FOUND: &str = "No active session found.";
pub const NO_ACTIVE_CHAT_SESSION: &str = "No active chat session.";
pub const ERROR_INITIALIZING_CHAT: &str = "Error initializing chat.";
pub const ERROR_PROCESSING_MESSAGE: &str = "Error processing message.";
pub const EMPTY_MESSAGE: &str = "Message text must not be empty.";
pub const INVALID_FRAME: &str = "Invalid message format.";

/// Events sent from the peer to the channel.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientEvent {
    /// Requests the history replay and joins the delivery group
    Initialize,
    Message {
        text: String,
    },
    Ping,
}

/// Events sent from the channel to the peer.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerEvent {
    History {
        messages: Vec<Message>,
    },
    Message {
        sender: Sender,
        text: String,
    },
    Error {
        message: String,
    },
    Pong,
}

impl ServerEvent {
    pub fn error(message: impl Into<String>) -> Self {
        Self::Error {
            message: message.into(),
        }
    }
}

impl From<Message> for ServerEvent {
    fn from(message: Message) -> Self {
        Self::Message {
            sender: message.sender,
            text: message.text,
        }
    }
}
