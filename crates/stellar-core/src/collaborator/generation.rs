use super::CollaboratorError;
use crate::session::Sender;
use async_trait::async_trait;

/// One prior exchange entry passed to the generator as context.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatTurn {
    pub sender: Sender,
    pub text: String,
}

/// Input of a text-generation call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationRequest {
    /// Fixed system priming that establishes the advisor persona
    pub persona_instruction: String,
    /// Prior conversation, oldest first
    pub context: Vec<ChatTurn>,
    /// The new user turn, already expanded with the profile block
    pub text: String,
}

/// Produces an advisor reply.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    async fn generate(&self, request: &GenerationRequest) -> Result<String, CollaboratorError>;
}
