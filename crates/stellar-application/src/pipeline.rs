//! Per-message orchestration: persist inbound, generate, persist outbound.

use crate::prompt::{FALLBACK_TEXT, build_generation_request};
use stellar_core::auth::Identity;
use stellar_core::collaborator::TextGenerator;
use stellar_core::error::{Result, StellarError};
use stellar_core::session::{KeyedLocks, Message, SessionRepository};
use std::sync::Arc;
use std::time::Duration;

/// Runs the fixed message sequence for one inbound text.
///
/// Calls for the same session are serialized: the user and advisor appends
/// of one message always land next to each other, in arrival order.
/// Text-generation failures never surface to the caller; they become the
/// fallback advisor text.
pub struct MessagePipeline {
    session_repository: Arc<dyn SessionRepository>,
    text_generator: Arc<dyn TextGenerator>,
    session_locks: Arc<KeyedLocks>,
    generation_timeout: Duration,
}

impl MessagePipeline {
    pub fn new(
        session_repository: Arc<dyn SessionRepository>,
        text_generator: Arc<dyn TextGenerator>,
        generation_timeout: Duration,
    ) -> Self {
        Self {
            session_repository,
            text_generator,
            session_locks: Arc::new(KeyedLocks::new()),
            generation_timeout,
        }
    }

    /// Uses `locks` for per-session serialization, typically
    /// [`SessionManager::session_locks`](stellar_core::session::SessionManager::session_locks),
    /// so a session is never completed in the middle of an exchange.
    pub fn with_session_locks(mut self, locks: Arc<KeyedLocks>) -> Self {
        self.session_locks = locks;
        self
    }

    /// Handles `text` for `session_id` and returns the advisor message to deliver.
    ///
    /// # Errors
    ///
    /// - `InvalidInput` if `text` is blank (nothing is written)
    /// - `NoActiveSession` if the session is missing or completed
    /// - persistence errors from either append; if the user append fails the
    ///   generator is not called
    pub async fn handle_inbound(&self, session_id: &str, text: &str) -> Result<Message> {
        let user_message = Message::user(text)?;

        let _guard = self.session_locks.lock(session_id).await;

        let session = self
            .session_repository
            .find_by_id(session_id)
            .await?
            .filter(|s| s.is_active())
            .ok_or(StellarError::NoActiveSession)?;

        self.session_repository
            .append_message(session_id, &user_message)
            .await?;
        tracing::debug!(session_id, "User message persisted");

        let request = build_generation_request(&session, text);
        let reply = match tokio::time::timeout(
            self.generation_timeout,
            self.text_generator.generate(&request),
        )
        .await
        {
            Ok(Ok(reply)) => reply,
            Ok(Err(e)) => {
                tracing::warn!(session_id, error = %e, retryable = e.is_retryable(), "Generation failed, using fallback");
                FALLBACK_TEXT.to_string()
            }
            Err(_) => {
                tracing::warn!(
                    session_id,
                    timeout_secs = self.generation_timeout.as_secs(),
                    "Generation timed out, using fallback"
                );
                FALLBACK_TEXT.to_string()
            }
        };

        let advisor_message =
            Message::advisor(reply).or_else(|_| Message::advisor(FALLBACK_TEXT))?;
        self.session_repository
            .append_message(session_id, &advisor_message)
            .await?;
        tracing::info!(session_id, "Advisor reply persisted");

        Ok(advisor_message)
    }

    /// Resolves the active session of `identity`, then runs [`Self::handle_inbound`].
    pub async fn handle_inbound_for(&self, identity: &Identity, text: &str) -> Result<Message> {
        let session = self
            .session_repository
            .find_active_by_owner(identity)
            .await?
            .ok_or(StellarError::NoActiveSession)?;
        self.handle_inbound(session.id(), text).await
    }
}
