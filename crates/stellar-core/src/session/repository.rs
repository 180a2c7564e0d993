//! Session repository trait.
//!
//! Defines the interface for session persistence operations.

use super::message::Message;
use super::model::Session;
use crate::auth::Identity;
use crate::error::Result;
use async_trait::async_trait;

/// An abstract repository for managing session persistence.
///
/// This trait decouples the session core from the specific storage mechanism
/// (in-memory, JSON files, a database).
///
/// # Implementation Notes
///
/// Implementations must:
/// - persist every call durably before returning `Ok`
/// - keep `history` append-only and in call order
/// - never move a session from `Completed` back to `Active`
/// - never change the history of a `Completed` session
#[async_trait]
pub trait SessionRepository: Send + Sync {
    /// Stores a newly created session.
    ///
    /// # Returns
    ///
    /// - `Ok(())`: Session stored
    /// - `Err(_)`: A session with the same id exists or storage failed
    async fn create(&self, session: &Session) -> Result<()>;

    /// Finds a session by its ID.
    ///
    /// # Returns
    ///
    /// - `Ok(Some(Session))`: Session found
    /// - `Ok(None)`: Session not found
    /// - `Err(_)`: Error occurred during retrieval
    async fn find_by_id(&self, session_id: &str) -> Result<Option<Session>>;

    /// Finds the active session of `owner`, if any.
    async fn find_active_by_owner(&self, owner: &Identity) -> Result<Option<Session>>;

    /// Marks every active session of `owner` as completed.
    ///
    /// Idempotent; returns the number of sessions that changed.
    async fn complete_active_for_owner(&self, owner: &Identity) -> Result<usize>;

    /// Appends `message` to the history of `session_id`.
    ///
    /// The status check and the append are one atomic step.
    ///
    /// # Errors
    ///
    /// - `NotFound` if the session does not exist
    /// - `NoActiveSession` if the session is completed (nothing is written)
    async fn append_message(&self, session_id: &str, message: &Message) -> Result<()>;

    /// Lists every session of `owner`, oldest first.
    async fn list_by_owner(&self, owner: &Identity) -> Result<Vec<Session>>;
}
