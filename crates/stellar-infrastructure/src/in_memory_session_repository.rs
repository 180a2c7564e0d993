//! In-process SessionRepository implementation.
//!
//! Sessions live for the lifetime of the process. Used with
//! `storage.backend = "memory"` and throughout the tests.

use async_trait::async_trait;
use stellar_core::auth::Identity;
use stellar_core::error::{Result, StellarError};
use stellar_core::session::{Message, Session, SessionRepository};
use tokio::sync::RwLock;

/// Session store backed by a vector kept in creation order.
#[derive(Default)]
pub struct InMemorySessionRepository {
    sessions: RwLock<Vec<Session>>,
}

impl InMemorySessionRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SessionRepository for InMemorySessionRepository {
    async fn create(&self, session: &Session) -> Result<()> {
        let mut sessions = self.sessions.write().await;
        if sessions.iter().any(|s| s.id() == session.id()) {
            return Err(StellarError::persistence(format!(
                "session '{}' already exists",
                session.id()
            )));
        }
        sessions.push(session.clone());
        Ok(())
    }

    async fn find_by_id(&self, session_id: &str) -> Result<Option<Session>> {
        let sessions = self.sessions.read().await;
        Ok(sessions.iter().find(|s| s.id() == session_id).cloned())
    }

    async fn find_active_by_owner(&self, owner: &Identity) -> Result<Option<Session>> {
        let sessions = self.sessions.read().await;
        Ok(sessions
            .iter()
            .rev()
            .find(|s| s.owner_id() == owner && s.is_active())
            .cloned())
    }

    async fn complete_active_for_owner(&self, owner: &Identity) -> Result<usize> {
        let mut sessions = self.sessions.write().await;
        Ok(sessions
            .iter_mut()
            .filter(|s| s.owner_id() == owner)
            .map(Session::complete)
            .filter(|changed| *changed)
            .count())
    }

    async fn append_message(&self, session_id: &str, message: &Message) -> Result<()> {
        let mut sessions = self.sessions.write().await;
        let session = sessions
            .iter_mut()
            .find(|s| s.id() == session_id)
            .ok_or_else(|| StellarError::not_found("session", session_id))?;
        if !session.is_active() {
            return Err(StellarError::NoActiveSession);
        }
        session.append(message.clone());
        Ok(())
    }

    async fn list_by_owner(&self, owner: &Identity) -> Result<Vec<Session>> {
        let sessions = self.sessions.read().await;
        Ok(sessions
            .iter()
            .filter(|s| s.owner_id() == owner)
            .cloned()
            .collect())
    }
}
