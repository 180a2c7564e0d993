use super::locks::KeyedLocks;
use super::model::{ProfileParams, Session};
use super::repository::SessionRepository;
use crate::auth::Identity;
use crate::collaborator::{ProfileProvider, ProfileRequest};
use crate::error::{Result, StellarError};
use std::sync::Arc;

/// Opens sessions and enforces the single-active-session invariant.
///
/// `SessionManager` is responsible for:
/// - Completing the previous active session of an owner
/// - Capturing the profile snapshot for the new session
/// - Persisting the new session
/// - Looking up the active session of an owner
///
/// Session starts for the same owner are serialized, so at most one session
/// per owner is active even under concurrent requests.
pub struct SessionManager {
    /// Persistent storage backend for session data
    session_repository: Arc<dyn SessionRepository>,
    /// Profile-generation collaborator
    profile_provider: Arc<dyn ProfileProvider>,
    /// Per-owner serialization of `start_session`
    owner_locks: KeyedLocks,
    /// Per-session locks shared with the message pipeline
    session_locks: Arc<KeyedLocks>,
}

impl SessionManager {
    /// Creates a new `SessionManager`.
    ///
    /// # Arguments
    ///
    /// * `session_repository` - The repository backend for session data persistence
    /// * `profile_provider` - The collaborator computing the profile snapshot
    pub fn new(
        session_repository: Arc<dyn SessionRepository>,
        profile_provider: Arc<dyn ProfileProvider>,
    ) -> Self {
        Self {
            session_repository,
            profile_provider,
            owner_locks: KeyedLocks::new(),
            session_locks: Arc::new(KeyedLocks::new()),
        }
    }

    /// Locks held per session id while a session is being completed.
    ///
    /// A message pipeline that takes the same locks never sees its session
    /// retired between the user append and the advisor append.
    pub fn session_locks(&self) -> Arc<KeyedLocks> {
        self.session_locks.clone()
    }

    /// Opens a new session for `identity` and returns its id.
    ///
    /// Steps:
    /// 1. Every active session of `identity` is completed, once any message
    ///    exchange in progress on it has finished.
    /// 2. The profile snapshot is requested with `params`.
    /// 3. A new active session with an empty history is stored.
    ///
    /// `name` is forwarded to the profile collaborator; the identity is used
    /// when it is absent.
    ///
    /// # Errors
    ///
    /// - `InvalidInput` if `params` has blank fields (nothing is touched)
    /// - `ExternalService` if the profile call fails; no session is created and
    ///   the completions of step 1 are not reverted
    /// - `Persistence`/`Io` if storage fails
    pub async fn start_session(
        &self,
        identity: &Identity,
        params: ProfileParams,
        name: Option<String>,
    ) -> Result<String> {
        params.validate()?;

        let _guard = self.owner_locks.lock(identity.as_str()).await;

        let completed = {
            let current = self.session_repository.find_active_by_owner(identity).await?;
            let _session_guard = match &current {
                Some(session) => Some(self.session_locks.lock(session.id()).await),
                None => None,
            };
            self.session_repository
                .complete_active_for_owner(identity)
                .await?
        };
        if completed > 0 {
            tracing::info!(
                user_id = %identity,
                completed,
                "Completed previous active session(s)"
            );
        }

        let request = ProfileRequest {
            name: name
                .filter(|n| !n.trim().is_empty())
                .unwrap_or_else(|| identity.to_string()),
            date: params.date.clone(),
            time: params.time.clone(),
            place: params.place.clone(),
        };
        let snapshot = self
            .profile_provider
            .fetch_profile(&request)
            .await
            .map_err(|e| {
                tracing::warn!(user_id = %identity, error = %e, "Profile generation failed");
                StellarError::external("profile", e.to_string())
            })?;

        let session = Session::new(identity.clone(), params, snapshot);
        self.session_repository.create(&session).await?;

        tracing::info!(
            user_id = %identity,
            session_id = %session.id(),
            "Session started"
        );
        Ok(session.id().to_string())
    }

    /// Returns the active session of `identity`.
    ///
    /// # Errors
    ///
    /// Returns `NoActiveSession` if the identity has none.
    pub async fn get_active_session(&self, identity: &Identity) -> Result<Session> {
        self.session_repository
            .find_active_by_owner(identity)
            .await?
            .ok_or(StellarError::NoActiveSession)
    }

    /// Lists every session of `identity`, oldest first.
    pub async fn list_sessions(&self, identity: &Identity) -> Result<Vec<Session>> {
        self.session_repository.list_by_owner(identity).await
    }
}
