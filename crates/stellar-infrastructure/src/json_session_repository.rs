//! JSON file-based SessionRepository implementation.
//!
//! Stores each session as an individual `<session-id>.json` document.
//! Writes are atomic (tmp file + fsync + rename) and read-modify-write
//! operations hold a file lock, so sessions survive process restarts intact.

use crate::storage::AtomicJsonFile;
use async_trait::async_trait;
use stellar_core::auth::Identity;
use stellar_core::error::{Result, StellarError};
use stellar_core::session::{Message, Session, SessionRepository};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};
use tokio::task;

/// JSON file-based session repository.
///
/// Directory structure:
/// ```text
/// sessions_dir/
/// ├── <session-id-1>.json
/// └── <session-id-2>.json
/// ```
///
/// All file I/O runs on the blocking pool via `tokio::task::spawn_blocking`.
///
/// The active session of each owner is tracked in memory, built from a scan
/// when the repository is opened, so active lookups and completion touch a
/// single file. The directory is assumed to belong to this process.
pub struct JsonSessionRepository {
    sessions_dir: PathBuf,
    active_index: Mutex<HashMap<Identity, String>>,
}

impl JsonSessionRepository {
    /// Creates a repository rooted at `sessions_dir`, creating it if needed.
    pub fn new(sessions_dir: impl AsRef<Path>) -> Result<Self> {
        let sessions_dir = sessions_dir.as_ref().to_path_buf();
        fs::create_dir_all(&sessions_dir)?;

        let mut active_index = HashMap::new();
        for session in Self::load_all_sync(&sessions_dir)? {
            if !session.is_active() {
                continue;
            }
            // Oldest first, so the newest active session wins.
            if let Some(previous) =
                active_index.insert(session.owner_id().clone(), session.id().to_string())
            {
                tracing::warn!(
                    owner = %session.owner_id(),
                    ignored = %previous,
                    "Owner has more than one active session on disk"
                );
            }
        }

        Ok(Self {
            sessions_dir,
            active_index: Mutex::new(active_index),
        })
    }

    pub fn sessions_dir(&self) -> &Path {
        &self.sessions_dir
    }

    fn index(&self) -> MutexGuard<'_, HashMap<Identity, String>> {
        self.active_index
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn indexed_active(&self, owner: &Identity) -> Option<String> {
        self.index().get(owner).cloned()
    }

    fn forget_active(&self, owner: &Identity, session_id: &str) {
        let mut index = self.index();
        if index.get(owner).is_some_and(|id| id == session_id) {
            index.remove(owner);
        }
    }

    fn file_for(sessions_dir: &Path, session_id: &str) -> Result<AtomicJsonFile<Session>> {
        // Ids are generated uuids; anything that could escape the directory is rejected.
        if session_id.is_empty()
            || !session_id
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
        {
            return Err(StellarError::invalid_input(format!(
                "invalid session id '{session_id}'"
            )));
        }
        Ok(AtomicJsonFile::new(
            sessions_dir.join(format!("{session_id}.json")),
        ))
    }

    fn load_all_sync(sessions_dir: &Path) -> Result<Vec<Session>> {
        let mut sessions = Vec::new();
        if !sessions_dir.exists() {
            return Ok(sessions);
        }

        for entry in fs::read_dir(sessions_dir)? {
            let path = entry?.path();
            let is_document = path.extension().is_some_and(|ext| ext == "json")
                && !path
                    .file_name()
                    .is_some_and(|name| name.to_string_lossy().starts_with('.'));
            if !is_document {
                continue;
            }

            match AtomicJsonFile::<Session>::new(path.clone()).load() {
                Ok(Some(session)) => sessions.push(session),
                Ok(None) => {}
                Err(e) => {
                    tracing::warn!(path = %path.display(), error = %e, "Skipping unreadable session file");
                }
            }
        }

        sessions.sort_by_key(|s| s.created_at());
        Ok(sessions)
    }

    async fn blocking<R, F>(&self, f: F) -> Result<R>
    where
        R: Send + 'static,
        F: FnOnce(&Path) -> Result<R> + Send + 'static,
    {
        let sessions_dir = self.sessions_dir.clone();
        task::spawn_blocking(move || f(&sessions_dir))
            .await
            .map_err(|e| StellarError::io(format!("Failed to spawn blocking task: {e}")))?
    }
}

#[async_trait]
impl SessionRepository for JsonSessionRepository {
    async fn create(&self, session: &Session) -> Result<()> {
        let stored = session.clone();
        self.blocking(move |dir| Self::file_for(dir, stored.id())?.create(&stored))
            .await?;
        if session.is_active() {
            self.index()
                .insert(session.owner_id().clone(), session.id().to_string());
        }
        Ok(())
    }

    async fn find_by_id(&self, session_id: &str) -> Result<Option<Session>> {
        let session_id = session_id.to_string();
        self.blocking(move |dir| Self::file_for(dir, &session_id)?.load())
            .await
    }

    async fn find_active_by_owner(&self, owner: &Identity) -> Result<Option<Session>> {
        let Some(session_id) = self.indexed_active(owner) else {
            return Ok(None);
        };
        match self.find_by_id(&session_id).await? {
            Some(session) if session.is_active() && session.owner_id() == owner => {
                Ok(Some(session))
            }
            _ => {
                self.forget_active(owner, &session_id);
                Ok(None)
            }
        }
    }

    /// Completes the indexed active session.
    ///
    /// A session file that cannot be read or written fails the call and
    /// stays indexed, so a new session is never opened beside it.
    async fn complete_active_for_owner(&self, owner: &Identity) -> Result<usize> {
        let Some(session_id) = self.indexed_active(owner) else {
            return Ok(0);
        };
        let id = session_id.clone();
        let outcome = self
            .blocking(move |dir| {
                Self::file_for(dir, &id)?.update("session", |stored| Ok(stored.complete()))
            })
            .await;

        match outcome {
            Ok(changed) => {
                self.forget_active(owner, &session_id);
                Ok(usize::from(changed))
            }
            Err(e) if e.is_not_found() => {
                tracing::warn!(owner = %owner, session_id = %session_id, "Indexed session file is gone");
                self.forget_active(owner, &session_id);
                Ok(0)
            }
            Err(e) => Err(e),
        }
    }

    async fn append_message(&self, session_id: &str, message: &Message) -> Result<()> {
        let session_id = session_id.to_string();
        let message = message.clone();
        self.blocking(move |dir| {
            let file = Self::file_for(dir, &session_id)?;
            if !file.path().exists() {
                return Err(StellarError::not_found("session", session_id.clone()));
            }
            file.update("session", |session| {
                if !session.is_active() {
                    return Err(StellarError::NoActiveSession);
                }
                session.append(message);
                Ok(())
            })
        })
        .await
    }

    async fn list_by_owner(&self, owner: &Identity) -> Result<Vec<Session>> {
        let owner = owner.clone();
        self.blocking(move |dir| {
            Ok(Self::load_all_sync(dir)?
                .into_iter()
                .filter(|s| s.owner_id() == &owner)
                .collect())
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use stellar_core::session::{ProfileParams, Sender, SessionStatus};
    use tempfile::TempDir;

    fn session(owner: &str) -> Session {
        Session::new(
            Identity::new(owner),
            ProfileParams::new("1990-01-01", "14:30", "Lagos"),
            json!({"planets": [{"name": "Sun", "sign": "Capricorn"}]}),
        )
    }

    #[tokio::test]
    async fn test_create_and_reload() {
        let temp_dir = TempDir::new().unwrap();
        let repository = JsonSessionRepository::new(temp_dir.path()).unwrap();
        let s = session("U1");

        repository.create(&s).await.unwrap();

        assert!(temp_dir.path().join(format!("{}.json", s.id())).exists());
        assert_eq!(repository.find_by_id(s.id()).await.unwrap(), Some(s));
    }

    #[tokio::test]
    async fn test_state_survives_reopen() {
        let temp_dir = TempDir::new().unwrap();
        let s = session("U1");
        {
            let repository = JsonSessionRepository::new(temp_dir.path()).unwrap();
            repository.create(&s).await.unwrap();
            repository
                .append_message(s.id(), &Message::user("Hi").unwrap())
                .await
                .unwrap();
            repository
                .append_message(s.id(), &Message::advisor("Hello").unwrap())
                .await
                .unwrap();
        }

        let reopened = JsonSessionRepository::new(temp_dir.path()).unwrap();
        let stored = reopened
            .find_active_by_owner(&Identity::new("U1"))
            .await
            .unwrap()
            .unwrap();

        assert_eq!(stored.id(), s.id());
        assert_eq!(stored.profile_snapshot(), s.profile_snapshot());
        let senders: Vec<Sender> = stored.history().iter().map(|m| m.sender).collect();
        assert_eq!(senders, vec![Sender::User, Sender::Advisor]);
    }

    #[tokio::test]
    async fn test_complete_active_for_owner() {
        let temp_dir = TempDir::new().unwrap();
        let repository = JsonSessionRepository::new(temp_dir.path()).unwrap();
        let mine = session("U1");
        let theirs = session("U2");
        repository.create(&mine).await.unwrap();
        repository.create(&theirs).await.unwrap();
        let owner = Identity::new("U1");

        assert_eq!(repository.complete_active_for_owner(&owner).await.unwrap(), 1);
        assert_eq!(repository.complete_active_for_owner(&owner).await.unwrap(), 0);

        let stored = repository.find_by_id(mine.id()).await.unwrap().unwrap();
        assert_eq!(stored.status(), SessionStatus::Completed);
        let other = repository.find_by_id(theirs.id()).await.unwrap().unwrap();
        assert_eq!(other.status(), SessionStatus::Active);
    }

    #[tokio::test]
    async fn test_list_by_owner_oldest_first() {
        let temp_dir = TempDir::new().unwrap();
        let repository = JsonSessionRepository::new(temp_dir.path()).unwrap();
        let first = session("U1");
        tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        let second = session("U1");
        repository.create(&second).await.unwrap();
        repository.create(&first).await.unwrap();

        let ids: Vec<String> = repository
            .list_by_owner(&Identity::new("U1"))
            .await
            .unwrap()
            .iter()
            .map(|s| s.id().to_string())
            .collect();

        assert_eq!(ids, vec![first.id().to_string(), second.id().to_string()]);
    }

    #[tokio::test]
    async fn test_append_to_unknown_session() {
        let temp_dir = TempDir::new().unwrap();
        let repository = JsonSessionRepository::new(temp_dir.path()).unwrap();

        let err = repository
            .append_message("missing", &Message::user("Hi").unwrap())
            .await
            .unwrap_err();

        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_path_like_ids_rejected() {
        let temp_dir = TempDir::new().unwrap();
        let repository = JsonSessionRepository::new(temp_dir.path()).unwrap();

        let err = repository.find_by_id("../etc/passwd").await.unwrap_err();
        assert!(matches!(err, StellarError::InvalidInput(_)));
    }

    #[tokio::test]
    async fn test_unreadable_files_are_skipped() {
        let temp_dir = TempDir::new().unwrap();
        let repository = JsonSessionRepository::new(temp_dir.path()).unwrap();
        repository.create(&session("U1")).await.unwrap();
        std::fs::write(temp_dir.path().join("garbage.json"), "{ not json").unwrap();

        let sessions = repository.list_by_owner(&Identity::new("U1")).await.unwrap();
        assert_eq!(sessions.len(), 1);
    }

    #[tokio::test]
    async fn test_append_to_completed_session_rejected() {
        let temp_dir = TempDir::new().unwrap();
        let repository = JsonSessionRepository::new(temp_dir.path()).unwrap();
        let s = session("U1");
        repository.create(&s).await.unwrap();
        repository
            .complete_active_for_owner(&Identity::new("U1"))
            .await
            .unwrap();

        let err = repository
            .append_message(s.id(), &Message::user("Too late").unwrap())
            .await
            .unwrap_err();

        assert!(matches!(err, StellarError::NoActiveSession));
        let stored = repository.find_by_id(s.id()).await.unwrap().unwrap();
        assert!(stored.history().is_empty());
    }

    #[tokio::test]
    async fn test_profile_snapshot_keeps_key_order() {
        let raw = r#"{"sunSign":"Capricorn","ascendant":"Leo"}"#;
        let temp_dir = TempDir::new().unwrap();
        let s = Session::new(
            Identity::new("U1"),
            ProfileParams::new("1990-01-01", "14:30", "Lagos"),
            serde_json::from_str(raw).unwrap(),
        );
        JsonSessionRepository::new(temp_dir.path())
            .unwrap()
            .create(&s)
            .await
            .unwrap();

        let reopened = JsonSessionRepository::new(temp_dir.path()).unwrap();
        let stored = reopened.find_by_id(s.id()).await.unwrap().unwrap();

        assert_eq!(serde_json::to_string(stored.profile_snapshot()).unwrap(), raw);
    }

    #[tokio::test]
    async fn test_active_lookup_follows_newest_session() {
        let temp_dir = TempDir::new().unwrap();
        let owner = Identity::new("U1");
        let old = session("U1");
        let new = session("U1");
        {
            let repository = JsonSessionRepository::new(temp_dir.path()).unwrap();
            repository.create(&old).await.unwrap();
            assert_eq!(repository.complete_active_for_owner(&owner).await.unwrap(), 1);
            repository.create(&new).await.unwrap();

            let active = repository.find_active_by_owner(&owner).await.unwrap().unwrap();
            assert_eq!(active.id(), new.id());
        }

        std::fs::write(temp_dir.path().join("garbage.json"), "{ not json").unwrap();
        let reopened = JsonSessionRepository::new(temp_dir.path()).unwrap();
        let active = reopened.find_active_by_owner(&owner).await.unwrap().unwrap();
        assert_eq!(active.id(), new.id());
        assert!(
            reopened
                .find_active_by_owner(&Identity::new("U2"))
                .await
                .unwrap()
                .is_none()
        );
    }

    #[tokio::test]
    async fn test_unreadable_active_session_fails_completion() {
        let temp_dir = TempDir::new().unwrap();
        let repository = JsonSessionRepository::new(temp_dir.path()).unwrap();
        let owner = Identity::new("U1");
        let s = session("U1");
        repository.create(&s).await.unwrap();
        std::fs::write(temp_dir.path().join(format!("{}.json", s.id())), "{ not json").unwrap();

        assert!(repository.complete_active_for_owner(&owner).await.is_err());
        // Still indexed, so the next attempt fails the same way.
        assert!(repository.complete_active_for_owner(&owner).await.is_err());
    }

    #[tokio::test]
    async fn test_deleted_active_session_is_forgotten() {
        let temp_dir = TempDir::new().unwrap();
        let repository = JsonSessionRepository::new(temp_dir.path()).unwrap();
        let owner = Identity::new("U1");
        let s = session("U1");
        repository.create(&s).await.unwrap();
        std::fs::remove_file(temp_dir.path().join(format!("{}.json", s.id()))).unwrap();

        assert!(repository.find_active_by_owner(&owner).await.unwrap().is_none());
        assert_eq!(repository.complete_active_for_owner(&owner).await.unwrap(), 0);
    }
}
