//! Session domain model.
//!
//! `Session` is the aggregate root of a consultation: it exclusively owns its
//! append-only history and the profile snapshot captured at creation.

use super::message::Message;
use crate::auth::Identity;
use crate::error::{Result, StellarError};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Lifecycle state of a session.
///
/// The only transition is `Active -> Completed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    #[default]
    Active,
    Completed,
}

/// The three inputs a session is opened with.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfileParams {
    /// Birth date, as supplied by the caller (e.g. `1990-01-01`)
    #[serde(alias = "dob")]
    pub date: String,
    /// Birth time (e.g. `14:30`)
    pub time: String,
    /// Birth place (e.g. `Lagos`)
    pub place: String,
}

impl ProfileParams {
    pub fn new(date: impl Into<String>, time: impl Into<String>, place: impl Into<String>) -> Self {
        Self {
            date: date.into(),
            time: time.into(),
            place: place.into(),
        }
    }

    /// Rejects blank fields.
    pub fn validate(&self) -> Result<()> {
        for (field, value) in [("date", &self.date), ("time", &self.time), ("place", &self.place)] {
            if value.trim().is_empty() {
                return Err(StellarError::invalid_input(format!("{field} must not be empty")));
            }
        }
        Ok(())
    }
}

/// A consultation session.
///
/// Fields are private so that the invariants hold by construction:
/// - `profile_snapshot` is set once in [`Session::new`] and never replaced
/// - `history` only grows through [`Session::append`]
/// - `status` only moves forward through [`Session::complete`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    id: String,
    owner_id: Identity,
    profile_params: ProfileParams,
    profile_snapshot: serde_json::Value,
    #[serde(default)]
    history: Vec<Message>,
    #[serde(default)]
    status: SessionStatus,
    created_at: DateTime<Utc>,
}

impl Session {
    /// Creates a new active session with an empty history.
    pub fn new(
        owner_id: Identity,
        profile_params: ProfileParams,
        profile_snapshot: serde_json::Value,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            owner_id,
            profile_params,
            profile_snapshot,
            history: Vec::new(),
            status: SessionStatus::Active,
            created_at: Utc::now(),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn owner_id(&self) -> &Identity {
        &self.owner_id
    }

    pub fn profile_params(&self) -> &ProfileParams {
        &self.profile_params
    }

    pub fn profile_snapshot(&self) -> &serde_json::Value {
        &self.profile_snapshot
    }

    /// Messages in conversation order.
    pub fn history(&self) -> &[Message] {
        &self.history
    }

    pub fn status(&self) -> SessionStatus {
        self.status
    }

    pub fn is_active(&self) -> bool {
        self.status == SessionStatus::Active
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Appends a message to the end of the history.
    pub fn append(&mut self, message: Message) {
        self.history.push(message);
    }

    /// Marks the session completed.
    ///
    /// Returns `true` if the status changed. Completing a completed session is
    /// a no-op.
    pub fn complete(&mut self) -> bool {
        if self.status == SessionStatus::Completed {
            return false;
        }
        self.status = SessionStatus::Completed;
        true
    }
}
