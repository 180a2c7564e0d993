use super::CollaboratorError;
use async_trait::async_trait;
use serde::Serialize;

/// Input of a profile-generation call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProfileRequest {
    /// Display name, or the identity when the caller supplied none
    pub name: String,
    pub date: String,
    pub time: String,
    pub place: String,
}

/// Computes the opaque profile snapshot a session is conditioned on.
///
/// The returned value is stored verbatim and never recomputed.
#[async_trait]
pub trait ProfileProvider: Send + Sync {
    async fn fetch_profile(
        &self,
        request: &ProfileRequest,
    ) -> Result<serde_json::Value, CollaboratorError>;
}
