//! Error types for the Stellar workspace.

use crate::auth::AuthError;
use thiserror::Error;

/// A shared error type for the session core and its adapters.
///
/// Every failure is converted into one of these variants at the component
/// boundary, so callers can map it onto a rejection, an `error` signal, or an
/// HTTP status without inspecting messages.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum StellarError {
    /// Missing, malformed, or expired credential
    #[error("Authentication error: {0}")]
    Auth(#[from] AuthError),

    /// The identity has no session in the `active` state
    #[error("No active session")]
    NoActiveSession,

    /// Entity not found error with type information
    #[error("Entity not found: {entity_type} '{id}'")]
    NotFound {
        entity_type: &'static str,
        id: String,
    },

    /// A third-party collaborator (profile or text generation) failed
    #[error("External service error ({service}): {message}")]
    ExternalService {
        service: &'static str,
        message: String,
    },

    /// Data access error (repository/storage layer)
    #[error("Persistence error: {0}")]
    Persistence(String),

    /// Caller supplied unusable input
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Serialization/deserialization error
    #[error("Serialization error: {format} - {message}")]
    Serialization {
        format: String, // "TOML", "JSON", etc.
        message: String,
    },

    /// IO error (file system operations)
    #[error("IO error: {message}")]
    Io { message: String },

    /// Internal error (should not happen in normal operation)
    #[error("Internal error: {0}")]
    Internal(String),
}

impl StellarError {
    // ============================================================================
    // Constructor helpers
    // ============================================================================

    /// Creates a NotFound error
    pub fn not_found(entity_type: &'static str, id: impl Into<String>) -> Self {
        Self::NotFound {
            entity_type,
            id: id.into(),
        }
    }

    /// Creates an ExternalService error
    pub fn external(service: &'static str, message: impl Into<String>) -> Self {
        Self::ExternalService {
            service,
            message: message.into(),
        }
    }

    /// Creates a Persistence error
    pub fn persistence(message: impl Into<String>) -> Self {
        Self::Persistence(message.into())
    }

    /// Creates an InvalidInput error
    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::InvalidInput(message.into())
    }

    /// Creates a Config error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Creates an IO error
    pub fn io(message: impl Into<String>) -> Self {
        Self::Io {
            message: message.into(),
        }
    }

    /// Creates an Internal error
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    // ============================================================================
    // Type checking methods
    // ============================================================================

    /// Check if this is an authentication error
    pub fn is_auth(&self) -> bool {
        matches!(self, Self::Auth(_))
    }

    /// Check if this is a NotFound or NoActiveSession error
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. } | Self::NoActiveSession)
    }

    /// Check if this is an external collaborator failure
    pub fn is_external(&self) -> bool {
        matches!(self, Self::ExternalService { .. })
    }

    /// Check if this error originates from the storage layer.
    ///
    /// IO and serialization failures are produced by storage backends, so they
    /// count as persistence failures too.
    pub fn is_persistence(&self) -> bool {
        matches!(
            self,
            Self::Persistence(_) | Self::Io { .. } | Self::Serialization { .. }
        )
    }
}

// ============================================================================
// From implementations for automatic conversion
// ============================================================================

impl From<std::io::Error> for StellarError {
    fn from(err: std::io::Error) -> Self {
        Self::Io {
            message: format!("{} (kind: {:?})", err, err.kind()),
        }
    }
}

impl From<serde_json::Error> for StellarError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization {
            format: "JSON".to_string(),
            message: err.to_string(),
        }
    }
}

impl From<toml::de::Error> for StellarError {
    fn from(err: toml::de::Error) -> Self {
        Self::Serialization {
            format: "TOML".to_string(),
            message: err.to_string(),
        }
    }
}

/// Conversion from anyhow::Error (bootstrap code only)
impl From<anyhow::Error> for StellarError {
    fn from(err: anyhow::Error) -> Self {
        Self::Internal(err.to_string())
    }
}

/// A type alias for `Result<T, StellarError>`.
pub type Result<T> = std::result::Result<T, StellarError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_io_errors_count_as_persistence() {
        let err: StellarError = std::io::Error::new(std::io::ErrorKind::Other, "disk full").into();
        assert!(err.is_persistence());
        assert!(!err.is_not_found());
    }

    #[test]
    fn test_no_active_session_is_not_found() {
        assert!(StellarError::NoActiveSession.is_not_found());
        assert!(StellarError::not_found("session", "abc").is_not_found());
    }

    #[test]
    fn test_auth_error_converts() {
        let err: StellarError = AuthError::Expired.into();
        assert!(err.is_auth());
        assert_eq!(err.to_string(), "Authentication error: Token expired");
    }
}
