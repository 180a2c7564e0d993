//! HTTP rendering of `StellarError`.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;
use stellar_core::auth::AuthError;
use stellar_core::error::StellarError;

/// Error returned by HTTP handlers, rendered as `{"error": "..."}`.
#[derive(Debug)]
pub struct ApiError(pub StellarError);

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match &self.0 {
            StellarError::Auth(AuthError::Missing) => StatusCode::FORBIDDEN,
            StellarError::Auth(_) => StatusCode::UNAUTHORIZED,
            StellarError::InvalidInput(_) => StatusCode::BAD_REQUEST,
            StellarError::NoActiveSession | StellarError::NotFound { .. } => StatusCode::NOT_FOUND,
            StellarError::ExternalService { .. } => StatusCode::BAD_GATEWAY,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn public_message(&self) -> String {
        match &self.0 {
            StellarError::Auth(AuthError::Missing) => "No token provided".to_string(),
            StellarError::Auth(_) => "Invalid token".to_string(),
            StellarError::InvalidInput(message) => message.clone(),
            StellarError::NoActiveSession => "No active session found".to_string(),
            StellarError::NotFound { .. } => self.0.to_string(),
            StellarError::ExternalService { service, .. } => {
                format!("The {service} service is unavailable")
            }
            _ => "Internal server error".to_string(),
        }
    }
}

impl From<StellarError> for ApiError {
    fn from(err: StellarError) -> Self {
        Self(err)
    }
}

impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        Self(StellarError::Auth(err))
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(error = %self.0, status = status.as_u16(), "Request failed");
        } else {
            tracing::debug!(error = %self.0, status = status.as_u16(), "Request rejected");
        }
        (status, Json(json!({ "error": self.public_message() }))).into_response()
    }
}
