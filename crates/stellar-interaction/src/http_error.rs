//! Mapping of `reqwest` failures onto `CollaboratorError`.

use reqwest::StatusCode;
use serde::Deserialize;
use stellar_core::collaborator::CollaboratorError;

#[derive(Deserialize)]
struct ErrorResponse {
    error: ErrorBody,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum ErrorBody {
    Detailed { message: String },
    Plain(String),
}

pub(crate) fn transport_error(service: &str, err: reqwest::Error) -> CollaboratorError {
    if err.is_timeout() {
        return CollaboratorError::Timeout;
    }
    CollaboratorError::Transport {
        message: format!("{service} request failed: {err}"),
        is_retryable: err.is_connect(),
    }
}

/// Builds the error for a non-success status, preferring the service's own
/// `{"error": ...}` message over the raw body.
pub(crate) fn status_error(status: StatusCode, body: String) -> CollaboratorError {
    let message = serde_json::from_str::<ErrorResponse>(&body)
        .map(|wrapper| match wrapper.error {
            ErrorBody::Detailed { message } => message,
            ErrorBody::Plain(message) => message,
        })
        .unwrap_or(body);

    let is_retryable = matches!(
        status,
        StatusCode::TOO_MANY_REQUESTS
            | StatusCode::INTERNAL_SERVER_ERROR
            | StatusCode::BAD_GATEWAY
            | StatusCode::SERVICE_UNAVAILABLE
            | StatusCode::GATEWAY_TIMEOUT
    );

    CollaboratorError::Http {
        status: status.as_u16(),
        message,
        is_retryable,
    }
}
