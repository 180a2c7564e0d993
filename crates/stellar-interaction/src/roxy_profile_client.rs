//! RoxyProfileClient - REST implementation of `ProfileProvider` backed by the
//! RoxyAPI birth-chart endpoint.

use crate::http_error::{status_error, transport_error};
use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use stellar_core::collaborator::{CollaboratorError, ProfileProvider, ProfileRequest};
use stellar_core::config::ProfileServiceConfig;
use stellar_core::error::{Result, StellarError};

const SERVICE: &str = "RoxyAPI";

/// Profile provider that requests a birth chart over HTTP.
///
/// The response body is returned untouched; it becomes the session's
/// profile snapshot.
#[derive(Clone)]
pub struct RoxyProfileClient {
    client: Client,
    base_url: String,
    api_key: String,
}

/// Body expected by the birth-chart endpoint.
#[derive(Debug, Serialize)]
struct BirthChartRequest<'a> {
    name: &'a str,
    birthdate: &'a str,
    time_of_birth: &'a str,
    place: &'a str,
}

impl<'a> From<&'a ProfileRequest> for BirthChartRequest<'a> {
    fn from(request: &'a ProfileRequest) -> Self {
        Self {
            name: &request.name,
            birthdate: &request.date,
            time_of_birth: &request.time,
            place: &request.place,
        }
    }
}

impl RoxyProfileClient {
    /// Builds a client from the `[profile]` config section.
    ///
    /// # Errors
    ///
    /// Returns `Config` if no API key is configured or the HTTP client cannot
    /// be built.
    pub fn from_config(config: &ProfileServiceConfig) -> Result<Self> {
        let api_key = config
            .api_key
            .clone()
            .filter(|key| !key.trim().is_empty())
            .ok_or_else(|| {
                StellarError::config("profile.api_key is required (or set ROXY_API_KEY)")
            })?;

        let client = Client::builder()
            .timeout(config.timeout())
            .build()
            .map_err(|e| StellarError::config(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url: config.base_url.clone(),
            api_key,
        })
    }
}

#[async_trait]
impl ProfileProvider for RoxyProfileClient {
    async fn fetch_profile(
        &self,
        request: &ProfileRequest,
    ) -> std::result::Result<serde_json::Value, CollaboratorError> {
        tracing::debug!(url = %self.base_url, "Requesting birth chart");

        let response = self
            .client
            .post(&self.base_url)
            .header("x-api-key", &self.api_key)
            .json(&BirthChartRequest::from(request))
            .send()
            .await
            .map_err(|err| transport_error(SERVICE, err))?;

        if !response.status().is_success() {
            let status = response.status();
            let body_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Failed to read RoxyAPI error body".to_string());
            return Err(status_error(status, body_text));
        }

        let snapshot: serde_json::Value = response
            .json()
            .await
            .map_err(|err| CollaboratorError::Malformed(format!("RoxyAPI response: {err}")))?;

        if snapshot.is_null() {
            return Err(CollaboratorError::EmptyResponse);
        }
        Ok(snapshot)
    }
}
