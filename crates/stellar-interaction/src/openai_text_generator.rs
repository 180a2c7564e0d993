//! OpenAiTextGenerator - REST implementation of `TextGenerator` for the
//! OpenAI Chat Completions API.

use crate::http_error::{status_error, transport_error};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use stellar_core::collaborator::{CollaboratorError, GenerationRequest, TextGenerator};
use stellar_core::config::GenerationConfig;
use stellar_core::error::{Result, StellarError};
use stellar_core::session::Sender;

const SERVICE: &str = "OpenAI";

/// Text generator that talks to the OpenAI HTTP API.
#[derive(Clone)]
pub struct OpenAiTextGenerator {
    client: Client,
    base_url: String,
    api_key: String,
    model: String,
    max_tokens: Option<u32>,
}

impl OpenAiTextGenerator {
    /// Builds a generator from the `[generation]` config section.
    ///
    /// # Errors
    ///
    /// Returns `Config` if no API key is configured or the HTTP client cannot
    /// be built.
    pub fn from_config(config: &GenerationConfig) -> Result<Self> {
        let api_key = config
            .api_key
            .clone()
            .filter(|key| !key.trim().is_empty())
            .ok_or_else(|| {
                StellarError::config("generation.api_key is required (or set OPENAI_API_KEY)")
            })?;

        let client = Client::builder()
            .timeout(config.timeout())
            .build()
            .map_err(|e| StellarError::config(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url: config.base_url.clone(),
            api_key,
            model: config.model.clone(),
            max_tokens: config.max_tokens,
        })
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    fn build_request(&self, request: &GenerationRequest) -> ChatCompletionRequest {
        let mut messages = Vec::with_capacity(request.context.len() + 2);
        messages.push(ChatMessage::new("developer", &request.persona_instruction));
        messages.extend(request.context.iter().map(|turn| {
            let role = match turn.sender {
                Sender::User => "user",
                Sender::Advisor => "assistant",
            };
            ChatMessage::new(role, &turn.text)
        }));
        messages.push(ChatMessage::new("user", &request.text));

        ChatCompletionRequest {
            model: self.model.clone(),
            messages,
            max_tokens: self.max_tokens,
        }
    }

    async fn send_request(
        &self,
        body: &ChatCompletionRequest,
    ) -> std::result::Result<String, CollaboratorError> {
        let response = self
            .client
            .post(&self.base_url)
            .bearer_auth(&self.api_key)
            .json(body)
            .send()
            .await
            .map_err(|err| transport_error(SERVICE, err))?;

        if !response.status().is_success() {
            let status = response.status();
            let body_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Failed to read OpenAI error body".to_string());
            return Err(status_error(status, body_text));
        }

        let parsed: ChatCompletionResponse = response
            .json()
            .await
            .map_err(|err| CollaboratorError::Malformed(format!("OpenAI response: {err}")))?;

        extract_text_response(parsed)
    }
}

#[async_trait]
impl TextGenerator for OpenAiTextGenerator {
    async fn generate(
        &self,
        request: &GenerationRequest,
    ) -> std::result::Result<String, CollaboratorError> {
        let body = self.build_request(request);
        tracing::debug!(
            model = %self.model,
            turns = body.messages.len(),
            "Sending chat completion request"
        );
        self.send_request(&body).await
    }
}

#[derive(Debug, Serialize)]
struct ChatCompletionRequest {
    model: String,
    messages: Vec<ChatMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
}

#[derive(Debug, Serialize)]
struct ChatMessage {
    role: &'static str,
    content: String,
}

impl ChatMessage {
    fn new(role: &'static str, content: &str) -> Self {
        Self {
            role,
            content: content.to_string(),
        }
    }
}

#[derive(Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Deserialize)]
struct ResponseMessage {
    content: Option<String>,
}

fn extract_text_response(
    response: ChatCompletionResponse,
) -> std::result::Result<String, CollaboratorError> {
    response
        .choices
        .into_iter()
        .next()
        .and_then(|choice| choice.message.content)
        .map(|content| content.trim().to_string())
        .filter(|content| !content.is_empty())
        .ok_or(CollaboratorError::EmptyResponse)
}
