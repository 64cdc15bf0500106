//! OpenAiApiAssistant - interviewer backed by an OpenAI-compatible
//! chat completions endpoint.

use crate::assistant::{Assistant, ChatContext, HintContext};
use crate::error::InteractionError;
use crate::prompt::{SYSTEM_PROMPT, chat_prompt, hint_prompt};
use async_trait::async_trait;
use proctor_core::config::AssistantConfig;
use proctor_core::session::MessageRole;
use reqwest::{Client, StatusCode, header::HeaderValue};
use serde::{Deserialize, Serialize};
use std::time::Duration;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);
/// Hints are meant to be short.
const HINT_MAX_TOKENS: u32 = 200;

/// Assistant implementation that talks to the chat completions HTTP API.
#[derive(Clone)]
pub struct OpenAiApiAssistant {
    client: Client,
    endpoint: String,
    api_key: String,
    model: String,
    max_tokens: u32,
    temperature: f32,
}

impl OpenAiApiAssistant {
    /// Creates an assistant from configuration.
    ///
    /// # Errors
    ///
    /// Returns `InteractionError::InvalidRequest` if the HTTP client cannot be built.
    pub fn from_config(config: &AssistantConfig) -> Result<Self, InteractionError> {
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| InteractionError::InvalidRequest(e.to_string()))?;

        Ok(Self {
            client,
            endpoint: format!("{}/chat/completions", config.base_url.trim_end_matches('/')),
            api_key: config.api_key.clone(),
            model: config.model.clone(),
            max_tokens: config.max_tokens,
            temperature: config.temperature,
        })
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    async fn send_request(&self, body: &ChatCompletionRequest) -> Result<String, InteractionError> {
        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(body)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let retry_after = parse_retry_after(response.headers().get("retry-after"));
            let body_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Failed to read error body".to_string());
            return Err(map_http_error(status, body_text, retry_after));
        }

        let parsed: ChatCompletionResponse = response.json().await.map_err(|err| {
            InteractionError::InvalidResponse(format!("Failed to parse completion: {err}"))
        })?;

        extract_text_response(parsed)
    }
}

#[async_trait]
impl Assistant for OpenAiApiAssistant {
    async fn reply(&self, context: &ChatContext, message: &str) -> Result<String, InteractionError> {
        let mut messages = vec![WireMessage::system(SYSTEM_PROMPT)];
        messages.extend(context.history.iter().map(|m| WireMessage {
            role: match m.role {
                MessageRole::User => "user",
                MessageRole::Assistant => "assistant",
            },
            content: m.content.clone(),
        }));
        messages.push(WireMessage::user(chat_prompt(context, message)));

        let request = ChatCompletionRequest {
            model: self.model.clone(),
            messages,
            max_tokens: self.max_tokens,
            temperature: self.temperature,
        };

        tracing::debug!(
            "[OpenAiApiAssistant] Chat request to {} ({} messages)",
            self.model,
            request.messages.len()
        );
        self.send_request(&request).await
    }

    async fn hint(&self, context: &HintContext) -> Result<String, InteractionError> {
        let request = ChatCompletionRequest {
            model: self.model.clone(),
            messages: vec![
                WireMessage::system(SYSTEM_PROMPT),
                WireMessage::user(hint_prompt(context)),
            ],
            max_tokens: HINT_MAX_TOKENS.min(self.max_tokens),
            temperature: self.temperature,
        };

        tracing::debug!("[OpenAiApiAssistant] Hint request to {}", self.model);
        self.send_request(&request).await
    }
}

#[derive(Serialize)]
struct ChatCompletionRequest {
    model: String,
    messages: Vec<WireMessage>,
    max_tokens: u32,
    temperature: f32,
}

#[derive(Serialize)]
struct WireMessage {
    role: &'static str,
    content: String,
}

impl WireMessage {
    fn system(content: &str) -> Self {
        Self {
            role: "system",
            content: content.to_string(),
        }
    }

    fn user(content: String) -> Self {
        Self {
            role: "user",
            content,
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

#[derive(Deserialize)]
struct ErrorResponse {
    error: ErrorBody,
}

#[derive(Deserialize)]
struct ErrorBody {
    message: String,
}

fn extract_text_response(response: ChatCompletionResponse) -> Result<String, InteractionError> {
    response
        .choices
        .into_iter()
        .next()
        .and_then(|choice| choice.message.content)
        .filter(|content| !content.trim().is_empty())
        .ok_or_else(|| InteractionError::InvalidResponse("completion had no content".into()))
}

fn map_http_error(
    status: StatusCode,
    body: String,
    retry_after: Option<Duration>,
) -> InteractionError {
    let message = serde_json::from_str::<ErrorResponse>(&body)
        .map(|wrapper| wrapper.error.message)
        .unwrap_or(body);

    let retryable = matches!(
        status,
        StatusCode::TOO_MANY_REQUESTS
            | StatusCode::INTERNAL_SERVER_ERROR
            | StatusCode::BAD_GATEWAY
            | StatusCode::SERVICE_UNAVAILABLE
            | StatusCode::GATEWAY_TIMEOUT
    );

    InteractionError::Http {
        status: status.as_u16(),
        message,
        retryable,
        retry_after,
    }
}

fn parse_retry_after(header: Option<&HeaderValue>) -> Option<Duration> {
    let value = header?.to_str().ok()?;
    value.trim().parse::<u64>().ok().map(Duration::from_secs)
}
