//! Chat completion (response generation)

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};

use crate::error::GenerationError;

/// System instruction sent with every question
pub const SYSTEM_PROMPT: &str =
    "You are a helpful AI assistant that provides clear and concise responses.";

/// Default OpenAI-compatible API base (Groq)
pub const DEFAULT_LLM_BASE_URL: &str = "https://api.groq.com/openai/v1";

/// Default chat model
pub const DEFAULT_LLM_MODEL: &str = "mixtral-8x7b-32768";

/// Sampling parameters for one completion
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GenerationParams {
    /// Temperature in `[0, 2]`
    pub temperature: f32,
    /// Completion token cap, greater than zero
    pub max_tokens: u32,
}

impl Default for GenerationParams {
    fn default() -> Self {
        Self {
            temperature: 0.7,
            max_tokens: 2048,
        }
    }
}

impl GenerationParams {
    /// Check parameter ranges
    ///
    /// # Errors
    ///
    /// Returns `GenerationError::InvalidRequest` for out-of-range values
    pub fn validate(&self) -> Result<(), GenerationError> {
        if !(0.0..=2.0).contains(&self.temperature) {
            return Err(GenerationError::InvalidRequest(format!(
                "temperature must be within [0, 2], got {}",
                self.temperature
            )));
        }
        if self.max_tokens == 0 {
            return Err(GenerationError::InvalidRequest(
                "max_tokens must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}

/// Produces an assistant reply for a question
#[async_trait]
pub trait ResponseGenerator: Send + Sync {
    /// Generate a reply to `question` under `system_prompt`
    ///
    /// # Errors
    ///
    /// `EmptyResponse` when no completion comes back, `Upstream` for any
    /// service failure, `InvalidRequest` for out-of-range parameters
    async fn generate(
        &self,
        question: &str,
        system_prompt: &str,
        params: GenerationParams,
    ) -> Result<String, GenerationError>;
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
enum Role {
    System,
    User,
    Assistant,
}

#[derive(Debug, Serialize)]
struct RequestMessage<'a> {
    role: Role,
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: [RequestMessage<'a>; 2],
    temperature: f32,
    max_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    #[serde(default)]
    choices: Vec<ChatCompletionChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionChoice {
    message: ResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    #[allow(dead_code)]
    role: Option<Role>,
    content: Option<String>,
}

/// Client for an OpenAI-compatible `/chat/completions` endpoint
pub struct ChatCompletionClient {
    client: reqwest::Client,
    api_key: SecretString,
    base_url: String,
    model: String,
}

impl ChatCompletionClient {
    /// Create a new chat completion client
    #[must_use]
    pub fn new(
        client: reqwest::Client,
        api_key: SecretString,
        base_url: &str,
        model: String,
    ) -> Self {
        Self {
            client,
            api_key,
            base_url: base_url.trim_end_matches('/').to_string(),
            model,
        }
    }

    /// Model identifier sent with each request
    #[must_use]
    pub fn model(&self) -> &str {
        &self.model
    }
}

#[async_trait]
impl ResponseGenerator for ChatCompletionClient {
    async fn generate(
        &self,
        question: &str,
        system_prompt: &str,
        params: GenerationParams,
    ) -> Result<String, GenerationError> {
        params.validate()?;

        let request = ChatCompletionRequest {
            model: &self.model,
            messages: [
                RequestMessage {
                    role: Role::System,
                    content: system_prompt,
                },
                RequestMessage {
                    role: Role::User,
                    content: question,
                },
            ],
            temperature: params.temperature,
            max_tokens: params.max_tokens,
        };

        tracing::debug!(
            model = %self.model,
            question_len = question.len(),
            temperature = params.temperature,
            max_tokens = params.max_tokens,
            "sending chat completion request"
        );

        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(self.api_key.expose_secret())
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                tracing::error!(error = %e, "chat completion request failed");
                GenerationError::Upstream {
                    status: None,
                    message: e.to_string(),
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::error!(status = %status, body = %body, "chat completion API error");
            return Err(GenerationError::Upstream {
                status: Some(status.as_u16()),
                message: body,
            });
        }

        let completion: ChatCompletionResponse =
            response.json().await.map_err(|e| GenerationError::Upstream {
                status: Some(status.as_u16()),
                message: format!("malformed completion: {e}"),
            })?;

        let text = completion
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .filter(|t| !t.trim().is_empty())
            .ok_or(GenerationError::EmptyResponse)?;

        tracing::debug!(response_len = text.len(), "chat completion received");
        Ok(text)
    }
}
