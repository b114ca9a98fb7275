use crate::dispatcher::{ChatBackend, Completion, Provider, TokenUsage};
use crate::error::{ProviderError, Upstream};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

const OPENAI_API_URL: &str = "https://api.openai.com/v1/chat/completions";
const REQUEST_TIMEOUT_SECS: u64 = 60; // 60 second timeout for API requests

pub const DEFAULT_OPENAI_MODEL: &str = "gpt-4o";

const DEFAULT_MAX_TOKENS: u32 = 1024;
const DEFAULT_TEMPERATURE: f32 = 0.8;

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    pub fn new(role: &str, content: impl Into<String>) -> Self {
        Self {
            role: role.to_string(),
            content: content.into(),
        }
    }
}

#[derive(Debug, Serialize)]
struct ChatCompletionRequest {
    model: String,
    messages: Vec<ChatMessage>,
    temperature: f32,
    max_tokens: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<Choice>,
    #[serde(default)]
    model: Option<String>,
    #[serde(default)]
    usage: Option<ResponseUsage>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ResponseUsage {
    prompt_tokens: u32,
    completion_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct OpenAIError {
    error: OpenAIErrorDetails,
}

#[derive(Debug, Deserialize)]
struct OpenAIErrorDetails {
    message: String,
    #[serde(rename = "type", default)]
    error_type: Option<String>,
    #[serde(default)]
    code: Option<String>,
}

pub struct OpenAIClient {
    client: Client,
    api_key: String,
}

impl OpenAIClient {
    pub fn new(api_key: &str) -> Result<Self, ProviderError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .connect_timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| ProviderError::Request {
                upstream: Upstream::OpenAI,
                message: e.to_string(),
            })?;

        Ok(Self {
            client,
            api_key: api_key.to_string(),
        })
    }

    pub async fn chat_completion(
        &self,
        model: &str,
        messages: Vec<ChatMessage>,
        temperature: f32,
        max_tokens: Option<u32>,
    ) -> Result<Completion, ProviderError> {
        let request = ChatCompletionRequest {
            model: model.to_string(),
            messages,
            temperature,
            max_tokens: max_tokens.or(Some(DEFAULT_MAX_TOKENS)),
        };

        let response = self
            .client
            .post(OPENAI_API_URL)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(&request)
            .send()
            .await
            .map_err(|e| ProviderError::from_reqwest(Upstream::OpenAI, e))?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let error_text = response
                .text()
                .await
                .map_err(|e| ProviderError::from_reqwest(Upstream::OpenAI, e))?;
            return Err(parse_error(status, &error_text));
        }

        let completion: ChatCompletionResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::from_reqwest(Upstream::OpenAI, e))?;

        let text = completion
            .choices
            .first()
            .and_then(|c| c.message.content.clone())
            .filter(|t| !t.trim().is_empty())
            .ok_or(ProviderError::EmptyResponse(Upstream::OpenAI))?;

        Ok(Completion {
            text,
            model: completion.model.unwrap_or_else(|| model.to_string()),
            usage: completion.usage.map(|u| TokenUsage {
                input_tokens: u.prompt_tokens,
                output_tokens: u.completion_tokens,
            }),
        })
    }
}

#[async_trait]
impl ChatBackend for OpenAIClient {
    fn provider(&self) -> Provider {
        Provider::OpenAI
    }

    async fn complete(
        &self,
        model: &str,
        system_prompt: &str,
        messages: Vec<ChatMessage>,
    ) -> Result<Completion, ProviderError> {
        self.chat_completion(model, with_system_message(system_prompt, messages), DEFAULT_TEMPERATURE, None)
            .await
    }
}

/// OpenAI takes the system prompt as the first message of the transcript.
pub fn with_system_message(system_prompt: &str, messages: Vec<ChatMessage>) -> Vec<ChatMessage> {
    let mut all = Vec::with_capacity(messages.len() + 1);
    all.push(ChatMessage::new("system", system_prompt));
    all.extend(messages);
    all
}

fn parse_error(status: u16, body: &str) -> ProviderError {
    match serde_json::from_str::<OpenAIError>(body) {
        Ok(parsed) => ProviderError::Status {
            upstream: Upstream::OpenAI,
            status,
            // "model_not_found" arrives as the code, not the type
            error_type: parsed.error.code.or(parsed.error.error_type),
            message: parsed.error.message,
        },
        Err(_) => ProviderError::Status {
            upstream: Upstream::OpenAI,
            status,
            error_type: None,
            message: body.to_string(),
        },
    }
}
