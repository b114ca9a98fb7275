use crate::dispatcher::{ChatBackend, Completion, Provider, TokenUsage};
use crate::error::{ProviderError, Upstream};
use crate::openai::ChatMessage;
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

const ANTHROPIC_API_URL: &str = "https://api.anthropic.com/v1/messages";
const ANTHROPIC_VERSION: &str = "2023-06-01";
const REQUEST_TIMEOUT_SECS: u64 = 30;

// Model constants
pub const CLAUDE_SONNET: &str = "claude-sonnet-4-20250514";
pub const CLAUDE_SONNET_3_7: &str = "claude-3-7-sonnet-20250219";
pub const CLAUDE_HAIKU: &str = "claude-3-5-haiku-20241022";

/// Primary model first, then fallbacks.
pub const DEFAULT_CLAUDE_MODELS: [&str; 3] = [CLAUDE_SONNET, CLAUDE_SONNET_3_7, CLAUDE_HAIKU];

const DEFAULT_MAX_TOKENS: u32 = 1024;
const DEFAULT_TEMPERATURE: f32 = 0.7;

#[derive(Debug, Serialize, Clone, PartialEq)]
pub struct AnthropicMessage {
    pub role: String,
    pub content: String,
}

#[derive(Debug, Serialize)]
struct MessagesRequest {
    model: String,
    max_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<String>,
    messages: Vec<AnthropicMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
}

#[derive(Debug, Deserialize)]
struct MessagesResponse {
    content: Vec<ContentBlock>,
    #[serde(default)]
    model: Option<String>,
    #[serde(default)]
    usage: Option<ResponseUsage>,
}

#[derive(Debug, Deserialize)]
struct ContentBlock {
    #[serde(rename = "type")]
    content_type: String,
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ResponseUsage {
    input_tokens: u32,
    output_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct AnthropicError {
    error: ErrorDetails,
}

#[derive(Debug, Deserialize)]
struct ErrorDetails {
    message: String,
    #[serde(rename = "type")]
    error_type: String,
}

pub struct AnthropicClient {
    client: Client,
    api_key: String,
}

impl AnthropicClient {
    pub fn new(api_key: &str) -> Result<Self, ProviderError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .connect_timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| ProviderError::Request {
                upstream: Upstream::Claude,
                message: e.to_string(),
            })?;

        Ok(Self {
            client,
            api_key: api_key.to_string(),
        })
    }

    /// One Messages API call against a single model. No fallback here.
    pub async fn chat_completion(
        &self,
        model: &str,
        system_prompt: Option<&str>,
        messages: Vec<AnthropicMessage>,
        temperature: f32,
        max_tokens: Option<u32>,
    ) -> Result<Completion, ProviderError> {
        let request = MessagesRequest {
            model: model.to_string(),
            max_tokens: max_tokens.unwrap_or(DEFAULT_MAX_TOKENS),
            system: system_prompt.map(|s| s.to_string()),
            messages,
            temperature: Some(temperature),
        };

        let response = self
            .client
            .post(ANTHROPIC_API_URL)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .header("Content-Type", "application/json")
            .json(&request)
            .send()
            .await
            .map_err(|e| ProviderError::from_reqwest(Upstream::Claude, e))?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let error_text = response
                .text()
                .await
                .map_err(|e| ProviderError::from_reqwest(Upstream::Claude, e))?;
            return Err(parse_error(status, &error_text));
        }

        let completion: MessagesResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::from_reqwest(Upstream::Claude, e))?;

        // Last text block wins
        let text = completion
            .content
            .iter()
            .filter(|c| c.content_type == "text")
            .last()
            .and_then(|c| c.text.clone())
            .filter(|t| !t.trim().is_empty())
            .ok_or(ProviderError::EmptyResponse(Upstream::Claude))?;

        Ok(Completion {
            text,
            model: completion.model.unwrap_or_else(|| model.to_string()),
            usage: completion.usage.map(|u| TokenUsage {
                input_tokens: u.input_tokens,
                output_tokens: u.output_tokens,
            }),
        })
    }
}

#[async_trait]
impl ChatBackend for AnthropicClient {
    fn provider(&self) -> Provider {
        Provider::Claude
    }

    async fn complete(
        &self,
        model: &str,
        system_prompt: &str,
        messages: Vec<ChatMessage>,
    ) -> Result<Completion, ProviderError> {
        let (extra_system, messages) = convert_messages(messages);
        let system = match extra_system {
            Some(extra) => format!("{}\n\n{}", system_prompt, extra),
            None => system_prompt.to_string(),
        };
        self.chat_completion(model, Some(&system), messages, DEFAULT_TEMPERATURE, None)
            .await
    }
}

/// Turn a non-2xx body into a typed error, keeping Anthropic's error type when present.
fn parse_error(status: u16, body: &str) -> ProviderError {
    match serde_json::from_str::<AnthropicError>(body) {
        Ok(parsed) => ProviderError::Status {
            upstream: Upstream::Claude,
            status,
            error_type: Some(parsed.error.error_type),
            message: parsed.error.message,
        },
        Err(_) => ProviderError::Status {
            upstream: Upstream::Claude,
            status,
            error_type: None,
            message: body.to_string(),
        },
    }
}

/// Helper to convert OpenAI-style messages to Anthropic format
/// Extracts system messages and returns (system_prompt, messages).
/// Consecutive same-role messages are merged and leading assistant
/// messages dropped: the Messages API wants user-first alternation.
pub fn convert_messages(messages: Vec<ChatMessage>) -> (Option<String>, Vec<AnthropicMessage>) {
    let mut system_prompt: Option<String> = None;
    let mut anthropic_messages: Vec<AnthropicMessage> = Vec::new();

    for msg in messages {
        if msg.role == "system" {
            system_prompt = Some(match system_prompt {
                Some(existing) => format!("{}\n\n{}", existing, msg.content),
                None => msg.content,
            });
            continue;
        }

        if anthropic_messages.is_empty() && msg.role != "user" {
            continue;
        }

        match anthropic_messages.last_mut() {
            Some(last) if last.role == msg.role => {
                last.content.push_str("\n\n");
                last.content.push_str(&msg.content);
            }
            _ => anthropic_messages.push(AnthropicMessage {
                role: msg.role,
                content: msg.content,
            }),
        }
    }

    (system_prompt, anthropic_messages)
}
