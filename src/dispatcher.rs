//! Provider dispatch
//!
//! Picks the upstream provider for a feature, renders the persona's system
//! prompt, maps the transcript into the provider's message shape and walks the
//! model fallback list until one model answers.

use crate::anthropic::AnthropicClient;
use crate::config::AppConfig;
use crate::conversation::ConversationTurn;
use crate::error::{AppError, ProviderError, Upstream};
use crate::logging;
use crate::openai::{ChatMessage, OpenAIClient};
use crate::personas::{Feature, PersonaId, PersonaRegistry};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;

/// Most recent turns forwarded upstream.
const MAX_HISTORY_TURNS: usize = 20;

// ============ Provider Types ============

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    Claude,
    OpenAI,
}

impl Provider {
    pub fn as_str(&self) -> &'static str {
        match self {
            Provider::Claude => "claude",
            Provider::OpenAI => "openai",
        }
    }

    fn upstream(&self) -> Upstream {
        match self {
            Provider::Claude => Upstream::Claude,
            Provider::OpenAI => Upstream::OpenAI,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenUsage {
    pub input_tokens: u32,
    pub output_tokens: u32,
}

impl TokenUsage {
    pub fn total(&self) -> u32 {
        self.input_tokens + self.output_tokens
    }
}

/// Normalized answer from one upstream call.
#[derive(Debug, Clone, PartialEq)]
pub struct Completion {
    pub text: String,
    pub model: String,
    pub usage: Option<TokenUsage>,
}

/// One upstream chat API. The backend decides where the system prompt goes.
#[async_trait]
pub trait ChatBackend: Send + Sync {
    fn provider(&self) -> Provider;

    async fn complete(
        &self,
        model: &str,
        system_prompt: &str,
        messages: Vec<ChatMessage>,
    ) -> Result<Completion, ProviderError>;
}

// ============ Policies ============

/// Static feature -> provider table, with optional per-persona overrides.
#[derive(Debug, Clone)]
pub struct ProviderPolicy {
    by_feature: HashMap<Feature, Provider>,
    overrides: HashMap<(PersonaId, Feature), Provider>,
}

impl Default for ProviderPolicy {
    fn default() -> Self {
        let by_feature = HashMap::from([
            (Feature::Chat, Provider::Claude),
            (Feature::Journal, Provider::Claude),
            (Feature::Debate, Provider::OpenAI),
        ]);
        Self {
            by_feature,
            overrides: HashMap::new(),
        }
    }
}

impl ProviderPolicy {
    pub fn with_override(mut self, persona: PersonaId, feature: Feature, provider: Provider) -> Self {
        self.overrides.insert((persona, feature), provider);
        self
    }

    pub fn select(&self, feature: Feature, persona: Option<PersonaId>) -> Provider {
        persona
            .and_then(|p| self.overrides.get(&(p, feature)).copied())
            .or_else(|| self.by_feature.get(&feature).copied())
            .unwrap_or(Provider::Claude)
    }
}

/// Ordered model candidates plus the predicate deciding when to move on.
#[derive(Debug, Clone)]
pub struct FallbackPolicy {
    candidates: Vec<String>,
    retryable: fn(&ProviderError) -> bool,
}

impl FallbackPolicy {
    pub fn new(candidates: Vec<String>) -> Self {
        Self {
            candidates,
            retryable: ProviderError::is_model_unavailable,
        }
    }

    pub fn single(model: &str) -> Self {
        Self::new(vec![model.to_string()])
    }

    pub fn candidates(&self) -> &[String] {
        &self.candidates
    }

    /// Try each candidate in order. Stops at the first success or the first
    /// non-retryable error; returns the last error once the list runs out.
    pub async fn run(
        &self,
        backend: &dyn ChatBackend,
        system_prompt: &str,
        messages: &[ChatMessage],
    ) -> Result<Completion, ProviderError> {
        let upstream = backend.provider().upstream();
        let mut last_error: Option<ProviderError> = None;

        for model in &self.candidates {
            match backend.complete(model, system_prompt, messages.to_vec()).await {
                Ok(completion) => return Ok(completion),
                Err(err) if (self.retryable)(&err) => {
                    logging::log_dispatch(None, &format!("Model {} unavailable, trying next: {}", model, err));
                    last_error = Some(err);
                }
                Err(err) => return Err(err),
            }
        }

        Err(last_error.unwrap_or(ProviderError::Request {
            upstream,
            message: "no models configured".to_string(),
        }))
    }
}

// ============ Admission Control ============

/// Caller-tracked daily token usage (`userTokenUsage` in requests).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DailyUsage {
    #[serde(default)]
    pub daily_used: u64,
    #[serde(default)]
    pub date: Option<String>,
}

/// Reject locally once usage has reached the limit. No limit means no check.
pub fn check_token_limit(usage: Option<&DailyUsage>, limit: Option<u64>) -> Result<(), AppError> {
    match (usage, limit) {
        (Some(usage), Some(limit)) if usage.daily_used >= limit => Err(AppError::TokenLimit),
        _ => Ok(()),
    }
}

// ============ Dispatcher ============

#[derive(Debug, Clone)]
pub struct DispatchRequest {
    pub persona_id: String,
    pub user_text: String,
    pub history: Vec<ConversationTurn>,
    pub user_context: String,
    pub feature: Feature,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Reply {
    pub text: String,
    pub philosopher_id: String,
    pub provider: Provider,
    pub model: String,
    pub usage: Option<TokenUsage>,
}

pub struct Dispatcher {
    registry: Arc<PersonaRegistry>,
    policy: ProviderPolicy,
    claude: Option<Arc<dyn ChatBackend>>,
    openai: Option<Arc<dyn ChatBackend>>,
    claude_fallback: FallbackPolicy,
    openai_fallback: FallbackPolicy,
}

impl Dispatcher {
    pub fn new(
        registry: Arc<PersonaRegistry>,
        claude: Option<Arc<dyn ChatBackend>>,
        openai: Option<Arc<dyn ChatBackend>>,
        claude_models: Vec<String>,
        openai_model: &str,
    ) -> Self {
        Self {
            registry,
            policy: ProviderPolicy::default(),
            claude,
            openai,
            claude_fallback: FallbackPolicy::new(claude_models),
            openai_fallback: FallbackPolicy::single(openai_model),
        }
    }

    /// Real HTTP clients for whichever API keys are configured.
    pub fn from_config(config: &AppConfig, registry: Arc<PersonaRegistry>) -> Result<Self, ProviderError> {
        let claude: Option<Arc<dyn ChatBackend>> = match &config.anthropic_api_key {
            Some(key) => Some(Arc::new(AnthropicClient::new(key)?)),
            None => None,
        };
        let openai: Option<Arc<dyn ChatBackend>> = match &config.openai_api_key {
            Some(key) => Some(Arc::new(OpenAIClient::new(key)?)),
            None => None,
        };

        Ok(Self::new(
            registry,
            claude,
            openai,
            config.claude_models.clone(),
            &config.openai_model,
        ))
    }

    pub fn with_policy(mut self, policy: ProviderPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn registry(&self) -> &PersonaRegistry {
        &self.registry
    }

    pub fn select_provider(&self, feature: Feature, persona_id: &str) -> Provider {
        self.policy.select(feature, PersonaId::from_str(persona_id))
    }

    /// Persona prompt, or the generic one when the id is unknown.
    pub fn system_prompt(&self, persona_id: &str, feature: Feature, user_context: &str) -> String {
        match self.registry.get_persona(persona_id) {
            Some(persona) => persona.render(feature, user_context),
            None => {
                logging::log_persona(None, &format!("Unknown persona '{}', using default prompt", persona_id));
                self.registry.default_prompt(feature, user_context)
            }
        }
    }

    /// Send with the provider chosen by the policy table.
    pub async fn send_message(&self, request: &DispatchRequest) -> Result<Reply, ProviderError> {
        let provider = self.select_provider(request.feature, &request.persona_id);
        self.send_with(provider, request).await
    }

    /// Send with a pinned provider.
    pub async fn send_with(&self, provider: Provider, request: &DispatchRequest) -> Result<Reply, ProviderError> {
        let (backend, fallback) = match provider {
            Provider::Claude => (self.claude.as_ref(), &self.claude_fallback),
            Provider::OpenAI => (self.openai.as_ref(), &self.openai_fallback),
        };
        let backend = backend.ok_or(ProviderError::MissingApiKey(provider.upstream()))?;

        let system_prompt = self.system_prompt(&request.persona_id, request.feature, &request.user_context);
        let mut messages = history_to_messages(&self.registry, &request.history, &request.persona_id);
        messages.push(ChatMessage::new("user", request.user_text.clone()));

        logging::log_dispatch(
            None,
            &format!(
                "{} -> {} (feature={}, history={})",
                request.persona_id,
                provider.as_str(),
                request.feature.as_str(),
                messages.len() - 1
            ),
        );

        let completion = fallback.run(backend.as_ref(), &system_prompt, &messages).await?;

        logging::log_dispatch(None, &format!("{} answered via {}", request.persona_id, completion.model));

        Ok(Reply {
            text: completion.text,
            philosopher_id: request.persona_id.clone(),
            provider,
            model: completion.model,
            usage: completion.usage,
        })
    }
}

/// Map transcript turns to `{role, content}` messages for `speaker`.
/// Other philosophers' words arrive as attributed user messages; system
/// notices are dropped.
pub fn history_to_messages(
    registry: &PersonaRegistry,
    history: &[ConversationTurn],
    speaker: &str,
) -> Vec<ChatMessage> {
    let start = history.len().saturating_sub(MAX_HISTORY_TURNS);
    history[start..]
        .iter()
        .filter_map(|turn| match turn {
            ConversationTurn::System { .. } => None,
            ConversationTurn::User { content } => Some(ChatMessage::new("user", content.clone())),
            ConversationTurn::Assistant { content } => Some(ChatMessage::new("assistant", content.clone())),
            ConversationTurn::Philosopher { philosopher_id, content } => {
                if philosopher_id.eq_ignore_ascii_case(speaker) {
                    Some(ChatMessage::new("assistant", content.clone()))
                } else {
                    let name = registry
                        .get_persona(philosopher_id)
                        .map(|p| p.name.to_string())
                        .unwrap_or_else(|| philosopher_id.clone());
                    Some(ChatMessage::new("user", format!("{}: {}", name, content)))
                }
            }
        })
        .collect()
}
