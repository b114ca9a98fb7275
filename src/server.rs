//! HTTP surface
//!
//! Every endpoint takes a camelCase JSON body via POST (except `/health`).
//! Wrong method → 405, bad or incomplete body → 400, upstream failure → 500
//! with `{error, details, hint}`.

use crate::challenge::{self, DailyChallenge};
use crate::config::AppConfig;
use crate::conversation::{ConversationTurn, Transcript};
use crate::debate::{DebateSession, DebateTurn};
use crate::dispatcher::{check_token_limit, DailyUsage, DispatchRequest, Dispatcher, Provider, TokenUsage};
use crate::elevenlabs::{ElevenLabsClient, SpeechSynthesizer, AUDIO_CONTENT_TYPE};
use crate::error::{AppError, ProviderError, Result, Upstream};
use crate::feedback::{Delivery, FeedbackPipeline, FeedbackRecord};
use crate::journal::{self, JournalEntry, JournalStore};
use crate::logging;
use crate::personas::{Feature, PersonaRegistry};
use crate::suggestions::{self, SwitchSuggestion};
use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::routing::{get, post};
use axum::{Json, Router};
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

// ============ State ============

/// Everything a request handler can reach. Built once at startup.
pub struct AppState {
    pub config: AppConfig,
    pub registry: Arc<PersonaRegistry>,
    pub dispatcher: Dispatcher,
    pub feedback: FeedbackPipeline,
    pub speech: Option<Arc<dyn SpeechSynthesizer>>,
    pub journal: JournalStore,
}

pub type SharedState = Arc<AppState>;

impl AppState {
    /// Real upstream clients for whatever is configured.
    pub fn from_config(config: AppConfig) -> Result<Self> {
        let registry = Arc::new(PersonaRegistry::builtin());
        let dispatcher = Dispatcher::from_config(&config, registry.clone())?;
        let feedback = FeedbackPipeline::from_config(&config)?;

        let speech: Option<Arc<dyn SpeechSynthesizer>> = match &config.elevenlabs_api_key {
            Some(key) => Some(Arc::new(ElevenLabsClient::new(key)?)),
            None => None,
        };

        let journal = match &config.database_path {
            Some(path) => JournalStore::open(path)?,
            None => JournalStore::open_in_memory()?,
        };

        Ok(Self {
            config,
            registry,
            dispatcher,
            feedback,
            speech,
            journal,
        })
    }
}

pub fn router(state: SharedState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/claude-chat", post(claude_chat).fallback(method_not_allowed))
        .route("/openai-chat", post(openai_chat).fallback(method_not_allowed))
        .route("/chat", post(chat).fallback(method_not_allowed))
        .route("/text-to-speech", post(text_to_speech).fallback(method_not_allowed))
        .route("/record-feedback", post(record_feedback).fallback(method_not_allowed))
        .route("/debate-turn", post(debate_turn).fallback(method_not_allowed))
        .route("/journal-entry", post(create_journal_entry).fallback(method_not_allowed))
        .route("/journal-entries", post(list_journal_entries).fallback(method_not_allowed))
        .route("/journal-insight", post(journal_insight).fallback(method_not_allowed))
        .route("/journal-entry/delete", post(delete_journal_entry).fallback(method_not_allowed))
        .route("/daily-challenge", post(daily_challenge).fallback(method_not_allowed))
        .route("/health", get(health).fallback(method_not_allowed))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn method_not_allowed() -> AppError {
    AppError::MethodNotAllowed
}

fn parse_body<T>(payload: std::result::Result<Json<T>, JsonRejection>) -> Result<T> {
    payload
        .map(|Json(body)| body)
        .map_err(|rejection| AppError::Validation(format!("Invalid request body: {}", rejection.body_text())))
}

/// Trimmed, non-empty value of a required field.
fn required(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

// ============ Chat ============

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatRequest {
    pub prompt: Option<String>,
    pub philosopher_id: Option<String>,
    #[serde(default)]
    pub previous_messages: Vec<ConversationTurn>,
    #[serde(default)]
    pub user_context: Option<String>,
    #[serde(default)]
    pub context: Option<String>,
    #[serde(default)]
    pub user_token_usage: Option<DailyUsage>,
    #[serde(default)]
    pub token_limit: Option<u64>,
    /// Philosophers already in the conversation; enables switch suggestions.
    #[serde(default)]
    pub active_philosophers: Option<Vec<String>>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatResponse {
    pub response: String,
    pub philosopher_id: String,
    pub model: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub usage: Option<TokenUsage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suggestion: Option<SwitchSuggestion>,
}

async fn claude_chat(
    State(state): State<SharedState>,
    payload: std::result::Result<Json<ChatRequest>, JsonRejection>,
) -> Result<Json<ChatResponse>> {
    handle_chat(&state, parse_body(payload)?, Some(Provider::Claude), Feature::Chat).await
}

async fn openai_chat(
    State(state): State<SharedState>,
    payload: std::result::Result<Json<ChatRequest>, JsonRejection>,
) -> Result<Json<ChatResponse>> {
    handle_chat(&state, parse_body(payload)?, Some(Provider::OpenAI), Feature::Debate).await
}

async fn chat(
    State(state): State<SharedState>,
    payload: std::result::Result<Json<ChatRequest>, JsonRejection>,
) -> Result<Json<ChatResponse>> {
    handle_chat(&state, parse_body(payload)?, None, Feature::Chat).await
}

async fn handle_chat(
    state: &AppState,
    request: ChatRequest,
    pinned: Option<Provider>,
    default_feature: Feature,
) -> Result<Json<ChatResponse>> {
    let (prompt, philosopher_id) = match (required(request.prompt), required(request.philosopher_id)) {
        (Some(prompt), Some(philosopher_id)) => (prompt, philosopher_id),
        _ => {
            return Err(AppError::Validation(
                "Missing required fields: prompt and philosopherId".to_string(),
            ))
        }
    };

    check_token_limit(request.user_token_usage.as_ref(), request.token_limit)?;

    let feature = request
        .context
        .as_deref()
        .map(Feature::parse)
        .unwrap_or(default_feature);

    let dispatch = DispatchRequest {
        persona_id: philosopher_id,
        user_text: prompt,
        history: request.previous_messages,
        user_context: request.user_context.unwrap_or_default(),
        feature,
    };

    let reply = match pinned {
        Some(provider) => state.dispatcher.send_with(provider, &dispatch).await?,
        None => state.dispatcher.send_message(&dispatch).await?,
    };

    let suggestion = request.active_philosophers.and_then(|mut present| {
        present.push(reply.philosopher_id.clone());
        let candidates = suggestions::candidates_excluding(&state.registry, &present);
        suggestions::detect_switch(&state.registry, &reply.text, &reply.philosopher_id, &candidates)
    });
    if let Some(s) = &suggestion {
        logging::log_persona(
            None,
            &format!("Suggesting {} while talking to {}", s.suggested_persona.as_str(), s.current_persona),
        );
    }

    Ok(Json(ChatResponse {
        response: reply.text,
        philosopher_id: reply.philosopher_id,
        model: reply.model,
        usage: reply.usage,
        suggestion,
    }))
}

// ============ Speech ============

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SpeechRequest {
    pub text: Option<String>,
    #[serde(default)]
    pub philosopher_id: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SpeechResponse {
    pub audio: String,
    pub content_type: String,
}

async fn text_to_speech(
    State(state): State<SharedState>,
    payload: std::result::Result<Json<SpeechRequest>, JsonRejection>,
) -> Result<Json<SpeechResponse>> {
    let request = parse_body(payload)?;
    let text = required(request.text).ok_or_else(|| AppError::Validation("Missing required field: text".to_string()))?;

    let speech = state
        .speech
        .as_ref()
        .ok_or(ProviderError::MissingApiKey(Upstream::ElevenLabs))?;

    let voice_id = state.registry.voice_for(request.philosopher_id.as_deref().unwrap_or_default());
    let audio = speech.synthesize(&text, voice_id).await?;

    Ok(Json(SpeechResponse {
        audio: BASE64.encode(audio),
        content_type: AUDIO_CONTENT_TYPE.to_string(),
    }))
}

// ============ Feedback ============

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedbackRequest {
    pub feedback: Option<String>,
    #[serde(default)]
    pub interest_level: Option<Value>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub timestamp: Option<String>,
    #[serde(default)]
    pub features: Option<Value>,
    #[serde(default)]
    pub page_views: Option<Value>,
}

async fn record_feedback(
    State(state): State<SharedState>,
    payload: std::result::Result<Json<FeedbackRequest>, JsonRejection>,
) -> Result<Json<Value>> {
    let request = parse_body(payload)?;
    let interest_level = request.interest_level.filter(|v| !v.is_null());
    let (feedback, interest_level) = match (required(request.feedback), interest_level) {
        (Some(feedback), Some(interest_level)) => (feedback, interest_level),
        _ => {
            return Err(AppError::Validation(
                "Missing required fields: feedback and interestLevel".to_string(),
            ))
        }
    };

    let record = FeedbackRecord {
        feedback,
        interest_level,
        email: required(request.email),
        timestamp: request.timestamp,
        features: request.features,
        page_views: request.page_views,
    };

    let message = match state.feedback.record(&record).await? {
        Delivery::Sink(_) => "Feedback recorded successfully",
        Delivery::LoggedOnly => "Feedback received",
    };
    Ok(Json(json!({ "message": message })))
}

// ============ Debate ============

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DebateRequest {
    pub topic: Option<String>,
    #[serde(default)]
    pub participants: Vec<String>,
    #[serde(default)]
    pub transcript: Vec<ConversationTurn>,
    #[serde(default)]
    pub max_turns: Option<usize>,
    #[serde(default)]
    pub user_context: Option<String>,
}

async fn debate_turn(
    State(state): State<SharedState>,
    payload: std::result::Result<Json<DebateRequest>, JsonRejection>,
) -> Result<Json<DebateTurn>> {
    let request = parse_body(payload)?;
    let topic = request.topic.unwrap_or_default();

    let mut session = DebateSession::new(
        &topic,
        &request.participants,
        Transcript::from_turns(request.transcript),
        request.max_turns,
    )?;

    let turn = session
        .take_turn(&state.dispatcher, request.user_context.as_deref().unwrap_or_default())
        .await?;
    Ok(Json(turn))
}

// ============ Journal ============

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JournalEntryRequest {
    pub email: Option<String>,
    pub content: Option<String>,
    #[serde(default)]
    pub philosopher_id: Option<String>,
    #[serde(default)]
    pub generate_insight: bool,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JournalLookupRequest {
    pub email: Option<String>,
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub philosopher_id: Option<String>,
}

fn required_email(email: Option<String>) -> Result<String> {
    required(email).ok_or_else(|| AppError::Validation("Missing required field: email".to_string()))
}

fn required_id(id: Option<String>) -> Result<String> {
    required(id).ok_or_else(|| AppError::Validation("Missing required field: id".to_string()))
}

fn entry_not_found() -> AppError {
    AppError::NotFound("Journal entry not found".to_string())
}

async fn create_journal_entry(
    State(state): State<SharedState>,
    payload: std::result::Result<Json<JournalEntryRequest>, JsonRejection>,
) -> Result<Json<JournalEntry>> {
    let request = parse_body(payload)?;
    let (email, content) = match (required(request.email), required(request.content)) {
        (Some(email), Some(content)) => (email, content),
        _ => {
            return Err(AppError::Validation(
                "Missing required fields: email and content".to_string(),
            ))
        }
    };

    let entry = state
        .journal
        .create_entry(&email, &content, request.philosopher_id.as_deref())?;
    if !request.generate_insight {
        return Ok(Json(entry));
    }

    // The entry is kept even when the insight call fails.
    match journal::generate_insight(&state.dispatcher, &entry, None).await {
        Ok(insight) => {
            let updated = state.journal.attach_insight(&entry.id, &email, &insight)?;
            Ok(Json(updated.unwrap_or(entry)))
        }
        Err(err) => {
            logging::log_error(None, &format!("Insight for entry {} failed: {}", entry.id, err));
            Ok(Json(entry))
        }
    }
}

async fn list_journal_entries(
    State(state): State<SharedState>,
    payload: std::result::Result<Json<JournalLookupRequest>, JsonRejection>,
) -> Result<Json<Value>> {
    let request = parse_body(payload)?;
    let email = required_email(request.email)?;
    let entries = state.journal.list_entries(&email)?;
    Ok(Json(json!({ "entries": entries })))
}

async fn journal_insight(
    State(state): State<SharedState>,
    payload: std::result::Result<Json<JournalLookupRequest>, JsonRejection>,
) -> Result<Json<JournalEntry>> {
    let request = parse_body(payload)?;
    let email = required_email(request.email)?;
    let id = required_id(request.id)?;

    let entry = state.journal.get_entry(&id, &email)?.ok_or_else(entry_not_found)?;
    let insight = journal::generate_insight(&state.dispatcher, &entry, request.philosopher_id.as_deref()).await?;

    let updated = state
        .journal
        .attach_insight(&id, &email, &insight)?
        .ok_or_else(entry_not_found)?;
    Ok(Json(updated))
}

async fn delete_journal_entry(
    State(state): State<SharedState>,
    payload: std::result::Result<Json<JournalLookupRequest>, JsonRejection>,
) -> Result<Json<Value>> {
    let request = parse_body(payload)?;
    let email = required_email(request.email)?;
    let id = required_id(request.id)?;

    if !state.journal.delete_entry(&id, &email)? {
        return Err(entry_not_found());
    }
    Ok(Json(json!({ "message": "Journal entry deleted" })))
}

// ============ Daily Challenge ============

#[derive(Debug, Default, Deserialize)]
pub struct ChallengeRequest {
    #[serde(default)]
    pub date: Option<String>,
}

async fn daily_challenge(
    payload: std::result::Result<Json<ChallengeRequest>, JsonRejection>,
) -> Result<Json<DailyChallenge>> {
    let request = parse_body(payload)?;
    let date = match required(request.date) {
        Some(raw) => challenge::parse_date(&raw)
            .ok_or_else(|| AppError::Validation(format!("Invalid date '{}', expected YYYY-MM-DD", raw)))?,
        None => Utc::now().date_naive(),
    };
    Ok(Json(challenge::challenge_for(date)))
}

// ============ Health ============

async fn health(State(state): State<SharedState>) -> Json<Value> {
    let personas: Vec<&str> = state.registry.personas().map(|p| p.id.as_str()).collect();
    Json(json!({ "status": "ok", "personas": personas }))
}
