// tests/api_test.rs

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use oikosystem_lib::dispatcher::{ChatBackend, Completion, Dispatcher, Provider, TokenUsage};
use oikosystem_lib::elevenlabs::SpeechSynthesizer;
use oikosystem_lib::error::{ProviderError, Upstream, TOKEN_LIMIT_MESSAGE};
use oikosystem_lib::feedback::FeedbackPipeline;
use oikosystem_lib::journal::JournalStore;
use oikosystem_lib::openai::ChatMessage;
use oikosystem_lib::{router, AppConfig, AppState, PersonaRegistry};
use serde_json::{json, Value};
use std::sync::{Arc, Mutex};
use tower::ServiceExt;

/// Answers every call with a fixed reply (or a fixed failure) and records
/// the system prompt and messages it was given.
struct FakeBackend {
    provider: Provider,
    reply: String,
    fail_status: Option<u16>,
    calls: Mutex<Vec<(String, Vec<ChatMessage>)>>,
}

impl FakeBackend {
    fn replying(provider: Provider, reply: &str) -> Arc<Self> {
        Arc::new(Self {
            provider,
            reply: reply.to_string(),
            fail_status: None,
            calls: Mutex::new(Vec::new()),
        })
    }

    fn failing(provider: Provider, status: u16) -> Arc<Self> {
        Arc::new(Self {
            provider,
            reply: String::new(),
            fail_status: Some(status),
            calls: Mutex::new(Vec::new()),
        })
    }

    fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    fn last_system_prompt(&self) -> String {
        self.calls.lock().unwrap().last().map(|(s, _)| s.clone()).unwrap_or_default()
    }

    fn last_messages(&self) -> Vec<ChatMessage> {
        self.calls.lock().unwrap().last().map(|(_, m)| m.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl ChatBackend for FakeBackend {
    fn provider(&self) -> Provider {
        self.provider
    }

    async fn complete(
        &self,
        model: &str,
        system_prompt: &str,
        messages: Vec<ChatMessage>,
    ) -> Result<Completion, ProviderError> {
        self.calls.lock().unwrap().push((system_prompt.to_string(), messages));
        if let Some(status) = self.fail_status {
            return Err(ProviderError::Status {
                upstream: Upstream::Claude,
                status,
                error_type: Some("authentication_error".to_string()),
                message: "invalid x-api-key".to_string(),
            });
        }
        Ok(Completion {
            text: self.reply.clone(),
            model: model.to_string(),
            usage: Some(TokenUsage {
                input_tokens: 120,
                output_tokens: 40,
            }),
        })
    }
}

struct FakeSpeech {
    voices: Mutex<Vec<String>>,
}

#[async_trait]
impl SpeechSynthesizer for FakeSpeech {
    async fn synthesize(&self, _text: &str, voice_id: &str) -> Result<Vec<u8>, ProviderError> {
        self.voices.lock().unwrap().push(voice_id.to_string());
        Ok(b"ID3-fake-mpeg".to_vec())
    }
}

struct TestApp {
    app: Router,
    claude: Arc<FakeBackend>,
    openai: Arc<FakeBackend>,
    speech: Arc<FakeSpeech>,
}

fn test_app_with(claude: Arc<FakeBackend>, openai: Arc<FakeBackend>, with_speech: bool) -> TestApp {
    let config = AppConfig::default();
    let registry = Arc::new(PersonaRegistry::builtin());
    let dispatcher = Dispatcher::new(
        registry.clone(),
        Some(claude.clone() as Arc<dyn ChatBackend>),
        Some(openai.clone() as Arc<dyn ChatBackend>),
        vec!["claude-test".to_string()],
        "gpt-test",
    );
    let speech = Arc::new(FakeSpeech {
        voices: Mutex::new(Vec::new()),
    });

    let state = AppState {
        feedback: FeedbackPipeline::from_config(&config).unwrap(),
        config,
        registry,
        dispatcher,
        speech: with_speech.then(|| speech.clone() as Arc<dyn SpeechSynthesizer>),
        journal: JournalStore::open_in_memory().unwrap(),
    };

    TestApp {
        app: router(Arc::new(state)),
        claude,
        openai,
        speech,
    }
}

fn test_app(claude_reply: &str, openai_reply: &str) -> TestApp {
    test_app_with(
        FakeBackend::replying(Provider::Claude, claude_reply),
        FakeBackend::replying(Provider::OpenAI, openai_reply),
        true,
    )
}

async fn send(app: &Router, method: &str, uri: &str, body: Body) -> (StatusCode, Value) {
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method(method)
                .uri(uri)
                .header("content-type", "application/json")
                .body(body)
                .unwrap(),
        )
        .await
        .unwrap();

    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let json = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, json)
}

async fn post(app: &Router, uri: &str, body: Value) -> (StatusCode, Value) {
    send(app, "POST", uri, Body::from(body.to_string())).await
}

// ============ Chat ============

#[tokio::test]
async fn test_claude_chat_answers_as_requested_persona() {
    let t = test_app("Virtue is a mean between two vices.", "unused");

    let (status, body) = post(
        &t.app,
        "/claude-chat",
        json!({ "prompt": "What is virtue?", "philosopherId": "aristotle" }),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["response"], "Virtue is a mean between two vices.");
    assert_eq!(body["philosopherId"], "aristotle");
    assert_eq!(body["model"], "claude-test");
    assert_eq!(body["usage"]["inputTokens"], 120);
    assert!(body.get("suggestion").is_none());

    assert_eq!(t.claude.call_count(), 1);
    assert_eq!(t.openai.call_count(), 0);
    assert!(t.claude.last_system_prompt().contains("Aristotle"));
    assert!(t.claude.last_system_prompt().contains("GENERAL GUIDANCE"));
    assert_eq!(t.claude.last_messages(), vec![ChatMessage::new("user", "What is virtue?")]);
}

#[tokio::test]
async fn test_missing_prompt_is_rejected() {
    let t = test_app("unused", "unused");

    let (status, body) = post(&t.app, "/claude-chat", json!({ "philosopherId": "aristotle" })).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("prompt"));
    assert_eq!(t.claude.call_count(), 0);
}

#[tokio::test]
async fn test_malformed_json_is_rejected() {
    let t = test_app("unused", "unused");

    let (status, body) = send(&t.app, "POST", "/claude-chat", Body::from("{not json")).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].is_string());
}

#[tokio::test]
async fn test_wrong_method_is_405() {
    let t = test_app("unused", "unused");

    let (status, body) = send(&t.app, "GET", "/claude-chat", Body::empty()).await;

    assert_eq!(status, StatusCode::METHOD_NOT_ALLOWED);
    assert_eq!(body["error"], "Method not allowed");
}

#[tokio::test]
async fn test_token_limit_blocks_before_dispatch() {
    let t = test_app("unused", "unused");

    let (status, body) = post(
        &t.app,
        "/claude-chat",
        json!({
            "prompt": "One more question",
            "philosopherId": "socrates",
            "userTokenUsage": { "dailyUsed": 50000, "date": "2025-03-14" },
            "tokenLimit": 50000
        }),
    )
    .await;

    assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(body["error"], TOKEN_LIMIT_MESSAGE);
    assert_eq!(t.claude.call_count(), 0);
}

#[tokio::test]
async fn test_suggests_plato_when_socrates_mentions_him() {
    let t = test_app(
        "A fine question. My student Plato would speak of the Forms here. What do you think?",
        "unused",
    );

    let (status, body) = post(
        &t.app,
        "/claude-chat",
        json!({
            "prompt": "What is beauty?",
            "philosopherId": "socrates",
            "activePhilosophers": ["socrates"]
        }),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["suggestion"]["suggestedPersona"], "plato");
    assert_eq!(body["suggestion"]["suggestedName"], "Plato");
    assert_eq!(body["suggestion"]["currentPersona"], "socrates");
}

#[tokio::test]
async fn test_unknown_persona_uses_default_prompt() {
    let t = test_app("Water is the principle of all things.", "unused");

    let (status, body) = post(&t.app, "/claude-chat", json!({ "prompt": "What is the arche?", "philosopherId": "thales" })).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["philosopherId"], "thales");
    assert!(t.claude.last_system_prompt().contains("philosopher of ancient Greece"));
}

#[tokio::test]
async fn test_openai_chat_defaults_to_debate_context() {
    let t = test_app("unused", "Everything flows, even your argument.");

    let (status, body) = post(
        &t.app,
        "/openai-chat",
        json!({
            "prompt": "Is anything permanent?",
            "philosopherId": "heraclitus",
            "previousMessages": [
                { "role": "system", "content": "Plato has joined the debate" },
                { "role": "philosopher", "philosopherId": "plato", "content": "The Forms are permanent." }
            ]
        }),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["model"], "gpt-test");
    assert_eq!(t.claude.call_count(), 0);
    assert!(!t.openai.last_system_prompt().contains("GENERAL GUIDANCE"));
    assert_eq!(
        t.openai.last_messages(),
        vec![
            ChatMessage::new("user", "Plato: The Forms are permanent."),
            ChatMessage::new("user", "Is anything permanent?"),
        ]
    );
}

#[tokio::test]
async fn test_policy_chat_routes_debate_to_openai() {
    let t = test_app("from claude", "from openai");

    let (_, chat) = post(&t.app, "/chat", json!({ "prompt": "Hello", "philosopherId": "epicurus" })).await;
    let (_, debate) = post(
        &t.app,
        "/chat",
        json!({ "prompt": "Hello", "philosopherId": "epicurus", "context": "debate" }),
    )
    .await;

    assert_eq!(chat["response"], "from claude");
    assert_eq!(debate["response"], "from openai");
}

#[tokio::test]
async fn test_upstream_failure_returns_error_details_and_hint() {
    let t = test_app_with(
        FakeBackend::failing(Provider::Claude, 401),
        FakeBackend::replying(Provider::OpenAI, "unused"),
        true,
    );

    let (status, body) = post(&t.app, "/claude-chat", json!({ "prompt": "Hi", "philosopherId": "plato" })).await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(body["error"].as_str().unwrap().contains("Claude"));
    assert_eq!(body["details"], "invalid x-api-key");
    assert!(body["hint"].as_str().unwrap().contains("ANTHROPIC_API_KEY"));
}

// ============ Speech ============

#[tokio::test]
async fn test_text_to_speech_returns_base64_audio_in_persona_voice() {
    let t = test_app("unused", "unused");

    let (status, body) = post(
        &t.app,
        "/text-to-speech",
        json!({ "text": "The unexamined life is not worth living.", "philosopherId": "plato" }),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["audio"], BASE64.encode(b"ID3-fake-mpeg"));
    assert_eq!(body["contentType"], "audio/mpeg");
    assert_eq!(*t.speech.voices.lock().unwrap(), vec!["ErXwobaYiN019PkySvjV".to_string()]);
}

#[tokio::test]
async fn test_text_to_speech_without_key_explains_configuration() {
    let t = test_app_with(
        FakeBackend::replying(Provider::Claude, "unused"),
        FakeBackend::replying(Provider::OpenAI, "unused"),
        false,
    );

    let (status, body) = post(&t.app, "/text-to-speech", json!({ "text": "Hello" })).await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(body["hint"].as_str().unwrap().contains("ELEVENLABS_API_KEY"));
}

// ============ Feedback ============

#[tokio::test]
async fn test_feedback_without_sinks_is_still_accepted() {
    let t = test_app("unused", "unused");

    let (status, body) = post(&t.app, "/record-feedback", json!({ "feedback": "great", "interestLevel": 5 })).await;

    assert_eq!(status, StatusCode::OK);
    assert!(body["message"].is_string());
}

#[tokio::test]
async fn test_feedback_requires_interest_level() {
    let t = test_app("unused", "unused");

    let (status, body) = post(&t.app, "/record-feedback", json!({ "feedback": "great" })).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("interestLevel"));
}

// ============ Debate ============

#[tokio::test]
async fn test_debate_turn_answers_previous_speaker() {
    let t = test_app("unused", "The Forms do not flow, Heraclitus.");

    let (status, body) = post(
        &t.app,
        "/debate-turn",
        json!({
            "topic": "Is change real?",
            "participants": ["heraclitus", "plato"],
            "transcript": [
                { "role": "philosopher", "philosopherId": "heraclitus", "content": "All things flow." }
            ]
        }),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["philosopherId"], "plato");
    assert_eq!(body["nextPhilosopherId"], "heraclitus");
    assert_eq!(body["concluded"], false);
    assert_eq!(t.openai.call_count(), 1);
    assert!(t
        .openai
        .last_messages()
        .last()
        .unwrap()
        .content
        .contains("Heraclitus just said"));
}

#[tokio::test]
async fn test_debate_needs_two_known_participants() {
    let t = test_app("unused", "unused");

    let (status, _) = post(
        &t.app,
        "/debate-turn",
        json!({ "topic": "Is change real?", "participants": ["heraclitus"] }),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(t.openai.call_count(), 0);
}

// ============ Journal ============

#[tokio::test]
async fn test_journal_lifecycle() {
    let t = test_app("Ask what the fear protects you from.", "unused");
    let email = "ana@example.com";

    let (status, created) = post(
        &t.app,
        "/journal-entry",
        json!({ "email": email, "content": "I am afraid of failing.", "philosopherId": "epicurus" }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert!(created["aiInsight"].is_null());
    let id = created["id"].as_str().unwrap().to_string();

    let (_, listed) = post(&t.app, "/journal-entries", json!({ "email": email })).await;
    assert_eq!(listed["entries"].as_array().unwrap().len(), 1);

    let (status, with_insight) = post(&t.app, "/journal-insight", json!({ "email": email, "id": id })).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(with_insight["aiInsight"], "Ask what the fear protects you from.");
    assert!(t.claude.last_system_prompt().contains("Epicurus"));

    let (status, _) = post(&t.app, "/journal-insight", json!({ "email": "else@example.com", "id": id })).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = post(&t.app, "/journal-entry/delete", json!({ "email": email, "id": id })).await;
    assert_eq!(status, StatusCode::OK);
    let (status, body) = post(&t.app, "/journal-entry/delete", json!({ "email": email, "id": id })).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "Journal entry not found");
}

#[tokio::test]
async fn test_journal_entry_with_generated_insight() {
    let t = test_app("Pleasure of the mind outlasts pleasure of the body.", "unused");

    let (status, created) = post(
        &t.app,
        "/journal-entry",
        json!({ "email": "ana@example.com", "content": "Ate too much cake.", "generateInsight": true }),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(created["aiInsight"], "Pleasure of the mind outlasts pleasure of the body.");
}

// ============ Misc ============

#[tokio::test]
async fn test_daily_challenge_is_stable_for_a_date() {
    let t = test_app("unused", "unused");

    let (status, first) = post(&t.app, "/daily-challenge", json!({ "date": "2025-03-14" })).await;
    let (_, second) = post(&t.app, "/daily-challenge", json!({ "date": "2025-03-14" })).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(first, second);
    assert_eq!(first["date"], "2025-03-14");

    let (status, _) = post(&t.app, "/daily-challenge", json!({ "date": "March 14" })).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_health_lists_personas() {
    let t = test_app("unused", "unused");

    let (status, body) = send(&t.app, "GET", "/health", Body::empty()).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert_eq!(body["personas"].as_array().unwrap().len(), 6);
}
