pub mod anthropic;
pub mod challenge;
pub mod config;
pub mod conversation;
pub mod debate;
pub mod dispatcher;
pub mod elevenlabs;
pub mod error;
pub mod feedback;
pub mod journal;
pub mod logging;
pub mod openai;
pub mod persona_prompts;
pub mod personas;
pub mod server;
pub mod suggestions;

pub use config::AppConfig;
pub use dispatcher::{ChatBackend, Dispatcher, Provider};
pub use error::{AppError, ProviderError};
pub use personas::{Feature, PersonaId, PersonaRegistry};
pub use server::{router, AppState, SharedState};

use std::sync::Arc;

// ============ Run ============

/// Build state from `config` and serve until the listener closes.
pub async fn run(config: AppConfig) -> std::io::Result<()> {
    let bind = config.bind.clone();
    let state = match AppState::from_config(config) {
        Ok(state) => Arc::new(state),
        Err(e) => {
            logging::log_error(None, &format!("Failed to initialize: {}", e));
            return Err(std::io::Error::other(e.to_string()));
        }
    };

    logging::log_dispatch(
        None,
        &format!(
            "Providers: claude={}, openai={}; speech={}; feedback sinks={:?}",
            state.config.anthropic_api_key.is_some(),
            state.config.openai_api_key.is_some(),
            state.speech.is_some(),
            state.feedback.sink_names()
        ),
    );

    let listener = tokio::net::TcpListener::bind(&bind).await?;
    tracing::info!("Oikosystem listening on {}", bind);
    axum::serve(listener, router(state)).await
}
