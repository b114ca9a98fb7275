//! Structured logging for the Oikosystem service
//!
//! Events go through `tracing` with one target per category:
//! - DISPATCH: provider selection, model fallback, upstream calls
//! - PERSONA: prompt rendering and switch suggestions
//! - CONVERSATION: debate turns and session lifecycle
//! - FEEDBACK: feedback sink delivery
//! - JOURNAL: journal entry changes
//! - ERROR: errors surfaced to callers
//!
//! Stdout always; a daily-rotated file as well when a log directory is configured.

use chrono::Utc;
use std::fs;
use std::path::Path;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

const LOG_FILE_PREFIX: &str = "oikosystem.log";
const LOG_RETENTION_DAYS: i64 = 7;

/// Log categories for structured logging
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogCategory {
    Dispatch,
    Persona,
    Conversation,
    Feedback,
    Journal,
    Error,
}

impl LogCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogCategory::Dispatch => "DISPATCH",
            LogCategory::Persona => "PERSONA",
            LogCategory::Conversation => "CONVERSATION",
            LogCategory::Feedback => "FEEDBACK",
            LogCategory::Journal => "JOURNAL",
            LogCategory::Error => "ERROR",
        }
    }
}

/// Initialize tracing. Keep the returned guard alive for the life of the process
/// or buffered file output is lost.
pub fn init_logging(log_dir: Option<&Path>) -> Result<Option<WorkerGuard>, Box<dyn std::error::Error>> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let (file_layer, guard) = match log_dir {
        Some(dir) => {
            fs::create_dir_all(dir)?;
            let appender = tracing_appender::rolling::daily(dir, LOG_FILE_PREFIX);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            (Some(fmt::layer().with_ansi(false).with_writer(writer)), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer())
        .with(file_layer)
        .try_init()?;

    log_conversation(None, "Oikosystem logging initialized");

    Ok(guard)
}

fn conversation_prefix(conversation_id: Option<&str>) -> String {
    conversation_id
        .map(|id| format!("conversation={} | ", id.chars().take(8).collect::<String>()))
        .unwrap_or_default()
}

/// Log a message with category and optional conversation context
pub fn log(category: LogCategory, conversation_id: Option<&str>, message: &str) {
    let prefix = conversation_prefix(conversation_id);
    match category {
        LogCategory::Dispatch => tracing::info!(target: "oikosystem::dispatch", "{}{}", prefix, message),
        LogCategory::Persona => tracing::info!(target: "oikosystem::persona", "{}{}", prefix, message),
        LogCategory::Conversation => {
            tracing::info!(target: "oikosystem::conversation", "{}{}", prefix, message)
        }
        LogCategory::Feedback => tracing::info!(target: "oikosystem::feedback", "{}{}", prefix, message),
        LogCategory::Journal => tracing::info!(target: "oikosystem::journal", "{}{}", prefix, message),
        LogCategory::Error => tracing::error!(target: "oikosystem::error", "{}{}", prefix, message),
    }
}

/// Log a dispatch event (provider, model, fallback)
pub fn log_dispatch(conversation_id: Option<&str>, message: &str) {
    log(LogCategory::Dispatch, conversation_id, message);
}

/// Log a persona event (unknown ids, switch suggestions)
pub fn log_persona(conversation_id: Option<&str>, message: &str) {
    log(LogCategory::Persona, conversation_id, message);
}

/// Log a conversation lifecycle event
pub fn log_conversation(conversation_id: Option<&str>, message: &str) {
    log(LogCategory::Conversation, conversation_id, message);
}

pub fn log_feedback(message: &str) {
    log(LogCategory::Feedback, None, message);
}

pub fn log_journal(message: &str) {
    log(LogCategory::Journal, None, message);
}

/// Log an error
pub fn log_error(conversation_id: Option<&str>, message: &str) {
    log(LogCategory::Error, conversation_id, message);
}

/// Clean up old log files (keep last 7 days)
pub fn cleanup_old_logs(log_dir: &Path) -> Result<usize, Box<dyn std::error::Error>> {
    let mut deleted = 0;

    if !log_dir.exists() {
        return Ok(0);
    }

    let cutoff = Utc::now() - chrono::Duration::days(LOG_RETENTION_DAYS);

    for entry in fs::read_dir(log_dir)? {
        let entry = entry?;
        let path = entry.path();

        let is_ours = path
            .file_name()
            .and_then(|n| n.to_str())
            .map(|n| n.starts_with(LOG_FILE_PREFIX))
            .unwrap_or(false);
        if !is_ours {
            continue;
        }

        if let Ok(modified) = entry.metadata().and_then(|m| m.modified()) {
            let modified_time: chrono::DateTime<Utc> = modified.into();
            if modified_time < cutoff && fs::remove_file(&path).is_ok() {
                deleted += 1;
            }
        }
    }

    Ok(deleted)
}
