// Error types for the Oikosystem service

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use thiserror::Error;

pub const TOKEN_LIMIT_MESSAGE: &str = "Daily token limit reached. Please try again tomorrow.";

/// Which upstream service an error came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Upstream {
    Claude,
    OpenAI,
    ElevenLabs,
    GoogleSheets,
    SendGrid,
}

impl Upstream {
    pub fn as_str(&self) -> &'static str {
        match self {
            Upstream::Claude => "Claude",
            Upstream::OpenAI => "OpenAI",
            Upstream::ElevenLabs => "ElevenLabs",
            Upstream::GoogleSheets => "Google Sheets",
            Upstream::SendGrid => "SendGrid",
        }
    }

    fn key_var(&self) -> &'static str {
        match self {
            Upstream::Claude => "ANTHROPIC_API_KEY",
            Upstream::OpenAI => "OPENAI_API_KEY",
            Upstream::ElevenLabs => "ELEVENLABS_API_KEY",
            Upstream::GoogleSheets => "GOOGLE_PRIVATE_KEY",
            Upstream::SendGrid => "SENDGRID_API_KEY",
        }
    }
}

// ============ Provider Errors ============

/// Failure of a single upstream call.
#[derive(Error, Debug)]
pub enum ProviderError {
    #[error("{} API error ({status}): {message}", .upstream.as_str())]
    Status {
        upstream: Upstream,
        status: u16,
        error_type: Option<String>,
        message: String,
    },

    #[error("{} request timed out", .0.as_str())]
    Timeout(Upstream),

    #[error("{} request failed: {message}", .upstream.as_str())]
    Network { upstream: Upstream, message: String },

    #[error("no text response from {}", .0.as_str())]
    EmptyResponse(Upstream),

    #[error("{} is not configured", .0.as_str())]
    MissingApiKey(Upstream),

    #[error("{} request could not be prepared: {message}", .upstream.as_str())]
    Request { upstream: Upstream, message: String },
}

impl ProviderError {
    pub fn from_reqwest(upstream: Upstream, err: reqwest::Error) -> Self {
        if err.is_timeout() {
            ProviderError::Timeout(upstream)
        } else {
            ProviderError::Network {
                upstream,
                message: err.to_string(),
            }
        }
    }

    pub fn upstream(&self) -> Upstream {
        match self {
            ProviderError::Status { upstream, .. }
            | ProviderError::Network { upstream, .. }
            | ProviderError::Request { upstream, .. } => *upstream,
            ProviderError::Timeout(upstream)
            | ProviderError::EmptyResponse(upstream)
            | ProviderError::MissingApiKey(upstream) => *upstream,
        }
    }

    /// "Model not found / unavailable" - the only failure worth trying the next model for.
    pub fn is_model_unavailable(&self) -> bool {
        match self {
            ProviderError::Status {
                status,
                error_type,
                message,
                ..
            } => {
                if *status == 404 || error_type.as_deref() == Some("not_found_error") {
                    return true;
                }
                let lower = message.to_lowercase();
                lower.contains("model")
                    && (lower.contains("not found")
                        || lower.contains("does not exist")
                        || lower.contains("unavailable")
                        || lower.contains("not available"))
            }
            _ => false,
        }
    }

    /// Upstream message, when the upstream sent one.
    pub fn upstream_message(&self) -> Option<&str> {
        match self {
            ProviderError::Status { message, .. } | ProviderError::Network { message, .. } => {
                Some(message.as_str())
            }
            _ => None,
        }
    }

    /// Short suggestion for the person reading the error.
    pub fn hint(&self) -> String {
        match self {
            ProviderError::Status { status: 401, upstream, .. }
            | ProviderError::Status { status: 403, upstream, .. } => {
                format!("Check that {} is set to a valid key", upstream.key_var())
            }
            ProviderError::Status { status: 429, .. } => {
                "The upstream service is rate limiting requests. Wait a moment and try again".to_string()
            }
            ProviderError::Status { status, .. } if *status >= 500 => {
                "The upstream service is having trouble. Try again shortly".to_string()
            }
            ProviderError::Status { message, .. } => message.clone(),
            ProviderError::Timeout(_) => {
                "The philosopher took too long to answer. Try a shorter question".to_string()
            }
            ProviderError::Network { .. } => "Could not reach the upstream service".to_string(),
            ProviderError::EmptyResponse(_) => "The model returned no text. Try rephrasing".to_string(),
            ProviderError::MissingApiKey(upstream) => {
                format!("Set {} in the server environment", upstream.key_var())
            }
            ProviderError::Request { .. } => "Check the server's credential configuration".to_string(),
        }
    }
}

// ============ Application Errors ============

/// Errors surfaced by the HTTP layer.
#[derive(Error, Debug)]
pub enum AppError {
    #[error("{0}")]
    Validation(String),

    #[error("Method not allowed")]
    MethodNotAllowed,

    #[error("{}", TOKEN_LIMIT_MESSAGE)]
    TokenLimit,

    #[error("{0}")]
    NotFound(String),

    #[error(transparent)]
    Provider(#[from] ProviderError),

    #[error("storage error: {0}")]
    Storage(#[from] rusqlite::Error),

    #[error(transparent)]
    Feedback(#[from] crate::feedback::FeedbackError),

    #[error("{0}")]
    Internal(String),
}

pub type Result<T> = std::result::Result<T, AppError>;

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::MethodNotAllowed => StatusCode::METHOD_NOT_ALLOWED,
            AppError::TokenLimit => StatusCode::TOO_MANY_REQUESTS,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Provider(_) | AppError::Storage(_) | AppError::Feedback(_) | AppError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = match &self {
            AppError::Provider(err) => json!({
                "error": format!("Failed to get a response from {}", err.upstream().as_str()),
                "details": err.upstream_message().map(str::to_string).unwrap_or_else(|| err.to_string()),
                "hint": err.hint(),
            }),
            AppError::Storage(err) => json!({
                "error": "Failed to access journal storage",
                "details": err.to_string(),
                "hint": "Check OIKOS_DATABASE_PATH",
            }),
            AppError::Feedback(err) => json!({
                "error": "Failed to record feedback",
                "details": err.to_string(),
                "hint": err.hint(),
            }),
            AppError::Internal(message) => json!({
                "error": "Internal server error",
                "details": message,
                "hint": "See server logs",
            }),
            other => json!({ "error": other.to_string() }),
        };

        if status.is_server_error() {
            crate::logging::log_error(None, &self.to_string());
        }

        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn status_error(status: u16, error_type: Option<&str>, message: &str) -> ProviderError {
        ProviderError::Status {
            upstream: Upstream::Claude,
            status,
            error_type: error_type.map(str::to_string),
            message: message.to_string(),
        }
    }

    #[test]
    fn test_model_not_found_is_retryable() {
        assert!(status_error(404, Some("not_found_error"), "model: claude-x").is_model_unavailable());
        assert!(status_error(400, Some("invalid_request_error"), "The model `gpt-9` does not exist").is_model_unavailable());
        assert!(status_error(400, None, "Model is currently unavailable").is_model_unavailable());
    }

    #[test]
    fn test_auth_failure_is_not_retryable() {
        let err = status_error(401, Some("authentication_error"), "invalid x-api-key");
        assert!(!err.is_model_unavailable());
        assert!(err.hint().contains("ANTHROPIC_API_KEY"));
        assert!(!ProviderError::Timeout(Upstream::Claude).is_model_unavailable());
    }

    #[test]
    fn test_status_codes() {
        assert_eq!(AppError::Validation("x".into()).status(), StatusCode::BAD_REQUEST);
        assert_eq!(AppError::TokenLimit.status(), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(AppError::MethodNotAllowed.status(), StatusCode::METHOD_NOT_ALLOWED);
        assert_eq!(
            AppError::Provider(ProviderError::Timeout(Upstream::OpenAI)).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_token_limit_message_is_fixed() {
        assert_eq!(AppError::TokenLimit.to_string(), TOKEN_LIMIT_MESSAGE);
    }
}
