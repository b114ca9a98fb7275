//! Feedback pipeline
//!
//! Records go to the first configured sink that accepts them: Google Sheets,
//! then a SendGrid notification email. With no sinks configured the record
//! is only logged.

use crate::config::{AppConfig, EmailConfig, GoogleSheetsConfig};
use crate::error::{ProviderError, Upstream};
use crate::logging;
use async_trait::async_trait;
use chrono::Utc;
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

const GOOGLE_TOKEN_URL: &str = "https://oauth2.googleapis.com/token";
const SHEETS_SCOPE: &str = "https://www.googleapis.com/auth/spreadsheets";
const SHEETS_API_URL: &str = "https://sheets.googleapis.com/v4/spreadsheets";
const SHEET_RANGE: &str = "Sheet1!A:G";
const JWT_BEARER_GRANT: &str = "urn:ietf:params:oauth:grant-type:jwt-bearer";
const TOKEN_LIFETIME_SECS: i64 = 3600;

const SENDGRID_API_URL: &str = "https://api.sendgrid.com/v3/mail/send";

const REQUEST_TIMEOUT_SECS: u64 = 20;

#[derive(Error, Debug)]
pub enum FeedbackError {
    #[error("invalid service account credentials: {0}")]
    Credentials(String),

    #[error(transparent)]
    Upstream(#[from] ProviderError),
}

impl FeedbackError {
    pub fn hint(&self) -> String {
        match self {
            FeedbackError::Credentials(_) => {
                "Check GOOGLE_SERVICE_ACCOUNT_EMAIL and GOOGLE_PRIVATE_KEY".to_string()
            }
            FeedbackError::Upstream(err) => err.hint(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedbackRecord {
    pub feedback: String,
    /// Number or label, as sent by the form.
    pub interest_level: Value,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub timestamp: Option<String>,
    #[serde(default)]
    pub features: Option<Value>,
    #[serde(default)]
    pub page_views: Option<Value>,
}

impl FeedbackRecord {
    pub fn interest_level_text(&self) -> String {
        match &self.interest_level {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        }
    }

    fn timestamp_or_now(&self) -> String {
        self.timestamp.clone().unwrap_or_else(|| Utc::now().to_rfc3339())
    }

    /// One spreadsheet row, columns A through G.
    pub fn to_row(&self) -> Vec<String> {
        let compact = |v: &Option<Value>| v.as_ref().map(|v| v.to_string()).unwrap_or_default();
        vec![
            self.timestamp_or_now(),
            self.email.clone().unwrap_or_default(),
            self.interest_level_text(),
            self.feedback.clone(),
            compact(&self.features),
            compact(&self.page_views),
            "oikosystem".to_string(),
        ]
    }

    pub fn to_email_body(&self) -> String {
        let mut body = format!(
            "New feedback received\n\nInterest level: {}\nEmail: {}\nTimestamp: {}\n\nFeedback:\n{}\n",
            self.interest_level_text(),
            self.email.as_deref().unwrap_or("(not provided)"),
            self.timestamp_or_now(),
            self.feedback
        );
        if let Some(features) = &self.features {
            body.push_str(&format!("\nFeatures used: {}\n", features));
        }
        if let Some(page_views) = &self.page_views {
            body.push_str(&format!("Page views: {}\n", page_views));
        }
        body
    }
}

/// Where a record ended up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    Sink(&'static str),
    LoggedOnly,
}

#[async_trait]
pub trait FeedbackSink: Send + Sync {
    fn name(&self) -> &'static str;

    async fn deliver(&self, record: &FeedbackRecord) -> Result<(), FeedbackError>;
}

fn http_client(upstream: Upstream) -> Result<Client, ProviderError> {
    Client::builder()
        .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
        .connect_timeout(Duration::from_secs(10))
        .build()
        .map_err(|e| ProviderError::Request {
            upstream,
            message: e.to_string(),
        })
}

async fn ensure_success(upstream: Upstream, response: reqwest::Response) -> Result<reqwest::Response, ProviderError> {
    if response.status().is_success() {
        return Ok(response);
    }
    let status = response.status().as_u16();
    let message = response
        .text()
        .await
        .map_err(|e| ProviderError::from_reqwest(upstream, e))?;
    Err(ProviderError::Status {
        upstream,
        status,
        error_type: None,
        message,
    })
}

// ============ Google Sheets ============

#[derive(Debug, Serialize, Deserialize)]
struct ServiceAccountClaims {
    iss: String,
    scope: String,
    aud: String,
    iat: i64,
    exp: i64,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
}

pub struct SheetsSink {
    client: Client,
    config: GoogleSheetsConfig,
}

impl SheetsSink {
    pub fn new(config: GoogleSheetsConfig) -> Result<Self, ProviderError> {
        Ok(Self {
            client: http_client(Upstream::GoogleSheets)?,
            config,
        })
    }

    fn claims(&self, issued_at: i64) -> ServiceAccountClaims {
        ServiceAccountClaims {
            iss: self.config.service_account_email.clone(),
            scope: SHEETS_SCOPE.to_string(),
            aud: GOOGLE_TOKEN_URL.to_string(),
            iat: issued_at,
            exp: issued_at + TOKEN_LIFETIME_SECS,
        }
    }

    /// Signed RS256 assertion for the token exchange.
    fn assertion(&self) -> Result<String, FeedbackError> {
        let key = EncodingKey::from_rsa_pem(self.config.private_key.as_bytes())
            .map_err(|e| FeedbackError::Credentials(e.to_string()))?;
        encode(&Header::new(Algorithm::RS256), &self.claims(Utc::now().timestamp()), &key)
            .map_err(|e| FeedbackError::Credentials(e.to_string()))
    }

    async fn access_token(&self) -> Result<String, FeedbackError> {
        let assertion = self.assertion()?;

        let response = self
            .client
            .post(GOOGLE_TOKEN_URL)
            .form(&[("grant_type", JWT_BEARER_GRANT), ("assertion", assertion.as_str())])
            .send()
            .await
            .map_err(|e| ProviderError::from_reqwest(Upstream::GoogleSheets, e))?;

        let token: TokenResponse = ensure_success(Upstream::GoogleSheets, response)
            .await?
            .json()
            .await
            .map_err(|e| ProviderError::from_reqwest(Upstream::GoogleSheets, e))?;
        Ok(token.access_token)
    }

    fn append_url(&self) -> String {
        format!(
            "{}/{}/values/{}:append?valueInputOption=USER_ENTERED",
            SHEETS_API_URL, self.config.sheet_id, SHEET_RANGE
        )
    }
}

#[async_trait]
impl FeedbackSink for SheetsSink {
    fn name(&self) -> &'static str {
        "google_sheets"
    }

    async fn deliver(&self, record: &FeedbackRecord) -> Result<(), FeedbackError> {
        let token = self.access_token().await?;

        let response = self
            .client
            .post(self.append_url())
            .bearer_auth(token)
            .json(&json!({ "values": [record.to_row()] }))
            .send()
            .await
            .map_err(|e| ProviderError::from_reqwest(Upstream::GoogleSheets, e))?;

        ensure_success(Upstream::GoogleSheets, response).await?;
        Ok(())
    }
}

// ============ SendGrid ============

pub struct EmailSink {
    client: Client,
    config: EmailConfig,
}

impl EmailSink {
    pub fn new(config: EmailConfig) -> Result<Self, ProviderError> {
        Ok(Self {
            client: http_client(Upstream::SendGrid)?,
            config,
        })
    }

    fn message(&self, record: &FeedbackRecord) -> Value {
        json!({
            "personalizations": [{ "to": [{ "email": self.config.notification_email }] }],
            "from": { "email": self.config.notification_email },
            "subject": format!("New Oikosystem feedback (interest: {})", record.interest_level_text()),
            "content": [{ "type": "text/plain", "value": record.to_email_body() }],
        })
    }
}

#[async_trait]
impl FeedbackSink for EmailSink {
    fn name(&self) -> &'static str {
        "email"
    }

    async fn deliver(&self, record: &FeedbackRecord) -> Result<(), FeedbackError> {
        let response = self
            .client
            .post(SENDGRID_API_URL)
            .bearer_auth(&self.config.api_key)
            .json(&self.message(record))
            .send()
            .await
            .map_err(|e| ProviderError::from_reqwest(Upstream::SendGrid, e))?;

        ensure_success(Upstream::SendGrid, response).await?;
        Ok(())
    }
}

// ============ Pipeline ============

pub struct FeedbackPipeline {
    sinks: Vec<Arc<dyn FeedbackSink>>,
}

impl FeedbackPipeline {
    pub fn new(sinks: Vec<Arc<dyn FeedbackSink>>) -> Self {
        Self { sinks }
    }

    /// Sheets first, then email; sinks without configuration are left out.
    pub fn from_config(config: &AppConfig) -> Result<Self, ProviderError> {
        let mut sinks: Vec<Arc<dyn FeedbackSink>> = Vec::new();
        if let Some(sheets) = &config.google_sheets {
            sinks.push(Arc::new(SheetsSink::new(sheets.clone())?));
        }
        if let Some(email) = &config.email {
            sinks.push(Arc::new(EmailSink::new(email.clone())?));
        }
        Ok(Self::new(sinks))
    }

    pub fn sink_names(&self) -> Vec<&'static str> {
        self.sinks.iter().map(|s| s.name()).collect()
    }

    pub async fn record(&self, record: &FeedbackRecord) -> Result<Delivery, FeedbackError> {
        if self.sinks.is_empty() {
            logging::log_feedback(&format!(
                "No feedback sink configured, logging only (interest={}): {}",
                record.interest_level_text(),
                record.feedback
            ));
            return Ok(Delivery::LoggedOnly);
        }

        let mut last_error: Option<FeedbackError> = None;
        for sink in &self.sinks {
            match sink.deliver(record).await {
                Ok(()) => {
                    logging::log_feedback(&format!("Feedback delivered via {}", sink.name()));
                    return Ok(Delivery::Sink(sink.name()));
                }
                Err(err) => {
                    logging::log_feedback(&format!("{} sink failed, trying next: {}", sink.name(), err));
                    last_error = Some(err);
                }
            }
        }

        match last_error {
            Some(err) => Err(err),
            None => Ok(Delivery::LoggedOnly),
        }
    }
}
