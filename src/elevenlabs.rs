use crate::error::{ProviderError, Upstream};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

const ELEVENLABS_API_URL: &str = "https://api.elevenlabs.io/v1/text-to-speech";
const REQUEST_TIMEOUT_SECS: u64 = 60;

pub const TTS_MODEL: &str = "eleven_monolingual_v1";
pub const AUDIO_CONTENT_TYPE: &str = "audio/mpeg";

/// Turns text into audio in a given voice.
#[async_trait]
pub trait SpeechSynthesizer: Send + Sync {
    async fn synthesize(&self, text: &str, voice_id: &str) -> Result<Vec<u8>, ProviderError>;
}

#[derive(Debug, Serialize)]
struct SpeechRequest<'a> {
    text: &'a str,
    model_id: &'a str,
    voice_settings: VoiceSettings,
}

#[derive(Debug, Serialize)]
struct VoiceSettings {
    stability: f32,
    similarity_boost: f32,
}

impl Default for VoiceSettings {
    fn default() -> Self {
        Self {
            stability: 0.5,
            similarity_boost: 0.75,
        }
    }
}

#[derive(Debug, Deserialize)]
struct ElevenLabsError {
    detail: ElevenLabsErrorDetail,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ElevenLabsErrorDetail {
    Structured {
        #[serde(default)]
        status: Option<String>,
        message: String,
    },
    Plain(String),
}

pub struct ElevenLabsClient {
    client: Client,
    api_key: String,
}

impl ElevenLabsClient {
    pub fn new(api_key: &str) -> Result<Self, ProviderError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .connect_timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| ProviderError::Request {
                upstream: Upstream::ElevenLabs,
                message: e.to_string(),
            })?;

        Ok(Self {
            client,
            api_key: api_key.to_string(),
        })
    }
}

#[async_trait]
impl SpeechSynthesizer for ElevenLabsClient {
    async fn synthesize(&self, text: &str, voice_id: &str) -> Result<Vec<u8>, ProviderError> {
        let request = SpeechRequest {
            text,
            model_id: TTS_MODEL,
            voice_settings: VoiceSettings::default(),
        };

        let response = self
            .client
            .post(format!("{}/{}", ELEVENLABS_API_URL, voice_id))
            .header("xi-api-key", &self.api_key)
            .header("Accept", AUDIO_CONTENT_TYPE)
            .json(&request)
            .send()
            .await
            .map_err(|e| ProviderError::from_reqwest(Upstream::ElevenLabs, e))?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let error_text = response
                .text()
                .await
                .map_err(|e| ProviderError::from_reqwest(Upstream::ElevenLabs, e))?;
            return Err(parse_error(status, &error_text));
        }

        let audio = response
            .bytes()
            .await
            .map_err(|e| ProviderError::from_reqwest(Upstream::ElevenLabs, e))?;

        if audio.is_empty() {
            return Err(ProviderError::EmptyResponse(Upstream::ElevenLabs));
        }
        Ok(audio.to_vec())
    }
}

fn parse_error(status: u16, body: &str) -> ProviderError {
    let (error_type, message) = match serde_json::from_str::<ElevenLabsError>(body) {
        Ok(ElevenLabsError {
            detail: ElevenLabsErrorDetail::Structured { status, message },
        }) => (status, message),
        Ok(ElevenLabsError {
            detail: ElevenLabsErrorDetail::Plain(message),
        }) => (None, message),
        Err(_) => (None, body.to_string()),
    };

    ProviderError::Status {
        upstream: Upstream::ElevenLabs,
        status,
        error_type,
        message,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_body_shape() {
        let request = SpeechRequest {
            text: "Know thyself.",
            model_id: TTS_MODEL,
            voice_settings: VoiceSettings::default(),
        };
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["text"], "Know thyself.");
        assert_eq!(json["model_id"], TTS_MODEL);
        assert_eq!(json["voice_settings"]["stability"], 0.5);
        assert_eq!(json["voice_settings"]["similarity_boost"], 0.75);
    }

    #[test]
    fn test_parse_structured_error() {
        let body = r#"{"detail":{"status":"invalid_api_key","message":"Invalid API key"}}"#;
        match parse_error(401, body) {
            ProviderError::Status { status, error_type, message, .. } => {
                assert_eq!(status, 401);
                assert_eq!(error_type.as_deref(), Some("invalid_api_key"));
                assert_eq!(message, "Invalid API key");
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_parse_plain_error() {
        match parse_error(422, r#"{"detail":"text is required"}"#) {
            ProviderError::Status { message, .. } => assert_eq!(message, "text is required"),
            other => panic!("unexpected error: {:?}", other),
        }
        match parse_error(502, "Bad Gateway") {
            ProviderError::Status { message, .. } => assert_eq!(message, "Bad Gateway"),
            other => panic!("unexpected error: {:?}", other),
        }
    }
}
