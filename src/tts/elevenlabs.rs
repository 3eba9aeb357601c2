use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::error::AppError;
use crate::tts::backend::{AudioFormat, SpeechBackend, VoiceInfo, VoiceSelection};

/// Rachel, ElevenLabs' stock voice.
const DEFAULT_VOICE_ID: &str = "21m00Tcm4TlvDq8ikWAM";
const DEFAULT_MODEL_ID: &str = "eleven_multilingual_v2";
const DEFAULT_BASE_URL: &str = "https://api.elevenlabs.io";
const REQUEST_TIMEOUT_SECS: u64 = 30;

/// Cloud backend speaking the ElevenLabs HTTP API. Produces MP3.
pub struct ElevenLabsBackend {
    client: Client,
    base_url: String,
    model_id: String,
}

#[derive(Debug, Serialize)]
struct SpeechBody<'a> {
    text: &'a str,
    model_id: &'a str,
}

#[derive(Debug, Deserialize)]
struct VoicesResponse {
    voices: Vec<ApiVoice>,
}

#[derive(Debug, Deserialize)]
struct ApiVoice {
    voice_id: String,
    name: String,
}

impl ElevenLabsBackend {
    pub fn new(api_key: &str) -> Result<Self, AppError> {
        let mut headers = reqwest::header::HeaderMap::new();
        headers.insert(
            "xi-api-key",
            api_key
                .parse()
                .map_err(|e| AppError::Backend(format!("Invalid API key: {}", e)))?,
        );

        let client = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .default_headers(headers)
            .build()
            .map_err(|e| AppError::Backend(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: DEFAULT_BASE_URL.to_string(),
            model_id: DEFAULT_MODEL_ID.to_string(),
        })
    }

    /// Point the backend at a different API host.
    #[must_use]
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    fn speech_endpoint(&self, voice_id: &str) -> String {
        format!("{}/v1/text-to-speech/{}", self.base_url, voice_id)
    }

    fn voices_endpoint(&self) -> String {
        format!("{}/v1/voices", self.base_url)
    }
}

#[async_trait]
impl SpeechBackend for ElevenLabsBackend {
    fn format(&self) -> AudioFormat {
        AudioFormat::Mp3
    }

    async fn synthesize(
        &mut self,
        text: &str,
        voice: &VoiceSelection,
    ) -> Result<Vec<u8>, AppError> {
        let voice_id = voice.voice_id.as_deref().unwrap_or(DEFAULT_VOICE_ID);
        if voice.reference.is_some() {
            // Cloud voices are addressed by id; an uploaded sample cannot be
            // sent along with a synthesis call
            tracing::debug!(voice_id, "Ignoring local reference sample for cloud voice");
        }

        let body = SpeechBody {
            text,
            model_id: &self.model_id,
        };

        tracing::debug!(voice_id, text_len = text.len(), "Sending synthesis request");

        let response = self
            .client
            .post(self.speech_endpoint(voice_id))
            .json(&body)
            .send()
            .await
            .map_err(|e| AppError::Backend(format!("Failed to send request: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(AppError::Backend(format!(
                "ElevenLabs API error ({}): {}",
                status, error_text
            )));
        }

        let audio = response
            .bytes()
            .await
            .map_err(|e| AppError::Backend(format!("Failed to read response body: {}", e)))?;

        Ok(audio.to_vec())
    }

    async fn voices(&mut self) -> Result<Vec<VoiceInfo>, AppError> {
        let response = self
            .client
            .get(self.voices_endpoint())
            .send()
            .await
            .map_err(|e| AppError::Backend(format!("Failed to send request: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(AppError::Backend(format!(
                "ElevenLabs API error ({}): {}",
                status, error_text
            )));
        }

        let parsed: VoicesResponse = response
            .json()
            .await
            .map_err(|e| AppError::Backend(format!("Invalid voices response: {}", e)))?;

        Ok(parsed
            .voices
            .into_iter()
            .map(|v| VoiceInfo {
                voice_id: v.voice_id,
                name: v.name,
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoints() {
        let backend = ElevenLabsBackend::new("test-key")
            .unwrap()
            .with_base_url("http://localhost:9000");

        assert_eq!(
            backend.speech_endpoint("abc123"),
            "http://localhost:9000/v1/text-to-speech/abc123"
        );
        assert_eq!(backend.voices_endpoint(), "http://localhost:9000/v1/voices");
    }

    #[test]
    fn test_speech_body_shape() {
        let body = SpeechBody {
            text: "hello world",
            model_id: DEFAULT_MODEL_ID,
        };
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["text"], "hello world");
        assert_eq!(json["model_id"], "eleven_multilingual_v2");
    }

    #[test]
    fn test_voices_response_parses() {
        let raw = r#"{
            "voices": [
                {"voice_id": "21m00Tcm4TlvDq8ikWAM", "name": "Rachel", "category": "premade"},
                {"voice_id": "v2", "name": "Custom"}
            ]
        }"#;
        let parsed: VoicesResponse = serde_json::from_str(raw).unwrap();
        assert_eq!(parsed.voices.len(), 2);
        assert_eq!(parsed.voices[0].voice_id, "21m00Tcm4TlvDq8ikWAM");
        assert_eq!(parsed.voices[1].name, "Custom");
    }

    #[test]
    fn test_default_voice_id() {
        assert_eq!(DEFAULT_VOICE_ID, "21m00Tcm4TlvDq8ikWAM");
    }
}
