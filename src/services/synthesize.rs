//! Text-to-speech via an OpenAI-compatible `/v1/audio/speech` endpoint.
//!
//! The response body is the encoded audio itself (MP3), returned as a
//! [`SynthesizedSpeech`] for the playback device to decode.

use async_trait::async_trait;

use crate::audio::SynthesizedSpeech;
use crate::config::ApiConfig;

use super::{check_status, ServiceError, TextToSpeechService, VoiceType};

/// Audio container requested from the speech endpoint.
const RESPONSE_FORMAT: &str = "mp3";

/// Synthesis client for any endpoint speaking the OpenAI speech API.
pub struct OpenAiSpeech {
    client: reqwest::Client,
    config: ApiConfig,
}

impl OpenAiSpeech {
    /// Build a client from application config, with the per-request timeout
    /// baked into the HTTP client.
    pub fn from_config(config: &ApiConfig) -> Self {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(config.timeout_secs))
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());

        Self {
            client,
            config: config.clone(),
        }
    }
}

#[async_trait]
impl TextToSpeechService for OpenAiSpeech {
    async fn synthesize(
        &self,
        text: &str,
        voice: VoiceType,
    ) -> Result<SynthesizedSpeech, ServiceError> {
        let url = format!("{}/v1/audio/speech", self.config.base_url);

        let body = serde_json::json!({
            "model":           self.config.speech_model,
            "input":           text,
            "voice":           voice.as_str(),
            "response_format": RESPONSE_FORMAT
        });

        let mut req = self.client.post(&url).json(&body);
        if let Some(key) = self.config.bearer_key() {
            req = req.bearer_auth(key);
        }

        let response = check_status(req.send().await?).await?;
        let bytes = response.bytes().await?;

        if bytes.is_empty() {
            return Err(ServiceError::EmptyResponse);
        }
        Ok(SynthesizedSpeech {
            bytes: bytes.to_vec(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_config_builds_without_panic() {
        let _client = OpenAiSpeech::from_config(&ApiConfig::default());
    }

    #[test]
    fn every_voice_has_a_wire_value() {
        for voice in VoiceType::ALL {
            assert!(!voice.as_str().is_empty());
        }
    }
}
