//! Speech-to-text via an OpenAI-compatible `/v1/audio/transcriptions`
//! endpoint.
//!
//! The recorded utterance is WAV-encoded in memory (16-bit PCM at the
//! capture device's native rate) and uploaded as a multipart form.

use async_trait::async_trait;
use std::io::Cursor;

use crate::audio::RecordedUtterance;
use crate::config::ApiConfig;

use super::{check_status, ServiceError, SpeechToTextService};

// ---------------------------------------------------------------------------
// WAV encoding
// ---------------------------------------------------------------------------

/// Encode mono f32 samples as an in-memory 16-bit PCM WAV file.
pub fn encode_wav(audio: &RecordedUtterance) -> Result<Vec<u8>, hound::Error> {
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate: audio.sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };

    let mut cursor = Cursor::new(Vec::new());
    {
        let mut writer = hound::WavWriter::new(&mut cursor, spec)?;
        for &sample in &audio.samples {
            let quantised = (sample.clamp(-1.0, 1.0) * i16::MAX as f32) as i16;
            writer.write_sample(quantised)?;
        }
        writer.finalize()?;
    }
    Ok(cursor.into_inner())
}

// ---------------------------------------------------------------------------
// OpenAiTranscription
// ---------------------------------------------------------------------------

/// Transcription client for any endpoint speaking the OpenAI audio API.
pub struct OpenAiTranscription {
    client: reqwest::Client,
    config: ApiConfig,
}

impl OpenAiTranscription {
    /// Build a client from application config.  The HTTP client carries the
    /// per-request timeout; a default client is the last-resort fallback if
    /// the builder fails (should never happen in practice).
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

/// Pull the transcript out of a `/v1/audio/transcriptions` response body.
pub(crate) fn extract_transcript(json: &serde_json::Value) -> Result<String, ServiceError> {
    let text = json["text"]
        .as_str()
        .ok_or(ServiceError::EmptyResponse)?
        .trim()
        .to_string();

    if text.is_empty() {
        return Err(ServiceError::EmptyResponse);
    }
    Ok(text)
}

#[async_trait]
impl SpeechToTextService for OpenAiTranscription {
    async fn transcribe(&self, audio: &RecordedUtterance) -> Result<String, ServiceError> {
        let wav = encode_wav(audio).map_err(|e| ServiceError::Encode(e.to_string()))?;

        let part = reqwest::multipart::Part::bytes(wav)
            .file_name("utterance.wav")
            .mime_str("audio/wav")
            .map_err(|e| ServiceError::Request(e.to_string()))?;
        let form = reqwest::multipart::Form::new()
            .text("model", self.config.transcription_model.clone())
            .part("file", part);

        let url = format!("{}/v1/audio/transcriptions", self.config.base_url);

        let mut req = self.client.post(&url).multipart(form);
        if let Some(key) = self.config.bearer_key() {
            req = req.bearer_auth(key);
        }

        let response = check_status(req.send().await?).await?;
        let json: serde_json::Value = response
            .json()
            .await
            .map_err(|e| ServiceError::Parse(e.to_string()))?;

        extract_transcript(&json)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wav_encoding_produces_a_riff_header() {
        let audio = RecordedUtterance {
            samples: vec![0.0, 0.5, -0.5, 1.0],
            sample_rate: 16_000,
        };
        let wav = encode_wav(&audio).unwrap();
        assert_eq!(&wav[0..4], b"RIFF");
        assert_eq!(&wav[8..12], b"WAVE");
        // 44-byte header + 2 bytes per sample
        assert_eq!(wav.len(), 44 + audio.samples.len() * 2);
    }

    #[test]
    fn extract_transcript_trims_whitespace() {
        let json = serde_json::json!({ "text": "  hello there \n" });
        assert_eq!(extract_transcript(&json).unwrap(), "hello there");
    }

    #[test]
    fn extract_transcript_rejects_missing_text() {
        let json = serde_json::json!({ "status": "ok" });
        assert!(matches!(
            extract_transcript(&json),
            Err(ServiceError::EmptyResponse)
        ));
    }

    #[test]
    fn extract_transcript_rejects_blank_text() {
        let json = serde_json::json!({ "text": "   " });
        assert!(matches!(
            extract_transcript(&json),
            Err(ServiceError::EmptyResponse)
        ));
    }

    #[test]
    fn from_config_builds_without_panic() {
        let _client = OpenAiTranscription::from_config(&ApiConfig::default());
    }
}
