//! Application settings structs, defaults and TOML persistence.
//!
//! All structs implement `Serialize`, `Deserialize`, `Default` and `Clone`
//! so they can be round-tripped through TOML files and shared across
//! threads.

use anyhow::Result;
use serde::{Deserialize, Serialize};

use crate::services::VoiceType;

use super::AppPaths;

// ---------------------------------------------------------------------------
// ApiConfig
// ---------------------------------------------------------------------------

/// Connection settings shared by the transcription, completion, and speech
/// clients.  Any OpenAI-compatible provider works; nothing is hardcoded.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    /// Base URL of the API endpoint (e.g. `https://api.openai.com`).
    pub base_url: String,
    /// API key — `None` for local providers that require no authentication.
    pub api_key: Option<String>,
    /// Chat model used for reply generation.
    pub chat_model: String,
    /// Model used by the transcription endpoint.
    pub transcription_model: String,
    /// Model used by the speech-synthesis endpoint.
    pub speech_model: String,
    /// System prompt for the assistant.  Replies are spoken aloud, so the
    /// default asks for short answers.
    pub system_prompt: String,
    /// Sampling temperature (0.0 – 1.0) for reply generation.
    pub temperature: f32,
    /// Maximum seconds to wait for any single service response.
    pub timeout_secs: u64,
}

impl ApiConfig {
    /// The bearer token to attach, or `None` when the key is absent or
    /// empty (local providers such as Ollama reject auth headers).
    pub fn bearer_key(&self) -> Option<&str> {
        self.api_key.as_deref().filter(|key| !key.is_empty())
    }
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.openai.com".into(),
            api_key: None,
            chat_model: "gpt-4o-mini".into(),
            transcription_model: "whisper-1".into(),
            speech_model: "tts-1".into(),
            system_prompt:
                "You are a helpful voice assistant. Answer briefly; your reply will be spoken aloud."
                    .into(),
            temperature: 0.7,
            timeout_secs: 30,
        }
    }
}

// ---------------------------------------------------------------------------
// AudioConfig
// ---------------------------------------------------------------------------

/// Settings for microphone capture and end-of-utterance detection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AudioConfig {
    /// RMS amplitude below which a buffer counts as silence.  Typical value
    /// `0.015` for a quiet room; raise it in noisy environments.
    pub silence_threshold: f32,
    /// Milliseconds of trailing silence (after speech) that end the
    /// utterance.
    pub trailing_silence_ms: u64,
    /// Hard cap on utterance length in seconds.
    pub max_utterance_secs: f32,
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            silence_threshold: 0.015,
            trailing_silence_ms: 800,
            max_utterance_secs: 30.0,
        }
    }
}

// ---------------------------------------------------------------------------
// AppConfig  (top-level)
// ---------------------------------------------------------------------------

/// Top-level application configuration, serialised as `settings.toml`.
///
/// # Persistence
///
/// ```rust,no_run
/// use voice_assistant::config::AppConfig;
///
/// // Load (returns Default when file is missing)
/// let config = AppConfig::load().unwrap();
///
/// // Modify and save
/// // config.save().unwrap();
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Speech-service connection settings.
    pub api: ApiConfig,
    /// Capture / endpointer settings.
    pub audio: AudioConfig,
    /// Voice preset selected on startup.
    pub default_voice: VoiceType,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            api: ApiConfig::default(),
            audio: AudioConfig::default(),
            default_voice: VoiceType::default(),
        }
    }
}

impl AppConfig {
    /// Load configuration from the platform-appropriate `settings.toml`.
    ///
    /// Returns `Ok(AppConfig::default())` when the file does not exist yet
    /// (first-run scenario) so callers never need to special-case a missing
    /// file.
    pub fn load() -> Result<Self> {
        Self::load_from(&AppPaths::new().settings_file)
    }

    /// Load from an explicit path (useful for tests).
    pub fn load_from(path: &std::path::Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&content)?;
        Ok(config)
    }

    /// Save configuration to the platform-appropriate `settings.toml`,
    /// creating parent directories as needed.
    pub fn save(&self) -> Result<()> {
        self.save_to(&AppPaths::new().settings_file)
    }

    /// Save to an explicit path (useful for tests).
    pub fn save_to(&self, path: &std::path::Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    /// Verify that a default `AppConfig` can be serialised to TOML and
    /// deserialised back without any data loss.
    #[test]
    fn round_trip_toml() {
        let dir = tempdir().expect("temp dir");
        let path = dir.path().join("settings.toml");

        let mut original = AppConfig::default();
        original.api.api_key = Some("sk-test".into());
        original.default_voice = VoiceType::Nova;
        original.save_to(&path).expect("save");

        let loaded = AppConfig::load_from(&path).expect("load");
        assert_eq!(loaded.api.api_key.as_deref(), Some("sk-test"));
        assert_eq!(loaded.api.chat_model, original.api.chat_model);
        assert_eq!(loaded.default_voice, VoiceType::Nova);
        assert!(
            (loaded.audio.silence_threshold - original.audio.silence_threshold).abs()
                < f32::EPSILON
        );
    }

    #[test]
    fn missing_file_loads_default() {
        let dir = tempdir().expect("temp dir");
        let path = dir.path().join("does-not-exist.toml");

        let loaded = AppConfig::load_from(&path).expect("load");
        assert_eq!(loaded.api.base_url, "https://api.openai.com");
    }

    #[test]
    fn bearer_key_ignores_empty_strings() {
        let mut api = ApiConfig::default();
        assert!(api.bearer_key().is_none());

        api.api_key = Some(String::new());
        assert!(api.bearer_key().is_none());

        api.api_key = Some("sk-live".into());
        assert_eq!(api.bearer_key(), Some("sk-live"));
    }
}
