//! Speech service boundary — transcription, completion, and synthesis.
//!
//! The controller consumes the three traits defined here and treats them
//! uniformly: each is one cancellable asynchronous request/response call
//! failing with a [`ServiceError`].  Cancellation happens at the call site
//! (dropping the future aborts the underlying HTTP request), so the traits
//! carry no cancellation parameter.
//!
//! Production implementations target any OpenAI-compatible endpoint:
//!
//! * [`OpenAiTranscription`] — `POST /v1/audio/transcriptions` (multipart WAV)
//! * [`OpenAiCompletion`]    — `POST /v1/chat/completions`
//! * [`OpenAiSpeech`]        — `POST /v1/audio/speech`
//!
//! All connection details come from [`ApiConfig`](crate::config::ApiConfig);
//! nothing is hardcoded.

use async_trait::async_trait;
use thiserror::Error;

use crate::audio::{RecordedUtterance, SynthesizedSpeech};

pub mod complete;
pub mod synthesize;
pub mod transcribe;
pub mod voice;

pub use complete::OpenAiCompletion;
pub use synthesize::OpenAiSpeech;
pub use transcribe::OpenAiTranscription;
pub use voice::VoiceType;

// ---------------------------------------------------------------------------
// ServiceError
// ---------------------------------------------------------------------------

/// Errors common to all three speech services.
///
/// Every variant renders a human-readable description; the controller never
/// inspects variants, it only displays the message.
#[derive(Debug, Error)]
pub enum ServiceError {
    /// HTTP transport or connection error.
    #[error("request failed: {0}")]
    Request(String),

    /// The request did not complete within the configured timeout.
    #[error("request timed out")]
    Timeout,

    /// The service answered with a non-success HTTP status.
    #[error("service returned HTTP {status}: {message}")]
    Api { status: u16, message: String },

    /// The response body could not be parsed as expected.
    #[error("failed to parse service response: {0}")]
    Parse(String),

    /// The service returned a response with no usable content.
    #[error("service returned an empty response")]
    EmptyResponse,

    /// The request payload could not be encoded.
    #[error("failed to encode request audio: {0}")]
    Encode(String),
}

impl From<reqwest::Error> for ServiceError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            ServiceError::Timeout
        } else {
            ServiceError::Request(e.to_string())
        }
    }
}

/// Longest error-body excerpt shown to the user, in bytes.
const MAX_ERROR_BODY_BYTES: usize = 200;

/// Map a non-success response to [`ServiceError::Api`], passing successes
/// through.
pub(crate) async fn check_status(
    response: reqwest::Response,
) -> Result<reqwest::Response, ServiceError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(api_error(status.as_u16(), body))
}

/// Build the [`ServiceError::Api`] for a non-success status, truncating the
/// body so a proxy's HTML error page cannot flood the UI.  Truncation backs
/// off to a `char` boundary; bodies are arbitrary bytes-as-text and may be
/// multibyte UTF-8.
fn api_error(status: u16, mut message: String) -> ServiceError {
    if message.len() > MAX_ERROR_BODY_BYTES {
        let mut end = MAX_ERROR_BODY_BYTES;
        while !message.is_char_boundary(end) {
            end -= 1;
        }
        message.truncate(end);
        message.push('…');
    }
    ServiceError::Api { status, message }
}

// ---------------------------------------------------------------------------
// Service traits
// ---------------------------------------------------------------------------

/// Turns a recorded utterance into text.
#[async_trait]
pub trait SpeechToTextService: Send + Sync {
    async fn transcribe(&self, audio: &RecordedUtterance) -> Result<String, ServiceError>;
}

/// Turns the user's transcript into a reply.
#[async_trait]
pub trait CompletionService: Send + Sync {
    async fn complete(&self, prompt: &str) -> Result<String, ServiceError>;
}

/// Turns reply text into spoken audio.
#[async_trait]
pub trait TextToSpeechService: Send + Sync {
    async fn synthesize(
        &self,
        text: &str,
        voice: VoiceType,
    ) -> Result<SynthesizedSpeech, ServiceError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_messages_are_displayable() {
        assert_eq!(ServiceError::Timeout.to_string(), "request timed out");
        assert_eq!(
            ServiceError::Api {
                status: 401,
                message: "invalid api key".into()
            }
            .to_string(),
            "service returned HTTP 401: invalid api key"
        );
    }

    #[test]
    fn short_error_bodies_pass_through_untruncated() {
        let err = api_error(429, "rate limit exceeded".into());
        assert_eq!(
            err.to_string(),
            "service returned HTTP 429: rate limit exceeded"
        );
    }

    #[test]
    fn long_error_bodies_are_truncated_with_ellipsis() {
        let err = api_error(502, "x".repeat(5000));
        let ServiceError::Api { status, message } = err else {
            panic!("expected Api error");
        };
        assert_eq!(status, 502);
        assert_eq!(message.len(), MAX_ERROR_BODY_BYTES + '…'.len_utf8());
        assert!(message.ends_with('…'));
    }

    #[test]
    fn truncation_backs_off_to_a_char_boundary() {
        // 'é' is two bytes and straddles the byte limit; truncating must not
        // split it (String::truncate panics mid-character).
        let mut body = "a".repeat(MAX_ERROR_BODY_BYTES - 1);
        body.push('é');
        body.push_str(&"b".repeat(50));

        let err = api_error(500, body);
        let ServiceError::Api { message, .. } = err else {
            panic!("expected Api error");
        };
        assert!(message.is_char_boundary(message.len()));
        assert_eq!(message, format!("{}…", "a".repeat(MAX_ERROR_BODY_BYTES - 1)));
    }

    #[test]
    fn multibyte_bodies_within_the_limit_survive_intact() {
        let body = "é".repeat(MAX_ERROR_BODY_BYTES / 2); // exactly 200 bytes
        let err = api_error(503, body.clone());
        let ServiceError::Api { message, .. } = err else {
            panic!("expected Api error");
        };
        assert_eq!(message, body);
    }
}
