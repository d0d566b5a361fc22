//! Session state of the voice-chat pipeline.
//!
//! [`SessionState`] is the single source of truth for what the UI renders
//! and which commands are valid.  The controller mutates it; observers read
//! it through [`VoiceChatController`](super::VoiceChatController) accessors.

/// States of the voice-chat pipeline.
///
/// The state machine transitions are:
///
/// ```text
/// Idle / Error ──startCaptureAudio──▶ Recording
/// Recording    ──utterance ends────▶ Processing (STT → LLM → TTS)
/// Recording    ──cancelRecording───▶ Idle
/// Processing   ──all calls succeed─▶ Playing
/// Processing   ──any call fails────▶ Error
/// Processing   ──cancelProcessing──▶ Idle
/// Playing      ──playback done─────▶ Idle
/// Playing      ──cancelProcessing──▶ Idle
/// ```
#[derive(Debug, Clone, PartialEq)]
pub enum SessionState {
    /// Waiting for the user to start talking.
    Idle,

    /// Microphone is open; frames are streaming in.
    Recording,

    /// The chained transcription → completion → synthesis calls are running.
    Processing,

    /// The synthesized reply is being played.
    Playing,

    /// A pipeline stage failed; the payload is the displayable message.
    /// Cleared by the next `startCaptureAudio`.
    Error(String),
}

impl SessionState {
    /// Returns `true` while a pipeline stage is running.
    ///
    /// Holds the pending-operation invariant: an operation handle exists if
    /// and only if the state is busy.
    ///
    /// ```
    /// use voice_assistant::controller::SessionState;
    ///
    /// assert!(!SessionState::Idle.is_busy());
    /// assert!(SessionState::Recording.is_busy());
    /// assert!(SessionState::Processing.is_busy());
    /// assert!(SessionState::Playing.is_busy());
    /// assert!(!SessionState::Error("boom".into()).is_busy());
    /// ```
    pub fn is_busy(&self) -> bool {
        matches!(
            self,
            SessionState::Recording | SessionState::Processing | SessionState::Playing
        )
    }

    /// A short human-readable label suitable for the UI status line.
    pub fn label(&self) -> &'static str {
        match self {
            SessionState::Idle => "Idle",
            SessionState::Recording => "Listening…",
            SessionState::Processing => "Thinking…",
            SessionState::Playing => "Speaking…",
            SessionState::Error(_) => "Error",
        }
    }

    /// The displayable message when in `Error`, `None` otherwise.
    pub fn error_message(&self) -> Option<&str> {
        match self {
            SessionState::Error(message) => Some(message),
            _ => None,
        }
    }
}

impl Default for SessionState {
    fn default() -> Self {
        SessionState::Idle
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn busy_states_are_exactly_the_pipeline_states() {
        assert!(!SessionState::Idle.is_busy());
        assert!(SessionState::Recording.is_busy());
        assert!(SessionState::Processing.is_busy());
        assert!(SessionState::Playing.is_busy());
        assert!(!SessionState::Error("x".into()).is_busy());
    }

    #[test]
    fn labels_are_stable() {
        assert_eq!(SessionState::Idle.label(), "Idle");
        assert_eq!(SessionState::Recording.label(), "Listening…");
        assert_eq!(SessionState::Processing.label(), "Thinking…");
        assert_eq!(SessionState::Playing.label(), "Speaking…");
        assert_eq!(SessionState::Error("x".into()).label(), "Error");
    }

    #[test]
    fn error_message_is_present_only_in_error() {
        assert_eq!(SessionState::Idle.error_message(), None);
        assert_eq!(
            SessionState::Error("mic unplugged".into()).error_message(),
            Some("mic unplugged")
        );
    }

    #[test]
    fn default_state_is_idle() {
        assert_eq!(SessionState::default(), SessionState::Idle);
    }
}
