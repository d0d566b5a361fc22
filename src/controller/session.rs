//! The voice-chat controller — drives capture → transcription → completion
//! → synthesis → playback for exactly one utterance at a time.
//!
//! # Concurrency model
//!
//! [`VoiceChatController`] is the single owner of session state.  Commands
//! (`start_capture_audio`, `cancel_recording`, `cancel_processing_speech`,
//! voice selection) and stage results all serialise on one mutex-guarded
//! inner struct, so two commands can never race the state into an
//! inconsistent shape.  The lock is never held across an `.await`.
//!
//! Each started utterance gets a fresh generation number and one
//! [`CancellationToken`] covering the whole chained call — from the
//! cancellation standpoint the three service calls are indistinguishable,
//! so a single "stop" must be able to interrupt whichever one is in flight.
//! Every stage boundary re-checks that the utterance is still the current
//! pending operation before advancing; a cancellation racing a
//! just-completed call therefore can never push a stale result into the
//! state, and cancelling an operation that already finished is a harmless
//! no-op.
//!
//! Device resources are scoped: the capture session is dropped before the
//! first network call, the playback session before the task exits, so the
//! microphone and the speaker are each released unconditionally on every
//! exit path and never held simultaneously.

use std::sync::{Arc, Mutex};

use thiserror::Error;
use tokio::runtime::Handle;
use tokio_util::sync::CancellationToken;

use crate::audio::{
    AudioCaptureDevice, AudioPlaybackDevice, CaptureError, PlaybackError, RecordedUtterance,
};
use crate::services::{
    CompletionService, ServiceError, SpeechToTextService, TextToSpeechService, VoiceType,
};

use super::state::SessionState;

// ---------------------------------------------------------------------------
// ChatError
// ---------------------------------------------------------------------------

/// A stage failure, tagged with the stage it came from.
///
/// Every variant renders the displayable message that becomes the
/// `SessionState::Error` payload; errors never propagate past the
/// controller.
#[derive(Debug, Error)]
pub enum ChatError {
    #[error("audio capture failed: {0}")]
    Capture(#[from] CaptureError),

    #[error("transcription failed: {0}")]
    Transcription(ServiceError),

    #[error("completion failed: {0}")]
    Completion(ServiceError),

    #[error("speech synthesis failed: {0}")]
    Synthesis(ServiceError),

    #[error("audio playback failed: {0}")]
    Playback(#[from] PlaybackError),
}

// ---------------------------------------------------------------------------
// Controller internals
// ---------------------------------------------------------------------------

/// Handle to the asynchronous stage currently running.  At most one exists;
/// it is created when an utterance starts and released (only) when the
/// utterance completes, fails, or is cancelled.
struct PendingOperation {
    generation: u64,
    cancel: CancellationToken,
}

/// Mutex-guarded session state.  All mutation goes through short critical
/// sections in the controller and the utterance task.
struct Inner {
    state: SessionState,
    power: f32,
    voice: VoiceType,
    pending: Option<PendingOperation>,
    generation: u64,
}

impl Inner {
    /// Whether `generation` is still the live pending operation.  False
    /// after a cancel command or once a newer utterance started.
    fn is_current(&self, generation: u64) -> bool {
        self.pending
            .as_ref()
            .is_some_and(|op| op.generation == generation)
    }
}

/// A consistent point-in-time view of the observable surface.
#[derive(Debug, Clone)]
pub struct StateSnapshot {
    pub state: SessionState,
    pub power: f32,
    pub voice: VoiceType,
}

// ---------------------------------------------------------------------------
// VoiceChatController
// ---------------------------------------------------------------------------

/// Orchestrates one utterance → spoken-reply cycle at a time.
///
/// Construct once with injected collaborators and share by reference (or
/// `Arc`) with whatever drives it; all commands take `&self`.
pub struct VoiceChatController {
    inner: Arc<Mutex<Inner>>,
    capture: Arc<dyn AudioCaptureDevice>,
    playback: Arc<dyn AudioPlaybackDevice>,
    transcription: Arc<dyn SpeechToTextService>,
    completion: Arc<dyn CompletionService>,
    synthesis: Arc<dyn TextToSpeechService>,
    runtime: Handle,
}

impl VoiceChatController {
    /// Create a controller with injected devices and services.
    ///
    /// `runtime` is the handle the utterance tasks are spawned on — the UI
    /// thread calling the commands does not need to live inside the tokio
    /// runtime.
    pub fn new(
        capture: Arc<dyn AudioCaptureDevice>,
        playback: Arc<dyn AudioPlaybackDevice>,
        transcription: Arc<dyn SpeechToTextService>,
        completion: Arc<dyn CompletionService>,
        synthesis: Arc<dyn TextToSpeechService>,
        voice: VoiceType,
        runtime: Handle,
    ) -> Self {
        Self {
            inner: Arc::new(Mutex::new(Inner {
                state: SessionState::Idle,
                power: 0.0,
                voice,
                pending: None,
                generation: 0,
            })),
            capture,
            playback,
            transcription,
            completion,
            synthesis,
            runtime,
        }
    }

    // -----------------------------------------------------------------------
    // Commands
    // -----------------------------------------------------------------------

    /// Start capturing a new utterance.  Valid in `Idle` or `Error` (where
    /// it also clears the error); a no-op in every other state.
    pub fn start_capture_audio(&self) {
        let (generation, cancel, voice) = {
            let mut inner = self.inner.lock().unwrap();
            if inner.state.is_busy() {
                return;
            }
            inner.generation += 1;
            let cancel = CancellationToken::new();
            inner.state = SessionState::Recording;
            inner.power = 0.0;
            inner.pending = Some(PendingOperation {
                generation: inner.generation,
                cancel: cancel.clone(),
            });
            (inner.generation, cancel, inner.voice)
        };

        log::debug!("controller: startCaptureAudio → Recording (utterance {generation})");

        let task = UtteranceTask {
            inner: Arc::clone(&self.inner),
            capture: Arc::clone(&self.capture),
            playback: Arc::clone(&self.playback),
            transcription: Arc::clone(&self.transcription),
            completion: Arc::clone(&self.completion),
            synthesis: Arc::clone(&self.synthesis),
            voice,
            generation,
            cancel,
        };
        self.runtime.spawn(task.run());
    }

    /// Abort the current recording without issuing any network calls.
    /// Valid only in `Recording`; a no-op otherwise.
    pub fn cancel_recording(&self) {
        let mut inner = self.inner.lock().unwrap();
        if !matches!(inner.state, SessionState::Recording) {
            return;
        }
        if let Some(op) = inner.pending.take() {
            op.cancel.cancel();
        }
        inner.state = SessionState::Idle;
        inner.power = 0.0;
        log::debug!("controller: cancelRecording → Idle");
    }

    /// Cancel whichever chained service call is in flight, or stop playback.
    /// Valid in `Processing` or `Playing`; a no-op otherwise — including
    /// when the operation finished microseconds earlier.
    pub fn cancel_processing_speech(&self) {
        let mut inner = self.inner.lock().unwrap();
        if !matches!(
            inner.state,
            SessionState::Processing | SessionState::Playing
        ) {
            return;
        }
        if let Some(op) = inner.pending.take() {
            op.cancel.cancel();
        }
        inner.state = SessionState::Idle;
        inner.power = 0.0;
        log::debug!("controller: cancelProcessingSpeech → Idle");
    }

    /// Select the synthesis voice.  Accepted only while `Idle` (changing
    /// voice mid-utterance is undefined); returns whether the change took
    /// effect.
    pub fn set_voice(&self, voice: VoiceType) -> bool {
        let mut inner = self.inner.lock().unwrap();
        if !matches!(inner.state, SessionState::Idle) {
            return false;
        }
        inner.voice = voice;
        true
    }

    // -----------------------------------------------------------------------
    // Observable surface
    // -----------------------------------------------------------------------

    /// Current session state.
    pub fn state(&self) -> SessionState {
        self.inner.lock().unwrap().state.clone()
    }

    /// Most recent normalised power level.  Meaningful only during
    /// `Recording` and `Playing`; don't-care elsewhere.
    pub fn power_level(&self) -> f32 {
        self.inner.lock().unwrap().power
    }

    /// Currently selected voice.
    pub fn voice(&self) -> VoiceType {
        self.inner.lock().unwrap().voice
    }

    /// Displayable message when in `Error`, `None` otherwise.
    pub fn error_message(&self) -> Option<String> {
        self.inner
            .lock()
            .unwrap()
            .state
            .error_message()
            .map(str::to_string)
    }

    /// Whether a pipeline stage is currently running.  Always equals
    /// `state().is_busy()` — the two mutate under the same lock.
    pub fn operation_in_flight(&self) -> bool {
        self.inner.lock().unwrap().pending.is_some()
    }

    /// A consistent view of state, power, and voice in one lock acquisition.
    pub fn snapshot(&self) -> StateSnapshot {
        let inner = self.inner.lock().unwrap();
        StateSnapshot {
            state: inner.state.clone(),
            power: inner.power,
            voice: inner.voice,
        }
    }
}

// ---------------------------------------------------------------------------
// UtteranceTask
// ---------------------------------------------------------------------------

/// One spawned task per utterance: owns the cancellation token and the
/// generation it was started under.
struct UtteranceTask {
    inner: Arc<Mutex<Inner>>,
    capture: Arc<dyn AudioCaptureDevice>,
    playback: Arc<dyn AudioPlaybackDevice>,
    transcription: Arc<dyn SpeechToTextService>,
    completion: Arc<dyn CompletionService>,
    synthesis: Arc<dyn TextToSpeechService>,
    voice: VoiceType,
    generation: u64,
    cancel: CancellationToken,
}

impl UtteranceTask {
    async fn run(self) {
        if let Err(err) = self.drive().await {
            self.fail(err);
        }
    }

    /// The full pipeline.  Returns `Ok(())` both on success and when the
    /// utterance was cancelled or superseded — in those cases the state was
    /// already reset by the command that cancelled it.
    async fn drive(&self) -> Result<(), ChatError> {
        // ── 1. Capture ────────────────────────────────────────────────────
        let mut session = self.capture.start()?;
        let sample_rate = session.sample_rate();
        let mut samples: Vec<f32> = Vec::new();

        loop {
            tokio::select! {
                biased;
                _ = self.cancel.cancelled() => {
                    // cancelRecording already reset the state; dropping the
                    // session releases the microphone.
                    return Ok(());
                }
                frame = session.next_frame() => match frame {
                    Some(frame) => {
                        self.update_power(frame.power);
                        samples.extend_from_slice(&frame.samples);
                    }
                    None => break, // device signalled end of utterance
                }
            }
        }

        // Microphone released before any network call; the controller never
        // holds capture and playback at the same time.
        drop(session);

        if !self.advance(SessionState::Processing) {
            return Ok(());
        }
        let utterance = RecordedUtterance {
            samples,
            sample_rate,
        };
        log::debug!(
            "controller: utterance {} recorded {:.2}s of audio",
            self.generation,
            utterance.duration_secs()
        );

        // ── 2. Chained service calls, strictly sequential ─────────────────
        let transcript = tokio::select! {
            biased;
            _ = self.cancel.cancelled() => return Ok(()),
            res = self.transcription.transcribe(&utterance) => {
                res.map_err(ChatError::Transcription)?
            }
        };
        if !self.still_current() {
            return Ok(());
        }
        log::debug!("controller: transcript = {transcript:?}");

        let reply = tokio::select! {
            biased;
            _ = self.cancel.cancelled() => return Ok(()),
            res = self.completion.complete(&transcript) => {
                res.map_err(ChatError::Completion)?
            }
        };
        if !self.still_current() {
            return Ok(());
        }
        log::debug!("controller: reply = {reply:?}");

        let speech = tokio::select! {
            biased;
            _ = self.cancel.cancelled() => return Ok(()),
            res = self.synthesis.synthesize(&reply, self.voice) => {
                res.map_err(ChatError::Synthesis)?
            }
        };

        // ── 3. Playback ───────────────────────────────────────────────────
        if !self.advance(SessionState::Playing) {
            return Ok(());
        }
        let mut playback = self.playback.play(speech)?;

        loop {
            tokio::select! {
                biased;
                _ = self.cancel.cancelled() => {
                    // cancelProcessingSpeech already reset the state;
                    // dropping the session silences the speaker.
                    return Ok(());
                }
                tick = playback.next_power() => match tick {
                    Some(power) => self.update_power(power),
                    None => break, // played to the end
                }
            }
        }

        self.finish();
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Guarded transitions
    // -----------------------------------------------------------------------

    /// Move to `state` if this utterance is still the pending operation.
    /// Returns `false` when cancelled or superseded — the caller bails out.
    fn advance(&self, state: SessionState) -> bool {
        let mut inner = self.inner.lock().unwrap();
        if !inner.is_current(self.generation) {
            return false;
        }
        inner.power = 0.0;
        inner.state = state;
        true
    }

    fn still_current(&self) -> bool {
        self.inner.lock().unwrap().is_current(self.generation)
    }

    fn update_power(&self, power: f32) {
        let mut inner = self.inner.lock().unwrap();
        if inner.is_current(self.generation) {
            inner.power = power;
        }
    }

    /// Successful end of the utterance: release the operation handle and
    /// return to `Idle`.
    fn finish(&self) {
        let mut inner = self.inner.lock().unwrap();
        if !inner.is_current(self.generation) {
            return;
        }
        inner.pending = None;
        inner.power = 0.0;
        inner.state = SessionState::Idle;
        log::debug!("controller: utterance {} complete → Idle", self.generation);
    }

    /// Stage failure: release the operation handle and surface the message.
    /// Ignored if a cancel command won the race — user cancellation always
    /// resolves to `Idle`, never `Error`.
    fn fail(&self, err: ChatError) {
        let mut inner = self.inner.lock().unwrap();
        if !inner.is_current(self.generation) {
            return;
        }
        log::error!("controller: utterance {} failed: {err}", self.generation);
        inner.pending = None;
        inner.power = 0.0;
        inner.state = SessionState::Error(err.to_string());
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
