//! Voice-chat orchestration core.
//!
//! This module wires one utterance → spoken-reply cycle and exposes the
//! state the presentation layer observes.
//!
//! # Architecture
//!
//! ```text
//! UI command (start / cancel / voice)
//!        │
//!        ▼
//! VoiceChatController ── spawns ──▶ UtteranceTask (tokio)
//!        ▲                              │
//!        │ guarded transitions          ├─ CaptureSession   [Recording]
//!        │ (generation + token)         ├─ STT → LLM → TTS  [Processing]
//!        │                              └─ PlaybackSession  [Playing]
//!        │
//! snapshot() / state() / power_level() ←─ read by the UI each frame
//! ```

pub mod session;
pub mod state;

// ---------------------------------------------------------------------------
// Public re-exports
// ---------------------------------------------------------------------------

pub use session::{ChatError, StateSnapshot, VoiceChatController};
pub use state::SessionState;
