//! Voice assistant — turns a spoken question into a spoken AI reply.
//!
//! The pipeline is capture → transcription → completion → synthesis →
//! playback, orchestrated by
//! [`VoiceChatController`](controller::VoiceChatController), which the UI
//! drives with start/cancel commands and observes through state snapshots.
//!
//! # Module map
//!
//! * [`controller`] — session state machine and cancellation discipline
//! * [`audio`]      — microphone / speaker devices and utterance endpointing
//! * [`services`]   — speech-to-text, completion, text-to-speech clients
//! * [`config`]     — TOML-persisted settings
//! * [`app`]        — egui presentation layer

pub mod app;
pub mod audio;
pub mod config;
pub mod controller;
pub mod services;
