//! Application entry point.
//!
//! # Startup sequence
//!
//! 1. Initialise logging.
//! 2. Load [`AppConfig`] from disk (returns default on first run).
//! 3. Create the tokio runtime (multi-thread, 2 workers) for the utterance
//!    tasks.
//! 4. Build the speech-service clients and audio devices from config.
//! 5. Construct the [`VoiceChatController`].
//! 6. Run [`eframe::run_native`] — blocks the main thread until the window
//!    is closed.

use std::sync::Arc;

use eframe::egui;

use voice_assistant::{
    app::AssistantApp,
    audio::{CpalCapture, RodioPlayback},
    config::AppConfig,
    controller::VoiceChatController,
    services::{OpenAiCompletion, OpenAiSpeech, OpenAiTranscription},
};

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = AppConfig::load().unwrap_or_else(|e| {
        log::warn!("failed to load settings, using defaults: {e}");
        AppConfig::default()
    });
    if config.api.bearer_key().is_none() {
        log::warn!("no API key configured; remote services will likely reject requests");
    }

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(2)
        .enable_all()
        .build()?;

    let controller = Arc::new(VoiceChatController::new(
        Arc::new(CpalCapture::new(config.audio.clone())),
        Arc::new(RodioPlayback::new()),
        Arc::new(OpenAiTranscription::from_config(&config.api)),
        Arc::new(OpenAiCompletion::from_config(&config.api)),
        Arc::new(OpenAiSpeech::from_config(&config.api)),
        config.default_voice,
        runtime.handle().clone(),
    ));

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([380.0, 420.0])
            .with_min_inner_size([320.0, 360.0]),
        ..Default::default()
    };

    eframe::run_native(
        "AI Voice Assistant",
        options,
        Box::new(move |_cc| Ok(Box::new(AssistantApp::new(controller)))),
    )
    .map_err(|e| anyhow::anyhow!("failed to run UI: {e}"))?;

    Ok(())
}
