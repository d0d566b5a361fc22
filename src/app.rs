//! Voice assistant window — egui/eframe presentation layer.
//!
//! [`AssistantApp`] is a thin observer over the controller: every frame it
//! takes one [`StateSnapshot`](crate::controller::StateSnapshot) and renders
//! the matching affordances.  All behaviour lives in the controller; the UI
//! never holds pipeline state of its own.
//!
//! # Widget states
//!
//! | State | Visual |
//! |-------|--------|
//! | `Idle` / `Error` | mic button (+ error caption when in `Error`) |
//! | `Recording` | live power meter + cancel-recording button |
//! | `Processing` | spinner + stop button |
//! | `Playing` | live power meter + stop button |

use std::sync::Arc;
use std::time::Duration;

use eframe::egui;

use crate::controller::{SessionState, VoiceChatController};
use crate::services::VoiceType;

/// Number of bars in the power meter.
const METER_BARS: usize = 24;

/// Top-level eframe application.
pub struct AssistantApp {
    controller: Arc<VoiceChatController>,
}

impl AssistantApp {
    pub fn new(controller: Arc<VoiceChatController>) -> Self {
        Self { controller }
    }

    /// Crude symmetric bar meter driven by the current power level.
    fn power_meter(ui: &mut egui::Ui, power: f32) {
        let desired = egui::vec2(ui.available_width(), 64.0);
        let (rect, _) = ui.allocate_exact_size(desired, egui::Sense::hover());
        let painter = ui.painter();

        let bar_w = rect.width() / METER_BARS as f32;
        for i in 0..METER_BARS {
            // Taller towards the centre, scaled by power.
            let centre_dist = (i as f32 - METER_BARS as f32 / 2.0).abs() / (METER_BARS as f32 / 2.0);
            let height = (rect.height() * power * (1.0 - centre_dist * 0.8)).max(2.0);
            let x = rect.left() + i as f32 * bar_w + bar_w * 0.25;
            let bar = egui::Rect::from_min_max(
                egui::pos2(x, rect.center().y - height / 2.0),
                egui::pos2(x + bar_w * 0.5, rect.center().y + height / 2.0),
            );
            painter.rect_filled(bar, 1.0, egui::Color32::from_rgb(90, 170, 255));
        }
    }

    fn voice_picker(&self, ui: &mut egui::Ui, enabled: bool, current: VoiceType) {
        ui.add_enabled_ui(enabled, |ui| {
            ui.horizontal(|ui| {
                ui.label("Voice:");
                for voice in VoiceType::ALL {
                    if ui.selectable_label(voice == current, voice.label()).clicked() {
                        self.controller.set_voice(voice);
                    }
                }
            });
        });
    }
}

impl eframe::App for AssistantApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        let snapshot = self.controller.snapshot();

        egui::CentralPanel::default().show(ctx, |ui| {
            ui.vertical_centered(|ui| {
                ui.add_space(8.0);
                ui.heading("AI Voice Assistant");
                ui.label(snapshot.state.label());
                ui.add_space(8.0);

                match &snapshot.state {
                    SessionState::Recording | SessionState::Playing => {
                        Self::power_meter(ui, snapshot.power);
                    }
                    SessionState::Processing => {
                        ui.add_space(20.0);
                        ui.add(egui::Spinner::new().size(32.0));
                        ui.add_space(20.0);
                    }
                    _ => {
                        Self::power_meter(ui, 0.0);
                    }
                }
                ui.add_space(8.0);

                match &snapshot.state {
                    SessionState::Idle | SessionState::Error(_) => {
                        if ui
                            .add(egui::Button::new("🎤  Start talking").min_size([160.0, 36.0].into()))
                            .clicked()
                        {
                            self.controller.start_capture_audio();
                        }
                    }
                    SessionState::Recording => {
                        if ui
                            .add(egui::Button::new("✖  Cancel recording").min_size([160.0, 36.0].into()))
                            .clicked()
                        {
                            self.controller.cancel_recording();
                        }
                    }
                    SessionState::Processing | SessionState::Playing => {
                        if ui
                            .add(egui::Button::new("⏹  Stop").min_size([160.0, 36.0].into()))
                            .clicked()
                        {
                            self.controller.cancel_processing_speech();
                        }
                    }
                }
                ui.add_space(12.0);

                self.voice_picker(ui, snapshot.state == SessionState::Idle, snapshot.voice);

                if let Some(message) = snapshot.state.error_message() {
                    ui.add_space(8.0);
                    ui.colored_label(egui::Color32::from_rgb(220, 80, 80), message);
                }
            });
        });

        // Keep the meter and state label live without user input.
        ctx.request_repaint_after(Duration::from_millis(50));
    }
}
