//! Audio devices — microphone capture, speaker playback, end-of-utterance
//! detection.
//!
//! # Pipeline position
//!
//! ```text
//! Microphone → cpal callback → CaptureFrame (mpsc) → VoiceChatController
//! VoiceChatController → SynthesizedSpeech → rodio Sink → Speaker
//! ```
//!
//! Both devices follow the same session shape: a channel that streams while
//! the device is live, channel close as the natural-completion signal, and
//! RAII drop as cancellation.  The controller therefore never holds a device
//! resource directly — releasing a session releases the hardware on every
//! exit path.

pub mod capture;
pub mod endpoint;
pub mod playback;

pub use capture::{AudioCaptureDevice, CaptureError, CaptureSession, CpalCapture};
pub use endpoint::{power_level, rms, Endpointer};
pub use playback::{AudioPlaybackDevice, PlaybackError, PlaybackSession, RodioPlayback};

// ---------------------------------------------------------------------------
// Audio data types
// ---------------------------------------------------------------------------

/// One buffer of captured audio as delivered by the capture device.
///
/// Samples are mono `f32` in `[-1.0, 1.0]`; `power` is the normalised
/// `[0, 1]` level of this buffer for the UI meter.
#[derive(Debug, Clone)]
pub struct CaptureFrame {
    pub samples: Vec<f32>,
    pub power: f32,
}

/// A complete recorded utterance, ready for transcription.
#[derive(Debug, Clone)]
pub struct RecordedUtterance {
    /// Mono PCM samples in `[-1.0, 1.0]`.
    pub samples: Vec<f32>,
    /// Sample rate in Hz.
    pub sample_rate: u32,
}

impl RecordedUtterance {
    /// Length of the recording in seconds.
    pub fn duration_secs(&self) -> f32 {
        if self.sample_rate == 0 {
            return 0.0;
        }
        self.samples.len() as f32 / self.sample_rate as f32
    }
}

/// Encoded audio returned by the text-to-speech service (MP3 by default).
#[derive(Debug, Clone)]
pub struct SynthesizedSpeech {
    pub bytes: Vec<u8>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn duration_is_samples_over_rate() {
        let utterance = RecordedUtterance {
            samples: vec![0.0; 32_000],
            sample_rate: 16_000,
        };
        assert!((utterance.duration_secs() - 2.0).abs() < f32::EPSILON);
    }

    #[test]
    fn duration_of_zero_rate_is_zero() {
        let utterance = RecordedUtterance {
            samples: vec![0.0; 100],
            sample_rate: 0,
        };
        assert_eq!(utterance.duration_secs(), 0.0);
    }
}
