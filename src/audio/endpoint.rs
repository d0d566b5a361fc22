//! Energy-based end-of-utterance detection and power-level helpers.
//!
//! [`Endpointer`] decides when the user has finished speaking.  The capture
//! device feeds it one buffer at a time; once speech has been heard and the
//! trailing silence exceeds the configured duration (or the utterance hits
//! the maximum length), the device closes its frame channel and the
//! controller moves on to transcription.
//!
//! ## Algorithm
//!
//! A buffer is classified as *voice* when its RMS amplitude exceeds the
//! configured threshold.  The endpointer arms itself on the first voice
//! buffer; from then on it counts consecutive silent samples and reports
//! the utterance as finished when the silent run crosses the trailing
//! window.  Until speech is heard it never finishes early, so a slow
//! speaker is not cut off — only the maximum-duration cap applies.

use crate::config::AudioConfig;

/// Gain applied to raw RMS when mapping it into the `[0, 1]` power range
/// shown by the UI.  Conversational speech RMS sits around 0.05–0.2.
const POWER_GAIN: f32 = 5.0;

/// Root-mean-square amplitude of a sample buffer.  Returns `0.0` for an
/// empty buffer.
pub fn rms(samples: &[f32]) -> f32 {
    if samples.is_empty() {
        return 0.0;
    }
    let sum_sq: f32 = samples.iter().map(|s| s * s).sum();
    (sum_sq / samples.len() as f32).sqrt()
}

/// Normalised power level in `[0, 1]` for a sample buffer; `0.0` for an
/// empty one (the playback meter window can be empty right before the sink
/// drains).
///
/// Purely observational — the UI renders it as a meter; nothing in the
/// pipeline branches on it.
pub fn power_level(samples: &[f32]) -> f32 {
    (rms(samples) * POWER_GAIN).clamp(0.0, 1.0)
}

// ---------------------------------------------------------------------------
// Endpointer
// ---------------------------------------------------------------------------

/// Detects the end of a spoken utterance from a stream of sample buffers.
///
/// # Example
///
/// ```
/// use voice_assistant::audio::Endpointer;
///
/// // threshold 0.01, 16 kHz, stop after 100 ms of trailing silence,
/// // hard cap at 10 s
/// let mut ep = Endpointer::new(0.01, 16_000, 100, 10.0);
///
/// let silence = vec![0.0_f32; 800];
/// let speech = vec![0.5_f32; 800];
///
/// assert!(!ep.push(&silence)); // leading silence never finishes
/// assert!(!ep.push(&speech));  // speech arms the detector
/// assert!(!ep.push(&silence)); // 50 ms of silence — not yet
/// assert!(ep.push(&silence));  // 100 ms of silence — utterance done
/// ```
pub struct Endpointer {
    /// RMS threshold separating voice from silence.
    threshold: f32,
    /// Consecutive silent samples required (after speech) to finish.
    trailing_silence_samples: usize,
    /// Hard cap on total utterance length in samples.
    max_samples: usize,
    /// Total samples seen so far.
    total: usize,
    /// Length of the current silent run in samples.
    silent_run: usize,
    /// Whether at least one voice buffer has been seen.
    heard_speech: bool,
}

impl Endpointer {
    /// Create an endpointer for a stream at `sample_rate` Hz.
    pub fn new(
        threshold: f32,
        sample_rate: u32,
        trailing_silence_ms: u64,
        max_utterance_secs: f32,
    ) -> Self {
        let per_ms = sample_rate as usize / 1000;
        Self {
            threshold,
            trailing_silence_samples: trailing_silence_ms as usize * per_ms,
            max_samples: (max_utterance_secs * sample_rate as f32) as usize,
            total: 0,
            silent_run: 0,
            heard_speech: false,
        }
    }

    /// Build an endpointer from the persisted audio settings.
    pub fn from_config(config: &AudioConfig, sample_rate: u32) -> Self {
        Self::new(
            config.silence_threshold,
            sample_rate,
            config.trailing_silence_ms,
            config.max_utterance_secs,
        )
    }

    /// Feed one buffer of mono samples.  Returns `true` when the utterance
    /// is finished (trailing silence elapsed or maximum length reached).
    pub fn push(&mut self, samples: &[f32]) -> bool {
        self.total += samples.len();

        if rms(samples) >= self.threshold {
            self.heard_speech = true;
            self.silent_run = 0;
        } else {
            self.silent_run += samples.len();
        }

        if self.total >= self.max_samples {
            return true;
        }
        self.heard_speech && self.silent_run >= self.trailing_silence_samples
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    // ---- rms / power_level ---

    #[test]
    fn rms_of_empty_buffer_is_zero() {
        assert_eq!(rms(&[]), 0.0);
    }

    #[test]
    fn rms_of_constant_signal_is_its_amplitude() {
        let buf = vec![0.5_f32; 1000];
        assert!((rms(&buf) - 0.5).abs() < 1e-6);
    }

    #[test]
    fn power_level_is_clamped_to_one() {
        let loud = vec![1.0_f32; 100];
        assert_eq!(power_level(&loud), 1.0);
    }

    #[test]
    fn power_level_of_silence_is_zero() {
        let quiet = vec![0.0_f32; 100];
        assert_eq!(power_level(&quiet), 0.0);
    }

    #[test]
    fn power_level_of_empty_window_is_zero() {
        // The playback meter can hit an empty window when the cursor passes
        // the end of the clip before the sink drains.
        assert_eq!(power_level(&[]), 0.0);
    }

    // ---- Endpointer ---

    fn speech(ms: usize) -> Vec<f32> {
        vec![0.5_f32; 16 * ms] // 16 samples per ms at 16 kHz
    }

    fn silence(ms: usize) -> Vec<f32> {
        vec![0.0_f32; 16 * ms]
    }

    #[test]
    fn leading_silence_never_finishes() {
        let mut ep = Endpointer::new(0.01, 16_000, 200, 60.0);
        for _ in 0..50 {
            assert!(!ep.push(&silence(100)));
        }
    }

    #[test]
    fn finishes_after_trailing_silence() {
        let mut ep = Endpointer::new(0.01, 16_000, 200, 60.0);
        assert!(!ep.push(&speech(100)));
        assert!(!ep.push(&silence(100)));
        assert!(ep.push(&silence(100)));
    }

    #[test]
    fn speech_resets_the_silent_run() {
        let mut ep = Endpointer::new(0.01, 16_000, 200, 60.0);
        assert!(!ep.push(&speech(100)));
        assert!(!ep.push(&silence(150)));
        assert!(!ep.push(&speech(50))); // speaker resumed
        assert!(!ep.push(&silence(150)));
        assert!(ep.push(&silence(100)));
    }

    #[test]
    fn max_duration_caps_a_nonstop_talker() {
        let mut ep = Endpointer::new(0.01, 16_000, 200, 1.0);
        assert!(!ep.push(&speech(500)));
        assert!(ep.push(&speech(600))); // 1.1 s total
    }

    #[test]
    fn max_duration_caps_pure_silence_too() {
        let mut ep = Endpointer::new(0.01, 16_000, 200, 1.0);
        assert!(!ep.push(&silence(900)));
        assert!(ep.push(&silence(200)));
    }

    #[test]
    fn from_config_uses_the_persisted_tuning() {
        let config = AudioConfig {
            silence_threshold: 0.02,
            trailing_silence_ms: 100,
            max_utterance_secs: 60.0,
        };
        let mut ep = Endpointer::from_config(&config, 16_000);

        // 0.015 RMS is below the configured 0.02 threshold → still silence.
        assert!(!ep.push(&vec![0.015_f32; 1600]));
        assert!(!ep.push(&speech(100)));
        assert!(ep.push(&silence(100)));
    }
}
