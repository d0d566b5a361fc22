//! Speaker playback via `rodio`.
//!
//! [`AudioPlaybackDevice`] mirrors the capture contract: `play()` hands the
//! device a synthesized clip and returns a [`PlaybackSession`] that streams
//! power ticks while the audio is audible.  The tick channel closing is the
//! natural-completion signal; dropping the session stops playback
//! immediately and releases the output device.
//!
//! [`RodioPlayback`] decodes the clip up front (so a malformed clip fails
//! before the `Playing` state is entered), then plays it through a `Sink`
//! owned by a dedicated thread.  rodio exposes no output meter, so the
//! thread computes RMS over the decoded samples at the playback cursor on
//! every tick.

use std::io::Cursor;
use std::time::{Duration, Instant};

use rodio::buffer::SamplesBuffer;
use rodio::{OutputStream, Sink, Source};
use thiserror::Error;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use super::endpoint::power_level;
use super::SynthesizedSpeech;

/// Interval between power ticks sent to the controller.
const POWER_TICK: Duration = Duration::from_millis(50);

// ---------------------------------------------------------------------------
// PlaybackError
// ---------------------------------------------------------------------------

/// Errors that can occur while decoding or starting playback.
#[derive(Debug, Error)]
pub enum PlaybackError {
    #[error("failed to decode synthesized audio: {0}")]
    Decode(String),

    #[error("the synthesized clip contained no audio")]
    EmptyClip,

    #[error("failed to open output device: {0}")]
    Output(String),

    #[error("failed to spawn playback thread: {0}")]
    Thread(#[from] std::io::Error),

    #[error("playback thread exited before the sink started")]
    ThreadExited,
}

// ---------------------------------------------------------------------------
// PlaybackSession
// ---------------------------------------------------------------------------

/// A live playback session.
///
/// `None` from [`next_power`](Self::next_power) means the clip played to the
/// end and the output device has been released.  Dropping the session
/// cancels playback: the device goes silent between ticks and releases its
/// resources.
pub struct PlaybackSession {
    power: mpsc::UnboundedReceiver<f32>,
    stop: CancellationToken,
}

impl PlaybackSession {
    pub fn new(power: mpsc::UnboundedReceiver<f32>, stop: CancellationToken) -> Self {
        Self { power, stop }
    }

    /// Await the next power tick.  `None` means playback completed.
    pub async fn next_power(&mut self) -> Option<f32> {
        self.power.recv().await
    }
}

impl Drop for PlaybackSession {
    fn drop(&mut self) {
        self.stop.cancel();
    }
}

// ---------------------------------------------------------------------------
// AudioPlaybackDevice
// ---------------------------------------------------------------------------

/// Capability contract for the speaker, as consumed by the controller.
///
/// Implementors must guarantee immediate silence and resource release when
/// the returned session is dropped.
pub trait AudioPlaybackDevice: Send + Sync {
    /// Begin playing the clip.
    fn play(&self, speech: SynthesizedSpeech) -> Result<PlaybackSession, PlaybackError>;
}

// ---------------------------------------------------------------------------
// RodioPlayback
// ---------------------------------------------------------------------------

/// Production playback device using the system default output via `rodio`.
pub struct RodioPlayback;

impl RodioPlayback {
    pub fn new() -> Self {
        Self
    }
}

impl Default for RodioPlayback {
    fn default() -> Self {
        Self::new()
    }
}

impl AudioPlaybackDevice for RodioPlayback {
    fn play(&self, speech: SynthesizedSpeech) -> Result<PlaybackSession, PlaybackError> {
        // Decode before entering Playing so format errors surface as a
        // normal stage failure.
        let decoder = rodio::Decoder::new(Cursor::new(speech.bytes))
            .map_err(|e| PlaybackError::Decode(e.to_string()))?;
        let channels = decoder.channels();
        let sample_rate = decoder.sample_rate();
        let samples: Vec<f32> = decoder.convert_samples().collect();
        if samples.is_empty() {
            return Err(PlaybackError::EmptyClip);
        }

        let (power_tx, power_rx) = mpsc::unbounded_channel::<f32>();
        let (ready_tx, ready_rx) = std::sync::mpsc::channel::<Result<(), PlaybackError>>();

        let stop = CancellationToken::new();
        let thread_stop = stop.clone();

        // OutputStream is !Send; it lives entirely on the playback thread.
        std::thread::Builder::new()
            .name("audio-playback".into())
            .spawn(move || {
                let (stream, handle) = match OutputStream::try_default() {
                    Ok(pair) => pair,
                    Err(e) => {
                        let _ = ready_tx.send(Err(PlaybackError::Output(e.to_string())));
                        return;
                    }
                };
                let sink = match Sink::try_new(&handle) {
                    Ok(sink) => sink,
                    Err(e) => {
                        let _ = ready_tx.send(Err(PlaybackError::Output(e.to_string())));
                        return;
                    }
                };

                sink.append(SamplesBuffer::new(channels, sample_rate, samples.clone()));
                let _ = ready_tx.send(Ok(()));

                let started = Instant::now();
                let samples_per_sec = sample_rate as usize * channels as usize;
                let tick_samples = samples_per_sec * POWER_TICK.as_millis() as usize / 1000;

                loop {
                    if thread_stop.is_cancelled() {
                        sink.stop();
                        log::debug!("playback: cancelled");
                        break;
                    }
                    if sink.empty() {
                        log::debug!("playback: clip finished");
                        break;
                    }

                    // Meter the window currently being played.
                    let cursor =
                        (started.elapsed().as_secs_f32() * samples_per_sec as f32) as usize;
                    let start = cursor.min(samples.len());
                    let end = (cursor + tick_samples).min(samples.len());
                    if power_tx.send(power_level(&samples[start..end])).is_err() {
                        sink.stop();
                        break;
                    }
                    std::thread::sleep(POWER_TICK);
                }

                drop(stream);
            })?;

        match ready_rx.recv() {
            Ok(Ok(())) => Ok(PlaybackSession::new(power_rx, stop)),
            Ok(Err(e)) => Err(e),
            Err(_) => Err(PlaybackError::ThreadExited),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn tick_channel_close_is_natural_completion() {
        let (tx, rx) = mpsc::unbounded_channel();
        let mut session = PlaybackSession::new(rx, CancellationToken::new());

        tx.send(0.3).unwrap();
        drop(tx);

        assert_eq!(session.next_power().await, Some(0.3));
        assert!(session.next_power().await.is_none());
    }

    #[tokio::test]
    async fn dropping_the_session_cancels_the_stop_token() {
        let (_tx, rx) = mpsc::unbounded_channel::<f32>();
        let stop = CancellationToken::new();
        let session = PlaybackSession::new(rx, stop.clone());

        assert!(!stop.is_cancelled());
        drop(session);
        assert!(stop.is_cancelled());
    }

    #[test]
    fn garbage_bytes_fail_to_decode() {
        let device = RodioPlayback::new();
        let result = device.play(SynthesizedSpeech {
            bytes: vec![0x00, 0x01, 0x02, 0x03],
        });
        assert!(matches!(result, Err(PlaybackError::Decode(_))));
    }
}
