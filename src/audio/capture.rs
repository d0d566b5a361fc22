//! Microphone capture via `cpal`.
//!
//! [`AudioCaptureDevice`] is the capability contract the controller consumes:
//! `start()` opens the microphone and returns a [`CaptureSession`] streaming
//! [`CaptureFrame`]s.  The session's frame channel closing is the terminal
//! "utterance finished" signal; dropping the session cancels capture and
//! releases the microphone.
//!
//! [`CpalCapture`] is the production implementation.  `cpal::Stream` is
//! `!Send`, so the stream is built and owned by a dedicated thread; the cpal
//! callback forwards raw buffers to that thread, which downmixes to mono,
//! computes the power level, runs the [`Endpointer`], and emits frames over
//! a tokio channel.  Cancellation is checked between buffers, never
//! mid-buffer.

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use std::sync::mpsc::RecvTimeoutError;
use std::time::Duration;

use thiserror::Error;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::config::AudioConfig;

use super::endpoint::{power_level, Endpointer};
use super::CaptureFrame;

/// How long the capture thread waits on the callback channel before
/// re-checking the stop token.
const STOP_POLL_INTERVAL: Duration = Duration::from_millis(100);

// ---------------------------------------------------------------------------
// CaptureError
// ---------------------------------------------------------------------------

/// Errors that can occur while opening or running the microphone.
#[derive(Debug, Error)]
pub enum CaptureError {
    #[error("no input device found on the default audio host")]
    NoDevice,

    #[error("failed to query default input config: {0}")]
    DefaultConfig(#[from] cpal::DefaultStreamConfigError),

    #[error("failed to build input stream: {0}")]
    BuildStream(#[from] cpal::BuildStreamError),

    #[error("failed to start audio stream: {0}")]
    PlayStream(#[from] cpal::PlayStreamError),

    #[error("failed to spawn capture thread: {0}")]
    Thread(#[from] std::io::Error),

    #[error("capture thread exited before the stream started")]
    ThreadExited,
}

// ---------------------------------------------------------------------------
// CaptureSession
// ---------------------------------------------------------------------------

/// A live microphone session.
///
/// Frames arrive over an unbounded channel; `None` from
/// [`next_frame`](Self::next_frame) means the device detected the end of the
/// utterance (or hit the maximum duration) and has already released the
/// microphone.  Dropping the session cancels capture: the device stops
/// between buffers and emits nothing further.
pub struct CaptureSession {
    frames: mpsc::UnboundedReceiver<CaptureFrame>,
    sample_rate: u32,
    stop: CancellationToken,
}

impl CaptureSession {
    /// Assemble a session.  Device implementations (and test doubles) hand
    /// the frame sender and a clone of `stop` to whatever produces frames.
    pub fn new(
        frames: mpsc::UnboundedReceiver<CaptureFrame>,
        sample_rate: u32,
        stop: CancellationToken,
    ) -> Self {
        Self {
            frames,
            sample_rate,
            stop,
        }
    }

    /// Native sample rate of the captured audio in Hz.
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Await the next frame.  `None` means the utterance is finished.
    pub async fn next_frame(&mut self) -> Option<CaptureFrame> {
        self.frames.recv().await
    }
}

impl Drop for CaptureSession {
    fn drop(&mut self) {
        self.stop.cancel();
    }
}

// ---------------------------------------------------------------------------
// AudioCaptureDevice
// ---------------------------------------------------------------------------

/// Capability contract for the microphone, as consumed by the controller.
///
/// Implementors must guarantee that once the session is dropped or the
/// utterance has finished, no further frames are emitted and the physical
/// input resource is released.
pub trait AudioCaptureDevice: Send + Sync {
    /// Open the microphone and begin streaming frames.
    fn start(&self) -> Result<CaptureSession, CaptureError>;
}

// ---------------------------------------------------------------------------
// CpalCapture
// ---------------------------------------------------------------------------

/// Production capture device using the system default input via `cpal`.
pub struct CpalCapture {
    config: AudioConfig,
}

impl CpalCapture {
    pub fn new(config: AudioConfig) -> Self {
        Self { config }
    }
}

impl AudioCaptureDevice for CpalCapture {
    fn start(&self) -> Result<CaptureSession, CaptureError> {
        let host = cpal::default_host();
        let device = host.default_input_device().ok_or(CaptureError::NoDevice)?;

        let supported = device.default_input_config()?;
        let channels = supported.channels();
        let sample_rate = supported.sample_rate().0;
        let stream_config: cpal::StreamConfig = supported.into();

        let (raw_tx, raw_rx) = std::sync::mpsc::channel::<Vec<f32>>();
        let (frame_tx, frame_rx) = mpsc::unbounded_channel::<CaptureFrame>();
        let (ready_tx, ready_rx) = std::sync::mpsc::channel::<Result<(), CaptureError>>();

        let stop = CancellationToken::new();
        let thread_stop = stop.clone();
        let audio_config = self.config.clone();

        // The stream must be created on the thread that owns it for its
        // whole lifetime: cpal::Stream is !Send.
        std::thread::Builder::new()
            .name("audio-capture".into())
            .spawn(move || {
                let stream = match device.build_input_stream(
                    &stream_config,
                    move |data: &[f32], _: &cpal::InputCallbackInfo| {
                        // Ignore send errors; the capture thread may be gone.
                        let _ = raw_tx.send(data.to_vec());
                    },
                    |err: cpal::StreamError| {
                        log::error!("cpal stream error: {err}");
                    },
                    None,
                ) {
                    Ok(stream) => stream,
                    Err(e) => {
                        let _ = ready_tx.send(Err(e.into()));
                        return;
                    }
                };

                if let Err(e) = stream.play() {
                    let _ = ready_tx.send(Err(e.into()));
                    return;
                }
                let _ = ready_tx.send(Ok(()));

                let mut endpointer = Endpointer::from_config(&audio_config, sample_rate);

                loop {
                    if thread_stop.is_cancelled() {
                        break;
                    }
                    match raw_rx.recv_timeout(STOP_POLL_INTERVAL) {
                        Ok(raw) => {
                            let mono = downmix_to_mono(&raw, channels);
                            let power = power_level(&mono);
                            let finished = endpointer.push(&mono);
                            let frame = CaptureFrame {
                                samples: mono,
                                power,
                            };
                            if frame_tx.send(frame).is_err() {
                                break; // session dropped
                            }
                            if finished {
                                log::debug!("capture: end of utterance detected");
                                break;
                            }
                        }
                        Err(RecvTimeoutError::Timeout) => continue,
                        Err(RecvTimeoutError::Disconnected) => break,
                    }
                }

                // Dropping the stream stops the hardware and releases the
                // microphone; dropping frame_tx closes the session channel.
                drop(stream);
            })?;

        match ready_rx.recv() {
            Ok(Ok(())) => Ok(CaptureSession::new(frame_rx, sample_rate, stop)),
            Ok(Err(e)) => Err(e),
            Err(_) => Err(CaptureError::ThreadExited),
        }
    }
}

/// Average interleaved channels down to mono.  Mono input is passed through.
fn downmix_to_mono(samples: &[f32], channels: u16) -> Vec<f32> {
    if channels <= 1 {
        return samples.to_vec();
    }
    let channels = channels as usize;
    samples
        .chunks_exact(channels)
        .map(|frame| frame.iter().sum::<f32>() / channels as f32)
        .collect()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn downmix_passes_mono_through() {
        let samples = vec![0.1, 0.2, 0.3];
        assert_eq!(downmix_to_mono(&samples, 1), samples);
    }

    #[test]
    fn downmix_averages_stereo_pairs() {
        let samples = vec![0.0, 1.0, 0.5, 0.5];
        assert_eq!(downmix_to_mono(&samples, 2), vec![0.5, 0.5]);
    }

    #[tokio::test]
    async fn session_channel_close_is_end_of_utterance() {
        let (tx, rx) = mpsc::unbounded_channel();
        let mut session = CaptureSession::new(rx, 16_000, CancellationToken::new());

        tx.send(CaptureFrame {
            samples: vec![0.1; 4],
            power: 0.2,
        })
        .unwrap();
        drop(tx);

        assert!(session.next_frame().await.is_some());
        assert!(session.next_frame().await.is_none());
    }

    #[tokio::test]
    async fn dropping_the_session_cancels_the_stop_token() {
        let (_tx, rx) = mpsc::unbounded_channel::<CaptureFrame>();
        let stop = CancellationToken::new();
        let session = CaptureSession::new(rx, 48_000, stop.clone());

        assert_eq!(session.sample_rate(), 48_000);
        assert!(!stop.is_cancelled());
        drop(session);
        assert!(stop.is_cancelled());
    }
}
