//! **Microphone**: capture one spoken phrase with ambient-noise calibration.
//!
//! Opens the default input via CPAL, spends a short window measuring the room's
//! background level, then treats a 30 ms frame as speech only when WebRTC VAD says
//! "voice" *and* its energy clears the calibrated threshold. Frames go through the
//! gap logic in [`TurnDetector`] until a phrase is committed. Everything here is
//! blocking; callers run it on a blocking thread.

use crate::audio::{rms, AudioCapture, AudioChunk, AudioConfig};
use crate::error::{VoiceError, VoiceResult};
use crate::turn::{AudioTurn, TurnConfig, TurnDetector};
use crate::vad::{VadConfig, VadDetector};
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, info};

/// Configuration for phrase capture.
#[derive(Debug, Clone)]
pub struct MicrophoneConfig {
    /// Sample rate (default 16000). Must be a WebRTC VAD rate.
    pub sample_rate: u32,
    /// Frame size in samples (default 480 = 30ms at 16kHz).
    pub chunk_size: usize,
    /// How long to listen to the room before capturing (default 1s).
    pub calibration: Duration,
    /// Speech must be this many times louder than the ambient level (default 1.5).
    pub energy_ratio: f32,
    /// Lower bound for the energy threshold, so a silent room still needs real speech.
    pub min_energy: f32,
    /// Silence after speech that ends the phrase (default 800ms).
    pub gap_ms: u64,
    /// Minimum speech length kept (default 200ms).
    pub min_speech_ms: u64,
    /// Longest phrase before it is cut (default 30s).
    pub max_phrase: Duration,
    /// WebRTC VAD aggressiveness, 0-3 (default 2).
    pub vad_mode: u8,
}

impl Default for MicrophoneConfig {
    fn default() -> Self {
        Self {
            sample_rate: 16000,
            chunk_size: 480,
            calibration: Duration::from_secs(1),
            energy_ratio: 1.5,
            min_energy: 0.005,
            gap_ms: 800,
            min_speech_ms: 200,
            max_phrase: Duration::from_secs(30),
            vad_mode: 2,
        }
    }
}

/// Background level measured during calibration.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AmbientLevel {
    pub rms: f32,
    pub threshold: f32,
}

impl AmbientLevel {
    /// Average frame energy over `frames`, scaled by `ratio` and floored at `min_energy`.
    pub fn calibrate<'a>(
        frames: impl IntoIterator<Item = &'a [f32]>,
        ratio: f32,
        min_energy: f32,
    ) -> Self {
        let (sum, count) = frames
            .into_iter()
            .fold((0.0f32, 0usize), |(sum, n), f| (sum + rms(f), n + 1));
        let ambient = if count == 0 { 0.0 } else { sum / count as f32 };
        Self {
            rms: ambient,
            threshold: (ambient * ratio).max(min_energy),
        }
    }

    pub fn is_loud_enough(&self, frame: &[f32]) -> bool {
        rms(frame) > self.threshold
    }
}

/// Default-input microphone that yields one phrase per call.
#[derive(Debug, Clone, Default)]
pub struct Microphone {
    config: MicrophoneConfig,
}

impl Microphone {
    pub fn new(config: MicrophoneConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &MicrophoneConfig {
        &self.config
    }

    /// Calibrate against ambient noise, then block until one phrase is captured.
    pub fn capture_phrase(&self) -> VoiceResult<AudioTurn> {
        let audio_config = AudioConfig {
            sample_rate: self.config.sample_rate,
            channels: 1,
            buffer_size: self.config.chunk_size,
        };
        let chunk_ms = audio_config.chunk_ms().max(1);
        let capture = AudioCapture::new(audio_config)?;
        let (audio_tx, mut audio_rx) = mpsc::unbounded_channel::<AudioChunk>();

        // Capture stops when the stream handle is dropped at the end of this call.
        let _stream = capture.start_capture(audio_tx)?;

        let calibration_frames = (self.config.calibration.as_millis() as u64 / chunk_ms).max(1);
        let mut ambient_frames = Vec::with_capacity(calibration_frames as usize);
        while (ambient_frames.len() as u64) < calibration_frames {
            let chunk = next_chunk(&mut audio_rx)?;
            ambient_frames.push(chunk.samples);
        }
        let ambient = AmbientLevel::calibrate(
            ambient_frames.iter().map(Vec::as_slice),
            self.config.energy_ratio,
            self.config.min_energy,
        );
        debug!(
            target: "herald::microphone",
            ambient_rms = ambient.rms,
            threshold = ambient.threshold,
            "Ambient noise calibrated"
        );

        let mut vad = VadDetector::new(VadConfig {
            sample_rate: self.config.sample_rate,
            mode: self.config.vad_mode,
        })?;
        let mut detector = TurnDetector::new(TurnConfig {
            silence_threshold: Duration::from_millis(self.config.gap_ms),
            min_speech_duration: Duration::from_millis(self.config.min_speech_ms),
            max_turn_duration: self.config.max_phrase,
            sample_rate: self.config.sample_rate,
        });

        info!(target: "herald::microphone", "Listening for a command...");
        loop {
            let chunk = next_chunk(&mut audio_rx)?;
            if chunk.samples.len() != vad.chunk_size() {
                continue;
            }
            let is_speech = match vad.is_voice(&chunk.samples) {
                Ok(voice) => voice && ambient.is_loud_enough(&chunk.samples),
                Err(e) => {
                    debug!(target: "herald::microphone", "VAD frame skipped: {}", e);
                    continue;
                }
            };
            if let Some(turn) = detector.push(is_speech, &chunk.samples) {
                debug!(
                    target: "herald::microphone",
                    "Phrase captured: {:.1}s, {} samples",
                    turn.duration.as_secs_f32(),
                    turn.samples.len()
                );
                return Ok(turn);
            }
        }
    }
}

fn next_chunk(rx: &mut mpsc::UnboundedReceiver<AudioChunk>) -> VoiceResult<AudioChunk> {
    rx.blocking_recv()
        .ok_or_else(|| VoiceError::AudioStream("capture stream closed".to_string()))
}
