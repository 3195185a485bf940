//! Phrase boundary detection ("gap logic").
//!
//! Fed one frame at a time with a speech/non-speech verdict, it buffers audio from
//! the first speech frame and yields an [`AudioTurn`] once the silence after speech
//! reaches the gap threshold (or the phrase hits its maximum length). Time is
//! measured in samples so the detector behaves the same in tests and on a live mic.

use chrono::{DateTime, Utc};
use std::time::Duration;
use tracing::debug;

/// A captured phrase: buffered PCM from speech start until the gap.
#[derive(Debug, Clone)]
pub struct AudioTurn {
    /// PCM samples (f32, -1.0..1.0) for the full phrase.
    pub samples: Vec<f32>,
    /// When the phrase was committed.
    pub timestamp: DateTime<Utc>,
    /// Speech duration from first speech frame to last speech frame.
    pub duration: Duration,
    /// Sample rate (e.g. 16000).
    pub sample_rate: u32,
}

/// Configuration for phrase detection
#[derive(Debug, Clone)]
pub struct TurnConfig {
    /// Silence after speech that ends the phrase (default: 800ms)
    pub silence_threshold: Duration,

    /// Shorter bursts are discarded as noise (default: 200ms)
    pub min_speech_duration: Duration,

    /// Phrase is committed at this length even without a gap (default: 30s)
    pub max_turn_duration: Duration,

    /// Sample rate for audio (default: 16000 Hz)
    pub sample_rate: u32,
}

impl Default for TurnConfig {
    fn default() -> Self {
        Self {
            silence_threshold: Duration::from_millis(800),
            min_speech_duration: Duration::from_millis(200),
            max_turn_duration: Duration::from_secs(30),
            sample_rate: 16000,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TurnState {
    Idle,
    Speaking,
    SilenceDetected,
}

/// Turns per-frame speech verdicts into whole phrases.
pub struct TurnDetector {
    config: TurnConfig,
    state: TurnState,
    audio_buffer: Vec<f32>,
    /// Samples buffered up to and including the last speech frame.
    speech_end: usize,
}

impl TurnDetector {
    pub fn new(config: TurnConfig) -> Self {
        Self {
            config,
            state: TurnState::Idle,
            audio_buffer: Vec::new(),
            speech_end: 0,
        }
    }

    fn samples_to_duration(&self, samples: usize) -> Duration {
        let nanos = samples as u64 * 1_000_000_000 / self.config.sample_rate.max(1) as u64;
        Duration::from_nanos(nanos)
    }

    /// Feed one frame. Returns the committed phrase when this frame completes one.
    pub fn push(&mut self, is_speech: bool, frame: &[f32]) -> Option<AudioTurn> {
        match (self.state, is_speech) {
            (TurnState::Idle, false) => return None,

            (TurnState::Idle, true) => {
                debug!(target: "herald::turn", "Speech started");
                self.state = TurnState::Speaking;
                self.audio_buffer.clear();
                self.audio_buffer.extend_from_slice(frame);
                self.speech_end = self.audio_buffer.len();
            }

            (TurnState::Speaking, true) | (TurnState::SilenceDetected, true) => {
                self.state = TurnState::Speaking;
                self.audio_buffer.extend_from_slice(frame);
                self.speech_end = self.audio_buffer.len();
            }

            (TurnState::Speaking, false) | (TurnState::SilenceDetected, false) => {
                self.state = TurnState::SilenceDetected;
                self.audio_buffer.extend_from_slice(frame);
                let silence = self.samples_to_duration(self.audio_buffer.len() - self.speech_end);
                if silence >= self.config.silence_threshold {
                    return self.commit();
                }
            }
        }

        if self.samples_to_duration(self.audio_buffer.len()) >= self.config.max_turn_duration {
            debug!(target: "herald::turn", "Max phrase duration reached, committing");
            return self.commit();
        }
        None
    }

    fn commit(&mut self) -> Option<AudioTurn> {
        let duration = self.samples_to_duration(self.speech_end);
        let samples = std::mem::take(&mut self.audio_buffer);
        self.reset();

        if duration < self.config.min_speech_duration {
            debug!(target: "herald::turn", "Speech too short ({:?}), ignoring", duration);
            return None;
        }

        Some(AudioTurn {
            samples,
            timestamp: Utc::now(),
            duration,
            sample_rate: self.config.sample_rate,
        })
    }

    fn reset(&mut self) {
        self.state = TurnState::Idle;
        self.audio_buffer.clear();
        self.speech_end = 0;
    }

    /// Current state name (for logging and tests)
    pub fn state(&self) -> &'static str {
        match self.state {
            TurnState::Idle => "idle",
            TurnState::Speaking => "speaking",
            TurnState::SilenceDetected => "silence_detected",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const FRAME: usize = 480; // 30ms at 16kHz

    fn detector() -> TurnDetector {
        TurnDetector::new(TurnConfig {
            silence_threshold: Duration::from_millis(90),
            min_speech_duration: Duration::from_millis(60),
            ..Default::default()
        })
    }

    #[test]
    fn phrase_commits_after_gap() {
        let mut d = detector();
        let speech = vec![0.5f32; FRAME];
        let silence = vec![0.0f32; FRAME];

        assert!(d.push(true, &speech).is_none());
        assert!(d.push(true, &speech).is_none());
        assert_eq!(d.state(), "speaking");
        assert!(d.push(false, &silence).is_none());
        assert!(d.push(false, &silence).is_none());
        assert_eq!(d.state(), "silence_detected");

        let turn = d.push(false, &silence).expect("gap reached");
        assert_eq!(turn.samples.len(), 5 * FRAME);
        assert_eq!(turn.duration, Duration::from_millis(60));
        assert_eq!(d.state(), "idle");
    }

    #[test]
    fn resumed_speech_extends_the_phrase() {
        let mut d = detector();
        let speech = vec![0.5f32; FRAME];
        let silence = vec![0.0f32; FRAME];

        d.push(true, &speech);
        d.push(false, &silence);
        d.push(true, &speech);
        assert_eq!(d.state(), "speaking");
        d.push(false, &silence);
        d.push(false, &silence);
        let turn = d.push(false, &silence).unwrap();
        assert_eq!(turn.duration, Duration::from_millis(90));
    }

    #[test]
    fn short_burst_is_discarded() {
        let mut d = detector();
        let silence = vec![0.0f32; FRAME];
        d.push(true, &vec![0.5f32; FRAME]);
        for _ in 0..3 {
            assert!(d.push(false, &silence).is_none());
        }
        assert_eq!(d.state(), "idle");
    }

    #[test]
    fn silence_alone_never_commits() {
        let mut d = detector();
        for _ in 0..100 {
            assert!(d.push(false, &[0.0f32; FRAME]).is_none());
        }
    }

    #[test]
    fn long_speech_is_cut_at_max_duration() {
        let mut d = TurnDetector::new(TurnConfig {
            max_turn_duration: Duration::from_millis(300),
            ..Default::default()
        });
        let speech = vec![0.5f32; FRAME];
        let mut committed = None;
        for _ in 0..20 {
            if let Some(t) = d.push(true, &speech) {
                committed = Some(t);
                break;
            }
        }
        let turn = committed.expect("max duration commit");
        assert_eq!(turn.samples.len(), 10 * FRAME);
    }
}
