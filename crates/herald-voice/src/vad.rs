//! Voice Activity Detection using WebRTC VAD
//!
//! Classifies 30 ms frames as voice or non-voice. The microphone combines this
//! with the calibrated ambient energy level before treating a frame as speech.

use crate::error::{VoiceError, VoiceResult};
use webrtc_vad::{SampleRate, Vad, VadMode};

/// Configuration for VAD detection
#[derive(Debug, Clone)]
pub struct VadConfig {
    /// Sample rate (must be 8000, 16000, 32000, or 48000 Hz for WebRTC VAD)
    pub sample_rate: u32,

    /// Detection mode (0-3, where 3 is most aggressive)
    pub mode: u8,
}

impl Default for VadConfig {
    fn default() -> Self {
        Self {
            sample_rate: 16000,
            mode: 2,
        }
    }
}

fn vad_mode(mode: u8) -> VoiceResult<VadMode> {
    match mode {
        0 => Ok(VadMode::Quality),
        1 => Ok(VadMode::LowBitrate),
        2 => Ok(VadMode::Aggressive),
        3 => Ok(VadMode::VeryAggressive),
        other => Err(VoiceError::Config(format!("VAD mode must be 0-3, got {}", other))),
    }
}

fn vad_sample_rate(rate: u32) -> VoiceResult<SampleRate> {
    match rate {
        8000 => Ok(SampleRate::Rate8kHz),
        16000 => Ok(SampleRate::Rate16kHz),
        32000 => Ok(SampleRate::Rate32kHz),
        48000 => Ok(SampleRate::Rate48kHz),
        other => Err(VoiceError::Config(format!(
            "WebRTC VAD only supports 8000, 16000, 32000, or 48000 Hz, got {}",
            other
        ))),
    }
}

/// Voice Activity Detector using WebRTC VAD. Not `Send`; create it on the capture thread.
pub struct VadDetector {
    vad: Vad,
    chunk_size: usize,
}

impl VadDetector {
    /// Create a new VAD detector with the given configuration
    pub fn new(config: VadConfig) -> VoiceResult<Self> {
        let mode = vad_mode(config.mode)?;
        let sample_rate = vad_sample_rate(config.sample_rate)?;

        // WebRTC VAD accepts 10, 20 or 30 ms frames; 30 ms at 16 kHz = 480 samples
        let chunk_size = (config.sample_rate as usize * 30) / 1000;

        let mut vad = Vad::new();
        vad.set_mode(mode);
        vad.set_sample_rate(sample_rate);

        Ok(Self { vad, chunk_size })
    }

    /// Whether the frame contains voice. The frame must be exactly `chunk_size` samples.
    pub fn is_voice(&mut self, audio: &[f32]) -> VoiceResult<bool> {
        if audio.len() != self.chunk_size {
            return Err(VoiceError::VadProcessing(
                format!("Expected {} samples, got {}", self.chunk_size, audio.len())
            ));
        }

        let audio_i16: Vec<i16> = audio
            .iter()
            .map(|&sample| (sample.clamp(-1.0, 1.0) * 32767.0) as i16)
            .collect();

        self.vad.is_voice_segment(&audio_i16)
            .map_err(|e| VoiceError::VadProcessing(format!("VAD processing failed: {:?}", e)))
    }

    /// Get the expected chunk size in samples
    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_vad_initialization() {
        let detector = VadDetector::new(VadConfig::default()).unwrap();
        assert_eq!(detector.chunk_size(), 480);
    }

    #[test]
    fn test_invalid_sample_rate() {
        let config = VadConfig {
            sample_rate: 44100,
            ..Default::default()
        };
        assert!(VadDetector::new(config).is_err());
    }

    #[test]
    fn test_invalid_mode() {
        let config = VadConfig {
            mode: 7,
            ..Default::default()
        };
        assert!(VadDetector::new(config).is_err());
    }

    #[test]
    fn test_chunk_size_validation() {
        let mut detector = VadDetector::new(VadConfig::default()).unwrap();
        assert!(detector.is_voice(&[0.0f32; 100]).is_err());
    }

    #[test]
    fn test_silence_detection() {
        let mut detector = VadDetector::new(VadConfig::default()).unwrap();
        assert!(!detector.is_voice(&[0.0f32; 480]).unwrap());
    }
}
