//! Error types for the Herald voice loop

use thiserror::Error;

/// Result type alias for voice operations
pub type VoiceResult<T> = Result<T, VoiceError>;

/// Errors that can occur in the voice interaction loop
#[derive(Error, Debug)]
pub enum VoiceError {
    #[error("Audio device error: {0}")]
    AudioDevice(String),

    #[error("VAD processing error: {0}")]
    VadProcessing(String),

    #[error("Audio stream error: {0}")]
    AudioStream(String),

    #[error("Audio playback error: {0}")]
    Playback(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("STT error: {0}")]
    Stt(String),

    #[error("TTS error: {0}")]
    Tts(String),

    #[error("Speech synthesizer error: {0}")]
    Synthesizer(String),

    /// The typed-input surface reached end of input.
    #[error("Input closed")]
    InputClosed,

    #[error(transparent)]
    Recognition(#[from] RecognitionError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Why a single listening attempt produced no transcript. Every variant is retried.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RecognitionError {
    /// Audio was captured but could not be transcribed.
    #[error("Could not understand the audio")]
    Unintelligible,

    /// The recognition service could not be reached or refused the request.
    #[error("Could not request results from the recognition service: {0}")]
    NetworkFailure(String),

    /// The microphone could not be opened or stopped delivering audio.
    #[error("Microphone capture failed: {0}")]
    Capture(String),
}

impl From<cpal::DevicesError> for VoiceError {
    fn from(err: cpal::DevicesError) -> Self {
        VoiceError::AudioDevice(err.to_string())
    }
}

impl From<cpal::DefaultStreamConfigError> for VoiceError {
    fn from(err: cpal::DefaultStreamConfigError) -> Self {
        VoiceError::AudioDevice(err.to_string())
    }
}

impl From<cpal::BuildStreamError> for VoiceError {
    fn from(err: cpal::BuildStreamError) -> Self {
        VoiceError::AudioStream(err.to_string())
    }
}

impl From<cpal::PlayStreamError> for VoiceError {
    fn from(err: cpal::PlayStreamError) -> Self {
        VoiceError::AudioStream(err.to_string())
    }
}
