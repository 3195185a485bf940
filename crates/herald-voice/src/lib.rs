//! # Herald Voice - the interaction controller
//!
//! Turns spoken or typed commands into web searches, mode switches or chat turns,
//! and speaks the results back.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                       Command Router                         │
//! │  ┌──────────────┐   ┌──────────────┐   ┌──────────────┐      │
//! │  │ Input Channel│ → │  classify    │ → │ chat/search  │      │
//! │  │ (mic | tty)  │   │ exit/search/ │   │   backends   │      │
//! │  └──────────────┘   │ mode/chat    │   └──────────────┘      │
//! │         ↑           └──────────────┘          ↓              │
//! │  ┌──────────────┐                     ┌──────────────┐       │
//! │  │  Microphone  │                     │  Sanitizer   │       │
//! │  │ (cpal + VAD) │                     └──────────────┘       │
//! │  └──────────────┘                             ↓              │
//! │  ┌──────────────┐   ┌──────────────┐   ┌──────────────┐      │
//! │  │ Speech Device│ ← │ Output Gate  │ ← │  Long-message│      │
//! │  │ (say | API)  │   │ (one at once)│   │  negotiator  │      │
//! │  └──────────────┘   └──────────────┘   └──────────────┘      │
//! └──────────────────────────────────────────────────────────────┘
//! ```

pub mod audio;
pub mod error;
pub mod gate;
pub mod input;
pub mod microphone;
pub mod negotiator;
pub mod router;
pub mod sanitizer;
pub mod stt;
pub mod turn;
pub mod vad;
pub mod voice_output;

pub use audio::{AudioCapture, AudioChunk, AudioConfig};
pub use error::{RecognitionError, VoiceError, VoiceResult};
pub use gate::{SpeechDevice, SpeechOutputGate};
pub use input::{
    normalize_transcript, Console, InputChannel, SpeechRecognizer, StdConsole, TEXT_PROMPT,
};
pub use microphone::{AmbientLevel, Microphone, MicrophoneConfig};
pub use negotiator::{
    ConsentOutcome, Delivery, DeliveryMode, LongMessageNegotiator, SpeechRequest,
    LONG_MESSAGE_ACK, LONG_MESSAGE_PROMPT, LONG_MESSAGE_SKIPPED,
};
pub use router::{
    Command, CommandRouter, Flow, CHAT_FAILURE_MESSAGE, EMPTY_QUERY_MESSAGE, SEARCH_QUERY_PROMPT,
    SEARCH_TRIGGER,
};
pub use sanitizer::{sanitize, RawText};
pub use stt::{pcm_f32_to_wav, ApiRecognizer};
pub use turn::{AudioTurn, TurnConfig, TurnDetector};
pub use vad::{VadConfig, VadDetector};
pub use voice_output::{
    list_voices, write_voice_list, ApiSpeechDevice, OpenAiTts, Synthesizer, SystemSpeechDevice,
    TtsBackend, VoiceInfo,
};
