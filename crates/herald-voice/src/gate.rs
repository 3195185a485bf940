//! Speech output gate: one rendering at a time.
//!
//! Every spoken output (greeting, prompts, replies, farewell) goes through
//! [`SpeechOutputGate`]. The device sits behind a mutex that is held for the whole
//! render, so two utterances never overlap even when one was dispatched in the
//! background and the next is spoken in the foreground.

use crate::error::VoiceResult;
use std::sync::{Arc, Mutex, PoisonError};
use tokio::task::JoinHandle;
use tracing::{debug, error, warn};

/// Something that turns text into audible speech, blocking until it has finished.
pub trait SpeechDevice: Send {
    fn render(&mut self, text: &str) -> VoiceResult<()>;
}

pub struct SpeechOutputGate {
    device: Mutex<Box<dyn SpeechDevice>>,
}

impl SpeechOutputGate {
    pub fn new(device: Box<dyn SpeechDevice>) -> Self {
        Self {
            device: Mutex::new(device),
        }
    }

    /// Render `text`, waiting for any rendering already in progress. Blocking.
    ///
    /// Whitespace-only text is skipped. Device errors are logged, not returned.
    pub fn speak(&self, text: &str) {
        if text.trim().is_empty() {
            return;
        }
        let mut device = self.device.lock().unwrap_or_else(PoisonError::into_inner);
        debug!(target: "herald::gate", chars = text.chars().count(), "Rendering speech");
        if let Err(e) = device.render(text) {
            warn!(target: "herald::gate", "Speech rendering failed: {}", e);
        }
    }

    /// Speak on a blocking thread and wait until the audio has finished.
    pub async fn speak_now(self: &Arc<Self>, text: String) {
        let gate = Arc::clone(self);
        if let Err(e) = tokio::task::spawn_blocking(move || gate.speak(&text)).await {
            error!(target: "herald::gate", "Speech task failed: {}", e);
        }
    }

    /// Start speaking in the background and return immediately.
    pub fn speak_detached(self: &Arc<Self>, text: String) -> JoinHandle<()> {
        let gate = Arc::clone(self);
        tokio::task::spawn_blocking(move || gate.speak(&text))
    }
}
