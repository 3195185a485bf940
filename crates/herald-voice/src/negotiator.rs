//! Long-message consent.
//!
//! Short text is handed straight to the speech gate in the background. Text longer
//! than the session's limit is only spoken after the user agrees, asked through the
//! channel of the current mode.

use crate::error::RecognitionError;
use crate::gate::SpeechOutputGate;
use crate::input::{normalize_transcript, InputChannel};
use herald_core::{Mode, Session};
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

pub const LONG_MESSAGE_PROMPT: &str = "The message is quite long. Do you want me to read it?";
pub const LONG_MESSAGE_ACK: &str = "Okay, here it is:";
pub const LONG_MESSAGE_SKIPPED: &str = "Not speaking the long message.";

const AFFIRMATIONS: [&str; 3] = ["yes", "sure", "go ahead"];

/// How a piece of text reaches the speech gate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeliveryMode {
    Immediate,
    PendingConsent,
}

/// Sanitized text waiting to be spoken.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpeechRequest {
    pub text: String,
    pub mode: DeliveryMode,
}

impl SpeechRequest {
    /// Length is counted in characters, not bytes.
    pub fn classify(text: String, max_speak_length: usize) -> Self {
        let mode = if text.chars().count() <= max_speak_length {
            DeliveryMode::Immediate
        } else {
            DeliveryMode::PendingConsent
        };
        Self { text, mode }
    }
}

/// Answer to the "read it?" question.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConsentOutcome {
    Affirmed,
    Declined,
    /// Nothing usable was heard; ask again.
    UnrecognizedRetry,
}

impl ConsentOutcome {
    pub fn from_reply(reply: &str) -> Self {
        let reply = reply.trim().to_lowercase();
        if AFFIRMATIONS.contains(&reply.as_str()) {
            ConsentOutcome::Affirmed
        } else {
            ConsentOutcome::Declined
        }
    }

    pub fn from_recognition(heard: Result<String, RecognitionError>) -> Self {
        match heard {
            Ok(reply) => Self::from_reply(&normalize_transcript(&reply)),
            Err(_) => ConsentOutcome::UnrecognizedRetry,
        }
    }
}

/// What `deliver` did with the text.
#[derive(Debug)]
pub enum Delivery {
    /// Empty text; nothing was spoken.
    Nothing,
    /// Speech is running in the background.
    Dispatched(JoinHandle<()>),
    /// The user declined a long message.
    Declined,
}

pub struct LongMessageNegotiator {
    gate: Arc<SpeechOutputGate>,
    input: InputChannel,
}

impl LongMessageNegotiator {
    pub fn new(gate: Arc<SpeechOutputGate>, input: InputChannel) -> Self {
        Self { gate, input }
    }

    /// Speak `text`, asking first when it is longer than `session.max_speak_length`.
    ///
    /// Returns without waiting for the speech itself to finish.
    pub async fn deliver(&self, text: String, session: &Session) -> Delivery {
        if text.trim().is_empty() {
            return Delivery::Nothing;
        }
        let request = SpeechRequest::classify(text, session.max_speak_length);
        if request.mode == DeliveryMode::Immediate {
            return Delivery::Dispatched(self.gate.speak_detached(request.text));
        }

        debug!(
            target: "herald::negotiator",
            chars = request.text.chars().count(),
            limit = session.max_speak_length,
            "Asking before reading a long message"
        );
        match self.ask_consent(session).await {
            ConsentOutcome::Affirmed => {
                match session.mode {
                    Mode::Voice => self.gate.speak_now(LONG_MESSAGE_ACK.to_string()).await,
                    Mode::Text => self.input.print(LONG_MESSAGE_ACK),
                }
                Delivery::Dispatched(self.gate.speak_detached(request.text))
            }
            ConsentOutcome::Declined | ConsentOutcome::UnrecognizedRetry => {
                info!(target: "herald::negotiator", "{}", LONG_MESSAGE_SKIPPED);
                if session.mode == Mode::Text {
                    self.input.print(LONG_MESSAGE_SKIPPED);
                }
                Delivery::Declined
            }
        }
    }

    /// Voice mode keeps listening until something is understood; text mode reads one line.
    async fn ask_consent(&self, session: &Session) -> ConsentOutcome {
        match session.mode {
            Mode::Voice => {
                self.gate.speak_now(LONG_MESSAGE_PROMPT.to_string()).await;
                loop {
                    let outcome =
                        ConsentOutcome::from_recognition(self.input.listen_once(session).await);
                    if outcome != ConsentOutcome::UnrecognizedRetry {
                        return outcome;
                    }
                }
            }
            Mode::Text => {
                let prompt = format!("{} (yes/no): ", LONG_MESSAGE_PROMPT);
                match self.input.read_typed(&prompt).await {
                    Ok(Some(reply)) => ConsentOutcome::from_reply(&reply),
                    Ok(None) => ConsentOutcome::Declined,
                    Err(e) => {
                        warn!(target: "herald::negotiator", "Could not read consent: {}", e);
                        ConsentOutcome::Declined
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classify_counts_characters() {
        let text = "é".repeat(200);
        assert_eq!(text.len(), 400);
        assert_eq!(
            SpeechRequest::classify(text, 200).mode,
            DeliveryMode::Immediate
        );
        assert_eq!(
            SpeechRequest::classify("x".repeat(201), 200).mode,
            DeliveryMode::PendingConsent
        );
    }

    #[test]
    fn only_exact_affirmations_count() {
        for yes in ["yes", "  YES ", "Sure", "go ahead"] {
            assert_eq!(ConsentOutcome::from_reply(yes), ConsentOutcome::Affirmed);
        }
        for no in ["no", "yes please", "yeah", "", "go"] {
            assert_eq!(ConsentOutcome::from_reply(no), ConsentOutcome::Declined);
        }
    }

    #[test]
    fn recognition_errors_retry() {
        assert_eq!(
            ConsentOutcome::from_recognition(Err(RecognitionError::Unintelligible)),
            ConsentOutcome::UnrecognizedRetry
        );
        assert_eq!(
            ConsentOutcome::from_recognition(Ok("sure".to_string())),
            ConsentOutcome::Affirmed
        );
    }

    #[test]
    fn spoken_consent_ignores_sentence_punctuation() {
        assert_eq!(
            ConsentOutcome::from_recognition(Ok("Yes.".to_string())),
            ConsentOutcome::Affirmed
        );
        assert_eq!(
            ConsentOutcome::from_recognition(Ok("Go ahead!".to_string())),
            ConsentOutcome::Affirmed
        );
        assert_eq!(
            ConsentOutcome::from_recognition(Ok("No.".to_string())),
            ConsentOutcome::Declined
        );
    }
}
