//! Input channel: where commands come from in each mode.
//!
//! Voice mode listens through a [`SpeechRecognizer`] and retries until something is
//! understood. Text mode reads one line from a [`Console`]. The mode is read from the
//! session on every call, so a switch takes effect on the very next command.

use crate::error::{RecognitionError, VoiceError, VoiceResult};
use async_trait::async_trait;
use herald_core::{Mode, Origin, Session, Utterance};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, Lines, Stdin};
use tokio::sync::Mutex;
use tracing::{info, warn};

/// Prompt shown before each typed command.
pub const TEXT_PROMPT: &str = "Enter command: ";

/// Sentence punctuation transcription services add to the end of a phrase.
const TRAILING_PUNCTUATION: [char; 4] = ['.', ',', '!', '?'];

/// Pause before listening again after the microphone itself failed.
const CAPTURE_RETRY_DELAY: Duration = Duration::from_millis(500);

/// Line-oriented terminal.
#[async_trait]
pub trait Console: Send + Sync {
    /// Show `prompt` and read one line. `None` at end of input.
    async fn read_line(&self, prompt: &str) -> VoiceResult<Option<String>>;

    fn print(&self, line: &str);
}

/// One listening attempt: capture a phrase and transcribe it.
#[async_trait]
pub trait SpeechRecognizer: Send + Sync {
    async fn listen(&self, language: &str) -> Result<String, RecognitionError>;
}

/// Console on the process's stdin/stdout.
pub struct StdConsole {
    lines: Mutex<Lines<BufReader<Stdin>>>,
}

impl StdConsole {
    pub fn new() -> Self {
        Self {
            lines: Mutex::new(BufReader::new(tokio::io::stdin()).lines()),
        }
    }
}

impl Default for StdConsole {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Console for StdConsole {
    async fn read_line(&self, prompt: &str) -> VoiceResult<Option<String>> {
        let mut stdout = tokio::io::stdout();
        stdout.write_all(prompt.as_bytes()).await?;
        stdout.flush().await?;
        let mut lines = self.lines.lock().await;
        Ok(lines.next_line().await?)
    }

    fn print(&self, line: &str) {
        println!("{}", line);
    }
}

/// Normalize a transcript the way typed commands are: trimmed, lowercased and
/// without trailing sentence punctuation (`"Exit."` → `"exit"`).
pub fn normalize_transcript(heard: &str) -> String {
    heard
        .trim()
        .trim_end_matches(TRAILING_PUNCTUATION)
        .trim_end()
        .to_lowercase()
}

/// Reads the next command in the session's current mode.
#[derive(Clone)]
pub struct InputChannel {
    console: Arc<dyn Console>,
    recognizer: Arc<dyn SpeechRecognizer>,
}

impl InputChannel {
    pub fn new(console: Arc<dyn Console>, recognizer: Arc<dyn SpeechRecognizer>) -> Self {
        Self {
            console,
            recognizer,
        }
    }

    /// Next command, trimmed and lowercased. Spoken commands also lose trailing
    /// sentence punctuation.
    ///
    /// Voice mode never gives up: recognition failures are logged and listening starts
    /// again. Text mode returns [`VoiceError::InputClosed`] at end of input.
    pub async fn next_command(&self, session: &Session) -> VoiceResult<Utterance> {
        match session.mode {
            Mode::Voice => {
                let heard = self.recognize(session).await;
                info!(target: "herald::input", "You said: {}", heard);
                Ok(Utterance::new(normalize_transcript(&heard), Origin::UserSpoken))
            }
            Mode::Text => {
                let line = self
                    .read_typed(TEXT_PROMPT)
                    .await?
                    .ok_or(VoiceError::InputClosed)?;
                Ok(Utterance::new(line.trim().to_lowercase(), Origin::UserTyped))
            }
        }
    }

    /// Listen until a phrase is understood. Returns the raw transcript.
    pub async fn recognize(&self, session: &Session) -> String {
        loop {
            if let Ok(text) = self.listen_once(session).await {
                return text;
            }
        }
    }

    /// A single listening attempt in the session's primary language subtag
    /// (`en-US` is sent as `en`). Failures are logged; a microphone failure also
    /// pauses briefly so a missing device does not spin.
    pub async fn listen_once(&self, session: &Session) -> Result<String, RecognitionError> {
        let result = self.recognizer.listen(session.language_code()).await;
        match &result {
            Ok(_) => {}
            Err(RecognitionError::Unintelligible) => {
                info!(target: "herald::input", "Sorry, I did not understand that.");
            }
            Err(RecognitionError::NetworkFailure(e)) => {
                warn!(target: "herald::input", "Could not request results; {}", e);
            }
            Err(RecognitionError::Capture(e)) => {
                warn!(target: "herald::input", "Microphone unavailable; {}", e);
                tokio::time::sleep(CAPTURE_RETRY_DELAY).await;
            }
        }
        result
    }

    /// One typed line, untrimmed. `None` at end of input.
    pub async fn read_typed(&self, prompt: &str) -> VoiceResult<Option<String>> {
        self.console.read_line(prompt).await
    }

    pub fn print(&self, line: &str) {
        self.console.print(line);
    }
}
