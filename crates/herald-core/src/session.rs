//! Per-run interaction state and the text units that flow through it.

use crate::config::AssistantConfig;
use serde::{Deserialize, Serialize};
use std::fmt;

/// How commands are read and consent is negotiated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    /// Microphone capture + speech recognition.
    #[default]
    Voice,
    /// Typed lines on the console.
    Text,
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Mode::Voice => f.write_str("voice"),
            Mode::Text => f.write_str("text"),
        }
    }
}

/// Mutable state for one interaction loop. Only the command router changes `mode`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub mode: Mode,
    /// Longest text (in characters) spoken without asking for consent. Always positive.
    pub max_speak_length: usize,
    /// Locale tag, e.g. `en-US`.
    pub language: String,
    pub user_name: String,
    pub bot_name: String,
}

impl Session {
    pub fn from_config(config: &AssistantConfig) -> Self {
        Self {
            mode: config.command_mode,
            max_speak_length: config.max_speak_length.max(1),
            language: config.language.clone(),
            user_name: config.user_name.clone(),
            bot_name: config.bot_name.clone(),
        }
    }

    /// Primary language subtag (`en-US` → `en`), as transcription APIs expect.
    pub fn language_code(&self) -> &str {
        self.language
            .split(['-', '_'])
            .next()
            .filter(|s| !s.is_empty())
            .unwrap_or("en")
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::from_config(&AssistantConfig::default())
    }
}

/// Where a piece of text came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Origin {
    UserSpoken,
    UserTyped,
    ModelResponse,
    SearchResult,
    SystemPrompt,
}

/// An immutable piece of text tagged with its origin.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Utterance {
    text: String,
    origin: Origin,
}

impl Utterance {
    pub fn new(text: impl Into<String>, origin: Origin) -> Self {
        Self {
            text: text.into(),
            origin,
        }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn origin(&self) -> Origin {
        self.origin
    }

    pub fn into_text(self) -> String {
        self.text
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn session_mirrors_config() {
        let config = AssistantConfig {
            command_mode: Mode::Text,
            user_name: "Ada".to_string(),
            ..Default::default()
        };
        let s = Session::from_config(&config);
        assert_eq!(s.mode, Mode::Text);
        assert_eq!(s.user_name, "Ada");
        assert_eq!(s.max_speak_length, 200);
    }

    #[test]
    fn language_code_takes_primary_subtag() {
        let mut s = Session::default();
        assert_eq!(s.language_code(), "en");
        s.language = "pt_BR".to_string();
        assert_eq!(s.language_code(), "pt");
    }

    #[test]
    fn mode_parses_lowercase_names() {
        let m: Mode = serde_json::from_str("\"text\"").unwrap();
        assert_eq!(m, Mode::Text);
        assert_eq!(Mode::Voice.to_string(), "voice");
    }
}
