//! Assistant configuration loaded from `config.json` (or TOML) and the environment.
//!
//! Precedence: built-in defaults < configuration file < `HERALD_*` environment variables.
//! The file path is `HERALD_CONFIG` when set, otherwise `config.json` in the working
//! directory. A missing file is not an error; every key has a default.

use crate::error::{CoreError, CoreResult};
use crate::session::Mode;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Default configuration file, relative to the working directory.
pub const DEFAULT_CONFIG_FILE: &str = "config.json";

/// Env var that points at an alternative configuration file.
pub const CONFIG_PATH_ENV: &str = "HERALD_CONFIG";

const ENV_PREFIX: &str = "HERALD";

/// Which synthesizer renders speech.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SpeechEngine {
    /// Platform command (`say` on macOS, `espeak-ng` elsewhere).
    #[default]
    System,
    /// OpenAI-compatible `/audio/speech` endpoint played through the default output.
    Api,
}

/// Assistant configuration.
///
/// | Key | Default | Description |
/// |-----|---------|-------------|
/// | bot_name | Assistant | Name the assistant uses for itself. |
/// | user_name | User | Name used in greetings and farewells. |
/// | voice | English (America) | Synthesizer voice identifier. |
/// | speech_rate | 160 | Words per minute for the system synthesizer. |
/// | model | openai/llama3 | Chat model (`openai/` provider prefix is stripped). |
/// | api_key | ollama | Bearer key for the chat endpoint. |
/// | api_base | http://localhost:11434/v1 | OpenAI-compatible chat base URL. |
/// | context_window | 3000 | Approximate token budget for chat history. |
/// | max_tokens | 300 | Completion token limit. |
/// | command_mode | voice | `voice` or `text`. |
/// | max_speak_length | 200 | Characters spoken without asking first. |
/// | language | en-US | Recognition and conversation locale. |
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssistantConfig {
    #[serde(default = "default_bot_name")]
    pub bot_name: String,
    #[serde(default = "default_user_name")]
    pub user_name: String,
    #[serde(default = "default_voice")]
    pub voice: String,
    #[serde(default = "default_speech_rate")]
    pub speech_rate: u32,
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default = "default_api_key")]
    pub api_key: String,
    #[serde(default = "default_api_base")]
    pub api_base: String,
    #[serde(default = "default_context_window")]
    pub context_window: u32,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    #[serde(default)]
    pub command_mode: Mode,
    #[serde(default = "default_max_speak_length")]
    pub max_speak_length: usize,
    #[serde(default = "default_language")]
    pub language: String,

    #[serde(default)]
    pub speech_engine: SpeechEngine,
    #[serde(default = "default_openai_base")]
    pub tts_api_url: String,
    /// Falls back to `TTS_API_KEY` from the environment.
    #[serde(default)]
    pub tts_api_key: Option<String>,
    #[serde(default = "default_tts_model")]
    pub tts_model: String,
    #[serde(default = "default_openai_base")]
    pub stt_api_url: String,
    /// Falls back to `STT_API_KEY` from the environment.
    #[serde(default)]
    pub stt_api_key: Option<String>,
    #[serde(default = "default_stt_model")]
    pub stt_model: String,
    #[serde(default = "default_search_url")]
    pub search_url: String,
    #[serde(default = "default_search_max_results")]
    pub search_max_results: usize,
}

fn default_bot_name() -> String {
    "Assistant".to_string()
}

fn default_user_name() -> String {
    "User".to_string()
}

fn default_voice() -> String {
    "English (America)".to_string()
}

fn default_speech_rate() -> u32 {
    160
}

fn default_model() -> String {
    "openai/llama3".to_string()
}

fn default_api_key() -> String {
    "ollama".to_string()
}

fn default_api_base() -> String {
    "http://localhost:11434/v1".to_string()
}

fn default_context_window() -> u32 {
    3000
}

fn default_max_tokens() -> u32 {
    300
}

fn default_max_speak_length() -> usize {
    200
}

fn default_language() -> String {
    "en-US".to_string()
}

fn default_openai_base() -> String {
    "https://api.openai.com/v1".to_string()
}

fn default_tts_model() -> String {
    "tts-1".to_string()
}

fn default_stt_model() -> String {
    "whisper-1".to_string()
}

fn default_search_url() -> String {
    "https://search.brave.com/search".to_string()
}

fn default_search_max_results() -> usize {
    10
}

impl Default for AssistantConfig {
    fn default() -> Self {
        Self {
            bot_name: default_bot_name(),
            user_name: default_user_name(),
            voice: default_voice(),
            speech_rate: default_speech_rate(),
            model: default_model(),
            api_key: default_api_key(),
            api_base: default_api_base(),
            context_window: default_context_window(),
            max_tokens: default_max_tokens(),
            command_mode: Mode::default(),
            max_speak_length: default_max_speak_length(),
            language: default_language(),
            speech_engine: SpeechEngine::default(),
            tts_api_url: default_openai_base(),
            tts_api_key: None,
            tts_model: default_tts_model(),
            stt_api_url: default_openai_base(),
            stt_api_key: None,
            stt_model: default_stt_model(),
            search_url: default_search_url(),
            search_max_results: default_search_max_results(),
        }
    }
}

impl AssistantConfig {
    /// Load using `HERALD_CONFIG` or `config.json`, then `HERALD_*` overrides.
    pub fn load() -> CoreResult<Self> {
        let path = std::env::var(CONFIG_PATH_ENV)
            .ok()
            .map(|p| p.trim().to_string())
            .filter(|p| !p.is_empty())
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILE));
        Self::load_from(&path)
    }

    /// Load from an explicit file path (skipped when it does not exist), then env overrides.
    pub fn load_from(path: &Path) -> CoreResult<Self> {
        let builder = config::Config::builder();
        let builder = if path.exists() {
            tracing::debug!(target: "herald::config", path = %path.display(), "Loading configuration file");
            builder.add_source(config::File::from(path))
        } else {
            tracing::debug!(target: "herald::config", path = %path.display(), "No configuration file; using defaults");
            builder
        };

        let built = builder
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        let loaded: Self = built.try_deserialize()?;
        loaded.validate()?;
        Ok(loaded)
    }

    /// Reject values the interaction loop cannot work with.
    pub fn validate(&self) -> CoreResult<()> {
        if self.max_speak_length == 0 {
            return Err(CoreError::Config(
                "max_speak_length must be a positive integer".to_string(),
            ));
        }
        if self.language.trim().is_empty() {
            return Err(CoreError::Config("language must not be empty".to_string()));
        }
        Ok(())
    }

    /// TTS key from config, else `TTS_API_KEY`.
    pub fn resolved_tts_api_key(&self) -> Option<String> {
        resolve_key(self.tts_api_key.as_deref(), "TTS_API_KEY")
    }

    /// STT key from config, else `STT_API_KEY`.
    pub fn resolved_stt_api_key(&self) -> Option<String> {
        resolve_key(self.stt_api_key.as_deref(), "STT_API_KEY")
    }
}

fn resolve_key(configured: Option<&str>, env: &str) -> Option<String> {
    configured
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .or_else(|| {
            std::env::var(env)
                .ok()
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn defaults_match_documented_values() {
        let c = AssistantConfig::default();
        assert_eq!(c.bot_name, "Assistant");
        assert_eq!(c.user_name, "User");
        assert_eq!(c.speech_rate, 160);
        assert_eq!(c.command_mode, Mode::Voice);
        assert_eq!(c.max_speak_length, 200);
        assert_eq!(c.language, "en-US");
        assert_eq!(c.context_window, 3000);
        assert_eq!(c.max_tokens, 300);
        assert_eq!(c.speech_engine, SpeechEngine::System);
    }

    #[test]
    fn missing_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let c = AssistantConfig::load_from(&dir.path().join("absent.json")).unwrap();
        assert_eq!(c.bot_name, "Assistant");
        assert_eq!(c.max_speak_length, 200);
    }

    #[test]
    fn json_file_overrides_selected_keys() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        let mut f = std::fs::File::create(&path).unwrap();
        write!(
            f,
            r#"{{"bot_name": "Jarvis", "command_mode": "text", "max_speak_length": 80}}"#
        )
        .unwrap();

        let c = AssistantConfig::load_from(&path).unwrap();
        assert_eq!(c.bot_name, "Jarvis");
        assert_eq!(c.command_mode, Mode::Text);
        assert_eq!(c.max_speak_length, 80);
        assert_eq!(c.user_name, "User");
    }

    #[test]
    fn unknown_command_mode_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, r#"{"command_mode": "telepathy"}"#).unwrap();
        assert!(AssistantConfig::load_from(&path).is_err());
    }

    #[test]
    fn zero_speak_length_is_rejected() {
        let c = AssistantConfig {
            max_speak_length: 0,
            ..Default::default()
        };
        assert!(matches!(c.validate(), Err(CoreError::Config(_))));
    }

    #[test]
    fn configured_key_wins_over_environment() {
        let c = AssistantConfig {
            tts_api_key: Some("  sk-config ".to_string()),
            ..Default::default()
        };
        assert_eq!(c.resolved_tts_api_key().as_deref(), Some("sk-config"));
    }
}
