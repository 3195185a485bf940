//! Conversational model backend: OpenAI-compatible chat completions with history.
//!
//! Works against any `/chat/completions` server (Ollama, OpenAI, OpenRouter). The reply
//! content may arrive as a plain string or as a list of parts; both decode into
//! [`ChatReply`] so callers never inspect JSON shapes.

use crate::config::AssistantConfig;
use crate::error::BackendError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio::sync::Mutex;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(120);

/// Rough characters-per-token ratio used to keep history inside the context window.
const CHARS_PER_TOKEN: usize = 4;

/// One piece of a structured reply. Only fragments with `content` carry text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Fragment {
    #[serde(default)]
    pub role: Option<String>,
    #[serde(default, alias = "text")]
    pub content: Option<String>,
}

impl Fragment {
    pub fn text(role: &str, content: impl Into<String>) -> Self {
        Self {
            role: Some(role.to_string()),
            content: Some(content.into()),
        }
    }
}

/// A model reply: either one string or a sequence of role-tagged fragments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChatReply {
    PlainText(String),
    FragmentList(Vec<Fragment>),
}

impl ChatReply {
    /// Flatten to a single string; fragment payloads are joined with single spaces.
    pub fn extract_text(&self) -> String {
        match self {
            ChatReply::PlainText(text) => text.clone(),
            ChatReply::FragmentList(fragments) => fragments
                .iter()
                .filter_map(|f| f.content.as_deref())
                .collect::<Vec<_>>()
                .join(" "),
        }
    }
}

impl From<String> for ChatReply {
    fn from(text: String) -> Self {
        ChatReply::PlainText(text)
    }
}

impl From<&str> for ChatReply {
    fn from(text: &str) -> Self {
        ChatReply::PlainText(text.to_string())
    }
}

/// Anything that can answer free text. Implemented by [`OpenAiChat`] and by test fakes.
#[async_trait]
pub trait ChatBackend: Send + Sync {
    async fn chat(&self, message: &str) -> Result<ChatReply, BackendError>;
}

#[derive(Debug, Clone, Serialize)]
struct ChatMessage {
    role: String,
    content: String,
}

impl ChatMessage {
    fn new(role: &str, content: impl Into<String>) -> Self {
        Self {
            role: role.to_string(),
            content: content.into(),
        }
    }

    fn approx_tokens(&self) -> usize {
        self.content.chars().count().div_ceil(CHARS_PER_TOKEN)
    }
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    max_tokens: u32,
    stream: bool,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatMessageResponse,
}

#[derive(Deserialize)]
struct ChatMessageResponse {
    #[serde(default)]
    content: Option<MessageContent>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum MessageContent {
    Text(String),
    Parts(Vec<Fragment>),
}

impl From<MessageContent> for ChatReply {
    fn from(content: MessageContent) -> Self {
        match content {
            MessageContent::Text(text) => ChatReply::PlainText(text),
            MessageContent::Parts(parts) => ChatReply::FragmentList(parts),
        }
    }
}

/// Chat client for an OpenAI-compatible endpoint, keeping the running conversation.
pub struct OpenAiChat {
    api_base: String,
    api_key: String,
    model: String,
    max_tokens: u32,
    context_window: usize,
    client: reqwest::Client,
    history: Mutex<Vec<ChatMessage>>,
}

impl OpenAiChat {
    /// Build from configuration; seeds the history with the assistant's system message.
    pub fn from_config(config: &AssistantConfig) -> Result<Self, BackendError> {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| BackendError::Client(e.to_string()))?;
        let model = provider_model_name(&config.model).to_string();
        let system = system_message(config);
        Ok(Self {
            api_base: config.api_base.trim_end_matches('/').to_string(),
            api_key: config.api_key.trim().to_string(),
            model,
            max_tokens: config.max_tokens,
            context_window: config.context_window as usize,
            client,
            history: Mutex::new(vec![ChatMessage::new("system", system)]),
        })
    }

    /// Model name as sent on the wire.
    pub fn model(&self) -> &str {
        &self.model
    }

    /// Number of messages currently held, system message included.
    pub async fn history_len(&self) -> usize {
        self.history.lock().await.len()
    }

    async fn request(&self, messages: &[ChatMessage]) -> Result<ChatReply, BackendError> {
        let url = format!("{}/chat/completions", self.api_base);
        let body = ChatRequest {
            model: &self.model,
            messages,
            max_tokens: self.max_tokens,
            stream: false,
        };

        let res = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| BackendError::Request(e.to_string()))?;

        if !res.status().is_success() {
            let status = res.status().as_u16();
            let body = res.text().await.unwrap_or_default();
            return Err(BackendError::Status { status, body });
        }

        let parsed: ChatResponse = res
            .json()
            .await
            .map_err(|e| BackendError::Parse(e.to_string()))?;

        Ok(parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .map(ChatReply::from)
            .unwrap_or_else(|| ChatReply::PlainText(String::new())))
    }
}

#[async_trait]
impl ChatBackend for OpenAiChat {
    async fn chat(&self, message: &str) -> Result<ChatReply, BackendError> {
        let snapshot = {
            let mut history = self.history.lock().await;
            history.push(ChatMessage::new("user", message));
            trim_to_window(&mut history, self.context_window);
            history.clone()
        };

        match self.request(&snapshot).await {
            Ok(reply) => {
                let mut history = self.history.lock().await;
                history.push(ChatMessage::new("assistant", reply.extract_text()));
                trim_to_window(&mut history, self.context_window);
                Ok(reply)
            }
            Err(e) => {
                tracing::error!(target: "herald::chat", error = %e, "Chat request failed");
                let mut history = self.history.lock().await;
                if history.last().is_some_and(|m| m.role == "user" && m.content == message) {
                    history.pop();
                }
                Err(e)
            }
        }
    }
}

/// `openai/llama3` → `llama3`; other names pass through.
fn provider_model_name(model: &str) -> &str {
    model.strip_prefix("openai/").unwrap_or(model).trim()
}

fn system_message(config: &AssistantConfig) -> String {
    format!(
        "Your name is {bot}, you are a personal assistant for me {user}. \
         You are here to help me with my daily tasks. \
         You speak {lang} and you are using the {model} model for language processing. \
         Keep answers short and conversational; they are read aloud.",
        bot = config.bot_name,
        user = config.user_name,
        lang = config.language,
        model = config.model,
    )
}

/// Drop the oldest non-system messages until the history fits `window` tokens.
/// The system message and the newest message are always kept.
fn trim_to_window(history: &mut Vec<ChatMessage>, window: usize) {
    let total = |h: &[ChatMessage]| h.iter().map(ChatMessage::approx_tokens).sum::<usize>();
    while history.len() > 2 && total(history) > window {
        history.remove(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extract_text_joins_payload_fragments() {
        let reply = ChatReply::FragmentList(vec![
            Fragment::text("assistant", "Hello"),
            Fragment {
                role: Some("tool".to_string()),
                content: None,
            },
            Fragment::text("assistant", "there"),
        ]);
        assert_eq!(reply.extract_text(), "Hello there");
    }

    #[test]
    fn plain_text_passes_through() {
        assert_eq!(ChatReply::from("hi").extract_text(), "hi");
    }

    #[test]
    fn content_parts_decode_as_fragments() {
        let json = r#"{"content": [{"type": "text", "text": "a"}, {"type": "image"}]}"#;
        let msg: ChatMessageResponse = serde_json::from_str(json).unwrap();
        let reply = ChatReply::from(msg.content.unwrap());
        assert_eq!(reply.extract_text(), "a");
    }

    #[test]
    fn provider_prefix_is_stripped() {
        assert_eq!(provider_model_name("openai/llama3"), "llama3");
        assert_eq!(provider_model_name("qwen2.5:7b"), "qwen2.5:7b");
    }

    #[test]
    fn trim_keeps_system_and_newest() {
        let mut h = vec![
            ChatMessage::new("system", "s"),
            ChatMessage::new("user", "x".repeat(400)),
            ChatMessage::new("assistant", "y".repeat(400)),
            ChatMessage::new("user", "latest"),
        ];
        trim_to_window(&mut h, 50);
        assert_eq!(h.len(), 2);
        assert_eq!(h[0].role, "system");
        assert_eq!(h[1].content, "latest");
    }
}
