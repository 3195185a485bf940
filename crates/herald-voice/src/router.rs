//! Command router: the interaction loop.
//!
//! Reads one command at a time through the [`InputChannel`], classifies it and
//! dispatches to the search backend, the chat backend or a mode switch. Every reply
//! is sanitized and handed to the [`LongMessageNegotiator`]. Backend failures become
//! spoken apologies; only an exit command (or end of typed input) ends the loop.

use crate::error::{VoiceError, VoiceResult};
use crate::gate::SpeechOutputGate;
use crate::input::InputChannel;
use crate::negotiator::{Delivery, LongMessageNegotiator};
use crate::sanitizer::sanitize;
use herald_core::{
    ChatBackend, Mode, Origin, SearchBackend, Session, Utterance, SEARCH_FAILURE_MESSAGE,
};
use std::sync::{Arc, Mutex, PoisonError};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

/// Phrase that introduces a web search.
pub const SEARCH_TRIGGER: &str = "search for";

pub const SEARCH_QUERY_PROMPT: &str = "What would you like me to search for?";
pub const EMPTY_QUERY_MESSAGE: &str = "I didn't catch a search query.";
pub const CHAT_FAILURE_MESSAGE: &str = "Sorry, I couldn't reach the language model. Please try again.";

const EXIT_WORDS: [&str; 2] = ["exit", "quit"];
const TEXT_MODE_PHRASES: [&str; 3] = ["switch to text mode", "text mode", "switch to text"];
const VOICE_MODE_PHRASES: [&str; 3] = ["switch to voice mode", "voice mode", "switch to voice"];

/// A classified command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Exit,
    /// Query after the trigger phrase, trimmed. May be empty.
    Search(String),
    SwitchMode(Mode),
    Chat(String),
}

impl Command {
    /// Classify a normalized (trimmed, lowercase) command. First match wins:
    /// exit, search, mode switch, chat.
    pub fn classify(command: &str) -> Self {
        if EXIT_WORDS.iter().any(|w| matches_word(command, w)) {
            return Command::Exit;
        }
        if matches_word(command, SEARCH_TRIGGER) {
            return Command::Search(command[SEARCH_TRIGGER.len()..].trim().to_string());
        }
        if TEXT_MODE_PHRASES.contains(&command) {
            return Command::SwitchMode(Mode::Text);
        }
        if VOICE_MODE_PHRASES.contains(&command) {
            return Command::SwitchMode(Mode::Voice);
        }
        Command::Chat(command.to_string())
    }
}

/// `command` is `phrase` or starts with `phrase` followed by whitespace.
fn matches_word(command: &str, phrase: &str) -> bool {
    match command.strip_prefix(phrase) {
        Some(rest) => rest.is_empty() || rest.starts_with(char::is_whitespace),
        None => false,
    }
}

/// Whether the loop keeps going after a command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Exit,
}

pub struct CommandRouter {
    input: InputChannel,
    gate: Arc<SpeechOutputGate>,
    negotiator: LongMessageNegotiator,
    chat: Arc<dyn ChatBackend>,
    search: Arc<dyn SearchBackend>,
    /// Background speech still running; joined before `run` returns.
    pending: Mutex<Vec<JoinHandle<()>>>,
}

impl CommandRouter {
    pub fn new(
        input: InputChannel,
        gate: Arc<SpeechOutputGate>,
        chat: Arc<dyn ChatBackend>,
        search: Arc<dyn SearchBackend>,
    ) -> Self {
        let negotiator = LongMessageNegotiator::new(Arc::clone(&gate), input.clone());
        Self {
            input,
            gate,
            negotiator,
            chat,
            search,
            pending: Mutex::new(Vec::new()),
        }
    }

    /// Greet, then handle commands until exit or end of typed input.
    ///
    /// Speech still playing in the background is allowed to finish before returning.
    pub async fn run(&self, session: &mut Session) -> VoiceResult<()> {
        let greeting = format!(
            "Hello, {}. {} here. What's up?",
            session.user_name, session.bot_name
        );
        self.respond(greeting, session).await;
        self.print_intro(session);

        let result = self.command_loop(session).await;
        match &result {
            Ok(()) => {}
            Err(VoiceError::InputClosed) => {
                info!(target: "herald::router", "Input closed, ending the conversation");
            }
            Err(e) => error!(target: "herald::router", "Interaction loop failed: {}", e),
        }
        self.farewell(session).await;
        self.join_pending().await;

        match result {
            Err(VoiceError::InputClosed) => Ok(()),
            other => other,
        }
    }

    async fn command_loop(&self, session: &mut Session) -> VoiceResult<()> {
        loop {
            let command = self.input.next_command(session).await?;
            if self.handle(&command, session).await? == Flow::Exit {
                return Ok(());
            }
        }
    }

    /// Dispatch one command. The farewell itself is spoken by [`run`](Self::run).
    pub async fn handle(&self, command: &Utterance, session: &mut Session) -> VoiceResult<Flow> {
        debug!(target: "herald::router", command = command.text(), "Handling command");
        match Command::classify(command.text()) {
            Command::Exit => return Ok(Flow::Exit),
            Command::Search(query) => return self.run_search(query, session).await,
            Command::SwitchMode(mode) => {
                session.mode = mode;
                info!(target: "herald::router", "Mode switched to {}", mode);
                self.respond(format!("Switched to {} mode.", mode), session)
                    .await;
            }
            Command::Chat(text) => self.run_chat(&text, session).await,
        }
        Ok(Flow::Continue)
    }

    async fn run_search(&self, query: String, session: &Session) -> VoiceResult<Flow> {
        let query = if query.is_empty() {
            match self.ask_for_query(session).await? {
                Some(query) => query,
                None => return Ok(Flow::Exit),
            }
        } else {
            query
        };
        if query.is_empty() {
            self.respond(EMPTY_QUERY_MESSAGE.to_string(), session).await;
            return Ok(Flow::Continue);
        }

        info!(target: "herald::router", query = %query, "Searching the web");
        let reply = match self.search.search(&query).await {
            Ok(summary) => Utterance::new(summary, Origin::SearchResult),
            Err(e) => {
                warn!(target: "herald::router", "Search failed: {}", e);
                Utterance::new(SEARCH_FAILURE_MESSAGE, Origin::SystemPrompt)
            }
        };
        self.respond_with(reply, session).await;
        Ok(Flow::Continue)
    }

    /// Ask for the missing query. `None` when the answer is an exit command.
    async fn ask_for_query(&self, session: &Session) -> VoiceResult<Option<String>> {
        match session.mode {
            Mode::Voice => {
                self.gate.speak_now(SEARCH_QUERY_PROMPT.to_string()).await;
            }
            Mode::Text => self.input.print(SEARCH_QUERY_PROMPT),
        }
        let answer = self.input.next_command(session).await?;
        if Command::classify(answer.text()) == Command::Exit {
            info!(target: "herald::router", "Exit requested instead of a search query");
            return Ok(None);
        }
        Ok(Some(answer.into_text()))
    }

    async fn run_chat(&self, text: &str, session: &Session) {
        let reply = match self.chat.chat(text).await {
            Ok(reply) => Utterance::new(reply.extract_text(), Origin::ModelResponse),
            Err(e) => {
                error!(target: "herald::router", "Chat backend failed: {}", e);
                Utterance::new(CHAT_FAILURE_MESSAGE, Origin::SystemPrompt)
            }
        };
        self.respond_with(reply, session).await;
    }

    async fn respond(&self, text: String, session: &Session) {
        self.respond_with(Utterance::new(text, Origin::SystemPrompt), session)
            .await;
    }

    /// Sanitize, print in text mode, then hand to the negotiator.
    async fn respond_with(&self, utterance: Utterance, session: &Session) {
        let text = match utterance.origin() {
            Origin::ModelResponse | Origin::SearchResult => sanitize(utterance.into_text()),
            _ => utterance.into_text(),
        };
        if text.trim().is_empty() {
            debug!(target: "herald::router", "Nothing to say after sanitizing");
            return;
        }
        if session.mode == Mode::Text {
            self.input.print(&format!("{}: {}", session.bot_name, text));
        }
        if let Delivery::Dispatched(handle) = self.negotiator.deliver(text, session).await {
            let mut pending = self.pending.lock().unwrap_or_else(PoisonError::into_inner);
            pending.retain(|h| !h.is_finished());
            pending.push(handle);
        }
    }

    async fn farewell(&self, session: &Session) {
        let farewell = format!("Goodbye, {}.", session.user_name);
        if session.mode == Mode::Text {
            self.input.print(&format!("{}: {}", session.bot_name, farewell));
        }
        self.gate.speak_now(farewell).await;
    }

    async fn join_pending(&self) {
        let handles: Vec<_> = {
            let mut pending = self.pending.lock().unwrap_or_else(PoisonError::into_inner);
            pending.drain(..).collect()
        };
        for handle in handles {
            if let Err(e) = handle.await {
                warn!(target: "herald::router", "Speech task failed: {}", e);
            }
        }
    }

    fn print_intro(&self, session: &Session) {
        self.input.print(&format!(
            "Starting the chat with {} in {} mode...",
            session.bot_name, session.mode
        ));
        self.input.print(
            "You can start talking to the assistant now. Say 'exit' or 'quit' to stop the conversation.",
        );
        self.input
            .print("You can also say 'search for' followed by a query to perform a web search.");
        self.input
            .print("You can switch to text mode by saying 'switch to text mode'.");
    }
}
