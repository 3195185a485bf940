//! herald-core: shared types for the Herald voice assistant.
//!
//! Configuration, the per-run [`Session`], tagged [`Utterance`]s and the backend seams
//! ([`ChatBackend`], [`SearchBackend`]) that the interaction loop in `herald-voice`
//! dispatches to.

pub mod chat;
pub mod config;
pub mod error;
pub mod search;
pub mod session;

pub use chat::{ChatBackend, ChatReply, Fragment, OpenAiChat};
pub use config::{AssistantConfig, SpeechEngine, CONFIG_PATH_ENV, DEFAULT_CONFIG_FILE};
pub use error::{BackendError, CoreError, CoreResult, SearchError};
pub use search::{SearchBackend, SEARCH_FAILURE_MESSAGE};
pub use session::{Mode, Origin, Session, Utterance};
