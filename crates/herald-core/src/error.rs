//! Error types shared by the Herald crates.

use thiserror::Error;

/// Result alias for core operations.
pub type CoreResult<T> = Result<T, CoreError>;

/// Startup-time failures: configuration and backend construction.
#[derive(Error, Debug)]
pub enum CoreError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error(transparent)]
    Loader(#[from] config::ConfigError),

    #[error(transparent)]
    Backend(#[from] BackendError),
}

/// Failure of a call to the conversational model backend.
#[derive(Error, Debug)]
pub enum BackendError {
    #[error("Chat request failed: {0}")]
    Request(String),

    #[error("Chat API error {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Chat response parse failed: {0}")]
    Parse(String),

    #[error("Chat client setup failed: {0}")]
    Client(String),
}

/// Failure of the web search skill.
#[derive(Error, Debug)]
pub enum SearchError {
    /// The search page answered with a non-success status.
    #[error("Search returned HTTP {0}")]
    HttpFailure(u16),

    #[error("Search request failed: {0}")]
    Request(String),

    #[error("Search summary failed: {0}")]
    Summarize(#[from] BackendError),
}
