//! Web search seam. The router only needs "query in, spoken summary out".

use crate::error::SearchError;
use async_trait::async_trait;

/// Spoken in place of a result whenever a search does not succeed.
pub const SEARCH_FAILURE_MESSAGE: &str =
    "Sorry, I couldn't perform the search. Please try again later.";

/// Search-and-summarize backend.
#[async_trait]
pub trait SearchBackend: Send + Sync {
    /// Run `query` and return a short summary suitable for speaking.
    async fn search(&self, query: &str) -> Result<String, SearchError>;
}
