//! **Web search**: fetch a Brave search results page and have the chat model summarize it.
//!
//! No API key is needed: the public results page is fetched and the text of its
//! headings and paragraphs is handed to the conversational backend with a
//! "summarize" instruction. A non-success status is reported as
//! [`SearchError::HttpFailure`]; the router turns every failure into the fixed apology.

use async_trait::async_trait;
use herald_core::{AssistantConfig, ChatBackend, SearchBackend, SearchError};
use std::sync::Arc;
use std::time::Duration;

const USER_AGENT: &str = "Mozilla/5.0 (X11; Linux x86_64) Herald/0.1";

const REQUEST_TIMEOUT: Duration = Duration::from_secs(15);

/// Instruction prefixed to the extracted page text.
pub const SUMMARIZE_PREFIX: &str = "summarize the following text: ";

/// Elements whose text is treated as result content, in document order.
const RESULT_SELECTOR: &str = "h2, h3, p";

/// Brave results-page search summarized by a [`ChatBackend`].
pub struct BraveSearch {
    endpoint: String,
    max_results: usize,
    client: reqwest::Client,
    summarizer: Arc<dyn ChatBackend>,
}

impl BraveSearch {
    pub fn new(
        endpoint: impl Into<String>,
        max_results: usize,
        summarizer: Arc<dyn ChatBackend>,
    ) -> Result<Self, SearchError> {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| SearchError::Request(e.to_string()))?;
        Ok(Self {
            endpoint: endpoint.into(),
            max_results: max_results.max(1),
            client,
            summarizer,
        })
    }

    /// Endpoint and result count from `search_url` / `search_max_results`.
    pub fn from_config(
        config: &AssistantConfig,
        summarizer: Arc<dyn ChatBackend>,
    ) -> Result<Self, SearchError> {
        Self::new(&config.search_url, config.search_max_results, summarizer)
    }

    async fn fetch_results_page(&self, query: &str) -> Result<String, SearchError> {
        let res = self
            .client
            .get(&self.endpoint)
            .query(&[("q", query)])
            .send()
            .await
            .map_err(|e| SearchError::Request(e.to_string()))?;
        let status = res.status();
        if !status.is_success() {
            return Err(SearchError::HttpFailure(status.as_u16()));
        }
        res.text()
            .await
            .map_err(|e| SearchError::Request(e.to_string()))
    }
}

#[async_trait]
impl SearchBackend for BraveSearch {
    async fn search(&self, query: &str) -> Result<String, SearchError> {
        let html = self.fetch_results_page(query).await?;
        let snippets = extract_result_text(&html, self.max_results);
        tracing::debug!(
            target: "herald::web_search",
            query,
            snippets = snippets.len(),
            "Search page parsed"
        );
        let prompt = format!("{}{}", SUMMARIZE_PREFIX, snippets.join("\n"));
        let reply = self.summarizer.chat(&prompt).await?;
        Ok(reply.extract_text())
    }
}

/// Trimmed, non-empty text of the first `limit` heading/paragraph elements.
pub fn extract_result_text(html: &str, limit: usize) -> Vec<String> {
    let doc = scraper::Html::parse_document(html);
    let selector = scraper::Selector::parse(RESULT_SELECTOR).unwrap_or_else(|_| unreachable!());
    doc.select(&selector)
        .map(|el| el.text().collect::<String>().trim().to_string())
        .filter(|s| !s.is_empty())
        .take(limit)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_headings_and_paragraphs_in_order() {
        let html = r#"<html><body>
            <h2> Rust Language </h2>
            <div>ignored</div>
            <p>A systems language.</p>
            <p>   </p>
            <h3>Ownership</h3>
        </body></html>"#;
        let texts = extract_result_text(html, 10);
        assert_eq!(texts, vec!["Rust Language", "A systems language.", "Ownership"]);
    }

    #[test]
    fn extraction_respects_limit() {
        let html = "<p>a</p><p>b</p><p>c</p>";
        assert_eq!(extract_result_text(html, 2), vec!["a", "b"]);
    }
}
