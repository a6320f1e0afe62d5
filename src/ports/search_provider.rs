//! Search Provider Port - Interface for web search backends.
//!
//! Abstracts the search engine behind the itinerary research step so the
//! aggregator can be tested against an in-memory implementation.

use async_trait::async_trait;

/// Port for web search and page retrieval.
#[async_trait]
pub trait SearchProvider: Send + Sync {
    /// Runs a search query and returns result hits in engine order.
    async fn search(&self, query: &str) -> Result<Vec<SearchHit>, SearchError>;

    /// Fetches the readable text content of a result page.
    async fn fetch_content(&self, url: &str) -> Result<String, SearchError>;
}

/// A single search result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchHit {
    pub title: String,
    pub url: String,
    pub snippet: String,
}

impl SearchHit {
    pub fn new(
        title: impl Into<String>,
        url: impl Into<String>,
        snippet: impl Into<String>,
    ) -> Self {
        Self {
            title: title.into(),
            url: url.into(),
            snippet: snippet.into(),
        }
    }
}

/// Search provider errors.
#[derive(Debug, thiserror::Error)]
pub enum SearchError {
    /// The engine returned an unexpected status.
    #[error("search backend error: {0}")]
    Backend(String),

    /// Network error during request.
    #[error("network error: {0}")]
    Network(String),

    /// Request timed out.
    #[error("request timed out after {timeout_secs}s")]
    Timeout {
        /// Configured timeout.
        timeout_secs: u32,
    },
}

impl SearchError {
    pub fn backend(message: impl Into<String>) -> Self {
        Self::Backend(message.into())
    }

    pub fn network(message: impl Into<String>) -> Self {
        Self::Network(message.into())
    }
}
