//! Mock search provider for testing.
//!
//! Queues canned hit lists per call and records the queries issued, so the
//! aggregator and planner can be exercised without network access.

use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use crate::ports::{SearchError, SearchHit, SearchProvider};

/// A configured mock search outcome.
#[derive(Debug, Clone)]
pub enum MockSearchResponse {
    /// Return these hits.
    Hits(Vec<SearchHit>),
    /// Fail with a backend error carrying this message.
    Failure(String),
}

/// Mock search provider.
#[derive(Debug, Clone, Default)]
pub struct MockSearchProvider {
    responses: Arc<Mutex<VecDeque<MockSearchResponse>>>,
    content: Arc<Mutex<VecDeque<String>>>,
    queries: Arc<Mutex<Vec<String>>>,
}

impl MockSearchProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues a hit list for the next search call.
    pub fn with_hits(self, hits: Vec<SearchHit>) -> Self {
        self.responses
            .lock()
            .unwrap()
            .push_back(MockSearchResponse::Hits(hits));
        self
    }

    /// Queues a failure for the next search call.
    pub fn with_failure(self, message: impl Into<String>) -> Self {
        self.responses
            .lock()
            .unwrap()
            .push_back(MockSearchResponse::Failure(message.into()));
        self
    }

    /// Queues page content for the next fetch_content call.
    pub fn with_content(self, content: impl Into<String>) -> Self {
        self.content.lock().unwrap().push_back(content.into());
        self
    }

    /// Returns the queries issued so far, in order.
    pub fn queries(&self) -> Vec<String> {
        self.queries.lock().unwrap().clone()
    }
}

#[async_trait]
impl SearchProvider for MockSearchProvider {
    async fn search(&self, query: &str) -> Result<Vec<SearchHit>, SearchError> {
        self.queries.lock().unwrap().push(query.to_string());

        match self.responses.lock().unwrap().pop_front() {
            Some(MockSearchResponse::Hits(hits)) => Ok(hits),
            Some(MockSearchResponse::Failure(message)) => Err(SearchError::backend(message)),
            None => Ok(Vec::new()),
        }
    }

    async fn fetch_content(&self, _url: &str) -> Result<String, SearchError> {
        match self.content.lock().unwrap().pop_front() {
            Some(content) => Ok(content),
            None => Err(SearchError::backend("no content queued")),
        }
    }
}
