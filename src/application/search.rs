//! Search aggregator - categorized destination research for the itinerary.
//!
//! Runs one query for attractions and, only when that produced at least one
//! usable item, a second query for travel tips. Each kept result carries a
//! content excerpt (fetched page text, or the snippet when the fetch fails)
//! truncated to a fixed budget so the itinerary prompt stays bounded.

use chrono::Utc;
use serde::Serialize;
use thiserror::Error;

use crate::domain::trip::{TripField, TripRecord};
use crate::ports::{SearchHit, SearchProvider};

/// Category label for the attractions results.
const ATTRACTIONS_CATEGORY: &str = "Tourist Attractions";

/// Category label for the travel tips results.
const TIPS_CATEGORY: &str = "Travel Tips";

/// Aggregation errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum AggregateError {
    /// Both categories came back empty. Usually a misspelled destination.
    #[error("no search results for destination")]
    NoResults,
}

/// Limits for the aggregator.
#[derive(Debug, Clone, Copy)]
pub struct AggregatorLimits {
    /// Results kept from the attractions query.
    pub attractions: usize,
    /// Results kept from the tips query.
    pub tips: usize,
    /// Character cap on each result's content excerpt.
    pub content_chars: usize,
}

impl Default for AggregatorLimits {
    fn default() -> Self {
        Self {
            attractions: 3,
            tips: 2,
            content_chars: 500,
        }
    }
}

/// One kept search result.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct SearchItem {
    pub title: String,
    pub url: String,
    pub snippet: String,
    pub content: String,
}

/// Criteria echoed into the bundle so the itinerary prompt sees what the
/// results were gathered for.
#[derive(Debug, Clone, Serialize)]
pub struct SearchCriteria {
    pub destination: String,
    pub start_date: String,
    pub end_date: String,
    pub travelers: String,
    pub budget: String,
}

/// The aggregated, categorized result set.
#[derive(Debug, Clone, Serialize)]
pub struct SearchBundle {
    pub search_criteria: SearchCriteria,
    /// Ordered (category label, items) pairs.
    pub results: Vec<(String, Vec<SearchItem>)>,
    pub timestamp: String,
}

impl SearchBundle {
    /// Serializes the bundle for prompt interpolation.
    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| "{}".to_string())
    }
}

/// Aggregates categorized search results for a trip.
pub struct SearchAggregator<S> {
    provider: S,
    limits: AggregatorLimits,
}

impl<S: SearchProvider> SearchAggregator<S> {
    pub fn new(provider: S, limits: AggregatorLimits) -> Self {
        Self { provider, limits }
    }

    /// Runs both categorized queries for the record's destination.
    ///
    /// Provider failures on the individual queries degrade to empty
    /// categories rather than aborting; only an entirely empty bundle is
    /// an error.
    pub async fn aggregate(&self, record: &TripRecord) -> Result<SearchBundle, AggregateError> {
        let destination = record.field_or_unspecified(TripField::Destination);

        let attractions_query =
            format!("best tourist attractions things to do travel guide {destination}");
        let attractions = self
            .run_category(&attractions_query, self.limits.attractions)
            .await;

        let mut results = Vec::new();
        if !attractions.is_empty() {
            results.push((ATTRACTIONS_CATEGORY.to_string(), attractions));

            // A destination with zero attraction hits is likely invalid;
            // skip the tips query instead of spending another call on it.
            let tips_query = format!(
                "travel tips recommendations best time to visit {destination} tourist guide"
            );
            let tips = self.run_category(&tips_query, self.limits.tips).await;
            if !tips.is_empty() {
                results.push((TIPS_CATEGORY.to_string(), tips));
            }
        }

        if results.is_empty() {
            return Err(AggregateError::NoResults);
        }

        Ok(SearchBundle {
            search_criteria: SearchCriteria {
                destination,
                start_date: record.field_or_unspecified(TripField::StartDate),
                end_date: record.field_or_unspecified(TripField::EndDate),
                travelers: record.field_or_unspecified(TripField::Travelers),
                budget: record.field_or_unspecified(TripField::Budget),
            },
            results,
            timestamp: Utc::now().to_rfc3339(),
        })
    }

    async fn run_category(&self, query: &str, keep: usize) -> Vec<SearchItem> {
        let hits = match self.provider.search(query).await {
            Ok(hits) => hits,
            Err(err) => {
                tracing::warn!(query = %query, error = %err, "search query failed");
                return Vec::new();
            }
        };

        let mut items = Vec::new();
        for hit in hits.into_iter().take(keep) {
            items.push(self.to_item(hit).await);
        }
        items
    }

    async fn to_item(&self, hit: SearchHit) -> SearchItem {
        let content = match self.provider.fetch_content(&hit.url).await {
            Ok(text) if !text.trim().is_empty() => text,
            Ok(_) => hit.snippet.clone(),
            Err(err) => {
                tracing::debug!(url = %hit.url, error = %err, "content fetch failed, using snippet");
                hit.snippet.clone()
            }
        };

        SearchItem {
            content: truncate_chars(&content, self.limits.content_chars),
            title: hit.title,
            url: hit.url,
            snippet: hit.snippet,
        }
    }
}

/// Truncates on a character boundary.
fn truncate_chars(text: &str, max_chars: usize) -> String {
    text.chars().take(max_chars).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::search::MockSearchProvider;

    fn complete_record() -> TripRecord {
        TripRecord {
            origin: Some("Buenos Aires".to_string()),
            destination: Some("Madrid".to_string()),
            start_date: Some("2026-10-01".to_string()),
            end_date: Some("2026-10-10".to_string()),
            num_travelers: Some(2),
            budget: Some("3000 USD".to_string()),
            additional_notes: None,
        }
    }

    fn hit(n: usize) -> SearchHit {
        SearchHit::new(
            format!("Result {n}"),
            format!("https://example.com/{n}"),
            format!("Snippet {n}"),
        )
    }

    #[tokio::test]
    async fn keeps_top_three_attractions_and_two_tips() {
        let provider = MockSearchProvider::new()
            .with_hits(vec![hit(1), hit(2), hit(3), hit(4), hit(5)])
            .with_hits(vec![hit(6), hit(7), hit(8)]);
        let aggregator = SearchAggregator::new(provider, AggregatorLimits::default());

        let bundle = aggregator.aggregate(&complete_record()).await.unwrap();

        assert_eq!(bundle.results.len(), 2);
        assert_eq!(bundle.results[0].0, "Tourist Attractions");
        assert_eq!(bundle.results[0].1.len(), 3);
        assert_eq!(bundle.results[1].0, "Travel Tips");
        assert_eq!(bundle.results[1].1.len(), 2);
    }

    #[tokio::test]
    async fn issues_both_queries_with_destination() {
        let provider = MockSearchProvider::new()
            .with_hits(vec![hit(1)])
            .with_hits(vec![hit(2)]);
        let aggregator = SearchAggregator::new(provider.clone(), AggregatorLimits::default());

        aggregator.aggregate(&complete_record()).await.unwrap();

        let queries = provider.queries();
        assert_eq!(queries.len(), 2);
        assert!(queries[0].contains("attractions"));
        assert!(queries[0].contains("Madrid"));
        assert!(queries[1].contains("tips"));
        assert!(queries[1].contains("Madrid"));
    }

    #[tokio::test]
    async fn skips_tips_when_attractions_are_empty() {
        let provider = MockSearchProvider::new().with_hits(Vec::new());
        let aggregator = SearchAggregator::new(provider.clone(), AggregatorLimits::default());

        let result = aggregator.aggregate(&complete_record()).await;

        assert_eq!(result.unwrap_err(), AggregateError::NoResults);
        assert_eq!(provider.queries().len(), 1);
    }

    #[tokio::test]
    async fn empty_tips_still_yields_a_bundle() {
        let provider = MockSearchProvider::new()
            .with_hits(vec![hit(1)])
            .with_hits(Vec::new());
        let aggregator = SearchAggregator::new(provider, AggregatorLimits::default());

        let bundle = aggregator.aggregate(&complete_record()).await.unwrap();
        assert_eq!(bundle.results.len(), 1);
        assert_eq!(bundle.results[0].0, "Tourist Attractions");
    }

    #[tokio::test]
    async fn content_falls_back_to_snippet_when_fetch_fails() {
        // No content queued in the mock, so every fetch fails.
        let provider = MockSearchProvider::new().with_hits(vec![hit(1)]);
        let aggregator = SearchAggregator::new(provider, AggregatorLimits::default());

        let bundle = aggregator.aggregate(&complete_record()).await.unwrap();
        assert_eq!(bundle.results[0].1[0].content, "Snippet 1");
    }

    #[tokio::test]
    async fn content_is_truncated_to_the_budget() {
        let provider = MockSearchProvider::new()
            .with_hits(vec![hit(1)])
            .with_content("x".repeat(2000));
        let aggregator = SearchAggregator::new(provider, AggregatorLimits::default());

        let bundle = aggregator.aggregate(&complete_record()).await.unwrap();
        assert_eq!(bundle.results[0].1[0].content.chars().count(), 500);
    }

    #[tokio::test]
    async fn truncation_respects_multibyte_characters() {
        let provider = MockSearchProvider::new()
            .with_hits(vec![hit(1)])
            .with_content("ñ".repeat(600));
        let aggregator = SearchAggregator::new(provider, AggregatorLimits::default());

        let bundle = aggregator.aggregate(&complete_record()).await.unwrap();
        assert_eq!(bundle.results[0].1[0].content.chars().count(), 500);
    }

    #[tokio::test]
    async fn bundle_serializes_criteria_and_categories() {
        let provider = MockSearchProvider::new().with_hits(vec![hit(1)]);
        let aggregator = SearchAggregator::new(provider, AggregatorLimits::default());

        let bundle = aggregator.aggregate(&complete_record()).await.unwrap();
        let json = bundle.to_json();

        assert!(json.contains("\"destination\":\"Madrid\""));
        assert!(json.contains("Tourist Attractions"));
        assert!(json.contains("\"timestamp\""));
    }

    #[tokio::test]
    async fn provider_failure_degrades_to_no_results() {
        let provider = MockSearchProvider::new().with_failure("engine down");
        let aggregator = SearchAggregator::new(provider, AggregatorLimits::default());

        let result = aggregator.aggregate(&complete_record()).await;
        assert_eq!(result.unwrap_err(), AggregateError::NoResults);
    }
}
