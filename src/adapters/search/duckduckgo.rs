//! DuckDuckGo search adapter.
//!
//! Implements the SearchProvider port against DuckDuckGo's HTML endpoint,
//! which requires no API key. Results are scraped from the `result__a`
//! anchors and `result__snippet` blocks of the response page.
//!
//! The parsing here is deliberately narrow: it only understands the few
//! markup shapes the endpoint actually emits, and degrades to returning
//! fewer results rather than failing when the page shifts.

use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;

use crate::ports::{SearchError, SearchHit, SearchProvider};

/// Configuration for the DuckDuckGo adapter.
#[derive(Debug, Clone)]
pub struct DuckDuckGoConfig {
    /// Base URL (default: https://html.duckduckgo.com).
    pub base_url: String,
    /// Request timeout.
    pub timeout: Duration,
    /// Maximum hits parsed per query.
    pub max_results: usize,
}

impl DuckDuckGoConfig {
    pub fn new() -> Self {
        Self {
            base_url: "https://html.duckduckgo.com".to_string(),
            timeout: Duration::from_secs(20),
            max_results: 5,
        }
    }

    /// Sets the base URL.
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    /// Sets the request timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Sets the maximum number of parsed hits.
    pub fn with_max_results(mut self, max_results: usize) -> Self {
        self.max_results = max_results;
        self
    }
}

impl Default for DuckDuckGoConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// DuckDuckGo HTML search provider.
pub struct DuckDuckGoProvider {
    config: DuckDuckGoConfig,
    client: Client,
}

impl DuckDuckGoProvider {
    /// Creates a new provider with the given configuration.
    pub fn new(config: DuckDuckGoConfig) -> Self {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .expect("Failed to create HTTP client");

        Self { config, client }
    }

    fn search_url(&self, query: &str) -> String {
        format!(
            "{}/html/?q={}",
            self.config.base_url,
            urlencode(query)
        )
    }

    fn map_transport_error(&self, e: reqwest::Error) -> SearchError {
        if e.is_timeout() {
            SearchError::Timeout {
                timeout_secs: self.config.timeout.as_secs() as u32,
            }
        } else {
            SearchError::network(e.to_string())
        }
    }
}

#[async_trait]
impl SearchProvider for DuckDuckGoProvider {
    async fn search(&self, query: &str) -> Result<Vec<SearchHit>, SearchError> {
        let response = self
            .client
            .get(self.search_url(query))
            .header("User-Agent", "Mozilla/5.0 (compatible; rumbo/0.1)")
            .send()
            .await
            .map_err(|e| self.map_transport_error(e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(SearchError::backend(format!(
                "search returned status {}",
                status
            )));
        }

        let page = response
            .text()
            .await
            .map_err(|e| self.map_transport_error(e))?;

        let hits = parse_result_page(&page, self.config.max_results);
        tracing::debug!(query = %query, hits = hits.len(), "search completed");
        Ok(hits)
    }

    async fn fetch_content(&self, url: &str) -> Result<String, SearchError> {
        let response = self
            .client
            .get(url)
            .header("User-Agent", "Mozilla/5.0 (compatible; rumbo/0.1)")
            .send()
            .await
            .map_err(|e| self.map_transport_error(e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(SearchError::backend(format!(
                "content fetch returned status {}",
                status
            )));
        }

        let page = response
            .text()
            .await
            .map_err(|e| self.map_transport_error(e))?;

        Ok(strip_html_tags(&page))
    }
}

/// Percent-encodes a query string for the URL.
fn urlencode(query: &str) -> String {
    let mut encoded = String::with_capacity(query.len());
    for byte in query.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => {
                encoded.push(byte as char)
            }
            b' ' => encoded.push('+'),
            _ => encoded.push_str(&format!("%{:02X}", byte)),
        }
    }
    encoded
}

/// Extracts result hits from a DuckDuckGo HTML results page.
///
/// Each result renders a title anchor with class `result__a` followed by a
/// snippet element with class `result__snippet`. A result without a snippet
/// still counts as a hit with an empty snippet.
fn parse_result_page(page: &str, max_results: usize) -> Vec<SearchHit> {
    let mut hits = Vec::new();
    let mut cursor = 0;

    while hits.len() < max_results {
        let Some(anchor_at) = page[cursor..].find("result__a") else {
            break;
        };
        let anchor_at = cursor + anchor_at;

        let Some((url, title, title_end)) = parse_title_anchor(page, anchor_at) else {
            cursor = anchor_at + "result__a".len();
            continue;
        };

        // The snippet for this result sits between this anchor and the next.
        let next_anchor = page[title_end..]
            .find("result__a")
            .map(|offset| title_end + offset)
            .unwrap_or(page.len());
        let snippet = parse_snippet(&page[title_end..next_anchor]).unwrap_or_default();

        hits.push(SearchHit::new(title, url, snippet));
        cursor = title_end;
    }

    hits
}

/// Parses the `<a ... class="result__a" href="...">title</a>` element whose
/// class attribute appears at `class_at`. Returns the href, the tag-stripped
/// title and the offset just past the closing tag.
fn parse_title_anchor(page: &str, class_at: usize) -> Option<(String, String, usize)> {
    let tag_start = page[..class_at].rfind("<a")?;
    let tag_end = tag_start + page[tag_start..].find('>')?;
    let tag = &page[tag_start..tag_end];

    let href_at = tag.find("href=\"")? + "href=\"".len();
    let href_end = href_at + tag[href_at..].find('"')?;
    let url = decode_entities(&tag[href_at..href_end]);

    let close_at = tag_end + page[tag_end..].find("</a>")?;
    let title = decode_entities(strip_html_tags(&page[tag_end + 1..close_at]).trim());

    Some((url, title, close_at + "</a>".len()))
}

/// Finds the `result__snippet` element inside a result block and returns its
/// tag-stripped text.
fn parse_snippet(block: &str) -> Option<String> {
    let class_at = block.find("result__snippet")?;
    let tag_end = class_at + block[class_at..].find('>')?;
    // Snippets render as either <a>...</a> or <td>/<div> blocks; cut at the
    // first closing tag after the text.
    let body = &block[tag_end + 1..];
    let close_at = body.find("</")?;
    let snippet = decode_entities(strip_html_tags(&body[..close_at]).trim());
    if snippet.is_empty() {
        None
    } else {
        Some(snippet)
    }
}

/// Removes markup, keeping text content with normalized spacing.
fn strip_html_tags(html: &str) -> String {
    let mut text = String::with_capacity(html.len());
    let mut in_tag = false;

    for character in html.chars() {
        match character {
            '<' => in_tag = true,
            '>' => in_tag = false,
            _ if !in_tag => text.push(character),
            _ => {}
        }
    }

    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Decodes the handful of HTML entities the results page uses.
fn decode_entities(text: &str) -> String {
    text.replace("&amp;", "&")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#x27;", "'")
        .replace("&nbsp;", " ")
}
