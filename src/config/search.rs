//! Search provider configuration

use serde::Deserialize;
use std::time::Duration;

use super::error::ValidationError;

/// Search provider configuration
#[derive(Debug, Clone, Deserialize)]
pub struct SearchConfig {
    /// Search endpoint base URL
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Request timeout in seconds
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,

    /// Results kept for the attractions category
    #[serde(default = "default_attractions_results")]
    pub attractions_results: usize,

    /// Results kept for the tips category
    #[serde(default = "default_tips_results")]
    pub tips_results: usize,

    /// Character cap on each result's content excerpt
    #[serde(default = "default_content_chars")]
    pub content_chars: usize,
}

impl SearchConfig {
    /// Get timeout as Duration
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Validate search configuration
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.timeout_secs == 0 {
            return Err(ValidationError::InvalidTimeout);
        }
        if self.attractions_results == 0 || self.tips_results == 0 {
            return Err(ValidationError::InvalidResultLimit);
        }
        if self.content_chars == 0 {
            return Err(ValidationError::InvalidContentBudget);
        }
        Ok(())
    }
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            timeout_secs: default_timeout(),
            attractions_results: default_attractions_results(),
            tips_results: default_tips_results(),
            content_chars: default_content_chars(),
        }
    }
}

fn default_base_url() -> String {
    "https://html.duckduckgo.com".to_string()
}

fn default_timeout() -> u64 {
    20
}

fn default_attractions_results() -> usize {
    3
}

fn default_tips_results() -> usize {
    2
}

fn default_content_chars() -> usize {
    500
}
