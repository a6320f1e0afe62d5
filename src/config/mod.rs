//! Application configuration module
//!
//! This module provides type-safe configuration loading from environment
//! variables using the `config` and `dotenvy` crates. Configuration is
//! loaded with the `RUMBO` prefix and nested values use double underscores
//! as separators.
//!
//! # Example
//!
//! ```no_run
//! use rumbo::config::AppConfig;
//!
//! let config = AppConfig::load().expect("Failed to load configuration");
//! config.validate().expect("Invalid configuration");
//!
//! println!("Using model {}", config.ai.model);
//! ```

mod ai;
mod error;
mod search;

pub use ai::AiConfig;
pub use error::{ConfigError, ValidationError};
pub use search::SearchConfig;

use serde::Deserialize;

/// Root application configuration
///
/// Load using [`AppConfig::load()`] which reads from environment variables.
/// API keys are intentionally not here: the credential pool reads its own
/// `GROQ_API_KEY1`..`GROQ_API_KEY8` slots.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct AppConfig {
    /// AI provider configuration (Groq)
    #[serde(default)]
    pub ai: AiConfig,

    /// Search provider configuration (DuckDuckGo)
    #[serde(default)]
    pub search: SearchConfig,

    /// Path to the prompt template file
    #[serde(default = "default_prompts_path")]
    pub prompts_path: String,
}

impl AppConfig {
    /// Load configuration from environment variables
    ///
    /// This function:
    /// 1. Loads `.env` file if present (for development)
    /// 2. Reads environment variables with the `RUMBO` prefix
    /// 3. Uses `__` (double underscore) to separate nested values
    /// 4. Deserializes into typed configuration structs
    ///
    /// # Environment Variable Format
    ///
    /// - `RUMBO__AI__MODEL=llama-3.3-70b-versatile` -> `ai.model = ...`
    /// - `RUMBO__SEARCH__TIMEOUT_SECS=30` -> `search.timeout_secs = 30`
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if values cannot be parsed into their
    /// expected types.
    pub fn load() -> Result<Self, ConfigError> {
        // Load .env file if present (development)
        dotenvy::dotenv().ok();

        let config = config::Config::builder()
            .add_source(config::Environment::default().prefix("RUMBO").separator("__"))
            .build()?
            .try_deserialize()?;

        Ok(config)
    }

    /// Validate all configuration values
    ///
    /// # Errors
    ///
    /// Returns `ValidationError` if any configuration value is invalid.
    pub fn validate(&self) -> Result<(), ValidationError> {
        self.ai.validate()?;
        self.search.validate()?;
        if self.prompts_path.is_empty() {
            return Err(ValidationError::MissingRequired("PROMPTS_PATH"));
        }
        Ok(())
    }
}

fn default_prompts_path() -> String {
    "prompts.yaml".to_string()
}
