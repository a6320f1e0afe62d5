//! AI Provider Port - Interface for LLM provider integrations.
//!
//! This port abstracts all interactions with chat-completion providers,
//! letting the planner generate replies without coupling to a specific API.
//!
//! # Design
//!
//! - The API key travels with each request rather than living in the
//!   provider: the credential pool rotates keys between calls, so the
//!   adapter must be stateless with respect to authentication.
//! - Error variants distinguish rate limiting (handled by rotating to
//!   another credential) from transient faults (retried on the same one).
//!
//! # Example
//!
//! ```ignore
//! use async_trait::async_trait;
//!
//! struct MockProvider;
//!
//! #[async_trait]
//! impl AIProvider for MockProvider {
//!     async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse, AIError> {
//!         Ok(CompletionResponse {
//!             content: "¡Hola!".to_string(),
//!             model: "mock".to_string(),
//!         })
//!     }
//! }
//! ```

use async_trait::async_trait;
use secrecy::Secret;

/// Port for chat-completion provider interactions.
///
/// Implementations connect to an external AI service and translate between
/// the provider-specific API and our request/response types.
#[async_trait]
pub trait AIProvider: Send + Sync {
    /// Generate a single completion for the request's prompt.
    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse, AIError>;
}

/// Request for AI completion.
#[derive(Debug, Clone)]
pub struct CompletionRequest {
    /// Fully rendered prompt text.
    pub prompt: String,
    /// API key to authenticate this specific call.
    pub api_key: Secret<String>,
    /// Temperature for response randomness.
    pub temperature: Option<f32>,
    /// Model override; the adapter's configured model when absent.
    pub model: Option<String>,
}

impl CompletionRequest {
    /// Creates a request for the given prompt and credential.
    pub fn new(prompt: impl Into<String>, api_key: Secret<String>) -> Self {
        Self {
            prompt: prompt.into(),
            api_key,
            temperature: None,
            model: None,
        }
    }

    /// Sets the temperature.
    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    /// Sets a model override.
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }
}

/// Response from AI completion.
#[derive(Debug, Clone)]
pub struct CompletionResponse {
    /// Generated content.
    pub content: String,
    /// Model that generated the response.
    pub model: String,
}

/// AI provider errors.
#[derive(Debug, thiserror::Error)]
pub enum AIError {
    /// Rate limited by provider. Carries the raw error body so the caller
    /// can parse the advertised wait time.
    #[error("rate limited: {message}")]
    RateLimited {
        /// Raw provider error body.
        message: String,
    },

    /// Provider is unavailable.
    #[error("provider unavailable: {message}")]
    Unavailable {
        /// Error details.
        message: String,
    },

    /// API key or authentication failed.
    #[error("authentication failed")]
    AuthenticationFailed,

    /// Network error during request.
    #[error("network error: {0}")]
    Network(String),

    /// Failed to parse provider response.
    #[error("parse error: {0}")]
    Parse(String),

    /// Invalid request configuration.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// Request timed out.
    #[error("request timed out after {timeout_secs}s")]
    Timeout {
        /// Configured timeout.
        timeout_secs: u32,
    },
}

impl AIError {
    /// Creates a rate limited error.
    pub fn rate_limited(message: impl Into<String>) -> Self {
        Self::RateLimited {
            message: message.into(),
        }
    }

    /// Creates an unavailable error.
    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::Unavailable {
            message: message.into(),
        }
    }

    /// Creates a network error.
    pub fn network(message: impl Into<String>) -> Self {
        Self::Network(message.into())
    }

    /// Creates a parse error.
    pub fn parse(message: impl Into<String>) -> Self {
        Self::Parse(message.into())
    }

    /// True for transient faults worth retrying on the same credential.
    ///
    /// Rate limiting is deliberately excluded: that case is handled by
    /// marking the credential and rotating to the next one.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            AIError::Unavailable { .. } | AIError::Network(_) | AIError::Timeout { .. }
        )
    }

    /// True when the provider reported a rate limit.
    pub fn is_rate_limited(&self) -> bool {
        matches!(self, AIError::RateLimited { .. })
    }
}
