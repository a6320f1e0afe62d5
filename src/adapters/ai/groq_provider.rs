//! Groq Provider - Implementation of AIProvider for Groq's OpenAI-compatible API.
//!
//! # Configuration
//!
//! ```ignore
//! let config = GroqConfig::new()
//!     .with_model("llama-3.3-70b-versatile")
//!     .with_base_url("https://api.groq.com");
//!
//! let provider = GroqProvider::new(config);
//! ```
//!
//! The API key is not part of the configuration: it arrives with each
//! request so the credential pool can rotate keys between calls.
//!
//! Transient failures (timeouts, connection errors, 5xx) are retried here
//! with a fixed delay, up to `max_retries` total attempts. A 429 is
//! propagated immediately with the raw error body attached; the caller
//! decides which credential to try next.

use async_trait::async_trait;
use reqwest::{Client, Response};
use secrecy::ExposeSecret;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio::time::sleep;

use crate::ports::{AIError, AIProvider, CompletionRequest, CompletionResponse};

/// Configuration for the Groq provider.
#[derive(Debug, Clone)]
pub struct GroqConfig {
    /// Model to use (e.g., "llama-3.3-70b-versatile").
    pub model: String,
    /// Base URL for the API (default: https://api.groq.com).
    pub base_url: String,
    /// Request timeout.
    pub timeout: Duration,
    /// Total attempts made on transient failures, including the first.
    pub max_retries: u32,
    /// Delay between transient retries.
    pub retry_delay: Duration,
}

impl GroqConfig {
    pub fn new() -> Self {
        Self {
            model: "llama-3.3-70b-versatile".to_string(),
            base_url: "https://api.groq.com".to_string(),
            timeout: Duration::from_secs(60),
            max_retries: 3,
            retry_delay: Duration::from_secs(2),
        }
    }

    /// Sets the model to use.
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
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

    /// Sets the total attempt budget for transient failures.
    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    /// Sets the delay between retries.
    pub fn with_retry_delay(mut self, delay: Duration) -> Self {
        self.retry_delay = delay;
        self
    }
}

impl Default for GroqConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// Groq API provider implementation.
pub struct GroqProvider {
    config: GroqConfig,
    client: Client,
}

impl GroqProvider {
    /// Creates a new Groq provider with the given configuration.
    pub fn new(config: GroqConfig) -> Self {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .expect("Failed to create HTTP client");

        Self { config, client }
    }

    /// Builds the chat-completions endpoint URL.
    fn completions_url(&self) -> String {
        format!("{}/openai/v1/chat/completions", self.config.base_url)
    }

    /// Converts our request to Groq's chat format.
    fn to_groq_request(&self, request: &CompletionRequest) -> GroqRequest {
        GroqRequest {
            model: request
                .model
                .clone()
                .unwrap_or_else(|| self.config.model.clone()),
            messages: vec![GroqMessage {
                role: "user".to_string(),
                content: request.prompt.clone(),
            }],
            temperature: request.temperature,
        }
    }

    /// Sends a request, mapping transport failures to typed errors.
    async fn send_request(&self, request: &CompletionRequest) -> Result<Response, AIError> {
        let groq_request = self.to_groq_request(request);

        self.client
            .post(self.completions_url())
            .bearer_auth(request.api_key.expose_secret())
            .header("Content-Type", "application/json")
            .json(&groq_request)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    AIError::Timeout {
                        timeout_secs: self.config.timeout.as_secs() as u32,
                    }
                } else if e.is_connect() {
                    AIError::network(format!("Connection failed: {}", e))
                } else {
                    AIError::network(e.to_string())
                }
            })
    }

    /// Parses the API response status and handles errors.
    async fn handle_response_status(&self, response: Response) -> Result<Response, AIError> {
        let status = response.status();

        if status.is_success() {
            return Ok(response);
        }

        let error_body = response.text().await.unwrap_or_default();

        match status.as_u16() {
            401 => Err(AIError::AuthenticationFailed),
            // The 429 body carries the advertised wait; the rotation
            // layer parses it, so keep the raw text intact.
            429 => Err(AIError::rate_limited(error_body)),
            400 => Err(AIError::InvalidRequest(error_body)),
            500..=599 => Err(AIError::unavailable(format!(
                "Server error {}: {}",
                status, error_body
            ))),
            _ => Err(AIError::network(format!(
                "Unexpected status {}: {}",
                status, error_body
            ))),
        }
    }

    /// Parses the completion out of a successful response.
    async fn parse_response(&self, response: Response) -> Result<CompletionResponse, AIError> {
        let response = self.handle_response_status(response).await?;

        let groq_response: GroqResponse = response
            .json()
            .await
            .map_err(|e| AIError::parse(format!("Failed to parse response: {}", e)))?;

        let content = groq_response
            .choices
            .into_iter()
            .next()
            .map(|choice| choice.message.content)
            .ok_or_else(|| AIError::parse("Response contained no choices"))?;

        Ok(CompletionResponse {
            content,
            model: groq_response.model,
        })
    }
}

#[async_trait]
impl AIProvider for GroqProvider {
    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse, AIError> {
        // max_retries is the total attempt count, including the first.
        let max_attempts = self.config.max_retries.max(1);
        let mut last_error = AIError::network("No attempts made");

        for attempt in 1..=max_attempts {
            let result = match self.send_request(&request).await {
                Ok(response) => self.parse_response(response).await,
                Err(err) => Err(err),
            };

            match result {
                Ok(completion) => return Ok(completion),
                Err(err) => {
                    if !err.is_retryable() || attempt == max_attempts {
                        return Err(err);
                    }
                    tracing::warn!(error = %err, attempt, "transient completion failure, retrying");
                    last_error = err;
                }
            }

            sleep(self.config.retry_delay).await;
        }

        Err(last_error)
    }
}

// ----- Groq API Types -----

#[derive(Debug, Serialize)]
struct GroqRequest {
    model: String,
    messages: Vec<GroqMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
}

#[derive(Debug, Serialize, Deserialize)]
struct GroqMessage {
    role: String,
    content: String,
}

#[derive(Debug, Deserialize)]
struct GroqResponse {
    model: String,
    choices: Vec<GroqChoice>,
}

#[derive(Debug, Deserialize)]
struct GroqChoice {
    message: GroqMessage,
}
