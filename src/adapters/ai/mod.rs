//! AI Provider Adapters.
//!
//! Implementations of the AIProvider port.
//!
//! ## Available Adapters
//!
//! - `GroqProvider` - Groq's OpenAI-compatible chat completions API
//! - `MockAIProvider` - Configurable mock for testing

mod groq_provider;
mod mock_provider;

pub use groq_provider::{GroqConfig, GroqProvider};
pub use mock_provider::{MockAIProvider, MockError, MockResponse, RecordedCall};
