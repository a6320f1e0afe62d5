//! Ports - Interfaces for external dependencies.
//!
//! Following hexagonal architecture, ports define the contracts between
//! the application and the outside world. Adapters implement these ports.
//!
//! - `AIProvider` - chat-completion backend (Groq in production)
//! - `SearchProvider` - web search backend (DuckDuckGo in production)

mod ai_provider;
mod search_provider;

pub use ai_provider::{AIError, AIProvider, CompletionRequest, CompletionResponse};
pub use search_provider::{SearchError, SearchHit, SearchProvider};
