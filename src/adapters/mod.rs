//! Adapters - Implementations of port interfaces.
//!
//! Adapters connect the application to external systems:
//! - `ai` - chat-completion providers (Groq, mock)
//! - `search` - web search providers (DuckDuckGo, mock)

pub mod ai;
pub mod search;
