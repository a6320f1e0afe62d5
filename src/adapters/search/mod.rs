//! Search adapters - implementations of the SearchProvider port.

mod duckduckgo;
mod mock;

pub use duckduckgo::{DuckDuckGoConfig, DuckDuckGoProvider};
pub use mock::{MockSearchProvider, MockSearchResponse};
