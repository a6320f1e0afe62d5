//! Application layer - services that orchestrate the domain and ports.
//!
//! - `credentials` - the rotating API key pool
//! - `prompts` - prompt templates loaded from YAML
//! - `search` - categorized destination research
//! - `planner` - the per-turn conversation controller

pub mod credentials;
pub mod planner;
pub mod prompts;
pub mod search;

pub use credentials::{ApiCredential, CredentialError, CredentialPool};
pub use planner::{TravelPlanner, TripSession};
pub use prompts::{PromptCatalog, PromptError};
pub use search::{AggregateError, AggregatorLimits, SearchAggregator, SearchBundle};
