//! Domain layer containing business logic and domain types.
//!
//! # Module Organization
//!
//! - `trip` - the slot-filling trip record and its merge semantics
//! - `conversation` - turn history and prompt windowing
//! - `extractor` - structured-output extraction from model replies
//! - `phase` - turn phases and the pure transition decision

pub mod conversation;
pub mod extractor;
pub mod phase;
pub mod trip;
