//! Detection Module
//!
//! Matches a request's User-Agent and Referer against the active catalog.
//!
//! ## Structure
//! - `types`: `ClassificationResult`, `MatchKind`
//! - `classifier`: Matching logic (pure, in-memory)

pub mod types;
pub mod classifier;

pub use types::{ClassificationResult, MatchKind};
pub use classifier::{classify, match_agent, match_referrer};
