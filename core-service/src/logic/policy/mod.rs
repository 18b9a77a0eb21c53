//! Policy Module
//!
//! Turns an agent match plus allow/block rules into a Verdict.
//! Referrer matches never reach this module.
//!
//! ## Structure
//! - `types`: Core types (Decision, DecisiveRule, Verdict)
//! - `config`: Local operator rules + merge with central policy
//! - `engine`: Precedence logic
//!
//! ## Usage
//! ```ignore
//! use crate::logic::policy::{resolve, effective_policy};
//!
//! let policy = effective_policy(catalog.policy(), &settings.local_policy);
//! let verdict = resolve(&agent, policy.as_deref());
//! if verdict.is_block() {
//!     terminate_403();
//! }
//! ```

pub mod types;
pub mod config;
pub mod engine;

pub use types::{Decision, DecisiveRule, Verdict};

pub use config::{LocalPolicy, effective_policy};

pub use engine::resolve;
