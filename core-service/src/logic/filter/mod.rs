//! Request Filter Module
//!
//! The access-control layer a host puts in front of its content.
//!
//! ## Structure
//! - `context`: Host-neutral request signals (UA, referrer, client IP, headers)
//! - `engine`: RequestFilter orchestration + enforcement outcome
//!
//! ## Usage
//! ```ignore
//! let outcome = filter.inspect(&ctx);
//! match outcome.enforcement {
//!     Enforcement::Terminate => respond_403(BLOCK_HEADERS),
//!     Enforcement::Proceed { vary_user_agent } => serve(vary_user_agent),
//! }
//! ```

pub mod context;
pub mod engine;

#[cfg(test)]
mod tests;

pub use context::{RequestContext, normalize_header_name};

pub use engine::{
    RequestFilter,
    FilterOutcome,
    FilterState,
    Enforcement,
    SkipReason,
    BLOCK_STATUS,
    BLOCK_HEADERS,
};
