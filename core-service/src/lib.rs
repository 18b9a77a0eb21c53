//! Agent Shield Core
//!
//! Classifies inbound HTTP requests as AI agents, crawlers or AI-referred
//! visitors, decides whether to block them and reports each decision to a
//! remote collector. Hosts wrap their request type in a `RequestContext`
//! and act on the returned `Enforcement`.

pub mod api;
pub mod constants;
pub mod logic;
pub mod shield;

pub use logic::catalog::{CatalogHandle, PatternCatalog, RuleRef};
pub use logic::config::{ConfigStore, MemoryConfigStore, ShieldSettings};
pub use logic::filter::{Enforcement, FilterOutcome, RequestContext, BLOCK_HEADERS, BLOCK_STATUS};
pub use shield::{AgentShield, ShieldOptions};
