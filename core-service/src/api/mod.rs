//! API Module
//!
//! Operator-facing commands over an `AgentShield`.
//!
//! Usage:
//! - `api::sync_patterns(&shield)` - Manual catalog sync
//! - `api::get_pattern_statistics(&shield)` - Catalog overview
//! - `api::update_custom_rules(&shield, update)` - Local allow/block lists

pub mod commands;

pub use commands::*;
