//! Logic Module - Engines
//!
//! ## Request path
//! - `detection/` - Classifier (UA + referrer matching)
//! - `policy/` - Allow/block resolution
//! - `telemetry/` - Collector events + dispatch
//! - `filter/` - Per-request orchestration
//!
//! ## Out of band
//! - `catalog/` - Pattern registry, cache, fallback, remote source
//! - `pattern_sync/` - Manual / startup / scheduled refresh
//!
//! ## Seams
//! - `config` - Operator settings store
//! - `transport` - Outbound HTTP

pub mod config;
pub mod transport;

pub mod catalog;
pub mod detection;
pub mod policy;
pub mod telemetry;
pub mod filter;
pub mod pattern_sync;
