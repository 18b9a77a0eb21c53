//! Pattern Sync Module - Catalog Refresh Scheduling
//!
//! This module handles:
//! - Manual sync (operator command)
//! - Startup sync when no cached catalog exists
//! - Periodic refresh on a background thread

pub mod sync;

pub use sync::{start_sync_loop, SyncLoopHandle, SyncManager, SyncReport, SyncStatus};
