//! Catalog Module - Pattern Registry
//!
//! Versioned catalog of agent signatures, AI referrer signatures and central
//! platform policy.
//!
//! ## Structure
//! - `types`: Signatures, policy, `PatternCatalog` snapshot
//! - `rule_ref`: Typed allow/block rule targets
//! - `cache`: Snapshot cache store (file / memory)
//! - `fallback`: Built-in agent set + local fallback file
//! - `source`: Startup load and remote refresh
//!
//! ## Snapshot discipline
//! The active catalog is an `Arc<PatternCatalog>` behind a `CatalogHandle`.
//! Readers clone the `Arc`; a refresh replaces it in one swap. A catalog is
//! never edited in place.

pub mod types;
pub mod rule_ref;
pub mod error;
pub mod cache;
pub mod fallback;
pub mod source;

use std::sync::Arc;

use parking_lot::RwLock;

pub use types::{
    AgentSignature,
    ReferrerSignature,
    PlatformPolicy,
    PropertySettings,
    CatalogPayload,
    CatalogOrigin,
    PatternCatalog,
};
pub use rule_ref::{RuleRef, RuleParseError};
pub use error::CatalogError;
pub use cache::{CatalogCache, CacheError, FileCatalogCache, MemoryCatalogCache};
pub use fallback::{builtin_catalog, builtin_payload};
pub use source::{CatalogSource, SourceConfig, parse_catalog_reply};

// ============================================================================
// CATALOG HANDLE
// ============================================================================

/// Shared reference to the active catalog
pub struct CatalogHandle {
    current: RwLock<Arc<PatternCatalog>>,
}

impl CatalogHandle {
    pub fn new(initial: PatternCatalog) -> Self {
        Self {
            current: RwLock::new(Arc::new(initial)),
        }
    }

    /// Snapshot for one request; stays valid across a concurrent swap
    pub fn current(&self) -> Arc<PatternCatalog> {
        self.current.read().clone()
    }

    /// Atomically replace the active catalog, returning the previous one
    pub fn install(&self, next: PatternCatalog) -> Arc<PatternCatalog> {
        let next = Arc::new(next);
        let previous = std::mem::replace(&mut *self.current.write(), next.clone());
        log::info!(
            "Installed catalog v{} from {} (was v{} from {})",
            next.version(),
            next.origin(),
            previous.version(),
            previous.origin()
        );
        previous
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_install_swaps_whole_snapshot() {
        let handle = CatalogHandle::new(builtin_catalog());
        let before = handle.current();

        let next = PatternCatalog::from_json(
            r#"{"version":"7","patterns":[{"pattern":"Bytespider"}]}"#,
            CatalogOrigin::Remote,
        )
        .unwrap();
        let previous = handle.install(next);

        assert!(Arc::ptr_eq(&before, &previous));
        assert_eq!(handle.current().version(), "7");
        // Readers holding the old snapshot keep a consistent view
        assert_eq!(before.agents().len(), 3);
    }
}
