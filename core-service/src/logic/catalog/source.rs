//! Catalog Source
//!
//! Loads the catalog at startup (cache → fallback file → built-in) and
//! refreshes it from the patterns endpoint. Refresh fails closed: nothing it
//! returns as an error may ever reach the installed catalog.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use super::cache::CatalogCache;
use super::error::CatalogError;
use super::fallback::{builtin_catalog, read_fallback_file, write_fallback_file};
use super::types::{CatalogOrigin, PatternCatalog};
use crate::constants;
use crate::logic::transport::{HttpReply, HttpTransport};

/// Source configuration
#[derive(Debug, Clone)]
pub struct SourceConfig {
    pub patterns_endpoint: String,
    pub timeout: Duration,
    pub cache_ttl: Duration,
    /// Fallback JSON file; `None` skips straight to the built-in set
    pub fallback_path: Option<PathBuf>,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            patterns_endpoint: constants::get_patterns_endpoint(),
            timeout: Duration::from_secs(constants::DEFAULT_REFRESH_TIMEOUT_SECS),
            cache_ttl: Duration::from_secs(constants::DEFAULT_CACHE_TTL_SECS),
            fallback_path: None,
        }
    }
}

pub struct CatalogSource {
    config: SourceConfig,
    transport: Arc<dyn HttpTransport>,
    cache: Arc<dyn CatalogCache>,
}

impl CatalogSource {
    pub fn new(
        config: SourceConfig,
        transport: Arc<dyn HttpTransport>,
        cache: Arc<dyn CatalogCache>,
    ) -> Self {
        Self {
            config,
            transport,
            cache,
        }
    }

    pub fn config(&self) -> &SourceConfig {
        &self.config
    }

    /// Startup load, never fails
    pub fn load(&self) -> PatternCatalog {
        if let Some(catalog) = self.load_cached() {
            return catalog;
        }

        if let Some(path) = &self.config.fallback_path {
            match read_fallback_file(path) {
                Ok(catalog) => {
                    log::info!(
                        "Loaded fallback catalog v{} ({} agents) from {:?}",
                        catalog.version(),
                        catalog.agents().len(),
                        path
                    );
                    return catalog;
                }
                Err(e) => log::warn!("Fallback catalog unusable ({:?}): {}", path, e),
            }
        }

        let catalog = builtin_catalog();
        log::info!("Using built-in catalog ({} agents)", catalog.agents().len());
        catalog
    }

    /// Cached snapshot, if present, unexpired and valid
    pub fn load_cached(&self) -> Option<PatternCatalog> {
        let snapshot = match self.cache.get() {
            Ok(Some(snapshot)) => snapshot,
            Ok(None) => return None,
            Err(e) => {
                log::warn!("Catalog cache unreadable: {}", e);
                return None;
            }
        };

        match PatternCatalog::from_json(&snapshot, CatalogOrigin::Cache) {
            Ok(catalog) => {
                log::debug!("Loaded cached catalog v{}", catalog.version());
                Some(catalog)
            }
            Err(e) => {
                log::warn!("Discarding cached catalog: {}", e);
                None
            }
        }
    }

    /// Fetch a fresh catalog
    ///
    /// On success the snapshot is written to the cache and mirrored to the
    /// fallback file (both best effort); installing it is up to the caller.
    pub fn refresh(&self, api_key: &str) -> Result<PatternCatalog, CatalogError> {
        if api_key.trim().is_empty() {
            return Err(CatalogError::MissingApiKey);
        }

        let reply = self
            .transport
            .get(&self.config.patterns_endpoint, api_key, self.config.timeout)?;
        let catalog = parse_catalog_reply(&reply)?;

        self.persist(&catalog, &reply.body);
        log::info!(
            "Fetched catalog v{} ({} agents, {} referrers)",
            catalog.version(),
            catalog.agents().len(),
            catalog.referrers().len()
        );
        Ok(catalog)
    }

    /// Drop the cached snapshot (next `load` falls back to file / built-in)
    pub fn invalidate_cache(&self) -> Result<(), CatalogError> {
        self.cache.delete()?;
        Ok(())
    }

    fn persist(&self, catalog: &PatternCatalog, body: &str) {
        match catalog.to_payload().to_json() {
            Ok(snapshot) => {
                if let Err(e) = self.cache.set(&snapshot, self.config.cache_ttl) {
                    log::warn!("Could not cache catalog: {}", e);
                }
            }
            Err(e) => log::warn!("Could not serialize catalog snapshot: {}", e),
        }

        if let Some(path) = &self.config.fallback_path {
            if let Err(e) = write_fallback_file(path, body) {
                log::warn!("Could not update fallback catalog {:?}: {}", path, e);
            }
        }
    }
}

/// Validate a patterns endpoint reply
pub fn parse_catalog_reply(reply: &HttpReply) -> Result<PatternCatalog, CatalogError> {
    if reply.status != 200 {
        return Err(CatalogError::HttpStatus(reply.status));
    }
    PatternCatalog::from_json(&reply.body, CatalogOrigin::Remote)
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logic::catalog::cache::MemoryCatalogCache;
    use crate::logic::transport::mock::MockTransport;
    use crate::logic::transport::TransportError;

    const GOOD: &str = r#"{"version":"3.0.0","patterns":[{"pattern":"GPTBot","category":"AI Crawler"}],"aiReferrers":[]}"#;

    fn source_with(transport: Arc<MockTransport>, fallback: Option<PathBuf>) -> (CatalogSource, Arc<MemoryCatalogCache>) {
        let cache = Arc::new(MemoryCatalogCache::new());
        let config = SourceConfig {
            patterns_endpoint: "https://patterns.test/api/patterns".to_string(),
            timeout: Duration::from_secs(1),
            cache_ttl: Duration::from_secs(3600),
            fallback_path: fallback,
        };
        (CatalogSource::new(config, transport, cache.clone()), cache)
    }

    #[test]
    fn test_load_without_anything_uses_builtin() {
        let (source, _) = source_with(Arc::new(MockTransport::replying(200, GOOD)), None);
        assert_eq!(source.load().origin(), CatalogOrigin::BuiltIn);
    }

    #[test]
    fn test_load_prefers_cache_over_fallback() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("agents.json");
        write_fallback_file(&path, r#"{"version":"file","patterns":[{"pattern":"x"}]}"#).unwrap();

        let (source, cache) = source_with(Arc::new(MockTransport::replying(200, GOOD)), Some(path));
        assert_eq!(source.load().version(), "file");

        cache.set(GOOD, Duration::from_secs(60)).unwrap();
        let loaded = source.load();
        assert_eq!(loaded.origin(), CatalogOrigin::Cache);
        assert_eq!(loaded.version(), "3.0.0");
    }

    #[test]
    fn test_refresh_sends_api_key_and_persists() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("agents.json");
        let transport = Arc::new(MockTransport::replying(200, GOOD));
        let (source, cache) = source_with(transport.clone(), Some(path.clone()));

        let catalog = source.refresh("key-123").unwrap();
        assert_eq!(catalog.origin(), CatalogOrigin::Remote);
        assert_eq!(
            transport.gets.lock()[0],
            ("https://patterns.test/api/patterns".to_string(), "key-123".to_string())
        );
        assert!(cache.get().unwrap().is_some());
        assert_eq!(std::fs::read_to_string(path).unwrap(), GOOD);
    }

    #[test]
    fn test_refresh_without_key_does_no_io() {
        let transport = Arc::new(MockTransport::replying(200, GOOD));
        let (source, _) = source_with(transport.clone(), None);
        assert_eq!(source.refresh("  ").unwrap_err(), CatalogError::MissingApiKey);
        assert!(transport.gets.lock().is_empty());
    }

    #[test]
    fn test_refresh_fails_closed() {
        let cases = [
            (500, GOOD),
            (404, ""),
            (200, r#"{"version":"4","patterns":[]}"#),
            (200, r#"{"version":"4"}"#),
            (200, "{truncated"),
        ];

        for (status, body) in cases {
            let transport = Arc::new(MockTransport::replying(status, body));
            let (source, cache) = source_with(transport, None);
            assert!(source.refresh("key").is_err(), "status {} body {:?}", status, body);
            assert_eq!(cache.get().unwrap(), None, "nothing cached for {:?}", body);
        }
    }

    #[test]
    fn test_refresh_transport_error() {
        let transport = Arc::new(MockTransport::failing(TransportError::Timeout));
        let (source, _) = source_with(transport, None);
        assert_eq!(
            source.refresh("key").unwrap_err(),
            CatalogError::Transport(TransportError::Timeout)
        );
    }

    #[test]
    fn test_invalidate_cache() {
        let (source, cache) = source_with(Arc::new(MockTransport::replying(200, GOOD)), None);
        source.refresh("key").unwrap();
        source.invalidate_cache().unwrap();
        assert_eq!(cache.get().unwrap(), None);
        assert_eq!(source.load().origin(), CatalogOrigin::BuiltIn);
    }
}
