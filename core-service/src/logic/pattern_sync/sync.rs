//! Pattern Sync
//!
//! One refresh entry point shared by the scheduled loop and manual operator
//! sync. A successful refresh is installed with a single pointer swap and
//! timestamped in the config store; a failed one changes nothing but the
//! sync status.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::Serialize;

use crate::logic::catalog::{CatalogError, CatalogHandle, CatalogOrigin, CatalogSource};
use crate::logic::config::{keys, ConfigStore, ShieldSettings};

/// Sync status
#[derive(Debug, Clone, Default, Serialize)]
pub struct SyncStatus {
    pub last_attempt: Option<DateTime<Utc>>,
    pub last_success: Option<DateTime<Utc>>,
    pub sync_count: u64,
    pub failure_count: u64,
    pub last_error: Option<String>,
    pub loop_running: bool,
}

/// Summary of a successful refresh
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SyncReport {
    pub version: String,
    pub agents: usize,
    pub referrers: usize,
    pub fingerprint: String,
    pub synced_at: DateTime<Utc>,
}

// ============================================================================
// SYNC MANAGER
// ============================================================================

pub struct SyncManager {
    source: Arc<CatalogSource>,
    handle: Arc<CatalogHandle>,
    config: Arc<dyn ConfigStore>,
    status: RwLock<SyncStatus>,
}

impl SyncManager {
    pub fn new(
        source: Arc<CatalogSource>,
        handle: Arc<CatalogHandle>,
        config: Arc<dyn ConfigStore>,
    ) -> Self {
        Self {
            source,
            handle,
            config,
            status: RwLock::new(SyncStatus::default()),
        }
    }

    pub fn source(&self) -> &Arc<CatalogSource> {
        &self.source
    }

    pub fn handle(&self) -> &Arc<CatalogHandle> {
        &self.handle
    }

    pub fn status(&self) -> SyncStatus {
        self.status.read().clone()
    }

    /// Refresh now with the configured API key
    pub fn sync_now(&self) -> Result<SyncReport, CatalogError> {
        let api_key = ShieldSettings::read(self.config.as_ref()).api_key;
        let now = Utc::now();
        self.status.write().last_attempt = Some(now);

        match self.source.refresh(&api_key) {
            Ok(catalog) => {
                let report = SyncReport {
                    version: catalog.version().to_string(),
                    agents: catalog.agents().len(),
                    referrers: catalog.referrers().len(),
                    fingerprint: catalog.fingerprint().to_string(),
                    synced_at: now,
                };
                self.handle.install(catalog);
                self.config
                    .set(keys::LAST_PATTERN_SYNC, &now.timestamp().to_string());

                let mut status = self.status.write();
                status.last_success = Some(now);
                status.sync_count += 1;
                status.last_error = None;
                Ok(report)
            }
            Err(e) => {
                log::warn!("Pattern sync failed, keeping catalog v{}: {}", self.handle.current().version(), e);
                let mut status = self.status.write();
                status.failure_count += 1;
                status.last_error = Some(e.to_string());
                Err(e)
            }
        }
    }

    /// Refresh at startup when a key exists but nothing was cached
    ///
    /// Returns true when a refresh was attempted.
    pub fn sync_on_startup(&self) -> bool {
        let settings = ShieldSettings::read(self.config.as_ref());
        if !settings.has_api_key() || self.handle.current().origin() == CatalogOrigin::Cache {
            return false;
        }

        log::info!("No cached catalog, syncing patterns at startup");
        if let Err(e) = self.sync_now() {
            log::warn!("Startup sync failed: {}", e);
        }
        true
    }

    /// Drop the cached snapshot (deactivation); the installed catalog stays
    pub fn clear_cache(&self) -> Result<(), CatalogError> {
        self.source.invalidate_cache()?;
        log::info!("Pattern cache cleared");
        Ok(())
    }

    fn set_loop_running(&self, running: bool) {
        self.status.write().loop_running = running;
    }
}

// ============================================================================
// SCHEDULED LOOP
// ============================================================================

/// Stops the scheduled sync thread when dropped
pub struct SyncLoopHandle {
    stop: Arc<AtomicBool>,
    thread: Option<JoinHandle<()>>,
}

impl SyncLoopHandle {
    pub fn stop(mut self) {
        self.shutdown();
    }

    fn shutdown(&mut self) {
        self.stop.store(true, Ordering::SeqCst);
        if let Some(thread) = self.thread.take() {
            thread.thread().unpark();
            if thread.join().is_err() {
                log::error!("Pattern sync thread panicked");
            }
        }
    }
}

impl Drop for SyncLoopHandle {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// Start the scheduled refresh loop
///
/// `None` when auto-sync is off. The setting is re-read before each run, so
/// switching it off later pauses refreshes without stopping the thread.
pub fn start_sync_loop(manager: Arc<SyncManager>, interval: Duration) -> Option<SyncLoopHandle> {
    if !ShieldSettings::read(manager.config.as_ref()).auto_sync {
        log::info!("Automatic pattern sync is disabled");
        return None;
    }

    let stop = Arc::new(AtomicBool::new(false));
    let thread = {
        let stop = stop.clone();
        let manager = manager.clone();
        std::thread::Builder::new()
            .name("shield-pattern-sync".to_string())
            .spawn(move || run_loop(manager, interval, stop))
    };

    match thread {
        Ok(thread) => {
            log::info!("Pattern sync loop started (every {}s)", interval.as_secs());
            manager.set_loop_running(true);
            Some(SyncLoopHandle {
                stop,
                thread: Some(thread),
            })
        }
        Err(e) => {
            log::error!("Could not start pattern sync loop: {}", e);
            None
        }
    }
}

fn run_loop(manager: Arc<SyncManager>, interval: Duration, stop: Arc<AtomicBool>) {
    loop {
        // park_timeout may wake early; sleep until the deadline or a stop
        let deadline = Instant::now() + interval;
        while !stop.load(Ordering::SeqCst) {
            let now = Instant::now();
            if now >= deadline {
                break;
            }
            std::thread::park_timeout(deadline - now);
        }
        if stop.load(Ordering::SeqCst) {
            break;
        }

        if ShieldSettings::read(manager.config.as_ref()).auto_sync {
            match manager.sync_now() {
                Ok(report) => log::info!("Scheduled sync installed catalog v{}", report.version),
                Err(e) => log::warn!("Scheduled sync failed: {}", e),
            }
        }
    }

    manager.set_loop_running(false);
    log::info!("Pattern sync loop stopped");
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logic::catalog::{builtin_catalog, CatalogOrigin, MemoryCatalogCache, SourceConfig};
    use crate::logic::config::MemoryConfigStore;
    use crate::logic::transport::mock::MockTransport;

    const GOOD: &str = r#"{"version":"5.0.0","patterns":[{"pattern":"GPTBot"},{"pattern":"CCBot"}],"aiReferrers":[]}"#;

    fn manager(transport: Arc<MockTransport>, store: MemoryConfigStore) -> Arc<SyncManager> {
        let source = CatalogSource::new(
            SourceConfig {
                patterns_endpoint: "https://patterns.test".to_string(),
                timeout: Duration::from_secs(1),
                cache_ttl: Duration::from_secs(60),
                fallback_path: None,
            },
            transport,
            Arc::new(MemoryCatalogCache::new()),
        );
        Arc::new(SyncManager::new(
            Arc::new(source),
            Arc::new(CatalogHandle::new(builtin_catalog())),
            Arc::new(store),
        ))
    }

    fn keyed() -> MemoryConfigStore {
        MemoryConfigStore::with_values([(keys::API_KEY, "k"), (keys::AUTO_SYNC_PATTERNS, "yes")])
    }

    #[test]
    fn test_sync_installs_and_timestamps() {
        let m = manager(Arc::new(MockTransport::replying(200, GOOD)), keyed());

        let report = m.sync_now().unwrap();
        assert_eq!(report.version, "5.0.0");
        assert_eq!(report.agents, 2);
        assert_eq!(m.handle().current().origin(), CatalogOrigin::Remote);
        assert_eq!(m.handle().current().fingerprint(), report.fingerprint);
        assert!(m.config.get(keys::LAST_PATTERN_SYNC).is_some());
        assert_eq!(m.status().sync_count, 1);
    }

    #[test]
    fn test_failed_refresh_keeps_installed_catalog() {
        let transport = Arc::new(MockTransport::replying(200, GOOD));
        let m = manager(transport.clone(), keyed());
        m.sync_now().unwrap();
        let installed = m.handle().current();

        for (status, body) in [(200, r#"{"version":"6","patterns":[]}"#), (503, GOOD)] {
            transport.set_get_reply(status, body);
            assert!(m.sync_now().is_err());

            let current = m.handle().current();
            assert!(Arc::ptr_eq(&installed, &current));
            assert_eq!(current.fingerprint(), installed.fingerprint());
        }

        let status = m.status();
        assert_eq!(status.failure_count, 2);
        assert!(status.last_error.unwrap().contains("503"));
    }

    #[test]
    fn test_sync_requires_api_key() {
        let transport = Arc::new(MockTransport::replying(200, GOOD));
        let m = manager(transport.clone(), MemoryConfigStore::new());

        assert_eq!(m.sync_now().unwrap_err(), CatalogError::MissingApiKey);
        assert!(transport.gets.lock().is_empty());
        assert!(!m.sync_on_startup());
    }

    #[test]
    fn test_startup_sync_when_nothing_cached() {
        let transport = Arc::new(MockTransport::replying(200, GOOD));
        let m = manager(transport.clone(), keyed());

        assert!(m.sync_on_startup());
        assert_eq!(transport.gets.lock().len(), 1);
        assert_eq!(m.handle().current().version(), "5.0.0");
    }

    #[test]
    fn test_loop_disabled_when_auto_sync_off() {
        let store = MemoryConfigStore::with_values([(keys::API_KEY, "k"), (keys::AUTO_SYNC_PATTERNS, "no")]);
        let m = manager(Arc::new(MockTransport::replying(200, GOOD)), store);
        assert!(start_sync_loop(m, Duration::from_millis(10)).is_none());
    }

    #[test]
    fn test_loop_refreshes_and_stops() {
        let transport = Arc::new(MockTransport::replying(200, GOOD));
        let m = manager(transport.clone(), keyed());

        let handle = start_sync_loop(m.clone(), Duration::from_millis(20)).unwrap();
        assert!(m.status().loop_running);

        let deadline = Instant::now() + Duration::from_secs(5);
        while transport.gets.lock().is_empty() && Instant::now() < deadline {
            std::thread::sleep(Duration::from_millis(10));
        }
        handle.stop();

        assert!(!transport.gets.lock().is_empty());
        assert!(!m.status().loop_running);
    }
}
