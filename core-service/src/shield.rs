//! Agent Shield - Wiring
//!
//! Builds the catalog handle, sync manager, telemetry emitter and request
//! filter from a config store, a transport and a cache, and owns their
//! background threads.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;

use crate::constants;
use crate::logic::catalog::{CatalogCache, CatalogHandle, CatalogSource, FileCatalogCache, SourceConfig};
use crate::logic::config::{ConfigStore, MemoryConfigStore};
use crate::logic::filter::{FilterOutcome, RequestContext, RequestFilter};
use crate::logic::pattern_sync::{start_sync_loop, SyncLoopHandle, SyncManager};
use crate::logic::telemetry::{EmitterConfig, TelemetryEmitter};
use crate::logic::transport::{HttpTransport, UreqTransport};

/// Cache snapshot file name under the cache dir
pub const CACHE_FILE_NAME: &str = "catalog_cache.json";

/// Last good remote body under the cache dir
pub const FALLBACK_FILE_NAME: &str = "agents.json";

#[derive(Debug, Clone)]
pub struct ShieldOptions {
    pub source: SourceConfig,
    pub emitter: EmitterConfig,
    pub sync_interval: Duration,
    pub cache_dir: PathBuf,
}

impl ShieldOptions {
    /// Defaults from `constants`, overridable through `SHIELD_*` variables
    pub fn from_env() -> Self {
        let cache_dir = constants::get_cache_dir();
        Self {
            source: SourceConfig {
                fallback_path: Some(cache_dir.join(FALLBACK_FILE_NAME)),
                ..SourceConfig::default()
            },
            emitter: EmitterConfig::default(),
            sync_interval: Duration::from_secs(constants::get_sync_interval()),
            cache_dir,
        }
    }

    pub fn cache_path(&self) -> PathBuf {
        self.cache_dir.join(CACHE_FILE_NAME)
    }
}

pub struct AgentShield {
    config: Arc<dyn ConfigStore>,
    handle: Arc<CatalogHandle>,
    sync: Arc<SyncManager>,
    emitter: Arc<TelemetryEmitter>,
    filter: RequestFilter,
    sync_interval: Duration,
    sync_loop: Mutex<Option<SyncLoopHandle>>,
}

impl AgentShield {
    /// Wire everything and load the startup catalog (never fails)
    pub fn new(
        options: ShieldOptions,
        config: Arc<dyn ConfigStore>,
        transport: Arc<dyn HttpTransport>,
        cache: Arc<dyn CatalogCache>,
    ) -> Self {
        let source = Arc::new(CatalogSource::new(options.source, transport.clone(), cache));
        let handle = Arc::new(CatalogHandle::new(source.load()));
        let sync = Arc::new(SyncManager::new(source, handle.clone(), config.clone()));
        let emitter = Arc::new(TelemetryEmitter::new(options.emitter, transport));
        let filter = RequestFilter::new(handle.clone(), config.clone(), emitter.clone());

        Self {
            config,
            handle,
            sync,
            emitter,
            filter,
            sync_interval: options.sync_interval,
            sync_loop: Mutex::new(None),
        }
    }

    /// Env-seeded store, `ureq` transport, file cache under the cache dir
    pub fn from_env() -> Self {
        let options = ShieldOptions::from_env();
        let cache = Arc::new(FileCatalogCache::new(options.cache_path()));
        Self::new(
            options,
            Arc::new(MemoryConfigStore::from_env()),
            Arc::new(UreqTransport::new()),
            cache,
        )
    }

    /// Startup sync (blocking) then the scheduled loop
    pub fn start(&self) {
        self.sync.sync_on_startup();

        let mut slot = self.sync_loop.lock();
        if slot.is_none() {
            *slot = start_sync_loop(self.sync.clone(), self.sync_interval);
        }
    }

    pub fn inspect(&self, ctx: &RequestContext) -> FilterOutcome {
        self.filter.inspect(ctx)
    }

    pub fn config(&self) -> &Arc<dyn ConfigStore> {
        &self.config
    }

    pub fn catalog(&self) -> &Arc<CatalogHandle> {
        &self.handle
    }

    pub fn sync(&self) -> &Arc<SyncManager> {
        &self.sync
    }

    pub fn emitter(&self) -> &Arc<TelemetryEmitter> {
        &self.emitter
    }

    /// Stop the sync loop and drain queued telemetry
    pub fn shutdown(&self) {
        if let Some(handle) = self.sync_loop.lock().take() {
            handle.stop();
        }
        self.emitter.shutdown();
        log::info!("{} stopped", constants::APP_NAME);
    }
}
