//! Central Configuration Constants
//!
//! Single source of truth for all configuration defaults.
//! To point the shield at another platform, only edit this file (or set the
//! matching environment variables).

/// Default patterns endpoint (catalog refresh)
pub const DEFAULT_PATTERNS_ENDPOINT: &str = "https://www.spyglasses.io/api/patterns";

/// Default collector endpoint (telemetry)
pub const DEFAULT_COLLECTOR_ENDPOINT: &str = "https://www.spyglasses.io/api/collect";

/// Catalog refresh timeout (seconds)
pub const DEFAULT_REFRESH_TIMEOUT_SECS: u64 = 10;

/// Cached catalog lifetime (seconds)
pub const DEFAULT_CACHE_TTL_SECS: u64 = 24 * 60 * 60;

/// Diagnostic-mode telemetry timeout (seconds)
pub const DEFAULT_TELEMETRY_TIMEOUT_SECS: u64 = 5;

/// Scheduled refresh interval (seconds)
pub const DEFAULT_SYNC_INTERVAL_SECS: u64 = 24 * 60 * 60;

/// Events waiting for the telemetry worker before new ones are dropped
pub const TELEMETRY_QUEUE_CAPACITY: usize = 1024;

/// Compiled size limit for one untrusted signature pattern
pub const MAX_PATTERN_SIZE_BYTES: usize = 1 << 20;

/// Cache / fallback directory name under the platform data dir
pub const DATA_DIR_NAME: &str = "agent-shield";

/// App version
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

/// App name
pub const APP_NAME: &str = "Agent Shield";

// ============================================
// Helper functions to read from env with fallback
// ============================================

/// Get API key from environment (empty when unset)
pub fn get_api_key() -> String {
    std::env::var("SHIELD_API_KEY").unwrap_or_default()
}

/// Get patterns endpoint from environment or use default
pub fn get_patterns_endpoint() -> String {
    std::env::var("SHIELD_PATTERNS_ENDPOINT")
        .unwrap_or_else(|_| DEFAULT_PATTERNS_ENDPOINT.to_string())
}

/// Get collector endpoint from environment or use default
pub fn get_collector_endpoint() -> String {
    std::env::var("SHIELD_COLLECTOR_ENDPOINT")
        .unwrap_or_else(|_| DEFAULT_COLLECTOR_ENDPOINT.to_string())
}

/// Get sync interval from environment or use default
pub fn get_sync_interval() -> u64 {
    std::env::var("SHIELD_SYNC_INTERVAL")
        .ok()
        .and_then(|s| s.parse().ok())
        .filter(|secs| *secs > 0)
        .unwrap_or(DEFAULT_SYNC_INTERVAL_SECS)
}

/// Check if diagnostic mode is enabled (off by default)
pub fn is_debug_enabled() -> bool {
    std::env::var("SHIELD_DEBUG")
        .map(|s| crate::logic::config::parse_flag(&s))
        .unwrap_or(false)
}

/// Check if scheduled catalog sync is enabled (on by default)
pub fn is_auto_sync_enabled() -> bool {
    auto_sync_flag(std::env::var("SHIELD_AUTO_SYNC").ok().as_deref())
}

fn auto_sync_flag(raw: Option<&str>) -> bool {
    raw.map(crate::logic::config::parse_flag).unwrap_or(true)
}

/// Directory for the catalog cache and fallback file
pub fn get_cache_dir() -> std::path::PathBuf {
    std::env::var("SHIELD_CACHE_DIR")
        .map(std::path::PathBuf::from)
        .unwrap_or_else(|_| {
            dirs::data_local_dir()
                .unwrap_or_else(|| std::path::PathBuf::from("."))
                .join(DATA_DIR_NAME)
        })
}
