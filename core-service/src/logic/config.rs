//! Shield Settings
//!
//! Operator configuration behind a small key/value store. The request path
//! reads a fresh `ShieldSettings` snapshot per request, so edits apply to the
//! next request without a restart.

use std::collections::HashMap;

use parking_lot::RwLock;

use crate::constants;
use crate::logic::catalog::RuleRef;
use crate::logic::policy::LocalPolicy;

// ============================================================================
// KEYS
// ============================================================================

pub mod keys {
    pub const API_KEY: &str = "api_key";
    pub const DEBUG_MODE: &str = "debug_mode";
    pub const AUTO_SYNC_PATTERNS: &str = "auto_sync_patterns";
    pub const BLOCK_AI_MODEL_TRAINERS: &str = "block_ai_model_trainers";
    /// JSON array of rule strings
    pub const CUSTOM_BLOCKS: &str = "custom_blocks";
    /// JSON array of rule strings
    pub const CUSTOM_ALLOWS: &str = "custom_allows";
    /// Unix seconds of the last successful refresh
    pub const LAST_PATTERN_SYNC: &str = "last_pattern_sync";
    /// Comma separated path prefixes that bypass the filter
    pub const EXCLUDED_PATHS: &str = "excluded_paths";
}

// ============================================================================
// CONFIG STORE
// ============================================================================

/// Persistent string settings provided by the host
pub trait ConfigStore: Send + Sync {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&self, key: &str, value: &str);
    fn remove(&self, key: &str);
}

/// In-process store, seeded from the environment by hosts without storage
#[derive(Debug, Default)]
pub struct MemoryConfigStore {
    values: RwLock<HashMap<String, String>>,
}

impl MemoryConfigStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_values<I, K, V>(values: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            values: RwLock::new(
                values
                    .into_iter()
                    .map(|(k, v)| (k.into(), v.into()))
                    .collect(),
            ),
        }
    }

    /// Seed from `SHIELD_*` environment variables
    pub fn from_env() -> Self {
        let store = Self::new();
        store.set(keys::API_KEY, &constants::get_api_key());
        store.set(keys::DEBUG_MODE, bool_str(constants::is_debug_enabled()));
        store.set(keys::AUTO_SYNC_PATTERNS, bool_str(constants::is_auto_sync_enabled()));

        for (var, key) in [
            ("SHIELD_BLOCK_AI_MODEL_TRAINERS", keys::BLOCK_AI_MODEL_TRAINERS),
            ("SHIELD_CUSTOM_BLOCKS", keys::CUSTOM_BLOCKS),
            ("SHIELD_CUSTOM_ALLOWS", keys::CUSTOM_ALLOWS),
            ("SHIELD_EXCLUDED_PATHS", keys::EXCLUDED_PATHS),
        ] {
            if let Ok(value) = std::env::var(var) {
                store.set(key, &value);
            }
        }
        store
    }
}

impl ConfigStore for MemoryConfigStore {
    fn get(&self, key: &str) -> Option<String> {
        self.values.read().get(key).cloned()
    }

    fn set(&self, key: &str, value: &str) {
        self.values.write().insert(key.to_string(), value.to_string());
    }

    fn remove(&self, key: &str) {
        self.values.write().remove(key);
    }
}

// ============================================================================
// SETTINGS SNAPSHOT
// ============================================================================

/// Typed view of the store, read once per request
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ShieldSettings {
    pub api_key: String,
    pub debug_mode: bool,
    pub auto_sync: bool,
    pub local_policy: LocalPolicy,
    pub excluded_paths: Vec<String>,
    pub last_pattern_sync: Option<i64>,
}

impl ShieldSettings {
    pub fn read(store: &dyn ConfigStore) -> Self {
        let flag_or = |key: &str, default: bool| store.get(key).map(|v| parse_flag(&v)).unwrap_or(default);
        let flag = |key: &str| flag_or(key, false);
        let rules = |key: &str| {
            let raw = store.get(key).unwrap_or_default();
            RuleRef::parse_all(sanitize_rule_list(&raw).iter().map(String::as_str))
        };

        Self {
            api_key: store.get(keys::API_KEY).unwrap_or_default().trim().to_string(),
            debug_mode: flag(keys::DEBUG_MODE),
            // Scheduled refresh is on unless switched off
            auto_sync: flag_or(keys::AUTO_SYNC_PATTERNS, true),
            local_policy: LocalPolicy {
                block_ai_model_trainers: flag(keys::BLOCK_AI_MODEL_TRAINERS),
                custom_blocks: rules(keys::CUSTOM_BLOCKS),
                custom_allows: rules(keys::CUSTOM_ALLOWS),
            },
            excluded_paths: parse_path_list(&store.get(keys::EXCLUDED_PATHS).unwrap_or_default()),
            last_pattern_sync: store
                .get(keys::LAST_PATTERN_SYNC)
                .and_then(|v| v.trim().parse().ok()),
        }
    }

    pub fn has_api_key(&self) -> bool {
        !self.api_key.is_empty()
    }

    /// Prefix match on whole path segments: `/admin` covers `/admin/x`, not `/administrators`
    pub fn is_excluded(&self, path: &str) -> bool {
        self.excluded_paths.iter().any(|prefix| {
            match path.strip_prefix(prefix.trim_end_matches('/')) {
                Some(rest) => rest.is_empty() || rest.starts_with('/'),
                None => false,
            }
        })
    }
}

// ============================================================================
// VALUE HELPERS
// ============================================================================

/// Lenient boolean: yes / true / 1 / on
pub fn parse_flag(raw: &str) -> bool {
    matches!(
        raw.trim().to_lowercase().as_str(),
        "yes" | "true" | "1" | "on"
    )
}

fn bool_str(value: bool) -> &'static str {
    if value {
        "true"
    } else {
        "false"
    }
}

/// Clean an operator-supplied rule list
///
/// Accepts a JSON array; non-string items and blank entries are dropped,
/// the rest trimmed. Anything that is not a JSON array yields an empty list.
pub fn sanitize_rule_list(raw: &str) -> Vec<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Vec::new();
    }

    match serde_json::from_str::<serde_json::Value>(trimmed) {
        Ok(serde_json::Value::Array(items)) => items
            .iter()
            .filter_map(|item| item.as_str())
            .map(str::trim)
            .filter(|rule| !rule.is_empty())
            .map(str::to_string)
            .collect(),
        Ok(_) | Err(_) => {
            log::warn!("Ignoring malformed rule list: {}", trimmed);
            Vec::new()
        }
    }
}

/// Store a rule list in canonical JSON form
pub fn write_rule_list(store: &dyn ConfigStore, key: &str, rules: &[String]) {
    let cleaned: Vec<&str> = rules
        .iter()
        .map(|r| r.trim())
        .filter(|r| !r.is_empty())
        .collect();
    let json = serde_json::to_string(&cleaned).unwrap_or_else(|_| "[]".to_string());
    store.set(key, &json);
}

fn parse_path_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .map(str::to_string)
        .collect()
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_flag_variants() {
        for yes in ["yes", "TRUE", " 1 ", "on"] {
            assert!(parse_flag(yes), "{}", yes);
        }
        for no in ["no", "false", "0", "", "enabled"] {
            assert!(!parse_flag(no), "{}", no);
        }
    }

    #[test]
    fn test_sanitize_rule_list() {
        let raw = r#"[" category:AI Crawler ", "", 42, "   ", "pattern:GPTBot", null]"#;
        assert_eq!(
            sanitize_rule_list(raw),
            vec!["category:AI Crawler".to_string(), "pattern:GPTBot".to_string()]
        );
    }

    #[test]
    fn test_sanitize_invalid_json_is_empty() {
        assert!(sanitize_rule_list("category:AI Crawler").is_empty());
        assert!(sanitize_rule_list(r#"{"a":1}"#).is_empty());
        assert!(sanitize_rule_list("").is_empty());
    }

    #[test]
    fn test_settings_read_from_store() {
        let store = MemoryConfigStore::with_values([
            (keys::API_KEY, " key-123 "),
            (keys::DEBUG_MODE, "yes"),
            (keys::BLOCK_AI_MODEL_TRAINERS, "on"),
            (keys::CUSTOM_BLOCKS, r#"["category:AI Crawler", "bogus"]"#),
            (keys::CUSTOM_ALLOWS, r#"["pattern:Claude-SearchBot"]"#),
            (keys::EXCLUDED_PATHS, "/admin, /ajax,,"),
            (keys::LAST_PATTERN_SYNC, "1700000000"),
        ]);

        let settings = ShieldSettings::read(&store);
        assert_eq!(settings.api_key, "key-123");
        assert!(settings.debug_mode);
        assert!(settings.auto_sync);
        assert!(settings.local_policy.block_ai_model_trainers);
        assert_eq!(
            settings.local_policy.custom_blocks,
            vec![RuleRef::Category("AI Crawler".into())]
        );
        assert_eq!(settings.local_policy.custom_allows.len(), 1);
        assert_eq!(settings.excluded_paths, vec!["/admin", "/ajax"]);
        assert_eq!(settings.last_pattern_sync, Some(1_700_000_000));
    }

    #[test]
    fn test_empty_store_is_inert() {
        let settings = ShieldSettings::read(&MemoryConfigStore::new());
        assert!(!settings.has_api_key());
        assert!(settings.local_policy.is_empty());
        assert!(!settings.is_excluded("/anything"));
    }

    #[test]
    fn test_excluded_prefix() {
        let settings = ShieldSettings {
            excluded_paths: vec!["/wp-admin".into()],
            ..Default::default()
        };
        assert!(settings.is_excluded("/wp-admin/options.php"));
        assert!(settings.is_excluded("/wp-admin"));
        assert!(!settings.is_excluded("/blog/wp-admin"));
        assert!(!settings.is_excluded("/wp-administrators-guide"));
    }

    #[test]
    fn test_excluded_prefix_with_trailing_slash() {
        let settings = ShieldSettings {
            excluded_paths: vec!["/admin/".into()],
            ..Default::default()
        };
        assert!(settings.is_excluded("/admin"));
        assert!(settings.is_excluded("/admin/users"));
        assert!(!settings.is_excluded("/administrators-guide"));
    }

    #[test]
    fn test_auto_sync_key_absent_or_switched_off() {
        let only_key = MemoryConfigStore::with_values([(keys::API_KEY, "k")]);
        assert!(ShieldSettings::read(&only_key).auto_sync);

        for off in ["no", "off", "false"] {
            let store = MemoryConfigStore::with_values([(keys::AUTO_SYNC_PATTERNS, off)]);
            assert!(!ShieldSettings::read(&store).auto_sync, "{}", off);
        }
    }

    #[test]
    fn test_write_rule_list_round_trips_through_sanitize() {
        let store = MemoryConfigStore::new();
        write_rule_list(&store, keys::CUSTOM_BLOCKS, &[" category:AI Agent ".into(), "".into()]);
        let raw = store.get(keys::CUSTOM_BLOCKS).unwrap();
        assert_eq!(raw, r#"["category:AI Agent"]"#);
        assert_eq!(sanitize_rule_list(&raw), vec!["category:AI Agent"]);
    }
}
