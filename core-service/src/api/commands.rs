//! Operator Commands
//!
//! Management operations behind the edge server's operator routes and the
//! `shield-sync` CLI. Errors come back as display strings for the caller to
//! show as-is.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::logic::catalog::RuleRef;
use crate::logic::config::{self, keys, ShieldSettings};
use crate::logic::pattern_sync::{SyncReport, SyncStatus};
use crate::logic::telemetry::EmitterStats;
use crate::shield::AgentShield;

/// Sample rules shown per list in the settings summary
pub const SAMPLE_RULES: usize = 3;

// ============================================================================
// DATA STRUCTURES
// ============================================================================

#[derive(Debug, Clone, Serialize)]
pub struct PatternStatistics {
    pub total: usize,
    pub categories: BTreeMap<String, usize>,
    pub ai_referrers: usize,
    pub faulty_patterns: usize,
    pub version: String,
    pub origin: String,
    pub fingerprint: String,
    pub loaded_at: String,
    /// Unix seconds, `None` if never synced
    pub last_sync: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CentralSettingsSummary {
    /// False until a catalog carrying central settings has been synced
    pub available: bool,
    pub block_ai_model_trainers: bool,
    pub block_count: usize,
    pub allow_count: usize,
    pub sample_blocks: Vec<String>,
    pub sample_allows: Vec<String>,
    pub ai_referrer_count: usize,
}

/// Partial update of the local rule lists; absent fields are left alone
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RuleUpdate {
    pub custom_blocks: Option<Vec<String>>,
    pub custom_allows: Option<Vec<String>>,
    pub block_ai_model_trainers: Option<bool>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LocalRules {
    pub block_ai_model_trainers: bool,
    pub custom_blocks: Vec<String>,
    pub custom_allows: Vec<String>,
}

// ============================================================================
// COMMANDS
// ============================================================================

/// Manual sync
pub fn sync_patterns(shield: &AgentShield) -> Result<SyncReport, String> {
    let settings = ShieldSettings::read(shield.config().as_ref());
    if !settings.has_api_key() {
        return Err("API key is required for syncing patterns.".to_string());
    }

    shield
        .sync()
        .sync_now()
        .map_err(|e| format!("Failed to sync agent patterns: {}", e))
}

pub fn get_pattern_statistics(shield: &AgentShield) -> PatternStatistics {
    let catalog = shield.catalog().current();
    let settings = ShieldSettings::read(shield.config().as_ref());

    PatternStatistics {
        total: catalog.agents().len(),
        categories: catalog.category_counts(),
        ai_referrers: catalog.referrers().len(),
        faulty_patterns: catalog.faulty_patterns(),
        version: catalog.version().to_string(),
        origin: catalog.origin().to_string(),
        fingerprint: catalog.fingerprint().to_string(),
        loaded_at: catalog.loaded_at().to_rfc3339(),
        last_sync: settings.last_pattern_sync,
    }
}

pub fn get_central_settings(shield: &AgentShield) -> CentralSettingsSummary {
    let catalog = shield.catalog().current();
    let sample = |rules: &[String]| -> Vec<String> { rules.iter().take(SAMPLE_RULES).cloned().collect() };

    match catalog.property_settings() {
        Some(central) => CentralSettingsSummary {
            available: true,
            block_ai_model_trainers: central.block_ai_model_trainers,
            block_count: central.custom_blocks.len(),
            allow_count: central.custom_allows.len(),
            sample_blocks: sample(&central.custom_blocks),
            sample_allows: sample(&central.custom_allows),
            ai_referrer_count: catalog.referrers().len(),
        },
        None => CentralSettingsSummary {
            available: false,
            block_ai_model_trainers: false,
            block_count: 0,
            allow_count: 0,
            sample_blocks: Vec::new(),
            sample_allows: Vec::new(),
            ai_referrer_count: catalog.referrers().len(),
        },
    }
}

pub fn get_local_rules(shield: &AgentShield) -> LocalRules {
    let settings = ShieldSettings::read(shield.config().as_ref());
    let render = |rules: &[RuleRef]| -> Vec<String> { rules.iter().map(RuleRef::to_string).collect() };

    LocalRules {
        block_ai_model_trainers: settings.local_policy.block_ai_model_trainers,
        custom_blocks: render(&settings.local_policy.custom_blocks),
        custom_allows: render(&settings.local_policy.custom_allows),
    }
}

/// Replace local rule lists; every rule must parse or nothing is written
pub fn update_custom_rules(shield: &AgentShield, update: RuleUpdate) -> Result<LocalRules, String> {
    for rule in update
        .custom_blocks
        .iter()
        .chain(update.custom_allows.iter())
        .flatten()
        .map(|r| r.trim())
        .filter(|r| !r.is_empty())
    {
        RuleRef::parse(rule).map_err(|e| format!("Invalid rule '{}': {}", rule, e))?;
    }

    let store = shield.config().as_ref();
    if let Some(blocks) = &update.custom_blocks {
        config::write_rule_list(store, keys::CUSTOM_BLOCKS, blocks);
    }
    if let Some(allows) = &update.custom_allows {
        config::write_rule_list(store, keys::CUSTOM_ALLOWS, allows);
    }
    if let Some(flag) = update.block_ai_model_trainers {
        store.set(keys::BLOCK_AI_MODEL_TRAINERS, if flag { "yes" } else { "no" });
    }

    log::info!("Local blocking rules updated");
    Ok(get_local_rules(shield))
}

/// Deactivation: forget the cached catalog
pub fn clear_pattern_cache(shield: &AgentShield) -> Result<(), String> {
    shield.sync().clear_cache().map_err(|e| e.to_string())
}

pub fn get_sync_status(shield: &AgentShield) -> SyncStatus {
    shield.sync().status()
}

pub fn get_telemetry_stats(shield: &AgentShield) -> EmitterStats {
    shield.emitter().stats()
}

// ============================================================================
// TESTS
// ============================================================================
