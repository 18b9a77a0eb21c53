//! Catalog Types
//!
//! Agent and referrer signatures, platform policy, and the immutable
//! `PatternCatalog` snapshot built from them.

use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, Utc};
use regex::{Regex, RegexBuilder};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use super::error::CatalogError;
use super::rule_ref::RuleRef;
use crate::constants::MAX_PATTERN_SIZE_BYTES;

// ============================================================================
// AGENT SIGNATURE
// ============================================================================

fn default_type() -> String {
    "unknown".to_string()
}

fn default_category() -> String {
    "Unknown".to_string()
}

fn default_subcategory() -> String {
    "Unclassified".to_string()
}

fn default_intent() -> String {
    "unknown".to_string()
}

/// Regex-identified bot / AI agent fingerprint
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentSignature {
    pub pattern: String,
    #[serde(rename = "type", default = "default_type")]
    pub agent_type: String,
    #[serde(default = "default_category")]
    pub category: String,
    #[serde(default = "default_subcategory")]
    pub subcategory: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub company: Option<String>,
    #[serde(default)]
    pub is_compliant: bool,
    #[serde(default = "default_intent")]
    pub intent: String,
    #[serde(default)]
    pub is_ai_model_trainer: bool,
    #[serde(default)]
    pub is_ai_visitor: bool,
    #[serde(default)]
    pub is_crawler: bool,
    #[serde(rename = "url", default, skip_serializing_if = "Option::is_none")]
    pub reference_url: Option<String>,
}

// ============================================================================
// REFERRER SIGNATURE
// ============================================================================

/// AI platform whose outbound links bring human visitors
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReferrerSignature {
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub company: Option<String>,
    #[serde(default)]
    pub patterns: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub logo_url: Option<String>,
}

// ============================================================================
// PLATFORM POLICY
// ============================================================================

/// Blocking configuration shipped with the catalog (and merged with local rules)
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlatformPolicy {
    pub block_ai_model_trainers: bool,
    pub custom_blocks: BTreeSet<RuleRef>,
    pub custom_allows: BTreeSet<RuleRef>,
}

impl PlatformPolicy {
    pub fn is_empty(&self) -> bool {
        !self.block_ai_model_trainers && self.custom_blocks.is_empty() && self.custom_allows.is_empty()
    }
}

/// `propertySettings` as it arrives on the wire
///
/// Rule lists stay as raw strings here so that one malformed entry cannot
/// reject an otherwise good catalog.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PropertySettings {
    #[serde(default)]
    pub block_ai_model_trainers: bool,
    #[serde(default)]
    pub custom_blocks: Vec<String>,
    #[serde(default)]
    pub custom_allows: Vec<String>,
}

impl PropertySettings {
    pub fn to_policy(&self) -> PlatformPolicy {
        PlatformPolicy {
            block_ai_model_trainers: self.block_ai_model_trainers,
            custom_blocks: RuleRef::parse_all(self.custom_blocks.iter().map(String::as_str))
                .into_iter()
                .collect(),
            custom_allows: RuleRef::parse_all(self.custom_allows.iter().map(String::as_str))
                .into_iter()
                .collect(),
        }
    }
}

// ============================================================================
// CATALOG PAYLOAD (wire format)
// ============================================================================

fn default_version() -> String {
    "unknown".to_string()
}

/// JSON body served by the patterns endpoint and stored in cache / fallback file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalogPayload {
    #[serde(default = "default_version")]
    pub version: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub patterns: Option<Vec<AgentSignature>>,
    #[serde(default)]
    pub ai_referrers: Vec<ReferrerSignature>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub property_settings: Option<PropertySettings>,
}

impl CatalogPayload {
    pub fn from_json(body: &str) -> Result<Self, CatalogError> {
        serde_json::from_str(body).map_err(|e| CatalogError::Parse(e.to_string()))
    }

    pub fn to_json(&self) -> Result<String, CatalogError> {
        serde_json::to_string(self).map_err(|e| CatalogError::Parse(e.to_string()))
    }
}

// ============================================================================
// CATALOG ORIGIN
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CatalogOrigin {
    /// Compiled-in minimal agent set
    BuiltIn,
    /// Local fallback JSON file
    LocalFile,
    /// Cached snapshot of an earlier refresh
    Cache,
    /// Fresh from the patterns endpoint
    Remote,
}

impl CatalogOrigin {
    pub fn as_str(&self) -> &'static str {
        match self {
            CatalogOrigin::BuiltIn => "built_in",
            CatalogOrigin::LocalFile => "local_file",
            CatalogOrigin::Cache => "cache",
            CatalogOrigin::Remote => "remote",
        }
    }
}

impl std::fmt::Display for CatalogOrigin {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ============================================================================
// PATTERN CATALOG
// ============================================================================

/// Immutable, fully validated catalog snapshot
///
/// Construction is the only way in: an empty agent list is rejected, and
/// every pattern is compiled up front. A pattern that fails to compile is
/// logged and kept as a signature that never matches.
#[derive(Debug)]
pub struct PatternCatalog {
    version: String,
    agents: Vec<AgentSignature>,
    agent_matchers: Vec<Option<Regex>>,
    referrers: Vec<ReferrerSignature>,
    referrer_matchers: Vec<Vec<Option<Regex>>>,
    property_settings: Option<PropertySettings>,
    policy: Option<PlatformPolicy>,
    loaded_at: DateTime<Utc>,
    origin: CatalogOrigin,
    fingerprint: String,
}

impl PatternCatalog {
    /// Validate and compile a payload into a catalog
    pub fn from_payload(payload: CatalogPayload, origin: CatalogOrigin) -> Result<Self, CatalogError> {
        let fingerprint = fingerprint_of(&payload)?;

        let agents = match payload.patterns {
            None => return Err(CatalogError::MissingPatterns),
            Some(agents) if agents.is_empty() => return Err(CatalogError::EmptyPatterns),
            Some(agents) => agents,
        };

        let agent_matchers = agents.iter().map(|a| compile_pattern(&a.pattern)).collect();
        let referrer_matchers = payload
            .ai_referrers
            .iter()
            .map(|r| r.patterns.iter().map(|p| compile_pattern(p)).collect())
            .collect();
        let policy = payload.property_settings.as_ref().map(PropertySettings::to_policy);

        Ok(Self {
            version: payload.version,
            agents,
            agent_matchers,
            referrers: payload.ai_referrers,
            referrer_matchers,
            property_settings: payload.property_settings,
            policy,
            loaded_at: Utc::now(),
            origin,
            fingerprint,
        })
    }

    /// Parse JSON text and build a catalog
    pub fn from_json(body: &str, origin: CatalogOrigin) -> Result<Self, CatalogError> {
        Self::from_payload(CatalogPayload::from_json(body)?, origin)
    }

    /// Back to wire form (for cache snapshots)
    pub fn to_payload(&self) -> CatalogPayload {
        CatalogPayload {
            version: self.version.clone(),
            patterns: Some(self.agents.clone()),
            ai_referrers: self.referrers.clone(),
            property_settings: self.property_settings.clone(),
        }
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    pub fn agents(&self) -> &[AgentSignature] {
        &self.agents
    }

    pub fn referrers(&self) -> &[ReferrerSignature] {
        &self.referrers
    }

    /// Central settings as served, rule strings in their original order
    pub fn property_settings(&self) -> Option<&PropertySettings> {
        self.property_settings.as_ref()
    }

    /// Central policy, `None` when the catalog carried no property settings
    pub fn policy(&self) -> Option<&PlatformPolicy> {
        self.policy.as_ref()
    }

    pub fn loaded_at(&self) -> DateTime<Utc> {
        self.loaded_at
    }

    pub fn origin(&self) -> CatalogOrigin {
        self.origin
    }

    /// SHA-256 over the canonical payload JSON
    pub fn fingerprint(&self) -> &str {
        &self.fingerprint
    }

    /// Agents paired with their compiled matcher (`None` = faulty pattern)
    pub fn agent_entries(&self) -> impl Iterator<Item = (&AgentSignature, Option<&Regex>)> {
        self.agents
            .iter()
            .zip(self.agent_matchers.iter().map(Option::as_ref))
    }

    /// Referrers paired with their compiled matchers, in pattern order
    pub fn referrer_entries(&self) -> impl Iterator<Item = (&ReferrerSignature, &[Option<Regex>])> {
        self.referrers
            .iter()
            .zip(self.referrer_matchers.iter().map(Vec::as_slice))
    }

    /// Number of signatures whose pattern failed to compile
    pub fn faulty_patterns(&self) -> usize {
        let agents = self.agent_matchers.iter().filter(|m| m.is_none()).count();
        let referrers = self
            .referrer_matchers
            .iter()
            .flatten()
            .filter(|m| m.is_none())
            .count();
        agents + referrers
    }

    /// Agent count per category
    pub fn category_counts(&self) -> BTreeMap<String, usize> {
        let mut counts = BTreeMap::new();
        for agent in &self.agents {
            *counts.entry(agent.category.clone()).or_insert(0) += 1;
        }
        counts
    }
}

// ============================================================================
// HELPERS
// ============================================================================

/// Compile one untrusted pattern, case-insensitive, bounded size
pub(crate) fn compile_pattern(pattern: &str) -> Option<Regex> {
    match RegexBuilder::new(pattern)
        .case_insensitive(true)
        .size_limit(MAX_PATTERN_SIZE_BYTES)
        .build()
    {
        Ok(re) => Some(re),
        Err(e) => {
            log::warn!("Skipping faulty signature pattern '{}': {}", pattern, e);
            None
        }
    }
}

fn fingerprint_of(payload: &CatalogPayload) -> Result<String, CatalogError> {
    let canonical = serde_json::to_vec(payload).map_err(|e| CatalogError::Parse(e.to_string()))?;
    Ok(hex::encode(Sha256::digest(&canonical)))
}

// ============================================================================
// TESTS
// ============================================================================
