//! Telemetry Event
//!
//! Wire record POSTed to the collector, one per classified request.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::logic::catalog::{AgentSignature, ReferrerSignature};
use crate::logic::detection::ClassificationResult;
use crate::logic::filter::RequestContext;
use crate::logic::policy::Verdict;

/// Fixed confidence reported for a regex match
pub const PATTERN_MATCH_CONFIDENCE: f64 = 0.9;

pub const DETECTION_METHOD: &str = "pattern_match";

// ============================================================================
// SOURCE TYPE
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceType {
    /// User agent matched (possibly with a referrer too)
    Bot,
    /// Only the referrer matched
    AiReferrer,
}

// ============================================================================
// METADATA
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentMetadata {
    pub agent_type: String,
    pub agent_category: String,
    pub agent_subcategory: String,
    pub company: Option<String>,
    pub is_compliant: bool,
    pub intent: String,
    pub confidence: f64,
    pub detection_method: String,
    pub is_ai_model_trainer: bool,
    pub is_ai_visitor: bool,
    pub is_crawler: bool,
}

impl From<&AgentSignature> for AgentMetadata {
    fn from(agent: &AgentSignature) -> Self {
        Self {
            agent_type: agent.agent_type.clone(),
            agent_category: agent.category.clone(),
            agent_subcategory: agent.subcategory.clone(),
            company: agent.company.clone(),
            is_compliant: agent.is_compliant,
            intent: agent.intent.clone(),
            confidence: PATTERN_MATCH_CONFIDENCE,
            detection_method: DETECTION_METHOD.to_string(),
            is_ai_model_trainer: agent.is_ai_model_trainer,
            is_ai_visitor: agent.is_ai_visitor,
            is_crawler: agent.is_crawler,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReferrerMetadata {
    pub referrer_id: String,
    pub referrer_name: String,
    pub referrer_company: Option<String>,
}

impl From<&ReferrerSignature> for ReferrerMetadata {
    fn from(referrer: &ReferrerSignature) -> Self {
        Self {
            referrer_id: referrer.id.clone(),
            referrer_name: referrer.name.clone(),
            referrer_company: referrer.company.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventMetadata {
    pub request_id: String,
    pub source_type: SourceType,
    #[serde(flatten)]
    pub agent: Option<AgentMetadata>,
    #[serde(flatten)]
    pub referrer: Option<ReferrerMetadata>,
    pub blocked: bool,
    /// Rendered `DecisiveRule`, absent for referrer-only events
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub decisive_rule: Option<String>,
}

// ============================================================================
// EVENT
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TelemetryEvent {
    pub url: String,
    pub user_agent: String,
    pub ip_address: String,
    pub request_method: String,
    pub request_path: String,
    pub request_query: String,
    /// Request bodies are never inspected
    pub request_body: String,
    pub response_status: u16,
    pub response_time_ms: f64,
    pub headers: BTreeMap<String, String>,
    pub timestamp: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub referrer: Option<String>,
    pub metadata: EventMetadata,
}

impl TelemetryEvent {
    /// Build the event for a classified request
    ///
    /// `None` when nothing matched; unclassified traffic is never reported.
    /// The reported status is 403 for a block and 200 otherwise, since the
    /// event is built before enforcement.
    pub fn build(
        ctx: &RequestContext,
        classification: &ClassificationResult,
        verdict: Option<&Verdict>,
        elapsed_ms: f64,
        now: DateTime<Utc>,
    ) -> Option<Self> {
        if !classification.is_classified() {
            return None;
        }

        let blocked = verdict.map(Verdict::is_block).unwrap_or(false);
        let source_type = if classification.agent_match.is_some() {
            SourceType::Bot
        } else {
            SourceType::AiReferrer
        };
        let referrer = Some(ctx.referrer()).filter(|r| !r.is_empty()).map(str::to_string);

        Some(Self {
            url: ctx.url(),
            user_agent: ctx.user_agent().to_string(),
            ip_address: ctx.client_ip(),
            request_method: ctx.method.clone(),
            request_path: ctx.request_uri(),
            request_query: ctx.query.clone(),
            request_body: String::new(),
            response_status: if blocked { 403 } else { 200 },
            response_time_ms: elapsed_ms,
            headers: ctx.telemetry_headers(),
            timestamp: format_timestamp(now),
            referrer,
            metadata: EventMetadata {
                request_id: Uuid::new_v4().to_string(),
                source_type,
                agent: classification.agent_match.as_ref().map(AgentMetadata::from),
                referrer: classification.referrer_match.as_ref().map(ReferrerMetadata::from),
                blocked,
                decisive_rule: verdict.map(|v| v.rule.to_string()),
            },
        })
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

/// UTC, second precision, `Z` suffix
pub fn format_timestamp(at: DateTime<Utc>) -> String {
    at.format("%Y-%m-%dT%H:%M:%SZ").to_string()
}
