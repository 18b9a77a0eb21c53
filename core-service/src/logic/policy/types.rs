//! Policy Types
//!
//! Core types for policy decisions.
//! No logic here - only data structures.

use serde::{Deserialize, Serialize};

use crate::logic::catalog::RuleRef;

// ============================================================================
// DECISION
// ============================================================================

/// Allow or block a matched agent
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Decision {
    Allow,
    Block,
}

impl Decision {
    pub fn as_str(&self) -> &'static str {
        match self {
            Decision::Allow => "allow",
            Decision::Block => "block",
        }
    }

    pub fn is_block(&self) -> bool {
        matches!(self, Decision::Block)
    }
}

impl std::fmt::Display for Decision {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ============================================================================
// DECISIVE RULE
// ============================================================================

/// The rule that produced a verdict (kept for audit / telemetry)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "rule", rename_all = "snake_case")]
pub enum DecisiveRule {
    /// Matched an entry of `customAllows`
    CustomAllow(RuleRef),
    /// Matched an entry of `customBlocks`
    CustomBlock(RuleRef),
    /// Global "block AI model trainers" switch
    BlockAiModelTrainers,
    /// Nothing applied; default-open
    Default,
}

impl DecisiveRule {
    pub fn rule_ref(&self) -> Option<&RuleRef> {
        match self {
            DecisiveRule::CustomAllow(rule) | DecisiveRule::CustomBlock(rule) => Some(rule),
            DecisiveRule::BlockAiModelTrainers | DecisiveRule::Default => None,
        }
    }
}

impl std::fmt::Display for DecisiveRule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DecisiveRule::CustomAllow(rule) => write!(f, "allow:{}", rule),
            DecisiveRule::CustomBlock(rule) => write!(f, "block:{}", rule),
            DecisiveRule::BlockAiModelTrainers => write!(f, "block_ai_model_trainers"),
            DecisiveRule::Default => write!(f, "default"),
        }
    }
}

// ============================================================================
// VERDICT
// ============================================================================

/// Policy outcome for one matched agent
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Verdict {
    pub decision: Decision,
    pub rule: DecisiveRule,
}

impl Verdict {
    pub fn allow(rule: DecisiveRule) -> Self {
        Self {
            decision: Decision::Allow,
            rule,
        }
    }

    pub fn block(rule: DecisiveRule) -> Self {
        Self {
            decision: Decision::Block,
            rule,
        }
    }

    pub fn is_block(&self) -> bool {
        self.decision.is_block()
    }
}

impl Default for Verdict {
    fn default() -> Self {
        Self::allow(DecisiveRule::Default)
    }
}
