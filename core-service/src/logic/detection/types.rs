//! Detection Types
//!
//! Output of the classifier. No logic beyond small accessors.

use serde::{Deserialize, Serialize};

use crate::logic::catalog::{AgentSignature, ReferrerSignature};

/// Which signals matched
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MatchKind {
    None,
    Agent,
    Referrer,
    /// Bot user agent that also carries an AI platform referrer
    Both,
}

impl MatchKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            MatchKind::None => "none",
            MatchKind::Agent => "agent",
            MatchKind::Referrer => "referrer",
            MatchKind::Both => "both",
        }
    }
}

/// At most one agent match and at most one referrer match
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassificationResult {
    pub agent_match: Option<AgentSignature>,
    pub referrer_match: Option<ReferrerSignature>,
}

impl ClassificationResult {
    pub fn kind(&self) -> MatchKind {
        match (&self.agent_match, &self.referrer_match) {
            (None, None) => MatchKind::None,
            (Some(_), None) => MatchKind::Agent,
            (None, Some(_)) => MatchKind::Referrer,
            (Some(_), Some(_)) => MatchKind::Both,
        }
    }

    pub fn is_classified(&self) -> bool {
        self.agent_match.is_some() || self.referrer_match.is_some()
    }
}
