//! Request Classifier
//!
//! Matching only - no policy, no I/O.
//! Input: User-Agent, Referer, PatternCatalog
//! Output: ClassificationResult
//!
//! Declaration order is the only ranking: the first agent signature that
//! matches wins, and the first referrer pattern that matches wins.

use crate::logic::catalog::{AgentSignature, PatternCatalog, ReferrerSignature};

use super::types::ClassificationResult;

// ============================================================================
// MAIN CLASSIFICATION FUNCTION
// ============================================================================

/// Classify one request
///
/// Agent and referrer matching are independent; a request may yield both.
pub fn classify(user_agent: &str, referrer: &str, catalog: &PatternCatalog) -> ClassificationResult {
    if user_agent.is_empty() && referrer.is_empty() {
        return ClassificationResult::default();
    }

    ClassificationResult {
        agent_match: match_agent(user_agent, catalog).cloned(),
        referrer_match: match_referrer(referrer, catalog).cloned(),
    }
}

/// First agent signature whose pattern occurs in `user_agent`
pub fn match_agent<'a>(user_agent: &str, catalog: &'a PatternCatalog) -> Option<&'a AgentSignature> {
    if user_agent.is_empty() {
        return None;
    }

    // Faulty patterns compiled to `None` and are simply passed over
    catalog
        .agent_entries()
        .find_map(|(agent, matcher)| match matcher {
            Some(re) if re.is_match(user_agent) => Some(agent),
            _ => None,
        })
}

/// First AI referrer with any pattern occurring in `referrer`
pub fn match_referrer<'a>(referrer: &str, catalog: &'a PatternCatalog) -> Option<&'a ReferrerSignature> {
    if referrer.is_empty() {
        return None;
    }

    for (signature, matchers) in catalog.referrer_entries() {
        for matcher in matchers.iter().flatten() {
            if matcher.is_match(referrer) {
                return Some(signature);
            }
        }
    }
    None
}

// ============================================================================
// TESTS
// ============================================================================
