//! Policy Configuration
//!
//! Operator rules kept in the local config store, and the merge with the
//! central policy that ships inside the catalog. Read once per request so
//! operator edits apply without a restart.

use std::borrow::Cow;

use serde::{Deserialize, Serialize};

use crate::logic::catalog::{PlatformPolicy, RuleRef};

// ============================================================================
// LOCAL POLICY
// ============================================================================

/// Rules configured on this site (as opposed to centrally)
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocalPolicy {
    pub block_ai_model_trainers: bool,
    pub custom_blocks: Vec<RuleRef>,
    pub custom_allows: Vec<RuleRef>,
}

impl LocalPolicy {
    pub fn is_empty(&self) -> bool {
        !self.block_ai_model_trainers && self.custom_blocks.is_empty() && self.custom_allows.is_empty()
    }
}

// ============================================================================
// EFFECTIVE POLICY
// ============================================================================

/// Per-request policy snapshot
///
/// Union of allow lists, union of block lists, trainer flag OR-ed. `None`
/// when neither side configures anything, which resolves every agent to
/// Allow.
pub fn effective_policy<'a>(
    central: Option<&'a PlatformPolicy>,
    local: &LocalPolicy,
) -> Option<Cow<'a, PlatformPolicy>> {
    match central {
        None if local.is_empty() => None,
        Some(central) if local.is_empty() => Some(Cow::Borrowed(central)),
        central => {
            let mut merged = central.cloned().unwrap_or_default();
            merged.block_ai_model_trainers |= local.block_ai_model_trainers;
            merged.custom_blocks.extend(local.custom_blocks.iter().cloned());
            merged.custom_allows.extend(local.custom_allows.iter().cloned());
            Some(Cow::Owned(merged))
        }
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn central() -> PlatformPolicy {
        PlatformPolicy {
            block_ai_model_trainers: false,
            custom_blocks: [RuleRef::Category("AI Crawler".into())].into_iter().collect(),
            custom_allows: Default::default(),
        }
    }

    #[test]
    fn test_nothing_configured_is_absent() {
        assert!(effective_policy(None, &LocalPolicy::default()).is_none());
    }

    #[test]
    fn test_central_only_is_borrowed() {
        let c = central();
        let merged = effective_policy(Some(&c), &LocalPolicy::default()).unwrap();
        assert!(matches!(merged, Cow::Borrowed(_)));
    }

    #[test]
    fn test_local_rules_are_merged() {
        let c = central();
        let local = LocalPolicy {
            block_ai_model_trainers: true,
            custom_blocks: vec![RuleRef::Pattern("Bytespider".into())],
            custom_allows: vec![RuleRef::Pattern("Claude-SearchBot".into())],
        };
        let merged = effective_policy(Some(&c), &local).unwrap();
        assert!(merged.block_ai_model_trainers);
        assert_eq!(merged.custom_blocks.len(), 2);
        assert_eq!(merged.custom_allows.len(), 1);
    }

    #[test]
    fn test_local_only_policy() {
        let local = LocalPolicy {
            custom_blocks: vec![RuleRef::Category("AI Agent".into())],
            ..Default::default()
        };
        let merged = effective_policy(None, &local).unwrap();
        assert!(!merged.block_ai_model_trainers);
        assert_eq!(merged.custom_blocks.len(), 1);
    }
}
