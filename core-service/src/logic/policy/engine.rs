//! Policy Engine
//!
//! Decision logic only - no type definitions.
//! Input: AgentSignature + PlatformPolicy snapshot
//! Output: Verdict
//!
//! Precedence, first applicable wins:
//! 1. `pattern:` allow
//! 2. ancestor allow (type, subcategory, category)
//! 3. `pattern:` block
//! 4. ancestor block (type, subcategory, category)
//! 5. `blockAiModelTrainers` and the agent trains models
//! 6. allow
//!
//! Every allow check runs before any block check, so a category-level allow
//! still beats a pattern-level block.

use std::collections::BTreeSet;

use crate::logic::catalog::{AgentSignature, PlatformPolicy, RuleRef};

use super::types::{DecisiveRule, Verdict};

// ============================================================================
// MAIN DECISION FUNCTION
// ============================================================================

/// Resolve a verdict for a matched agent
///
/// Pure: same inputs, same verdict. Absent policy always allows.
pub fn resolve(agent: &AgentSignature, policy: Option<&PlatformPolicy>) -> Verdict {
    let policy = match policy {
        Some(policy) => policy,
        None => return Verdict::default(),
    };

    if let Some(rule) = first_listed(agent, &policy.custom_allows) {
        return Verdict::allow(DecisiveRule::CustomAllow(rule));
    }

    if let Some(rule) = first_listed(agent, &policy.custom_blocks) {
        return Verdict::block(DecisiveRule::CustomBlock(rule));
    }

    if policy.block_ai_model_trainers && agent.is_ai_model_trainer {
        return Verdict::block(DecisiveRule::BlockAiModelTrainers);
    }

    Verdict::default()
}

/// Most specific rule naming this agent: pattern, then type, subcategory, category
fn first_listed(agent: &AgentSignature, rules: &BTreeSet<RuleRef>) -> Option<RuleRef> {
    if rules.is_empty() {
        return None;
    }

    let pattern = RuleRef::pattern_of(agent);
    if rules.contains(&pattern) {
        return Some(pattern);
    }

    RuleRef::ancestors_of(agent)
        .into_iter()
        .find(|ancestor| rules.contains(ancestor))
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logic::policy::Decision;

    fn search_bot() -> AgentSignature {
        AgentSignature {
            pattern: "Claude-SearchBot\\/[0-9]".to_string(),
            agent_type: "claude-searchbot".to_string(),
            category: "AI Crawler".to_string(),
            subcategory: "Search Enhancement Crawlers".to_string(),
            company: Some("Anthropic".to_string()),
            is_compliant: true,
            intent: "Search".to_string(),
            is_ai_model_trainer: false,
            is_ai_visitor: false,
            is_crawler: true,
            reference_url: None,
        }
    }

    fn trainer() -> AgentSignature {
        AgentSignature {
            pattern: "GPTBot\\/[0-9]".to_string(),
            agent_type: "gptbot".to_string(),
            subcategory: "Model Training Crawlers".to_string(),
            is_ai_model_trainer: true,
            ..search_bot()
        }
    }

    fn rules(raw: &[&str]) -> BTreeSet<RuleRef> {
        raw.iter().map(|r| RuleRef::parse(r).unwrap()).collect()
    }

    fn policy(blocks: &[&str], allows: &[&str], block_trainers: bool) -> PlatformPolicy {
        PlatformPolicy {
            block_ai_model_trainers: block_trainers,
            custom_blocks: rules(blocks),
            custom_allows: rules(allows),
        }
    }

    #[test]
    fn test_absent_policy_allows() {
        let verdict = resolve(&trainer(), None);
        assert_eq!(verdict, Verdict::allow(DecisiveRule::Default));
    }

    #[test]
    fn test_scenario_a_trainer_allowed_without_flag() {
        let verdict = resolve(&trainer(), Some(&policy(&[], &[], false)));
        assert_eq!(verdict.decision, Decision::Allow);
        assert_eq!(verdict.rule, DecisiveRule::Default);
    }

    #[test]
    fn test_scenario_b_trainer_blocked_by_flag() {
        let verdict = resolve(&trainer(), Some(&policy(&[], &[], true)));
        assert_eq!(verdict, Verdict::block(DecisiveRule::BlockAiModelTrainers));
    }

    #[test]
    fn test_flag_ignores_non_trainers() {
        let verdict = resolve(&search_bot(), Some(&policy(&[], &[], true)));
        assert_eq!(verdict.decision, Decision::Allow);
    }

    #[test]
    fn test_scenario_c_category_block() {
        let verdict = resolve(&search_bot(), Some(&policy(&["category:AI Crawler"], &[], false)));
        assert_eq!(
            verdict,
            Verdict::block(DecisiveRule::CustomBlock(RuleRef::Category("AI Crawler".into())))
        );
    }

    #[test]
    fn test_scenario_d_pattern_allow_beats_category_block() {
        let p = policy(
            &["category:AI Crawler"],
            &["pattern:Claude-SearchBot\\/[0-9]"],
            false,
        );
        let verdict = resolve(&search_bot(), Some(&p));
        assert_eq!(
            verdict,
            Verdict::allow(DecisiveRule::CustomAllow(RuleRef::Pattern(
                "Claude-SearchBot\\/[0-9]".into()
            )))
        );
    }

    #[test]
    fn test_ancestor_allow_beats_pattern_block() {
        // Allow checks all run before any block check
        let p = policy(&["pattern:Claude-SearchBot\\/[0-9]"], &["category:AI Crawler"], false);
        let verdict = resolve(&search_bot(), Some(&p));
        assert_eq!(
            verdict,
            Verdict::allow(DecisiveRule::CustomAllow(RuleRef::Category("AI Crawler".into())))
        );
    }

    #[test]
    fn test_allow_beats_global_trainer_flag() {
        let p = policy(&[], &["type:AI Crawler:Model Training Crawlers:gptbot"], true);
        let verdict = resolve(&trainer(), Some(&p));
        assert_eq!(verdict.decision, Decision::Allow);
    }

    #[test]
    fn test_most_specific_rule_is_reported() {
        let p = policy(
            &[
                "category:AI Crawler",
                "subcategory:AI Crawler:Search Enhancement Crawlers",
                "type:AI Crawler:Search Enhancement Crawlers:claude-searchbot",
            ],
            &[],
            false,
        );
        let verdict = resolve(&search_bot(), Some(&p));
        assert_eq!(verdict.rule.rule_ref().unwrap().kind(), "type");
    }

    #[test]
    fn test_ancestors_require_full_path() {
        // Same subcategory name under a different category is not an ancestor
        let p = policy(&["subcategory:AI Agent:Search Enhancement Crawlers"], &[], false);
        assert_eq!(resolve(&search_bot(), Some(&p)).decision, Decision::Allow);
    }

    #[test]
    fn test_resolve_is_pure() {
        let p = policy(&["category:AI Crawler"], &[], true);
        let agent = trainer();
        assert_eq!(resolve(&agent, Some(&p)), resolve(&agent, Some(&p)));
    }
}
