use std::sync::Arc;

use super::context::RequestContext;
use super::engine::{Enforcement, FilterState, RequestFilter, SkipReason};
use crate::logic::catalog::{CatalogHandle, CatalogOrigin, PatternCatalog, RuleRef};
use crate::logic::config::{keys, ConfigStore, MemoryConfigStore};
use crate::logic::detection::MatchKind;
use crate::logic::policy::{Decision, DecisiveRule};
use crate::logic::telemetry::{EmitterConfig, TelemetryEmitter};
use crate::logic::transport::mock::MockTransport;

const CATALOG: &str = r#"{
    "version": "3.1.0",
    "patterns": [
        {
            "pattern": "Claude-SearchBot\\/[0-9]",
            "type": "claude-searchbot",
            "category": "AI Crawler",
            "subcategory": "Search Enhancement Crawlers",
            "company": "Anthropic",
            "isCompliant": true,
            "intent": "Search",
            "isCrawler": true
        },
        {
            "pattern": "GPTBot\\/[0-9]",
            "type": "gptbot",
            "category": "AI Crawler",
            "subcategory": "Model Training Crawlers",
            "company": "OpenAI",
            "isAiModelTrainer": true,
            "isCrawler": true
        }
    ],
    "aiReferrers": [
        { "id": "chatgpt", "name": "ChatGPT", "company": "OpenAI", "patterns": ["chatgpt\\.com"] }
    ]
}"#;

struct Harness {
    filter: RequestFilter,
    store: Arc<MemoryConfigStore>,
    transport: Arc<MockTransport>,
}

/// Debug mode makes telemetry synchronous so posts can be counted directly
fn harness(extra: &[(&str, &str)]) -> Harness {
    let catalog = PatternCatalog::from_json(CATALOG, CatalogOrigin::Remote).unwrap();
    let store = Arc::new(MemoryConfigStore::with_values([
        (keys::API_KEY, "site-key"),
        (keys::DEBUG_MODE, "yes"),
    ]));
    for (k, v) in extra {
        store.set(k, v);
    }

    let transport = Arc::new(MockTransport::replying(200, ""));
    let emitter = Arc::new(TelemetryEmitter::new(
        EmitterConfig {
            collector_endpoint: "https://collector.test/collect".to_string(),
            ..EmitterConfig::default()
        },
        transport.clone(),
    ));

    let filter = RequestFilter::new(
        Arc::new(CatalogHandle::new(catalog)),
        store.clone(),
        emitter,
    );
    Harness {
        filter,
        store,
        transport,
    }
}

fn request(ua: &str) -> RequestContext {
    RequestContext::new("GET", "/blog/post")
        .with_header("Host", "example.com")
        .with_header("User-Agent", ua)
        .with_remote_addr("192.0.2.10")
}

fn posted_json(h: &Harness, index: usize) -> serde_json::Value {
    let posts = h.transport.posts.lock();
    serde_json::from_str(&posts[index].2).unwrap()
}

#[test]
fn test_scenario_a_trainer_allowed_by_default() {
    let h = harness(&[]);
    let outcome = h.filter.inspect(&request("GPTBot/1.1"));

    assert_eq!(outcome.enforcement, Enforcement::Proceed { vary_user_agent: true });
    assert_eq!(outcome.verdict.unwrap().rule, DecisiveRule::Default);
    assert!(outcome.telemetry_emitted);
    assert_eq!(h.transport.posts.lock().len(), 1);
}

#[test]
fn test_scenario_b_trainer_blocked_and_reported() {
    let h = harness(&[(keys::BLOCK_AI_MODEL_TRAINERS, "on")]);
    let outcome = h.filter.inspect(&request("GPTBot/1.1"));

    assert!(outcome.is_blocked());
    assert_eq!(outcome.verdict.as_ref().unwrap().rule, DecisiveRule::BlockAiModelTrainers);

    // Telemetry precedes enforcement
    assert_eq!(
        outcome.trace,
        vec![
            FilterState::Unclassified,
            FilterState::Matched(MatchKind::Agent),
            FilterState::PolicyResolved(Decision::Block),
            FilterState::TelemetryEmitted,
            FilterState::Terminated,
        ]
    );
    let event = posted_json(&h, 0);
    assert_eq!(event["response_status"], 403);
    assert_eq!(event["metadata"]["blocked"], true);
    assert_eq!(event["metadata"]["decisive_rule"], "block_ai_model_trainers");
}

#[test]
fn test_scenario_c_category_block() {
    let h = harness(&[(keys::CUSTOM_BLOCKS, r#"["category:AI Crawler"]"#)]);
    let outcome = h.filter.inspect(&request("Claude-SearchBot/1.0"));

    assert_eq!(outcome.enforcement, Enforcement::Terminate);
    assert_eq!(
        outcome.verdict.unwrap().rule,
        DecisiveRule::CustomBlock(RuleRef::Category("AI Crawler".into()))
    );
}

#[test]
fn test_scenario_d_pattern_allow_wins() {
    let h = harness(&[
        (keys::CUSTOM_BLOCKS, r#"["category:AI Crawler"]"#),
        (keys::CUSTOM_ALLOWS, r#"["pattern:Claude-SearchBot\\/[0-9]"]"#),
    ]);
    let outcome = h.filter.inspect(&request("Claude-SearchBot/1.0"));

    assert_eq!(outcome.enforcement, Enforcement::Proceed { vary_user_agent: true });
    assert_eq!(
        outcome.verdict.unwrap().rule,
        DecisiveRule::CustomAllow(RuleRef::Pattern("Claude-SearchBot\\/[0-9]".into()))
    );
}

#[test]
fn test_scenario_e_ordinary_browser() {
    let h = harness(&[]);
    let outcome = h.filter.inspect(&request("Mozilla/5.0 (ordinary browser)"));

    assert_eq!(outcome.enforcement, Enforcement::Proceed { vary_user_agent: false });
    assert!(!outcome.classification.is_classified());
    assert!(!outcome.telemetry_emitted);
    assert!(h.transport.posts.lock().is_empty());
    assert_eq!(outcome.final_state(), FilterState::Enforced);
}

#[test]
fn test_referrer_only_is_reported_never_blocked() {
    let h = harness(&[
        (keys::BLOCK_AI_MODEL_TRAINERS, "on"),
        (keys::CUSTOM_BLOCKS, r#"["category:AI Crawler"]"#),
    ]);
    let ctx = request("Mozilla/5.0 (Macintosh)").with_header("Referer", "https://chatgpt.com/share/1");
    let outcome = h.filter.inspect(&ctx);

    assert_eq!(outcome.enforcement, Enforcement::Proceed { vary_user_agent: true });
    assert!(outcome.verdict.is_none());
    let event = posted_json(&h, 0);
    assert_eq!(event["metadata"]["source_type"], "ai_referrer");
    assert_eq!(event["metadata"]["referrer_id"], "chatgpt");
    assert_eq!(event["referrer"], "https://chatgpt.com/share/1");
}

#[test]
fn test_rule_edits_apply_to_next_request() {
    let h = harness(&[]);
    assert!(!h.filter.inspect(&request("GPTBot/2.0")).is_blocked());

    h.store.set(keys::CUSTOM_BLOCKS, r#"["type:AI Crawler:Model Training Crawlers:gptbot"]"#);
    assert!(h.filter.inspect(&request("GPTBot/2.0")).is_blocked());
}

#[test]
fn test_central_policy_merges_with_local_rules() {
    let body = CATALOG.replacen(
        r#""aiReferrers""#,
        r#""propertySettings": { "blockAiModelTrainers": true, "customBlocks": [], "customAllows": [] }, "aiReferrers""#,
        1,
    );
    let h = harness(&[(keys::CUSTOM_ALLOWS, r#"["pattern:GPTBot\\/[0-9]"]"#)]);
    let catalog = PatternCatalog::from_json(&body, CatalogOrigin::Remote).unwrap();
    h.filter.catalog().install(catalog);

    let outcome = h.filter.inspect(&request("GPTBot/1.0"));
    assert_eq!(outcome.verdict.unwrap().decision, Decision::Allow);

    h.store.set(keys::CUSTOM_ALLOWS, "[]");
    assert!(h.filter.inspect(&request("GPTBot/1.0")).is_blocked());
}

#[test]
fn test_inert_without_api_key() {
    let h = harness(&[(keys::CUSTOM_BLOCKS, r#"["category:AI Crawler"]"#)]);
    h.store.remove(keys::API_KEY);

    let outcome = h.filter.inspect(&request("GPTBot/1.0"));
    assert_eq!(outcome.skipped, Some(SkipReason::ConfigurationMissing));
    assert!(!outcome.is_blocked());
    assert!(h.transport.posts.lock().is_empty());
}

#[test]
fn test_excluded_paths_bypass_detection() {
    let h = harness(&[
        (keys::BLOCK_AI_MODEL_TRAINERS, "on"),
        (keys::EXCLUDED_PATHS, "/admin,/ajax"),
    ]);
    let ctx = RequestContext::new("POST", "/ajax/save").with_header("User-Agent", "GPTBot/1.0");

    let outcome = h.filter.inspect(&ctx);
    assert_eq!(outcome.skipped, Some(SkipReason::ExcludedPath));
    assert!(!outcome.is_blocked());
}

/// Store that panics on one key, standing in for any defect in the request path
struct FaultyStore {
    inner: MemoryConfigStore,
    poisoned: &'static str,
}

impl ConfigStore for FaultyStore {
    fn get(&self, key: &str) -> Option<String> {
        if key == self.poisoned {
            panic!("corrupt setting: {}", key);
        }
        self.inner.get(key)
    }

    fn set(&self, key: &str, value: &str) {
        self.inner.set(key, value)
    }

    fn remove(&self, key: &str) {
        self.inner.remove(key)
    }
}

#[test]
fn test_fault_allows_without_telemetry() {
    let catalog = PatternCatalog::from_json(CATALOG, CatalogOrigin::Remote).unwrap();
    let transport = Arc::new(MockTransport::replying(200, ""));
    let store = Arc::new(FaultyStore {
        inner: MemoryConfigStore::with_values([
            (keys::API_KEY, "site-key"),
            (keys::BLOCK_AI_MODEL_TRAINERS, "on"),
        ]),
        poisoned: keys::CUSTOM_BLOCKS,
    });
    let filter = RequestFilter::new(
        Arc::new(CatalogHandle::new(catalog)),
        store,
        Arc::new(TelemetryEmitter::new(EmitterConfig::default(), transport.clone())),
    );

    let outcome = filter.inspect(&request("GPTBot/1.0"));
    assert_eq!(outcome.skipped, Some(SkipReason::Fault));
    assert_eq!(outcome.enforcement, Enforcement::Proceed { vary_user_agent: false });
    assert!(!outcome.telemetry_emitted);
    assert!(transport.posts.lock().is_empty());
}
