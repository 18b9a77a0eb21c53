//! Request Filter Engine
//!
//! Per-request orchestration:
//! classify -> resolve policy -> emit telemetry -> enforce.
//!
//! The filter never fails a request. Any panic raised while classifying,
//! resolving or emitting is caught here and turns into "proceed, no
//! telemetry".

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use serde::Serialize;

use super::context::RequestContext;
use crate::logic::catalog::CatalogHandle;
use crate::logic::config::{keys, parse_flag, ConfigStore, ShieldSettings};
use crate::logic::detection::{classify, ClassificationResult, MatchKind};
use crate::logic::policy::{effective_policy, resolve, Decision, Verdict};
use crate::logic::telemetry::{DispatchMode, TelemetryEmitter, TelemetryEvent};

/// Status used to terminate a blocked request
pub const BLOCK_STATUS: u16 = 403;

/// Headers on a block response; it must never be cached
pub const BLOCK_HEADERS: [(&str, &str); 3] = [
    ("Cache-Control", "no-cache, no-store, must-revalidate, max-age=0"),
    ("Pragma", "no-cache"),
    ("Expires", "0"),
];

// ============================================================================
// STATES & OUTCOME
// ============================================================================

/// Steps a request passes through, in order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum FilterState {
    Unclassified,
    Matched(MatchKind),
    PolicyResolved(Decision),
    TelemetryEmitted,
    Enforced,
    Terminated,
}

/// Why the filter stood aside without classifying
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SkipReason {
    /// No API key configured; the shield is inert
    ConfigurationMissing,
    /// Path matches an operator-excluded prefix
    ExcludedPath,
    /// Something panicked inside the filter
    Fault,
}

/// What the host must do with the request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Enforcement {
    /// Serve normally; add `Vary: User-Agent` when asked
    Proceed { vary_user_agent: bool },
    /// Answer 403 with `BLOCK_HEADERS` and stop
    Terminate,
}

impl Enforcement {
    pub fn is_terminate(&self) -> bool {
        matches!(self, Enforcement::Terminate)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FilterOutcome {
    pub enforcement: Enforcement,
    pub classification: ClassificationResult,
    pub verdict: Option<Verdict>,
    pub telemetry_emitted: bool,
    pub skipped: Option<SkipReason>,
    pub trace: Vec<FilterState>,
}

impl FilterOutcome {
    fn skipped(reason: SkipReason) -> Self {
        Self {
            enforcement: Enforcement::Proceed { vary_user_agent: false },
            classification: ClassificationResult::default(),
            verdict: None,
            telemetry_emitted: false,
            skipped: Some(reason),
            trace: vec![FilterState::Enforced],
        }
    }

    pub fn is_blocked(&self) -> bool {
        self.enforcement.is_terminate()
    }

    /// Terminal state of the request
    pub fn final_state(&self) -> FilterState {
        self.trace.last().copied().unwrap_or(FilterState::Enforced)
    }
}

// ============================================================================
// REQUEST FILTER
// ============================================================================

pub struct RequestFilter {
    catalog: Arc<CatalogHandle>,
    config: Arc<dyn ConfigStore>,
    emitter: Arc<TelemetryEmitter>,
}

impl RequestFilter {
    pub fn new(
        catalog: Arc<CatalogHandle>,
        config: Arc<dyn ConfigStore>,
        emitter: Arc<TelemetryEmitter>,
    ) -> Self {
        Self {
            catalog,
            config,
            emitter,
        }
    }

    pub fn catalog(&self) -> &Arc<CatalogHandle> {
        &self.catalog
    }

    /// Inspect one request; never panics, never errors
    pub fn inspect(&self, ctx: &RequestContext) -> FilterOutcome {
        match catch_unwind(AssertUnwindSafe(|| self.evaluate(ctx))) {
            Ok(outcome) => outcome,
            Err(panic) => {
                let message = panic
                    .downcast_ref::<&str>()
                    .map(|s| s.to_string())
                    .or_else(|| panic.downcast_ref::<String>().cloned())
                    .unwrap_or_else(|| "unknown panic".to_string());
                if self.diagnostics_enabled() {
                    log::warn!("Request filter fault on {} (allowing): {}", ctx.path, message);
                } else {
                    log::debug!("Request filter fault on {} (allowing): {}", ctx.path, message);
                }
                FilterOutcome::skipped(SkipReason::Fault)
            }
        }
    }

    fn evaluate(&self, ctx: &RequestContext) -> FilterOutcome {
        let started = Instant::now();
        let settings = ShieldSettings::read(self.config.as_ref());

        if !settings.has_api_key() {
            return FilterOutcome::skipped(SkipReason::ConfigurationMissing);
        }
        if settings.is_excluded(&ctx.path) {
            return FilterOutcome::skipped(SkipReason::ExcludedPath);
        }

        let catalog = self.catalog.current();
        let classification = classify(ctx.user_agent(), ctx.referrer(), &catalog);
        let mut trace = vec![FilterState::Unclassified, FilterState::Matched(classification.kind())];

        if !classification.is_classified() {
            trace.push(FilterState::Enforced);
            return FilterOutcome {
                enforcement: Enforcement::Proceed { vary_user_agent: false },
                classification,
                verdict: None,
                telemetry_emitted: false,
                skipped: None,
                trace,
            };
        }

        // Referrer matches are informational; only agents reach the resolver
        let verdict = classification.agent_match.as_ref().map(|agent| {
            let policy = effective_policy(catalog.policy(), &settings.local_policy);
            resolve(agent, policy.as_deref())
        });
        if let Some(verdict) = &verdict {
            trace.push(FilterState::PolicyResolved(verdict.decision));
        }

        let elapsed_ms = started.elapsed().as_secs_f64() * 1000.0;
        let telemetry_emitted =
            match TelemetryEvent::build(ctx, &classification, verdict.as_ref(), elapsed_ms, Utc::now()) {
                Some(event) => {
                    self.emitter
                        .emit(&event, &settings.api_key, DispatchMode::for_debug(settings.debug_mode));
                    trace.push(FilterState::TelemetryEmitted);
                    true
                }
                None => false,
            };

        let blocked = verdict.as_ref().map(Verdict::is_block).unwrap_or(false);
        let enforcement = if blocked {
            if let (Some(agent), Some(verdict)) = (&classification.agent_match, &verdict) {
                log::info!("Blocked {} ({}) by {}", agent.agent_type, ctx.client_ip(), verdict.rule);
            }
            trace.push(FilterState::Terminated);
            Enforcement::Terminate
        } else {
            trace.push(FilterState::Enforced);
            Enforcement::Proceed { vary_user_agent: true }
        };

        FilterOutcome {
            enforcement,
            classification,
            verdict,
            telemetry_emitted,
            skipped: None,
            trace,
        }
    }

    fn diagnostics_enabled(&self) -> bool {
        catch_unwind(AssertUnwindSafe(|| {
            self.config
                .get(keys::DEBUG_MODE)
                .map(|v| parse_flag(&v))
                .unwrap_or(false)
        }))
        .unwrap_or(false)
    }
}
