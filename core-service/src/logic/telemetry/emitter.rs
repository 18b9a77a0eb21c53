//! Telemetry Emitter
//!
//! Ships events to the collector. Default dispatch hands the serialized
//! event to a dedicated worker thread over a bounded queue and returns
//! immediately; a full queue drops the event. Diagnostic dispatch posts
//! synchronously so collector errors can be logged for operators.
//! Nothing is ever retried.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::mpsc::{self, Receiver, SyncSender, TrySendError};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;

use parking_lot::Mutex;
use serde::Serialize;

use super::event::TelemetryEvent;
use crate::constants;
use crate::logic::transport::{HttpTransport, TransportError};

// ============================================================================
// CONFIG & ERRORS
// ============================================================================

#[derive(Debug, Clone)]
pub struct EmitterConfig {
    pub collector_endpoint: String,
    pub timeout: Duration,
    pub queue_capacity: usize,
}

impl Default for EmitterConfig {
    fn default() -> Self {
        Self {
            collector_endpoint: constants::get_collector_endpoint(),
            timeout: Duration::from_secs(constants::DEFAULT_TELEMETRY_TIMEOUT_SECS),
            queue_capacity: constants::TELEMETRY_QUEUE_CAPACITY,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchMode {
    /// Queue for the worker, never wait
    Async,
    /// Post inline and report collector errors
    Diagnostic,
}

impl DispatchMode {
    pub fn for_debug(debug_mode: bool) -> Self {
        if debug_mode {
            DispatchMode::Diagnostic
        } else {
            DispatchMode::Async
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TelemetryError {
    QueueFull,
    /// Worker gone (shut down or never started)
    Closed,
    Serialization(String),
    Transport(TransportError),
    /// Collector answered with an error status
    Rejected { status: u16, body: String },
}

impl std::fmt::Display for TelemetryError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::QueueFull => write!(f, "Telemetry queue full"),
            Self::Closed => write!(f, "Telemetry worker not running"),
            Self::Serialization(e) => write!(f, "Serialization error: {}", e),
            Self::Transport(e) => write!(f, "Collector unreachable: {}", e),
            Self::Rejected { status, body } => write!(f, "Collector error (HTTP {}): {}", status, body),
        }
    }
}

impl std::error::Error for TelemetryError {}

impl From<TransportError> for TelemetryError {
    fn from(err: TransportError) -> Self {
        TelemetryError::Transport(err)
    }
}

// ============================================================================
// STATS
// ============================================================================

#[derive(Debug, Default)]
struct Counters {
    queued: AtomicU64,
    delivered: AtomicU64,
    dropped: AtomicU64,
    failed: AtomicU64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct EmitterStats {
    pub queued: u64,
    pub delivered: u64,
    pub dropped: u64,
    pub failed: u64,
}

// ============================================================================
// EMITTER
// ============================================================================

struct Job {
    api_key: String,
    body: String,
}

pub struct TelemetryEmitter {
    config: EmitterConfig,
    transport: Arc<dyn HttpTransport>,
    sender: Mutex<Option<SyncSender<Job>>>,
    worker: Mutex<Option<JoinHandle<()>>>,
    counters: Arc<Counters>,
}

impl TelemetryEmitter {
    /// Create the emitter and start its worker thread
    pub fn new(config: EmitterConfig, transport: Arc<dyn HttpTransport>) -> Self {
        let (tx, rx) = mpsc::sync_channel(config.queue_capacity);
        let counters = Arc::new(Counters::default());

        let worker = {
            let transport = transport.clone();
            let counters = counters.clone();
            let endpoint = config.collector_endpoint.clone();
            let timeout = config.timeout;
            std::thread::Builder::new()
                .name("shield-telemetry".to_string())
                .spawn(move || run_worker(rx, transport, counters, endpoint, timeout))
        };

        let (sender, worker) = match worker {
            Ok(handle) => (Some(tx), Some(handle)),
            Err(e) => {
                log::error!("Telemetry worker failed to start: {} - events will be dropped", e);
                (None, None)
            }
        };

        Self {
            config,
            transport,
            sender: Mutex::new(sender),
            worker: Mutex::new(worker),
            counters,
        }
    }

    /// Best-effort emit; failures only surface in the log
    pub fn emit(&self, event: &TelemetryEvent, api_key: &str, mode: DispatchMode) {
        match self.try_emit(event, api_key, mode) {
            Ok(()) => {}
            Err(e) if mode == DispatchMode::Diagnostic => log::warn!("Telemetry dispatch failed: {}", e),
            Err(e) => log::debug!("Telemetry event dropped: {}", e),
        }
    }

    pub fn try_emit(&self, event: &TelemetryEvent, api_key: &str, mode: DispatchMode) -> Result<(), TelemetryError> {
        let body = event
            .to_json()
            .map_err(|e| TelemetryError::Serialization(e.to_string()))?;

        match mode {
            DispatchMode::Async => self.enqueue(Job {
                api_key: api_key.to_string(),
                body,
            }),
            DispatchMode::Diagnostic => self.post_now(api_key, &body),
        }
    }

    fn enqueue(&self, job: Job) -> Result<(), TelemetryError> {
        let guard = self.sender.lock();
        let sender = guard.as_ref().ok_or(TelemetryError::Closed)?;

        match sender.try_send(job) {
            Ok(()) => {
                self.counters.queued.fetch_add(1, Ordering::Relaxed);
                Ok(())
            }
            Err(TrySendError::Full(_)) => {
                self.counters.dropped.fetch_add(1, Ordering::Relaxed);
                Err(TelemetryError::QueueFull)
            }
            Err(TrySendError::Disconnected(_)) => {
                self.counters.dropped.fetch_add(1, Ordering::Relaxed);
                Err(TelemetryError::Closed)
            }
        }
    }

    fn post_now(&self, api_key: &str, body: &str) -> Result<(), TelemetryError> {
        let result = post(
            self.transport.as_ref(),
            &self.config.collector_endpoint,
            api_key,
            body,
            self.config.timeout,
        );
        tally(&self.counters, &result);
        result
    }

    pub fn stats(&self) -> EmitterStats {
        EmitterStats {
            queued: self.counters.queued.load(Ordering::Relaxed),
            delivered: self.counters.delivered.load(Ordering::Relaxed),
            dropped: self.counters.dropped.load(Ordering::Relaxed),
            failed: self.counters.failed.load(Ordering::Relaxed),
        }
    }

    /// Close the queue and wait for the worker to drain it
    pub fn shutdown(&self) {
        // Dropping the sender ends the worker loop once the queue is empty
        self.sender.lock().take();

        if let Some(handle) = self.worker.lock().take() {
            if handle.join().is_err() {
                log::error!("Telemetry worker panicked");
            }
            let stats = self.stats();
            log::info!(
                "Telemetry shutdown. Delivered: {}, failed: {}, dropped: {}",
                stats.delivered,
                stats.failed,
                stats.dropped
            );
        }
    }
}

impl Drop for TelemetryEmitter {
    fn drop(&mut self) {
        self.shutdown();
    }
}

// ============================================================================
// WORKER
// ============================================================================

fn run_worker(
    rx: Receiver<Job>,
    transport: Arc<dyn HttpTransport>,
    counters: Arc<Counters>,
    endpoint: String,
    timeout: Duration,
) {
    for job in rx {
        let result = post(transport.as_ref(), &endpoint, &job.api_key, &job.body, timeout);
        if let Err(e) = &result {
            log::debug!("Telemetry delivery failed: {}", e);
        }
        tally(&counters, &result);
    }
}

fn post(
    transport: &dyn HttpTransport,
    endpoint: &str,
    api_key: &str,
    body: &str,
    timeout: Duration,
) -> Result<(), TelemetryError> {
    let reply = transport.post_json(endpoint, api_key, body, timeout)?;
    if reply.status >= 400 {
        return Err(TelemetryError::Rejected {
            status: reply.status,
            body: reply.body,
        });
    }
    Ok(())
}

fn tally(counters: &Counters, result: &Result<(), TelemetryError>) {
    let counter = if result.is_ok() {
        &counters.delivered
    } else {
        &counters.failed
    };
    counter.fetch_add(1, Ordering::Relaxed);
}

// ============================================================================
// TESTS
// ============================================================================
