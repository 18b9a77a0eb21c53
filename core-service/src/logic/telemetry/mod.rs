//! Telemetry Module
//!
//! Reports every classified request to the remote collector, blocked ones
//! included, before enforcement happens.
//!
//! ## Structure
//! - `event.rs` - TelemetryEvent wire record + builder
//! - `emitter.rs` - Bounded queue + worker thread, diagnostic inline mode
//!
//! ## Usage
//! ```ignore
//! use crate::logic::telemetry::{TelemetryEmitter, TelemetryEvent, DispatchMode};
//!
//! let emitter = TelemetryEmitter::new(EmitterConfig::default(), transport);
//! if let Some(event) = TelemetryEvent::build(&ctx, &classification, verdict.as_ref(), elapsed, Utc::now()) {
//!     emitter.emit(&event, &settings.api_key, DispatchMode::for_debug(settings.debug_mode));
//! }
//! emitter.shutdown();
//! ```

pub mod event;
pub mod emitter;

pub use event::{
    TelemetryEvent,
    EventMetadata,
    AgentMetadata,
    ReferrerMetadata,
    SourceType,
    format_timestamp,
};

pub use emitter::{
    TelemetryEmitter,
    EmitterConfig,
    EmitterStats,
    DispatchMode,
    TelemetryError,
};
