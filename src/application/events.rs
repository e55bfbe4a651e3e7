//! Structured generation events.
//!
//! Failures inside the pipeline are never propagated to clients. Instead each
//! notable outcome is reported to an [`EventSink`] with its kind, the request
//! pair and the underlying cause, so operators get logs and counters and tests
//! can assert the classification directly.

use std::sync::Mutex;

use metrics::counter;
use tracing::{debug, info, warn};

use crate::cache::lock::mutex_lock;
use crate::domain::keys::HandlerKey;

pub const METRIC_GENERATION_EVENTS: &str = "confgend_generation_events_total";
pub const METRIC_GENERATION_MS: &str = "confgend_generation_ms";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    /// A handler produced content which was returned to the caller.
    Generated,
    /// A `cached` request was answered from the cache.
    CacheHit,
    /// Generation produced nothing and the previous rendering was served.
    CacheFallback,
    /// Content was produced but could not be persisted.
    CacheWriteFailed,
    /// A cache entry was dropped on request.
    Invalidated,
    /// A handler returned no content.
    EmptyOutput,
    /// A handler returned an error or panicked.
    GenerationFailed,
    /// The read-only data scope could not be opened or closed.
    ScopeFailed,
    /// No resolver claimed the request pair.
    NoHandler,
    /// A request line did not name a `resource/filename` pair.
    MalformedRequest,
    /// A request line was not valid UTF-8.
    DecodeFailed,
}

impl EventKind {
    pub fn as_str(self) -> &'static str {
        match self {
            EventKind::Generated => "generated",
            EventKind::CacheHit => "cache_hit",
            EventKind::CacheFallback => "cache_fallback",
            EventKind::CacheWriteFailed => "cache_write_failed",
            EventKind::Invalidated => "invalidated",
            EventKind::EmptyOutput => "empty_output",
            EventKind::GenerationFailed => "generation_failed",
            EventKind::ScopeFailed => "scope_failed",
            EventKind::NoHandler => "no_handler",
            EventKind::MalformedRequest => "malformed_request",
            EventKind::DecodeFailed => "decode_failed",
        }
    }

    fn is_failure(self) -> bool {
        matches!(
            self,
            EventKind::CacheWriteFailed
                | EventKind::GenerationFailed
                | EventKind::ScopeFailed
                | EventKind::NoHandler
                | EventKind::MalformedRequest
                | EventKind::DecodeFailed
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationEvent {
    pub kind: EventKind,
    pub resource: String,
    pub filename: String,
    pub cause: Option<String>,
}

impl GenerationEvent {
    pub fn new(kind: EventKind, key: &HandlerKey) -> Self {
        Self {
            kind,
            resource: key.resource().to_string(),
            filename: key.filename().to_string(),
            cause: None,
        }
    }

    /// Event for a request that never got as far as a key.
    pub fn unkeyed(kind: EventKind) -> Self {
        Self {
            kind,
            resource: String::new(),
            filename: String::new(),
            cause: None,
        }
    }

    pub fn with_cause(mut self, cause: impl Into<String>) -> Self {
        self.cause = Some(cause.into());
        self
    }
}

pub trait EventSink: Send + Sync {
    fn record(&self, event: &GenerationEvent);
}

/// Default sink: one structured log record and one counter increment per event.
#[derive(Debug, Default, Clone, Copy)]
pub struct TelemetrySink;

impl EventSink for TelemetrySink {
    fn record(&self, event: &GenerationEvent) {
        counter!(METRIC_GENERATION_EVENTS, "kind" => event.kind.as_str()).increment(1);

        let cause = event.cause.as_deref().unwrap_or("");
        if event.kind.is_failure() {
            warn!(
                target = "confgend::generation",
                kind = event.kind.as_str(),
                resource = %event.resource,
                filename = %event.filename,
                cause,
                "generation event"
            );
        } else if event.kind == EventKind::Generated {
            debug!(
                target = "confgend::generation",
                kind = event.kind.as_str(),
                resource = %event.resource,
                filename = %event.filename,
                "generation event"
            );
        } else {
            info!(
                target = "confgend::generation",
                kind = event.kind.as_str(),
                resource = %event.resource,
                filename = %event.filename,
                cause,
                "generation event"
            );
        }
    }
}

/// Keeps every event in memory, in arrival order.
#[derive(Debug, Default)]
pub struct RecordingSink {
    events: Mutex<Vec<GenerationEvent>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<GenerationEvent> {
        mutex_lock(&self.events, "application::events", "events").clone()
    }

    pub fn kinds(&self) -> Vec<EventKind> {
        mutex_lock(&self.events, "application::events", "kinds")
            .iter()
            .map(|event| event.kind)
            .collect()
    }

    pub fn clear(&self) {
        mutex_lock(&self.events, "application::events", "clear").clear();
    }
}

impl EventSink for RecordingSink {
    fn record(&self, event: &GenerationEvent) {
        mutex_lock(&self.events, "application::events", "record").push(event.clone());
    }
}
