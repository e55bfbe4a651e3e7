//! Generation orchestrator.
//!
//! [`ConfigGenerator::generate`] turns a request into the text sent back to the
//! client:
//!
//! - `invalidate` among the arguments drops the cache entry and returns nothing;
//! - `cached` returns the cached rendering when there is one and generates
//!   otherwise;
//! - any other request generates first and falls back to the cached rendering
//!   when the handler fails or produces nothing.
//!
//! Handler failures never escape: errors and panics are reported as events and
//! treated as "no content".

use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Instant;

use futures::FutureExt;
use metrics::histogram;

use crate::application::events::{EventKind, EventSink, GenerationEvent, METRIC_GENERATION_MS};
use crate::application::handler::{GenerationContext, HandlerError};
use crate::application::repos::DataSource;
use crate::application::resolve::Resolver;
use crate::cache::FileCache;
use crate::domain::keys::HandlerKey;

/// Drops the cache entry instead of generating.
pub const ARG_INVALIDATE: &str = "invalidate";
/// Prefers the cached rendering over a fresh one.
pub const ARG_CACHED: &str = "cached";

pub struct ConfigGenerator {
    resolver: Arc<dyn Resolver>,
    cache: Arc<FileCache>,
    data: Arc<dyn DataSource>,
    events: Arc<dyn EventSink>,
}

impl ConfigGenerator {
    pub fn new(
        resolver: Arc<dyn Resolver>,
        cache: Arc<FileCache>,
        data: Arc<dyn DataSource>,
        events: Arc<dyn EventSink>,
    ) -> Self {
        Self {
            resolver,
            cache,
            data,
            events,
        }
    }

    pub fn cache(&self) -> &FileCache {
        &self.cache
    }

    pub async fn generate(&self, key: &HandlerKey, args: &[String]) -> Option<String> {
        let cache_key = key.cache_key();

        if has_arg(args, ARG_INVALIDATE) {
            self.cache.invalidate(&cache_key).await;
            self.record(GenerationEvent::new(EventKind::Invalidated, key));
            return None;
        }

        if has_arg(args, ARG_CACHED)
            && let Some(hit) = self.cache.get(&cache_key).await
        {
            self.record(GenerationEvent::new(EventKind::CacheHit, key));
            return Some(hit);
        }

        let passthrough = args
            .iter()
            .filter(|arg| arg.as_str() != ARG_CACHED)
            .cloned()
            .collect();

        match self.run_handler(key, passthrough).await {
            Some(content) => {
                if !self.cache.put(&cache_key, &content).await {
                    self.record(GenerationEvent::new(EventKind::CacheWriteFailed, key));
                }
                self.record(GenerationEvent::new(EventKind::Generated, key));
                Some(content)
            }
            None => {
                let stale = self.cache.get(&cache_key).await;
                if stale.is_some() {
                    self.record(GenerationEvent::new(EventKind::CacheFallback, key));
                }
                stale
            }
        }
    }

    /// Resolve and run the handler inside a read-only scope. Returns non-empty
    /// content or `None`.
    async fn run_handler(&self, key: &HandlerKey, args: Vec<String>) -> Option<String> {
        let handler = match self.resolver.resolve(key) {
            Ok(handler) => handler,
            Err(err) => {
                self.record(GenerationEvent::new(EventKind::NoHandler, key).with_cause(err.to_string()));
                return None;
            }
        };

        let session = match self.data.read_only().await {
            Ok(session) => session,
            Err(err) => {
                self.record(
                    GenerationEvent::new(EventKind::ScopeFailed, key)
                        .with_cause(format!("open: {err}")),
                );
                return None;
            }
        };

        let started_at = Instant::now();
        let mut ctx = GenerationContext::new(key.clone(), args, session);
        let outcome = AssertUnwindSafe(handler.generate(&mut ctx))
            .catch_unwind()
            .await;
        histogram!(METRIC_GENERATION_MS).record(started_at.elapsed().as_secs_f64() * 1000.0);

        if let Err(err) = ctx.into_session().release().await {
            self.record(
                GenerationEvent::new(EventKind::ScopeFailed, key)
                    .with_cause(format!("release: {err}")),
            );
        }

        let outcome = outcome.unwrap_or_else(|panic| {
            Err(HandlerError::Panicked(
                panic_message(panic.as_ref()).to_string(),
            ))
        });
        match outcome {
            Ok(Some(content)) if !content.is_empty() => Some(content),
            Ok(_) => {
                self.record(GenerationEvent::new(EventKind::EmptyOutput, key));
                None
            }
            Err(err) => {
                self.record(
                    GenerationEvent::new(EventKind::GenerationFailed, key).with_cause(err.to_string()),
                );
                None
            }
        }
    }

    fn record(&self, event: GenerationEvent) {
        self.events.record(&event);
    }
}

fn has_arg(args: &[String], wanted: &str) -> bool {
    args.iter().any(|arg| arg == wanted)
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(message) = payload.downcast_ref::<&'static str>() {
        message
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.as_str()
    } else {
        "non-string panic payload"
    }
}
