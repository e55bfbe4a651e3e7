//! Handler resolution chain.
//!
//! A [`Resolver`] maps a `(resource, filename)` pair to a handler or declines
//! with [`NoHandlerFound`]. The daemon composes them in a fixed order:
//!
//! 1. [`PluginResolver`]: operator registrations, so any built-in generator
//!    can be overridden by registering a driver under the same key;
//! 2. [`FrontendResolver`]: built-in frontends;
//! 3. [`FallbackResolver`]: always succeeds with a handler that only reports
//!    the missing generator.
//!
//! The combined chain is wrapped in a [`MemoizingResolver`] so each pair is
//! resolved (and each plugin instantiated) at most once per process.

mod frontend;
mod memo;
mod plugin;

use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;

use crate::application::events::{EventKind, EventSink, GenerationEvent};
use crate::application::handler::{GenerationContext, Handler, HandlerResult, ResolvedHandler};
use crate::domain::keys::HandlerKey;

pub use frontend::FrontendResolver;
pub use memo::MemoizingResolver;
pub use plugin::PluginResolver;

/// Raised by a resolver that does not claim a request pair.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("no handler found for `{key}`")]
pub struct NoHandlerFound {
    pub key: HandlerKey,
}

impl NoHandlerFound {
    pub fn new(key: &HandlerKey) -> Self {
        Self { key: key.clone() }
    }
}

pub trait Resolver: Send + Sync {
    fn resolve(&self, key: &HandlerKey) -> Result<ResolvedHandler, NoHandlerFound>;
}

impl<R: Resolver + ?Sized> Resolver for Arc<R> {
    fn resolve(&self, key: &HandlerKey) -> Result<ResolvedHandler, NoHandlerFound> {
        (**self).resolve(key)
    }
}

impl<R: Resolver + ?Sized> Resolver for Box<R> {
    fn resolve(&self, key: &HandlerKey) -> Result<ResolvedHandler, NoHandlerFound> {
        (**self).resolve(key)
    }
}

/// Tries each resolver in order and returns the first handler found.
pub struct CombinedResolver {
    resolvers: Vec<Box<dyn Resolver>>,
}

impl CombinedResolver {
    pub fn new(resolvers: Vec<Box<dyn Resolver>>) -> Self {
        Self { resolvers }
    }
}

impl Resolver for CombinedResolver {
    fn resolve(&self, key: &HandlerKey) -> Result<ResolvedHandler, NoHandlerFound> {
        self.resolvers
            .iter()
            .find_map(|resolver| resolver.resolve(key).ok())
            .ok_or_else(|| NoHandlerFound::new(key))
    }
}

/// The daemon's resolution chain: plugins, then frontends, then the fallback,
/// memoized per pair.
pub fn standard_chain(
    plugins: PluginResolver,
    frontends: FrontendResolver,
    events: Arc<dyn EventSink>,
) -> MemoizingResolver<CombinedResolver> {
    MemoizingResolver::new(CombinedResolver::new(vec![
        Box::new(plugins),
        Box::new(frontends),
        Box::new(FallbackResolver::new(events)),
    ]))
}

/// Terminal resolver: claims every pair with a handler that generates nothing.
pub struct FallbackResolver {
    events: Arc<dyn EventSink>,
}

impl FallbackResolver {
    pub fn new(events: Arc<dyn EventSink>) -> Self {
        Self { events }
    }
}

impl Resolver for FallbackResolver {
    fn resolve(&self, key: &HandlerKey) -> Result<ResolvedHandler, NoHandlerFound> {
        Ok(Arc::new(NullHandler {
            key: key.clone(),
            events: Arc::clone(&self.events),
        }))
    }
}

struct NullHandler {
    key: HandlerKey,
    events: Arc<dyn EventSink>,
}

#[async_trait]
impl Handler for NullHandler {
    async fn generate(&self, _ctx: &mut GenerationContext) -> HandlerResult {
        self.events.record(
            &GenerationEvent::new(EventKind::NoHandler, &self.key)
                .with_cause("no plugin registration or frontend method"),
        );
        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::events::RecordingSink;
    use crate::application::handler::FnHandler;
    use crate::infra::db::MemoryDataSource;
    use crate::application::repos::DataSource;

    struct Fixed(&'static str);

    impl Resolver for Fixed {
        fn resolve(&self, _key: &HandlerKey) -> Result<ResolvedHandler, NoHandlerFound> {
            let text = self.0;
            Ok(Arc::new(FnHandler::new(move |_| Ok(Some(text.to_string())))))
        }
    }

    struct Declines;

    impl Resolver for Declines {
        fn resolve(&self, key: &HandlerKey) -> Result<ResolvedHandler, NoHandlerFound> {
            Err(NoHandlerFound::new(key))
        }
    }

    async fn run(handler: &ResolvedHandler, key: &HandlerKey) -> HandlerResult {
        let session = MemoryDataSource::default()
            .read_only()
            .await
            .expect("memory session");
        let mut ctx = GenerationContext::new(key.clone(), Vec::new(), session);
        handler.generate(&mut ctx).await
    }

    #[tokio::test]
    async fn combined_returns_first_success() {
        let key = HandlerKey::new("r", "f");
        let combined = CombinedResolver::new(vec![
            Box::new(Declines),
            Box::new(Fixed("second")),
            Box::new(Fixed("third")),
        ]);

        let handler = combined.resolve(&key).expect("resolved");
        let output = run(&handler, &key).await.expect("generated");
        assert_eq!(output.as_deref(), Some("second"));
    }

    #[test]
    fn combined_without_fallback_can_fail() {
        let key = HandlerKey::new("r", "f");
        let combined = CombinedResolver::new(vec![Box::new(Declines), Box::new(Declines)]);
        let err = combined.resolve(&key).err().expect("no handler");
        assert_eq!(err.key, key);
        assert_eq!(err.to_string(), "no handler found for `r/f`");
    }

    #[tokio::test]
    async fn fallback_handler_records_absence_and_produces_nothing() {
        let sink = Arc::new(RecordingSink::new());
        let key = HandlerKey::new("unknown", "thing.conf");
        let fallback = FallbackResolver::new(sink.clone());

        let handler = fallback.resolve(&key).expect("fallback always resolves");
        let output = run(&handler, &key).await.expect("no error");

        assert!(output.is_none());
        assert_eq!(sink.kinds(), vec![EventKind::NoHandler]);
        assert_eq!(sink.events()[0].resource, "unknown");
    }
}
