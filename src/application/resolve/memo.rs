use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use crate::application::handler::ResolvedHandler;
use crate::cache::lock::{rw_read, rw_write};
use crate::domain::keys::HandlerKey;

use super::{NoHandlerFound, Resolver};

const SOURCE: &str = "application::resolve::memo";

/// Remembers the first successful resolution of every pair.
///
/// Later requests for the same pair get the stored handler without consulting
/// the wrapped resolver, so registration changes only apply after a restart.
/// Declined pairs are not remembered. Two threads resolving the same new pair
/// at once may both run the wrapped resolver; the handler stored first wins
/// and is returned to both.
pub struct MemoizingResolver<R> {
    inner: R,
    handlers: RwLock<HashMap<HandlerKey, ResolvedHandler>>,
}

impl<R: Resolver> MemoizingResolver<R> {
    pub fn new(inner: R) -> Self {
        Self {
            inner,
            handlers: RwLock::new(HashMap::new()),
        }
    }

    /// Number of pairs resolved so far.
    pub fn len(&self) -> usize {
        rw_read(&self.handlers, SOURCE, "len").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<R: Resolver> Resolver for MemoizingResolver<R> {
    fn resolve(&self, key: &HandlerKey) -> Result<ResolvedHandler, NoHandlerFound> {
        if let Some(handler) = rw_read(&self.handlers, SOURCE, "lookup").get(key) {
            return Ok(Arc::clone(handler));
        }

        let resolved = self.inner.resolve(key)?;
        let mut handlers = rw_write(&self.handlers, SOURCE, "store");
        let stored = handlers.entry(key.clone()).or_insert(resolved);
        Ok(Arc::clone(stored))
    }
}
