use std::collections::HashMap;
use std::sync::Arc;

use crate::application::frontends::Frontend;
use crate::application::handler::ResolvedHandler;
use crate::domain::keys::HandlerKey;

use super::{NoHandlerFound, Resolver};

/// Resolves pairs against the built-in frontends, keyed by resource name.
pub struct FrontendResolver {
    frontends: HashMap<String, Arc<dyn Frontend>>,
}

impl FrontendResolver {
    pub fn new(frontends: impl IntoIterator<Item = Arc<dyn Frontend>>) -> Self {
        let frontends = frontends
            .into_iter()
            .map(|frontend| (frontend.name().to_string(), frontend))
            .collect();
        Self { frontends }
    }
}

impl Resolver for FrontendResolver {
    fn resolve(&self, key: &HandlerKey) -> Result<ResolvedHandler, NoHandlerFound> {
        self.frontends
            .get(key.resource())
            .and_then(|frontend| frontend.method(&key.method_name()))
            .ok_or_else(|| NoHandlerFound::new(key))
    }
}
