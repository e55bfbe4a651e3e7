use std::collections::BTreeMap;
use std::sync::Arc;

use tracing::{debug, warn};

use crate::application::handler::ResolvedHandler;
use crate::application::plugins::{PluginDependencies, PluginRegistry};
use crate::domain::keys::HandlerKey;

use super::{NoHandlerFound, Resolver};

/// Resolves pairs an operator registered under `resource.filename`.
///
/// A missing registration, an unknown driver name and a driver that fails to
/// construct all decline the pair so the next resolver gets a chance.
pub struct PluginResolver {
    registrations: BTreeMap<String, String>,
    registry: Arc<PluginRegistry>,
    deps: PluginDependencies,
}

impl PluginResolver {
    pub fn new(
        registrations: BTreeMap<String, String>,
        registry: Arc<PluginRegistry>,
        deps: PluginDependencies,
    ) -> Self {
        Self {
            registrations,
            registry,
            deps,
        }
    }
}

impl Resolver for PluginResolver {
    fn resolve(&self, key: &HandlerKey) -> Result<ResolvedHandler, NoHandlerFound> {
        let lookup = key.lookup_key();
        let Some(driver) = self.registrations.get(&lookup) else {
            return Err(NoHandlerFound::new(key));
        };

        match self.registry.load(driver, &self.deps) {
            Ok(handler) => {
                debug!(
                    target = "application::resolve::plugin",
                    key = %lookup,
                    driver = %driver,
                    "plugin loaded"
                );
                Ok(handler)
            }
            Err(err) => {
                warn!(
                    target = "application::resolve::plugin",
                    key = %lookup,
                    driver = %driver,
                    error = %err,
                    "failed to load plugin"
                );
                Err(NoHandlerFound::new(key))
            }
        }
    }
}
