//! Assembly of a [`ConfigGenerator`] with the standard resolution chain.

use std::sync::Arc;

use tracing::warn;

use crate::application::events::EventSink;
use crate::application::frontends::{AsteriskFrontend, Frontend};
use crate::application::generate::ConfigGenerator;
use crate::application::plugins::{PluginDependencies, PluginRegistry, PluginSettings};
use crate::application::repos::DataSource;
use crate::application::resolve::{FrontendResolver, PluginResolver, standard_chain};
use crate::cache::FileCache;
use crate::infra::templates::TemplateHelper;

pub struct GeneratorBuilder {
    cache: Arc<FileCache>,
    data: Arc<dyn DataSource>,
    events: Arc<dyn EventSink>,
    plugins: PluginSettings,
    registry: PluginRegistry,
    templates: TemplateHelper,
    frontends: Vec<Arc<dyn Frontend>>,
}

impl GeneratorBuilder {
    /// Builder with the built-in drivers and frontends and no registrations.
    pub fn new(
        cache: Arc<FileCache>,
        data: Arc<dyn DataSource>,
        events: Arc<dyn EventSink>,
    ) -> Self {
        Self {
            cache,
            data,
            events,
            plugins: PluginSettings::default(),
            registry: PluginRegistry::builtin(),
            templates: TemplateHelper::builtin(),
            frontends: vec![Arc::new(AsteriskFrontend::new()) as Arc<dyn Frontend>],
        }
    }

    pub fn plugins(mut self, plugins: PluginSettings) -> Self {
        self.plugins = plugins;
        self
    }

    pub fn registry(mut self, registry: PluginRegistry) -> Self {
        self.registry = registry;
        self
    }

    pub fn templates(mut self, templates: TemplateHelper) -> Self {
        self.templates = templates;
        self
    }

    /// Replace the frontend set.
    pub fn frontends(mut self, frontends: Vec<Arc<dyn Frontend>>) -> Self {
        self.frontends = frontends;
        self
    }

    pub fn build(self) -> ConfigGenerator {
        for (key, driver) in &self.plugins.registrations {
            if !self.registry.contains(driver) {
                warn!(
                    target = "confgend::startup",
                    key = %key,
                    driver = %driver,
                    "registration names an unknown plugin driver and will be ignored"
                );
            }
        }

        let registrations = self.plugins.registrations.clone();
        let deps = PluginDependencies::new(Arc::new(self.plugins), Arc::new(self.templates));
        let resolver = standard_chain(
            PluginResolver::new(registrations, Arc::new(self.registry), deps),
            FrontendResolver::new(self.frontends),
            Arc::clone(&self.events),
        );

        ConfigGenerator::new(Arc::new(resolver), self.cache, self.data, self.events)
    }
}
