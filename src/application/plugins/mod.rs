//! Plugin drivers.
//!
//! Operators override or extend the built-in frontends by registering a
//! driver under a `resource.filename` key:
//!
//! ```toml
//! [plugins]
//! "asterisk.hep.conf" = "hep_conf"
//!
//! [driver_options.hep_conf]
//! capture_address = "10.0.0.5:9060"
//! ```
//!
//! Drivers are compiled in and looked up by name in a [`PluginRegistry`]; each
//! is constructed with the same [`PluginDependencies`] bundle.

mod hep;
mod modules;
mod static_content;

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use serde::de::DeserializeOwned;
use thiserror::Error;

use crate::application::handler::ResolvedHandler;
use crate::infra::templates::TemplateHelper;

/// Constructor of a driver's handler.
pub type PluginFactory = fn(&PluginDependencies) -> Result<ResolvedHandler, PluginLoadError>;

#[derive(Debug, Error)]
pub enum PluginLoadError {
    #[error("unknown plugin driver `{0}`")]
    UnknownDriver(String),
    #[error("invalid options for plugin driver `{driver}`: {reason}")]
    InvalidOptions { driver: &'static str, reason: String },
}

impl PluginLoadError {
    pub fn invalid_options(driver: &'static str, reason: impl Into<String>) -> Self {
        Self::InvalidOptions {
            driver,
            reason: reason.into(),
        }
    }
}

/// Plugin-facing configuration: registrations plus per-driver option tables.
#[derive(Debug, Clone, Default)]
pub struct PluginSettings {
    /// `resource.filename` → driver name.
    pub registrations: BTreeMap<String, String>,
    /// Driver name → free-form options table.
    pub driver_options: BTreeMap<String, serde_json::Value>,
}

impl PluginSettings {
    /// Deserialize the options table of `driver`, or its defaults when absent.
    pub fn options<T>(&self, driver: &'static str) -> Result<T, PluginLoadError>
    where
        T: DeserializeOwned + Default,
    {
        match self.driver_options.get(driver) {
            Some(value) => serde_json::from_value(value.clone())
                .map_err(|err| PluginLoadError::invalid_options(driver, err.to_string())),
            None => Ok(T::default()),
        }
    }
}

/// Everything a driver receives at construction.
#[derive(Clone)]
pub struct PluginDependencies {
    pub settings: Arc<PluginSettings>,
    pub templates: Arc<TemplateHelper>,
}

impl PluginDependencies {
    pub fn new(settings: Arc<PluginSettings>, templates: Arc<TemplateHelper>) -> Self {
        Self {
            settings,
            templates,
        }
    }
}

/// Driver name → factory.
pub struct PluginRegistry {
    factories: HashMap<String, PluginFactory>,
}

impl PluginRegistry {
    pub fn empty() -> Self {
        Self {
            factories: HashMap::new(),
        }
    }

    /// Registry holding the drivers shipped with the daemon.
    pub fn builtin() -> Self {
        let mut registry = Self::empty();
        registry.register(hep::DRIVER, hep::load);
        registry.register(modules::DRIVER, modules::load);
        registry.register(static_content::DRIVER, static_content::load);
        registry
    }

    /// Add or replace a driver.
    pub fn register(&mut self, name: impl Into<String>, factory: PluginFactory) {
        self.factories.insert(name.into(), factory);
    }

    pub fn contains(&self, name: &str) -> bool {
        self.factories.contains_key(name)
    }

    /// Instantiate `driver` with the dependency bundle.
    pub fn load(
        &self,
        driver: &str,
        deps: &PluginDependencies,
    ) -> Result<ResolvedHandler, PluginLoadError> {
        let factory = self
            .factories
            .get(driver)
            .ok_or_else(|| PluginLoadError::UnknownDriver(driver.to_string()))?;
        factory(deps)
    }
}

impl Default for PluginRegistry {
    fn default() -> Self {
        Self::builtin()
    }
}
