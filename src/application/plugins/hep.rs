//! `hep_conf` driver: HEP capture agent settings.

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::application::handler::{GenerationContext, Handler, HandlerResult, ResolvedHandler};
use crate::infra::templates::TemplateHelper;

use super::{PluginDependencies, PluginLoadError};

pub(super) const DRIVER: &str = "hep_conf";
const TEMPLATE: &str = "asterisk/hep.conf";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
struct HepOptions {
    enabled: bool,
    capture_address: String,
    capture_id: u32,
    capture_password: Option<String>,
}

impl Default for HepOptions {
    fn default() -> Self {
        Self {
            enabled: false,
            capture_address: "127.0.0.1:9060".to_string(),
            capture_id: 1,
            capture_password: None,
        }
    }
}

struct HepConf {
    options: HepOptions,
    templates: Arc<TemplateHelper>,
}

pub(super) fn load(deps: &PluginDependencies) -> Result<ResolvedHandler, PluginLoadError> {
    let options: HepOptions = deps.settings.options(DRIVER)?;
    if options.capture_address.trim().is_empty() {
        return Err(PluginLoadError::invalid_options(
            DRIVER,
            "capture_address must not be empty",
        ));
    }
    Ok(Arc::new(HepConf {
        options,
        templates: Arc::clone(&deps.templates),
    }))
}

#[async_trait]
impl Handler for HepConf {
    async fn generate(&self, _ctx: &mut GenerationContext) -> HandlerResult {
        Ok(Some(self.templates.render(TEMPLATE, &self.options)?))
    }
}
