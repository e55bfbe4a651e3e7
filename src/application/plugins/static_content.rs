//! `static` driver: serves fixed text taken from configuration.
//!
//! Useful to pin a file to known content while the generator that normally
//! owns it is being fixed. The table is keyed by `resource.filename`:
//!
//! ```toml
//! [plugins]
//! "asterisk.features.conf" = "static"
//!
//! [driver_options.static.files]
//! "asterisk.features.conf" = "[general]\n"
//! ```

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;

use crate::application::handler::{GenerationContext, Handler, HandlerResult, ResolvedHandler};

use super::{PluginDependencies, PluginLoadError};

pub(super) const DRIVER: &str = "static";

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct StaticOptions {
    files: BTreeMap<String, String>,
}

struct StaticContent {
    files: BTreeMap<String, String>,
}

pub(super) fn load(deps: &PluginDependencies) -> Result<ResolvedHandler, PluginLoadError> {
    let options: StaticOptions = deps.settings.options(DRIVER)?;
    Ok(Arc::new(StaticContent {
        files: options.files,
    }))
}

#[async_trait]
impl Handler for StaticContent {
    async fn generate(&self, ctx: &mut GenerationContext) -> HandlerResult {
        Ok(self.files.get(&ctx.key().lookup_key()).cloned())
    }
}
