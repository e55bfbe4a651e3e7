//! `modules_conf` driver: module loading policy.

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::application::handler::{GenerationContext, Handler, HandlerResult, ResolvedHandler};
use crate::infra::templates::TemplateHelper;

use super::{PluginDependencies, PluginLoadError};

pub(super) const DRIVER: &str = "modules_conf";
const TEMPLATE: &str = "asterisk/modules.conf";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
struct ModulesOptions {
    autoload: bool,
    preload: Vec<String>,
    load: Vec<String>,
    noload: Vec<String>,
}

impl Default for ModulesOptions {
    fn default() -> Self {
        Self {
            autoload: true,
            preload: Vec::new(),
            load: Vec::new(),
            noload: Vec::new(),
        }
    }
}

struct ModulesConf {
    options: ModulesOptions,
    templates: Arc<TemplateHelper>,
}

pub(super) fn load(deps: &PluginDependencies) -> Result<ResolvedHandler, PluginLoadError> {
    let options: ModulesOptions = deps.settings.options(DRIVER)?;
    if let Some(module) = options
        .load
        .iter()
        .find(|module| options.noload.contains(module))
    {
        return Err(PluginLoadError::invalid_options(
            DRIVER,
            format!("module `{module}` is listed in both load and noload"),
        ));
    }
    Ok(Arc::new(ModulesConf {
        options,
        templates: Arc::clone(&deps.templates),
    }))
}

#[async_trait]
impl Handler for ModulesConf {
    async fn generate(&self, _ctx: &mut GenerationContext) -> HandlerResult {
        Ok(Some(self.templates.render(TEMPLATE, &self.options)?))
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::application::plugins::PluginSettings;
    use crate::application::plugins::tests::dependencies_with;
    use crate::application::repos::DataSource;
    use crate::domain::keys::HandlerKey;
    use crate::infra::db::MemoryDataSource;

    fn settings(options: serde_json::Value) -> PluginSettings {
        let mut settings = PluginSettings::default();
        settings.driver_options.insert(DRIVER.to_string(), options);
        settings
    }

    #[tokio::test]
    async fn renders_module_lists() {
        let deps = dependencies_with(settings(json!({
            "autoload": false,
            "preload": ["res_odbc.so"],
            "load": ["chan_pjsip.so"],
            "noload": ["chan_sip.so", "chan_skinny.so"]
        })));
        let handler = load(&deps).expect("loaded");
        let session = MemoryDataSource::default().read_only().await.expect("session");
        let mut ctx = GenerationContext::new(
            HandlerKey::new("asterisk", "modules.conf"),
            Vec::new(),
            session,
        );

        let output = handler
            .generate(&mut ctx)
            .await
            .expect("generated")
            .expect("content");
        assert!(output.starts_with("[modules]\n"));
        assert!(output.contains("autoload = no\n"));
        assert!(output.contains("preload => res_odbc.so\n"));
        assert!(output.contains("load => chan_pjsip.so\n"));
        assert!(output.contains("noload => chan_sip.so\nnoload => chan_skinny.so\n"));
    }

    #[test]
    fn conflicting_lists_fail_to_load() {
        let deps = dependencies_with(settings(json!({
            "load": ["chan_sip.so"],
            "noload": ["chan_sip.so"]
        })));
        assert!(load(&deps).is_err());
    }
}
