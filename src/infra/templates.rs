//! Runtime template rendering for plugin drivers.
//!
//! Templates are looked up by a relative `<resource>/<file>` name, first in
//! the operator's template directory and then among the templates built into
//! the binary. Output is plain text: nothing is escaped.

use std::borrow::Cow;
use std::io;
use std::path::{Component, Path, PathBuf};

use minijinja::{AutoEscape, Environment};
use serde::Serialize;
use thiserror::Error;

const BUILTIN: &[(&str, &str)] = &[
    ("asterisk/hep.conf", HEP_CONF),
    ("asterisk/modules.conf", MODULES_CONF),
];

const HEP_CONF: &str = r#"[general]
enabled = {{ "yes" if enabled else "no" }}
capture_address = {{ capture_address }}
capture_id = {{ capture_id }}
{% if capture_password %}
capture_password = {{ capture_password }}
{% endif %}
"#;

const MODULES_CONF: &str = r#"[modules]
autoload = {{ "yes" if autoload else "no" }}
{% for module in preload %}
preload => {{ module }}
{% endfor %}
{% for module in load %}
load => {{ module }}
{% endfor %}
{% for module in noload %}
noload => {{ module }}
{% endfor %}
"#;

#[derive(Debug, Error)]
pub enum TemplateError {
    #[error("invalid template name `{0}`")]
    InvalidName(String),
    #[error("template `{0}` not found")]
    NotFound(String),
    #[error("failed to read template `{name}`: {source}")]
    Io {
        name: String,
        #[source]
        source: io::Error,
    },
    #[error("failed to render template `{name}`: {message}")]
    Render { name: String, message: String },
}

#[derive(Debug, Clone, Default)]
pub struct TemplateHelper {
    directory: Option<PathBuf>,
}

impl TemplateHelper {
    pub fn new(directory: Option<PathBuf>) -> Self {
        Self { directory }
    }

    /// Helper that only knows the built-in templates.
    pub fn builtin() -> Self {
        Self::new(None)
    }

    pub fn directory(&self) -> Option<&Path> {
        self.directory.as_deref()
    }

    /// Render `name` with `ctx` as the template context.
    pub fn render<S: Serialize>(&self, name: &str, ctx: &S) -> Result<String, TemplateError> {
        let source = self.source(name)?;
        let render_error = |err: minijinja::Error| TemplateError::Render {
            name: name.to_string(),
            message: err.to_string(),
        };

        let mut env = Environment::new();
        env.set_trim_blocks(true);
        env.set_lstrip_blocks(true);
        env.set_keep_trailing_newline(true);
        env.set_auto_escape_callback(|_| AutoEscape::None);
        env.add_template(name, &source).map_err(render_error)?;
        let template = env.get_template(name).map_err(render_error)?;
        template.render(ctx).map_err(render_error)
    }

    fn source(&self, name: &str) -> Result<Cow<'static, str>, TemplateError> {
        let relative = checked_name(name)?;

        if let Some(directory) = &self.directory {
            let path = directory.join(relative);
            match std::fs::read_to_string(&path) {
                Ok(source) => return Ok(Cow::Owned(source)),
                Err(err) if err.kind() == io::ErrorKind::NotFound => {}
                Err(source) => {
                    return Err(TemplateError::Io {
                        name: name.to_string(),
                        source,
                    });
                }
            }
        }

        BUILTIN
            .iter()
            .find(|(builtin, _)| *builtin == name)
            .map(|(_, source)| Cow::Borrowed(*source))
            .ok_or_else(|| TemplateError::NotFound(name.to_string()))
    }
}

fn checked_name(name: &str) -> Result<PathBuf, TemplateError> {
    let mut relative = PathBuf::new();
    for component in Path::new(name).components() {
        match component {
            Component::Normal(part) => relative.push(part),
            _ => return Err(TemplateError::InvalidName(name.to_string())),
        }
    }
    if relative.as_os_str().is_empty() {
        return Err(TemplateError::InvalidName(name.to_string()));
    }
    Ok(relative)
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn renders_builtin_template() {
        let helper = TemplateHelper::builtin();
        let output = helper
            .render(
                "asterisk/modules.conf",
                &json!({ "autoload": true, "preload": [], "load": ["a.so", "b.so"], "noload": [] }),
            )
            .expect("rendered");
        assert_eq!(output, "[modules]\nautoload = yes\nload => a.so\nload => b.so\n");
    }

    #[test]
    fn operator_directory_overrides_builtin() {
        let dir = tempfile::tempdir().expect("tempdir");
        std::fs::create_dir_all(dir.path().join("asterisk")).expect("mkdir");
        std::fs::write(
            dir.path().join("asterisk/modules.conf"),
            "; managed\nautoload={{ \"yes\" if autoload else \"no\" }}\n",
        )
        .expect("write");

        let helper = TemplateHelper::new(Some(dir.path().to_path_buf()));
        let output = helper
            .render("asterisk/modules.conf", &json!({ "autoload": false }))
            .expect("rendered");
        assert_eq!(output, "; managed\nautoload=no\n");
    }

    #[test]
    fn operator_directory_adds_templates() {
        let dir = tempfile::tempdir().expect("tempdir");
        std::fs::create_dir_all(dir.path().join("custom")).expect("mkdir");
        std::fs::write(dir.path().join("custom/motd.txt"), "hello {{ who }} & co\n")
            .expect("write");

        let helper = TemplateHelper::new(Some(dir.path().to_path_buf()));
        let output = helper
            .render("custom/motd.txt", &json!({ "who": "<ops>" }))
            .expect("rendered");
        assert_eq!(output, "hello <ops> & co\n");
    }

    #[test]
    fn missing_template_is_reported() {
        let err = TemplateHelper::builtin()
            .render("asterisk/nope.conf", &json!({}))
            .err()
            .expect("missing");
        assert!(matches!(err, TemplateError::NotFound(name) if name == "asterisk/nope.conf"));
    }

    #[test]
    fn escaping_names_are_rejected() {
        let helper = TemplateHelper::builtin();
        for name in ["../etc/passwd", "/etc/passwd", "", "asterisk/../x"] {
            let err = helper.render(name, &json!({})).err().expect("rejected");
            assert!(matches!(err, TemplateError::InvalidName(_)), "{name}");
        }
    }

    #[test]
    fn syntax_errors_surface_as_render_failures() {
        let dir = tempfile::tempdir().expect("tempdir");
        std::fs::write(dir.path().join("broken.txt"), "{% if %}").expect("write");
        let helper = TemplateHelper::new(Some(dir.path().to_path_buf()));
        let err = helper.render("broken.txt", &json!({})).err().expect("broken");
        assert!(matches!(err, TemplateError::Render { .. }));
    }
}
