//! INI-dialect rendering shared by the configuration frontends.

use askama::Template;

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct IniSection {
    pub name: String,
    pub lines: Vec<String>,
}

impl IniSection {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            lines: Vec::new(),
        }
    }

    pub fn option(&mut self, key: &str, value: impl AsRef<str>) {
        self.lines.push(format!("{key} = {}", value.as_ref()));
    }

    pub fn assign(&mut self, key: &str, value: impl AsRef<str>) {
        self.lines.push(format!("{key} => {}", value.as_ref()));
    }
}

#[derive(Template)]
#[template(
    source = "{% for section in sections %}[{{ section.name }}]\n{% for line in section.lines %}{{ line }}\n{% endfor %}\n{% endfor %}",
    ext = "txt"
)]
struct IniTemplate<'a> {
    sections: &'a [IniSection],
}

/// Render sections as `[name]` headers followed by their lines, each section
/// terminated by a blank line. No sections render to an empty document.
pub(crate) fn render_sections(sections: &[IniSection]) -> askama::Result<String> {
    IniTemplate { sections }.render()
}
