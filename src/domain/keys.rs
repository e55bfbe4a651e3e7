//! Request keys.
//!
//! A generation request is identified by a `(resource, filename)` pair. Two
//! string forms are derived from it: the cache key `resource/filename` and the
//! plugin lookup key `resource.filename`. Neither form escapes separators that
//! already appear inside `resource` or `filename`; keys containing them are
//! ambiguous and are kept that way so on-disk cache layouts stay stable.

use std::fmt;

use super::error::DomainError;

/// Identifies the handler responsible for one generated artifact.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct HandlerKey {
    resource: String,
    filename: String,
}

impl HandlerKey {
    pub fn new(resource: impl Into<String>, filename: impl Into<String>) -> Self {
        Self {
            resource: resource.into(),
            filename: filename.into(),
        }
    }

    /// Parse a request command of the form `resource/filename`.
    ///
    /// The command must contain exactly one `/`.
    pub fn parse(command: &str) -> Result<Self, DomainError> {
        let mut parts = command.split('/');
        match (parts.next(), parts.next(), parts.next()) {
            (Some(resource), Some(filename), None) => Ok(Self::new(resource, filename)),
            _ => Err(DomainError::malformed_command(command)),
        }
    }

    pub fn resource(&self) -> &str {
        &self.resource
    }

    pub fn filename(&self) -> &str {
        &self.filename
    }

    /// Key under which the last successful rendering is cached.
    pub fn cache_key(&self) -> String {
        format!("{}/{}", self.resource, self.filename)
    }

    /// Key used to look up plugin registrations.
    pub fn lookup_key(&self) -> String {
        format!("{}.{}", self.resource, self.filename)
    }

    /// Frontend method name for the filename (`.` mapped to `_`).
    pub fn method_name(&self) -> String {
        self.filename.replace('.', "_")
    }
}

impl fmt::Display for HandlerKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.resource, self.filename)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn derived_keys_join_with_separator() {
        let key = HandlerKey::new("asterisk", "sip.conf");
        assert_eq!(key.cache_key(), "asterisk/sip.conf");
        assert_eq!(key.lookup_key(), "asterisk.sip.conf");
        assert_eq!(key.method_name(), "sip_conf");
        assert_eq!(key.to_string(), "asterisk/sip.conf");
    }

    #[test]
    fn parse_requires_exactly_one_slash() {
        let key = HandlerKey::parse("asterisk/uuid.yml").expect("valid command");
        assert_eq!(key.resource(), "asterisk");
        assert_eq!(key.filename(), "uuid.yml");

        assert_eq!(
            HandlerKey::parse("noslash"),
            Err(DomainError::malformed_command("noslash"))
        );
        assert!(HandlerKey::parse("a/b/c").is_err());
    }

    #[test]
    fn parse_accepts_empty_segments() {
        let key = HandlerKey::parse("/").expect("single slash");
        assert_eq!(key.resource(), "");
        assert_eq!(key.filename(), "");
    }

    #[test]
    fn separators_inside_segments_are_not_escaped() {
        let dotted = HandlerKey::new("a.b", "c");
        let plain = HandlerKey::new("a", "b.c");
        assert_eq!(dotted.lookup_key(), plain.lookup_key());
        assert_ne!(dotted, plain);
    }
}
