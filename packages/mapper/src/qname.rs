//! Qualified XML names.

use std::fmt;

/// A qualified XML name: namespace URI plus local name.
///
/// The namespace is identified by its URI, never by the prefix used in the
/// document, so `a:item` and `b:item` are the same name when both prefixes
/// resolve to the same URI. Elements and attributes in no namespace carry
/// `None`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct QName {
    namespace: Option<String>,
    local_name: String,
}

impl QName {
    /// Create a qualified name. An empty namespace URI means "no namespace".
    #[must_use]
    pub fn new(namespace: impl Into<String>, local_name: impl Into<String>) -> Self {
        let namespace = namespace.into();
        Self {
            namespace: (!namespace.is_empty()).then_some(namespace),
            local_name: local_name.into(),
        }
    }

    /// Create a name in no namespace.
    #[must_use]
    pub fn local(local_name: impl Into<String>) -> Self {
        Self {
            namespace: None,
            local_name: local_name.into(),
        }
    }

    /// Namespace URI, or `None` for "no namespace".
    #[must_use]
    pub fn namespace(&self) -> Option<&str> {
        self.namespace.as_deref()
    }

    /// Local part of the name.
    #[must_use]
    pub fn local_name(&self) -> &str {
        &self.local_name
    }

    /// Check whether this name has the given namespace and local name.
    #[must_use]
    pub fn matches(&self, namespace: Option<&str>, local_name: &str) -> bool {
        self.local_name == local_name && self.namespace() == namespace
    }
}

/// Formats in Clark notation: `{urn:ns}local`, or just `local` without a namespace.
impl fmt::Display for QName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.namespace {
            Some(ns) => write!(f, "{{{ns}}}{}", self.local_name),
            None => f.write_str(&self.local_name),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_qname_equality_is_structural() {
        assert_eq!(QName::new("urn:t", "root"), QName::new("urn:t", "root"));
        assert_ne!(QName::new("urn:t", "root"), QName::new("urn:u", "root"));
        assert_ne!(QName::new("urn:t", "root"), QName::local("root"));
    }

    #[test]
    fn test_empty_namespace_is_no_namespace() {
        assert_eq!(QName::new("", "root"), QName::local("root"));
        assert_eq!(QName::new("", "root").namespace(), None);
    }

    #[test]
    fn test_display_clark_notation() {
        assert_eq!(QName::new("urn:t", "child").to_string(), "{urn:t}child");
        assert_eq!(QName::local("child").to_string(), "child");
    }

    #[test]
    fn test_matches() {
        let name = QName::new("urn:t", "child");
        assert!(name.matches(Some("urn:t"), "child"));
        assert!(!name.matches(None, "child"));
        assert!(!name.matches(Some("urn:t"), "other"));
    }
}
