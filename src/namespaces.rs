//! XML namespace handling
//!
//! This module provides qualified names (QNames), namespace prefix mappings,
//! and the well-known namespace URIs. An absent namespace is represented by
//! the empty string throughout the crate.

use std::collections::HashMap;
use std::fmt;

use serde::Serialize;

use crate::error::{Error, Result};
use crate::names::is_valid_ncname;

/// XML Namespace URI
pub type NamespaceUri = String;

/// Namespace prefix
pub type Prefix = String;

/// XML Schema namespace
pub const XSD_NAMESPACE: &str = "http://www.w3.org/2001/XMLSchema";

/// XML Schema instance namespace
pub const XSI_NAMESPACE: &str = "http://www.w3.org/2001/XMLSchema-instance";

/// XML namespace
pub const XML_NAMESPACE: &str = "http://www.w3.org/XML/1998/namespace";

/// XMLNS namespace
pub const XMLNS_NAMESPACE: &str = "http://www.w3.org/2000/xmlns/";

/// Qualified name (QName) - combination of namespace and local name
///
/// Ordering is by namespace, then local name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct QName {
    /// Namespace URI (empty for no namespace)
    pub namespace: NamespaceUri,
    /// Local name
    pub local_name: String,
}

impl QName {
    /// Create a new QName
    pub fn new(namespace: impl Into<String>, local_name: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            local_name: local_name.into(),
        }
    }

    /// Create a QName without a namespace
    pub fn local(local_name: impl Into<String>) -> Self {
        Self::new("", local_name)
    }

    /// Create a QName in the XML Schema namespace
    pub fn xsd(local_name: impl Into<String>) -> Self {
        Self::new(XSD_NAMESPACE, local_name)
    }

    /// Whether the name is in the XML Schema namespace
    pub fn is_xsd(&self) -> bool {
        self.namespace == XSD_NAMESPACE
    }

    /// Whether the name has no namespace
    pub fn has_no_namespace(&self) -> bool {
        self.namespace.is_empty()
    }
}

impl fmt::Display for QName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.namespace.is_empty() {
            f.write_str(&self.local_name)
        } else {
            write!(f, "{{{}}}{}", self.namespace, self.local_name)
        }
    }
}

/// Namespace context for resolving prefixes
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NamespaceContext {
    /// Mapping from prefix to namespace URI
    prefixes: HashMap<Prefix, NamespaceUri>,
    /// Default namespace (no prefix)
    default_namespace: Option<NamespaceUri>,
}

impl NamespaceContext {
    /// Create a new namespace context with only the `xml` prefix bound
    pub fn new() -> Self {
        let mut prefixes = HashMap::new();
        prefixes.insert("xml".to_string(), XML_NAMESPACE.to_string());
        Self {
            prefixes,
            default_namespace: None,
        }
    }

    /// Add a namespace prefix mapping
    pub fn add_prefix(&mut self, prefix: impl Into<String>, namespace: impl Into<String>) {
        self.prefixes.insert(prefix.into(), namespace.into());
    }

    /// Set the default namespace; an empty URI undeclares it
    pub fn set_default_namespace(&mut self, namespace: impl Into<String>) {
        let namespace = namespace.into();
        self.default_namespace = if namespace.is_empty() {
            None
        } else {
            Some(namespace)
        };
    }

    /// Get the namespace for a prefix
    pub fn get_namespace(&self, prefix: &str) -> Option<&str> {
        self.prefixes.get(prefix).map(|s| s.as_str())
    }

    /// Get the default namespace
    pub fn get_default_namespace(&self) -> Option<&str> {
        self.default_namespace.as_deref()
    }

    /// Prefixes bound to a namespace, sorted
    pub fn prefixes_for(&self, namespace: &str) -> Vec<&str> {
        let mut out: Vec<&str> = self
            .prefixes
            .iter()
            .filter(|(_, ns)| ns.as_str() == namespace)
            .map(|(p, _)| p.as_str())
            .collect();
        out.sort_unstable();
        out
    }

    /// Resolve a prefixed name to a QName
    ///
    /// An unprefixed name takes the default namespace if one is in scope,
    /// otherwise no namespace. Both parts must be NCNames.
    pub fn resolve(&self, prefixed_name: &str) -> Result<QName> {
        let (prefix, local) = match prefixed_name.split_once(':') {
            Some((p, l)) => (Some(p), l),
            None => (None, prefixed_name),
        };
        if !is_valid_ncname(local) || prefix.map_or(false, |p| !is_valid_ncname(p)) {
            return Err(Error::lexical("QName", prefixed_name));
        }
        match prefix {
            Some(prefix) => {
                let namespace = self.get_namespace(prefix).ok_or_else(|| {
                    Error::constraint(format!(
                        "unknown namespace prefix '{}' in '{}'",
                        prefix, prefixed_name
                    ))
                })?;
                Ok(QName::new(namespace, local))
            }
            None => Ok(QName::new(
                self.default_namespace.clone().unwrap_or_default(),
                local,
            )),
        }
    }

    /// Resolve a prefixed name, using no namespace for unprefixed names
    ///
    /// Used for names that never take the default namespace, such as
    /// unprefixed XPath name tests.
    pub fn resolve_without_default(&self, prefixed_name: &str) -> Result<QName> {
        if prefixed_name.contains(':') {
            self.resolve(prefixed_name)
        } else if is_valid_ncname(prefixed_name) {
            Ok(QName::local(prefixed_name))
        } else {
            Err(Error::lexical("QName", prefixed_name))
        }
    }
}

impl Default for NamespaceContext {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_qname_creation() {
        let qname = QName::new("http://example.com", "element");
        assert_eq!(qname.namespace, "http://example.com");
        assert_eq!(qname.local_name, "element");
        assert!(QName::xsd("string").is_xsd());
    }

    #[test]
    fn test_qname_to_string() {
        let qname = QName::new("http://example.com", "element");
        assert_eq!(qname.to_string(), "{http://example.com}element");

        let qname_local = QName::local("element");
        assert_eq!(qname_local.to_string(), "element");
    }

    #[test]
    fn test_qname_ordering() {
        let mut names = vec![
            QName::new("urn:b", "a"),
            QName::local("z"),
            QName::new("urn:a", "b"),
        ];
        names.sort();
        assert_eq!(names[0], QName::local("z"));
        assert_eq!(names[1], QName::new("urn:a", "b"));
    }

    #[test]
    fn test_namespace_context() {
        let mut ctx = NamespaceContext::new();
        ctx.add_prefix("xs", XSD_NAMESPACE);
        ctx.set_default_namespace("http://example.com");

        assert_eq!(ctx.get_namespace("xs"), Some(XSD_NAMESPACE));
        assert_eq!(ctx.get_namespace("xml"), Some(XML_NAMESPACE));
        assert_eq!(ctx.get_default_namespace(), Some("http://example.com"));

        ctx.set_default_namespace("");
        assert_eq!(ctx.get_default_namespace(), None);
    }

    #[test]
    fn test_resolve_prefixed_name() {
        let mut ctx = NamespaceContext::new();
        ctx.add_prefix("xs", XSD_NAMESPACE);

        let qname = ctx.resolve("xs:element").unwrap();
        assert_eq!(qname.namespace, XSD_NAMESPACE);
        assert_eq!(qname.local_name, "element");

        assert_eq!(ctx.resolve("plain").unwrap(), QName::local("plain"));
        assert!(ctx.resolve("nope:x").is_err());
        assert!(ctx.resolve("1bad").is_err());
    }

    #[test]
    fn test_resolve_default_namespace() {
        let mut ctx = NamespaceContext::new();
        ctx.set_default_namespace("urn:d");
        assert_eq!(ctx.resolve("a").unwrap(), QName::new("urn:d", "a"));
        assert_eq!(ctx.resolve_without_default("a").unwrap(), QName::local("a"));
    }
}
