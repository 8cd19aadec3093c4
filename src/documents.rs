//! XML document handling
//!
//! A minimal namespace-aware element tree built on `quick-xml`, used to read
//! schema documents. Element names are resolved against the in-scope namespace
//! declarations; each element keeps a shared handle to its namespace context so
//! that QName-valued attributes (type references, facet values, XPath
//! expressions) can be resolved later.

use std::sync::Arc;

use indexmap::IndexMap;
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;

use crate::error::{Error, Result};
use crate::namespaces::{NamespaceContext, QName};

/// XML Element in the document tree
#[derive(Debug, Clone)]
pub struct Element {
    /// Element qualified name, namespace resolved
    pub qname: QName,
    /// Element attributes in source order, namespace declarations excluded
    pub attributes: IndexMap<QName, String>,
    /// Text content (if any)
    pub text: Option<String>,
    /// Child elements
    pub children: Vec<Element>,
    /// Namespace context in scope for this element
    pub namespaces: Arc<NamespaceContext>,
}

impl Element {
    /// Create a new element
    pub fn new(qname: QName) -> Self {
        Self {
            qname,
            attributes: IndexMap::new(),
            text: None,
            children: Vec::new(),
            namespaces: Arc::new(NamespaceContext::new()),
        }
    }

    /// Get the local name of the element
    pub fn local_name(&self) -> &str {
        &self.qname.local_name
    }

    /// Get the namespace of the element
    pub fn namespace(&self) -> &str {
        &self.qname.namespace
    }

    /// Get an unqualified attribute value by local name
    pub fn get_attribute(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(qname, _)| qname.namespace.is_empty() && qname.local_name == name)
            .map(|(_, value)| value.as_str())
    }

    /// Get an attribute value by qualified name
    pub fn get_attribute_qname(&self, qname: &QName) -> Option<&str> {
        self.attributes.get(qname).map(|s| s.as_str())
    }

    /// Add a child element
    pub fn add_child(&mut self, child: Element) {
        self.children.push(child);
    }

    /// Append text content
    pub fn push_text(&mut self, text: &str) {
        match &mut self.text {
            Some(existing) => existing.push_str(text),
            None => self.text = Some(text.to_string()),
        }
    }

    /// Find child elements by namespace and local name
    pub fn find_children<'a>(
        &'a self,
        namespace: &'a str,
        local_name: &'a str,
    ) -> impl Iterator<Item = &'a Element> + 'a {
        self.children
            .iter()
            .filter(move |e| e.namespace() == namespace && e.local_name() == local_name)
    }

    /// Resolve a QName-valued attribute against this element's namespace context
    pub fn resolve_qname(&self, lexical: &str) -> Result<QName> {
        self.namespaces.resolve(lexical.trim())
    }
}

/// XML Document representation
#[derive(Debug, Clone)]
pub struct Document {
    /// Root element of the document
    pub root: Element,
    /// Location string the document was supplied with
    pub location: String,
}

impl Document {
    /// Parse an XML document from a string
    pub fn from_string(xml: &str, location: impl Into<String>) -> Result<Self> {
        let location = location.into();
        let mut reader = Reader::from_str(xml);
        reader.trim_text(true);

        let mut stack: Vec<Element> = Vec::new();
        let mut root = None;

        loop {
            match reader.read_event() {
                Ok(Event::Start(e)) => {
                    let element = Self::parse_element(&e, stack.last())?;
                    stack.push(element);
                }
                Ok(Event::End(_)) => {
                    if let Some(current) = stack.pop() {
                        match stack.last_mut() {
                            Some(parent) => parent.add_child(current),
                            None => root = Some(current),
                        }
                    }
                }
                Ok(Event::Empty(e)) => {
                    let element = Self::parse_element(&e, stack.last())?;
                    match stack.last_mut() {
                        Some(parent) => parent.add_child(element),
                        None => root = Some(element),
                    }
                }
                Ok(Event::Text(e)) => {
                    if let Some(current) = stack.last_mut() {
                        let text = e
                            .unescape()
                            .map_err(|e| Error::Xml(format!("failed to unescape text: {}", e)))?;
                        current.push_text(&text);
                    }
                }
                Ok(Event::CData(e)) => {
                    if let Some(current) = stack.last_mut() {
                        let bytes = e.into_inner();
                        let text = std::str::from_utf8(&bytes)
                            .map_err(|e| Error::Xml(format!("invalid CDATA: {}", e)))?;
                        current.push_text(text);
                    }
                }
                Ok(Event::Eof) => break,
                Err(e) => {
                    return Err(Error::Xml(format!(
                        "error parsing {} at position {}: {}",
                        location,
                        reader.buffer_position(),
                        e
                    )))
                }
                _ => {}
            }
        }

        if !stack.is_empty() {
            return Err(Error::Xml(format!("unclosed element in {}", location)));
        }
        let root =
            root.ok_or_else(|| Error::Xml(format!("no root element in {}", location)))?;
        Ok(Self { root, location })
    }

    /// Parse element from BytesStart event, inheriting the parent's namespaces
    fn parse_element(start: &BytesStart, parent: Option<&Element>) -> Result<Element> {
        let name = std::str::from_utf8(start.name().as_ref())
            .map_err(|e| Error::Xml(format!("invalid element name: {}", e)))?
            .to_string();

        let mut namespaces = match parent {
            Some(p) => (*p.namespaces).clone(),
            None => NamespaceContext::new(),
        };
        let mut raw_attributes = Vec::new();

        for attr_result in start.attributes() {
            let attr =
                attr_result.map_err(|e| Error::Xml(format!("failed to parse attribute: {}", e)))?;
            let attr_name = std::str::from_utf8(attr.key.as_ref())
                .map_err(|e| Error::Xml(format!("invalid attribute name: {}", e)))?
                .to_string();
            let attr_value = attr
                .unescape_value()
                .map_err(|e| Error::Xml(format!("failed to unescape attribute value: {}", e)))?
                .to_string();

            if attr_name == "xmlns" {
                namespaces.set_default_namespace(attr_value);
            } else if let Some(prefix) = attr_name.strip_prefix("xmlns:") {
                namespaces.add_prefix(prefix, attr_value);
            } else {
                raw_attributes.push((attr_name, attr_value));
            }
        }

        let qname = namespaces
            .resolve(&name)
            .map_err(|e| Error::Xml(format!("element <{}>: {}", name, e)))?;
        let mut element = Element::new(qname);

        for (attr_name, value) in raw_attributes {
            let attr_qname = namespaces
                .resolve_without_default(&attr_name)
                .map_err(|e| Error::Xml(format!("attribute '{}': {}", attr_name, e)))?;
            element.attributes.insert(attr_qname, value);
        }
        element.namespaces = Arc::new(namespaces);

        Ok(element)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::namespaces::XSD_NAMESPACE;

    #[test]
    fn test_parse_simple_xml() {
        let xml = r#"<root><child>text</child></root>"#;
        let doc = Document::from_string(xml, "mem").unwrap();

        let root = doc.root;
        assert_eq!(root.local_name(), "root");
        assert_eq!(root.children.len(), 1);
        assert_eq!(root.children[0].local_name(), "child");
        assert_eq!(root.children[0].text.as_deref(), Some("text"));
    }

    #[test]
    fn test_parse_with_attributes() {
        let xml = r#"<root attr1="value1" attr2="value2"><child/></root>"#;
        let doc = Document::from_string(xml, "mem").unwrap();

        assert_eq!(doc.root.get_attribute("attr1"), Some("value1"));
        assert_eq!(doc.root.get_attribute("attr2"), Some("value2"));
        let keys: Vec<_> = doc.root.attributes.keys().map(|k| k.local_name.as_str()).collect();
        assert_eq!(keys, vec!["attr1", "attr2"]);
    }

    #[test]
    fn test_namespaces_are_resolved_and_inherited() {
        let xml = r#"<xs:schema xmlns:xs="http://www.w3.org/2001/XMLSchema" xmlns="urn:d">
            <xs:element name="a" type="T"/>
        </xs:schema>"#;
        let doc = Document::from_string(xml, "mem").unwrap();

        assert_eq!(doc.root.namespace(), XSD_NAMESPACE);
        let child = doc.root.find_children(XSD_NAMESPACE, "element").next().unwrap();
        assert_eq!(child.get_attribute("name"), Some("a"));
        assert_eq!(child.resolve_qname("T").unwrap(), QName::new("urn:d", "T"));
    }

    #[test]
    fn test_unknown_prefix_is_error() {
        let xml = r#"<p:root/>"#;
        assert!(matches!(
            Document::from_string(xml, "mem"),
            Err(Error::Xml(_))
        ));
    }

    #[test]
    fn test_malformed_xml() {
        assert!(Document::from_string("<a><b></a>", "mem").is_err());
        assert!(Document::from_string("", "mem").is_err());
    }
}
