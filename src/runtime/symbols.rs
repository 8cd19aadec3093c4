//! Namespace and symbol interning
//!
//! Namespaces are interned first, then local names per namespace. A symbol
//! row points into a shared blob of local-name bytes; the symbols of each
//! namespace are also kept sorted by local name for lookup.

use std::collections::HashMap;

use serde::Serialize;

use crate::namespaces::{QName, XML_NAMESPACE, XSI_NAMESPACE};

use super::hash::{Fnv64, StableHash};

/// Dense namespace ID; 0 is none
pub type NamespaceId = u32;
/// Dense symbol ID; 0 is none
pub type SymbolId = u32;

/// ID of the absent namespace
pub const NO_NAMESPACE: NamespaceId = 1;
/// ID of the XML Schema instance namespace
pub const XSI_NAMESPACE_ID: NamespaceId = 2;
/// ID of the XML namespace
pub const XML_NAMESPACE_ID: NamespaceId = 3;

/// An interned QName
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize)]
pub struct SymbolRow {
    /// Namespace
    pub namespace: NamespaceId,
    /// Offset of the local name in the blob
    pub off: u32,
    /// Length of the local name
    pub len: u32,
}

/// Interned namespaces and QNames
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SymbolTable {
    /// Namespace URIs by ID; slot 0 is unused
    pub namespaces: Vec<String>,
    /// Symbols by ID; slot 0 is unused
    pub symbols: Vec<SymbolRow>,
    /// Local-name bytes
    pub blob: Vec<u8>,
    /// Symbols of each namespace sorted by local name, indexed by namespace ID
    pub by_namespace: Vec<Vec<SymbolId>>,
    #[serde(skip)]
    namespace_index: HashMap<String, NamespaceId>,
    #[serde(skip)]
    symbol_index: HashMap<(NamespaceId, String), SymbolId>,
}

impl Default for SymbolTable {
    fn default() -> Self {
        Self::new()
    }
}

impl SymbolTable {
    /// Table with the well-known namespaces reserved
    pub fn new() -> Self {
        let mut table = Self {
            namespaces: vec![String::new()],
            symbols: vec![SymbolRow::default()],
            blob: Vec::new(),
            by_namespace: vec![Vec::new()],
            namespace_index: HashMap::new(),
            symbol_index: HashMap::new(),
        };
        table.intern_namespace("");
        table.intern_namespace(XSI_NAMESPACE);
        table.intern_namespace(XML_NAMESPACE);
        table
    }

    /// Intern a namespace URI
    pub fn intern_namespace(&mut self, uri: &str) -> NamespaceId {
        if let Some(id) = self.namespace_index.get(uri) {
            return *id;
        }
        let id = self.namespaces.len() as NamespaceId;
        self.namespaces.push(uri.to_string());
        self.by_namespace.push(Vec::new());
        self.namespace_index.insert(uri.to_string(), id);
        id
    }

    /// Intern a QName
    pub fn intern(&mut self, name: &QName) -> SymbolId {
        let ns = self.intern_namespace(&name.namespace);
        let key = (ns, name.local_name.clone());
        if let Some(id) = self.symbol_index.get(&key) {
            return *id;
        }
        let id = self.symbols.len() as SymbolId;
        self.symbols.push(SymbolRow {
            namespace: ns,
            off: self.blob.len() as u32,
            len: name.local_name.len() as u32,
        });
        self.blob.extend_from_slice(name.local_name.as_bytes());
        let local = &name.local_name;
        let list = &mut self.by_namespace[ns as usize];
        let blob = &self.blob;
        let symbols = &self.symbols;
        let at = list
            .binary_search_by(|s| local_of(blob, symbols, *s).cmp(local.as_str()))
            .unwrap_or_else(|i| i);
        list.insert(at, id);
        self.symbol_index.insert(key, id);
        id
    }

    /// ID of a namespace URI
    pub fn namespace_id(&self, uri: &str) -> Option<NamespaceId> {
        self.namespace_index.get(uri).copied()
    }

    /// ID of a QName
    pub fn lookup(&self, namespace: &str, local: &str) -> Option<SymbolId> {
        let ns = self.namespace_id(namespace)?;
        let list = self.by_namespace.get(ns as usize)?;
        list.binary_search_by(|s| self.local(*s).cmp(local))
            .ok()
            .map(|i| list[i])
    }

    /// Local name of a symbol
    pub fn local(&self, id: SymbolId) -> &str {
        local_of(&self.blob, &self.symbols, id)
    }

    /// Namespace URI of a symbol
    pub fn namespace_of(&self, id: SymbolId) -> &str {
        self.symbols
            .get(id as usize)
            .and_then(|s| self.namespaces.get(s.namespace as usize))
            .map_or("", String::as_str)
    }

    /// Number of symbol IDs, slot 0 included
    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    /// Whether no symbol was interned
    pub fn is_empty(&self) -> bool {
        self.symbols.len() <= 1
    }
}

fn local_of<'a>(blob: &'a [u8], symbols: &[SymbolRow], id: SymbolId) -> &'a str {
    symbols
        .get(id as usize)
        .and_then(|s| blob.get(s.off as usize..(s.off + s.len) as usize))
        .and_then(|b| std::str::from_utf8(b).ok())
        .unwrap_or("")
}

impl StableHash for SymbolRow {
    fn stable_hash(&self, h: &mut Fnv64) {
        h.u32(self.namespace);
        h.u32(self.off);
        h.u32(self.len);
    }
}

impl StableHash for SymbolTable {
    fn stable_hash(&self, h: &mut Fnv64) {
        self.namespaces.stable_hash(h);
        self.symbols.stable_hash(h);
        h.blob(&self.blob);
        self.by_namespace.stable_hash(h);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_well_known_namespaces() {
        let table = SymbolTable::new();
        assert_eq!(table.namespace_id(""), Some(NO_NAMESPACE));
        assert_eq!(table.namespace_id(XSI_NAMESPACE), Some(XSI_NAMESPACE_ID));
        assert_eq!(table.namespace_id(XML_NAMESPACE), Some(XML_NAMESPACE_ID));
        assert!(table.is_empty());
    }

    #[test]
    fn test_interning_and_lookup() {
        let mut table = SymbolTable::new();
        let b = table.intern(&QName::new("urn:a", "b"));
        let a = table.intern(&QName::new("urn:a", "a"));
        let other = table.intern(&QName::local("a"));
        assert_eq!(table.intern(&QName::new("urn:a", "b")), b);
        assert_ne!(a, other);
        assert_eq!(table.lookup("urn:a", "a"), Some(a));
        assert_eq!(table.lookup("", "a"), Some(other));
        assert_eq!(table.lookup("urn:a", "c"), None);
        assert_eq!(table.local(b), "b");
        assert_eq!(table.namespace_of(b), "urn:a");
        let ns = table.namespace_id("urn:a").unwrap();
        assert_eq!(table.by_namespace[ns as usize], vec![a, b]);
    }
}
