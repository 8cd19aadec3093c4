//! Wildcard rule interning

use std::collections::HashMap;

use crate::runtime::{NamespaceId, NamespaceKind, SymbolTable, WildcardId, WildcardRule};
use crate::schema::{AttributeWildcard, NamespaceSet, ProcessContents, Wildcard};

type RuleKey = (NamespaceSet, ProcessContents, String);

/// Element and attribute wildcard rules of one build
#[derive(Debug)]
pub(super) struct WildcardTable {
    pub rules: Vec<WildcardRule>,
    pub namespaces: Vec<NamespaceId>,
    index: HashMap<RuleKey, WildcardId>,
}

impl WildcardTable {
    pub fn new() -> Self {
        Self {
            rules: vec![WildcardRule::default()],
            namespaces: Vec::new(),
            index: HashMap::new(),
        }
    }

    /// Rule of an element wildcard
    pub fn element(&mut self, symbols: &mut SymbolTable, w: &Wildcard) -> WildcardId {
        self.add(symbols, w.namespace_set(), w.process_contents, &w.target_namespace)
    }

    /// Rule of an effective attribute wildcard
    pub fn attribute(&mut self, symbols: &mut SymbolTable, w: &AttributeWildcard) -> WildcardId {
        self.add(
            symbols,
            w.namespaces.clone(),
            w.process_contents,
            &w.target_namespace,
        )
    }

    fn add(
        &mut self,
        symbols: &mut SymbolTable,
        set: NamespaceSet,
        process_contents: ProcessContents,
        target: &str,
    ) -> WildcardId {
        let key = (set, process_contents, target.to_string());
        if let Some(id) = self.index.get(&key) {
            return *id;
        }
        let (set, _, _) = &key;
        let (kind, listed) = match set {
            NamespaceSet::Any => (NamespaceKind::Any, None),
            NamespaceSet::Not(s) => (NamespaceKind::Not, Some(s)),
            NamespaceSet::Only(s) => (NamespaceKind::Enumeration, Some(s)),
        };
        let off = self.namespaces.len() as u32;
        let mut rule = WildcardRule {
            kind,
            off,
            process_contents: process_contents.code(),
            target_namespace: symbols.intern_namespace(target),
            ..Default::default()
        };
        if let Some(listed) = listed {
            // BTreeSet order keeps the slice stable across builds
            for ns in listed {
                self.namespaces.push(symbols.intern_namespace(ns));
            }
            rule.len = listed.len() as u32;
            rule.has_local = listed.contains("");
            rule.has_target = listed.contains(target);
        }
        let id = self.rules.len() as WildcardId;
        self.rules.push(rule);
        self.index.insert(key, id);
        id
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::NO_NAMESPACE;
    use crate::schema::NamespaceConstraint;

    #[test]
    fn test_other_lists_target_and_absent() {
        let mut symbols = SymbolTable::new();
        let mut table = WildcardTable::new();
        let w = Wildcard::new(
            NamespaceConstraint::Other("urn:t".to_string()),
            ProcessContents::Lax,
            "urn:t",
        );
        let id = table.element(&mut symbols, &w);
        assert_eq!(id, 1);
        let rule = table.rules[id as usize];
        assert_eq!(rule.kind, NamespaceKind::Not);
        assert!(rule.has_local);
        assert!(rule.has_target);
        assert_eq!(rule.process_contents, 1);
        let listed = &table.namespaces[rule.off as usize..(rule.off + rule.len) as usize];
        assert_eq!(listed, &[NO_NAMESPACE, symbols.namespace_id("urn:t").unwrap()]);
        assert_eq!(table.element(&mut symbols, &w), id);
    }

    #[test]
    fn test_any_lists_nothing() {
        let mut symbols = SymbolTable::new();
        let mut table = WildcardTable::new();
        let w = Wildcard::new(NamespaceConstraint::Any, ProcessContents::Skip, "");
        let id = table.element(&mut symbols, &w);
        let rule = table.rules[id as usize];
        assert_eq!(rule.kind, NamespaceKind::Any);
        assert_eq!(rule.len, 0);
        assert_eq!(rule.target_namespace, NO_NAMESPACE);
        assert!(table.namespaces.is_empty());
    }
}
