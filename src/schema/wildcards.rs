//! Wildcards
//!
//! `xs:any` and `xs:anyAttribute`: a namespace constraint plus a
//! processContents mode. The constraint is kept as written; [`NamespaceSet`]
//! is its set form, on which the XSD 1.0 attribute-wildcard union and
//! intersection are computed.

use std::collections::BTreeSet;
use std::fmt;

use serde::Serialize;

use crate::error::{Error, ParseError, Result};

/// Process contents mode for wildcards
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
pub enum ProcessContents {
    /// Validate strictly - element/attribute must be declared
    #[default]
    Strict,
    /// Validate if declaration found, otherwise accept
    Lax,
    /// Skip validation entirely
    Skip,
}

impl ProcessContents {
    /// Parse from string value
    pub fn from_attr(s: &str) -> Option<Self> {
        match s.trim() {
            "strict" => Some(Self::Strict),
            "lax" => Some(Self::Lax),
            "skip" => Some(Self::Skip),
            _ => None,
        }
    }

    /// Runtime code
    pub fn code(&self) -> u8 {
        match self {
            Self::Strict => 0,
            Self::Lax => 1,
            Self::Skip => 2,
        }
    }
}

impl fmt::Display for ProcessContents {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Strict => write!(f, "strict"),
            Self::Lax => write!(f, "lax"),
            Self::Skip => write!(f, "skip"),
        }
    }
}

/// Entry of an enumerated namespace list
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum NamespaceItem {
    /// A namespace URI; empty is the absent namespace (`##local`)
    Uri(String),
    /// `##targetNamespace`, bound to the wildcard's target namespace
    TargetNamespace,
}

/// Namespace constraint as written
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum NamespaceConstraint {
    /// `##any`
    Any,
    /// Any namespace except absent, produced by wildcard unions
    NotAbsent,
    /// `##other`: not the target namespace and not absent
    Other(String),
    /// Only the given target namespace
    TargetNamespace(String),
    /// Only the absent namespace
    Local,
    /// Enumerated namespaces
    List(Vec<NamespaceItem>),
}

impl Default for NamespaceConstraint {
    fn default() -> Self {
        Self::Any
    }
}

impl NamespaceConstraint {
    /// Create from a `namespace` attribute value
    pub fn from_namespace_attr(value: &str, target_namespace: &str) -> Result<Self> {
        match value.trim() {
            "##any" => Ok(Self::Any),
            "##other" => Ok(Self::Other(target_namespace.to_string())),
            "##targetNamespace" => Ok(Self::TargetNamespace(target_namespace.to_string())),
            "##local" => Ok(Self::Local),
            v => {
                let mut items = Vec::new();
                for token in v.split_whitespace() {
                    let item = match token {
                        "##local" => NamespaceItem::Uri(String::new()),
                        "##targetNamespace" => NamespaceItem::TargetNamespace,
                        s if s.starts_with("##") => {
                            return Err(ParseError::new(format!(
                                "wrong value '{}' in 'namespace' attribute",
                                s
                            ))
                            .into());
                        }
                        uri => NamespaceItem::Uri(uri.to_string()),
                    };
                    if !items.contains(&item) {
                        items.push(item);
                    }
                }
                Ok(Self::List(items))
            }
        }
    }
}

/// Set form of a namespace constraint
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum NamespaceSet {
    /// Every namespace, absent included
    Any,
    /// Every namespace except these; `""` is the absent namespace
    Not(BTreeSet<String>),
    /// Exactly these namespaces
    Only(BTreeSet<String>),
}

impl NamespaceSet {
    /// Set form of a written constraint
    pub fn from_constraint(constraint: &NamespaceConstraint, target_namespace: &str) -> Self {
        match constraint {
            NamespaceConstraint::Any => NamespaceSet::Any,
            NamespaceConstraint::NotAbsent => NamespaceSet::Not([String::new()].into()),
            NamespaceConstraint::Other(t) => {
                NamespaceSet::Not([t.clone(), String::new()].into_iter().collect())
            }
            NamespaceConstraint::TargetNamespace(t) => NamespaceSet::Only([t.clone()].into()),
            NamespaceConstraint::Local => NamespaceSet::Only([String::new()].into()),
            NamespaceConstraint::List(items) => NamespaceSet::Only(
                items
                    .iter()
                    .map(|item| match item {
                        NamespaceItem::Uri(u) => u.clone(),
                        NamespaceItem::TargetNamespace => target_namespace.to_string(),
                    })
                    .collect(),
            ),
        }
    }

    /// Whether a namespace is allowed
    pub fn allows(&self, namespace: &str) -> bool {
        match self {
            NamespaceSet::Any => true,
            NamespaceSet::Not(excluded) => !excluded.contains(namespace),
            NamespaceSet::Only(included) => included.contains(namespace),
        }
    }

    /// Whether the set is expressible as an XSD 1.0 namespace constraint
    ///
    /// XSD 1.0 negations exclude either the absent namespace alone or one
    /// namespace together with absent.
    pub fn is_expressible(&self) -> bool {
        match self {
            NamespaceSet::Not(excluded) => {
                excluded.contains("") && excluded.len() <= 2
            }
            _ => true,
        }
    }

    /// Whether nothing is allowed
    pub fn is_empty(&self) -> bool {
        matches!(self, NamespaceSet::Only(s) if s.is_empty())
    }

    fn normalize(self) -> Self {
        match self {
            NamespaceSet::Not(s) if s.is_empty() => NamespaceSet::Any,
            other => other,
        }
    }

    /// Set union
    pub fn union(&self, other: &NamespaceSet) -> NamespaceSet {
        use NamespaceSet::*;
        match (self, other) {
            (Any, _) | (_, Any) => Any,
            (Only(a), Only(b)) => Only(a.union(b).cloned().collect()),
            (Not(a), Not(b)) => Not(a.intersection(b).cloned().collect()).normalize(),
            (Not(a), Only(b)) | (Only(b), Not(a)) => {
                Not(a.difference(b).cloned().collect()).normalize()
            }
        }
    }

    /// Set intersection
    pub fn intersect(&self, other: &NamespaceSet) -> NamespaceSet {
        use NamespaceSet::*;
        match (self, other) {
            (Any, x) | (x, Any) => x.clone(),
            (Only(a), Only(b)) => Only(a.intersection(b).cloned().collect()),
            (Not(a), Not(b)) => Not(a.union(b).cloned().collect()),
            (Not(a), Only(b)) | (Only(b), Not(a)) => Only(b.difference(a).cloned().collect()),
        }
    }
}

impl fmt::Display for NamespaceSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let list = |s: &BTreeSet<String>| {
            s.iter()
                .map(|n| if n.is_empty() { "##local" } else { n.as_str() })
                .collect::<Vec<_>>()
                .join(" ")
        };
        match self {
            NamespaceSet::Any => write!(f, "##any"),
            NamespaceSet::Not(s) => write!(f, "not({})", list(s)),
            NamespaceSet::Only(s) => write!(f, "{}", list(s)),
        }
    }
}

/// Element or attribute wildcard
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Wildcard {
    /// Namespace constraint
    pub constraint: NamespaceConstraint,
    /// processContents mode
    pub process_contents: ProcessContents,
    /// Target namespace of the declaring schema document
    pub target_namespace: String,
}

impl Wildcard {
    /// Create a wildcard
    pub fn new(
        constraint: NamespaceConstraint,
        process_contents: ProcessContents,
        target_namespace: impl Into<String>,
    ) -> Self {
        Self {
            constraint,
            process_contents,
            target_namespace: target_namespace.into(),
        }
    }

    /// Set form of the constraint
    pub fn namespace_set(&self) -> NamespaceSet {
        NamespaceSet::from_constraint(&self.constraint, &self.target_namespace)
    }

    /// Whether a namespace is allowed
    pub fn allows(&self, namespace: &str) -> bool {
        self.namespace_set().allows(namespace)
    }
}

/// Effective attribute wildcard: set form plus processContents
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct AttributeWildcard {
    /// Allowed namespaces
    pub namespaces: NamespaceSet,
    /// processContents mode
    pub process_contents: ProcessContents,
    /// Target namespace the wildcard was declared under
    pub target_namespace: String,
}

impl AttributeWildcard {
    /// From a written wildcard
    pub fn from_wildcard(w: &Wildcard) -> Self {
        Self {
            namespaces: w.namespace_set(),
            process_contents: w.process_contents,
            target_namespace: w.target_namespace.clone(),
        }
    }

    /// Union used by extension; processContents comes from `self`
    pub fn union(&self, other: &AttributeWildcard) -> Result<AttributeWildcard> {
        let namespaces = self.namespaces.union(&other.namespaces);
        if !namespaces.is_expressible() {
            return Err(Error::constraint(format!(
                "attribute wildcard union of '{}' and '{}' is not expressible",
                self.namespaces, other.namespaces
            )));
        }
        Ok(AttributeWildcard {
            namespaces,
            process_contents: self.process_contents,
            target_namespace: self.target_namespace.clone(),
        })
    }

    /// Intersection used by restriction and attribute groups; processContents
    /// comes from `self`
    pub fn intersect(&self, other: &AttributeWildcard) -> Result<AttributeWildcard> {
        let namespaces = self.namespaces.intersect(&other.namespaces);
        if !namespaces.is_expressible() {
            return Err(Error::constraint(format!(
                "attribute wildcard intersection of '{}' and '{}' is not expressible",
                self.namespaces, other.namespaces
            )));
        }
        if namespaces.is_empty() {
            return Err(Error::constraint(format!(
                "attribute wildcard intersection of '{}' and '{}' is empty",
                self.namespaces, other.namespaces
            )));
        }
        Ok(AttributeWildcard {
            namespaces,
            process_contents: self.process_contents,
            target_namespace: self.target_namespace.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn set(items: &[&str]) -> BTreeSet<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_from_namespace_attr() {
        let c = NamespaceConstraint::from_namespace_attr("##local urn:a ##targetNamespace", "urn:t")
            .unwrap();
        assert_eq!(
            NamespaceSet::from_constraint(&c, "urn:t"),
            NamespaceSet::Only(set(&["", "urn:a", "urn:t"]))
        );
        assert!(NamespaceConstraint::from_namespace_attr("##bogus", "").is_err());
        let other = NamespaceConstraint::from_namespace_attr("##other", "urn:t").unwrap();
        let s = NamespaceSet::from_constraint(&other, "urn:t");
        assert!(!s.allows("urn:t"));
        assert!(!s.allows(""));
        assert!(s.allows("urn:x"));
    }

    #[test]
    fn test_union() {
        let other_a = NamespaceSet::Not(set(&["a", ""]));
        let other_b = NamespaceSet::Not(set(&["b", ""]));
        assert_eq!(other_a.union(&other_b), NamespaceSet::Not(set(&[""])));
        assert_eq!(
            other_a.union(&NamespaceSet::Only(set(&["a", ""]))),
            NamespaceSet::Any
        );
        assert!(!other_a
            .union(&NamespaceSet::Only(set(&[""])))
            .is_expressible());
    }

    #[test]
    fn test_intersection() {
        let other_a = NamespaceSet::Not(set(&["a", ""]));
        assert_eq!(
            other_a.intersect(&NamespaceSet::Only(set(&["a", "b"]))),
            NamespaceSet::Only(set(&["b"]))
        );
        assert!(!other_a
            .intersect(&NamespaceSet::Not(set(&["b", ""])))
            .is_expressible());
    }

    #[test]
    fn test_attribute_wildcard_errors() {
        let w = |ns: NamespaceSet| AttributeWildcard {
            namespaces: ns,
            process_contents: ProcessContents::Lax,
            target_namespace: String::new(),
        };
        let a = w(NamespaceSet::Only(set(&["a"])));
        let b = w(NamespaceSet::Only(set(&["b"])));
        assert!(a.intersect(&b).is_err());
        let u = a.union(&b).unwrap();
        assert_eq!(u.namespaces, NamespaceSet::Only(set(&["a", "b"])));
        assert_eq!(u.process_contents, ProcessContents::Lax);
    }
}
