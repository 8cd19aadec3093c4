//! Element, attribute, attribute-group, notation and identity-constraint
//! declarations

use std::fmt;
use std::sync::Arc;

use serde::Serialize;

use crate::namespaces::{NamespaceContext, QName};

use super::types::{DerivationSet, TypeKey, TypeRef};
use super::wildcards::Wildcard;
use super::AttrHandle;

/// Element and attribute form
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
pub enum Form {
    /// Local names are in no namespace
    #[default]
    Unqualified,
    /// Local names take the target namespace
    Qualified,
}

impl Form {
    /// Parse a `form`/`*FormDefault` attribute value
    pub fn from_attr(s: &str) -> Option<Self> {
        match s.trim() {
            "qualified" => Some(Self::Qualified),
            "unqualified" => Some(Self::Unqualified),
            _ => None,
        }
    }
}

/// Identity-constraint category
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum ConstraintCategory {
    /// `xs:unique`
    Unique,
    /// `xs:key`
    Key,
    /// `xs:keyref`
    Keyref,
}

impl ConstraintCategory {
    /// Parse from an element local name
    pub fn from_local_name(name: &str) -> Option<Self> {
        match name {
            "unique" => Some(Self::Unique),
            "key" => Some(Self::Key),
            "keyref" => Some(Self::Keyref),
            _ => None,
        }
    }

    /// Runtime code
    pub fn code(&self) -> u8 {
        match self {
            Self::Unique => 0,
            Self::Key => 1,
            Self::Keyref => 2,
        }
    }
}

impl fmt::Display for ConstraintCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unique => write!(f, "unique"),
            Self::Key => write!(f, "key"),
            Self::Keyref => write!(f, "keyref"),
        }
    }
}

/// Identity constraint declared on an element
#[derive(Debug, Clone, PartialEq)]
pub struct IdentityConstraint {
    /// Category
    pub category: ConstraintCategory,
    /// Name in the target namespace
    pub name: QName,
    /// Selector XPath
    pub selector: String,
    /// Field XPaths in order
    pub fields: Vec<String>,
    /// Referenced key or unique, for keyrefs
    pub refer: Option<QName>,
    /// Namespace context of the constraint element
    pub namespaces: Arc<NamespaceContext>,
}

/// Element declaration
///
/// References carry the referenced name in `name` and nothing else.
#[derive(Debug, Clone, PartialEq)]
pub struct ElementDecl {
    /// Name, or the referenced name for references
    pub name: QName,
    /// `ref=` element
    pub is_reference: bool,
    /// Top-level declaration
    pub global: bool,
    /// Declared type; `None` means the ur-type or the head's type
    pub type_ref: Option<TypeRef>,
    /// Effective type, set by the resolver
    pub resolved_type: Option<TypeKey>,
    /// Substitution group head
    pub substitution_group: Option<QName>,
    /// `default`
    pub default: Option<String>,
    /// `fixed`
    pub fixed: Option<String>,
    /// `nillable`
    pub nillable: bool,
    /// `abstract`
    pub is_abstract: bool,
    /// `block`
    pub block: DerivationSet,
    /// `final`
    pub final_set: DerivationSet,
    /// Identity constraints
    pub constraints: Vec<IdentityConstraint>,
    /// Namespace context, for QName-valued defaults
    pub namespaces: Arc<NamespaceContext>,
}

impl ElementDecl {
    /// Declaration with the given name and default everything else
    pub fn new(name: QName) -> Self {
        Self {
            name,
            is_reference: false,
            global: false,
            type_ref: None,
            resolved_type: None,
            substitution_group: None,
            default: None,
            fixed: None,
            nillable: false,
            is_abstract: false,
            block: DerivationSet::empty(),
            final_set: DerivationSet::empty(),
            constraints: Vec::new(),
            namespaces: Arc::new(NamespaceContext::new()),
        }
    }

    /// Reference to a global element
    pub fn reference(name: QName) -> Self {
        Self {
            is_reference: true,
            ..Self::new(name)
        }
    }
}

/// Attribute use
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
pub enum AttributeUse {
    /// May appear
    #[default]
    Optional,
    /// Must appear
    Required,
    /// Must not appear
    Prohibited,
}

impl AttributeUse {
    /// Parse a `use` attribute value
    pub fn from_attr(s: &str) -> Option<Self> {
        match s.trim() {
            "optional" => Some(Self::Optional),
            "required" => Some(Self::Required),
            "prohibited" => Some(Self::Prohibited),
            _ => None,
        }
    }

    /// Runtime code
    pub fn code(&self) -> u8 {
        match self {
            Self::Optional => 0,
            Self::Required => 1,
            Self::Prohibited => 2,
        }
    }
}

impl fmt::Display for AttributeUse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Optional => write!(f, "optional"),
            Self::Required => write!(f, "required"),
            Self::Prohibited => write!(f, "prohibited"),
        }
    }
}

/// Attribute declaration or attribute use
#[derive(Debug, Clone, PartialEq)]
pub struct AttributeDecl {
    /// Name, or the referenced name for references
    pub name: QName,
    /// `ref=` attribute
    pub is_reference: bool,
    /// Top-level declaration
    pub global: bool,
    /// Declared type; `None` means `anySimpleType`
    pub type_ref: Option<TypeRef>,
    /// Effective type, set by the resolver
    pub resolved_type: Option<TypeKey>,
    /// `use`, meaningful on local uses
    pub use_kind: AttributeUse,
    /// `default`
    pub default: Option<String>,
    /// `fixed`
    pub fixed: Option<String>,
    /// Namespace context, for QName-valued defaults
    pub namespaces: Arc<NamespaceContext>,
}

impl AttributeDecl {
    /// Declaration with the given name and default everything else
    pub fn new(name: QName) -> Self {
        Self {
            name,
            is_reference: false,
            global: false,
            type_ref: None,
            resolved_type: None,
            use_kind: AttributeUse::Optional,
            default: None,
            fixed: None,
            namespaces: Arc::new(NamespaceContext::new()),
        }
    }

    /// Reference to a global attribute
    pub fn reference(name: QName) -> Self {
        Self {
            is_reference: true,
            ..Self::new(name)
        }
    }
}

/// Named attribute group
#[derive(Debug, Clone, PartialEq, Default)]
pub struct AttributeGroup {
    /// Name
    pub name: QName,
    /// Attribute declarations and references
    pub attributes: Vec<AttrHandle>,
    /// Nested attribute-group references
    pub attribute_group_refs: Vec<QName>,
    /// Attribute wildcard
    pub any_attribute: Option<Wildcard>,
}

/// Notation declaration
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct NotationDecl {
    /// Name
    pub name: QName,
    /// `public`
    pub public: Option<String>,
    /// `system`
    pub system: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_attr_parsing() {
        assert_eq!(Form::from_attr("qualified"), Some(Form::Qualified));
        assert_eq!(AttributeUse::from_attr(" required "), Some(AttributeUse::Required));
        assert_eq!(AttributeUse::from_attr("sometimes"), None);
        assert_eq!(
            ConstraintCategory::from_local_name("keyref"),
            Some(ConstraintCategory::Keyref)
        );
    }

    #[test]
    fn test_reference_constructors() {
        let e = ElementDecl::reference(QName::new("urn:x", "a"));
        assert!(e.is_reference);
        assert!(!e.global);
        let a = AttributeDecl::reference(QName::local("b"));
        assert!(a.is_reference);
        assert_eq!(a.use_kind, AttributeUse::Optional);
    }
}
