//! Type definitions
//!
//! Simple and complex type definitions as read from schema documents. Type
//! references start out as names and are bound by the resolver to a
//! [`TypeKey`]: either a built-in or an index into the schema's type arena.

use std::fmt;
use std::sync::Arc;

use serde::Serialize;

use crate::error::{Error, Result};
use crate::namespaces::{NamespaceContext, QName};
use crate::values::WhiteSpace;

use super::builtins::Builtin;
use super::particles::Particle;
use super::wildcards::Wildcard;
use super::{AttrHandle, DefId};

/// Simple type variety
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Variety {
    /// Atomic values
    Atomic,
    /// Whitespace-separated lists of an item type
    List,
    /// Values of any member type
    Union,
}

impl fmt::Display for Variety {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Variety::Atomic => write!(f, "atomic"),
            Variety::List => write!(f, "list"),
            Variety::Union => write!(f, "union"),
        }
    }
}

/// A resolved type: built-in or schema-defined
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum TypeKey {
    /// XSD built-in type
    Builtin(Builtin),
    /// Type in the schema's type arena
    Def(DefId),
}

/// Reference to a type from a derivation, element or attribute
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TypeRef {
    /// Reference by name; `resolved` is filled by the resolver
    Named {
        /// Referenced name
        name: QName,
        /// Bound target
        resolved: Option<TypeKey>,
    },
    /// Anonymous type defined inline
    Inline(DefId),
}

impl TypeRef {
    /// Unbound reference by name
    pub fn named(name: QName) -> Self {
        TypeRef::Named {
            name,
            resolved: None,
        }
    }

    /// Reference already bound to a built-in
    pub fn builtin(builtin: Builtin) -> Self {
        TypeRef::Named {
            name: builtin.qname(),
            resolved: Some(TypeKey::Builtin(builtin)),
        }
    }

    /// Bound target, if any
    pub fn key(&self) -> Option<TypeKey> {
        match self {
            TypeRef::Named { resolved, .. } => *resolved,
            TypeRef::Inline(id) => Some(TypeKey::Def(*id)),
        }
    }

    /// Referenced name, for named references
    pub fn name(&self) -> Option<&QName> {
        match self {
            TypeRef::Named { name, .. } => Some(name),
            TypeRef::Inline(_) => None,
        }
    }

    /// Whether this is a named reference not yet bound
    pub fn is_placeholder(&self) -> bool {
        matches!(self, TypeRef::Named { resolved: None, .. })
    }
}

/// Constraining facet kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[allow(missing_docs)]
pub enum FacetKind {
    Length,
    MinLength,
    MaxLength,
    Pattern,
    Enumeration,
    WhiteSpace,
    MaxInclusive,
    MaxExclusive,
    MinInclusive,
    MinExclusive,
    TotalDigits,
    FractionDigits,
}

impl FacetKind {
    /// Facet element local name
    pub fn name(&self) -> &'static str {
        match self {
            FacetKind::Length => "length",
            FacetKind::MinLength => "minLength",
            FacetKind::MaxLength => "maxLength",
            FacetKind::Pattern => "pattern",
            FacetKind::Enumeration => "enumeration",
            FacetKind::WhiteSpace => "whiteSpace",
            FacetKind::MaxInclusive => "maxInclusive",
            FacetKind::MaxExclusive => "maxExclusive",
            FacetKind::MinInclusive => "minInclusive",
            FacetKind::MinExclusive => "minExclusive",
            FacetKind::TotalDigits => "totalDigits",
            FacetKind::FractionDigits => "fractionDigits",
        }
    }

    /// Parse a facet element local name
    pub fn from_local_name(name: &str) -> Option<Self> {
        Some(match name {
            "length" => FacetKind::Length,
            "minLength" => FacetKind::MinLength,
            "maxLength" => FacetKind::MaxLength,
            "pattern" => FacetKind::Pattern,
            "enumeration" => FacetKind::Enumeration,
            "whiteSpace" => FacetKind::WhiteSpace,
            "maxInclusive" => FacetKind::MaxInclusive,
            "maxExclusive" => FacetKind::MaxExclusive,
            "minInclusive" => FacetKind::MinInclusive,
            "minExclusive" => FacetKind::MinExclusive,
            "totalDigits" => FacetKind::TotalDigits,
            "fractionDigits" => FacetKind::FractionDigits,
            _ => return None,
        })
    }

    /// Whether the facet bounds the value space
    pub fn is_range(&self) -> bool {
        matches!(
            self,
            FacetKind::MaxInclusive
                | FacetKind::MaxExclusive
                | FacetKind::MinInclusive
                | FacetKind::MinExclusive
        )
    }

    /// Whether the facet is one of the length facets
    pub fn is_length(&self) -> bool {
        matches!(
            self,
            FacetKind::Length | FacetKind::MinLength | FacetKind::MaxLength
        )
    }

    /// Whether the facet is one of the digit facets
    pub fn is_digits(&self) -> bool {
        matches!(self, FacetKind::TotalDigits | FacetKind::FractionDigits)
    }
}

impl fmt::Display for FacetKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A facet as written in a restriction
#[derive(Debug, Clone, PartialEq)]
pub struct FacetDecl {
    /// Facet kind
    pub kind: FacetKind,
    /// Lexical value of the `value` attribute
    pub value: String,
    /// `fixed="true"`
    pub fixed: bool,
    /// Namespace context of the facet element, for QName-valued facets
    pub namespaces: Arc<NamespaceContext>,
}

impl FacetDecl {
    /// Create a facet with an empty namespace context
    pub fn new(kind: FacetKind, value: impl Into<String>) -> Self {
        Self {
            kind,
            value: value.into(),
            fixed: false,
            namespaces: Arc::new(NamespaceContext::new()),
        }
    }
}

/// Set of derivation methods, used for `final` and `block`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
pub struct DerivationSet(u8);

impl DerivationSet {
    /// Extension
    pub const EXTENSION: DerivationSet = DerivationSet(1);
    /// Restriction
    pub const RESTRICTION: DerivationSet = DerivationSet(2);
    /// List
    pub const LIST: DerivationSet = DerivationSet(4);
    /// Union
    pub const UNION: DerivationSet = DerivationSet(8);
    /// Substitution (element `block` only)
    pub const SUBSTITUTION: DerivationSet = DerivationSet(16);

    /// The empty set
    pub fn empty() -> Self {
        DerivationSet(0)
    }

    /// Raw bit mask
    pub fn bits(&self) -> u8 {
        self.0
    }

    /// Set from a raw bit mask; unknown bits are dropped
    pub fn from_bits(bits: u8) -> Self {
        DerivationSet(bits & 0x1f)
    }

    /// Whether no method is in the set
    pub fn is_empty(&self) -> bool {
        self.0 == 0
    }

    /// Whether every method in `other` is in the set
    pub fn contains(&self, other: DerivationSet) -> bool {
        self.0 & other.0 == other.0 && !other.is_empty()
    }

    /// Whether any method in `other` is in the set
    pub fn intersects(&self, other: DerivationSet) -> bool {
        self.0 & other.0 != 0
    }

    /// Set union
    pub fn union(&self, other: DerivationSet) -> DerivationSet {
        DerivationSet(self.0 | other.0)
    }

    /// Parse a `final`/`block` attribute value
    ///
    /// `allowed` is the set `#all` expands to; tokens outside it are errors.
    pub fn parse(value: &str, allowed: DerivationSet) -> Result<Self> {
        let value = value.trim();
        if value == "#all" {
            return Ok(allowed);
        }
        let mut set = DerivationSet::empty();
        for token in value.split_whitespace() {
            let method = match token {
                "extension" => DerivationSet::EXTENSION,
                "restriction" => DerivationSet::RESTRICTION,
                "list" => DerivationSet::LIST,
                "union" => DerivationSet::UNION,
                "substitution" => DerivationSet::SUBSTITUTION,
                _ => return Err(Error::lexical("derivation set", value)),
            };
            if !allowed.contains(method) {
                return Err(Error::lexical("derivation set", value));
            }
            set = set.union(method);
        }
        Ok(set)
    }
}

impl fmt::Display for DerivationSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names = [
            (DerivationSet::EXTENSION, "extension"),
            (DerivationSet::RESTRICTION, "restriction"),
            (DerivationSet::LIST, "list"),
            (DerivationSet::UNION, "union"),
            (DerivationSet::SUBSTITUTION, "substitution"),
        ];
        let parts: Vec<&str> = names
            .iter()
            .filter(|(m, _)| self.contains(*m))
            .map(|(_, n)| *n)
            .collect();
        f.write_str(&parts.join(" "))
    }
}

/// How a simple type is derived
#[derive(Debug, Clone, PartialEq)]
pub enum SimpleDerivation {
    /// Restriction of a base type by facets
    Restriction {
        /// Base type
        base: TypeRef,
        /// Facets in source order
        facets: Vec<FacetDecl>,
    },
    /// List of an item type
    List {
        /// Item type
        item: TypeRef,
    },
    /// Union of member types, `memberTypes` first then inline members
    Union {
        /// Member types
        members: Vec<TypeRef>,
    },
}

/// Simple type definition
#[derive(Debug, Clone, PartialEq)]
pub struct SimpleTypeDef {
    /// Derivation
    pub derivation: SimpleDerivation,
    /// `final`
    pub final_set: DerivationSet,
    /// Variety, computed by the resolver
    pub variety: Option<Variety>,
    /// Effective whiteSpace, computed by the resolver
    pub white_space: Option<WhiteSpace>,
}

impl SimpleTypeDef {
    /// Restriction of `base` with the given facets
    pub fn restriction(base: TypeRef, facets: Vec<FacetDecl>) -> Self {
        Self {
            derivation: SimpleDerivation::Restriction { base, facets },
            final_set: DerivationSet::empty(),
            variety: None,
            white_space: None,
        }
    }

    /// The derivation method used, as a set bit
    pub fn method(&self) -> DerivationSet {
        match self.derivation {
            SimpleDerivation::Restriction { .. } => DerivationSet::RESTRICTION,
            SimpleDerivation::List { .. } => DerivationSet::LIST,
            SimpleDerivation::Union { .. } => DerivationSet::UNION,
        }
    }

    /// Type references made by this definition
    pub fn type_refs(&self) -> Vec<&TypeRef> {
        match &self.derivation {
            SimpleDerivation::Restriction { base, .. } => vec![base],
            SimpleDerivation::List { item } => vec![item],
            SimpleDerivation::Union { members } => members.iter().collect(),
        }
    }
}

/// Complex type derivation method
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
pub enum DerivationMethod {
    /// Derived by restriction
    #[default]
    Restriction,
    /// Derived by extension
    Extension,
}

impl DerivationMethod {
    /// Parse from a content child local name
    pub fn from_local_name(s: &str) -> Option<Self> {
        match s {
            "restriction" => Some(Self::Restriction),
            "extension" => Some(Self::Extension),
            _ => None,
        }
    }

    /// As a derivation set bit
    pub fn as_set(&self) -> DerivationSet {
        match self {
            Self::Restriction => DerivationSet::RESTRICTION,
            Self::Extension => DerivationSet::EXTENSION,
        }
    }
}

impl fmt::Display for DerivationMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Restriction => write!(f, "restriction"),
            Self::Extension => write!(f, "extension"),
        }
    }
}

/// `simpleContent` derivation details
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SimpleContent {
    /// Facets of a restriction
    pub facets: Vec<FacetDecl>,
    /// Inline `simpleType` of a restriction
    pub inline_base: Option<DefId>,
}

/// `complexContent` derivation details
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ComplexContent {
    /// Local particle
    pub particle: Option<Particle>,
    /// Effective mixed flag
    pub mixed: bool,
}

/// Content of a complex type
#[derive(Debug, Clone, PartialEq)]
pub enum Content {
    /// No content
    Empty,
    /// Element-only content with a model group
    ElementOnly(Particle),
    /// Mixed content, optionally with a model group
    Mixed(Option<Particle>),
    /// Text content of a simple type
    Simple(SimpleContent),
    /// Content derived from a complex base
    Complex(ComplexContent),
}

/// Complex type definition
#[derive(Debug, Clone, PartialEq)]
pub struct ComplexTypeDef {
    /// Content
    pub content: Content,
    /// Local attribute declarations and references
    pub attributes: Vec<AttrHandle>,
    /// Referenced attribute groups
    pub attribute_group_refs: Vec<QName>,
    /// Local attribute wildcard
    pub any_attribute: Option<Wildcard>,
    /// Derivation method
    pub derivation: DerivationMethod,
    /// Base type; `anyType` unless derived explicitly
    pub base: TypeRef,
    /// `final`
    pub final_set: DerivationSet,
    /// `block`
    pub block_set: DerivationSet,
    /// `abstract`
    pub is_abstract: bool,
    /// `mixed`
    pub mixed: bool,
}

impl ComplexTypeDef {
    /// Complex type with the given content and default everything else
    pub fn new(content: Content) -> Self {
        Self {
            content,
            attributes: Vec::new(),
            attribute_group_refs: Vec::new(),
            any_attribute: None,
            derivation: DerivationMethod::Restriction,
            base: TypeRef::builtin(Builtin::AnyType),
            final_set: DerivationSet::empty(),
            block_set: DerivationSet::empty(),
            is_abstract: false,
            mixed: false,
        }
    }

    /// Local particle, whatever the content form
    pub fn particle(&self) -> Option<&Particle> {
        match &self.content {
            Content::ElementOnly(p) => Some(p),
            Content::Mixed(p) => p.as_ref(),
            Content::Complex(c) => c.particle.as_ref(),
            Content::Empty | Content::Simple(_) => None,
        }
    }

    /// Whether the type has simple content
    pub fn has_simple_content(&self) -> bool {
        matches!(self.content, Content::Simple(_))
    }

    /// Whether character content is allowed alongside elements
    pub fn is_mixed(&self) -> bool {
        match &self.content {
            Content::Mixed(_) => true,
            Content::Complex(c) => c.mixed,
            _ => self.mixed,
        }
    }
}

/// Simple or complex definition body
#[derive(Debug, Clone, PartialEq)]
pub enum TypeKind {
    /// Simple type
    Simple(SimpleTypeDef),
    /// Complex type
    Complex(ComplexTypeDef),
}

/// A type definition in the schema's type arena
#[derive(Debug, Clone, PartialEq)]
pub struct TypeDef {
    /// Name, `None` for anonymous types
    pub name: Option<QName>,
    /// Definition body
    pub kind: TypeKind,
}

impl TypeDef {
    /// Named or anonymous simple type
    pub fn simple(name: Option<QName>, def: SimpleTypeDef) -> Self {
        Self {
            name,
            kind: TypeKind::Simple(def),
        }
    }

    /// Named or anonymous complex type
    pub fn complex(name: Option<QName>, def: ComplexTypeDef) -> Self {
        Self {
            name,
            kind: TypeKind::Complex(def),
        }
    }

    /// As a simple type
    pub fn as_simple(&self) -> Option<&SimpleTypeDef> {
        match &self.kind {
            TypeKind::Simple(s) => Some(s),
            TypeKind::Complex(_) => None,
        }
    }

    /// As a complex type
    pub fn as_complex(&self) -> Option<&ComplexTypeDef> {
        match &self.kind {
            TypeKind::Complex(c) => Some(c),
            TypeKind::Simple(_) => None,
        }
    }

    /// Whether the type is simple
    pub fn is_simple(&self) -> bool {
        matches!(self.kind, TypeKind::Simple(_))
    }

    /// Display label: the name, or `anonymous` for inline types
    pub fn label(&self) -> String {
        match &self.name {
            Some(name) => name.to_string(),
            None => "anonymous".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_derivation_set_parse() {
        let simple_final =
            DerivationSet::RESTRICTION.union(DerivationSet::LIST).union(DerivationSet::UNION);
        assert_eq!(
            DerivationSet::parse("#all", simple_final).unwrap(),
            simple_final
        );
        let s = DerivationSet::parse("restriction list", simple_final).unwrap();
        assert!(s.contains(DerivationSet::RESTRICTION));
        assert!(!s.contains(DerivationSet::UNION));
        assert_eq!(s.to_string(), "restriction list");
        assert!(DerivationSet::parse("extension", simple_final).is_err());
        assert!(DerivationSet::parse("", simple_final).unwrap().is_empty());
    }

    #[test]
    fn test_type_ref() {
        let r = TypeRef::named(QName::local("T"));
        assert!(r.is_placeholder());
        assert_eq!(r.key(), None);
        let b = TypeRef::builtin(Builtin::String);
        assert_eq!(b.key(), Some(TypeKey::Builtin(Builtin::String)));
        assert_eq!(TypeRef::Inline(DefId(3)).key(), Some(TypeKey::Def(DefId(3))));
    }

    #[test]
    fn test_complex_defaults() {
        let ct = ComplexTypeDef::new(Content::Mixed(None));
        assert!(ct.is_mixed());
        assert_eq!(ct.base.key(), Some(TypeKey::Builtin(Builtin::AnyType)));
        assert!(ct.particle().is_none());
    }
}
