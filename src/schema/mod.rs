//! Parsed schema
//!
//! [`ParsedSchema`] is the component model every later stage consumes. Type
//! definitions, element declarations and attribute declarations live in arenas
//! addressed by [`DefId`], [`ElemHandle`] and [`AttrHandle`]; global
//! components are additionally indexed by name. Anonymous components are
//! identified by their arena handle, which stays stable for the life of the
//! schema.
//!
//! The schema moves through the phases `parsed → semantic → resolved`. The
//! phase is private: only the structural checker and the resolver advance it.

pub mod builtins;
pub mod declarations;
pub mod particles;
pub mod types;
pub mod wildcards;

use std::collections::BTreeSet;
use std::fmt;

use indexmap::IndexMap;
use serde::Serialize;

use crate::error::{Error, Result};
use crate::namespaces::QName;

pub use builtins::Builtin;
pub use declarations::{
    AttributeDecl, AttributeGroup, AttributeUse, ConstraintCategory, ElementDecl, Form,
    IdentityConstraint, NotationDecl,
};
pub use particles::{Compositor, ModelGroup, Occurs, Particle, Term};
pub use types::{
    ComplexContent, ComplexTypeDef, Content, DerivationMethod, DerivationSet, FacetDecl,
    FacetKind, SimpleContent, SimpleDerivation, SimpleTypeDef, TypeDef, TypeKey, TypeKind,
    TypeRef, Variety,
};
pub use wildcards::{
    AttributeWildcard, NamespaceConstraint, NamespaceItem, NamespaceSet, ProcessContents,
    Wildcard,
};

/// Index of a type definition in [`ParsedSchema::types`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct DefId(pub u32);

/// Index of an element declaration in [`ParsedSchema::elements`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct ElemHandle(pub u32);

/// Index of an attribute declaration in [`ParsedSchema::attributes`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct AttrHandle(pub u32);

/// Schema lifecycle phase
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum Phase {
    /// Read from documents
    Parsed,
    /// Structurally checked
    Semantic,
    /// All references bound
    Resolved,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Phase::Parsed => write!(f, "parsed"),
            Phase::Semantic => write!(f, "semantic"),
            Phase::Resolved => write!(f, "resolved"),
        }
    }
}

/// Kind of a global declaration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum GlobalKind {
    /// `xs:element`
    Element,
    /// `xs:simpleType` or `xs:complexType`
    Type,
    /// `xs:attribute`
    Attribute,
    /// `xs:attributeGroup`
    AttributeGroup,
    /// `xs:group`
    Group,
    /// `xs:notation`
    Notation,
}

/// A global declaration in source order
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct GlobalDecl {
    /// Component kind
    pub kind: GlobalKind,
    /// Component name
    pub name: QName,
}

/// Import bookkeeping for one schema document
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ImportContext {
    /// Target namespace of the document
    pub target_namespace: String,
    /// Namespaces the document imports
    pub imports: BTreeSet<String>,
}

/// Schema component model produced by the reader
#[derive(Debug, Clone)]
pub struct ParsedSchema {
    /// Target namespace of the main document; empty is absent
    pub target_namespace: String,

    /// Type arena
    pub types: Vec<TypeDef>,
    /// Element declaration arena, global and local
    pub elements: Vec<ElementDecl>,
    /// Attribute declaration arena, global and local
    pub attributes: Vec<AttributeDecl>,

    /// Named type definitions
    pub type_defs: IndexMap<QName, DefId>,
    /// Global element declarations
    pub element_decls: IndexMap<QName, ElemHandle>,
    /// Global attribute declarations
    pub attribute_decls: IndexMap<QName, AttrHandle>,
    /// Named attribute groups
    pub attribute_groups: IndexMap<QName, AttributeGroup>,
    /// Named model groups
    pub groups: IndexMap<QName, ModelGroup>,
    /// Notations
    pub notation_decls: IndexMap<QName, NotationDecl>,

    /// Source location of each named type
    pub type_origins: IndexMap<QName, String>,
    /// Source location of each named group
    pub group_origins: IndexMap<QName, String>,
    /// Source location of each global element
    pub element_origins: IndexMap<QName, String>,
    /// Source location of each global attribute
    pub attribute_origins: IndexMap<QName, String>,
    /// Source location of each attribute group
    pub attribute_group_origins: IndexMap<QName, String>,

    /// Global declarations in source order
    pub global_decls: Vec<GlobalDecl>,
    /// Substitution group heads to members, in declaration order
    pub substitution_groups: IndexMap<QName, Vec<QName>>,
    /// Namespaces imported by documents of each target namespace
    pub imported_namespaces: IndexMap<String, BTreeSet<String>>,
    /// Import context per document location
    pub import_contexts: IndexMap<String, ImportContext>,

    /// `elementFormDefault` of the main document
    pub element_form_default: Form,
    /// `attributeFormDefault` of the main document
    pub attribute_form_default: Form,
    /// `blockDefault` of the main document
    pub block_default: DerivationSet,
    /// `finalDefault` of the main document
    pub final_default: DerivationSet,

    type_locations: Vec<String>,
    element_locations: Vec<String>,
    attribute_locations: Vec<String>,
    phase: Phase,
    has_placeholders: bool,
}

impl Default for ParsedSchema {
    fn default() -> Self {
        Self::new("")
    }
}

impl ParsedSchema {
    /// Empty schema for a target namespace
    pub fn new(target_namespace: impl Into<String>) -> Self {
        Self {
            target_namespace: target_namespace.into(),
            types: Vec::new(),
            elements: Vec::new(),
            attributes: Vec::new(),
            type_defs: IndexMap::new(),
            element_decls: IndexMap::new(),
            attribute_decls: IndexMap::new(),
            attribute_groups: IndexMap::new(),
            groups: IndexMap::new(),
            notation_decls: IndexMap::new(),
            type_origins: IndexMap::new(),
            group_origins: IndexMap::new(),
            element_origins: IndexMap::new(),
            attribute_origins: IndexMap::new(),
            attribute_group_origins: IndexMap::new(),
            global_decls: Vec::new(),
            substitution_groups: IndexMap::new(),
            imported_namespaces: IndexMap::new(),
            import_contexts: IndexMap::new(),
            element_form_default: Form::Unqualified,
            attribute_form_default: Form::Unqualified,
            block_default: DerivationSet::empty(),
            final_default: DerivationSet::empty(),
            type_locations: Vec::new(),
            element_locations: Vec::new(),
            attribute_locations: Vec::new(),
            phase: Phase::Parsed,
            has_placeholders: false,
        }
    }

    /// Current phase
    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Whether unbound named type references remain
    pub fn has_placeholders(&self) -> bool {
        self.has_placeholders
    }

    /// Fail unless the schema is in `expected`
    pub fn require_phase(&self, expected: Phase) -> Result<()> {
        if self.phase != expected {
            return Err(Error::Phase {
                expected,
                found: self.phase,
            });
        }
        Ok(())
    }

    pub(crate) fn mark_semantic(&mut self) -> Result<()> {
        self.require_phase(Phase::Parsed)?;
        self.phase = Phase::Semantic;
        Ok(())
    }

    pub(crate) fn mark_resolved(&mut self) -> Result<()> {
        self.require_phase(Phase::Semantic)?;
        self.has_placeholders = self.scan_placeholders();
        if self.has_placeholders {
            if let Some(name) = self.first_placeholder() {
                return Err(Error::UnresolvedPlaceholder(name));
            }
        }
        self.phase = Phase::Resolved;
        Ok(())
    }

    /// Add a type definition to the arena
    pub fn add_type(&mut self, def: TypeDef, location: &str) -> DefId {
        let id = DefId(self.types.len() as u32);
        if Self::def_has_placeholder(&def) {
            self.has_placeholders = true;
        }
        self.types.push(def);
        self.type_locations.push(location.to_string());
        id
    }

    /// Add an element declaration to the arena
    pub fn add_element(&mut self, decl: ElementDecl, location: &str) -> ElemHandle {
        let h = ElemHandle(self.elements.len() as u32);
        if decl.type_ref.as_ref().map_or(false, TypeRef::is_placeholder) {
            self.has_placeholders = true;
        }
        self.elements.push(decl);
        self.element_locations.push(location.to_string());
        h
    }

    /// Add an attribute declaration to the arena
    pub fn add_attribute(&mut self, decl: AttributeDecl, location: &str) -> AttrHandle {
        let h = AttrHandle(self.attributes.len() as u32);
        if decl.type_ref.as_ref().map_or(false, TypeRef::is_placeholder) {
            self.has_placeholders = true;
        }
        self.attributes.push(decl);
        self.attribute_locations.push(location.to_string());
        h
    }

    /// Register a named type
    pub fn add_global_type(&mut self, name: QName, def: TypeDef, location: &str) -> DefId {
        let id = self.add_type(def, location);
        self.type_defs.insert(name.clone(), id);
        self.type_origins.insert(name.clone(), location.to_string());
        self.global_decls.push(GlobalDecl {
            kind: GlobalKind::Type,
            name,
        });
        id
    }

    /// Register a global element, indexing its substitution-group head
    pub fn add_global_element(&mut self, mut decl: ElementDecl, location: &str) -> ElemHandle {
        decl.global = true;
        let name = decl.name.clone();
        if let Some(head) = &decl.substitution_group {
            self.substitution_groups
                .entry(head.clone())
                .or_default()
                .push(name.clone());
        }
        let h = self.add_element(decl, location);
        self.element_decls.insert(name.clone(), h);
        self.element_origins.insert(name.clone(), location.to_string());
        self.global_decls.push(GlobalDecl {
            kind: GlobalKind::Element,
            name,
        });
        h
    }

    /// Register a global attribute
    pub fn add_global_attribute(&mut self, mut decl: AttributeDecl, location: &str) -> AttrHandle {
        decl.global = true;
        let name = decl.name.clone();
        let h = self.add_attribute(decl, location);
        self.attribute_decls.insert(name.clone(), h);
        self.attribute_origins.insert(name.clone(), location.to_string());
        self.global_decls.push(GlobalDecl {
            kind: GlobalKind::Attribute,
            name,
        });
        h
    }

    /// Register a named model group
    pub fn add_group(&mut self, name: QName, group: ModelGroup, location: &str) {
        self.groups.insert(name.clone(), group);
        self.group_origins.insert(name.clone(), location.to_string());
        self.global_decls.push(GlobalDecl {
            kind: GlobalKind::Group,
            name,
        });
    }

    /// Register a named attribute group
    pub fn add_attribute_group(&mut self, group: AttributeGroup, location: &str) {
        let name = group.name.clone();
        self.attribute_groups.insert(name.clone(), group);
        self.attribute_group_origins
            .insert(name.clone(), location.to_string());
        self.global_decls.push(GlobalDecl {
            kind: GlobalKind::AttributeGroup,
            name,
        });
    }

    /// Register a notation
    pub fn add_notation(&mut self, notation: NotationDecl) {
        let name = notation.name.clone();
        self.notation_decls.insert(name.clone(), notation);
        self.global_decls.push(GlobalDecl {
            kind: GlobalKind::Notation,
            name,
        });
    }

    /// Type definition by handle
    pub fn type_def(&self, id: DefId) -> &TypeDef {
        &self.types[id.0 as usize]
    }

    /// Mutable type definition by handle
    pub fn type_def_mut(&mut self, id: DefId) -> &mut TypeDef {
        &mut self.types[id.0 as usize]
    }

    /// Element declaration by handle
    pub fn element(&self, h: ElemHandle) -> &ElementDecl {
        &self.elements[h.0 as usize]
    }

    /// Mutable element declaration by handle
    pub fn element_mut(&mut self, h: ElemHandle) -> &mut ElementDecl {
        &mut self.elements[h.0 as usize]
    }

    /// Attribute declaration by handle
    pub fn attribute(&self, h: AttrHandle) -> &AttributeDecl {
        &self.attributes[h.0 as usize]
    }

    /// Mutable attribute declaration by handle
    pub fn attribute_mut(&mut self, h: AttrHandle) -> &mut AttributeDecl {
        &mut self.attributes[h.0 as usize]
    }

    /// Source location of a type definition
    pub fn type_location(&self, id: DefId) -> &str {
        self.type_locations
            .get(id.0 as usize)
            .map(String::as_str)
            .unwrap_or("")
    }

    /// Source location of an element declaration
    pub fn element_location(&self, h: ElemHandle) -> &str {
        self.element_locations
            .get(h.0 as usize)
            .map(String::as_str)
            .unwrap_or("")
    }

    /// Source location of an attribute declaration
    pub fn attribute_location(&self, h: AttrHandle) -> &str {
        self.attribute_locations
            .get(h.0 as usize)
            .map(String::as_str)
            .unwrap_or("")
    }

    /// Global element by name
    pub fn global_element(&self, name: &QName) -> Option<ElemHandle> {
        self.element_decls.get(name).copied()
    }

    /// Global attribute by name
    pub fn global_attribute(&self, name: &QName) -> Option<AttrHandle> {
        self.attribute_decls.get(name).copied()
    }

    /// Look up a type by name; built-ins win in the XSD namespace
    pub fn lookup_type(&self, name: &QName) -> Option<TypeKey> {
        if let Some(b) = Builtin::from_qname(name) {
            return Some(TypeKey::Builtin(b));
        }
        self.type_defs.get(name).map(|id| TypeKey::Def(*id))
    }

    /// Display label for a type key
    pub fn type_label(&self, key: TypeKey) -> String {
        match key {
            TypeKey::Builtin(b) => b.qname().to_string(),
            TypeKey::Def(id) => self.type_def(id).label(),
        }
    }

    /// Total number of components, for limit checks
    pub fn component_count(&self) -> usize {
        self.types.len()
            + self.elements.len()
            + self.attributes.len()
            + self.groups.len()
            + self.attribute_groups.len()
            + self.notation_decls.len()
    }

    fn def_has_placeholder(def: &TypeDef) -> bool {
        match &def.kind {
            TypeKind::Simple(s) => s.type_refs().iter().any(|r| r.is_placeholder()),
            TypeKind::Complex(c) => c.base.is_placeholder(),
        }
    }

    fn scan_placeholders(&self) -> bool {
        self.first_placeholder().is_some()
    }

    /// First unbound named type reference, in arena order
    pub fn first_placeholder(&self) -> Option<QName> {
        let named = |r: &TypeRef| match r {
            TypeRef::Named {
                name,
                resolved: None,
            } => Some(name.clone()),
            _ => None,
        };
        for def in &self.types {
            let found = match &def.kind {
                TypeKind::Simple(s) => s.type_refs().into_iter().find_map(named),
                TypeKind::Complex(c) => named(&c.base),
            };
            if found.is_some() {
                return found;
            }
        }
        self.elements
            .iter()
            .filter(|e| !e.is_reference)
            .find_map(|e| e.type_ref.as_ref().and_then(named))
            .or_else(|| {
                self.attributes
                    .iter()
                    .filter(|a| !a.is_reference)
                    .find_map(|a| a.type_ref.as_ref().and_then(named))
            })
    }
}
