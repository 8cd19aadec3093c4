//! ID registry
//!
//! [`assign_ids`] gives every type definition, element declaration and
//! attribute declaration of a resolved schema a dense, non-zero ID. Built-in
//! types take the first IDs in [`Builtin::ALL`] order; schema types follow.
//! Components are numbered in the order the schema declares its globals, and
//! within a global in source order of its nested particles and anonymous
//! types, so the numbering is stable for a given schema.
//!
//! Element and attribute references get no ID of their own: they stand for
//! the global declaration they name, see [`resolve_references`].

mod ancestors;
mod references;

pub use ancestors::{build_ancestors, Ancestors};
pub use references::{resolve_references, ResolvedReferences};

use std::collections::HashMap;

use indexmap::IndexMap;

use crate::error::{Error, Result};
use crate::namespaces::QName;
use crate::schema::{
    AttrHandle, Builtin, DefId, ElemHandle, GlobalKind, ParsedSchema, Phase, SimpleDerivation,
    Term, TypeKey, TypeKind, TypeRef,
};

/// Dense type ID; 0 is none
pub type TypeId = u32;
/// Dense element ID; 0 is none
pub type ElemId = u32;
/// Dense attribute ID; 0 is none
pub type AttrId = u32;

/// ID of the first schema-defined type
pub const FIRST_SCHEMA_TYPE_ID: TypeId = Builtin::ALL.len() as TypeId + 1;

/// IDs assigned to the components of a schema
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Registry {
    /// Global types by name
    pub types: IndexMap<QName, TypeId>,
    /// Global elements by name
    pub elements: IndexMap<QName, ElemId>,
    /// Global attributes by name
    pub attributes: IndexMap<QName, AttrId>,
    /// Anonymous types by arena handle
    pub anonymous_types: HashMap<DefId, TypeId>,
    /// Local element declarations by arena handle
    pub local_elements: HashMap<ElemHandle, ElemId>,
    /// Local attribute declarations by arena handle
    pub local_attributes: HashMap<AttrHandle, AttrId>,
    /// Schema types in ID order; entry `i` has ID `FIRST_SCHEMA_TYPE_ID + i`
    pub type_order: Vec<DefId>,
    /// Elements in ID order; entry `i` has ID `i + 1`
    pub element_order: Vec<ElemHandle>,
    /// Attributes in ID order; entry `i` has ID `i + 1`
    pub attribute_order: Vec<AttrHandle>,

    def_ids: HashMap<DefId, TypeId>,
    element_ids: HashMap<ElemHandle, ElemId>,
    attribute_ids: HashMap<AttrHandle, AttrId>,
}

impl Registry {
    /// ID of a type
    pub fn type_id(&self, key: TypeKey) -> Option<TypeId> {
        match key {
            TypeKey::Builtin(b) => Some(b.index() as TypeId + 1),
            TypeKey::Def(id) => self.def_ids.get(&id).copied(),
        }
    }

    /// Type with the given ID
    pub fn type_key(&self, id: TypeId) -> Option<TypeKey> {
        if id == 0 {
            return None;
        }
        if id < FIRST_SCHEMA_TYPE_ID {
            return Builtin::ALL
                .get(id as usize - 1)
                .map(|b| TypeKey::Builtin(*b));
        }
        self.type_order
            .get((id - FIRST_SCHEMA_TYPE_ID) as usize)
            .map(|d| TypeKey::Def(*d))
    }

    /// Number of type IDs in use, built-ins included
    pub fn type_count(&self) -> usize {
        Builtin::ALL.len() + self.type_order.len()
    }

    /// ID of a non-reference element declaration
    pub fn element_id(&self, h: ElemHandle) -> Option<ElemId> {
        self.element_ids.get(&h).copied()
    }

    /// ID of a non-reference attribute declaration
    pub fn attribute_id(&self, h: AttrHandle) -> Option<AttrId> {
        self.attribute_ids.get(&h).copied()
    }

    /// Element declaration with the given ID
    pub fn element_handle(&self, id: ElemId) -> Option<ElemHandle> {
        (id as usize)
            .checked_sub(1)
            .and_then(|i| self.element_order.get(i))
            .copied()
    }

    /// Attribute declaration with the given ID
    pub fn attribute_handle(&self, id: AttrId) -> Option<AttrHandle> {
        (id as usize)
            .checked_sub(1)
            .and_then(|i| self.attribute_order.get(i))
            .copied()
    }

    fn add_type(&mut self, schema: &ParsedSchema, id: DefId) -> bool {
        if self.def_ids.contains_key(&id) {
            return false;
        }
        let type_id = FIRST_SCHEMA_TYPE_ID + self.type_order.len() as TypeId;
        self.type_order.push(id);
        self.def_ids.insert(id, type_id);
        let def = schema.type_def(id);
        match &def.name {
            Some(name) if schema.type_defs.get(name) == Some(&id) => {
                self.types.insert(name.clone(), type_id);
            }
            _ => {
                self.anonymous_types.insert(id, type_id);
            }
        }
        true
    }

    fn add_element(&mut self, schema: &ParsedSchema, h: ElemHandle) -> bool {
        let decl = schema.element(h);
        if decl.is_reference || self.element_ids.contains_key(&h) {
            return false;
        }
        self.element_order.push(h);
        let id = self.element_order.len() as ElemId;
        self.element_ids.insert(h, id);
        if decl.global && schema.global_element(&decl.name) == Some(h) {
            self.elements.insert(decl.name.clone(), id);
        } else {
            self.local_elements.insert(h, id);
        }
        true
    }

    fn add_attribute(&mut self, schema: &ParsedSchema, h: AttrHandle) -> bool {
        let decl = schema.attribute(h);
        if decl.is_reference || self.attribute_ids.contains_key(&h) {
            return false;
        }
        self.attribute_order.push(h);
        let id = self.attribute_order.len() as AttrId;
        self.attribute_ids.insert(h, id);
        if decl.global && schema.global_attribute(&decl.name) == Some(h) {
            self.attributes.insert(decl.name.clone(), id);
        } else {
            self.local_attributes.insert(h, id);
        }
        true
    }
}

enum Visit {
    Type(DefId),
    Element(ElemHandle),
    Attribute(AttrHandle),
}

fn inline(r: &TypeRef) -> Option<DefId> {
    match r {
        TypeRef::Inline(id) => Some(*id),
        _ => None,
    }
}

/// Components nested directly in a type, in source order
fn type_children(schema: &ParsedSchema, id: DefId) -> Vec<Visit> {
    let mut out = Vec::new();
    match &schema.type_def(id).kind {
        TypeKind::Simple(s) => {
            let refs: Vec<&TypeRef> = match &s.derivation {
                SimpleDerivation::Restriction { base, .. } => vec![base],
                SimpleDerivation::List { item } => vec![item],
                SimpleDerivation::Union { members } => members.iter().collect(),
            };
            out.extend(refs.into_iter().filter_map(inline).map(Visit::Type));
        }
        TypeKind::Complex(c) => {
            if let Some(base) = inline(&c.base) {
                out.push(Visit::Type(base));
            }
            if let crate::schema::Content::Simple(sc) = &c.content {
                out.extend(sc.inline_base.map(Visit::Type));
            }
            if let Some(p) = c.particle() {
                p.walk(&mut |p| {
                    if let Term::Element(h) = p.term {
                        out.push(Visit::Element(h));
                    }
                });
            }
            out.extend(c.attributes.iter().map(|h| Visit::Attribute(*h)));
        }
    }
    out
}

/// Assign IDs to every component of a resolved schema
pub fn assign_ids(schema: &ParsedSchema) -> Result<Registry> {
    schema.require_phase(Phase::Resolved)?;
    if let Some(name) = schema.first_placeholder() {
        return Err(Error::UnresolvedPlaceholder(name));
    }

    let mut registry = Registry::default();
    let mut roots: Vec<Visit> = Vec::new();
    for global in &schema.global_decls {
        match global.kind {
            GlobalKind::Type => roots.extend(schema.type_defs.get(&global.name).map(|id| Visit::Type(*id))),
            GlobalKind::Element => {
                roots.extend(schema.global_element(&global.name).map(Visit::Element))
            }
            GlobalKind::Attribute => {
                roots.extend(schema.global_attribute(&global.name).map(Visit::Attribute))
            }
            GlobalKind::AttributeGroup => {
                if let Some(group) = schema.attribute_groups.get(&global.name) {
                    roots.extend(group.attributes.iter().map(|h| Visit::Attribute(*h)));
                }
            }
            GlobalKind::Group => {
                if let Some(group) = schema.groups.get(&global.name) {
                    for p in &group.particles {
                        p.walk(&mut |p| {
                            if let Term::Element(h) = p.term {
                                roots.push(Visit::Element(h));
                            }
                        });
                    }
                }
            }
            GlobalKind::Notation => {}
        }
    }
    // anything not reachable from a global, in arena order
    roots.extend((0..schema.types.len()).map(|i| Visit::Type(DefId(i as u32))));
    roots.extend((0..schema.elements.len()).map(|i| Visit::Element(ElemHandle(i as u32))));
    roots.extend((0..schema.attributes.len()).map(|i| Visit::Attribute(AttrHandle(i as u32))));

    for root in roots {
        let mut stack = vec![root];
        while let Some(visit) = stack.pop() {
            let children = match visit {
                Visit::Type(id) => {
                    if !registry.add_type(schema, id) {
                        continue;
                    }
                    type_children(schema, id)
                }
                Visit::Element(h) => {
                    if !registry.add_element(schema, h) {
                        continue;
                    }
                    schema
                        .element(h)
                        .type_ref
                        .as_ref()
                        .and_then(inline)
                        .map(Visit::Type)
                        .into_iter()
                        .collect()
                }
                Visit::Attribute(h) => {
                    if !registry.add_attribute(schema, h) {
                        continue;
                    }
                    schema
                        .attribute(h)
                        .type_ref
                        .as_ref()
                        .and_then(inline)
                        .map(Visit::Type)
                        .into_iter()
                        .collect()
                }
            };
            stack.extend(children.into_iter().rev());
        }
    }
    Ok(registry)
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::reader::read_schema;
    use crate::resolver::{ResolvePolicy, Resolver};
    use crate::semantic::validate_structure;

    pub(crate) fn resolved(body: &str) -> ParsedSchema {
        let xsd = format!(
            r#"<xs:schema xmlns:xs="http://www.w3.org/2001/XMLSchema"
                          xmlns:tns="urn:t" targetNamespace="urn:t">{}</xs:schema>"#,
            body
        );
        let mut schema = read_schema(&xsd, "main.xsd").unwrap();
        validate_structure(&mut schema).unwrap();
        Resolver::new(&mut schema, ResolvePolicy::Required)
            .resolve()
            .unwrap();
        schema
    }

    const BODY: &str = r#"
        <xs:element name="order">
          <xs:complexType>
            <xs:sequence>
              <xs:element name="line" maxOccurs="unbounded">
                <xs:complexType><xs:attribute name="qty" type="xs:int"/></xs:complexType>
              </xs:element>
              <xs:element ref="tns:note"/>
            </xs:sequence>
            <xs:attribute name="id" type="xs:ID"/>
          </xs:complexType>
        </xs:element>
        <xs:element name="note" type="xs:string"/>
        <xs:simpleType name="Code"><xs:restriction base="xs:token"/></xs:simpleType>"#;

    #[test]
    fn test_ids_follow_declaration_order() {
        let schema = resolved(BODY);
        let registry = assign_ids(&schema).unwrap();

        assert_eq!(registry.type_order.len(), 3);
        assert_eq!(registry.types[&QName::new("urn:t", "Code")], FIRST_SCHEMA_TYPE_ID + 2);
        assert_eq!(registry.anonymous_types.len(), 2);

        let names: Vec<&str> = registry
            .element_order
            .iter()
            .map(|h| schema.element(*h).name.local_name.as_str())
            .collect();
        assert_eq!(names, vec!["order", "line", "note"]);
        assert_eq!(registry.elements[&QName::new("urn:t", "note")], 3);
        assert_eq!(registry.local_elements.len(), 1);

        let attrs: Vec<&str> = registry
            .attribute_order
            .iter()
            .map(|h| schema.attribute(*h).name.local_name.as_str())
            .collect();
        assert_eq!(attrs, vec!["qty", "id"]);
    }

    #[test]
    fn test_ids_are_deterministic() {
        let a = assign_ids(&resolved(BODY)).unwrap();
        let b = assign_ids(&resolved(BODY)).unwrap();
        assert_eq!(a.type_order, b.type_order);
        assert_eq!(a.element_order, b.element_order);
        assert_eq!(a.attribute_order, b.attribute_order);
    }

    #[test]
    fn test_type_id_round_trip() {
        let schema = resolved(BODY);
        let registry = assign_ids(&schema).unwrap();
        assert_eq!(registry.type_id(TypeKey::Builtin(Builtin::AnyType)), Some(1));
        assert_eq!(
            registry.type_key(2),
            Some(TypeKey::Builtin(Builtin::AnySimpleType))
        );
        for id in 1..=registry.type_count() as TypeId {
            let key = registry.type_key(id).unwrap();
            assert_eq!(registry.type_id(key), Some(id));
        }
        assert_eq!(registry.type_key(0), None);
        assert_eq!(registry.element_handle(0), None);
    }

    #[test]
    fn test_requires_resolved_schema() {
        let schema = ParsedSchema::new("");
        assert!(matches!(assign_ids(&schema), Err(Error::Phase { .. })));
    }
}
