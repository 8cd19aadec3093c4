//! Type reference resolution
//!
//! Resolution runs over a fully read schema in two layers:
//!
//! - [`resolve_type_references`] binds every named type reference (simple
//!   type bases, list item types, union members, complex type bases, element
//!   and attribute types) and rejects circular derivations.
//! - [`Resolver::resolve`] does the same binding and then completes the model
//!   in a fixed order: simple types (variety and whiteSpace), complex types,
//!   groups, elements (effective types), attributes and attribute groups.
//!   It finishes by moving the schema to the `resolved` phase.
//!
//! Recursive element content, where a type contains an element of the same
//! type, is not a derivation edge and is allowed.

use std::collections::HashMap;

use crate::diagnostics::Diagnostic;
use crate::error::{ComponentKind, Error, Result};
use crate::namespaces::{QName, XML_NAMESPACE, XSD_NAMESPACE};
use crate::schema::{
    Builtin, Content, DefId, ElemHandle, ParsedSchema, Phase, SimpleDerivation, Term, TypeKey,
    TypeKind, TypeRef, Variety,
};
use crate::semantic::references;
use crate::values::WhiteSpace;

/// What to do with a type reference that names nothing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ResolvePolicy {
    /// Bind to the ur-type when both the schema and the reference are in no
    /// namespace, recording a warning
    AllowMissing,
    /// Every reference must resolve
    #[default]
    Required,
}

/// Bind every named type reference and check derivations for cycles
///
/// The schema must be in the `semantic` phase; the phase is not advanced.
pub fn resolve_type_references(schema: &mut ParsedSchema) -> Result<Vec<Diagnostic>> {
    schema.require_phase(Phase::Semantic)?;
    let mut diagnostics = Vec::new();
    bind_all(schema, ResolvePolicy::Required, &mut diagnostics)?;
    if let Some(name) = find_derivation_cycle(schema) {
        return Err(Error::CircularReference {
            kind: ComponentKind::Type,
            name,
        });
    }
    Ok(diagnostics)
}

/// Fail unless `name` is visible from the document at `location`
///
/// A document sees its own target namespace, the XSD and XML namespaces and
/// whatever it imports. Components read without an import context are not
/// checked.
pub(crate) fn check_visible(
    schema: &ParsedSchema,
    kind: ComponentKind,
    name: &QName,
    location: &str,
) -> Result<()> {
    let ctx = match schema.import_contexts.get(location) {
        Some(ctx) => ctx,
        None => return Ok(()),
    };
    let ns = name.namespace.as_str();
    if ns == ctx.target_namespace
        || ns == XSD_NAMESPACE
        || ns == XML_NAMESPACE
        || ctx.imports.contains(ns)
    {
        return Ok(());
    }
    Err(Error::NamespaceNotImported {
        kind,
        name: name.clone(),
        namespace: ns.to_string(),
    })
}

fn type_refs_mut(kind: &mut TypeKind) -> Vec<&mut TypeRef> {
    match kind {
        TypeKind::Simple(s) => match &mut s.derivation {
            SimpleDerivation::Restriction { base, .. } => vec![base],
            SimpleDerivation::List { item } => vec![item],
            SimpleDerivation::Union { members } => members.iter_mut().collect(),
        },
        TypeKind::Complex(c) => vec![&mut c.base],
    }
}

fn type_refs(kind: &TypeKind) -> Vec<&TypeRef> {
    match kind {
        TypeKind::Simple(s) => s.type_refs(),
        TypeKind::Complex(c) => vec![&c.base],
    }
}

fn lookup(
    schema: &ParsedSchema,
    policy: ResolvePolicy,
    diagnostics: &mut Vec<Diagnostic>,
    name: &QName,
    location: &str,
    fallback: Builtin,
) -> Result<TypeKey> {
    check_visible(schema, ComponentKind::Type, name, location)?;
    if let Some(key) = schema.lookup_type(name) {
        return Ok(key);
    }
    if policy == ResolvePolicy::AllowMissing
        && schema.target_namespace.is_empty()
        && name.namespace.is_empty()
    {
        diagnostics.push(Diagnostic::warning(
            format!("type {}", name),
            format!("missing type definition bound to {}", fallback),
        ));
        return Ok(TypeKey::Builtin(fallback));
    }
    Err(Error::UnresolvedReference {
        kind: ComponentKind::Type,
        name: name.clone(),
    })
}

fn bind_all(
    schema: &mut ParsedSchema,
    policy: ResolvePolicy,
    diagnostics: &mut Vec<Diagnostic>,
) -> Result<()> {
    for i in 0..schema.types.len() {
        let id = DefId(i as u32);
        let def = schema.type_def(id);
        let fallback = if def.is_simple() {
            Builtin::AnySimpleType
        } else {
            Builtin::AnyType
        };
        let location = schema.type_location(id);
        let mut bound = Vec::new();
        for (slot, r) in type_refs(&def.kind).into_iter().enumerate() {
            if let TypeRef::Named {
                name,
                resolved: None,
            } = r
            {
                let key = lookup(schema, policy, diagnostics, name, location, fallback)
                    .map_err(|e| e.in_component(format!("type {}", def.label())))?;
                bound.push((slot, key));
            }
        }
        let mut refs = type_refs_mut(&mut schema.type_def_mut(id).kind);
        for (slot, key) in bound {
            if let TypeRef::Named { resolved, .. } = &mut *refs[slot] {
                *resolved = Some(key);
            }
        }
    }

    for i in 0..schema.elements.len() {
        let h = ElemHandle(i as u32);
        let decl = schema.element(h);
        let key = match &decl.type_ref {
            Some(TypeRef::Named {
                name,
                resolved: None,
            }) => Some(
                lookup(
                    schema,
                    policy,
                    diagnostics,
                    name,
                    schema.element_location(h),
                    Builtin::AnyType,
                )
                .map_err(|e| e.in_component(format!("element {}", decl.name)))?,
            ),
            _ => None,
        };
        if let Some(key) = key {
            if let Some(TypeRef::Named { resolved, .. }) = &mut schema.element_mut(h).type_ref {
                *resolved = Some(key);
            }
        }
    }

    for i in 0..schema.attributes.len() {
        let h = crate::schema::AttrHandle(i as u32);
        let decl = schema.attribute(h);
        let key = match &decl.type_ref {
            Some(TypeRef::Named {
                name,
                resolved: None,
            }) => Some(
                lookup(
                    schema,
                    policy,
                    diagnostics,
                    name,
                    schema.attribute_location(h),
                    Builtin::AnySimpleType,
                )
                .map_err(|e| e.in_component(format!("attribute {}", decl.name)))?,
            ),
            _ => None,
        };
        if let Some(key) = key {
            if let Some(TypeRef::Named { resolved, .. }) = &mut schema.attribute_mut(h).type_ref {
                *resolved = Some(key);
            }
        }
    }
    Ok(())
}

/// Name of a type where a derivation cycle is entered, if any
///
/// Edges are simple type bases, item types and member types, and complex type
/// bases. Traversal is iterative and visits types in arena order.
pub(crate) fn find_derivation_cycle(schema: &ParsedSchema) -> Option<QName> {
    #[derive(Clone, Copy, PartialEq)]
    enum Mark {
        New,
        Active,
        Done,
    }
    let edges = |id: DefId| -> Vec<DefId> {
        type_refs(&schema.type_def(id).kind)
            .into_iter()
            .filter_map(|r| match r.key() {
                Some(TypeKey::Def(d)) => Some(d),
                _ => None,
            })
            .collect()
    };
    let mut marks = vec![Mark::New; schema.types.len()];
    for root in 0..schema.types.len() {
        if marks[root] != Mark::New {
            continue;
        }
        let mut stack: Vec<(DefId, Vec<DefId>)> = vec![(DefId(root as u32), edges(DefId(root as u32)))];
        marks[root] = Mark::Active;
        while let Some((id, pending)) = stack.last_mut() {
            match pending.pop() {
                Some(next) => match marks[next.0 as usize] {
                    Mark::Active => {
                        let def = schema.type_def(next);
                        return Some(
                            def.name
                                .clone()
                                .unwrap_or_else(|| QName::local("anonymous")),
                        );
                    }
                    Mark::New => {
                        marks[next.0 as usize] = Mark::Active;
                        let e = edges(next);
                        stack.push((next, e));
                    }
                    Mark::Done => {}
                },
                None => {
                    marks[id.0 as usize] = Mark::Done;
                    stack.pop();
                }
            }
        }
    }
    None
}

/// Completes a read schema and moves it to the `resolved` phase
pub struct Resolver<'a> {
    schema: &'a mut ParsedSchema,
    policy: ResolvePolicy,
    diagnostics: Vec<Diagnostic>,
    simple_info: HashMap<DefId, (Variety, WhiteSpace)>,
}

impl<'a> Resolver<'a> {
    /// Create a resolver over a schema in the `semantic` phase
    pub fn new(schema: &'a mut ParsedSchema, policy: ResolvePolicy) -> Self {
        Self {
            schema,
            policy,
            diagnostics: Vec::new(),
            simple_info: HashMap::new(),
        }
    }

    /// Run every resolution step, returning the warnings recorded on the way
    pub fn resolve(mut self) -> Result<Vec<Diagnostic>> {
        self.schema.require_phase(Phase::Semantic)?;
        bind_all(self.schema, self.policy, &mut self.diagnostics)?;
        if let Some(name) = find_derivation_cycle(self.schema) {
            return Err(Error::CircularReference {
                kind: ComponentKind::Type,
                name,
            });
        }
        self.resolve_simple_types()?;
        self.resolve_complex_types()?;
        self.resolve_groups()?;
        self.resolve_elements()?;
        self.resolve_attributes()?;
        self.resolve_attribute_groups()?;
        self.schema.mark_resolved()?;
        Ok(self.diagnostics)
    }

    fn resolve_simple_types(&mut self) -> Result<()> {
        for i in 0..self.schema.types.len() {
            let id = DefId(i as u32);
            if !self.schema.type_def(id).is_simple() {
                continue;
            }
            let (variety, white_space) = self
                .simple_type_info(TypeKey::Def(id))
                .map_err(|e| e.in_component(format!("type {}", self.schema.type_def(id).label())))?;
            if let TypeKind::Simple(s) = &mut self.schema.type_def_mut(id).kind {
                s.variety = variety;
                s.white_space = Some(white_space);
            }
        }
        Ok(())
    }

    /// Variety and effective whiteSpace of a simple type
    fn simple_type_info(&mut self, key: TypeKey) -> Result<(Option<Variety>, WhiteSpace)> {
        let id = match key {
            TypeKey::Builtin(b) if b.is_complex() => {
                return Err(Error::constraint(
                    "xs:anyType is a complex type and cannot be used as a simple type",
                ))
            }
            TypeKey::Builtin(b) => return Ok((b.variety(), b.white_space())),
            TypeKey::Def(id) => id,
        };
        if let Some((v, ws)) = self.simple_info.get(&id) {
            return Ok((Some(*v), *ws));
        }
        let def = self.schema.type_def(id);
        let simple = match &def.kind {
            TypeKind::Simple(s) => s.clone(),
            TypeKind::Complex(_) => {
                return Err(Error::constraint(format!(
                    "'{}' is a complex type and cannot be used as a simple type",
                    def.label()
                )))
            }
        };
        let label = def.label();
        let info = match &simple.derivation {
            SimpleDerivation::Restriction { base, facets } => {
                let base_key = base.key().ok_or_else(|| {
                    Error::UnresolvedPlaceholder(base.name().cloned().unwrap_or_default())
                })?;
                if base_key == TypeKey::Builtin(Builtin::AnySimpleType) {
                    return Err(Error::constraint(format!(
                        "simple type '{}' cannot restrict xs:anySimpleType",
                        label
                    )));
                }
                let (variety, base_ws) = self.simple_type_info(base_key)?;
                let variety = variety.ok_or_else(|| {
                    Error::constraint(format!("base of simple type '{}' has no variety", label))
                })?;
                let mut ws = base_ws;
                if let Some(facet) = facets
                    .iter()
                    .find(|f| f.kind == crate::schema::FacetKind::WhiteSpace)
                {
                    let declared = WhiteSpace::parse(facet.value.trim())?;
                    if !base_ws.allows_restriction_to(declared) {
                        return Err(Error::facet(
                            "whiteSpace",
                            format!("'{}' relaxes the base value '{}'", declared, base_ws),
                        ));
                    }
                    if variety != Variety::Atomic && declared != WhiteSpace::Collapse {
                        return Err(Error::facet(
                            "whiteSpace",
                            format!("{} types only allow 'collapse'", variety),
                        ));
                    }
                    ws = declared;
                }
                (variety, ws)
            }
            SimpleDerivation::List { item } => {
                let item_key = item.key().ok_or_else(|| {
                    Error::UnresolvedPlaceholder(item.name().cloned().unwrap_or_default())
                })?;
                let (item_variety, _) = self.simple_type_info(item_key)?;
                if item_variety == Some(Variety::List) {
                    return Err(Error::constraint(format!(
                        "item type of list type '{}' is itself a list",
                        label
                    )));
                }
                (Variety::List, WhiteSpace::Collapse)
            }
            SimpleDerivation::Union { members } => {
                for member in members {
                    let key = member.key().ok_or_else(|| {
                        Error::UnresolvedPlaceholder(member.name().cloned().unwrap_or_default())
                    })?;
                    self.simple_type_info(key)?;
                }
                (Variety::Union, WhiteSpace::Collapse)
            }
        };
        self.simple_info.insert(id, info);
        Ok((Some(info.0), info.1))
    }

    fn is_simple_key(&self, key: TypeKey) -> bool {
        match key {
            TypeKey::Builtin(b) => !b.is_complex(),
            TypeKey::Def(id) => self.schema.type_def(id).is_simple(),
        }
    }

    fn resolve_complex_types(&mut self) -> Result<()> {
        for i in 0..self.schema.types.len() {
            let id = DefId(i as u32);
            let def = self.schema.type_def(id);
            let complex = match def.as_complex() {
                Some(c) => c,
                None => continue,
            };
            let label = def.label();
            let base = complex
                .base
                .key()
                .ok_or_else(|| Error::UnresolvedPlaceholder(QName::local(label.clone())))?;
            let err = |msg: String| Err(Error::constraint(msg).in_component(format!("type {}", label)));
            match &complex.content {
                Content::Simple(_) => {
                    let base_simple_content = match base {
                        TypeKey::Def(b) => self
                            .schema
                            .type_def(b)
                            .as_complex()
                            .map_or(false, |c| c.has_simple_content()),
                        TypeKey::Builtin(_) => false,
                    };
                    let ok = match complex.derivation {
                        crate::schema::DerivationMethod::Extension => {
                            self.is_simple_key(base) || base_simple_content
                        }
                        crate::schema::DerivationMethod::Restriction => base_simple_content,
                    };
                    if !ok {
                        return err(format!(
                            "simpleContent {} base '{}' must be {}",
                            complex.derivation,
                            self.schema.type_label(base),
                            if complex.derivation == crate::schema::DerivationMethod::Extension {
                                "a simple type or a complex type with simple content"
                            } else {
                                "a complex type with simple content"
                            }
                        ));
                    }
                }
                Content::Complex(_) => {
                    if self.is_simple_key(base) {
                        return err(format!(
                            "complexContent base '{}' is a simple type",
                            self.schema.type_label(base)
                        ));
                    }
                    if let TypeKey::Def(b) = base {
                        if self
                            .schema
                            .type_def(b)
                            .as_complex()
                            .map_or(false, |c| c.has_simple_content())
                            && complex.particle().is_some()
                        {
                            return err(format!(
                                "complexContent cannot add particles to '{}', which has simple content",
                                self.schema.type_label(base)
                            ));
                        }
                    }
                }
                Content::Empty | Content::ElementOnly(_) | Content::Mixed(_) => {}
            }
        }
        Ok(())
    }

    fn resolve_groups(&mut self) -> Result<()> {
        let mut refs = Vec::new();
        let mut collect = |p: &crate::schema::Particle| {
            p.walk(&mut |q| {
                if let Term::GroupRef(name) = &q.term {
                    refs.push(name.clone());
                }
            })
        };
        for group in self.schema.groups.values() {
            for p in &group.particles {
                collect(p);
            }
        }
        for def in &self.schema.types {
            if let Some(p) = def.as_complex().and_then(|c| c.particle()) {
                collect(p);
            }
        }
        for name in refs {
            references::model_group(self.schema, &name)?;
        }
        Ok(())
    }

    /// Effective type of an element: declared, else the substitution head's,
    /// else `anyType`; references take their target's
    fn element_type(&self, h: ElemHandle, chain: &mut Vec<ElemHandle>) -> Result<Option<TypeKey>> {
        let decl = self.schema.element(h);
        if decl.is_reference {
            check_visible(
                self.schema,
                ComponentKind::Element,
                &decl.name,
                self.schema.element_location(h),
            )?;
            return match self.schema.global_element(&decl.name) {
                Some(target) if target != h => self.element_type(target, chain),
                _ => Ok(None),
            };
        }
        if let Some(r) = &decl.type_ref {
            return Ok(r.key());
        }
        if let Some(head_name) = &decl.substitution_group {
            check_visible(
                self.schema,
                ComponentKind::Element,
                head_name,
                self.schema.element_location(h),
            )?;
            if let Some(head) = self.schema.global_element(head_name) {
                if chain.contains(&head) || head == h {
                    return Err(Error::CircularReference {
                        kind: ComponentKind::SubstitutionGroup,
                        name: head_name.clone(),
                    });
                }
                chain.push(h);
                let t = self.element_type(head, chain);
                chain.pop();
                return Ok(t?.or(Some(TypeKey::Builtin(Builtin::AnyType))));
            }
        }
        Ok(Some(TypeKey::Builtin(Builtin::AnyType)))
    }

    fn resolve_elements(&mut self) -> Result<()> {
        // globals first so local references see settled heads
        let mut order: Vec<ElemHandle> = self.schema.element_decls.values().copied().collect();
        order.extend(
            (0..self.schema.elements.len())
                .map(|i| ElemHandle(i as u32))
                .filter(|h| !self.schema.element(*h).global),
        );
        for h in order {
            let t = self
                .element_type(h, &mut Vec::new())
                .map_err(|e| e.in_component(format!("element {}", self.schema.element(h).name)))?;
            self.schema.element_mut(h).resolved_type = t;
        }
        Ok(())
    }

    fn resolve_attributes(&mut self) -> Result<()> {
        for i in 0..self.schema.attributes.len() {
            let h = crate::schema::AttrHandle(i as u32);
            let decl = self.schema.attribute(h);
            let t = if decl.is_reference {
                check_visible(
                    self.schema,
                    ComponentKind::Attribute,
                    &decl.name,
                    self.schema.attribute_location(h),
                )?;
                self.schema.global_attribute(&decl.name).and_then(|target| {
                    let t = self.schema.attribute(target);
                    t.type_ref
                        .as_ref()
                        .and_then(TypeRef::key)
                        .or(Some(TypeKey::Builtin(Builtin::AnySimpleType)))
                })
            } else {
                let key = decl
                    .type_ref
                    .as_ref()
                    .and_then(TypeRef::key)
                    .unwrap_or(TypeKey::Builtin(Builtin::AnySimpleType));
                if !self.is_simple_key(key) {
                    return Err(Error::constraint(format!(
                        "type '{}' of attribute '{}' is not a simple type",
                        self.schema.type_label(key),
                        decl.name
                    )));
                }
                Some(key)
            };
            self.schema.attribute_mut(h).resolved_type = t;
        }
        Ok(())
    }

    fn resolve_attribute_groups(&mut self) -> Result<()> {
        let mut names: Vec<QName> = Vec::new();
        for group in self.schema.attribute_groups.values() {
            names.extend(group.attribute_group_refs.iter().cloned());
        }
        for def in &self.schema.types {
            if let Some(c) = def.as_complex() {
                names.extend(c.attribute_group_refs.iter().cloned());
            }
        }
        for name in names {
            references::attribute_group(self.schema, &name)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reader::read_schema;

    fn semantic(xsd: &str) -> ParsedSchema {
        let mut schema = read_schema(xsd, "main.xsd").unwrap();
        schema.mark_semantic().unwrap();
        schema
    }

    const XS: &str = r#"xmlns:xs="http://www.w3.org/2001/XMLSchema""#;

    #[test]
    fn test_resolve_simple_types() {
        let mut schema = semantic(&format!(
            r#"<xs:schema {XS} targetNamespace="urn:t" xmlns:t="urn:t">
                 <xs:simpleType name="Codes"><xs:list itemType="t:Code"/></xs:simpleType>
                 <xs:simpleType name="Code">
                   <xs:restriction base="xs:token"><xs:maxLength value="3"/></xs:restriction>
                 </xs:simpleType>
                 <xs:element name="c" type="t:Codes"/>
               </xs:schema>"#
        ));
        let warnings = Resolver::new(&mut schema, ResolvePolicy::Required).resolve().unwrap();
        assert!(warnings.is_empty());
        assert_eq!(schema.phase(), Phase::Resolved);
        let codes = schema.type_defs[&QName::new("urn:t", "Codes")];
        let s = schema.type_def(codes).as_simple().unwrap();
        assert_eq!(s.variety, Some(Variety::List));
        assert_eq!(s.white_space, Some(WhiteSpace::Collapse));
        let c = schema.global_element(&QName::new("urn:t", "c")).unwrap();
        assert_eq!(schema.element(c).resolved_type, Some(TypeKey::Def(codes)));
    }

    #[test]
    fn test_missing_type_policy() {
        let xsd = format!(
            r#"<xs:schema {XS}><xs:element name="a" type="Missing"/></xs:schema>"#
        );
        let mut strict = semantic(&xsd);
        assert!(matches!(
            Resolver::new(&mut strict, ResolvePolicy::Required).resolve(),
            Err(Error::Component { .. })
        ));

        let mut lax = semantic(&xsd);
        let warnings = Resolver::new(&mut lax, ResolvePolicy::AllowMissing)
            .resolve()
            .unwrap();
        assert_eq!(warnings.len(), 1);
        let a = lax.global_element(&QName::local("a")).unwrap();
        assert_eq!(
            lax.element(a).resolved_type,
            Some(TypeKey::Builtin(Builtin::AnyType))
        );
    }

    #[test]
    fn test_namespace_not_imported() {
        let mut schema = semantic(&format!(
            r#"<xs:schema {XS} targetNamespace="urn:t" xmlns:o="urn:other">
                 <xs:element name="a" type="o:T"/>
               </xs:schema>"#
        ));
        let err = resolve_type_references(&mut schema).unwrap_err();
        assert!(matches!(
            err.root_cause(),
            Error::NamespaceNotImported { namespace, .. } if namespace == "urn:other"
        ));
    }

    #[test]
    fn test_circular_derivation() {
        let mut schema = semantic(&format!(
            r#"<xs:schema {XS}>
                 <xs:simpleType name="A"><xs:restriction base="B"/></xs:simpleType>
                 <xs:simpleType name="B"><xs:restriction base="A"/></xs:simpleType>
               </xs:schema>"#
        ));
        let err = resolve_type_references(&mut schema).unwrap_err();
        assert!(matches!(
            err,
            Error::CircularReference {
                kind: ComponentKind::Type,
                ..
            }
        ));
    }

    #[test]
    fn test_recursive_content_is_allowed() {
        let mut schema = semantic(&format!(
            r#"<xs:schema {XS}>
                 <xs:complexType name="Node">
                   <xs:sequence><xs:element name="child" type="Node" minOccurs="0"/></xs:sequence>
                 </xs:complexType>
               </xs:schema>"#
        ));
        assert!(Resolver::new(&mut schema, ResolvePolicy::Required).resolve().is_ok());
    }

    #[test]
    fn test_substitution_member_takes_head_type() {
        let mut schema = semantic(&format!(
            r#"<xs:schema {XS}>
                 <xs:element name="head" type="xs:int"/>
                 <xs:element name="member" substitutionGroup="head"/>
               </xs:schema>"#
        ));
        Resolver::new(&mut schema, ResolvePolicy::Required).resolve().unwrap();
        let m = schema.global_element(&QName::local("member")).unwrap();
        assert_eq!(
            schema.element(m).resolved_type,
            Some(TypeKey::Builtin(Builtin::Int))
        );
    }

    #[test]
    fn test_complex_type_as_simple_base() {
        let mut schema = semantic(&format!(
            r#"<xs:schema {XS}>
                 <xs:complexType name="C"/>
                 <xs:simpleType name="S"><xs:restriction base="C"/></xs:simpleType>
               </xs:schema>"#
        ));
        let err = Resolver::new(&mut schema, ResolvePolicy::Required)
            .resolve()
            .unwrap_err();
        assert!(err.to_string().contains("complex type"));
    }

    #[test]
    fn test_missing_group_reference() {
        let mut schema = semantic(&format!(
            r#"<xs:schema {XS}>
                 <xs:complexType name="C"><xs:group ref="G"/></xs:complexType>
               </xs:schema>"#
        ));
        let err = Resolver::new(&mut schema, ResolvePolicy::Required)
            .resolve()
            .unwrap_err();
        assert!(matches!(
            err,
            Error::UnresolvedReference {
                kind: ComponentKind::Group,
                ..
            }
        ));
    }
}
