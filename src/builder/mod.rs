//! Runtime schema builder
//!
//! Lowers a resolved schema, its registry and its compiled validators into a
//! [`RuntimeSchema`]. Every call starts from fresh state and only reads its
//! inputs, so builds over shared inputs may run concurrently.
//!
//! Rows are emitted in registry order: built-in types, then schema types,
//! then elements and attributes in ID order. Every QName a table refers to is
//! interned on the way, and the global lookup tables are sized once the
//! symbol table is complete.

mod attributes;
mod content;
mod identity;
mod wildcards;

use std::collections::HashMap;

use crate::compiler::{DeclValues, ValidatorsBundle};
use crate::error::{ComponentKind, Error, Result};
use crate::limits::BuildConfig;
use crate::registry::{Ancestors, AttrId, ElemId, Registry, ResolvedReferences, TypeId};
use crate::runtime::{
    AttrSet, AttrUse, AttributeRow, ComplexId, ComplexTypeRow, ContentKind, ElementRow,
    IdentityTables, Matcher, MatcherId, ModelKind, Models, PathRow, RuntimeSchema,
    SymbolId, TypeKind as RowKind, TypeRow, Validators,
};
use crate::schema::{
    AttrHandle, Builtin, ComplexTypeDef, DefId, ElemHandle, ParsedSchema, Phase, TypeKey,
    TypeKind, TypeRef,
};
use crate::semantic::derivation::base_of;
use crate::xpath::PathCompiler;

use attributes::{emit_uses, use_kind, AttributeMerger, MergedUse};
use wildcards::WildcardTable;

/// Type ID of `anyType`
pub const ANY_TYPE_ID: TypeId = Builtin::AnyType as TypeId + 1;
/// Type ID of `anySimpleType`
pub const ANY_SIMPLE_TYPE_ID: TypeId = Builtin::AnySimpleType as TypeId + 1;

/// Everything the runtime builder reads
#[derive(Clone, Copy)]
pub struct BuildInput<'a> {
    /// Resolved schema
    pub schema: &'a ParsedSchema,
    /// Component IDs
    pub registry: &'a Registry,
    /// Bound references
    pub refs: &'a ResolvedReferences,
    /// Ancestor chains
    pub ancestors: &'a Ancestors,
    /// Compiled validators and interned values
    pub validators: &'a ValidatorsBundle,
    /// Selector and field compiler
    pub paths: &'a dyn PathCompiler,
}

struct Builder<'a> {
    input: BuildInput<'a>,
    config: &'a BuildConfig,
    out: RuntimeSchema,
    wildcards: WildcardTable,
    matcher_ids: HashMap<Matcher, MatcherId>,
    merger: AttributeMerger<'a>,
}

/// Build the runtime schema
pub fn build_runtime(input: BuildInput<'_>, config: &BuildConfig) -> Result<RuntimeSchema> {
    input.schema.require_phase(Phase::Resolved)?;
    config
        .limits
        .check_schema_components(input.schema.component_count())?;

    let mut b = Builder {
        input,
        config,
        out: RuntimeSchema::default(),
        wildcards: WildcardTable::new(),
        matcher_ids: HashMap::new(),
        merger: AttributeMerger::new(input.schema),
    };
    b.out.models = Models {
        matchers: vec![Matcher::PosWildcard { wildcard: 0 }],
        ..Default::default()
    };
    b.out.identity = IdentityTables {
        ics: vec![Default::default()],
        paths: vec![PathRow::default()],
        ..Default::default()
    };
    b.out.complex_types = vec![ComplexTypeRow::default()];
    b.out.ancestors = input.ancestors.clone();

    b.types()?;
    b.elements()?;
    b.attributes()?;
    b.copy_validators();
    b.globals();

    let mut out = b.out;
    out.wildcards = b.wildcards.rules;
    out.wildcard_ns = b.wildcards.namespaces;
    out.build_hash = out.compute_hash();
    Ok(out)
}

impl<'a> Builder<'a> {
    fn type_id(&self, key: TypeKey) -> Result<TypeId> {
        self.input.registry.type_id(key).ok_or_else(|| {
            Error::constraint(format!(
                "type {} has no ID",
                self.input.schema.type_label(key)
            ))
        })
    }

    fn types(&mut self) -> Result<()> {
        let (schema, registry) = (self.input.schema, self.input.registry);
        let count = registry.type_count();
        self.out.types = vec![TypeRow::default(); count + 1];
        for id in 1..=count as TypeId {
            let key = registry
                .type_key(id)
                .ok_or_else(|| Error::constraint(format!("type ID {} is not registered", id)))?;
            let row = self
                .type_row(id, key)
                .map_err(|e| e.in_component(format!("type {}", schema.type_label(key))))?;
            self.out.types[id as usize] = row;
        }
        Ok(())
    }

    fn type_row(&mut self, id: TypeId, key: TypeKey) -> Result<TypeRow> {
        let schema = self.input.schema;
        let ancestors = self.input.ancestors;
        let mut row = TypeRow {
            validator: self.input.validators.validator_of(id),
            ancestors_off: ancestors.offsets.get(id as usize).copied().unwrap_or(0),
            ancestors_len: ancestors.lengths.get(id as usize).copied().unwrap_or(0),
            ..Default::default()
        };
        if let Some((base, method)) = base_of(schema, key) {
            row.base = self.type_id(base)?;
            row.derivation = method.bits();
        }
        match key {
            TypeKey::Builtin(b) => {
                row.kind = RowKind::Builtin;
                row.name = self.out.symbols.intern(&b.qname());
                if b == Builtin::AnyType {
                    row.complex = self.any_type_row(id)?;
                }
            }
            TypeKey::Def(def_id) => {
                let def = schema.type_def(def_id);
                if let Some(name) = &def.name {
                    row.name = self.out.symbols.intern(name);
                }
                match &def.kind {
                    TypeKind::Simple(s) => {
                        row.kind = RowKind::Simple;
                        row.final_set = s.final_set.bits();
                    }
                    TypeKind::Complex(c) => {
                        row.kind = RowKind::Complex;
                        row.final_set = c.final_set.bits();
                        row.block = c.block_set.bits();
                        row.is_abstract = c.is_abstract;
                        row.complex = self.complex_row(id, def_id, c)?;
                    }
                }
            }
        }
        Ok(row)
    }

    fn push_complex(&mut self, row: ComplexTypeRow) -> ComplexId {
        let id = self.out.complex_types.len() as ComplexId;
        self.out.complex_types.push(row);
        id
    }

    fn complex_row(&mut self, type_id: TypeId, def_id: DefId, c: &ComplexTypeDef) -> Result<ComplexId> {
        let merged = self.merger.merged(def_id)?;
        let mut uses = Vec::with_capacity(merged.uses.len());
        for u in &merged.uses {
            uses.push(self.attr_use(u)?);
        }
        let attrs: AttrSet = emit_uses(&mut self.out.attr_index, uses, &self.config.limits);
        let any_attribute = match &merged.wildcard {
            Some(w) => self.wildcards.attribute(&mut self.out.symbols, w),
            None => 0,
        };
        let model = self.content_model(def_id)?;
        let text_validator = self.input.validators.validator_of(type_id);
        let mixed = c.is_mixed();
        let content = if text_validator != 0 {
            ContentKind::Simple
        } else if mixed {
            ContentKind::Mixed
        } else if model.kind == ModelKind::None {
            ContentKind::Empty
        } else {
            ContentKind::ElementOnly
        };
        let text_values = match content {
            ContentKind::Simple | ContentKind::Mixed => self.text_values(def_id),
            _ => DeclValues::default(),
        };
        Ok(self.push_complex(ComplexTypeRow {
            type_id,
            content,
            attrs,
            any_attribute,
            text_validator,
            text_values,
            model,
            mixed,
        }))
    }

    /// Value constraints of the element an anonymous type is declared in
    fn text_values(&self, def_id: DefId) -> DeclValues {
        let (schema, registry) = (self.input.schema, self.input.registry);
        if schema.type_def(def_id).name.is_some() {
            return DeclValues::default();
        }
        registry
            .element_order
            .iter()
            .find(|h| matches!(schema.element(**h).type_ref, Some(TypeRef::Inline(id)) if id == def_id))
            .and_then(|h| self.input.validators.elements.get(h))
            .copied()
            .unwrap_or_default()
    }

    fn attr_use(&mut self, u: &MergedUse) -> Result<AttrUse> {
        let schema = self.input.schema;
        let attribute = self.attribute_id(u.decl)?;
        let type_id = self.attribute_type(u.decl)?;
        let values = &self.input.validators.attributes;
        let own = values.get(&u.source).copied().unwrap_or_default();
        let declared = values.get(&u.decl).copied().unwrap_or_default();
        let values = DeclValues {
            default: if own.default.present { own.default } else { declared.default },
            fixed: if own.fixed.present { own.fixed } else { declared.fixed },
        };
        Ok(AttrUse {
            name: self.out.symbols.intern(&schema.attribute(u.decl).name),
            attribute,
            validator: self.input.validators.validator_of(type_id),
            use_kind: use_kind(u.use_kind),
            values,
        })
    }

    fn attribute_id(&self, h: AttrHandle) -> Result<AttrId> {
        self.input.registry.attribute_id(h).ok_or_else(|| Error::UnresolvedReference {
            kind: ComponentKind::Attribute,
            name: self.input.schema.attribute(h).name.clone(),
        })
    }

    fn element_id(&self, h: ElemHandle) -> Result<ElemId> {
        self.input.registry.element_id(h).ok_or_else(|| Error::UnresolvedReference {
            kind: ComponentKind::Element,
            name: self.input.schema.element(h).name.clone(),
        })
    }

    fn attribute_type(&self, h: AttrHandle) -> Result<TypeId> {
        match self.input.schema.attribute(h).resolved_type {
            Some(key) => self.type_id(key),
            None => Ok(ANY_SIMPLE_TYPE_ID),
        }
    }

    fn elements(&mut self) -> Result<()> {
        let (schema, registry) = (self.input.schema, self.input.registry);
        self.out.elements = vec![ElementRow::default(); registry.element_order.len() + 1];
        for (i, h) in registry.element_order.iter().enumerate() {
            let name = &schema.element(*h).name;
            let row = self
                .element_row(*h)
                .map_err(|e| e.in_component(format!("element {}", name)))?;
            self.out.elements[i + 1] = row;
        }
        Ok(())
    }

    fn element_row(&mut self, h: ElemHandle) -> Result<ElementRow> {
        let schema = self.input.schema;
        let decl = schema.element(h);
        let type_id = match decl.resolved_type {
            Some(key) => self.type_id(key)?,
            None => ANY_TYPE_ID,
        };
        let substitution_head = match &decl.substitution_group {
            Some(head) => *self.input.registry.elements.get(head).ok_or_else(|| {
                Error::UnresolvedReference {
                    kind: ComponentKind::SubstitutionGroup,
                    name: head.clone(),
                }
            })?,
            None => 0,
        };
        let mut flags = 0;
        if decl.nillable {
            flags |= ElementRow::FLAG_NILLABLE;
        }
        if decl.is_abstract {
            flags |= ElementRow::FLAG_ABSTRACT;
        }
        if decl.global {
            flags |= ElementRow::FLAG_GLOBAL;
        }
        let (ic_off, ic_len) = self.identity_constraints(decl)?;
        Ok(ElementRow {
            name: self.out.symbols.intern(&decl.name),
            type_id,
            substitution_head,
            values: self
                .input
                .validators
                .elements
                .get(&h)
                .copied()
                .unwrap_or_default(),
            flags,
            block: decl.block.bits(),
            final_set: decl.final_set.bits(),
            ic_off,
            ic_len,
        })
    }

    fn attributes(&mut self) -> Result<()> {
        let (schema, registry) = (self.input.schema, self.input.registry);
        self.out.attributes = vec![AttributeRow::default(); registry.attribute_order.len() + 1];
        for (i, h) in registry.attribute_order.iter().enumerate() {
            let decl = schema.attribute(*h);
            let type_id = self
                .attribute_type(*h)
                .map_err(|e| e.in_component(format!("attribute {}", decl.name)))?;
            self.out.attributes[i + 1] = AttributeRow {
                name: self.out.symbols.intern(&decl.name),
                type_id,
                validator: self.input.validators.validator_of(type_id),
                values: self
                    .input
                    .validators
                    .attributes
                    .get(h)
                    .copied()
                    .unwrap_or_default(),
            };
        }
        Ok(())
    }

    fn copy_validators(&mut self) {
        let v = self.input.validators;
        self.out.validators = Validators {
            meta: v.meta.clone(),
            kind_counts: v.kind_counts.clone(),
            strings: v.strings.clone(),
            integers: v.integers.clone(),
            lists: v.lists.clone(),
            unions: v.unions.clone(),
            union_members: v.union_members.clone(),
            union_member_types: v.union_member_types.clone(),
        };
        self.out.facets = v.facets.clone();
        self.out.patterns = v.patterns.clone();
        self.out.enums = v.enums.clone();
        self.out.values = v.values.as_bytes().to_vec();
    }

    fn globals(&mut self) {
        let registry = self.input.registry;
        let symbols = &mut self.out.symbols;
        let mut types: Vec<(SymbolId, TypeId)> = Vec::new();
        for b in Builtin::ALL.iter() {
            types.push((symbols.intern(&b.qname()), b.index() as TypeId + 1));
        }
        for (name, id) in &registry.types {
            types.push((symbols.intern(name), *id));
        }
        let elements: Vec<(SymbolId, ElemId)> = registry
            .elements
            .iter()
            .map(|(n, id)| (symbols.intern(n), *id))
            .collect();
        let attributes: Vec<(SymbolId, AttrId)> = registry
            .attributes
            .iter()
            .map(|(n, id)| (symbols.intern(n), *id))
            .collect();

        let n = symbols.len();
        let index = |pairs: Vec<(SymbolId, u32)>| {
            let mut table = vec![0; n];
            for (sym, id) in pairs {
                table[sym as usize] = id;
            }
            table
        };
        self.out.global_types = index(types);
        self.out.global_elements = index(elements);
        self.out.global_attributes = index(attributes);
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::compiler::compile_validators;
    use crate::patterns::XsdRegexCompiler;
    use crate::registry::tests::resolved;
    use crate::registry::{assign_ids, build_ancestors, resolve_references};
    use crate::runtime::{AttrLookup, UseKind};
    use crate::xpath::DefaultPathCompiler;

    pub(crate) fn build_with(body: &str, config: &BuildConfig) -> Result<RuntimeSchema> {
        let schema = resolved(body);
        let registry = assign_ids(&schema)?;
        let refs = resolve_references(&schema, &registry)?;
        let ancestors = build_ancestors(&schema, &registry)?;
        let validators = compile_validators(&schema, &registry, &XsdRegexCompiler)?;
        build_runtime(
            BuildInput {
                schema: &schema,
                registry: &registry,
                refs: &refs,
                ancestors: &ancestors,
                validators: &validators,
                paths: &DefaultPathCompiler,
            },
            config,
        )
    }

    pub(crate) fn build(body: &str) -> Result<RuntimeSchema> {
        build_with(body, &BuildConfig::default())
    }

    fn global_type(rt: &RuntimeSchema, name: &str) -> TypeId {
        let sym = rt.symbol("urn:t", name).unwrap();
        rt.global_type(sym).unwrap()
    }

    #[test]
    fn test_builtin_rows_come_first() {
        let rt = build(r#"<xs:simpleType name="S"><xs:restriction base="xs:int"/></xs:simpleType>"#)
            .unwrap();
        let any = rt.type_row(ANY_TYPE_ID).unwrap();
        assert_eq!(any.kind, RowKind::Builtin);
        assert_eq!(any.base, 0);
        assert_ne!(any.complex, 0);
        let string = rt.symbol(crate::namespaces::XSD_NAMESPACE, "string").unwrap();
        assert_eq!(rt.global_type(string), Some(Builtin::String as TypeId + 1));

        let s = global_type(&rt, "S");
        assert_eq!(s, crate::registry::FIRST_SCHEMA_TYPE_ID);
        let row = rt.type_row(s).unwrap();
        assert_eq!(row.kind, RowKind::Simple);
        assert_eq!(row.base, Builtin::Int as TypeId + 1);
        assert!(rt.validator_of(s).is_some());
        assert!(rt.ancestors.derives_from(s, ANY_TYPE_ID));
        assert_ne!(rt.build_hash, 0);
    }

    #[test]
    fn test_element_rows() {
        let rt = build(
            r#"<xs:element name="head" type="xs:string" abstract="true"/>
               <xs:element name="member" type="xs:string" substitutionGroup="tns:head"
                           nillable="true" default="x"/>"#,
        )
        .unwrap();
        let head = rt.global_element(rt.symbol("urn:t", "head").unwrap()).unwrap();
        let member = rt.global_element(rt.symbol("urn:t", "member").unwrap()).unwrap();
        let head_row = rt.element(head).unwrap();
        assert_ne!(head_row.flags & ElementRow::FLAG_ABSTRACT, 0);
        let row = rt.element(member).unwrap();
        assert_eq!(row.substitution_head, head);
        assert_ne!(row.flags & ElementRow::FLAG_NILLABLE, 0);
        assert_ne!(row.flags & ElementRow::FLAG_GLOBAL, 0);
        assert_eq!(rt.value_bytes(&row.values.default), Some(&b"x"[..]));
        assert_eq!(row.type_id, Builtin::String as TypeId + 1);
    }

    #[test]
    fn test_anonymous_simple_content_carries_text_values() {
        let rt = build(
            r#"<xs:complexType name="Named">
                 <xs:simpleContent><xs:extension base="xs:decimal"/></xs:simpleContent>
               </xs:complexType>
               <xs:element name="price" fixed="1.50">
                 <xs:complexType>
                   <xs:simpleContent>
                     <xs:extension base="xs:decimal">
                       <xs:attribute name="cur" type="xs:string"/>
                     </xs:extension>
                   </xs:simpleContent>
                 </xs:complexType>
               </xs:element>
               <xs:element name="total" type="tns:Named" default="0"/>"#,
        )
        .unwrap();
        let text_of = |name: &str| {
            let e = rt.global_element(rt.symbol("urn:t", name).unwrap()).unwrap();
            let ty = rt.element(e).unwrap().type_id;
            let row = rt.complex_type(ty).unwrap();
            assert_eq!(row.content, ContentKind::Simple);
            row.text_values
        };
        let price = text_of("price");
        assert_eq!(rt.value_bytes(&price.fixed), Some(&b"1.5"[..]));
        assert!(!price.default.present);
        let total = text_of("total");
        assert!(!total.default.present);
        assert!(!total.fixed.present);
    }

    #[test]
    fn test_attribute_uses_sorted_by_symbol() {
        let config = BuildConfig::default().with_limits(crate::limits::Limits {
            attr_linear_max: 0,
            ..Default::default()
        });
        let rt = build_with(
            r#"<xs:complexType name="T">
                 <xs:attribute name="b" type="xs:int"/>
                 <xs:attribute name="a" type="xs:string"/>
               </xs:complexType>"#,
            &config,
        )
        .unwrap();
        let complex = rt.type_row(global_type(&rt, "T")).unwrap().complex;
        assert_eq!(rt.complex_types[complex as usize].attrs.mode, AttrLookup::SortedBinary);
        let uses = rt.attribute_uses(complex);
        assert_eq!(uses.len(), 2);
        assert!(uses.windows(2).all(|w| w[0].name < w[1].name));
        let a = rt.symbol("", "a").unwrap();
        assert_eq!(rt.attribute_use(complex, a).map(|u| u.name), Some(a));
    }

    #[test]
    fn test_prohibited_use_is_emitted() {
        let rt = build(
            r#"<xs:complexType name="B"><xs:attribute name="a" type="xs:string"/></xs:complexType>
               <xs:complexType name="R">
                 <xs:complexContent>
                   <xs:restriction base="tns:B"><xs:attribute name="a" use="prohibited"/></xs:restriction>
                 </xs:complexContent>
               </xs:complexType>"#,
        )
        .unwrap();
        let complex = rt.type_row(global_type(&rt, "R")).unwrap().complex;
        let a = rt.symbol("", "a").unwrap();
        let u = rt.attribute_use(complex, a).unwrap();
        assert_eq!(u.use_kind, UseKind::Prohibited);
    }

    #[test]
    fn test_use_level_default_overrides_declaration() {
        let rt = build(
            r#"<xs:attribute name="g" type="xs:string" default="d"/>
               <xs:attribute name="h" type="xs:string" default="d"/>
               <xs:complexType name="T">
                 <xs:attribute ref="tns:g" default="u"/>
                 <xs:attribute ref="tns:h"/>
               </xs:complexType>"#,
        )
        .unwrap();
        let complex = rt.type_row(global_type(&rt, "T")).unwrap().complex;
        let g = rt.symbol("urn:t", "g").unwrap();
        let u = rt.attribute_use(complex, g).unwrap();
        assert_eq!(rt.value_bytes(&u.values.default), Some(&b"u"[..]));
        assert!(!u.values.fixed.present);
        assert_eq!(Some(u.attribute), rt.global_attribute(g));
        let h = rt.symbol("urn:t", "h").unwrap();
        let u = rt.attribute_use(complex, h).unwrap();
        assert_eq!(rt.value_bytes(&u.values.default), Some(&b"d"[..]));
    }

    #[test]
    fn test_equal_inputs_hash_equal() {
        let body = r#"<xs:element name="e"><xs:complexType><xs:sequence>
                        <xs:element name="a" maxOccurs="3"/>
                      </xs:sequence></xs:complexType></xs:element>"#;
        let a = build(body).unwrap();
        let b = build(body).unwrap();
        assert_eq!(a.build_hash, b.build_hash);
        assert_eq!(a, b);
        let c = build(&body.replace("maxOccurs=\"3\"", "maxOccurs=\"4\"")).unwrap();
        assert_ne!(a.build_hash, c.build_hash);
    }
}
