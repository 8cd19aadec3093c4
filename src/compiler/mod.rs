//! Validator compiler
//!
//! Lowers every simple type of a resolved schema, and the character content
//! of every simple-content complex type, into a validator: a kind-specific
//! record plus a facet program over a shared instruction arena. Default and
//! fixed values of element and attribute declarations are checked against
//! their types and interned in canonical form.
//!
//! Validator IDs are assigned children first (list items and union members
//! before the list or union), visiting built-ins, then schema types in
//! registry order, then declaration values in arena order.

pub mod facets;
pub mod simple;
pub mod values;

pub use facets::{EnumTable, FacetInstr, FacetOp, FacetProgramRef, PatternEntry};
pub use simple::{Checked, Describer, SimpleDescription};
pub use values::{bind_value, DeclValues, ValueBlob, ValueRef};

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use serde::Serialize;

use crate::error::{Error, Result};
use crate::patterns::{CompiledPattern, RegexCompiler};
use crate::registry::{Registry, TypeId, FIRST_SCHEMA_TYPE_ID};
use crate::runtime::hash::{Fnv64, StableHash};
use crate::schema::{
    AttrHandle, Builtin, ElemHandle, FacetKind, ParsedSchema, Phase, TypeKey, Variety,
};
use crate::semantic::derivation::is_simple;
use crate::semantic::references;
use crate::values::{IntegerKind, Primitive, StringKind};

/// Dense validator ID; 0 is none
pub type ValidatorId = u32;
/// Dense enumeration table ID; 0 is none
pub type EnumId = u32;
/// Dense pattern ID; 0 is none
pub type PatternId = u32;

/// Validator kind, one per primitive plus list and union
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum ValidatorKind {
    /// String-like values, `anySimpleType` included
    #[default]
    String,
    /// `xs:boolean`
    Boolean,
    /// `xs:decimal`
    Decimal,
    /// `xs:integer` and derived integers
    Integer,
    /// `xs:float`
    Float,
    /// `xs:double`
    Double,
    /// `xs:duration`
    Duration,
    /// `xs:dateTime`
    DateTime,
    /// `xs:date`
    Date,
    /// `xs:time`
    Time,
    /// `xs:gYearMonth`
    GYearMonth,
    /// `xs:gYear`
    GYear,
    /// `xs:gMonthDay`
    GMonthDay,
    /// `xs:gDay`
    GDay,
    /// `xs:gMonth`
    GMonth,
    /// `xs:anyURI`
    AnyUri,
    /// `xs:QName`
    QName,
    /// `xs:NOTATION`
    Notation,
    /// `xs:hexBinary`
    HexBinary,
    /// `xs:base64Binary`
    Base64Binary,
    /// List types
    List,
    /// Union types
    Union,
}

impl ValidatorKind {
    /// Number of kinds
    pub const COUNT: usize = 22;

    /// Kind of an atomic primitive
    pub fn of_primitive(p: Primitive) -> Self {
        match p {
            Primitive::String => ValidatorKind::String,
            Primitive::Boolean => ValidatorKind::Boolean,
            Primitive::Decimal => ValidatorKind::Decimal,
            Primitive::Integer => ValidatorKind::Integer,
            Primitive::Float => ValidatorKind::Float,
            Primitive::Double => ValidatorKind::Double,
            Primitive::Duration => ValidatorKind::Duration,
            Primitive::DateTime => ValidatorKind::DateTime,
            Primitive::Date => ValidatorKind::Date,
            Primitive::Time => ValidatorKind::Time,
            Primitive::GYearMonth => ValidatorKind::GYearMonth,
            Primitive::GYear => ValidatorKind::GYear,
            Primitive::GMonthDay => ValidatorKind::GMonthDay,
            Primitive::GDay => ValidatorKind::GDay,
            Primitive::GMonth => ValidatorKind::GMonth,
            Primitive::AnyUri => ValidatorKind::AnyUri,
            Primitive::QName => ValidatorKind::QName,
            Primitive::Notation => ValidatorKind::Notation,
            Primitive::HexBinary => ValidatorKind::HexBinary,
            Primitive::Base64Binary => ValidatorKind::Base64Binary,
        }
    }

    /// Position of the kind in declaration order
    pub fn code(&self) -> u8 {
        *self as u8
    }
}

impl fmt::Display for ValidatorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

/// Per-validator metadata
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize)]
pub struct ValidatorMeta {
    /// Validator kind
    pub kind: ValidatorKind,
    /// Offset into the subtable of the kind
    pub index: u32,
    /// whiteSpace code
    pub white_space: u8,
    /// Facet program
    pub facets: FacetProgramRef,
    /// `FLAG_*` bits
    pub flags: u8,
}

impl ValidatorMeta {
    /// The facet program contains an enumeration
    pub const FLAG_HAS_ENUM: u8 = 1;
    /// The type is `xs:ID` or derived from it
    pub const FLAG_ID: u8 = 2;

    /// Whether a flag is set
    pub fn has(&self, flag: u8) -> bool {
        self.flags & flag != 0
    }
}

impl StableHash for ValidatorMeta {
    fn stable_hash(&self, h: &mut Fnv64) {
        h.u8(self.kind.code());
        h.u32(self.index);
        h.u8(self.white_space);
        self.facets.stable_hash(h);
        h.u8(self.flags);
    }
}

/// Member slice of a union validator
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize)]
pub struct UnionValidator {
    /// Offset into `union_members` and `union_member_types`
    pub off: u32,
    /// Number of members
    pub len: u32,
}

impl StableHash for UnionValidator {
    fn stable_hash(&self, h: &mut Fnv64) {
        h.u32(self.off);
        h.u32(self.len);
    }
}

/// Output of [`compile_validators`]
#[derive(Debug, Clone, Default)]
pub struct ValidatorsBundle {
    /// Metadata by validator ID; slot 0 is unused
    pub meta: Vec<ValidatorMeta>,
    /// Entries per kind, indexed by [`ValidatorKind::code`]
    pub kind_counts: Vec<u32>,
    /// String subtable
    pub strings: Vec<StringKind>,
    /// Integer subtable
    pub integers: Vec<IntegerKind>,
    /// List subtable: item validator of each list
    pub lists: Vec<ValidatorId>,
    /// Union subtable
    pub unions: Vec<UnionValidator>,
    /// Member validators of all unions
    pub union_members: Vec<ValidatorId>,
    /// Member types of all unions, parallel to `union_members`
    pub union_member_types: Vec<TypeId>,
    /// Facet instruction arena
    pub facets: Vec<FacetInstr>,
    /// Pattern sets by pattern ID; slot 0 is unused
    pub patterns: Vec<PatternEntry>,
    /// Enumeration tables by enumeration ID; slot 0 is unused
    pub enums: Vec<EnumTable>,
    /// Canonical bytes of bounds, defaults and fixed values
    pub values: ValueBlob,
    /// Validator of each type ID, the text validator for complex types; 0 if none
    pub type_validators: Vec<ValidatorId>,
    /// Values of element declarations that carry one
    pub elements: HashMap<ElemHandle, DeclValues>,
    /// Values of attribute declarations and attribute references that carry one
    pub attributes: HashMap<AttrHandle, DeclValues>,
}

impl ValidatorsBundle {
    /// Validator of a type
    pub fn validator_of(&self, type_id: TypeId) -> ValidatorId {
        self.type_validators.get(type_id as usize).copied().unwrap_or(0)
    }

    /// Metadata of a validator
    pub fn meta(&self, id: ValidatorId) -> Option<&ValidatorMeta> {
        match id {
            0 => None,
            id => self.meta.get(id as usize),
        }
    }

    /// Facet instructions of a validator
    pub fn program(&self, id: ValidatorId) -> &[FacetInstr] {
        self.meta(id).map_or(&[], |m| m.facets.of(&self.facets))
    }

    /// Member validators of a union validator
    pub fn members_of(&self, id: ValidatorId) -> &[ValidatorId] {
        match self.meta(id) {
            Some(m) if m.kind == ValidatorKind::Union => self
                .unions
                .get(m.index as usize)
                .and_then(|u| {
                    self.union_members
                        .get(u.off as usize..(u.off + u.len) as usize)
                })
                .unwrap_or(&[]),
            _ => &[],
        }
    }
}

fn facet_op(kind: FacetKind) -> Option<FacetOp> {
    Some(match kind {
        FacetKind::Length => FacetOp::Length,
        FacetKind::MinLength => FacetOp::MinLength,
        FacetKind::MaxLength => FacetOp::MaxLength,
        FacetKind::TotalDigits => FacetOp::TotalDigits,
        FacetKind::FractionDigits => FacetOp::FractionDigits,
        FacetKind::MinInclusive => FacetOp::MinInclusive,
        FacetKind::MaxInclusive => FacetOp::MaxInclusive,
        FacetKind::MinExclusive => FacetOp::MinExclusive,
        FacetKind::MaxExclusive => FacetOp::MaxExclusive,
        FacetKind::Pattern | FacetKind::Enumeration | FacetKind::WhiteSpace => return None,
    })
}

struct Compiler<'a> {
    schema: &'a ParsedSchema,
    registry: &'a Registry,
    describer: Describer<'a>,
    out: ValidatorsBundle,
    memo: HashMap<TypeKey, ValidatorId>,
    pattern_ids: HashMap<String, PatternId>,
}

impl<'a> Compiler<'a> {
    fn lower(&mut self, desc: &Arc<SimpleDescription>) -> Result<ValidatorId> {
        if let Some(id) = self.memo.get(&desc.key) {
            return Ok(*id);
        }
        let kind = match desc.variety {
            None => ValidatorKind::String,
            Some(Variety::Atomic) => {
                let primitive = desc.primitive().ok_or_else(|| {
                    Error::constraint(format!("atomic type {} has no primitive", desc.label))
                })?;
                ValidatorKind::of_primitive(primitive)
            }
            Some(Variety::List) => ValidatorKind::List,
            Some(Variety::Union) => ValidatorKind::Union,
        };
        match kind {
            ValidatorKind::String => {
                let sk = desc.builtin.and_then(|b| b.string_kind());
                self.out.strings.push(sk.unwrap_or(StringKind::Any));
            }
            ValidatorKind::Integer => {
                let ik = desc.builtin.and_then(|b| b.integer_kind());
                self.out.integers.push(ik.unwrap_or(IntegerKind::Any));
            }
            ValidatorKind::List => {
                let item = desc.item.as_ref().ok_or_else(|| {
                    Error::constraint(format!("list type {} has no item type", desc.label))
                })?;
                let item = self.lower(item)?;
                self.out.lists.push(item);
            }
            ValidatorKind::Union => {
                let mut members = Vec::with_capacity(desc.members.len());
                let mut types = Vec::with_capacity(desc.members.len());
                for m in &desc.members {
                    members.push(self.lower(m)?);
                    if let Some(id) = self.registry.type_id(m.key) {
                        types.push(id);
                    }
                }
                if members.len() != types.len() {
                    return Err(Error::constraint(format!(
                        "union {} has {} member validators but {} member types",
                        desc.label,
                        members.len(),
                        types.len()
                    )));
                }
                self.out.unions.push(UnionValidator {
                    off: self.out.union_members.len() as u32,
                    len: members.len() as u32,
                });
                self.out.union_members.extend(members);
                self.out.union_member_types.extend(types);
            }
            _ => {}
        }
        let slot = kind.code() as usize;
        let index = self.out.kind_counts[slot];
        self.out.kind_counts[slot] += 1;

        let facets = self.program(desc);
        let mut flags = 0;
        if facets.of(&self.out.facets).iter().any(|i| i.op == FacetOp::Enum) {
            flags |= ValidatorMeta::FLAG_HAS_ENUM;
        }
        if desc.is_id() {
            flags |= ValidatorMeta::FLAG_ID;
        }
        let id = self.out.meta.len() as ValidatorId;
        self.out.meta.push(ValidatorMeta {
            kind,
            index,
            white_space: desc.white_space.code(),
            facets,
            flags,
        });
        self.memo.insert(desc.key, id);
        Ok(id)
    }

    fn pattern_id(&mut self, pattern: &CompiledPattern) -> PatternId {
        if let Some(id) = self.pattern_ids.get(&pattern.translated) {
            return *id;
        }
        let id = self.out.patterns.len() as PatternId;
        self.out.patterns.push(PatternEntry {
            sources: pattern.sources.clone(),
            translated: pattern.translated.clone(),
        });
        self.pattern_ids.insert(pattern.translated.clone(), id);
        id
    }

    /// Facet program of the steps, root first
    fn program(&mut self, desc: &SimpleDescription) -> FacetProgramRef {
        let off = self.out.facets.len() as u32;
        for step in &desc.steps {
            if let Some(pattern) = &step.pattern {
                let id = self.pattern_id(pattern);
                self.out.facets.push(FacetInstr::new(FacetOp::Pattern, id));
            }
            if !step.enumeration.is_empty() {
                let keys = step.enumeration.iter().map(|e| e.checked.key.clone()).collect();
                let id = self.out.enums.len() as EnumId;
                self.out.enums.push(EnumTable::new(keys));
                self.out.facets.push(FacetInstr::new(FacetOp::Enum, id));
            }
            for (kind, n) in step.lengths.iter().chain(step.digits.iter()) {
                if let Some(op) = facet_op(*kind) {
                    self.out.facets.push(FacetInstr::new(op, *n));
                }
            }
            for bound in &step.bounds {
                if let Some(op) = facet_op(bound.kind) {
                    let v = self.out.values.intern(&bound.canonical);
                    self.out.facets.push(FacetInstr {
                        op,
                        arg0: v.off,
                        arg1: v.len,
                    });
                }
            }
        }
        FacetProgramRef {
            off,
            len: self.out.facets.len() as u32 - off,
        }
    }

    /// Description that default and fixed values of a declaration are checked
    /// against
    fn value_description(&mut self, key: Option<TypeKey>) -> Result<Arc<SimpleDescription>> {
        let untyped = TypeKey::Builtin(Builtin::AnySimpleType);
        match key {
            Some(key) if is_simple(self.schema, key) => self.describer.describe(key),
            Some(TypeKey::Def(id)) => match self.describer.describe_text(id)? {
                Some(desc) => Ok(desc),
                None => self.describer.describe(untyped),
            },
            _ => self.describer.describe(untyped),
        }
    }

    fn bind(
        &mut self,
        desc: &Arc<SimpleDescription>,
        default: Option<&String>,
        fixed: Option<&String>,
        ctx: &crate::namespaces::NamespaceContext,
        component: &str,
    ) -> Result<DeclValues> {
        self.lower(desc)?;
        let mut member_ids = Vec::with_capacity(desc.members.len());
        for m in &desc.members {
            member_ids.push(self.lower(m)?);
        }
        let member = |i: usize| member_ids.get(i).copied().unwrap_or(0);
        let mut values = DeclValues::default();
        if let Some(v) = default {
            values.default = bind_value(desc, v, ctx, &mut self.out.values, &member)
                .map_err(|e| e.in_component(format!("{} default", component)))?;
        }
        if let Some(v) = fixed {
            values.fixed = bind_value(desc, v, ctx, &mut self.out.values, &member)
                .map_err(|e| e.in_component(format!("{} fixed", component)))?;
        }
        Ok(values)
    }
}

/// Compile the validators of a resolved schema
pub fn compile_validators(
    schema: &ParsedSchema,
    registry: &Registry,
    regex: &dyn RegexCompiler,
) -> Result<ValidatorsBundle> {
    schema.require_phase(Phase::Resolved)?;
    let mut c = Compiler {
        schema,
        registry,
        describer: Describer::new(schema, regex),
        out: ValidatorsBundle {
            meta: vec![ValidatorMeta::default()],
            kind_counts: vec![0; ValidatorKind::COUNT],
            patterns: vec![PatternEntry::default()],
            enums: vec![EnumTable::default()],
            type_validators: vec![0; registry.type_count() + 1],
            ..Default::default()
        },
        memo: HashMap::new(),
        pattern_ids: HashMap::new(),
    };

    for b in Builtin::ALL.iter().filter(|b| !b.is_complex()) {
        let desc = c.describer.describe(TypeKey::Builtin(*b))?;
        let id = c.lower(&desc)?;
        c.out.type_validators[b.index() + 1] = id;
    }

    for (i, def_id) in registry.type_order.iter().enumerate() {
        let def = schema.type_def(*def_id);
        let desc = if def.is_simple() {
            Some(c.describer.describe(TypeKey::Def(*def_id))?)
        } else {
            c.describer.describe_text(*def_id)?
        };
        if let Some(desc) = desc {
            let id = c
                .lower(&desc)
                .map_err(|e| e.in_component(format!("type {}", def.label())))?;
            c.out.type_validators[FIRST_SCHEMA_TYPE_ID as usize + i] = id;
        }
    }

    for (i, decl) in schema.elements.iter().enumerate() {
        if decl.is_reference || (decl.default.is_none() && decl.fixed.is_none()) {
            continue;
        }
        let component = format!("element {}", decl.name);
        let desc = c
            .value_description(decl.resolved_type)
            .map_err(|e| e.in_component(component.clone()))?;
        let values = c.bind(
            &desc,
            decl.default.as_ref(),
            decl.fixed.as_ref(),
            &decl.namespaces,
            &component,
        )?;
        c.out.elements.insert(ElemHandle(i as u32), values);
    }

    for (i, decl) in schema.attributes.iter().enumerate() {
        if decl.default.is_none() && decl.fixed.is_none() {
            continue;
        }
        let h = AttrHandle(i as u32);
        let component = if decl.is_reference {
            format!("attribute use {}", decl.name)
        } else {
            format!("attribute {}", decl.name)
        };
        let type_key = if decl.is_reference {
            let target = references::attribute_target(schema, h)?;
            schema.attribute(target).resolved_type
        } else {
            decl.resolved_type
        };
        let desc = c
            .value_description(type_key)
            .map_err(|e| e.in_component(component.clone()))?;
        let values = c.bind(
            &desc,
            decl.default.as_ref(),
            decl.fixed.as_ref(),
            &decl.namespaces,
            &component,
        )?;
        c.out.attributes.insert(h, values);
    }

    Ok(c.out)
}
