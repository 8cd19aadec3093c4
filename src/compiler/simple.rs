//! Simple type descriptions
//!
//! A [`SimpleDescription`] is the schema-time view of a simple type: its
//! variety, effective whiteSpace, atomic primitive (or item and member
//! descriptions) and the facet steps collected from the root of the
//! restriction chain down. Descriptions are used to check enumeration values,
//! facet bounds and default/fixed values before anything is emitted, and they
//! are the input the validator compiler lowers into facet programs.
//!
//! Within one step several patterns are alternatives; across steps every
//! pattern must match.

use std::cmp::Ordering;
use std::collections::HashMap;
use std::sync::Arc;

use crate::error::{Error, Result};
use crate::namespaces::NamespaceContext;
use crate::patterns::{CompiledPattern, RegexCompiler};
use crate::schema::{
    Builtin, Content, DefId, DerivationMethod, FacetDecl, FacetKind, ParsedSchema,
    SimpleDerivation, TypeKey, TypeKind, Variety,
};
use crate::values::key::put_uvarint;
use crate::values::{Primitive, Value, ValueKey, WhiteSpace};

/// Key kind tag of `anySimpleType` values
pub const UNTYPED_KEY_KIND: u8 = 255;
/// Key kind tag of list values
pub const LIST_KEY_KIND: u8 = 254;

/// An enumeration value after canonicalization
#[derive(Debug, Clone)]
pub struct EnumValue {
    /// Lexical form as written
    pub lexical: String,
    /// Checked value
    pub checked: Checked,
}

/// A range facet bound
#[derive(Debug, Clone)]
pub struct Bound {
    /// One of the four range facets
    pub kind: FacetKind,
    /// Bound value
    pub value: Value,
    /// Canonical bytes of the bound
    pub canonical: Vec<u8>,
}

/// Facets contributed by one restriction step
#[derive(Debug, Clone, Default)]
pub struct FacetStep {
    /// Type that declared the facets
    pub owner: Option<TypeKey>,
    /// Pattern set of the step
    pub pattern: Option<CompiledPattern>,
    /// Enumeration values of the step
    pub enumeration: Vec<EnumValue>,
    /// length, minLength and maxLength
    pub lengths: Vec<(FacetKind, u32)>,
    /// totalDigits and fractionDigits
    pub digits: Vec<(FacetKind, u32)>,
    /// Range bounds
    pub bounds: Vec<Bound>,
    /// Facets declared `fixed="true"`, with their lexical values
    pub fixed: Vec<(FacetKind, String)>,
}

impl FacetStep {
    /// Whether the step constrains nothing
    pub fn is_empty(&self) -> bool {
        self.pattern.is_none()
            && self.enumeration.is_empty()
            && self.lengths.is_empty()
            && self.digits.is_empty()
            && self.bounds.is_empty()
    }
}

/// Schema-time view of a simple type
#[derive(Debug, Clone)]
pub struct SimpleDescription {
    /// Described type
    pub key: TypeKey,
    /// Display label
    pub label: String,
    /// Variety; `None` for `anySimpleType`
    pub variety: Option<Variety>,
    /// Effective whiteSpace
    pub white_space: WhiteSpace,
    /// Most derived built-in on the chain, for atomic and built-in list types
    pub builtin: Option<Builtin>,
    /// Item type of a list
    pub item: Option<Arc<SimpleDescription>>,
    /// Member types of a union, in declaration order
    pub members: Vec<Arc<SimpleDescription>>,
    /// Facet steps from the root down
    pub steps: Vec<FacetStep>,
}

impl SimpleDescription {
    /// Atomic primitive, if the type is atomic
    pub fn primitive(&self) -> Option<Primitive> {
        match self.variety {
            Some(Variety::Atomic) => self.builtin.and_then(|b| b.primitive()),
            _ => None,
        }
    }

    /// Whether any step carries an enumeration
    pub fn has_enumeration(&self) -> bool {
        self.steps.iter().any(|s| !s.enumeration.is_empty())
    }

    /// Whether the type is `xs:ID` or derived from it
    pub fn is_id(&self) -> bool {
        self.variety == Some(Variety::Atomic)
            && self.builtin.map_or(false, |b| b.derives_from(Builtin::Id))
    }

    /// Whether the type is `xs:NOTATION` or derived from it
    pub fn is_notation(&self) -> bool {
        self.primitive() == Some(Primitive::Notation)
    }

    /// Check a lexical value, returning its canonical form and key
    pub fn check(&self, lexical: &str, ctx: &NamespaceContext) -> Result<Checked> {
        let normalized = self.white_space.normalize(lexical);
        let checked = match self.variety {
            None => {
                let bytes = normalized.clone().into_bytes();
                Checked {
                    key: ValueKey::new(UNTYPED_KEY_KIND, bytes.clone()),
                    canonical: bytes,
                    member: None,
                    value: None,
                    items: 0,
                }
            }
            Some(Variety::Atomic) => self.check_atomic(&normalized, ctx)?,
            Some(Variety::List) => {
                let item = self.item.as_ref().ok_or_else(|| {
                    Error::constraint(format!("list type {} has no item type", self.label))
                })?;
                let mut canonical = Vec::new();
                let mut key = Vec::new();
                let mut items = 0;
                for token in normalized.split(' ').filter(|t| !t.is_empty()) {
                    let c = item.check(token, ctx)?;
                    if items > 0 {
                        canonical.push(b' ');
                    }
                    canonical.extend_from_slice(&c.canonical);
                    key.push(c.key.kind);
                    put_uvarint(&mut key, c.key.bytes.len() as u64);
                    key.extend_from_slice(&c.key.bytes);
                    items += 1;
                }
                Checked {
                    key: ValueKey::new(LIST_KEY_KIND, key),
                    canonical,
                    member: None,
                    value: None,
                    items,
                }
            }
            Some(Variety::Union) => {
                let mut matched = None;
                for (i, member) in self.members.iter().enumerate() {
                    if let Ok(mut c) = member.check(lexical, ctx) {
                        c.member = Some(i);
                        matched = Some(c);
                        break;
                    }
                }
                matched.ok_or_else(|| {
                    Error::constraint(format!(
                        "value '{}' does not match any member type of {}",
                        normalized, self.label
                    ))
                })?
            }
        };
        self.apply_steps(&self.steps, &normalized, &checked)?;
        Ok(checked)
    }

    fn check_atomic(&self, normalized: &str, ctx: &NamespaceContext) -> Result<Checked> {
        let builtin = self.builtin.ok_or_else(|| {
            Error::constraint(format!("atomic type {} has no primitive", self.label))
        })?;
        let primitive = builtin.primitive().ok_or_else(|| {
            Error::constraint(format!("atomic type {} has no primitive", self.label))
        })?;
        if let Some(kind) = builtin.string_kind() {
            kind.check(normalized)?;
        }
        let value = primitive.parse(normalized, ctx)?;
        if let (Some(kind), Value::Integer(i)) = (builtin.integer_kind(), &value) {
            kind.check(i)?;
        }
        Ok(Checked {
            key: value.key(primitive),
            canonical: value.canonical_bytes(),
            member: None,
            value: Some(value),
            items: 0,
        })
    }

    fn apply_steps(&self, steps: &[FacetStep], normalized: &str, checked: &Checked) -> Result<()> {
        for step in steps {
            if let Some(pattern) = &step.pattern {
                if !pattern.is_match(normalized) {
                    return Err(Error::facet(
                        "pattern",
                        format!(
                            "value '{}' does not match '{}'",
                            normalized,
                            pattern.sources.join("|")
                        ),
                    ));
                }
            }
            if !step.enumeration.is_empty()
                && !step.enumeration.iter().any(|e| e.checked.key == checked.key)
            {
                return Err(Error::facet(
                    "enumeration",
                    format!("value '{}' is not one of the enumerated values", normalized),
                ));
            }
            let length = match self.variety {
                Some(Variety::List) => Some(checked.items),
                _ => checked.value.as_ref().and_then(Value::length),
            };
            if let Some(len) = length {
                for (kind, n) in &step.lengths {
                    let n = *n as usize;
                    let ok = match kind {
                        FacetKind::Length => len == n,
                        FacetKind::MinLength => len >= n,
                        _ => len <= n,
                    };
                    if !ok {
                        return Err(Error::facet(
                            kind.name(),
                            format!("length {} of '{}' violates {}", len, normalized, n),
                        ));
                    }
                }
            }
            if let Some((total, fraction)) = checked.value.as_ref().and_then(Value::digits) {
                for (kind, n) in &step.digits {
                    let actual = if *kind == FacetKind::TotalDigits {
                        total
                    } else {
                        fraction
                    };
                    if actual > *n {
                        return Err(Error::facet(
                            kind.name(),
                            format!("'{}' has {} digits, at most {} allowed", normalized, actual, n),
                        ));
                    }
                }
            }
            if let Some(value) = &checked.value {
                for bound in &step.bounds {
                    let ok = match value.compare(&bound.value) {
                        Ok(ord) => match bound.kind {
                            FacetKind::MinInclusive => ord != Ordering::Less,
                            FacetKind::MinExclusive => ord == Ordering::Greater,
                            FacetKind::MaxInclusive => ord != Ordering::Greater,
                            _ => ord == Ordering::Less,
                        },
                        Err(Error::IndeterminateComparison) => false,
                        Err(e) => return Err(e),
                    };
                    if !ok {
                        return Err(Error::facet(
                            bound.kind.name(),
                            format!(
                                "value '{}' is out of range '{}'",
                                normalized,
                                String::from_utf8_lossy(&bound.canonical)
                            ),
                        ));
                    }
                }
            }
        }
        Ok(())
    }
}

/// Result of checking a lexical value against a description
#[derive(Debug, Clone, PartialEq)]
pub struct Checked {
    /// Canonical bytes, stored for default and fixed values
    pub canonical: Vec<u8>,
    /// Value identity
    pub key: ValueKey,
    /// Index of the matching member, for unions
    pub member: Option<usize>,
    /// Atomic value
    pub value: Option<Value>,
    /// Item count, for lists
    pub items: usize,
}

/// Builds and caches descriptions for the simple types of one schema
pub struct Describer<'a> {
    schema: &'a ParsedSchema,
    regex: &'a dyn RegexCompiler,
    simple: HashMap<TypeKey, Arc<SimpleDescription>>,
    text: HashMap<DefId, Option<Arc<SimpleDescription>>>,
}

impl<'a> Describer<'a> {
    /// Create a describer over a resolved schema
    pub fn new(schema: &'a ParsedSchema, regex: &'a dyn RegexCompiler) -> Self {
        Self {
            schema,
            regex,
            simple: HashMap::new(),
            text: HashMap::new(),
        }
    }

    /// Description of a simple type
    pub fn describe(&mut self, key: TypeKey) -> Result<Arc<SimpleDescription>> {
        if let Some(desc) = self.simple.get(&key) {
            return Ok(desc.clone());
        }
        let desc = Arc::new(match key {
            TypeKey::Builtin(b) => self.describe_builtin(b)?,
            TypeKey::Def(id) => self.describe_def(id)?,
        });
        self.simple.insert(key, desc.clone());
        Ok(desc)
    }

    fn describe_builtin(&mut self, b: Builtin) -> Result<SimpleDescription> {
        if b.is_complex() {
            return Err(Error::constraint("xs:anyType is not a simple type"));
        }
        let item = match b.item_type() {
            Some(item) => Some(self.describe(TypeKey::Builtin(item))?),
            None => None,
        };
        Ok(SimpleDescription {
            key: TypeKey::Builtin(b),
            label: b.to_string(),
            variety: b.variety(),
            white_space: b.white_space(),
            builtin: Some(b),
            item,
            members: Vec::new(),
            steps: Vec::new(),
        })
    }

    fn describe_def(&mut self, id: DefId) -> Result<SimpleDescription> {
        let schema = self.schema;
        let def = schema.type_def(id);
        let simple = match &def.kind {
            TypeKind::Simple(s) => s,
            TypeKind::Complex(_) => {
                return Err(Error::constraint(format!(
                    "'{}' is a complex type, not a simple type",
                    def.label()
                )))
            }
        };
        let label = def.label();
        let unbound = || Error::UnresolvedPlaceholder(crate::namespaces::QName::local(label.clone()));
        match &simple.derivation {
            SimpleDerivation::Restriction { base, facets } => {
                let base = self.describe(base.key().ok_or_else(unbound)?)?;
                let mut desc = (*base).clone();
                desc.key = TypeKey::Def(id);
                desc.label = label.clone();
                desc.white_space = simple.white_space.unwrap_or(base.white_space);
                let step = self
                    .build_step(&base, facets, TypeKey::Def(id))
                    .map_err(|e| e.in_component(format!("type {}", label)))?;
                desc.steps.push(step);
                Ok(desc)
            }
            SimpleDerivation::List { item } => {
                let item = self.describe(item.key().ok_or_else(unbound)?)?;
                Ok(SimpleDescription {
                    key: TypeKey::Def(id),
                    label,
                    variety: Some(Variety::List),
                    white_space: WhiteSpace::Collapse,
                    builtin: None,
                    item: Some(item),
                    members: Vec::new(),
                    steps: Vec::new(),
                })
            }
            SimpleDerivation::Union { members } => {
                let mut descs = Vec::with_capacity(members.len());
                for m in members {
                    descs.push(self.describe(m.key().ok_or_else(unbound)?)?);
                }
                Ok(SimpleDescription {
                    key: TypeKey::Def(id),
                    label,
                    variety: Some(Variety::Union),
                    white_space: WhiteSpace::Collapse,
                    builtin: None,
                    item: None,
                    members: descs,
                    steps: Vec::new(),
                })
            }
        }
    }

    /// Description of the character content of a complex type
    ///
    /// `None` unless the type has simple content, directly or through a
    /// `complexContent` derivation that adds no particle.
    pub fn describe_text(&mut self, id: DefId) -> Result<Option<Arc<SimpleDescription>>> {
        if let Some(desc) = self.text.get(&id) {
            return Ok(desc.clone());
        }
        let desc = self.compute_text(id)?;
        self.text.insert(id, desc.clone());
        Ok(desc)
    }

    fn compute_text(&mut self, id: DefId) -> Result<Option<Arc<SimpleDescription>>> {
        let schema = self.schema;
        let def = schema.type_def(id);
        let complex = match def.as_complex() {
            Some(c) => c,
            None => return Ok(None),
        };
        let base = match complex.base.key() {
            Some(key) => key,
            None => return Ok(None),
        };
        let base_text = |this: &mut Self| -> Result<Option<Arc<SimpleDescription>>> {
            match base {
                TypeKey::Def(b) if !schema.type_def(b).is_simple() => this.describe_text(b),
                TypeKey::Builtin(Builtin::AnyType) => Ok(None),
                key => this.describe(key).map(Some),
            }
        };
        match &complex.content {
            Content::Simple(sc) => {
                let inherited = match (complex.derivation, sc.inline_base) {
                    (DerivationMethod::Restriction, Some(inline)) => {
                        Some(self.describe(TypeKey::Def(inline))?)
                    }
                    _ => base_text(self)?,
                };
                let inherited = match inherited {
                    Some(d) => d,
                    None => return Ok(None),
                };
                if complex.derivation == DerivationMethod::Extension || sc.facets.is_empty() {
                    return Ok(Some(inherited));
                }
                let mut desc = (*inherited).clone();
                desc.key = TypeKey::Def(id);
                desc.label = def.label();
                if let Some(ws) = sc.facets.iter().find(|f| f.kind == FacetKind::WhiteSpace) {
                    let declared = WhiteSpace::parse(ws.value.trim())?;
                    if !inherited.white_space.allows_restriction_to(declared) {
                        return Err(Error::facet(
                            "whiteSpace",
                            format!("'{}' relaxes '{}'", declared, inherited.white_space),
                        ));
                    }
                    desc.white_space = declared;
                }
                let step = self
                    .build_step(&inherited, &sc.facets, TypeKey::Def(id))
                    .map_err(|e| e.in_component(format!("type {}", def.label())))?;
                desc.steps.push(step);
                Ok(Some(Arc::new(desc)))
            }
            Content::Complex(cc) if cc.particle.is_none() => base_text(self),
            _ => Ok(None),
        }
    }

    /// Check and canonicalize the facets of one restriction step against
    /// the description of its base
    fn build_step(
        &mut self,
        base: &SimpleDescription,
        facets: &[FacetDecl],
        owner: TypeKey,
    ) -> Result<FacetStep> {
        let mut step = FacetStep {
            owner: Some(owner),
            ..Default::default()
        };
        if facets.is_empty() {
            return Ok(step);
        }
        let variety = base.variety.ok_or_else(|| {
            Error::constraint(format!("{} cannot be restricted by facets", base.label))
        })?;
        let primitive = base.primitive();
        let mut patterns = Vec::new();

        for facet in facets {
            let kind = facet.kind;
            let applicable = match kind {
                FacetKind::Pattern | FacetKind::Enumeration => true,
                FacetKind::WhiteSpace => variety != Variety::Union,
                k if k.is_length() => match variety {
                    Variety::List => true,
                    Variety::Atomic => primitive.map_or(false, |p| p.has_length()),
                    Variety::Union => false,
                },
                k if k.is_digits() => primitive.map_or(false, |p| p.has_digits()),
                _ => variety == Variety::Atomic && primitive.map_or(false, |p| p.is_ordered()),
            };
            if !applicable {
                return Err(Error::facet(
                    kind.name(),
                    format!("not applicable to {} type {}", variety, base.label),
                ));
            }
            for prior in &base.steps {
                if let Some((_, value)) = prior.fixed.iter().find(|(k, _)| *k == kind) {
                    if value.trim() != facet.value.trim() {
                        return Err(Error::facet(
                            kind.name(),
                            format!("fixed to '{}' in the base type {}", value, base.label),
                        ));
                    }
                }
            }
            if facet.fixed {
                step.fixed.push((kind, facet.value.clone()));
            }

            match kind {
                FacetKind::Pattern => {
                    self.regex.validate(&facet.value)?;
                    patterns.push(facet.value.clone());
                }
                FacetKind::Enumeration => {
                    let checked = base.check(&facet.value, &facet.namespaces).map_err(|e| {
                        Error::facet(
                            "enumeration",
                            format!("invalid value '{}': {}", facet.value, e),
                        )
                    })?;
                    step.enumeration.push(EnumValue {
                        lexical: facet.value.clone(),
                        checked,
                    });
                }
                FacetKind::WhiteSpace => {}
                k if k.is_length() || k.is_digits() => {
                    let n: u32 = facet.value.trim().parse().map_err(|_| {
                        Error::facet(k.name(), format!("'{}' is not a valid count", facet.value))
                    })?;
                    if k == FacetKind::TotalDigits && n == 0 {
                        return Err(Error::facet(k.name(), "must be positive"));
                    }
                    if k.is_length() {
                        step.lengths.push((k, n));
                    } else {
                        step.digits.push((k, n));
                    }
                }
                k => {
                    let checked = base.check_atomic(&base.white_space.normalize(&facet.value), &facet.namespaces)
                        .map_err(|e| Error::facet(k.name(), format!("invalid bound '{}': {}", facet.value, e)))?;
                    let value = checked.value.ok_or_else(|| {
                        Error::facet(k.name(), format!("invalid bound '{}'", facet.value))
                    })?;
                    step.bounds.push(Bound {
                        kind: k,
                        value,
                        canonical: checked.canonical,
                    });
                }
            }
        }

        check_step_consistency(&step)?;
        check_narrows_base(&step, base)?;
        if !patterns.is_empty() {
            step.pattern = Some(self.regex.compile_set(&patterns)?);
        }
        Ok(step)
    }
}

fn check_step_consistency(step: &FacetStep) -> Result<()> {
    let get = |kind: FacetKind| step.lengths.iter().find(|(k, _)| *k == kind).map(|(_, n)| *n);
    if let (Some(min), Some(max)) = (get(FacetKind::MinLength), get(FacetKind::MaxLength)) {
        if min > max {
            return Err(Error::facet(
                "minLength",
                format!("{} is greater than maxLength {}", min, max),
            ));
        }
    }
    let total = step.digits.iter().find(|(k, _)| *k == FacetKind::TotalDigits);
    let fraction = step.digits.iter().find(|(k, _)| *k == FacetKind::FractionDigits);
    if let (Some((_, t)), Some((_, f))) = (total, fraction) {
        if f > t {
            return Err(Error::facet(
                "fractionDigits",
                format!("{} is greater than totalDigits {}", f, t),
            ));
        }
    }
    let bound = |kinds: &[FacetKind]| step.bounds.iter().find(|b| kinds.contains(&b.kind));
    if let (Some(lo), Some(hi)) = (
        bound(&[FacetKind::MinInclusive, FacetKind::MinExclusive]),
        bound(&[FacetKind::MaxInclusive, FacetKind::MaxExclusive]),
    ) {
        let ord = lo.value.compare(&hi.value)?;
        let inclusive = lo.kind == FacetKind::MinInclusive && hi.kind == FacetKind::MaxInclusive;
        if ord == Ordering::Greater || (ord == Ordering::Equal && !inclusive) {
            return Err(Error::facet(
                lo.kind.name(),
                format!("lower bound is not below {}", hi.kind.name()),
            ));
        }
    }
    Ok(())
}

/// Whether a new bound of kind `new` may stand where the base has a bound
/// of kind `base`, given how the two values compare
fn bound_allowed(new: FacetKind, base: FacetKind, ord: Ordering) -> bool {
    use FacetKind::{MaxExclusive, MaxInclusive, MinExclusive, MinInclusive};
    match (new, base) {
        (MaxInclusive, MaxInclusive)
        | (MaxExclusive, MaxExclusive)
        | (MaxExclusive, MaxInclusive)
        | (MinInclusive, MaxInclusive) => ord != Ordering::Greater,
        (MinInclusive, MinInclusive)
        | (MinExclusive, MinExclusive)
        | (MinExclusive, MinInclusive)
        | (MaxInclusive, MinInclusive) => ord != Ordering::Less,
        (MaxInclusive, MaxExclusive)
        | (MinInclusive, MaxExclusive)
        | (MinExclusive, MaxExclusive)
        | (MinExclusive, MaxInclusive) => ord == Ordering::Less,
        (MaxInclusive, MinExclusive)
        | (MaxExclusive, MinExclusive)
        | (MaxExclusive, MinInclusive)
        | (MinInclusive, MinExclusive) => ord == Ordering::Greater,
        _ => true,
    }
}

/// Reject facets of a step that widen the value space of its base
fn check_narrows_base(step: &FacetStep, base: &SimpleDescription) -> Result<()> {
    use FacetKind::{FractionDigits, Length, MaxLength, MinLength, TotalDigits};
    let widened = |kind: FacetKind, detail: String| {
        Err(Error::facet(
            kind.name(),
            format!("{} in the base type {}", detail, base.label),
        ))
    };
    for prior in &base.steps {
        for (kind, n) in &step.lengths {
            for (base_kind, m) in &prior.lengths {
                let ok = match (kind, base_kind) {
                    (Length, Length) => n == m,
                    (Length | MinLength, MaxLength) | (MinLength, Length) => n <= m,
                    (Length | MaxLength, MinLength) | (MaxLength, Length) => n >= m,
                    (MinLength, MinLength) => n >= m,
                    (MaxLength, MaxLength) => n <= m,
                    _ => true,
                };
                if !ok {
                    return widened(*kind, format!("{} conflicts with {} {}", n, base_kind.name(), m));
                }
            }
        }
        for (kind, n) in &step.digits {
            for (base_kind, m) in &prior.digits {
                let ok = match (kind, base_kind) {
                    (TotalDigits, TotalDigits)
                    | (FractionDigits, FractionDigits)
                    | (FractionDigits, TotalDigits) => n <= m,
                    _ => true,
                };
                if !ok {
                    return widened(*kind, format!("{} exceeds {} {}", n, base_kind.name(), m));
                }
            }
        }
        for bound in &step.bounds {
            for base_bound in &prior.bounds {
                // values without a total order cannot be told apart here
                let ord = match bound.value.compare(&base_bound.value) {
                    Ok(ord) => ord,
                    Err(_) => continue,
                };
                if !bound_allowed(bound.kind, base_bound.kind, ord) {
                    return widened(
                        bound.kind,
                        format!(
                            "'{}' is outside {} '{}'",
                            String::from_utf8_lossy(&bound.canonical),
                            base_bound.kind.name(),
                            String::from_utf8_lossy(&base_bound.canonical)
                        ),
                    );
                }
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::namespaces::QName;
    use crate::patterns::XsdRegexCompiler;
    use crate::reader::read_schema;
    use crate::resolver::{ResolvePolicy, Resolver};

    fn resolved(body: &str) -> ParsedSchema {
        let xsd = format!(
            r#"<xs:schema xmlns:xs="http://www.w3.org/2001/XMLSchema">{}</xs:schema>"#,
            body
        );
        let mut schema = read_schema(&xsd, "main.xsd").unwrap();
        schema.mark_semantic().unwrap();
        Resolver::new(&mut schema, ResolvePolicy::Required).resolve().unwrap();
        schema
    }

    fn key(schema: &ParsedSchema, name: &str) -> TypeKey {
        TypeKey::Def(schema.type_defs[&QName::local(name)])
    }

    #[test]
    fn test_restriction_facets() {
        let schema = resolved(
            r#"<xs:simpleType name="Small">
                 <xs:restriction base="xs:int">
                   <xs:minInclusive value="1"/><xs:maxExclusive value="10"/>
                 </xs:restriction>
               </xs:simpleType>"#,
        );
        let regex = XsdRegexCompiler;
        let mut d = Describer::new(&schema, &regex);
        let desc = d.describe(key(&schema, "Small")).unwrap();
        let ctx = NamespaceContext::new();
        assert_eq!(desc.check(" 09 ", &ctx).unwrap().canonical, b"9".to_vec());
        assert!(desc.check("10", &ctx).is_err());
        assert!(desc.check("0", &ctx).is_err());
        assert!(desc.check("x", &ctx).is_err());
    }

    #[test]
    fn test_patterns_conjoin_across_steps() {
        let schema = resolved(
            r#"<xs:simpleType name="A">
                 <xs:restriction base="xs:string">
                   <xs:pattern value="[a-z]+"/><xs:pattern value="[0-9]+"/>
                 </xs:restriction>
               </xs:simpleType>
               <xs:simpleType name="B">
                 <xs:restriction base="A"><xs:pattern value=".{3}"/></xs:restriction>
               </xs:simpleType>"#,
        );
        let regex = XsdRegexCompiler;
        let mut d = Describer::new(&schema, &regex);
        let b = d.describe(key(&schema, "B")).unwrap();
        let ctx = NamespaceContext::new();
        assert!(b.check("abc", &ctx).is_ok());
        assert!(b.check("123", &ctx).is_ok());
        assert!(b.check("ab", &ctx).is_err());
        assert!(b.check("a1c", &ctx).is_err());
    }

    #[test]
    fn test_union_enumeration_must_match_a_member() {
        let schema = resolved(
            r#"<xs:simpleType name="Color">
                 <xs:restriction base="xs:token">
                   <xs:enumeration value="red"/><xs:enumeration value="blue"/>
                 </xs:restriction>
               </xs:simpleType>
               <xs:simpleType name="U"><xs:union memberTypes="Color xs:int"/></xs:simpleType>
               <xs:simpleType name="R">
                 <xs:restriction base="U"><xs:enumeration value="green"/></xs:restriction>
               </xs:simpleType>"#,
        );
        let regex = XsdRegexCompiler;
        let mut d = Describer::new(&schema, &regex);
        let u = d.describe(key(&schema, "U")).unwrap();
        let ctx = NamespaceContext::new();
        assert_eq!(u.check("7", &ctx).unwrap().member, Some(1));
        assert_eq!(u.check("red", &ctx).unwrap().member, Some(0));
        let err = d.describe(key(&schema, "R")).unwrap_err();
        assert!(err.to_string().contains("does not match any member type"));
    }

    #[test]
    fn test_list_length_counts_items() {
        let schema = resolved(
            r#"<xs:simpleType name="L"><xs:list itemType="xs:int"/></xs:simpleType>
               <xs:simpleType name="Pair">
                 <xs:restriction base="L"><xs:length value="2"/></xs:restriction>
               </xs:simpleType>"#,
        );
        let regex = XsdRegexCompiler;
        let mut d = Describer::new(&schema, &regex);
        let pair = d.describe(key(&schema, "Pair")).unwrap();
        let ctx = NamespaceContext::new();
        let c = pair.check("  01 2 ", &ctx).unwrap();
        assert_eq!(c.canonical, b"1 2".to_vec());
        assert_eq!(c.items, 2);
        assert!(pair.check("1 2 3", &ctx).is_err());
    }

    #[test]
    fn test_facet_applicability() {
        let schema = resolved(
            r#"<xs:simpleType name="B">
                 <xs:restriction base="xs:boolean"><xs:maxLength value="2"/></xs:restriction>
               </xs:simpleType>
               <xs:simpleType name="S">
                 <xs:restriction base="xs:string"><xs:totalDigits value="2"/></xs:restriction>
               </xs:simpleType>"#,
        );
        let regex = XsdRegexCompiler;
        let mut d = Describer::new(&schema, &regex);
        let err = d.describe(key(&schema, "B")).unwrap_err();
        assert!(matches!(err.root_cause(), Error::FacetViolation { facet, .. } if facet == "maxLength"));
        assert!(d.describe(key(&schema, "S")).is_err());
    }

    #[test]
    fn test_bound_canonicalization_names_the_facet() {
        let schema = resolved(
            r#"<xs:simpleType name="D">
                 <xs:restriction base="xs:date"><xs:minInclusive value="2024-13-01"/></xs:restriction>
               </xs:simpleType>"#,
        );
        let regex = XsdRegexCompiler;
        let mut d = Describer::new(&schema, &regex);
        let err = d.describe(key(&schema, "D")).unwrap_err();
        assert!(err.to_string().contains("minInclusive"));
    }

    #[test]
    fn test_fixed_facet_cannot_change() {
        let schema = resolved(
            r#"<xs:simpleType name="A">
                 <xs:restriction base="xs:string"><xs:maxLength value="5" fixed="true"/></xs:restriction>
               </xs:simpleType>
               <xs:simpleType name="B">
                 <xs:restriction base="A"><xs:maxLength value="3"/></xs:restriction>
               </xs:simpleType>"#,
        );
        let regex = XsdRegexCompiler;
        let mut d = Describer::new(&schema, &regex);
        assert!(d.describe(key(&schema, "B")).is_err());
    }

    #[test]
    fn test_restriction_cannot_widen_base() {
        let schema = resolved(
            r#"<xs:simpleType name="A">
                 <xs:restriction base="xs:int"><xs:maxInclusive value="5"/></xs:restriction>
               </xs:simpleType>
               <xs:simpleType name="Wider">
                 <xs:restriction base="A"><xs:maxInclusive value="10"/></xs:restriction>
               </xs:simpleType>
               <xs:simpleType name="Narrower">
                 <xs:restriction base="A"><xs:maxExclusive value="5"/></xs:restriction>
               </xs:simpleType>
               <xs:simpleType name="Past">
                 <xs:restriction base="A"><xs:minExclusive value="5"/></xs:restriction>
               </xs:simpleType>"#,
        );
        let regex = XsdRegexCompiler;
        let mut d = Describer::new(&schema, &regex);
        let err = d.describe(key(&schema, "Wider")).unwrap_err();
        assert!(
            matches!(err.root_cause(), Error::FacetViolation { facet, .. } if facet == "maxInclusive"),
            "{:?}",
            err
        );
        let narrower = d.describe(key(&schema, "Narrower")).unwrap();
        let ctx = NamespaceContext::new();
        assert!(narrower.check("4", &ctx).is_ok());
        assert!(narrower.check("5", &ctx).is_err());
        assert!(d.describe(key(&schema, "Past")).is_err());
    }

    #[test]
    fn test_length_and_digits_cannot_widen_base() {
        let schema = resolved(
            r#"<xs:simpleType name="Code">
                 <xs:restriction base="xs:string">
                   <xs:minLength value="2"/><xs:maxLength value="8"/>
                 </xs:restriction>
               </xs:simpleType>
               <xs:simpleType name="Long">
                 <xs:restriction base="Code"><xs:maxLength value="9"/></xs:restriction>
               </xs:simpleType>
               <xs:simpleType name="Short">
                 <xs:restriction base="Code"><xs:length value="1"/></xs:restriction>
               </xs:simpleType>
               <xs:simpleType name="Mid">
                 <xs:restriction base="Code"><xs:length value="4"/></xs:restriction>
               </xs:simpleType>
               <xs:simpleType name="Amount">
                 <xs:restriction base="xs:decimal">
                   <xs:totalDigits value="6"/><xs:fractionDigits value="2"/>
                 </xs:restriction>
               </xs:simpleType>
               <xs:simpleType name="Precise">
                 <xs:restriction base="Amount"><xs:fractionDigits value="3"/></xs:restriction>
               </xs:simpleType>
               <xs:simpleType name="Small">
                 <xs:restriction base="Amount"><xs:totalDigits value="4"/></xs:restriction>
               </xs:simpleType>"#,
        );
        let regex = XsdRegexCompiler;
        let mut d = Describer::new(&schema, &regex);
        assert!(d.describe(key(&schema, "Long")).is_err());
        assert!(d.describe(key(&schema, "Short")).is_err());
        assert!(d.describe(key(&schema, "Mid")).is_ok());
        let err = d.describe(key(&schema, "Precise")).unwrap_err();
        assert!(matches!(err.root_cause(), Error::FacetViolation { facet, .. } if facet == "fractionDigits"));
        assert!(d.describe(key(&schema, "Small")).is_ok());
    }

    #[test]
    fn test_simple_content_text() {
        let schema = resolved(
            r#"<xs:complexType name="Price">
                 <xs:simpleContent>
                   <xs:extension base="xs:decimal"><xs:attribute name="cur" type="xs:string"/></xs:extension>
                 </xs:simpleContent>
               </xs:complexType>
               <xs:complexType name="SmallPrice">
                 <xs:simpleContent>
                   <xs:restriction base="Price"><xs:maxInclusive value="100"/></xs:restriction>
                 </xs:simpleContent>
               </xs:complexType>"#,
        );
        let regex = XsdRegexCompiler;
        let mut d = Describer::new(&schema, &regex);
        let id = schema.type_defs[&QName::local("SmallPrice")];
        let text = d.describe_text(id).unwrap().unwrap();
        let ctx = NamespaceContext::new();
        assert_eq!(text.check("99.50", &ctx).unwrap().canonical, b"99.5".to_vec());
        assert!(text.check("100.5", &ctx).is_err());
    }
}
