//! Runtime schema
//!
//! The immutable output of a build: dense tables cross-referenced by integer
//! IDs, in which 0 always means none. Every ID-indexed table keeps an unused
//! row 0 so that `table[id]` needs no adjustment.

pub mod hash;
pub mod symbols;

pub use hash::{fnv1a64, Fnv64, StableHash};
pub use symbols::{NamespaceId, SymbolId, SymbolTable, NO_NAMESPACE, XML_NAMESPACE_ID, XSI_NAMESPACE_ID};

use serde::Serialize;

use crate::compiler::{
    DeclValues, EnumId, EnumTable, FacetInstr, PatternEntry, UnionValidator, ValidatorId,
    ValidatorMeta, ValueRef,
};
use crate::error::{Error, Result};
use crate::models::{CounterRow, Dfa, Nfa};
use crate::registry::{Ancestors, AttrId, ElemId, TypeId};
use crate::values::{IntegerKind, StringKind};

/// Dense complex type ID; 0 is none
pub type ComplexId = u32;
/// Dense wildcard rule ID; 0 is none
pub type WildcardId = u32;
/// Dense identity-constraint ID; 0 is none
pub type IcId = u32;
/// Dense path ID; 0 is none
pub type PathId = u32;
/// Dense matcher ID; 0 is none
pub type MatcherId = u32;

/// Variety of a type row
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize)]
pub enum TypeKind {
    /// Unused row
    #[default]
    None,
    /// XSD built-in
    Builtin,
    /// Schema simple type
    Simple,
    /// Schema complex type
    Complex,
}

/// One type
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize)]
pub struct TypeRow {
    /// Variety
    pub kind: TypeKind,
    /// Name, 0 for anonymous types
    pub name: SymbolId,
    /// Base type, 0 for `anyType`
    pub base: TypeId,
    /// Derivation method from the base
    pub derivation: u8,
    /// `final` set
    pub final_set: u8,
    /// `block` set
    pub block: u8,
    /// `abstract`
    pub is_abstract: bool,
    /// Simple type validator, or text validator of a complex type
    pub validator: ValidatorId,
    /// Complex type row, 0 for simple types
    pub complex: ComplexId,
    /// Start of the ancestor chain
    pub ancestors_off: u32,
    /// Length of the ancestor chain
    pub ancestors_len: u32,
}

/// Content variety of a complex type
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize)]
pub enum ContentKind {
    /// No content
    #[default]
    Empty,
    /// Character data only
    Simple,
    /// Child elements only
    ElementOnly,
    /// Child elements and character data
    Mixed,
}

/// Kind of content model
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize)]
pub enum ModelKind {
    /// No element content
    #[default]
    None,
    /// `models.dfas[index]`
    Dfa,
    /// `models.nfas[index]`
    Nfa,
    /// `models.alls[index]`
    All,
}

/// Reference to a content model
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize)]
pub struct ModelRef {
    /// Kind
    pub kind: ModelKind,
    /// Index into the table of the kind
    pub index: u32,
}

/// Lookup structure of an attribute-use set
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize)]
pub enum AttrLookup {
    /// Linear scan
    #[default]
    SmallLinear,
    /// Binary search over uses sorted by symbol
    SortedBinary,
    /// Open-addressed table
    Hash,
}

/// The attribute uses of one complex type
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize)]
pub struct AttrSet {
    /// Start in `attr_index.uses`
    pub off: u32,
    /// Number of uses
    pub len: u32,
    /// Lookup mode
    pub mode: AttrLookup,
    /// Start in `attr_index.hash`, for [`AttrLookup::Hash`]
    pub hash_off: u32,
    /// Table size, a power of two
    pub hash_len: u32,
}

/// One complex type
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize)]
pub struct ComplexTypeRow {
    /// Type ID of the row
    pub type_id: TypeId,
    /// Content variety
    pub content: ContentKind,
    /// Attribute uses
    pub attrs: AttrSet,
    /// Attribute wildcard, 0 if none
    pub any_attribute: WildcardId,
    /// Validator of simple content, 0 otherwise
    pub text_validator: ValidatorId,
    /// `default` and `fixed` of the character content; only an anonymous
    /// type has them, taken from the element that declares it
    pub text_values: DeclValues,
    /// Element content model
    pub model: ModelRef,
    /// Character data allowed between children
    pub mixed: bool,
}

/// One element declaration
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize)]
pub struct ElementRow {
    /// Name
    pub name: SymbolId,
    /// Type
    pub type_id: TypeId,
    /// Substitution group head, 0 if none
    pub substitution_head: ElemId,
    /// `default` and `fixed`
    pub values: DeclValues,
    /// `FLAG_*` bits
    pub flags: u8,
    /// `block` set
    pub block: u8,
    /// `final` set
    pub final_set: u8,
    /// Start in `elem_ics`
    pub ic_off: u32,
    /// Number of identity constraints
    pub ic_len: u32,
}

impl ElementRow {
    /// `nillable="true"`
    pub const FLAG_NILLABLE: u8 = 1;
    /// `abstract="true"`
    pub const FLAG_ABSTRACT: u8 = 2;
    /// Top-level declaration
    pub const FLAG_GLOBAL: u8 = 4;
}

/// One attribute declaration
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize)]
pub struct AttributeRow {
    /// Name
    pub name: SymbolId,
    /// Type
    pub type_id: TypeId,
    /// Validator of the type
    pub validator: ValidatorId,
    /// `default` and `fixed`
    pub values: DeclValues,
}

/// `use` of an attribute use
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize)]
pub enum UseKind {
    /// `optional`
    #[default]
    Optional,
    /// `required`
    Required,
    /// `prohibited`; kept so the attribute is rejected
    Prohibited,
}

/// One attribute use of a complex type
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize)]
pub struct AttrUse {
    /// Attribute name
    pub name: SymbolId,
    /// Declaration
    pub attribute: AttrId,
    /// Validator of the attribute type
    pub validator: ValidatorId,
    /// `use`
    pub use_kind: UseKind,
    /// Effective `default` and `fixed`
    pub values: DeclValues,
}

/// Attribute uses of all complex types
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct AttrIndex {
    /// Uses, one contiguous run per complex type
    pub uses: Vec<AttrUse>,
    /// Hash tables of [`AttrLookup::Hash`] sets; a slot holds `use index + 1`
    pub hash: Vec<u32>,
}

/// Validator tables
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Validators {
    /// Metadata by validator ID
    pub meta: Vec<ValidatorMeta>,
    /// Subtable sizes per kind
    pub kind_counts: Vec<u32>,
    /// String subtable
    pub strings: Vec<StringKind>,
    /// Integer subtable
    pub integers: Vec<IntegerKind>,
    /// List subtable
    pub lists: Vec<ValidatorId>,
    /// Union subtable
    pub unions: Vec<UnionValidator>,
    /// Member validators of unions
    pub union_members: Vec<ValidatorId>,
    /// Member types of unions
    pub union_member_types: Vec<TypeId>,
}

/// Position matcher of a content model
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Matcher {
    /// One element declaration
    PosExact {
        /// Element name
        symbol: SymbolId,
        /// Declaration
        element: ElemId,
    },
    /// A wildcard
    PosWildcard {
        /// Wildcard rule
        wildcard: WildcardId,
    },
}

/// An `all` group
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize)]
pub struct AllRow {
    /// Start in `all_members`
    pub members_off: u32,
    /// Number of members
    pub members_len: u32,
    /// Whether the group may be absent
    pub emptiable: bool,
}

/// Member of an `all` group
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize)]
pub struct AllMemberRow {
    /// Declaration
    pub element: ElemId,
    /// `minOccurs="0"`
    pub optional: bool,
    /// Substitution is not blocked
    pub allows_substitution: bool,
    /// Start in `all_substitutes`
    pub subst_off: u32,
    /// Number of substitutes
    pub subst_len: u32,
}

/// Content models
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Models {
    /// Dense automata
    pub dfas: Vec<Dfa>,
    /// Follow-set automata
    pub nfas: Vec<Nfa>,
    /// `all` groups
    pub alls: Vec<AllRow>,
    /// Members of `all` groups
    pub all_members: Vec<AllMemberRow>,
    /// Substitution-group members of `all` group members
    pub all_substitutes: Vec<ElemId>,
    /// Matchers by matcher ID; slot 0 is unused
    pub matchers: Vec<Matcher>,
}

/// Namespace constraint kind of a wildcard rule
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize)]
pub enum NamespaceKind {
    /// Every namespace
    #[default]
    Any,
    /// Every namespace except the listed ones
    Not,
    /// Exactly the listed namespaces
    Enumeration,
}

/// One element or attribute wildcard
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize)]
pub struct WildcardRule {
    /// Constraint kind
    pub kind: NamespaceKind,
    /// The target namespace is listed
    pub has_target: bool,
    /// The absent namespace is listed
    pub has_local: bool,
    /// Start in `wildcard_ns`
    pub off: u32,
    /// Number of listed namespaces
    pub len: u32,
    /// processContents code: 0 strict, 1 lax, 2 skip
    pub process_contents: u8,
    /// Target namespace of the declaring document
    pub target_namespace: NamespaceId,
}

/// Category of an identity constraint
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize)]
pub enum IcCategory {
    /// `xs:unique`
    #[default]
    Unique,
    /// `xs:key`
    Key,
    /// `xs:keyref`
    KeyRef,
}

/// Run of paths making up one selector or field
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize)]
pub struct PathSlice {
    /// First path ID
    pub off: u32,
    /// Number of alternatives
    pub len: u32,
}

/// One identity constraint
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize)]
pub struct IcRow {
    /// Name
    pub name: SymbolId,
    /// Category
    pub category: IcCategory,
    /// Selector alternatives
    pub selector: PathSlice,
    /// Start in `ic_fields`
    pub fields_off: u32,
    /// Number of fields
    pub fields_len: u32,
    /// Referenced key or unique, for keyrefs
    pub refer: IcId,
}

/// Axis of a runtime path step
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize)]
pub enum PathAxis {
    /// Child element
    #[default]
    Child,
    /// Attribute
    Attribute,
    /// Context element
    SelfNode,
}

/// Name test of a runtime path step
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize)]
pub enum PathTest {
    /// Any name
    #[default]
    Any,
    /// Any name in `namespace`
    Namespace,
    /// Exactly `symbol`
    Name,
}

/// One step of a runtime path
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize)]
pub struct PathStepRow {
    /// Axis
    pub axis: PathAxis,
    /// Name test
    pub test: PathTest,
    /// Namespace, for namespace tests
    pub namespace: NamespaceId,
    /// Name, for name tests
    pub symbol: SymbolId,
}

/// One path alternative
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize)]
pub struct PathRow {
    /// Leading `.//`
    pub descendant: bool,
    /// Start in `path_steps`
    pub steps_off: u32,
    /// Number of steps
    pub steps_len: u32,
}

/// Identity-constraint tables
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct IdentityTables {
    /// Constraints by IC ID; slot 0 is unused
    pub ics: Vec<IcRow>,
    /// Constraint IDs per element, sliced by `ElementRow::ic_off`
    pub elem_ics: Vec<IcId>,
    /// Fields of all constraints
    pub fields: Vec<PathSlice>,
    /// Paths by path ID; slot 0 is unused
    pub paths: Vec<PathRow>,
    /// Steps of all paths
    pub path_steps: Vec<PathStepRow>,
}

/// The compiled schema
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RuntimeSchema {
    /// Interned names
    pub symbols: SymbolTable,
    /// Types by type ID
    pub types: Vec<TypeRow>,
    /// Ancestor chains
    pub ancestors: Ancestors,
    /// Complex types by complex ID
    pub complex_types: Vec<ComplexTypeRow>,
    /// Elements by element ID
    pub elements: Vec<ElementRow>,
    /// Attributes by attribute ID
    pub attributes: Vec<AttributeRow>,
    /// Attribute uses of complex types
    pub attr_index: AttrIndex,
    /// Validators
    pub validators: Validators,
    /// Facet instruction arena
    pub facets: Vec<FacetInstr>,
    /// Pattern sets by pattern ID
    pub patterns: Vec<PatternEntry>,
    /// Enumeration tables by enumeration ID
    pub enums: Vec<EnumTable>,
    /// Canonical value bytes
    pub values: Vec<u8>,
    /// Content models
    pub models: Models,
    /// Wildcard rules by wildcard ID; slot 0 is unused
    pub wildcards: Vec<WildcardRule>,
    /// Namespaces listed by wildcard rules
    pub wildcard_ns: Vec<NamespaceId>,
    /// Identity constraints
    pub identity: IdentityTables,
    /// Global types by symbol ID
    pub global_types: Vec<TypeId>,
    /// Global elements by symbol ID
    pub global_elements: Vec<ElemId>,
    /// Global attributes by symbol ID
    pub global_attributes: Vec<AttrId>,
    /// Digest of everything above; never 0 once built
    pub build_hash: u64,
}

fn nonzero(id: u32) -> Option<u32> {
    (id != 0).then_some(id)
}

impl RuntimeSchema {
    /// Symbol of a QName
    pub fn symbol(&self, namespace: &str, local: &str) -> Option<SymbolId> {
        self.symbols.lookup(namespace, local)
    }

    /// Global element named by a symbol
    pub fn global_element(&self, sym: SymbolId) -> Option<ElemId> {
        self.global_elements.get(sym as usize).copied().and_then(nonzero)
    }

    /// Global type named by a symbol
    pub fn global_type(&self, sym: SymbolId) -> Option<TypeId> {
        self.global_types.get(sym as usize).copied().and_then(nonzero)
    }

    /// Global attribute named by a symbol
    pub fn global_attribute(&self, sym: SymbolId) -> Option<AttrId> {
        self.global_attributes.get(sym as usize).copied().and_then(nonzero)
    }

    /// Type row of a type ID
    pub fn type_row(&self, id: TypeId) -> Option<&TypeRow> {
        match id {
            0 => None,
            id => self.types.get(id as usize),
        }
    }

    /// Element row of an element ID
    pub fn element(&self, id: ElemId) -> Option<&ElementRow> {
        match id {
            0 => None,
            id => self.elements.get(id as usize),
        }
    }

    /// Complex type row of a type ID
    pub fn complex_type(&self, id: TypeId) -> Option<&ComplexTypeRow> {
        self.type_row(id)
            .and_then(|t| nonzero(t.complex))
            .and_then(|c| self.complex_types.get(c as usize))
    }

    /// Enumeration table of an enumeration ID
    pub fn enum_table(&self, id: EnumId) -> Option<&EnumTable> {
        match id {
            0 => None,
            id => self.enums.get(id as usize),
        }
    }

    /// Attribute uses of a complex type
    pub fn attribute_uses(&self, complex: ComplexId) -> &[AttrUse] {
        match self.complex_types.get(complex as usize) {
            Some(c) if complex != 0 => self
                .attr_index
                .uses
                .get(c.attrs.off as usize..(c.attrs.off + c.attrs.len) as usize)
                .unwrap_or(&[]),
            _ => &[],
        }
    }

    /// Attribute use of a complex type by attribute name
    pub fn attribute_use(&self, complex: ComplexId, sym: SymbolId) -> Option<&AttrUse> {
        let set = self.complex_types.get(complex as usize).filter(|_| complex != 0)?.attrs;
        let uses = self.attribute_uses(complex);
        match set.mode {
            AttrLookup::SmallLinear => uses.iter().find(|u| u.name == sym),
            AttrLookup::SortedBinary => uses
                .binary_search_by_key(&sym, |u| u.name)
                .ok()
                .map(|i| &uses[i]),
            AttrLookup::Hash => {
                let table = self
                    .attr_index
                    .hash
                    .get(set.hash_off as usize..(set.hash_off + set.hash_len) as usize)?;
                if table.is_empty() {
                    return None;
                }
                let mask = table.len() - 1;
                let mut slot = attr_slot(sym) & mask;
                for _ in 0..table.len() {
                    match table[slot] {
                        0 => return None,
                        i => {
                            let u = uses.get(i as usize - 1)?;
                            if u.name == sym {
                                return Some(u);
                            }
                        }
                    }
                    slot = (slot + 1) & mask;
                }
                None
            }
        }
    }

    /// Validator bound to a type
    pub fn validator_of(&self, id: TypeId) -> Option<&ValidatorMeta> {
        let v = self.type_row(id)?.validator;
        match v {
            0 => None,
            v => self.validators.meta.get(v as usize),
        }
    }

    /// Bytes of a value reference
    pub fn value_bytes(&self, v: &ValueRef) -> Option<&[u8]> {
        v.present.then(|| v.bytes(&self.values))
    }

    /// Digest of every observable table
    ///
    /// Tables are fed in a fixed order, each prefixed by its length, with
    /// little-endian primitives. A zero digest is remapped to 1.
    pub fn compute_hash(&self) -> u64 {
        let mut h = Fnv64::new();
        self.symbols.stable_hash(&mut h);
        self.types.stable_hash(&mut h);
        self.ancestors.stable_hash(&mut h);
        self.complex_types.stable_hash(&mut h);
        self.elements.stable_hash(&mut h);
        self.attributes.stable_hash(&mut h);
        self.attr_index.uses.stable_hash(&mut h);
        self.attr_index.hash.stable_hash(&mut h);
        self.validators.stable_hash(&mut h);
        self.facets.stable_hash(&mut h);
        self.patterns.stable_hash(&mut h);
        self.enums.stable_hash(&mut h);
        h.blob(&self.values);
        self.models.stable_hash(&mut h);
        self.wildcards.stable_hash(&mut h);
        self.wildcard_ns.stable_hash(&mut h);
        self.identity.stable_hash(&mut h);
        self.global_types.stable_hash(&mut h);
        self.global_elements.stable_hash(&mut h);
        self.global_attributes.stable_hash(&mut h);
        h.finish_nonzero()
    }

    /// Pretty JSON dump of the tables
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self)
            .map_err(|e| Error::constraint(format!("cannot serialize runtime schema: {}", e)))
    }
}

/// Home slot of a symbol in an attribute hash table
pub fn attr_slot(sym: SymbolId) -> usize {
    (sym as u64).wrapping_mul(0x9e37_79b9_7f4a_7c15).rotate_right(32) as usize
}

impl StableHash for TypeRow {
    fn stable_hash(&self, h: &mut Fnv64) {
        h.u8(self.kind as u8);
        h.u32(self.name);
        h.u32(self.base);
        h.u8(self.derivation);
        h.u8(self.final_set);
        h.u8(self.block);
        h.bool(self.is_abstract);
        h.u32(self.validator);
        h.u32(self.complex);
        h.u32(self.ancestors_off);
        h.u32(self.ancestors_len);
    }
}

impl StableHash for Ancestors {
    fn stable_hash(&self, h: &mut Fnv64) {
        self.ids.stable_hash(h);
        self.masks.stable_hash(h);
        self.offsets.stable_hash(h);
        self.lengths.stable_hash(h);
    }
}

impl StableHash for ModelRef {
    fn stable_hash(&self, h: &mut Fnv64) {
        h.u8(self.kind as u8);
        h.u32(self.index);
    }
}

impl StableHash for AttrSet {
    fn stable_hash(&self, h: &mut Fnv64) {
        h.u32(self.off);
        h.u32(self.len);
        h.u8(self.mode as u8);
        h.u32(self.hash_off);
        h.u32(self.hash_len);
    }
}

impl StableHash for ComplexTypeRow {
    fn stable_hash(&self, h: &mut Fnv64) {
        h.u32(self.type_id);
        h.u8(self.content as u8);
        self.attrs.stable_hash(h);
        h.u32(self.any_attribute);
        h.u32(self.text_validator);
        self.text_values.stable_hash(h);
        self.model.stable_hash(h);
        h.bool(self.mixed);
    }
}

impl StableHash for ElementRow {
    fn stable_hash(&self, h: &mut Fnv64) {
        h.u32(self.name);
        h.u32(self.type_id);
        h.u32(self.substitution_head);
        self.values.stable_hash(h);
        h.u8(self.flags);
        h.u8(self.block);
        h.u8(self.final_set);
        h.u32(self.ic_off);
        h.u32(self.ic_len);
    }
}

impl StableHash for AttributeRow {
    fn stable_hash(&self, h: &mut Fnv64) {
        h.u32(self.name);
        h.u32(self.type_id);
        h.u32(self.validator);
        self.values.stable_hash(h);
    }
}

impl StableHash for AttrUse {
    fn stable_hash(&self, h: &mut Fnv64) {
        h.u32(self.name);
        h.u32(self.attribute);
        h.u32(self.validator);
        h.u8(self.use_kind as u8);
        self.values.stable_hash(h);
    }
}

impl StableHash for Validators {
    fn stable_hash(&self, h: &mut Fnv64) {
        self.meta.stable_hash(h);
        self.kind_counts.stable_hash(h);
        h.len(self.strings.len());
        for s in &self.strings {
            h.u8(*s as u8);
        }
        h.len(self.integers.len());
        for i in &self.integers {
            h.u8(*i as u8);
        }
        self.lists.stable_hash(h);
        self.unions.stable_hash(h);
        self.union_members.stable_hash(h);
        self.union_member_types.stable_hash(h);
    }
}

impl StableHash for Dfa {
    fn stable_hash(&self, h: &mut Fnv64) {
        h.u32(self.states);
        self.columns.stable_hash(h);
        self.table.stable_hash(h);
        self.accepting.stable_hash(h);
        self.counters.stable_hash(h);
    }
}

impl StableHash for CounterRow {
    fn stable_hash(&self, h: &mut Fnv64) {
        self.positions.stable_hash(h);
        h.u32(self.min);
        h.u32(self.max);
    }
}

impl StableHash for Nfa {
    fn stable_hash(&self, h: &mut Fnv64) {
        h.u32(self.positions);
        h.u32(self.words);
        self.matchers.stable_hash(h);
        self.first.stable_hash(h);
        self.last.stable_hash(h);
        self.follow.stable_hash(h);
        h.bool(self.nullable);
        self.counters.stable_hash(h);
    }
}

impl StableHash for Matcher {
    fn stable_hash(&self, h: &mut Fnv64) {
        match self {
            Matcher::PosExact { symbol, element } => {
                h.u8(0);
                h.u32(*symbol);
                h.u32(*element);
            }
            Matcher::PosWildcard { wildcard } => {
                h.u8(1);
                h.u32(*wildcard);
            }
        }
    }
}

impl StableHash for AllRow {
    fn stable_hash(&self, h: &mut Fnv64) {
        h.u32(self.members_off);
        h.u32(self.members_len);
        h.bool(self.emptiable);
    }
}

impl StableHash for AllMemberRow {
    fn stable_hash(&self, h: &mut Fnv64) {
        h.u32(self.element);
        h.bool(self.optional);
        h.bool(self.allows_substitution);
        h.u32(self.subst_off);
        h.u32(self.subst_len);
    }
}

impl StableHash for Models {
    fn stable_hash(&self, h: &mut Fnv64) {
        self.dfas.stable_hash(h);
        self.nfas.stable_hash(h);
        self.alls.stable_hash(h);
        self.all_members.stable_hash(h);
        self.all_substitutes.stable_hash(h);
        self.matchers.stable_hash(h);
    }
}

impl StableHash for WildcardRule {
    fn stable_hash(&self, h: &mut Fnv64) {
        h.u8(self.kind as u8);
        h.bool(self.has_target);
        h.bool(self.has_local);
        h.u32(self.off);
        h.u32(self.len);
        h.u8(self.process_contents);
        h.u32(self.target_namespace);
    }
}

impl StableHash for PathSlice {
    fn stable_hash(&self, h: &mut Fnv64) {
        h.u32(self.off);
        h.u32(self.len);
    }
}

impl StableHash for IcRow {
    fn stable_hash(&self, h: &mut Fnv64) {
        h.u32(self.name);
        h.u8(self.category as u8);
        self.selector.stable_hash(h);
        h.u32(self.fields_off);
        h.u32(self.fields_len);
        h.u32(self.refer);
    }
}

impl StableHash for PathStepRow {
    fn stable_hash(&self, h: &mut Fnv64) {
        h.u8(self.axis as u8);
        h.u8(self.test as u8);
        h.u32(self.namespace);
        h.u32(self.symbol);
    }
}

impl StableHash for PathRow {
    fn stable_hash(&self, h: &mut Fnv64) {
        h.bool(self.descendant);
        h.u32(self.steps_off);
        h.u32(self.steps_len);
    }
}

impl StableHash for IdentityTables {
    fn stable_hash(&self, h: &mut Fnv64) {
        self.ics.stable_hash(h);
        self.elem_ics.stable_hash(h);
        self.fields.stable_hash(h);
        self.paths.stable_hash(h);
        self.path_steps.stable_hash(h);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::namespaces::QName;

    fn with_uses(mode: AttrLookup, names: &[SymbolId]) -> RuntimeSchema {
        let mut schema = RuntimeSchema::default();
        let mut uses: Vec<AttrUse> = names
            .iter()
            .map(|n| AttrUse {
                name: *n,
                attribute: *n + 100,
                ..Default::default()
            })
            .collect();
        if mode == AttrLookup::SortedBinary {
            uses.sort_by_key(|u| u.name);
        }
        let mut set = AttrSet {
            off: 0,
            len: uses.len() as u32,
            mode,
            ..Default::default()
        };
        if mode == AttrLookup::Hash {
            let size = (uses.len() * 2).next_power_of_two();
            let mut table = vec![0u32; size];
            for (i, u) in uses.iter().enumerate() {
                let mut slot = attr_slot(u.name) & (size - 1);
                while table[slot] != 0 {
                    slot = (slot + 1) & (size - 1);
                }
                table[slot] = i as u32 + 1;
            }
            set.hash_len = size as u32;
            schema.attr_index.hash = table;
        }
        schema.attr_index.uses = uses;
        schema.complex_types = vec![
            ComplexTypeRow::default(),
            ComplexTypeRow {
                attrs: set,
                ..Default::default()
            },
        ];
        schema
    }

    #[test]
    fn test_attribute_use_lookup_modes() {
        for mode in [AttrLookup::SmallLinear, AttrLookup::SortedBinary, AttrLookup::Hash] {
            let schema = with_uses(mode, &[7, 3, 12, 5]);
            for sym in [7, 3, 12, 5] {
                let found = schema.attribute_use(1, sym).map(|u| u.attribute);
                assert_eq!(found, Some(sym + 100), "{:?} {}", mode, sym);
            }
            assert!(schema.attribute_use(1, 4).is_none());
            assert!(schema.attribute_use(0, 7).is_none());
        }
    }

    #[test]
    fn test_hash_changes_with_content() {
        let a = RuntimeSchema::default();
        let mut b = RuntimeSchema::default();
        assert_eq!(a.compute_hash(), b.compute_hash());
        assert_ne!(a.compute_hash(), 0);
        let sym = b.symbols.intern(&QName::local("x"));
        b.global_elements = vec![0; sym as usize + 1];
        assert_ne!(a.compute_hash(), b.compute_hash());
    }

    #[test]
    fn test_global_lookup() {
        let mut schema = RuntimeSchema::default();
        let root = schema.symbols.intern(&QName::new("urn:x", "root"));
        schema.global_elements = vec![0; root as usize + 1];
        schema.global_elements[root as usize] = 1;
        assert_eq!(schema.symbol("urn:x", "root"), Some(root));
        assert_eq!(schema.global_element(root), Some(1));
        assert_eq!(schema.global_type(root), None);
        assert!(schema.to_json().unwrap().contains("global_elements"));
    }
}
