//! Attribute uses and attribute wildcards of complex types
//!
//! The uses of a complex type are merged along its derivation chain, base
//! first. Extension adds uses and unions the wildcards; restriction replaces
//! uses by name and intersects the wildcards. A prohibited use stays in the
//! merged set so that the attribute is rejected at validation time.

use std::collections::{HashMap, HashSet};

use crate::error::{ComponentKind, Error, Result};
use crate::limits::Limits;
use crate::namespaces::QName;
use crate::runtime::{attr_slot, AttrIndex, AttrLookup, AttrSet, AttrUse, UseKind};
use crate::schema::{
    AttrHandle, AttributeUse, AttributeWildcard, DefId, DerivationMethod, ParsedSchema, TypeKey,
    Wildcard,
};
use crate::semantic::references;

/// One attribute use after merging
#[derive(Debug, Clone, PartialEq)]
pub(super) struct MergedUse {
    /// Attribute name
    pub name: QName,
    /// Declaration, references followed
    pub decl: AttrHandle,
    /// The use as written, which may carry its own default or fixed value
    pub source: AttrHandle,
    pub use_kind: AttributeUse,
}

/// Effective attribute uses and wildcard of a complex type
#[derive(Debug, Clone, Default, PartialEq)]
pub(super) struct MergedAttributes {
    pub uses: Vec<MergedUse>,
    pub wildcard: Option<AttributeWildcard>,
}

/// Merges attribute uses, memoized per type definition
pub(super) struct AttributeMerger<'a> {
    schema: &'a ParsedSchema,
    memo: HashMap<DefId, MergedAttributes>,
}

impl<'a> AttributeMerger<'a> {
    pub fn new(schema: &'a ParsedSchema) -> Self {
        Self {
            schema,
            memo: HashMap::new(),
        }
    }

    /// Effective attributes of a complex type
    pub fn merged(&mut self, id: DefId) -> Result<MergedAttributes> {
        let chain = self.complex_chain(id);
        let mut acc: Option<MergedAttributes> = None;
        for def_id in chain {
            if let Some(done) = self.memo.get(&def_id) {
                acc = Some(done.clone());
                continue;
            }
            let step = self.derive(def_id, acc.as_ref())?;
            self.memo.insert(def_id, step.clone());
            acc = Some(step);
        }
        Ok(acc.unwrap_or_default())
    }

    /// `id` and its complex schema-defined bases, base-most first
    fn complex_chain(&self, id: DefId) -> Vec<DefId> {
        let mut chain = Vec::new();
        let mut current = Some(id);
        while let Some(def_id) = current {
            if chain.len() > self.schema.types.len() || chain.contains(&def_id) {
                break;
            }
            let complex = match self.schema.type_def(def_id).as_complex() {
                Some(c) => c,
                None => break,
            };
            chain.push(def_id);
            current = match complex.base.key() {
                Some(TypeKey::Def(base)) => Some(base),
                _ => None,
            };
        }
        chain.reverse();
        chain
    }

    /// Attributes of one derivation step; `base` is `None` when the base is
    /// `anyType` or a simple type
    fn derive(&self, id: DefId, base: Option<&MergedAttributes>) -> Result<MergedAttributes> {
        let complex = match self.schema.type_def(id).as_complex() {
            Some(c) => c,
            None => return Ok(MergedAttributes::default()),
        };
        let local = local_attributes(
            self.schema,
            &complex.attributes,
            &complex.attribute_group_refs,
            complex.any_attribute.as_ref(),
        )?;
        let empty = MergedAttributes::default();
        let inherited = base.unwrap_or(&empty);
        let mut uses = inherited.uses.clone();

        let wildcard = match complex.derivation {
            DerivationMethod::Extension => {
                for u in local.uses {
                    if uses.iter().any(|b| b.name == u.name) {
                        return Err(Error::constraint(format!(
                            "attribute '{}' is already used by the base type",
                            u.name
                        )));
                    }
                    uses.push(u);
                }
                match (local.wildcard, &inherited.wildcard) {
                    (Some(l), Some(b)) => Some(l.union(b)?),
                    (Some(l), None) => Some(l),
                    (None, b) => b.clone(),
                }
            }
            DerivationMethod::Restriction => {
                for u in local.uses {
                    match uses.iter_mut().find(|b| b.name == u.name) {
                        Some(slot) => *slot = u,
                        None => uses.push(u),
                    }
                }
                match (local.wildcard, &inherited.wildcard) {
                    (Some(l), Some(b)) => Some(l.intersect(b)?),
                    (Some(l), None) if base.is_none() => Some(l),
                    (Some(_), None) => {
                        return Err(Error::constraint(
                            "restriction adds an attribute wildcard the base type does not have",
                        ))
                    }
                    (None, _) => None,
                }
            }
        };
        Ok(MergedAttributes { uses, wildcard })
    }
}

fn push_uses(schema: &ParsedSchema, handles: &[AttrHandle], uses: &mut Vec<MergedUse>) -> Result<()> {
    for h in handles {
        let decl = references::attribute_target(schema, *h)?;
        let name = schema.attribute(decl).name.clone();
        if uses.iter().any(|u| u.name == name) {
            return Err(Error::constraint(format!(
                "attribute '{}' is used more than once",
                name
            )));
        }
        uses.push(MergedUse {
            name,
            decl,
            source: *h,
            use_kind: schema.attribute(*h).use_kind,
        });
    }
    Ok(())
}

/// Local uses of a complex type with its attribute groups expanded
///
/// Groups are expanded depth-first in source order. A group reached twice
/// contributes once; circular groups were rejected before the build. The
/// local wildcard is the intersection of the written `anyAttribute` and the
/// wildcards of the groups.
pub(super) fn local_attributes(
    schema: &ParsedSchema,
    attributes: &[AttrHandle],
    group_refs: &[QName],
    any_attribute: Option<&Wildcard>,
) -> Result<MergedAttributes> {
    let mut uses = Vec::new();
    let mut wildcards: Vec<AttributeWildcard> = any_attribute
        .map(AttributeWildcard::from_wildcard)
        .into_iter()
        .collect();
    push_uses(schema, attributes, &mut uses)?;

    let mut visited = HashSet::new();
    let mut stack: Vec<&QName> = group_refs.iter().rev().collect();
    while let Some(name) = stack.pop() {
        if !visited.insert(name.clone()) {
            continue;
        }
        let (_, group) = references::attribute_group(schema, name).map_err(|e| match e {
            Error::UnresolvedReference { .. } => Error::UnresolvedReference {
                kind: ComponentKind::AttributeGroup,
                name: name.clone(),
            },
            other => other,
        })?;
        push_uses(schema, &group.attributes, &mut uses)?;
        if let Some(w) = &group.any_attribute {
            wildcards.push(AttributeWildcard::from_wildcard(w));
        }
        stack.extend(group.attribute_group_refs.iter().rev());
    }

    let mut wildcard: Option<AttributeWildcard> = None;
    for w in wildcards {
        wildcard = Some(match wildcard {
            Some(acc) => acc.intersect(&w)?,
            None => w,
        });
    }
    Ok(MergedAttributes { uses, wildcard })
}

/// Runtime `use` of a parsed one
pub(super) fn use_kind(u: AttributeUse) -> UseKind {
    match u {
        AttributeUse::Optional => UseKind::Optional,
        AttributeUse::Required => UseKind::Required,
        AttributeUse::Prohibited => UseKind::Prohibited,
    }
}

/// Append the uses of one complex type to the index and pick its lookup mode
///
/// Uses are stored sorted by symbol in every mode.
pub(super) fn emit_uses(index: &mut AttrIndex, mut uses: Vec<AttrUse>, limits: &Limits) -> AttrSet {
    uses.sort_by_key(|u| u.name);
    let n = uses.len();
    let mut set = AttrSet {
        off: index.uses.len() as u32,
        len: n as u32,
        mode: if n <= limits.attr_linear_max {
            AttrLookup::SmallLinear
        } else if n <= limits.attr_binary_max {
            AttrLookup::SortedBinary
        } else {
            AttrLookup::Hash
        },
        ..Default::default()
    };
    if set.mode == AttrLookup::Hash {
        let size = (n * 2).next_power_of_two();
        let mask = size - 1;
        let mut table = vec![0u32; size];
        for (i, u) in uses.iter().enumerate() {
            let mut slot = attr_slot(u.name) & mask;
            while table[slot] != 0 {
                slot = (slot + 1) & mask;
            }
            table[slot] = i as u32 + 1;
        }
        set.hash_off = index.hash.len() as u32;
        set.hash_len = size as u32;
        index.hash.extend(table);
    }
    index.uses.extend(uses);
    set
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::tests::resolved;
    use crate::schema::{NamespaceSet, ProcessContents};

    fn merged(body: &str, name: &str) -> Result<MergedAttributes> {
        let schema = resolved(body);
        let id = schema.type_defs[&QName::new("urn:t", name)];
        AttributeMerger::new(&schema).merged(id)
    }

    fn names(m: &MergedAttributes) -> Vec<(String, AttributeUse)> {
        m.uses
            .iter()
            .map(|u| (u.name.local_name.clone(), u.use_kind))
            .collect()
    }

    #[test]
    fn test_extension_adds_uses() {
        let m = merged(
            r#"<xs:complexType name="B"><xs:attribute name="a"/></xs:complexType>
               <xs:complexType name="D">
                 <xs:complexContent>
                   <xs:extension base="tns:B"><xs:attribute name="b" use="required"/></xs:extension>
                 </xs:complexContent>
               </xs:complexType>"#,
            "D",
        )
        .unwrap();
        assert_eq!(
            names(&m),
            vec![
                ("a".to_string(), AttributeUse::Optional),
                ("b".to_string(), AttributeUse::Required)
            ]
        );
    }

    #[test]
    fn test_restriction_keeps_prohibited_use() {
        let m = merged(
            r#"<xs:complexType name="B">
                 <xs:attribute name="a"/><xs:attribute name="b"/>
               </xs:complexType>
               <xs:complexType name="R">
                 <xs:complexContent>
                   <xs:restriction base="tns:B"><xs:attribute name="a" use="prohibited"/></xs:restriction>
                 </xs:complexContent>
               </xs:complexType>"#,
            "R",
        )
        .unwrap();
        assert_eq!(
            names(&m),
            vec![
                ("a".to_string(), AttributeUse::Prohibited),
                ("b".to_string(), AttributeUse::Optional)
            ]
        );
    }

    #[test]
    fn test_nested_attribute_groups_expand_once() {
        let m = merged(
            r#"<xs:attributeGroup name="Inner"><xs:attribute name="i"/></xs:attributeGroup>
               <xs:attributeGroup name="Outer">
                 <xs:attribute name="o"/><xs:attributeGroup ref="tns:Inner"/>
               </xs:attributeGroup>
               <xs:complexType name="T">
                 <xs:attribute name="t"/>
                 <xs:attributeGroup ref="tns:Outer"/>
                 <xs:attributeGroup ref="tns:Inner"/>
               </xs:complexType>"#,
            "T",
        )
        .unwrap();
        let got: Vec<String> = names(&m).into_iter().map(|(n, _)| n).collect();
        assert_eq!(got, vec!["t", "o", "i"]);
    }

    #[test]
    fn test_wildcard_algebra() {
        let m = merged(
            r#"<xs:complexType name="B"><xs:anyAttribute namespace="urn:a"/></xs:complexType>
               <xs:complexType name="E">
                 <xs:complexContent>
                   <xs:extension base="tns:B"><xs:anyAttribute namespace="urn:b" processContents="lax"/></xs:extension>
                 </xs:complexContent>
               </xs:complexType>
               <xs:complexType name="R">
                 <xs:complexContent>
                   <xs:restriction base="tns:E"><xs:anyAttribute namespace="urn:b urn:c" processContents="skip"/></xs:restriction>
                 </xs:complexContent>
               </xs:complexType>"#,
            "R",
        )
        .unwrap();
        let w = m.wildcard.unwrap();
        assert_eq!(w.namespaces, NamespaceSet::Only(["urn:b".to_string()].into()));
        assert_eq!(w.process_contents, ProcessContents::Skip);
    }

    #[test]
    fn test_inexpressible_union_fails() {
        let err = merged(
            r###"<xs:complexType name="B"><xs:anyAttribute namespace="##other"/></xs:complexType>
               <xs:complexType name="E">
                 <xs:complexContent>
                   <xs:extension base="tns:B"><xs:anyAttribute namespace="##local"/></xs:extension>
                 </xs:complexContent>
               </xs:complexType>"###,
            "E",
        )
        .unwrap_err();
        assert!(err.to_string().contains("not expressible"), "{}", err);
    }

    #[test]
    fn test_emitted_uses_are_sorted() {
        let uses: Vec<AttrUse> = [9, 2, 5]
            .iter()
            .map(|n| AttrUse {
                name: *n,
                ..Default::default()
            })
            .collect();
        let mut index = AttrIndex::default();
        let limits = Limits {
            attr_linear_max: 1,
            ..Limits::default()
        };
        let set = emit_uses(&mut index, uses, &limits);
        assert_eq!(set.mode, AttrLookup::SortedBinary);
        let order: Vec<u32> = index.uses.iter().map(|u| u.name).collect();
        assert_eq!(order, vec![2, 5, 9]);
    }
}
