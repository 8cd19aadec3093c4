//! Ancestor chains
//!
//! For every type ID the chain of its base types up to `anyType`, nearest
//! first, is stored in one shared arena together with a cumulative mask: the
//! mask at depth `k` is the union of the derivation methods used on the way
//! from the type to the ancestor at depth `k`.

use std::collections::HashSet;

use serde::Serialize;

use crate::error::{ComponentKind, Error, Result};
use crate::namespaces::QName;
use crate::schema::{DerivationSet, ParsedSchema};
use crate::semantic::derivation::chain;

use super::{Registry, TypeId};

/// Ancestor arena with a per-type index
///
/// `offsets` and `lengths` are indexed by type ID; slot 0 is unused.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Ancestors {
    /// Ancestor type IDs
    pub ids: Vec<TypeId>,
    /// Cumulative derivation masks, parallel to `ids`
    pub masks: Vec<u8>,
    /// Start of each type's chain in `ids`
    pub offsets: Vec<u32>,
    /// Length of each type's chain
    pub lengths: Vec<u32>,
}

impl Ancestors {
    /// Chain of a type as `(ancestor, cumulative mask)` pairs
    pub fn chain(&self, id: TypeId) -> impl Iterator<Item = (TypeId, DerivationSet)> + '_ {
        let (off, len) = match (self.offsets.get(id as usize), self.lengths.get(id as usize)) {
            (Some(off), Some(len)) => (*off as usize, *len as usize),
            _ => (0, 0),
        };
        self.ids[off..off + len]
            .iter()
            .zip(&self.masks[off..off + len])
            .map(|(id, mask)| (*id, DerivationSet::from_bits(*mask)))
    }

    /// Whether `ancestor` is a proper ancestor of `id`
    pub fn derives_from(&self, id: TypeId, ancestor: TypeId) -> bool {
        self.chain(id).any(|(a, _)| a == ancestor)
    }
}

/// Build the ancestor chain of every registered type
pub fn build_ancestors(schema: &ParsedSchema, registry: &Registry) -> Result<Ancestors> {
    let count = registry.type_count();
    let mut out = Ancestors {
        ids: Vec::new(),
        masks: Vec::new(),
        offsets: vec![0; count + 1],
        lengths: vec![0; count + 1],
    };
    for id in 1..=count as TypeId {
        let key = registry
            .type_key(id)
            .ok_or_else(|| Error::constraint(format!("type ID {} is not registered", id)))?;
        let steps = chain(schema, key);
        let offset = out.ids.len() as u32;
        let mut mask = DerivationSet::empty();
        let mut seen = HashSet::from([id]);
        for pair in steps.windows(2) {
            let (_, method) = pair[0];
            let (ancestor, _) = pair[1];
            mask = mask.union(method);
            let ancestor_id = registry.type_id(ancestor).ok_or_else(|| {
                Error::constraint(format!(
                    "base type {} has no ID",
                    schema.type_label(ancestor)
                ))
            })?;
            if !seen.insert(ancestor_id) {
                return Err(Error::CircularReference {
                    kind: ComponentKind::Type,
                    name: QName::local(schema.type_label(key)),
                });
            }
            out.ids.push(ancestor_id);
            out.masks.push(mask.bits());
        }
        out.offsets[id as usize] = offset;
        out.lengths[id as usize] = out.ids.len() as u32 - offset;
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::assign_ids;
    use crate::registry::tests::resolved;
    use crate::schema::{Builtin, TypeKey};

    #[test]
    fn test_cumulative_masks() {
        let schema = resolved(
            r#"<xs:complexType name="A"><xs:sequence><xs:element name="x"/></xs:sequence></xs:complexType>
               <xs:complexType name="B">
                 <xs:complexContent>
                   <xs:extension base="tns:A"><xs:sequence><xs:element name="y"/></xs:sequence></xs:extension>
                 </xs:complexContent>
               </xs:complexType>
               <xs:complexType name="C">
                 <xs:complexContent>
                   <xs:restriction base="tns:B">
                     <xs:sequence><xs:element name="x"/><xs:element name="y"/></xs:sequence>
                   </xs:restriction>
                 </xs:complexContent>
               </xs:complexType>"#,
        );
        let registry = assign_ids(&schema).unwrap();
        let ancestors = build_ancestors(&schema, &registry).unwrap();

        let a = registry.types[&QName::new("urn:t", "A")];
        let b = registry.types[&QName::new("urn:t", "B")];
        let c = registry.types[&QName::new("urn:t", "C")];
        let any = registry.type_id(TypeKey::Builtin(Builtin::AnyType)).unwrap();

        let chain: Vec<(TypeId, DerivationSet)> = ancestors.chain(c).collect();
        assert_eq!(
            chain.iter().map(|(id, _)| *id).collect::<Vec<_>>(),
            vec![b, a, any]
        );
        assert_eq!(chain[0].1, DerivationSet::RESTRICTION);
        assert_eq!(
            chain[1].1,
            DerivationSet::RESTRICTION.union(DerivationSet::EXTENSION)
        );
        assert!(ancestors.derives_from(c, a));
        assert!(!ancestors.derives_from(a, c));
        assert_eq!(ancestors.chain(any).count(), 0);
    }

    #[test]
    fn test_builtin_chains() {
        let schema = resolved("");
        let registry = assign_ids(&schema).unwrap();
        let ancestors = build_ancestors(&schema, &registry).unwrap();
        let byte = registry.type_id(TypeKey::Builtin(Builtin::Byte)).unwrap();
        let decimal = registry.type_id(TypeKey::Builtin(Builtin::Decimal)).unwrap();
        assert!(ancestors.derives_from(byte, decimal));
        let last = ancestors.chain(byte).last().unwrap();
        assert_eq!(last.0, 1);
    }
}
