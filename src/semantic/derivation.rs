//! Type derivation chains
//!
//! Every type has at most one base and one derivation method. Built-in list
//! types and user list and union types derive from `anySimpleType`, which
//! derives from `anyType`; `anyType` has no base.

use crate::schema::{Builtin, DerivationSet, ParsedSchema, SimpleDerivation, TypeKey, TypeKind};

/// Base type and the method used to derive from it
pub fn base_of(schema: &ParsedSchema, key: TypeKey) -> Option<(TypeKey, DerivationSet)> {
    match key {
        TypeKey::Builtin(b) => {
            let base = b.base()?;
            let method = if b.item_type().is_some() {
                DerivationSet::LIST
            } else {
                DerivationSet::RESTRICTION
            };
            Some((TypeKey::Builtin(base), method))
        }
        TypeKey::Def(id) => match &schema.type_def(id).kind {
            TypeKind::Simple(s) => match &s.derivation {
                SimpleDerivation::Restriction { base, .. } => {
                    Some((base.key()?, DerivationSet::RESTRICTION))
                }
                SimpleDerivation::List { .. } => {
                    Some((TypeKey::Builtin(Builtin::AnySimpleType), DerivationSet::LIST))
                }
                SimpleDerivation::Union { .. } => {
                    Some((TypeKey::Builtin(Builtin::AnySimpleType), DerivationSet::UNION))
                }
            },
            TypeKind::Complex(c) => Some((c.base.key()?, c.derivation.as_set())),
        },
    }
}

/// The chain from `key` up to the root, `key` first, with the method of each
/// step (the method on the root entry is empty)
///
/// The walk is bounded by the number of types, so a malformed cyclic chain
/// ends instead of looping.
pub fn chain(schema: &ParsedSchema, key: TypeKey) -> Vec<(TypeKey, DerivationSet)> {
    let limit = schema.types.len() + Builtin::ALL.len() + 1;
    let mut out = Vec::new();
    let mut current = key;
    while out.len() < limit {
        match base_of(schema, current) {
            Some((base, method)) => {
                out.push((current, method));
                if base == current {
                    break;
                }
                current = base;
            }
            None => {
                out.push((current, DerivationSet::empty()));
                break;
            }
        }
    }
    out
}

/// Methods used to derive `derived` from `base`, or `None` if `derived` is
/// not derived from `base`
///
/// A type is derived from itself with the empty set. Every type is derived
/// from `anyType`; every simple type from `anySimpleType`.
pub fn derivation_methods(
    schema: &ParsedSchema,
    derived: TypeKey,
    base: TypeKey,
) -> Option<DerivationSet> {
    let mut methods = DerivationSet::empty();
    for (key, method) in chain(schema, derived) {
        if key == base {
            return Some(methods);
        }
        methods = methods.union(method);
    }
    None
}

/// Whether `key` is a simple type
pub fn is_simple(schema: &ParsedSchema, key: TypeKey) -> bool {
    match key {
        TypeKey::Builtin(b) => !b.is_complex(),
        TypeKey::Def(id) => schema.type_def(id).is_simple(),
    }
}

/// `final` set of a type; built-ins have none
pub fn final_set(schema: &ParsedSchema, key: TypeKey) -> DerivationSet {
    match key {
        TypeKey::Builtin(_) => DerivationSet::empty(),
        TypeKey::Def(id) => match &schema.type_def(id).kind {
            TypeKind::Simple(s) => s.final_set,
            TypeKind::Complex(c) => c.final_set,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::namespaces::QName;
    use crate::schema::{ComplexTypeDef, Content, DerivationMethod, TypeDef, TypeRef};

    #[test]
    fn test_builtin_chain() {
        let schema = ParsedSchema::new("");
        let keys: Vec<TypeKey> = chain(&schema, TypeKey::Builtin(Builtin::Short))
            .into_iter()
            .map(|(k, _)| k)
            .collect();
        assert_eq!(keys.first(), Some(&TypeKey::Builtin(Builtin::Short)));
        assert_eq!(keys.last(), Some(&TypeKey::Builtin(Builtin::AnyType)));
        assert!(keys.contains(&TypeKey::Builtin(Builtin::Decimal)));
        assert_eq!(
            derivation_methods(
                &schema,
                TypeKey::Builtin(Builtin::NmTokens),
                TypeKey::Builtin(Builtin::AnySimpleType)
            ),
            Some(DerivationSet::LIST)
        );
    }

    #[test]
    fn test_complex_derivation_methods() {
        let mut schema = ParsedSchema::new("");
        let base = schema.add_global_type(
            QName::local("Base"),
            TypeDef::complex(Some(QName::local("Base")), ComplexTypeDef::new(Content::Empty)),
            "m.xsd",
        );
        let mut ext = ComplexTypeDef::new(Content::Empty);
        ext.derivation = DerivationMethod::Extension;
        ext.base = TypeRef::Inline(base);
        let derived = schema.add_type(TypeDef::complex(None, ext), "m.xsd");
        let methods =
            derivation_methods(&schema, TypeKey::Def(derived), TypeKey::Def(base)).unwrap();
        assert_eq!(methods, DerivationSet::EXTENSION);
        let to_root = derivation_methods(
            &schema,
            TypeKey::Def(derived),
            TypeKey::Builtin(Builtin::AnyType),
        )
        .unwrap();
        assert!(to_root.contains(DerivationSet::RESTRICTION));
        assert!(derivation_methods(&schema, TypeKey::Def(base), TypeKey::Def(derived)).is_none());
    }
}
