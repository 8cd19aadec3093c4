//! Schema-wide consistency checks
//!
//! [`detect_cycles`] rejects circular type derivations, group references,
//! attribute-group references and substitution-group affiliations.
//! [`validate_upa`] enforces Unique Particle Attribution on every complex
//! type's content model.

mod upa;

pub use upa::validate_upa;

use std::collections::HashMap;
use std::hash::Hash;

use crate::error::{ComponentKind, Error, Result};
use crate::namespaces::QName;
use crate::resolver::find_derivation_cycle;
use crate::schema::{ParsedSchema, Particle, Term};
use crate::semantic::references;

/// First node found on a cycle of a directed graph, visiting roots in order
fn find_cycle<K, F>(roots: &[K], edges: F) -> Option<K>
where
    K: Clone + Eq + Hash,
    F: Fn(&K) -> Vec<K>,
{
    #[derive(Clone, Copy, PartialEq)]
    enum Mark {
        Active,
        Done,
    }
    let mut marks: HashMap<K, Mark> = HashMap::new();
    for root in roots {
        if marks.contains_key(root) {
            continue;
        }
        marks.insert(root.clone(), Mark::Active);
        let mut stack = vec![(root.clone(), edges(root))];
        while let Some((node, pending)) = stack.last_mut() {
            match pending.pop() {
                Some(next) => match marks.get(&next) {
                    Some(Mark::Active) => return Some(next),
                    Some(Mark::Done) => {}
                    None => {
                        marks.insert(next.clone(), Mark::Active);
                        let e = edges(&next);
                        stack.push((next, e));
                    }
                },
                None => {
                    marks.insert(node.clone(), Mark::Done);
                    stack.pop();
                }
            }
        }
    }
    None
}

fn group_refs(particles: &[Particle]) -> Vec<QName> {
    let mut out = Vec::new();
    for p in particles {
        p.walk(&mut |p| {
            if let Term::GroupRef(name) = &p.term {
                out.push(name.clone());
            }
        });
    }
    out
}

/// Reject cycles among types, groups, attribute groups and substitution groups
///
/// The error names a component on the cycle.
pub fn detect_cycles(schema: &ParsedSchema) -> Result<()> {
    if let Some(name) = find_derivation_cycle(schema) {
        return Err(Error::CircularReference {
            kind: ComponentKind::Type,
            name,
        });
    }

    let groups: Vec<QName> = schema.groups.keys().cloned().collect();
    let group_cycle = find_cycle(&groups, |name| {
        references::model_group(schema, name)
            .map(|(_, g)| group_refs(&g.particles))
            .unwrap_or_default()
    });
    if let Some(name) = group_cycle {
        return Err(Error::CircularReference {
            kind: ComponentKind::Group,
            name,
        });
    }

    let attribute_groups: Vec<QName> = schema.attribute_groups.keys().cloned().collect();
    let attribute_group_cycle = find_cycle(&attribute_groups, |name| {
        references::attribute_group(schema, name)
            .map(|(_, g)| {
                g.attribute_group_refs
                    .iter()
                    .filter_map(|r| references::attribute_group(schema, r).ok())
                    .map(|(_, target)| target.name.clone())
                    .collect()
            })
            .unwrap_or_default()
    });
    if let Some(name) = attribute_group_cycle {
        return Err(Error::CircularReference {
            kind: ComponentKind::AttributeGroup,
            name,
        });
    }

    let elements: Vec<QName> = schema.element_decls.keys().cloned().collect();
    let substitution_cycle = find_cycle(&elements, |name| {
        schema
            .global_element(name)
            .and_then(|h| schema.element(h).substitution_group.clone())
            .into_iter()
            .collect()
    });
    if let Some(name) = substitution_cycle {
        return Err(Error::CircularReference {
            kind: ComponentKind::SubstitutionGroup,
            name,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reader::read_schema;

    fn read(body: &str) -> ParsedSchema {
        let xsd = format!(
            r#"<xs:schema xmlns:xs="http://www.w3.org/2001/XMLSchema">{}</xs:schema>"#,
            body
        );
        read_schema(&xsd, "main.xsd").unwrap()
    }

    fn cycle_of(body: &str) -> (ComponentKind, String) {
        match detect_cycles(&read(body)) {
            Err(Error::CircularReference { kind, name }) => (kind, name.local_name),
            other => panic!("expected a cycle, got {:?}", other),
        }
    }

    #[test]
    fn test_find_cycle() {
        let edges = |n: &u32| match n {
            1 => vec![2],
            2 => vec![3],
            3 => vec![1],
            _ => Vec::new(),
        };
        assert!(find_cycle(&[1], edges).is_some());
        assert_eq!(find_cycle(&[4], edges), None);
        assert_eq!(find_cycle(&[1u32, 2], |n: &u32| if *n == 1 { vec![2] } else { Vec::new() }), None);
    }

    #[test]
    fn test_group_cycle() {
        let (kind, name) = cycle_of(
            r#"<xs:group name="A"><xs:sequence><xs:group ref="B"/></xs:sequence></xs:group>
               <xs:group name="B"><xs:choice><xs:group ref="A"/></xs:choice></xs:group>"#,
        );
        assert_eq!(kind, ComponentKind::Group);
        assert!(name == "A" || name == "B");
    }

    #[test]
    fn test_attribute_group_cycle() {
        let (kind, name) = cycle_of(
            r#"<xs:attributeGroup name="AG"><xs:attributeGroup ref="AG"/></xs:attributeGroup>"#,
        );
        assert_eq!(kind, ComponentKind::AttributeGroup);
        assert_eq!(name, "AG");
    }

    #[test]
    fn test_substitution_cycle() {
        let (kind, _) = cycle_of(
            r#"<xs:element name="a" substitutionGroup="b"/>
               <xs:element name="b" substitutionGroup="a"/>"#,
        );
        assert_eq!(kind, ComponentKind::SubstitutionGroup);
    }

    #[test]
    fn test_type_cycle() {
        use crate::schema::{Builtin, SimpleDerivation, SimpleTypeDef, TypeDef, TypeKind, TypeRef};

        let mut schema = ParsedSchema::new("");
        let restriction = |base| SimpleTypeDef::restriction(base, Vec::new());
        let x = schema.add_global_type(
            QName::local("X"),
            TypeDef::simple(Some(QName::local("X")), restriction(TypeRef::builtin(Builtin::String))),
            "m.xsd",
        );
        let y = schema.add_global_type(
            QName::local("Y"),
            TypeDef::simple(Some(QName::local("Y")), restriction(TypeRef::Inline(x))),
            "m.xsd",
        );
        if let TypeKind::Simple(s) = &mut schema.type_def_mut(x).kind {
            s.derivation = SimpleDerivation::Restriction {
                base: TypeRef::Inline(y),
                facets: Vec::new(),
            };
        }
        match detect_cycles(&schema) {
            Err(Error::CircularReference { kind, name }) => {
                assert_eq!(kind, ComponentKind::Type);
                assert!(name.local_name == "X" || name.local_name == "Y");
            }
            other => panic!("expected a cycle, got {:?}", other),
        }
    }

    #[test]
    fn test_recursion_through_elements_is_allowed() {
        let schema = read(
            r#"<xs:complexType name="Node">
                 <xs:sequence><xs:element name="child" type="Node" minOccurs="0"/></xs:sequence>
               </xs:complexType>"#,
        );
        assert_eq!(detect_cycles(&schema), Ok(()));
    }
}
