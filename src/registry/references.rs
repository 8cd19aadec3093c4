//! Reference binding
//!
//! Every element reference, attribute reference, group reference and
//! attribute-group reference is bound once here, through the same lookup
//! functions the semantic checker uses.

use std::collections::HashMap;

use indexmap::IndexMap;

use crate::error::{Error, Result};
use crate::namespaces::QName;
use crate::schema::{AttrHandle, ElemHandle, ParsedSchema, Particle, Term};
use crate::semantic::references;

use super::{AttrId, ElemId, Registry};

/// Targets of the references in a schema
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResolvedReferences {
    /// Element reference → ID of the global declaration
    pub elements: HashMap<ElemHandle, ElemId>,
    /// Attribute reference → ID of the global declaration
    pub attributes: HashMap<AttrHandle, AttrId>,
    /// Referenced model group → index in [`ParsedSchema::groups`]
    pub groups: IndexMap<QName, usize>,
    /// Referenced attribute group → index in [`ParsedSchema::attribute_groups`]
    pub attribute_groups: IndexMap<QName, usize>,
}

impl ResolvedReferences {
    /// ID an element particle stands for, following references
    pub fn element_id(&self, registry: &Registry, h: ElemHandle) -> Option<ElemId> {
        registry
            .element_id(h)
            .or_else(|| self.elements.get(&h).copied())
    }

    /// ID an attribute use stands for, following references
    pub fn attribute_id(&self, registry: &Registry, h: AttrHandle) -> Option<AttrId> {
        registry
            .attribute_id(h)
            .or_else(|| self.attributes.get(&h).copied())
    }

    /// Declaration an element particle stands for
    pub fn element_decl(&self, registry: &Registry, h: ElemHandle) -> Option<ElemHandle> {
        self.element_id(registry, h)
            .and_then(|id| registry.element_handle(id))
    }
}

fn collect_group_refs<'a>(root: &'a Particle, out: &mut Vec<&'a QName>) {
    root.walk(&mut |p| {
        if let Term::GroupRef(name) = &p.term {
            out.push(name);
        }
    });
}

/// Bind every reference in the schema to its target
pub fn resolve_references(schema: &ParsedSchema, registry: &Registry) -> Result<ResolvedReferences> {
    let mut resolved = ResolvedReferences::default();

    for (i, decl) in schema.elements.iter().enumerate() {
        if !decl.is_reference {
            continue;
        }
        let h = ElemHandle(i as u32);
        let target = references::element_target(schema, h)?;
        let id = registry.element_id(target).ok_or_else(|| {
            Error::constraint(format!("element {} has no ID", decl.name))
        })?;
        resolved.elements.insert(h, id);
    }

    for (i, decl) in schema.attributes.iter().enumerate() {
        if !decl.is_reference {
            continue;
        }
        let h = AttrHandle(i as u32);
        let target = references::attribute_target(schema, h)?;
        let id = registry.attribute_id(target).ok_or_else(|| {
            Error::constraint(format!("attribute {} has no ID", decl.name))
        })?;
        resolved.attributes.insert(h, id);
    }

    let mut group_refs = Vec::new();
    let mut attribute_group_refs = Vec::new();
    for def in &schema.types {
        if let Some(c) = def.as_complex() {
            if let Some(p) = c.particle() {
                collect_group_refs(p, &mut group_refs);
            }
            attribute_group_refs.extend(c.attribute_group_refs.iter());
        }
    }
    for group in schema.groups.values() {
        for p in &group.particles {
            collect_group_refs(p, &mut group_refs);
        }
    }
    for group in schema.attribute_groups.values() {
        attribute_group_refs.extend(group.attribute_group_refs.iter());
    }
    for name in group_refs {
        let (index, _) = references::model_group(schema, name)?;
        resolved.groups.insert(name.clone(), index);
    }
    for name in attribute_group_refs {
        let (index, _) = references::attribute_group(schema, name)?;
        resolved.attribute_groups.insert(name.clone(), index);
    }
    Ok(resolved)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::assign_ids;
    use crate::registry::tests::resolved;

    #[test]
    fn test_references_bind_to_global_ids() {
        let schema = resolved(
            r#"<xs:group name="G"><xs:sequence><xs:element ref="tns:a"/></xs:sequence></xs:group>
               <xs:attributeGroup name="AG"><xs:attribute ref="tns:at"/></xs:attributeGroup>
               <xs:element name="a" type="xs:string"/>
               <xs:attribute name="at" type="xs:string"/>
               <xs:complexType name="T">
                 <xs:group ref="tns:G"/>
                 <xs:attributeGroup ref="tns:AG"/>
               </xs:complexType>"#,
        );
        let registry = assign_ids(&schema).unwrap();
        let refs = resolve_references(&schema, &registry).unwrap();

        let a = registry.elements[&QName::new("urn:t", "a")];
        assert_eq!(refs.elements.len(), 1);
        assert!(refs.elements.values().all(|id| *id == a));
        let (h, _) = refs.elements.iter().next().unwrap();
        assert_eq!(refs.element_id(&registry, *h), Some(a));

        assert_eq!(refs.attributes.len(), 1);
        assert_eq!(refs.groups[&QName::new("urn:t", "G")], 0);
        assert_eq!(refs.attribute_groups[&QName::new("urn:t", "AG")], 0);
    }
}
