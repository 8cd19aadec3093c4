//! Reference lookup
//!
//! Element, attribute, attribute-group and model-group references are bound
//! here and nowhere else: the resolver, the semantic checker and the registry
//! all go through these functions.

use crate::error::{ComponentKind, Error, Result};
use crate::namespaces::QName;
use crate::schema::{AttrHandle, AttributeGroup, ElemHandle, ModelGroup, ParsedSchema};

/// Declaration an element particle stands for: itself, or the global target
/// of a reference
pub fn element_target(schema: &ParsedSchema, h: ElemHandle) -> Result<ElemHandle> {
    let decl = schema.element(h);
    if !decl.is_reference {
        return Ok(h);
    }
    let target = schema
        .global_element(&decl.name)
        .ok_or_else(|| Error::UnresolvedReference {
            kind: ComponentKind::Element,
            name: decl.name.clone(),
        })?;
    if schema.element(target).is_reference {
        return Err(Error::constraint(format!(
            "element reference '{}' resolves to another reference",
            decl.name
        )));
    }
    Ok(target)
}

/// Declaration an attribute use stands for
pub fn attribute_target(schema: &ParsedSchema, h: AttrHandle) -> Result<AttrHandle> {
    let decl = schema.attribute(h);
    if !decl.is_reference {
        return Ok(h);
    }
    let target = schema
        .global_attribute(&decl.name)
        .ok_or_else(|| Error::UnresolvedReference {
            kind: ComponentKind::Attribute,
            name: decl.name.clone(),
        })?;
    if schema.attribute(target).is_reference {
        return Err(Error::constraint(format!(
            "attribute reference '{}' resolves to another reference",
            decl.name
        )));
    }
    Ok(target)
}

/// Named attribute group, with its index in declaration order
///
/// A reference in the target namespace falls back to a same-named group in no
/// namespace, which is where chameleon-less includes of no-namespace documents
/// put their groups.
pub fn attribute_group<'a>(
    schema: &'a ParsedSchema,
    name: &QName,
) -> Result<(usize, &'a AttributeGroup)> {
    if let Some((index, _, group)) = schema.attribute_groups.get_full(name) {
        return Ok((index, group));
    }
    if !name.namespace.is_empty() && name.namespace == schema.target_namespace {
        if let Some((index, _, group)) = schema
            .attribute_groups
            .get_full(&QName::local(name.local_name.clone()))
        {
            return Ok((index, group));
        }
    }
    Err(Error::UnresolvedReference {
        kind: ComponentKind::AttributeGroup,
        name: name.clone(),
    })
}

/// Named model group, with its index in declaration order
pub fn model_group<'a>(schema: &'a ParsedSchema, name: &QName) -> Result<(usize, &'a ModelGroup)> {
    schema
        .groups
        .get_full(name)
        .map(|(index, _, group)| (index, group))
        .ok_or_else(|| Error::UnresolvedReference {
            kind: ComponentKind::Group,
            name: name.clone(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{AttributeDecl, ElementDecl};

    #[test]
    fn test_element_reference_binding() {
        let mut schema = ParsedSchema::new("urn:t");
        let g = schema.add_global_element(ElementDecl::new(QName::new("urn:t", "a")), "m.xsd");
        let r = schema.add_element(ElementDecl::reference(QName::new("urn:t", "a")), "m.xsd");
        let bad = schema.add_element(ElementDecl::reference(QName::new("urn:t", "zz")), "m.xsd");
        assert_eq!(element_target(&schema, r).unwrap(), g);
        assert_eq!(element_target(&schema, g).unwrap(), g);
        assert!(matches!(
            element_target(&schema, bad),
            Err(Error::UnresolvedReference {
                kind: ComponentKind::Element,
                ..
            })
        ));
    }

    #[test]
    fn test_attribute_group_fallback() {
        let mut schema = ParsedSchema::new("urn:t");
        schema.add_attribute_group(
            AttributeGroup {
                name: QName::local("common"),
                ..Default::default()
            },
            "inc.xsd",
        );
        let (index, group) = attribute_group(&schema, &QName::new("urn:t", "common")).unwrap();
        assert_eq!(index, 0);
        assert_eq!(group.name, QName::local("common"));
        assert!(attribute_group(&schema, &QName::new("urn:other", "common")).is_err());
    }

    #[test]
    fn test_attribute_reference_binding() {
        let mut schema = ParsedSchema::new("");
        let g = schema.add_global_attribute(AttributeDecl::new(QName::local("lang")), "m.xsd");
        let r = schema.add_attribute(AttributeDecl::reference(QName::local("lang")), "m.xsd");
        assert_eq!(attribute_target(&schema, r).unwrap(), g);
    }
}
