//! Semantic checks
//!
//! Two passes run over a schema. [`validate_structure`] looks at a freshly
//! read schema and moves it to the `semantic` phase; [`validate_references`]
//! runs after the resolver and checks everything that needs bound types:
//! references, substitution groups, identity constraints, value constraints
//! and `final` blocking.
//!
//! Both passes collect every problem before failing. A single problem is
//! returned as itself, several as [`Error::Schema`].

pub mod derivation;
mod identity;
pub mod references;
mod structure;

pub use structure::validate_structure;

use crate::compiler::simple::Describer;
use crate::diagnostics::Diagnostic;
use crate::error::{ComponentKind, Error, Result};
use crate::namespaces::NamespaceContext;
use crate::patterns::XsdRegexCompiler;
use crate::schema::{
    Builtin, Compositor, DerivationSet, ParsedSchema, Particle, Phase, SimpleDerivation, Term,
    TypeKey, TypeKind,
};

use derivation::{derivation_methods, final_set, is_simple};

/// Turn collected errors into a result
pub(crate) fn aggregate(mut errors: Vec<Error>) -> Result<()> {
    match errors.len() {
        0 => Ok(()),
        1 => Err(errors.remove(0)),
        _ => Err(Error::Schema(errors)),
    }
}

/// Check references and constraints of a resolved schema
///
/// Returns the warnings found; every hard problem is reported in the error.
pub fn validate_references(schema: &ParsedSchema) -> Result<Vec<Diagnostic>> {
    schema.require_phase(Phase::Resolved)?;
    if let Some(name) = schema.first_placeholder() {
        return Err(Error::UnresolvedPlaceholder(name));
    }
    let regex = XsdRegexCompiler::default();
    let mut describer = Describer::new(schema, &regex);
    let mut errors = Vec::new();
    let mut diagnostics = Vec::new();

    check_declaration_references(schema, &mut errors);
    check_substitution_groups(schema, &mut errors);
    identity::check_identity_constraints(schema, &mut errors, &mut diagnostics);
    check_attribute_values(schema, &mut describer, &mut errors);
    check_element_values(schema, &mut describer, &mut errors);
    check_final(schema, &mut errors);
    if let Err(e) = crate::schemacheck::detect_cycles(schema) {
        errors.push(e);
    }

    aggregate(errors)?;
    Ok(diagnostics)
}

fn check_declaration_references(schema: &ParsedSchema, errors: &mut Vec<Error>) {
    for (i, decl) in schema.elements.iter().enumerate() {
        if decl.is_reference {
            if let Err(e) = references::element_target(schema, crate::schema::ElemHandle(i as u32)) {
                errors.push(e);
            }
        }
    }
    for (i, decl) in schema.attributes.iter().enumerate() {
        if decl.is_reference {
            if let Err(e) =
                references::attribute_target(schema, crate::schema::AttrHandle(i as u32))
            {
                errors.push(e);
            }
        }
    }
    let mut group_refs: Vec<(String, &crate::namespaces::QName)> = Vec::new();
    for def in &schema.types {
        if let Some(c) = def.as_complex() {
            for name in &c.attribute_group_refs {
                group_refs.push((format!("type {}", def.label()), name));
            }
        }
    }
    for (owner, group) in &schema.attribute_groups {
        for name in &group.attribute_group_refs {
            group_refs.push((format!("attribute group {}", owner), name));
        }
    }
    for (owner, name) in group_refs {
        if let Err(e) = references::attribute_group(schema, name) {
            errors.push(e.in_component(owner));
        }
    }
}

fn check_substitution_groups(schema: &ParsedSchema, errors: &mut Vec<Error>) {
    for (name, h) in &schema.element_decls {
        let decl = schema.element(*h);
        let head_name = match &decl.substitution_group {
            Some(head) => head,
            None => continue,
        };
        let head = match schema.global_element(head_name) {
            Some(head) => schema.element(head),
            None => {
                errors.push(Error::UnresolvedReference {
                    kind: ComponentKind::Element,
                    name: head_name.clone(),
                });
                continue;
            }
        };
        let (member_type, head_type) = match (decl.resolved_type, head.resolved_type) {
            (Some(m), Some(h)) => (m, h),
            _ => continue,
        };
        if head_type == TypeKey::Builtin(Builtin::AnyType) {
            continue;
        }
        if head_type == TypeKey::Builtin(Builtin::AnySimpleType) && is_simple(schema, member_type)
        {
            continue;
        }
        match derivation_methods(schema, member_type, head_type) {
            None => errors.push(Error::constraint(format!(
                "element {}: type {} is not derived from {}, the type of substitution group head {}",
                name,
                schema.type_label(member_type),
                schema.type_label(head_type),
                head_name
            ))),
            Some(methods) if head.final_set.intersects(methods) => {
                errors.push(Error::constraint(format!(
                    "element {}: substitution group head {} is final for {}",
                    name, head_name, methods
                )))
            }
            Some(_) => {}
        }
    }
}

fn check_attribute_values(
    schema: &ParsedSchema,
    describer: &mut Describer<'_>,
    errors: &mut Vec<Error>,
) {
    for decl in &schema.attributes {
        let component = format!("attribute {}", decl.name);
        let key = match decl.resolved_type {
            Some(key) => key,
            None => continue,
        };
        let desc = match describer.describe(key) {
            Ok(desc) => desc,
            Err(e) => {
                errors.push(e.in_component(component));
                continue;
            }
        };
        if !decl.is_reference && desc.is_notation() && !desc.has_enumeration() {
            errors.push(Error::constraint(format!(
                "{}: a NOTATION type must be restricted by an enumeration",
                component
            )));
        }
        let values: Vec<&String> = decl.default.iter().chain(decl.fixed.iter()).collect();
        if values.is_empty() {
            continue;
        }
        if desc.is_id() {
            errors.push(Error::constraint(format!(
                "{}: an ID attribute cannot have a default or fixed value",
                component
            )));
            continue;
        }
        for value in values {
            if let Err(e) = desc.check(value, &decl.namespaces) {
                errors.push(e.in_component(component.clone()));
            }
        }
        // a fixed reference must agree with a fixed target
        if let (true, Some(fixed)) = (decl.is_reference, &decl.fixed) {
            if let Some(target) = schema.global_attribute(&decl.name) {
                if let Some(target_fixed) = &schema.attribute(target).fixed {
                    if !same_value(&desc, fixed, target_fixed, &decl.namespaces) {
                        errors.push(Error::constraint(format!(
                            "{}: fixed value '{}' differs from the declaration's '{}'",
                            component, fixed, target_fixed
                        )));
                    }
                }
            }
        }
    }
}

fn same_value(
    desc: &crate::compiler::simple::SimpleDescription,
    a: &str,
    b: &str,
    ctx: &NamespaceContext,
) -> bool {
    match (desc.check(a, ctx), desc.check(b, ctx)) {
        (Ok(x), Ok(y)) => x.key == y.key,
        _ => a == b,
    }
}

fn check_element_values(
    schema: &ParsedSchema,
    describer: &mut Describer<'_>,
    errors: &mut Vec<Error>,
) {
    for decl in schema.elements.iter().filter(|e| !e.is_reference) {
        let value = match decl.fixed.as_ref().or(decl.default.as_ref()) {
            Some(value) => value,
            None => continue,
        };
        let component = format!("element {}", decl.name);
        let key = match decl.resolved_type {
            Some(key) => key,
            None => continue,
        };
        let desc = if is_simple(schema, key) {
            describer.describe(key).map(Some)
        } else {
            match key {
                TypeKey::Def(id) => describer.describe_text(id),
                TypeKey::Builtin(_) => Ok(None),
            }
        };
        match desc {
            Ok(Some(desc)) => {
                if desc.is_notation() {
                    errors.push(Error::constraint(format!(
                        "{}: a NOTATION type cannot carry a default or fixed value",
                        component
                    )));
                    continue;
                }
                if let Err(e) = desc.check(value, &decl.namespaces) {
                    errors.push(e.in_component(component));
                }
            }
            Ok(None) => {
                if !is_mixed_and_emptiable(schema, key) {
                    errors.push(Error::constraint(format!(
                        "{}: a default or fixed value requires simple or emptiable mixed content",
                        component
                    )));
                }
            }
            Err(e) => errors.push(e.in_component(component)),
        }
    }
}

fn is_mixed_and_emptiable(schema: &ParsedSchema, key: TypeKey) -> bool {
    match key {
        TypeKey::Builtin(b) => b == Builtin::AnyType,
        TypeKey::Def(id) => match schema.type_def(id).as_complex() {
            Some(c) => {
                c.is_mixed()
                    && c.particle()
                        .map_or(true, |p| particle_emptiable(schema, p, 0))
            }
            None => false,
        },
    }
}

fn particle_emptiable(schema: &ParsedSchema, p: &Particle, depth: usize) -> bool {
    if p.occurs.min == 0 {
        return true;
    }
    if depth > schema.groups.len() + 1 {
        return false;
    }
    let group = match &p.term {
        Term::Element(_) | Term::Any(_) => return false,
        Term::Group(g) => g,
        Term::GroupRef(name) => match references::model_group(schema, name) {
            Ok((_, g)) => g,
            Err(_) => return false,
        },
    };
    let depth = depth + 1;
    match group.compositor {
        Compositor::Choice => {
            group.particles.is_empty()
                || group
                    .particles
                    .iter()
                    .any(|c| particle_emptiable(schema, c, depth))
        }
        Compositor::Sequence | Compositor::All => group
            .particles
            .iter()
            .all(|c| particle_emptiable(schema, c, depth)),
    }
}

fn check_final(schema: &ParsedSchema, errors: &mut Vec<Error>) {
    let blocked = |base: TypeKey, method: DerivationSet| final_set(schema, base).intersects(method);
    for def in &schema.types {
        let label = def.label();
        match &def.kind {
            TypeKind::Simple(s) => match &s.derivation {
                SimpleDerivation::Restriction { base, .. } => {
                    if let Some(base) = base.key() {
                        if blocked(base, DerivationSet::RESTRICTION) {
                            errors.push(final_error(schema, &label, base, "restriction"));
                        }
                    }
                }
                SimpleDerivation::List { item } => {
                    if let Some(item) = item.key() {
                        if blocked(item, DerivationSet::LIST) {
                            errors.push(final_error(schema, &label, item, "list"));
                        }
                    }
                }
                SimpleDerivation::Union { members } => {
                    for member in members.iter().filter_map(|m| m.key()) {
                        if blocked(member, DerivationSet::UNION) {
                            errors.push(final_error(schema, &label, member, "union"));
                        }
                    }
                }
            },
            TypeKind::Complex(c) => {
                if let Some(base) = c.base.key() {
                    if blocked(base, c.derivation.as_set()) {
                        errors.push(final_error(
                            schema,
                            &label,
                            base,
                            &c.derivation.to_string(),
                        ));
                    }
                }
            }
        }
    }
}

fn final_error(schema: &ParsedSchema, label: &str, base: TypeKey, method: &str) -> Error {
    Error::constraint(format!(
        "type {}: {} is final for {}",
        label,
        schema.type_label(base),
        method
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reader::read_schema;
    use crate::resolver::{ResolvePolicy, Resolver};

    fn resolved(body: &str) -> ParsedSchema {
        let xsd = format!(
            r#"<xs:schema xmlns:xs="http://www.w3.org/2001/XMLSchema">{}</xs:schema>"#,
            body
        );
        let mut schema = read_schema(&xsd, "main.xsd").unwrap();
        validate_structure(&mut schema).unwrap();
        Resolver::new(&mut schema, ResolvePolicy::Required)
            .resolve()
            .unwrap();
        schema
    }

    fn messages(result: Result<Vec<Diagnostic>>) -> Vec<String> {
        match result {
            Ok(_) => Vec::new(),
            Err(e) => e.flatten().iter().map(|e| e.to_string()).collect(),
        }
    }

    #[test]
    fn test_aggregate() {
        assert!(aggregate(Vec::new()).is_ok());
        let one = aggregate(vec![Error::constraint("a")]).unwrap_err();
        assert_eq!(one, Error::constraint("a"));
        let many = aggregate(vec![Error::constraint("a"), Error::constraint("b")]).unwrap_err();
        assert!(matches!(many, Error::Schema(ref v) if v.len() == 2));
    }

    #[test]
    fn test_requires_resolved_phase() {
        let schema = ParsedSchema::new("");
        assert!(matches!(
            validate_references(&schema),
            Err(Error::Phase { .. })
        ));
    }

    #[test]
    fn test_final_restriction_blocked() {
        let schema = resolved(
            r#"<xs:simpleType name="Base" final="restriction">
                 <xs:restriction base="xs:string"/>
               </xs:simpleType>
               <xs:simpleType name="Derived">
                 <xs:restriction base="Base"><xs:maxLength value="3"/></xs:restriction>
               </xs:simpleType>"#,
        );
        let msgs = messages(validate_references(&schema));
        assert_eq!(msgs.len(), 1);
        assert!(msgs[0].contains("final for restriction"), "{}", msgs[0]);
    }

    #[test]
    fn test_final_list_and_extension() {
        let schema = resolved(
            r#"<xs:simpleType name="Item" final="list">
                 <xs:restriction base="xs:int"/>
               </xs:simpleType>
               <xs:simpleType name="Items"><xs:list itemType="Item"/></xs:simpleType>
               <xs:complexType name="B" final="extension"><xs:sequence/></xs:complexType>
               <xs:complexType name="D">
                 <xs:complexContent><xs:extension base="B"/></xs:complexContent>
               </xs:complexType>"#,
        );
        let msgs = messages(validate_references(&schema));
        assert_eq!(msgs.len(), 2);
        assert!(msgs.iter().any(|m| m.contains("final for list")));
        assert!(msgs.iter().any(|m| m.contains("final for extension")));
    }

    #[test]
    fn test_substitution_group_type_derivation() {
        let schema = resolved(
            r#"<xs:element name="head" type="xs:decimal"/>
               <xs:element name="ok" type="xs:int" substitutionGroup="head"/>
               <xs:element name="bad" type="xs:string" substitutionGroup="head"/>"#,
        );
        let msgs = messages(validate_references(&schema));
        assert_eq!(msgs.len(), 1);
        assert!(msgs[0].contains("element bad"));
    }

    #[test]
    fn test_value_constraints() {
        let schema = resolved(
            r#"<xs:element name="n" type="xs:int" default="abc"/>
               <xs:element name="e" default="x">
                 <xs:complexType><xs:sequence><xs:element name="c"/></xs:sequence></xs:complexType>
               </xs:element>
               <xs:element name="m" default="x">
                 <xs:complexType mixed="true">
                   <xs:sequence><xs:element name="c" minOccurs="0"/></xs:sequence>
                 </xs:complexType>
               </xs:element>
               <xs:attribute name="id" type="xs:ID" fixed="a"/>
               <xs:attribute name="count" type="xs:positiveInteger" default="0"/>"#,
        );
        let msgs = messages(validate_references(&schema));
        assert_eq!(msgs.len(), 4, "{:?}", msgs);
        assert!(msgs.iter().any(|m| m.contains("element e")));
        assert!(!msgs.iter().any(|m| m.contains("element m")));
        assert!(msgs.iter().any(|m| m.contains("ID attribute")));
    }

    #[test]
    fn test_clean_schema_has_no_errors() {
        let schema = resolved(
            r#"<xs:simpleType name="Size">
                 <xs:restriction base="xs:token">
                   <xs:enumeration value="S"/><xs:enumeration value="L"/>
                 </xs:restriction>
               </xs:simpleType>
               <xs:attributeGroup name="common"><xs:attribute name="size" type="Size" default="S"/></xs:attributeGroup>
               <xs:element name="shirt">
                 <xs:complexType><xs:attributeGroup ref="common"/></xs:complexType>
               </xs:element>"#,
        );
        assert_eq!(validate_references(&schema).unwrap(), Vec::new());
    }
}
