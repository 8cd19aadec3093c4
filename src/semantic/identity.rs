//! Identity-constraint checks
//!
//! Names are unique per schema, keyrefs refer to a key or unique on the same
//! element with the same number of fields, and selectors and fields must
//! compile. Selectors are followed through the content model where possible;
//! a path that cannot be followed (wildcards, descendant steps, names absent
//! from the model) is recorded as a warning rather than an error. A `.` field
//! that selects element-only content is an error.

use std::collections::{HashMap, HashSet};

use crate::diagnostics::Diagnostic;
use crate::error::Error;
use crate::namespaces::QName;
use crate::schema::{
    ConstraintCategory, Content, ElemHandle, IdentityConstraint, ParsedSchema, Particle, Term,
    TypeKey,
};
use crate::xpath::{AttributeMode, DefaultPathCompiler, PathCompiler, PathProgram, StepAxis, StepTest};

use super::references;

pub(super) fn check_identity_constraints(
    schema: &ParsedSchema,
    errors: &mut Vec<Error>,
    diagnostics: &mut Vec<Diagnostic>,
) {
    let compiler = DefaultPathCompiler;
    let mut names: HashMap<&QName, ElemHandle> = HashMap::new();
    for (i, decl) in schema.elements.iter().enumerate() {
        if decl.is_reference {
            continue;
        }
        let h = ElemHandle(i as u32);
        for ic in &decl.constraints {
            let component = format!("{} {}", ic.category, ic.name);
            if names.insert(&ic.name, h).is_some() {
                errors.push(Error::constraint(format!(
                    "{}: identity constraint name is not unique",
                    component
                )));
            }
            if ic.fields.is_empty() {
                errors.push(Error::constraint(format!("{}: no fields", component)));
            }
            if let Some(refer) = &ic.refer {
                check_keyref(decl.constraints.as_slice(), ic, refer, &component, errors);
            }

            let selector = match compiler.compile(&ic.selector, &ic.namespaces, AttributeMode::Disallowed) {
                Ok(programs) => programs,
                Err(e) => {
                    errors.push(e.in_component(component.clone()));
                    continue;
                }
            };
            let mut fields = Vec::new();
            for field in &ic.fields {
                match compiler.compile(field, &ic.namespaces, AttributeMode::Allowed) {
                    Ok(programs) => fields.push((field, programs)),
                    Err(e) => errors.push(e.in_component(component.clone())),
                }
            }

            let selected = match decl.resolved_type {
                Some(t) => select_types(schema, t, &selector),
                None => None,
            };
            let selected = match selected {
                Some(types) => types,
                None => {
                    diagnostics.push(Diagnostic::warning(
                        component.clone(),
                        format!(
                            "selector '{}' cannot be followed through the content model of element {}",
                            ic.selector, decl.name
                        ),
                    ));
                    continue;
                }
            };
            for (field, programs) in &fields {
                if !programs.iter().any(PathProgram::is_self) {
                    continue;
                }
                if let Some(t) = selected.iter().find(|t| is_element_only(schema, **t)) {
                    errors.push(Error::constraint(format!(
                        "{}: field '{}' selects element-only content of type {}",
                        component,
                        field,
                        schema.type_label(*t)
                    )));
                }
            }
        }
    }
}

fn check_keyref(
    scope: &[IdentityConstraint],
    keyref: &IdentityConstraint,
    refer: &QName,
    component: &str,
    errors: &mut Vec<Error>,
) {
    let target = scope.iter().find(|c| {
        &c.name == refer
            && matches!(
                c.category,
                ConstraintCategory::Key | ConstraintCategory::Unique
            )
    });
    match target {
        None => errors.push(Error::constraint(format!(
            "{}: refers to '{}', which is not a key or unique on the same element",
            component, refer
        ))),
        Some(target) if target.fields.len() != keyref.fields.len() => {
            errors.push(Error::constraint(format!(
                "{}: has {} fields but '{}' has {}",
                component,
                keyref.fields.len(),
                refer,
                target.fields.len()
            )))
        }
        Some(_) => {}
    }
}

/// Types of the elements a selector reaches, or `None` if it cannot be
/// followed statically
fn select_types(schema: &ParsedSchema, start: TypeKey, programs: &[PathProgram]) -> Option<Vec<TypeKey>> {
    let mut out = Vec::new();
    for program in programs {
        if program.descendant {
            return None;
        }
        let mut current = vec![start];
        for step in &program.steps {
            match (step.axis, &step.test) {
                (StepAxis::SelfNode, _) => {}
                (StepAxis::Child, StepTest::Name(name)) => {
                    let mut next = Vec::new();
                    for t in &current {
                        next.extend(child_types(schema, *t, name));
                    }
                    if next.is_empty() {
                        return None;
                    }
                    current = next;
                }
                _ => return None,
            }
        }
        out.extend(current);
    }
    Some(out)
}

/// Types of the child elements named `name` in the content model of `key`
fn child_types(schema: &ParsedSchema, key: TypeKey, name: &QName) -> Vec<TypeKey> {
    let mut out = Vec::new();
    let mut visited_types = HashSet::new();
    let mut visited_groups = HashSet::new();
    let mut pending = vec![key];
    while let Some(key) = pending.pop() {
        let id = match key {
            TypeKey::Def(id) if visited_types.insert(id) => id,
            _ => continue,
        };
        let complex = match schema.type_def(id).as_complex() {
            Some(c) => c,
            None => continue,
        };
        // extensions inherit the base content model
        if complex.derivation == crate::schema::DerivationMethod::Extension {
            if let Some(base) = complex.base.key() {
                pending.push(base);
            }
        }
        let mut particles: Vec<&Particle> = complex.particle().into_iter().collect();
        while let Some(root) = particles.pop() {
            root.walk(&mut |p| match &p.term {
                Term::Element(h) => {
                    if let Ok(target) = references::element_target(schema, *h) {
                        let decl = schema.element(target);
                        if &decl.name == name {
                            out.extend(decl.resolved_type);
                        }
                    }
                }
                Term::GroupRef(group) => {
                    if visited_groups.insert(group.clone()) {
                        if let Ok((_, g)) = references::model_group(schema, group) {
                            particles.extend(g.particles.iter());
                        }
                    }
                }
                _ => {}
            });
        }
    }
    out
}

/// Whether a type has element-only content
fn is_element_only(schema: &ParsedSchema, key: TypeKey) -> bool {
    let mut current = key;
    for _ in 0..=schema.types.len() {
        let id = match current {
            TypeKey::Def(id) => id,
            TypeKey::Builtin(_) => return false,
        };
        let complex = match schema.type_def(id).as_complex() {
            Some(c) => c,
            None => return false,
        };
        match &complex.content {
            Content::ElementOnly(_) => return true,
            Content::Complex(cc) if !cc.mixed => {
                if cc.particle.is_some() {
                    return true;
                }
                match complex.base.key() {
                    Some(base) => current = base,
                    None => return false,
                }
            }
            _ => return false,
        }
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reader::read_schema;
    use crate::resolver::{ResolvePolicy, Resolver};

    fn check(body: &str) -> (Vec<Error>, Vec<Diagnostic>) {
        let xsd = format!(
            r#"<xs:schema xmlns:xs="http://www.w3.org/2001/XMLSchema">{}</xs:schema>"#,
            body
        );
        let mut schema = read_schema(&xsd, "main.xsd").unwrap();
        schema.mark_semantic().unwrap();
        Resolver::new(&mut schema, ResolvePolicy::Required).resolve().unwrap();
        let mut errors = Vec::new();
        let mut diagnostics = Vec::new();
        check_identity_constraints(&schema, &mut errors, &mut diagnostics);
        (errors, diagnostics)
    }

    const ITEMS: &str = r#"<xs:complexType name="Items">
        <xs:sequence>
          <xs:element name="item" maxOccurs="unbounded">
            <xs:complexType>
              <xs:sequence><xs:element name="part" type="xs:string"/></xs:sequence>
              <xs:attribute name="id" type="xs:string"/>
            </xs:complexType>
          </xs:element>
        </xs:sequence>
      </xs:complexType>"#;

    #[test]
    fn test_keyref_on_same_element() {
        let (errors, diagnostics) = check(&format!(
            r#"{ITEMS}
               <xs:element name="root" type="Items">
                 <xs:key name="k"><xs:selector xpath="item"/><xs:field xpath="@id"/></xs:key>
                 <xs:keyref name="r" refer="k"><xs:selector xpath="item"/><xs:field xpath="@id"/></xs:keyref>
               </xs:element>"#
        ));
        assert!(errors.is_empty(), "{:?}", errors);
        assert!(diagnostics.is_empty());
    }

    #[test]
    fn test_keyref_arity_and_unknown_key() {
        let (errors, _) = check(&format!(
            r#"{ITEMS}
               <xs:element name="root" type="Items">
                 <xs:key name="k"><xs:selector xpath="item"/><xs:field xpath="@id"/></xs:key>
                 <xs:keyref name="r" refer="k">
                   <xs:selector xpath="item"/><xs:field xpath="@id"/><xs:field xpath="part"/>
                 </xs:keyref>
                 <xs:keyref name="s" refer="nope"><xs:selector xpath="item"/><xs:field xpath="@id"/></xs:keyref>
               </xs:element>"#
        ));
        assert_eq!(errors.len(), 2);
    }

    #[test]
    fn test_duplicate_names() {
        let (errors, _) = check(&format!(
            r#"{ITEMS}
               <xs:element name="a" type="Items">
                 <xs:unique name="u"><xs:selector xpath="item"/><xs:field xpath="@id"/></xs:unique>
               </xs:element>
               <xs:element name="b" type="Items">
                 <xs:unique name="u"><xs:selector xpath="item"/><xs:field xpath="@id"/></xs:unique>
               </xs:element>"#
        ));
        assert_eq!(errors.len(), 1);
        assert!(errors[0].to_string().contains("not unique"));
    }

    #[test]
    fn test_dot_field_on_element_only_content() {
        let (errors, _) = check(&format!(
            r#"{ITEMS}
               <xs:element name="root" type="Items">
                 <xs:unique name="u"><xs:selector xpath="item"/><xs:field xpath="."/></xs:unique>
               </xs:element>"#
        ));
        assert_eq!(errors.len(), 1);
        assert!(errors[0].to_string().contains("element-only"));
    }

    #[test]
    fn test_unfollowable_selector_is_a_warning() {
        let (errors, diagnostics) = check(&format!(
            r#"{ITEMS}
               <xs:element name="root" type="Items">
                 <xs:unique name="u"><xs:selector xpath=".//part"/><xs:field xpath="."/></xs:unique>
               </xs:element>"#
        ));
        assert!(errors.is_empty());
        assert_eq!(diagnostics.len(), 1);
    }
}
