//! Structural checks on a freshly read schema
//!
//! These checks need no reference resolution: occurrence bounds, the shape of
//! `all` groups, component names, and the local consistency of value
//! constraints and attribute uses.

use std::collections::HashSet;

use crate::error::{Error, Result};
use crate::names::is_valid_ncname;
use crate::namespaces::QName;
use crate::schema::{
    AttrHandle, AttributeUse, Compositor, ModelGroup, ParsedSchema, Particle, Phase, Term,
};

use super::aggregate;

/// Check a parsed schema and move it to the `semantic` phase
///
/// All problems found are reported together.
pub fn validate_structure(schema: &mut ParsedSchema) -> Result<()> {
    schema.require_phase(Phase::Parsed)?;
    let mut errors = Vec::new();
    check_names(schema, &mut errors);
    check_particles(schema, &mut errors);
    check_value_constraints(schema, &mut errors);
    check_attribute_lists(schema, &mut errors);
    aggregate(errors)?;
    schema.mark_semantic()
}

fn check_names(schema: &ParsedSchema, errors: &mut Vec<Error>) {
    let mut check = |what: &str, name: &QName| {
        if !is_valid_ncname(&name.local_name) {
            errors.push(Error::constraint(format!(
                "{} name '{}' is not a valid NCName",
                what, name.local_name
            )));
        }
    };
    for def in &schema.types {
        if let Some(name) = &def.name {
            check("type", name);
        }
    }
    for decl in schema.elements.iter().filter(|e| !e.is_reference) {
        check("element", &decl.name);
    }
    for decl in schema.attributes.iter().filter(|a| !a.is_reference) {
        check("attribute", &decl.name);
    }
    for name in schema.groups.keys() {
        check("group", name);
    }
    for name in schema.attribute_groups.keys() {
        check("attribute group", name);
    }
    for name in schema.notation_decls.keys() {
        check("notation", name);
    }
}

fn check_particle_tree(root: &Particle, owner: &str, errors: &mut Vec<Error>) {
    root.walk(&mut |p| {
        if !p.occurs.is_consistent() {
            errors.push(Error::constraint(format!(
                "{}: minOccurs {} is greater than maxOccurs {}",
                owner,
                p.occurs.min,
                p.occurs.max.unwrap_or_default()
            )));
        }
        if let Term::Group(group) = &p.term {
            for child in &group.particles {
                if let Term::Group(ModelGroup {
                    compositor: Compositor::All,
                    ..
                }) = child.term
                {
                    errors.push(Error::constraint(format!(
                        "{}: an all group must be the whole content model",
                        owner
                    )));
                }
            }
            if group.compositor == Compositor::All {
                if p.occurs.min > 1 || p.occurs.max != Some(1) {
                    errors.push(Error::constraint(format!(
                        "{}: an all group must have minOccurs 0 or 1 and maxOccurs 1, found {}",
                        owner, p.occurs
                    )));
                }
                for child in &group.particles {
                    let ok = matches!(child.term, Term::Element(_))
                        && child.occurs.max.map_or(false, |m| m <= 1);
                    if !ok {
                        errors.push(Error::constraint(format!(
                            "{}: members of an all group must be elements with maxOccurs 0 or 1",
                            owner
                        )));
                    }
                }
            }
        }
    });
}

fn check_particles(schema: &ParsedSchema, errors: &mut Vec<Error>) {
    for (name, group) in &schema.groups {
        let owner = format!("group {}", name);
        for p in &group.particles {
            check_particle_tree(p, &owner, errors);
        }
        if group.compositor == Compositor::All {
            for p in &group.particles {
                if !matches!(p.term, Term::Element(_)) || p.occurs.max.map_or(true, |m| m > 1) {
                    errors.push(Error::constraint(format!(
                        "{}: members of an all group must be elements with maxOccurs 0 or 1",
                        owner
                    )));
                }
            }
        }
    }
    for def in &schema.types {
        if let Some(p) = def.as_complex().and_then(|c| c.particle()) {
            check_particle_tree(p, &format!("type {}", def.label()), errors);
        }
    }
}

fn check_value_constraints(schema: &ParsedSchema, errors: &mut Vec<Error>) {
    for decl in &schema.elements {
        if decl.default.is_some() && decl.fixed.is_some() {
            errors.push(Error::constraint(format!(
                "element {}: default and fixed are mutually exclusive",
                decl.name
            )));
        }
    }
    for decl in &schema.attributes {
        if decl.default.is_some() && decl.fixed.is_some() {
            errors.push(Error::constraint(format!(
                "attribute {}: default and fixed are mutually exclusive",
                decl.name
            )));
        }
        if decl.default.is_some() && decl.use_kind != AttributeUse::Optional {
            errors.push(Error::constraint(format!(
                "attribute {}: a default value requires use=\"optional\", found use=\"{}\"",
                decl.name, decl.use_kind
            )));
        }
    }
}

fn check_unique_names(
    schema: &ParsedSchema,
    owner: &str,
    attributes: &[AttrHandle],
    errors: &mut Vec<Error>,
) {
    let mut seen = HashSet::new();
    for h in attributes {
        let name = &schema.attribute(*h).name;
        if !seen.insert(name) {
            errors.push(Error::constraint(format!(
                "{}: duplicate attribute '{}'",
                owner, name
            )));
        }
    }
}

fn check_attribute_lists(schema: &ParsedSchema, errors: &mut Vec<Error>) {
    for def in &schema.types {
        if let Some(c) = def.as_complex() {
            check_unique_names(schema, &format!("type {}", def.label()), &c.attributes, errors);
        }
    }
    for (name, group) in &schema.attribute_groups {
        check_unique_names(
            schema,
            &format!("attribute group {}", name),
            &group.attributes,
            errors,
        );
    }
}
