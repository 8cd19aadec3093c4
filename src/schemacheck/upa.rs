//! Unique Particle Attribution
//!
//! A content model violates UPA when some element could be attributed to two
//! different particles from the same point of a match. On the position
//! automaton that means two positions of the `first` set, or of one `follow`
//! set, accept a common element.

use std::collections::BTreeSet;

use crate::error::{ComponentKind, Error, Result};
use crate::limits::Limits;
use crate::models::{
    build_glushkov, expand_substitution, substitution_members, type_model, AllModel, ExprBuilder,
    Glushkov, ModelSource, Symbol,
};
use crate::registry::{Registry, ResolvedReferences};
use crate::schema::{ElemHandle, ParsedSchema};
use crate::semantic::aggregate;

fn describe(schema: &ParsedSchema, symbol: &Symbol) -> String {
    match symbol {
        Symbol::Element(h) => format!("element '{}'", schema.element(*h).name),
        Symbol::Wildcard(_) => "a wildcard".to_string(),
    }
}

/// Whether two symbols accept a common element
fn overlaps(schema: &ParsedSchema, a: &Symbol, b: &Symbol) -> bool {
    match (a, b) {
        (Symbol::Element(x), Symbol::Element(y)) => {
            schema.element(*x).name == schema.element(*y).name
        }
        (Symbol::Element(x), Symbol::Wildcard(w)) | (Symbol::Wildcard(w), Symbol::Element(x)) => {
            w.allows(&schema.element(*x).name.namespace)
        }
        (Symbol::Wildcard(v), Symbol::Wildcard(w)) => {
            !v.namespace_set().intersect(&w.namespace_set()).is_empty()
        }
    }
}

fn check_set(schema: &ParsedSchema, g: &Glushkov, set: &BTreeSet<usize>) -> Option<String> {
    let items: Vec<usize> = set.iter().copied().collect();
    for (i, a) in items.iter().enumerate() {
        for b in &items[i + 1..] {
            let (sa, sb) = (&g.positions[*a], &g.positions[*b]);
            if overlaps(schema, sa, sb) {
                return Some(format!(
                    "content model is not deterministic: {} and {} compete for the same element",
                    describe(schema, sa),
                    describe(schema, sb)
                ));
            }
        }
    }
    None
}

fn check_automaton(schema: &ParsedSchema, g: &Glushkov) -> Option<String> {
    std::iter::once(&g.first)
        .chain(g.follow.iter())
        .find_map(|set| check_set(schema, g, set))
}

fn check_all(schema: &ParsedSchema, all: &AllModel) -> Option<String> {
    let mut seen = std::collections::HashSet::new();
    for member in &all.members {
        for h in std::iter::once(&member.element).chain(member.substitutes.iter()) {
            let name = &schema.element(*h).name;
            if !seen.insert(name) {
                return Some(format!(
                    "content model is not deterministic: element '{}' appears twice in an all group",
                    name
                ));
            }
        }
    }
    None
}

/// Check Unique Particle Attribution for every complex type
///
/// All violations are reported together.
pub fn validate_upa(
    schema: &ParsedSchema,
    registry: &Registry,
    refs: &ResolvedReferences,
) -> Result<()> {
    let bind = |h: ElemHandle| -> Result<ElemHandle> {
        refs.element_decl(registry, h)
            .ok_or_else(|| Error::UnresolvedReference {
                kind: ComponentKind::Element,
                name: schema.element(h).name.clone(),
            })
    };
    let members = |h: ElemHandle| substitution_members(schema, h);
    let limits = Limits::permissive();

    let mut errors = Vec::new();
    for id in &registry.type_order {
        let def = schema.type_def(*id);
        if def.as_complex().is_none() {
            continue;
        }
        let component = format!("type {}", def.label());
        let mut builder = ExprBuilder::for_ambiguity(schema, &bind);
        let problem = match type_model(&mut builder, schema, *id) {
            Err(e) => {
                errors.push(e.in_component(component));
                continue;
            }
            Ok(ModelSource::Empty) => None,
            Ok(ModelSource::All(all)) => check_all(schema, &all),
            Ok(ModelSource::Expr(expr)) => match build_glushkov(&expr, &limits) {
                Ok(g) => check_automaton(schema, &expand_substitution(&g, &members)),
                Err(e) => {
                    errors.push(e.in_component(component));
                    continue;
                }
            },
        };
        if let Some(message) = problem {
            errors.push(Error::constraint(message).in_component(component));
        }
    }
    aggregate(errors)
}
