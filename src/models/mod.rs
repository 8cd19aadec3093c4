//! Content models
//!
//! Particles are turned into expressions ([`ExprBuilder`]), expressions into
//! position automata ([`build_glushkov`]), element positions are widened to
//! their substitution groups ([`expand_substitution`]), and the result is
//! lowered to a table or follow-set automaton ([`compile`]). `all` groups do
//! not go through the automaton: they become an [`AllModel`] of members.

pub mod automata;
pub mod glushkov;
pub mod substitution;

pub use automata::{bit, compile, Automaton, CounterRow, Dfa, Nfa};
pub use glushkov::{build_glushkov, Counter, Expr, Glushkov, Symbol};
pub use substitution::{
    direct_members, expand_substitution, expand_substitution_members, substitution_members,
};

use crate::error::{ComponentKind, Error, Result};
use crate::limits::BuildConfig;
use crate::namespaces::QName;
use crate::schema::{
    Compositor, Content, DefId, DerivationMethod, DerivationSet, ElemHandle, ModelGroup,
    ParsedSchema, Particle, Term, TypeKey,
};
use crate::semantic::references;

/// Member of an `all` group
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AllMember {
    /// Declaration of the member
    pub element: ElemHandle,
    /// `minOccurs="0"`
    pub optional: bool,
    /// Whether the declaration admits substitution
    pub allows_substitution: bool,
    /// Transitive substitution-group members
    pub substitutes: Vec<ElemHandle>,
}

/// An `all` group
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AllModel {
    /// Members in source order
    pub members: Vec<AllMember>,
    /// Whether the group itself may be absent
    pub emptiable: bool,
}

/// Content model of a complex type before lowering
#[derive(Debug, Clone, PartialEq)]
pub enum ModelSource {
    /// No element content
    Empty,
    /// Sequence and choice groups
    Expr(Expr),
    /// An `all` group
    All(AllModel),
}

/// Binds an element particle to the declaration it stands for
pub type ElementBinder<'a> = dyn Fn(ElemHandle) -> Result<ElemHandle> + 'a;

/// Turns particles into expressions, expanding group references
pub struct ExprBuilder<'a> {
    schema: &'a ParsedSchema,
    config: BuildConfig,
    bind: &'a ElementBinder<'a>,
    clamp: Option<u32>,
    in_flight: Vec<QName>,
}

impl<'a> ExprBuilder<'a> {
    /// Builder that enforces the configured occurrence limit
    pub fn new(schema: &'a ParsedSchema, config: &BuildConfig, bind: &'a ElementBinder<'a>) -> Self {
        Self {
            schema,
            config: config.clone(),
            bind,
            clamp: None,
            in_flight: Vec::new(),
        }
    }

    /// Builder for ambiguity checks
    ///
    /// Repetition bounds are clamped to two copies: further copies add no
    /// new overlap between follow sets.
    pub fn for_ambiguity(schema: &'a ParsedSchema, bind: &'a ElementBinder<'a>) -> Self {
        Self {
            schema,
            config: BuildConfig::new().with_max_occurs_limit(u32::MAX),
            bind,
            clamp: Some(2),
            in_flight: Vec::new(),
        }
    }

    fn bounds(&self, p: &Particle) -> Result<(u32, Option<u32>)> {
        if let Some(max) = p.occurs.max {
            self.config.check_max_occurs(max)?;
        }
        Ok(match self.clamp {
            Some(c) => (p.occurs.min.min(c), p.occurs.max.map(|m| m.min(c))),
            None => (p.occurs.min, p.occurs.max),
        })
    }

    fn enter(&mut self, name: &QName) -> Result<&'a ModelGroup> {
        if self.in_flight.contains(name) {
            return Err(Error::CircularReference {
                kind: ComponentKind::Group,
                name: name.clone(),
            });
        }
        let (_, group) = references::model_group(self.schema, name)?;
        self.in_flight.push(name.clone());
        Ok(group)
    }

    /// Expression for a particle; `all` groups are rejected here
    pub fn particle(&mut self, p: &Particle) -> Result<Expr> {
        self.particle_at(p, 0)
    }

    fn particle_at(&mut self, p: &Particle, depth: usize) -> Result<Expr> {
        self.config.limits.check_group_depth(depth)?;
        let (min, max) = self.bounds(p)?;
        let expr = match &p.term {
            Term::Element(h) => Expr::Leaf(Symbol::Element((self.bind)(*h)?)),
            Term::Any(w) => Expr::Leaf(Symbol::Wildcard(w.clone())),
            Term::Group(group) => self.group(group, depth)?,
            Term::GroupRef(name) => {
                let group = self.enter(name)?;
                let expr = self.group(group, depth);
                self.in_flight.pop();
                expr?
            }
        };
        Ok(expr.repeat(min, max))
    }

    fn group(&mut self, group: &ModelGroup, depth: usize) -> Result<Expr> {
        let mut items = Vec::with_capacity(group.particles.len());
        for child in &group.particles {
            items.push(self.particle_at(child, depth + 1)?);
        }
        Ok(match group.compositor {
            Compositor::Sequence => Expr::Seq(items),
            Compositor::Choice if items.is_empty() => Expr::Reject,
            Compositor::Choice => Expr::Choice(items),
            Compositor::All => {
                return Err(Error::constraint(
                    "an all group must be the whole content model",
                ))
            }
        })
    }

    /// Model for the top-level particle of a content model
    pub fn model(&mut self, p: &Particle) -> Result<ModelSource> {
        let group = match &p.term {
            Term::Group(g) if g.compositor == Compositor::All => Some(g),
            Term::GroupRef(name) => match references::model_group(self.schema, name)? {
                (_, g) if g.compositor == Compositor::All => Some(g),
                _ => None,
            },
            _ => None,
        };
        match group {
            Some(group) => self.all(p, group).map(ModelSource::All),
            None => self.particle(p).map(ModelSource::Expr),
        }
    }

    fn all(&mut self, p: &Particle, group: &ModelGroup) -> Result<AllModel> {
        if p.occurs.min > 1 || p.occurs.max != Some(1) {
            return Err(Error::constraint(format!(
                "an all group must have minOccurs 0 or 1 and maxOccurs 1, found {}",
                p.occurs
            )));
        }
        let mut members = Vec::with_capacity(group.particles.len());
        for child in &group.particles {
            let h = match child.term {
                Term::Element(h) => h,
                _ => {
                    return Err(Error::constraint(
                        "members of an all group must be elements",
                    ))
                }
            };
            if child.occurs.min > 1 || child.occurs.max.map_or(true, |m| m > 1) {
                return Err(Error::constraint(format!(
                    "members of an all group must have maxOccurs 0 or 1, found {}",
                    child.occurs
                )));
            }
            if child.occurs.max == Some(0) {
                continue;
            }
            let element = (self.bind)(h)?;
            let decl = self.schema.element(element);
            let allows_substitution = !decl.block.contains(DerivationSet::SUBSTITUTION);
            let substitutes = if allows_substitution {
                substitution_members(self.schema, element)
            } else {
                Vec::new()
            };
            members.push(AllMember {
                element,
                optional: child.occurs.min == 0,
                allows_substitution,
                substitutes,
            });
        }
        Ok(AllModel {
            members,
            emptiable: p.occurs.min == 0,
        })
    }
}

/// Particles making up a complex type's content, base-most first
///
/// Extensions append their particle to the base's effective content; a
/// restriction replaces it.
pub fn content_particles(schema: &ParsedSchema, id: DefId) -> Vec<&Particle> {
    let mut parts = Vec::new();
    let mut current = id;
    for _ in 0..=schema.types.len() {
        let complex = match schema.type_def(current).as_complex() {
            Some(c) => c,
            None => break,
        };
        parts.extend(complex.particle());
        let extends = complex.derivation == DerivationMethod::Extension
            && matches!(complex.content, Content::Complex(_));
        match (extends, complex.base.key()) {
            (true, Some(TypeKey::Def(base))) => current = base,
            _ => break,
        }
    }
    parts.reverse();
    parts
}

/// Content model of a complex type
pub fn type_model(builder: &mut ExprBuilder<'_>, schema: &ParsedSchema, id: DefId) -> Result<ModelSource> {
    let parts = content_particles(schema, id);
    match parts.as_slice() {
        [] => Ok(ModelSource::Empty),
        [single] => builder.model(single),
        many => {
            let mut items = Vec::with_capacity(many.len());
            for p in many {
                if let ModelSource::All(_) = builder.model(p)? {
                    return Err(Error::constraint(
                        "an all group cannot be extended with further particles",
                    ));
                }
                items.push(builder.particle(p)?);
            }
            Ok(ModelSource::Expr(Expr::Seq(items)))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reader::read_schema;
    use crate::resolver::{ResolvePolicy, Resolver};
    use crate::semantic::validate_structure;

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

    fn bind(schema: &ParsedSchema) -> impl Fn(ElemHandle) -> Result<ElemHandle> + '_ {
        move |h| references::element_target(schema, h)
    }

    fn model_of(schema: &ParsedSchema, name: &str, config: &BuildConfig) -> Result<ModelSource> {
        let binder = bind(schema);
        let mut builder = ExprBuilder::new(schema, config, &binder);
        let id = schema.type_defs[&QName::local(name)];
        type_model(&mut builder, schema, id)
    }

    #[test]
    fn test_group_reference_is_expanded() {
        let schema = resolved(
            r#"<xs:group name="G"><xs:sequence><xs:element name="a"/></xs:sequence></xs:group>
               <xs:complexType name="T"><xs:group ref="G" maxOccurs="2"/></xs:complexType>"#,
        );
        let model = model_of(&schema, "T", &BuildConfig::default()).unwrap();
        let expr = match model {
            ModelSource::Expr(expr) => expr,
            other => panic!("unexpected {:?}", other),
        };
        assert_eq!(expr.position_count(), 2);
        let g = build_glushkov(&expr, &BuildConfig::default().limits).unwrap();
        let a = match &g.positions[0] {
            Symbol::Element(h) => schema.element(*h),
            other => panic!("unexpected {:?}", other),
        };
        assert_eq!(a.name.local_name, "a");
    }

    #[test]
    fn test_recursive_group_fails() {
        let schema = resolved(
            r#"<xs:group name="G"><xs:sequence><xs:group ref="G"/></xs:sequence></xs:group>
               <xs:complexType name="T"><xs:group ref="G"/></xs:complexType>"#,
        );
        let err = model_of(&schema, "T", &BuildConfig::default()).unwrap_err();
        assert!(matches!(
            err,
            Error::CircularReference {
                kind: ComponentKind::Group,
                ..
            }
        ));
    }

    #[test]
    fn test_max_occurs_limit() {
        let schema = resolved(
            r#"<xs:complexType name="T">
                 <xs:sequence><xs:element name="item" maxOccurs="2"/></xs:sequence>
               </xs:complexType>"#,
        );
        let config = BuildConfig::new().with_max_occurs_limit(1);
        let err = model_of(&schema, "T", &config).unwrap_err();
        assert_eq!(err, Error::OccursTooLarge { value: 2, limit: 1 });
    }

    #[test]
    fn test_all_group_and_extension() {
        let schema = resolved(
            r#"<xs:complexType name="A">
                 <xs:all><xs:element name="x" minOccurs="0"/><xs:element name="y"/></xs:all>
               </xs:complexType>
               <xs:complexType name="B"><xs:sequence><xs:element name="p"/></xs:sequence></xs:complexType>
               <xs:complexType name="C">
                 <xs:complexContent>
                   <xs:extension base="B"><xs:sequence><xs:element name="q"/></xs:sequence></xs:extension>
                 </xs:complexContent>
               </xs:complexType>"#,
        );
        match model_of(&schema, "A", &BuildConfig::default()).unwrap() {
            ModelSource::All(all) => {
                assert_eq!(all.members.len(), 2);
                assert!(all.members[0].optional);
                assert!(!all.members[1].optional);
                assert!(!all.emptiable);
            }
            other => panic!("unexpected {:?}", other),
        }
        match model_of(&schema, "C", &BuildConfig::default()).unwrap() {
            ModelSource::Expr(expr) => assert_eq!(expr.position_count(), 2),
            other => panic!("unexpected {:?}", other),
        }
    }
}
