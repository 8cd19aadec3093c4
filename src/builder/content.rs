//! Content models of complex types

use crate::compiler::DeclValues;
use crate::error::{ComponentKind, Error, Result};
use crate::models::{
    build_glushkov, compile, expand_substitution, substitution_members, type_model, AllModel,
    Automaton, Expr, ExprBuilder, ModelSource, Symbol,
};
use crate::runtime::{
    AllMemberRow, AllRow, AttrSet, ComplexId, ComplexTypeRow, ContentKind, Matcher, MatcherId,
    ModelKind, ModelRef,
};
use crate::registry::TypeId;
use crate::schema::{DefId, ElemHandle, NamespaceConstraint, ProcessContents, Wildcard};

use super::Builder;

impl Builder<'_> {
    /// Lowered content model of a schema-defined complex type
    pub(super) fn content_model(&mut self, id: DefId) -> Result<ModelRef> {
        let (schema, registry, refs) = (self.input.schema, self.input.registry, self.input.refs);
        let bind = |h: ElemHandle| -> Result<ElemHandle> {
            refs.element_decl(registry, h)
                .ok_or_else(|| Error::UnresolvedReference {
                    kind: ComponentKind::Element,
                    name: schema.element(h).name.clone(),
                })
        };
        let mut builder = ExprBuilder::new(schema, self.config, &bind);
        match type_model(&mut builder, schema, id)? {
            ModelSource::Empty => Ok(ModelRef::default()),
            ModelSource::Expr(expr) => self.lower_expr(&expr),
            ModelSource::All(all) => self.lower_all(&all),
        }
    }

    fn lower_expr(&mut self, expr: &Expr) -> Result<ModelRef> {
        let schema = self.input.schema;
        let g = build_glushkov(expr, &self.config.limits)?;
        let g = expand_substitution(&g, &|h| substitution_members(schema, h));
        let mut matchers = Vec::with_capacity(g.positions.len());
        for symbol in &g.positions {
            matchers.push(self.matcher(symbol)?);
        }
        let models = &mut self.out.models;
        Ok(match compile(&g, &matchers, &self.config.limits)? {
            Automaton::Dfa(dfa) => {
                models.dfas.push(dfa);
                ModelRef {
                    kind: ModelKind::Dfa,
                    index: models.dfas.len() as u32 - 1,
                }
            }
            Automaton::Nfa(nfa) => {
                models.nfas.push(nfa);
                ModelRef {
                    kind: ModelKind::Nfa,
                    index: models.nfas.len() as u32 - 1,
                }
            }
        })
    }

    /// Matcher ID of a position; equal matchers share an ID
    fn matcher(&mut self, symbol: &Symbol) -> Result<MatcherId> {
        let matcher = match symbol {
            Symbol::Element(h) => Matcher::PosExact {
                symbol: self.out.symbols.intern(&self.input.schema.element(*h).name),
                element: self.element_id(*h)?,
            },
            Symbol::Wildcard(w) => Matcher::PosWildcard {
                wildcard: self.wildcards.element(&mut self.out.symbols, w),
            },
        };
        if let Some(id) = self.matcher_ids.get(&matcher) {
            return Ok(*id);
        }
        let id = self.out.models.matchers.len() as MatcherId;
        self.out.models.matchers.push(matcher);
        self.matcher_ids.insert(matcher, id);
        Ok(id)
    }

    fn lower_all(&mut self, all: &AllModel) -> Result<ModelRef> {
        let members_off = self.out.models.all_members.len() as u32;
        for member in &all.members {
            let element = self.element_id(member.element)?;
            let subst_off = self.out.models.all_substitutes.len() as u32;
            for h in &member.substitutes {
                let id = self.element_id(*h)?;
                self.out.models.all_substitutes.push(id);
            }
            self.out.models.all_members.push(AllMemberRow {
                element,
                optional: member.optional,
                allows_substitution: member.allows_substitution,
                subst_off,
                subst_len: member.substitutes.len() as u32,
            });
        }
        let models = &mut self.out.models;
        models.alls.push(AllRow {
            members_off,
            members_len: all.members.len() as u32,
            emptiable: all.emptiable,
        });
        Ok(ModelRef {
            kind: ModelKind::All,
            index: models.alls.len() as u32 - 1,
        })
    }

    /// Row of `anyType`: mixed content of any elements and any attributes,
    /// processed laxly
    pub(super) fn any_type_row(&mut self, type_id: TypeId) -> Result<ComplexId> {
        let any = Wildcard::new(NamespaceConstraint::Any, ProcessContents::Lax, "");
        let model = self.lower_expr(&Expr::Leaf(Symbol::Wildcard(any.clone())).repeat(0, None))?;
        let any_attribute = self.wildcards.element(&mut self.out.symbols, &any);
        Ok(self.push_complex(ComplexTypeRow {
            type_id,
            content: ContentKind::Mixed,
            attrs: AttrSet::default(),
            any_attribute,
            text_validator: 0,
            text_values: DeclValues::default(),
            model,
            mixed: true,
        }))
    }
}
