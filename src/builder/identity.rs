//! Identity constraints
//!
//! Selectors and fields are compiled through the [`PathCompiler`] seam into
//! symbol-based path rows. A keyref refers to a key or unique declared on the
//! same element.
//!
//! [`PathCompiler`]: crate::xpath::PathCompiler

use crate::error::{Error, Result};
use crate::namespaces::{NamespaceContext, QName};
use crate::runtime::{IcCategory, IcId, IcRow, PathAxis, PathRow, PathSlice, PathStepRow, PathTest};
use crate::schema::{ConstraintCategory, ElementDecl};
use crate::xpath::{AttributeMode, StepAxis, StepTest};

use super::Builder;

impl Builder<'_> {
    /// Emit the constraints of an element, returning its `elem_ics` slice
    pub(super) fn identity_constraints(&mut self, decl: &ElementDecl) -> Result<(u32, u32)> {
        let ic_off = self.out.identity.elem_ics.len() as u32;
        let first = self.out.identity.ics.len() as IcId;
        for c in &decl.constraints {
            let component = format!("identity constraint {}", c.name);
            let row = self
                .constraint_row(c.category, &c.name, &c.selector, &c.fields, &c.namespaces)
                .map_err(|e| e.in_component(component))?;
            let id = self.out.identity.ics.len() as IcId;
            self.out.identity.ics.push(row);
            self.out.identity.elem_ics.push(id);
        }
        for (i, c) in decl.constraints.iter().enumerate() {
            let refer = match &c.refer {
                Some(refer) if c.category == ConstraintCategory::Keyref => refer,
                _ => continue,
            };
            let target = decl
                .constraints
                .iter()
                .position(|k| {
                    &k.name == refer
                        && matches!(k.category, ConstraintCategory::Key | ConstraintCategory::Unique)
                })
                .ok_or_else(|| {
                    Error::constraint(format!(
                        "keyref '{}' refers to '{}', which is not a key or unique on element {}",
                        c.name, refer, decl.name
                    ))
                })?;
            self.out.identity.ics[first as usize + i].refer = first + target as IcId;
        }
        Ok((ic_off, decl.constraints.len() as u32))
    }

    fn constraint_row(
        &mut self,
        category: ConstraintCategory,
        name: &QName,
        selector: &str,
        fields: &[String],
        ctx: &NamespaceContext,
    ) -> Result<IcRow> {
        let selector = self.paths(selector, ctx, AttributeMode::Disallowed)?;
        let mut slices = Vec::with_capacity(fields.len());
        for field in fields {
            slices.push(self.paths(field, ctx, AttributeMode::Allowed)?);
        }
        let fields_off = self.out.identity.fields.len() as u32;
        self.out.identity.fields.extend(slices);
        Ok(IcRow {
            name: self.out.symbols.intern(name),
            category: match category {
                ConstraintCategory::Unique => IcCategory::Unique,
                ConstraintCategory::Key => IcCategory::Key,
                ConstraintCategory::Keyref => IcCategory::KeyRef,
            },
            selector,
            fields_off,
            fields_len: fields.len() as u32,
            refer: 0,
        })
    }

    /// Compile one expression into consecutive path rows
    fn paths(&mut self, xpath: &str, ctx: &NamespaceContext, mode: AttributeMode) -> Result<PathSlice> {
        let programs = self.input.paths.compile(xpath, ctx, mode)?;
        let identity = &mut self.out.identity;
        let off = identity.paths.len() as u32;
        for program in &programs {
            let steps_off = identity.path_steps.len() as u32;
            for step in &program.steps {
                let mut row = PathStepRow {
                    axis: match step.axis {
                        StepAxis::Child => PathAxis::Child,
                        StepAxis::Attribute => PathAxis::Attribute,
                        StepAxis::SelfNode => PathAxis::SelfNode,
                    },
                    ..Default::default()
                };
                match &step.test {
                    StepTest::Any => row.test = PathTest::Any,
                    StepTest::Namespace(uri) => {
                        row.test = PathTest::Namespace;
                        row.namespace = self.out.symbols.intern_namespace(uri);
                    }
                    StepTest::Name(name) => {
                        row.test = PathTest::Name;
                        row.symbol = self.out.symbols.intern(name);
                    }
                }
                identity.path_steps.push(row);
            }
            identity.paths.push(PathRow {
                descendant: program.descendant,
                steps_off,
                steps_len: program.steps.len() as u32,
            });
        }
        Ok(PathSlice {
            off,
            len: programs.len() as u32,
        })
    }
}

#[cfg(test)]
mod tests {
    use crate::builder::tests::build;
    use crate::runtime::{IcCategory, PathAxis, PathTest};

    const ORDERS: &str = r#"
        <xs:element name="orders">
          <xs:complexType>
            <xs:sequence>
              <xs:element name="order" maxOccurs="unbounded">
                <xs:complexType><xs:attribute name="id" type="xs:string"/></xs:complexType>
              </xs:element>
              <xs:element name="ref" maxOccurs="unbounded">
                <xs:complexType><xs:attribute name="to" type="xs:string"/></xs:complexType>
              </xs:element>
            </xs:sequence>
          </xs:complexType>
          <xs:keyref name="orderRef" refer="tns:orderKey">
            <xs:selector xpath="ref"/><xs:field xpath="@to"/>
          </xs:keyref>
          <xs:key name="orderKey">
            <xs:selector xpath=".//order"/><xs:field xpath="@id"/>
          </xs:key>
        </xs:element>"#;

    #[test]
    fn test_keyref_resolves_on_same_element() {
        let rt = build(ORDERS).unwrap();
        let orders = rt.global_element(rt.symbol("urn:t", "orders").unwrap()).unwrap();
        let row = rt.element(orders).unwrap();
        assert_eq!(row.ic_len, 2);
        let ids = &rt.identity.elem_ics[row.ic_off as usize..(row.ic_off + row.ic_len) as usize];
        let keyref = rt.identity.ics[ids[0] as usize];
        let key = rt.identity.ics[ids[1] as usize];
        assert_eq!(keyref.category, IcCategory::KeyRef);
        assert_eq!(key.category, IcCategory::Key);
        assert_eq!(keyref.refer, ids[1]);
        assert_eq!(key.refer, 0);
    }

    #[test]
    fn test_paths_are_symbol_rows() {
        let rt = build(ORDERS).unwrap();
        let key = rt.identity.ics[2];
        assert_eq!(key.selector.len, 1);
        let path = rt.identity.paths[key.selector.off as usize];
        assert!(path.descendant);
        let step = rt.identity.path_steps[path.steps_off as usize];
        assert_eq!(step.axis, PathAxis::Child);
        assert_eq!(step.test, PathTest::Name);
        assert_eq!(rt.symbols.local(step.symbol), "order");

        let field = rt.identity.fields[key.fields_off as usize];
        let path = rt.identity.paths[field.off as usize];
        let step = rt.identity.path_steps[path.steps_off as usize];
        assert_eq!(step.axis, PathAxis::Attribute);
        assert_eq!(rt.symbols.namespace_of(step.symbol), "");
    }
}
