//! Identity-constraint paths
//!
//! Selector and field expressions are compiled into [`PathProgram`]s: one
//! program per `|` alternative, with name tests resolved against the
//! namespace context of the constraint. Unprefixed names are in no namespace.
//!
//! The [`PathCompiler`] trait is the seam the runtime builder compiles
//! through; [`DefaultPathCompiler`] implements the XSD 1.0 subset.

mod parsers;

pub use parsers::{IdentityXPathParser, NodeTest, ParsedPath, ParsedStep, XPathAxis, XPathParseError};

use serde::Serialize;

use crate::error::{Error, Result};
use crate::namespaces::{NamespaceContext, QName};

/// Whether attribute steps are permitted
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttributeMode {
    /// Fields
    Allowed,
    /// Selectors
    Disallowed,
}

/// Axis of a compiled step
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum StepAxis {
    /// Child elements
    Child,
    /// Attributes of the context element
    Attribute,
    /// The context element
    SelfNode,
}

impl StepAxis {
    /// Stable code for hashing
    pub fn code(&self) -> u8 {
        match self {
            StepAxis::Child => 0,
            StepAxis::Attribute => 1,
            StepAxis::SelfNode => 2,
        }
    }
}

/// Name test of a compiled step
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub enum StepTest {
    /// `*`, or the context node for `.`
    Any,
    /// `prefix:*`
    Namespace(String),
    /// A resolved name
    Name(QName),
}

/// A compiled step
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct PathStep {
    /// Axis
    pub axis: StepAxis,
    /// Name test
    pub test: StepTest,
}

/// One compiled path alternative
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct PathProgram {
    /// Leading `.//`: the first step may match at any depth
    pub descendant: bool,
    /// Steps in order
    pub steps: Vec<PathStep>,
}

impl PathProgram {
    /// Whether the path selects the context element itself
    pub fn is_self(&self) -> bool {
        !self.descendant && self.steps.iter().all(|s| s.axis == StepAxis::SelfNode)
    }

    /// Whether the path ends on an attribute
    pub fn selects_attribute(&self) -> bool {
        self.steps.last().map_or(false, |s| s.axis == StepAxis::Attribute)
    }
}

/// XPath collaborator used for identity constraints
pub trait PathCompiler: Send + Sync {
    /// Compile an expression into one program per alternative
    fn compile(
        &self,
        xpath: &str,
        ctx: &NamespaceContext,
        mode: AttributeMode,
    ) -> Result<Vec<PathProgram>>;
}

/// Compiler for the XSD 1.0 identity-constraint subset
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultPathCompiler;

impl PathCompiler for DefaultPathCompiler {
    fn compile(
        &self,
        xpath: &str,
        ctx: &NamespaceContext,
        mode: AttributeMode,
    ) -> Result<Vec<PathProgram>> {
        let parser = match mode {
            AttributeMode::Allowed => IdentityXPathParser::for_field(),
            AttributeMode::Disallowed => IdentityXPathParser::new(),
        };
        let paths = parser
            .parse(xpath)
            .map_err(|e| Error::constraint(format!("xpath '{}': {}", xpath, e)))?;
        paths
            .into_iter()
            .map(|path| {
                let steps = path
                    .steps
                    .into_iter()
                    .map(|step| compile_step(step, ctx))
                    .collect::<Result<Vec<_>>>()?;
                Ok(PathProgram {
                    descendant: path.descendant,
                    steps,
                })
            })
            .collect()
    }
}

fn compile_step(step: ParsedStep, ctx: &NamespaceContext) -> Result<PathStep> {
    let axis = match step.axis {
        XPathAxis::Child => StepAxis::Child,
        XPathAxis::Attribute => StepAxis::Attribute,
        XPathAxis::SelfNode => StepAxis::SelfNode,
    };
    let test = match step.node_test {
        NodeTest::Wildcard | NodeTest::Node => StepTest::Any,
        NodeTest::NamespaceWildcard(prefix) => {
            let ns = ctx.get_namespace(&prefix).ok_or_else(|| {
                Error::constraint(format!("unknown namespace prefix '{}' in xpath", prefix))
            })?;
            StepTest::Namespace(ns.to_string())
        }
        NodeTest::Name { prefix, local } => {
            let name = match prefix {
                Some(p) => format!("{}:{}", p, local),
                None => local,
            };
            StepTest::Name(ctx.resolve_without_default(&name)?)
        }
    };
    Ok(PathStep { axis, test })
}
