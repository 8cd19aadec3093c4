//! Identity-constraint XPath parsing
//!
//! Selectors and fields use the restricted XPath subset of XSD 1.0:
//!
//! ```text
//! Selector ::= Path ( '|' Path )*
//! Path     ::= ('.//')? Step ( '/' Step )*
//! Step     ::= '.' | ('child::')? NameTest
//! Field    ::= as Path, with an optional final ('@' | 'attribute::') NameTest
//! NameTest ::= QName | '*' | NCName ':' '*'
//! ```

use std::fmt;

use crate::error::{Error, ParseError};
use crate::names::is_valid_ncname;

/// Axis of a step
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum XPathAxis {
    /// `child::` or no axis
    Child,
    /// `attribute::` or `@`
    Attribute,
    /// `.`
    SelfNode,
}

impl fmt::Display for XPathAxis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            XPathAxis::Child => write!(f, "child"),
            XPathAxis::Attribute => write!(f, "attribute"),
            XPathAxis::SelfNode => write!(f, "self"),
        }
    }
}

/// Node test in a step
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeTest {
    /// Name test
    Name {
        /// Namespace prefix
        prefix: Option<String>,
        /// Local name
        local: String,
    },
    /// `*`
    Wildcard,
    /// `prefix:*`
    NamespaceWildcard(String),
    /// The context node itself, for `.`
    Node,
}

impl NodeTest {
    /// Parse a node test
    pub fn parse(s: &str) -> Result<Self, XPathParseError> {
        let s = s.trim();
        if s.is_empty() {
            return Err(XPathParseError::UnexpectedEnd);
        }
        if s == "*" {
            return Ok(Self::Wildcard);
        }
        if let Some(prefix) = s.strip_suffix(":*") {
            if !is_valid_ncname(prefix) {
                return Err(XPathParseError::InvalidSyntax(format!(
                    "invalid prefix in '{}'",
                    s
                )));
            }
            return Ok(Self::NamespaceWildcard(prefix.to_string()));
        }
        let (prefix, local) = match s.split_once(':') {
            Some((p, l)) => (Some(p), l),
            None => (None, s),
        };
        if !is_valid_ncname(local) || prefix.map_or(false, |p| !is_valid_ncname(p)) {
            return Err(XPathParseError::InvalidSyntax(format!("invalid name test '{}'", s)));
        }
        Ok(Self::Name {
            prefix: prefix.map(str::to_string),
            local: local.to_string(),
        })
    }
}

/// A parsed step
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedStep {
    /// The axis
    pub axis: XPathAxis,
    /// The node test
    pub node_test: NodeTest,
}

impl ParsedStep {
    /// Parse one step
    pub fn parse(step: &str) -> Result<Self, XPathParseError> {
        let step = step.trim();
        if step == "." {
            return Ok(Self {
                axis: XPathAxis::SelfNode,
                node_test: NodeTest::Node,
            });
        }
        if step.contains('[') {
            return Err(XPathParseError::InvalidSyntax(format!(
                "predicates are not allowed: '{}'",
                step
            )));
        }
        let (axis, test) = if let Some(rest) = step.strip_prefix('@') {
            (XPathAxis::Attribute, rest)
        } else if let Some(pos) = step.find("::") {
            let axis = match step[..pos].trim() {
                "child" => XPathAxis::Child,
                "attribute" => XPathAxis::Attribute,
                other => return Err(XPathParseError::UnknownAxis(other.to_string())),
            };
            (axis, &step[pos + 2..])
        } else {
            (XPathAxis::Child, step)
        };
        Ok(Self {
            axis,
            node_test: NodeTest::parse(test)?,
        })
    }
}

/// One alternative of a selector or field
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedPath {
    /// Leading `.//`
    pub descendant: bool,
    /// Steps in order
    pub steps: Vec<ParsedStep>,
}

impl ParsedPath {
    /// Parse a single path (no `|`)
    pub fn parse(path: &str) -> Result<Self, XPathParseError> {
        let path = path.trim();
        if path.is_empty() {
            return Err(XPathParseError::UnexpectedEnd);
        }
        let (descendant, rest) = match path.strip_prefix(".//") {
            Some(rest) => (true, rest),
            None => (false, path),
        };
        if rest.starts_with('/') {
            return Err(XPathParseError::InvalidSyntax(format!(
                "absolute paths are not allowed: '{}'",
                path
            )));
        }
        let mut steps = Vec::new();
        for part in rest.split('/') {
            if part.trim().is_empty() {
                return Err(XPathParseError::InvalidSyntax(format!(
                    "empty step in '{}'",
                    path
                )));
            }
            steps.push(ParsedStep::parse(part)?);
        }
        Ok(Self { descendant, steps })
    }
}

/// XPath parse error
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum XPathParseError {
    /// Unknown or disallowed axis name
    UnknownAxis(String),
    /// Invalid syntax
    InvalidSyntax(String),
    /// Unexpected end of expression
    UnexpectedEnd,
}

impl fmt::Display for XPathParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnknownAxis(axis) => write!(f, "axis '{}' is not allowed", axis),
            Self::InvalidSyntax(msg) => write!(f, "invalid XPath: {}", msg),
            Self::UnexpectedEnd => write!(f, "unexpected end of XPath expression"),
        }
    }
}

impl std::error::Error for XPathParseError {}

impl From<XPathParseError> for Error {
    fn from(e: XPathParseError) -> Self {
        Error::Parse(ParseError::new(e.to_string()))
    }
}

/// Parser for `xs:selector` and `xs:field` expressions
#[derive(Debug, Clone)]
pub struct IdentityXPathParser {
    allow_attributes: bool,
}

impl Default for IdentityXPathParser {
    fn default() -> Self {
        Self::new()
    }
}

impl IdentityXPathParser {
    /// Parser for selector expressions
    pub fn new() -> Self {
        Self {
            allow_attributes: false,
        }
    }

    /// Parser for field expressions, which may end in an attribute step
    pub fn for_field() -> Self {
        Self {
            allow_attributes: true,
        }
    }

    /// Parse an expression into its `|`-separated alternatives
    pub fn parse(&self, xpath: &str) -> Result<Vec<ParsedPath>, XPathParseError> {
        let mut paths = Vec::new();
        for alternative in xpath.split('|') {
            let path = ParsedPath::parse(alternative)?;
            self.validate(&path)?;
            paths.push(path);
        }
        Ok(paths)
    }

    fn validate(&self, path: &ParsedPath) -> Result<(), XPathParseError> {
        let last = path.steps.len() - 1;
        for (i, step) in path.steps.iter().enumerate() {
            if step.axis == XPathAxis::Attribute {
                if !self.allow_attributes {
                    return Err(XPathParseError::InvalidSyntax(
                        "attribute steps are not allowed in a selector".to_string(),
                    ));
                }
                if i != last {
                    return Err(XPathParseError::InvalidSyntax(
                        "an attribute step must be the last step".to_string(),
                    ));
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_node_test_parse() {
        assert_eq!(NodeTest::parse("*").unwrap(), NodeTest::Wildcard);
        assert_eq!(
            NodeTest::parse("p:*").unwrap(),
            NodeTest::NamespaceWildcard("p".to_string())
        );
        assert_eq!(
            NodeTest::parse("p:item").unwrap(),
            NodeTest::Name {
                prefix: Some("p".to_string()),
                local: "item".to_string()
            }
        );
        assert!(NodeTest::parse("1abc").is_err());
    }

    #[test]
    fn test_parsed_path() {
        let p = ParsedPath::parse(".//a/child::b").unwrap();
        assert!(p.descendant);
        assert_eq!(p.steps.len(), 2);
        assert_eq!(p.steps[1].axis, XPathAxis::Child);
        assert!(ParsedPath::parse("a//b").is_err());
        assert!(ParsedPath::parse("/a").is_err());
        assert!(ParsedPath::parse("a[1]").is_err());
        assert!(ParsedPath::parse("parent::a").is_err());
    }

    #[test]
    fn test_identity_parser_selector() {
        let parser = IdentityXPathParser::new();
        assert_eq!(parser.parse("a | .//b").unwrap().len(), 2);
        assert!(parser.parse("@id").is_err());
    }

    #[test]
    fn test_identity_parser_field() {
        let parser = IdentityXPathParser::for_field();
        let paths = parser.parse("a/@id").unwrap();
        assert_eq!(paths[0].steps[1].axis, XPathAxis::Attribute);
        assert!(parser.parse("@id/a").is_err());
        assert_eq!(parser.parse(".").unwrap()[0].steps[0].axis, XPathAxis::SelfNode);
    }
}
