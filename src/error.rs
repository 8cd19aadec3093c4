//! Error types for xmlschema-compiler
//!
//! Every stage of the compilation pipeline reports failures through the
//! [`Error`] enum. Errors are categorized rather than flattened to messages so
//! that callers can tell a numeric overflow from a malformed lexical value, and
//! so that the semantic checker can hand back every schema problem at once.

use std::fmt;
use thiserror::Error;

use crate::namespaces::QName;
use crate::schema::Phase;

/// Result type alias using the compiler [`Error`]
pub type Result<T> = std::result::Result<T, Error>;

/// Kind of schema component named in a diagnostic
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ComponentKind {
    /// Simple or complex type definition
    Type,
    /// Element declaration
    Element,
    /// Attribute declaration
    Attribute,
    /// Attribute group definition
    AttributeGroup,
    /// Model group definition
    Group,
    /// Substitution group affiliation
    SubstitutionGroup,
    /// Notation declaration
    Notation,
    /// Identity constraint (unique, key, keyref)
    IdentityConstraint,
}

impl fmt::Display for ComponentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ComponentKind::Type => "type",
            ComponentKind::Element => "element",
            ComponentKind::Attribute => "attribute",
            ComponentKind::AttributeGroup => "attributeGroup",
            ComponentKind::Group => "group",
            ComponentKind::SubstitutionGroup => "substitutionGroup",
            ComponentKind::Notation => "notation",
            ComponentKind::IdentityConstraint => "identity constraint",
        };
        f.write_str(s)
    }
}

/// Pipeline stage used to give build errors context
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    /// Structural checks on the parsed AST
    Structure,
    /// Type reference resolution
    Resolve,
    /// Semantic reference validation
    Semantic,
    /// ID assignment
    AssignIds,
    /// Reference binding
    ResolveReferences,
    /// Cycle detection
    DetectCycles,
    /// Unique Particle Attribution
    ValidateUpa,
    /// Validator compilation
    CompileValidators,
    /// Runtime table construction
    BuildRuntime,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Stage::Structure => "structure check",
            Stage::Resolve => "resolve type references",
            Stage::Semantic => "validate references",
            Stage::AssignIds => "assign IDs",
            Stage::ResolveReferences => "resolve references",
            Stage::DetectCycles => "detect cycles",
            Stage::ValidateUpa => "validate UPA",
            Stage::CompileValidators => "compile validators",
            Stage::BuildRuntime => "build runtime schema",
        };
        f.write_str(s)
    }
}

/// Category of a numeric lexical error
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NumericErrorKind {
    /// Empty input
    Empty,
    /// Character that is not a digit, sign or dot
    BadChar,
    /// More than one sign, or a sign after the first position
    MultipleSigns,
    /// More than one decimal point
    MultipleDots,
    /// Sign and/or dot without any digit
    NoDigits,
}

impl fmt::Display for NumericErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            NumericErrorKind::Empty => "empty value",
            NumericErrorKind::BadChar => "invalid character",
            NumericErrorKind::MultipleSigns => "multiple signs",
            NumericErrorKind::MultipleDots => "multiple decimal points",
            NumericErrorKind::NoDigits => "no digits",
        };
        f.write_str(s)
    }
}

/// Main error type for schema compilation
#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    /// A QName reference does not name any component of the expected kind
    #[error("unresolved reference to {kind} '{name}'")]
    UnresolvedReference {
        /// Kind of the referenced component
        kind: ComponentKind,
        /// Referenced name
        name: QName,
    },

    /// A reference points into a namespace the referencing document did not import
    #[error("reference to {kind} '{name}' requires an import of namespace '{namespace}'")]
    NamespaceNotImported {
        /// Kind of the referenced component
        kind: ComponentKind,
        /// Referenced name
        name: QName,
        /// Namespace that is missing from the imports
        namespace: String,
    },

    /// A derivation, group, attribute group or substitution chain loops
    #[error("circular reference in {kind} '{name}'")]
    CircularReference {
        /// Kind of the component where the cycle was entered
        kind: ComponentKind,
        /// Cycle entry name
        name: QName,
    },

    /// A placeholder type reference survived resolution
    #[error("unresolved placeholder type '{0}'")]
    UnresolvedPlaceholder(QName),

    /// Two values are only partially ordered and this pair is incomparable
    #[error("indeterminate comparison")]
    IndeterminateComparison,

    /// A value cannot be converted without losing its meaning
    #[error("indeterminate conversion: {0}")]
    IndeterminateConversion(String),

    /// Arithmetic result does not fit the target representation
    #[error("overflow: {0}")]
    Overflow(String),

    /// A numeric or date component is outside its allowed range
    #[error("{component} out of range: '{value}'")]
    ComponentRange {
        /// Name of the component (year, month, second, timezone, ...)
        component: &'static str,
        /// Offending lexical value
        value: String,
    },

    /// A lexical value is not in the lexical space of its type
    #[error("invalid {kind} value '{value}'")]
    InvalidLexical {
        /// Datatype name
        kind: String,
        /// Offending lexical value
        value: String,
    },

    /// A decimal or integer lexical value is malformed
    #[error("invalid numeric value '{value}': {kind}")]
    Numeric {
        /// Error category
        kind: NumericErrorKind,
        /// Offending lexical value
        value: String,
    },

    /// A value violates, or cannot be bound to, a constraining facet
    #[error("facet {facet}: {detail}")]
    FacetViolation {
        /// Facet name as written in the schema
        facet: String,
        /// Description of the violation
        detail: String,
    },

    /// maxOccurs is greater than the configured limit
    #[error("maxOccurs {value} is greater than the limit {limit}")]
    OccursTooLarge {
        /// Declared value
        value: u32,
        /// Configured limit
        limit: u32,
    },

    /// An occurrence value does not fit in 32 bits
    #[error("occurrence value overflow: {0}")]
    OccursOverflow(String),

    /// An operation was called on a schema in the wrong lifecycle phase
    #[error("schema is in phase '{found}', expected '{expected}'")]
    Phase {
        /// Phase the operation requires
        expected: Phase,
        /// Phase the schema is in
        found: Phase,
    },

    /// A schema component constraint is violated
    #[error("{0}")]
    Constraint(String),

    /// Aggregated semantic errors
    #[error("{}", format_error_list(.0))]
    Schema(Vec<Error>),

    /// A resource limit was exceeded
    #[error("limit exceeded: {0}")]
    LimitExceeded(String),

    /// XML syntax error from the underlying reader
    #[error("XML error: {0}")]
    Xml(String),

    /// Schema document parsing error
    #[error("parse error: {0}")]
    Parse(#[from] ParseError),

    /// Error annotated with the pipeline stage that raised it
    #[error("{stage}: {source}")]
    BuildStage {
        /// Stage that failed
        stage: Stage,
        /// Underlying error
        #[source]
        source: Box<Error>,
    },

    /// Error annotated with the component being compiled
    #[error("{component}: {source}")]
    Component {
        /// Component description, e.g. `type {urn:x}T`
        component: String,
        /// Underlying error
        #[source]
        source: Box<Error>,
    },
}

fn format_error_list(errors: &[Error]) -> String {
    let mut out = format!("{} schema error(s)", errors.len());
    for err in errors {
        out.push_str("\n  - ");
        out.push_str(&err.to_string());
    }
    out
}

impl Error {
    /// Create a component constraint violation
    pub fn constraint(message: impl Into<String>) -> Self {
        Error::Constraint(message.into())
    }

    /// Create an invalid lexical value error
    pub fn lexical(kind: impl Into<String>, value: impl Into<String>) -> Self {
        Error::InvalidLexical {
            kind: kind.into(),
            value: value.into(),
        }
    }

    /// Create a facet violation
    pub fn facet(facet: impl Into<String>, detail: impl Into<String>) -> Self {
        Error::FacetViolation {
            facet: facet.into(),
            detail: detail.into(),
        }
    }

    /// Wrap this error with the pipeline stage that raised it
    pub fn in_stage(self, stage: Stage) -> Self {
        Error::BuildStage {
            stage,
            source: Box::new(self),
        }
    }

    /// Wrap this error with the component being compiled
    pub fn in_component(self, component: impl Into<String>) -> Self {
        Error::Component {
            component: component.into(),
            source: Box::new(self),
        }
    }

    /// Peel stage and component wrappers off this error
    pub fn root_cause(&self) -> &Error {
        let mut err = self;
        loop {
            match err {
                Error::BuildStage { source, .. } | Error::Component { source, .. } => {
                    err = source;
                }
                _ => return err,
            }
        }
    }

    /// Flatten aggregated errors into a list of leaf errors
    pub fn flatten(&self) -> Vec<&Error> {
        match self.root_cause() {
            Error::Schema(list) => list.iter().flat_map(|e| e.flatten()).collect(),
            other => vec![other],
        }
    }
}

/// Schema document parsing error
#[derive(Debug, Clone, PartialEq)]
pub struct ParseError {
    /// Error message
    pub message: String,
    /// Location of the schema document
    pub location: Option<String>,
    /// Component or element that caused the error
    pub source: Option<String>,
}

impl ParseError {
    /// Create a new parse error
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            location: None,
            source: None,
        }
    }

    /// Set the location
    pub fn with_location(mut self, location: impl Into<String>) -> Self {
        self.location = Some(location.into());
        self
    }

    /// Set the source
    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)?;

        if let Some(ref loc) = self.location {
            write!(f, " (in {})", loc)?;
        }

        if let Some(ref src) = self.source {
            write!(f, " at {}", src)?;
        }

        Ok(())
    }
}

impl std::error::Error for ParseError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_error_display() {
        let err = ParseError::new("unexpected element 'foo'")
            .with_location("main.xsd")
            .with_source("xs:sequence");

        let msg = err.to_string();
        assert!(msg.contains("unexpected element 'foo'"));
        assert!(msg.contains("main.xsd"));
        assert!(msg.contains("xs:sequence"));
    }

    #[test]
    fn test_error_conversion() {
        let err: Error = ParseError::new("test").into();
        assert!(matches!(err, Error::Parse(_)));
    }

    #[test]
    fn test_root_cause_peels_wrappers() {
        let err = Error::OccursTooLarge { value: 2, limit: 1 }
            .in_component("type T")
            .in_stage(Stage::BuildRuntime);
        assert!(err.to_string().starts_with("build runtime schema: type T: maxOccurs 2"));
        assert_eq!(
            err.root_cause(),
            &Error::OccursTooLarge { value: 2, limit: 1 }
        );
    }

    #[test]
    fn test_flatten_schema_errors() {
        let err = Error::Schema(vec![
            Error::constraint("first"),
            Error::Schema(vec![Error::constraint("second")]),
        ])
        .in_stage(Stage::Semantic);
        let leaves = err.flatten();
        assert_eq!(leaves.len(), 2);
        assert!(err.to_string().contains("second"));
    }
}
