//! Particles and model groups
//!
//! A particle pairs occurrence bounds with a term: an element declaration, an
//! element wildcard, a model group, or a reference to a named group.

use std::fmt;

use serde::Serialize;

use crate::error::{Error, ParseError, Result};
use crate::namespaces::QName;

use super::wildcards::Wildcard;
use super::ElemHandle;

/// Occurrence bounds (minOccurs, maxOccurs); `None` max is unbounded
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct Occurs {
    /// Minimum number of occurrences (default 1)
    pub min: u32,
    /// Maximum number of occurrences (None = unbounded, default 1)
    pub max: Option<u32>,
}

impl Occurs {
    /// Create new occurrence bounds
    pub fn new(min: u32, max: Option<u32>) -> Self {
        Self { min, max }
    }

    /// Default occurrence (1, 1)
    pub fn once() -> Self {
        Self {
            min: 1,
            max: Some(1),
        }
    }

    /// Optional occurrence (0, 1)
    pub fn optional() -> Self {
        Self {
            min: 0,
            max: Some(1),
        }
    }

    /// Zero or more (0, unbounded)
    pub fn zero_or_more() -> Self {
        Self { min: 0, max: None }
    }

    /// Check if this particle can be empty (minOccurs == 0)
    pub fn is_emptiable(&self) -> bool {
        self.min == 0
    }

    /// Check if this particle is empty (maxOccurs == 0)
    pub fn is_empty(&self) -> bool {
        self.max == Some(0)
    }

    /// Check if particle has maxOccurs == 1
    pub fn is_single(&self) -> bool {
        self.max == Some(1)
    }

    /// Check if minOccurs <= maxOccurs
    pub fn is_consistent(&self) -> bool {
        self.max.map_or(true, |max| self.min <= max)
    }
}

impl Default for Occurs {
    fn default() -> Self {
        Self::once()
    }
}

impl fmt::Display for Occurs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.max {
            Some(max) => write!(f, "{{{},{}}}", self.min, max),
            None => write!(f, "{{{},unbounded}}", self.min),
        }
    }
}

fn parse_occurs_value(attr: &str, value: &str) -> Result<u32> {
    let value = value.trim();
    if value.is_empty() || !value.bytes().all(|b| b.is_ascii_digit()) {
        return Err(ParseError::new(format!(
            "{} value '{}' is not a valid non-negative integer",
            attr, value
        ))
        .into());
    }
    value
        .parse::<u32>()
        .map_err(|_| Error::OccursOverflow(format!("{}='{}'", attr, value)))
}

/// Parse minOccurs/maxOccurs from XML attribute values
///
/// Values that are valid integers but do not fit 32 bits raise
/// [`Error::OccursOverflow`]; consistency of the bounds is a structural check.
pub fn parse_occurs(min_occurs: Option<&str>, max_occurs: Option<&str>) -> Result<Occurs> {
    let mut occurs = Occurs::once();
    if let Some(min) = min_occurs {
        occurs.min = parse_occurs_value("minOccurs", min)?;
    }
    if let Some(max) = max_occurs {
        occurs.max = if max.trim() == "unbounded" {
            None
        } else {
            Some(parse_occurs_value("maxOccurs", max)?)
        };
    }
    Ok(occurs)
}

/// Model group compositor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Compositor {
    /// Ordered
    Sequence,
    /// Alternatives
    Choice,
    /// Unordered, each at most once
    All,
}

impl Compositor {
    /// Parse from an element local name
    pub fn from_local_name(name: &str) -> Option<Self> {
        match name {
            "sequence" => Some(Self::Sequence),
            "choice" => Some(Self::Choice),
            "all" => Some(Self::All),
            _ => None,
        }
    }
}

impl fmt::Display for Compositor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Sequence => write!(f, "sequence"),
            Self::Choice => write!(f, "choice"),
            Self::All => write!(f, "all"),
        }
    }
}

/// Model group
#[derive(Debug, Clone, PartialEq)]
pub struct ModelGroup {
    /// Compositor
    pub compositor: Compositor,
    /// Member particles in source order
    pub particles: Vec<Particle>,
}

impl ModelGroup {
    /// Create a model group
    pub fn new(compositor: Compositor, particles: Vec<Particle>) -> Self {
        Self {
            compositor,
            particles,
        }
    }
}

/// Particle term
#[derive(Debug, Clone, PartialEq)]
pub enum Term {
    /// Local element declaration or element reference
    Element(ElemHandle),
    /// Element wildcard
    Any(Wildcard),
    /// Nested model group
    Group(ModelGroup),
    /// Reference to a named model group
    GroupRef(QName),
}

/// Particle: a term with occurrence bounds
#[derive(Debug, Clone, PartialEq)]
pub struct Particle {
    /// Occurrence bounds
    pub occurs: Occurs,
    /// Term
    pub term: Term,
}

impl Particle {
    /// Create a particle
    pub fn new(occurs: Occurs, term: Term) -> Self {
        Self { occurs, term }
    }

    /// Particle for a model group occurring once
    pub fn group(compositor: Compositor, particles: Vec<Particle>) -> Self {
        Self::new(
            Occurs::once(),
            Term::Group(ModelGroup::new(compositor, particles)),
        )
    }

    /// Visit every particle in the tree, this one first
    ///
    /// Group references are not followed.
    pub fn walk<'a>(&'a self, visit: &mut dyn FnMut(&'a Particle)) {
        let mut stack = vec![self];
        while let Some(p) = stack.pop() {
            visit(p);
            if let Term::Group(group) = &p.term {
                stack.extend(group.particles.iter().rev());
            }
        }
    }

    /// Element handles in the tree, in source order
    pub fn element_handles(&self) -> Vec<ElemHandle> {
        let mut out = Vec::new();
        self.walk(&mut |p| {
            if let Term::Element(h) = p.term {
                out.push(h);
            }
        });
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_occurs() {
        assert_eq!(parse_occurs(None, None).unwrap(), Occurs::once());
        assert_eq!(
            parse_occurs(Some("0"), Some("unbounded")).unwrap(),
            Occurs::zero_or_more()
        );
        assert_eq!(
            parse_occurs(Some("2"), Some("5")).unwrap(),
            Occurs::new(2, Some(5))
        );
        assert!(matches!(
            parse_occurs(None, Some("4294967296")),
            Err(Error::OccursOverflow(_))
        ));
        assert!(matches!(parse_occurs(Some("-1"), None), Err(Error::Parse(_))));
    }

    #[test]
    fn test_consistency() {
        assert!(Occurs::new(2, Some(2)).is_consistent());
        assert!(!Occurs::new(3, Some(2)).is_consistent());
        assert!(Occurs::new(3, None).is_consistent());
    }

    #[test]
    fn test_walk_order() {
        let tree = Particle::group(
            Compositor::Sequence,
            vec![
                Particle::new(Occurs::once(), Term::Element(ElemHandle(0))),
                Particle::group(
                    Compositor::Choice,
                    vec![
                        Particle::new(Occurs::once(), Term::Element(ElemHandle(1))),
                        Particle::new(Occurs::once(), Term::Element(ElemHandle(2))),
                    ],
                ),
                Particle::new(Occurs::once(), Term::Element(ElemHandle(3))),
            ],
        );
        assert_eq!(
            tree.element_handles(),
            vec![ElemHandle(0), ElemHandle(1), ElemHandle(2), ElemHandle(3)]
        );
    }
}
