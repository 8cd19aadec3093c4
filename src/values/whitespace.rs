//! whiteSpace facet modes

use std::fmt;

use serde::Serialize;

use crate::error::{Error, Result};

/// White space handling mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum WhiteSpace {
    /// Preserve all white space
    Preserve,
    /// Replace tabs and newlines with spaces
    Replace,
    /// Replace and collapse multiple spaces
    Collapse,
}

impl WhiteSpace {
    /// Parse from string value
    pub fn parse(s: &str) -> Result<Self> {
        match s {
            "preserve" => Ok(WhiteSpace::Preserve),
            "replace" => Ok(WhiteSpace::Replace),
            "collapse" => Ok(WhiteSpace::Collapse),
            _ => Err(Error::facet(
                "whiteSpace",
                format!(
                    "invalid value '{}', must be 'preserve', 'replace', or 'collapse'",
                    s
                ),
            )),
        }
    }

    /// Normalize a string according to this white space mode
    pub fn normalize(&self, s: &str) -> String {
        match self {
            WhiteSpace::Preserve => s.to_string(),
            WhiteSpace::Replace => s.replace(['\t', '\n', '\r'], " "),
            WhiteSpace::Collapse => {
                let mut result = String::with_capacity(s.len());
                let mut prev_space = true; // trims leading spaces

                for c in s.chars() {
                    if matches!(c, ' ' | '\t' | '\n' | '\r') {
                        if !prev_space {
                            result.push(' ');
                            prev_space = true;
                        }
                    } else {
                        result.push(c);
                        prev_space = false;
                    }
                }

                if result.ends_with(' ') {
                    result.pop();
                }
                result
            }
        }
    }

    /// Whether a derived type may use `derived` when its base uses `self`
    ///
    /// Restrictions may only tighten the mode: preserve, then replace, then
    /// collapse.
    pub fn allows_restriction_to(&self, derived: WhiteSpace) -> bool {
        derived >= *self
    }

    /// Numeric code stored in runtime tables
    pub fn code(&self) -> u8 {
        match self {
            WhiteSpace::Preserve => 0,
            WhiteSpace::Replace => 1,
            WhiteSpace::Collapse => 2,
        }
    }
}

impl fmt::Display for WhiteSpace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            WhiteSpace::Preserve => "preserve",
            WhiteSpace::Replace => "replace",
            WhiteSpace::Collapse => "collapse",
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_whitespace_parse() {
        assert_eq!(WhiteSpace::parse("preserve").unwrap(), WhiteSpace::Preserve);
        assert_eq!(WhiteSpace::parse("replace").unwrap(), WhiteSpace::Replace);
        assert_eq!(WhiteSpace::parse("collapse").unwrap(), WhiteSpace::Collapse);
        assert!(WhiteSpace::parse("invalid").is_err());
    }

    #[test]
    fn test_whitespace_normalize() {
        let text = "  hello\t\nworld  ";

        assert_eq!(WhiteSpace::Preserve.normalize(text), text);
        assert_eq!(WhiteSpace::Replace.normalize(text), "  hello  world  ");
        assert_eq!(WhiteSpace::Collapse.normalize(text), "hello world");
        assert_eq!(WhiteSpace::Collapse.normalize(" \t "), "");
    }

    #[test]
    fn test_restriction_order() {
        assert!(WhiteSpace::Preserve.allows_restriction_to(WhiteSpace::Collapse));
        assert!(WhiteSpace::Collapse.allows_restriction_to(WhiteSpace::Collapse));
        assert!(!WhiteSpace::Collapse.allows_restriction_to(WhiteSpace::Replace));
    }
}
