//! String-derived and integer-derived kinds
//!
//! Built-in types derived from `xs:string` and `xs:integer` share one
//! primitive validator each; the kind refines the lexical check or bounds the
//! value.

use serde::Serialize;

use crate::error::{Error, Result};
use crate::names::{is_valid_language, is_valid_name, is_valid_ncname, is_valid_nmtoken};
use crate::values::decimal::{Dec, Int};

/// Refinement of a string validator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum StringKind {
    /// `xs:string`
    Any,
    /// `xs:normalizedString`
    Normalized,
    /// `xs:token`
    Token,
    /// `xs:language`
    Language,
    /// `xs:Name`
    Name,
    /// `xs:NCName`
    NCName,
    /// `xs:ID`
    Id,
    /// `xs:IDREF`
    IdRef,
    /// `xs:ENTITY`
    Entity,
    /// `xs:NMTOKEN`
    NmToken,
}

impl StringKind {
    /// Check an already whitespace-normalized value
    pub fn check(&self, value: &str) -> Result<()> {
        let ok = match self {
            StringKind::Any => true,
            StringKind::Normalized => !value.contains(['\t', '\n', '\r']),
            StringKind::Token => {
                !value.contains(['\t', '\n', '\r'])
                    && !value.starts_with(' ')
                    && !value.ends_with(' ')
                    && !value.contains("  ")
            }
            StringKind::Language => is_valid_language(value),
            StringKind::Name => is_valid_name(value),
            StringKind::NCName | StringKind::Id | StringKind::IdRef | StringKind::Entity => {
                is_valid_ncname(value)
            }
            StringKind::NmToken => is_valid_nmtoken(value),
        };
        if ok {
            Ok(())
        } else {
            Err(Error::lexical(self.type_name(), value))
        }
    }

    /// XSD type name
    pub fn type_name(&self) -> &'static str {
        match self {
            StringKind::Any => "string",
            StringKind::Normalized => "normalizedString",
            StringKind::Token => "token",
            StringKind::Language => "language",
            StringKind::Name => "Name",
            StringKind::NCName => "NCName",
            StringKind::Id => "ID",
            StringKind::IdRef => "IDREF",
            StringKind::Entity => "ENTITY",
            StringKind::NmToken => "NMTOKEN",
        }
    }
}

/// Refinement of an integer validator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum IntegerKind {
    /// `xs:integer`
    Any,
    /// `xs:long`
    Long,
    /// `xs:int`
    Int,
    /// `xs:short`
    Short,
    /// `xs:byte`
    Byte,
    /// `xs:unsignedLong`
    UnsignedLong,
    /// `xs:unsignedInt`
    UnsignedInt,
    /// `xs:unsignedShort`
    UnsignedShort,
    /// `xs:unsignedByte`
    UnsignedByte,
    /// `xs:nonNegativeInteger`
    NonNegative,
    /// `xs:positiveInteger`
    Positive,
    /// `xs:negativeInteger`
    Negative,
    /// `xs:nonPositiveInteger`
    NonPositive,
}

impl IntegerKind {
    /// Inclusive bounds; `None` is unbounded on that side
    pub fn bounds(&self) -> (Option<i128>, Option<i128>) {
        match self {
            IntegerKind::Any => (None, None),
            IntegerKind::Long => (Some(i64::MIN as i128), Some(i64::MAX as i128)),
            IntegerKind::Int => (Some(i32::MIN as i128), Some(i32::MAX as i128)),
            IntegerKind::Short => (Some(i16::MIN as i128), Some(i16::MAX as i128)),
            IntegerKind::Byte => (Some(i8::MIN as i128), Some(i8::MAX as i128)),
            IntegerKind::UnsignedLong => (Some(0), Some(u64::MAX as i128)),
            IntegerKind::UnsignedInt => (Some(0), Some(u32::MAX as i128)),
            IntegerKind::UnsignedShort => (Some(0), Some(u16::MAX as i128)),
            IntegerKind::UnsignedByte => (Some(0), Some(u8::MAX as i128)),
            IntegerKind::NonNegative => (Some(0), None),
            IntegerKind::Positive => (Some(1), None),
            IntegerKind::Negative => (None, Some(-1)),
            IntegerKind::NonPositive => (None, Some(0)),
        }
    }

    /// Check that a value lies within the kind's bounds
    pub fn check(&self, value: &Int) -> Result<()> {
        let (min, max) = self.bounds();
        let below = min.map_or(false, |m| value.as_dec() < &Dec::from_i128(m));
        let above = max.map_or(false, |m| value.as_dec() > &Dec::from_i128(m));
        if below || above {
            return Err(Error::ComponentRange {
                component: self.type_name(),
                value: value.to_canonical(),
            });
        }
        Ok(())
    }

    /// XSD type name
    pub fn type_name(&self) -> &'static str {
        match self {
            IntegerKind::Any => "integer",
            IntegerKind::Long => "long",
            IntegerKind::Int => "int",
            IntegerKind::Short => "short",
            IntegerKind::Byte => "byte",
            IntegerKind::UnsignedLong => "unsignedLong",
            IntegerKind::UnsignedInt => "unsignedInt",
            IntegerKind::UnsignedShort => "unsignedShort",
            IntegerKind::UnsignedByte => "unsignedByte",
            IntegerKind::NonNegative => "nonNegativeInteger",
            IntegerKind::Positive => "positiveInteger",
            IntegerKind::Negative => "negativeInteger",
            IntegerKind::NonPositive => "nonPositiveInteger",
        }
    }
}
