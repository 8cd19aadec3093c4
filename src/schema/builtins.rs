//! XSD built-in types
//!
//! The built-in type hierarchy rooted at `anyType`. Built-ins are not stored in
//! the type arena; references resolve to [`Builtin`] values directly, and the
//! runtime builder emits one type row per built-in in [`Builtin::ALL`] order.

use std::collections::HashMap;
use std::fmt;

use serde::Serialize;

use crate::namespaces::{QName, XSD_NAMESPACE};
use crate::values::{IntegerKind, Primitive, StringKind, WhiteSpace};

use super::types::Variety;

/// XSD built-in type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[allow(missing_docs)]
pub enum Builtin {
    AnyType,
    AnySimpleType,
    String,
    NormalizedString,
    Token,
    Language,
    Name,
    NCName,
    Id,
    IdRef,
    IdRefs,
    Entity,
    Entities,
    NmToken,
    NmTokens,
    Boolean,
    Decimal,
    Integer,
    NonPositiveInteger,
    NegativeInteger,
    Long,
    Int,
    Short,
    Byte,
    NonNegativeInteger,
    UnsignedLong,
    UnsignedInt,
    UnsignedShort,
    UnsignedByte,
    PositiveInteger,
    Float,
    Double,
    Duration,
    DateTime,
    Date,
    Time,
    GYearMonth,
    GYear,
    GMonthDay,
    GDay,
    GMonth,
    AnyUri,
    QName,
    Notation,
    HexBinary,
    Base64Binary,
}

lazy_static::lazy_static! {
    static ref BUILTINS_BY_NAME: HashMap<&'static str, Builtin> =
        Builtin::ALL.iter().map(|b| (b.name(), *b)).collect();
}

impl Builtin {
    /// Every built-in, bases before derived types
    pub const ALL: [Builtin; 46] = [
        Builtin::AnyType,
        Builtin::AnySimpleType,
        Builtin::String,
        Builtin::NormalizedString,
        Builtin::Token,
        Builtin::Language,
        Builtin::Name,
        Builtin::NCName,
        Builtin::Id,
        Builtin::IdRef,
        Builtin::IdRefs,
        Builtin::Entity,
        Builtin::Entities,
        Builtin::NmToken,
        Builtin::NmTokens,
        Builtin::Boolean,
        Builtin::Decimal,
        Builtin::Integer,
        Builtin::NonPositiveInteger,
        Builtin::NegativeInteger,
        Builtin::Long,
        Builtin::Int,
        Builtin::Short,
        Builtin::Byte,
        Builtin::NonNegativeInteger,
        Builtin::UnsignedLong,
        Builtin::UnsignedInt,
        Builtin::UnsignedShort,
        Builtin::UnsignedByte,
        Builtin::PositiveInteger,
        Builtin::Float,
        Builtin::Double,
        Builtin::Duration,
        Builtin::DateTime,
        Builtin::Date,
        Builtin::Time,
        Builtin::GYearMonth,
        Builtin::GYear,
        Builtin::GMonthDay,
        Builtin::GDay,
        Builtin::GMonth,
        Builtin::AnyUri,
        Builtin::QName,
        Builtin::Notation,
        Builtin::HexBinary,
        Builtin::Base64Binary,
    ];

    /// Local name in the XSD namespace
    pub fn name(&self) -> &'static str {
        match self {
            Builtin::AnyType => "anyType",
            Builtin::AnySimpleType => "anySimpleType",
            Builtin::String => "string",
            Builtin::NormalizedString => "normalizedString",
            Builtin::Token => "token",
            Builtin::Language => "language",
            Builtin::Name => "Name",
            Builtin::NCName => "NCName",
            Builtin::Id => "ID",
            Builtin::IdRef => "IDREF",
            Builtin::IdRefs => "IDREFS",
            Builtin::Entity => "ENTITY",
            Builtin::Entities => "ENTITIES",
            Builtin::NmToken => "NMTOKEN",
            Builtin::NmTokens => "NMTOKENS",
            Builtin::Boolean => "boolean",
            Builtin::Decimal => "decimal",
            Builtin::Integer => "integer",
            Builtin::NonPositiveInteger => "nonPositiveInteger",
            Builtin::NegativeInteger => "negativeInteger",
            Builtin::Long => "long",
            Builtin::Int => "int",
            Builtin::Short => "short",
            Builtin::Byte => "byte",
            Builtin::NonNegativeInteger => "nonNegativeInteger",
            Builtin::UnsignedLong => "unsignedLong",
            Builtin::UnsignedInt => "unsignedInt",
            Builtin::UnsignedShort => "unsignedShort",
            Builtin::UnsignedByte => "unsignedByte",
            Builtin::PositiveInteger => "positiveInteger",
            Builtin::Float => "float",
            Builtin::Double => "double",
            Builtin::Duration => "duration",
            Builtin::DateTime => "dateTime",
            Builtin::Date => "date",
            Builtin::Time => "time",
            Builtin::GYearMonth => "gYearMonth",
            Builtin::GYear => "gYear",
            Builtin::GMonthDay => "gMonthDay",
            Builtin::GDay => "gDay",
            Builtin::GMonth => "gMonth",
            Builtin::AnyUri => "anyURI",
            Builtin::QName => "QName",
            Builtin::Notation => "NOTATION",
            Builtin::HexBinary => "hexBinary",
            Builtin::Base64Binary => "base64Binary",
        }
    }

    /// Look up a built-in by local name
    pub fn from_local_name(name: &str) -> Option<Builtin> {
        BUILTINS_BY_NAME.get(name).copied()
    }

    /// Look up a built-in by qualified name
    pub fn from_qname(name: &QName) -> Option<Builtin> {
        if name.namespace == XSD_NAMESPACE {
            Self::from_local_name(&name.local_name)
        } else {
            None
        }
    }

    /// Qualified name
    pub fn qname(&self) -> QName {
        QName::xsd(self.name())
    }

    /// Position in [`Builtin::ALL`]
    pub fn index(&self) -> usize {
        *self as usize
    }

    /// Base type; `None` only for `anyType`
    pub fn base(&self) -> Option<Builtin> {
        use Builtin::*;
        Some(match self {
            AnyType => return None,
            AnySimpleType => AnyType,
            NormalizedString => String,
            Token => NormalizedString,
            Language | Name | NmToken => Token,
            NCName => Name,
            Id | IdRef | Entity => NCName,
            Integer => Decimal,
            NonPositiveInteger | Long | NonNegativeInteger => Integer,
            NegativeInteger => NonPositiveInteger,
            Int => Long,
            Short => Int,
            Byte => Short,
            UnsignedLong | PositiveInteger => NonNegativeInteger,
            UnsignedInt => UnsignedLong,
            UnsignedShort => UnsignedInt,
            UnsignedByte => UnsignedShort,
            _ => AnySimpleType,
        })
    }

    /// Whether this is the complex ur-type
    pub fn is_complex(&self) -> bool {
        *self == Builtin::AnyType
    }

    /// Variety; `None` for `anyType` and `anySimpleType`
    pub fn variety(&self) -> Option<Variety> {
        match self {
            Builtin::AnyType | Builtin::AnySimpleType => None,
            Builtin::IdRefs | Builtin::Entities | Builtin::NmTokens => Some(Variety::List),
            _ => Some(Variety::Atomic),
        }
    }

    /// Item type of the built-in list types
    pub fn item_type(&self) -> Option<Builtin> {
        match self {
            Builtin::IdRefs => Some(Builtin::IdRef),
            Builtin::Entities => Some(Builtin::Entity),
            Builtin::NmTokens => Some(Builtin::NmToken),
            _ => None,
        }
    }

    /// Atomic validator kind
    pub fn primitive(&self) -> Option<Primitive> {
        use Builtin::*;
        Some(match self {
            AnyType | AnySimpleType | IdRefs | Entities | NmTokens => return None,
            String | NormalizedString | Token | Language | Name | NCName | Id | IdRef
            | Entity | NmToken => Primitive::String,
            Boolean => Primitive::Boolean,
            Decimal => Primitive::Decimal,
            Integer | NonPositiveInteger | NegativeInteger | Long | Int | Short | Byte
            | NonNegativeInteger | UnsignedLong | UnsignedInt | UnsignedShort | UnsignedByte
            | PositiveInteger => Primitive::Integer,
            Float => Primitive::Float,
            Double => Primitive::Double,
            Duration => Primitive::Duration,
            DateTime => Primitive::DateTime,
            Date => Primitive::Date,
            Time => Primitive::Time,
            GYearMonth => Primitive::GYearMonth,
            GYear => Primitive::GYear,
            GMonthDay => Primitive::GMonthDay,
            GDay => Primitive::GDay,
            GMonth => Primitive::GMonth,
            AnyUri => Primitive::AnyUri,
            QName => Primitive::QName,
            Notation => Primitive::Notation,
            HexBinary => Primitive::HexBinary,
            Base64Binary => Primitive::Base64Binary,
        })
    }

    /// String refinement for string-derived built-ins
    pub fn string_kind(&self) -> Option<StringKind> {
        Some(match self {
            Builtin::String => StringKind::Any,
            Builtin::NormalizedString => StringKind::Normalized,
            Builtin::Token => StringKind::Token,
            Builtin::Language => StringKind::Language,
            Builtin::Name => StringKind::Name,
            Builtin::NCName => StringKind::NCName,
            Builtin::Id => StringKind::Id,
            Builtin::IdRef => StringKind::IdRef,
            Builtin::Entity => StringKind::Entity,
            Builtin::NmToken => StringKind::NmToken,
            _ => return None,
        })
    }

    /// Integer refinement for integer-derived built-ins
    pub fn integer_kind(&self) -> Option<IntegerKind> {
        Some(match self {
            Builtin::Integer => IntegerKind::Any,
            Builtin::Long => IntegerKind::Long,
            Builtin::Int => IntegerKind::Int,
            Builtin::Short => IntegerKind::Short,
            Builtin::Byte => IntegerKind::Byte,
            Builtin::UnsignedLong => IntegerKind::UnsignedLong,
            Builtin::UnsignedInt => IntegerKind::UnsignedInt,
            Builtin::UnsignedShort => IntegerKind::UnsignedShort,
            Builtin::UnsignedByte => IntegerKind::UnsignedByte,
            Builtin::NonNegativeInteger => IntegerKind::NonNegative,
            Builtin::PositiveInteger => IntegerKind::Positive,
            Builtin::NegativeInteger => IntegerKind::Negative,
            Builtin::NonPositiveInteger => IntegerKind::NonPositive,
            _ => return None,
        })
    }

    /// whiteSpace mode
    pub fn white_space(&self) -> WhiteSpace {
        match self {
            Builtin::AnyType | Builtin::AnySimpleType | Builtin::String => WhiteSpace::Preserve,
            Builtin::NormalizedString => WhiteSpace::Replace,
            _ => WhiteSpace::Collapse,
        }
    }

    /// Whether the type is `xs:ID` or derived from it
    pub fn is_id(&self) -> bool {
        *self == Builtin::Id
    }

    /// Whether `self` is `other` or derived from it
    pub fn derives_from(&self, other: Builtin) -> bool {
        let mut current = Some(*self);
        while let Some(b) = current {
            if b == other {
                return true;
            }
            current = b.base();
        }
        false
    }
}

impl fmt::Display for Builtin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "xs:{}", self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_all_is_ordered_by_discriminant() {
        for (i, b) in Builtin::ALL.iter().enumerate() {
            assert_eq!(b.index(), i);
            if let Some(base) = b.base() {
                assert!(base.index() < i, "{} must follow its base", b);
            }
        }
    }

    #[test]
    fn test_lookup() {
        assert_eq!(Builtin::from_local_name("NMTOKENS"), Some(Builtin::NmTokens));
        assert_eq!(Builtin::from_qname(&QName::xsd("int")), Some(Builtin::Int));
        assert_eq!(Builtin::from_qname(&QName::local("int")), None);
        assert_eq!(Builtin::from_local_name("anyAtomicType"), None);
    }

    #[test]
    fn test_hierarchy() {
        assert!(Builtin::Byte.derives_from(Builtin::Decimal));
        assert!(Builtin::Id.derives_from(Builtin::String));
        assert!(!Builtin::Decimal.derives_from(Builtin::Integer));
        assert_eq!(Builtin::IdRefs.variety(), Some(Variety::List));
        assert_eq!(Builtin::IdRefs.item_type(), Some(Builtin::IdRef));
        assert_eq!(Builtin::UnsignedByte.primitive(), Some(Primitive::Integer));
        assert_eq!(Builtin::NormalizedString.white_space(), WhiteSpace::Replace);
    }
}
