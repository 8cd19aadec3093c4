//! Atomic values: parsing, canonicalization, keys and ordering
//!
//! [`Primitive`] enumerates the atomic validator kinds. Every atomic value of
//! a simple type is parsed through its primitive, after whitespace
//! normalization, into a [`Value`].

use std::cmp::Ordering;
use std::fmt;

use serde::Serialize;

use crate::error::{Error, Result};
use crate::namespaces::{NamespaceContext, QName};
use crate::values::binary::{
    canonical_base64_binary, canonical_hex_binary, parse_base64_binary, parse_hex_binary,
};
use crate::values::decimal::{Dec, Int};
use crate::values::duration::Duration;
use crate::values::float::{canonical_float, compare_float, float_key, parse_float, Precision};
use crate::values::key::ValueKey;
use crate::values::qname::{parse_qname_value, qname_canonical_bytes, qname_key};
use crate::values::temporal::{Temporal, TemporalKind};
use crate::values::uri::validate_any_uri;

/// Atomic validator kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum Primitive {
    /// `xs:string` and its derivations
    String,
    /// `xs:boolean`
    Boolean,
    /// `xs:decimal`
    Decimal,
    /// `xs:integer` and its derivations
    Integer,
    /// `xs:float`
    Float,
    /// `xs:double`
    Double,
    /// `xs:duration`
    Duration,
    /// `xs:dateTime`
    DateTime,
    /// `xs:date`
    Date,
    /// `xs:time`
    Time,
    /// `xs:gYearMonth`
    GYearMonth,
    /// `xs:gYear`
    GYear,
    /// `xs:gMonthDay`
    GMonthDay,
    /// `xs:gDay`
    GDay,
    /// `xs:gMonth`
    GMonth,
    /// `xs:anyURI`
    AnyUri,
    /// `xs:QName`
    QName,
    /// `xs:NOTATION`
    Notation,
    /// `xs:hexBinary`
    HexBinary,
    /// `xs:base64Binary`
    Base64Binary,
}

impl Primitive {
    /// XSD type name
    pub fn name(&self) -> &'static str {
        match self {
            Primitive::String => "string",
            Primitive::Boolean => "boolean",
            Primitive::Decimal => "decimal",
            Primitive::Integer => "integer",
            Primitive::Float => "float",
            Primitive::Double => "double",
            Primitive::Duration => "duration",
            Primitive::DateTime => "dateTime",
            Primitive::Date => "date",
            Primitive::Time => "time",
            Primitive::GYearMonth => "gYearMonth",
            Primitive::GYear => "gYear",
            Primitive::GMonthDay => "gMonthDay",
            Primitive::GDay => "gDay",
            Primitive::GMonth => "gMonth",
            Primitive::AnyUri => "anyURI",
            Primitive::QName => "QName",
            Primitive::Notation => "NOTATION",
            Primitive::HexBinary => "hexBinary",
            Primitive::Base64Binary => "base64Binary",
        }
    }

    /// Temporal kind for date and time primitives
    pub fn temporal_kind(&self) -> Option<TemporalKind> {
        Some(match self {
            Primitive::DateTime => TemporalKind::DateTime,
            Primitive::Date => TemporalKind::Date,
            Primitive::Time => TemporalKind::Time,
            Primitive::GYearMonth => TemporalKind::GYearMonth,
            Primitive::GYear => TemporalKind::GYear,
            Primitive::GMonthDay => TemporalKind::GMonthDay,
            Primitive::GDay => TemporalKind::GDay,
            Primitive::GMonth => TemporalKind::GMonth,
            _ => return None,
        })
    }

    /// Whether the value space is ordered (range facets apply)
    pub fn is_ordered(&self) -> bool {
        self.is_numeric() || *self == Primitive::Duration || self.temporal_kind().is_some()
    }

    /// Whether the primitive is numeric
    pub fn is_numeric(&self) -> bool {
        matches!(
            self,
            Primitive::Decimal | Primitive::Integer | Primitive::Float | Primitive::Double
        )
    }

    /// Whether `totalDigits`/`fractionDigits` apply
    pub fn has_digits(&self) -> bool {
        matches!(self, Primitive::Decimal | Primitive::Integer)
    }

    /// Whether `length`/`minLength`/`maxLength` apply to the atomic value
    pub fn has_length(&self) -> bool {
        !(self.is_ordered() || *self == Primitive::Boolean)
    }

    /// Whether values are resolved against a namespace context
    pub fn needs_namespaces(&self) -> bool {
        matches!(self, Primitive::QName | Primitive::Notation)
    }

    /// Parse a whitespace-normalized lexical value
    pub fn parse(&self, lexical: &str, ctx: &NamespaceContext) -> Result<Value> {
        Ok(match self {
            Primitive::String => Value::String(lexical.to_string()),
            Primitive::Boolean => Value::Boolean(match lexical {
                "true" | "1" => true,
                "false" | "0" => false,
                _ => return Err(Error::lexical("boolean", lexical)),
            }),
            Primitive::Decimal => Value::Decimal(Dec::parse(lexical)?),
            Primitive::Integer => Value::Integer(Int::parse(lexical)?),
            Primitive::Float => Value::Float(parse_float(lexical, Precision::Single)?),
            Primitive::Double => Value::Double(parse_float(lexical, Precision::Double)?),
            Primitive::Duration => Value::Duration(Duration::parse(lexical)?),
            Primitive::AnyUri => {
                validate_any_uri(lexical)?;
                Value::AnyUri(lexical.to_string())
            }
            Primitive::QName => Value::QName(parse_qname_value(lexical, ctx)?),
            Primitive::Notation => Value::Notation(parse_qname_value(lexical, ctx)?),
            Primitive::HexBinary => Value::HexBinary(parse_hex_binary(lexical)?),
            Primitive::Base64Binary => Value::Base64Binary(parse_base64_binary(lexical)?),
            temporal => match temporal.temporal_kind() {
                Some(kind) => Value::Temporal(Temporal::parse(kind, lexical)?),
                None => return Err(Error::lexical(self.name(), lexical)),
            },
        })
    }
}

impl fmt::Display for Primitive {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A parsed atomic value
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// String-like value
    String(String),
    /// Boolean value
    Boolean(bool),
    /// Decimal value
    Decimal(Dec),
    /// Integer value
    Integer(Int),
    /// Single-precision float, stored widened
    Float(f64),
    /// Double-precision float
    Double(f64),
    /// Duration value
    Duration(Duration),
    /// Date or time value
    Temporal(Temporal),
    /// anyURI value
    AnyUri(String),
    /// QName value
    QName(QName),
    /// NOTATION value
    Notation(QName),
    /// hexBinary octets
    HexBinary(Vec<u8>),
    /// base64Binary octets
    Base64Binary(Vec<u8>),
}

impl Value {
    /// Canonical lexical form
    pub fn canonical(&self) -> String {
        match self {
            Value::String(s) | Value::AnyUri(s) => s.clone(),
            Value::Boolean(b) => if *b { "true" } else { "false" }.to_string(),
            Value::Decimal(d) => d.to_canonical(),
            Value::Integer(i) => i.to_canonical(),
            Value::Float(f) => canonical_float(*f, Precision::Single),
            Value::Double(f) => canonical_float(*f, Precision::Double),
            Value::Duration(d) => d.to_canonical(),
            Value::Temporal(t) => t.to_canonical(),
            Value::QName(q) | Value::Notation(q) => q.to_string(),
            Value::HexBinary(b) => canonical_hex_binary(b),
            Value::Base64Binary(b) => canonical_base64_binary(b),
        }
    }

    /// Canonical bytes stored for default and fixed values
    ///
    /// QName and NOTATION values store `namespace NUL local`; every other
    /// value stores its canonical lexical form.
    pub fn canonical_bytes(&self) -> Vec<u8> {
        match self {
            Value::QName(q) | Value::Notation(q) => qname_canonical_bytes(q),
            other => other.canonical().into_bytes(),
        }
    }

    /// Value key under the given primitive kind
    pub fn key(&self, primitive: Primitive) -> ValueKey {
        let bytes = match self {
            Value::Decimal(d) => {
                let mut out = Vec::new();
                d.encode_key(&mut out);
                out
            }
            Value::Integer(i) => {
                let mut out = Vec::new();
                i.encode_key(&mut out);
                out
            }
            Value::Float(f) => float_key(*f, Precision::Single),
            Value::Double(f) => float_key(*f, Precision::Double),
            Value::Temporal(t) => t.key_bytes(),
            Value::QName(q) => qname_key(q, false),
            Value::Notation(q) => qname_key(q, true),
            Value::HexBinary(b) | Value::Base64Binary(b) => b.clone(),
            other => other.canonical().into_bytes(),
        };
        ValueKey::new(primitive as u8, bytes)
    }

    /// Order in the value space
    pub fn compare(&self, other: &Value) -> Result<Ordering> {
        match (self, other) {
            (Value::Decimal(a), Value::Decimal(b)) => Ok(a.cmp(b)),
            (Value::Integer(a), Value::Integer(b)) => Ok(a.cmp(b)),
            (Value::Decimal(a), Value::Integer(b)) => Ok(a.cmp(b.as_dec())),
            (Value::Integer(a), Value::Decimal(b)) => Ok(a.as_dec().cmp(b)),
            (Value::Float(a), Value::Float(b)) | (Value::Double(a), Value::Double(b)) => {
                compare_float(*a, *b)
            }
            (Value::Duration(a), Value::Duration(b)) => a.compare(b),
            (Value::Temporal(a), Value::Temporal(b)) => a.compare(b),
            _ => Err(Error::IndeterminateComparison),
        }
    }

    /// Length as measured by the length facets, if they apply
    pub fn length(&self) -> Option<usize> {
        match self {
            Value::String(s) | Value::AnyUri(s) => Some(s.chars().count()),
            Value::HexBinary(b) | Value::Base64Binary(b) => Some(b.len()),
            _ => None,
        }
    }

    /// `(totalDigits, fractionDigits)` for decimal values
    pub fn digits(&self) -> Option<(u32, u32)> {
        match self {
            Value::Decimal(d) => Some((d.total_digits(), d.fraction_digits())),
            Value::Integer(i) => Some((i.as_dec().total_digits(), 0)),
            _ => None,
        }
    }
}
