//! `xs:float` and `xs:double`

use std::cmp::Ordering;

use once_cell::sync::Lazy;
use regex::Regex;

use crate::error::{Error, Result};

static FLOAT_LEXICAL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[+-]?(\d+(\.\d*)?|\.\d+)([eE][+-]?\d+)?$").unwrap());

/// Floating-point precision
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Precision {
    /// 32-bit `xs:float`
    Single,
    /// 64-bit `xs:double`
    Double,
}

impl Precision {
    fn type_name(self) -> &'static str {
        match self {
            Precision::Single => "float",
            Precision::Double => "double",
        }
    }
}

/// Parse a float or double lexical value
///
/// Accepts `INF`, `-INF` and `NaN` but not `+INF`. Finite literals whose
/// magnitude exceeds the precision fail with an overflow error.
pub fn parse_float(s: &str, precision: Precision) -> Result<f64> {
    match s {
        "INF" => return Ok(f64::INFINITY),
        "-INF" => return Ok(f64::NEG_INFINITY),
        "NaN" => return Ok(f64::NAN),
        _ => {}
    }
    if !FLOAT_LEXICAL.is_match(s) {
        return Err(Error::lexical(precision.type_name(), s));
    }
    let value = match precision {
        Precision::Single => s
            .parse::<f32>()
            .map(|v| v as f64)
            .map_err(|_| Error::lexical("float", s))?,
        Precision::Double => s.parse::<f64>().map_err(|_| Error::lexical("double", s))?,
    };
    if value.is_infinite() {
        return Err(Error::Overflow(format!(
            "'{}' is out of range for {}",
            s,
            precision.type_name()
        )));
    }
    Ok(value)
}

/// Compare two floats in the XSD value space; NaN is incomparable
pub fn compare_float(a: f64, b: f64) -> Result<Ordering> {
    if a.is_nan() || b.is_nan() {
        return Err(Error::IndeterminateComparison);
    }
    if a == b {
        return Ok(Ordering::Equal);
    }
    match (a.is_infinite(), b.is_infinite()) {
        (true, _) if a < 0.0 => Ok(Ordering::Less),
        (true, _) => Ok(Ordering::Greater),
        (_, true) if b < 0.0 => Ok(Ordering::Greater),
        (_, true) => Ok(Ordering::Less),
        _ => a.partial_cmp(&b).ok_or(Error::IndeterminateComparison),
    }
}

/// Canonical lexical form: shortest round-trip mantissa, `E` exponent
///
/// `100` renders as `1.0E2`, zero as `0.0E0`.
pub fn canonical_float(value: f64, precision: Precision) -> String {
    if value.is_nan() {
        return "NaN".to_string();
    }
    if value.is_infinite() {
        return if value > 0.0 { "INF" } else { "-INF" }.to_string();
    }
    let raw = match precision {
        Precision::Single => format!("{:E}", value as f32),
        Precision::Double => format!("{:E}", value),
    };
    match raw.split_once('E') {
        Some((mantissa, exp)) if !mantissa.contains('.') => format!("{}.0E{}", mantissa, exp),
        _ => raw,
    }
}

/// Value key bytes: canonical form of the value with `-0` folded into `0`
pub fn float_key(value: f64, precision: Precision) -> Vec<u8> {
    let value = if value == 0.0 { 0.0 } else { value };
    canonical_float(value, precision).into_bytes()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_specials() {
        assert_eq!(parse_float("INF", Precision::Double).unwrap(), f64::INFINITY);
        assert_eq!(parse_float("-INF", Precision::Single).unwrap(), f64::NEG_INFINITY);
        assert!(parse_float("NaN", Precision::Double).unwrap().is_nan());
        assert!(parse_float("+INF", Precision::Double).is_err());
        assert!(parse_float("inf", Precision::Double).is_err());
        assert!(parse_float("1e", Precision::Double).is_err());
    }

    #[test]
    fn test_parse_finite() {
        assert_eq!(parse_float("1.5E2", Precision::Double).unwrap(), 150.0);
        assert_eq!(parse_float(".5", Precision::Double).unwrap(), 0.5);
        assert!(matches!(
            parse_float("1e39", Precision::Single),
            Err(Error::Overflow(_))
        ));
        assert!(parse_float("1e39", Precision::Double).is_ok());
    }

    #[test]
    fn test_compare() {
        assert_eq!(compare_float(1.0, 2.0).unwrap(), Ordering::Less);
        assert_eq!(compare_float(f64::INFINITY, 1e300).unwrap(), Ordering::Greater);
        assert_eq!(compare_float(-0.0, 0.0).unwrap(), Ordering::Equal);
        assert!(compare_float(f64::NAN, 1.0).is_err());
    }

    #[test]
    fn test_canonical() {
        assert_eq!(canonical_float(100.0, Precision::Double), "1.0E2");
        assert_eq!(canonical_float(0.0, Precision::Double), "0.0E0");
        assert_eq!(canonical_float(1.5, Precision::Double), "1.5E0");
        assert_eq!(canonical_float(0.1, Precision::Single), "1.0E-1");
        assert_eq!(canonical_float(f64::NEG_INFINITY, Precision::Single), "-INF");
        assert_eq!(float_key(-0.0, Precision::Double), float_key(0.0, Precision::Double));
    }
}
