//! `xs:hexBinary` and `xs:base64Binary`

use base64::Engine;

use crate::error::{Error, Result};

const HEX_BINARY_PATTERN: &str = r"^([0-9a-fA-F]{2})*$";

// RFC 4648 alphabet with optional padding and interior spaces
const BASE64_BINARY_PATTERN: &str =
    r"^(([A-Za-z0-9+/] ?){4})*(([A-Za-z0-9+/] ?){3}[A-Za-z0-9+/]|([A-Za-z0-9+/] ?){2}[AEIMQUYcgkosw048] ?=|[A-Za-z0-9+/] ?[AQgw] ?= ?=)?$";

lazy_static::lazy_static! {
    static ref HEX_BINARY_REGEX: regex::Regex = regex::Regex::new(HEX_BINARY_PATTERN).unwrap();
    static ref BASE64_BINARY_REGEX: regex::Regex = regex::Regex::new(BASE64_BINARY_PATTERN).unwrap();
}

/// Decode a hexBinary value
pub fn parse_hex_binary(value: &str) -> Result<Vec<u8>> {
    if !HEX_BINARY_REGEX.is_match(value) {
        return Err(Error::lexical("hexBinary", value));
    }
    (0..value.len())
        .step_by(2)
        .map(|i| u8::from_str_radix(&value[i..i + 2], 16).map_err(|_| Error::lexical("hexBinary", value)))
        .collect()
}

/// Canonical hexBinary: upper-case digits
pub fn canonical_hex_binary(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{:02X}", b)).collect()
}

/// Decode a base64Binary value
pub fn parse_base64_binary(value: &str) -> Result<Vec<u8>> {
    if !BASE64_BINARY_REGEX.is_match(value) {
        return Err(Error::lexical("base64Binary", value));
    }
    let cleaned: String = value.chars().filter(|c| !c.is_ascii_whitespace()).collect();
    if cleaned.is_empty() {
        return Ok(Vec::new());
    }
    base64::engine::general_purpose::STANDARD
        .decode(&cleaned)
        .map_err(|_| Error::lexical("base64Binary", value))
}

/// Canonical base64Binary: padded standard alphabet without whitespace
pub fn canonical_base64_binary(bytes: &[u8]) -> String {
    base64::engine::general_purpose::STANDARD.encode(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hex_binary() {
        assert_eq!(parse_hex_binary("0fA0").unwrap(), vec![0x0f, 0xa0]);
        assert_eq!(canonical_hex_binary(&[0x0f, 0xa0]), "0FA0");
        assert!(parse_hex_binary("").unwrap().is_empty());
        assert!(parse_hex_binary("abc").is_err());
        assert!(parse_hex_binary("zz").is_err());
    }

    #[test]
    fn test_base64_binary() {
        assert_eq!(parse_base64_binary("SGVsbG8=").unwrap(), b"Hello".to_vec());
        assert_eq!(parse_base64_binary("SGVs bG8=").unwrap(), b"Hello".to_vec());
        assert!(parse_base64_binary("").unwrap().is_empty());
        assert!(parse_base64_binary("!!!").is_err());
        assert!(parse_base64_binary("SGVsbG8").is_err());
        assert_eq!(canonical_base64_binary(b"Hello"), "SGVsbG8=");
    }
}
