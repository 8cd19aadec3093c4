//! `xs:anyURI`

use once_cell::sync::Lazy;
use url::Url;

use crate::error::{Error, Result};

static BASE: Lazy<Url> = Lazy::new(|| Url::parse("http://base.invalid/").unwrap());

/// Check an anyURI lexical value
///
/// Absolute references must parse as URLs; relative references must resolve
/// against a base. Spaces are accepted, as the value space escapes them.
pub fn validate_any_uri(value: &str) -> Result<()> {
    if value.is_empty() {
        return Ok(());
    }
    let escaped = value.replace(' ', "%20");
    if !valid_percent_escapes(&escaped) {
        return Err(Error::lexical("anyURI", value));
    }
    match Url::parse(&escaped) {
        Ok(_) => Ok(()),
        Err(url::ParseError::RelativeUrlWithoutBase) => BASE
            .join(&escaped)
            .map(|_| ())
            .map_err(|_| Error::lexical("anyURI", value)),
        Err(_) => Err(Error::lexical("anyURI", value)),
    }
}

fn valid_percent_escapes(s: &str) -> bool {
    let bytes = s.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' {
            if i + 2 >= bytes.len() {
                return false;
            }
            if !(bytes[i + 1].is_ascii_hexdigit() && bytes[i + 2].is_ascii_hexdigit()) {
                return false;
            }
            i += 3;
        } else {
            i += 1;
        }
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_any_uri() {
        assert!(validate_any_uri("http://example.com/a?b#c").is_ok());
        assert!(validate_any_uri("urn:ex").is_ok());
        assert!(validate_any_uri("relative/path.xsd").is_ok());
        assert!(validate_any_uri("a b").is_ok());
        assert!(validate_any_uri("").is_ok());
        assert!(validate_any_uri("%zz").is_err());
        assert!(validate_any_uri("%4").is_err());
        assert!(validate_any_uri("http://[::1").is_err());
    }
}
