//! `xs:QName` and `xs:NOTATION` values

use crate::error::{Error, Result};
use crate::names::is_valid_ncname;
use crate::namespaces::{NamespaceContext, QName};

/// Key tag for `xs:QName` values
pub const QNAME_TAG: u8 = 0;

/// Key tag for `xs:NOTATION` values
pub const NOTATION_TAG: u8 = 1;

/// Parse a QName-valued lexical form against a namespace context
///
/// An unprefixed name takes the default namespace when one is declared.
pub fn parse_qname_value(lexical: &str, ctx: &NamespaceContext) -> Result<QName> {
    let (prefix, local) = match lexical.split_once(':') {
        Some((p, l)) => (Some(p), l),
        None => (None, lexical),
    };
    if !is_valid_ncname(local) || prefix.map_or(false, |p| !is_valid_ncname(p)) {
        return Err(Error::lexical("QName", lexical));
    }
    match prefix {
        Some(prefix) => match ctx.get_namespace(prefix) {
            Some(ns) => Ok(QName::new(ns, local)),
            None => Err(Error::InvalidLexical {
                kind: "QName".to_string(),
                value: format!("{} (prefix '{}' is not declared)", lexical, prefix),
            }),
        },
        None => Ok(QName::new(
            ctx.get_default_namespace().unwrap_or_default(),
            local,
        )),
    }
}

/// Canonical bytes of a QName value: `namespace NUL local`
pub fn qname_canonical_bytes(name: &QName) -> Vec<u8> {
    let mut out = Vec::with_capacity(name.namespace.len() + name.local_name.len() + 1);
    out.extend_from_slice(name.namespace.as_bytes());
    out.push(0);
    out.extend_from_slice(name.local_name.as_bytes());
    out
}

/// Value key bytes: tag, then the canonical bytes
pub fn qname_key(name: &QName, notation: bool) -> Vec<u8> {
    let mut out = vec![if notation { NOTATION_TAG } else { QNAME_TAG }];
    out.extend_from_slice(&qname_canonical_bytes(name));
    out
}
