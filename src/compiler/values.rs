//! Interned default, fixed and bound values

use std::collections::HashMap;

use serde::Serialize;

use crate::error::Result;
use crate::namespaces::NamespaceContext;
use crate::runtime::hash::{fnv1a64, Fnv64, StableHash};

use super::simple::SimpleDescription;

/// Reference to canonical bytes in the value blob
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize)]
pub struct ValueRef {
    /// Offset into the blob
    pub off: u32,
    /// Length in bytes; an empty string has length 0 and is still present
    pub len: u32,
    /// FNV-1a hash of the bytes
    pub hash: u64,
    /// Whether a value is set
    pub present: bool,
    /// Validator of the matching union member, 0 if not a union
    pub member: u32,
}

impl ValueRef {
    /// Bytes of the value
    pub fn bytes<'a>(&self, blob: &'a [u8]) -> &'a [u8] {
        let start = self.off as usize;
        blob.get(start..start + self.len as usize).unwrap_or(&[])
    }
}

impl StableHash for ValueRef {
    fn stable_hash(&self, h: &mut Fnv64) {
        h.u32(self.off);
        h.u32(self.len);
        h.u64(self.hash);
        h.bool(self.present);
        h.u32(self.member);
    }
}

/// Default and fixed value of a declaration
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize)]
pub struct DeclValues {
    /// `default`
    pub default: ValueRef,
    /// `fixed`
    pub fixed: ValueRef,
}

impl StableHash for DeclValues {
    fn stable_hash(&self, h: &mut Fnv64) {
        self.default.stable_hash(h);
        self.fixed.stable_hash(h);
    }
}

/// Append-only store of canonical value bytes
///
/// Equal byte strings are stored once.
#[derive(Debug, Clone, Default)]
pub struct ValueBlob {
    bytes: Vec<u8>,
    offsets: HashMap<Vec<u8>, u32>,
}

impl ValueBlob {
    /// Empty blob
    pub fn new() -> Self {
        Self::default()
    }

    /// Intern bytes, returning a present reference
    pub fn intern(&mut self, bytes: &[u8]) -> ValueRef {
        let off = match self.offsets.get(bytes) {
            Some(off) => *off,
            None => {
                let off = self.bytes.len() as u32;
                self.bytes.extend_from_slice(bytes);
                self.offsets.insert(bytes.to_vec(), off);
                off
            }
        };
        ValueRef {
            off,
            len: bytes.len() as u32,
            hash: fnv1a64(bytes),
            present: true,
            member: 0,
        }
    }

    /// Stored bytes
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Consume the blob
    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }
}

/// Check a default or fixed value against its type and intern its canonical
/// form
///
/// `member_validator` maps the index of a matching union member to its
/// validator ID.
pub fn bind_value(
    desc: &SimpleDescription,
    lexical: &str,
    ctx: &NamespaceContext,
    blob: &mut ValueBlob,
    member_validator: &dyn Fn(usize) -> u32,
) -> Result<ValueRef> {
    let checked = desc.check(lexical, ctx)?;
    let mut value = blob.intern(&checked.canonical);
    if let Some(i) = checked.member {
        value.member = member_validator(i);
    }
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_interning_shares_bytes() {
        let mut blob = ValueBlob::new();
        let a = blob.intern(b"abc");
        let b = blob.intern(b"xyz");
        let c = blob.intern(b"abc");
        assert_eq!(a, c);
        assert_eq!(b.off, 3);
        assert_eq!(blob.as_bytes(), b"abcxyz");
        assert_eq!(b.bytes(blob.as_bytes()), b"xyz");
    }

    #[test]
    fn test_empty_value_is_present() {
        let mut blob = ValueBlob::new();
        let empty = blob.intern(b"");
        assert!(empty.present);
        assert_eq!(empty.len, 0);
        assert!(!ValueRef::default().present);
    }
}
