//! Value keys
//!
//! A value key is a deterministic byte encoding of a value-space identity:
//! two lexical forms map to the same key exactly when they denote equal
//! values of the same primitive type.

use serde::Serialize;

use crate::runtime::hash::fnv1a64;

/// Append an unsigned LEB128 varint
pub fn put_uvarint(out: &mut Vec<u8>, mut v: u64) {
    while v >= 0x80 {
        out.push((v as u8) | 0x80);
        v >>= 7;
    }
    out.push(v as u8);
}

/// Read an unsigned LEB128 varint, returning the value and bytes consumed
pub fn read_uvarint(bytes: &[u8]) -> Option<(u64, usize)> {
    let mut v = 0u64;
    for (i, &b) in bytes.iter().enumerate().take(10) {
        v |= ((b & 0x7f) as u64) << (7 * i);
        if b & 0x80 == 0 {
            return Some((v, i + 1));
        }
    }
    None
}

/// Interned value identity
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct ValueKey {
    /// Primitive kind tag
    pub kind: u8,
    /// FNV-1a hash of `bytes`
    pub hash: u64,
    /// Key bytes
    pub bytes: Vec<u8>,
}

impl ValueKey {
    /// Create a key, computing its hash
    pub fn new(kind: u8, bytes: Vec<u8>) -> Self {
        let hash = fnv1a64(&bytes) ^ kind as u64;
        Self { kind, hash, bytes }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_uvarint() {
        let mut out = Vec::new();
        put_uvarint(&mut out, 0);
        put_uvarint(&mut out, 127);
        put_uvarint(&mut out, 300);
        assert_eq!(out, vec![0, 0x7f, 0xac, 0x02]);
        assert_eq!(read_uvarint(&out[2..]), Some((300, 2)));
        assert_eq!(read_uvarint(&[0x80]), None);
    }

    #[test]
    fn test_key_hash_depends_on_kind() {
        let a = ValueKey::new(1, b"x".to_vec());
        let b = ValueKey::new(2, b"x".to_vec());
        assert_ne!(a, b);
        assert_eq!(a, ValueKey::new(1, b"x".to_vec()));
    }
}
