//! FNV-1a 64-bit hashing
//!
//! Used for value keys, enumeration hash indices and the runtime build hash.
//! Every primitive is fed little-endian so digests are stable across hosts.

const OFFSET_BASIS: u64 = 0xcbf2_9ce4_8422_2325;
const PRIME: u64 = 0x0000_0100_0000_01b3;

/// One-shot FNV-1a-64 digest of a byte slice
pub fn fnv1a64(bytes: &[u8]) -> u64 {
    let mut h = Fnv64::new();
    h.bytes(bytes);
    h.value()
}

/// Incremental FNV-1a-64 hasher
#[derive(Debug, Clone, Copy)]
pub struct Fnv64 {
    state: u64,
}

impl Default for Fnv64 {
    fn default() -> Self {
        Self::new()
    }
}

impl Fnv64 {
    /// Start a new digest
    pub fn new() -> Self {
        Self {
            state: OFFSET_BASIS,
        }
    }

    /// Feed raw bytes
    pub fn bytes(&mut self, bytes: &[u8]) {
        for &b in bytes {
            self.state ^= b as u64;
            self.state = self.state.wrapping_mul(PRIME);
        }
    }

    /// Feed a byte
    pub fn u8(&mut self, v: u8) {
        self.bytes(&[v]);
    }

    /// Feed a bool as one byte
    pub fn bool(&mut self, v: bool) {
        self.u8(v as u8);
    }

    /// Feed a u32, little-endian
    pub fn u32(&mut self, v: u32) {
        self.bytes(&v.to_le_bytes());
    }

    /// Feed a u64, little-endian
    pub fn u64(&mut self, v: u64) {
        self.bytes(&v.to_le_bytes());
    }

    /// Feed a length-prefixed byte blob
    pub fn blob(&mut self, bytes: &[u8]) {
        self.u64(bytes.len() as u64);
        self.bytes(bytes);
    }

    /// Feed a length-prefixed string
    pub fn str(&mut self, s: &str) {
        self.blob(s.as_bytes());
    }

    /// Feed an array length
    pub fn len(&mut self, n: usize) {
        self.u64(n as u64);
    }

    /// Current digest
    pub fn value(&self) -> u64 {
        self.state
    }

    /// Final digest; zero is remapped to one
    pub fn finish_nonzero(&self) -> u64 {
        if self.state == 0 {
            1
        } else {
            self.state
        }
    }
}

/// Feeds a value into the build hash in a fixed field order
pub trait StableHash {
    /// Hash every observable field
    fn stable_hash(&self, h: &mut Fnv64);
}

impl StableHash for u8 {
    fn stable_hash(&self, h: &mut Fnv64) {
        h.u8(*self);
    }
}

impl StableHash for u32 {
    fn stable_hash(&self, h: &mut Fnv64) {
        h.u32(*self);
    }
}

impl StableHash for u64 {
    fn stable_hash(&self, h: &mut Fnv64) {
        h.u64(*self);
    }
}

impl StableHash for bool {
    fn stable_hash(&self, h: &mut Fnv64) {
        h.bool(*self);
    }
}

impl StableHash for String {
    fn stable_hash(&self, h: &mut Fnv64) {
        h.str(self);
    }
}

impl<T: StableHash> StableHash for Vec<T> {
    fn stable_hash(&self, h: &mut Fnv64) {
        h.len(self.len());
        for item in self {
            item.stable_hash(h);
        }
    }
}

impl<T: StableHash> StableHash for Option<T> {
    fn stable_hash(&self, h: &mut Fnv64) {
        match self {
            Some(v) => {
                h.u8(1);
                v.stable_hash(h);
            }
            None => h.u8(0),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_vectors_hash_their_length() {
        let mut a = Fnv64::new();
        vec![1u32].stable_hash(&mut a);
        vec![2u32].stable_hash(&mut a);
        let mut b = Fnv64::new();
        vec![1u32, 2].stable_hash(&mut b);
        Vec::<u32>::new().stable_hash(&mut b);
        assert_ne!(a.value(), b.value());
    }

    #[test]
    fn test_known_vectors() {
        assert_eq!(fnv1a64(b""), 0xcbf2_9ce4_8422_2325);
        assert_eq!(fnv1a64(b"a"), 0xaf63_dc4c_8601_ec8c);
        assert_eq!(fnv1a64(b"foobar"), 0x8594_4171_f739_67e8);
    }

    #[test]
    fn test_length_prefix_separates_fields() {
        let mut a = Fnv64::new();
        a.str("ab");
        a.str("c");
        let mut b = Fnv64::new();
        b.str("a");
        b.str("bc");
        assert_ne!(a.value(), b.value());
    }
}
