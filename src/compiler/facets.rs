//! Facet programs and enumeration tables

use std::fmt;

use serde::Serialize;

use crate::runtime::hash::{Fnv64, StableHash};
use crate::values::ValueKey;

/// Facet instruction opcode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum FacetOp {
    /// `arg0` is a pattern ID
    Pattern,
    /// `arg0` is an enumeration ID
    Enum,
    /// `arg0` is the exact length
    Length,
    /// `arg0` is the minimum length
    MinLength,
    /// `arg0` is the maximum length
    MaxLength,
    /// `arg0` is the digit limit
    TotalDigits,
    /// `arg0` is the digit limit
    FractionDigits,
    /// `arg0`/`arg1` slice the bound out of the value blob
    MinInclusive,
    /// `arg0`/`arg1` slice the bound out of the value blob
    MaxInclusive,
    /// `arg0`/`arg1` slice the bound out of the value blob
    MinExclusive,
    /// `arg0`/`arg1` slice the bound out of the value blob
    MaxExclusive,
}

impl FacetOp {
    /// Numeric code used in the build hash
    pub fn code(&self) -> u8 {
        match self {
            FacetOp::Pattern => 1,
            FacetOp::Enum => 2,
            FacetOp::Length => 3,
            FacetOp::MinLength => 4,
            FacetOp::MaxLength => 5,
            FacetOp::TotalDigits => 6,
            FacetOp::FractionDigits => 7,
            FacetOp::MinInclusive => 8,
            FacetOp::MaxInclusive => 9,
            FacetOp::MinExclusive => 10,
            FacetOp::MaxExclusive => 11,
        }
    }

    /// Whether the instruction reads a bound from the value blob
    pub fn is_bound(&self) -> bool {
        matches!(
            self,
            FacetOp::MinInclusive | FacetOp::MaxInclusive | FacetOp::MinExclusive | FacetOp::MaxExclusive
        )
    }
}

impl fmt::Display for FacetOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FacetOp::Pattern => "pattern",
            FacetOp::Enum => "enumeration",
            FacetOp::Length => "length",
            FacetOp::MinLength => "minLength",
            FacetOp::MaxLength => "maxLength",
            FacetOp::TotalDigits => "totalDigits",
            FacetOp::FractionDigits => "fractionDigits",
            FacetOp::MinInclusive => "minInclusive",
            FacetOp::MaxInclusive => "maxInclusive",
            FacetOp::MinExclusive => "minExclusive",
            FacetOp::MaxExclusive => "maxExclusive",
        };
        f.write_str(name)
    }
}

/// One facet instruction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct FacetInstr {
    /// Opcode
    pub op: FacetOp,
    /// First argument
    pub arg0: u32,
    /// Second argument
    pub arg1: u32,
}

impl FacetInstr {
    /// Instruction with a single argument
    pub fn new(op: FacetOp, arg0: u32) -> Self {
        Self { op, arg0, arg1: 0 }
    }
}

/// Slice of the facet arena
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize)]
pub struct FacetProgramRef {
    /// First instruction
    pub off: u32,
    /// Number of instructions
    pub len: u32,
}

impl FacetProgramRef {
    /// Instructions of the program
    pub fn of<'a>(&self, arena: &'a [FacetInstr]) -> &'a [FacetInstr] {
        let start = self.off as usize;
        arena.get(start..start + self.len as usize).unwrap_or(&[])
    }
}

/// A compiled pattern set
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize)]
pub struct PatternEntry {
    /// XSD sources of the alternatives
    pub sources: Vec<String>,
    /// Anchored `regex` translation
    pub translated: String,
}

/// Value keys of one enumeration facet
///
/// Keys are sorted; `slots` is an open-addressed index into `keys`, sized to
/// a power of two at least twice the key count. A slot holds `index + 1`, or
/// 0 when empty.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize)]
pub struct EnumTable {
    /// Sorted, deduplicated keys
    pub keys: Vec<ValueKey>,
    /// Hash index
    pub slots: Vec<u32>,
}

impl EnumTable {
    /// Build a table from keys in any order
    pub fn new(mut keys: Vec<ValueKey>) -> Self {
        keys.sort();
        keys.dedup();
        let size = (keys.len() * 2).next_power_of_two().max(2);
        let mask = size - 1;
        let mut slots = vec![0u32; size];
        for (i, key) in keys.iter().enumerate() {
            let mut s = key.hash as usize & mask;
            while slots[s] != 0 {
                s = (s + 1) & mask;
            }
            slots[s] = i as u32 + 1;
        }
        Self { keys, slots }
    }

    /// Whether a value key is enumerated
    pub fn contains(&self, key: &ValueKey) -> bool {
        if self.slots.is_empty() {
            return false;
        }
        let mask = self.slots.len() - 1;
        let mut s = key.hash as usize & mask;
        for _ in 0..self.slots.len() {
            match self.slots[s] {
                0 => return false,
                i => {
                    if self.keys.get(i as usize - 1) == Some(key) {
                        return true;
                    }
                }
            }
            s = (s + 1) & mask;
        }
        false
    }

    /// Number of distinct values
    pub fn len(&self) -> usize {
        self.keys.len()
    }

    /// Whether the table is empty
    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
}

impl StableHash for FacetInstr {
    fn stable_hash(&self, h: &mut Fnv64) {
        h.u8(self.op.code());
        h.u32(self.arg0);
        h.u32(self.arg1);
    }
}

impl StableHash for FacetProgramRef {
    fn stable_hash(&self, h: &mut Fnv64) {
        h.u32(self.off);
        h.u32(self.len);
    }
}

impl StableHash for PatternEntry {
    fn stable_hash(&self, h: &mut Fnv64) {
        self.sources.stable_hash(h);
        h.str(&self.translated);
    }
}

impl StableHash for ValueKey {
    fn stable_hash(&self, h: &mut Fnv64) {
        h.u8(self.kind);
        h.u64(self.hash);
        h.blob(&self.bytes);
    }
}

impl StableHash for EnumTable {
    fn stable_hash(&self, h: &mut Fnv64) {
        self.keys.stable_hash(h);
        self.slots.stable_hash(h);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(s: &str) -> ValueKey {
        ValueKey::new(0, s.as_bytes().to_vec())
    }

    #[test]
    fn test_enum_table_membership() {
        let table = EnumTable::new(vec![key("red"), key("blue"), key("red"), key("green")]);
        assert_eq!(table.len(), 3);
        assert_eq!(table.slots.len(), 8);
        assert!(table.contains(&key("red")));
        assert!(table.contains(&key("green")));
        assert!(!table.contains(&key("yellow")));
        assert!(!table.contains(&ValueKey::new(1, b"red".to_vec())));
        let mut sorted = table.keys.clone();
        sorted.sort();
        assert_eq!(table.keys, sorted);
    }

    #[test]
    fn test_empty_table() {
        let table = EnumTable::default();
        assert!(!table.contains(&key("x")));
        assert!(EnumTable::new(Vec::new()).is_empty());
    }

    #[test]
    fn test_program_slice() {
        let arena = vec![
            FacetInstr::new(FacetOp::Length, 3),
            FacetInstr::new(FacetOp::Pattern, 1),
        ];
        let program = FacetProgramRef { off: 1, len: 1 };
        assert_eq!(program.of(&arena), &arena[1..]);
        assert!(FacetProgramRef { off: 5, len: 1 }.of(&arena).is_empty());
    }
}
