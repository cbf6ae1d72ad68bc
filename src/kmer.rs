//! Packed k-mer keys.
//!
//! A k-mer is stored as 2 bits per base (A=0, C=1, G=2, T=3) in a `u128`,
//! most significant base first. With this packing numeric order equals the
//! lexicographic order of the k-mer string, so tables sorted by either agree.

use std::fmt;

/// Largest k that fits the packed representation.
pub const MAX_K: usize = 64;

/// Opaque, totally ordered k-mer key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct KmerValue(pub u128);

impl KmerValue {
    /// Pack an ASCII k-mer (case-insensitive). Returns None on a non-ACGT
    /// byte, an empty slice, or a length above [`MAX_K`].
    pub fn from_ascii(seq: &[u8]) -> Option<Self> {
        if seq.is_empty() || seq.len() > MAX_K {
            return None;
        }
        let mut packed: u128 = 0;
        for &b in seq {
            let code = match b {
                b'A' | b'a' => 0u128,
                b'C' | b'c' => 1,
                b'G' | b'g' => 2,
                b'T' | b't' => 3,
                _ => return None,
            };
            packed = (packed << 2) | code;
        }
        Some(Self(packed))
    }

    /// Unpack into an ASCII k-mer of length `k`.
    pub fn to_ascii(self, k: usize) -> Vec<u8> {
        const BASES: [u8; 4] = [b'A', b'C', b'G', b'T'];
        (0..k)
            .rev()
            .map(|i| BASES[((self.0 >> (2 * i)) & 3) as usize])
            .collect()
    }

    /// Largest key representable for length `k`.
    pub fn max_for(k: usize) -> Self {
        if k >= MAX_K {
            Self(u128::MAX)
        } else {
            Self((1u128 << (2 * k)) - 1)
        }
    }

    #[inline]
    pub fn raw(self) -> u128 {
        self.0
    }
}

impl fmt::Display for KmerValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#x}", self.0)
    }
}

/// A single table record: a k-mer and its multiplicity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KmerCount {
    pub kmer: KmerValue,
    pub count: u32,
}

impl KmerCount {
    #[inline]
    pub fn new(kmer: KmerValue, count: u32) -> Self {
        Self { kmer, count }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pack_roundtrip() {
        let kmer = KmerValue::from_ascii(b"ACGTTGCA").unwrap();
        assert_eq!(kmer.to_ascii(8), b"ACGTTGCA".to_vec());
        assert_eq!(KmerValue::from_ascii(b"acgt"), KmerValue::from_ascii(b"ACGT"));
    }

    #[test]
    fn test_numeric_order_is_lexicographic() {
        let words: [&[u8]; 4] = [b"AAAT", b"ACAA", b"GAAA", b"TTTT"];
        let packed: Vec<KmerValue> = words
            .iter()
            .map(|w| KmerValue::from_ascii(w).unwrap())
            .collect();
        assert!(packed.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn test_rejects_invalid() {
        assert!(KmerValue::from_ascii(b"ACNT").is_none());
        assert!(KmerValue::from_ascii(b"").is_none());
        assert!(KmerValue::from_ascii(&[b'A'; 65]).is_none());
        assert!(KmerValue::from_ascii(&[b'T'; 64]).is_some());
    }

    #[test]
    fn test_max_for() {
        assert_eq!(KmerValue::max_for(2), KmerValue(15));
        assert_eq!(KmerValue::max_for(64), KmerValue(u128::MAX));
        assert_eq!(
            KmerValue::max_for(21),
            KmerValue::from_ascii(&[b'T'; 21]).unwrap()
        );
    }
}
