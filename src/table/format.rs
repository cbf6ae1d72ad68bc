//! Binary table layout.
//!
//! ```text
//! offset  size  field
//! 0       4     magic  b"KTAB"
//! 4       2     version (little endian, currently 1)
//! 6       2     k
//! 8       8     number of records
//! 16      20*n  records: u128 key, u32 count (little endian)
//! ```

use crate::kmer::{KmerCount, KmerValue, MAX_K};

pub const MAGIC: &[u8; 4] = b"KTAB";
pub const VERSION: u16 = 1;
pub const HEADER_SIZE: usize = 16;
pub const RECORD_SIZE: usize = 20;

/// Decoded binary table header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Header {
    pub k: usize,
    pub entries: u64,
}

impl Header {
    pub fn encode(&self) -> [u8; HEADER_SIZE] {
        let mut buf = [0u8; HEADER_SIZE];
        buf[0..4].copy_from_slice(MAGIC);
        buf[4..6].copy_from_slice(&VERSION.to_le_bytes());
        buf[6..8].copy_from_slice(&(self.k as u16).to_le_bytes());
        buf[8..16].copy_from_slice(&self.entries.to_le_bytes());
        buf
    }

    /// Parse a header, returning a human readable reason on failure.
    pub fn decode(buf: &[u8]) -> Result<Self, String> {
        if buf.len() < HEADER_SIZE {
            return Err(format!("header truncated ({} bytes)", buf.len()));
        }
        if &buf[0..4] != MAGIC {
            return Err("missing KTAB magic".to_string());
        }
        let version = u16::from_le_bytes([buf[4], buf[5]]);
        if version != VERSION {
            return Err(format!("unsupported table version {}", version));
        }
        let k = u16::from_le_bytes([buf[6], buf[7]]) as usize;
        if k == 0 || k > MAX_K {
            return Err(format!("k-mer length {} outside 1..={}", k, MAX_K));
        }
        let mut entries = [0u8; 8];
        entries.copy_from_slice(&buf[8..16]);
        let header = Self {
            k,
            entries: u64::from_le_bytes(entries),
        };
        if header.file_len().is_none() {
            return Err(format!(
                "header declares {} records, more than a table can hold",
                header.entries
            ));
        }
        Ok(header)
    }

    /// Expected file size for this header; None when it overflows.
    pub fn file_len(&self) -> Option<u64> {
        self.entries
            .checked_mul(RECORD_SIZE as u64)?
            .checked_add(HEADER_SIZE as u64)
    }
}

#[inline]
pub fn encode_record(rec: &KmerCount) -> [u8; RECORD_SIZE] {
    let mut buf = [0u8; RECORD_SIZE];
    buf[0..16].copy_from_slice(&rec.kmer.0.to_le_bytes());
    buf[16..20].copy_from_slice(&rec.count.to_le_bytes());
    buf
}

/// Decode one record. `buf` must hold at least [`RECORD_SIZE`] bytes.
#[inline]
pub fn decode_record(buf: &[u8]) -> KmerCount {
    let mut key = [0u8; 16];
    key.copy_from_slice(&buf[0..16]);
    let mut count = [0u8; 4];
    count.copy_from_slice(&buf[16..20]);
    KmerCount::new(
        KmerValue(u128::from_le_bytes(key)),
        u32::from_le_bytes(count),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_header_rejects_bad_magic() {
        let mut buf = Header { k: 21, entries: 3 }.encode();
        buf[0] = b'X';
        assert!(Header::decode(&buf).is_err());
    }

    #[test]
    fn test_header_rejects_k_zero() {
        let buf = Header { k: 0, entries: 0 }.encode();
        assert!(Header::decode(&buf).unwrap_err().contains("k-mer length"));
    }

    #[test]
    fn test_record_layout() {
        let rec = KmerCount::new(KmerValue(0x0102), 7);
        let buf = encode_record(&rec);
        assert_eq!(buf[0], 0x02);
        assert_eq!(buf[1], 0x01);
        assert_eq!(buf[16], 7);
        assert_eq!(decode_record(&buf), rec);
    }

    #[test]
    fn test_file_len() {
        let header = Header { k: 31, entries: 10 };
        assert_eq!(header.file_len(), Some(16 + 200));
    }

    #[test]
    fn test_header_rejects_overflowing_entry_count() {
        let buf = Header { k: 21, entries: 1 << 62 }.encode();
        assert_eq!(Header { k: 21, entries: 1 << 62 }.file_len(), None);
        assert!(Header::decode(&buf).unwrap_err().contains("more than a table can hold"));
    }
}
