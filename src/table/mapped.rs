//! Memory-mapped binary tables with random access.
//!
//! Fixed-width records make it possible to binary search a key and hand
//! disjoint key ranges of the same table to different worker threads.

use super::format::{decode_record, Header, HEADER_SIZE, RECORD_SIZE};
use crate::error::{Result, SpectrumError};
use crate::kmer::{KmerCount, KmerValue};
use memmap2::Mmap;
use rayon::prelude::*;
use std::fs::File;
use std::ops::Range;
use std::path::{Path, PathBuf};

/// Minimum record count before order validation goes parallel.
const PARALLEL_VALIDATION_THRESHOLD: u64 = 64 * 1024;

/// A binary table mapped into memory.
pub struct MappedTable {
    name: String,
    path: PathBuf,
    header: Header,
    mmap: Mmap,
}

impl MappedTable {
    /// Map the table at `path`; `name` identifies it in errors.
    pub fn open<P: AsRef<Path>>(path: P, name: impl Into<String>) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|e| SpectrumError::unreadable(path, e))?;
        // SAFETY: the map is read-only and tables are not modified while a run is active.
        let mmap = unsafe { Mmap::map(&file) }.map_err(|e| SpectrumError::unreadable(path, e))?;
        let header =
            Header::decode(&mmap).map_err(|reason| SpectrumError::unreadable(path, reason))?;
        let name = name.into();

        let expected = header.file_len().ok_or_else(|| {
            SpectrumError::unreadable(path, format!("header declares {} records", header.entries))
        })?;
        if (mmap.len() as u64) < expected {
            return Err(SpectrumError::corrupt(
                &name,
                ((mmap.len() - HEADER_SIZE) / RECORD_SIZE) as u64,
                format!(
                    "table truncated: header declares {} records",
                    header.entries
                ),
            ));
        }

        Ok(Self {
            name,
            path: path.to_path_buf(),
            header,
            mmap,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn k(&self) -> usize {
        self.header.k
    }

    pub fn len(&self) -> u64 {
        self.header.entries
    }

    pub fn is_empty(&self) -> bool {
        self.header.entries == 0
    }

    /// Record at index `i`. Panics when out of range.
    #[inline]
    pub fn get(&self, i: u64) -> KmerCount {
        let offset = HEADER_SIZE + i as usize * RECORD_SIZE;
        decode_record(&self.mmap[offset..offset + RECORD_SIZE])
    }

    #[inline]
    pub fn key(&self, i: u64) -> KmerValue {
        self.get(i).kmer
    }

    /// Index of the first record whose key is >= `key`.
    pub fn lower_bound(&self, key: KmerValue) -> u64 {
        let (mut lo, mut hi) = (0u64, self.len());
        while lo < hi {
            let mid = lo + (hi - lo) / 2;
            if self.key(mid) < key {
                lo = mid + 1;
            } else {
                hi = mid;
            }
        }
        lo
    }

    /// Iterate the records in `range`.
    pub fn records(&self, range: Range<u64>) -> impl Iterator<Item = KmerCount> + '_ {
        range.map(move |i| self.get(i))
    }

    /// Verify the whole table is strictly increasing.
    ///
    /// Large tables are checked in parallel; the reported record is the first
    /// offending one in table order.
    pub fn validate(&self) -> Result<()> {
        let n = self.len();
        if n < 2 {
            return Ok(());
        }
        let bad = if n >= PARALLEL_VALIDATION_THRESHOLD {
            (1..n)
                .into_par_iter()
                .find_first(|&i| self.key(i - 1) >= self.key(i))
        } else {
            (1..n).find(|&i| self.key(i - 1) >= self.key(i))
        };
        match bad {
            None => Ok(()),
            Some(i) => {
                let (prev, cur) = (self.key(i - 1), self.key(i));
                let message = if prev == cur {
                    format!("duplicate key {}", cur)
                } else {
                    format!("key {} comes after {}", cur, prev)
                };
                Err(SpectrumError::corrupt(&self.name, i, message))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::format::encode_record;
    use crate::table::writer::TableWriter;
    use tempfile::TempDir;

    fn write_table(dir: &TempDir, name: &str, keys: &[u128]) -> PathBuf {
        let path = dir.path().join(name);
        let mut writer = TableWriter::create(&path, 21).unwrap();
        for (i, &key) in keys.iter().enumerate() {
            writer
                .push(KmerCount::new(KmerValue(key), i as u32 + 1))
                .unwrap();
        }
        writer.finish().unwrap();
        path
    }

    #[test]
    fn test_random_access() {
        let dir = TempDir::new().unwrap();
        let path = write_table(&dir, "t.ktab", &[3, 8, 20, 21]);
        let table = MappedTable::open(&path, "t").unwrap();
        assert_eq!(table.k(), 21);
        assert_eq!(table.len(), 4);
        assert_eq!(table.get(2), KmerCount::new(KmerValue(20), 3));
        assert_eq!(table.lower_bound(KmerValue(0)), 0);
        assert_eq!(table.lower_bound(KmerValue(8)), 1);
        assert_eq!(table.lower_bound(KmerValue(9)), 2);
        assert_eq!(table.lower_bound(KmerValue(100)), 4);
        table.validate().unwrap();
    }

    #[test]
    fn test_records_range() {
        let dir = TempDir::new().unwrap();
        let path = write_table(&dir, "t.ktab", &[1, 2, 3, 4, 5]);
        let table = MappedTable::open(&path, "t").unwrap();
        let keys: Vec<u128> = table.records(1..4).map(|r| r.kmer.0).collect();
        assert_eq!(keys, vec![2, 3, 4]);
    }

    #[test]
    fn test_huge_entry_count_is_unreadable() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("huge.ktab");
        let mut bytes = Header { k: 21, entries: 1 << 62 }.encode().to_vec();
        for key in [1u128, 2] {
            bytes.extend_from_slice(&encode_record(&KmerCount::new(KmerValue(key), 1)));
        }
        std::fs::write(&path, bytes).unwrap();

        let result = MappedTable::open(&path, "huge");
        assert!(matches!(result, Err(SpectrumError::TableUnreadable { .. })));
    }

    #[test]
    fn test_short_file_is_corrupt() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("short.ktab");
        let mut bytes = Header { k: 21, entries: 5 }.encode().to_vec();
        bytes.extend_from_slice(&encode_record(&KmerCount::new(KmerValue(1), 1)));
        std::fs::write(&path, bytes).unwrap();

        let result = MappedTable::open(&path, "short");
        assert!(matches!(result, Err(SpectrumError::TableCorrupt { record: 1, .. })));
    }

    #[test]
    fn test_missing_file_is_unreadable() {
        let dir = TempDir::new().unwrap();
        let result = MappedTable::open(dir.path().join("absent.ktab"), "absent");
        assert!(matches!(result, Err(SpectrumError::TableUnreadable { .. })));
    }
}
