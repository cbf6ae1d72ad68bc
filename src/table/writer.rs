//! Binary table writer.

use super::format::{encode_record, Header};
use super::validation::OrderValidator;
use crate::error::{Result, SpectrumError};
use crate::kmer::{KmerCount, MAX_K};
use crate::buffers::DEFAULT_OUTPUT_BUFFER;
use std::fs::File;
use std::io::{BufWriter, Seek, SeekFrom, Write};
use std::path::Path;

/// Writes records in strictly increasing key order.
///
/// The record count is only known at the end, so the header is written as a
/// placeholder first and patched by [`TableWriter::finish`].
pub struct TableWriter<W: Write + Seek> {
    writer: W,
    k: usize,
    validator: OrderValidator,
    entries: u64,
}

impl TableWriter<BufWriter<File>> {
    /// Create (or truncate) a table file at `path`.
    pub fn create<P: AsRef<Path>>(path: P, k: usize) -> Result<Self> {
        let path = path.as_ref();
        let file = File::create(path)?;
        Self::new(
            BufWriter::with_capacity(DEFAULT_OUTPUT_BUFFER, file),
            k,
            path.display().to_string(),
        )
    }
}

impl<W: Write + Seek> TableWriter<W> {
    pub fn new(mut writer: W, k: usize, name: impl Into<String>) -> Result<Self> {
        if k == 0 || k > MAX_K {
            return Err(SpectrumError::InvalidInput(format!(
                "k-mer length {} outside 1..={}",
                k, MAX_K
            )));
        }
        writer.write_all(&Header { k, entries: 0 }.encode())?;
        Ok(Self {
            writer,
            k,
            validator: OrderValidator::new(name),
            entries: 0,
        })
    }

    pub fn k(&self) -> usize {
        self.k
    }

    /// Append one record; keys must be strictly increasing.
    pub fn push(&mut self, rec: KmerCount) -> Result<()> {
        self.validator.validate(rec.kmer)?;
        self.writer.write_all(&encode_record(&rec))?;
        self.entries += 1;
        Ok(())
    }

    /// Patch the header and flush. Returns the number of records written.
    pub fn finish(self) -> Result<u64> {
        let (_, entries) = self.finalize()?;
        Ok(entries)
    }

    /// Like [`TableWriter::finish`] but hands back the underlying writer.
    pub fn into_inner(self) -> Result<W> {
        let (writer, _) = self.finalize()?;
        Ok(writer)
    }

    fn finalize(mut self) -> Result<(W, u64)> {
        let header = Header {
            k: self.k,
            entries: self.entries,
        };
        self.writer.seek(SeekFrom::Start(0))?;
        self.writer.write_all(&header.encode())?;
        self.writer.seek(SeekFrom::End(0))?;
        self.writer.flush()?;
        Ok((self.writer, self.entries))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kmer::KmerValue;
    use crate::table::format::{Header, HEADER_SIZE, RECORD_SIZE};
    use std::io::Cursor;

    #[test]
    fn test_header_patched_on_finish() {
        let mut writer = TableWriter::new(Cursor::new(Vec::new()), 17, "mem").unwrap();
        writer.push(KmerCount::new(KmerValue(1), 2)).unwrap();
        writer.push(KmerCount::new(KmerValue(4), 3)).unwrap();
        let inner = writer.into_inner().unwrap().into_inner();
        assert_eq!(inner.len(), HEADER_SIZE + 2 * RECORD_SIZE);
        let header = Header::decode(&inner).unwrap();
        assert_eq!(header, Header { k: 17, entries: 2 });
    }

    #[test]
    fn test_rejects_unsorted_push() {
        let mut writer = TableWriter::new(Cursor::new(Vec::new()), 5, "mem").unwrap();
        writer.push(KmerCount::new(KmerValue(9), 1)).unwrap();
        assert!(writer.push(KmerCount::new(KmerValue(2), 1)).is_err());
    }

    #[test]
    fn test_rejects_bad_k() {
        assert!(TableWriter::new(Cursor::new(Vec::new()), 0, "mem").is_err());
        assert!(TableWriter::new(Cursor::new(Vec::new()), 65, "mem").is_err());
    }
}
