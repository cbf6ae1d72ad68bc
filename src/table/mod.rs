//! K-mer count tables.
//!
//! Two on-disk formats are understood, detected from file content:
//! - binary tables (`KTAB` magic, fixed-width records, see [`format`])
//! - text dumps with one `KMER<TAB>COUNT` line per k-mer
//!
//! Every reader yields records in strictly increasing key order and fails
//! with `TableCorrupt` as soon as a table violates that order.

pub mod binary;
pub mod format;
pub mod mapped;
pub mod text;
pub mod validation;
pub mod writer;

pub use binary::BinaryRecords;
pub use mapped::MappedTable;
pub use text::TextRecords;
pub use validation::OrderValidator;
pub use writer::TableWriter;

use crate::buffers::DEFAULT_INPUT_BUFFER;
use crate::error::{Result, SpectrumError};
use crate::kmer::KmerCount;
use std::fs::File;
use std::io::{BufRead, BufReader, Read};
use std::path::Path;

/// A decoder producing records in file order, without order checks.
pub trait RecordSource: Send {
    fn next_record(&mut self) -> Result<Option<KmerCount>>;
}

/// In-memory record source.
pub struct VecSource(std::vec::IntoIter<KmerCount>);

impl RecordSource for VecSource {
    fn next_record(&mut self) -> Result<Option<KmerCount>> {
        Ok(self.0.next())
    }
}

/// On-disk table format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TableFormat {
    Binary,
    Text,
}

/// Sniff the format of the table at `path`.
pub fn detect_format<P: AsRef<Path>>(path: P) -> Result<TableFormat> {
    let path = path.as_ref();
    let file = File::open(path).map_err(|e| SpectrumError::unreadable(path, e))?;
    let mut magic = Vec::with_capacity(4);
    file.take(4)
        .read_to_end(&mut magic)
        .map_err(|e| SpectrumError::unreadable(path, e))?;
    Ok(if magic == format::MAGIC {
        TableFormat::Binary
    } else {
        TableFormat::Text
    })
}

/// Validated, forward-only stream over one table.
pub struct TableReader {
    name: String,
    k: Option<usize>,
    source: Box<dyn RecordSource>,
    validator: OrderValidator,
}

impl TableReader {
    /// Open the table at `path`; `name` identifies it in errors and logs.
    pub fn open<P: AsRef<Path>>(path: P, name: impl Into<String>) -> Result<Self> {
        let path = path.as_ref();
        let name = name.into();
        let format = detect_format(path)?;
        let file = File::open(path).map_err(|e| SpectrumError::unreadable(path, e))?;
        let reader = BufReader::with_capacity(DEFAULT_INPUT_BUFFER, file);

        let (k, source): (Option<usize>, Box<dyn RecordSource>) = match format {
            TableFormat::Binary => {
                let records = BinaryRecords::new(reader, name.clone(), path)?;
                (Some(records.header().k), Box::new(records))
            }
            TableFormat::Text => {
                let records = TextRecords::new(reader, name.clone())?;
                (records.k(), Box::new(records))
            }
        };

        Ok(Self::from_source(name, k, source))
    }

    /// Wrap any record source.
    pub fn from_source(name: impl Into<String>, k: Option<usize>, source: Box<dyn RecordSource>) -> Self {
        let name = name.into();
        Self {
            validator: OrderValidator::new(name.clone()),
            name,
            k,
            source,
        }
    }

    /// Stream over records held in memory.
    pub fn from_records(name: impl Into<String>, k: usize, records: Vec<KmerCount>) -> Self {
        Self::from_source(name, Some(k), Box::new(VecSource(records.into_iter())))
    }

    /// Text dump read from any buffered source.
    pub fn from_text<R: BufRead + Send + 'static>(name: impl Into<String>, reader: R) -> Result<Self> {
        let name = name.into();
        let records = TextRecords::new(reader, name.clone())?;
        let k = records.k();
        Ok(Self::from_source(name, k, Box::new(records)))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Declared k-mer length; None for an empty text dump.
    pub fn k(&self) -> Option<usize> {
        self.k
    }

    /// Next record, checked against the strictly-increasing invariant.
    pub fn next_record(&mut self) -> Result<Option<KmerCount>> {
        match self.source.next_record()? {
            Some(rec) => {
                self.validator.validate(rec.kmer)?;
                Ok(Some(rec))
            }
            None => Ok(None),
        }
    }

    /// Records read so far.
    pub fn records_read(&self) -> u64 {
        self.validator.record_count()
    }
}

impl Iterator for TableReader {
    type Item = Result<KmerCount>;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_record().transpose()
    }
}

/// Check that every declared k agrees; returns the common k.
///
/// Tables without a declared k (empty text dumps) match anything.
pub fn check_kmer_lengths<'a, I>(tables: I) -> Result<Option<usize>>
where
    I: IntoIterator<Item = (&'a str, Option<usize>)>,
{
    let mut expected: Option<usize> = None;
    for (name, k) in tables {
        match (expected, k) {
            (_, None) => {}
            (None, Some(k)) => expected = Some(k),
            (Some(e), Some(k)) if e != k => {
                return Err(SpectrumError::KmerLengthMismatch {
                    table: name.to_string(),
                    expected: e,
                    found: k,
                });
            }
            _ => {}
        }
    }
    Ok(expected)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kmer::KmerValue;
    use std::io::Cursor;

    fn rec(key: u128, count: u32) -> KmerCount {
        KmerCount::new(KmerValue(key), count)
    }

    #[test]
    fn test_reader_validates_order() {
        let mut reader = TableReader::from_records("reads", 21, vec![rec(1, 2), rec(3, 4), rec(2, 1)]);
        assert!(reader.next_record().unwrap().is_some());
        assert!(reader.next_record().unwrap().is_some());
        assert!(matches!(
            reader.next_record(),
            Err(SpectrumError::TableCorrupt { record: 2, .. })
        ));
    }

    #[test]
    fn test_reader_iterator() {
        let reader = TableReader::from_records("reads", 21, vec![rec(1, 2), rec(3, 4)]);
        let all: Result<Vec<KmerCount>> = reader.collect();
        assert_eq!(all.unwrap().len(), 2);
    }

    #[test]
    fn test_from_text() {
        let reader = TableReader::from_text("asm", Cursor::new("AAA\t1\nAAC\t2\n")).unwrap();
        assert_eq!(reader.k(), Some(3));
        assert_eq!(reader.count(), 2);
    }

    #[test]
    fn test_check_kmer_lengths() {
        let ok = check_kmer_lengths([("reads", Some(21)), ("asm", None), ("asm2", Some(21))]);
        assert_eq!(ok.unwrap(), Some(21));

        let err = check_kmer_lengths([("reads", Some(21)), ("asm", Some(31))]).unwrap_err();
        match err {
            SpectrumError::KmerLengthMismatch { table, expected, found } => {
                assert_eq!(table, "asm");
                assert_eq!(expected, 21);
                assert_eq!(found, 31);
            }
            other => panic!("unexpected error: {other}"),
        }

        assert_eq!(check_kmer_lengths([("reads", None)]).unwrap(), None);
    }
}
