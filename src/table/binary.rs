//! Streaming reader for binary tables.

use super::format::{decode_record, Header, HEADER_SIZE, RECORD_SIZE};
use super::RecordSource;
use crate::error::{Result, SpectrumError};
use crate::kmer::KmerCount;
use std::io::{self, Read};
use std::path::Path;

/// Sequential record decoder over any readable source.
pub struct BinaryRecords<R: Read> {
    reader: R,
    name: String,
    header: Header,
    next_index: u64,
    buf: [u8; RECORD_SIZE],
}

impl<R: Read> BinaryRecords<R> {
    /// Read and check the header, leaving `reader` at the first record.
    pub fn new(mut reader: R, name: impl Into<String>, path: &Path) -> Result<Self> {
        let mut head = [0u8; HEADER_SIZE];
        reader
            .read_exact(&mut head)
            .map_err(|e| SpectrumError::unreadable(path, e))?;
        let header = Header::decode(&head).map_err(|reason| SpectrumError::unreadable(path, reason))?;
        Ok(Self {
            reader,
            name: name.into(),
            header,
            next_index: 0,
            buf: [0u8; RECORD_SIZE],
        })
    }

    pub fn header(&self) -> Header {
        self.header
    }
}

impl<R: Read + Send> RecordSource for BinaryRecords<R> {
    fn next_record(&mut self) -> Result<Option<KmerCount>> {
        if self.next_index >= self.header.entries {
            return Ok(None);
        }
        match self.reader.read_exact(&mut self.buf) {
            Ok(()) => {}
            Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => {
                return Err(SpectrumError::corrupt(
                    &self.name,
                    self.next_index,
                    format!(
                        "table truncated: header declares {} records",
                        self.header.entries
                    ),
                ));
            }
            Err(e) => return Err(SpectrumError::Io(e)),
        }
        self.next_index += 1;
        Ok(Some(decode_record(&self.buf)))
    }
}
