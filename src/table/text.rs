//! Text k-mer dumps: one `KMER<TAB>COUNT` record per line.
//!
//! This is the dump format of the common k-mer counters. A single space is
//! accepted as separator too. Blank lines and `#` comments are skipped.

use super::RecordSource;
use crate::error::{Result, SpectrumError};
use crate::kmer::{KmerCount, KmerValue};
use memchr::memchr2;
use std::io::BufRead;

/// Fast u32 parsing - no allocation, rejects overflow.
#[inline(always)]
pub fn parse_u32_fast(bytes: &[u8]) -> Option<u32> {
    if bytes.is_empty() || bytes.len() > 10 {
        return None;
    }
    let mut n: u64 = 0;
    for &b in bytes {
        let d = b.wrapping_sub(b'0');
        if d > 9 {
            return None;
        }
        n = n * 10 + d as u64;
    }
    u32::try_from(n).ok()
}

/// Parse one dump line into (k-mer bytes, count).
#[inline]
pub fn parse_kmer_line(line: &[u8]) -> Option<(&[u8], u32)> {
    let sep = memchr2(b'\t', b' ', line)?;
    let kmer = &line[..sep];
    let mut rest = &line[sep + 1..];
    while let Some((&first, tail)) = rest.split_first() {
        if first == b' ' || first == b'\t' {
            rest = tail;
        } else {
            break;
        }
    }
    let end = memchr2(b'\t', b' ', rest).unwrap_or(rest.len());
    Some((kmer, parse_u32_fast(&rest[..end])?))
}

/// Skip blank lines and comments.
#[inline]
pub fn should_skip_line(line: &[u8]) -> bool {
    line.is_empty() || line[0] == b'#'
}

/// Record source over a text dump.
///
/// The first record is decoded eagerly so the table's k is known before
/// the merge starts.
pub struct TextRecords<R: BufRead> {
    reader: R,
    name: String,
    line: Vec<u8>,
    line_number: u64,
    record_index: u64,
    k: Option<usize>,
    pending: Option<KmerCount>,
}

impl<R: BufRead> TextRecords<R> {
    pub fn new(reader: R, name: impl Into<String>) -> Result<Self> {
        let mut records = Self {
            reader,
            name: name.into(),
            line: Vec::with_capacity(128),
            line_number: 0,
            record_index: 0,
            k: None,
            pending: None,
        };
        records.pending = records.read_next()?;
        Ok(records)
    }

    /// k of the first record, or None for an empty dump.
    pub fn k(&self) -> Option<usize> {
        self.k
    }

    fn read_next(&mut self) -> Result<Option<KmerCount>> {
        loop {
            self.line.clear();
            if self.reader.read_until(b'\n', &mut self.line)? == 0 {
                return Ok(None);
            }
            self.line_number += 1;

            let mut end = self.line.len();
            while end > 0 && (self.line[end - 1] == b'\n' || self.line[end - 1] == b'\r') {
                end -= 1;
            }
            let line = &self.line[..end];
            if should_skip_line(line) {
                continue;
            }

            let (seq, count) = parse_kmer_line(line).ok_or_else(|| {
                SpectrumError::corrupt(
                    &self.name,
                    self.record_index,
                    format!("malformed line {}", self.line_number),
                )
            })?;
            let kmer = KmerValue::from_ascii(seq).ok_or_else(|| {
                SpectrumError::corrupt(
                    &self.name,
                    self.record_index,
                    format!("invalid k-mer on line {}", self.line_number),
                )
            })?;
            match self.k {
                None => self.k = Some(seq.len()),
                Some(k) if k != seq.len() => {
                    return Err(SpectrumError::corrupt(
                        &self.name,
                        self.record_index,
                        format!(
                            "k-mer of length {} on line {}, table k is {}",
                            seq.len(),
                            self.line_number,
                            k
                        ),
                    ));
                }
                Some(_) => {}
            }

            self.record_index += 1;
            return Ok(Some(KmerCount::new(kmer, count)));
        }
    }
}

impl<R: BufRead + Send> RecordSource for TextRecords<R> {
    fn next_record(&mut self) -> Result<Option<KmerCount>> {
        match self.pending.take() {
            Some(rec) => Ok(Some(rec)),
            None => self.read_next(),
        }
    }
}
