//! Tab-separated output.
//!
//! Integers go through itoa and floats through ryu, so writing a large
//! histogram or table dump never allocates per field.

use crate::buffers::DEFAULT_OUTPUT_BUFFER;
use crate::error::Result;
use crate::histogram::Histogram;
use crate::kmer::KmerCount;
use std::io::{BufWriter, Write};

/// Buffered TSV writer.
pub struct TsvWriter<W: Write> {
    writer: BufWriter<W>,
    itoa_buf: itoa::Buffer,
    ryu_buf: ryu::Buffer,
}

impl<W: Write> TsvWriter<W> {
    pub fn new(output: W) -> Self {
        Self::with_capacity(DEFAULT_OUTPUT_BUFFER, output)
    }

    pub fn with_capacity(capacity: usize, output: W) -> Self {
        Self {
            writer: BufWriter::with_capacity(capacity, output),
            itoa_buf: itoa::Buffer::new(),
            ryu_buf: ryu::Buffer::new(),
        }
    }

    #[inline]
    pub fn write_str(&mut self, s: &str) -> Result<()> {
        self.writer.write_all(s.as_bytes())?;
        Ok(())
    }

    #[inline]
    pub fn write_u64(&mut self, n: u64) -> Result<()> {
        self.writer.write_all(self.itoa_buf.format(n).as_bytes())?;
        Ok(())
    }

    #[inline]
    pub fn write_f64(&mut self, f: f64) -> Result<()> {
        self.writer.write_all(self.ryu_buf.format(f).as_bytes())?;
        Ok(())
    }

    #[inline]
    pub fn tab(&mut self) -> Result<()> {
        self.writer.write_all(b"\t")?;
        Ok(())
    }

    #[inline]
    pub fn newline(&mut self) -> Result<()> {
        self.writer.write_all(b"\n")?;
        Ok(())
    }

    /// `KMER<TAB>COUNT` line of a text table.
    #[inline]
    pub fn write_record(&mut self, rec: &KmerCount, k: usize) -> Result<()> {
        self.writer.write_all(&rec.kmer.to_ascii(k))?;
        self.tab()?;
        self.write_u64(rec.count as u64)?;
        self.newline()
    }

    /// `label<TAB>value` line.
    pub fn write_field(&mut self, label: &str, value: u64) -> Result<()> {
        self.write_str(label)?;
        self.tab()?;
        self.write_u64(value)?;
        self.newline()
    }

    /// `label<TAB>value` line with a float value.
    pub fn write_float_field(&mut self, label: &str, value: f64) -> Result<()> {
        self.write_str(label)?;
        self.tab()?;
        self.write_f64(value)?;
        self.newline()
    }

    pub fn flush(&mut self) -> Result<()> {
        self.writer.flush()?;
        Ok(())
    }

    pub fn into_inner(self) -> Result<W> {
        self.writer
            .into_inner()
            .map_err(|e| e.into_error().into())
    }
}

/// Dump the non-zero cells of `hist` as `category  multiplicity  count`.
pub fn write_histogram<W: Write>(hist: &Histogram, out: &mut TsvWriter<W>) -> Result<()> {
    out.write_str("category\tmultiplicity\tcount\n")?;
    let categories = hist.categories();
    for (c, bin, count) in hist.nonzero_cells() {
        out.write_str(&categories[c].label)?;
        out.tab()?;
        out.write_u64(bin as u64)?;
        out.tab()?;
        out.write_u64(count)?;
        out.newline()?;
    }
    out.flush()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::histogram::CategoryInfo;
    use crate::kmer::KmerValue;

    #[test]
    fn test_write_histogram() {
        let mut h = Histogram::new(
            vec![CategoryInfo::new("read-only", true), CategoryInfo::new("asm-only", false)],
            10,
        );
        h.record(5, 0);
        h.record(5, 0);
        h.record(0, 1);
        let mut out = TsvWriter::new(Vec::new());
        write_histogram(&h, &mut out).unwrap();
        let text = String::from_utf8(out.into_inner().unwrap()).unwrap();
        assert_eq!(text, "category\tmultiplicity\tcount\nread-only\t5\t2\nasm-only\t0\t1\n");
    }

    #[test]
    fn test_write_record_and_fields() {
        let mut out = TsvWriter::new(Vec::new());
        let rec = KmerCount::new(KmerValue::from_ascii(b"ACGT").unwrap(), 17);
        out.write_record(&rec, 4).unwrap();
        out.write_field("entries", 3).unwrap();
        out.write_float_field("mean", 2.5).unwrap();
        let text = String::from_utf8(out.into_inner().unwrap()).unwrap();
        assert_eq!(text, "ACGT\t17\nentries\t3\nmean\t2.5\n");
    }
}
