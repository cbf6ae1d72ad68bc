//! Summary statistics of one k-mer table.

use crate::error::Result;
use crate::histogram::DEFAULT_CAP;
use crate::output::TsvWriter;
use crate::peak::{PeakFinder, ValleyPeakFinder};
use crate::table::{detect_format, TableFormat, TableReader};
use std::io::Write;
use std::path::Path;

/// What `info` reports about a table.
#[derive(Debug, Clone, PartialEq)]
pub struct TableInfo {
    pub format: TableFormat,
    /// None for an empty text dump.
    pub k: Option<usize>,
    pub entries: u64,
    /// Sum of all counts.
    pub total: u64,
    pub min_count: Option<u32>,
    pub max_count: Option<u32>,
    /// k-mers seen exactly once.
    pub singletons: u64,
    /// Dominant multiplicity after the error tail, a coverage estimate.
    pub peak: Option<usize>,
}

impl TableInfo {
    pub fn mean(&self) -> f64 {
        if self.entries == 0 {
            0.0
        } else {
            self.total as f64 / self.entries as f64
        }
    }
}

/// Table summary command.
#[derive(Debug, Clone)]
pub struct InfoCommand {
    /// Multiplicities above this share one bin in the peak search.
    pub cap: u32,
}

impl Default for InfoCommand {
    fn default() -> Self {
        Self::new()
    }
}

impl InfoCommand {
    pub fn new() -> Self {
        Self { cap: DEFAULT_CAP }
    }

    pub fn with_cap(mut self, cap: u32) -> Self {
        self.cap = cap.max(1);
        self
    }

    /// Read the whole table and summarise it.
    pub fn inspect(&self, path: &Path) -> Result<TableInfo> {
        let format = detect_format(path)?;
        let reader = TableReader::open(path, path.display().to_string())?;
        let k = reader.k();
        let mut bins = vec![0u64; self.cap as usize + 1];
        let mut info = TableInfo {
            format,
            k,
            entries: 0,
            total: 0,
            min_count: None,
            max_count: None,
            singletons: 0,
            peak: None,
        };
        for rec in reader {
            let rec = rec?;
            info.entries += 1;
            info.total += rec.count as u64;
            info.min_count = Some(info.min_count.map_or(rec.count, |m| m.min(rec.count)));
            info.max_count = Some(info.max_count.map_or(rec.count, |m| m.max(rec.count)));
            if rec.count == 1 {
                info.singletons += 1;
            }
            bins[rec.count.min(self.cap) as usize] += 1;
        }
        info.peak = ValleyPeakFinder.find_peak(&bins).map(|p| p.bin);
        Ok(info)
    }

    /// Summarise `path` and write the report to `output`.
    pub fn run<W: Write>(&self, path: &Path, output: W) -> Result<TableInfo> {
        let info = self.inspect(path)?;
        let mut out = TsvWriter::new(output);
        out.write_str("format\t")?;
        out.write_str(match info.format {
            TableFormat::Binary => "binary\n",
            TableFormat::Text => "text\n",
        })?;
        out.write_field("k", info.k.unwrap_or(0) as u64)?;
        out.write_field("entries", info.entries)?;
        out.write_field("total_count", info.total)?;
        out.write_field("min_count", info.min_count.unwrap_or(0) as u64)?;
        out.write_field("max_count", info.max_count.unwrap_or(0) as u64)?;
        out.write_float_field("mean_count", info.mean())?;
        out.write_field("singletons", info.singletons)?;
        out.write_field("peak", info.peak.unwrap_or(0) as u64)?;
        out.flush()?;
        Ok(info)
    }
}
