//! Conversion between text dumps and binary tables.
//!
//! Text dumps from external counters are rarely in key order, so text input
//! is loaded, sorted in parallel and collapsed (counts of repeated k-mers are
//! summed) before it is written. Binary input is already validated and is
//! streamed straight through.

use crate::buffers::{DEFAULT_INPUT_BUFFER, DEFAULT_OUTPUT_BUFFER};
use crate::error::{Result, SpectrumError};
use crate::kmer::{KmerCount, MAX_K};
use crate::output::TsvWriter;
use crate::parallel::sort_and_collapse;
use crate::table::{detect_format, RecordSource, TableFormat, TableReader, TableWriter, TextRecords};
use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;
use std::time::Instant;
use tracing::{debug, info};

/// Statistics from a conversion.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct ConvertStats {
    pub k: usize,
    pub records_in: u64,
    pub records_out: u64,
    /// Repeated keys whose counts were summed into one record.
    pub duplicates_merged: u64,
    pub elapsed_secs: f64,
}

impl std::fmt::Display for ConvertStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "k={}: {} records in, {} out, {} duplicates merged ({:.1}s)",
            self.k, self.records_in, self.records_out, self.duplicates_merged, self.elapsed_secs
        )
    }
}

/// Table conversion command.
#[derive(Debug, Clone)]
pub struct ConvertCommand {
    /// Output format.
    pub target: TableFormat,
    /// Required k; also the k of an output built from an empty dump.
    pub k: Option<usize>,
}

impl Default for ConvertCommand {
    fn default() -> Self {
        Self::new()
    }
}

impl ConvertCommand {
    pub fn new() -> Self {
        Self {
            target: TableFormat::Binary,
            k: None,
        }
    }

    pub fn with_target(mut self, target: TableFormat) -> Self {
        self.target = target;
        self
    }

    pub fn with_k(mut self, k: Option<usize>) -> Self {
        self.k = k;
        self
    }

    /// Convert `input` into `output`.
    pub fn run(&self, input: &Path, output: &Path) -> Result<ConvertStats> {
        let start = Instant::now();
        if let Some(k) = self.k {
            if k == 0 || k > MAX_K {
                return Err(SpectrumError::InvalidInput(format!(
                    "k must be between 1 and {MAX_K}, got {k}"
                )));
            }
        }

        let name = input.display().to_string();
        let (k, records, records_in, duplicates_merged) = match detect_format(input)? {
            TableFormat::Binary => {
                let reader = TableReader::open(input, name)?;
                let k = self.resolve_k(reader.name(), reader.k())?;
                let records = reader.collect::<Result<Vec<KmerCount>>>()?;
                let n = records.len() as u64;
                (k, records, n, 0)
            }
            TableFormat::Text => {
                let file = File::open(input).map_err(|e| SpectrumError::unreadable(input, e))?;
                let mut source = TextRecords::new(BufReader::with_capacity(DEFAULT_INPUT_BUFFER, file), name.clone())?;
                let k = self.resolve_k(&name, source.k())?;
                let mut records = Vec::new();
                while let Some(rec) = source.next_record()? {
                    records.push(rec);
                }
                let n = records.len() as u64;
                let (records, folded) = sort_and_collapse(records);
                debug!(records = n, duplicates = folded, "sorted text dump");
                (k, records, n, folded)
            }
        };

        let records_out = write_table(output, self.target, k, &records)?;
        let stats = ConvertStats {
            k,
            records_in,
            records_out,
            duplicates_merged,
            elapsed_secs: start.elapsed().as_secs_f64(),
        };
        info!(output = %output.display(), "{}", stats);
        Ok(stats)
    }

    fn resolve_k(&self, table: &str, found: Option<usize>) -> Result<usize> {
        match (self.k, found) {
            (Some(expected), Some(found)) if expected != found => Err(SpectrumError::KmerLengthMismatch {
                table: table.to_string(),
                expected,
                found,
            }),
            (_, Some(k)) | (Some(k), None) => Ok(k),
            (None, None) => Err(SpectrumError::InvalidInput(format!(
                "table {table} is empty; pass --k to set its k-mer length"
            ))),
        }
    }
}

/// Write sorted records to `path` atomically in the given format.
pub fn write_table(path: &Path, format: TableFormat, k: usize, records: &[KmerCount]) -> Result<u64> {
    let dir = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    let mut tmp = tempfile::Builder::new().prefix(".kspec-").tempfile_in(dir)?;
    let written = match format {
        TableFormat::Binary => {
            let buf = BufWriter::with_capacity(DEFAULT_OUTPUT_BUFFER, tmp.as_file_mut());
            let mut writer = TableWriter::new(buf, k, path.display().to_string())?;
            for rec in records {
                writer.push(*rec)?;
            }
            writer.finish()?
        }
        TableFormat::Text => {
            let mut out = TsvWriter::new(tmp.as_file_mut());
            for rec in records {
                out.write_record(rec, k)?;
            }
            out.flush()?;
            records.len() as u64
        }
    };
    tmp.as_file_mut().flush()?;
    tmp.persist(path).map_err(|e| SpectrumError::Io(e.error))?;
    Ok(written)
}
