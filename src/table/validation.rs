//! Order validation for k-mer tables.
//!
//! The merge requires every table to be strictly increasing by key: no
//! duplicates and no step backwards. Validation runs inline while records
//! stream past, so a table is never read twice.

use crate::error::{Result, SpectrumError};
use crate::kmer::KmerValue;

/// Inline order validator for use within streaming loops.
#[derive(Debug)]
pub struct OrderValidator {
    table: String,
    prev: Option<KmerValue>,
    record_count: u64,
}

impl OrderValidator {
    /// Create a validator whose errors name `table`.
    pub fn new(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            prev: None,
            record_count: 0,
        }
    }

    /// Validate that `kmer` is strictly greater than the previous key.
    #[inline]
    pub fn validate(&mut self, kmer: KmerValue) -> Result<()> {
        let record = self.record_count;
        self.record_count += 1;

        if let Some(prev) = self.prev {
            if kmer == prev {
                return Err(SpectrumError::corrupt(
                    &self.table,
                    record,
                    format!("duplicate key {}", kmer),
                ));
            }
            if kmer < prev {
                return Err(SpectrumError::corrupt(
                    &self.table,
                    record,
                    format!("key {} comes after {}", kmer, prev),
                ));
            }
        }

        self.prev = Some(kmer);
        Ok(())
    }

    /// Number of records validated so far.
    pub fn record_count(&self) -> u64 {
        self.record_count
    }

    pub fn table(&self) -> &str {
        &self.table
    }
}
