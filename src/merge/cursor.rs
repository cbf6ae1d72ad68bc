//! K-way merge over up to three sorted record streams.
//!
//! Each stream keeps exactly one pending record in a fixed-size head array.
//! A step takes the smallest pending key, collects every stream whose head
//! is bit-identical to it into a membership mask, and advances only those
//! streams.

use super::{Hit, MAX_STREAMS};
use crate::error::{Result, SpectrumError};
use crate::kmer::{KmerCount, KmerValue};

/// Streaming k-way merge. Stream 0 is the reads table.
pub struct KWayMerge<I> {
    streams: Vec<I>,
    heads: [Option<KmerCount>; MAX_STREAMS],
}

impl<I> KWayMerge<I>
where
    I: Iterator<Item = Result<KmerCount>>,
{
    /// Prime one head per stream.
    pub fn new(streams: Vec<I>) -> Result<Self> {
        if streams.is_empty() || streams.len() > MAX_STREAMS {
            return Err(SpectrumError::InvalidInput(format!(
                "merge takes 1 to {} tables, got {}",
                MAX_STREAMS,
                streams.len()
            )));
        }
        let mut merge = Self {
            streams,
            heads: [None; MAX_STREAMS],
        };
        for i in 0..merge.streams.len() {
            merge.heads[i] = merge.streams[i].next().transpose()?;
        }
        Ok(merge)
    }

    pub fn num_streams(&self) -> usize {
        self.streams.len()
    }

    /// Smallest pending key across all open streams.
    #[inline]
    fn min_key(&self) -> Option<KmerValue> {
        self.heads
            .iter()
            .flatten()
            .map(|rec| rec.kmer)
            .min()
    }

    /// Merge the next distinct key.
    pub fn next_hit(&mut self) -> Result<Option<Hit>> {
        let Some(key) = self.min_key() else {
            return Ok(None);
        };

        let mut hit = Hit::new(key);
        for i in 0..self.streams.len() {
            match self.heads[i] {
                Some(rec) if rec.kmer == key => {
                    hit.mask |= 1 << i;
                    hit.counts[i] = rec.count;
                    self.heads[i] = self.streams[i].next().transpose()?;
                }
                _ => {}
            }
        }
        Ok(Some(hit))
    }
}

impl<I> Iterator for KWayMerge<I>
where
    I: Iterator<Item = Result<KmerCount>>,
{
    type Item = Result<Hit>;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_hit().transpose()
    }
}
