//! Reader worker threads.
//!
//! Each table gets one thread that decodes and validates records and sends
//! them in batches over a bounded channel. The merge consumes the channels
//! as ordinary record iterators, so decoding of the three tables overlaps
//! while the merge itself stays single-threaded and ordered.

use crate::buffers::{CHANNEL_DEPTH, RECORD_BATCH};
use crate::error::{Result, SpectrumError};
use crate::kmer::KmerCount;
use crate::table::TableReader;
use crossbeam_channel::{bounded, Receiver, Sender};
use std::io;
use std::thread::{self, JoinHandle};
use tracing::debug;

enum Message {
    Batch(Vec<KmerCount>),
    Failed(SpectrumError),
    Done,
}

/// Receiving end of one reader worker.
pub struct ChannelStream {
    name: String,
    rx: Receiver<Message>,
    batch: std::vec::IntoIter<KmerCount>,
    finished: bool,
    handle: Option<JoinHandle<()>>,
}

impl ChannelStream {
    pub fn name(&self) -> &str {
        &self.name
    }

    fn refill(&mut self) -> Result<bool> {
        match self.rx.recv() {
            Ok(Message::Batch(records)) => {
                self.batch = records.into_iter();
                Ok(true)
            }
            Ok(Message::Done) => {
                self.finished = true;
                Ok(false)
            }
            Ok(Message::Failed(e)) => {
                self.finished = true;
                Err(e)
            }
            Err(_) => {
                self.finished = true;
                let panicked = self
                    .handle
                    .take()
                    .map(|h| h.join().is_err())
                    .unwrap_or(false);
                Err(SpectrumError::Io(io::Error::other(format!(
                    "reader for table {} stopped unexpectedly{}",
                    self.name,
                    if panicked { " (worker panicked)" } else { "" }
                ))))
            }
        }
    }
}

impl Iterator for ChannelStream {
    type Item = Result<KmerCount>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(rec) = self.batch.next() {
                return Some(Ok(rec));
            }
            if self.finished {
                return None;
            }
            match self.refill() {
                Ok(true) => continue,
                Ok(false) => return None,
                Err(e) => return Some(Err(e)),
            }
        }
    }
}

impl Drop for ChannelStream {
    fn drop(&mut self) {
        // Unblock a worker still waiting on a full channel before joining it.
        let (_, empty) = bounded(0);
        self.rx = empty;
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

fn pump(mut reader: TableReader, tx: &Sender<Message>) {
    let mut batch = Vec::with_capacity(RECORD_BATCH);
    loop {
        match reader.next_record() {
            Ok(Some(rec)) => {
                batch.push(rec);
                if batch.len() == RECORD_BATCH {
                    let full = std::mem::replace(&mut batch, Vec::with_capacity(RECORD_BATCH));
                    if tx.send(Message::Batch(full)).is_err() {
                        return;
                    }
                }
            }
            Ok(None) => break,
            Err(e) => {
                if !batch.is_empty() && tx.send(Message::Batch(batch)).is_err() {
                    return;
                }
                let _ = tx.send(Message::Failed(e));
                return;
            }
        }
    }
    if !batch.is_empty() && tx.send(Message::Batch(batch)).is_err() {
        return;
    }
    debug!(
        table = reader.name(),
        records = reader.records_read(),
        "reader finished"
    );
    let _ = tx.send(Message::Done);
}

/// Move `reader` onto its own thread and stream its records back.
pub fn spawn_reader(reader: TableReader) -> Result<ChannelStream> {
    let name = reader.name().to_string();
    let (tx, rx) = bounded(CHANNEL_DEPTH);
    let handle = thread::Builder::new()
        .name(format!("read-{name}"))
        .spawn(move || pump(reader, &tx))?;
    Ok(ChannelStream {
        name,
        rx,
        batch: Vec::new().into_iter(),
        finished: false,
        handle: Some(handle),
    })
}

/// One worker per reader, in input order.
pub fn spawn_readers(readers: Vec<TableReader>) -> Result<Vec<ChannelStream>> {
    readers.into_iter().map(spawn_reader).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kmer::KmerValue;

    fn records(n: u128) -> Vec<KmerCount> {
        (0..n).map(|i| KmerCount::new(KmerValue(i * 2), (i % 7) as u32 + 1)).collect()
    }

    #[test]
    fn test_stream_delivers_all_records_in_order() {
        let n = (RECORD_BATCH * 3 + 17) as u128;
        let stream = spawn_reader(TableReader::from_records("reads", 21, records(n))).unwrap();
        let got: Vec<KmerCount> = stream.map(|r| r.unwrap()).collect();
        assert_eq!(got, records(n));
    }

    #[test]
    fn test_stream_forwards_reader_errors() {
        let mut recs = records(10);
        recs.push(KmerCount::new(KmerValue(0), 1));
        let stream = spawn_reader(TableReader::from_records("asm", 21, recs)).unwrap();
        let results: Vec<Result<KmerCount>> = stream.collect();
        assert_eq!(results.len(), 11);
        assert!(matches!(
            results.last(),
            Some(Err(SpectrumError::TableCorrupt { record: 10, .. }))
        ));
    }

    #[test]
    fn test_dropping_stream_early_stops_worker() {
        let n = (RECORD_BATCH * (CHANNEL_DEPTH + 4)) as u128;
        let mut stream = spawn_reader(TableReader::from_records("reads", 21, records(n))).unwrap();
        assert!(stream.next().is_some());
        drop(stream);
    }

    #[test]
    fn test_empty_table() {
        let mut stream = spawn_reader(TableReader::from_records("reads", 21, Vec::new())).unwrap();
        assert!(stream.next().is_none());
        assert!(stream.next().is_none());
    }
}
