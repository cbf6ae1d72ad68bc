//! Buffer size constants for table I/O.
//!
//! These constants control memory usage vs I/O throughput tradeoffs.

/// Default output buffer size (2 MB).
pub const DEFAULT_OUTPUT_BUFFER: usize = 2 * 1024 * 1024;

/// Default input buffer size (256 KB).
/// Good balance for streaming sorted tables.
pub const DEFAULT_INPUT_BUFFER: usize = 256 * 1024;

/// Records per batch handed from a reader worker to the merge.
pub const RECORD_BATCH: usize = 8 * 1024;

/// Batches that may queue up per reader before the worker blocks.
pub const CHANNEL_DEPTH: usize = 4;
