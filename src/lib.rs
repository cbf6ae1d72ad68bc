// Clippy allows for the whole crate
#![allow(clippy::too_many_arguments)]
#![allow(clippy::type_complexity)]

//! kspec: k-mer spectrum plots for genome assembly QC
//!
//! Compares the k-mers of one or two assemblies against a k-mer count table
//! built from sequencing reads. Every distinct k-mer is classified by which
//! tables hold it (or by its copy number in the assembly) and binned by its
//! read multiplicity. The resulting histogram is plotted as line, filled and
//! stacked spectra.
//!
//! # Features
//!
//! - **Streaming merge**: tables are merged in one ordered pass, one pending
//!   record per table
//! - **Parallel processing**: binary tables are memory-mapped and merged in
//!   key-range shards on Rayon
//! - **Auto-scaling**: axis extents follow the coverage peak
//!
//! # Example
//!
//! ```rust,no_run
//! use kspec::commands::SpectrumCommand;
//! use kspec::config::SpectrumConfig;
//! use std::path::{Path, PathBuf};
//!
//! let cmd = SpectrumCommand::venn(SpectrumConfig::default());
//! let stats = cmd
//!     .run(Path::new("reads.ktab"), &[PathBuf::from("asm.ktab")], Path::new("asm.spectra.png"))
//!     .unwrap();
//! println!("{}", stats);
//! ```

pub mod buffers;
pub mod commands;
pub mod config;
pub mod error;
pub mod histogram;
pub mod kmer;
pub mod merge;
pub mod output;
pub mod parallel;
pub mod peak;
pub mod render;
pub mod scale;
pub mod table;

// Re-export commonly used types
pub use error::{Result, SpectrumError};
pub use histogram::{CategoryInfo, Histogram};
pub use kmer::{KmerCount, KmerValue};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Prelude module for convenient imports.
pub mod prelude {
    pub use crate::commands::{ConvertCommand, InfoCommand, SimulateCommand, SpectrumCommand};
    pub use crate::config::{OutputFormat, PlotConfig, PlotStyle, SpectrumConfig, StyleSet};
    pub use crate::error::{Result, SpectrumError};
    pub use crate::histogram::Histogram;
    pub use crate::kmer::{KmerCount, KmerValue};
    pub use crate::scale::{ScaleConfig, ScaleSpec};
    pub use crate::table::{MappedTable, TableReader, TableWriter};
}
