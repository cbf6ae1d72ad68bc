//! Command implementations for kspec.

pub mod convert;
pub mod info;
pub mod simulate;
pub mod spectrum;

pub use convert::{write_table, ConvertCommand, ConvertStats};
pub use info::{InfoCommand, TableInfo};
pub use simulate::{SimulateCommand, SimulateConfig, SimulateStats};
pub use spectrum::{display_name, SpectrumCommand, SpectrumMode, SpectrumStats};
