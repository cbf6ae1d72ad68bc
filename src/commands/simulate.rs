//! Synthetic reads and assembly tables for demos and benchmarks.
//!
//! A random "genome" of distinct k-mers is sampled once. The reads table
//! covers it at a normally distributed depth and adds low-count sequencing
//! errors. Each assembly keeps most genome k-mers (a few are dropped, a
//! few duplicated) and adds k-mers of its own that the reads never saw.
//! Output is deterministic for a given seed.

use super::convert::write_table;
use crate::error::{Result, SpectrumError};
use crate::kmer::{KmerCount, KmerValue, MAX_K};
use crate::parallel::sort_and_collapse;
use crate::table::TableFormat;
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::info;

/// Configuration for the simulate command.
#[derive(Debug, Clone, PartialEq)]
pub struct SimulateConfig {
    pub k: usize,
    /// Distinct k-mers of the simulated genome.
    pub genome_kmers: u64,
    /// Mean read depth per genome k-mer.
    pub coverage: f64,
    /// Error k-mers per genome k-mer in the reads.
    pub error_rate: f64,
    /// Fraction of genome k-mers each assembly drops.
    pub missing_rate: f64,
    /// Fraction of genome k-mers each assembly holds twice.
    pub duplicate_rate: f64,
    /// Assembly-only k-mers per genome k-mer.
    pub artifact_rate: f64,
    /// 1 or 2.
    pub assemblies: usize,
    pub seed: u64,
}

impl Default for SimulateConfig {
    fn default() -> Self {
        Self {
            k: 21,
            genome_kmers: 100_000,
            coverage: 30.0,
            error_rate: 0.5,
            missing_rate: 0.02,
            duplicate_rate: 0.03,
            artifact_rate: 0.01,
            assemblies: 1,
            seed: 42,
        }
    }
}

impl SimulateConfig {
    pub fn validate(&self) -> Result<()> {
        if self.k == 0 || self.k > MAX_K {
            return Err(SpectrumError::InvalidInput(format!(
                "k must be between 1 and {MAX_K}, got {}",
                self.k
            )));
        }
        if !(1..=2).contains(&self.assemblies) {
            return Err(SpectrumError::InvalidInput(format!(
                "1 or 2 assemblies can be simulated, got {}",
                self.assemblies
            )));
        }
        if !(self.coverage.is_finite() && self.coverage > 0.0) {
            return Err(SpectrumError::InvalidInput("coverage must be positive".to_string()));
        }
        for (name, v) in [
            ("error rate", self.error_rate),
            ("missing rate", self.missing_rate),
            ("duplicate rate", self.duplicate_rate),
            ("artifact rate", self.artifact_rate),
        ] {
            if !(v.is_finite() && v >= 0.0) {
                return Err(SpectrumError::InvalidInput(format!("{name} must be >= 0, got {v}")));
            }
        }
        // Keep sampling distinct keys cheap: the key space must be far larger.
        let space = KmerValue::max_for(self.k).raw();
        let wanted = (self.genome_kmers as f64 * (2.0 + self.error_rate + self.artifact_rate)) as u128;
        if space / 4 < wanted {
            return Err(SpectrumError::InvalidInput(format!(
                "k={} is too small for {} genome k-mers",
                self.k, self.genome_kmers
            )));
        }
        Ok(())
    }
}

/// Statistics from a simulation.
#[derive(Debug, Default, Clone)]
pub struct SimulateStats {
    pub reads_entries: u64,
    pub assembly_entries: Vec<u64>,
    pub files: Vec<PathBuf>,
    pub elapsed_secs: f64,
}

impl std::fmt::Display for SimulateStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} reads k-mers, assemblies {:?} ({:.1}s)",
            self.reads_entries, self.assembly_entries, self.elapsed_secs
        )
    }
}

/// Simulate command.
pub struct SimulateCommand {
    config: SimulateConfig,
}

impl SimulateCommand {
    pub fn new(config: SimulateConfig) -> Self {
        Self { config }
    }

    /// Write `reads.ktab` and `asm1.ktab` (plus `asm2.ktab`) into `output_dir`.
    pub fn run(&self, output_dir: &Path) -> Result<SimulateStats> {
        let start = Instant::now();
        self.config.validate()?;
        fs::create_dir_all(output_dir)?;

        let mut rng = SmallRng::seed_from_u64(self.config.seed);
        let genome = self.random_keys(&mut rng, self.config.genome_kmers);
        let reads = self.reads_table(&mut rng, &genome);

        let mut stats = SimulateStats::default();
        let reads_path = output_dir.join("reads.ktab");
        stats.reads_entries = write_table(&reads_path, TableFormat::Binary, self.config.k, &reads)?;
        stats.files.push(reads_path);

        for i in 1..=self.config.assemblies {
            let asm = self.assembly_table(&mut rng, &genome);
            let path = output_dir.join(format!("asm{i}.ktab"));
            stats
                .assembly_entries
                .push(write_table(&path, TableFormat::Binary, self.config.k, &asm)?);
            stats.files.push(path);
        }

        stats.elapsed_secs = start.elapsed().as_secs_f64();
        info!(dir = %output_dir.display(), "{}", stats);
        Ok(stats)
    }

    /// `n` distinct sorted keys.
    fn random_keys(&self, rng: &mut SmallRng, n: u64) -> Vec<KmerValue> {
        let max = KmerValue::max_for(self.config.k).raw();
        let mut keys: Vec<KmerValue> = Vec::with_capacity(n as usize);
        while (keys.len() as u64) < n {
            let missing = n - keys.len() as u64;
            keys.extend((0..missing).map(|_| KmerValue(rng.gen_range(0..=max))));
            keys.sort_unstable();
            keys.dedup();
        }
        keys
    }

    /// Normal sample via Box-Muller.
    fn normal(rng: &mut SmallRng, mean: f64, sd: f64) -> f64 {
        let u1: f64 = rng.gen_range(f64::EPSILON..1.0);
        let u2: f64 = rng.gen();
        mean + sd * (-2.0 * u1.ln()).sqrt() * (2.0 * std::f64::consts::PI * u2).cos()
    }

    fn reads_table(&self, rng: &mut SmallRng, genome: &[KmerValue]) -> Vec<KmerCount> {
        let cov = self.config.coverage;
        let mut records: Vec<KmerCount> = genome
            .iter()
            .filter_map(|&kmer| {
                let depth = Self::normal(rng, cov, cov.sqrt()).round();
                (depth >= 1.0).then(|| KmerCount::new(kmer, depth as u32))
            })
            .collect();

        let errors = (genome.len() as f64 * self.config.error_rate) as u64;
        for kmer in self.random_keys(rng, errors) {
            // Mostly singletons with a short geometric tail.
            let mut count = 1u32;
            while count < 8 && rng.gen_bool(0.3) {
                count += 1;
            }
            records.push(KmerCount::new(kmer, count));
        }
        sort_and_collapse(records).0
    }

    fn assembly_table(&self, rng: &mut SmallRng, genome: &[KmerValue]) -> Vec<KmerCount> {
        let c = &self.config;
        let mut records: Vec<KmerCount> = genome
            .iter()
            .filter_map(|&kmer| {
                if rng.gen_bool(c.missing_rate.min(1.0)) {
                    return None;
                }
                let copies = if rng.gen_bool(c.duplicate_rate.min(1.0)) { 2 } else { 1 };
                Some(KmerCount::new(kmer, copies))
            })
            .collect();
        let artifacts = (genome.len() as f64 * c.artifact_rate) as u64;
        records.extend(
            self.random_keys(rng, artifacts)
                .into_iter()
                .map(|kmer| KmerCount::new(kmer, 1)),
        );
        sort_and_collapse(records).0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::MappedTable;
    use tempfile::TempDir;

    fn small() -> SimulateConfig {
        SimulateConfig {
            genome_kmers: 2_000,
            ..SimulateConfig::default()
        }
    }

    #[test]
    fn test_simulate_writes_valid_tables() {
        let dir = TempDir::new().unwrap();
        let config = SimulateConfig {
            assemblies: 2,
            ..small()
        };
        let stats = SimulateCommand::new(config).run(dir.path()).unwrap();
        assert_eq!(stats.files.len(), 3);
        for path in &stats.files {
            let table = MappedTable::open(path, path.display().to_string()).unwrap();
            assert_eq!(table.k(), 21);
            table.validate().unwrap();
        }
        // Genome plus errors, minus the few depth-zero draws.
        assert!(stats.reads_entries > 2_500);
        assert!(stats.assembly_entries.iter().all(|&n| n > 1_900 && n < 2_100));
    }

    #[test]
    fn test_simulate_is_deterministic() {
        let a = TempDir::new().unwrap();
        let b = TempDir::new().unwrap();
        SimulateCommand::new(small()).run(a.path()).unwrap();
        SimulateCommand::new(small()).run(b.path()).unwrap();
        for name in ["reads.ktab", "asm1.ktab"] {
            assert_eq!(
                fs::read(a.path().join(name)).unwrap(),
                fs::read(b.path().join(name)).unwrap()
            );
        }
    }

    #[test]
    fn test_validate() {
        assert!(SimulateConfig::default().validate().is_ok());
        let tiny_k = SimulateConfig { k: 4, ..SimulateConfig::default() };
        assert!(tiny_k.validate().is_err());
        let three = SimulateConfig { assemblies: 3, ..SimulateConfig::default() };
        assert!(three.validate().is_err());
    }
}
