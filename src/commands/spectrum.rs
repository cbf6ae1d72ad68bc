//! Spectrum plots of a reads table against one or two assemblies.
//!
//! # Pipeline
//!
//! 1. Validate the configuration (no I/O yet)
//! 2. Open every table and check that all share one k
//! 3. Merge the tables into a classified histogram
//! 4. Resolve the axis extents from the aggregate peak
//! 5. Render the plot (and optionally the histogram TSV) atomically
//!
//! When every input is a binary table the merge runs sharded over
//! memory-mapped files. Otherwise each table is read on its own worker
//! thread and merged in one ordered pass.

use crate::config::{OutputFormat, SpectrumConfig};
use crate::error::{Result, SpectrumError};
use crate::histogram::Histogram;
use crate::merge::sharded::merge_sharded;
use crate::merge::{merge_into, workers, Classifier, CnClassifier, KWayMerge, MergeStats, VennClassifier};
use crate::output::{write_histogram, TsvWriter};
use crate::parallel::default_shards;
use crate::render::render_spectrum_to_temp;
use crate::scale::{ScaleResolver, ScaleSpec};
use crate::table::{check_kmer_lengths, detect_format, MappedTable, TableFormat, TableReader};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tempfile::NamedTempFile;
use tracing::{debug, info};

/// How k-mers are categorised.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpectrumMode {
    /// Venn membership against one or two assemblies.
    Venn,
    /// Copy number in a single assembly.
    CopyNumber,
}

impl SpectrumMode {
    fn assembly_range(self) -> (usize, usize) {
        match self {
            SpectrumMode::Venn => (1, 2),
            SpectrumMode::CopyNumber => (1, 1),
        }
    }
}

/// Result of one spectrum run.
#[derive(Debug, Clone)]
pub struct SpectrumStats {
    pub merge: MergeStats,
    pub scale: ScaleSpec,
    pub format: OutputFormat,
    pub sharded: bool,
    /// Assembly k-mers absent from the reads, by partition.
    pub unique: Vec<(String, u64)>,
    pub elapsed_secs: f64,
}

impl std::fmt::Display for SpectrumStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} distinct k-mers ({} in reads), x max {}, y max {} ({:.1}s)",
            self.merge.distinct, self.merge.in_reads, self.scale.x_max, self.scale.y_max, self.elapsed_secs
        )
    }
}

/// Spectrum plot command.
#[derive(Debug, Clone)]
pub struct SpectrumCommand {
    mode: SpectrumMode,
    config: SpectrumConfig,
    /// Also write the merged histogram as TSV.
    dump: Option<PathBuf>,
}

impl SpectrumCommand {
    pub fn new(mode: SpectrumMode, config: SpectrumConfig) -> Self {
        Self {
            mode,
            config,
            dump: None,
        }
    }

    pub fn venn(config: SpectrumConfig) -> Self {
        Self::new(SpectrumMode::Venn, config)
    }

    pub fn copy_number(config: SpectrumConfig) -> Self {
        Self::new(SpectrumMode::CopyNumber, config)
    }

    pub fn with_dump(mut self, path: Option<PathBuf>) -> Self {
        self.dump = path;
        self
    }

    pub fn config(&self) -> &SpectrumConfig {
        &self.config
    }

    fn classifier(&self, assemblies: usize) -> Box<dyn Classifier> {
        match self.mode {
            SpectrumMode::Venn => Box::new(VennClassifier::new(assemblies)),
            SpectrumMode::CopyNumber => Box::new(CnClassifier),
        }
    }

    fn check_inputs(&self, assemblies: &[PathBuf]) -> Result<()> {
        self.config.validate()?;
        let (lo, hi) = self.mode.assembly_range();
        if assemblies.len() < lo || assemblies.len() > hi {
            let expected = if lo == hi {
                format!("exactly {lo}")
            } else {
                format!("{lo} or {hi}")
            };
            return Err(SpectrumError::InvalidInput(format!(
                "expected {} assembly table(s), got {}",
                expected,
                assemblies.len()
            )));
        }
        Ok(())
    }

    /// Merge `reads` with `assemblies` into a histogram.
    ///
    /// Returns the histogram, the merge totals and whether the sharded
    /// path was taken.
    pub fn build_histogram(
        &self,
        reads: &Path,
        assemblies: &[PathBuf],
    ) -> Result<(Histogram, MergeStats, bool)> {
        self.check_inputs(assemblies)?;
        let classifier = self.classifier(assemblies.len());

        let paths: Vec<&Path> = std::iter::once(reads)
            .chain(assemblies.iter().map(PathBuf::as_path))
            .collect();
        let mut all_binary = true;
        for path in &paths {
            if detect_format(path)? != TableFormat::Binary {
                all_binary = false;
            }
        }

        if all_binary {
            let tables = paths
                .iter()
                .map(|p| MappedTable::open(p, p.display().to_string()))
                .collect::<Result<Vec<_>>>()?;
            let k = check_kmer_lengths(tables.iter().map(|t| (t.name(), Some(t.k()))))?;
            let shards = self.config.shards.unwrap_or_else(default_shards);
            debug!(?k, shards, "merging memory-mapped tables");
            let (hist, stats) = merge_sharded(&tables, classifier.as_ref(), self.config.cap, shards)?;
            Ok((hist, stats, true))
        } else {
            let readers = paths
                .iter()
                .map(|p| TableReader::open(p, p.display().to_string()))
                .collect::<Result<Vec<_>>>()?;
            let k = check_kmer_lengths(readers.iter().map(|r| (r.name(), r.k())))?;
            debug!(?k, "merging streamed tables");
            let streams = workers::spawn_readers(readers)?;
            let mut hist = classifier.histogram(self.config.cap);
            let stats = merge_into(KWayMerge::new(streams)?, classifier.as_ref(), &mut hist)?;
            Ok((hist, stats, false))
        }
    }

    /// Run the whole pipeline and write the plot to `output`.
    pub fn run(&self, reads: &Path, assemblies: &[PathBuf], output: &Path) -> Result<SpectrumStats> {
        let start = Instant::now();
        let (hist, merge, sharded) = self.build_histogram(reads, assemblies)?;
        info!(
            distinct = merge.distinct,
            in_reads = merge.in_reads,
            sharded,
            "merged tables"
        );

        let scale = ScaleResolver::new(&self.config.scale).resolve(&hist);
        let classifier = self.classifier(assemblies.len());
        let names: Vec<String> = assemblies.iter().map(|p| display_name(p)).collect();
        let (plot, format) =
            render_spectrum_to_temp(&hist, classifier.as_ref(), &names, &self.config.plot, scale, output)?;
        let dump = match &self.dump {
            Some(path) => Some((dump_to_temp(&hist, path)?, path)),
            None => None,
        };

        // Both artifacts are complete before either is renamed into place.
        plot.persist(output).map_err(|e| SpectrumError::Io(e.error))?;
        info!(output = %output.display(), ?format, "wrote plot");
        if let Some((tmp, path)) = dump {
            tmp.persist(path).map_err(|e| SpectrumError::Io(e.error))?;
            info!(output = %path.display(), "wrote histogram");
        }

        Ok(SpectrumStats {
            merge,
            scale,
            format,
            sharded,
            unique: classifier.unique_report(&hist),
            elapsed_secs: start.elapsed().as_secs_f64(),
        })
    }
}

/// Panel title for an assembly table: its file name without extension.
pub fn display_name(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

fn dump_to_temp(hist: &Histogram, path: &Path) -> Result<NamedTempFile> {
    let dir = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    let mut tmp = tempfile::Builder::new().prefix(".kspec-").tempfile_in(dir)?;
    {
        let mut out = TsvWriter::new(tmp.as_file_mut());
        write_histogram(hist, &mut out)?;
    }
    tmp.as_file_mut().flush()?;
    Ok(tmp)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kmer::{KmerCount, KmerValue};
    use crate::table::TableWriter;
    use tempfile::TempDir;

    fn write_table(dir: &TempDir, name: &str, recs: &[(u128, u32)]) -> PathBuf {
        let path = dir.path().join(name);
        let mut w = TableWriter::create(&path, 21).unwrap();
        for &(k, c) in recs {
            w.push(KmerCount::new(KmerValue(k), c)).unwrap();
        }
        w.finish().unwrap();
        path
    }

    #[test]
    fn test_assembly_count_is_checked() {
        let dir = TempDir::new().unwrap();
        let reads = write_table(&dir, "reads.ktab", &[(1, 3)]);
        let asm = write_table(&dir, "asm.ktab", &[(1, 1)]);
        let cmd = SpectrumCommand::copy_number(SpectrumConfig::default());
        let err = cmd
            .build_histogram(&reads, &[asm.clone(), asm.clone()])
            .unwrap_err();
        assert!(matches!(err, SpectrumError::InvalidInput(_)));

        let cmd = SpectrumCommand::venn(SpectrumConfig::default());
        assert!(cmd.build_histogram(&reads, &[]).is_err());
        assert!(cmd.build_histogram(&reads, &[asm]).is_ok());
    }

    #[test]
    fn test_invalid_scale_fails_before_io() {
        let config = SpectrumConfig::default()
            .with_scale(crate::scale::ScaleConfig::new().with_x_rel(-1.0));
        let cmd = SpectrumCommand::venn(config);
        let missing = PathBuf::from("/nonexistent/asm.ktab");
        let err = cmd
            .build_histogram(Path::new("/nonexistent/reads.ktab"), &[missing])
            .unwrap_err();
        assert!(matches!(err, SpectrumError::InvalidScale(_)));
    }

    #[test]
    fn test_copy_number_histogram() {
        let dir = TempDir::new().unwrap();
        let reads = write_table(&dir, "reads.ktab", &[(1, 10), (2, 20), (3, 30)]);
        let asm = write_table(&dir, "asm.ktab", &[(2, 1), (3, 7), (4, 2)]);
        let cmd = SpectrumCommand::copy_number(SpectrumConfig::default());
        let (hist, stats, sharded) = cmd.build_histogram(&reads, &[asm]).unwrap();

        assert!(sharded);
        assert_eq!(stats.distinct, 4);
        assert_eq!(hist.get(10, 0), 1);
        assert_eq!(hist.get(20, 1), 1);
        assert_eq!(hist.get(30, 5), 1);
        assert_eq!(hist.get(2, CnClassifier::MISSING), 1);
    }

    #[test]
    fn test_failed_dump_leaves_no_plot() {
        let dir = TempDir::new().unwrap();
        let reads = write_table(&dir, "reads.ktab", &[(1, 10), (2, 20)]);
        let asm = write_table(&dir, "asm.ktab", &[(2, 1)]);
        let output = dir.path().join("plot.svg");
        let dump = dir.path().join("missing-dir").join("hist.tsv");

        let cmd = SpectrumCommand::venn(SpectrumConfig::default()).with_dump(Some(dump.clone()));
        assert!(cmd.run(&reads, &[asm], &output).is_err());
        assert!(!output.exists());
        assert!(!dump.exists());
        // Only the two input tables remain.
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 2);
    }

    #[test]
    fn test_display_name() {
        assert_eq!(display_name(Path::new("/data/hap1.ktab")), "hap1");
        assert_eq!(display_name(Path::new("asm")), "asm");
    }
}
