//! kspec: k-mer spectrum plots for assembly QC
//!
//! Usage: kspec <COMMAND> [OPTIONS]

use clap::{Args, Parser, Subcommand, ValueEnum};
use std::io;
use std::path::{Path, PathBuf};
use std::process;
use tracing_subscriber::EnvFilter;

use kspec::commands::{
    ConvertCommand, InfoCommand, SimulateCommand, SimulateConfig, SpectrumCommand, SpectrumStats,
};
use kspec::config::{OutputFormat, PlotConfig, PlotStyle, SpectrumConfig, StyleSet};
use kspec::histogram::DEFAULT_CAP;
use kspec::scale::{ScaleConfig, DEFAULT_SECONDARY_FRACTION, DEFAULT_X_REL, DEFAULT_Y_REL};
use kspec::table::TableFormat;
use kspec::SpectrumError;

#[derive(Parser)]
#[command(name = "kspec")]
#[command(version)]
#[command(about = "kspec: k-mer spectrum plots comparing assemblies against a reads k-mer table", long_about = None)]
struct Cli {
    /// Number of threads to use (default: number of CPUs)
    #[arg(long, short = 't', global = true)]
    threads: Option<usize>,

    /// Log progress and timings to stderr
    #[arg(long, short = 'v', global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Venn spectrum: reads k-mers split by presence in one or two assemblies
    Asm {
        /// Reads k-mer table (binary .ktab or text dump)
        #[arg(short, long)]
        reads: PathBuf,

        /// Assembly k-mer table; give twice to compare two assemblies
        #[arg(short, long = "asm", num_args = 1, required = true)]
        assemblies: Vec<PathBuf>,

        #[command(flatten)]
        plot: PlotArgs,
    },

    /// Copy-number spectrum: reads k-mers split by copies in one assembly
    Cn {
        /// Reads k-mer table (binary .ktab or text dump)
        #[arg(short, long)]
        reads: PathBuf,

        /// Assembly k-mer table
        #[arg(short, long = "asm")]
        assembly: PathBuf,

        #[command(flatten)]
        plot: PlotArgs,
    },

    /// Convert between text dumps and binary tables
    Convert {
        /// Input table
        #[arg(short, long)]
        input: PathBuf,

        /// Output table
        #[arg(short, long)]
        output: PathBuf,

        /// Output format
        #[arg(long = "to", value_enum, default_value = "binary")]
        target: TargetFormat,

        /// Expected k-mer length (required for an empty text dump)
        #[arg(short, long)]
        k: Option<usize>,

        /// Print conversion statistics to stderr
        #[arg(long)]
        stats: bool,
    },

    /// Print summary statistics of a table
    Info {
        /// Table to inspect
        table: PathBuf,

        /// Multiplicity cap for the peak estimate
        #[arg(long, default_value_t = DEFAULT_CAP)]
        cap: u32,
    },

    /// Write synthetic reads and assembly tables
    Simulate {
        /// Output directory
        #[arg(short, long)]
        output: PathBuf,

        /// K-mer length
        #[arg(short, long, default_value = "21")]
        k: usize,

        /// Distinct k-mers in the simulated genome
        #[arg(long, default_value = "100000")]
        genome_kmers: u64,

        /// Mean read depth
        #[arg(long, default_value = "30")]
        coverage: f64,

        /// Error k-mers per genome k-mer
        #[arg(long, default_value = "0.5")]
        error_rate: f64,

        /// Fraction of genome k-mers missing from each assembly
        #[arg(long, default_value = "0.02")]
        missing_rate: f64,

        /// Fraction of genome k-mers duplicated in each assembly
        #[arg(long, default_value = "0.03")]
        duplicate_rate: f64,

        /// Assembly-only k-mers per genome k-mer
        #[arg(long, default_value = "0.01")]
        artifact_rate: f64,

        /// Number of assemblies (1 or 2)
        #[arg(long, default_value = "1")]
        assemblies: usize,

        /// Random seed for reproducibility
        #[arg(long, default_value = "42")]
        seed: u64,

        /// Print simulation statistics to stderr
        #[arg(long)]
        stats: bool,
    },
}

/// Plot and histogram options shared by `asm` and `cn`.
#[derive(Args)]
struct PlotArgs {
    /// Output image (.png or .svg)
    #[arg(short, long)]
    output: PathBuf,

    /// Panel width in inches
    #[arg(short = 'W', long, default_value = "6.0")]
    width: f64,

    /// Panel height in inches
    #[arg(short = 'H', long, default_value = "4.5")]
    height: f64,

    /// Resolution in dots per inch
    #[arg(long, default_value = "100")]
    dpi: u32,

    /// Absolute x-axis maximum (overrides --x-rel)
    #[arg(long)]
    x_max: Option<u64>,

    /// Absolute y-axis maximum (overrides --y-rel)
    #[arg(long)]
    y_max: Option<u64>,

    /// X-axis maximum relative to the peak multiplicity
    #[arg(long, default_value_t = DEFAULT_X_REL)]
    x_rel: f64,

    /// Y-axis maximum relative to the peak count
    #[arg(long, default_value_t = DEFAULT_Y_REL)]
    y_rel: f64,

    /// Plot styles: line, fill, stack (comma-separated; default all)
    #[arg(short, long, value_delimiter = ',')]
    styles: Vec<PlotStyle>,

    /// Output format (default: from the output extension)
    #[arg(long)]
    format: Option<OutputFormat>,

    /// Add a bar panel of assembly k-mers absent from the reads
    #[arg(short = 'z', long)]
    unique: bool,

    /// Multiplicities above this share the last bin
    #[arg(long, default_value_t = DEFAULT_CAP)]
    cap: u32,

    /// Ignore this many low bins when locating the peak
    #[arg(long)]
    noise_bins: Option<usize>,

    /// Minimum height of a secondary peak relative to the main one
    #[arg(long, default_value_t = DEFAULT_SECONDARY_FRACTION)]
    secondary_fraction: f64,

    /// Key-range shards for binary inputs (default: 4 per thread)
    #[arg(long)]
    shards: Option<usize>,

    /// Also write the histogram as TSV
    #[arg(long)]
    dump: Option<PathBuf>,

    /// Print run statistics to stderr
    #[arg(long)]
    stats: bool,
}

impl PlotArgs {
    fn spectrum_config(&self) -> SpectrumConfig {
        let plot = PlotConfig::default()
            .with_size(self.width, self.height)
            .with_dpi(self.dpi)
            .with_styles(StyleSet::new(self.styles.iter().copied()))
            .with_format(self.format)
            .with_unique_report(self.unique);
        let scale = ScaleConfig::new()
            .with_x_max(self.x_max)
            .with_y_max(self.y_max)
            .with_x_rel(self.x_rel)
            .with_y_rel(self.y_rel)
            .with_noise_bins(self.noise_bins)
            .with_secondary_fraction(self.secondary_fraction);
        SpectrumConfig::new()
            .with_plot(plot)
            .with_scale(scale)
            .with_cap(self.cap)
            .with_shards(self.shards)
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum TargetFormat {
    Binary,
    Text,
}

impl From<TargetFormat> for TableFormat {
    fn from(t: TargetFormat) -> Self {
        match t {
            TargetFormat::Binary => TableFormat::Binary,
            TargetFormat::Text => TableFormat::Text,
        }
    }
}

fn init_logging(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("kspec=debug,info")
    } else {
        EnvFilter::new("kspec=warn")
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .without_time()
        .with_writer(io::stderr)
        .init();
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    // Configure thread pool if --threads specified
    if let Some(n) = cli.threads {
        if let Err(e) = rayon::ThreadPoolBuilder::new().num_threads(n).build_global() {
            eprintln!("Error: failed to initialize thread pool: {}", e);
            process::exit(1);
        }
    }

    let result = match cli.command {
        Commands::Asm {
            reads,
            assemblies,
            plot,
        } => run_spectrum(SpectrumCommand::venn(plot.spectrum_config()), &reads, &assemblies, &plot),

        Commands::Cn {
            reads,
            assembly,
            plot,
        } => run_spectrum(
            SpectrumCommand::copy_number(plot.spectrum_config()),
            &reads,
            &[assembly],
            &plot,
        ),

        Commands::Convert {
            input,
            output,
            target,
            k,
            stats,
        } => run_convert(&input, &output, target, k, stats),

        Commands::Info { table, cap } => run_info(&table, cap),

        Commands::Simulate {
            output,
            k,
            genome_kmers,
            coverage,
            error_rate,
            missing_rate,
            duplicate_rate,
            artifact_rate,
            assemblies,
            seed,
            stats,
        } => run_simulate(
            &output,
            SimulateConfig {
                k,
                genome_kmers,
                coverage,
                error_rate,
                missing_rate,
                duplicate_rate,
                artifact_rate,
                assemblies,
                seed,
            },
            stats,
        ),
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}

fn run_spectrum(
    cmd: SpectrumCommand,
    reads: &Path,
    assemblies: &[PathBuf],
    args: &PlotArgs,
) -> Result<(), SpectrumError> {
    let stats = cmd
        .with_dump(args.dump.clone())
        .run(reads, assemblies, &args.output)?;
    if args.unique {
        print_unique(&stats);
    }
    if args.stats {
        eprintln!("Wrote {} ({}): {}", args.output.display(), stats.format, stats);
    }
    Ok(())
}

fn print_unique(stats: &SpectrumStats) {
    for (label, count) in &stats.unique {
        println!("{}\t{}", label, count);
    }
}

fn run_convert(
    input: &Path,
    output: &Path,
    target: TargetFormat,
    k: Option<usize>,
    stats: bool,
) -> Result<(), SpectrumError> {
    let result = ConvertCommand::new()
        .with_target(target.into())
        .with_k(k)
        .run(input, output)?;
    if stats {
        eprintln!("Converted {}: {}", input.display(), result);
    }
    Ok(())
}

fn run_info(table: &Path, cap: u32) -> Result<(), SpectrumError> {
    let stdout = io::stdout();
    InfoCommand::new().with_cap(cap).run(table, stdout.lock())?;
    Ok(())
}

fn run_simulate(output: &Path, config: SimulateConfig, stats: bool) -> Result<(), SpectrumError> {
    let result = SimulateCommand::new(config).run(output)?;
    if stats {
        eprintln!("Complete: {}", result);
    }
    Ok(())
}
