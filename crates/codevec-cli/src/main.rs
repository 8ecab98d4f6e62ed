//! Codevec command-line codec
//!
//! ## Usage
//!
//! ```bash
//! # Compress with the defaults (32 codewords, 2x2 block means)
//! codevec compress image.pgm image.vqc
//!
//! # Reproducible run with k-means++ seeding and a decoded preview
//! codevec compress image.ppm image.vqc -k 16 --seed 42 --init kmeans++ --preview out.ppm
//!
//! # Settings from a JSON file, flags still win
//! codevec compress image.ppm image.vqc --config session.json -k 64
//!
//! # Decode an artifact / print its contents
//! codevec decompress image.vqc restored.ppm
//! codevec inspect image.vqc
//! ```

use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand, ValueEnum};
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use codevec::{
    pnm, BlockEncoding, BlockShape, CodecSession, EmptyClusterPolicy, InitStrategy, PackedIndices,
    UsageStats, VqcFile,
};
use codevec_cli::SessionOverrides;

#[derive(Parser, Debug)]
#[command(name = "codevec")]
#[command(version)]
#[command(about = "Vector-quantization image codec", long_about = None)]
struct Args {
    /// Log level (trace, debug, info, warn, error)
    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Train a codebook on an image and write a VQC artifact
    Compress(CompressArgs),

    /// Decode a VQC artifact into a Netpbm image
    Decompress {
        /// Input artifact
        input: PathBuf,
        /// Output image (.pgm or .ppm)
        output: PathBuf,
    },

    /// Print header, layout and codebook summary of an artifact
    Inspect {
        /// Input artifact
        input: PathBuf,
    },
}

#[derive(clap::Args, Debug)]
struct CompressArgs {
    /// Input image (binary PGM or PPM)
    input: PathBuf,

    /// Output artifact
    output: PathBuf,

    /// Number of codewords
    #[arg(short = 'k', long = "codebook-size")]
    codebook_size: Option<usize>,

    /// Block shape as HxW (or N for NxN)
    #[arg(long)]
    block: Option<BlockShape>,

    /// Block encoding (mean, samples)
    #[arg(long)]
    encoding: Option<BlockEncoding>,

    /// Random seed for reproducible training
    #[arg(long)]
    seed: Option<u64>,

    /// Maximum training iterations
    #[arg(long)]
    max_iterations: Option<usize>,

    /// Convergence threshold on the codebook shift
    #[arg(long)]
    threshold: Option<f64>,

    /// Initial codebook selection
    #[arg(long, value_enum)]
    init: Option<InitArg>,

    /// Empty cluster handling
    #[arg(long, value_enum)]
    empty_clusters: Option<EmptyClustersArg>,

    /// Also write the decoded image here
    #[arg(long)]
    preview: Option<PathBuf>,

    /// Configuration file path (JSON)
    #[arg(short, long)]
    config: Option<PathBuf>,
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum InitArg {
    Random,
    #[value(name = "kmeans++")]
    KMeansPlusPlus,
}

impl From<InitArg> for InitStrategy {
    fn from(arg: InitArg) -> Self {
        match arg {
            InitArg::Random => InitStrategy::RandomSample,
            InitArg::KMeansPlusPlus => InitStrategy::KMeansPlusPlus,
        }
    }
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum EmptyClustersArg {
    Freeze,
    Reseed,
}

impl From<EmptyClustersArg> for EmptyClusterPolicy {
    fn from(arg: EmptyClustersArg) -> Self {
        match arg {
            EmptyClustersArg::Freeze => EmptyClusterPolicy::Freeze,
            EmptyClustersArg::Reseed => EmptyClusterPolicy::ReseedWorstFit,
        }
    }
}

impl CompressArgs {
    fn overrides(&self) -> SessionOverrides {
        SessionOverrides {
            codebook_size: self.codebook_size,
            block: self.block,
            encoding: self.encoding,
            seed: self.seed,
            max_iterations: self.max_iterations,
            convergence_threshold: self.threshold,
            init: self.init.map(Into::into),
            empty_clusters: self.empty_clusters.map(Into::into),
        }
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    // Initialize logging
    let level = match args.log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(true)
        .with_thread_ids(true)
        .finish();

    tracing::subscriber::set_global_default(subscriber)?;

    match args.command {
        Command::Compress(compress_args) => compress(&compress_args),
        Command::Decompress { input, output } => decompress(&input, &output),
        Command::Inspect { input } => inspect(&input),
    }
}

fn compress(args: &CompressArgs) -> Result<(), Box<dyn std::error::Error>> {
    let config = args.overrides().resolve(args.config.as_deref())?;

    info!("Compressing {}", args.input.display());
    info!("  Codebook size:    {}", config.training.codebook_size);
    info!("  Block:            {}", config.block);
    info!("  Encoding:         {:?}", config.encoding);
    info!("  Init:             {:?}", config.training.init);
    info!(
        "  Seed:             {}",
        config
            .training
            .seed
            .map(|s| s.to_string())
            .unwrap_or_else(|| "entropy".to_string())
    );

    let grid = pnm::load(&args.input)?;
    let session = CodecSession::new(config);
    let compressed = session.compress(&grid)?;

    compressed.artifact.save(&args.output)?;
    let report = &compressed.report;
    info!("Training {}", report.summary());
    info!(
        "  Distortion:       mse {:.4}, psnr {:.2} dB",
        report.distortion.mse,
        report.distortion.psnr(255.0)
    );
    info!(
        "Wrote {} ({} bytes, ratio {:.2}:1)",
        args.output.display(),
        compressed.artifact.encoded_size()?,
        compressed.artifact.compression_ratio()?
    );

    if let Some(ref preview_path) = args.preview {
        pnm::save(preview_path, &compressed.preview()?)?;
        info!("Wrote preview {}", preview_path.display());
    }

    Ok(())
}

fn decompress(input: &Path, output: &Path) -> Result<(), Box<dyn std::error::Error>> {
    let artifact = VqcFile::load(input)?;
    let grid = CodecSession::decompress(&artifact)?;
    pnm::save(output, &grid)?;
    info!(
        "Decoded {} into {} ({}x{}x{})",
        input.display(),
        output.display(),
        grid.height(),
        grid.width(),
        grid.channels()
    );
    Ok(())
}

fn inspect(input: &Path) -> Result<(), Box<dyn std::error::Error>> {
    let artifact = VqcFile::load(input)?;
    let metadata = &artifact.metadata;
    let layout = metadata.layout;
    let codebook = &artifact.codebook;
    let indices = PackedIndices::pack(&artifact.assignment, codebook.len())?;
    let usage = UsageStats::from_assignment(&artifact.assignment, codebook.len());

    println!("{}", input.display());
    println!("  Encoder version:  {}", metadata.encoder_version);
    println!("  Created at:       {}", metadata.created_at);
    println!(
        "  Grid:             {}x{} with {} channel(s)",
        layout.height(),
        layout.width(),
        layout.channels()
    );
    println!("  Block:            {}", metadata.block);
    println!("  Encoding:         {:?}", metadata.encoding);
    println!(
        "  Sample range:     {}..={}",
        metadata.range.min(),
        metadata.range.max()
    );
    println!(
        "  Codebook:         {} codewords of dimension {}",
        codebook.len(),
        codebook.dim()
    );
    println!(
        "  Indices:          {} at {} byte(s) each",
        artifact.assignment.len(),
        indices.index_width()
    );
    println!("  Usage:            {}", usage.summary());
    println!(
        "  Size:             {} bytes (ratio {:.2}:1)",
        artifact.encoded_size()?,
        artifact.compression_ratio()?
    );
    for (key, value) in &metadata.extra {
        println!("  {:<17} {}", format!("{}:", key), value);
    }

    Ok(())
}
