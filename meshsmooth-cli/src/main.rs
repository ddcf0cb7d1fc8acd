//! meshsmooth: reduce a mesh's vertices and re-mesh it with Poisson reconstruction.
//!
//! # Logging
//!
//! `RUST_LOG` takes precedence; otherwise `-v` enables per-stage summaries
//! and `-vv` partition progress.
//!
//! ```bash
//! meshsmooth part.stl -o out --depth 8 --iterations 3
//! RUST_LOG=meshsmooth_pipeline=debug meshsmooth part.stl --config smooth.toml
//! ```

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::{Parser, ValueEnum};
use meshsmooth_algorithms::{KeepSet, NormalWeighting};
use meshsmooth_io::{StlEncoding, StlStore};
use meshsmooth_pipeline::{ProgressEvent, RefinementConfig, RefinementDriver, RefinementOutcome};
use meshsmooth_reconstruction::{PoissonReconstructor, StandardCleaner};
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Smooth a triangle mesh by vertex reduction and Poisson re-meshing.
#[derive(Parser, Debug)]
#[command(name = "meshsmooth")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Input STL file
    input: PathBuf,

    /// Output directory
    #[arg(short, long, value_name = "DIR")]
    output_dir: Option<PathBuf>,

    /// File stem of the produced meshes
    #[arg(short, long)]
    name: Option<String>,

    /// TOML settings file; explicit flags override it
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Reconstruction octree depth (2-15)
    #[arg(short, long)]
    depth: Option<u32>,

    /// Partition set to keep: seed (odd) or neighbor (even)
    #[arg(short, long)]
    keep: Option<KeepSet>,

    /// Number of reduce-and-reconstruct passes
    #[arg(short, long)]
    iterations: Option<usize>,

    /// Partition seed for reproducible output
    #[arg(long)]
    seed: Option<u64>,

    /// Vertex normal weighting
    #[arg(long, value_enum)]
    weighting: Option<WeightingArg>,

    /// Reverse normals of inward-wound inputs
    #[arg(long)]
    flip_normals: bool,

    /// Write ASCII instead of binary STL
    #[arg(long)]
    ascii: bool,

    /// Dump the reduced oriented point cloud to this PLY file, numbered per iteration when there are several
    #[arg(long, value_name = "FILE")]
    dump_cloud: Option<PathBuf>,

    /// Suppress progress output
    #[arg(long, short)]
    quiet: bool,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(long, short, action = clap::ArgAction::Count)]
    verbose: u8,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum WeightingArg {
    Area,
    Uniform,
}

impl From<WeightingArg> for NormalWeighting {
    fn from(arg: WeightingArg) -> Self {
        match arg {
            WeightingArg::Area => NormalWeighting::Area,
            WeightingArg::Uniform => NormalWeighting::Uniform,
        }
    }
}

fn init_tracing(verbose: u8, quiet: bool) {
    if quiet && verbose == 0 {
        return;
    }

    let filter = if std::env::var("RUST_LOG").is_ok() {
        EnvFilter::from_default_env()
    } else {
        let level = match verbose {
            0 => "warn",
            1 => "meshsmooth_algorithms=info,meshsmooth_reconstruction=info,meshsmooth_pipeline=info",
            2 => "meshsmooth_algorithms=debug,meshsmooth_reconstruction=debug,meshsmooth_pipeline=debug,meshsmooth_io=debug",
            _ => "trace",
        };
        EnvFilter::try_new(level).unwrap_or_else(|_| EnvFilter::new("warn"))
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr).compact())
        .with(filter)
        .init();
}

fn load_config(path: Option<&Path>) -> Result<RefinementConfig> {
    let Some(path) = path else {
        return Ok(RefinementConfig::default());
    };
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read config {}", path.display()))?;
    toml::from_str(&content).with_context(|| format!("failed to parse config {}", path.display()))
}

/// Layer explicit flags over the file settings
fn apply_overrides(mut config: RefinementConfig, cli: &Cli) -> RefinementConfig {
    config.input = cli.input.clone();
    if let Some(dir) = &cli.output_dir {
        config.output_dir = dir.clone();
    }
    if let Some(name) = &cli.name {
        config.base_name = name.clone();
    }
    if let Some(iterations) = cli.iterations {
        config.iterations = iterations;
    }

    let reduction = &mut config.reduction;
    if let Some(depth) = cli.depth {
        reduction.depth = depth;
    }
    if let Some(keep) = cli.keep {
        reduction.keep = keep;
    }
    if let Some(seed) = cli.seed {
        reduction.seed = Some(seed);
    }
    if let Some(weighting) = cli.weighting {
        reduction.weighting = weighting.into();
    }
    if cli.flip_normals {
        reduction.flip_normals = true;
    }
    if let Some(path) = &cli.dump_cloud {
        reduction.cloud_dump = Some(path.clone());
    }
    config
}

fn run(cli: &Cli) -> Result<PathBuf> {
    let config = apply_overrides(load_config(cli.config.as_deref())?, cli);
    config.validate().context("invalid settings")?;
    info!(
        "Smoothing {} into {} ({} iteration(s), depth {})",
        config.input.display(),
        config.output_dir.display(),
        config.iterations,
        config.reduction.depth
    );

    let encoding = if cli.ascii {
        StlEncoding::Ascii
    } else {
        StlEncoding::Binary
    };
    let cleaner = StandardCleaner::new(config.reduction.cleanup.clone());
    let handle = RefinementDriver::new(
        config,
        StlStore::new(encoding),
        PoissonReconstructor::new(),
        cleaner,
    )
    .spawn();

    for event in handle.events().iter() {
        match &event {
            ProgressEvent::Percent(p) if !cli.quiet => eprintln!("[{:>3}%]", p),
            ProgressEvent::FileProduced(path) if !cli.quiet => eprintln!("wrote {}", path.display()),
            _ => {}
        }
        if event.is_terminal() {
            break;
        }
    }

    match handle.join() {
        RefinementOutcome::Finished { path } => Ok(path),
        RefinementOutcome::Cancelled { completed } => {
            bail!("cancelled after {} iteration(s)", completed)
        }
        RefinementOutcome::Failed { iteration: 0, error } => {
            Err(error).context("refinement could not start")
        }
        RefinementOutcome::Failed { iteration, error } => {
            Err(error).with_context(|| format!("iteration {} failed", iteration))
        }
    }
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose, cli.quiet);

    match run(&cli) {
        Ok(path) => {
            if !cli.quiet {
                println!("{}", path.display());
            }
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            for cause in e.chain().skip(1) {
                eprintln!("  Caused by: {}", cause);
            }
            std::process::exit(1);
        }
    }
}
