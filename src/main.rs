use std::io::{self, BufWriter, Write};
use std::num::NonZeroUsize;
use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use stationagg::{Config, ReadStrategy, Reduction};

#[derive(Debug, Parser)]
#[command(version, about, long_about = None)]
struct Args {
    /// Measurements file, one `station;value` per line
    path: PathBuf,

    /// Number of worker threads (defaults to available parallelism)
    #[arg(short, long)]
    workers: Option<NonZeroUsize>,

    /// Longest line, in bytes, that may sit on a split point
    #[arg(long, default_value_t = stationagg::split::DEFAULT_WINDOW)]
    window: usize,

    /// Map the file into memory instead of reading it per worker
    #[arg(long)]
    mmap: bool,

    /// Merge worker tables pairwise on the rayon pool
    #[arg(long)]
    tree: bool,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(io::stderr)
        .init();

    let args = Args::parse();

    let mut config = Config::default().with_window(args.window);
    if let Some(workers) = args.workers {
        config = config.with_workers(workers);
    }
    if args.mmap {
        config = config.with_strategy(ReadStrategy::Mapped);
    }
    if args.tree {
        config = config.with_reduction(Reduction::Tree);
    }

    let report = stationagg::run(&args.path, &config)
        .with_context(|| format!("failed to aggregate {}", args.path.display()))?;

    let mut out = BufWriter::new(io::stdout().lock());
    write!(out, "{report}")?;
    out.flush()?;
    Ok(())
}
