use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Instant;

use anyhow::{Context, Result};
use clap::Parser;
use log::info;

use station_stats::{run_file, PipelineConfig};

/// Computes min/mean/max per station from a `name;value` measurements file.
#[derive(Debug, Parser)]
#[command(version, about)]
struct Args {
    /// Measurements file, one `name;value` record per line.
    path: PathBuf,

    /// Bytes per read.
    #[arg(long)]
    block_size: Option<usize>,

    /// Number of parsing threads.
    #[arg(long)]
    workers: Option<usize>,

    /// Capacity of each pipeline queue.
    #[arg(long)]
    queue_capacity: Option<usize>,

    /// Print pipeline statistics to stderr.
    #[arg(long)]
    stats: bool,
}

impl Args {
    fn config(&self) -> PipelineConfig {
        let mut config = PipelineConfig::default();
        if let Some(block_size) = self.block_size {
            config.block_size = block_size;
        }
        if let Some(workers) = self.workers {
            config.workers = workers;
        }
        if let Some(capacity) = self.queue_capacity {
            config.block_queue_capacity = capacity;
            config.unit_queue_capacity = capacity;
        }
        config
    }
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    match run(Args::parse()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

fn run(args: Args) -> Result<()> {
    let config = args.config();
    let start = Instant::now();
    let summary = run_file(&args.path, &config)
        .with_context(|| format!("failed to aggregate {}", args.path.display()))?;
    let elapsed = start.elapsed();

    let stats = summary.stats;
    info!(
        "{} stations, {} records from {} bytes in {:?}",
        summary.report.len(),
        stats.records,
        stats.bytes,
        elapsed
    );
    if args.stats {
        eprintln!(
            "blocks={} bytes={} units={} records={} stations={} workers={} elapsed={:?}",
            stats.blocks,
            stats.bytes,
            stats.units,
            stats.records,
            summary.report.len(),
            stats.workers,
            elapsed
        );
    }

    println!("{}", summary.report);
    Ok(())
}
