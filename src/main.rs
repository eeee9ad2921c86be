use clap::Parser;
use factory_sim::{run_batch, BatchConfig, ConcurrencyMode, FactoryConfig};
use std::path::PathBuf;

/// Discrete-event simulation of a laptop assembly line
#[derive(Debug, Parser)]
#[command(name = "factory-sim", version, about)]
struct Arguments {
    /// Simulated time to run for
    #[arg(long)]
    horizon: Option<f64>,

    /// Seed of the first run
    #[arg(long)]
    seed: Option<u64>,

    /// Number of independent runs, with consecutive seeds
    #[arg(long, default_value_t = 1)]
    runs: usize,

    /// Execute runs on a rayon thread pool
    #[arg(long)]
    parallel: bool,

    /// Size of the thread pool used with --parallel
    #[arg(long, value_name = "N")]
    threads: Option<usize>,

    /// JSON configuration file; missing fields take their defaults
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Pretty-print the JSON output
    #[arg(long)]
    pretty: bool,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Info)
        .format_timestamp(None)
        .init();

    let args = Arguments::parse();

    let mut config = match &args.config {
        Some(path) => FactoryConfig::from_json(&std::fs::read_to_string(path)?)?,
        None => FactoryConfig::default(),
    };
    if let Some(horizon) = args.horizon {
        config = config.with_horizon(horizon);
    }
    if let Some(seed) = args.seed {
        config = config.with_random_seed(seed);
    }

    let mut batch = BatchConfig::new().with_runs(args.runs);
    if args.parallel {
        batch = batch.with_concurrency(ConcurrencyMode::Rayon);
    }
    if let Some(threads) = args.threads {
        batch = batch.with_thread_pool_size(threads);
    }

    let snapshots = run_batch(&config, &batch)?;
    let output = if args.pretty {
        serde_json::to_string_pretty(&snapshots)?
    } else {
        serde_json::to_string(&snapshots)?
    };
    println!("{}", output);
    Ok(())
}
