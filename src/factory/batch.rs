//! Independent repetitions of a factory run.
//!
//! Runs share nothing, so they can be spread over a rayon thread pool. Each
//! run gets its own seed and the snapshots come back in seed order.

use super::config::FactoryConfig;
use super::metrics::MetricsSnapshot;
use super::run_with_config;
use crate::error::Error;
use log::info;
use rayon::prelude::*;
use rayon::ThreadPoolBuilder;

/// How the runs of a batch are executed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConcurrencyMode {
    /// One run after another on the calling thread
    #[default]
    Sequential,
    /// Runs spread over a rayon thread pool
    Rayon,
}

/// Configuration for a batch of runs
#[derive(Debug, Clone)]
pub struct BatchConfig {
    /// Number of runs; run `i` uses seed `random_seed + i`
    pub runs: usize,
    pub concurrency_mode: ConcurrencyMode,
    /// Only relevant when concurrency_mode is Rayon
    pub thread_pool_size: Option<usize>,
}

impl BatchConfig {
    /// One sequential run
    pub fn new() -> Self {
        Self {
            runs: 1,
            concurrency_mode: ConcurrencyMode::default(),
            thread_pool_size: None,
        }
    }

    pub fn with_runs(mut self, runs: usize) -> Self {
        self.runs = runs;
        self
    }

    pub fn with_concurrency(mut self, mode: ConcurrencyMode) -> Self {
        self.concurrency_mode = mode;
        self
    }

    /// Set the thread pool size for parallel execution
    pub fn with_thread_pool_size(mut self, size: usize) -> Self {
        self.thread_pool_size = Some(size);
        self
    }
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// Run `batch.runs` factories with consecutive seeds starting at `config.random_seed`
pub fn run_batch(config: &FactoryConfig, batch: &BatchConfig) -> Result<Vec<MetricsSnapshot>, Error> {
    config.validate()?;
    let configs: Vec<FactoryConfig> = (0..batch.runs as u64)
        .map(|offset| {
            config
                .clone()
                .with_random_seed(config.random_seed.wrapping_add(offset))
        })
        .collect();

    info!(
        "Running batch of {} with {:?} execution",
        batch.runs, batch.concurrency_mode
    );
    match batch.concurrency_mode {
        ConcurrencyMode::Sequential => configs.iter().map(run_with_config).collect(),
        ConcurrencyMode::Rayon => {
            let mut pool = ThreadPoolBuilder::new();
            if let Some(threads) = batch.thread_pool_size {
                pool = pool.num_threads(threads.max(1));
            }
            let pool = pool.build()?;
            pool.install(|| configs.par_iter().map(run_with_config).collect())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = BatchConfig::default();
        assert_eq!(config.runs, 1);
        assert_eq!(config.concurrency_mode, ConcurrencyMode::Sequential);
        assert_eq!(config.thread_pool_size, None);
    }

    #[test]
    fn test_config_builder() {
        let config = BatchConfig::new()
            .with_runs(8)
            .with_concurrency(ConcurrencyMode::Rayon)
            .with_thread_pool_size(4);

        assert_eq!(config.runs, 8);
        assert_eq!(config.concurrency_mode, ConcurrencyMode::Rayon);
        assert_eq!(config.thread_pool_size, Some(4));
    }

    #[test]
    fn test_empty_batch() {
        let snapshots = run_batch(&FactoryConfig::default(), &BatchConfig::new().with_runs(0)).unwrap();
        assert!(snapshots.is_empty());
    }

    #[test]
    fn test_invalid_config_fails_before_any_run() {
        let config = FactoryConfig::default().with_horizon(f64::NAN);
        assert!(matches!(
            run_batch(&config, &BatchConfig::new().with_runs(3)),
            Err(Error::Config(_))
        ));
    }
}
