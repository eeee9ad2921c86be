use crate::core::SimulationError;
use crate::factory::ConfigError;
use thiserror::Error;

/// Anything that can stop a factory run
#[derive(Debug, Error)]
pub enum Error {
    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),
    #[error("simulation failed: {0}")]
    Simulation(#[from] SimulationError),
    #[error("failed to build thread pool: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),
}
