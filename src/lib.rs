pub mod core;
pub mod error;
pub mod factory;

// Re-export commonly used types
pub use crate::core::{Simulation, SimulationBuilder, SimulationError, SimulationObserver};
pub use crate::error::Error;
pub use crate::factory::{
    build_simulation, run, run_batch, run_with_config, BatchConfig, ConcurrencyMode, Factory,
    FactoryConfig, MetricsSnapshot,
};
