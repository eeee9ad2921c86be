use super::types::{ProcessId, ResourceId, SimTime};
use thiserror::Error;

/// Errors raised by the simulation engine
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SimulationError {
    /// A resource was declared with zero capacity
    #[error("resource '{0}' must have a capacity of at least 1")]
    ZeroCapacity(String),
    /// A process referred to a resource that was never registered
    #[error("unknown resource {0}")]
    UnknownResource(ResourceId),
    /// A process tried to join a process id that was never issued
    #[error("unknown process {0}")]
    UnknownProcess(ProcessId),
    /// A process released a slot it does not hold
    #[error("process {process} released {resource} without holding it")]
    NotHeld {
        process: ProcessId,
        resource: ResourceId,
    },
    /// The run horizon is negative, not finite, or behind the clock
    #[error("invalid horizon {horizon} (clock is at {now})")]
    InvalidHorizon { horizon: SimTime, now: SimTime },
}
