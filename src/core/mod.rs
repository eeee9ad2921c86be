pub mod errors;
pub mod event;
pub mod event_scheduler;
pub mod process;
pub mod resource;
pub mod simulation_builder;
pub mod simulation_engine;
pub mod types;

// Re-export commonly used types
pub use errors::SimulationError;
pub use event::{Event, Exit, Signal};
pub use process::{Process, ProcessContext, ProcessState, WaitReason, Yield};
pub use resource::Resource;
pub use simulation_builder::SimulationBuilder;
pub use simulation_engine::{Simulation, SimulationObserver};
pub use types::{ProcessId, ResourceId, SimTime};
