use super::errors::SimulationError;
use super::resource::Resource;
use super::simulation_engine::{Simulation, SimulationObserver};
use super::types::ResourceId;

/// Declares the resources and observers of a simulation before its run state exists.
///
/// Resource ids are handed out here so the run state can be built around them.
#[derive(Default)]
pub struct SimulationBuilder {
    resources: Vec<Resource>,
    observers: Vec<Box<dyn SimulationObserver>>,
}

impl SimulationBuilder {
    /// Create a new, empty builder
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a resource with `capacity` slots
    pub fn add_resource(
        &mut self,
        name: impl Into<String>,
        capacity: usize,
    ) -> Result<ResourceId, SimulationError> {
        let resource = Resource::new(name, capacity)?;
        let id = ResourceId(self.resources.len());
        self.resources.push(resource);
        Ok(id)
    }

    /// Add an observer to the simulation
    pub fn add_observer(&mut self, observer: Box<dyn SimulationObserver>) -> &mut Self {
        self.observers.push(observer);
        self
    }

    /// Number of registered resources
    pub fn resource_count(&self) -> usize {
        self.resources.len()
    }

    /// Create the simulation around its run state, with the clock at zero
    pub fn build<C: 'static>(self, state: C) -> Simulation<C> {
        Simulation::new(state, self.resources, self.observers)
    }
}
