pub mod batch;
pub mod config;
pub mod materials;
pub mod metrics;
pub mod processes;
pub mod sampling;
pub mod station;

pub use batch::{run_batch, BatchConfig, ConcurrencyMode};
pub use config::{
    ConfigError, DayConfig, FactoryConfig, NormalDelay, QuantityRange, ResupplyConfig,
    StationConfig,
};
pub use materials::{MaterialInventory, Stock};
pub use metrics::{MaterialUsage, MetricsCollector, MetricsSnapshot};
pub use processes::{AssembleUnit, DayCycle, Manufacturing, Resupply};
pub use station::{Station, STATION_COUNT, STATION_NAMES};

use crate::core::{ResourceId, SimTime, Simulation, SimulationBuilder};
use crate::error::Error;
use log::{debug, info};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};

/// Run state of one laptop factory: stock, stations, counters and the seeded
/// random source every draw of the run goes through.
pub struct Factory {
    config: FactoryConfig,
    inventory: MaterialInventory,
    stations: Vec<Station>,
    supply_device: ResourceId,
    metrics: MetricsCollector,
    rng: StdRng,
}

impl Factory {
    pub fn new(config: FactoryConfig, stations: Vec<Station>, supply_device: ResourceId) -> Self {
        Self {
            inventory: config.initial_materials.clone(),
            metrics: MetricsCollector::for_inventory(&config.initial_materials),
            rng: StdRng::seed_from_u64(config.random_seed),
            config,
            stations,
            supply_device,
        }
    }

    pub fn config(&self) -> &FactoryConfig {
        &self.config
    }

    pub fn inventory(&self) -> &MaterialInventory {
        &self.inventory
    }

    pub fn inventory_mut(&mut self) -> &mut MaterialInventory {
        &mut self.inventory
    }

    pub fn stations(&self) -> &[Station] {
        &self.stations
    }

    pub fn station(&self, index: usize) -> &Station {
        &self.stations[index]
    }

    pub fn supply_device(&self) -> ResourceId {
        self.supply_device
    }

    pub fn metrics(&self) -> &MetricsCollector {
        &self.metrics
    }

    pub fn metrics_mut(&mut self) -> &mut MetricsCollector {
        &mut self.metrics
    }

    /// Sample a duration from a clamped normal distribution
    pub fn draw(&mut self, delay: NormalDelay) -> SimTime {
        sampling::clamped_normal(&mut self.rng, &delay)
    }

    /// True with the given probability
    pub fn roll(&mut self, probability: f64) -> bool {
        self.rng.gen::<f64>() < probability
    }

    pub fn shuffle<T>(&mut self, items: &mut [T]) {
        items.shuffle(&mut self.rng);
    }

    /// Pick the case material of the next unit by weight
    pub fn choose_case_material(&mut self) -> String {
        let options: Vec<(&str, f64)> = self
            .config
            .case_material_weights
            .iter()
            .map(|(material, weight)| (material.as_str(), *weight))
            .collect();
        sampling::weighted_choice(&mut self.rng, &options)
            .unwrap_or(materials::METAL)
            .to_string()
    }

    /// Pick an in-stock variant of a component material
    pub fn pick_component(&mut self, material: &str) -> Option<String> {
        let weights = self.config.component_weights.get(material)?;
        self.inventory.pick_variant(material, weights, &mut self.rng)
    }

    pub fn consume(&mut self, material: &str) {
        if self.inventory.consume(material) {
            self.metrics.record_material_use(material, None);
        }
    }

    pub fn consume_variant(&mut self, material: &str, variant: &str) {
        if self.inventory.consume_variant(material, variant) {
            self.metrics.record_material_use(material, Some(variant));
        }
    }

    pub fn replenish(&mut self, material: &str) {
        self.inventory
            .replenish(material, &self.config.resupply, &mut self.rng);
        debug!("Resupplied {}: {:?}", material, self.inventory.get(material));
    }

    /// Count a unit in at a station and roll for a breakdown. Returns the repair
    /// delay, 0 when the station keeps working.
    pub fn check_station_failure(&mut self, station: usize) -> SimTime {
        let interval = self.config.stations.failure_check_interval;
        let mean_repair_time = self.config.stations.mean_repair_time;
        let Some(station_state) = self.stations.get_mut(station) else {
            return 0.0;
        };
        match station_state.check_failure(&mut self.rng, interval, mean_repair_time) {
            Some(repair) => {
                self.metrics.record_fixing_time(station, repair);
                repair
            }
            None => 0.0,
        }
    }

    pub fn snapshot(&self, total_elapsed_time: SimTime) -> MetricsSnapshot {
        self.metrics.snapshot(total_elapsed_time)
    }
}

/// Validate `config` and set up the stations and supply device, without
/// starting any process
pub fn build_factory(config: &FactoryConfig) -> Result<Simulation<Factory>, Error> {
    config.validate()?;

    let mut builder = SimulationBuilder::new();
    let mut stations = Vec::with_capacity(STATION_COUNT);
    for (index, name) in STATION_NAMES.iter().enumerate() {
        let resource = builder.add_resource(*name, 1)?;
        let failure_probability = config.stations.failure_probabilities[index];
        stations.push(Station::new(index, resource, failure_probability));
    }
    let supply_device =
        builder.add_resource("supply_device", config.resupply.supply_device_capacity)?;

    let factory = Factory::new(config.clone(), stations, supply_device);
    Ok(builder.build(factory))
}

/// A factory with its calendar and production line started
pub fn build_simulation(config: &FactoryConfig) -> Result<Simulation<Factory>, Error> {
    let mut sim = build_factory(config)?;
    sim.spawn(DayCycle::new());
    sim.spawn(Manufacturing::new());
    Ok(sim)
}

/// Run one factory to `config.horizon` and aggregate its metrics
pub fn run_with_config(config: &FactoryConfig) -> Result<MetricsSnapshot, Error> {
    info!(
        "Starting factory run: horizon {}, seed {}",
        config.horizon, config.random_seed
    );
    let mut sim = build_simulation(config)?;
    let elapsed = sim.run_until(config.horizon)?;
    let snapshot = sim.state().snapshot(elapsed);
    info!(
        "Factory run with seed {} finished at t={}: {} produced, {} faulty, {} events",
        config.random_seed,
        elapsed,
        snapshot.production.total,
        snapshot.production.faulty,
        sim.events_delivered()
    );
    Ok(snapshot)
}

/// Run the default factory
pub fn run(horizon: SimTime, seed: u64) -> Result<MetricsSnapshot, Error> {
    let config = FactoryConfig::default()
        .with_horizon(horizon)
        .with_random_seed(seed);
    run_with_config(&config)
}
