use super::sampling;
use crate::core::{ResourceId, SimTime};
use log::debug;
use rand::Rng;

pub const STATION_COUNT: usize = 6;

pub const STATION_NAMES: [&str; STATION_COUNT] =
    ["motherboard", "cpu", "gpu", "ram", "case", "final_assembly"];

/// A capacity-1 work station of the assembly line
#[derive(Debug, Clone)]
pub struct Station {
    index: usize,
    resource: ResourceId,
    failure_probability: f64,
    units_processed: u64,
}

impl Station {
    pub fn new(index: usize, resource: ResourceId, failure_probability: f64) -> Self {
        Self {
            index,
            resource,
            failure_probability,
            units_processed: 0,
        }
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn name(&self) -> &'static str {
        STATION_NAMES.get(self.index).copied().unwrap_or("station")
    }

    pub fn resource(&self) -> ResourceId {
        self.resource
    }

    pub fn failure_probability(&self) -> f64 {
        self.failure_probability
    }

    pub fn units_processed(&self) -> u64 {
        self.units_processed
    }

    /// Count a unit that was just granted the station and roll for a breakdown
    /// on every `interval`-th unit. Returns the repair delay on failure.
    pub fn check_failure<R: Rng + ?Sized>(
        &mut self,
        rng: &mut R,
        interval: u64,
        mean_repair_time: SimTime,
    ) -> Option<SimTime> {
        self.units_processed += 1;
        if interval == 0 || self.units_processed % interval != 0 {
            return None;
        }
        if rng.gen::<f64>() >= self.failure_probability {
            return None;
        }

        let repair = sampling::exponential(rng, mean_repair_time);
        debug!(
            "Station {} broke down after {} units, repair takes {:.3}",
            self.name(),
            self.units_processed,
            repair
        );
        Some(repair)
    }
}
