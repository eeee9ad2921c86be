use super::materials::{MaterialInventory, Stock};
use super::station::STATION_COUNT;
use crate::core::SimTime;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Units used of one material, split by variant where the material has variants
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MaterialUsage {
    Count(u64),
    Variants(BTreeMap<String, u64>),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductionMetrics {
    pub total: u64,
    pub faulty: u64,
    pub faulty_rate: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StationMetrics {
    pub occupancy_rates: Vec<f64>,
    pub wait_times: Vec<f64>,
    pub downtimes: Vec<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimeMetrics {
    pub avg_production_time: f64,
    pub avg_fixing_time: f64,
    pub supplier_occupancy: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MaterialMetrics {
    pub materials_used: BTreeMap<String, MaterialUsage>,
    pub resupply_counts: BTreeMap<String, u64>,
}

/// Aggregate of one run, taken once at the end
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricsSnapshot {
    pub production: ProductionMetrics,
    pub station_metrics: StationMetrics,
    pub time_metrics: TimeMetrics,
    pub material_metrics: MaterialMetrics,
}

/// Running totals of a factory run
#[derive(Debug, Clone, Default)]
pub struct MetricsCollector {
    production_count: u64,
    faulty_count: u64,
    work_times: [SimTime; STATION_COUNT],
    waiting_times: [SimTime; STATION_COUNT],
    downtimes: [SimTime; STATION_COUNT],
    fixing_times: Vec<SimTime>,
    production_times: Vec<SimTime>,
    supply_time: SimTime,
    materials_used: BTreeMap<String, MaterialUsage>,
    resupply_counts: BTreeMap<String, u64>,
}

impl MetricsCollector {
    pub fn new() -> Self {
        Self::default()
    }

    /// A collector that reports every material of `inventory`, and each of its
    /// variants, from the start with zero use and zero resupplies
    pub fn for_inventory(inventory: &MaterialInventory) -> Self {
        let mut collector = Self::new();
        for (name, stock) in inventory.iter() {
            let usage = match stock {
                Stock::Quantity(_) => MaterialUsage::Count(0),
                Stock::Variants(variants) => MaterialUsage::Variants(
                    variants.keys().map(|variant| (variant.clone(), 0)).collect(),
                ),
            };
            collector.materials_used.insert(name.to_string(), usage);
            collector.resupply_counts.insert(name.to_string(), 0);
        }
        collector
    }

    pub fn record_production(&mut self) {
        self.production_count += 1;
    }

    pub fn record_faulty(&mut self) {
        self.faulty_count += 1;
    }

    pub fn record_work_time(&mut self, station: usize, duration: SimTime) {
        if let Some(total) = self.work_times.get_mut(station) {
            *total += duration;
        }
    }

    pub fn record_waiting_time(&mut self, station: usize, duration: SimTime) {
        if let Some(total) = self.waiting_times.get_mut(station) {
            *total += duration;
        }
    }

    /// A repair counts both as a fixing time and as downtime of the station
    pub fn record_fixing_time(&mut self, station: usize, duration: SimTime) {
        self.fixing_times.push(duration);
        if let Some(total) = self.downtimes.get_mut(station) {
            *total += duration;
        }
    }

    pub fn record_supply_time(&mut self, duration: SimTime) {
        self.supply_time += duration;
    }

    pub fn record_production_time(&mut self, duration: SimTime) {
        self.production_times.push(duration);
    }

    pub fn record_material_use(&mut self, material: &str, variant: Option<&str>) {
        let usage = self
            .materials_used
            .entry(material.to_string())
            .or_insert_with(|| match variant {
                Some(_) => MaterialUsage::Variants(BTreeMap::new()),
                None => MaterialUsage::Count(0),
            });
        match (usage, variant) {
            (MaterialUsage::Variants(variants), Some(variant)) => {
                *variants.entry(variant.to_string()).or_insert(0) += 1;
            }
            (MaterialUsage::Count(count), _) => *count += 1,
            (MaterialUsage::Variants(_), None) => {}
        }
    }

    pub fn record_resupply(&mut self, material: &str) {
        *self.resupply_counts.entry(material.to_string()).or_insert(0) += 1;
    }

    pub fn production_count(&self) -> u64 {
        self.production_count
    }

    pub fn faulty_count(&self) -> u64 {
        self.faulty_count
    }

    pub fn station_work_time(&self, station: usize) -> SimTime {
        self.work_times.get(station).copied().unwrap_or(0.0)
    }

    pub fn station_wait_time(&self, station: usize) -> SimTime {
        self.waiting_times.get(station).copied().unwrap_or(0.0)
    }

    pub fn station_downtime(&self, station: usize) -> SimTime {
        self.downtimes.get(station).copied().unwrap_or(0.0)
    }

    pub fn fixing_times(&self) -> &[SimTime] {
        &self.fixing_times
    }

    pub fn production_times(&self) -> &[SimTime] {
        &self.production_times
    }

    pub fn supply_time(&self) -> SimTime {
        self.supply_time
    }

    pub fn resupply_count(&self, material: &str) -> u64 {
        self.resupply_counts.get(material).copied().unwrap_or(0)
    }

    /// Units used of a material, summed over its variants
    pub fn material_used(&self, material: &str) -> u64 {
        match self.materials_used.get(material) {
            Some(MaterialUsage::Count(count)) => *count,
            Some(MaterialUsage::Variants(variants)) => variants.values().sum(),
            None => 0,
        }
    }

    /// Aggregate everything recorded so far over `total_elapsed_time`
    pub fn snapshot(&self, total_elapsed_time: SimTime) -> MetricsSnapshot {
        let total = self.production_count;
        let faulty = self.faulty_count;
        let per_unit = total as f64;

        MetricsSnapshot {
            production: ProductionMetrics {
                total,
                faulty,
                faulty_rate: ratio(faulty as f64, (total + faulty) as f64),
            },
            station_metrics: StationMetrics {
                occupancy_rates: self
                    .work_times
                    .iter()
                    .map(|work| ratio(*work, total_elapsed_time))
                    .collect(),
                wait_times: self
                    .waiting_times
                    .iter()
                    .map(|wait| ratio(*wait, per_unit))
                    .collect(),
                downtimes: self.downtimes.to_vec(),
            },
            time_metrics: TimeMetrics {
                avg_production_time: mean(&self.production_times),
                avg_fixing_time: mean(&self.fixing_times),
                supplier_occupancy: ratio(self.supply_time, total_elapsed_time),
            },
            material_metrics: MaterialMetrics {
                materials_used: self.materials_used.clone(),
                resupply_counts: self.resupply_counts.clone(),
            },
        }
    }
}

fn ratio(numerator: f64, denominator: f64) -> f64 {
    if denominator > 0.0 {
        numerator / denominator
    } else {
        0.0
    }
}

fn mean(values: &[f64]) -> f64 {
    ratio(values.iter().sum(), values.len() as f64)
}
