use super::materials::{
    MaterialInventory, Stock, CPUS, GPUS, METAL, MOTHERBOARD_CIRCUITS, PLASTIC, RAM, SCREENS,
};
use super::station::STATION_COUNT;
use crate::core::SimTime;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;

/// Errors found while loading or validating a [`FactoryConfig`]
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("horizon must be finite and non-negative, got {0}")]
    InvalidHorizon(SimTime),
    #[error("probability '{name}' must be within [0, 1], got {value}")]
    InvalidProbability { name: String, value: f64 },
    #[error("capacity of '{name}' must be at least 1, got {capacity}")]
    InvalidCapacity { name: String, capacity: usize },
    #[error("distribution '{name}' is invalid: {reason}")]
    InvalidDistribution { name: String, reason: String },
    #[error("weights '{name}' are malformed: {reason}")]
    MalformedWeights { name: String, reason: String },
    #[error("range '{name}' is invalid: [{min}, {max}]")]
    InvalidRange { name: String, min: i64, max: i64 },
    #[error("'{0}' must be at least 1")]
    NotPositive(String),
    #[error("material '{0}' is missing from the initial inventory")]
    MissingMaterial(String),
    #[error("material '{name}' must be {expected}")]
    MaterialShape { name: String, expected: &'static str },
    #[error("failed to parse configuration: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Normal distribution clamped from below
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NormalDelay {
    pub mean: f64,
    pub std_dev: f64,
    /// Smallest value a draw may take
    pub floor: f64,
}

impl NormalDelay {
    pub fn new(mean: f64, std_dev: f64, floor: f64) -> Self {
        Self {
            mean,
            std_dev,
            floor,
        }
    }

    fn validate(&self, name: &str) -> Result<(), ConfigError> {
        let invalid = |reason: &str| ConfigError::InvalidDistribution {
            name: name.to_string(),
            reason: reason.to_string(),
        };
        if !self.mean.is_finite() {
            return Err(invalid("mean must be finite"));
        }
        if !self.std_dev.is_finite() || self.std_dev < 0.0 {
            return Err(invalid("standard deviation must be finite and non-negative"));
        }
        // Every draw must be strictly positive
        if !self.floor.is_finite() || self.floor <= 0.0 {
            return Err(invalid("floor must be finite and positive"));
        }
        Ok(())
    }
}

/// Inclusive integer range
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuantityRange {
    pub min: i64,
    pub max: i64,
}

impl QuantityRange {
    pub fn new(min: i64, max: i64) -> Self {
        Self { min, max }
    }

    fn validate(&self, name: &str) -> Result<(), ConfigError> {
        if self.min < 0 || self.min > self.max {
            return Err(ConfigError::InvalidRange {
                name: name.to_string(),
                min: self.min,
                max: self.max,
            });
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StationConfig {
    /// Breakdown probability per station, in pipeline order
    pub failure_probabilities: [f64; STATION_COUNT],
    /// A station only rolls for a breakdown on every n-th unit
    pub failure_check_interval: u64,
    pub mean_repair_time: SimTime,
    pub processing_time: NormalDelay,
}

impl Default for StationConfig {
    fn default() -> Self {
        Self {
            failure_probabilities: [0.02, 0.01, 0.05, 0.15, 0.07, 0.06],
            failure_check_interval: 5,
            mean_repair_time: 3.0,
            processing_time: NormalDelay::new(4.0, 2.0, 0.1),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResupplyConfig {
    pub supply_device_capacity: usize,
    pub resupply_time: NormalDelay,
    /// Quantity a depleted material is reset to
    pub quantity: QuantityRange,
    /// Size of a regenerated CPU or GPU batch
    pub component_batch_size: i64,
    pub cpu_intel: QuantityRange,
    pub gpu_nvidia: QuantityRange,
    pub gpu_amd: QuantityRange,
}

impl Default for ResupplyConfig {
    fn default() -> Self {
        Self {
            supply_device_capacity: 3,
            resupply_time: NormalDelay::new(2.0, 0.5, 0.1),
            quantity: QuantityRange::new(20, 30),
            component_batch_size: 25,
            cpu_intel: QuantityRange::new(10, 15),
            gpu_nvidia: QuantityRange::new(7, 10),
            gpu_amd: QuantityRange::new(7, 10),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DayConfig {
    pub day_length: NormalDelay,
    pub accident_probability: f64,
    pub accident_duration: NormalDelay,
}

impl Default for DayConfig {
    fn default() -> Self {
        Self {
            day_length: NormalDelay::new(24.0, 2.0, 1.0),
            accident_probability: 0.01,
            accident_duration: NormalDelay::new(24.0, 4.0, 1.0),
        }
    }
}

/// Everything that parameterises one factory run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FactoryConfig {
    pub horizon: SimTime,
    pub random_seed: u64,
    pub initial_materials: MaterialInventory,
    pub stations: StationConfig,
    pub resupply: ResupplyConfig,
    pub day: DayConfig,
    /// Pause between finishing one unit and starting the next
    pub unit_interval: NormalDelay,
    pub case_material_weights: BTreeMap<String, f64>,
    /// Variant selection weights per component material
    pub component_weights: BTreeMap<String, BTreeMap<String, f64>>,
    pub quality_reject_probability: f64,
}

impl Default for FactoryConfig {
    fn default() -> Self {
        Self {
            horizon: 5000.0,
            random_seed: 42,
            initial_materials: MaterialInventory::laptop_line(),
            stations: StationConfig::default(),
            resupply: ResupplyConfig::default(),
            day: DayConfig::default(),
            unit_interval: NormalDelay::new(4.0, 2.0, 0.1),
            case_material_weights: weights(&[(METAL, 0.6), (PLASTIC, 0.4)]),
            component_weights: BTreeMap::from([
                (CPUS.to_string(), weights(&[("intel", 0.6), ("amd", 0.4)])),
                (
                    GPUS.to_string(),
                    weights(&[("nvidia", 0.4), ("amd", 0.3), ("intel", 0.3)]),
                ),
                (
                    RAM.to_string(),
                    weights(&[("8GB", 0.4), ("16GB", 0.4), ("32GB", 0.2)]),
                ),
            ]),
            quality_reject_probability: 0.05,
        }
    }
}

fn weights(pairs: &[(&str, f64)]) -> BTreeMap<String, f64> {
    pairs
        .iter()
        .map(|(name, weight)| (name.to_string(), *weight))
        .collect()
}

impl FactoryConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a JSON document. Missing fields take their defaults.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn with_horizon(mut self, horizon: SimTime) -> Self {
        self.horizon = horizon;
        self
    }

    pub fn with_random_seed(mut self, seed: u64) -> Self {
        self.random_seed = seed;
        self
    }

    pub fn with_material(mut self, name: &str, stock: Stock) -> Self {
        self.initial_materials.set(name, stock);
        self
    }

    pub fn with_failure_probabilities(mut self, probabilities: [f64; STATION_COUNT]) -> Self {
        self.stations.failure_probabilities = probabilities;
        self
    }

    pub fn with_supply_device_capacity(mut self, capacity: usize) -> Self {
        self.resupply.supply_device_capacity = capacity;
        self
    }

    pub fn with_quality_reject_probability(mut self, probability: f64) -> Self {
        self.quality_reject_probability = probability;
        self
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.horizon.is_finite() || self.horizon < 0.0 {
            return Err(ConfigError::InvalidHorizon(self.horizon));
        }

        for (station, probability) in self.stations.failure_probabilities.iter().enumerate() {
            check_probability(&format!("stations.failure_probabilities[{}]", station), *probability)?;
        }
        check_probability("day.accident_probability", self.day.accident_probability)?;
        check_probability("quality_reject_probability", self.quality_reject_probability)?;

        self.stations.processing_time.validate("stations.processing_time")?;
        self.resupply.resupply_time.validate("resupply.resupply_time")?;
        self.day.day_length.validate("day.day_length")?;
        self.day.accident_duration.validate("day.accident_duration")?;
        self.unit_interval.validate("unit_interval")?;
        if !self.stations.mean_repair_time.is_finite() || self.stations.mean_repair_time <= 0.0 {
            return Err(ConfigError::InvalidDistribution {
                name: "stations.mean_repair_time".to_string(),
                reason: "mean must be finite and positive".to_string(),
            });
        }
        if self.stations.failure_check_interval == 0 {
            return Err(ConfigError::NotPositive(
                "stations.failure_check_interval".to_string(),
            ));
        }

        if self.resupply.supply_device_capacity == 0 {
            return Err(ConfigError::InvalidCapacity {
                name: "resupply.supply_device_capacity".to_string(),
                capacity: 0,
            });
        }
        self.validate_batches()?;
        self.validate_materials()?;
        Ok(())
    }

    fn validate_batches(&self) -> Result<(), ConfigError> {
        let resupply = &self.resupply;
        resupply.quantity.validate("resupply.quantity")?;
        resupply.cpu_intel.validate("resupply.cpu_intel")?;
        resupply.gpu_nvidia.validate("resupply.gpu_nvidia")?;
        resupply.gpu_amd.validate("resupply.gpu_amd")?;

        let batch = resupply.component_batch_size;
        if resupply.cpu_intel.max > batch {
            return Err(ConfigError::InvalidRange {
                name: "resupply.cpu_intel (exceeds component_batch_size)".to_string(),
                min: resupply.cpu_intel.min,
                max: resupply.cpu_intel.max,
            });
        }
        // The intel share of a GPU batch is whatever nvidia and amd leave over
        let gpu_max = resupply.gpu_nvidia.max + resupply.gpu_amd.max;
        if gpu_max > batch {
            return Err(ConfigError::InvalidRange {
                name: "resupply.gpu_nvidia + resupply.gpu_amd (exceeds component_batch_size)"
                    .to_string(),
                min: resupply.gpu_nvidia.min + resupply.gpu_amd.min,
                max: gpu_max,
            });
        }
        Ok(())
    }

    fn validate_materials(&self) -> Result<(), ConfigError> {
        let inventory = &self.initial_materials;

        check_weights("case_material_weights", &self.case_material_weights)?;
        let mut scalars = vec![MOTHERBOARD_CIRCUITS, SCREENS];
        scalars.extend(self.case_material_weights.keys().map(String::as_str));
        for name in scalars {
            match inventory.get(name) {
                Some(Stock::Quantity(_)) => {}
                Some(Stock::Variants(_)) => {
                    return Err(ConfigError::MaterialShape {
                        name: name.to_string(),
                        expected: "a single quantity",
                    })
                }
                None => return Err(ConfigError::MissingMaterial(name.to_string())),
            }
        }

        for name in [CPUS, GPUS, RAM] {
            let variants = match inventory.get(name) {
                Some(Stock::Variants(variants)) => variants,
                Some(Stock::Quantity(_)) => {
                    return Err(ConfigError::MaterialShape {
                        name: name.to_string(),
                        expected: "a map of variants",
                    })
                }
                None => return Err(ConfigError::MissingMaterial(name.to_string())),
            };
            let weights_name = format!("component_weights.{}", name);
            let weights = self
                .component_weights
                .get(name)
                .ok_or_else(|| ConfigError::MalformedWeights {
                    name: weights_name.clone(),
                    reason: "no weights given".to_string(),
                })?;
            check_weights(&weights_name, weights)?;
            if let Some(variant) = variants.keys().find(|variant| !weights.contains_key(*variant)) {
                return Err(ConfigError::MalformedWeights {
                    name: weights_name,
                    reason: format!("variant '{}' has no weight", variant),
                });
            }
        }
        Ok(())
    }
}

fn check_probability(name: &str, value: f64) -> Result<(), ConfigError> {
    if (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(ConfigError::InvalidProbability {
            name: name.to_string(),
            value,
        })
    }
}

fn check_weights(name: &str, weights: &BTreeMap<String, f64>) -> Result<(), ConfigError> {
    let malformed = |reason: &str| ConfigError::MalformedWeights {
        name: name.to_string(),
        reason: reason.to_string(),
    };
    if weights.is_empty() {
        return Err(malformed("no weights given"));
    }
    if weights.values().any(|weight| !weight.is_finite() || *weight < 0.0) {
        return Err(malformed("weights must be finite and non-negative"));
    }
    if weights.values().sum::<f64>() <= 0.0 {
        return Err(malformed("weights must not all be zero"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = FactoryConfig::default();
        assert_eq!(config.horizon, 5000.0);
        assert_eq!(
            config.stations.failure_probabilities,
            [0.02, 0.01, 0.05, 0.15, 0.07, 0.06]
        );
        assert_eq!(config.resupply.supply_device_capacity, 3);
        assert_eq!(config.resupply.quantity, QuantityRange::new(20, 30));
        assert_eq!(config.case_material_weights[METAL], 0.6);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_builder_pattern() {
        let config = FactoryConfig::new()
            .with_horizon(100.0)
            .with_random_seed(9)
            .with_supply_device_capacity(1)
            .with_material(SCREENS, Stock::Quantity(0));

        assert_eq!(config.horizon, 100.0);
        assert_eq!(config.random_seed, 9);
        assert_eq!(config.resupply.supply_device_capacity, 1);
        assert_eq!(config.initial_materials.quantity(SCREENS), Some(0));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validation() {
        let config = FactoryConfig::default().with_horizon(-1.0);
        assert!(matches!(config.validate(), Err(ConfigError::InvalidHorizon(_))));

        let config = FactoryConfig::default().with_supply_device_capacity(0);
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidCapacity { .. })
        ));

        let config = FactoryConfig::default().with_quality_reject_probability(1.5);
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidProbability { .. })
        ));

        let mut config = FactoryConfig::default();
        config.case_material_weights.insert(METAL.to_string(), -1.0);
        assert!(matches!(
            config.validate(),
            Err(ConfigError::MalformedWeights { .. })
        ));

        let mut config = FactoryConfig::default();
        config.resupply.quantity = QuantityRange::new(30, 20);
        assert!(matches!(config.validate(), Err(ConfigError::InvalidRange { .. })));

        let mut config = FactoryConfig::default();
        config.day.day_length = NormalDelay::new(0.0, 0.0, 0.0);
        config.day.accident_probability = 0.0;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidDistribution { .. })
        ));

        let mut config = FactoryConfig::default();
        config.unit_interval = NormalDelay::new(-3.0, 1.0, 0.0);
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidDistribution { .. })
        ));
    }

    #[test]
    fn test_gpu_batch_that_could_go_negative_is_rejected() {
        let mut config = FactoryConfig::default();
        config.resupply.gpu_nvidia = QuantityRange::new(7, 15);
        config.resupply.gpu_amd = QuantityRange::new(7, 15);
        assert!(matches!(config.validate(), Err(ConfigError::InvalidRange { .. })));
    }

    #[test]
    fn test_material_shape_is_checked() {
        let config = FactoryConfig::default().with_material(CPUS, Stock::Quantity(10));
        assert!(matches!(
            config.validate(),
            Err(ConfigError::MaterialShape { .. })
        ));

        let mut config = FactoryConfig::default();
        config.component_weights.remove(RAM);
        assert!(matches!(
            config.validate(),
            Err(ConfigError::MalformedWeights { .. })
        ));
    }

    #[test]
    fn test_from_json_fills_defaults() {
        let config = FactoryConfig::from_json(
            r#"{"horizon": 250.0, "random_seed": 3, "initial_materials": {
                "motherboard_circuits": 0, "screens": 5, "metal": 1, "plastic": 1,
                "cpus": {"intel": 1, "amd": 0},
                "gpus": {"nvidia": 1, "amd": 1, "intel": 1},
                "ram": {"8GB": 1, "16GB": 1, "32GB": 1}}}"#,
        )
        .unwrap();
        assert_eq!(config.horizon, 250.0);
        assert_eq!(config.initial_materials.quantity(MOTHERBOARD_CIRCUITS), Some(0));
        assert_eq!(config.initial_materials.variant_quantity(CPUS, "intel"), Some(1));
        assert_eq!(config.stations, StationConfig::default());

        assert!(matches!(
            FactoryConfig::from_json("{\"horizon\": \"soon\"}"),
            Err(ConfigError::Parse(_))
        ));
    }
}
