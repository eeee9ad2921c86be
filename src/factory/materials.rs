use super::config::ResupplyConfig;
use super::sampling;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub const MOTHERBOARD_CIRCUITS: &str = "motherboard_circuits";
pub const CPUS: &str = "cpus";
pub const GPUS: &str = "gpus";
pub const RAM: &str = "ram";
pub const HDD: &str = "hdd";
pub const M2: &str = "m2";
pub const SCREENS: &str = "screens";
pub const METAL: &str = "metal";
pub const PLASTIC: &str = "plastic";
pub const BOXES: &str = "boxes";

/// Stock of one material: a plain count or a count per variant (brand, size)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Stock {
    Quantity(i64),
    Variants(BTreeMap<String, i64>),
}

impl Stock {
    pub fn variants(pairs: &[(&str, i64)]) -> Self {
        Stock::Variants(
            pairs
                .iter()
                .map(|(variant, quantity)| (variant.to_string(), *quantity))
                .collect(),
        )
    }

    /// Total units on hand across all variants
    pub fn total(&self) -> i64 {
        match self {
            Stock::Quantity(quantity) => *quantity,
            Stock::Variants(variants) => variants.values().sum(),
        }
    }
}

/// Materials on hand in one factory. Owned by a single run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MaterialInventory {
    materials: BTreeMap<String, Stock>,
}

impl MaterialInventory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Opening stock of the laptop line
    pub fn laptop_line() -> Self {
        let mut inventory = Self::new();
        inventory.set(MOTHERBOARD_CIRCUITS, Stock::Quantity(25));
        inventory.set(CPUS, Stock::variants(&[("intel", 13), ("amd", 12)]));
        inventory.set(GPUS, Stock::variants(&[("nvidia", 8), ("amd", 8), ("intel", 9)]));
        inventory.set(RAM, Stock::variants(&[("8GB", 10), ("16GB", 10), ("32GB", 5)]));
        inventory.set(HDD, Stock::Quantity(15));
        inventory.set(M2, Stock::Quantity(10));
        inventory.set(SCREENS, Stock::Quantity(25));
        inventory.set(METAL, Stock::Quantity(15));
        inventory.set(PLASTIC, Stock::Quantity(10));
        inventory.set(BOXES, Stock::Quantity(25));
        inventory
    }

    pub fn set(&mut self, name: &str, stock: Stock) {
        self.materials.insert(name.to_string(), stock);
    }

    pub fn get(&self, name: &str) -> Option<&Stock> {
        self.materials.get(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Stock)> {
        self.materials.iter().map(|(name, stock)| (name.as_str(), stock))
    }

    /// Count of a plain material, `None` for unknown or variant materials
    pub fn quantity(&self, name: &str) -> Option<i64> {
        match self.materials.get(name)? {
            Stock::Quantity(quantity) => Some(*quantity),
            Stock::Variants(_) => None,
        }
    }

    pub fn variant_quantity(&self, name: &str, variant: &str) -> Option<i64> {
        match self.materials.get(name)? {
            Stock::Variants(variants) => variants.get(variant).copied(),
            Stock::Quantity(_) => None,
        }
    }

    /// True when nothing of the material is left
    pub fn is_depleted(&self, name: &str) -> bool {
        self.materials.get(name).map_or(true, |stock| stock.total() <= 0)
    }

    /// Take one unit of a plain material
    pub fn consume(&mut self, name: &str) -> bool {
        match self.materials.get_mut(name) {
            Some(Stock::Quantity(quantity)) => {
                *quantity -= 1;
                true
            }
            _ => false,
        }
    }

    /// Take one unit of a specific variant
    pub fn consume_variant(&mut self, name: &str, variant: &str) -> bool {
        match self.materials.get_mut(name) {
            Some(Stock::Variants(variants)) => match variants.get_mut(variant) {
                Some(quantity) => {
                    *quantity -= 1;
                    true
                }
                None => false,
            },
            _ => false,
        }
    }

    /// Weighted random choice among the variants still in stock.
    ///
    /// Weights are looked up by variant name and renormalised over the
    /// available variants. `None` when no weighted variant is left.
    pub fn pick_variant<R: Rng + ?Sized>(
        &self,
        name: &str,
        weights: &BTreeMap<String, f64>,
        rng: &mut R,
    ) -> Option<String> {
        let Some(Stock::Variants(variants)) = self.materials.get(name) else {
            return None;
        };
        let available: Vec<(&str, f64)> = variants
            .iter()
            .filter(|(_, quantity)| **quantity > 0)
            .map(|(variant, _)| (variant.as_str(), weights.get(variant).copied().unwrap_or(0.0)))
            .collect();
        sampling::weighted_choice(rng, &available).map(str::to_string)
    }

    /// Refill a depleted material, replacing whatever remainder is left.
    ///
    /// CPU and GPU batches are regenerated with a fresh brand split; every other
    /// material (or each variant of one) is reset to a count drawn from the
    /// resupply range.
    pub fn replenish<R: Rng + ?Sized>(&mut self, name: &str, config: &ResupplyConfig, rng: &mut R) {
        let batch = config.component_batch_size;
        let stock = match name {
            CPUS => {
                let intel = rng.gen_range(config.cpu_intel.min..=config.cpu_intel.max);
                Stock::variants(&[("intel", intel), ("amd", batch - intel)])
            }
            GPUS => {
                let nvidia = rng.gen_range(config.gpu_nvidia.min..=config.gpu_nvidia.max);
                let amd = rng.gen_range(config.gpu_amd.min..=config.gpu_amd.max);
                Stock::variants(&[("nvidia", nvidia), ("amd", amd), ("intel", batch - nvidia - amd)])
            }
            _ => match self.materials.get(name) {
                Some(Stock::Variants(variants)) => Stock::Variants(
                    variants
                        .keys()
                        .map(|variant| {
                            let quantity = rng.gen_range(config.quantity.min..=config.quantity.max);
                            (variant.clone(), quantity)
                        })
                        .collect(),
                ),
                _ => Stock::Quantity(rng.gen_range(config.quantity.min..=config.quantity.max)),
            },
        };
        self.set(name, stock);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn cpu_weights() -> BTreeMap<String, f64> {
        BTreeMap::from([("intel".to_string(), 0.6), ("amd".to_string(), 0.4)])
    }

    #[test]
    fn test_laptop_line_opening_stock() {
        let inventory = MaterialInventory::laptop_line();
        assert_eq!(inventory.quantity(MOTHERBOARD_CIRCUITS), Some(25));
        assert_eq!(inventory.get(CPUS).map(Stock::total), Some(25));
        assert_eq!(inventory.get(GPUS).map(Stock::total), Some(25));
        assert_eq!(inventory.variant_quantity(RAM, "32GB"), Some(5));
        assert!(!inventory.is_depleted(SCREENS));
        assert!(inventory.is_depleted("unobtainium"));
    }

    #[test]
    fn test_consume_decrements_by_one() {
        let mut inventory = MaterialInventory::laptop_line();
        assert!(inventory.consume(METAL));
        assert_eq!(inventory.quantity(METAL), Some(14));
        assert!(inventory.consume_variant(GPUS, "intel"));
        assert_eq!(inventory.variant_quantity(GPUS, "intel"), Some(8));
        assert!(!inventory.consume(CPUS));
        assert!(!inventory.consume_variant(CPUS, "arm"));
    }

    #[test]
    fn test_pick_variant_skips_depleted_variants() {
        let mut inventory = MaterialInventory::new();
        inventory.set(CPUS, Stock::variants(&[("intel", 0), ("amd", 3)]));
        let mut rng = StdRng::seed_from_u64(1);

        for _ in 0..20 {
            let pick = inventory.pick_variant(CPUS, &cpu_weights(), &mut rng);
            assert_eq!(pick.as_deref(), Some("amd"));
        }
    }

    #[test]
    fn test_pick_variant_with_everything_depleted() {
        let mut inventory = MaterialInventory::new();
        inventory.set(CPUS, Stock::variants(&[("intel", 0), ("amd", 0)]));
        let mut rng = StdRng::seed_from_u64(1);
        assert_eq!(inventory.pick_variant(CPUS, &cpu_weights(), &mut rng), None);
    }

    #[test]
    fn test_replenish_regenerates_component_batches() {
        let config = ResupplyConfig::default();
        let mut inventory = MaterialInventory::new();
        let mut rng = StdRng::seed_from_u64(11);

        for _ in 0..50 {
            inventory.replenish(CPUS, &config, &mut rng);
            let intel = inventory.variant_quantity(CPUS, "intel").unwrap();
            assert!((10..=15).contains(&intel));
            assert_eq!(inventory.get(CPUS).unwrap().total(), 25);

            inventory.replenish(GPUS, &config, &mut rng);
            let nvidia = inventory.variant_quantity(GPUS, "nvidia").unwrap();
            let amd = inventory.variant_quantity(GPUS, "amd").unwrap();
            assert!((7..=10).contains(&nvidia) && (7..=10).contains(&amd));
            assert_eq!(inventory.variant_quantity(GPUS, "intel"), Some(25 - nvidia - amd));
        }
    }

    #[test]
    fn test_replenish_replaces_remainder() {
        let config = ResupplyConfig::default();
        let mut inventory = MaterialInventory::laptop_line();
        inventory.set(SCREENS, Stock::Quantity(-2));
        inventory.set(RAM, Stock::variants(&[("8GB", 0), ("16GB", 0), ("32GB", 0)]));
        let mut rng = StdRng::seed_from_u64(5);

        inventory.replenish(SCREENS, &config, &mut rng);
        inventory.replenish(RAM, &config, &mut rng);

        let screens = inventory.quantity(SCREENS).unwrap();
        assert!((20..=30).contains(&screens));
        for variant in ["8GB", "16GB", "32GB"] {
            let quantity = inventory.variant_quantity(RAM, variant).unwrap();
            assert!((20..=30).contains(&quantity));
        }
    }
}
