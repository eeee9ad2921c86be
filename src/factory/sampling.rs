use super::config::NormalDelay;
use crate::core::SimTime;
use rand::distributions::{Distribution, WeightedIndex};
use rand::Rng;
use rand_distr::{Exp1, StandardNormal};

/// Draw from a normal distribution, clamped to the delay's floor
pub fn clamped_normal<R: Rng + ?Sized>(rng: &mut R, delay: &NormalDelay) -> SimTime {
    let z: f64 = StandardNormal.sample(rng);
    (delay.mean + delay.std_dev * z).max(delay.floor)
}

/// Draw from an exponential distribution with the given mean
pub fn exponential<R: Rng + ?Sized>(rng: &mut R, mean: SimTime) -> SimTime {
    let unit: f64 = Exp1.sample(rng);
    unit * mean
}

/// Weighted random choice. `None` when the options are empty or carry no weight.
pub fn weighted_choice<'a, R: Rng + ?Sized>(rng: &mut R, options: &[(&'a str, f64)]) -> Option<&'a str> {
    let index = WeightedIndex::new(options.iter().map(|(_, weight)| *weight)).ok()?;
    options.get(index.sample(rng)).map(|(option, _)| *option)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_clamped_normal_respects_floor() {
        let mut rng = StdRng::seed_from_u64(3);
        let delay = NormalDelay::new(0.0, 5.0, 0.1);
        assert!((0..1000).all(|_| clamped_normal(&mut rng, &delay) >= 0.1));
    }

    #[test]
    fn test_zero_spread_returns_mean() {
        let mut rng = StdRng::seed_from_u64(3);
        let delay = NormalDelay::new(4.0, 0.0, 0.1);
        assert_eq!(clamped_normal(&mut rng, &delay), 4.0);
    }

    #[test]
    fn test_exponential_mean_is_close() {
        let mut rng = StdRng::seed_from_u64(17);
        let samples = 20_000;
        let mean = (0..samples).map(|_| exponential(&mut rng, 3.0)).sum::<f64>() / samples as f64;
        assert!((mean - 3.0).abs() < 0.15, "mean was {}", mean);
    }

    #[test]
    fn test_weighted_choice() {
        let mut rng = StdRng::seed_from_u64(5);
        assert_eq!(weighted_choice(&mut rng, &[]), None);
        assert_eq!(weighted_choice(&mut rng, &[("a", 0.0), ("b", 0.0)]), None);
        for _ in 0..50 {
            assert_eq!(weighted_choice(&mut rng, &[("a", 0.0), ("b", 2.0)]), Some("b"));
        }
    }
}
