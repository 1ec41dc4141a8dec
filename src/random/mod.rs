//! The process-wide random stream.
//!
//! Every stochastic step of city construction and of location admission draws from a single
//! [`RandomStream`] handed in explicitly by the caller. Re-running construction with the same
//! seed and the same configuration replays every draw in the same order, so the resulting city is
//! bit-for-bit identical.
//!
//! The stream is consumed in this order:
//! 1. facility generation, kind by kind in configuration order,
//! 2. population assignment, age bin by age bin,
//! 3. household allocation,
//!
//! after which admissions of infectious agents consume one draw each.
mod sampling_algorithms;

use log::trace;
use rand::distr::uniform::{SampleRange, SampleUniform};
use rand::distr::weighted::WeightedIndex;
use rand::distr::Distribution;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

pub use sampling_algorithms::{sample_partition, sample_single_from_known_length};

use crate::error::CityError;

/// Tolerance on the sum of a [`Categorical`]'s probabilities.
const PROBABILITY_SUM_TOLERANCE: f64 = 1e-6;

/// A seeded random number generator shared by every construction step.
pub struct RandomStream {
    base_seed: u64,
    rng: StdRng,
}

impl RandomStream {
    #[must_use]
    pub fn new(base_seed: u64) -> Self {
        trace!("initializing random stream (seed={base_seed})");
        RandomStream {
            base_seed,
            rng: StdRng::seed_from_u64(base_seed),
        }
    }

    #[must_use]
    pub fn base_seed(&self) -> u64 {
        self.base_seed
    }

    /// Gets a random sample by applying the specified sampler function to the generator.
    pub fn sample<T>(&mut self, sampler: impl FnOnce(&mut StdRng) -> T) -> T {
        sampler(&mut self.rng)
    }

    /// Gets a random sample within the range provided by `range`.
    ///
    /// Panics if the range is empty; configuration validation rules that out for every range
    /// the city samples from.
    pub fn sample_range<S, T>(&mut self, range: S) -> T
    where
        S: SampleRange<T>,
        T: SampleUniform,
    {
        self.rng.random_range(range)
    }

    /// A uniform draw in `[0, 1)`.
    pub fn sample_uniform(&mut self) -> f64 {
        self.rng.random_range(0.0..1.0)
    }

    /// Returns true with probability `p`. Consumes exactly one uniform draw regardless of `p`.
    pub fn sample_bool(&mut self, p: f64) -> bool {
        self.sample_uniform() < p
    }

    /// Draws an index out of `categorical` according to its probabilities.
    pub fn sample_categorical(&mut self, categorical: &Categorical) -> usize {
        categorical.index.sample(&mut self.rng)
    }

    /// Chooses one element of `items` uniformly, or `None` if `items` is empty.
    pub fn choose<'a, T>(&mut self, items: &'a [T]) -> Option<&'a T> {
        sample_single_from_known_length(&mut self.rng, items.iter())
    }

    /// Splits `total` into `n` random non-negative shares that sum to `total`.
    pub fn random_partition(&mut self, n: usize, total: f64) -> Vec<f64> {
        sample_partition(&mut self.rng, n, total)
    }
}

/// A validated discrete probability distribution over the indices `0..len`.
///
/// Deserializes from a JSON array of probabilities; malformed input (empty, negative, non-finite,
/// or not summing to one) is rejected when the configuration is loaded.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(try_from = "Vec<f64>", into = "Vec<f64>")]
pub struct Categorical {
    probabilities: Vec<f64>,
    index: WeightedIndex<f64>,
}

impl Categorical {
    pub fn new(probabilities: Vec<f64>) -> Result<Self, CityError> {
        if probabilities.is_empty() {
            return Err(CityError::config("a categorical distribution needs at least one bin"));
        }
        if probabilities.iter().any(|p| !p.is_finite() || *p < 0.0) {
            return Err(CityError::config(format!(
                "probabilities must be finite and non-negative: {probabilities:?}"
            )));
        }
        let sum: f64 = probabilities.iter().sum();
        if (sum - 1.0).abs() > PROBABILITY_SUM_TOLERANCE {
            return Err(CityError::config(format!(
                "probabilities must sum to 1 (got {sum}): {probabilities:?}"
            )));
        }
        let index = WeightedIndex::new(&probabilities)
            .map_err(|e| CityError::config(format!("invalid distribution: {e}")))?;
        Ok(Categorical {
            probabilities,
            index,
        })
    }

    /// A distribution that always yields `value` out of `len` bins.
    pub fn certain(value: usize, len: usize) -> Result<Self, CityError> {
        if value >= len {
            return Err(CityError::config(format!(
                "certain outcome {value} is outside 0..{len}"
            )));
        }
        let mut probabilities = vec![0.0; len];
        probabilities[value] = 1.0;
        Categorical::new(probabilities)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.probabilities.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.probabilities.is_empty()
    }

    #[must_use]
    pub fn probabilities(&self) -> &[f64] {
        &self.probabilities
    }
}

impl TryFrom<Vec<f64>> for Categorical {
    type Error = CityError;

    fn try_from(probabilities: Vec<f64>) -> Result<Self, Self::Error> {
        Categorical::new(probabilities)
    }
}

impl From<Categorical> for Vec<f64> {
    fn from(categorical: Categorical) -> Self {
        categorical.probabilities
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::RngCore;

    #[test]
    fn same_seed_same_draws() {
        let mut a = RandomStream::new(42);
        let mut b = RandomStream::new(42);
        for _ in 0..10 {
            assert_eq!(a.sample(RngCore::next_u64), b.sample(RngCore::next_u64));
        }
    }

    #[test]
    fn different_seeds_diverge() {
        let mut a = RandomStream::new(42);
        let mut b = RandomStream::new(88);
        assert_eq!(b.base_seed(), 88);
        assert_ne!(a.sample(RngCore::next_u64), b.sample(RngCore::next_u64));
    }

    #[test]
    fn sample_range() {
        let mut stream = RandomStream::new(42);
        for _ in 0..100 {
            let result: i64 = stream.sample_range(-5..10);
            assert!((-5..10).contains(&result));
        }
    }

    #[test]
    fn sample_bool_extremes() {
        let mut stream = RandomStream::new(42);
        assert!((0..100).all(|_| !stream.sample_bool(0.0)));
        assert!((0..100).all(|_| stream.sample_bool(1.0)));
    }

    #[test]
    fn categorical_frequencies() {
        let mut stream = RandomStream::new(42);
        let categorical = Categorical::new(vec![1.0 / 3.0, 2.0 / 3.0]).unwrap();
        let n_samples = 3000;
        let zero_counter = (0..n_samples)
            .filter(|_| stream.sample_categorical(&categorical) == 0)
            .count();
        // The expected value of `zero_counter` is 1000.
        assert!((900..1100).contains(&zero_counter));
    }

    #[test]
    fn certain_categorical() {
        let mut stream = RandomStream::new(1);
        let categorical = Categorical::certain(3, 5).unwrap();
        assert_eq!(categorical.len(), 5);
        assert!((0..50).all(|_| stream.sample_categorical(&categorical) == 3));
        assert!(Categorical::certain(5, 5).is_err());
    }

    #[test]
    fn malformed_categoricals() {
        assert!(Categorical::new(vec![]).is_err());
        assert!(Categorical::new(vec![0.5, 0.4]).is_err());
        assert!(Categorical::new(vec![1.5, -0.5]).is_err());
        assert!(Categorical::new(vec![f64::NAN, 1.0]).is_err());
        assert!(Categorical::new(vec![0.0, 0.0]).is_err());
    }

    #[test]
    fn categorical_from_json() {
        let categorical: Categorical = serde_json::from_str("[0.25, 0.75]").unwrap();
        assert_eq!(categorical.probabilities(), &[0.25, 0.75]);
        assert_eq!(serde_json::to_string(&categorical).unwrap(), "[0.25,0.75]");

        let malformed: Result<Categorical, _> = serde_json::from_str("[0.25, 0.25]");
        assert!(malformed.is_err());
    }

    #[test]
    fn choose_from_slice() {
        let mut stream = RandomStream::new(42);
        let empty: [u8; 0] = [];
        assert!(stream.choose(&empty).is_none());
        let items = ["a", "b", "c"];
        let chosen = stream.choose(&items).unwrap();
        assert!(items.contains(chosen));
    }
}
