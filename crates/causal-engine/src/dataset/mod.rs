//! Deterministic synthetic datasets.
//!
//! Every lesson reveals specific numbers ("the naive effect is 20%", "the
//! morning shots land 4 inches from the centre"). Those numbers must not
//! change between visits, so every random generator here is driven by a
//! [`DatasetSeed`] through [`Pcg32`], whose output stream is fixed for a given
//! seed on every platform.
//!
//! - [`classroom`] - Students with confounded classroom hours and grades
//! - [`rifle`] - Rifle test shots for the hangover mystery
//! - [`territory`] - Retention series for the staggered territory rollout
//! - [`churn`] - Premium/free users with age, income and churn outcome
//!
//! # Example
//!
//! ```
//! use causal_engine::dataset::{DatasetSeed, classroom::{self, ClassroomParams}};
//!
//! let params = ClassroomParams::observational();
//! let first = classroom::generate(&params, DatasetSeed::new(42)).unwrap();
//! let second = classroom::generate(&params, DatasetSeed::new(42)).unwrap();
//! assert_eq!(first, second);
//! ```

use rand::{
    Rng, SeedableRng as _,
    distr::{Distribution, StandardUniform},
};
use rand_pcg::Pcg32;
use serde::{Deserialize, Serialize};

pub mod churn;
pub mod classroom;
pub mod rifle;
pub mod territory;

/// Seed for deterministic dataset generation.
///
/// Using the same seed (and the same parameters) always reproduces the same
/// records, bit for bit.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, derive_more::Display,
)]
#[serde(transparent)]
pub struct DatasetSeed(u64);

impl DatasetSeed {
    #[must_use]
    pub const fn new(seed: u64) -> Self {
        Self(seed)
    }

    #[must_use]
    pub const fn value(self) -> u64 {
        self.0
    }

    /// Creates the random number generator for this seed.
    #[must_use]
    pub fn rng(self) -> Pcg32 {
        Pcg32::seed_from_u64(self.0)
    }
}

/// Allows generating random `DatasetSeed` values with `rng.random()`.
impl Distribution<DatasetSeed> for StandardUniform {
    fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> DatasetSeed {
        DatasetSeed(rng.random())
    }
}

/// Invalid generator parameters.
#[derive(Debug, derive_more::Display, derive_more::Error)]
pub enum DatasetError {
    #[display("invalid normal distribution for {name}")]
    Normal {
        name: &'static str,
        source: rand_distr::NormalError,
    },
    #[display("invalid uniform range for {name}")]
    Uniform {
        name: &'static str,
        source: rand::distr::uniform::Error,
    },
    #[display("invalid probability for {name}: {value}")]
    Probability {
        name: &'static str,
        value: f64,
    },
    #[display("invalid range for {name}: [{low}, {high}]")]
    Range {
        name: &'static str,
        low: f64,
        high: f64,
    },
    #[display("{name} must be finite, got {value}")]
    NonFinite {
        name: &'static str,
        value: f64,
    },
    #[display("cannot generate {count} {name}, at most {} are supported", MAX_POPULATION)]
    Population {
        name: &'static str,
        count: usize,
    },
}

/// Upper bound on the number of records a single generator call produces.
pub const MAX_POPULATION: usize = 1_000_000;

pub(crate) fn check_population(name: &'static str, count: usize) -> Result<(), DatasetError> {
    if count <= MAX_POPULATION {
        Ok(())
    } else {
        Err(DatasetError::Population { name, count })
    }
}

pub(crate) fn check_finite<const N: usize>(
    values: [(&'static str, f64); N],
) -> Result<(), DatasetError> {
    match values.into_iter().find(|(_, value)| !value.is_finite()) {
        Some((name, value)) => Err(DatasetError::NonFinite { name, value }),
        None => Ok(()),
    }
}

pub(crate) fn check_range(
    name: &'static str,
    (low, high): (f64, f64),
) -> Result<(), DatasetError> {
    if low <= high {
        Ok(())
    } else {
        Err(DatasetError::Range { name, low, high })
    }
}

pub(crate) fn normal(
    name: &'static str,
    mean: f64,
    std_dev: f64,
) -> Result<rand_distr::Normal<f64>, DatasetError> {
    rand_distr::Normal::new(mean, std_dev).map_err(|source| DatasetError::Normal { name, source })
}

pub(crate) fn uniform(
    name: &'static str,
    low: f64,
    high: f64,
) -> Result<rand::distr::Uniform<f64>, DatasetError> {
    rand::distr::Uniform::new(low, high).map_err(|source| DatasetError::Uniform { name, source })
}
