//! Premium and free users with age, income and churn outcome.
//!
//! Older, richer users both buy premium more often and churn less, so
//! comparing premium against free churn directly overstates what premium
//! does. Two fixed pools are used by the matching lesson:
//!
//! - [`observational_pool`] - 10 premium and 15 free users shown while the
//!   confounding is explained; the naive effect is always computed on it.
//! - [`matching_subset`] - 5 premium and 8 free users where every premium
//!   user has at least one free user in the same age/income buckets.
//!
//! [`generate`] produces arbitrary-size populations with the same
//! confounding structure.

use std::sync::LazyLock;

use rand::{Rng as _, distr::Distribution as _};
use serde::{Deserialize, Serialize};

use causal_stats::coarsening::Coarsening;

use super::{DatasetError, DatasetSeed, check_finite, check_population, check_range, normal};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, derive_more::Display)]
#[serde(rename_all = "snake_case")]
pub enum Tier {
    #[display("premium")]
    Premium,
    #[display("free")]
    Free,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UserRecord {
    pub id: String,
    pub tier: Tier,
    pub age: u32,
    pub income: u32,
    pub churned: bool,
}

impl UserRecord {
    fn new(id: impl Into<String>, tier: Tier, age: u32, income: u32, churned: bool) -> Self {
        Self {
            id: id.into(),
            tier,
            age,
            income,
            churned,
        }
    }

    #[must_use]
    pub fn age_bucket(&self) -> AgeBucket {
        AgeBucket::of(self.age)
    }

    #[must_use]
    pub fn income_bucket(&self) -> IncomeBucket {
        IncomeBucket::of(self.income)
    }

    #[must_use]
    pub fn buckets(&self) -> Buckets {
        Buckets {
            age: self.age_bucket(),
            income: self.income_bucket(),
        }
    }

    /// Churn as a 0/1 outcome.
    #[must_use]
    pub fn churn_outcome(&self) -> f64 {
        f64::from(u8::from(self.churned))
    }
}

pub const AGE_THRESHOLDS: [f64; 2] = [30.0, 50.0];
pub const INCOME_THRESHOLDS: [f64; 2] = [40_000.0, 80_000.0];

static AGE_COARSENING: LazyLock<Coarsening<AgeBucket>> = LazyLock::new(|| {
    Coarsening::new(AGE_THRESHOLDS.to_vec(), AgeBucket::ALL.to_vec())
        .expect("age thresholds should match the bucket labels")
});

static INCOME_COARSENING: LazyLock<Coarsening<IncomeBucket>> = LazyLock::new(|| {
    Coarsening::new(INCOME_THRESHOLDS.to_vec(), IncomeBucket::ALL.to_vec())
        .expect("income thresholds should match the bucket labels")
});

#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    derive_more::Display,
)]
pub enum AgeBucket {
    #[display("Young")]
    Young,
    #[display("Middle-aged")]
    MiddleAged,
    #[display("Older")]
    Older,
}

impl AgeBucket {
    pub const ALL: [Self; 3] = [Self::Young, Self::MiddleAged, Self::Older];

    #[must_use]
    pub fn of(age: u32) -> Self {
        *AGE_COARSENING.bucket(f64::from(age))
    }

    #[must_use]
    pub fn coarsening() -> &'static Coarsening<Self> {
        &AGE_COARSENING
    }
}

#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    derive_more::Display,
)]
pub enum IncomeBucket {
    #[display("Low")]
    Low,
    #[display("Medium")]
    Medium,
    #[display("High")]
    High,
}

impl IncomeBucket {
    pub const ALL: [Self; 3] = [Self::Low, Self::Medium, Self::High];

    #[must_use]
    pub fn of(income: u32) -> Self {
        *INCOME_COARSENING.bucket(f64::from(income))
    }

    #[must_use]
    pub fn coarsening() -> &'static Coarsening<Self> {
        &INCOME_COARSENING
    }
}

/// Coarsened age and income of one user.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, derive_more::Display,
)]
#[display("{age}/{income}")]
pub struct Buckets {
    pub age: AgeBucket,
    pub income: IncomeBucket,
}

const OBSERVATIONAL_PREMIUM: [(u32, u32, bool); 10] = [
    (45, 85_000, false),
    (52, 95_000, true),
    (38, 65_000, false),
    (41, 75_000, false),
    (29, 45_000, true),
    (48, 90_000, false),
    (43, 72_000, true),
    (55, 105_000, false),
    (35, 58_000, false),
    (27, 42_000, true),
];

const OBSERVATIONAL_FREE: [(u32, u32, bool); 15] = [
    (26, 35_000, true),
    (31, 42_000, true),
    (44, 68_000, false),
    (28, 38_000, true),
    (50, 82_000, false),
    (39, 55_000, true),
    (24, 32_000, true),
    (33, 48_000, true),
    (47, 78_000, false),
    (29, 41_000, true),
    (36, 52_000, false),
    (53, 88_000, false),
    (25, 36_000, true),
    (42, 64_000, true),
    (49, 76_000, false),
];

const SUBSET_PREMIUM: [(u32, u32, bool); 5] = [
    (52, 85_000, false),
    (38, 55_000, false),
    (28, 45_000, true),
    (41, 35_000, true),
    (25, 38_000, true),
];

const SUBSET_FREE: [(u32, u32, bool); 8] = [
    (53, 88_000, false),
    (51, 92_000, true),
    (42, 55_000, false),
    (39, 35_000, true),
    (44, 32_000, true),
    (29, 42_000, true),
    (27, 38_000, false),
    (26, 35_000, true),
];

fn build_pool(premium: &[(u32, u32, bool)], free: &[(u32, u32, bool)]) -> Vec<UserRecord> {
    let premium = premium
        .iter()
        .enumerate()
        .map(|(i, &(age, income, churned))| {
            UserRecord::new(format!("P{}", i + 1), Tier::Premium, age, income, churned)
        });
    let free = free
        .iter()
        .enumerate()
        .map(|(i, &(age, income, churned))| {
            UserRecord::new(format!("F{}", i + 1), Tier::Free, age, income, churned)
        });
    premium.chain(free).collect()
}

/// The large illustrative pool: premium users P1-P10, then free users F1-F15.
#[must_use]
pub fn observational_pool() -> Vec<UserRecord> {
    build_pool(&OBSERVATIONAL_PREMIUM, &OBSERVATIONAL_FREE)
}

/// The small pool used in the matching game: P1-P5, then F1-F8.
#[must_use]
pub fn matching_subset() -> Vec<UserRecord> {
    build_pool(&SUBSET_PREMIUM, &SUBSET_FREE)
}

/// Parameters for a confounded population.
///
/// Premium take-up is logistic in age and income; churn probability is
/// linear in age, income and tier, clamped to `churn_range`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ChurnParams {
    pub users: usize,
    pub age_mean: f64,
    pub age_std_dev: f64,
    pub age_range: (f64, f64),
    pub income_base: f64,
    pub income_per_year: f64,
    pub income_noise_std_dev: f64,
    pub income_range: (f64, f64),
    pub premium_logit_base: f64,
    pub premium_logit_per_year: f64,
    pub premium_logit_per_10k_income: f64,
    pub churn_base: f64,
    pub churn_per_year: f64,
    pub churn_per_10k_income: f64,
    pub churn_premium_effect: f64,
    pub churn_range: (f64, f64),
}

impl Default for ChurnParams {
    fn default() -> Self {
        Self {
            users: 200,
            age_mean: 38.0,
            age_std_dev: 10.0,
            age_range: (18.0, 75.0),
            income_base: 20_000.0,
            income_per_year: 1_200.0,
            income_noise_std_dev: 10_000.0,
            income_range: (15_000.0, 200_000.0),
            premium_logit_base: -6.0,
            premium_logit_per_year: 0.05,
            premium_logit_per_10k_income: 0.4,
            churn_base: 0.75,
            churn_per_year: -0.008,
            churn_per_10k_income: -0.03,
            churn_premium_effect: -0.1,
            churn_range: (0.05, 0.95),
        }
    }
}

fn check_probability(name: &'static str, value: f64) -> Result<(), DatasetError> {
    if (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(DatasetError::Probability { name, value })
    }
}

/// Ages and incomes are stored as `u32`, so their ranges must lie within it.
fn check_unsigned_range(name: &'static str, range: (f64, f64)) -> Result<(), DatasetError> {
    check_range(name, range)?;
    let (low, high) = range;
    if low >= 0.0 && high <= f64::from(u32::MAX) {
        Ok(())
    } else {
        Err(DatasetError::Range { name, low, high })
    }
}

/// Generates `params.users` users; ids are numbered per tier in order of
/// appearance.
#[expect(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn generate(params: &ChurnParams, seed: DatasetSeed) -> Result<Vec<UserRecord>, DatasetError> {
    check_population("users", params.users)?;
    check_finite([
        ("age mean", params.age_mean),
        ("income base", params.income_base),
        ("income per year", params.income_per_year),
        ("premium logit base", params.premium_logit_base),
        ("premium logit per year", params.premium_logit_per_year),
        ("premium logit per 10k income", params.premium_logit_per_10k_income),
        ("churn base", params.churn_base),
        ("churn per year", params.churn_per_year),
        ("churn per 10k income", params.churn_per_10k_income),
        ("churn premium effect", params.churn_premium_effect),
    ])?;
    check_probability("minimum churn", params.churn_range.0)?;
    check_probability("maximum churn", params.churn_range.1)?;
    check_range("churn", params.churn_range)?;
    check_unsigned_range("age", params.age_range)?;
    check_unsigned_range("income", params.income_range)?;
    let age_dist = normal("age", params.age_mean, params.age_std_dev)?;
    let income_noise = normal("income noise", 0.0, params.income_noise_std_dev)?;

    let mut rng = seed.rng();
    let mut premium_count = 0;
    let mut free_count = 0;
    let mut users = vec![];
    for _ in 0..params.users {
        let age = age_dist
            .sample(&mut rng)
            .clamp(params.age_range.0, params.age_range.1)
            .round();
        let income = (params.income_base
            + params.income_per_year * age
            + income_noise.sample(&mut rng))
        .clamp(params.income_range.0, params.income_range.1)
        .round();

        let logit = params.premium_logit_base
            + params.premium_logit_per_year * age
            + params.premium_logit_per_10k_income * income / 10_000.0;
        let premium_probability = 1.0 / (1.0 + (-logit).exp());
        // Finite but huge coefficients can still overflow into NaN.
        check_probability("premium take-up", premium_probability)?;
        let tier = if rng.random_bool(premium_probability) {
            Tier::Premium
        } else {
            Tier::Free
        };

        let premium_effect = match tier {
            Tier::Premium => params.churn_premium_effect,
            Tier::Free => 0.0,
        };
        let churn_probability = (params.churn_base
            + params.churn_per_year * (age - params.age_range.0)
            + params.churn_per_10k_income * income / 10_000.0
            + premium_effect)
            .clamp(params.churn_range.0, params.churn_range.1);
        check_probability("churn", churn_probability)?;
        let churned = rng.random_bool(churn_probability);

        let id = match tier {
            Tier::Premium => {
                premium_count += 1;
                format!("P{premium_count}")
            }
            Tier::Free => {
                free_count += 1;
                format!("F{free_count}")
            }
        };
        users.push(UserRecord::new(id, tier, age as u32, income as u32, churned));
    }
    Ok(users)
}
