//! Rifle test shots for the hangover mystery.
//!
//! A marksman shoots badly in the morning and well in the afternoon. Each
//! theory the player tries (warm-up, breakfast, fatigue, hangover) comes with
//! a dial. Only the hangover dial changes the spread of the shots; the other
//! dials add a slight visual variation so the player can see that turning
//! them does not help.

use rand::distr::Distribution as _;
use serde::{Deserialize, Serialize};

use super::{DatasetError, DatasetSeed, normal};

/// Shots fired per session.
pub const SHOTS_PER_SESSION: usize = 10;

const BASE_SPREAD: f64 = 2.0;
const HANGOVER_SPREAD: f64 = 3.0;
const MORNING_SPREAD: f64 = 0.2;
const RED_HERRING_SPREAD: f64 = 0.02;

/// Severity used whenever the active theory does not control drinking.
pub const DEFAULT_HANGOVER_SEVERITY: f64 = 0.8;
/// Fraction of the morning hangover that is left in the afternoon.
pub const AFTERNOON_HANGOVER_FACTOR: f64 = 0.3;

/// One shot, in inches from the bullseye.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Shot {
    pub x: f64,
    pub y: f64,
}

impl Shot {
    #[must_use]
    pub fn distance(&self) -> f64 {
        self.x.hypot(self.y)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, derive_more::Display)]
#[serde(rename_all = "snake_case")]
pub enum Session {
    #[display("morning")]
    Morning,
    #[display("afternoon")]
    Afternoon,
}

/// A candidate explanation for the bad morning shots.
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
#[serde(rename_all = "snake_case")]
pub enum Theory {
    #[display("not warmed up")]
    Warmup,
    #[display("needs breakfast")]
    Food,
    #[display("getting tired")]
    Fatigue,
    #[display("hangover")]
    Hangover,
}

/// The slider attached to a theory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Dial {
    pub label: &'static str,
    pub unit: &'static str,
    pub min: u8,
    pub max: u8,
    pub default: u8,
}

impl Dial {
    #[must_use]
    pub fn contains(&self, value: u8) -> bool {
        (self.min..=self.max).contains(&value)
    }
}

impl Theory {
    pub const ALL: [Self; 4] = [Self::Warmup, Self::Food, Self::Fatigue, Self::Hangover];

    #[must_use]
    pub const fn dial(self) -> Dial {
        match self {
            Self::Warmup => Dial {
                label: "work start time",
                unit: "AM",
                min: 6,
                max: 9,
                default: 9,
            },
            Self::Food => Dial {
                label: "breakfast amount",
                unit: "items",
                min: 0,
                max: 5,
                default: 2,
            },
            Self::Fatigue => Dial {
                label: "cups of coffee before shooting",
                unit: "cups",
                min: 0,
                max: 5,
                default: 2,
            },
            Self::Hangover => Dial {
                label: "pints last night",
                unit: "pints",
                min: 0,
                max: 8,
                default: 6,
            },
        }
    }

    /// Dial value around which a red-herring theory is neutral.
    const fn pivot(self) -> Option<f64> {
        match self {
            Self::Warmup => Some(9.0),
            Self::Food | Self::Fatigue => Some(2.5),
            Self::Hangover => None,
        }
    }

    /// Morning hangover severity in `[0, 1]` implied by this theory's dial.
    #[must_use]
    pub fn hangover_severity(self, value: u8) -> f64 {
        match self {
            Self::Hangover => (f64::from(value) / 6.0).min(1.0),
            _ => DEFAULT_HANGOVER_SEVERITY,
        }
    }
}

/// Seed derived from the dial value, so turning a dial reshuffles the shots.
#[must_use]
pub fn seed_for(value: u8) -> DatasetSeed {
    DatasetSeed::new(42 + 10 * u64::from(value))
}

/// Standard deviation of each shot coordinate.
#[must_use]
pub fn spread(session: Session, severity: f64, theory: Theory, value: u8) -> f64 {
    let mut base = BASE_SPREAD;
    if let Some(pivot) = theory.pivot() {
        base += RED_HERRING_SPREAD * (f64::from(value) - pivot).abs();
    }
    let session_spread = match session {
        Session::Morning => MORNING_SPREAD,
        Session::Afternoon => 0.0,
    };
    base + HANGOVER_SPREAD * severity + session_spread
}

/// Fires [`SHOTS_PER_SESSION`] shots. All x coordinates are drawn before the
/// y coordinates.
pub fn generate(
    session: Session,
    severity: f64,
    theory: Theory,
    value: u8,
) -> Result<Vec<Shot>, DatasetError> {
    let dist = normal("shot spread", 0.0, spread(session, severity, theory, value))?;
    let mut rng = seed_for(value).rng();
    let xs = (0..SHOTS_PER_SESSION)
        .map(|_| dist.sample(&mut rng))
        .collect::<Vec<_>>();
    let shots = xs
        .into_iter()
        .map(|x| Shot {
            x,
            y: dist.sample(&mut rng),
        })
        .collect();
    Ok(shots)
}

/// Mean distance from the bullseye, `None` without shots.
#[must_use]
pub fn accuracy_score(shots: &[Shot]) -> Option<f64> {
    causal_stats::descriptive::mean(shots.iter().map(Shot::distance))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_spread_components() {
        assert!((spread(Session::Afternoon, 0.0, Theory::Hangover, 0) - 2.0).abs() < 1e-12);
        assert!((spread(Session::Morning, 0.8, Theory::Hangover, 6) - 4.6).abs() < 1e-12);
        // three hours early adds 0.06
        assert!((spread(Session::Afternoon, 0.0, Theory::Warmup, 6) - 2.06).abs() < 1e-12);
        assert!((spread(Session::Afternoon, 0.0, Theory::Food, 5) - 2.05).abs() < 1e-12);
    }

    #[test]
    fn test_hangover_severity() {
        assert_eq!(Theory::Hangover.hangover_severity(0), 0.0);
        assert_eq!(Theory::Hangover.hangover_severity(3), 0.5);
        assert_eq!(Theory::Hangover.hangover_severity(8), 1.0);
        assert_eq!(Theory::Warmup.hangover_severity(6), DEFAULT_HANGOVER_SEVERITY);
    }

    #[test]
    fn test_shots_are_reproducible() {
        let a = generate(Session::Morning, 0.8, Theory::Fatigue, 2).unwrap();
        let b = generate(Session::Morning, 0.8, Theory::Fatigue, 2).unwrap();
        assert_eq!(a.len(), SHOTS_PER_SESSION);
        assert_eq!(a, b);

        let c = generate(Session::Morning, 0.8, Theory::Fatigue, 3).unwrap();
        assert_ne!(a, c);
    }

    #[test]
    fn test_sober_morning_is_more_accurate() {
        let hungover = generate(Session::Morning, 1.0, Theory::Hangover, 6).unwrap();
        let sober = generate(Session::Morning, 0.0, Theory::Hangover, 6).unwrap();
        // same seed, so the sober shots are the hungover ones scaled down
        let ratio = accuracy_score(&sober).unwrap() / accuracy_score(&hungover).unwrap();
        assert!((ratio - 2.2 / 5.2).abs() < 1e-9);
    }

    #[test]
    fn test_dial_ranges() {
        for theory in Theory::ALL {
            let dial = theory.dial();
            assert!(dial.contains(dial.default));
            assert!(!dial.contains(dial.max + 1));
        }
        assert!(accuracy_score(&[]).is_none());
    }
}
