use std::path::PathBuf;

use anyhow::bail;
use causal_engine::dataset::{
    DatasetSeed,
    churn::{self, ChurnParams, UserRecord},
    classroom::{self, ClassroomParams, StudentRecord},
    rifle::{self, AFTERNOON_HANGOVER_FACTOR, Session, Shot, Theory},
    territory::TerritorySeries,
};
use serde::Serialize;
use tracing::info;

use crate::util::{self, Output};

#[derive(Debug, Clone, clap::Args)]
pub(crate) struct DatasetArg {
    #[command(subcommand)]
    kind: DatasetKind,
    /// Write the dataset to this file instead of stdout
    #[clap(long, global = true)]
    output: Option<PathBuf>,
}

#[derive(Debug, Clone, clap::Subcommand)]
enum DatasetKind {
    /// Students with confounded classroom hours and grades
    Classroom {
        /// Generate the cohort with the extra-hours school rule
        #[clap(long)]
        rule_cohort: bool,
        /// Seed (defaults to the one used by the course)
        #[clap(long)]
        seed: Option<u64>,
        /// Number of students (defaults to the course cohort size)
        #[clap(long)]
        students: Option<usize>,
    },
    /// Premium and free users with age, income and churn
    Churn {
        /// observational, subset or generated
        #[clap(long, default_value = "observational")]
        pool: ChurnPool,
        /// Seed for the generated population
        #[clap(long, default_value_t = 42)]
        seed: u64,
        /// Size of the generated population
        #[clap(long, default_value_t = 200)]
        users: usize,
    },
    /// Rifle test shots for one theory and dial setting
    Rifle {
        /// warmup, food, fatigue or hangover
        #[clap(long, default_value = "hangover")]
        theory: TheoryArg,
        /// Dial value (defaults to the theory's default setting)
        #[clap(long)]
        value: Option<u8>,
        /// morning or afternoon
        #[clap(long, default_value = "morning")]
        session: SessionArg,
    },
    /// Retention series of the staggered territory rollout
    Territory,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, derive_more::FromStr)]
enum ChurnPool {
    Observational,
    Subset,
    Generated,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, derive_more::FromStr)]
enum TheoryArg {
    Warmup,
    Food,
    Fatigue,
    Hangover,
}

impl From<TheoryArg> for Theory {
    fn from(arg: TheoryArg) -> Self {
        match arg {
            TheoryArg::Warmup => Theory::Warmup,
            TheoryArg::Food => Theory::Food,
            TheoryArg::Fatigue => Theory::Fatigue,
            TheoryArg::Hangover => Theory::Hangover,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, derive_more::FromStr)]
enum SessionArg {
    Morning,
    Afternoon,
}

impl From<SessionArg> for Session {
    fn from(arg: SessionArg) -> Self {
        match arg {
            SessionArg::Morning => Session::Morning,
            SessionArg::Afternoon => Session::Afternoon,
        }
    }
}

#[derive(Debug, Serialize)]
struct ClassroomDump {
    seed: DatasetSeed,
    params: ClassroomParams,
    records: Vec<StudentRecord>,
}

#[derive(Debug, Serialize)]
struct ChurnDump {
    seed: Option<DatasetSeed>,
    users: Vec<UserRecord>,
}

#[derive(Debug, Serialize)]
struct RifleDump {
    theory: Theory,
    value: u8,
    session: Session,
    seed: DatasetSeed,
    hangover_severity: f64,
    shots: Vec<Shot>,
    accuracy_score: Option<f64>,
}

pub(crate) fn run(arg: &DatasetArg) -> anyhow::Result<()> {
    let DatasetArg { kind, output } = arg;
    util::init_tracing();

    match kind {
        DatasetKind::Classroom {
            rule_cohort,
            seed,
            students,
        } => {
            let (mut params, default_seed) = if *rule_cohort {
                (
                    ClassroomParams::rule_cohort(),
                    ClassroomParams::RULE_COHORT_SEED,
                )
            } else {
                (
                    ClassroomParams::observational(),
                    ClassroomParams::OBSERVATIONAL_SEED,
                )
            };
            if let Some(students) = students {
                params.students = *students;
            }
            let seed = seed.map_or(default_seed, DatasetSeed::new);
            let records = classroom::generate(&params, seed)?;
            info!(%seed, students = records.len(), "generated classroom dataset");
            Output::save_json(
                &ClassroomDump {
                    seed,
                    params,
                    records,
                },
                output.clone(),
            )?;
        }
        DatasetKind::Churn { pool, seed, users } => {
            let dump = match pool {
                ChurnPool::Observational => ChurnDump {
                    seed: None,
                    users: churn::observational_pool(),
                },
                ChurnPool::Subset => ChurnDump {
                    seed: None,
                    users: churn::matching_subset(),
                },
                ChurnPool::Generated => {
                    let params = ChurnParams {
                        users: *users,
                        ..ChurnParams::default()
                    };
                    let seed = DatasetSeed::new(*seed);
                    ChurnDump {
                        seed: Some(seed),
                        users: churn::generate(&params, seed)?,
                    }
                }
            };
            info!(pool = ?pool, users = dump.users.len(), "generated churn dataset");
            Output::save_json(&dump, output.clone())?;
        }
        DatasetKind::Rifle {
            theory,
            value,
            session,
        } => {
            let theory = Theory::from(*theory);
            let session = Session::from(*session);
            let dial = theory.dial();
            let value = value.unwrap_or(dial.default);
            if !dial.contains(value) {
                bail!(
                    "{} must be between {} and {}, got {value}",
                    dial.label,
                    dial.min,
                    dial.max
                );
            }
            let hangover_severity = match session {
                Session::Morning => theory.hangover_severity(value),
                Session::Afternoon => theory.hangover_severity(value) * AFTERNOON_HANGOVER_FACTOR,
            };
            let shots = rifle::generate(session, hangover_severity, theory, value)?;
            Output::save_json(
                &RifleDump {
                    theory,
                    value,
                    session,
                    seed: rifle::seed_for(value),
                    hangover_severity,
                    accuracy_score: rifle::accuracy_score(&shots),
                    shots,
                },
                output.clone(),
            )?;
        }
        DatasetKind::Territory => {
            Output::save_json(&TerritorySeries::generate(), output.clone())?;
        }
    }
    Ok(())
}
