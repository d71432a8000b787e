//! Classroom hours versus grades, with confounders.
//!
//! Motivation, teacher quality and family support push up both the hours a
//! student spends in class and their grade. The observational cohort lets
//! students choose their hours, so the hours/grade slope is inflated. The
//! rule cohort adds forced extra hours that are independent of the
//! confounders and carries the (much smaller) true causal effect.

use rand::{Rng as _, distr::Distribution as _};
use serde::Serialize;

use super::{DatasetError, DatasetSeed, check_population, check_range, normal, uniform};

/// Teacher quality levels; each student is assigned one uniformly.
pub const TEACHER_QUALITY_LEVELS: [f64; 4] = [30.0, 50.0, 70.0, 90.0];

/// Linear model linking confounders to classroom hours and grades.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ClassroomParams {
    pub students: usize,
    pub motivation_mean: f64,
    pub motivation_std_dev: f64,
    pub family_support_mean: f64,
    pub family_support_std_dev: f64,
    pub base_hours: f64,
    pub hours_per_motivation: f64,
    pub hours_per_family_support: f64,
    pub hours_per_teacher_quality: f64,
    pub hours_noise_std_dev: f64,
    pub hours_range: (f64, f64),
    /// Range of hours forced on top of the chosen hours, if a rule applies.
    pub forced_extra_hours: Option<(f64, f64)>,
    pub base_grade: f64,
    pub grade_per_motivation: f64,
    pub grade_per_family_support: f64,
    pub grade_per_teacher_quality: f64,
    pub grade_per_hour: f64,
    pub grade_noise_std_dev: f64,
    pub grade_range: (f64, f64),
}

impl ClassroomParams {
    /// Seed used by the lessons for the observational cohort.
    pub const OBSERVATIONAL_SEED: DatasetSeed = DatasetSeed::new(42);
    /// Seed used by the lessons for the rule cohort.
    pub const RULE_COHORT_SEED: DatasetSeed = DatasetSeed::new(43);

    /// Students choose their own hours; half a grade point per hour.
    #[must_use]
    pub const fn observational() -> Self {
        Self {
            students: 500,
            motivation_mean: 50.0,
            motivation_std_dev: 15.0,
            family_support_mean: 60.0,
            family_support_std_dev: 20.0,
            base_hours: 15.0,
            hours_per_motivation: 0.3,
            hours_per_family_support: 0.2,
            hours_per_teacher_quality: 0.1,
            hours_noise_std_dev: 3.0,
            hours_range: (5.0, 40.0),
            forced_extra_hours: None,
            base_grade: 50.0,
            grade_per_motivation: 0.4,
            grade_per_family_support: 0.3,
            grade_per_teacher_quality: 0.2,
            grade_per_hour: 0.5,
            grade_noise_std_dev: 5.0,
            grade_range: (0.0, 100.0),
        }
    }

    /// A school rule forces 3-8 extra hours; the true effect is 0.2 points
    /// per hour.
    #[must_use]
    pub const fn rule_cohort() -> Self {
        Self {
            hours_noise_std_dev: 2.0,
            hours_range: (5.0, 45.0),
            forced_extra_hours: Some((3.0, 8.0)),
            grade_per_hour: 0.2,
            ..Self::observational()
        }
    }
}

/// One simulated student.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct StudentRecord {
    pub classroom_hours: f64,
    pub grade: f64,
    pub motivation: f64,
    pub teacher_quality: f64,
    pub family_support: f64,
    pub forced_extra_hours: Option<f64>,
}

/// Generates `params.students` records.
pub fn generate(
    params: &ClassroomParams,
    seed: DatasetSeed,
) -> Result<Vec<StudentRecord>, DatasetError> {
    check_population("students", params.students)?;
    check_range("classroom hours", params.hours_range)?;
    check_range("grade", params.grade_range)?;
    let motivation_dist = normal(
        "motivation",
        params.motivation_mean,
        params.motivation_std_dev,
    )?;
    let family_dist = normal(
        "family support",
        params.family_support_mean,
        params.family_support_std_dev,
    )?;
    let forced_dist = params
        .forced_extra_hours
        .map(|(low, high)| uniform("forced extra hours", low, high))
        .transpose()?;
    let hours_noise = normal("hours noise", 0.0, params.hours_noise_std_dev)?;
    let grade_noise = normal("grade noise", 0.0, params.grade_noise_std_dev)?;

    let mut rng = seed.rng();
    let records = (0..params.students)
        .map(|_| {
            let motivation = motivation_dist.sample(&mut rng);
            let teacher_quality =
                TEACHER_QUALITY_LEVELS[rng.random_range(0..TEACHER_QUALITY_LEVELS.len())];
            let family_support = family_dist.sample(&mut rng);
            let forced_extra_hours = forced_dist.as_ref().map(|dist| dist.sample(&mut rng));

            let classroom_hours = (params.base_hours
                + params.hours_per_motivation * motivation
                + params.hours_per_family_support * family_support
                + params.hours_per_teacher_quality * (teacher_quality - 50.0)
                + forced_extra_hours.unwrap_or(0.0)
                + hours_noise.sample(&mut rng))
            .clamp(params.hours_range.0, params.hours_range.1);

            let grade = (params.base_grade
                + params.grade_per_motivation * motivation
                + params.grade_per_family_support * family_support
                + params.grade_per_teacher_quality * (teacher_quality - 50.0)
                + params.grade_per_hour * classroom_hours
                + grade_noise.sample(&mut rng))
            .clamp(params.grade_range.0, params.grade_range.1);

            StudentRecord {
                classroom_hours,
                grade,
                motivation,
                teacher_quality,
                family_support,
                forced_extra_hours,
            }
        })
        .collect();
    Ok(records)
}

/// Splits records into `(hours, grades)` columns for charting and fitting.
#[must_use]
pub fn hours_and_grades(records: &[StudentRecord]) -> (Vec<f64>, Vec<f64>) {
    records
        .iter()
        .map(|r| (r.classroom_hours, r.grade))
        .unzip()
}

#[cfg(test)]
mod tests {
    use causal_stats::{
        descriptive::mean,
        regression::{LinearFit, correlation},
    };

    use super::*;

    fn observational() -> Vec<StudentRecord> {
        generate(
            &ClassroomParams::observational(),
            ClassroomParams::OBSERVATIONAL_SEED,
        )
        .unwrap()
    }

    fn rule_cohort() -> Vec<StudentRecord> {
        generate(
            &ClassroomParams::rule_cohort(),
            ClassroomParams::RULE_COHORT_SEED,
        )
        .unwrap()
    }

    #[test]
    fn test_generation_is_deterministic() {
        assert_eq!(observational(), observational());
        assert_eq!(rule_cohort(), rule_cohort());
        assert_ne!(observational(), rule_cohort());
    }

    #[test]
    fn test_values_respect_clipping() {
        for record in observational() {
            assert!((5.0..=40.0).contains(&record.classroom_hours));
            assert!((0.0..=100.0).contains(&record.grade));
            assert!(TEACHER_QUALITY_LEVELS.contains(&record.teacher_quality));
            assert!(record.forced_extra_hours.is_none());
        }
        for record in rule_cohort() {
            assert!((5.0..=45.0).contains(&record.classroom_hours));
            let forced = record.forced_extra_hours.unwrap();
            assert!((3.0..8.0).contains(&forced));
        }
    }

    #[test]
    fn test_rule_cohort_attends_more() {
        let observational = observational();
        let rule = rule_cohort();
        assert_eq!(observational.len(), 500);

        let obs_hours = mean(observational.iter().map(|r| r.classroom_hours)).unwrap();
        let rule_hours = mean(rule.iter().map(|r| r.classroom_hours)).unwrap();
        assert!(rule_hours > obs_hours + 2.0);

        // confounders push hours and grades up together
        let (xs, ys) = hours_and_grades(&observational);
        assert!(correlation(&xs, &ys).unwrap() > 0.0);
        assert!(LinearFit::new(&xs, &ys).unwrap().slope > 0.0);
    }

    #[test]
    fn test_invalid_params() {
        let params = ClassroomParams {
            motivation_std_dev: -1.0,
            ..ClassroomParams::observational()
        };
        assert!(generate(&params, DatasetSeed::new(1)).is_err());
    }

    #[test]
    fn test_oversized_class_is_rejected() {
        let params = ClassroomParams {
            students: usize::MAX,
            ..ClassroomParams::observational()
        };
        assert!(matches!(
            generate(&params, DatasetSeed::new(1)),
            Err(DatasetError::Population {
                name: "students",
                ..
            })
        ));
    }
}
