//! Statistical helpers for the Casual Causality course.
//!
//! This crate provides the small set of estimators the lessons need to turn
//! synthetic records into the numbers they reveal:
//!
//! - **Descriptive statistics**: Calculate mean, median, variance, standard deviation
//! - **Coarsening**: Map continuous attributes onto ordered discrete buckets
//! - **Regression**: Least-squares trend lines and Pearson correlation for charts
//! - **Effects**: Mean differences, stratified effects, difference-in-differences
//!
//! # Modules
//!
//! - [`descriptive`]: Descriptive statistics for summarizing datasets
//! - [`coarsening`]: Threshold-based bucketing of continuous values
//! - [`regression`]: Linear fit and correlation (display only)
//! - [`effect`]: Treatment effect estimators
//!
//! # Examples
//!
//! ## Computing descriptive statistics
//!
//! ```
//! use causal_stats::descriptive::DescriptiveStats;
//!
//! let values = [1.0, 2.0, 3.0, 4.0, 5.0];
//! let stats = DescriptiveStats::new(values).unwrap();
//! assert_eq!(stats.mean, 3.0);
//! ```
//!
//! ## Coarsening a continuous attribute
//!
//! ```
//! use causal_stats::coarsening::bucketize;
//!
//! let labels = ["Young", "Middle-aged", "Older"];
//! assert_eq!(bucketize(30.0, &[30.0, 50.0], &labels), Ok(&"Middle-aged"));
//! assert_eq!(bucketize(50.0, &[30.0, 50.0], &labels), Ok(&"Older"));
//! ```
//!
//! ## Comparing two groups
//!
//! ```
//! use causal_stats::effect::mean_difference;
//!
//! let treated = [0.0, 1.0, 0.0, 0.0];
//! let control = [1.0, 1.0, 0.0, 1.0];
//! let effect = mean_difference(&treated, &control, |v| *v).unwrap();
//! assert_eq!(effect, 0.5);
//! ```

pub mod coarsening;
pub mod descriptive;
pub mod effect;
pub mod regression;
