//! Lesson engine for the Casual Causality course.
//!
//! The course walks through six interactive lessons on causal inference.
//! This crate holds everything behind the presentation layer:
//!
//! - [`dataset`]: Deterministic synthetic datasets the lessons reveal
//! - [`lesson`]: One forward-only state machine per lesson
//! - [`matching`]: The coarsened exact matching mini-game
//! - [`action`]: User actions, as sent by any presentation layer
//! - [`course`]: The active-lesson selector and action dispatch
//!
//! # Example
//!
//! ```
//! use causal_engine::{
//!     action::Action,
//!     course::{Course, CourseView},
//!     lesson::LessonId,
//! };
//!
//! let mut course = Course::new();
//! course
//!     .dispatch(&Action::Enter { lesson: LessonId::WhatIsCausality })
//!     .unwrap();
//! let CourseView::Lesson(view) = course.dispatch(&Action::Advance).unwrap() else {
//!     unreachable!();
//! };
//! assert_eq!(view.step, 2);
//! assert!(view.sections.contains(&"pattern"));
//! ```

pub mod action;
pub mod course;
pub mod dataset;
pub mod lesson;
pub mod matching;
