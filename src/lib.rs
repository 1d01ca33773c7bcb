//! # nandgrade
//!
//! Grading orchestration for the nand-to-tetris course projects: stages a
//! submission in a throwaway workspace, overlays reference fixtures, drives
//! the course tools test by test and turns their verdicts into a score and
//! feedback text.

#![warn(missing_docs)]
#![warn(clippy::missing_docs_in_private_items)]

/// File kinds the course tools read and write
pub mod artifact;
/// Cooperative cancellation of grading runs
pub mod cancel;
/// Directories, timeouts and languages
pub mod config;
/// Reserved names and canned messages
pub mod constants;
/// Errors that stop a run without a report
pub mod error;
/// Copying reference fixtures into workspaces
pub mod fixtures;
/// Outcomes, feedback and scores
pub mod grade;
/// Entry points running one grading pass
pub mod grader;
/// Hiding and revealing student artifacts
pub mod guard;
/// How student translators are built and run
pub mod languages;
/// Per-project grading pipelines
pub mod pipelines;
/// Running external programs with a deadline
pub mod process;
/// Reading and comparing submission text
pub mod text;
/// Gateway to the course tools
pub mod toolchain;
/// Filesystem helpers
pub mod util;
/// Per-run staging directories
pub mod workspace;

pub use cancel::Cancellation;
pub use config::GraderConfig;
pub use error::GradeError;
pub use grade::{Feedback, FeedbackEntry, Grade, Outcome, OutcomeKind, Report, Scoring};
pub use grader::{Grader, grade};
pub use pipelines::{Pipeline, Project};
pub use toolchain::{BuildOutcome, CommandToolchain, EvaluatorKind, Toolchain};
