#![warn(missing_docs)]
#![warn(clippy::missing_docs_in_private_items)]

use std::path::PathBuf;

/// Failures that stop a grading run without producing a report.
///
/// None of these say anything about the quality of a submission; they are
/// caller mistakes or problems with the grading infrastructure.
#[derive(thiserror::Error, Debug)]
pub enum GradeError {
    /// The project number has no pipeline.
    #[error("There is no project {0}; expected one of 0-8, 10, 11, 12")]
    UnknownProject(u8),
    /// The chip is not part of the first hardware project.
    #[error("There is no chip named {0} in project 1")]
    UnknownChip(String),
    /// The submission path does not exist or is not a readable directory.
    #[error("Submission {} does not exist or is not a directory", .0.display())]
    SubmissionMissing(PathBuf),
    /// The fixture tree for a project is missing.
    #[error("Fixtures for the project are missing: {} does not exist", .0.display())]
    FixturesMissing(PathBuf),
    /// The caller cancelled the run between two tests.
    #[error("Grading was cancelled")]
    Cancelled,
    /// Any other infrastructure failure (workspace I/O, tool discovery).
    #[error(transparent)]
    Infrastructure(#[from] anyhow::Error),
}
