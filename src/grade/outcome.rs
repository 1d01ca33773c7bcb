#![warn(missing_docs)]
#![warn(clippy::missing_docs_in_private_items)]

use std::fmt::Display;

use serde::{Deserialize, Serialize};

/// Classification of what happened to one test case.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutcomeKind {
    /// The test behaved like the reference.
    Pass,
    /// A required artifact was absent; the test was skipped.
    FileMissing,
    /// A plain-text artifact differs from the reference text.
    FileContents,
    /// The artifact stubs itself out with a built-in implementation.
    BuiltInDetected,
    /// A course tool reported a mismatch against the expected output.
    DiffFound,
    /// The assembler rejected the program.
    AssemblyError,
    /// A compiler rejected the source.
    CompileError,
    /// A comparison performed by the grader itself failed.
    TestFailed,
    /// Output appeared outside its expected directory and was moved.
    WrongOutputLocation,
    /// A library module fails only together with the other submitted modules.
    CombinationOnly,
}

impl OutcomeKind {
    /// Whether this outcome counts against the submission's score.
    pub fn is_failure(self) -> bool {
        !matches!(self, OutcomeKind::Pass | OutcomeKind::WrongOutputLocation)
    }

    /// Whether this outcome appears in the feedback text.
    pub fn is_negative(self) -> bool {
        self != OutcomeKind::Pass
    }

    /// Human readable explanation used in feedback.
    pub fn message(self) -> &'static str {
        match self {
            OutcomeKind::Pass => "passed",
            OutcomeKind::FileMissing => "required file is missing",
            OutcomeKind::FileContents => "file contents differ from the expected contents",
            OutcomeKind::BuiltInDetected => {
                "uses a built-in implementation instead of implementing it"
            }
            OutcomeKind::DiffFound => "output differs from the expected output",
            OutcomeKind::AssemblyError => "assembly failed",
            OutcomeKind::CompileError => "compilation failed",
            OutcomeKind::TestFailed => "test failed",
            OutcomeKind::WrongOutputLocation => "output file was written to the wrong directory",
            OutcomeKind::CombinationOnly => {
                "fails only together with the other submitted modules"
            }
        }
    }
}

impl Display for OutcomeKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            OutcomeKind::Pass => "pass",
            OutcomeKind::FileMissing => "file_missing",
            OutcomeKind::FileContents => "file_contents",
            OutcomeKind::BuiltInDetected => "built_in_detected",
            OutcomeKind::DiffFound => "diff_found",
            OutcomeKind::AssemblyError => "assembly_error",
            OutcomeKind::CompileError => "compile_error",
            OutcomeKind::TestFailed => "test_failed",
            OutcomeKind::WrongOutputLocation => "wrong_output_location",
            OutcomeKind::CombinationOnly => "combination_only",
        };
        f.write_str(name)
    }
}

/// An outcome together with the diagnostic that explains it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Outcome {
    /// What happened.
    pub kind:   OutcomeKind,
    /// Evaluator or comparison output, when there is any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

impl Outcome {
    /// An outcome without a diagnostic.
    pub fn bare(kind: OutcomeKind) -> Self {
        Self { kind, detail: None }
    }

    /// An outcome carrying `detail`, dropped when blank.
    pub fn with_detail(kind: OutcomeKind, detail: impl Into<String>) -> Self {
        let detail = detail.into();
        let detail = if detail.trim().is_empty() {
            None
        } else {
            Some(detail.trim().to_string())
        };
        Self { kind, detail }
    }

    /// The test passed.
    pub fn pass() -> Self {
        Self::bare(OutcomeKind::Pass)
    }

    /// The artifact was missing.
    pub fn file_missing() -> Self {
        Self::bare(OutcomeKind::FileMissing)
    }

    /// A course tool reported `diagnostic`.
    pub fn diff_found(diagnostic: impl Into<String>) -> Self {
        Self::with_detail(OutcomeKind::DiffFound, diagnostic)
    }

    /// A grader-side comparison failed with `reason`.
    pub fn test_failed(reason: impl Into<String>) -> Self {
        Self::with_detail(OutcomeKind::TestFailed, reason)
    }
}
