#![warn(missing_docs)]
#![warn(clippy::missing_docs_in_private_items)]

//! Per-project grading pipelines and the registry selecting them.
//!
//! Every pipeline follows the same shape: normalize the workspace layout,
//! overlay fixtures, run each test through the toolchain, record outcomes, and
//! hand the log back as a [`Report`]. The variation between projects lives in
//! the static descriptors below.

/// Hardware chip projects.
pub mod chips;
/// The full computer project.
pub mod computer;
/// The operating system library project.
pub mod library;
/// The machine language project.
pub mod machine;
/// The plain-text warm-up project.
pub mod text;
/// Projects where students write a translator.
pub mod translator;

use std::{
    collections::BTreeMap,
    fmt::Display,
    path::{Path, PathBuf},
    sync::LazyLock,
};

use serde::Serialize;

use crate::{
    artifact::ArtifactKind,
    cancel::Cancellation,
    error::GradeError,
    fixtures::FixtureInjector,
    grade::{Report, Scoring},
    languages::LanguageTable,
    toolchain::{EvaluatorKind, Toolchain},
};

/// A gradable course project.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum Project {
    /// Submitting a text file.
    P0,
    /// Boolean logic.
    P1,
    /// Boolean arithmetic.
    P2,
    /// Sequential logic.
    P3,
    /// Machine language.
    P4,
    /// Computer architecture.
    P5,
    /// Assembler.
    P6,
    /// VM translator, stack arithmetic.
    P7,
    /// VM translator, program control.
    P8,
    /// Jack syntax analyzer.
    P10,
    /// Jack compiler.
    P11,
    /// Operating system.
    P12,
}

impl Project {
    /// Every gradable project in course order.
    pub fn all() -> [Project; 12] {
        [
            Project::P0,
            Project::P1,
            Project::P2,
            Project::P3,
            Project::P4,
            Project::P5,
            Project::P6,
            Project::P7,
            Project::P8,
            Project::P10,
            Project::P11,
            Project::P12,
        ]
    }

    /// Course number of the project.
    pub fn number(self) -> u8 {
        match self {
            Project::P0 => 0,
            Project::P1 => 1,
            Project::P2 => 2,
            Project::P3 => 3,
            Project::P4 => 4,
            Project::P5 => 5,
            Project::P6 => 6,
            Project::P7 => 7,
            Project::P8 => 8,
            Project::P10 => 10,
            Project::P11 => 11,
            Project::P12 => 12,
        }
    }

    /// Pipeline grading this project.
    pub fn pipeline(self) -> &'static Pipeline {
        &REGISTRY[&self]
    }
}

impl TryFrom<u8> for Project {
    type Error = GradeError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Project::all()
            .into_iter()
            .find(|p| p.number() == value)
            .ok_or(GradeError::UnknownProject(value))
    }
}

impl Display for Project {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "project {}", self.number())
    }
}

/// Tests of the hardware chip projects.
#[derive(Debug, Clone)]
pub struct ChipSuite {
    /// Chips evaluated, one test script each.
    pub chips: &'static [&'static str],
}

/// Tests of the machine language project.
#[derive(Debug, Clone)]
pub struct MachineSuite {
    /// Programs assembled and emulated.
    pub programs: &'static [&'static str],
}

/// Tests of the computer architecture project.
#[derive(Debug, Clone)]
pub struct ComputerSuite {
    /// Chips tested on their own.
    pub parts:           &'static [&'static str],
    /// Top-level chip integrating the parts.
    pub computer:        &'static str,
    /// Whole-computer test scripts, all reported under [`ComputerSuite::computer`].
    pub programs:        &'static [&'static str],
    /// `(part, reference)` pairs: the reference file replaces the part before
    /// the whole-computer tests run.
    pub reference_parts: &'static [(&'static str, &'static str)],
}

/// How a translator project judges one test's output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputCheck {
    /// Compare the output file with `<test>.cmp` ignoring whitespace.
    CompareFiles,
    /// Run the test script of the same name in a course tool.
    Emulate(EvaluatorKind),
    /// Compare every `.xml` with the `.cmp` of the same name in the test directory.
    SyntaxTrees,
}

/// Where a translator project expects its output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFile {
    /// `<test>/<test>.<ext>`
    NamedAfterTest,
    /// `<test>/<name>.<ext>`
    Fixed(&'static str),
}

/// Tests of a project where students write a translator.
#[derive(Debug, Clone)]
pub struct TranslatorSuite {
    /// Conventional name of the student's program.
    pub program:        &'static str,
    /// Tests run when the student ships a translator.
    pub tests:          &'static [&'static str],
    /// Tests run when the student ships translated output instead.
    pub prebuilt_tests: Option<&'static [&'static str]>,
    /// Tests whose input is a single file rather than a directory.
    pub single_file:    &'static [&'static str],
    /// Kind of the single input file.
    pub input:          ArtifactKind,
    /// Kind of the produced output.
    pub output:         ArtifactKind,
    /// Where the output lands.
    pub output_file:    OutputFile,
    /// How the output is judged.
    pub check:          OutputCheck,
}

impl TranslatorSuite {
    /// Each applicable test in the given mode is worth the same share.
    pub fn scoring(&self, prebuilt: bool) -> Scoring {
        Scoring::PerTest(self.tests_for(prebuilt).len())
    }

    /// Tests applicable in the given mode.
    pub fn tests_for(&self, prebuilt: bool) -> &'static [&'static str] {
        match (prebuilt, self.prebuilt_tests) {
            (true, Some(tests)) => tests,
            _ => self.tests,
        }
    }

    /// Input handed to the translator for `test` inside `root`.
    pub fn input_for(&self, root: &Path, test: &str) -> PathBuf {
        let dir = root.join(test);
        if self.single_file.contains(&test) {
            self.input.file_in(&dir, test)
        } else {
            dir
        }
    }

    /// Where the output of `test` is expected inside `root`.
    pub fn output_for(&self, root: &Path, test: &str) -> PathBuf {
        let dir = root.join(test);
        match self.output_file {
            OutputFile::NamedAfterTest => self.output.file_in(&dir, test),
            OutputFile::Fixed(name) => self.output.file_in(&dir, name),
        }
    }
}

/// Tests of the operating system project.
#[derive(Debug, Clone)]
pub struct LibrarySuite {
    /// Library modules compiled from the submission.
    pub modules:     &'static [&'static str],
    /// Modules with a dedicated test program in `<module>Test/`.
    pub tested:      &'static [&'static str],
    /// Fixture directory holding the compiled reference library.
    pub reference:   &'static str,
    /// Workspace directory collecting the student's compiled modules.
    pub student_dir: &'static str,
}

impl LibrarySuite {
    /// Every module and every module test is worth the same share.
    pub fn scoring(&self) -> Scoring {
        Scoring::PerTest(self.modules.len() + self.tested.len())
    }

    /// Directory and test script name of the test program for `module`.
    pub fn test_name(module: &str) -> String {
        format!("{module}Test")
    }
}

/// Grading procedure of one project.
#[derive(Debug, Clone)]
pub enum Pipeline {
    /// Compare one text file with a reference.
    Text,
    /// Evaluate chips one at a time in the hardware simulator.
    Chips(ChipSuite),
    /// Assemble then emulate programs.
    Machine(MachineSuite),
    /// Evaluate parts, then the whole computer against reference parts.
    Computer(ComputerSuite),
    /// Build and run the student's translator.
    Translator(TranslatorSuite),
    /// Compile library modules and test them in and out of combination.
    Library(LibrarySuite),
}

impl Pipeline {
    /// Names of the tests this pipeline reports on.
    pub fn tests(&self) -> Vec<String> {
        match self {
            Pipeline::Text => vec![crate::constants::PROJECT0_ARTIFACT.to_string()],
            Pipeline::Chips(suite) => suite.chips.iter().map(|s| s.to_string()).collect(),
            Pipeline::Machine(suite) => suite.programs.iter().map(|s| s.to_string()).collect(),
            Pipeline::Computer(suite) => suite
                .parts
                .iter()
                .chain(std::iter::once(&suite.computer))
                .map(|s| s.to_string())
                .collect(),
            Pipeline::Translator(suite) => suite.tests.iter().map(|s| s.to_string()).collect(),
            Pipeline::Library(suite) => suite
                .tested
                .iter()
                .map(|m| LibrarySuite::test_name(m))
                .collect(),
        }
    }

    /// Runs the pipeline inside the context's workspace.
    pub async fn run<T: Toolchain>(&self, ctx: &RunContext<'_, T>) -> Result<Report, GradeError> {
        match self {
            Pipeline::Text => text::run(ctx).await,
            Pipeline::Chips(suite) => chips::run(ctx, suite).await,
            Pipeline::Machine(suite) => machine::run(ctx, suite).await,
            Pipeline::Computer(suite) => computer::run(ctx, suite).await,
            Pipeline::Translator(suite) => translator::run(ctx, suite).await,
            Pipeline::Library(suite) => library::run(ctx, suite).await,
        }
    }
}

/// Chips of the boolean logic project.
pub const BOOLEAN_CHIPS: &[&str] = &[
    "And", "DMux", "DMux8Way", "Mux16", "Mux8Way16", "Not16", "Or16", "Xor", "And16", "DMux4Way",
    "Mux", "Mux4Way16", "Not", "Or", "Or8Way",
];

/// Fixed mapping from project to pipeline, built once.
static REGISTRY: LazyLock<BTreeMap<Project, Pipeline>> = LazyLock::new(|| {
    BTreeMap::from([
        (Project::P0, Pipeline::Text),
        (
            Project::P1,
            Pipeline::Chips(ChipSuite {
                chips: BOOLEAN_CHIPS,
            }),
        ),
        (
            Project::P2,
            Pipeline::Chips(ChipSuite {
                chips: &["ALU", "Add16", "FullAdder", "HalfAdder", "Inc16"],
            }),
        ),
        (
            Project::P3,
            Pipeline::Chips(ChipSuite {
                chips: &[
                    "Bit", "PC", "RAM64", "RAM8", "Register", "RAM16K", "RAM4K", "RAM512",
                ],
            }),
        ),
        (
            Project::P4,
            Pipeline::Machine(MachineSuite {
                programs: &["Mult", "Fill"],
            }),
        ),
        (
            Project::P5,
            Pipeline::Computer(ComputerSuite {
                parts:           &["Memory", "CPU"],
                computer:        "Computer",
                programs:        &["ComputerAdd", "ComputerMax", "ComputerRect"],
                reference_parts: &[("CPU", "CPU_DMT"), ("Memory", "Memory_DMT")],
            }),
        ),
        (
            Project::P6,
            Pipeline::Translator(TranslatorSuite {
                program:        "Assembler",
                tests:          &["Add", "Max", "Rect", "Pong"],
                prebuilt_tests: Some(&["MaxL", "Rect"]),
                single_file:    &["Add", "Max", "MaxL", "Rect", "Pong"],
                input:          ArtifactKind::Asm,
                output:         ArtifactKind::Hack,
                output_file:    OutputFile::NamedAfterTest,
                check:          OutputCheck::CompareFiles,
            }),
        ),
        (
            Project::P7,
            Pipeline::Translator(TranslatorSuite {
                program:        "VMTranslator",
                tests:          &[
                    "StaticTest",
                    "PointerTest",
                    "BasicTest",
                    "StackTest",
                    "SimpleAdd",
                ],
                prebuilt_tests: None,
                single_file:    &[
                    "StaticTest",
                    "PointerTest",
                    "BasicTest",
                    "StackTest",
                    "SimpleAdd",
                ],
                input:          ArtifactKind::Vm,
                output:         ArtifactKind::Asm,
                output_file:    OutputFile::NamedAfterTest,
                check:          OutputCheck::Emulate(EvaluatorKind::InstructionEmulate),
            }),
        ),
        (
            Project::P8,
            Pipeline::Translator(TranslatorSuite {
                program:        "VMTranslator",
                tests:          &[
                    "BasicLoop",
                    "FibonacciElement",
                    "FibonacciSeries",
                    "NestedCall",
                    "SimpleFunction",
                    "StaticsTest",
                ],
                prebuilt_tests: None,
                single_file:    &["BasicLoop", "FibonacciSeries", "SimpleFunction"],
                input:          ArtifactKind::Vm,
                output:         ArtifactKind::Asm,
                output_file:    OutputFile::NamedAfterTest,
                check:          OutputCheck::Emulate(EvaluatorKind::InstructionEmulate),
            }),
        ),
        (
            Project::P10,
            Pipeline::Translator(TranslatorSuite {
                program:        "JackAnalyzer",
                tests:          &["ArrayTest", "Square", "ExpressionlessSquare"],
                prebuilt_tests: None,
                single_file:    &[],
                input:          ArtifactKind::Jack,
                output:         ArtifactKind::Xml,
                output_file:    OutputFile::NamedAfterTest,
                check:          OutputCheck::SyntaxTrees,
            }),
        ),
        (
            Project::P11,
            Pipeline::Translator(TranslatorSuite {
                program:        "JackCompiler",
                tests:          &["Average", "ComplexArrays", "ConvertToBin", "Seven"],
                prebuilt_tests: None,
                single_file:    &[],
                input:          ArtifactKind::Jack,
                output:         ArtifactKind::Vm,
                output_file:    OutputFile::Fixed("Main"),
                check:          OutputCheck::Emulate(EvaluatorKind::VmEmulate),
            }),
        ),
        (
            Project::P12,
            Pipeline::Library(LibrarySuite {
                modules:     &[
                    "Array", "Keyboard", "Math", "Memory", "Output", "Screen", "String", "Sys",
                ],
                tested:      &["Array", "Math", "Memory"],
                reference:   "OS",
                student_dir: "studentOS",
            }),
        ),
    ])
});

/// Everything a pipeline needs for one run.
pub struct RunContext<'a, T: Toolchain> {
    /// Root of the run's workspace.
    pub root:         &'a Path,
    /// Project being graded.
    pub project:      Project,
    /// Gateway to the course tools and student translators.
    pub toolchain:    &'a T,
    /// Source of the project's fixtures.
    pub fixtures:     &'a FixtureInjector,
    /// Languages student translators may be written in.
    pub languages:    &'a LanguageTable,
    /// Caller's cancellation flag.
    pub cancellation: &'a Cancellation,
}

impl<T: Toolchain> RunContext<'_, T> {
    /// Fails with [`GradeError::Cancelled`] once the caller asked to stop.
    pub fn checkpoint(&self) -> Result<(), GradeError> {
        if self.cancellation.is_cancelled() {
            tracing::info!("{} cancelled in {}", self.project, self.root.display());
            Err(GradeError::Cancelled)
        } else {
            Ok(())
        }
    }

    /// Runs `kind` on `test` in `dir` and returns its diagnostic, empty on
    /// success. A tool that cannot be invoked fails only this test.
    pub async fn evaluate(&self, kind: EvaluatorKind, dir: &Path, test: &str) -> String {
        match self.toolchain.evaluate(kind, dir, test).await {
            Ok(diagnostic) => diagnostic.trim().to_string(),
            Err(e) => {
                tracing::error!("{test}: could not run the {kind}: {e:#}");
                format!("The {kind} could not be run: {e:#}")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prebuilt_assembler_scores_over_the_reduced_tests() {
        let Pipeline::Translator(suite) = Project::P6.pipeline() else {
            panic!("project 6 grades a translator");
        };
        assert_eq!(suite.scoring(true), Scoring::PerTest(2));
        assert_eq!(suite.scoring(false), Scoring::PerTest(suite.tests.len()));

        let Pipeline::Translator(suite) = Project::P7.pipeline() else {
            panic!("project 7 grades a translator");
        };
        assert_eq!(suite.scoring(true), suite.scoring(false));
    }
}
