#![warn(missing_docs)]
#![warn(clippy::missing_docs_in_private_items)]

//! Projects where the student writes a translator: assembler, VM translator,
//! syntax analyzer and compiler.
//!
//! The student's program is built once. Each test then runs it on the test's
//! input and judges what it produced. A build that fails aborts the run with a
//! single diagnostic, since no test could possibly pass.

use std::path::Path;

use itertools::Itertools;

use super::{OutputCheck, OutputFile, RunContext, TranslatorSuite};
use crate::{
    artifact::ArtifactKind,
    constants::LANGUAGE_MARKER,
    error::GradeError,
    grade::{Feedback, Outcome, OutcomeKind, Report},
    languages::{Launcher, SourceMode},
    text::{read_normalized, same_ignoring_whitespace},
    toolchain::Toolchain,
    util::{find_files, find_named, find_subfolder, move_file},
};

/// Grades a translator project.
pub async fn run<T: Toolchain>(
    ctx: &RunContext<'_, T>,
    suite: &TranslatorSuite,
) -> Result<Report, GradeError> {
    let root = find_subfolder(ctx.root, LANGUAGE_MARKER);
    let marker = match find_named(&root, LANGUAGE_MARKER) {
        Some(path) => read_normalized(&path)?,
        None => String::new(),
    };

    let mode = ctx.languages.resolve(&marker);
    let prebuilt = mode == SourceMode::Prebuilt;
    let purge: &[ArtifactKind] = if prebuilt { &[] } else { &[suite.output] };
    ctx.fixtures.inject(&root, ctx.project, purge)?;

    let launcher = match mode {
        SourceMode::Program(language) => {
            tracing::info!("building {} written in {}", suite.program, language.name);
            Some(Launcher::new(language, suite.program))
        }
        SourceMode::Prebuilt => {
            tracing::info!("grading pre-built output, skipping the build");
            None
        }
        SourceMode::Unknown(found) => {
            return Ok(Feedback::build_failure(&format!(
                "Could not tell which language the {} is written in: {} contains `{found}`, \
                 expected one of {}",
                suite.program,
                LANGUAGE_MARKER,
                ctx.languages.names().iter().join(", ")
            )));
        }
    };

    if let Some(launcher) = &launcher {
        match ctx.toolchain.build(&root, launcher).await {
            Ok(outcome) if outcome.success => {}
            Ok(outcome) => return Ok(Feedback::build_failure(&outcome.output)),
            Err(e) => {
                tracing::error!("could not build {}: {e:#}", suite.program);
                return Ok(Feedback::build_failure(&format!("{e:#}")));
            }
        }
    }

    let tests = suite.tests_for(prebuilt);
    let mut feedback = Feedback::new(suite.scoring(prebuilt));

    for &test in tests {
        ctx.checkpoint()?;
        let dir = root.join(test);

        let printed = match &launcher {
            Some(launcher) => {
                let input = suite.input_for(&root, test);
                match ctx.toolchain.translate(&root, launcher, &input).await {
                    Ok(printed) => printed,
                    Err(e) => {
                        tracing::error!("{test}: could not run {}: {e:#}", suite.program);
                        format!("{e:#}")
                    }
                }
            }
            None => String::new(),
        };

        if suite.check == OutputCheck::SyntaxTrees {
            compare_syntax_trees(&dir, test, &printed, &mut feedback)?;
            if !feedback.has_failure(test) {
                feedback.pass(test);
            }
            continue;
        }

        let expected = suite.output_for(&root, test);
        if suite.output_file == OutputFile::NamedAfterTest {
            let misplaced = suite.output.file_in(&root, test);
            if misplaced.is_file() {
                move_file(&misplaced, &expected)?;
                feedback.record(test, Outcome::bare(OutcomeKind::WrongOutputLocation));
            }
        }

        if !expected.is_file() {
            feedback.record(
                test,
                Outcome::with_detail(OutcomeKind::FileMissing, printed),
            );
            continue;
        }

        match suite.check {
            OutputCheck::CompareFiles => {
                let reference = ArtifactKind::Cmp.file_in(&dir, test);
                if !same_ignoring_whitespace(&reference, &expected)? {
                    feedback.record(
                        test,
                        Outcome::test_failed(format!("{test}{} is wrong", suite.output)),
                    );
                }
            }
            OutputCheck::Emulate(kind) => {
                let diagnostic = ctx.evaluate(kind, &dir, test).await;
                if !diagnostic.is_empty() {
                    feedback.record(test, Outcome::test_failed(diagnostic));
                }
            }
            OutputCheck::SyntaxTrees => {}
        }

        if !feedback.has_failure(test) {
            feedback.pass(test);
        }
    }

    Ok(feedback.finish())
}

/// Checks that every reference `.cmp` in `dir` has a `.xml` of the same name
/// with the same content, ignoring whitespace.
fn compare_syntax_trees(
    dir: &Path,
    test: &str,
    printed: &str,
    feedback: &mut Feedback,
) -> Result<(), GradeError> {
    for reference in find_files(ArtifactKind::Cmp, 1, dir)? {
        let produced = reference.with_extension(ArtifactKind::Xml.extension());
        let stem = reference
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();

        if !produced.is_file() {
            feedback.record(
                test,
                Outcome::with_detail(
                    OutcomeKind::FileMissing,
                    format!("{stem}{} was not produced\n{printed}", ArtifactKind::Xml),
                ),
            );
            continue;
        }
        if !same_ignoring_whitespace(&reference, &produced)? {
            feedback.record(
                test,
                Outcome::test_failed(format!(
                    "{stem}{} is different from {stem}{}",
                    ArtifactKind::Xml,
                    ArtifactKind::Cmp
                )),
            );
        }
    }
    Ok(())
}
