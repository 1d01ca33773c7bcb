#![warn(missing_docs)]
#![warn(clippy::missing_docs_in_private_items)]

use std::fs;

use anyhow::Context;

use super::{ComputerSuite, RunContext};
use crate::{
    artifact::ArtifactKind,
    error::GradeError,
    grade::{Feedback, Outcome, OutcomeKind, Report, Scoring},
    guard::{VisibilityGuard, is_placeholder},
    toolchain::{EvaluatorKind, Toolchain},
    util::collect_upwards,
};

/// Grades the computer architecture project.
///
/// The parts are simulated on their own. The top-level chip is then simulated
/// with reference versions swapped in for the parts, so a broken part does not
/// fail the computer twice.
pub async fn run<T: Toolchain>(
    ctx: &RunContext<'_, T>,
    suite: &ComputerSuite,
) -> Result<Report, GradeError> {
    let root = ctx.root;
    let mut feedback = Feedback::new(Scoring::PerTest(suite.parts.len() + 1));

    let mut chips = suite.parts.to_vec();
    chips.push(suite.computer);
    collect_upwards(root, ArtifactKind::Hdl, &chips)?;
    let guard = VisibilityGuard::conceal_all(root, ArtifactKind::Hdl, &chips)?;
    ctx.fixtures
        .inject(root, ctx.project, &[ArtifactKind::Tst, ArtifactKind::Cmp])?;
    guard.restore()?;

    for &part in suite.parts {
        ctx.checkpoint()?;

        let hdl = ArtifactKind::Hdl.file_in(root, part);
        if !hdl.is_file() {
            feedback.record(part, Outcome::file_missing());
            continue;
        }
        if is_placeholder(&hdl)? {
            feedback.record(part, Outcome::bare(OutcomeKind::BuiltInDetected));
        }

        let diagnostic = ctx
            .evaluate(EvaluatorKind::StructuralCircuit, root, part)
            .await;
        if !diagnostic.is_empty() {
            feedback.record(part, Outcome::diff_found(diagnostic));
        } else if !feedback.has_failure(part) {
            feedback.pass(part);
        }
    }

    ctx.checkpoint()?;
    let computer = suite.computer;
    let hdl = ArtifactKind::Hdl.file_in(root, computer);
    if !hdl.is_file() {
        feedback.record(computer, Outcome::file_missing());
        return Ok(feedback.finish());
    }
    if is_placeholder(&hdl)? {
        feedback.record(computer, Outcome::bare(OutcomeKind::BuiltInDetected));
    }

    for &(part, reference) in suite.reference_parts {
        let source = ArtifactKind::Hdl.file_in(root, reference);
        if !source.is_file() {
            return Err(GradeError::FixturesMissing(source));
        }
        let target = ArtifactKind::Hdl.file_in(root, part);
        fs::rename(&source, &target).with_context(|| {
            format!("Could not put {} in place of {}", source.display(), target.display())
        })?;
    }

    for &program in suite.programs {
        ctx.checkpoint()?;
        let diagnostic = ctx
            .evaluate(EvaluatorKind::StructuralCircuit, root, program)
            .await;
        if !diagnostic.is_empty() {
            feedback.record(
                computer,
                Outcome::diff_found(format!("{program}: {diagnostic}")),
            );
        }
    }
    if !feedback.has_failure(computer) {
        feedback.pass(computer);
    }

    Ok(feedback.finish())
}
