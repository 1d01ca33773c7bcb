#![warn(missing_docs)]
#![warn(clippy::missing_docs_in_private_items)]

use std::path::Path;

use super::{ChipSuite, RunContext};
use crate::{
    artifact::ArtifactKind,
    error::GradeError,
    grade::{Feedback, Outcome, OutcomeKind, Report, Scoring},
    guard::{VisibilityGuard, is_placeholder},
    toolchain::{EvaluatorKind, Toolchain},
};

/// Grades a hardware chip project.
pub async fn run<T: Toolchain>(
    ctx: &RunContext<'_, T>,
    suite: &ChipSuite,
) -> Result<Report, GradeError> {
    let mut feedback = Feedback::new(Scoring::PerTest(suite.chips.len()));
    grade_chips(ctx, suite.chips, &mut feedback).await?;
    Ok(feedback.finish())
}

/// Hides the student's `chips`, overlays the project fixtures and evaluates
/// each chip in the workspace root.
///
/// The chips are hidden before the fixtures are copied, so a fixture sharing a
/// chip's name never replaces the student's file.
pub async fn grade_chips<T: Toolchain>(
    ctx: &RunContext<'_, T>,
    chips: &[&str],
    feedback: &mut Feedback,
) -> Result<(), GradeError> {
    let mut guard = VisibilityGuard::conceal_all(ctx.root, ArtifactKind::Hdl, chips)?;
    ctx.fixtures
        .inject(ctx.root, ctx.project, &[ArtifactKind::Tst, ArtifactKind::Cmp])?;
    evaluate_chips(ctx, ctx.root, chips, &mut guard, feedback).await?;
    guard.restore()?;
    Ok(())
}

/// Evaluates each of `chips` in `dir`, revealing one at a time from `guard`
/// so the simulator falls back to its own implementation of the parts.
async fn evaluate_chips<T: Toolchain>(
    ctx: &RunContext<'_, T>,
    dir: &Path,
    chips: &[&str],
    guard: &mut VisibilityGuard,
    feedback: &mut Feedback,
) -> Result<(), GradeError> {
    for &chip in chips {
        ctx.checkpoint()?;

        if !guard.reveal(chip)? {
            feedback.record(chip, Outcome::file_missing());
            continue;
        }

        if is_placeholder(&ArtifactKind::Hdl.file_in(dir, chip))? {
            feedback.record(chip, Outcome::bare(OutcomeKind::BuiltInDetected));
        }

        let diagnostic = ctx
            .evaluate(EvaluatorKind::StructuralCircuit, dir, chip)
            .await;
        guard.hide(chip)?;

        if !diagnostic.is_empty() {
            feedback.record(chip, Outcome::diff_found(diagnostic));
        } else if !feedback.has_failure(chip) {
            feedback.pass(chip);
        }
    }
    Ok(())
}
