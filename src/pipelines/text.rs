#![warn(missing_docs)]
#![warn(clippy::missing_docs_in_private_items)]

use super::{Project, RunContext};
use crate::{
    artifact::ArtifactKind,
    constants::{PROJECT0_ARTIFACT, PROJECT0_REFERENCE},
    error::GradeError,
    grade::{Feedback, Outcome, OutcomeKind, Report, Scoring},
    text::{first_difference, read_normalized},
    toolchain::Toolchain,
    util::collect_upwards,
};

/// Grades the warm-up project: the submitted text file must match the
/// reference text, ignoring letter case.
pub async fn run<T: Toolchain>(ctx: &RunContext<'_, T>) -> Result<Report, GradeError> {
    let root = ctx.root;
    let mut feedback = Feedback::new(Scoring::AllOrNothing);

    collect_upwards(root, ArtifactKind::Txt, &["file"])?;
    ctx.fixtures
        .inject(root, Project::P0, &[ArtifactKind::Cmp])?;
    ctx.checkpoint()?;

    let submitted = root.join(PROJECT0_ARTIFACT);
    if !submitted.is_file() {
        feedback.record(PROJECT0_ARTIFACT, Outcome::file_missing());
        return Ok(feedback.finish());
    }

    let reference = root.join(PROJECT0_REFERENCE);
    if !reference.is_file() {
        return Err(GradeError::FixturesMissing(reference));
    }

    let expected = read_normalized(&reference)?;
    let actual = read_normalized(&submitted)?;
    if expected == actual {
        feedback.pass(PROJECT0_ARTIFACT);
    } else {
        let detail = first_difference(&expected, &actual).unwrap_or_default();
        feedback.record(
            PROJECT0_ARTIFACT,
            Outcome::with_detail(OutcomeKind::FileContents, detail),
        );
    }

    Ok(feedback.finish())
}
