#![warn(missing_docs)]
#![warn(clippy::missing_docs_in_private_items)]

use super::{MachineSuite, RunContext};
use crate::{
    artifact::ArtifactKind,
    error::GradeError,
    grade::{Feedback, Outcome, OutcomeKind, Report, Scoring},
    toolchain::{EvaluatorKind, Toolchain},
    util::collect_upwards,
};

/// Grades the machine language project. A program that does not assemble is
/// not emulated.
pub async fn run<T: Toolchain>(
    ctx: &RunContext<'_, T>,
    suite: &MachineSuite,
) -> Result<Report, GradeError> {
    let root = ctx.root;
    let mut feedback = Feedback::new(Scoring::PerTest(suite.programs.len()));

    collect_upwards(root, ArtifactKind::Asm, suite.programs)?;
    ctx.fixtures
        .inject(root, ctx.project, &[ArtifactKind::Tst, ArtifactKind::Cmp])?;

    for &program in suite.programs {
        ctx.checkpoint()?;

        if !ArtifactKind::Asm.file_in(root, program).is_file() {
            feedback.record(program, Outcome::file_missing());
            continue;
        }

        let assembly = ctx.evaluate(EvaluatorKind::Assemble, root, program).await;
        if !assembly.is_empty() {
            feedback.record(
                program,
                Outcome::with_detail(OutcomeKind::AssemblyError, assembly),
            );
            continue;
        }

        let diagnostic = ctx
            .evaluate(EvaluatorKind::InstructionEmulate, root, program)
            .await;
        if diagnostic.is_empty() {
            feedback.pass(program);
        } else {
            feedback.record(program, Outcome::diff_found(diagnostic));
        }
    }

    Ok(feedback.finish())
}
