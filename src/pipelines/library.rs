#![warn(missing_docs)]
#![warn(clippy::missing_docs_in_private_items)]

//! The operating system project.
//!
//! Grading runs in three phases:
//!
//! * **Build**: every library module is compiled on its own and the compiled
//!   modules are collected in a staging directory.
//! * **Integrate**: each module test runs against the reference library
//!   overlaid with every compiled student module.
//! * **Isolate**: a test that fails in integration reruns against the
//!   reference library plus only the module it tests. A module that passes
//!   here is broken only by some other student module.

use std::{fs, path::Path};

use anyhow::Context;

use super::{LibrarySuite, RunContext};
use crate::{
    artifact::ArtifactKind,
    error::GradeError,
    grade::{Feedback, Outcome, OutcomeKind, Report},
    toolchain::{EvaluatorKind, Toolchain},
    util::{collect_upwards, copy_tree},
};

/// Where a module test ended up after integration and isolation.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Verdict {
    /// Passed together with every student module.
    Passed,
    /// Failed in integration and no compiled module exists to isolate.
    Unisolated {
        /// Integration diagnostic.
        combined: String,
    },
    /// Failed in integration and again on its own.
    Individual {
        /// Integration diagnostic.
        combined: String,
        /// Isolation diagnostic.
        isolated: String,
    },
    /// Failed in integration but passed on its own.
    CombinationOnly {
        /// Integration diagnostic.
        combined: String,
    },
}

/// Grades the operating system project.
pub async fn run<T: Toolchain>(
    ctx: &RunContext<'_, T>,
    suite: &LibrarySuite,
) -> Result<Report, GradeError> {
    let root = ctx.root;
    let mut feedback = Feedback::new(suite.scoring());

    collect_upwards(root, ArtifactKind::Jack, suite.modules)?;
    ctx.fixtures.inject(root, ctx.project, &[ArtifactKind::Vm])?;

    let reference = root.join(suite.reference);
    if !reference.is_dir() {
        return Err(GradeError::FixturesMissing(reference));
    }
    let staging = root.join(suite.student_dir);
    fs::create_dir_all(&staging)
        .with_context(|| format!("Could not create {}", staging.display()))?;

    build(ctx, suite, &staging, &mut feedback).await?;

    let mut individual_failure = false;
    let mut combination_only = Vec::new();
    for &module in suite.tested {
        ctx.checkpoint()?;
        let test = LibrarySuite::test_name(module);
        let verdict = verify(ctx, &reference, &staging, module, &test).await?;
        tracing::debug!(test = %test, ?verdict, "module verdict");

        match verdict {
            Verdict::Passed => feedback.pass(&test),
            Verdict::Unisolated { combined } => {
                individual_failure = true;
                feedback.record(&test, Outcome::diff_found(combined));
            }
            Verdict::Individual { combined, isolated } => {
                individual_failure = true;
                feedback.record(
                    &test,
                    Outcome::diff_found(format!(
                        "All OS files: {combined}\nOnly {module}{}: {isolated}",
                        ArtifactKind::Vm
                    )),
                );
            }
            Verdict::CombinationOnly { combined } => combination_only.push((
                test,
                format!(
                    "All OS files: {combined}\nOnly {module}{}: passed",
                    ArtifactKind::Vm
                ),
            )),
        }
    }

    // Only the first combination-only failure is reported, and only when no
    // module fails on its own.
    let mut deferred = combination_only.into_iter();
    if !individual_failure && let Some((test, detail)) = deferred.next() {
        feedback.record(
            test,
            Outcome::with_detail(OutcomeKind::CombinationOnly, detail),
        );
    }
    for (test, _) in deferred {
        tracing::debug!(test = %test, "combination-only failure not reported");
    }

    Ok(feedback.finish())
}

/// Compiles every module into `staging`, recording a failure per module that
/// is missing or does not compile.
async fn build<T: Toolchain>(
    ctx: &RunContext<'_, T>,
    suite: &LibrarySuite,
    staging: &Path,
    feedback: &mut Feedback,
) -> Result<(), GradeError> {
    let root = ctx.root;
    for &module in suite.modules {
        ctx.checkpoint()?;

        if !ArtifactKind::Jack.file_in(root, module).is_file() {
            feedback.record(module, Outcome::file_missing());
            continue;
        }

        let diagnostic = ctx
            .evaluate(EvaluatorKind::CompileSource, root, module)
            .await;
        if !diagnostic.is_empty() {
            feedback.record(
                module,
                Outcome::with_detail(OutcomeKind::CompileError, diagnostic),
            );
            continue;
        }

        let compiled = ArtifactKind::Vm.file_in(root, module);
        if !compiled.is_file() {
            feedback.record(
                module,
                Outcome::with_detail(
                    OutcomeKind::CompileError,
                    format!("The Jack compiler produced no {module}{}", ArtifactKind::Vm),
                ),
            );
            continue;
        }
        let staged = ArtifactKind::Vm.file_in(staging, module);
        fs::copy(&compiled, &staged)
            .with_context(|| format!("Could not stage {}", compiled.display()))?;
    }
    Ok(())
}

/// Runs the integration phase for `module`, then isolation when it fails.
async fn verify<T: Toolchain>(
    ctx: &RunContext<'_, T>,
    reference: &Path,
    staging: &Path,
    module: &str,
    test: &str,
) -> Result<Verdict, GradeError> {
    let dir = ctx.root.join(test);

    copy_tree(reference, &dir, true)?;
    copy_tree(staging, &dir, true)?;
    let combined = ctx.evaluate(EvaluatorKind::VmEmulate, &dir, test).await;
    if combined.is_empty() {
        return Ok(Verdict::Passed);
    }

    let compiled = ArtifactKind::Vm.file_in(staging, module);
    if !compiled.is_file() {
        return Ok(Verdict::Unisolated { combined });
    }

    tracing::debug!("{test}: rerunning with only {}", compiled.display());
    copy_tree(reference, &dir, true)?;
    let target = ArtifactKind::Vm.file_in(&dir, module);
    fs::copy(&compiled, &target)
        .with_context(|| format!("Could not copy {} into {}", compiled.display(), dir.display()))?;
    let isolated = ctx.evaluate(EvaluatorKind::VmEmulate, &dir, test).await;

    if isolated.is_empty() {
        Ok(Verdict::CombinationOnly { combined })
    } else {
        Ok(Verdict::Individual { combined, isolated })
    }
}
