#![warn(missing_docs)]
#![warn(clippy::missing_docs_in_private_items)]

//! Entry points that run one grading pass over a submission.

use std::{path::Path, sync::Arc};

use bon::Builder;

use crate::{
    cancel::Cancellation,
    config::{self, GraderConfig},
    error::GradeError,
    fixtures::FixtureInjector,
    grade::{Feedback, Report, Scoring},
    pipelines::{BOOLEAN_CHIPS, Project, RunContext, chips::grade_chips},
    toolchain::{CommandToolchain, Toolchain},
    workspace::Workspace,
};

/// Grades submissions with a fixed configuration and toolchain.
///
/// A grader holds no per-run state, so one instance can serve concurrent runs.
#[derive(Debug, Builder)]
pub struct Grader<T: Toolchain> {
    /// Directories, timeouts and languages.
    config:       Arc<GraderConfig>,
    /// Gateway to the course tools.
    toolchain:    T,
    /// Flag checked between tests.
    #[builder(default)]
    cancellation: Cancellation,
}

impl Grader<CommandToolchain> {
    /// A grader that shells out to the real course tools.
    pub fn from_config(config: Arc<GraderConfig>) -> Self {
        let toolchain = CommandToolchain::new(&config);
        Grader::builder().config(config).toolchain(toolchain).build()
    }
}

impl<T: Toolchain> Grader<T> {
    /// Handle that cancels every run of this grader.
    pub fn cancellation(&self) -> &Cancellation {
        &self.cancellation
    }

    /// Configuration in use.
    pub fn config(&self) -> &GraderConfig {
        &self.config
    }

    /// Grades the submission at `submission` as project `project`.
    ///
    /// The submission directory is never modified. Every run works in its own
    /// workspace, removed before this returns on every path.
    pub async fn grade(&self, submission: &Path, project: u8) -> Result<Report, GradeError> {
        let project = Project::try_from(project)?;
        let pipeline = project.pipeline();
        let fixtures = FixtureInjector::new(self.config.tests_dir());
        fixtures.ensure_available(project)?;

        let workspace = Workspace::stage(submission, self.config.temp_dir())?;
        tracing::info!(
            workspace = %workspace.name(),
            "grading {} for {project}",
            submission.display()
        );

        let ctx = RunContext {
            root: workspace.path(),
            project,
            toolchain: &self.toolchain,
            fixtures: &fixtures,
            languages: self.config.languages(),
            cancellation: &self.cancellation,
        };
        let result = pipeline.run(&ctx).await;
        workspace.teardown();

        match &result {
            Ok(report) => tracing::info!("{project} graded: {}", report.grade()),
            Err(e) => tracing::warn!("{project} could not be graded: {e}"),
        }
        result
    }

    /// Checks a single boolean logic chip against its project 1 test script.
    pub async fn check_chip(&self, submission: &Path, chip: &str) -> Result<Report, GradeError> {
        let chip = BOOLEAN_CHIPS
            .iter()
            .copied()
            .find(|c| c.eq_ignore_ascii_case(chip.trim()))
            .ok_or_else(|| GradeError::UnknownChip(chip.to_string()))?;
        let fixtures = FixtureInjector::new(self.config.tests_dir());
        fixtures.ensure_available(Project::P1)?;

        let workspace = Workspace::stage(submission, self.config.temp_dir())?;
        tracing::info!(workspace = %workspace.name(), "checking {chip} in {}", submission.display());

        let ctx = RunContext {
            root: workspace.path(),
            project: Project::P1,
            toolchain: &self.toolchain,
            fixtures: &fixtures,
            languages: self.config.languages(),
            cancellation: &self.cancellation,
        };
        let result = check_one(&ctx, chip).await;
        workspace.teardown();
        result
    }
}

/// Body of [`Grader::check_chip`] once the workspace exists.
async fn check_one<T: Toolchain>(ctx: &RunContext<'_, T>, chip: &str) -> Result<Report, GradeError> {
    let mut feedback = Feedback::new(Scoring::PerTest(1));
    grade_chips(ctx, &[chip], &mut feedback).await?;
    Ok(feedback.finish())
}

/// Grades `submission` as project `project` with the process-wide
/// configuration and the real course tools, returning `(score, feedback)`.
pub async fn grade(submission: impl AsRef<Path>, project: u8) -> Result<(f64, String), GradeError> {
    let config = config::get()?;
    let grader = Grader::from_config(config);
    let report = grader.grade(submission.as_ref(), project).await?;
    Ok(report.into_pair())
}
