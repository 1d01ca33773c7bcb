#![warn(missing_docs)]
#![warn(clippy::missing_docs_in_private_items)]

//! Overlaying reference test material onto a workspace.

use std::path::{Path, PathBuf};

use anyhow::Context;

use crate::{
    artifact::ArtifactKind,
    error::GradeError,
    pipelines::Project,
    util::{copy_tree, remove_matching},
};

/// Copies per-project fixture trees out of a read-only fixture root.
#[derive(Debug, Clone)]
pub struct FixtureInjector {
    /// Root holding `p0`, `p1`, ... fixture trees.
    tests_dir: PathBuf,
}

impl FixtureInjector {
    /// Creates an injector reading from `tests_dir`.
    pub fn new(tests_dir: impl Into<PathBuf>) -> Self {
        Self {
            tests_dir: tests_dir.into(),
        }
    }

    /// Fixture tree of `project`.
    pub fn source(&self, project: Project) -> PathBuf {
        self.tests_dir.join(format!("p{}", project.number()))
    }

    /// Fails with [`GradeError::FixturesMissing`] unless the fixture tree of
    /// `project` exists.
    pub fn ensure_available(&self, project: Project) -> Result<PathBuf, GradeError> {
        let source = self.source(project);
        if source.is_dir() {
            Ok(source)
        } else {
            Err(GradeError::FixturesMissing(source))
        }
    }

    /// Deletes stale `purge` outputs anywhere under `root`, then copies the
    /// fixtures of `project` over it with permissive access. Fixtures replace
    /// like-named submission files.
    pub fn inject(
        &self,
        root: &Path,
        project: Project,
        purge: &[ArtifactKind],
    ) -> Result<(), GradeError> {
        let source = self.ensure_available(project)?;

        if !purge.is_empty() {
            let removed = remove_matching(root, purge)
                .with_context(|| format!("Could not purge stale outputs in {}", root.display()))?;
            if removed > 0 {
                tracing::debug!("purged {removed} stale output file(s)");
            }
        }

        copy_tree(&source, root, true)
            .with_context(|| format!("Could not copy fixtures from {}", source.display()))?;
        Ok(())
    }
}
