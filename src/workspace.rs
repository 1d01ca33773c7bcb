#![warn(missing_docs)]
#![warn(clippy::missing_docs_in_private_items)]

//! Disposable, uniquely named staging directories for grading runs.

use std::{
    fs,
    io::ErrorKind,
    path::{Path, PathBuf},
};

use anyhow::{Context, anyhow};
use uuid::Uuid;

use crate::{constants::WORKSPACE_PREFIX, error::GradeError, util::copy_tree};

/// How many fresh names to try before giving up on creating a workspace.
const NAME_ATTEMPTS: usize = 8;

/// A staging directory owned by exactly one grading run.
///
/// The directory is removed when the workspace is torn down or dropped,
/// whichever happens first.
#[derive(Debug)]
pub struct Workspace {
    /// Absolute path of the directory.
    root:     PathBuf,
    /// Random directory name.
    name:     String,
    /// Set once the directory has been removed.
    released: bool,
}

impl Workspace {
    /// Creates a new uniquely named directory under `parent` and copies the
    /// submission at `submission` into it.
    pub fn stage(submission: &Path, parent: &Path) -> Result<Self, GradeError> {
        if !submission.is_dir() {
            return Err(GradeError::SubmissionMissing(submission.to_path_buf()));
        }
        fs::read_dir(submission)
            .map_err(|_| GradeError::SubmissionMissing(submission.to_path_buf()))?;

        let workspace = Self::create(parent)?;
        copy_tree(submission, &workspace.root, false).with_context(|| {
            format!(
                "Could not copy {} into workspace {}",
                submission.display(),
                workspace.name
            )
        })?;

        tracing::debug!(
            workspace = %workspace.name,
            "staged {} into {}",
            submission.display(),
            workspace.root.display()
        );
        Ok(workspace)
    }

    /// Creates an empty workspace under `parent`.
    pub fn create(parent: &Path) -> Result<Self, GradeError> {
        fs::create_dir_all(parent)
            .with_context(|| format!("Could not create {}", parent.display()))?;
        let parent = fs::canonicalize(parent)
            .with_context(|| format!("Could not resolve {}", parent.display()))?;

        for _ in 0..NAME_ATTEMPTS {
            let name = format!("{WORKSPACE_PREFIX}{}", Uuid::new_v4().simple());
            let root = parent.join(&name);
            match fs::create_dir(&root) {
                Ok(()) => {
                    return Ok(Self {
                        root,
                        name,
                        released: false,
                    });
                }
                Err(e) if e.kind() == ErrorKind::AlreadyExists => continue,
                Err(e) => {
                    return Err(anyhow!(e)
                        .context(format!("Could not create workspace {}", root.display()))
                        .into());
                }
            }
        }

        Err(anyhow!("Could not find a free workspace name under {}", parent.display()).into())
    }

    /// Absolute path of the workspace directory.
    pub fn path(&self) -> &Path {
        &self.root
    }

    /// Random name of the workspace directory.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Removes the workspace tree, ignoring removal errors.
    pub fn teardown(mut self) {
        self.release();
    }

    /// Best-effort removal; runs at most once.
    fn release(&mut self) {
        if self.released {
            return;
        }
        self.released = true;
        if let Err(e) = fs::remove_dir_all(&self.root)
            && e.kind() != ErrorKind::NotFound
        {
            tracing::debug!("ignoring error while removing {}: {e}", self.root.display());
        }
        tracing::debug!(workspace = %self.name, "workspace removed");
    }
}

impl Drop for Workspace {
    fn drop(&mut self) {
        self.release();
    }
}
