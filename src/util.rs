#![warn(missing_docs)]
#![warn(clippy::missing_docs_in_private_items)]

use std::{
    fs,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};
use glob::glob;
use walkdir::WalkDir;

use crate::artifact::ArtifactKind;

/// A glob utility function to find paths to files with certain extension
///
/// * `kind`: the artifact kind to find paths for
/// * `search_depth`: how many folders deep to search for
/// * `root_dir`: the root directory where search starts
pub fn find_files(kind: ArtifactKind, search_depth: i8, root_dir: &Path) -> Result<Vec<PathBuf>> {
    let mut pattern = root_dir.to_path_buf();

    for _ in 0..search_depth {
        pattern.push("**");
    }

    pattern.push(format!("*.{}", kind.extension()));
    let pattern = pattern
        .to_str()
        .context("Could not convert root_dir to string")?
        .to_string();

    let mut found: Vec<PathBuf> = glob(&pattern)
        .context("Could not create glob")?
        .filter_map(Result::ok)
        .filter(|p| p.is_file())
        .collect();
    found.sort();
    Ok(found)
}

/// Every regular file below `root`, in a stable order.
pub fn files_under(root: &Path) -> Vec<PathBuf> {
    WalkDir::new(root)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .map(|e| e.into_path())
        .collect()
}

/// Opens up `path` so a course tool running as another user can read and
/// execute it.
#[cfg(unix)]
pub fn make_permissive(path: &Path) -> Result<()> {
    use std::os::unix::fs::PermissionsExt;

    fs::set_permissions(path, fs::Permissions::from_mode(0o777))
        .with_context(|| format!("Could not set permissions on {}", path.display()))
}

/// Opens up `path` so a course tool running as another user can read and
/// execute it.
#[cfg(not(unix))]
pub fn make_permissive(path: &Path) -> Result<()> {
    let mut perms = fs::metadata(path)
        .with_context(|| format!("Could not stat {}", path.display()))?
        .permissions();
    perms.set_readonly(false);
    fs::set_permissions(path, perms)
        .with_context(|| format!("Could not set permissions on {}", path.display()))
}

/// Recursively copies `src` into `dst`, merging with and overwriting whatever
/// `dst` already holds. Symlinks under `src` are not copied.
///
/// * `permissive`: also open up every copied entry (and `dst` itself)
pub fn copy_tree(src: &Path, dst: &Path, permissive: bool) -> Result<()> {
    fs::create_dir_all(dst).with_context(|| format!("Could not create {}", dst.display()))?;
    if permissive {
        make_permissive(dst)?;
    }

    for entry in WalkDir::new(src).min_depth(1) {
        let entry = entry.with_context(|| format!("Could not walk {}", src.display()))?;
        let relative = entry
            .path()
            .strip_prefix(src)
            .context("walked entry escaped its root")?;
        let target = dst.join(relative);

        if entry.file_type().is_symlink() {
            tracing::debug!("skipping symlink {}", entry.path().display());
            continue;
        }
        if entry.file_type().is_dir() {
            fs::create_dir_all(&target)
                .with_context(|| format!("Could not create {}", target.display()))?;
        } else {
            if let Some(parent) = target.parent() {
                fs::create_dir_all(parent)
                    .with_context(|| format!("Could not create {}", parent.display()))?;
            }
            fs::copy(entry.path(), &target).with_context(|| {
                format!("Could not copy {} to {}", entry.path().display(), target.display())
            })?;
        }

        if permissive {
            make_permissive(&target)?;
        }
    }

    Ok(())
}

/// Moves a file, falling back to copy-and-delete across filesystems.
pub fn move_file(from: &Path, to: &Path) -> Result<()> {
    if fs::rename(from, to).is_ok() {
        return Ok(());
    }
    fs::copy(from, to)
        .with_context(|| format!("Could not copy {} to {}", from.display(), to.display()))?;
    fs::remove_file(from).with_context(|| format!("Could not delete {}", from.display()))
}

/// Deletes every file below `root` whose kind is one of `kinds`, returning
/// how many were removed.
pub fn remove_matching(root: &Path, kinds: &[ArtifactKind]) -> Result<usize> {
    let mut removed = 0;
    for path in files_under(root) {
        if kinds.iter().any(|kind| kind.matches(&path)) {
            fs::remove_file(&path)
                .with_context(|| format!("Could not delete {}", path.display()))?;
            removed += 1;
        }
    }
    Ok(removed)
}

/// Returns the directory below `root` that contains `file_name` (compared
/// ignoring case), or `root` itself when no such file exists.
pub fn find_subfolder(root: &Path, file_name: &str) -> PathBuf {
    find_named(root, file_name)
        .and_then(|p| p.parent().map(Path::to_path_buf))
        .unwrap_or_else(|| root.to_path_buf())
}

/// First file under `root` named `file_name`, ignoring case.
pub fn find_named(root: &Path, file_name: &str) -> Option<PathBuf> {
    let wanted = file_name.to_lowercase();
    files_under(root).into_iter().find(|p| {
        p.file_name()
            .and_then(|n| n.to_str())
            .is_some_and(|n| n.to_lowercase() == wanted)
    })
}

/// Pulls every `kind` file from sub-folders of `root` up into `root`, then
/// renames root files whose stem matches one of `canonical` except for letter
/// case to the canonical spelling.
///
/// A file is left where it is when `root` already holds one with the same
/// name.
pub fn collect_upwards(root: &Path, kind: ArtifactKind, canonical: &[&str]) -> Result<()> {
    for path in files_under(root) {
        if !kind.matches(&path) || path.parent() == Some(root) {
            continue;
        }
        let Some(name) = path.file_name() else {
            continue;
        };
        let target = root.join(name);
        if target.exists() {
            tracing::debug!(
                "not moving {} up: {} already exists",
                path.display(),
                target.display()
            );
            continue;
        }
        tracing::debug!("moving {} into {}", path.display(), root.display());
        move_file(&path, &target)?;
    }

    let entries: Vec<PathBuf> = fs::read_dir(root)
        .with_context(|| format!("Could not read {}", root.display()))?
        .filter_map(|e| e.ok())
        .map(|e| e.path())
        .collect();
    for path in entries {
        if !path.is_file() || !kind.matches(&path) {
            continue;
        }
        let Some(stem) = path.file_stem().and_then(|s| s.to_str()) else {
            continue;
        };
        let Some(proper) = canonical.iter().find(|c| c.eq_ignore_ascii_case(stem)) else {
            continue;
        };
        let canonical_path = kind.file_in(root, proper);
        if canonical_path == path {
            continue;
        }
        tracing::debug!("renaming {} to {}", path.display(), canonical_path.display());
        fs::rename(&path, &canonical_path).with_context(|| {
            format!("Could not rename {} to {}", path.display(), canonical_path.display())
        })?;
    }

    Ok(())
}
