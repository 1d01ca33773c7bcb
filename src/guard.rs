#![warn(missing_docs)]
#![warn(clippy::missing_docs_in_private_items)]

//! Concealing student artifacts from the course tools while other tests run.
//!
//! The hardware simulator silently substitutes its built-in chip whenever a
//! `.hdl` file is absent. Hiding every student chip except the one under test
//! therefore evaluates each chip against reference versions of its parts.

use std::{
    collections::BTreeMap,
    fs,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};

use crate::{artifact::ArtifactKind, constants::PLACEHOLDER_MARKER, text::read_normalized};

/// True if `content` contains the reserved placeholder marker, ignoring case.
pub fn detect_placeholder(content: &str) -> bool {
    content.to_lowercase().contains(PLACEHOLDER_MARKER)
}

/// Reads `path` and checks it for the placeholder marker.
pub fn is_placeholder(path: &Path) -> Result<bool> {
    Ok(detect_placeholder(&read_normalized(path)?))
}

/// Tracks which artifacts of one kind are currently renamed out of sight.
#[derive(Debug)]
pub struct VisibilityGuard {
    /// Directory the artifacts live in.
    dir:    PathBuf,
    /// Kind of the guarded artifacts.
    kind:   ArtifactKind,
    /// Hidden artifacts by name, with the path they had before hiding and
    /// the path they were renamed to.
    hidden: BTreeMap<String, (PathBuf, PathBuf)>,
    /// Artifacts that were hidden at some point and are now visible.
    known:  BTreeMap<String, PathBuf>,
}

impl VisibilityGuard {
    /// Creates a guard over `kind` artifacts in `dir` without hiding anything.
    pub fn new(dir: impl Into<PathBuf>, kind: ArtifactKind) -> Self {
        Self {
            dir: dir.into(),
            kind,
            hidden: BTreeMap::new(),
            known: BTreeMap::new(),
        }
    }

    /// Creates a guard and hides every artifact in `names` that exists.
    pub fn conceal_all(dir: impl Into<PathBuf>, kind: ArtifactKind, names: &[&str]) -> Result<Self> {
        let mut guard = Self::new(dir, kind);
        for name in names {
            guard.hide(name)?;
        }
        Ok(guard)
    }

    /// Path an artifact takes while hidden. Never a file that already exists,
    /// so a submitted `<name>.hidden` survives.
    fn hidden_path(&self, name: &str) -> PathBuf {
        let mut path = ArtifactKind::Hidden.file_in(&self.dir, name);
        let mut n = 1;
        while path.exists() {
            path = ArtifactKind::Hidden.file_in(&self.dir, &format!("{name}.{n}"));
            n += 1;
        }
        path
    }

    /// Renames `name` to the hidden extension. Returns false when there was
    /// nothing to hide.
    pub fn hide(&mut self, name: &str) -> Result<bool> {
        if self.hidden.contains_key(name) {
            return Ok(true);
        }
        let visible = self
            .known
            .get(name)
            .cloned()
            .unwrap_or_else(|| self.kind.file_in(&self.dir, name));
        if !visible.is_file() {
            return Ok(false);
        }
        let hidden = self.hidden_path(name);
        fs::rename(&visible, &hidden).with_context(|| {
            format!("Could not hide {} as {}", visible.display(), hidden.display())
        })?;
        self.known.remove(name);
        self.hidden.insert(name.to_string(), (visible, hidden));
        Ok(true)
    }

    /// Restores `name` to its original path. Returns false when `name` was
    /// never hidden, meaning the student did not submit it.
    pub fn reveal(&mut self, name: &str) -> Result<bool> {
        let Some((original, hidden)) = self.hidden.remove(name) else {
            return Ok(false);
        };
        fs::rename(&hidden, &original).with_context(|| {
            format!("Could not restore {} to {}", hidden.display(), original.display())
        })?;
        self.known.insert(name.to_string(), original);
        Ok(true)
    }

    /// True if `name` is currently hidden.
    pub fn is_hidden(&self, name: &str) -> bool {
        self.hidden.contains_key(name)
    }

    /// Reveals every hidden artifact.
    pub fn restore(mut self) -> Result<()> {
        self.restore_all()
    }

    /// Reveals every hidden artifact, stopping at the first failure.
    fn restore_all(&mut self) -> Result<()> {
        let names: Vec<String> = self.hidden.keys().cloned().collect();
        for name in names {
            self.reveal(&name)?;
        }
        Ok(())
    }
}

impl Drop for VisibilityGuard {
    fn drop(&mut self) {
        if let Err(e) = self.restore_all() {
            tracing::debug!("could not restore hidden artifacts: {e:#}");
        }
    }
}

#[cfg(test)]
mod tests {
    use uuid::Uuid;

    use super::*;

    fn temp_root() -> PathBuf {
        let root = std::env::temp_dir().join(format!("nandgrade-guard-{}", Uuid::new_v4()));
        fs::create_dir_all(&root).expect("create temp root");
        root
    }

    #[test]
    fn placeholder_marker_is_case_insensitive() {
        assert!(detect_placeholder("CHIP Not { BUILTIN Not; }"));
        assert!(detect_placeholder("builtIn"));
        assert!(!detect_placeholder("CHIP Not { PARTS: Nand(a=in, b=in, out=out); }"));
    }

    #[test]
    fn hide_and_reveal_round_trip_exactly() {
        let root = temp_root();
        fs::write(root.join("And.hdl"), "and").expect("write And");
        fs::write(root.join("Or.hdl"), "or").expect("write Or");

        let mut guard =
            VisibilityGuard::conceal_all(&root, ArtifactKind::Hdl, &["And", "Or", "Xor"])
                .expect("conceal");
        assert!(guard.is_hidden("And"));
        assert!(!guard.is_hidden("Xor"));
        assert!(!root.join("And.hdl").exists());
        assert!(root.join("And.hidden").is_file());

        assert!(guard.reveal("And").expect("reveal And"));
        assert!(!guard.reveal("Xor").expect("reveal Xor"));
        assert_eq!(fs::read_to_string(root.join("And.hdl")).expect("read"), "and");
        assert!(guard.hide("And").expect("hide again"));

        guard.restore().expect("restore");
        assert!(root.join("And.hdl").is_file());
        assert!(root.join("Or.hdl").is_file());
        assert!(!root.join("Or.hidden").exists());

        let _ = fs::remove_dir_all(root);
    }

    #[test]
    fn submitted_hidden_file_survives_hiding() {
        let root = temp_root();
        fs::write(root.join("Not.hdl"), "not").expect("write Not");
        fs::write(root.join("Not.hidden"), "student notes").expect("write Not.hidden");

        let mut guard =
            VisibilityGuard::conceal_all(&root, ArtifactKind::Hdl, &["Not"]).expect("conceal");
        assert!(!root.join("Not.hdl").exists());
        assert_eq!(
            fs::read_to_string(root.join("Not.hidden")).expect("read"),
            "student notes"
        );

        assert!(guard.reveal("Not").expect("reveal"));
        assert_eq!(fs::read_to_string(root.join("Not.hdl")).expect("read"), "not");
        assert_eq!(
            fs::read_to_string(root.join("Not.hidden")).expect("read"),
            "student notes"
        );
        assert!(!root.join("Not.1.hidden").exists());

        let _ = fs::remove_dir_all(root);
    }

    #[test]
    fn dropping_the_guard_restores_everything() {
        let root = temp_root();
        fs::write(root.join("Mux.hdl"), "mux").expect("write Mux");
        {
            let _guard = VisibilityGuard::conceal_all(&root, ArtifactKind::Hdl, &["Mux"])
                .expect("conceal");
            assert!(!root.join("Mux.hdl").exists());
        }
        assert!(root.join("Mux.hdl").is_file());
        let _ = fs::remove_dir_all(root);
    }
}
