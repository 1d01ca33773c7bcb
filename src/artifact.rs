#![warn(missing_docs)]
#![warn(clippy::missing_docs_in_private_items)]

//! File kinds the pipelines reason about.

use std::{
    fmt::Display,
    path::{Path, PathBuf},
};

use serde::{Deserialize, Serialize};

use crate::constants::HIDDEN_EXTENSION;

/// Every file extension that carries meaning for some pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ArtifactKind {
    /// Plain text (project 0).
    Txt,
    /// Hardware description of a chip.
    Hdl,
    /// Test script driving one of the course tools.
    Tst,
    /// Expected output of a test script.
    Cmp,
    /// Output a test script produced.
    Out,
    /// Hack assembly.
    Asm,
    /// Assembled Hack machine code.
    Hack,
    /// Virtual-machine code.
    Vm,
    /// Jack source.
    Jack,
    /// Parse tree emitted by the syntax analyzer.
    Xml,
    /// An artifact concealed from the course tools.
    Hidden,
}

impl ArtifactKind {
    /// Extension without the leading dot.
    pub fn extension(self) -> &'static str {
        match self {
            ArtifactKind::Txt => "txt",
            ArtifactKind::Hdl => "hdl",
            ArtifactKind::Tst => "tst",
            ArtifactKind::Cmp => "cmp",
            ArtifactKind::Out => "out",
            ArtifactKind::Asm => "asm",
            ArtifactKind::Hack => "hack",
            ArtifactKind::Vm => "vm",
            ArtifactKind::Jack => "jack",
            ArtifactKind::Xml => "xml",
            ArtifactKind::Hidden => HIDDEN_EXTENSION,
        }
    }

    /// Classifies a path by its extension, ignoring case.
    pub fn of(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_ascii_lowercase();
        [
            ArtifactKind::Txt,
            ArtifactKind::Hdl,
            ArtifactKind::Tst,
            ArtifactKind::Cmp,
            ArtifactKind::Out,
            ArtifactKind::Asm,
            ArtifactKind::Hack,
            ArtifactKind::Vm,
            ArtifactKind::Jack,
            ArtifactKind::Xml,
            ArtifactKind::Hidden,
        ]
        .into_iter()
        .find(|kind| kind.extension() == ext)
    }

    /// True if `path` carries this kind's extension (any letter case).
    pub fn matches(self, path: &Path) -> bool {
        Self::of(path) == Some(self)
    }

    /// `dir/stem.<ext>`.
    pub fn file_in(self, dir: &Path, stem: &str) -> PathBuf {
        dir.join(format!("{stem}.{}", self.extension()))
    }
}

impl Display for ArtifactKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, ".{}", self.extension())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classification_ignores_case() {
        assert_eq!(ArtifactKind::of(Path::new("Mux.HDL")), Some(ArtifactKind::Hdl));
        assert_eq!(ArtifactKind::of(Path::new("a/b/Main.vm")), Some(ArtifactKind::Vm));
        assert_eq!(ArtifactKind::of(Path::new("README")), None);
        assert_eq!(ArtifactKind::of(Path::new("notes.md")), None);
    }

    #[test]
    fn file_in_appends_extension() {
        let path = ArtifactKind::Tst.file_in(Path::new("/w"), "And");
        assert_eq!(path, PathBuf::from("/w/And.tst"));
    }
}
