#![warn(missing_docs)]
#![warn(clippy::missing_docs_in_private_items)]

//! How a student's own translator (assembler, VM translator, compiler) is
//! built and run, keyed by the language named in its `lang.txt`.

use std::{fs, path::Path};

use serde::{Deserialize, Serialize};

use crate::constants::PREBUILT_MARKER;

/// Built-in table used when no override is configured.
const DEFAULT_LANGUAGES: &str = include_str!("assets/languages.json");

/// Problems loading a language table.
#[derive(thiserror::Error, Debug)]
pub enum LanguageError {
    /// The table file could not be read.
    #[error("could not read language table {path}")]
    Read {
        /// Path that was tried.
        path:   String,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },
    /// The table is not valid JSON of the expected shape.
    #[error("invalid language table: {0}")]
    Parse(#[from] serde_json::Error),
    /// The table defines no languages.
    #[error("language table is empty")]
    Empty,
}

/// Shell command templates for one language.
///
/// `{program}` expands to the translator's conventional name and `{input}` to
/// the quoted file or directory being translated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LanguageSpec {
    /// Canonical language name.
    pub name:    String,
    /// Other spellings accepted in `lang.txt`.
    #[serde(default)]
    pub aliases: Vec<String>,
    /// Build command, if the language needs one.
    #[serde(default)]
    pub build:   Option<String>,
    /// Command translating one input.
    pub run:     String,
}

impl LanguageSpec {
    /// True if `word` names this language.
    fn answers_to(&self, word: &str) -> bool {
        self.name == word || self.aliases.iter().any(|a| a == word)
    }
}

/// On-disk shape of the table.
#[derive(Debug, Serialize, Deserialize)]
struct LanguagesJson {
    /// All configured languages.
    languages: Vec<LanguageSpec>,
}

/// Language configuration lookup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LanguageTable {
    /// Configured languages in declaration order.
    languages: Vec<LanguageSpec>,
}

impl Default for LanguageTable {
    fn default() -> Self {
        match Self::parse(DEFAULT_LANGUAGES) {
            Ok(table) => table,
            Err(e) => {
                tracing::error!("built-in language table is invalid: {e}");
                Self { languages: vec![] }
            }
        }
    }
}

impl LanguageTable {
    /// Parses a JSON table.
    pub fn parse(content: &str) -> Result<Self, LanguageError> {
        let parsed: LanguagesJson = serde_json::from_str(content)?;
        if parsed.languages.is_empty() {
            return Err(LanguageError::Empty);
        }
        Ok(Self {
            languages: parsed.languages,
        })
    }

    /// Loads a JSON table from `path`.
    pub fn load(path: &Path) -> Result<Self, LanguageError> {
        let content = fs::read_to_string(path).map_err(|source| LanguageError::Read {
            path: path.display().to_string(),
            source,
        })?;
        Self::parse(&content)
    }

    /// Looks a language up by name or alias.
    pub fn get(&self, name: &str) -> Option<&LanguageSpec> {
        let name = name.trim().to_lowercase();
        self.languages.iter().find(|l| l.answers_to(&name))
    }

    /// Decides what a `lang.txt` marker (already lower-cased) asks for.
    ///
    /// A marker naming a language exactly wins over the pre-built marker, so
    /// `makefile` still selects `make`.
    pub fn resolve(&self, marker: &str) -> SourceMode {
        let wanted = marker.trim();
        if let Some(spec) = self.get(wanted) {
            return SourceMode::Program(spec.clone());
        }
        if wanted.contains(PREBUILT_MARKER) {
            return SourceMode::Prebuilt;
        }
        if wanted.is_empty() {
            return SourceMode::Unknown(String::new());
        }
        wanted
            .split(|c: char| c.is_whitespace() || c == ',')
            .find_map(|word| self.get(word))
            .map(|spec| SourceMode::Program(spec.clone()))
            .unwrap_or_else(|| SourceMode::Unknown(wanted.to_string()))
    }

    /// Canonical names of all configured languages.
    pub fn names(&self) -> Vec<&str> {
        self.languages.iter().map(|l| l.name.as_str()).collect()
    }
}

/// What a submission's language marker selected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceMode {
    /// Build and run the student's translator written in this language.
    Program(LanguageSpec),
    /// The submission ships translated output instead of a translator.
    Prebuilt,
    /// The marker is missing or names nothing we know how to run.
    Unknown(String),
}

/// A student translator bound to its conventional program name.
#[derive(Debug, Clone)]
pub struct Launcher {
    /// Language templates.
    language: LanguageSpec,
    /// Conventional name of the translator for the project.
    program:  String,
}

impl Launcher {
    /// Binds `language` to `program`.
    pub fn new(language: LanguageSpec, program: impl Into<String>) -> Self {
        Self {
            language,
            program: program.into(),
        }
    }

    /// Expanded build command, if any.
    pub fn build_command(&self) -> Option<String> {
        self.language
            .build
            .as_ref()
            .map(|cmd| cmd.replace("{program}", &self.program))
    }

    /// Expanded command translating `input`.
    pub fn run_command(&self, input: &Path) -> String {
        self.language
            .run
            .replace("{program}", &self.program)
            .replace("{input}", &shell_quote(&input.display().to_string()))
    }
}

/// Single-quotes `raw` for `sh -c`.
fn shell_quote(raw: &str) -> String {
    format!("'{}'", raw.replace('\'', r"'\''"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn built_in_table_knows_common_languages() {
        let table = LanguageTable::default();
        assert!(table.get("Python").is_some());
        assert!(table.get("cpp").is_some());
        assert_eq!(table.get("c++").map(|l| l.name.as_str()), Some("c++"));
        assert!(table.get("cobol").is_none());
    }

    #[test]
    fn markers_resolve_to_modes() {
        let table = LanguageTable::default();
        assert_eq!(table.resolve("file\n"), SourceMode::Prebuilt);
        assert_eq!(table.resolve("output files"), SourceMode::Prebuilt);
        assert!(matches!(table.resolve("makefile"), SourceMode::Program(l) if l.name == "make"));
        assert!(matches!(table.resolve("python3\n"), SourceMode::Program(l) if l.name == "python"));
        assert!(matches!(table.resolve("my language is java"), SourceMode::Program(l) if l.name == "java"));
        assert_eq!(table.resolve(""), SourceMode::Unknown(String::new()));
        assert_eq!(table.resolve("cobol"), SourceMode::Unknown("cobol".into()));
    }

    #[test]
    fn launcher_expands_placeholders() {
        let table = LanguageTable::default();
        let java = table.get("java").cloned().expect("java");
        let launcher = Launcher::new(java, "JackCompiler");
        assert_eq!(
            launcher.run_command(Path::new("/w/Seven")),
            "java -cp . JackCompiler '/w/Seven'"
        );
        assert!(launcher.build_command().is_some());
    }

    #[test]
    fn rejects_empty_tables() {
        assert!(matches!(
            LanguageTable::parse(r#"{"languages": []}"#),
            Err(LanguageError::Empty)
        ));
    }
}
