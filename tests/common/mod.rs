//! Shared scaffolding for the integration tests: a throwaway directory tree
//! holding a submission, fixtures and workspaces, plus a scripted toolchain.

#![allow(dead_code)]

use std::{
    fs,
    path::{Path, PathBuf},
    sync::{Arc, Mutex},
};

use anyhow::Result;
use nandgrade::{
    BuildOutcome, EvaluatorKind, GraderConfig, Grader, Toolchain, languages::Launcher,
};
use uuid::Uuid;

/// Decides the diagnostic of one evaluator call.
type EvaluateFn = dyn Fn(EvaluatorKind, &Path, &str) -> Result<String> + Send + Sync;
/// Plays the student's translator: `(root, input) -> printed output`.
type TranslateFn = dyn Fn(&Path, &Path) -> Result<String> + Send + Sync;

/// One recorded evaluator call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Call {
    pub kind: EvaluatorKind,
    pub dir:  PathBuf,
    pub test: String,
}

/// Toolchain whose answers are scripted by the test.
pub struct MockToolchain {
    evaluate:     Box<EvaluateFn>,
    translate:    Box<TranslateFn>,
    build:        BuildOutcome,
    calls:        Mutex<Vec<Call>>,
    translations: Mutex<Vec<PathBuf>>,
    builds:       Mutex<usize>,
}

impl MockToolchain {
    /// Every evaluation passes; the translator prints nothing and writes
    /// nothing.
    pub fn passing() -> Self {
        Self::evaluating(|_, _, _| Ok(String::new()))
    }

    /// Evaluations answered by `f`.
    pub fn evaluating(
        f: impl Fn(EvaluatorKind, &Path, &str) -> Result<String> + Send + Sync + 'static,
    ) -> Self {
        Self {
            evaluate:     Box::new(f),
            translate:    Box::new(|_, _| Ok(String::new())),
            build:        BuildOutcome::nothing_to_do(),
            calls:        Mutex::new(Vec::new()),
            translations: Mutex::new(Vec::new()),
            builds:       Mutex::new(0),
        }
    }

    /// Translator runs answered by `f`.
    pub fn translating(
        mut self,
        f: impl Fn(&Path, &Path) -> Result<String> + Send + Sync + 'static,
    ) -> Self {
        self.translate = Box::new(f);
        self
    }

    /// Builds end with `outcome`.
    pub fn building(mut self, outcome: BuildOutcome) -> Self {
        self.build = outcome;
        self
    }

    /// Evaluator calls made so far.
    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().expect("calls lock").clone()
    }

    /// Tests evaluated with `kind`, in call order.
    pub fn tests_run(&self, kind: EvaluatorKind) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter(|c| c.kind == kind)
            .map(|c| c.test)
            .collect()
    }

    /// Inputs handed to the translator so far.
    pub fn translations(&self) -> Vec<PathBuf> {
        self.translations.lock().expect("translations lock").clone()
    }

    /// How many builds were requested.
    pub fn builds(&self) -> usize {
        *self.builds.lock().expect("builds lock")
    }
}

impl Toolchain for MockToolchain {
    async fn evaluate(&self, kind: EvaluatorKind, dir: &Path, test: &str) -> Result<String> {
        self.calls.lock().expect("calls lock").push(Call {
            kind,
            dir: dir.to_path_buf(),
            test: test.to_string(),
        });
        (self.evaluate)(kind, dir, test)
    }

    async fn build(&self, _root: &Path, _launcher: &Launcher) -> Result<BuildOutcome> {
        *self.builds.lock().expect("builds lock") += 1;
        Ok(self.build.clone())
    }

    async fn translate(&self, root: &Path, _launcher: &Launcher, input: &Path) -> Result<String> {
        self.translations
            .lock()
            .expect("translations lock")
            .push(input.to_path_buf());
        (self.translate)(root, input)
    }
}

/// A temporary tree with `submission/`, `fixtures/` and `workspaces/`.
pub struct Sandbox {
    pub root: PathBuf,
}

impl Sandbox {
    pub fn new(label: &str) -> Self {
        let root = std::env::temp_dir().join(format!("nandgrade-{label}-{}", Uuid::new_v4()));
        fs::create_dir_all(root.join("submission")).expect("create submission dir");
        fs::create_dir_all(root.join("fixtures")).expect("create fixtures dir");
        Self { root }
    }

    pub fn submission(&self) -> PathBuf {
        self.root.join("submission")
    }

    pub fn tests_dir(&self) -> PathBuf {
        self.root.join("fixtures")
    }

    pub fn temp_dir(&self) -> PathBuf {
        self.root.join("workspaces")
    }

    /// Writes `content` to `rel` inside the submission.
    pub fn submit(&self, rel: &str, content: &str) {
        write(&self.submission().join(rel), content);
    }

    /// Writes `content` to `rel` inside the fixture tree of `project`.
    pub fn fixture(&self, project: u8, rel: &str, content: &str) {
        write(&self.tests_dir().join(format!("p{project}")).join(rel), content);
    }

    /// Creates an empty fixture tree for `project`.
    pub fn empty_fixture(&self, project: u8) {
        fs::create_dir_all(self.tests_dir().join(format!("p{project}"))).expect("create fixture");
    }

    pub fn config(&self) -> GraderConfig {
        GraderConfig::builder()
            .tests_dir(self.tests_dir())
            .temp_dir(self.temp_dir())
            .tools_dir(self.root.join("tools"))
            .build()
    }

    pub fn grader<T: Toolchain>(&self, toolchain: T) -> Grader<T> {
        Grader::builder()
            .config(Arc::new(self.config()))
            .toolchain(toolchain)
            .build()
    }

    /// Number of workspaces still on disk.
    pub fn leftover_workspaces(&self) -> usize {
        match fs::read_dir(self.temp_dir()) {
            Ok(entries) => entries.count(),
            Err(_) => 0,
        }
    }
}

impl Drop for Sandbox {
    fn drop(&mut self) {
        let _ = fs::remove_dir_all(&self.root);
    }
}

/// Writes `content` to `path`, creating parent directories.
pub fn write(path: &Path, content: &str) {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).expect("create parent dir");
    }
    fs::write(path, content).expect("write file");
}
