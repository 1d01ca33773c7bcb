#![warn(missing_docs)]
#![warn(clippy::missing_docs_in_private_items)]

use std::{
    path::{Path, PathBuf},
    sync::{Arc, Mutex, OnceLock},
    time::Duration,
};

use anyhow::Result;
use bon::Builder;

use crate::languages::LanguageTable;

/// Default per-call timeout for the course tools, in seconds.
const DEFAULT_EVAL_TIMEOUT_SECS: u64 = 60;
/// Default timeout for building a student translator, in seconds.
const DEFAULT_BUILD_TIMEOUT_SECS: u64 = 120;
/// Default timeout for one run of a student translator, in seconds.
const DEFAULT_RUN_TIMEOUT_SECS: u64 = 60;

/// Everything a grading run needs to know about its surroundings.
#[derive(Debug, Clone, Builder)]
#[builder(on(PathBuf, into))]
pub struct GraderConfig {
    /// Root holding one fixture tree per project (`p0`, `p1`, ...).
    #[builder(default = PathBuf::from("grader/tests"))]
    tests_dir:     PathBuf,
    /// Parent directory for per-run workspaces.
    #[builder(default = PathBuf::from("grader/temp"))]
    temp_dir:      PathBuf,
    /// Directory holding the course tool scripts.
    #[builder(default = PathBuf::from("tools"))]
    tools_dir:     PathBuf,
    /// Bound on each course-tool invocation.
    #[builder(default = Duration::from_secs(DEFAULT_EVAL_TIMEOUT_SECS))]
    eval_timeout:  Duration,
    /// Bound on building a student translator.
    #[builder(default = Duration::from_secs(DEFAULT_BUILD_TIMEOUT_SECS))]
    build_timeout: Duration,
    /// Bound on one run of a student translator.
    #[builder(default = Duration::from_secs(DEFAULT_RUN_TIMEOUT_SECS))]
    run_timeout:   Duration,
    /// How student translators are built and run, keyed by language.
    #[builder(default)]
    languages:     LanguageTable,
}

impl Default for GraderConfig {
    fn default() -> Self {
        Self::builder().build()
    }
}

impl GraderConfig {
    /// Construct a configuration from `NANDGRADE_*` environment variables,
    /// falling back to defaults for anything unset or unparseable.
    pub fn from_env() -> Result<Self> {
        let languages = match std::env::var("NANDGRADE_LANGUAGES") {
            Ok(path) if !path.trim().is_empty() => LanguageTable::load(Path::new(path.trim()))?,
            _ => LanguageTable::default(),
        };

        Ok(Self::builder()
            .tests_dir(read_path("NANDGRADE_TESTS_DIR", "grader/tests"))
            .temp_dir(read_path("NANDGRADE_TEMP_DIR", "grader/temp"))
            .tools_dir(read_path("NANDGRADE_TOOLS_DIR", "tools"))
            .eval_timeout(read_timeout_secs("NANDGRADE_EVAL_TIMEOUT_SECS", DEFAULT_EVAL_TIMEOUT_SECS))
            .build_timeout(read_timeout_secs(
                "NANDGRADE_BUILD_TIMEOUT_SECS",
                DEFAULT_BUILD_TIMEOUT_SECS,
            ))
            .run_timeout(read_timeout_secs("NANDGRADE_RUN_TIMEOUT_SECS", DEFAULT_RUN_TIMEOUT_SECS))
            .languages(languages)
            .build())
    }

    /// Returns a copy with the given overrides applied.
    pub fn with_dirs(
        mut self,
        tests_dir: Option<PathBuf>,
        temp_dir: Option<PathBuf>,
        tools_dir: Option<PathBuf>,
    ) -> Self {
        if let Some(dir) = tests_dir {
            self.tests_dir = dir;
        }
        if let Some(dir) = temp_dir {
            self.temp_dir = dir;
        }
        if let Some(dir) = tools_dir {
            self.tools_dir = dir;
        }
        self
    }

    /// Root of the per-project fixture trees.
    pub fn tests_dir(&self) -> &Path {
        &self.tests_dir
    }

    /// Parent directory for workspaces.
    pub fn temp_dir(&self) -> &Path {
        &self.temp_dir
    }

    /// Directory holding the course tools.
    pub fn tools_dir(&self) -> &Path {
        &self.tools_dir
    }

    /// Per-call bound for the course tools.
    pub fn eval_timeout(&self) -> Duration {
        self.eval_timeout
    }

    /// Bound on building a student translator.
    pub fn build_timeout(&self) -> Duration {
        self.build_timeout
    }

    /// Bound on one run of a student translator.
    pub fn run_timeout(&self) -> Duration {
        self.run_timeout
    }

    /// Student translator build/run table.
    pub fn languages(&self) -> &LanguageTable {
        &self.languages
    }
}

/// Global storage for the lazily constructed configuration.
static CONFIG_SLOT: OnceLock<Mutex<Option<Arc<GraderConfig>>>> = OnceLock::new();

/// Returns the mutex guarding the global configuration slot.
fn slot() -> &'static Mutex<Option<Arc<GraderConfig>>> {
    CONFIG_SLOT.get_or_init(|| Mutex::new(None))
}

/// Ensure the global configuration has been initialized from the environment
/// and return it.
pub fn get() -> Result<Arc<GraderConfig>> {
    let mut guard = slot()
        .lock()
        .map_err(|_| anyhow::anyhow!("config slot poisoned"))?;
    if let Some(cfg) = guard.as_ref() {
        return Ok(Arc::clone(cfg));
    }

    let cfg = Arc::new(GraderConfig::from_env()?);
    *guard = Some(Arc::clone(&cfg));
    Ok(cfg)
}

/// Reads a path from the environment, ignoring blank values.
fn read_path(env: &str, default: &str) -> PathBuf {
    std::env::var(env)
        .ok()
        .map(|value| value.trim().to_owned())
        .filter(|value| !value.is_empty())
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(default))
}

/// Parses an environment variable into a `Duration`, falling back to
/// `default_secs` when parsing fails or the variable is missing.
fn read_timeout_secs(env: &str, default_secs: u64) -> Duration {
    std::env::var(env)
        .ok()
        .and_then(|value| value.trim().parse::<u64>().ok())
        .map(Duration::from_secs)
        .unwrap_or_else(|| Duration::from_secs(default_secs))
}
