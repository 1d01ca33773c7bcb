#![warn(missing_docs)]
#![warn(clippy::missing_docs_in_private_items)]

//! The uniform boundary to the course tools and to student translators.

use std::{
    ffi::OsString,
    fmt::Display,
    future::Future,
    path::{Path, PathBuf},
    time::Duration,
};

use anyhow::{Context, Result};
use which::which;

use crate::{
    artifact::ArtifactKind,
    config::GraderConfig,
    constants::COMPARISON_SUCCESS,
    languages::Launcher,
    process::{self, Collected, ProcessError},
};

/// The five deterministic course tools.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EvaluatorKind {
    /// Runs a chip test script in the hardware simulator.
    StructuralCircuit,
    /// Assembles a `.asm` program into `.hack`.
    Assemble,
    /// Runs a test script in the CPU emulator.
    InstructionEmulate,
    /// Runs a test script in the VM emulator.
    VmEmulate,
    /// Compiles a `.jack` class into `.vm`.
    CompileSource,
}

impl EvaluatorKind {
    /// Name of the script implementing this tool.
    pub fn script(self) -> &'static str {
        match self {
            EvaluatorKind::StructuralCircuit => "HardwareSimulator.sh",
            EvaluatorKind::Assemble => "Assembler.sh",
            EvaluatorKind::InstructionEmulate => "CPUEmulator.sh",
            EvaluatorKind::VmEmulate => "VMEmulator.sh",
            EvaluatorKind::CompileSource => "JackCompiler.sh",
        }
    }

    /// Kind of the file the tool is pointed at.
    pub fn input(self) -> ArtifactKind {
        match self {
            EvaluatorKind::Assemble => ArtifactKind::Asm,
            EvaluatorKind::CompileSource => ArtifactKind::Jack,
            EvaluatorKind::StructuralCircuit
            | EvaluatorKind::InstructionEmulate
            | EvaluatorKind::VmEmulate => ArtifactKind::Tst,
        }
    }

    /// True for tools that run a test script and compare against a `.cmp`.
    pub fn compares(self) -> bool {
        self.input() == ArtifactKind::Tst
    }
}

impl Display for EvaluatorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            EvaluatorKind::StructuralCircuit => "hardware simulator",
            EvaluatorKind::Assemble => "assembler",
            EvaluatorKind::InstructionEmulate => "CPU emulator",
            EvaluatorKind::VmEmulate => "VM emulator",
            EvaluatorKind::CompileSource => "Jack compiler",
        };
        f.write_str(name)
    }
}

/// Result of building a student translator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildOutcome {
    /// Whether the build succeeded.
    pub success: bool,
    /// Everything the build printed.
    pub output:  String,
}

impl BuildOutcome {
    /// A build that needed no work.
    pub fn nothing_to_do() -> Self {
        Self {
            success: true,
            output:  String::new(),
        }
    }
}

/// Capabilities a grading run needs from the outside world.
///
/// Every method returns `Ok("")` (or a successful [`BuildOutcome`]) on
/// success and a diagnostic otherwise; `Err` is reserved for failing to
/// invoke the tool at all.
pub trait Toolchain: Send + Sync {
    /// Runs `kind` on `dir/<test>.<input ext>`, returning the first mismatch
    /// or error it reports.
    fn evaluate(
        &self,
        kind: EvaluatorKind,
        dir: &Path,
        test: &str,
    ) -> impl Future<Output = Result<String>> + Send;

    /// Builds the student's translator inside `root`.
    fn build(
        &self,
        root: &Path,
        launcher: &Launcher,
    ) -> impl Future<Output = Result<BuildOutcome>> + Send;

    /// Runs the student's translator on `input` from inside `root`, returning
    /// what it printed.
    fn translate(
        &self,
        root: &Path,
        launcher: &Launcher,
        input: &Path,
    ) -> impl Future<Output = Result<String>> + Send;
}

/// Gateway that shells out to the course tool scripts and to student
/// translators, bounding every call with a timeout.
#[derive(Debug, Clone)]
pub struct CommandToolchain {
    /// Directory searched for tool scripts before `PATH`.
    tools_dir:     PathBuf,
    /// Bound on each tool call.
    eval_timeout:  Duration,
    /// Bound on a translator build.
    build_timeout: Duration,
    /// Bound on one translator run.
    run_timeout:   Duration,
}

impl CommandToolchain {
    /// Creates a gateway from the grader configuration.
    pub fn new(config: &GraderConfig) -> Self {
        Self {
            tools_dir:     config.tools_dir().to_path_buf(),
            eval_timeout:  config.eval_timeout(),
            build_timeout: config.build_timeout(),
            run_timeout:   config.run_timeout(),
        }
    }

    /// Finds the script for `kind` in the tools directory or on `PATH`.
    pub fn tool_path(&self, kind: EvaluatorKind) -> Result<PathBuf> {
        let local = self.tools_dir.join(kind.script());
        if local.is_file() {
            return Ok(local);
        }
        which(kind.script()).with_context(|| {
            format!(
                "Cannot find the {kind} ({}) in {} or on PATH",
                kind.script(),
                self.tools_dir.display()
            )
        })
    }

    /// Turns what a tool printed into a diagnostic, empty on success.
    fn interpret(kind: EvaluatorKind, collected: &Collected) -> String {
        let output = collected.combined_output();
        if kind.compares() {
            if output.to_lowercase().contains(COMPARISON_SUCCESS) {
                String::new()
            } else if output.is_empty() {
                format!("The {kind} produced no output")
            } else {
                output
            }
        } else if collected.status.success() && collected.stderr_text().is_empty() {
            String::new()
        } else if output.is_empty() {
            format!("The {kind} exited with {}", collected.status)
        } else {
            output
        }
    }

    /// Runs `command` through `sh -c` inside `root`.
    async fn shell(
        &self,
        root: &Path,
        command: &str,
        deadline: Duration,
    ) -> Result<Collected, ProcessError> {
        let args = [OsString::from("-c"), OsString::from(command)];
        process::run_collect("sh", &args, root, Some(deadline)).await
    }
}

impl Toolchain for CommandToolchain {
    async fn evaluate(&self, kind: EvaluatorKind, dir: &Path, test: &str) -> Result<String> {
        let tool = self.tool_path(kind)?;
        let target = kind.input().file_in(dir, test);
        tracing::debug!("running the {kind} on {}", target.display());

        match process::run_collect(
            tool.as_os_str(),
            &[target.into_os_string()],
            dir,
            Some(self.eval_timeout),
        )
        .await
        {
            Ok(collected) => Ok(Self::interpret(kind, &collected)),
            Err(ProcessError::TimedOut(limit)) => {
                Ok(format!("Timed out after {}s", limit.as_secs()))
            }
            Err(e) => Err(e).with_context(|| format!("Could not run the {kind} for {test}")),
        }
    }

    async fn build(&self, root: &Path, launcher: &Launcher) -> Result<BuildOutcome> {
        let Some(command) = launcher.build_command() else {
            return Ok(BuildOutcome::nothing_to_do());
        };
        tracing::debug!("building student translator: {command}");

        match self.shell(root, &command, self.build_timeout).await {
            Ok(collected) => Ok(BuildOutcome {
                success: collected.status.success(),
                output:  collected.combined_output(),
            }),
            Err(ProcessError::TimedOut(limit)) => Ok(BuildOutcome {
                success: false,
                output:  format!("Build timed out after {}s", limit.as_secs()),
            }),
            Err(e) => Err(e).context("Could not start the build of the student translator"),
        }
    }

    async fn translate(&self, root: &Path, launcher: &Launcher, input: &Path) -> Result<String> {
        let command = launcher.run_command(input);
        tracing::debug!("running student translator: {command}");

        match self.shell(root, &command, self.run_timeout).await {
            Ok(collected) => Ok(collected.combined_output()),
            Err(ProcessError::TimedOut(limit)) => {
                Ok(format!("Timed out after {}s", limit.as_secs()))
            }
            Err(e) => Err(e).context("Could not start the student translator"),
        }
    }
}

#[cfg(all(test, unix))]
mod tests {
    use std::fs;

    use uuid::Uuid;

    use super::*;
    use crate::languages::LanguageSpec;

    struct Tools {
        root:      PathBuf,
        toolchain: CommandToolchain,
    }

    impl Tools {
        fn new() -> Self {
            let root = std::env::temp_dir().join(format!("nandgrade-tools-{}", Uuid::new_v4()));
            fs::create_dir_all(root.join("tools")).expect("create tools dir");
            let config = GraderConfig::builder()
                .tools_dir(root.join("tools"))
                .eval_timeout(Duration::from_secs(1))
                .run_timeout(Duration::from_secs(1))
                .build();
            Self {
                toolchain: CommandToolchain::new(&config),
                root,
            }
        }

        /// Installs `body` as the script for `kind`. The file is written by a
        /// child shell so no writable handle to it stays open in this process.
        fn install(&self, kind: EvaluatorKind, body: &str, executable: bool) {
            let path = self.root.join("tools").join(kind.script());
            let mode = if executable { "755" } else { "644" };
            let status = std::process::Command::new("sh")
                .arg("-c")
                .arg(r#"printf '#!/bin/sh\n%s\n' "$1" > "$2" && chmod "$3" "$2""#)
                .args(["sh", body, &path.to_string_lossy(), mode])
                .status()
                .expect("write tool script");
            assert!(status.success());
        }
    }

    impl Drop for Tools {
        fn drop(&mut self) {
            let _ = fs::remove_dir_all(&self.root);
        }
    }

    #[tokio::test]
    async fn success_phrase_means_no_diagnostic() {
        let tools = Tools::new();
        tools.install(
            EvaluatorKind::StructuralCircuit,
            "echo 'End of script - Comparison ended successfully'",
            true,
        );

        let diagnostic = tools
            .toolchain
            .evaluate(EvaluatorKind::StructuralCircuit, &tools.root, "And")
            .await
            .expect("evaluate");
        assert_eq!(diagnostic, "");
    }

    #[tokio::test]
    async fn comparison_output_is_the_diagnostic() {
        let tools = Tools::new();
        tools.install(
            EvaluatorKind::VmEmulate,
            "echo 'Comparison failure at line 3' >&2; exit 1",
            true,
        );
        tools.install(EvaluatorKind::InstructionEmulate, "exit 0", true);

        let toolchain = &tools.toolchain;
        let diagnostic = toolchain
            .evaluate(EvaluatorKind::VmEmulate, &tools.root, "BasicTest")
            .await
            .expect("evaluate");
        assert_eq!(diagnostic, "Comparison failure at line 3");

        let diagnostic = toolchain
            .evaluate(EvaluatorKind::InstructionEmulate, &tools.root, "Mult")
            .await
            .expect("evaluate");
        assert_eq!(diagnostic, "The CPU emulator produced no output");
    }

    #[tokio::test]
    async fn assembler_and_compiler_fail_on_exit_status_or_stderr() {
        let tools = Tools::new();
        tools.install(EvaluatorKind::Assemble, "exit 3", true);
        tools.install(
            EvaluatorKind::CompileSource,
            "echo 'In Main.jack (line 2): Expected }' >&2",
            true,
        );

        let toolchain = &tools.toolchain;
        let diagnostic = toolchain
            .evaluate(EvaluatorKind::Assemble, &tools.root, "Mult")
            .await
            .expect("evaluate");
        assert!(diagnostic.starts_with("The assembler exited with"), "{diagnostic}");

        let diagnostic = toolchain
            .evaluate(EvaluatorKind::CompileSource, &tools.root, "Main")
            .await
            .expect("evaluate");
        assert_eq!(diagnostic, "In Main.jack (line 2): Expected }");
    }

    #[tokio::test]
    async fn quiet_successful_assembly_passes() {
        let tools = Tools::new();
        tools.install(EvaluatorKind::Assemble, "echo 'Assembling Mult.asm'", true);

        let diagnostic = tools
            .toolchain
            .evaluate(EvaluatorKind::Assemble, &tools.root, "Mult")
            .await
            .expect("evaluate");
        assert_eq!(diagnostic, "");
    }

    #[tokio::test]
    async fn tools_dir_script_is_preferred() {
        let tools = Tools::new();
        tools.install(EvaluatorKind::VmEmulate, "exit 0", true);

        let path = tools
            .toolchain
            .tool_path(EvaluatorKind::VmEmulate)
            .expect("tool path");
        assert_eq!(path, tools.root.join("tools").join("VMEmulator.sh"));
    }

    #[tokio::test]
    async fn hung_tool_becomes_a_timeout_diagnostic() {
        let tools = Tools::new();
        tools.install(EvaluatorKind::StructuralCircuit, "sleep 30; echo done", true);

        let diagnostic = tools
            .toolchain
            .evaluate(EvaluatorKind::StructuralCircuit, &tools.root, "Mux")
            .await
            .expect("evaluate");
        assert_eq!(diagnostic, "Timed out after 1s");
    }

    #[tokio::test]
    async fn tool_that_cannot_start_is_an_error() {
        let tools = Tools::new();
        tools.install(EvaluatorKind::StructuralCircuit, "exit 0", false);

        let err = tools
            .toolchain
            .evaluate(EvaluatorKind::StructuralCircuit, &tools.root, "Mux")
            .await
            .expect_err("not executable");
        assert!(format!("{err:#}").contains("Could not run the hardware simulator for Mux"));
    }

    #[tokio::test]
    async fn student_translator_is_run_through_the_shell() {
        let tools = Tools::new();
        let spec = LanguageSpec {
            name:    "shell".to_string(),
            aliases: Vec::new(),
            build:   Some("test -d .".to_string()),
            run:     "echo translating {input}; sleep {program}".to_string(),
        };

        let quick = Launcher::new(spec.clone(), "0");
        let outcome = tools
            .toolchain
            .build(&tools.root, &quick)
            .await
            .expect("build");
        assert!(outcome.success);
        let printed = tools
            .toolchain
            .translate(&tools.root, &quick, Path::new("Add.asm"))
            .await
            .expect("translate");
        assert_eq!(printed, "translating Add.asm");

        let slow = Launcher::new(spec, "30");
        let printed = tools
            .toolchain
            .translate(&tools.root, &slow, Path::new("Add.asm"))
            .await
            .expect("translate");
        assert_eq!(printed, "Timed out after 1s");
    }
}
