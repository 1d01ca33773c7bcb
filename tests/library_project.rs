//! Project 12: compiling the operating system and telling apart modules that
//! are broken on their own from modules broken by their neighbours.

mod common;

use std::{fs, path::Path};

use common::{MockToolchain, Sandbox, write};
use nandgrade::{EvaluatorKind, OutcomeKind, Report};

const MODULES: [&str; 8] = [
    "Array", "Keyboard", "Math", "Memory", "Output", "Screen", "String", "Sys",
];

fn library_fixtures(sandbox: &Sandbox) {
    for module in MODULES {
        sandbox.fixture(12, &format!("OS/{module}.vm"), &format!("reference {module}"));
    }
    for module in ["Array", "Math", "Memory"] {
        sandbox.fixture(
            12,
            &format!("{module}Test/{module}Test.tst"),
            "load, output-file;",
        );
        sandbox.fixture(12, &format!("{module}Test/Main.vm"), "function Main.main 0");
    }
}

fn submit_all(sandbox: &Sandbox) {
    for module in MODULES {
        sandbox.submit(&format!("os/{module}.jack"), &format!("class {module} {{}}"));
    }
}

/// Compiles by writing `student <module>` next to the source.
fn compile(dir: &Path, module: &str) -> String {
    write(&dir.join(format!("{module}.vm")), &format!("student {module}"));
    String::new()
}

fn is_student(dir: &Path, module: &str) -> bool {
    fs::read_to_string(dir.join(format!("{module}.vm")))
        .map(|c| c.starts_with("student"))
        .unwrap_or(false)
}

fn kinds_for(report: &Report, test: &str) -> Vec<OutcomeKind> {
    report
        .entries()
        .iter()
        .filter(|e| e.test == test)
        .map(|e| e.outcome.kind)
        .collect()
}

#[tokio::test]
async fn failure_caused_by_another_module_is_reported_once() {
    let sandbox = Sandbox::new("p12-combination");
    library_fixtures(&sandbox);
    submit_all(&sandbox);

    // the student's Memory breaks Math and Array, but every module works alone
    let toolchain = MockToolchain::evaluating(|kind, dir, test| {
        Ok(match kind {
            EvaluatorKind::CompileSource => compile(dir, test),
            _ if test != "MemoryTest" && is_student(dir, "Memory") => {
                format!("{test}: heap corrupted")
            }
            _ => String::new(),
        })
    });
    let grader = sandbox.grader(toolchain);
    let report = grader.grade(&sandbox.submission(), 12).await.expect("grade");

    assert_eq!(kinds_for(&report, "ArrayTest"), vec![OutcomeKind::CombinationOnly]);
    // MathTest also fails only in combination; it is neither reported nor passed
    assert!(kinds_for(&report, "MathTest").is_empty());
    assert_eq!(kinds_for(&report, "MemoryTest"), vec![OutcomeKind::Pass]);
    let combination: Vec<_> = report
        .entries()
        .iter()
        .filter(|e| e.outcome.kind == OutcomeKind::CombinationOnly)
        .collect();
    assert_eq!(combination.len(), 1);
    assert_eq!(
        combination[0].outcome.detail.as_deref(),
        Some("All OS files: ArrayTest: heap corrupted\nOnly Array.vm: passed")
    );
    assert_eq!(report.score(), 90.91);
}

#[tokio::test]
async fn module_broken_on_its_own_hides_combination_failures() {
    let sandbox = Sandbox::new("p12-individual");
    library_fixtures(&sandbox);
    submit_all(&sandbox);

    let toolchain = MockToolchain::evaluating(|kind, dir, test| {
        Ok(match kind {
            EvaluatorKind::CompileSource => compile(dir, test),
            _ if test == "MathTest" && is_student(dir, "Math") => "multiply is wrong".to_string(),
            _ if test == "ArrayTest" && is_student(dir, "Memory") => "heap corrupted".to_string(),
            _ => String::new(),
        })
    });
    let grader = sandbox.grader(toolchain);
    let report = grader.grade(&sandbox.submission(), 12).await.expect("grade");

    assert_eq!(kinds_for(&report, "MathTest"), vec![OutcomeKind::DiffFound]);
    assert!(kinds_for(&report, "ArrayTest").is_empty());
    assert!(report.text().contains("All OS files: multiply is wrong"));
    assert!(report.text().contains("Only Math.vm: multiply is wrong"));
    assert!(
        report
            .entries()
            .iter()
            .all(|e| e.outcome.kind != OutcomeKind::CombinationOnly)
    );
}

#[tokio::test]
async fn compile_errors_and_missing_sources_are_per_module() {
    let sandbox = Sandbox::new("p12-build");
    library_fixtures(&sandbox);
    for module in MODULES.iter().filter(|m| **m != "Keyboard") {
        sandbox.submit(&format!("{module}.jack"), &format!("class {module} {{}}"));
    }

    let toolchain = MockToolchain::evaluating(|kind, dir, test| {
        Ok(match kind {
            EvaluatorKind::CompileSource if test == "Screen" => {
                "In Screen.jack (line 4): Expected ;".to_string()
            }
            EvaluatorKind::CompileSource => compile(dir, test),
            _ => String::new(),
        })
    });
    let grader = sandbox.grader(toolchain);
    let report = grader.grade(&sandbox.submission(), 12).await.expect("grade");

    assert_eq!(kinds_for(&report, "Keyboard"), vec![OutcomeKind::FileMissing]);
    assert_eq!(kinds_for(&report, "Screen"), vec![OutcomeKind::CompileError]);
    assert!(report.text().contains("Expected ;"));
    assert_eq!(kinds_for(&report, "MathTest"), vec![OutcomeKind::Pass]);
}

#[tokio::test]
async fn reference_library_is_required() {
    let sandbox = Sandbox::new("p12-no-os");
    sandbox.fixture(12, "MathTest/MathTest.tst", "load;");
    submit_all(&sandbox);

    let err = sandbox
        .grader(MockToolchain::passing())
        .grade(&sandbox.submission(), 12)
        .await
        .expect_err("no reference OS");

    assert!(matches!(err, nandgrade::GradeError::FixturesMissing(_)));
    assert_eq!(sandbox.leftover_workspaces(), 0);
}
