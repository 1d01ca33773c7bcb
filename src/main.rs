#![warn(missing_docs)]
#![warn(clippy::missing_docs_in_private_items)]

//! # nandgrade
//!
//! Command line front end for grading nand-to-tetris submissions.
//!
//! The course tools (`HardwareSimulator.sh`, `CPUEmulator.sh`, ...) are looked
//! up in `--tools-dir` and then on `PATH`. Fixtures live under `--tests-dir`,
//! one `p<N>` directory per project. Every setting can also come from a
//! `.env` file; see `GraderConfig::from_env`.

use std::{path::PathBuf, str::FromStr, sync::Arc};

use anyhow::{Context, Result};
use bpaf::*;
use colored::Colorize;
use dotenvy::dotenv;
use nandgrade::{Grader, Project, Report, config};
use tracing::{Level, metadata::LevelFilter};
use tracing_subscriber::{fmt, prelude::*, util::SubscriberInitExt};

/// Top-level CLI commands.
#[derive(Debug, Clone)]
enum Cmd {
    /// Grade a submission
    Grade {
        /// Submission directory
        submission: PathBuf,
        /// Project number
        project:    u8,
        /// Print the report as JSON
        json:       bool,
        /// Print an overview table to stderr
        table:      bool,
    },
    /// Check one project 1 chip
    Chip {
        /// Submission directory
        submission: PathBuf,
        /// Chip name
        chip:       String,
    },
    /// List the gradable projects
    Projects,
}

/// Global flags plus the chosen command.
#[derive(Debug, Clone)]
struct Opts {
    /// Overrides the fixture root
    tests_dir: Option<PathBuf>,
    /// Overrides the workspace parent
    temp_dir:  Option<PathBuf>,
    /// Overrides the tools directory
    tools_dir: Option<PathBuf>,
    /// Log at debug level
    verbose:   bool,
    /// What to do
    cmd:       Cmd,
}

/// Parse the command line arguments into [`Opts`]
fn options() -> Opts {
    /// parses the submission directory
    fn submission() -> impl Parser<PathBuf> {
        positional::<PathBuf>("SUBMISSION_DIR").help("Directory holding the student's files")
    }

    let tests_dir = long("tests-dir")
        .help("Root of the per-project fixture trees")
        .argument::<PathBuf>("DIR")
        .optional();
    let temp_dir = long("temp-dir")
        .help("Directory the grading workspaces are created in")
        .argument::<PathBuf>("DIR")
        .optional();
    let tools_dir = long("tools-dir")
        .help("Directory holding the course tool scripts")
        .argument::<PathBuf>("DIR")
        .optional();
    let verbose = short('v').long("verbose").help("Log debug output").switch();

    let grade = {
        let submission = submission();
        let project = positional::<u8>("PROJECT").help("Project number (0-8, 10, 11, 12)");
        let json = long("json").help("Print the report as JSON").switch();
        let table = long("table")
            .help("Also print an overview of every outcome to stderr")
            .switch();
        construct!(Cmd::Grade {
            submission,
            project,
            json,
            table
        })
        .to_options()
        .command("grade")
        .help("Grade a submission")
    };

    let chip = {
        let submission = submission();
        let chip = positional::<String>("CHIP").help("Name of a project 1 chip, e.g. Mux");
        construct!(Cmd::Chip { submission, chip })
            .to_options()
            .command("chip")
            .help("Check a single project 1 chip")
    };

    let projects = pure(Cmd::Projects)
        .to_options()
        .command("projects")
        .help("List the gradable projects and their tests");

    let cmd = construct!([grade, chip, projects]);

    construct!(Opts {
        tests_dir,
        temp_dir,
        tools_dir,
        verbose,
        cmd
    })
    .to_options()
    .descr("Grader for nand-to-tetris projects")
    .run()
}

/// Picks the log level from `--verbose` or `NANDGRADE_LOG`.
fn log_level(verbose: bool) -> Level {
    if verbose {
        return Level::DEBUG;
    }
    std::env::var("NANDGRADE_LOG")
        .ok()
        .and_then(|value| Level::from_str(value.trim()).ok())
        .unwrap_or(Level::INFO)
}

/// Prints a report in the grader's plain format.
fn print_report(report: &Report) {
    let score = format!("{}", report.score());
    let score = if report.score() >= report.grade().out_of {
        score.green().bold()
    } else if report.score() > 0.0 {
        score.yellow().bold()
    } else {
        score.red().bold()
    };
    println!("Grade: {score}");
    println!("Feedback:");
    println!("{}", report.text());
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv().ok();
    let opts = options();

    let fmt = fmt::layer()
        .without_time()
        .with_file(false)
        .with_line_number(false)
        .with_writer(std::io::stderr);
    let filter_layer = LevelFilter::from_level(log_level(opts.verbose));
    tracing_subscriber::registry()
        .with(fmt)
        .with(filter_layer)
        .init();

    let config = config::get()
        .context("Could not load the grader configuration")?
        .as_ref()
        .clone()
        .with_dirs(opts.tests_dir, opts.temp_dir, opts.tools_dir);
    let grader = Grader::from_config(Arc::new(config));

    match opts.cmd {
        Cmd::Grade {
            submission,
            project,
            json,
            table,
        } => {
            let report = grader
                .grade(&submission, project)
                .await
                .with_context(|| format!("Could not grade {}", submission.display()))?;
            if table {
                eprintln!("{}", report.table());
            }
            if json {
                println!("{}", report.to_json()?);
            } else {
                print_report(&report);
            }
        }
        Cmd::Chip { submission, chip } => {
            let report = grader
                .check_chip(&submission, &chip)
                .await
                .with_context(|| format!("Could not check {chip} in {}", submission.display()))?;
            println!("{}", report.text());
        }
        Cmd::Projects => {
            for project in Project::all() {
                let tests = project.pipeline().tests();
                println!("{:>2}: {}", project.number(), tests.join(", "));
            }
        }
    };

    Ok(())
}
