#![warn(missing_docs)]
#![warn(clippy::missing_docs_in_private_items)]

use std::collections::BTreeSet;

use itertools::Itertools;
use serde::{Deserialize, Serialize};

use super::{
    outcome::{Outcome, OutcomeKind},
    results::{Grade, Report},
};
use crate::constants::{BUILD_FAILURE_HEADING, FULL_SCORE, SUCCESS_MESSAGE, WRONG_LOCATION_PENALTY};

/// How recorded outcomes turn into a score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Scoring {
    /// Full marks without any failure, zero otherwise.
    AllOrNothing,
    /// Each failing test costs an equal share of the marks.
    PerTest(usize),
}

impl Scoring {
    /// Derives the grade for `entries`.
    fn grade(self, entries: &[FeedbackEntry]) -> Grade {
        let failing: BTreeSet<&str> = entries
            .iter()
            .filter(|e| e.outcome.kind.is_failure())
            .map(|e| e.test.as_str())
            .collect();
        let misplaced = entries
            .iter()
            .filter(|e| e.outcome.kind == OutcomeKind::WrongOutputLocation)
            .count();

        let score = match self {
            Scoring::AllOrNothing => {
                if failing.is_empty() && misplaced == 0 {
                    FULL_SCORE
                } else {
                    0.0
                }
            }
            Scoring::PerTest(tests) => {
                let share = FULL_SCORE / tests.max(1) as f64;
                FULL_SCORE
                    - share * failing.len() as f64
                    - WRONG_LOCATION_PENALTY * misplaced as f64
            }
        };

        let score = (score.max(0.0) * 100.0).round() / 100.0;
        Grade::new(score, FULL_SCORE)
    }
}

/// One recorded `(test, outcome)` pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeedbackEntry {
    /// Test (or module) the outcome belongs to.
    pub test:    String,
    /// What happened.
    pub outcome: Outcome,
}

impl FeedbackEntry {
    /// Renders the entry as a feedback block.
    fn render(&self) -> String {
        let head = if self.test.is_empty() {
            self.outcome.kind.message().to_string()
        } else {
            format!("{}: {}", self.test, self.outcome.kind.message())
        };
        match &self.outcome.detail {
            Some(detail) => {
                let body = detail.lines().map(|l| format!("    {l}")).join("\n");
                format!("{head}\n{body}")
            }
            None => head,
        }
    }
}

/// Ordered, append-only log of the outcomes of one grading run.
#[derive(Debug, Clone)]
pub struct Feedback {
    /// Score derivation for this run.
    scoring: Scoring,
    /// Outcomes in the order they were recorded.
    entries: Vec<FeedbackEntry>,
}

impl Feedback {
    /// Starts an empty log.
    pub fn new(scoring: Scoring) -> Self {
        Self {
            scoring,
            entries: Vec::new(),
        }
    }

    /// Appends `outcome` for `test`.
    pub fn record(&mut self, test: impl Into<String>, outcome: Outcome) {
        let test = test.into();
        tracing::debug!(test = %test, outcome = %outcome.kind, "recorded outcome");
        self.entries.push(FeedbackEntry { test, outcome });
    }

    /// Appends a pass for `test`.
    pub fn pass(&mut self, test: impl Into<String>) {
        self.record(test, Outcome::pass());
    }

    /// Outcomes recorded so far.
    pub fn entries(&self) -> &[FeedbackEntry] {
        &self.entries
    }

    /// True if `test` has a score-affecting outcome.
    pub fn has_failure(&self, test: &str) -> bool {
        self.entries
            .iter()
            .any(|e| e.test == test && e.outcome.kind.is_failure())
    }

    /// Scoring used by this log.
    pub fn scoring(&self) -> Scoring {
        self.scoring
    }

    /// Derives the score and renders the feedback text.
    pub fn finish(self) -> Report {
        let grade = self.scoring.grade(&self.entries);
        let negative: Vec<String> = self
            .entries
            .iter()
            .filter(|e| e.outcome.kind.is_negative())
            .map(FeedbackEntry::render)
            .collect();
        let text = if negative.is_empty() {
            SUCCESS_MESSAGE.to_string()
        } else {
            negative.join("\n")
        };

        Report::new(grade, text, self.entries, false)
    }

    /// Report for a run whose translator failed to build: score zero, a
    /// single diagnostic, and no per-test outcomes.
    pub fn build_failure(output: &str) -> Report {
        let text = format!("{BUILD_FAILURE_HEADING}\n{output}").trim().to_string();
        Report::new(Grade::new(0.0, FULL_SCORE), text, Vec::new(), true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_log_is_a_full_score_success() {
        let report = Feedback::new(Scoring::PerTest(3)).finish();
        assert_eq!(report.score(), FULL_SCORE);
        assert_eq!(report.text(), SUCCESS_MESSAGE);
    }

    #[test]
    fn failures_cost_one_share_per_test() {
        let mut feedback = Feedback::new(Scoring::PerTest(4));
        feedback.record("And", Outcome::file_missing());
        feedback.record("Or", Outcome::bare(OutcomeKind::BuiltInDetected));
        feedback.record("Or", Outcome::diff_found("Comparison failure at line 3"));
        feedback.pass("Not");
        let report = feedback.finish();
        assert_eq!(report.score(), 50.0);
        assert!(report.text().starts_with("And: required file is missing\nOr: uses"));
        assert!(report.text().contains("    Comparison failure at line 3"));
    }

    #[test]
    fn misplaced_output_costs_a_flat_penalty() {
        let mut feedback = Feedback::new(Scoring::PerTest(2));
        feedback.record("Add", Outcome::bare(OutcomeKind::WrongOutputLocation));
        feedback.pass("Add");
        let report = feedback.finish();
        assert_eq!(report.score(), FULL_SCORE - WRONG_LOCATION_PENALTY);
        assert_ne!(report.text(), SUCCESS_MESSAGE);
    }

    #[test]
    fn all_or_nothing_drops_to_zero() {
        let mut feedback = Feedback::new(Scoring::AllOrNothing);
        feedback.record("", Outcome::bare(OutcomeKind::FileContents));
        let report = feedback.finish();
        assert_eq!(report.score(), 0.0);
        assert_eq!(report.text(), "file contents differ from the expected contents");
    }

    #[test]
    fn build_failure_reports_the_compiler_output() {
        let report = Feedback::build_failure("Main.java:3: error\n");
        assert_eq!(report.score(), 0.0);
        assert!(report.aborted());
        assert_eq!(
            report.text(),
            "Problems encountered in the compilation\nMain.java:3: error"
        );
    }

    #[test]
    fn score_never_goes_negative() {
        let mut feedback = Feedback::new(Scoring::PerTest(1));
        feedback.record("A", Outcome::file_missing());
        feedback.record("B", Outcome::file_missing());
        assert_eq!(feedback.finish().score(), 0.0);
    }
}
