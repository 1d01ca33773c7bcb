#![warn(missing_docs)]
#![warn(clippy::missing_docs_in_private_items)]

use std::fmt::Display;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tabled::{
    Table, Tabled,
    settings::{Alignment, Modify, Panel, Style, Width, object::Rows},
};

use super::feedback::FeedbackEntry;

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
/// A struct representing a grade
pub struct Grade {
    /// The actual grade received
    pub grade:  f64,
    /// The maximum grade possible
    pub out_of: f64,
}

impl Grade {
    /// Creates a new grade -
    /// * `grade` - The actual grade received
    /// * `out_of` - The maximum grade possible
    pub fn new(grade: f64, out_of: f64) -> Self {
        Self { grade, out_of }
    }
}

impl Display for Grade {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:.2}/{:.2}", self.grade, self.out_of)
    }
}

/// One row of the overview table.
#[derive(Tabled)]
struct OutcomeRow {
    #[tabled(rename = "Test")]
    /// Test name, or `-` for run-level outcomes.
    test:    String,
    #[tabled(rename = "Outcome")]
    /// Outcome identifier.
    outcome: String,
    #[tabled(rename = "Detail")]
    /// First line of the diagnostic.
    detail:  String,
}

/// Final result of a grading run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Report {
    /// Score awarded.
    grade:   Grade,
    /// Human readable feedback.
    text:    String,
    /// Every outcome in record order.
    entries: Vec<FeedbackEntry>,
    /// True when a build failure stopped the run before any test.
    aborted: bool,
}

impl Report {
    /// Assembles a report.
    pub(crate) fn new(grade: Grade, text: String, entries: Vec<FeedbackEntry>, aborted: bool) -> Self {
        Self {
            grade,
            text,
            entries,
            aborted,
        }
    }

    /// Numeric score.
    pub fn score(&self) -> f64 {
        self.grade.grade
    }

    /// Score together with its maximum.
    pub fn grade(&self) -> Grade {
        self.grade
    }

    /// Feedback text.
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Recorded outcomes.
    pub fn entries(&self) -> &[FeedbackEntry] {
        &self.entries
    }

    /// Whether a build failure aborted the run.
    pub fn aborted(&self) -> bool {
        self.aborted
    }

    /// `(score, feedback)` as returned by the invocation surface.
    pub fn into_pair(self) -> (f64, String) {
        (self.grade.grade, self.text)
    }

    /// Serializes the report as pretty JSON.
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self).context("Could not serialize the report")
    }

    /// Renders every recorded outcome as a table.
    pub fn table(&self) -> String {
        let rows: Vec<OutcomeRow> = self
            .entries
            .iter()
            .map(|e| OutcomeRow {
                test:    if e.test.is_empty() {
                    "-".to_string()
                } else {
                    e.test.clone()
                },
                outcome: e.outcome.kind.to_string(),
                detail:  e
                    .outcome
                    .detail
                    .as_deref()
                    .and_then(|d| d.lines().next())
                    .unwrap_or("")
                    .to_string(),
            })
            .collect();

        Table::new(rows)
            .with(Panel::header("Grading Overview"))
            .with(Panel::footer(format!("Total: {}", self.grade)))
            .with(Modify::new(Rows::new(1..)).with(Width::wrap(40).keep_words(true)))
            .with(Modify::new(Rows::first()).with(Alignment::center()))
            .with(Style::modern())
            .to_string()
    }
}
