#![warn(missing_docs)]
#![warn(clippy::missing_docs_in_private_items)]

/// Append-only outcome log for one run.
pub mod feedback;
/// Outcome classification.
pub mod outcome;
/// Grade and report types.
pub mod results;

pub use feedback::{Feedback, FeedbackEntry, Scoring};
pub use outcome::{Outcome, OutcomeKind};
pub use results::{Grade, Report};
