#![warn(missing_docs)]
#![warn(clippy::missing_docs_in_private_items)]

/// Feedback text when a run records no negative outcome.
pub const SUCCESS_MESSAGE: &str = "Congratulations! all tests passed successfully!";

/// Heading of the feedback produced when a student translator fails to build.
pub const BUILD_FAILURE_HEADING: &str = "Problems encountered in the compilation";

/// Lower-cased token whose presence in a chip marks it as a stub of the
/// simulator's built-in implementation.
pub const PLACEHOLDER_MARKER: &str = "builtin";

/// Extension given to artifacts while they are concealed from the simulator.
pub const HIDDEN_EXTENSION: &str = "hidden";

/// Name of the marker file declaring the language of a student translator.
pub const LANGUAGE_MARKER: &str = "lang.txt";

/// Substring of the language marker that selects pre-built output mode.
pub const PREBUILT_MARKER: &str = "file";

/// Prefix of every workspace directory name.
pub const WORKSPACE_PREFIX: &str = "temp-";

/// Reference text compared against in project 0.
pub const PROJECT0_REFERENCE: &str = "cmp.txt";

/// File project 0 submissions must contain.
pub const PROJECT0_ARTIFACT: &str = "file.txt";

/// Points every score is measured against.
pub const FULL_SCORE: f64 = 100.0;

/// Flat deduction for each output found in the wrong directory.
pub const WRONG_LOCATION_PENALTY: f64 = 5.0;

/// Phrase the course's comparison tools print when every line matched.
pub const COMPARISON_SUCCESS: &str = "comparison ended successfully";
