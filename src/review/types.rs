//! Review result types.

use serde::{Deserialize, Serialize};

/// One issue found in a review, parsed best-effort from LLM text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReviewIssue {
    /// Severity keyword as written by the model (e.g., "high"); free-form
    /// because it comes from section parsing, not structured output.
    pub severity: String,

    /// What is wrong.
    pub description: String,

    /// Where, when the model named a place (file, line, symbol).
    pub location: Option<String>,
}

/// The parsed outcome of one PR review.
///
/// Request-scoped: built for one delivery, rendered into one comment,
/// discarded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReviewResult {
    /// Files whose diffs were included in the prompt, in PR order.
    pub files_reviewed: Vec<String>,

    /// The model's overall assessment (empty if section parsing found none).
    pub overall_assessment: String,

    /// Issues found, in the order the model listed them.
    pub issues: Vec<ReviewIssue>,

    /// Suggestions, in the order the model listed them.
    pub suggestions: Vec<String>,

    /// The unparsed model response. Posted verbatim when section parsing
    /// recognizes nothing - content is never discarded.
    pub raw: String,
}

impl ReviewResult {
    /// Whether section parsing recognized any structure.
    pub fn is_structured(&self) -> bool {
        !self.overall_assessment.is_empty() || !self.issues.is_empty() || !self.suggestions.is_empty()
    }
}
