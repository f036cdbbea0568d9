//! Triage pipeline result types.
//!
//! Each optional stage produces a [`StageOutcome`]; the pipeline aggregates
//! them into one [`TriageResult`] at the end rather than mutating shared
//! state as it goes. Once stage 1 has succeeded, every stage slot is present
//! in the result - possibly failed or skipped, never missing.

use serde::{Deserialize, Serialize};

use crate::types::IssueNumber;

use super::repo_config::RepoTriageConfig;

/// The outcome of one fail-soft pipeline stage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum StageOutcome<T> {
    /// The stage ran and contributed a value.
    Success(T),

    /// The stage ran and failed; the pipeline continued without it.
    Failed { reason: String },

    /// The stage did not run (e.g., surgeon with no librarian files).
    Skipped { reason: String },
}

impl<T> StageOutcome<T> {
    /// Returns the stage's value if it succeeded.
    pub fn as_success(&self) -> Option<&T> {
        match self {
            StageOutcome::Success(value) => Some(value),
            _ => None,
        }
    }

    /// Returns the failure reason if the stage failed.
    pub fn failure_reason(&self) -> Option<&str> {
        match self {
            StageOutcome::Failed { reason } => Some(reason),
            _ => None,
        }
    }

    pub fn is_skipped(&self) -> bool {
        matches!(self, StageOutcome::Skipped { .. })
    }
}

/// One duplicate candidate with its similarity score (0.0-1.0).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DuplicateCandidate {
    pub issue: IssueNumber,
    pub title: String,
    pub score: f64,
}

/// Duplicate check results, candidates sorted by descending score.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct DuplicateReport {
    pub candidates: Vec<DuplicateCandidate>,
}

impl DuplicateReport {
    /// The highest-scoring candidate, if any.
    pub fn top(&self) -> Option<&DuplicateCandidate> {
        self.candidates.first()
    }

    /// The top candidate if its score reaches the threshold.
    pub fn confident(&self, threshold: f64) -> Option<&DuplicateCandidate> {
        self.top().filter(|c| c.score >= threshold)
    }
}

/// Librarian pass results: candidate files, relevance-ranked.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct LibrarianReport {
    pub files: Vec<String>,
}

/// Issue classification from the surgeon pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IssueType {
    Bug,
    Enhancement,
    FeatureRequest,
}

impl IssueType {
    /// The GitHub label for this classification.
    pub fn label(&self) -> &'static str {
        match self {
            IssueType::Bug => "bug",
            IssueType::Enhancement => "enhancement",
            IssueType::FeatureRequest => "feature-request",
        }
    }

    /// Lenient parse of a model-produced keyword.
    pub fn parse(text: &str) -> Option<IssueType> {
        match text.trim().to_lowercase().replace([' ', '-'], "_").as_str() {
            "bug" => Some(IssueType::Bug),
            "enhancement" => Some(IssueType::Enhancement),
            "feature_request" | "feature" => Some(IssueType::FeatureRequest),
            _ => None,
        }
    }
}

impl std::fmt::Display for IssueType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            IssueType::Bug => "BUG",
            IssueType::Enhancement => "ENHANCEMENT",
            IssueType::FeatureRequest => "FEATURE_REQUEST",
        };
        write!(f, "{name}")
    }
}

/// Issue severity from the surgeon pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Critical,
    High,
    Medium,
    Low,
}

impl Severity {
    /// The GitHub label for this severity.
    pub fn label(&self) -> &'static str {
        match self {
            Severity::Critical => "severity:critical",
            Severity::High => "severity:high",
            Severity::Medium => "severity:medium",
            Severity::Low => "severity:low",
        }
    }

    /// Lenient parse of a model-produced keyword.
    pub fn parse(text: &str) -> Option<Severity> {
        match text.trim().to_lowercase().as_str() {
            "critical" => Some(Severity::Critical),
            "high" => Some(Severity::High),
            "medium" | "moderate" => Some(Severity::Medium),
            "low" | "minor" => Some(Severity::Low),
            _ => None,
        }
    }
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Severity::Critical => "CRITICAL",
            Severity::High => "HIGH",
            Severity::Medium => "MEDIUM",
            Severity::Low => "LOW",
        };
        write!(f, "{name}")
    }
}

/// The surgeon pass's structured analysis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SurgeonReport {
    pub issue_type: IssueType,
    pub severity: Severity,
    /// Confidence in the classification, 0-100.
    pub confidence: u8,
    pub summary: String,
    pub root_cause: String,
    pub solutions: Vec<String>,
}

/// Labels applied in stage 5, with per-label failures recorded.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct AppliedLabels {
    pub applied: Vec<String>,
    /// (label, reason) pairs for labels that could not be applied.
    pub failed: Vec<(String, String)>,
}

/// The aggregate result of one triage run.
///
/// Exclusively owned by its run; serialized into one posted comment, then
/// discarded. Nothing here outlives the webhook delivery.
#[derive(Debug, Clone)]
pub struct TriageResult {
    /// Stage 1's contribution. Its presence implies stage 1 succeeded -
    /// failure there aborts the run before a result exists.
    pub repo_config: RepoTriageConfig,

    /// Stage 2: duplicate check.
    pub duplicates: StageOutcome<DuplicateReport>,

    /// Stage 3: librarian pass.
    pub librarian: StageOutcome<LibrarianReport>,

    /// Stage 4: surgeon pass.
    pub surgeon: StageOutcome<SurgeonReport>,

    /// Stage 5: label application.
    pub labels: StageOutcome<AppliedLabels>,

    /// Whether the injection guard blocked the surgeon pass.
    pub injection_blocked: bool,
}

impl TriageResult {
    /// Stage name -> failure reason, for every stage that failed soft.
    pub fn stage_errors(&self) -> Vec<(&'static str, &str)> {
        let mut errors = Vec::new();
        if let Some(reason) = self.duplicates.failure_reason() {
            errors.push(("duplicate check", reason));
        }
        if let Some(reason) = self.librarian.failure_reason() {
            errors.push(("librarian pass", reason));
        }
        if let Some(reason) = self.surgeon.failure_reason() {
            errors.push(("surgeon pass", reason));
        }
        if let Some(reason) = self.labels.failure_reason() {
            errors.push(("label application", reason));
        }
        errors
    }
}
