//! GitHub API collaborator.
//!
//! Orchestrators talk to GitHub through the [`GitHubHost`] trait, which
//! covers exactly the operations this bot consumes: PR metadata and diffs,
//! issue text, recent open issues, comments, labels, and workflow jobs. The
//! production implementation ([`client::OctocrabHost`]) wraps octocrab with
//! transient-error retry; tests substitute in-memory fakes.

pub mod client;
pub mod error;
pub mod retry;

pub use client::OctocrabHost;
pub use error::{GitHubApiError, GitHubErrorKind};
pub use retry::{RetryConfig, retry_with_backoff};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::types::{IssueNumber, PrNumber, RepoId, RunId};

/// Pull request metadata consumed by the review orchestrator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrDetails {
    pub number: PrNumber,
    pub title: String,
    /// Empty if the author supplied no description.
    pub body: String,
}

/// One changed file in a pull request, with its unified diff when GitHub
/// provides one (binary files have none).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangedFile {
    pub filename: String,
    pub status: String,
    pub additions: u64,
    pub deletions: u64,
    pub patch: Option<String>,
}

/// Issue title and body, the inputs to the triage pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IssueDetails {
    pub number: IssueNumber,
    pub title: String,
    pub body: String,
}

/// A candidate for duplicate comparison.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IssueSummary {
    pub number: IssueNumber,
    pub title: String,
    pub body: String,
    pub updated_at: DateTime<Utc>,
}

/// One job of a workflow run, with its step outcomes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkflowJob {
    pub name: String,
    pub status: String,
    pub conclusion: Option<String>,
    pub steps: Vec<WorkflowStep>,
}

/// One step of a workflow job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkflowStep {
    pub name: String,
    pub status: String,
    pub conclusion: Option<String>,
}

/// A label to ensure exists before attaching: name plus the fixed color and
/// description used if the repository doesn't have it yet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LabelSpec {
    pub name: String,
    /// Hex color without the leading `#`.
    pub color: String,
    pub description: String,
}

/// The GitHub operations this bot consumes.
///
/// PRs are addressed through the issues endpoint where GitHub does the same
/// (comments, labels), which is why `post_comment` takes an [`IssueNumber`];
/// use `IssueNumber::from(pr_number)` for PRs.
#[async_trait]
pub trait GitHubHost: Send + Sync {
    /// Fetches PR title and body.
    async fn pr_details(&self, repo: &RepoId, pr: PrNumber) -> Result<PrDetails, GitHubApiError>;

    /// Lists the files changed by a PR, with per-file diffs.
    async fn changed_files(
        &self,
        repo: &RepoId,
        pr: PrNumber,
    ) -> Result<Vec<ChangedFile>, GitHubApiError>;

    /// Fetches issue title and body.
    async fn issue(&self, repo: &RepoId, issue: IssueNumber)
    -> Result<IssueDetails, GitHubApiError>;

    /// Lists recently updated open issues (most recent first), excluding
    /// pull requests, up to `limit`.
    async fn recent_open_issues(
        &self,
        repo: &RepoId,
        limit: usize,
    ) -> Result<Vec<IssueSummary>, GitHubApiError>;

    /// Posts a comment on an issue or PR.
    async fn post_comment(
        &self,
        repo: &RepoId,
        issue: IssueNumber,
        body: &str,
    ) -> Result<(), GitHubApiError>;

    /// Creates the label in the repository if it doesn't already exist.
    async fn ensure_label(&self, repo: &RepoId, label: &LabelSpec) -> Result<(), GitHubApiError>;

    /// Attaches an existing label to an issue.
    async fn add_label(
        &self,
        repo: &RepoId,
        issue: IssueNumber,
        label: &str,
    ) -> Result<(), GitHubApiError>;

    /// Lists the jobs of a workflow run, with step outcomes.
    async fn workflow_jobs(
        &self,
        repo: &RepoId,
        run: RunId,
    ) -> Result<Vec<WorkflowJob>, GitHubApiError>;

    /// Finds the PR whose head matches the given branch and commit.
    ///
    /// Open PRs are preferred; closed PRs are consulted only when no open
    /// one matches (a workflow run often finishes after its PR merged).
    async fn find_pr_for_run(
        &self,
        repo: &RepoId,
        head_branch: &str,
        head_sha: &str,
    ) -> Result<Option<PrNumber>, GitHubApiError>;
}
