//! GitHub webhook event types.
//!
//! Typed representations of the webhook events the bot handles, carrying only
//! the fields the orchestrators consume:
//!
//! - `pull_request` - triggers an automatic PR review (opened, synchronize, reopened)
//! - `issue_comment` - carries trigger commands (`\ansieyes_prreview`, `\ansieyes_triage`)
//! - `workflow_run` - triggers a workflow-failure analysis comment (completed)
//!
//! Events are constructed per delivery and discarded after dispatch; nothing
//! is persisted.

use serde::{Deserialize, Serialize};

use crate::types::{CommentId, InstallationId, IssueNumber, PrNumber, RepoId, RunId};

/// A parsed GitHub webhook event.
///
/// Only the event kinds the bot cares about appear here. Unknown kinds (and
/// unhandled actions of known kinds) are represented by the parser returning
/// `None`, which the dispatcher acknowledges without acting.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum WebhookEvent {
    /// A pull request was opened or updated.
    PullRequest(PullRequestEvent),

    /// An issue or PR conversation comment was created, edited, or deleted.
    ///
    /// GitHub delivers comments on the PR conversation tab as `issue_comment`
    /// events too; `is_pull_request` distinguishes the two.
    IssueComment(IssueCommentEvent),

    /// A GitHub Actions workflow run completed.
    WorkflowRun(WorkflowRunEvent),
}

impl WebhookEvent {
    /// Returns the repository this event belongs to.
    pub fn repo(&self) -> &RepoId {
        match self {
            WebhookEvent::PullRequest(e) => &e.repo,
            WebhookEvent::IssueComment(e) => &e.repo,
            WebhookEvent::WorkflowRun(e) => &e.repo,
        }
    }
}

/// Pull request actions that trigger a review.
///
/// GitHub sends many more (`labeled`, `assigned`, ...); the parser drops them
/// before they reach the dispatcher.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PrAction {
    /// PR was opened.
    Opened,
    /// PR head was updated (new commits pushed).
    Synchronize,
    /// PR was reopened.
    Reopened,
}

/// A pull request event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PullRequestEvent {
    /// The repository.
    pub repo: RepoId,

    /// The action that triggered this event.
    pub action: PrAction,

    /// The PR number.
    pub pr_number: PrNumber,

    /// The PR title.
    pub title: String,

    /// The PR body (empty if the author supplied none).
    pub body: String,

    /// The App installation that delivered this event, when present.
    pub installation: Option<InstallationId>,
}

/// Action performed on an issue comment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CommentAction {
    /// Comment was created.
    Created,
    /// Comment was edited.
    Edited,
    /// Comment was deleted.
    Deleted,
}

/// An issue/PR comment event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IssueCommentEvent {
    /// The repository.
    pub repo: RepoId,

    /// The action that triggered this event.
    pub action: CommentAction,

    /// The issue (or PR) number the comment is on.
    pub issue_number: IssueNumber,

    /// The comment's own ID, carried for logging.
    pub comment_id: CommentId,

    /// Whether the comment is on a pull request rather than a plain issue.
    pub is_pull_request: bool,

    /// The comment body text (empty for `deleted` actions).
    pub body: String,

    /// The comment author's login name.
    pub author_login: String,

    /// The App installation that delivered this event, when present.
    pub installation: Option<InstallationId>,
}

/// A completed GitHub Actions workflow run.
///
/// Only `completed` runs are parsed; in-progress runs carry nothing to analyze.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkflowRunEvent {
    /// The repository.
    pub repo: RepoId,

    /// The workflow run ID.
    pub run_id: RunId,

    /// The workflow name (e.g., "CI").
    pub name: String,

    /// The run conclusion: success, failure, cancelled, etc.
    pub conclusion: Option<String>,

    /// The branch the run executed on.
    pub head_branch: String,

    /// The head commit of the run, used to locate the associated PR.
    pub head_sha: String,

    /// Link to the run on github.com, included in the posted comment.
    pub html_url: String,

    /// The App installation that delivered this event, when present.
    pub installation: Option<InstallationId>,
}
