//! GitHub webhook payload parser.
//!
//! Parses raw webhook JSON payloads into typed [`WebhookEvent`] values.
//!
//! # Parsing Strategy
//!
//! 1. The event kind is determined from the `X-GitHub-Event` header
//! 2. The payload is parsed according to the event kind
//! 3. Unknown event kinds return `Ok(None)` (ignored, not an error)
//! 4. Known kinds with actions the bot does not act on also return `Ok(None)`
//! 5. Malformed payloads return `Err` with details
//!
//! Webhooks the bot does not care about must not error: GitHub marks
//! deliveries that receive non-2xx responses as failed, and a bot subscribed
//! to many event types would look permanently broken.

use serde::Deserialize;
use thiserror::Error;

use crate::types::{CommentId, InstallationId, IssueNumber, PrNumber, RepoId, RunId};

use super::events::{
    CommentAction, IssueCommentEvent, PrAction, PullRequestEvent, WebhookEvent, WorkflowRunEvent,
};

/// Error type for webhook parsing failures.
#[derive(Debug, Error)]
pub enum ParseError {
    /// JSON deserialization failed (includes missing required fields).
    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),

    /// Field has an invalid value.
    #[error("invalid field value for {field}: {value}")]
    InvalidField { field: &'static str, value: String },
}

/// Parses a webhook payload into a typed event.
///
/// # Arguments
///
/// * `event_type` - The value of the `X-GitHub-Event` header
/// * `payload` - The raw JSON payload bytes
///
/// # Returns
///
/// * `Ok(Some(event))` - A known event kind with an action the bot handles
/// * `Ok(None)` - Unknown kind or unhandled action (acknowledged, no action)
/// * `Err(e)` - Malformed payload
pub fn parse_webhook(event_type: &str, payload: &[u8]) -> Result<Option<WebhookEvent>, ParseError> {
    match event_type {
        "pull_request" => parse_pull_request(payload).map(|opt| opt.map(WebhookEvent::PullRequest)),
        "issue_comment" => {
            parse_issue_comment(payload).map(|e| Some(WebhookEvent::IssueComment(e)))
        }
        "workflow_run" => parse_workflow_run(payload).map(|opt| opt.map(WebhookEvent::WorkflowRun)),
        // Unknown event kinds are ignored (not an error)
        _ => Ok(None),
    }
}

// ============================================================================
// Raw payload structures for deserialization
//
// These mirror GitHub's webhook JSON. Optional fields are Option<T>; required
// fields are validated by serde.
// ============================================================================

#[derive(Debug, Deserialize)]
struct RawRepository {
    owner: RawOwner,
    name: String,
}

#[derive(Debug, Deserialize)]
struct RawOwner {
    login: String,
}

#[derive(Debug, Deserialize)]
struct RawUser {
    login: String,
}

#[derive(Debug, Deserialize)]
struct RawInstallation {
    id: u64,
}

fn repo_id(raw: RawRepository) -> RepoId {
    RepoId::new(raw.owner.login, raw.name)
}

fn installation_id(raw: Option<RawInstallation>) -> Option<InstallationId> {
    raw.map(|i| InstallationId(i.id))
}

// ============================================================================
// pull_request event
// ============================================================================

#[derive(Debug, Deserialize)]
struct RawPullRequestPayload {
    action: String,
    pull_request: RawPullRequest,
    repository: RawRepository,
    installation: Option<RawInstallation>,
}

#[derive(Debug, Deserialize)]
struct RawPullRequest {
    number: u64,
    title: Option<String>,
    body: Option<String>,
}

fn parse_pull_request(payload: &[u8]) -> Result<Option<PullRequestEvent>, ParseError> {
    let raw: RawPullRequestPayload = serde_json::from_slice(payload)?;

    let action = match raw.action.as_str() {
        "opened" => PrAction::Opened,
        "synchronize" => PrAction::Synchronize,
        "reopened" => PrAction::Reopened,
        // Other actions (closed, labeled, edited, ...) do not trigger a review
        _ => return Ok(None),
    };

    Ok(Some(PullRequestEvent {
        repo: repo_id(raw.repository),
        action,
        pr_number: PrNumber(raw.pull_request.number),
        title: raw.pull_request.title.unwrap_or_default(),
        body: raw.pull_request.body.unwrap_or_default(),
        installation: installation_id(raw.installation),
    }))
}

// ============================================================================
// issue_comment event
// ============================================================================

#[derive(Debug, Deserialize)]
struct RawIssueCommentPayload {
    action: String,
    comment: RawComment,
    issue: RawIssue,
    repository: RawRepository,
    installation: Option<RawInstallation>,
}

#[derive(Debug, Deserialize)]
struct RawComment {
    id: u64,
    body: Option<String>,
    user: RawUser,
}

#[derive(Debug, Deserialize)]
struct RawIssue {
    number: u64,
    // Present iff the "issue" is actually a pull request
    pull_request: Option<serde_json::Value>,
}

fn parse_issue_comment(payload: &[u8]) -> Result<IssueCommentEvent, ParseError> {
    let raw: RawIssueCommentPayload = serde_json::from_slice(payload)?;

    let action = match raw.action.as_str() {
        "created" => CommentAction::Created,
        "edited" => CommentAction::Edited,
        "deleted" => CommentAction::Deleted,
        other => {
            return Err(ParseError::InvalidField {
                field: "action",
                value: other.to_string(),
            });
        }
    };

    Ok(IssueCommentEvent {
        repo: repo_id(raw.repository),
        action,
        issue_number: IssueNumber(raw.issue.number),
        comment_id: CommentId(raw.comment.id),
        is_pull_request: raw.issue.pull_request.is_some(),
        body: raw.comment.body.unwrap_or_default(),
        author_login: raw.comment.user.login,
        installation: installation_id(raw.installation),
    })
}

// ============================================================================
// workflow_run event
// ============================================================================

#[derive(Debug, Deserialize)]
struct RawWorkflowRunPayload {
    action: String,
    workflow_run: RawWorkflowRun,
    repository: RawRepository,
    installation: Option<RawInstallation>,
}

#[derive(Debug, Deserialize)]
struct RawWorkflowRun {
    id: u64,
    name: Option<String>,
    conclusion: Option<String>,
    head_branch: Option<String>,
    head_sha: Option<String>,
    html_url: Option<String>,
}

fn parse_workflow_run(payload: &[u8]) -> Result<Option<WorkflowRunEvent>, ParseError> {
    let raw: RawWorkflowRunPayload = serde_json::from_slice(payload)?;

    // Only completed runs carry a conclusion worth analyzing
    if raw.action != "completed" {
        return Ok(None);
    }

    Ok(Some(WorkflowRunEvent {
        repo: repo_id(raw.repository),
        run_id: RunId(raw.workflow_run.id),
        name: raw
            .workflow_run
            .name
            .unwrap_or_else(|| "Unknown Workflow".to_string()),
        conclusion: raw.workflow_run.conclusion,
        head_branch: raw.workflow_run.head_branch.unwrap_or_default(),
        head_sha: raw.workflow_run.head_sha.unwrap_or_default(),
        html_url: raw.workflow_run.html_url.unwrap_or_default(),
        installation: installation_id(raw.installation),
    }))
}
