//! Top-level event dispatch.
//!
//! The dispatcher receives verified, parsed webhook events and routes them:
//!
//! | Event | Action | Route |
//! |-------|--------|-------|
//! | `pull_request` | opened / synchronize / reopened | PR review |
//! | `issue_comment` | created | command classification |
//! | `workflow_run` | completed | workflow analysis |
//!
//! A comment that isn't a trigger command is ignored silently (success, no
//! action). A recognized command on the wrong entity kind gets the fixed
//! validation-error comment. Everything the bot does not care about is
//! acknowledged without acting.
//!
//! Each dispatch call handles exactly one delivery and owns its run's state;
//! concurrency exists only across independent deliveries, courtesy of the
//! HTTP layer.

use std::sync::Arc;

use thiserror::Error;
use tracing::{debug, info};

use crate::commands::{CommandInvocation, EntityKind, TriggerCommand, classify, validation_error_comment};
use crate::config::Limits;
use crate::github::{GitHubApiError, GitHubHost};
use crate::llm::LanguageModel;
use crate::prompts::PromptConfig;
use crate::review::{ReviewContext, ReviewError};
use crate::triage::{IssueTriager, TriageError};
use crate::types::PrNumber;
use crate::webhooks::{CommentAction, IssueCommentEvent, WebhookEvent};

/// What a dispatch did with the event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// An orchestrator ran (or a validation error was posted).
    Processed,

    /// The event required no action.
    Ignored,
}

/// Errors surfaced to the HTTP layer.
///
/// By the time one of these is returned, the orchestrator has already posted
/// its user-visible error comment where an originating entity was known.
#[derive(Debug, Error)]
pub enum DispatchError {
    #[error(transparent)]
    Review(#[from] ReviewError),

    #[error(transparent)]
    Triage(#[from] TriageError),

    #[error("posting validation comment: {0}")]
    Comment(GitHubApiError),
}

/// The bot's routing core, constructed once at startup with its immutable
/// configuration and shared collaborators.
pub struct Dispatcher {
    github: Arc<dyn GitHubHost>,
    llm: Arc<dyn LanguageModel>,
    prompts: PromptConfig,
    limits: Limits,
    clone_base: String,
}

impl Dispatcher {
    pub fn new(
        github: Arc<dyn GitHubHost>,
        llm: Arc<dyn LanguageModel>,
        prompts: PromptConfig,
        limits: Limits,
        clone_base: impl Into<String>,
    ) -> Self {
        Dispatcher {
            github,
            llm,
            prompts,
            limits,
            clone_base: clone_base.into(),
        }
    }

    fn review_context(&self) -> ReviewContext<'_> {
        ReviewContext {
            github: self.github.as_ref(),
            llm: self.llm.as_ref(),
            prompts: &self.prompts,
            limits: &self.limits,
        }
    }

    fn triager(&self) -> IssueTriager<'_> {
        IssueTriager {
            github: self.github.as_ref(),
            llm: self.llm.as_ref(),
            limits: &self.limits,
            clone_base: &self.clone_base,
        }
    }

    /// Routes one event to the appropriate orchestrator.
    pub async fn dispatch(&self, event: WebhookEvent) -> Result<DispatchOutcome, DispatchError> {
        match event {
            WebhookEvent::PullRequest(e) => {
                info!(repo = %e.repo, pr = %e.pr_number, action = ?e.action, "dispatching PR review");
                self.review_context()
                    .review_pull_request(&e.repo, e.pr_number)
                    .await?;
                Ok(DispatchOutcome::Processed)
            }

            WebhookEvent::WorkflowRun(e) => {
                info!(repo = %e.repo, run = %e.run_id, "dispatching workflow analysis");
                self.review_context().analyze_workflow_run(&e).await?;
                Ok(DispatchOutcome::Processed)
            }

            WebhookEvent::IssueComment(e) => self.dispatch_comment(e).await,
        }
    }

    async fn dispatch_comment(
        &self,
        event: IssueCommentEvent,
    ) -> Result<DispatchOutcome, DispatchError> {
        // Commands only fire on fresh comments; edits and deletions of old
        // comments must not re-trigger pipelines.
        if event.action != CommentAction::Created {
            return Ok(DispatchOutcome::Ignored);
        }

        let entity = if event.is_pull_request {
            EntityKind::PullRequest
        } else {
            EntityKind::Issue
        };

        debug!(
            repo = %event.repo,
            issue = %event.issue_number,
            comment = %event.comment_id,
            author = %event.author_login,
            "classifying comment"
        );
        let invocation: CommandInvocation = classify(&event.body, entity);

        match (invocation.valid_command(), invocation.mismatched_command()) {
            (Some(TriggerCommand::PrReview), _) => {
                info!(repo = %event.repo, pr = %event.issue_number, "PR review requested by comment");
                self.review_context()
                    .review_pull_request(&event.repo, PrNumber(event.issue_number.0))
                    .await?;
                Ok(DispatchOutcome::Processed)
            }

            (Some(TriggerCommand::Triage), _) => {
                info!(repo = %event.repo, issue = %event.issue_number, "triage requested by comment");
                self.triager()
                    .triage_issue(&event.repo, event.issue_number)
                    .await?;
                Ok(DispatchOutcome::Processed)
            }

            (None, Some(command)) => {
                // Right command, wrong entity: the webhook itself was valid,
                // so this is a posted correction, not an HTTP error.
                info!(repo = %event.repo, issue = %event.issue_number, command = %command,
                    "command used on wrong entity kind");
                let body = validation_error_comment(command, entity);
                self.github
                    .post_comment(&event.repo, event.issue_number, &body)
                    .await
                    .map_err(DispatchError::Comment)?;
                Ok(DispatchOutcome::Processed)
            }

            (None, None) => {
                debug!(repo = %event.repo, issue = %event.issue_number, "comment is not a command");
                Ok(DispatchOutcome::Ignored)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::github::{IssueDetails, PrDetails};
    use crate::test_support::{FakeGitHub, FakeLlm};
    use crate::types::{IssueNumber, RepoId};

    fn comment_event(body: &str, is_pull_request: bool) -> IssueCommentEvent {
        IssueCommentEvent {
            repo: RepoId::new("org", "repo"),
            action: CommentAction::Created,
            issue_number: IssueNumber(5),
            comment_id: crate::types::CommentId(900),
            is_pull_request,
            body: body.to_string(),
            author_login: "dev".to_string(),
            installation: None,
        }
    }

    fn dispatcher(github: Arc<FakeGitHub>, llm: Arc<FakeLlm>) -> Dispatcher {
        Dispatcher::new(
            github,
            llm,
            PromptConfig::built_in_default(),
            Limits::default(),
            "/nonexistent",
        )
    }

    #[tokio::test]
    async fn non_command_comment_is_silently_ignored() {
        let github = Arc::new(FakeGitHub::new());
        let llm = Arc::new(FakeLlm::with_responses(vec![]));
        let d = dispatcher(github.clone(), llm.clone());

        // "\ansieyes_triage please" is not an exact match
        let outcome = d
            .dispatch(WebhookEvent::IssueComment(comment_event(
                "\\ansieyes_triage please",
                false,
            )))
            .await
            .unwrap();

        assert_eq!(outcome, DispatchOutcome::Ignored);
        assert!(github.comments().is_empty());
        assert_eq!(llm.calls(), 0);
    }

    #[tokio::test]
    async fn triage_command_on_pr_posts_validation_error() {
        let github = Arc::new(FakeGitHub::new());
        let llm = Arc::new(FakeLlm::with_responses(vec![]));
        let d = dispatcher(github.clone(), llm.clone());

        let outcome = d
            .dispatch(WebhookEvent::IssueComment(comment_event(
                "\\ansieyes_triage",
                true,
            )))
            .await
            .unwrap();

        assert_eq!(outcome, DispatchOutcome::Processed);
        let comments = github.comments();
        assert_eq!(comments.len(), 1);
        assert!(comments[0].2.contains("\\ansieyes_prreview"));
        assert_eq!(llm.calls(), 0);
    }

    #[tokio::test]
    async fn prreview_command_on_issue_posts_validation_error() {
        let github = Arc::new(FakeGitHub::new());
        let llm = Arc::new(FakeLlm::with_responses(vec![]));
        let d = dispatcher(github.clone(), llm.clone());

        let outcome = d
            .dispatch(WebhookEvent::IssueComment(comment_event(
                "\\ansieyes_prreview",
                false,
            )))
            .await
            .unwrap();

        assert_eq!(outcome, DispatchOutcome::Processed);
        let comments = github.comments();
        assert_eq!(comments.len(), 1);
        assert!(comments[0].2.contains("\\ansieyes_triage"));
    }

    #[tokio::test]
    async fn prreview_command_on_pr_runs_review() {
        let github = Arc::new(
            FakeGitHub::new()
                .with_pr(
                    PrNumber(5),
                    PrDetails {
                        number: PrNumber(5),
                        title: "t".to_string(),
                        body: "b".to_string(),
                    },
                )
                .with_changed_files(vec![]),
        );
        let llm = Arc::new(FakeLlm::with_responses(vec![
            "## Overall Assessment\nFine.".to_string(),
        ]));
        let d = dispatcher(github.clone(), llm.clone());

        let outcome = d
            .dispatch(WebhookEvent::IssueComment(comment_event(
                "\\ansieyes_prreview",
                true,
            )))
            .await
            .unwrap();

        assert_eq!(outcome, DispatchOutcome::Processed);
        assert_eq!(llm.calls(), 1);
        let comments = github.comments();
        assert_eq!(comments.len(), 1);
        assert!(comments[0].2.contains("Ansieyes Report"));
    }

    #[tokio::test]
    async fn edited_comments_never_trigger() {
        let github = Arc::new(FakeGitHub::new());
        let llm = Arc::new(FakeLlm::with_responses(vec![]));
        let d = dispatcher(github.clone(), llm.clone());

        let mut event = comment_event("\\ansieyes_triage", false);
        event.action = CommentAction::Edited;

        let outcome = d
            .dispatch(WebhookEvent::IssueComment(event))
            .await
            .unwrap();

        assert_eq!(outcome, DispatchOutcome::Ignored);
        assert!(github.comments().is_empty());
    }

    #[tokio::test]
    async fn triage_command_on_issue_fails_hard_when_repo_unreachable() {
        // clone_base is /nonexistent: the pipeline aborts at stage 1 and the
        // dispatcher surfaces the hard error after the error comment posted.
        let github = Arc::new(FakeGitHub::new().with_issue(IssueDetails {
            number: IssueNumber(5),
            title: "t".to_string(),
            body: "b".to_string(),
        }));
        let llm = Arc::new(FakeLlm::with_responses(vec![]));
        let d = dispatcher(github.clone(), llm.clone());

        let result = d
            .dispatch(WebhookEvent::IssueComment(comment_event(
                "\\ansieyes_triage",
                false,
            )))
            .await;

        assert!(matches!(result, Err(DispatchError::Triage(_))));
        let comments = github.comments();
        assert_eq!(comments.len(), 1);
        assert!(comments[0].2.contains("Issue Triage Failed"));
    }
}
