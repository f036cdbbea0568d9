//! PR review and workflow-run analysis flows.

use thiserror::Error;
use tracing::{error, info, warn};

use crate::config::Limits;
use crate::github::{ChangedFile, GitHubApiError, GitHubHost, PrDetails, WorkflowJob};
use crate::llm::{LanguageModel, LlmError};
use crate::prompts::{PromptConfig, PromptProfile, select_profile};
use crate::types::{IssueNumber, PrNumber, RepoId};
use crate::webhooks::WorkflowRunEvent;

use super::parse::parse_review;
use super::types::ReviewResult;

/// GitHub's comment size limit, minus room for the truncation notice.
const MAX_COMMENT_LEN: usize = 65000;

/// A review flow error, tagged with the step that failed.
///
/// The step name appears verbatim in the error comment posted to the PR.
#[derive(Debug, Error)]
pub enum ReviewError {
    #[error("{step}: {source}")]
    GitHub {
        step: &'static str,
        source: GitHubApiError,
    },

    #[error("{step}: {source}")]
    Llm {
        step: &'static str,
        source: LlmError,
    },
}

impl ReviewError {
    /// The step at which the flow terminated.
    pub fn step(&self) -> &'static str {
        match self {
            ReviewError::GitHub { step, .. } => step,
            ReviewError::Llm { step, .. } => step,
        }
    }
}

/// Borrowed collaborators for one review or workflow-analysis run.
pub struct ReviewContext<'a> {
    pub github: &'a dyn GitHubHost,
    pub llm: &'a dyn LanguageModel,
    pub prompts: &'a PromptConfig,
    pub limits: &'a Limits,
}

impl ReviewContext<'_> {
    /// Reviews a pull request and posts one consolidated comment.
    ///
    /// On failure at any step, an error comment naming the step is posted
    /// (best-effort) and the error returned; no retry happens here.
    pub async fn review_pull_request(
        &self,
        repo: &RepoId,
        pr: PrNumber,
    ) -> Result<ReviewResult, ReviewError> {
        match self.run_review(repo, pr).await {
            Ok(result) => Ok(result),
            Err(e) => {
                error!(repo = %repo, pr = %pr, error = %e, "PR review failed");
                self.post_failure_comment(repo, pr.into(), "PR Review", &e)
                    .await;
                Err(e)
            }
        }
    }

    async fn run_review(&self, repo: &RepoId, pr: PrNumber) -> Result<ReviewResult, ReviewError> {
        let details = self
            .github
            .pr_details(repo, pr)
            .await
            .map_err(|source| ReviewError::GitHub {
                step: "fetching pull request",
                source,
            })?;

        let files = self
            .github
            .changed_files(repo, pr)
            .await
            .map_err(|source| ReviewError::GitHub {
                step: "fetching changed files",
                source,
            })?;

        info!(repo = %repo, pr = %pr, files = files.len(), "reviewing pull request");

        let profile_name = select_profile(&repo.web_ident(), self.prompts);
        let profile = self.prompts.profile(profile_name);

        let prompt = build_review_prompt(profile, &details, &files, self.limits);

        let response = self
            .llm
            .generate(&prompt)
            .await
            .map_err(|source| ReviewError::Llm {
                step: "generating review",
                source,
            })?;

        let reviewed: Vec<String> = files
            .iter()
            .take(self.limits.max_review_files)
            .map(|f| f.filename.clone())
            .collect();

        let result = parse_review(&response, reviewed);
        if !result.is_structured() {
            warn!(repo = %repo, pr = %pr, "review response had no recognizable sections, posting raw");
        }

        let comment = format_review_comment(&result);
        self.github
            .post_comment(repo, pr.into(), &comment)
            .await
            .map_err(|source| ReviewError::GitHub {
                step: "posting review comment",
                source,
            })?;

        Ok(result)
    }

    /// Analyzes a completed workflow run and comments on the associated PR.
    ///
    /// A run with no matching PR is logged and dropped; there is nowhere to
    /// post.
    pub async fn analyze_workflow_run(&self, event: &WorkflowRunEvent) -> Result<(), ReviewError> {
        let repo = &event.repo;

        let pr = self
            .github
            .find_pr_for_run(repo, &event.head_branch, &event.head_sha)
            .await
            .map_err(|source| ReviewError::GitHub {
                step: "locating pull request for workflow run",
                source,
            })?;

        let Some(pr) = pr else {
            warn!(
                repo = %repo,
                run = %event.run_id,
                branch = %event.head_branch,
                "no PR found for workflow run, skipping analysis"
            );
            return Ok(());
        };

        match self.run_workflow_analysis(event, pr).await {
            Ok(()) => Ok(()),
            Err(e) => {
                error!(repo = %repo, run = %event.run_id, error = %e, "workflow analysis failed");
                self.post_failure_comment(repo, pr.into(), "Workflow Analysis", &e)
                    .await;
                Err(e)
            }
        }
    }

    async fn run_workflow_analysis(
        &self,
        event: &WorkflowRunEvent,
        pr: PrNumber,
    ) -> Result<(), ReviewError> {
        let repo = &event.repo;

        let jobs = self
            .github
            .workflow_jobs(repo, event.run_id)
            .await
            .map_err(|source| ReviewError::GitHub {
                step: "fetching workflow jobs",
                source,
            })?;

        let failed_jobs: Vec<&str> = jobs
            .iter()
            .filter(|j| j.conclusion.as_deref() == Some("failure"))
            .map(|j| j.name.as_str())
            .collect();

        let profile_name = select_profile(&repo.web_ident(), self.prompts);
        let profile = self.prompts.profile(profile_name);

        let prompt = build_workflow_prompt(profile, event, &jobs, &failed_jobs);

        let analysis = self
            .llm
            .generate(&prompt)
            .await
            .map_err(|source| ReviewError::Llm {
                step: "generating workflow analysis",
                source,
            })?;

        let comment = format_workflow_comment(event, &failed_jobs, &analysis);
        self.github
            .post_comment(repo, pr.into(), &comment)
            .await
            .map_err(|source| ReviewError::GitHub {
                step: "posting workflow analysis comment",
                source,
            })?;

        info!(repo = %repo, pr = %pr, run = %event.run_id, "posted workflow analysis");
        Ok(())
    }

    async fn post_failure_comment(
        &self,
        repo: &RepoId,
        issue: IssueNumber,
        what: &str,
        error: &ReviewError,
    ) {
        let body = format!("\u{274c} **{what} Failed**\n\n```\n{error}\n```");
        if let Err(e) = self.github.post_comment(repo, issue, &body).await {
            // Nothing left to do: the failure is already logged, and the
            // comment channel itself is down.
            error!(repo = %repo, issue = %issue, error = %e, "could not post failure comment");
        }
    }
}

// ─── Prompt construction ──────────────────────────────────────────────────────

/// Builds the review prompt from the profile, PR metadata, and diffs.
///
/// Files beyond `max_review_files` are named but their diffs omitted;
/// oversized patches are cut at `max_patch_bytes` with a note. The bounds
/// keep the prompt inside the model's context window.
fn build_review_prompt(
    profile: &PromptProfile,
    pr: &PrDetails,
    files: &[ChangedFile],
    limits: &Limits,
) -> String {
    let mut prompt = String::new();
    prompt.push_str(&profile.system_role);
    prompt.push_str("\n\n");
    prompt.push_str(&profile.review_structure);
    prompt.push_str("\n\n# Pull Request\n\n");
    prompt.push_str(&format!("Title: {}\n\n", pr.title));
    if pr.body.is_empty() {
        prompt.push_str("Description: No description provided\n");
    } else {
        prompt.push_str(&format!("Description:\n{}\n", pr.body));
    }

    prompt.push_str("\n# Changed Files\n");
    for file in files.iter().take(limits.max_review_files) {
        prompt.push_str(&format!(
            "\n### {} ({}, +{}/-{})\n",
            file.filename, file.status, file.additions, file.deletions
        ));
        match &file.patch {
            Some(patch) => {
                prompt.push_str("```diff\n");
                if patch.len() > limits.max_patch_bytes {
                    let cut = truncation_boundary(patch, limits.max_patch_bytes);
                    prompt.push_str(&patch[..cut]);
                    prompt.push_str("\n[diff truncated]\n");
                } else {
                    prompt.push_str(patch);
                    prompt.push('\n');
                }
                prompt.push_str("```\n");
            }
            None => prompt.push_str("(no diff available)\n"),
        }
    }

    if files.len() > limits.max_review_files {
        let omitted: Vec<&str> = files[limits.max_review_files..]
            .iter()
            .map(|f| f.filename.as_str())
            .collect();
        prompt.push_str(&format!(
            "\nNote: {} additional changed file(s) omitted from this prompt: {}\n",
            omitted.len(),
            omitted.join(", ")
        ));
    }

    prompt
}

/// Builds the workflow-analysis prompt from the profile and run outcomes.
fn build_workflow_prompt(
    profile: &PromptProfile,
    event: &WorkflowRunEvent,
    jobs: &[WorkflowJob],
    failed_jobs: &[&str],
) -> String {
    let mut prompt = String::new();
    prompt.push_str(&profile.workflow_analysis_template);
    prompt.push_str("\n\n# Workflow Run\n\n");
    prompt.push_str(&format!("Workflow: {}\n", event.name));
    prompt.push_str(&format!(
        "Conclusion: {}\n",
        event.conclusion.as_deref().unwrap_or("unknown")
    ));
    if !failed_jobs.is_empty() {
        prompt.push_str(&format!("Failed jobs: {}\n", failed_jobs.join(", ")));
    }

    prompt.push_str("\n# Jobs\n");
    for job in jobs {
        prompt.push_str(&format!(
            "\n- {} ({}, {})\n",
            job.name,
            job.status,
            job.conclusion.as_deref().unwrap_or("pending")
        ));
        for step in &job.steps {
            prompt.push_str(&format!(
                "  - {}: {}\n",
                step.name,
                step.conclusion.as_deref().unwrap_or(&step.status)
            ));
        }
    }

    prompt
}

// ─── Comment formatting ───────────────────────────────────────────────────────

/// Formats the review result as the posted PR comment.
pub fn format_review_comment(result: &ReviewResult) -> String {
    let mut comment = String::from("## \u{1f916} Ansieyes Report\n\n");

    if result.is_structured() {
        if !result.overall_assessment.is_empty() {
            comment.push_str("### Overall Assessment\n\n");
            comment.push_str(&result.overall_assessment);
            comment.push_str("\n\n");
        }

        if !result.issues.is_empty() {
            comment.push_str("### Issues\n\n");
            for issue in &result.issues {
                comment.push_str(&format!(
                    "- **{}**: {}",
                    issue.severity.to_uppercase(),
                    issue.description
                ));
                if let Some(location) = &issue.location {
                    comment.push_str(&format!(" (`{location}`)"));
                }
                comment.push('\n');
            }
            comment.push('\n');
        }

        if !result.suggestions.is_empty() {
            comment.push_str("### Suggestions\n\n");
            for suggestion in &result.suggestions {
                comment.push_str(&format!("- {suggestion}\n"));
            }
            comment.push('\n');
        }
    } else {
        // Nothing recognized: post the model's text as-is rather than
        // discarding it.
        comment.push_str(result.raw.trim());
        comment.push_str("\n\n");
    }

    if !result.files_reviewed.is_empty() {
        comment.push_str(&format!(
            "<sub>Reviewed {} file(s)</sub>\n\n",
            result.files_reviewed.len()
        ));
    }

    comment.push_str("---\n*This review was generated automatically by the Ansieyes bot.*");
    clamp_comment(comment)
}

/// Formats the workflow-analysis comment.
pub fn format_workflow_comment(
    event: &WorkflowRunEvent,
    failed_jobs: &[&str],
    analysis: &str,
) -> String {
    let conclusion = event.conclusion.as_deref().unwrap_or("unknown");
    let marker = match conclusion {
        "success" => "\u{2705}",
        "failure" => "\u{274c}",
        _ => "\u{26a0}\u{fe0f}",
    };

    let mut comment = format!(
        "## {marker} GitHub Actions Workflow: {}\n\n**Status:** `{}`\n\n",
        event.name,
        conclusion.to_uppercase()
    );

    if !event.html_url.is_empty() {
        comment.push_str(&format!("[View Workflow Run]({})\n\n", event.html_url));
    }

    if !failed_jobs.is_empty() {
        comment.push_str(&format!("**Failed Jobs:** {}\n\n", failed_jobs.join(", ")));
    }

    comment.push_str("### Analysis\n\n");
    comment.push_str(analysis);
    comment.push_str("\n\n---\n*This analysis was generated automatically by the Ansieyes bot.*");
    clamp_comment(comment)
}

/// Truncates a comment to GitHub's size limit, keeping the head.
fn clamp_comment(comment: String) -> String {
    if comment.len() <= MAX_COMMENT_LEN {
        return comment;
    }
    let cut = truncation_boundary(&comment, MAX_COMMENT_LEN);
    format!("{}\n\n[comment truncated]", &comment[..cut])
}

/// Largest index `<= limit` that falls on a char boundary.
fn truncation_boundary(s: &str, limit: usize) -> usize {
    let mut cut = limit.min(s.len());
    while cut > 0 && !s.is_char_boundary(cut) {
        cut -= 1;
    }
    cut
}
