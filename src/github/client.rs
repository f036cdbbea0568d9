//! Octocrab implementation of the [`GitHubHost`] collaborator.
//!
//! Unlike a merge bot pinned to one repository, this bot serves whichever
//! repositories its App installation covers, so every operation takes the
//! repository explicitly. All calls retry transient errors with exponential
//! backoff; permanent errors surface immediately.

use async_trait::async_trait;
use octocrab::Octocrab;
use octocrab::params::State;
use tracing::debug;

use crate::types::{IssueNumber, PrNumber, RepoId, RunId};

use super::error::GitHubApiError;
use super::retry::{RetryConfig, retry_with_backoff};
use super::{
    ChangedFile, GitHubHost, IssueDetails, IssueSummary, LabelSpec, PrDetails, WorkflowJob,
    WorkflowStep,
};

/// A GitHub API client backed by octocrab.
#[derive(Clone)]
pub struct OctocrabHost {
    client: Octocrab,
    retry: RetryConfig,
}

impl OctocrabHost {
    /// Creates a host from a pre-configured octocrab instance.
    ///
    /// Use this for custom authentication (e.g., GitHub App installation
    /// tokens minted by the deployment).
    pub fn new(client: Octocrab) -> Self {
        Self {
            client,
            retry: RetryConfig::DEFAULT,
        }
    }

    /// Creates a host authenticated with a personal access token.
    pub fn from_token(token: impl Into<String>) -> Result<Self, octocrab::Error> {
        let client = Octocrab::builder().personal_token(token.into()).build()?;
        Ok(Self::new(client))
    }

    /// Overrides the retry configuration (tests use `RetryConfig::NONE`).
    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    async fn list_prs_by_head(
        &self,
        repo: &RepoId,
        head_branch: &str,
        state: State,
    ) -> Result<Vec<octocrab::models::pulls::PullRequest>, GitHubApiError> {
        let page = retry_with_backoff(self.retry, || async {
            self.client
                .pulls(&repo.owner, &repo.repo)
                .list()
                .state(state)
                .head(format!("{}:{}", repo.owner, head_branch))
                .per_page(50)
                .send()
                .await
                .map_err(GitHubApiError::from_octocrab)
        })
        .await?;
        Ok(page.items)
    }
}

impl std::fmt::Debug for OctocrabHost {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OctocrabHost").finish_non_exhaustive()
    }
}

#[async_trait]
impl GitHubHost for OctocrabHost {
    async fn pr_details(&self, repo: &RepoId, pr: PrNumber) -> Result<PrDetails, GitHubApiError> {
        let pull = retry_with_backoff(self.retry, || async {
            self.client
                .pulls(&repo.owner, &repo.repo)
                .get(pr.0)
                .await
                .map_err(GitHubApiError::from_octocrab)
        })
        .await?;

        Ok(PrDetails {
            number: pr,
            title: pull.title.unwrap_or_default(),
            body: pull.body.unwrap_or_default(),
        })
    }

    async fn changed_files(
        &self,
        repo: &RepoId,
        pr: PrNumber,
    ) -> Result<Vec<ChangedFile>, GitHubApiError> {
        let page = retry_with_backoff(self.retry, || async {
            self.client
                .pulls(&repo.owner, &repo.repo)
                .list_files(pr.0)
                .await
                .map_err(GitHubApiError::from_octocrab)
        })
        .await?;

        let files = page
            .items
            .into_iter()
            .map(|f| ChangedFile {
                filename: f.filename,
                status: format!("{:?}", f.status).to_lowercase(),
                additions: f.additions,
                deletions: f.deletions,
                patch: f.patch,
            })
            .collect();

        Ok(files)
    }

    async fn issue(
        &self,
        repo: &RepoId,
        issue: IssueNumber,
    ) -> Result<IssueDetails, GitHubApiError> {
        let fetched = retry_with_backoff(self.retry, || async {
            self.client
                .issues(&repo.owner, &repo.repo)
                .get(issue.0)
                .await
                .map_err(GitHubApiError::from_octocrab)
        })
        .await?;

        Ok(IssueDetails {
            number: issue,
            title: fetched.title,
            body: fetched.body.unwrap_or_default(),
        })
    }

    async fn recent_open_issues(
        &self,
        repo: &RepoId,
        limit: usize,
    ) -> Result<Vec<IssueSummary>, GitHubApiError> {
        let page = retry_with_backoff(self.retry, || async {
            self.client
                .issues(&repo.owner, &repo.repo)
                .list()
                .state(State::Open)
                .per_page(limit.min(100) as u8)
                .send()
                .await
                .map_err(GitHubApiError::from_octocrab)
        })
        .await?;

        let issues = page
            .items
            .into_iter()
            // The issues endpoint returns PRs too; drop them
            .filter(|i| i.pull_request.is_none())
            .take(limit)
            .map(|i| IssueSummary {
                number: IssueNumber(i.number),
                title: i.title,
                body: i.body.unwrap_or_default(),
                updated_at: i.updated_at,
            })
            .collect();

        Ok(issues)
    }

    async fn post_comment(
        &self,
        repo: &RepoId,
        issue: IssueNumber,
        body: &str,
    ) -> Result<(), GitHubApiError> {
        retry_with_backoff(self.retry, || async {
            self.client
                .issues(&repo.owner, &repo.repo)
                .create_comment(issue.0, body)
                .await
                .map_err(GitHubApiError::from_octocrab)
        })
        .await?;

        debug!(repo = %repo, issue = %issue, "posted comment");
        Ok(())
    }

    async fn ensure_label(&self, repo: &RepoId, label: &LabelSpec) -> Result<(), GitHubApiError> {
        let result = retry_with_backoff(self.retry, || async {
            self.client
                .issues(&repo.owner, &repo.repo)
                .create_label(&label.name, &label.color, &label.description)
                .await
                .map_err(GitHubApiError::from_octocrab)
        })
        .await;

        match result {
            Ok(_) => Ok(()),
            Err(e) if e.is_already_exists() => Ok(()),
            Err(e) => Err(e),
        }
    }

    async fn add_label(
        &self,
        repo: &RepoId,
        issue: IssueNumber,
        label: &str,
    ) -> Result<(), GitHubApiError> {
        retry_with_backoff(self.retry, || async {
            self.client
                .issues(&repo.owner, &repo.repo)
                .add_labels(issue.0, &[label.to_string()])
                .await
                .map_err(GitHubApiError::from_octocrab)
        })
        .await?;

        Ok(())
    }

    async fn workflow_jobs(
        &self,
        repo: &RepoId,
        run: RunId,
    ) -> Result<Vec<WorkflowJob>, GitHubApiError> {
        let page = retry_with_backoff(self.retry, || async {
            self.client
                .workflows(&repo.owner, &repo.repo)
                .list_jobs(octocrab::models::RunId(run.0))
                .per_page(50)
                .send()
                .await
                .map_err(GitHubApiError::from_octocrab)
        })
        .await?;

        let jobs = page
            .items
            .into_iter()
            .map(|job| WorkflowJob {
                name: job.name,
                status: format!("{:?}", job.status).to_lowercase(),
                conclusion: job.conclusion.map(|c| format!("{:?}", c).to_lowercase()),
                steps: job
                    .steps
                    .into_iter()
                    .map(|s| WorkflowStep {
                        name: s.name,
                        status: format!("{:?}", s.status).to_lowercase(),
                        conclusion: s.conclusion.map(|c| format!("{:?}", c).to_lowercase()),
                    })
                    .collect(),
            })
            .collect();

        Ok(jobs)
    }

    async fn find_pr_for_run(
        &self,
        repo: &RepoId,
        head_branch: &str,
        head_sha: &str,
    ) -> Result<Option<PrNumber>, GitHubApiError> {
        // Open PRs first; fall back to closed (the run may outlive a merge).
        for state in [State::Open, State::Closed] {
            let prs = self.list_prs_by_head(repo, head_branch, state).await?;
            if let Some(pr) = prs.into_iter().find(|p| p.head.sha == head_sha) {
                return Ok(Some(PrNumber(pr.number)));
            }
        }
        Ok(None)
    }
}
