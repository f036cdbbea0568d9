//! In-memory fakes for the GitHub and LLM collaborators, plus a local git
//! fixture helper. Test-only.

use std::collections::{HashMap, VecDeque};
use std::path::Path;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use chrono::Utc;

use crate::github::{
    ChangedFile, GitHubApiError, GitHubHost, IssueDetails, IssueSummary, LabelSpec, PrDetails,
    WorkflowJob,
};
use crate::llm::{LanguageModel, LlmError};
use crate::types::{IssueNumber, PrNumber, RepoId, RunId};

// ─── FakeGitHub ───────────────────────────────────────────────────────────────

#[derive(Default)]
struct FakeGitHubState {
    prs: HashMap<u64, PrDetails>,
    changed_files: Vec<ChangedFile>,
    issues: HashMap<u64, IssueDetails>,
    open_issues: Vec<IssueSummary>,
    workflow_jobs: Vec<WorkflowJob>,
    /// (head_branch, head_sha) -> PR
    pr_for_run: Option<(String, String, PrNumber)>,
    comments: Vec<(RepoId, IssueNumber, String)>,
    labels_ensured: Vec<String>,
    labels_added: Vec<(IssueNumber, String)>,
    /// Label names whose add_label call should fail.
    failing_labels: Vec<String>,
    fail_changed_files: Option<String>,
    fail_recent_issues: Option<String>,
}

/// A scripted in-memory [`GitHubHost`].
///
/// Unregistered lookups return permanent "not found" errors, mirroring what
/// the real API would do.
#[derive(Default)]
pub struct FakeGitHub {
    state: Mutex<FakeGitHubState>,
}

impl FakeGitHub {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_pr(self, number: PrNumber, details: PrDetails) -> Self {
        self.state.lock().unwrap().prs.insert(number.0, details);
        self
    }

    pub fn with_changed_files(self, files: Vec<ChangedFile>) -> Self {
        self.state.lock().unwrap().changed_files = files;
        self
    }

    pub fn with_issue(self, details: IssueDetails) -> Self {
        self.state
            .lock()
            .unwrap()
            .issues
            .insert(details.number.0, details);
        self
    }

    pub fn with_open_issues(self, issues: Vec<IssueSummary>) -> Self {
        self.state.lock().unwrap().open_issues = issues;
        self
    }

    pub fn with_workflow_jobs(self, jobs: Vec<WorkflowJob>) -> Self {
        self.state.lock().unwrap().workflow_jobs = jobs;
        self
    }

    pub fn with_pr_for_run(self, branch: &str, sha: &str, pr: PrNumber) -> Self {
        self.state.lock().unwrap().pr_for_run = Some((branch.to_string(), sha.to_string(), pr));
        self
    }

    pub fn failing_changed_files(self, message: &str) -> Self {
        self.state.lock().unwrap().fail_changed_files = Some(message.to_string());
        self
    }

    pub fn failing_recent_issues(self, message: &str) -> Self {
        self.state.lock().unwrap().fail_recent_issues = Some(message.to_string());
        self
    }

    pub fn failing_label(self, name: &str) -> Self {
        self.state
            .lock()
            .unwrap()
            .failing_labels
            .push(name.to_string());
        self
    }

    /// Comments posted so far, as (repo, issue, body).
    pub fn comments(&self) -> Vec<(RepoId, IssueNumber, String)> {
        self.state.lock().unwrap().comments.clone()
    }

    /// Labels attached to issues so far, as (issue, label).
    pub fn labels_added(&self) -> Vec<(IssueNumber, String)> {
        self.state.lock().unwrap().labels_added.clone()
    }

    /// Label names ensured to exist so far.
    pub fn labels_ensured(&self) -> Vec<String> {
        self.state.lock().unwrap().labels_ensured.clone()
    }
}

#[async_trait]
impl GitHubHost for FakeGitHub {
    async fn pr_details(&self, _repo: &RepoId, pr: PrNumber) -> Result<PrDetails, GitHubApiError> {
        self.state
            .lock()
            .unwrap()
            .prs
            .get(&pr.0)
            .cloned()
            .ok_or_else(|| GitHubApiError::permanent(format!("PR {pr} not found")))
    }

    async fn changed_files(
        &self,
        _repo: &RepoId,
        _pr: PrNumber,
    ) -> Result<Vec<ChangedFile>, GitHubApiError> {
        let state = self.state.lock().unwrap();
        if let Some(message) = &state.fail_changed_files {
            return Err(GitHubApiError::transient(message.clone()));
        }
        Ok(state.changed_files.clone())
    }

    async fn issue(
        &self,
        _repo: &RepoId,
        issue: IssueNumber,
    ) -> Result<IssueDetails, GitHubApiError> {
        self.state
            .lock()
            .unwrap()
            .issues
            .get(&issue.0)
            .cloned()
            .ok_or_else(|| GitHubApiError::permanent(format!("issue {issue} not found")))
    }

    async fn recent_open_issues(
        &self,
        _repo: &RepoId,
        limit: usize,
    ) -> Result<Vec<IssueSummary>, GitHubApiError> {
        let state = self.state.lock().unwrap();
        if let Some(message) = &state.fail_recent_issues {
            return Err(GitHubApiError::transient(message.clone()));
        }
        Ok(state.open_issues.iter().take(limit).cloned().collect())
    }

    async fn post_comment(
        &self,
        repo: &RepoId,
        issue: IssueNumber,
        body: &str,
    ) -> Result<(), GitHubApiError> {
        self.state
            .lock()
            .unwrap()
            .comments
            .push((repo.clone(), issue, body.to_string()));
        Ok(())
    }

    async fn ensure_label(&self, _repo: &RepoId, label: &LabelSpec) -> Result<(), GitHubApiError> {
        self.state
            .lock()
            .unwrap()
            .labels_ensured
            .push(label.name.clone());
        Ok(())
    }

    async fn add_label(
        &self,
        _repo: &RepoId,
        issue: IssueNumber,
        label: &str,
    ) -> Result<(), GitHubApiError> {
        let mut state = self.state.lock().unwrap();
        if state.failing_labels.iter().any(|l| l == label) {
            return Err(GitHubApiError::permanent(format!(
                "cannot add label {label}"
            )));
        }
        state.labels_added.push((issue, label.to_string()));
        Ok(())
    }

    async fn workflow_jobs(
        &self,
        _repo: &RepoId,
        _run: RunId,
    ) -> Result<Vec<WorkflowJob>, GitHubApiError> {
        Ok(self.state.lock().unwrap().workflow_jobs.clone())
    }

    async fn find_pr_for_run(
        &self,
        _repo: &RepoId,
        head_branch: &str,
        head_sha: &str,
    ) -> Result<Option<PrNumber>, GitHubApiError> {
        let state = self.state.lock().unwrap();
        Ok(state.pr_for_run.as_ref().and_then(|(branch, sha, pr)| {
            (branch == head_branch && sha == head_sha).then_some(*pr)
        }))
    }
}

// ─── FakeLlm ──────────────────────────────────────────────────────────────────

/// A scripted [`LanguageModel`] returning canned responses in order.
///
/// Once the script runs out, further calls return `EmptyResponse` - a test
/// that triggers more LLM calls than it scripted fails loudly.
#[derive(Default)]
pub struct FakeLlm {
    responses: Mutex<VecDeque<String>>,
    prompts: Mutex<Vec<String>>,
    calls: AtomicUsize,
    fail_message: Option<String>,
}

impl FakeLlm {
    pub fn with_responses(responses: Vec<String>) -> Self {
        FakeLlm {
            responses: Mutex::new(responses.into()),
            ..Default::default()
        }
    }

    /// A model whose every call fails.
    pub fn failing(message: &str) -> Self {
        FakeLlm {
            fail_message: Some(message.to_string()),
            ..Default::default()
        }
    }

    /// Number of generate calls made.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// The prompts seen, in call order.
    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }
}

#[async_trait]
impl LanguageModel for FakeLlm {
    async fn generate(&self, prompt: &str) -> Result<String, LlmError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.prompts.lock().unwrap().push(prompt.to_string());

        if let Some(message) = &self.fail_message {
            return Err(LlmError::Api {
                status: 500,
                message: message.clone(),
            });
        }

        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .ok_or(LlmError::EmptyResponse)
    }
}

// ─── Git fixtures ─────────────────────────────────────────────────────────────

/// Creates a committed git repository at `path` with the given files.
pub fn init_git_fixture(path: &Path, files: &[(&str, &str)]) {
    std::fs::create_dir_all(path).unwrap();

    for (relative, content) in files {
        let full = path.join(relative);
        std::fs::create_dir_all(full.parent().unwrap()).unwrap();
        std::fs::write(full, content).unwrap();
    }

    for args in [
        vec!["init", "-q"],
        vec!["add", "."],
        vec![
            "-c",
            "user.name=test",
            "-c",
            "user.email=test@example.com",
            "commit",
            "-q",
            "-m",
            "fixture",
        ],
    ] {
        let status = std::process::Command::new("git")
            .args(&args)
            .current_dir(path)
            .status()
            .unwrap();
        assert!(status.success(), "git {args:?} failed in fixture setup");
    }
}

/// A helper for the recent-issue window: an open issue updated now.
pub fn open_issue(number: u64, title: &str, body: &str) -> IssueSummary {
    IssueSummary {
        number: IssueNumber(number),
        title: title.to_string(),
        body: body.to_string(),
        updated_at: Utc::now(),
    }
}
