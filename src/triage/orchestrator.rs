//! The five-stage triage pipeline.
//!
//! Stages run strictly sequentially - each depends on its predecessors'
//! output (librarian files feed the surgeon; labels derive from everything).
//! Only stage 1 (repository fetch) fails hard; every later stage records its
//! failure and lets the pipeline continue. One consolidated comment is posted
//! at the end regardless of partial failure.

use chrono::{Duration as ChronoDuration, Utc};
use serde::Deserialize;
use thiserror::Error;
use tracing::{error, info, warn};

use crate::config::Limits;
use crate::git::{Checkout, GitError};
use crate::github::{GitHubApiError, GitHubHost, IssueDetails, IssueSummary};
use crate::llm::{LanguageModel, extract_json};
use crate::types::{IssueNumber, RepoId};

use super::comment::{format_triage_comment, format_triage_failure};
use super::injection::detect_injection_in;
use super::labels::derive_labels;
use super::repo_config::RepoTriageConfig;
use super::result::{
    AppliedLabels, DuplicateCandidate, DuplicateReport, IssueType, LibrarianReport, Severity,
    StageOutcome, SurgeonReport, TriageResult,
};

/// Bytes of an issue body or candidate body included in LLM prompts.
const BODY_SNIPPET_BYTES: usize = 1500;

/// A fail-hard triage error (stage 1, or the issue itself unreachable).
#[derive(Debug, Error)]
pub enum TriageError {
    #[error("fetching issue: {0}")]
    IssueFetch(GitHubApiError),

    #[error("fetching repository: {0}")]
    RepoFetch(#[from] GitError),
}

/// Borrowed collaborators for one triage run.
pub struct IssueTriager<'a> {
    pub github: &'a dyn GitHubHost,
    pub llm: &'a dyn LanguageModel,
    pub limits: &'a Limits,
    /// Base for clone URLs (`https://github.com` in production).
    pub clone_base: &'a str,
}

impl IssueTriager<'_> {
    /// Runs the full pipeline over one issue and posts one consolidated
    /// comment.
    ///
    /// Returns `Err` only for the fail-hard conditions; in that case a single
    /// error comment has been posted (best-effort) and no further stages ran.
    pub async fn triage_issue(
        &self,
        repo: &RepoId,
        issue: IssueNumber,
    ) -> Result<TriageResult, TriageError> {
        let details = match self.github.issue(repo, issue).await {
            Ok(details) => details,
            Err(e) => {
                error!(repo = %repo, issue = %issue, error = %e, "cannot fetch issue, aborting triage");
                return Err(TriageError::IssueFetch(e));
            }
        };

        // Stage 1: config fetch. An unreachable repository is the pipeline's
        // only fail-hard condition.
        let clone_url = repo.clone_url(self.clone_base);
        let checkout =
            match Checkout::clone_shallow(&clone_url, self.limits.clone_timeout).await {
                Ok(checkout) => checkout,
                Err(e) => {
                    error!(repo = %repo, issue = %issue, error = %e, "repository fetch failed, aborting triage");
                    let body = format_triage_failure(issue, &e.to_string());
                    if let Err(post_err) = self.github.post_comment(repo, issue, &body).await {
                        error!(repo = %repo, issue = %issue, error = %post_err,
                            "could not post triage failure comment");
                    }
                    return Err(e.into());
                }
            };
        let repo_config = RepoTriageConfig::load(&checkout);

        // Stage 2: duplicate check.
        let duplicates = self.duplicate_check(repo, &details).await;

        // Stage 3: librarian pass.
        let librarian = self.librarian_pass(&details, &checkout, &repo_config).await;

        // Stage 4: surgeon pass.
        let (surgeon, injection_blocked) =
            self.surgeon_pass(&details, &checkout, &librarian).await;

        // Stage 5: label application.
        let duplicate_confident = duplicates
            .as_success()
            .and_then(|r| r.confident(self.limits.duplicate_threshold))
            .is_some();
        let labels = self
            .apply_labels(
                repo,
                issue,
                duplicate_confident,
                surgeon.as_success(),
                injection_blocked,
            )
            .await;

        let result = TriageResult {
            repo_config,
            duplicates,
            librarian,
            surgeon,
            labels,
            injection_blocked,
        };

        let comment = format_triage_comment(&result, self.limits.duplicate_threshold);
        if let Err(e) = self.github.post_comment(repo, issue, &comment).await {
            // The pipeline ran; losing the comment loses the user-visible
            // output but not the labels already applied.
            error!(repo = %repo, issue = %issue, error = %e, "could not post triage comment");
        } else {
            info!(repo = %repo, issue = %issue, "posted triage comment");
        }

        Ok(result)
    }

    // ─── Stage 2: duplicate check ─────────────────────────────────────────────

    async fn duplicate_check(
        &self,
        repo: &RepoId,
        details: &IssueDetails,
    ) -> StageOutcome<DuplicateReport> {
        let window = match self
            .github
            .recent_open_issues(repo, self.limits.duplicate_window)
            .await
        {
            Ok(issues) => issues,
            Err(e) => {
                warn!(repo = %repo, error = %e, "duplicate check failed: cannot list issues");
                return StageOutcome::Failed {
                    reason: e.to_string(),
                };
            }
        };

        let cutoff = Utc::now() - ChronoDuration::days(self.limits.duplicate_max_age_days);
        let candidates: Vec<&IssueSummary> = window
            .iter()
            .filter(|i| i.number != details.number && i.updated_at >= cutoff)
            .collect();

        if candidates.is_empty() {
            return StageOutcome::Success(DuplicateReport::default());
        }

        let prompt = build_duplicate_prompt(details, &candidates);
        let response = match self.llm.generate(&prompt).await {
            Ok(text) => text,
            Err(e) => {
                warn!(repo = %repo, error = %e, "duplicate check failed: LLM call");
                return StageOutcome::Failed {
                    reason: e.to_string(),
                };
            }
        };

        match parse_duplicate_scores(&response, &candidates) {
            Ok(report) => StageOutcome::Success(report),
            Err(reason) => {
                warn!(repo = %repo, reason = %reason, "duplicate check failed: unparseable scores");
                StageOutcome::Failed { reason }
            }
        }
    }

    // ─── Stage 3: librarian pass ──────────────────────────────────────────────

    async fn librarian_pass(
        &self,
        details: &IssueDetails,
        checkout: &Checkout,
        config: &RepoTriageConfig,
    ) -> StageOutcome<LibrarianReport> {
        let tree = checkout.file_tree(&config.omit, self.limits.max_tree_entries);
        if tree.is_empty() {
            return StageOutcome::Success(LibrarianReport::default());
        }

        let prompt = build_librarian_prompt(details, config, &tree, self.limits.max_librarian_files);
        let response = match self.llm.generate(&prompt).await {
            Ok(text) => text,
            Err(e) => {
                warn!(issue = %details.number, error = %e, "librarian pass failed: LLM call");
                return StageOutcome::Failed {
                    reason: e.to_string(),
                };
            }
        };

        match parse_librarian_files(&response) {
            Ok(files) => {
                // Keep only paths that actually exist in the tree, in the
                // model's ranking order. Hallucinated paths would poison the
                // surgeon pass.
                let known: Vec<String> = files
                    .into_iter()
                    .filter(|f| tree.iter().any(|t| t == f))
                    .take(self.limits.max_librarian_files)
                    .collect();
                StageOutcome::Success(LibrarianReport { files: known })
            }
            Err(reason) => {
                warn!(issue = %details.number, reason = %reason, "librarian pass failed: unparseable file list");
                StageOutcome::Failed { reason }
            }
        }
    }

    // ─── Stage 4: surgeon pass ────────────────────────────────────────────────

    async fn surgeon_pass(
        &self,
        details: &IssueDetails,
        checkout: &Checkout,
        librarian: &StageOutcome<LibrarianReport>,
    ) -> (StageOutcome<SurgeonReport>, bool) {
        let files = match librarian.as_success() {
            Some(report) if !report.files.is_empty() => &report.files,
            Some(_) => {
                return (
                    StageOutcome::Skipped {
                        reason: "the librarian pass identified no relevant files".to_string(),
                    },
                    false,
                );
            }
            None => {
                return (
                    StageOutcome::Skipped {
                        reason: "the librarian pass did not complete".to_string(),
                    },
                    false,
                );
            }
        };

        let mut contents: Vec<(String, String)> = Vec::new();
        for file in files {
            match checkout.read_file_capped(file, self.limits.max_source_file_bytes) {
                Ok(Some(content)) => contents.push((file.clone(), content)),
                Ok(None) => {} // deleted between tree walk and read; skip
                Err(e) => {
                    warn!(file = %file, error = %e, "could not read file for surgeon pass");
                }
            }
        }

        // Injection guard: issue text and file contents are both
        // attacker-controlled and are about to be embedded in a prompt.
        let sources = std::iter::once(details.title.as_str())
            .chain(std::iter::once(details.body.as_str()))
            .chain(contents.iter().map(|(_, c)| c.as_str()));
        if let Some(marker) = detect_injection_in(sources) {
            warn!(issue = %details.number, marker = %marker, "prompt injection marker detected, skipping surgeon pass");
            return (
                StageOutcome::Skipped {
                    reason: format!("prompt injection marker detected ({marker})"),
                },
                true,
            );
        }

        let prompt = build_surgeon_prompt(details, &contents);
        let response = match self.llm.generate(&prompt).await {
            Ok(text) => text,
            Err(e) => {
                warn!(issue = %details.number, error = %e, "surgeon pass failed: LLM call");
                return (
                    StageOutcome::Failed {
                        reason: e.to_string(),
                    },
                    false,
                );
            }
        };

        match parse_surgeon_response(&response) {
            Ok(report) => (StageOutcome::Success(report), false),
            Err(reason) => {
                warn!(issue = %details.number, reason = %reason, "surgeon pass failed: unparseable analysis");
                (StageOutcome::Failed { reason }, false)
            }
        }
    }

    // ─── Stage 5: label application ───────────────────────────────────────────

    async fn apply_labels(
        &self,
        repo: &RepoId,
        issue: IssueNumber,
        duplicate_confident: bool,
        surgeon: Option<&SurgeonReport>,
        injection_blocked: bool,
    ) -> StageOutcome<AppliedLabels> {
        let specs = derive_labels(duplicate_confident, surgeon, injection_blocked);
        let mut applied = AppliedLabels::default();

        for spec in specs {
            // Ensure-then-attach per label; one label's failure must not
            // block the rest.
            let outcome = async {
                self.github.ensure_label(repo, &spec).await?;
                self.github.add_label(repo, issue, &spec.name).await
            }
            .await;

            match outcome {
                Ok(()) => applied.applied.push(spec.name),
                Err(e) => {
                    warn!(repo = %repo, issue = %issue, label = %spec.name, error = %e,
                        "could not apply label");
                    applied.failed.push((spec.name, e.to_string()));
                }
            }
        }

        StageOutcome::Success(applied)
    }
}

// ─── Prompt construction ──────────────────────────────────────────────────────

fn snippet(text: &str) -> &str {
    let mut cut = BODY_SNIPPET_BYTES.min(text.len());
    while cut > 0 && !text.is_char_boundary(cut) {
        cut -= 1;
    }
    &text[..cut]
}

fn build_duplicate_prompt(details: &IssueDetails, candidates: &[&IssueSummary]) -> String {
    let mut prompt = String::from(
        "You are triaging GitHub issues. Score how likely the new issue below is a \
         duplicate of each existing issue, from 0.0 (unrelated) to 1.0 (same issue).\n\
         Respond with only a JSON array, one entry per existing issue:\n\
         [{\"issue_number\": <number>, \"score\": <0.0-1.0>}]\n\n",
    );

    prompt.push_str(&format!(
        "# New Issue\n\nTitle: {}\n\n{}\n\n# Existing Issues\n\n",
        details.title,
        snippet(&details.body)
    ));

    for candidate in candidates {
        prompt.push_str(&format!(
            "## Issue {}\n\nTitle: {}\n\n{}\n\n",
            candidate.number.0,
            candidate.title,
            snippet(&candidate.body)
        ));
    }

    prompt
}

fn build_librarian_prompt(
    details: &IssueDetails,
    config: &RepoTriageConfig,
    tree: &[String],
    max_files: usize,
) -> String {
    let mut prompt = String::from(
        "You are the librarian in a two-pass issue triage system. Given an issue and \
         the repository's file listing, identify the files most relevant to \
         investigating the issue.\n",
    );
    prompt.push_str(&format!(
        "Respond with only JSON: {{\"relevant_files\": [\"path\", ...]}} with at most \
         {max_files} paths, ranked most relevant first. Use paths exactly as listed.\n\n"
    ));

    if !config.description.is_empty() {
        prompt.push_str(&format!("# Repository\n\n{}\n\n", config.description));
    }

    prompt.push_str(&format!(
        "# Issue\n\nTitle: {}\n\n{}\n\n# Files\n\n",
        details.title,
        snippet(&details.body)
    ));
    for path in tree {
        prompt.push_str(path);
        prompt.push('\n');
    }

    prompt
}

fn build_surgeon_prompt(details: &IssueDetails, contents: &[(String, String)]) -> String {
    let mut prompt = String::from(
        "You are the surgeon in a two-pass issue triage system. The librarian has \
         identified the files below as relevant. Perform a deep analysis of the issue \
         against this code.\n\
         Respond with only JSON in this shape:\n\
         {\"issue_type\": \"bug|enhancement|feature_request\", \
          \"severity\": \"critical|high|medium|low\", \
          \"confidence_score\": <0.0-1.0>, \
          \"analysis_summary\": \"...\", \
          \"root_cause_analysis\": {\"primary_cause\": \"...\"}, \
          \"proposed_solutions\": [{\"description\": \"...\"}]}\n\n",
    );

    prompt.push_str(&format!(
        "# Issue\n\nTitle: {}\n\n{}\n\n# Relevant Files\n\n",
        details.title,
        snippet(&details.body)
    ));

    for (path, content) in contents {
        prompt.push_str(&format!("## {path}\n\n```\n{content}\n```\n\n"));
    }

    prompt
}

// ─── Response parsing ─────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct RawScore {
    issue_number: u64,
    score: f64,
}

/// Parses the duplicate-score array, joining titles back from the candidate
/// window. Scores are clamped to [0, 1]; entries for unknown issue numbers
/// are dropped.
fn parse_duplicate_scores(
    response: &str,
    candidates: &[&IssueSummary],
) -> Result<DuplicateReport, String> {
    let json = extract_json(response).ok_or_else(|| "no JSON found in response".to_string())?;
    let scores: Vec<RawScore> =
        serde_json::from_str(json).map_err(|e| format!("invalid score array: {e}"))?;

    let mut report = DuplicateReport::default();
    for raw in scores {
        if let Some(candidate) = candidates.iter().find(|c| c.number.0 == raw.issue_number) {
            report.candidates.push(DuplicateCandidate {
                issue: candidate.number,
                title: candidate.title.clone(),
                score: raw.score.clamp(0.0, 1.0),
            });
        }
    }
    report
        .candidates
        .sort_by(|a, b| b.score.total_cmp(&a.score));

    Ok(report)
}

#[derive(Debug, Deserialize)]
struct RawLibrarian {
    #[serde(default)]
    relevant_files: Vec<String>,
}

fn parse_librarian_files(response: &str) -> Result<Vec<String>, String> {
    let json = extract_json(response).ok_or_else(|| "no JSON found in response".to_string())?;
    let raw: RawLibrarian =
        serde_json::from_str(json).map_err(|e| format!("invalid file list: {e}"))?;
    Ok(raw.relevant_files)
}

/// Parses the surgeon's JSON, tolerating the field-shape drift LLMs produce:
/// `confidence_score` (0-1) or `confidence` (0-100), `root_cause_analysis`
/// object or flat `root_cause` string, solutions as objects or strings.
fn parse_surgeon_response(response: &str) -> Result<SurgeonReport, String> {
    let json = extract_json(response).ok_or_else(|| "no JSON found in response".to_string())?;
    let value: serde_json::Value =
        serde_json::from_str(json).map_err(|e| format!("invalid analysis JSON: {e}"))?;

    let issue_type = value
        .get("issue_type")
        .and_then(|v| v.as_str())
        .and_then(IssueType::parse)
        .ok_or_else(|| "missing or unrecognized issue_type".to_string())?;

    let severity = value
        .get("severity")
        .and_then(|v| v.as_str())
        .and_then(Severity::parse)
        .ok_or_else(|| "missing or unrecognized severity".to_string())?;

    let confidence = if let Some(score) = value.get("confidence_score").and_then(|v| v.as_f64()) {
        (score.clamp(0.0, 1.0) * 100.0).round() as u8
    } else if let Some(pct) = value.get("confidence").and_then(|v| v.as_f64()) {
        pct.clamp(0.0, 100.0).round() as u8
    } else {
        0
    };

    let summary = value
        .get("analysis_summary")
        .or_else(|| value.get("summary"))
        .and_then(|v| v.as_str())
        .unwrap_or_default()
        .to_string();

    let root_cause = value
        .get("root_cause_analysis")
        .and_then(|v| v.get("primary_cause"))
        .or_else(|| value.get("root_cause"))
        .and_then(|v| v.as_str())
        .unwrap_or_default()
        .to_string();

    let solutions = value
        .get("proposed_solutions")
        .and_then(|v| v.as_array())
        .map(|items| {
            items
                .iter()
                .filter_map(|item| {
                    item.as_str()
                        .map(String::from)
                        .or_else(|| {
                            item.get("description")
                                .and_then(|d| d.as_str())
                                .map(String::from)
                        })
                })
                .collect()
        })
        .unwrap_or_default();

    Ok(SurgeonReport {
        issue_type,
        severity,
        confidence,
        summary,
        root_cause,
        solutions,
    })
}
