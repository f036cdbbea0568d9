//! Rendering of triage results into the posted comment.
//!
//! One comment per run, whatever happened: successful stages render their
//! sections, failed stages surface in a "partial results" note, and a
//! fail-hard run gets a single error comment instead.

use crate::types::IssueNumber;

use super::labels::DUPLICATE_LABEL;
use super::result::{StageOutcome, TriageResult};

/// GitHub's comment size limit, minus room for the truncation notice.
const MAX_COMMENT_LEN: usize = 65000;

/// Renders the consolidated triage comment.
///
/// `duplicate_threshold` controls whether the duplicate banner is shown
/// prominently; candidates below it are still listed for context.
pub fn format_triage_comment(result: &TriageResult, duplicate_threshold: f64) -> String {
    let mut comment = String::from("## \u{1f916} AI Two-Pass Issue Triage\n\n");

    // Duplicate check. A confident hit is surfaced first and prominently,
    // but the pipeline has still run the remaining stages below.
    if let Some(report) = result.duplicates.as_success() {
        if let Some(top) = report.confident(duplicate_threshold) {
            comment.push_str("### \u{1f50d} Likely Duplicate\n\n");
            comment.push_str(&format!(
                "This issue appears to be a duplicate of {} (\"{}\").\n\n",
                top.issue, top.title
            ));
            comment.push_str(&format!(
                "**Similarity Score**: {:.1}%\n\nThe `{}` label has been applied.\n\n---\n\n",
                top.score * 100.0,
                DUPLICATE_LABEL
            ));
        } else if let Some(top) = report.top() {
            comment.push_str(&format!(
                "No likely duplicate found (closest: {} at {:.1}%).\n\n",
                top.issue,
                top.score * 100.0
            ));
        }
    }

    // Librarian pass.
    if let Some(report) = result.librarian.as_success() {
        comment.push_str("### \u{1f4da} Pass 1: Librarian (File Identification)\n\n");
        if report.files.is_empty() {
            comment.push_str("No relevant files identified.\n\n");
        } else {
            comment.push_str(&format!(
                "Identified **{}** relevant file(s) for deep analysis:\n\n",
                report.files.len()
            ));
            comment.push_str("<details>\n<summary><b>View Identified Files</b></summary>\n\n");
            for (i, file) in report.files.iter().enumerate() {
                comment.push_str(&format!("{}. `{}`\n", i + 1, file));
            }
            comment.push_str("\n</details>\n\n");
        }
        comment.push_str("---\n\n");
    }

    // Surgeon pass.
    match &result.surgeon {
        StageOutcome::Success(report) => {
            comment.push_str("### \u{1f52c} Pass 2: Surgeon (Deep Analysis)\n\n");
            comment.push_str(&format!("**Type**: `{}`  \n", report.issue_type));
            comment.push_str(&format!("**Severity**: `{}`  \n", report.severity));
            comment.push_str(&format!("**Confidence**: `{}%`\n\n", report.confidence));

            if !report.summary.is_empty() {
                comment.push_str("#### Summary\n\n");
                comment.push_str(&report.summary);
                comment.push_str("\n\n");
            }

            if !report.root_cause.is_empty() {
                comment.push_str("#### Root Cause\n\n");
                comment.push_str(&format!("> {}\n\n", report.root_cause));
            }

            if !report.solutions.is_empty() {
                comment.push_str("#### Proposed Solutions\n\n");
                for (i, solution) in report.solutions.iter().enumerate() {
                    comment.push_str(&format!("{}. {}\n", i + 1, solution));
                }
                comment.push('\n');
            }
        }
        StageOutcome::Skipped { reason } => {
            comment.push_str(&format!(
                "### \u{1f52c} Pass 2: Surgeon (Deep Analysis)\n\nSkipped: {reason}\n\n"
            ));
        }
        StageOutcome::Failed { .. } => {} // surfaces under partial results
    }

    // Labels.
    if let Some(labels) = result.labels.as_success() {
        if !labels.applied.is_empty() {
            comment.push_str(&format!(
                "**Labels applied**: {}\n\n",
                labels
                    .applied
                    .iter()
                    .map(|l| format!("`{l}`"))
                    .collect::<Vec<_>>()
                    .join(", ")
            ));
        }
        for (label, reason) in &labels.failed {
            comment.push_str(&format!("*Could not apply `{label}`: {reason}*\n\n"));
        }
    }

    // Soft failures.
    let errors = result.stage_errors();
    if !errors.is_empty() {
        comment.push_str("### \u{26a0}\u{fe0f} Partial Results\n\nSome stages did not complete:\n\n");
        for (stage, reason) in errors {
            comment.push_str(&format!("- **{stage}**: {reason}\n"));
        }
        comment.push('\n');
    }

    comment.push_str("---\n\n<sub>\u{1f916} *This analysis used the Two-Pass Architecture: \
                      Librarian identified relevant files, then Surgeon performed deep \
                      analysis.*</sub>");

    clamp_comment(comment)
}

/// The single error comment posted when stage 1 fails hard.
pub fn format_triage_failure(issue: IssueNumber, reason: &str) -> String {
    clamp_comment(format!(
        "\u{274c} **Issue Triage Failed**\n\nAutomated triage of {issue} could not run: \
         the repository could not be fetched.\n\n```\n{reason}\n```"
    ))
}

fn clamp_comment(comment: String) -> String {
    if comment.len() <= MAX_COMMENT_LEN {
        return comment;
    }
    let mut cut = MAX_COMMENT_LEN;
    while cut > 0 && !comment.is_char_boundary(cut) {
        cut -= 1;
    }
    format!("{}\n\n[comment truncated]", &comment[..cut])
}
