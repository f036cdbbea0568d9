//! Best-effort parsing of LLM review text into a [`ReviewResult`].
//!
//! The model is asked to follow a known section layout (Overall Assessment /
//! Issues / Suggestions), but LLM output drifts. The parser recognizes what
//! it can and keeps the raw text; when nothing is recognized, the raw text is
//! what gets posted. Parsing never fails and never discards content.

use super::types::{ReviewIssue, ReviewResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Section {
    Assessment,
    Issues,
    Suggestions,
    Other,
}

/// Classifies a markdown header line into a known section.
fn classify_header(line: &str) -> Option<Section> {
    let stripped = line.trim_start_matches('#').trim().to_lowercase();
    if stripped.is_empty() {
        return None;
    }

    if stripped.contains("overall assessment") || stripped == "assessment" || stripped == "summary"
    {
        Some(Section::Assessment)
    } else if stripped.starts_with("issue")
        || stripped.contains("issues found")
        || stripped.starts_with("problem")
        || stripped.starts_with("concern")
    {
        Some(Section::Issues)
    } else if stripped.starts_with("suggestion") || stripped.starts_with("recommendation") {
        Some(Section::Suggestions)
    } else {
        Some(Section::Other)
    }
}

/// Strips a list-item marker (`- `, `* `, `1. `) from a line, if present.
fn strip_list_marker(line: &str) -> Option<&str> {
    let trimmed = line.trim_start();
    if let Some(rest) = trimmed.strip_prefix("- ").or_else(|| trimmed.strip_prefix("* ")) {
        return Some(rest.trim());
    }
    // Numbered items: "1. text"
    let digits = trimmed.chars().take_while(|c| c.is_ascii_digit()).count();
    if digits > 0 {
        if let Some(rest) = trimmed[digits..].strip_prefix(". ") {
            return Some(rest.trim());
        }
    }
    None
}

const SEVERITY_KEYWORDS: [&str; 5] = ["critical", "high", "medium", "low", "info"];

/// Parses one issue bullet: optional `[SEVERITY]` or `**SEVERITY**` prefix,
/// description, optional ` - location` tail.
fn parse_issue_item(item: &str) -> ReviewIssue {
    let mut rest = item.trim();
    let mut severity = String::from("unspecified");

    if let Some(after) = rest.strip_prefix('[') {
        if let Some(end) = after.find(']') {
            let candidate = after[..end].trim().to_lowercase();
            if SEVERITY_KEYWORDS.contains(&candidate.as_str()) {
                severity = candidate;
                rest = after[end + 1..].trim_start_matches([':', '-', ' ']);
            }
        }
    } else if let Some(after) = rest.strip_prefix("**") {
        if let Some(end) = after.find("**") {
            let candidate = after[..end].trim().to_lowercase();
            if SEVERITY_KEYWORDS.contains(&candidate.as_str()) {
                severity = candidate;
                rest = after[end + 2..].trim_start_matches([':', '-', ' ']);
            }
        }
    }

    // A trailing " - <tail>" that looks like a code location (path or
    // file:line) is split off as the location.
    let (description, location) = match rest.rsplit_once(" - ") {
        Some((desc, tail))
            if !tail.trim().is_empty()
                && (tail.contains('/') || tail.contains(':') || tail.contains('.'))
                && !tail.trim().contains(' ') =>
        {
            (desc.trim().to_string(), Some(tail.trim().to_string()))
        }
        _ => (rest.trim().to_string(), None),
    };

    ReviewIssue {
        severity,
        description,
        location,
    }
}

/// Parses LLM review text into a [`ReviewResult`].
///
/// `files_reviewed` is supplied by the orchestrator - it reflects what went
/// into the prompt, not what the model claims to have read.
pub fn parse_review(text: &str, files_reviewed: Vec<String>) -> ReviewResult {
    let mut section = Section::Other;
    let mut assessment_lines: Vec<&str> = Vec::new();
    let mut issues = Vec::new();
    let mut suggestions = Vec::new();

    for line in text.lines() {
        if line.trim_start().starts_with('#') {
            if let Some(s) = classify_header(line) {
                section = s;
                continue;
            }
        }

        match section {
            Section::Assessment => assessment_lines.push(line),
            Section::Issues => {
                if let Some(item) = strip_list_marker(line) {
                    if !item.is_empty() {
                        issues.push(parse_issue_item(item));
                    }
                }
            }
            Section::Suggestions => {
                if let Some(item) = strip_list_marker(line) {
                    if !item.is_empty() {
                        suggestions.push(item.to_string());
                    }
                }
            }
            Section::Other => {}
        }
    }

    ReviewResult {
        files_reviewed,
        overall_assessment: assessment_lines.join("\n").trim().to_string(),
        issues,
        suggestions,
        raw: text.to_string(),
    }
}
