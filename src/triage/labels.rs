//! Label derivation from triage stage outcomes.
//!
//! The label set is a pure function of the stage outcomes, which keeps the
//! invariants testable without a pipeline run:
//!
//! - `ai-triaged` is always present (stage 1 succeeded if we got here)
//! - `duplicate` iff the top duplicate score reached the threshold
//! - type and severity labels iff the surgeon produced a classification
//! - `Prompt injection blocked` iff the guard fired

use crate::github::LabelSpec;

use super::result::SurgeonReport;

/// The label every triaged issue receives.
pub const TRIAGED_LABEL: &str = "ai-triaged";

/// The label for high-confidence duplicates.
pub const DUPLICATE_LABEL: &str = "duplicate";

/// The label applied when the injection guard blocks the surgeon pass.
pub const INJECTION_LABEL: &str = "Prompt injection blocked";

/// Fixed color for a label name (hex, no `#`), used when creating missing
/// labels. Unknown names get a neutral gray.
fn label_color(name: &str) -> &'static str {
    match name {
        TRIAGED_LABEL => "ededed",
        DUPLICATE_LABEL => "cfd3d7",
        INJECTION_LABEL => "e99695",
        "bug" => "d73a4a",
        "enhancement" => "a2eeef",
        "feature-request" => "0075ca",
        "severity:critical" => "b60205",
        "severity:high" => "d93f0b",
        "severity:medium" => "fbca04",
        "severity:low" => "0e8a16",
        _ => "ededed",
    }
}

fn label_description(name: &str) -> &'static str {
    match name {
        TRIAGED_LABEL => "Triaged automatically by the Ansieyes bot",
        DUPLICATE_LABEL => "Likely duplicate of an existing issue",
        INJECTION_LABEL => "Automated analysis was blocked by suspected prompt injection",
        _ => "",
    }
}

fn spec(name: &str) -> LabelSpec {
    LabelSpec {
        name: name.to_string(),
        color: label_color(name).to_string(),
        description: label_description(name).to_string(),
    }
}

/// Derives the labels to apply from stage outcomes, in application order.
pub fn derive_labels(
    duplicate_confident: bool,
    surgeon: Option<&SurgeonReport>,
    injection_blocked: bool,
) -> Vec<LabelSpec> {
    let mut labels = vec![spec(TRIAGED_LABEL)];

    if duplicate_confident {
        labels.push(spec(DUPLICATE_LABEL));
    }

    if let Some(report) = surgeon {
        labels.push(spec(report.issue_type.label()));
        labels.push(spec(report.severity.label()));
    }

    if injection_blocked {
        labels.push(spec(INJECTION_LABEL));
    }

    labels
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::triage::result::{IssueType, Severity};

    fn surgeon(issue_type: IssueType, severity: Severity) -> SurgeonReport {
        SurgeonReport {
            issue_type,
            severity,
            confidence: 80,
            summary: String::new(),
            root_cause: String::new(),
            solutions: vec![],
        }
    }

    fn names(labels: &[LabelSpec]) -> Vec<&str> {
        labels.iter().map(|l| l.name.as_str()).collect()
    }

    #[test]
    fn triaged_label_is_always_present() {
        let labels = derive_labels(false, None, false);
        assert_eq!(names(&labels), vec![TRIAGED_LABEL]);
    }

    #[test]
    fn duplicate_label_tracks_threshold_outcome() {
        assert!(names(&derive_labels(true, None, false)).contains(&DUPLICATE_LABEL));
        assert!(!names(&derive_labels(false, None, false)).contains(&DUPLICATE_LABEL));
    }

    #[test]
    fn surgeon_outcome_adds_type_and_severity() {
        let report = surgeon(IssueType::Bug, Severity::High);
        let labels = derive_labels(false, Some(&report), false);
        assert_eq!(names(&labels), vec![TRIAGED_LABEL, "bug", "severity:high"]);
    }

    #[test]
    fn injection_block_adds_its_label() {
        let labels = derive_labels(false, None, true);
        assert!(names(&labels).contains(&INJECTION_LABEL));
    }

    #[test]
    fn full_house() {
        let report = surgeon(IssueType::FeatureRequest, Severity::Low);
        let labels = derive_labels(true, Some(&report), true);
        assert_eq!(
            names(&labels),
            vec![
                TRIAGED_LABEL,
                DUPLICATE_LABEL,
                "feature-request",
                "severity:low",
                INJECTION_LABEL
            ]
        );
    }

    #[test]
    fn known_labels_have_fixed_colors() {
        for labels in [
            derive_labels(true, Some(&surgeon(IssueType::Bug, Severity::Critical)), true),
        ] {
            for label in labels {
                assert_eq!(label.color.len(), 6, "color for {}", label.name);
                assert!(label.color.chars().all(|c| c.is_ascii_hexdigit()));
            }
        }
    }
}
