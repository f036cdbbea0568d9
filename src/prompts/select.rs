//! Per-repository prompt profile selection.
//!
//! A pure function over the routing table; the orchestrators never embed
//! matching logic themselves.

use tracing::{debug, info};

use super::{DEFAULT_PROFILE, PromptConfig};

/// Selects the prompt profile for a repository identifier.
///
/// Iterates routing groups in declared order, and within each group its
/// patterns in listed order; the first pattern whose (case-insensitive)
/// regex search matches `repo_ident` wins. No match selects `"default"`.
///
/// The identifier is the `github.com/<owner>/<repo>` form (see
/// [`crate::types::RepoId::web_ident`]).
///
/// Selection is deterministic: the same identifier and configuration always
/// produce the same profile name. The match (or its absence) is logged for
/// operators; nothing internal consumes the log.
pub fn select_profile<'a>(repo_ident: &str, config: &'a PromptConfig) -> &'a str {
    for group in config.groups() {
        for pattern in &group.patterns {
            if pattern.is_match(repo_ident) {
                info!(
                    repo = %repo_ident,
                    profile = %group.profile,
                    pattern = %pattern.as_str(),
                    "prompt profile matched"
                );
                return &group.profile;
            }
        }
    }

    debug!(repo = %repo_ident, "no prompt profile matched, using default");
    DEFAULT_PROFILE
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn config(json: &str) -> PromptConfig {
        PromptConfig::from_json(json).unwrap()
    }

    fn with_mappings(mappings: &str) -> PromptConfig {
        config(&format!(
            r#"{{
                "repo_mappings": {mappings},
                "prompts": {{
                    "default": {{
                        "system_role": "r",
                        "review_structure": "s",
                        "workflow_analysis_template": "w"
                    }}
                }}
            }}"#
        ))
    }

    #[test]
    fn ansible_repo_selects_network_profile() {
        let config = with_mappings(r#"{ "network": ["github.com/.*/ansible.*"] }"#);
        assert_eq!(
            select_profile("github.com/org/ansible-playbooks", &config),
            "network"
        );
    }

    #[test]
    fn no_match_selects_default() {
        let config = with_mappings(r#"{ "network": ["github.com/.*/ansible.*"] }"#);
        assert_eq!(select_profile("github.com/org/web-app", &config), "default");
    }

    #[test]
    fn empty_mappings_select_default() {
        let config = with_mappings("{}");
        assert_eq!(select_profile("github.com/org/anything", &config), "default");
    }

    #[test]
    fn matching_is_case_insensitive() {
        let config = with_mappings(r#"{ "network": ["github.com/.*/ansible.*"] }"#);
        assert_eq!(
            select_profile("github.com/Org/Ansible-Playbooks", &config),
            "network"
        );
    }

    #[test]
    fn match_is_a_search_not_a_full_match() {
        let config = with_mappings(r#"{ "network": ["ansible"] }"#);
        assert_eq!(
            select_profile("github.com/org/my-ansible-roles", &config),
            "network"
        );
    }

    #[test]
    fn first_group_wins_when_multiple_match() {
        let config = with_mappings(
            r#"{
                "network": ["github.com/infra/.*"],
                "frontend": ["github.com/infra/web-.*"]
            }"#,
        );
        // Both groups match; declared order decides
        assert_eq!(
            select_profile("github.com/infra/web-console", &config),
            "network"
        );
    }

    #[test]
    fn first_pattern_within_group_wins() {
        let config = with_mappings(r#"{ "network": ["nomatch-.*", "github.com/net/.*"] }"#);
        assert_eq!(select_profile("github.com/net/switch", &config), "network");
    }

    proptest! {
        /// Selection is deterministic.
        #[test]
        fn prop_deterministic(ident in "[a-z0-9./_-]{0,60}") {
            let config = with_mappings(
                r#"{ "network": ["ansible", "net"], "frontend": ["web"] }"#,
            );
            let first = select_profile(&ident, &config).to_string();
            let second = select_profile(&ident, &config).to_string();
            prop_assert_eq!(first, second);
        }

        /// The result is always either a mapped profile name or "default".
        #[test]
        fn prop_result_is_known_name(ident in "\\PC{0,60}") {
            let config = with_mappings(r#"{ "network": ["ansible"] }"#);
            let selected = select_profile(&ident, &config);
            prop_assert!(selected == "network" || selected == "default");
        }
    }
}
