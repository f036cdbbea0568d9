//! Repository-local triage configuration.
//!
//! Target repositories can opt into two optional files at their root:
//!
//! - `triage.config.json` - repository description and extra directories to
//!   omit from analysis
//! - `.omit-triage` - newline-delimited directory names, `#` comments
//!
//! Absence of either file is not an error; defaults apply. Malformed content
//! is logged and ignored - a broken config in someone else's repository must
//! not break their triage.

use std::collections::HashSet;

use serde::Deserialize;
use tracing::warn;

use crate::git::Checkout;

/// Directories never shown to the librarian, regardless of repo config.
pub const DEFAULT_OMIT_DIRS: [&str; 10] = [
    "node_modules",
    "target",
    "dist",
    "build",
    "vendor",
    "__pycache__",
    ".venv",
    "venv",
    ".idea",
    ".vscode",
];

/// Maximum bytes read from either config file.
const MAX_CONFIG_BYTES: usize = 64 * 1024;

/// Effective repository triage settings after merging files with defaults.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RepoTriageConfig {
    /// Free-text description of the repository, included in triage prompts.
    pub description: String,

    /// Directory names excluded from the file tree and surgeon inputs.
    pub omit: HashSet<String>,
}

#[derive(Debug, Deserialize)]
struct RawTriageConfig {
    #[serde(default)]
    repository: RawRepositorySection,
    #[serde(default)]
    omit_directories: Vec<String>,
}

#[derive(Debug, Default, Deserialize)]
struct RawRepositorySection {
    #[serde(default)]
    description: String,
}

impl RepoTriageConfig {
    /// The defaults used when the repository carries no configuration.
    pub fn defaults() -> RepoTriageConfig {
        RepoTriageConfig {
            description: String::new(),
            omit: DEFAULT_OMIT_DIRS.iter().map(|s| s.to_string()).collect(),
        }
    }

    /// Loads configuration from a checkout, merging with defaults.
    pub fn load(checkout: &Checkout) -> RepoTriageConfig {
        let mut config = RepoTriageConfig::defaults();

        match checkout.read_file_capped("triage.config.json", MAX_CONFIG_BYTES) {
            Ok(Some(text)) => match serde_json::from_str::<RawTriageConfig>(&text) {
                Ok(raw) => {
                    config.description = raw.repository.description;
                    config.omit.extend(raw.omit_directories);
                }
                Err(e) => {
                    warn!(error = %e, "malformed triage.config.json, using defaults");
                }
            },
            Ok(None) => {}
            Err(e) => {
                warn!(error = %e, "could not read triage.config.json, using defaults");
            }
        }

        match checkout.read_file_capped(".omit-triage", MAX_CONFIG_BYTES) {
            Ok(Some(text)) => {
                config.omit.extend(parse_omit_list(&text));
            }
            Ok(None) => {}
            Err(e) => {
                warn!(error = %e, "could not read .omit-triage, ignoring");
            }
        }

        config
    }
}

/// Parses the `.omit-triage` format: one directory name per line, blank
/// lines and `#`-prefixed comments ignored.
fn parse_omit_list(text: &str) -> impl Iterator<Item = String> + '_ {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(|line| line.trim_end_matches('/').to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::init_git_fixture;
    use std::time::Duration;

    async fn checkout_with(files: &[(&str, &str)]) -> Checkout {
        let dir = tempfile::tempdir().unwrap();
        init_git_fixture(dir.path(), files);
        Checkout::clone_shallow(dir.path().to_str().unwrap(), Duration::from_secs(30))
            .await
            .unwrap()
    }

    #[test]
    fn defaults_include_standard_ignores() {
        let config = RepoTriageConfig::defaults();
        assert!(config.description.is_empty());
        assert!(config.omit.contains("node_modules"));
        assert!(config.omit.contains("target"));
        assert!(config.omit.contains("__pycache__"));
    }

    #[test]
    fn omit_list_parsing_skips_comments_and_blanks() {
        let parsed: Vec<String> =
            parse_omit_list("# generated dirs\nlogs\n\n  cache/  \n# more\nassets").collect();
        assert_eq!(parsed, vec!["logs", "cache", "assets"]);
    }

    #[tokio::test]
    async fn missing_files_fall_back_to_defaults() {
        let checkout = checkout_with(&[("README.md", "hi")]).await;
        let config = RepoTriageConfig::load(&checkout);
        assert_eq!(config, RepoTriageConfig::defaults());
    }

    #[tokio::test]
    async fn triage_config_json_is_merged() {
        let checkout = checkout_with(&[(
            "triage.config.json",
            r#"{
                "repository": {
                    "url": "https://github.com/org/repo",
                    "description": "A storage engine"
                },
                "omit_directories": ["fixtures", "bench-data"]
            }"#,
        )])
        .await;

        let config = RepoTriageConfig::load(&checkout);
        assert_eq!(config.description, "A storage engine");
        assert!(config.omit.contains("fixtures"));
        assert!(config.omit.contains("bench-data"));
        // Defaults are kept, not replaced
        assert!(config.omit.contains("node_modules"));
    }

    #[tokio::test]
    async fn omit_triage_file_extends_the_set() {
        let checkout = checkout_with(&[(".omit-triage", "# skip these\nlogs\ndata/")]).await;

        let config = RepoTriageConfig::load(&checkout);
        assert!(config.omit.contains("logs"));
        assert!(config.omit.contains("data"));
    }

    #[tokio::test]
    async fn malformed_config_json_uses_defaults() {
        let checkout = checkout_with(&[("triage.config.json", "{ not json")]).await;

        let config = RepoTriageConfig::load(&checkout);
        assert_eq!(config, RepoTriageConfig::defaults());
    }
}
