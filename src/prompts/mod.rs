//! Prompt profiles and per-repository profile selection.
//!
//! The bot carries a set of named prompt profiles (system role, review
//! structure, workflow-analysis template) and a routing table mapping
//! repositories to profiles via ordered regex patterns. Both come from a
//! single JSON resource:
//!
//! ```json
//! {
//!     "repo_mappings": {
//!         "network": ["github.com/.*/ansible.*", "github.com/netops/.*"],
//!         "frontend": ["github.com/.*/web-.*"]
//!     },
//!     "prompts": {
//!         "default": {
//!             "system_role": "...",
//!             "review_structure": "...",
//!             "workflow_analysis_template": "..."
//!         },
//!         "network": { "...": "..." }
//!     }
//! }
//! ```
//!
//! Group order and pattern order are both significant (first match wins), so
//! the document is parsed with insertion order preserved.
//!
//! The configuration is loaded once at startup into an immutable value and
//! injected into the dispatcher; orchestrators never touch ambient state. A
//! missing or malformed resource degrades to a single built-in `default`
//! profile rather than failing startup.

pub mod select;

pub use select::select_profile;

use std::collections::HashMap;
use std::path::Path;

use regex::{Regex, RegexBuilder};
use serde::Deserialize;
use thiserror::Error;
use tracing::warn;

/// The profile name that must always exist and that selection falls back to.
pub const DEFAULT_PROFILE: &str = "default";

/// A named bundle of prompt templates.
#[derive(Debug, Clone, Deserialize)]
pub struct PromptProfile {
    /// Instructions establishing the reviewer persona.
    pub system_role: String,

    /// The structure the review response should follow.
    pub review_structure: String,

    /// Template for workflow-run analysis prompts.
    pub workflow_analysis_template: String,
}

/// One routing group: a profile name plus its ordered, compiled patterns.
#[derive(Debug, Clone)]
pub struct MappingGroup {
    pub profile: String,
    pub patterns: Vec<Regex>,
}

/// The full prompt configuration: routing groups in declared order plus the
/// profile table.
#[derive(Debug, Clone)]
pub struct PromptConfig {
    groups: Vec<MappingGroup>,
    prompts: HashMap<String, PromptProfile>,
}

/// Errors from parsing the prompt configuration resource.
///
/// These never cross the component boundary in production: `load` converts
/// them into the built-in default configuration with a warning.
#[derive(Debug, Error)]
pub enum PromptConfigError {
    #[error("failed to read prompt configuration: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse prompt configuration: {0}")]
    Json(#[from] serde_json::Error),

    #[error("prompt configuration has no '{DEFAULT_PROFILE}' profile")]
    MissingDefault,
}

#[derive(Debug, Deserialize)]
struct RawPromptConfig {
    // serde_json's preserve_order feature keeps this Map in document order,
    // which first-match-wins selection depends on.
    #[serde(default)]
    repo_mappings: serde_json::Map<String, serde_json::Value>,
    prompts: HashMap<String, PromptProfile>,
}

impl PromptConfig {
    /// Loads the configuration from a file, degrading to the built-in default
    /// on any failure.
    ///
    /// `None` means no resource was configured; that is not a failure and
    /// loads the built-in default silently.
    pub fn load(path: Option<&Path>) -> PromptConfig {
        let Some(path) = path else {
            return PromptConfig::built_in_default();
        };

        match std::fs::read_to_string(path).map_err(PromptConfigError::from) {
            Ok(text) => match PromptConfig::from_json(&text) {
                Ok(config) => config,
                Err(e) => {
                    warn!(path = %path.display(), error = %e,
                        "prompt configuration invalid, using built-in default profile");
                    PromptConfig::built_in_default()
                }
            },
            Err(e) => {
                warn!(path = %path.display(), error = %e,
                    "prompt configuration unreadable, using built-in default profile");
                PromptConfig::built_in_default()
            }
        }
    }

    /// Parses the configuration from JSON text.
    ///
    /// Invalid individual regex patterns are skipped with a warning rather
    /// than failing the whole document; a missing `default` profile fails it.
    pub fn from_json(text: &str) -> Result<PromptConfig, PromptConfigError> {
        let raw: RawPromptConfig = serde_json::from_str(text)?;

        if !raw.prompts.contains_key(DEFAULT_PROFILE) {
            return Err(PromptConfigError::MissingDefault);
        }

        let mut groups = Vec::new();
        for (profile, value) in raw.repo_mappings {
            let pattern_strings: Vec<String> = serde_json::from_value(value)?;
            let mut patterns = Vec::new();
            for p in pattern_strings {
                match RegexBuilder::new(&p).case_insensitive(true).build() {
                    Ok(re) => patterns.push(re),
                    Err(e) => {
                        warn!(profile = %profile, pattern = %p, error = %e,
                            "skipping invalid repo-mapping pattern");
                    }
                }
            }
            groups.push(MappingGroup { profile, patterns });
        }

        Ok(PromptConfig {
            groups,
            prompts: raw.prompts,
        })
    }

    /// The built-in configuration: no routing groups, one default profile.
    pub fn built_in_default() -> PromptConfig {
        let default = PromptProfile {
            system_role: "You are an experienced software engineer reviewing code changes. \
                          Be specific, cite file names and lines, and focus on correctness, \
                          security, and maintainability."
                .to_string(),
            review_structure: "Structure your review as markdown with these sections:\n\
                               ## Overall Assessment\n\
                               ## Issues\n\
                               (one bullet per issue: [SEVERITY] description - location)\n\
                               ## Suggestions\n\
                               (one bullet per suggestion)"
                .to_string(),
            workflow_analysis_template: "A GitHub Actions workflow finished. Explain what \
                                         happened, why any jobs failed, and what to try next. \
                                         Be concise."
                .to_string(),
        };

        PromptConfig {
            groups: Vec::new(),
            prompts: HashMap::from([(DEFAULT_PROFILE.to_string(), default)]),
        }
    }

    /// The routing groups, in declared order.
    pub fn groups(&self) -> &[MappingGroup] {
        &self.groups
    }

    /// Looks up a profile by name, falling back to `default`.
    ///
    /// A mapping can name a profile with no `prompts` entry; selection then
    /// behaves as if no mapping had matched.
    pub fn profile(&self, name: &str) -> &PromptProfile {
        self.prompts.get(name).unwrap_or_else(|| {
            &self.prompts[DEFAULT_PROFILE] // guaranteed present by construction
        })
    }
}
