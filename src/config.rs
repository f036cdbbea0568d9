//! Environment-driven configuration.
//!
//! Everything tunable flows from [`AppConfig::from_env`] at startup into an
//! immutable value passed to the dispatcher; no code reads the environment
//! after boot. The bounds in [`Limits`] keep prompts inside model context
//! windows and keep external calls from hanging a delivery indefinitely.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

/// The service name reported by the health endpoint.
pub const SERVICE_NAME: &str = "ansieyes";

/// Bounds and timeouts for orchestration.
#[derive(Debug, Clone)]
pub struct Limits {
    /// Maximum changed files included in a review prompt; the rest are
    /// listed as omitted.
    pub max_review_files: usize,

    /// Maximum bytes of a single file's diff included in a review prompt.
    pub max_patch_bytes: usize,

    /// Maximum files the librarian pass may select.
    pub max_librarian_files: usize,

    /// Maximum entries in the condensed file tree shown to the librarian.
    pub max_tree_entries: usize,

    /// Maximum bytes of one source file fed to the surgeon pass.
    pub max_source_file_bytes: usize,

    /// How many recent open issues the duplicate check compares against.
    pub duplicate_window: usize,

    /// Issues not updated within this many days are excluded from the
    /// duplicate window.
    pub duplicate_max_age_days: i64,

    /// Similarity score (0.0-1.0) at or above which the top candidate is
    /// surfaced as a duplicate and the `duplicate` label applied.
    pub duplicate_threshold: f64,

    /// Timeout for the shallow clone in triage stage 1.
    pub clone_timeout: Duration,

    /// Per-request timeout for LLM calls.
    pub llm_timeout: Duration,
}

impl Default for Limits {
    fn default() -> Self {
        Limits {
            max_review_files: 25,
            max_patch_bytes: 16 * 1024,
            max_librarian_files: 10,
            max_tree_entries: 400,
            max_source_file_bytes: 24 * 1024,
            duplicate_window: 30,
            duplicate_max_age_days: 90,
            duplicate_threshold: 0.85,
            clone_timeout: Duration::from_secs(300),
            llm_timeout: Duration::from_secs(300),
        }
    }
}

/// Errors from configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("required environment variable {0} is not set")]
    MissingVar(&'static str),

    #[error("invalid value for {var}: {value}")]
    InvalidVar { var: &'static str, value: String },
}

/// The bot's startup configuration.
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Address the HTTP server binds to.
    pub bind_addr: SocketAddr,

    /// Webhook shared secret. Empty means signature verification is skipped
    /// (with a startup warning) - useful for local development only.
    pub webhook_secret: String,

    /// GitHub API token.
    pub github_token: String,

    /// Gemini API key.
    pub gemini_api_key: String,

    /// Gemini model name.
    pub gemini_model: String,

    /// Path to the prompt-profile JSON resource, if configured.
    pub prompts_path: Option<PathBuf>,

    /// Base for repository clone URLs. Production: `https://github.com`.
    pub clone_base: String,

    /// Orchestration bounds.
    pub limits: Limits,
}

impl AppConfig {
    /// Loads configuration from the environment.
    ///
    /// | Variable | Default |
    /// |----------|---------|
    /// | `HOST` | `0.0.0.0` |
    /// | `PORT` | `3000` |
    /// | `GITHUB_WEBHOOK_SECRET` | empty (verification skipped) |
    /// | `GITHUB_TOKEN` | required |
    /// | `GEMINI_API_KEY` | required |
    /// | `GEMINI_MODEL` | `gemini-1.5-pro` |
    /// | `PROMPTS_CONFIG_PATH` | unset (built-in default profile) |
    /// | `GITHUB_CLONE_BASE` | `https://github.com` |
    pub fn from_env() -> Result<AppConfig, ConfigError> {
        let host = env_or("HOST", "0.0.0.0");
        let port = env_or("PORT", "3000");
        let bind_addr: SocketAddr = format!("{host}:{port}").parse().map_err(|_| {
            ConfigError::InvalidVar {
                var: "HOST/PORT",
                value: format!("{host}:{port}"),
            }
        })?;

        Ok(AppConfig {
            bind_addr,
            webhook_secret: env_or("GITHUB_WEBHOOK_SECRET", ""),
            github_token: required("GITHUB_TOKEN")?,
            gemini_api_key: required("GEMINI_API_KEY")?,
            gemini_model: env_or("GEMINI_MODEL", "gemini-1.5-pro"),
            prompts_path: std::env::var("PROMPTS_CONFIG_PATH").ok().map(PathBuf::from),
            clone_base: env_or("GITHUB_CLONE_BASE", "https://github.com"),
            limits: Limits::default(),
        })
    }
}

fn env_or(var: &str, default: &str) -> String {
    std::env::var(var).unwrap_or_else(|_| default.to_string())
}

fn required(var: &'static str) -> Result<String, ConfigError> {
    match std::env::var(var) {
        Ok(value) if !value.is_empty() => Ok(value),
        _ => Err(ConfigError::MissingVar(var)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_limits_are_sane() {
        let limits = Limits::default();
        assert!(limits.max_review_files > 0);
        assert!(limits.max_librarian_files > 0);
        assert!(limits.duplicate_threshold > 0.0 && limits.duplicate_threshold <= 1.0);
        assert!(limits.clone_timeout > Duration::ZERO);
    }
}
