//! Shallow repository checkouts for the triage pipeline.
//!
//! Triage needs a local copy of the target repository: the repo-local config
//! files, a condensed file tree for the librarian pass, and file contents for
//! the surgeon pass. A depth-1 clone into a temp directory covers all three;
//! the directory is removed when the [`Checkout`] is dropped.
//!
//! Clone failure is the pipeline's only fail-hard condition, so errors here
//! carry enough context to build the single error comment.

use std::collections::HashSet;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::time::Duration;

use tempfile::TempDir;
use thiserror::Error;
use tracing::{debug, warn};

/// Errors from checkout operations.
#[derive(Debug, Error)]
pub enum GitError {
    /// Git command exited nonzero.
    #[error("git command failed: {command}\nstderr: {stderr}")]
    CommandFailed { command: String, stderr: String },

    /// Git command did not finish within the allotted time.
    #[error("git command timed out after {seconds}s: {command}")]
    Timeout { command: String, seconds: u64 },

    /// IO error (tempdir creation, file reads).
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// A shallow clone of a repository in a temp directory.
///
/// The directory lives as long as this value; dropping it deletes the clone.
#[derive(Debug)]
pub struct Checkout {
    dir: TempDir,
}

impl Checkout {
    /// Shallow-clones `url` into a fresh temp directory.
    ///
    /// The clone is depth-1 and single-branch: triage only reads the default
    /// branch's tip. A timeout bounds the clone so an unreachable remote
    /// surfaces as an error rather than a hang.
    pub async fn clone_shallow(url: &str, timeout: Duration) -> Result<Checkout, GitError> {
        let dir = TempDir::new()?;
        let target = dir.path().join("repo");

        let command = format!("git clone --depth 1 {url}");
        debug!(url = %url, "cloning repository");

        let child = tokio::process::Command::new("git")
            .arg("clone")
            .arg("--depth")
            .arg("1")
            .arg("--single-branch")
            .arg(url)
            .arg(&target)
            .output();

        let output = match tokio::time::timeout(timeout, child).await {
            Ok(result) => result?,
            Err(_) => {
                return Err(GitError::Timeout {
                    command,
                    seconds: timeout.as_secs(),
                });
            }
        };

        if !output.status.success() {
            return Err(GitError::CommandFailed {
                command,
                stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
            });
        }

        Ok(Checkout { dir })
    }

    /// The root of the cloned working tree.
    pub fn path(&self) -> PathBuf {
        self.dir.path().join("repo")
    }

    /// Reads a file relative to the checkout root, capped at `max_bytes`.
    ///
    /// Returns `Ok(None)` if the file doesn't exist. Content beyond the cap
    /// is dropped; non-UTF-8 bytes are replaced.
    pub fn read_file_capped(
        &self,
        relative: &str,
        max_bytes: usize,
    ) -> Result<Option<String>, GitError> {
        let path = self.path().join(relative);
        if !path.is_file() {
            return Ok(None);
        }

        let mut file = std::fs::File::open(&path)?;
        let mut buf = Vec::with_capacity(max_bytes.min(64 * 1024));
        file.by_ref().take(max_bytes as u64).read_to_end(&mut buf)?;

        Ok(Some(String::from_utf8_lossy(&buf).into_owned()))
    }

    /// Walks the working tree and returns relative file paths, sorted.
    ///
    /// Directories whose name is in `omit` (or starts with `.`) are skipped
    /// entirely. The walk stops once `max_entries` paths are collected; the
    /// librarian pass works from a condensed tree, not an exhaustive one.
    pub fn file_tree(&self, omit: &HashSet<String>, max_entries: usize) -> Vec<String> {
        let root = self.path();
        let mut paths = Vec::new();
        collect_files(&root, &root, omit, max_entries, &mut paths);
        paths.sort();
        paths
    }
}

fn collect_files(
    root: &Path,
    dir: &Path,
    omit: &HashSet<String>,
    max_entries: usize,
    paths: &mut Vec<String>,
) {
    if paths.len() >= max_entries {
        return;
    }

    let entries = match std::fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) => {
            warn!(dir = %dir.display(), error = %e, "skipping unreadable directory");
            return;
        }
    };

    let mut sorted: Vec<_> = entries.flatten().collect();
    sorted.sort_by_key(|e| e.file_name());

    for entry in sorted {
        if paths.len() >= max_entries {
            return;
        }

        let name = entry.file_name().to_string_lossy().into_owned();
        let path = entry.path();

        if path.is_dir() {
            if name.starts_with('.') || omit.contains(&name) {
                continue;
            }
            collect_files(root, &path, omit, max_entries, paths);
        } else if let Ok(relative) = path.strip_prefix(root) {
            paths.push(relative.to_string_lossy().replace('\\', "/"));
        }
    }
}
