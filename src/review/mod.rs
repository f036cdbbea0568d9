//! Pull request review and workflow-run analysis orchestration.
//!
//! Both flows share the same shape: gather context from GitHub, select a
//! prompt profile for the repository, call the LLM once, post one comment.
//! Steps run strictly sequentially; an error at any step produces a
//! user-visible error comment and terminates the flow. There is no retry at
//! this layer - the GitHub client retries transient API errors internally.

pub mod orchestrator;
pub mod parse;
pub mod types;

pub use orchestrator::{ReviewContext, ReviewError};
pub use parse::parse_review;
pub use types::{ReviewIssue, ReviewResult};
