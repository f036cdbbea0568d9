//! Core domain types.

pub mod ids;

pub use ids::{CommentId, DeliveryId, InstallationId, IssueNumber, PrNumber, RepoId, RunId};
