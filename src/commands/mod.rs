//! Trigger commands parsed from issue/PR comments.
//!
//! The bot recognizes exactly two commands, each tied to one entity kind:
//!
//! | Command | Valid on |
//! |---------|----------|
//! | `\ansieyes_prreview` | pull requests |
//! | `\ansieyes_triage` | issues |
//!
//! Matching is deliberately strict: the whole comment, after trimming
//! whitespace, must equal the command literal, case-sensitively. A comment
//! that merely contains a command is not a command.

pub mod classifier;
pub mod types;

pub use classifier::{classify, validation_error_comment};
pub use types::{CommandInvocation, EntityKind, TriggerCommand};
