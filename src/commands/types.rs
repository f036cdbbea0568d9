//! Command and entity types for trigger classification.

use serde::{Deserialize, Serialize};
use std::fmt;

/// The kind of entity a comment was posted on.
///
/// GitHub delivers comments on both through `issue_comment` events; the
/// payload's `issue.pull_request` field is what distinguishes them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    /// A plain issue.
    Issue,
    /// A pull request.
    PullRequest,
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EntityKind::Issue => write!(f, "issue"),
            EntityKind::PullRequest => write!(f, "pull request"),
        }
    }
}

/// A recognized trigger command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TriggerCommand {
    /// `\ansieyes_prreview` - request an LLM review of a pull request.
    PrReview,
    /// `\ansieyes_triage` - run the two-pass triage pipeline on an issue.
    Triage,
}

impl TriggerCommand {
    /// The exact comment text that invokes this command.
    pub fn literal(&self) -> &'static str {
        match self {
            TriggerCommand::PrReview => "\\ansieyes_prreview",
            TriggerCommand::Triage => "\\ansieyes_triage",
        }
    }

    /// The entity kind this command is valid on.
    pub fn required_entity(&self) -> EntityKind {
        match self {
            TriggerCommand::PrReview => EntityKind::PullRequest,
            TriggerCommand::Triage => EntityKind::Issue,
        }
    }

    /// The command that is valid on the other entity kind.
    ///
    /// Used to suggest the right command in validation error comments.
    pub fn counterpart(&self) -> TriggerCommand {
        match self {
            TriggerCommand::PrReview => TriggerCommand::Triage,
            TriggerCommand::Triage => TriggerCommand::PrReview,
        }
    }

    /// All recognized commands, in a fixed order.
    pub const ALL: [TriggerCommand; 2] = [TriggerCommand::PrReview, TriggerCommand::Triage];
}

impl fmt::Display for TriggerCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.literal())
    }
}

/// The result of classifying a comment against the trigger set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommandInvocation {
    /// The recognized command, or `None` if the comment is not a trigger.
    pub command: Option<TriggerCommand>,

    /// The entity kind the comment was posted on.
    pub entity: EntityKind,

    /// Whether the recognized command is valid for `entity`.
    ///
    /// Always `false` when `command` is `None`.
    pub valid: bool,
}

impl CommandInvocation {
    /// A non-command: the comment is silently ignored.
    pub fn none(entity: EntityKind) -> Self {
        CommandInvocation {
            command: None,
            entity,
            valid: false,
        }
    }

    /// Returns the command if it was recognized and is valid for its entity.
    pub fn valid_command(&self) -> Option<TriggerCommand> {
        if self.valid { self.command } else { None }
    }

    /// Returns the command if it was recognized but posted on the wrong
    /// entity kind (the validation-error case).
    pub fn mismatched_command(&self) -> Option<TriggerCommand> {
        if self.valid { None } else { self.command }
    }
}
