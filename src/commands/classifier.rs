//! Classifier for trigger commands in comment text.
//!
//! A pure function from (comment body, entity kind) to a [`CommandInvocation`].

use super::types::{CommandInvocation, EntityKind, TriggerCommand};

/// Classifies a comment body against the fixed trigger set.
///
/// # Matching Rules
///
/// - The body is trimmed of leading/trailing whitespace, then compared by
///   exact string equality against each command literal
/// - Matching is case-sensitive; `\Ansieyes_Triage` is not a command
/// - No substring or prefix matching: `\ansieyes_triage please` is not a
///   command, and neither is a comment containing two command literals
/// - A non-matching comment yields `command: None` and is ignored silently
///
/// When a command is recognized but the entity kind doesn't match its
/// required kind, `valid` is `false` and the caller posts a validation error
/// (see [`validation_error_comment`]).
///
/// # Examples
///
/// ```
/// use ansieyes::commands::{classify, EntityKind, TriggerCommand};
///
/// let inv = classify("\\ansieyes_triage", EntityKind::Issue);
/// assert_eq!(inv.command, Some(TriggerCommand::Triage));
/// assert!(inv.valid);
///
/// // Extra words defeat the match entirely
/// let inv = classify("\\ansieyes_triage please", EntityKind::Issue);
/// assert_eq!(inv.command, None);
///
/// // Right command, wrong entity
/// let inv = classify("\\ansieyes_triage", EntityKind::PullRequest);
/// assert_eq!(inv.command, Some(TriggerCommand::Triage));
/// assert!(!inv.valid);
/// ```
pub fn classify(body: &str, entity: EntityKind) -> CommandInvocation {
    let trimmed = body.trim();

    let Some(command) = TriggerCommand::ALL
        .into_iter()
        .find(|cmd| trimmed == cmd.literal())
    else {
        return CommandInvocation::none(entity);
    };

    CommandInvocation {
        command: Some(command),
        entity,
        valid: command.required_entity() == entity,
    }
}

/// The fixed-format comment posted when a command is used on the wrong
/// entity kind.
///
/// Names the offending command and the one that would work here.
pub fn validation_error_comment(command: TriggerCommand, entity: EntityKind) -> String {
    let correct = command.counterpart();
    format!(
        "`{}` only works on {}s. On this {}, use `{}` instead.",
        command.literal(),
        match command.required_entity() {
            EntityKind::Issue => "issue",
            EntityKind::PullRequest => "pull request",
        },
        entity,
        correct.literal(),
    )
}
