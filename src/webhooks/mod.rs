//! Webhook handling for GitHub events.
//!
//! This module provides:
//! - Signature verification for webhook payloads (HMAC-SHA256)
//! - Typed event representations for the events the bot acts on
//! - Parsing of raw payloads into those events

pub mod events;
pub mod parser;
pub mod signature;

pub use events::{
    CommentAction, IssueCommentEvent, PrAction, PullRequestEvent, WebhookEvent, WorkflowRunEvent,
};
pub use parser::{ParseError, parse_webhook};
pub use signature::{
    compute_signature, format_signature_header, parse_signature_header, verify_signature,
};
