//! Language model collaborator.
//!
//! The bot consumes exactly one LLM operation: `generate(prompt) -> text`,
//! synchronous from the caller's point of view, no streaming. The trait keeps
//! orchestrators testable with scripted fakes; production uses the Gemini
//! client in [`gemini`].

pub mod gemini;

pub use gemini::GeminiClient;

use async_trait::async_trait;
use thiserror::Error;

/// Errors from the LLM collaborator.
#[derive(Debug, Error)]
pub enum LlmError {
    /// The HTTP request failed (includes client-side timeouts).
    #[error("LLM request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The API returned a non-success status.
    #[error("LLM API error (HTTP {status}): {message}")]
    Api { status: u16, message: String },

    /// The API answered successfully but returned no usable text.
    #[error("LLM returned an empty response")]
    EmptyResponse,
}

/// The single LLM operation this bot consumes.
#[async_trait]
pub trait LanguageModel: Send + Sync {
    /// Generates a text completion for the prompt.
    async fn generate(&self, prompt: &str) -> Result<String, LlmError>;
}

/// Extracts the JSON document from an LLM response.
///
/// Models routinely wrap JSON in markdown fences or surround it with prose;
/// this finds the first balanced `{...}` or `[...]` span. Parsing the span is
/// the caller's job - this only locates it.
pub fn extract_json(text: &str) -> Option<&str> {
    let start = text.find(['{', '['])?;
    let open = text.as_bytes()[start];
    let close = if open == b'{' { b'}' } else { b']' };

    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (i, b) in text.bytes().enumerate().skip(start) {
        if in_string {
            if escaped {
                escaped = false;
            } else if b == b'\\' {
                escaped = true;
            } else if b == b'"' {
                in_string = false;
            }
            continue;
        }
        match b {
            b'"' => in_string = true,
            _ if b == open => depth += 1,
            _ if b == close => {
                depth -= 1;
                if depth == 0 {
                    return Some(&text[start..=i]);
                }
            }
            _ => {}
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extract_bare_object() {
        assert_eq!(extract_json(r#"{"a": 1}"#), Some(r#"{"a": 1}"#));
    }

    #[test]
    fn extract_fenced_object() {
        let text = "Here is the result:\n```json\n{\"a\": 1}\n```\nHope that helps!";
        assert_eq!(extract_json(text), Some(r#"{"a": 1}"#));
    }

    #[test]
    fn extract_array_with_prose() {
        let text = "The scores are [1, 2, 3] as requested.";
        assert_eq!(extract_json(text), Some("[1, 2, 3]"));
    }

    #[test]
    fn extract_nested_object() {
        let text = r#"{"outer": {"inner": [1, {"deep": true}]}}"#;
        assert_eq!(extract_json(text), Some(text));
    }

    #[test]
    fn braces_inside_strings_are_ignored() {
        let text = r#"{"msg": "use {braces} and \"quotes\" freely"}"#;
        assert_eq!(extract_json(text), Some(text));
    }

    #[test]
    fn no_json_returns_none() {
        assert_eq!(extract_json("no structured data here"), None);
        assert_eq!(extract_json(""), None);
    }

    #[test]
    fn unbalanced_json_returns_none() {
        assert_eq!(extract_json(r#"{"a": 1"#), None);
    }
}
