//! Extraction of the JSON note array from backend text.
//!
//! Backends are asked for a bare JSON array but often wrap it in a markdown
//! code fence. Both backends share this one unwrapping routine.

use serde_json::Value;

use crate::error::{excerpt, GenerationError, GenerationResult};

const FENCE: &str = "```";

/// Removes a surrounding markdown code fence, if any.
///
/// Handles an optional language tag on the opening fence (```` ```json ````)
/// and prose before the first fenced block.
pub fn strip_code_fence(text: &str) -> &str {
    let trimmed = text.trim();
    let body = if let Some(rest) = trimmed.strip_prefix(FENCE) {
        skip_language_tag(rest)
    } else if let Some(start) = trimmed.find(FENCE) {
        // Prose followed by a fenced block: keep the first block only.
        let rest = skip_language_tag(&trimmed[start + FENCE.len()..]);
        match rest.find(FENCE) {
            Some(end) => &rest[..end],
            None => rest,
        }
    } else {
        return trimmed;
    };

    let body = body.trim_end();
    body.strip_suffix(FENCE).unwrap_or(body).trim()
}

/// Drops the language tag after an opening fence.
///
/// The tag ends at a newline, or directly at the array or object it labels
/// when the whole block sits on one line (```` ```json[...]``` ````).
fn skip_language_tag(after_fence: &str) -> &str {
    let tag_len = after_fence
        .find(|c: char| !(c.is_ascii_alphanumeric() || c == '-' || c == '_'))
        .unwrap_or(after_fence.len());
    let rest = after_fence[tag_len..].trim_start_matches([' ', '\t', '\r']);

    if let Some(body) = rest.strip_prefix('\n') {
        body
    } else if rest.starts_with(['[', '{']) {
        rest
    } else {
        after_fence
    }
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Parses the note array out of raw backend text.
///
/// Elements are returned untouched; note validation happens later.
pub fn extract_note_array(text: &str) -> GenerationResult<Vec<Value>> {
    if text.trim().is_empty() {
        return Err(GenerationError::EmptyResponse);
    }

    let body = strip_code_fence(text);
    if body.is_empty() {
        return Err(GenerationError::EmptyResponse);
    }

    match serde_json::from_str::<Value>(body) {
        Ok(Value::Array(items)) => Ok(items),
        Ok(other) => Err(GenerationError::NotAnArray {
            found: json_type_name(&other),
        }),
        Err(e) => Err(GenerationError::InvalidJson {
            message: e.to_string(),
            excerpt: excerpt(text),
        }),
    }
}
