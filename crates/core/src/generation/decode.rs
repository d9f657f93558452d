//! # Structured Response Decoder
//!
//! Backends answer in free text that usually, but not always, is bare JSON.
//! The decoder isolates the first balanced top-level JSON token of the
//! expected type, parses it, and checks it against the schema.

use super::schema::{JsonShape, SchemaDescriptor};
use crate::error::GenerationError;
use serde_json::Value;

/// Extract the JSON value of the given shape embedded in `raw`.
///
/// Top-level candidates are tried in order of their opening delimiter; the
/// first one that is balanced and parses wins. Openings nested inside a
/// rejected candidate are never tried on their own. When no balanced
/// candidate parses, the span from the first opening to the last closing
/// delimiter is tried.
pub fn extract_json(raw: &str, shape: JsonShape) -> Result<Value, GenerationError> {
    let open = shape.open();
    let close = shape.close();

    let first = raw.find(open).ok_or_else(|| GenerationError::Extraction {
        expected: shape.as_str().to_string(),
        message: format!("no '{}' in response", open),
    })?;

    let mut resume_at = 0;
    for (start, _) in raw.match_indices(open) {
        if start < resume_at {
            continue;
        }
        match scan_token(raw, start) {
            TokenScan::Balanced(end) => {
                if let Ok(value) = serde_json::from_str::<Value>(&raw[start..=end]) {
                    if shape.matches(&value) {
                        return Ok(value);
                    }
                }
                resume_at = end + 1;
            }
            TokenScan::Mismatched(at) => resume_at = at + 1,
            TokenScan::Unterminated => break,
        }
    }

    let last = raw
        .rfind(close)
        .filter(|last| *last > first)
        .ok_or_else(|| GenerationError::Extraction {
            expected: shape.as_str().to_string(),
            message: format!("no closing '{}' after position {}", close, first),
        })?;

    serde_json::from_str::<Value>(&raw[first..=last])
        .ok()
        .filter(|value| shape.matches(value))
        .ok_or_else(|| GenerationError::Extraction {
            expected: shape.as_str().to_string(),
            message: "candidate span is not valid JSON".to_string(),
        })
}

/// Extract and validate a response against `schema`.
pub fn decode_structured(raw: &str, schema: &SchemaDescriptor) -> Result<Value, GenerationError> {
    let value = extract_json(raw, schema.expected_shape())?;
    validate(&value, schema)?;
    Ok(value)
}

/// Check the required top-level keys of an object response.
pub fn validate(value: &Value, schema: &SchemaDescriptor) -> Result<(), GenerationError> {
    if !schema.expected_shape().matches(value) {
        return Err(GenerationError::SchemaMismatch {
            schema: schema.name().to_string(),
            message: format!("expected a JSON {}", schema.expected_shape().as_str()),
        });
    }

    if let Some(object) = value.as_object() {
        let missing: Vec<&str> = schema
            .required_keys()
            .into_iter()
            .filter(|key| !object.contains_key(*key))
            .collect();
        if !missing.is_empty() {
            return Err(GenerationError::SchemaMismatch {
                schema: schema.name().to_string(),
                message: format!("missing required keys: {}", missing.join(", ")),
            });
        }
    }

    Ok(())
}

/// Outcome of scanning one token from its opening delimiter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TokenScan {
    /// Byte index of the matching closing delimiter.
    Balanced(usize),
    /// Byte index of a closing delimiter of the wrong kind.
    Mismatched(usize),
    /// Input ended with delimiters still open.
    Unterminated,
}

fn scan_token(raw: &str, start: usize) -> TokenScan {
    let mut stack: Vec<char> = Vec::new();
    let mut in_string = false;
    let mut escaped = false;

    for (offset, ch) in raw[start..].char_indices() {
        if in_string {
            match ch {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }

        match ch {
            '"' => in_string = true,
            '{' => stack.push('}'),
            '[' => stack.push(']'),
            '}' | ']' => {
                if stack.pop() != Some(ch) {
                    return TokenScan::Mismatched(start + offset);
                }
                if stack.is_empty() {
                    return TokenScan::Balanced(start + offset);
                }
            }
            _ => {}
        }
    }

    TokenScan::Unterminated
}
