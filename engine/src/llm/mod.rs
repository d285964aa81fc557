//! Reasoning engine abstraction
//!
//! The `ReasoningEngine` trait defines the boundary to the external
//! reasoning capability: one `step` takes the system prompt, the bounded
//! message history, and the capability schemas, and returns either a
//! final answer or an ordered tool-call request. The adapter performs no
//! side effects beyond the outbound call.

use async_trait::async_trait;
use sdk::{CapabilitySchema, Message, StepOutcome, ToolInvocation};
use std::collections::HashMap;

pub mod openai;
pub mod scripted;

/// Result type for reasoning operations
pub type Result<T> = std::result::Result<T, ReasoningError>;

/// Errors that can occur at the reasoning boundary
///
/// All of these surface to the agent loops as one condition: the
/// reasoning engine is unavailable for this step. The loop retries once
/// with backoff before turning the failure into text.
#[derive(Debug, thiserror::Error)]
pub enum ReasoningError {
    #[error("Reasoning engine unavailable: {0}")]
    Unavailable(String),

    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    #[error("Rate limit exceeded")]
    RateLimited,

    #[error("Request timed out")]
    Timeout,

    #[error("Parse error: {0}")]
    Parse(String),
}

/// Boundary to the external reasoning capability
#[async_trait]
pub trait ReasoningEngine: Send + Sync {
    /// Returns the name of the engine (e.g. "openai", "scripted")
    fn name(&self) -> &str;

    /// Run one reasoning step.
    ///
    /// # Arguments
    /// * `system_prompt` - role instruction, always first on the wire
    /// * `history` - the session history after the system message
    /// * `capabilities` - schemas of the capabilities the engine may request
    async fn step(
        &self,
        system_prompt: &str,
        history: &[Message],
        capabilities: &[CapabilitySchema],
    ) -> Result<StepOutcome>;
}

/// Parse tool invocations embedded in free-text content.
///
/// Some models emit tool calls as JSON in the message body instead of
/// the structured field. Handles, in order:
/// 1. Raw JSON: `{"function": "...", "arguments": {...}}`
/// 2. Fenced JSON (with or without trailing prose)
/// 3. JSON embedded in prose, scanning for `{"function":` occurrences
///
/// Multiple embedded objects come back in text order.
pub fn parse_embedded_invocations(content: &str) -> Option<Vec<ToolInvocation>> {
    let trimmed = content.trim();

    if let Some(inv) = try_parse_function_json(trimmed) {
        return Some(vec![inv]);
    }

    if let Some(inner) = extract_fenced_json(trimmed) {
        if let Some(inv) = try_parse_function_json(inner.trim()) {
            return Some(vec![inv]);
        }
    }

    let mut found = Vec::new();
    let mut rest = trimmed;
    while let Some(pos) = rest.find("{\"function\"") {
        let candidate = &rest[pos..];
        match extract_balanced_json(candidate) {
            Some(json_str) => {
                if let Some(inv) = try_parse_function_json(json_str) {
                    found.push(inv);
                }
                rest = &candidate[json_str.len()..];
            }
            None => break,
        }
    }
    if found.is_empty() {
        None
    } else {
        Some(found)
    }
}

/// Try to parse a `{"function": "...", "arguments": {...}}` object.
fn try_parse_function_json(s: &str) -> Option<ToolInvocation> {
    let json: serde_json::Value = serde_json::from_str(s).ok()?;
    let function = json.get("function")?.as_str()?;
    let arguments = json.get("arguments")?;
    Some(ToolInvocation {
        id: format!("call_{}", uuid::Uuid::new_v4()),
        capability_name: function.to_string(),
        arguments: json_object_to_string_map(arguments),
    })
}

/// Flatten a JSON object into the named-string-argument map of the
/// capability schema. Non-string values keep their JSON rendering.
pub fn json_object_to_string_map(value: &serde_json::Value) -> HashMap<String, String> {
    let mut map = HashMap::new();
    if let Some(obj) = value.as_object() {
        for (k, v) in obj {
            let rendered = match v.as_str() {
                Some(s) => s.to_string(),
                None => v.to_string(),
            };
            map.insert(k.clone(), rendered);
        }
    }
    map
}

/// Extract the body of the first markdown code fence in the text.
///
/// Works even when there is trailing prose after the closing ```.
fn extract_fenced_json(content: &str) -> Option<&str> {
    let fence_start = content.find("```")?;
    let after_opening = &content[fence_start + 3..];

    // Skip the language tag line (e.g. "json\n")
    let body_start_rel = after_opening.find('\n')? + 1;
    let body_start = fence_start + 3 + body_start_rel;

    let closing = content[body_start..].find("```")?;
    let body_end = body_start + closing;

    if body_start >= body_end {
        return None;
    }

    Some(&content[body_start..body_end])
}

/// Extract a balanced JSON object starting at position 0 of `s`.
///
/// Counts `{` / `}` depth, respecting string literals, to find the
/// matching close brace.
fn extract_balanced_json(s: &str) -> Option<&str> {
    if !s.starts_with('{') {
        return None;
    }
    let mut depth = 0i32;
    let mut in_string = false;
    let mut escape_next = false;

    for (i, ch) in s.char_indices() {
        if escape_next {
            escape_next = false;
            continue;
        }
        match ch {
            '\\' if in_string => escape_next = true,
            '"' => in_string = !in_string,
            '{' if !in_string => depth += 1,
            '}' if !in_string => {
                depth -= 1;
                if depth == 0 {
                    return Some(&s[..=i]);
                }
            }
            _ => {}
        }
    }
    None
}
