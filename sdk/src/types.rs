//! Session and tool types
//!
//! The shared data model: messages and roles, tool invocations and
//! results, command results with their normalized text rendering, and
//! the capability schemas advertised to the reasoning engine.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Role of a message in a session history
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    System,
    User,
    Assistant,
    Tool,
}

/// One turn entry in a session history
///
/// Ordering is append-only and significant. An `assistant` message may
/// carry tool invocations; each following `tool` message answers exactly
/// one of them via `tool_call_id`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub role: MessageRole,
    pub content: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_calls: Option<Vec<ToolInvocation>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_call_id: Option<String>,
}

impl Message {
    /// Create a system message
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::System,
            content: content.into(),
            tool_calls: None,
            tool_call_id: None,
        }
    }

    /// Create a user message
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::User,
            content: content.into(),
            tool_calls: None,
            tool_call_id: None,
        }
    }

    /// Create an assistant message with no tool invocations
    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::Assistant,
            content: content.into(),
            tool_calls: None,
            tool_call_id: None,
        }
    }

    /// Create an assistant message carrying tool invocations
    pub fn assistant_with_calls(content: impl Into<String>, calls: Vec<ToolInvocation>) -> Self {
        Self {
            role: MessageRole::Assistant,
            content: content.into(),
            tool_calls: Some(calls),
            tool_call_id: None,
        }
    }

    /// Create a tool message answering one invocation
    pub fn tool_result(result: &ToolResult) -> Self {
        Self {
            role: MessageRole::Tool,
            content: result.output_text.clone(),
            tool_calls: None,
            tool_call_id: Some(result.invocation_id.clone()),
        }
    }
}

/// A tool-call request emitted by the reasoning engine
///
/// Immutable once created; consumed exactly once by the dispatch loop,
/// producing one [`ToolResult`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolInvocation {
    pub id: String,
    pub capability_name: String,
    pub arguments: HashMap<String, String>,
}

impl ToolInvocation {
    /// Get a named argument, if present
    pub fn arg(&self, key: &str) -> Option<&str> {
        self.arguments.get(key).map(String::as_str)
    }
}

/// The outcome of dispatching one [`ToolInvocation`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolResult {
    pub invocation_id: String,
    pub output_text: String,
    pub is_error: bool,
}

impl ToolResult {
    /// A successful result
    pub fn success(invocation_id: impl Into<String>, output_text: impl Into<String>) -> Self {
        Self {
            invocation_id: invocation_id.into(),
            output_text: output_text.into(),
            is_error: false,
        }
    }

    /// An error-shaped result (still fed back to the reasoning engine)
    pub fn error(invocation_id: impl Into<String>, output_text: impl Into<String>) -> Self {
        Self {
            invocation_id: invocation_id.into(),
            output_text: output_text.into(),
            is_error: true,
        }
    }
}

/// Captured output of one external command
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommandResult {
    pub stdout: String,
    pub stderr: String,
    pub exit_code: i32,
    pub timed_out: bool,
}

impl CommandResult {
    /// Whether the command failed (nonzero exit or timeout)
    pub fn is_failure(&self) -> bool {
        self.timed_out || self.exit_code != 0
    }

    /// Render the result as the single text blob handed to the
    /// reasoning layer.
    ///
    /// Layout: stdout, then a `STDERR:` section when stderr is
    /// non-empty, then an `Exit code: N` line when the exit code is
    /// nonzero. The final blob is whitespace-trimmed.
    pub fn normalized(&self) -> String {
        let mut out = self.stdout.clone();
        if !self.stderr.is_empty() {
            out.push_str("\nSTDERR:\n");
            out.push_str(&self.stderr);
        }
        if self.exit_code != 0 {
            out.push_str(&format!("\nExit code: {}", self.exit_code));
        }
        out.trim().to_string()
    }
}

/// One named string parameter of a capability schema
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParamSpec {
    pub name: String,
    pub description: String,
    pub required: bool,
}

/// Schema for a capability advertised to the reasoning engine
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CapabilitySchema {
    pub name: String,
    pub description: String,
    pub parameters: Vec<ParamSpec>,
}

/// Outcome of one reasoning step
#[derive(Debug, Clone, PartialEq)]
pub enum StepOutcome {
    /// Final free-text answer for the current turn
    Answer(String),
    /// Ordered tool invocations to execute before the next step
    ToolRequest(Vec<ToolInvocation>),
}

/// Marker prefixed to delegation results from workers that stopped
/// before reaching a final answer.
pub const INCOMPLETE_MARKER: &str = "[incomplete]";

/// Result of one worker run: the report text plus whether the task
/// reached natural completion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkerReport {
    pub text: String,
    pub completed: bool,
}

impl WorkerReport {
    /// A report from a run that reached a final answer
    pub fn completed(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            completed: true,
        }
    }

    /// A report from a run cut off before a final answer. The text
    /// should say why and carry whatever partial progress exists.
    pub fn incomplete(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            completed: false,
        }
    }

    /// Render the report as delegation result text, marking runs that
    /// did not reach natural completion.
    pub fn render(&self) -> String {
        if self.completed {
            self.text.clone()
        } else {
            format!("{} {}", INCOMPLETE_MARKER, self.text)
        }
    }
}

/// Check the session history invariants: every `tool` message answers
/// an invocation carried by the assistant message opening its block,
/// no invocation is answered twice, and no block is left half-answered
/// when a new message begins.
pub fn history_is_well_formed(history: &[Message]) -> bool {
    let mut pending: Vec<String> = Vec::new();
    for msg in history {
        match msg.role {
            MessageRole::Tool => {
                let id = match &msg.tool_call_id {
                    Some(id) => id,
                    None => return false,
                };
                match pending.iter().position(|p| p == id) {
                    Some(pos) => {
                        pending.remove(pos);
                    }
                    None => return false,
                }
            }
            MessageRole::Assistant => {
                if !pending.is_empty() {
                    return false;
                }
                pending = msg
                    .tool_calls
                    .iter()
                    .flatten()
                    .map(|c| c.id.clone())
                    .collect();
            }
            MessageRole::System | MessageRole::User => {
                if !pending.is_empty() {
                    return false;
                }
            }
        }
    }
    pending.is_empty()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn invocation(id: &str, name: &str) -> ToolInvocation {
        ToolInvocation {
            id: id.to_string(),
            capability_name: name.to_string(),
            arguments: HashMap::new(),
        }
    }

    #[test]
    fn test_normalized_stdout_only() {
        let result = CommandResult {
            stdout: "hello\n".to_string(),
            stderr: String::new(),
            exit_code: 0,
            timed_out: false,
        };
        assert_eq!(result.normalized(), "hello");
    }

    #[test]
    fn test_normalized_nonzero_exit() {
        let result = CommandResult {
            stdout: String::new(),
            stderr: String::new(),
            exit_code: 3,
            timed_out: false,
        };
        assert_eq!(result.normalized(), "Exit code: 3");
    }

    #[test]
    fn test_normalized_stderr_before_exit_code() {
        let result = CommandResult {
            stdout: "partial output\n".to_string(),
            stderr: "boom\n".to_string(),
            exit_code: 1,
            timed_out: false,
        };
        let text = result.normalized();
        assert_eq!(text, "partial output\n\nSTDERR:\nboom\n\nExit code: 1");
        let stderr_pos = text.find("STDERR:").expect("stderr section");
        let exit_pos = text.find("Exit code: 1").expect("exit line");
        assert!(stderr_pos < exit_pos);
    }

    #[test]
    fn test_normalized_empty() {
        let result = CommandResult {
            stdout: String::new(),
            stderr: String::new(),
            exit_code: 0,
            timed_out: false,
        };
        assert_eq!(result.normalized(), "");
    }

    #[test]
    fn test_is_failure() {
        let ok = CommandResult {
            stdout: String::new(),
            stderr: String::new(),
            exit_code: 0,
            timed_out: false,
        };
        assert!(!ok.is_failure());

        let failed = CommandResult {
            exit_code: 2,
            ..ok.clone()
        };
        assert!(failed.is_failure());

        let timed_out = CommandResult {
            timed_out: true,
            ..ok
        };
        assert!(timed_out.is_failure());
    }

    #[test]
    fn test_message_constructors() {
        let msg = Message::system("be helpful");
        assert_eq!(msg.role, MessageRole::System);
        assert!(msg.tool_calls.is_none());

        let result = ToolResult::success("call_1", "done");
        let msg = Message::tool_result(&result);
        assert_eq!(msg.role, MessageRole::Tool);
        assert_eq!(msg.content, "done");
        assert_eq!(msg.tool_call_id.as_deref(), Some("call_1"));
    }

    #[test]
    fn test_message_role_serialization() {
        let msg = Message::user("hi");
        let json = serde_json::to_string(&msg).expect("serialize");
        assert!(json.contains("\"role\":\"user\""));
        assert!(!json.contains("tool_calls"));
    }

    #[test]
    fn test_history_well_formed_complete_exchange() {
        let call = invocation("call_1", "shell");
        let history = vec![
            Message::system("sys"),
            Message::user("do it"),
            Message::assistant_with_calls("", vec![call]),
            Message::tool_result(&ToolResult::success("call_1", "ok")),
            Message::assistant("done"),
        ];
        assert!(history_is_well_formed(&history));
    }

    #[test]
    fn test_history_rejects_orphan_tool_message() {
        let history = vec![
            Message::system("sys"),
            Message::tool_result(&ToolResult::success("call_1", "ok")),
        ];
        assert!(!history_is_well_formed(&history));
    }

    #[test]
    fn test_history_rejects_duplicate_result() {
        let call = invocation("call_1", "shell");
        let history = vec![
            Message::assistant_with_calls("", vec![call]),
            Message::tool_result(&ToolResult::success("call_1", "ok")),
            Message::tool_result(&ToolResult::success("call_1", "again")),
        ];
        assert!(!history_is_well_formed(&history));
    }

    #[test]
    fn test_history_rejects_unanswered_invocation() {
        let call = invocation("call_1", "shell");
        let history = vec![
            Message::assistant_with_calls("", vec![call]),
            Message::user("moving on"),
        ];
        assert!(!history_is_well_formed(&history));
    }

    #[test]
    fn test_worker_report_render() {
        let done = WorkerReport::completed("created LICENSE");
        assert_eq!(done.render(), "created LICENSE");

        let partial = WorkerReport::incomplete("got as far as cloning");
        let text = partial.render();
        assert!(text.starts_with(INCOMPLETE_MARKER));
        assert!(text.contains("got as far as cloning"));
    }

    #[test]
    fn test_tool_invocation_arg() {
        let mut arguments = HashMap::new();
        arguments.insert("command".to_string(), "ls".to_string());
        let call = ToolInvocation {
            id: "call_1".to_string(),
            capability_name: "shell".to_string(),
            arguments,
        };
        assert_eq!(call.arg("command"), Some("ls"));
        assert_eq!(call.arg("missing"), None);
    }
}
