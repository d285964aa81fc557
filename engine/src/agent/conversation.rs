//! Conversation state for agent sessions
//!
//! Owns the ordered message history of one session and keeps it bounded.
//! When the estimated size crosses the configured threshold, the oldest
//! turns are replaced with a single synthetic assistant summary. The
//! system prompt is never summarized away and the most recent turns stay
//! verbatim. Truncation boundaries always fall on turn boundaries: an
//! assistant message carrying tool invocations and the tool messages
//! answering it move as one unit, so no invocation is ever orphaned.
//!
//! This is the only component allowed to mutate history order; every
//! other component appends.

use sdk::{Message, MessageRole};
use tracing::debug;

/// Default summarization threshold in estimated tokens
pub const DEFAULT_SUMMARIZATION_THRESHOLD: usize = 8000;

/// Default number of recent turns kept verbatim
pub const DEFAULT_RECENT_TURNS: usize = 2;

/// Average characters per token (rough estimate)
const CHARS_PER_TOKEN: usize = 4;

/// Per-message structural overhead in estimated tokens
const MESSAGE_OVERHEAD: usize = 10;

/// First line of every synthetic summary message
const SUMMARY_PREFIX: &str = "Previous conversation summary:";

/// Longest content snippet carried into a summary line
const SNIPPET_CHARS: usize = 120;

/// Bounded, append-only conversation history with summarization
#[derive(Debug, Clone)]
pub struct ConversationState {
    messages: Vec<Message>,
    threshold: usize,
    recent_turns_kept: usize,
    token_count: usize,
}

impl ConversationState {
    /// Create a conversation bound by the default threshold.
    pub fn new() -> Self {
        Self::with_bounds(DEFAULT_SUMMARIZATION_THRESHOLD, DEFAULT_RECENT_TURNS)
    }

    /// Create a conversation with explicit bounds.
    ///
    /// `threshold` is the estimated token count above which older turns
    /// are summarized; `recent_turns_kept` is the number of most recent
    /// turns that always survive verbatim.
    pub fn with_bounds(threshold: usize, recent_turns_kept: usize) -> Self {
        Self {
            messages: Vec::new(),
            threshold,
            recent_turns_kept: recent_turns_kept.max(1),
            token_count: 0,
        }
    }

    /// Append a message and apply the summarization policy.
    pub fn append(&mut self, message: Message) {
        self.token_count += Self::estimate_tokens(&message);
        self.messages.push(message);
        self.maybe_summarize();
    }

    /// The ordered message history.
    pub fn history(&self) -> &[Message] {
        &self.messages
    }

    /// Current estimated token count.
    pub fn token_count(&self) -> usize {
        self.token_count
    }

    /// Summarize older turns if the history exceeds its bound.
    ///
    /// Idempotent: calling this again with no new turns leaves the
    /// history unchanged.
    pub fn maybe_summarize(&mut self) {
        if self.token_count <= self.threshold {
            return;
        }

        let protected = usize::from(
            self.messages
                .first()
                .map(|m| m.role == MessageRole::System)
                .unwrap_or(false),
        );

        let turn_starts = self.turn_starts(protected);
        if turn_starts.len() <= self.recent_turns_kept {
            return;
        }

        let cut = turn_starts[turn_starts.len() - self.recent_turns_kept];
        let region = &self.messages[protected..cut];
        if region.is_empty() {
            return;
        }
        if region.len() == 1 && Self::is_summary(&region[0]) {
            // Already collapsed; nothing older to fold in.
            return;
        }

        let replaced = region.len();
        let summary = Message::assistant(Self::build_summary(region));
        self.messages.splice(protected..cut, [summary]);
        self.token_count = self.messages.iter().map(Self::estimate_tokens).sum();
        debug!(
            replaced,
            token_count = self.token_count,
            "summarized older conversation turns"
        );
    }

    /// Start indices of each turn after the protected prefix. A turn is
    /// a user message, or an assistant message together with the tool
    /// messages answering it.
    fn turn_starts(&self, protected: usize) -> Vec<usize> {
        let mut starts = Vec::new();
        for (i, msg) in self.messages.iter().enumerate().skip(protected) {
            match msg.role {
                MessageRole::Tool => {}
                _ => starts.push(i),
            }
        }
        starts
    }

    fn is_summary(message: &Message) -> bool {
        message.role == MessageRole::Assistant && message.content.starts_with(SUMMARY_PREFIX)
    }

    fn build_summary(region: &[Message]) -> String {
        let mut lines: Vec<String> = Vec::new();
        for msg in region {
            if Self::is_summary(msg) {
                // Fold an earlier summary's lines in verbatim.
                lines.extend(
                    msg.content
                        .lines()
                        .filter(|l| l.starts_with("- "))
                        .map(String::from),
                );
                continue;
            }
            lines.push(Self::digest_line(msg));
        }
        format!("{}\n\n{}", SUMMARY_PREFIX, lines.join("\n"))
    }

    fn digest_line(msg: &Message) -> String {
        let label = match msg.role {
            MessageRole::System => "system",
            MessageRole::User => "user",
            MessageRole::Assistant => "assistant",
            MessageRole::Tool => "tool",
        };
        if msg.content.trim().is_empty() {
            if let Some(calls) = &msg.tool_calls {
                let names: Vec<&str> = calls.iter().map(|c| c.capability_name.as_str()).collect();
                return format!("- {}: invoked {}", label, names.join(", "));
            }
        }
        format!("- {}: {}", label, Self::snippet(&msg.content))
    }

    fn snippet(content: &str) -> String {
        let flat = content.split_whitespace().collect::<Vec<_>>().join(" ");
        match flat.char_indices().nth(SNIPPET_CHARS) {
            Some((idx, _)) => format!("{}...", &flat[..idx]),
            None => flat,
        }
    }

    /// Estimate the number of tokens in a message
    ///
    /// Rough character-based estimate; different tokenizers will vary,
    /// but this is stable and cheap.
    fn estimate_tokens(message: &Message) -> usize {
        let mut chars = message.content.len();
        if let Some(id) = &message.tool_call_id {
            chars += id.len();
        }
        if let Some(calls) = &message.tool_calls {
            for call in calls {
                chars += call.id.len() + call.capability_name.len();
                chars += call
                    .arguments
                    .iter()
                    .map(|(k, v)| k.len() + v.len())
                    .sum::<usize>();
            }
        }
        chars.div_ceil(CHARS_PER_TOKEN) + MESSAGE_OVERHEAD
    }
}

impl Default for ConversationState {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sdk::{history_is_well_formed, ToolInvocation, ToolResult};
    use std::collections::HashMap;

    fn invocation(id: &str) -> ToolInvocation {
        ToolInvocation {
            id: id.to_string(),
            capability_name: "shell".to_string(),
            arguments: HashMap::new(),
        }
    }

    fn filler(i: usize) -> String {
        format!("turn {} {}", i, "x".repeat(200))
    }

    #[test]
    fn test_append_and_history() {
        let mut state = ConversationState::new();
        state.append(Message::system("sys"));
        state.append(Message::user("hello"));
        assert_eq!(state.history().len(), 2);
        assert!(state.token_count() > 0);
    }

    #[test]
    fn test_summarization_preserves_system_prompt() {
        let mut state = ConversationState::with_bounds(100, 2);
        state.append(Message::system("You coordinate repository triage"));
        for i in 0..10 {
            state.append(Message::user(filler(i)));
            state.append(Message::assistant(filler(i)));
        }

        let first = &state.history()[0];
        assert_eq!(first.role, MessageRole::System);
        assert_eq!(first.content, "You coordinate repository triage");
    }

    #[test]
    fn test_summarization_collapses_old_turns_into_one_message() {
        let mut state = ConversationState::with_bounds(100, 2);
        state.append(Message::system("sys"));
        for i in 0..10 {
            state.append(Message::user(filler(i)));
            state.append(Message::assistant(filler(i)));
        }

        let summary = &state.history()[1];
        assert_eq!(summary.role, MessageRole::Assistant);
        assert!(summary.content.starts_with(SUMMARY_PREFIX));

        // System, one summary, then the recent turns.
        let summaries = state
            .history()
            .iter()
            .filter(|m| m.content.starts_with(SUMMARY_PREFIX))
            .count();
        assert_eq!(summaries, 1);
    }

    #[test]
    fn test_recent_turns_survive_verbatim() {
        let mut state = ConversationState::with_bounds(100, 2);
        state.append(Message::system("sys"));
        for i in 0..10 {
            state.append(Message::user(filler(i)));
            state.append(Message::assistant(filler(i)));
        }

        let last = state.history().last().expect("non-empty");
        assert_eq!(last.content, filler(9));
    }

    #[test]
    fn test_summarization_is_idempotent() {
        let mut state = ConversationState::with_bounds(100, 2);
        state.append(Message::system("sys"));
        for i in 0..10 {
            state.append(Message::user(filler(i)));
            state.append(Message::assistant(filler(i)));
        }

        let before = state.history().to_vec();
        state.maybe_summarize();
        state.maybe_summarize();
        assert_eq!(state.history(), before.as_slice());
    }

    #[test]
    fn test_no_orphaned_invocations_after_summarization() {
        let mut state = ConversationState::with_bounds(120, 2);
        state.append(Message::system("sys"));
        for i in 0..8 {
            let id = format!("call_{}", i);
            state.append(Message::user(filler(i)));
            state.append(Message::assistant_with_calls(
                "",
                vec![invocation(&id)],
            ));
            state.append(Message::tool_result(&ToolResult::success(id, filler(i))));
            state.append(Message::assistant(filler(i)));
        }

        assert!(history_is_well_formed(state.history()));
    }

    #[test]
    fn test_tool_results_move_with_their_assistant_message() {
        let mut state = ConversationState::with_bounds(10_000, 2);
        state.append(Message::system("sys"));
        state.append(Message::user("old question"));
        state.append(Message::assistant("old answer"));
        state.append(Message::assistant_with_calls("", vec![invocation("call_9")]));
        state.append(Message::tool_result(&ToolResult::success("call_9", "out")));
        state.append(Message::assistant("done"));

        // Force a pass with a tiny bound; the call_9 exchange is within
        // the recent turns and must survive intact.
        state.threshold = 1;
        state.maybe_summarize();

        let history = state.history();
        assert!(history_is_well_formed(history));
        let kept: Vec<&str> = history
            .iter()
            .filter_map(|m| m.tool_call_id.as_deref())
            .collect();
        assert_eq!(kept, vec!["call_9"]);
    }

    #[test]
    fn test_below_threshold_is_untouched() {
        let mut state = ConversationState::new();
        state.append(Message::system("sys"));
        state.append(Message::user("short"));
        state.append(Message::assistant("reply"));
        assert_eq!(state.history().len(), 3);
    }
}
