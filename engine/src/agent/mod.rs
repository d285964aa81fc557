//! Agent sessions
//!
//! `conversation` owns bounded per-session history, `worker` runs one
//! delegated task in a fresh session, and `controller` drives the
//! operator-facing session across its modes. Both loops share the same
//! reasoning-step convention defined here.

use crate::agent::conversation::ConversationState;
use crate::llm::ReasoningEngine;
use sdk::{CapabilitySchema, Message, MessageRole, StepOutcome};
use std::time::Duration;
use tracing::warn;

pub mod controller;
pub mod conversation;
pub mod worker;

/// Pause before the single reasoning retry
const RETRY_BACKOFF: Duration = Duration::from_millis(500);

/// Split a stored history into the system prompt and the turns after
/// it, matching the reasoning boundary's calling convention.
pub(crate) fn split_history(history: &[Message]) -> (&str, &[Message]) {
    match history.first() {
        Some(first) if first.role == MessageRole::System => {
            (first.content.as_str(), &history[1..])
        }
        _ => ("", history),
    }
}

/// One reasoning step with a single bounded retry.
///
/// A first failure is logged and retried after a short pause; a second
/// failure is the caller's to turn into text.
pub(crate) async fn step_with_retry(
    engine: &dyn ReasoningEngine,
    state: &ConversationState,
    schemas: &[CapabilitySchema],
) -> crate::llm::Result<StepOutcome> {
    let (system_prompt, history) = split_history(state.history());
    match engine.step(system_prompt, history, schemas).await {
        Ok(outcome) => Ok(outcome),
        Err(first) => {
            warn!(error = %first, "reasoning step failed; retrying once");
            tokio::time::sleep(RETRY_BACKOFF).await;
            engine.step(system_prompt, history, schemas).await
        }
    }
}
