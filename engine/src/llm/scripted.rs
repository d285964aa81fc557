//! Scripted reasoning engine
//!
//! A deterministic in-memory engine that replays a queue of prepared
//! outcomes. Used by the agent-loop and delegation tests; also handy
//! for offline dry runs. Records every history it is shown so tests can
//! assert on session isolation.

use super::{ReasoningEngine, ReasoningError};
use async_trait::async_trait;
use sdk::{CapabilitySchema, Message, StepOutcome, ToolInvocation};
use std::collections::VecDeque;
use std::sync::Mutex;

#[derive(Default)]
pub struct ScriptedEngine {
    script: Mutex<VecDeque<super::Result<StepOutcome>>>,
    seen: Mutex<Vec<Vec<Message>>>,
}

impl ScriptedEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a final answer for the next step.
    pub fn push_answer(&self, text: impl Into<String>) {
        self.lock_script()
            .push_back(Ok(StepOutcome::Answer(text.into())));
    }

    /// Queue an ordered tool request for the next step.
    pub fn push_tool_request(&self, calls: Vec<ToolInvocation>) {
        self.lock_script()
            .push_back(Ok(StepOutcome::ToolRequest(calls)));
    }

    /// Queue a reasoning failure for the next step.
    pub fn push_unavailable(&self, reason: impl Into<String>) {
        self.lock_script()
            .push_back(Err(ReasoningError::Unavailable(reason.into())));
    }

    /// All histories passed to `step`, in call order.
    pub fn seen_histories(&self) -> Vec<Vec<Message>> {
        self.seen
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    /// Number of steps taken so far.
    pub fn steps_taken(&self) -> usize {
        self.seen.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    fn lock_script(&self) -> std::sync::MutexGuard<'_, VecDeque<super::Result<StepOutcome>>> {
        self.script.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[async_trait]
impl ReasoningEngine for ScriptedEngine {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn step(
        &self,
        _system_prompt: &str,
        history: &[Message],
        _capabilities: &[CapabilitySchema],
    ) -> super::Result<StepOutcome> {
        self.seen
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(history.to_vec());

        match self.lock_script().pop_front() {
            Some(outcome) => outcome,
            None => Ok(StepOutcome::Answer("(script exhausted)".to_string())),
        }
    }
}
