//! Execution worker
//!
//! One worker runs one delegated task to completion in a fresh session.
//! Each turn asks the reasoning engine for a step, executes any
//! requested invocations sequentially in order, and feeds the results
//! back. The run ends with a final answer, a turn-limit report, or a
//! reasoning failure turned into report text. Nothing a worker does is
//! fatal to its caller.

use crate::agent::conversation::ConversationState;
use crate::agent::step_with_retry;
use crate::capabilities::CapabilitySet;
use crate::llm::ReasoningEngine;
use sdk::{EngineError, Message, StepOutcome, WorkerReport};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Default bound on reasoning turns for one run
pub const DEFAULT_MAX_TURNS: usize = 20;

/// Fixed role instruction for execution workers
const WORKER_SYSTEM_PROMPT: &str = "\
You are an execution agent completing one delegated task.

Work directly in the repository named in the task. Read files before \
changing them, keep diffs minimal, and verify your work with the \
project's tests where they exist. Use the shell capability for every \
action. When the task is done, reply with a concise report of what \
changed and how it was verified.";

/// Tunables for one worker run
#[derive(Debug, Clone)]
pub struct WorkerSettings {
    pub max_turns: usize,
    pub summarization_threshold: usize,
    pub recent_turns_kept: usize,
    pub command_timeout: Duration,
}

impl Default for WorkerSettings {
    fn default() -> Self {
        Self {
            max_turns: DEFAULT_MAX_TURNS,
            summarization_threshold: crate::agent::conversation::DEFAULT_SUMMARIZATION_THRESHOLD,
            recent_turns_kept: crate::agent::conversation::DEFAULT_RECENT_TURNS,
            command_timeout: Duration::from_secs(crate::executor::DEFAULT_TIMEOUT_SECS),
        }
    }
}

/// Runs delegated tasks, one fresh session per call.
pub struct Worker {
    engine: Arc<dyn ReasoningEngine>,
    capabilities: CapabilitySet,
    settings: WorkerSettings,
}

impl Worker {
    pub fn new(
        engine: Arc<dyn ReasoningEngine>,
        capabilities: CapabilitySet,
        settings: WorkerSettings,
    ) -> Self {
        Self {
            engine,
            capabilities,
            settings,
        }
    }

    /// Run one task to a report.
    ///
    /// The session starts empty apart from the fixed role instruction
    /// and the task text; no state is carried between calls.
    pub async fn run(&self, task: &str) -> WorkerReport {
        let mut state = ConversationState::with_bounds(
            self.settings.summarization_threshold,
            self.settings.recent_turns_kept,
        );
        state.append(Message::system(WORKER_SYSTEM_PROMPT));
        state.append(Message::user(task));

        let schemas = self.capabilities.schemas();
        let mut last_output: Option<String> = None;

        for turn in 0..self.settings.max_turns {
            let outcome = match step_with_retry(self.engine.as_ref(), &state, &schemas).await {
                Ok(outcome) => outcome,
                Err(e) => {
                    warn!(turn, error = %e, "reasoning failed twice; reporting");
                    return WorkerReport::incomplete(
                        EngineError::ReasoningUnavailable(e.to_string()).to_string(),
                    );
                }
            };

            match outcome {
                StepOutcome::Answer(text) => {
                    info!(turns = turn + 1, "worker reached final answer");
                    return WorkerReport::completed(text);
                }
                StepOutcome::ToolRequest(calls) => {
                    debug!(turn, count = calls.len(), "executing requested invocations");
                    // Stage the whole turn, commit once every invocation
                    // has its result.
                    let mut staged = vec![Message::assistant_with_calls("", calls.clone())];
                    for call in &calls {
                        let result = self.capabilities.dispatch(call).await;
                        last_output = Some(result.output_text.clone());
                        staged.push(Message::tool_result(&result));
                    }
                    for message in staged {
                        state.append(message);
                    }
                }
            }
        }

        warn!(max_turns = self.settings.max_turns, "worker hit the turn limit");
        let mut text = EngineError::MaxTurnsExceeded.to_string();
        if let Some(last) = last_output {
            text.push_str("\n\nLast capability output:\n");
            text.push_str(&last);
        }
        WorkerReport::incomplete(text)
    }
}
