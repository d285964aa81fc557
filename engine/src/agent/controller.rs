//! Controller session and mode dispatch
//!
//! The controller owns the operator-facing session: one bounded history,
//! the full or restricted capability set, and the loop that drives a
//! prompt to a final answer. Three modes share the loop. `execute` runs
//! one autonomous pass over the target repositories and reports back
//! through the issue tracker, `analyze` runs one read-only assessment
//! pass with delegation withheld, and `interactive` reads operator
//! input line by line until a quit phrase or EOF.
//!
//! All target repositories go into a single prompt so prioritization
//! happens in one reasoning pass rather than per repository.

use crate::agent::conversation::ConversationState;
use crate::agent::step_with_retry;
use crate::agent::worker::WorkerSettings;
use crate::capabilities::CapabilitySet;
use crate::executor::CommandExecutor;
use crate::llm::ReasoningEngine;
use sdk::{EngineError, Message, StepOutcome, INCOMPLETE_MARKER};
use std::io::Write;
use std::sync::Arc;
use tokio::io::AsyncBufReadExt;
use tracing::{debug, info, warn};

/// Role instruction for the autonomous execute pass
const EXECUTE_SYSTEM_PROMPT: &str = "\
You are an autonomous repository manager. Your job is to:

1. List open issues from every target repository
2. Decide which task to work on next, weighing priority, urgency, and \
dependencies across all targets
3. Delegate the implementation to an execution agent with the delegate \
capability, one self-contained task at a time
4. Report what was done by commenting on the issue with `gh issue comment`

Use the shell capability with the `gh` CLI to interact with GitHub, and \
any other CLI tools as needed. Always record the outcome with \
`gh issue comment` before giving your final answer.

Be autonomous. Make decisions and take action.";

/// Role instruction for the read-only analysis pass
const ANALYZE_SYSTEM_PROMPT: &str = "\
You are a repository analyst producing a read-only assessment.

Inspect the target repositories with the shell capability: list open \
issues with the `gh` CLI, read the promising ones, and look at recent \
activity. Do not modify anything: no file writes, no branches, no \
comments, no issue changes.

Reply with a prioritized assessment of the open work and what should \
happen next.";

/// Role instruction for the interactive session
const INTERACTIVE_SYSTEM_PROMPT: &str = "\
You are a repository manager in an interactive session with an operator.

Answer questions and carry out instructions against the target \
repositories. Use the shell capability with the `gh` CLI for repository \
work and the delegate capability for self-contained implementation \
tasks. Keep answers concise and report concrete results.";

/// Operating mode of a controller session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Interactive,
    Analyze,
    Execute,
}

/// Bounds for the controller session
#[derive(Debug, Clone)]
pub struct ControllerSettings {
    pub max_turns: usize,
    pub summarization_threshold: usize,
    pub recent_turns_kept: usize,
}

impl Default for ControllerSettings {
    fn default() -> Self {
        Self {
            max_turns: crate::agent::worker::DEFAULT_MAX_TURNS,
            summarization_threshold: crate::agent::conversation::DEFAULT_SUMMARIZATION_THRESHOLD,
            recent_turns_kept: crate::agent::conversation::DEFAULT_RECENT_TURNS,
        }
    }
}

/// Drives one operator-facing session in a fixed mode.
pub struct Controller {
    engine: Arc<dyn ReasoningEngine>,
    capabilities: CapabilitySet,
    state: ConversationState,
    mode: Mode,
    repos: Vec<String>,
    max_turns: usize,
}

impl Controller {
    /// Build a controller for `mode` over `repos`.
    ///
    /// Analysis sessions get a shell-only capability set; the other
    /// modes also get delegation, with `worker_settings` governing the
    /// workers it spawns.
    pub fn for_mode(
        mode: Mode,
        engine: Arc<dyn ReasoningEngine>,
        repos: Vec<String>,
        settings: ControllerSettings,
        worker_settings: WorkerSettings,
    ) -> Self {
        let executor = CommandExecutor::with_default_timeout(worker_settings.command_timeout);
        let capabilities = match mode {
            Mode::Analyze => CapabilitySet::shell_only(executor),
            Mode::Interactive | Mode::Execute => {
                CapabilitySet::with_delegation(executor, engine.clone(), worker_settings)
            }
        };

        let system_prompt = match mode {
            Mode::Interactive => INTERACTIVE_SYSTEM_PROMPT,
            Mode::Analyze => ANALYZE_SYSTEM_PROMPT,
            Mode::Execute => EXECUTE_SYSTEM_PROMPT,
        };

        let mut state =
            ConversationState::with_bounds(settings.summarization_threshold, settings.recent_turns_kept);
        state.append(Message::system(system_prompt));

        Self {
            engine,
            capabilities,
            state,
            mode,
            repos,
            max_turns: settings.max_turns,
        }
    }

    /// Run one autonomous pass (execute or analyze) and return the
    /// final answer text.
    pub async fn run_mission(&mut self) -> String {
        let prompt = mission_prompt(self.mode, &self.repos);
        self.run_to_answer(&prompt).await
    }

    /// Read operator input line by line until `quit`, `exit`, or EOF,
    /// printing each answer as it arrives.
    pub async fn run_interactive<R>(&mut self, input: R) -> std::io::Result<()>
    where
        R: tokio::io::AsyncBufRead + Unpin,
    {
        let mut lines = input.lines();
        loop {
            print!("> ");
            std::io::stdout().flush()?;

            let line = match lines.next_line().await? {
                Some(line) => line,
                None => break,
            };
            let trimmed = line.trim();
            if trimmed.is_empty() {
                continue;
            }
            if trimmed.eq_ignore_ascii_case("quit") || trimmed.eq_ignore_ascii_case("exit") {
                break;
            }

            let answer = self.run_to_answer(trimmed).await;
            println!("{answer}");
        }
        info!("interactive session ended");
        Ok(())
    }

    /// Drive one user input to a final answer.
    ///
    /// Each tool turn is staged and committed to history as a unit, so
    /// an aborted turn never leaves an invocation without its result.
    /// Failures become answer text; nothing here ends the process.
    pub async fn run_to_answer(&mut self, input: &str) -> String {
        self.state.append(Message::user(input));
        let schemas = self.capabilities.schemas();

        for turn in 0..self.max_turns {
            let outcome = match step_with_retry(self.engine.as_ref(), &self.state, &schemas).await {
                Ok(outcome) => outcome,
                Err(e) => {
                    warn!(turn, error = %e, "reasoning failed twice; answering with the failure");
                    let text = EngineError::ReasoningUnavailable(e.to_string()).to_string();
                    self.state.append(Message::assistant(&text));
                    return text;
                }
            };

            match outcome {
                StepOutcome::Answer(text) => {
                    info!(turns = turn + 1, "controller reached final answer");
                    self.state.append(Message::assistant(&text));
                    return text;
                }
                StepOutcome::ToolRequest(calls) => {
                    debug!(turn, count = calls.len(), "executing requested invocations");
                    let mut staged = vec![Message::assistant_with_calls("", calls.clone())];
                    for call in &calls {
                        let result = self.capabilities.dispatch(call).await;
                        staged.push(Message::tool_result(&result));
                    }
                    for message in staged {
                        self.state.append(message);
                    }
                }
            }
        }

        warn!(max_turns = self.max_turns, "controller hit the turn limit");
        let text = format!("{} {}", INCOMPLETE_MARKER, EngineError::MaxTurnsExceeded);
        self.state.append(Message::assistant(&text));
        text
    }

    /// The session history, for inspection.
    pub fn history(&self) -> &[Message] {
        self.state.history()
    }
}

/// Build the single mission prompt covering every target repository.
fn mission_prompt(mode: Mode, repos: &[String]) -> String {
    let mut text = String::new();
    if repos.is_empty() {
        text.push_str(
            "Work against the GitHub context of the current directory; \
run `gh issue list` to see the open issues.\n\n",
        );
    } else {
        text.push_str("Target repositories:\n");
        for repo in repos {
            text.push_str("- ");
            text.push_str(repo);
            text.push('\n');
        }
        text.push_str(
            "\nRun `gh issue list -R <repository>` for each target, and use \
the -R flag on every gh command.\n\n",
        );
    }

    match mode {
        Mode::Analyze => text.push_str(
            "Reply with a prioritized assessment of the open work across \
all targets. Make no changes.",
        ),
        Mode::Interactive | Mode::Execute => text.push_str(
            "Pick the most important open issue across all targets and \
execute it, then report the outcome on the issue.",
        ),
    }
    text
}
