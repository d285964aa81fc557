//! Capability set and dispatch
//!
//! The closed set of capabilities a reasoning engine may request:
//! `shell` runs one command through the executor and `delegate` hands a
//! self-contained task to a fresh execution worker. Dispatch is keyed
//! by capability name; unknown names and malformed arguments come back
//! as error-shaped results so the engine can self-correct on its next
//! step instead of crashing the session.

use crate::agent::worker::{Worker, WorkerSettings};
use crate::executor::CommandExecutor;
use crate::llm::ReasoningEngine;
use async_trait::async_trait;
use sdk::{CapabilitySchema, EngineError, ParamSpec, ToolInvocation, ToolResult};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// Name of the shell capability
pub const SHELL: &str = "shell";

/// Name of the delegation capability
pub const DELEGATE: &str = "delegate";

/// One capability the reasoning engine can invoke.
///
/// The trait is the dispatch seam; the set of implementors is closed.
#[async_trait]
pub trait Capability: Send + Sync {
    fn schema(&self) -> CapabilitySchema;

    async fn run(&self, invocation: &ToolInvocation) -> ToolResult;
}

/// The capabilities available to one session.
///
/// `shell` is always present. `delegate` is withheld in analysis
/// sessions and inside workers, so a delegated task can never fan out
/// further.
pub struct CapabilitySet {
    shell: ShellCapability,
    delegate: Option<DelegateCapability>,
}

impl CapabilitySet {
    /// A set with only the shell capability.
    pub fn shell_only(executor: CommandExecutor) -> Self {
        Self {
            shell: ShellCapability { executor },
            delegate: None,
        }
    }

    /// A set with shell and delegation. Each `delegate` invocation
    /// builds one fresh worker backed by `engine`.
    pub fn with_delegation(
        executor: CommandExecutor,
        engine: Arc<dyn ReasoningEngine>,
        worker_settings: WorkerSettings,
    ) -> Self {
        Self {
            shell: ShellCapability { executor },
            delegate: Some(DelegateCapability {
                engine,
                settings: worker_settings,
            }),
        }
    }

    /// Schemas of every enabled capability, for the reasoning boundary.
    pub fn schemas(&self) -> Vec<CapabilitySchema> {
        let mut schemas = vec![self.shell.schema()];
        if let Some(delegate) = &self.delegate {
            schemas.push(delegate.schema());
        }
        schemas
    }

    /// Names of every enabled capability.
    pub fn names(&self) -> Vec<&'static str> {
        let mut names = vec![SHELL];
        if self.delegate.is_some() {
            names.push(DELEGATE);
        }
        names
    }

    /// Route one invocation to its capability.
    ///
    /// Never returns an `Err`; anything that goes wrong becomes an
    /// error-shaped [`ToolResult`] carrying the invocation id.
    pub async fn dispatch(&self, invocation: &ToolInvocation) -> ToolResult {
        debug!(
            capability = %invocation.capability_name,
            id = %invocation.id,
            "dispatching invocation"
        );
        match invocation.capability_name.as_str() {
            SHELL => self.shell.run(invocation).await,
            DELEGATE => match &self.delegate {
                Some(delegate) => delegate.run(invocation).await,
                None => self.unknown(invocation),
            },
            _ => self.unknown(invocation),
        }
    }

    fn unknown(&self, invocation: &ToolInvocation) -> ToolResult {
        warn!(capability = %invocation.capability_name, "unknown capability requested");
        ToolResult::error(
            &invocation.id,
            format!(
                "ERROR: Unknown capability '{}'. Available capabilities: {}",
                invocation.capability_name,
                self.names().join(", ")
            ),
        )
    }
}

/// Runs one shell command per invocation.
pub struct ShellCapability {
    executor: CommandExecutor,
}

#[async_trait]
impl Capability for ShellCapability {
    fn schema(&self) -> CapabilitySchema {
        CapabilitySchema {
            name: SHELL.to_string(),
            description: "Run a shell command and return its output".to_string(),
            parameters: vec![
                ParamSpec {
                    name: "command".to_string(),
                    description: "The command line to run".to_string(),
                    required: true,
                },
                ParamSpec {
                    name: "timeout_secs".to_string(),
                    description: "Seconds to wait before killing the command".to_string(),
                    required: false,
                },
            ],
        }
    }

    async fn run(&self, invocation: &ToolInvocation) -> ToolResult {
        let command = match invocation.arg("command") {
            Some(command) if !command.trim().is_empty() => command,
            _ => return malformed(invocation, "missing required parameter 'command'"),
        };

        let timeout = match invocation.arg("timeout_secs") {
            Some(raw) => match raw.parse::<u64>() {
                Ok(secs) => Some(Duration::from_secs(secs)),
                Err(_) => {
                    return malformed(
                        invocation,
                        format!("parameter 'timeout_secs' is not an integer: {raw}"),
                    )
                }
            },
            None => None,
        };

        let result = match timeout {
            Some(timeout) => self.executor.execute_with_timeout(command, timeout).await,
            None => self.executor.execute(command).await,
        };

        if result.is_failure() {
            ToolResult::error(&invocation.id, result.normalized())
        } else {
            ToolResult::success(&invocation.id, result.normalized())
        }
    }
}

/// Hands a task to a fresh worker and blocks until it reports.
///
/// Exactly one worker exists per invocation; it gets its own session
/// and a shell-only capability set. Whatever happens inside the worker
/// comes back as result text, never as a dispatch failure.
pub struct DelegateCapability {
    engine: Arc<dyn ReasoningEngine>,
    settings: WorkerSettings,
}

#[async_trait]
impl Capability for DelegateCapability {
    fn schema(&self) -> CapabilitySchema {
        CapabilitySchema {
            name: DELEGATE.to_string(),
            description: "Delegate a self-contained task to an execution agent and wait for its report"
                .to_string(),
            parameters: vec![ParamSpec {
                name: "task".to_string(),
                description: "Full description of the task, including repository paths".to_string(),
                required: true,
            }],
        }
    }

    async fn run(&self, invocation: &ToolInvocation) -> ToolResult {
        let task = match invocation.arg("task") {
            Some(task) if !task.trim().is_empty() => task,
            _ => return malformed(invocation, "missing required parameter 'task'"),
        };

        let capabilities = CapabilitySet::shell_only(CommandExecutor::with_default_timeout(
            self.settings.command_timeout,
        ));
        let worker = Worker::new(self.engine.clone(), capabilities, self.settings.clone());
        let report = worker.run(task).await;

        if report.completed {
            ToolResult::success(&invocation.id, report.render())
        } else {
            ToolResult::error(&invocation.id, report.render())
        }
    }
}

fn malformed(invocation: &ToolInvocation, detail: impl Into<String>) -> ToolResult {
    ToolResult::error(
        &invocation.id,
        format!("ERROR: {}", EngineError::MalformedPayload(detail.into())),
    )
}
