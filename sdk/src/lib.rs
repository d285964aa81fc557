//! Foreman SDK
//!
//! Shared library providing the types and error taxonomy used across
//! the foreman engine: session messages, tool invocations, command
//! results, and capability schemas.

/// Error types and handling
pub mod errors;

/// Session and tool types
pub mod types;

// Re-export commonly used types
pub use errors::{EngineError, ForemanErrorExt};
pub use types::{
    history_is_well_formed, CapabilitySchema, CommandResult, Message, MessageRole, ParamSpec,
    StepOutcome, ToolInvocation, ToolResult, WorkerReport, INCOMPLETE_MARKER,
};
