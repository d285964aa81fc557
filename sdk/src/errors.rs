//! Error types and handling
//!
//! This module provides the error taxonomy used throughout the foreman
//! engine. All errors implement the `ForemanErrorExt` trait which
//! provides user-friendly hints and indicates whether errors are
//! recoverable.
//!
//! Nothing inside the controller or worker loops is allowed to
//! terminate the process: command failures and timeouts become tool
//! result text, reasoning outages become failure answers for the turn.
//! Only startup conditions (missing credential, broken configuration)
//! are fatal.

use thiserror::Error;

/// Trait for foreman error extensions
///
/// Provides additional context for errors: a user-facing hint and
/// recoverability information. Hints never contain secret material.
pub trait ForemanErrorExt {
    /// Returns a user-friendly hint for the error
    fn user_hint(&self) -> &str;

    /// Returns whether the error is recoverable
    ///
    /// Recoverable errors are retried or folded back into the session
    /// as text. Non-recoverable errors abort startup.
    fn is_recoverable(&self) -> bool;
}

/// Main engine error type
///
/// # Examples
///
/// ```
/// use sdk::errors::{EngineError, ForemanErrorExt};
///
/// let error = EngineError::CommandTimeout { seconds: 30 };
/// assert!(error.is_recoverable());
///
/// let fatal = EngineError::MissingCredential("FOREMAN_API_KEY".to_string());
/// assert!(!fatal.is_recoverable());
/// ```
#[derive(Debug, Error)]
pub enum EngineError {
    // Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    // Command execution errors, recovered locally as result text
    #[error("Command timed out after {seconds} seconds")]
    CommandTimeout { seconds: u64 },

    #[error("Command failed with exit code {exit_code}")]
    CommandFailure { exit_code: i32 },

    // Reasoning boundary errors
    #[error("Reasoning engine unavailable: {0}")]
    ReasoningUnavailable(String),

    // Loop safety bound
    #[error("Turn limit reached before the task finished")]
    MaxTurnsExceeded,

    // Startup errors
    #[error("No credential found for {0}")]
    MissingCredential(String),

    // Hosted entrypoint errors
    #[error("Malformed payload: {0}")]
    MalformedPayload(String),

    // Generic IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl ForemanErrorExt for EngineError {
    fn user_hint(&self) -> &str {
        match self {
            Self::Config(_) => "Check your config.toml file for errors",
            Self::CommandTimeout { .. } => {
                "The command exceeded its time limit. Try a longer timeout"
            }
            Self::CommandFailure { .. } => "The command exited with an error. Check its output",
            Self::ReasoningUnavailable(_) => {
                "Reasoning API unavailable. Check your API key and network"
            }
            Self::MaxTurnsExceeded => "Task too complex. Try breaking it into smaller steps",
            Self::MissingCredential(_) => {
                "Set FOREMAN_API_KEY or store the key in the system keychain"
            }
            Self::MalformedPayload(_) => "The request body must be JSON with a 'task' field",
            Self::Io(_) => "File system operation failed",
        }
    }

    fn is_recoverable(&self) -> bool {
        match self {
            Self::MissingCredential(_) | Self::Config(_) => false,
            _ => true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_timeout_display() {
        let err = EngineError::CommandTimeout { seconds: 30 };
        assert_eq!(err.to_string(), "Command timed out after 30 seconds");
    }

    #[test]
    fn test_command_failure_display() {
        let err = EngineError::CommandFailure { exit_code: 3 };
        assert_eq!(err.to_string(), "Command failed with exit code 3");
    }

    #[test]
    fn test_missing_credential_is_fatal() {
        let err = EngineError::MissingCredential("FOREMAN_API_KEY".to_string());
        assert!(!err.is_recoverable());
        assert!(err.user_hint().contains("FOREMAN_API_KEY"));
    }

    #[test]
    fn test_loop_errors_are_recoverable() {
        assert!(EngineError::CommandTimeout { seconds: 1 }.is_recoverable());
        assert!(EngineError::CommandFailure { exit_code: 1 }.is_recoverable());
        assert!(EngineError::ReasoningUnavailable("503".to_string()).is_recoverable());
        assert!(EngineError::MaxTurnsExceeded.is_recoverable());
    }

    #[test]
    fn test_malformed_payload_display() {
        let err = EngineError::MalformedPayload("missing 'task'".to_string());
        assert_eq!(err.to_string(), "Malformed payload: missing 'task'");
    }
}
