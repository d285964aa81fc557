//! CLI interface for Foreman
//!
//! This module provides the command-line interface using clap's derive
//! API. It defines all commands and global flags for running manager
//! and worker sessions.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Foreman task orchestrator
///
/// A manager agent that surveys open GitHub issues across repositories,
/// picks the most important work, and delegates execution to worker
/// agents that report back on the issue.
#[derive(Parser, Debug)]
#[command(name = "foreman")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Emit logs as JSON
    #[arg(long, global = true)]
    pub json: bool,

    /// Set log level (error, warn, info, debug, trace)
    #[arg(long, global = true, value_name = "LEVEL")]
    pub log: Option<String>,

    /// Specify alternate configuration file
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Survey the targets, pick the most important issue, execute it
    Run {
        /// Target repository (owner/name), repeatable
        #[arg(short = 'r', long = "repo", value_name = "REPO")]
        repos: Vec<String>,
    },

    /// Assess and prioritize the open work without changing anything
    Analyze {
        /// Target repository (owner/name), repeatable
        #[arg(short = 'r', long = "repo", value_name = "REPO")]
        repos: Vec<String>,
    },

    /// Start an interactive session against the targets
    Chat {
        /// Target repository (owner/name), repeatable
        #[arg(short = 'r', long = "repo", value_name = "REPO")]
        repos: Vec<String>,
    },

    /// Run a single task as a worker, without the manager layer
    Worker {
        /// The task to execute
        task: String,
    },

    /// Serve the HTTP invoke endpoint
    Serve {
        /// Bind address override
        #[arg(long, value_name = "HOST")]
        host: Option<String>,

        /// Bind port override
        #[arg(long, value_name = "PORT")]
        port: Option<u16>,
    },

    /// Store the reasoning API key in the OS keychain
    Login,
}
