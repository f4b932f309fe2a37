use std::path::PathBuf;
use thiserror::Error;

use crate::state::machine::BatchPhase;

/// Errors that stop a batch before its per-file loop begins.
#[derive(Debug, Error)]
pub enum BatchError {
    #[error("agent unavailable: {0}")]
    AgentUnavailable(String),
    #[error("file selection failed: {0:#}")]
    Selection(anyhow::Error),
    #[error("task intent could not be resolved: {0:#}")]
    Intent(anyhow::Error),
    #[error("invalid batch transition: {from:?} -> {to:?}")]
    InvalidTransition { from: BatchPhase, to: BatchPhase },
}

/// Failure of a single file's agent task. Counted, never fatal to the run.
#[derive(Debug, Error)]
pub enum TaskError {
    #[error("agent rejected the task: {0:#}")]
    Rejected(anyhow::Error),
    #[error("confirm action failed: {0:#}")]
    Confirm(anyhow::Error),
    #[error("status poll failed: {0:#}")]
    Status(anyhow::Error),
}

/// Failure executing one hook command.
#[derive(Debug, Error)]
pub enum HookError {
    #[error("failed to spawn shell for hook \"{hook}\": {source}")]
    Spawn {
        hook: String,
        #[source]
        source: std::io::Error,
    },
    #[error("host command \"{command}\" failed: {message}")]
    Host { command: String, message: String },
}

/// Failure creating the run log.
#[derive(Debug, Error)]
pub enum LoggingError {
    #[error("cannot create log directory {}: {source}", path.display())]
    CreateDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("cannot create log file {}: {source}", path.display())]
    CreateFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Reason a hook condition could not be evaluated. Treated as `false`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConditionError {
    #[error("empty clause in condition")]
    EmptyClause,
    #[error("no comparison operator in clause \"{0}\"")]
    MissingOperator(String),
    #[error("missing variable in clause \"{0}\"")]
    MissingVariable(String),
    #[error("unknown variable \"{0}\"")]
    UnknownVariable(String),
    #[error("right-hand side \"{0}\" is not an integer")]
    NotAnInteger(String),
}
