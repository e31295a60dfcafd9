use std::io;
use std::path::PathBuf;
use thiserror::Error;

use crate::config::settings::ConfigError;

/// Errors that can occur during git operations
#[derive(Debug, Error)]
pub enum GitError {
    #[error("Git executable '{0}' not found in PATH; please install git and try again")]
    ToolNotFound(String),

    #[error("Git version {0} is too old. Minimum required: 2.22")]
    GitVersionTooOld(String),

    #[error("Not inside a git repository: {}", .0.display())]
    RepositoryNotFound(PathBuf),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Git ran, but what it reported breaks an invariant we rely on.
    #[error("Git operation failed: {0}")]
    Operation(String),

    #[error("Command '{command}' failed with exit code {exit_code}: {stderr}")]
    CommandFailed {
        command: String,
        exit_code: i32,
        stderr: String,
    },

    #[error("IO error: {0}")]
    IoError(#[from] io::Error),
}

impl GitError {
    pub(crate) fn operation(message: impl Into<String>) -> Self {
        GitError::Operation(message.into())
    }

    pub(crate) fn invalid_argument(message: impl Into<String>) -> Self {
        GitError::InvalidArgument(message.into())
    }
}

/// Top-level application error that wraps all module-specific errors
///
/// Used by the command-line front end; library calls return [`GitError`]
/// or [`ConfigError`] directly.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Git error: {0}")]
    Git(#[from] GitError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

/// Result type for git operations
pub type GitResult<T> = std::result::Result<T, GitError>;

/// Result type for application-level operations
pub type AppResult<T> = std::result::Result<T, AppError>;
