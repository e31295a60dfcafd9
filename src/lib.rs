pub mod cli;
pub mod config;
pub mod error;
pub mod git;

// Re-export commonly used types for convenience
pub use config::Config;
pub use error::{AppError, GitError, GitResult};
pub use git::{GitVersion, Repository, RepositoryOptions};
