use crate::error::{GitError, GitResult};
use crate::git::executor::{CommandRunner, RunOptions};
use std::path::Path;

/// Minimum required git version (`branch --show-current`, `author.*` config keys)
const MIN_GIT_VERSION: (u32, u32) = (2, 22);

/// Represents a git version
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct GitVersion {
    pub major: u32,
    pub minor: u32,
    pub patch: u32,
}

impl GitVersion {
    /// Detect the git version reachable through `runner`
    ///
    /// A missing executable is reported by the runner as
    /// [`GitError::ToolNotFound`]; any other failure is passed through.
    pub fn detect<R: CommandRunner + ?Sized>(runner: &R, cwd: &Path) -> GitResult<Self> {
        let output = runner.run(&["--version".to_string()], cwd, RunOptions::STRICT)?;
        Self::parse(&output.stdout)
    }

    /// Parse git version from string like "git version 2.39.2"
    pub fn parse(version_str: &str) -> GitResult<Self> {
        // Expected format: "git version X.Y.Z" or "git version X.Y.Z.windows.1" etc.
        let parts: Vec<&str> = version_str.split_whitespace().collect();

        if parts.len() < 3 || parts[0] != "git" || parts[1] != "version" {
            return Err(GitError::operation(format!(
                "Unexpected git version format: {}",
                version_str.trim()
            )));
        }

        let version_nums = parts[2];
        let nums: Vec<&str> = version_nums.split('.').collect();

        if nums.len() < 2 {
            return Err(GitError::operation(format!(
                "Invalid version number format: {}",
                version_nums
            )));
        }

        let major = nums[0]
            .parse::<u32>()
            .map_err(|_| GitError::operation(format!("Invalid major version: {}", nums[0])))?;

        let minor = nums[1]
            .parse::<u32>()
            .map_err(|_| GitError::operation(format!("Invalid minor version: {}", nums[1])))?;

        let patch = if nums.len() >= 3 {
            nums[2]
                .parse::<u32>()
                .unwrap_or(0) // Allow patch version to have non-numeric suffixes
        } else {
            0
        };

        Ok(GitVersion {
            major,
            minor,
            patch,
        })
    }

    /// Check if this version meets minimum requirements
    pub fn is_supported(&self) -> bool {
        self.major > MIN_GIT_VERSION.0
            || (self.major == MIN_GIT_VERSION.0 && self.minor >= MIN_GIT_VERSION.1)
    }

    /// Detect the version and reject anything older than the minimum
    pub fn validate<R: CommandRunner + ?Sized>(runner: &R, cwd: &Path) -> GitResult<Self> {
        let version = Self::detect(runner, cwd)?;

        if !version.is_supported() {
            return Err(GitError::GitVersionTooOld(format!(
                "{}\n\nPlease upgrade git to version {}.{} or higher.\nVisit: https://git-scm.com/downloads",
                version, MIN_GIT_VERSION.0, MIN_GIT_VERSION.1
            )));
        }

        tracing::debug!(%version, "git version detected");
        Ok(version)
    }
}

impl std::fmt::Display for GitVersion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)
    }
}
