use crate::error::{GitError, GitResult};
use std::io;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};

/// Result of executing a git command
#[derive(Debug, Clone, Default)]
pub struct CommandOutput {
    pub stdout: String,
    pub stderr: String,
    pub exit_code: i32,
    pub success: bool,
}

impl CommandOutput {
    /// Stdout with surrounding whitespace removed, for single-value queries
    pub fn output(&self) -> &str {
        self.stdout.trim()
    }
}

/// How strictly a command's outcome is checked
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunOptions {
    /// Turn a nonzero exit status into [`GitError::CommandFailed`]
    pub check_exit_code: bool,
    /// Turn any stderr output into [`GitError::CommandFailed`]
    pub check_stderr: bool,
}

impl RunOptions {
    /// Fail on nonzero exit, tolerate stderr chatter
    pub const STRICT: Self = Self {
        check_exit_code: true,
        check_stderr: false,
    };

    /// Report every outcome as a value; the caller inspects the exit code
    pub const UNCHECKED: Self = Self {
        check_exit_code: false,
        check_stderr: false,
    };
}

impl Default for RunOptions {
    fn default() -> Self {
        Self::STRICT
    }
}

/// Runs one git invocation and captures its output
///
/// `args` never includes the executable itself.
pub trait CommandRunner {
    fn run(&self, args: &[String], cwd: &Path, options: RunOptions) -> GitResult<CommandOutput>;
}

/// Executes git commands as child processes
#[derive(Debug, Clone)]
pub struct GitExecutor {
    program: PathBuf,
}

impl GitExecutor {
    /// Create an executor that runs `git` from the search path
    pub fn new() -> Self {
        Self::with_program("git")
    }

    /// Create an executor for a specific git executable
    pub fn with_program<P: AsRef<Path>>(program: P) -> Self {
        Self {
            program: program.as_ref().to_path_buf(),
        }
    }

    /// Get the executable this runner invokes
    pub fn program(&self) -> &Path {
        &self.program
    }

    /// Process command output into CommandOutput struct
    fn process_output(
        &self,
        output: Output,
        args: &[String],
        options: RunOptions,
    ) -> GitResult<CommandOutput> {
        let stdout = String::from_utf8_lossy(&output.stdout).to_string();
        let stderr = String::from_utf8_lossy(&output.stderr).to_string();
        let exit_code = output.status.code().unwrap_or(-1);
        let success = output.status.success();

        tracing::debug!(
            command = %render_command(args),
            exit_code,
            stdout_len = stdout.len(),
            stderr = %stderr.trim(),
            "executed git command"
        );

        let failed = (options.check_exit_code && !success)
            || (options.check_stderr && !stderr.trim().is_empty());
        if failed {
            return Err(GitError::CommandFailed {
                command: render_command(args),
                exit_code,
                stderr: stderr.trim().to_string(),
            });
        }

        Ok(CommandOutput {
            stdout,
            stderr,
            exit_code,
            success,
        })
    }
}

impl Default for GitExecutor {
    fn default() -> Self {
        Self::new()
    }
}

impl CommandRunner for GitExecutor {
    fn run(&self, args: &[String], cwd: &Path, options: RunOptions) -> GitResult<CommandOutput> {
        let output = Command::new(&self.program)
            .args(args)
            .current_dir(cwd)
            .output()
            .map_err(|e| match e.kind() {
                io::ErrorKind::NotFound if cwd.is_dir() => {
                    GitError::ToolNotFound(self.program.display().to_string())
                }
                _ => GitError::IoError(e),
            })?;

        self.process_output(output, args, options)
    }
}

/// Render an argument vector for logs and error messages
pub(crate) fn render_command(args: &[String]) -> String {
    let mut rendered = String::from("git");
    for arg in args {
        rendered.push(' ');
        if arg.is_empty() || arg.contains(char::is_whitespace) {
            rendered.push('\'');
            rendered.push_str(arg);
            rendered.push('\'');
        } else {
            rendered.push_str(arg);
        }
    }
    rendered
}
