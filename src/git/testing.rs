//! Scripted [`CommandRunner`] for tests that must not touch a real repository.

use crate::error::{GitError, GitResult};
use crate::git::executor::{CommandOutput, CommandRunner, RunOptions, render_command};
use crate::git::identity::ConfigScope;
use std::cell::RefCell;
use std::collections::HashMap;
use std::path::Path;

const SCOPES_BY_PRECEDENCE: [ConfigScope; 4] = [
    ConfigScope::Worktree,
    ConfigScope::Local,
    ConfigScope::Global,
    ConfigScope::System,
];

/// Records every invocation and answers from a script
///
/// Scripted replies are looked up by the exact space-joined argument list.
/// `git config` reads and writes that have no scripted reply go to an
/// in-memory configuration store; everything else succeeds with no output.
#[derive(Debug)]
pub(crate) struct RecordingRunner {
    calls: RefCell<Vec<String>>,
    replies: RefCell<HashMap<String, CommandOutput>>,
    config: RefCell<HashMap<(ConfigScope, String), String>>,
}

impl RecordingRunner {
    /// A runner for a repository whose top-level directory is `root`
    pub(crate) fn new(root: &str) -> Self {
        let runner = Self {
            calls: RefCell::new(Vec::new()),
            replies: RefCell::new(HashMap::new()),
            config: RefCell::new(HashMap::new()),
        };
        runner.reply("--version", Self::ok("git version 2.43.0\n"));
        runner.reply("rev-parse --show-toplevel", Self::ok(&format!("{}\n", root)));
        runner
    }

    pub(crate) fn ok(stdout: &str) -> CommandOutput {
        Self::exit(0, stdout)
    }

    pub(crate) fn exit(exit_code: i32, stdout: &str) -> CommandOutput {
        CommandOutput {
            stdout: stdout.to_string(),
            stderr: if exit_code == 0 {
                String::new()
            } else {
                format!("fatal: exit {}", exit_code)
            },
            exit_code,
            success: exit_code == 0,
        }
    }

    /// Script the reply for one exact command
    pub(crate) fn reply(&self, command: &str, output: CommandOutput) {
        self.replies.borrow_mut().insert(command.to_string(), output);
    }

    pub(crate) fn set_config(&self, scope: ConfigScope, key: &str, value: &str) {
        self.config
            .borrow_mut()
            .insert((scope, key.to_string()), value.to_string());
    }

    pub(crate) fn config_value(&self, scope: ConfigScope, key: &str) -> Option<String> {
        self.config.borrow().get(&(scope, key.to_string())).cloned()
    }

    /// Every command run so far, space-joined
    pub(crate) fn calls(&self) -> Vec<String> {
        self.calls.borrow().clone()
    }

    fn run_config(&self, args: &[String]) -> CommandOutput {
        let mut rest = &args[1..];
        let scope = rest
            .first()
            .and_then(|flag| flag.strip_prefix("--"))
            .and_then(|flag| flag.parse::<ConfigScope>().ok());
        if scope.is_some() {
            rest = &rest[1..];
        }

        let mut config = self.config.borrow_mut();
        match rest {
            [unset, key] if unset == "--unset" => {
                let scope = scope.unwrap_or(ConfigScope::Local);
                match config.remove(&(scope, key.clone())) {
                    Some(_) => Self::ok(""),
                    None => Self::exit(5, ""),
                }
            }
            [key] => {
                let found = match scope {
                    Some(scope) => config.get(&(scope, key.clone())).cloned(),
                    None => SCOPES_BY_PRECEDENCE
                        .iter()
                        .find_map(|scope| config.get(&(*scope, key.clone())).cloned()),
                };
                match found {
                    Some(value) => Self::ok(&format!("{}\n", value)),
                    None => Self::exit(1, ""),
                }
            }
            [key, value] => {
                let scope = scope.unwrap_or(ConfigScope::Local);
                config.insert((scope, key.clone()), value.clone());
                Self::ok("")
            }
            _ => Self::exit(129, ""),
        }
    }
}

impl CommandRunner for RecordingRunner {
    fn run(&self, args: &[String], _cwd: &Path, options: RunOptions) -> GitResult<CommandOutput> {
        let key = args.join(" ");
        self.calls.borrow_mut().push(key.clone());

        let scripted = self.replies.borrow().get(&key).cloned();
        let output = match scripted {
            Some(output) => output,
            None if args.first().is_some_and(|a| a == "config") => self.run_config(args),
            None => Self::ok(""),
        };

        let failed = (options.check_exit_code && !output.success)
            || (options.check_stderr && !output.stderr.trim().is_empty());
        if failed {
            return Err(GitError::CommandFailed {
                command: render_command(args),
                exit_code: output.exit_code,
                stderr: output.stderr.trim().to_string(),
            });
        }
        Ok(output)
    }
}
