//! Commit identities stored in git configuration, and temporary overrides of
//! them.

use crate::error::{GitError, GitResult};
use crate::git::executor::CommandRunner;
use crate::git::repository::Repository;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Which identity a configuration entry belongs to (`<kind>.name`, `<kind>.email`)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IdentityKind {
    User,
    Author,
    Committer,
}

impl IdentityKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            IdentityKind::User => "user",
            IdentityKind::Author => "author",
            IdentityKind::Committer => "committer",
        }
    }
}

impl fmt::Display for IdentityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for IdentityKind {
    type Err = GitError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "user" => Ok(IdentityKind::User),
            "author" => Ok(IdentityKind::Author),
            "committer" => Ok(IdentityKind::Committer),
            other => Err(GitError::invalid_argument(format!(
                "Unknown identity kind '{}'; expected user, author or committer",
                other
            ))),
        }
    }
}

/// Configuration tier, ordered from least to most specific
///
/// When a key is set in several tiers the most specific one wins, so
/// `Worktree > Local > Global > System`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConfigScope {
    System,
    Global,
    Local,
    Worktree,
}

impl ConfigScope {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConfigScope::System => "system",
            ConfigScope::Global => "global",
            ConfigScope::Local => "local",
            ConfigScope::Worktree => "worktree",
        }
    }

    /// The `git config` option selecting this tier
    pub fn flag(&self) -> String {
        format!("--{}", self.as_str())
    }
}

impl fmt::Display for ConfigScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ConfigScope {
    type Err = GitError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "system" => Ok(ConfigScope::System),
            "global" => Ok(ConfigScope::Global),
            "local" => Ok(ConfigScope::Local),
            "worktree" => Ok(ConfigScope::Worktree),
            other => Err(GitError::invalid_argument(format!(
                "Unknown configuration scope '{}'; expected system, global, local or worktree",
                other
            ))),
        }
    }
}

/// A name/email pair; `None` means the key is not set
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub name: Option<String>,
    pub email: Option<String>,
}

impl Identity {
    pub fn new(name: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            email: Some(email.into()),
        }
    }
}

/// An author or committer override and what to put back afterwards
///
/// A persistent override is written once and never restored. A temporary one
/// carries the values found at its scope before anything was changed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TemporaryIdentity {
    kind: IdentityKind,
    scope: ConfigScope,
    replacement: Identity,
    original: Option<Identity>,
}

impl TemporaryIdentity {
    pub fn persistent(kind: IdentityKind, scope: ConfigScope, replacement: Identity) -> Self {
        Self {
            kind,
            scope,
            replacement,
            original: None,
        }
    }

    pub fn temporary(
        kind: IdentityKind,
        scope: ConfigScope,
        replacement: Identity,
        original: Identity,
    ) -> Self {
        Self {
            kind,
            scope,
            replacement,
            original: Some(original),
        }
    }

    pub fn kind(&self) -> IdentityKind {
        self.kind
    }

    pub fn scope(&self) -> ConfigScope {
        self.scope
    }

    pub fn replacement(&self) -> &Identity {
        &self.replacement
    }

    /// Snapshot taken before the override, `None` when persistent
    pub fn original(&self) -> Option<&Identity> {
        self.original.as_ref()
    }

    pub fn is_persistent(&self) -> bool {
        self.original.is_none()
    }
}

fn config_base(scope: Option<ConfigScope>) -> Vec<String> {
    let mut args = vec!["config".to_string()];
    if let Some(scope) = scope {
        args.push(scope.flag());
    }
    args
}

/// `git config [--scope] <kind>.<key>`
pub fn config_get_args(kind: IdentityKind, key: &str, scope: Option<ConfigScope>) -> Vec<String> {
    let mut args = config_base(scope);
    args.push(format!("{}.{}", kind, key));
    args
}

/// `git config --scope <kind>.<key> <value>`
pub fn config_set_args(kind: IdentityKind, key: &str, value: &str, scope: ConfigScope) -> Vec<String> {
    let mut args = config_base(Some(scope));
    args.push(format!("{}.{}", kind, key));
    args.push(value.to_string());
    args
}

/// `git config --scope --unset <kind>.<key>`
pub fn config_unset_args(kind: IdentityKind, key: &str, scope: ConfigScope) -> Vec<String> {
    let mut args = config_base(Some(scope));
    args.push("--unset".to_string());
    args.push(format!("{}.{}", kind, key));
    args
}

/// Keeps temporary author/committer overrides applied while alive
///
/// Obtained from [`Repository::temporary_identity`]. Call [`release`] to
/// restore the original identities and see whether that worked; dropping the
/// guard without releasing it (early return, panic) restores them too and
/// logs any failure.
///
/// [`release`]: IdentityGuard::release
#[must_use = "dropping the guard immediately restores the original identities"]
pub struct IdentityGuard<'a, R: CommandRunner> {
    repo: &'a Repository<R>,
    armed: bool,
}

impl<'a, R: CommandRunner> IdentityGuard<'a, R> {
    pub(crate) fn acquire(repo: &'a Repository<R>) -> GitResult<Self> {
        let guard = Self { repo, armed: true };
        // A failure here drops the guard, which undoes what was applied.
        repo.apply_identity_overrides()?;
        Ok(guard)
    }

    /// Restore the original identities now
    pub fn release(mut self) -> GitResult<()> {
        self.armed = false;
        self.repo.restore_original_identities()
    }
}

impl<R: CommandRunner> Drop for IdentityGuard<'_, R> {
    fn drop(&mut self) {
        if self.armed
            && let Err(e) = self.repo.restore_original_identities()
        {
            tracing::warn!(error = %e, "failed to restore original git identity");
        }
    }
}
