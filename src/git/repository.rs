use crate::config::Config;
use crate::error::{GitError, GitResult};
use crate::git::command::{
    self, ChangeScope, CheckoutOptions, CommitOptions, DescribeOptions, LogOptions, PushOptions,
    StashInclude,
};
use crate::git::executor::{CommandOutput, CommandRunner, GitExecutor, RunOptions};
use crate::git::identity::{
    self, ConfigScope, Identity, IdentityGuard, IdentityKind, TemporaryIdentity,
};
use crate::git::parser::{
    self, BranchSet, ChangeSet, CommitRecord, RemoteTable, RepoName, RepoNameQuery, TagGroup,
};
use crate::git::version::GitVersion;
use std::env;
use std::path::{Path, PathBuf};
use tracing::instrument;

/// Host whose URLs `remote_repo_name` understands unless configured otherwise
pub const DEFAULT_REMOTE_HOST: &str = "github.com";

/// Exit status of `git config --unset` when the key does not exist
const CONFIG_KEY_MISSING: i32 = 5;

/// An identity to write at construction time
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdentityOverride {
    pub identity: Identity,
    pub scope: ConfigScope,
    /// Written once and left in place instead of being applied around each
    /// credential-needing operation. Ignored for the `user` identity, which
    /// is always written permanently.
    pub persistent: bool,
}

impl IdentityOverride {
    pub fn temporary(identity: Identity, scope: ConfigScope) -> Self {
        Self {
            identity,
            scope,
            persistent: false,
        }
    }

    pub fn persistent(identity: Identity, scope: ConfigScope) -> Self {
        Self {
            identity,
            scope,
            persistent: true,
        }
    }
}

/// How to set up a [`Repository`]
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RepositoryOptions {
    pub user: Option<IdentityOverride>,
    pub author: Option<IdentityOverride>,
    pub committer: Option<IdentityOverride>,
    /// Hosting provider for `remote_repo_name`, [`DEFAULT_REMOTE_HOST`] if unset
    pub remote_host: Option<String>,
}

/// A git working tree, addressed through its top-level directory
///
/// Every operation runs one git command (or a short fixed sequence) through
/// the configured [`CommandRunner`] and decodes what it prints. Operations
/// that create commits, tags or pushes run with the temporary author and
/// committer identities applied.
#[derive(Debug)]
pub struct Repository<R: CommandRunner = GitExecutor> {
    path: PathBuf,
    runner: R,
    remote_host: String,
    author: Option<TemporaryIdentity>,
    committer: Option<TemporaryIdentity>,
}

impl Repository<GitExecutor> {
    /// Open the repository containing the current working directory
    pub fn discover() -> GitResult<Self> {
        let current_dir = env::current_dir()?;
        Self::open(current_dir, RepositoryOptions::default())
    }

    /// Open the repository containing `path`
    pub fn open<P: AsRef<Path>>(path: P, options: RepositoryOptions) -> GitResult<Self> {
        Self::with_runner(GitExecutor::new(), path, options)
    }

    /// Open the repository containing `path` with the executable, host and
    /// identities from `config`
    pub fn open_with_config<P: AsRef<Path>>(path: P, config: &Config) -> GitResult<Self> {
        let runner = GitExecutor::with_program(&config.git.executable);
        Self::with_runner(runner, path, config.repository_options())
    }
}

impl<R: CommandRunner> Repository<R> {
    /// Open the repository containing `path`, running git through `runner`
    ///
    /// Checks that git is available, resolves the top-level directory, writes
    /// the `user` identity and any persistent author/committer identity, and
    /// snapshots the current values behind temporary ones.
    #[instrument(skip_all, fields(path = %path.as_ref().display()))]
    pub fn with_runner<P: AsRef<Path>>(runner: R, path: P, options: RepositoryOptions) -> GitResult<Self> {
        let start = path.as_ref();
        let mut start = start
            .canonicalize()
            .map_err(|_| GitError::RepositoryNotFound(start.to_path_buf()))?;
        // git runs in a directory; a file stands for the directory holding it
        if !start.is_dir() {
            match start.parent() {
                Some(parent) => start = parent.to_path_buf(),
                None => return Err(GitError::RepositoryNotFound(start)),
            }
        }

        let version = GitVersion::validate(&runner, &start)?;
        tracing::info!(%version, "git found");

        let toplevel = runner.run(&command::toplevel_args(), &start, RunOptions::UNCHECKED)?;
        if !toplevel.success || toplevel.output().is_empty() {
            return Err(GitError::RepositoryNotFound(start));
        }

        let mut repo = Self {
            path: PathBuf::from(toplevel.output()),
            runner,
            remote_host: options
                .remote_host
                .unwrap_or_else(|| DEFAULT_REMOTE_HOST.to_string()),
            author: None,
            committer: None,
        };
        tracing::info!(path = %repo.path.display(), "git repository resolved");

        if let Some(user) = &options.user {
            repo.write_identity(IdentityKind::User, &user.identity, user.scope)?;
        }
        repo.author = repo.prepare_override(IdentityKind::Author, options.author)?;
        repo.committer = repo.prepare_override(IdentityKind::Committer, options.committer)?;

        Ok(repo)
    }

    /// Get the repository's top-level directory
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Get the runner this repository executes git through
    pub fn runner(&self) -> &R {
        &self.runner
    }

    pub fn remote_host(&self) -> &str {
        &self.remote_host
    }

    pub fn author(&self) -> Option<&TemporaryIdentity> {
        self.author.as_ref()
    }

    pub fn committer(&self) -> Option<&TemporaryIdentity> {
        self.committer.as_ref()
    }

    fn run(&self, args: &[String], options: RunOptions) -> GitResult<CommandOutput> {
        self.runner.run(args, &self.path, options)
    }

    fn run_strict(&self, args: &[String]) -> GitResult<CommandOutput> {
        self.run(args, RunOptions::STRICT)
    }

    /// Run an arbitrary git command in the repository
    ///
    /// With `needs_credentials` the command runs inside
    /// [`with_temporary_identity`](Self::with_temporary_identity).
    pub fn run_command(
        &self,
        args: &[String],
        needs_credentials: bool,
        options: RunOptions,
    ) -> GitResult<CommandOutput> {
        if needs_credentials {
            self.with_temporary_identity(|repo| repo.run(args, options))
        } else {
            self.run(args, options)
        }
    }

    // ---- identities ----

    /// Write or unset an identity at `scope`
    ///
    /// For each field: `None` unsets the key, an empty string leaves it
    /// untouched, anything else is written.
    pub fn set_identity(
        &self,
        kind: IdentityKind,
        name: Option<&str>,
        email: Option<&str>,
        scope: ConfigScope,
    ) -> GitResult<()> {
        for (key, value) in [("name", name), ("email", email)] {
            match value {
                None => self.unset_identity_key(kind, key, scope)?,
                Some("") => {}
                Some(value) => {
                    self.run_strict(&identity::config_set_args(kind, key, value, scope))?;
                }
            }
        }
        tracing::debug!(%kind, %scope, "identity updated");
        Ok(())
    }

    fn write_identity(&self, kind: IdentityKind, identity: &Identity, scope: ConfigScope) -> GitResult<()> {
        self.set_identity(kind, identity.name.as_deref(), identity.email.as_deref(), scope)
    }

    fn unset_identity_key(&self, kind: IdentityKind, key: &str, scope: ConfigScope) -> GitResult<()> {
        let output = self.run(
            &identity::config_unset_args(kind, key, scope),
            RunOptions::UNCHECKED,
        )?;
        if !output.success && output.exit_code != CONFIG_KEY_MISSING {
            return Err(GitError::operation(format!(
                "Failed to unset {}.{} ({} scope): {}",
                kind,
                key,
                scope,
                output.stderr.trim()
            )));
        }
        Ok(())
    }

    /// Put a snapshot back exactly: `None` unsets, any value (even `""`) is written
    fn restore_identity(&self, kind: IdentityKind, snapshot: &Identity, scope: ConfigScope) -> GitResult<()> {
        for (key, value) in [("name", &snapshot.name), ("email", &snapshot.email)] {
            match value {
                None => self.unset_identity_key(kind, key, scope)?,
                Some(value) => {
                    self.run_strict(&identity::config_set_args(kind, key, value, scope))?;
                }
            }
        }
        tracing::debug!(%kind, %scope, "identity restored");
        Ok(())
    }

    /// Read an identity, from one scope or from git's merged view
    ///
    /// An unset key reads as `None`; any other failure is an error.
    pub fn get_identity(&self, kind: IdentityKind, scope: Option<ConfigScope>) -> GitResult<Identity> {
        let read = |key: &str| -> GitResult<Option<String>> {
            let output = self.run(&identity::config_get_args(kind, key, scope), RunOptions::UNCHECKED)?;
            match output.exit_code {
                0 => Ok(Some(output.stdout.trim_end_matches(['\n', '\r']).to_string())),
                1 if output.stdout.trim().is_empty() => Ok(None),
                _ => Err(GitError::operation(format!(
                    "Failed to get {}.{}: {}",
                    kind,
                    key,
                    output.stderr.trim()
                ))),
            }
        };

        Ok(Identity {
            name: read("name")?,
            email: read("email")?,
        })
    }

    fn prepare_override(
        &self,
        kind: IdentityKind,
        requested: Option<IdentityOverride>,
    ) -> GitResult<Option<TemporaryIdentity>> {
        let Some(requested) = requested else {
            return Ok(None);
        };

        if requested.persistent {
            self.write_identity(kind, &requested.identity, requested.scope)?;
            return Ok(Some(TemporaryIdentity::persistent(
                kind,
                requested.scope,
                requested.identity,
            )));
        }

        let original = self.get_identity(kind, Some(requested.scope))?;
        tracing::debug!(%kind, scope = %requested.scope, ?original, "identity snapshot taken");
        Ok(Some(TemporaryIdentity::temporary(
            kind,
            requested.scope,
            requested.identity,
            original,
        )))
    }

    fn temporary_roles(&self) -> impl Iterator<Item = &TemporaryIdentity> {
        [self.author.as_ref(), self.committer.as_ref()]
            .into_iter()
            .flatten()
            .filter(|role| !role.is_persistent())
    }

    pub(crate) fn apply_identity_overrides(&self) -> GitResult<()> {
        for role in self.temporary_roles() {
            self.write_identity(role.kind(), role.replacement(), role.scope())?;
        }
        Ok(())
    }

    /// Put back every snapshot, even if one of them fails; reports the first failure
    pub(crate) fn restore_original_identities(&self) -> GitResult<()> {
        let mut first_error = None;
        for role in self.temporary_roles() {
            let Some(original) = role.original() else {
                continue;
            };
            if let Err(e) = self.restore_identity(role.kind(), original, role.scope()) {
                tracing::warn!(kind = %role.kind(), error = %e, "identity restore failed");
                first_error.get_or_insert(e);
            }
        }
        first_error.map_or(Ok(()), Err)
    }

    /// Apply the temporary identities until the returned guard is released or dropped
    pub fn temporary_identity(&self) -> GitResult<IdentityGuard<'_, R>> {
        IdentityGuard::acquire(self)
    }

    /// Run `f` with the temporary identities applied
    ///
    /// The originals are restored whether or not `f` succeeds. When `f`
    /// fails its error is returned even if restoring fails too.
    pub fn with_temporary_identity<T, F>(&self, f: F) -> GitResult<T>
    where
        F: FnOnce(&Self) -> GitResult<T>,
    {
        let guard = self.temporary_identity()?;
        let result = f(self);
        let restored = guard.release();

        match result {
            Ok(value) => restored.map(|()| value),
            Err(e) => {
                if let Err(restore_error) = restored {
                    tracing::warn!(error = %restore_error, "identity restore failed after error");
                }
                Err(e)
            }
        }
    }

    // ---- commits and pushes ----

    /// Stage, then commit if there is anything to commit
    ///
    /// Returns the new commit's hash, or `None` when nothing was staged and
    /// `allow_empty` is off (git is not asked to commit in that case).
    #[instrument(skip_all, fields(stage = ?options.stage, amend = options.amend))]
    pub fn commit(&self, options: &CommitOptions) -> GitResult<Option<String>> {
        let commit = command::commit_args(options)?;

        if let Some(stage) = command::stage_args(options.stage) {
            self.run_command(&stage, true, RunOptions::STRICT)?;
        }

        if !options.allow_empty && !self.has_changes(ChangeScope::Staged)? {
            tracing::info!("No changes to commit");
            return Ok(None);
        }

        self.run_command(&commit, true, RunOptions::STRICT)?;
        let hash = self.commit_hash(0)?;
        tracing::info!(%hash, "commit created");
        Ok(Some(hash))
    }

    #[instrument(skip_all, fields(target = ?options.target, ref_name = ?options.ref_name))]
    pub fn push(&self, options: &PushOptions) -> GitResult<()> {
        let has_target = options.target.as_deref().is_some_and(|t| !t.is_empty());
        let needs_current = options.set_upstream
            && has_target
            && options.upstream_branch.as_deref().is_none_or(str::is_empty);
        let current = if needs_current {
            Some(self.current_branch_name()?)
        } else {
            None
        };

        let args = command::push_args(options, current.as_deref())?;
        self.run_command(&args, true, RunOptions::STRICT)?;
        Ok(())
    }

    /// Create a tag (annotated when `message` is given), optionally push it
    ///
    /// Returns `git show <tag>` output.
    #[instrument(skip(self, message))]
    pub fn create_tag(&self, tag: &str, message: Option<&str>, push_target: Option<&str>) -> GitResult<String> {
        self.run_command(&command::tag_args(tag, message), true, RunOptions::STRICT)?;
        let shown = self.run_strict(&command::show_args(tag))?;

        if let Some(target) = push_target.filter(|t| !t.is_empty()) {
            self.push(&PushOptions {
                target: Some(target.to_string()),
                ref_name: Some(tag.to_string()),
                ..PushOptions::default()
            })?;
        }
        Ok(shown.stdout)
    }

    // ---- queries ----

    /// Whether `git diff --quiet` sees changes in `scope`
    pub fn has_changes(&self, scope: ChangeScope) -> GitResult<bool> {
        for args in command::has_changes_args(scope) {
            let output = self.run(&args, RunOptions::UNCHECKED)?;
            match output.exit_code {
                0 => {}
                1 => return Ok(true),
                exit_code => {
                    return Err(GitError::CommandFailed {
                        command: args.join(" "),
                        exit_code,
                        stderr: output.stderr.trim().to_string(),
                    });
                }
            }
        }
        Ok(false)
    }

    /// Files changed between two revisions
    pub fn changed_files(&self, ref_start: &str, ref_end: &str) -> GitResult<ChangeSet> {
        let output = self.run_strict(&command::diff_name_status_args(ref_start, ref_end))?;
        parser::parse_name_status(&output.stdout)
    }

    /// Hash of `HEAD~parent`
    pub fn commit_hash(&self, parent: u32) -> GitResult<String> {
        let output = self.run_strict(&command::commit_hash_args(parent))?;
        Ok(output.output().to_string())
    }

    /// `git describe`; `None` if nothing describes HEAD
    pub fn describe(&self, options: &DescribeOptions) -> GitResult<Option<String>> {
        let output = self.run(&command::describe_args(options), RunOptions::UNCHECKED)?;
        Ok(output.success.then(|| output.output().to_string()))
    }

    /// Raw `git log` output
    pub fn log(&self, options: &LogOptions) -> GitResult<String> {
        Ok(self.run_strict(&command::log_args(options))?.stdout)
    }

    /// Commits in `revision_range` (or reachable from HEAD), newest first
    pub fn commits(&self, revision_range: Option<&str>) -> GitResult<Vec<CommitRecord>> {
        let output = self.run_strict(&command::commits_log_args(revision_range))?;
        let commits = parser::parse_commits(&output.stdout)?;
        tracing::info!(count = commits.len(), "commits decoded");
        Ok(commits)
    }

    /// Number of commits in `ref_start..ref_end`
    pub fn distance(&self, ref_start: &str, ref_end: &str) -> GitResult<usize> {
        let output = self.run_strict(&command::distance_args(ref_start, ref_end))?;
        output.output().parse::<usize>().map_err(|_| {
            GitError::operation(format!("Unexpected rev-list count: {:?}", output.output()))
        })
    }

    /// Tags merged into the current branch, one cluster per commit, newest first
    pub fn tags(&self) -> GitResult<TagGroup> {
        let decorations = self.log(&LogOptions::decorations())?;
        let merged = self.run_strict(&command::tag_merged_args())?;
        Ok(parser::parse_tags(&decorations, &merged.stdout))
    }

    pub fn remotes(&self) -> GitResult<RemoteTable> {
        let output = self.run_strict(&command::remote_list_args())?;
        parser::parse_remotes(&output.stdout)
    }

    /// Owner and name of the hosted repository behind a remote
    pub fn remote_repo_name(&self, query: &RepoNameQuery) -> GitResult<Option<RepoName>> {
        let remotes = self.remotes()?;
        let found = parser::select_repo_name(&remotes, query, &self.remote_host);
        if found.is_none() {
            tracing::info!(remote = %query.remote, purpose = %query.purpose, "no repository name in remote URLs");
        }
        Ok(found)
    }

    /// Content of `path` at `commit_hash`
    ///
    /// A missing file is an error when `raise_missing`, otherwise `None`.
    pub fn file_at_hash(&self, commit_hash: &str, path: &str, raise_missing: bool) -> GitResult<Option<String>> {
        let output = self.run(&command::file_at_hash_args(commit_hash, path), RunOptions::UNCHECKED)?;
        if !output.success || !output.stderr.trim().is_empty() {
            if raise_missing {
                return Err(GitError::operation(format!(
                    "Failed to get file '{}' at commit '{}'",
                    path, commit_hash
                )));
            }
            return Ok(None);
        }
        Ok(Some(output.stdout))
    }

    /// True when no tracked file resolves to `text: auto`
    pub fn check_gitattributes(&self) -> GitResult<bool> {
        let files = self.run_strict(&command::ls_files_args())?;
        let files: Vec<&str> = files.stdout.lines().filter(|f| !f.is_empty()).collect();
        if files.is_empty() {
            return Ok(true);
        }

        for args in command::check_attr_batches(&files) {
            let attributes = self.run_strict(&args)?;
            if attributes.stdout.lines().any(|line| line.contains("text: auto")) {
                return Ok(false);
            }
        }
        Ok(true)
    }

    // ---- branches ----

    pub fn current_branch_name(&self) -> GitResult<String> {
        Ok(self.run_strict(&command::current_branch_args())?.output().to_string())
    }

    /// The current branch and all other local branches
    pub fn branch_names(&self) -> GitResult<BranchSet> {
        let output = self.run_strict(&command::branch_list_args())?;
        parser::parse_branch_list(&output.stdout)
    }

    pub fn branch_delete(&self, branch_name: &str, force: bool) -> GitResult<()> {
        self.run_strict(&command::branch_delete_args(branch_name, force))?;
        Ok(())
    }

    /// Rename the current branch
    pub fn branch_rename(&self, new_name: &str, force: bool) -> GitResult<()> {
        self.run_strict(&command::branch_rename_args(new_name, force))?;
        Ok(())
    }

    pub fn checkout(&self, branch: &str, options: CheckoutOptions) -> GitResult<()> {
        self.run_strict(&command::checkout_args(branch, options))?;
        Ok(())
    }

    /// Fetch the branches of `remote_name` whose names match `pattern`
    ///
    /// Returns the branches that were fetched.
    #[instrument(skip(self, pattern), fields(pattern = pattern.map(|p| p.as_str())))]
    pub fn fetch_remote_branches_by_pattern(
        &self,
        pattern: Option<&glob::Pattern>,
        remote_name: &str,
        exists_ok: bool,
        not_fast_forward_ok: bool,
    ) -> GitResult<Vec<String>> {
        let output = self.run_strict(&command::remote_branch_list_args())?;
        let names = parser::parse_remote_branches(&output.stdout, remote_name, pattern);
        self.fetch_remote_branches_by_name(&names, remote_name, exists_ok, not_fast_forward_ok)
    }

    /// Fetch `branch_names` from `remote_name` into same-named local branches
    ///
    /// Unless `exists_ok`, branches that already exist locally are left out.
    /// Returns the branches that were fetched.
    pub fn fetch_remote_branches_by_name<S: AsRef<str>>(
        &self,
        branch_names: &[S],
        remote_name: &str,
        exists_ok: bool,
        not_fast_forward_ok: bool,
    ) -> GitResult<Vec<String>> {
        let mut names: Vec<String> = branch_names.iter().map(|n| n.as_ref().to_string()).collect();
        if !exists_ok {
            let local = self.branch_names()?;
            names.retain(|name| !local.contains(name));
        }

        if names.is_empty() {
            tracing::info!(remote = remote_name, "no branches to fetch");
            return Ok(names);
        }

        let refspecs = command::fetch_refspecs(&names, not_fast_forward_ok);
        self.run_strict(&command::fetch_args(remote_name, &refspecs))?;
        tracing::info!(remote = remote_name, count = names.len(), "branches fetched");
        Ok(names)
    }

    pub fn pull(&self, fast_forward_only: bool) -> GitResult<()> {
        self.run_strict(&command::pull_args(fast_forward_only))?;
        Ok(())
    }

    // ---- working tree ----

    /// Revert uncommitted changes under `path` to the last commit
    pub fn discard_changes(&self, path: &str) -> GitResult<()> {
        self.run_strict(&command::discard_changes_args(path))?;
        Ok(())
    }

    pub fn stash(&self, include: StashInclude, name: Option<&str>) -> GitResult<()> {
        self.run_strict(&command::stash_args(include, name))?;
        Ok(())
    }

    /// Reapply and drop the latest stash; an empty stash list is not an error
    pub fn stash_pop(&self) -> GitResult<()> {
        let output = self.run(&command::stash_pop_args(), RunOptions::UNCHECKED)?;
        if !output.success {
            tracing::info!(stderr = %output.stderr.trim(), "stash pop did not apply");
        }
        Ok(())
    }
}
