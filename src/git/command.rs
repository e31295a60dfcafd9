//! Argument vectors for the git operations the facade performs.
//!
//! Builders are pure: they validate their options and return the arguments
//! that follow the `git` executable, nothing more.

use crate::error::{GitError, GitResult};
use crate::git::parser::{COMMIT_END_MARKER, COMMIT_START_MARKER};

fn argv<const N: usize>(parts: [&str; N]) -> Vec<String> {
    parts.iter().map(|part| part.to_string()).collect()
}

/// What to stage before committing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Stage {
    /// Tracked and untracked changes (`add -A`)
    #[default]
    All,
    /// Changes to tracked files only (`add -u`)
    Tracked,
    /// Commit whatever is already staged
    None,
}

/// `git add` invocation for a staging mode, if it stages anything
pub fn stage_args(stage: Stage) -> Option<Vec<String>> {
    match stage {
        Stage::All => Some(argv(["add", "-A"])),
        Stage::Tracked => Some(argv(["add", "-u"])),
        Stage::None => None,
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommitOptions {
    pub message: String,
    pub stage: Stage,
    pub amend: bool,
    pub allow_empty: bool,
}

impl CommitOptions {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            ..Self::default()
        }
    }
}

/// `git commit` arguments
///
/// Each non-blank message line becomes its own `-m` paragraph. An amend
/// without a message keeps the previous one (`--no-edit`).
pub fn commit_args(options: &CommitOptions) -> GitResult<Vec<String>> {
    let has_message = !options.message.trim().is_empty();
    if !options.amend && !has_message {
        return Err(GitError::invalid_argument(
            "No 'message' provided for new commit",
        ));
    }

    let mut args = argv(["commit"]);
    if options.amend {
        args.push("--amend".to_string());
        if !has_message {
            args.push("--no-edit".to_string());
        }
    }
    if options.allow_empty {
        args.push("--allow-empty".to_string());
    }
    for line in options.message.lines().filter(|line| !line.trim().is_empty()) {
        args.push("-m".to_string());
        args.push(line.to_string());
    }
    Ok(args)
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PushOptions {
    /// Remote to push to
    pub target: Option<String>,
    /// Ref to push (branch, tag, refspec)
    pub ref_name: Option<String>,
    pub set_upstream: bool,
    /// Upstream branch; defaults to the current branch
    pub upstream_branch: Option<String>,
    /// Force, but only if the remote tip is still what we last fetched
    pub force_with_lease: bool,
}

/// `git push` arguments
///
/// `current_branch` is used as the upstream name when `set_upstream` is
/// requested without an explicit `upstream_branch`.
pub fn push_args(options: &PushOptions, current_branch: Option<&str>) -> GitResult<Vec<String>> {
    let mut args = argv(["push"]);

    if options.set_upstream {
        let target = options
            .target
            .as_deref()
            .filter(|target| !target.is_empty())
            .ok_or_else(|| {
                GitError::invalid_argument("No 'target' provided while 'set_upstream' is set")
            })?;
        let branch = options
            .upstream_branch
            .as_deref()
            .filter(|branch| !branch.is_empty())
            .or(current_branch)
            .ok_or_else(|| GitError::invalid_argument("No upstream branch name available"))?;
        args.push("--set-upstream".to_string());
        args.push(target.to_string());
        args.push(branch.to_string());
    } else if let Some(target) = options.target.as_deref().filter(|t| !t.is_empty()) {
        args.push(target.to_string());
    }

    if let Some(ref_name) = options.ref_name.as_deref().filter(|r| !r.is_empty()) {
        args.push(ref_name.to_string());
    }
    if options.force_with_lease {
        args.push("--force-with-lease".to_string());
    }
    Ok(args)
}

/// `git tag`: lightweight without a message, annotated with one
pub fn tag_args(tag: &str, message: Option<&str>) -> Vec<String> {
    match message.filter(|m| !m.is_empty()) {
        Some(message) => argv(["tag", "-a", tag, "-m", message]),
        None => argv(["tag", tag]),
    }
}

pub fn show_args(object: &str) -> Vec<String> {
    argv(["show", object])
}

/// `git show <hash>:<path>`
pub fn file_at_hash_args(commit_hash: &str, path: &str) -> Vec<String> {
    vec!["show".to_string(), format!("{}:{}", commit_hash, path)]
}

/// Which tags `git log --tags` should walk from
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum TagFilter {
    #[default]
    Off,
    All,
    Pattern(String),
}

/// Flags for `git log`; anything left unset uses git's default
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LogOptions {
    pub number: Option<usize>,
    pub simplify_by_decoration: bool,
    pub tags: TagFilter,
    pub pretty: Option<String>,
    pub date: Option<String>,
    pub revision_range: Option<String>,
    pub paths: Vec<String>,
}

impl LogOptions {
    /// One line of ref decorations per decorated commit, newest first
    pub fn decorations() -> Self {
        Self {
            simplify_by_decoration: true,
            tags: TagFilter::All,
            pretty: Some("format:%D".to_string()),
            ..Self::default()
        }
    }
}

pub fn log_args(options: &LogOptions) -> Vec<String> {
    let mut args = argv(["log"]);

    if let Some(number) = options.number.filter(|n| *n > 0) {
        args.push(format!("-{}", number));
    }
    if options.simplify_by_decoration {
        args.push("--simplify-by-decoration".to_string());
    }
    match &options.tags {
        TagFilter::Off => {}
        TagFilter::All => args.push("--tags".to_string()),
        TagFilter::Pattern(pattern) => args.push(format!("--tags={}", pattern)),
    }
    if let Some(pretty) = options.pretty.as_deref().filter(|p| !p.is_empty()) {
        args.push(format!("--pretty={}", pretty));
    }
    if let Some(date) = options.date.as_deref().filter(|d| !d.is_empty()) {
        args.push(format!("--date={}", date));
    }
    if let Some(range) = options.revision_range.as_deref().filter(|r| !r.is_empty()) {
        args.push(range.to_string());
    }
    if !options.paths.is_empty() {
        args.push("--".to_string());
        args.extend(options.paths.iter().cloned());
    }
    args
}

/// `git log` in the record format [`parse_commits`] reads
///
/// [`parse_commits`]: crate::git::parser::parse_commits
pub fn commits_log_args(revision_range: Option<&str>) -> Vec<String> {
    let format = format!(
        "{}%n%H%n%an%n%ad%n%B%n{}",
        COMMIT_START_MARKER, COMMIT_END_MARKER
    );
    let mut args = vec![
        "log".to_string(),
        format!("--pretty=format:{}", format),
        "--name-only".to_string(),
    ];
    if let Some(range) = revision_range.filter(|r| !r.is_empty()) {
        args.push(range.to_string());
    }
    args
}

/// Which side of the working tree to probe for changes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ChangeScope {
    Staged,
    Unstaged,
    #[default]
    All,
}

/// `git diff --quiet` probes; any nonzero exit means changes
pub fn has_changes_args(scope: ChangeScope) -> Vec<Vec<String>> {
    let staged = argv(["diff", "--quiet", "--cached"]);
    let unstaged = argv(["diff", "--quiet"]);
    match scope {
        ChangeScope::Staged => vec![staged],
        ChangeScope::Unstaged => vec![unstaged],
        ChangeScope::All => vec![staged, unstaged],
    }
}

pub fn diff_name_status_args(ref_start: &str, ref_end: &str) -> Vec<String> {
    argv(["diff", "--name-status", ref_start, ref_end])
}

/// `git rev-parse HEAD~<parent>`
pub fn commit_hash_args(parent: u32) -> Vec<String> {
    vec!["rev-parse".to_string(), format!("HEAD~{}", parent)]
}

/// `git rev-list --count <start>..<end>`
pub fn distance_args(ref_start: &str, ref_end: &str) -> Vec<String> {
    vec![
        "rev-list".to_string(),
        "--count".to_string(),
        format!("{}..{}", ref_start, ref_end),
    ]
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DescribeOptions {
    pub abbrev: Option<u32>,
    pub first_parent: bool,
    /// Only consider tags matching this glob
    pub match_pattern: Option<String>,
}

impl Default for DescribeOptions {
    fn default() -> Self {
        Self {
            abbrev: None,
            first_parent: true,
            match_pattern: None,
        }
    }
}

pub fn describe_args(options: &DescribeOptions) -> Vec<String> {
    let mut args = argv(["describe"]);
    if let Some(abbrev) = options.abbrev {
        args.push(format!("--abbrev={}", abbrev));
    }
    if options.first_parent {
        args.push("--first-parent".to_string());
    }
    if let Some(pattern) = options.match_pattern.as_deref().filter(|p| !p.is_empty()) {
        args.push("--match".to_string());
        args.push(pattern.to_string());
    }
    args
}

pub fn current_branch_args() -> Vec<String> {
    argv(["branch", "--show-current"])
}

pub fn branch_list_args() -> Vec<String> {
    argv(["branch"])
}

pub fn remote_branch_list_args() -> Vec<String> {
    argv(["branch", "-r"])
}

/// `git branch -d|-D <name>`; force deletes even if unmerged
pub fn branch_delete_args(branch_name: &str, force: bool) -> Vec<String> {
    argv(["branch", if force { "-D" } else { "-d" }, branch_name])
}

/// `git branch -m|-M <new>`; force renames over an existing branch
pub fn branch_rename_args(new_name: &str, force: bool) -> Vec<String> {
    argv(["branch", if force { "-M" } else { "-m" }, new_name])
}

/// The one effective `git checkout` mode
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckoutMode {
    /// Switch to an existing branch
    Switch,
    /// Create the branch, or reset it if it exists (`-B`)
    Reset,
    /// Create a new branch, failing if it exists (`-b`)
    Create,
    /// New branch with no parent (`--orphan`)
    Orphan,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CheckoutOptions {
    pub create: bool,
    pub reset: bool,
    pub orphan: bool,
}

impl CheckoutOptions {
    /// `reset` beats `create`, which beats `orphan`
    pub fn mode(&self) -> CheckoutMode {
        if self.reset {
            CheckoutMode::Reset
        } else if self.create {
            CheckoutMode::Create
        } else if self.orphan {
            CheckoutMode::Orphan
        } else {
            CheckoutMode::Switch
        }
    }
}

pub fn checkout_args(branch: &str, options: CheckoutOptions) -> Vec<String> {
    let mut args = argv(["checkout"]);
    match options.mode() {
        CheckoutMode::Reset => args.push("-B".to_string()),
        CheckoutMode::Create => args.push("-b".to_string()),
        CheckoutMode::Orphan => args.push("--orphan".to_string()),
        CheckoutMode::Switch => {}
    }
    args.push(branch.to_string());
    args
}

/// `git checkout -- <path>`
pub fn discard_changes_args(path: &str) -> Vec<String> {
    argv(["checkout", "--", path])
}

/// `<branch>:<branch>` refspecs, `+`-prefixed to allow non-fast-forward updates
pub fn fetch_refspecs<S: AsRef<str>>(branch_names: &[S], not_fast_forward_ok: bool) -> Vec<String> {
    let force = if not_fast_forward_ok { "+" } else { "" };
    branch_names
        .iter()
        .map(|name| format!("{}{}:{}", force, name.as_ref(), name.as_ref()))
        .collect()
}

pub fn fetch_args(remote_name: &str, refspecs: &[String]) -> Vec<String> {
    let mut args = argv(["fetch", remote_name]);
    args.extend(refspecs.iter().cloned());
    args
}

pub fn pull_args(fast_forward_only: bool) -> Vec<String> {
    let mut args = argv(["pull"]);
    if fast_forward_only {
        args.push("--ff-only".to_string());
    }
    args
}

/// Which files `git stash` takes along
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StashInclude {
    /// Tracked files only
    Tracked,
    /// Tracked and untracked files
    Untracked,
    /// Everything, ignored files included
    #[default]
    All,
}

pub fn stash_args(include: StashInclude, name: Option<&str>) -> Vec<String> {
    let mut args = argv(["stash", "push"]);
    match include {
        StashInclude::Tracked => {}
        StashInclude::Untracked => args.push("--include-untracked".to_string()),
        StashInclude::All => args.push("--all".to_string()),
    }
    if let Some(name) = name.filter(|n| !n.is_empty()) {
        args.push("-m".to_string());
        args.push(name.to_string());
    }
    args
}

pub fn stash_pop_args() -> Vec<String> {
    argv(["stash", "pop"])
}

pub fn tag_merged_args() -> Vec<String> {
    argv(["tag", "--merged"])
}

pub fn remote_list_args() -> Vec<String> {
    argv(["remote", "-v"])
}

pub fn toplevel_args() -> Vec<String> {
    argv(["rev-parse", "--show-toplevel"])
}

pub fn ls_files_args() -> Vec<String> {
    argv(["ls-files"])
}

/// Path bytes per `check-attr` invocation; keeps the command line well under
/// the smallest platform limit (32K characters on Windows)
const CHECK_ATTR_BATCH_BYTES: usize = 16 * 1024;

/// `git check-attr -a -- <files>`
pub fn check_attr_args<S: AsRef<str>>(files: &[S]) -> Vec<String> {
    let mut args = argv(["check-attr", "-a", "--"]);
    args.extend(files.iter().map(|f| f.as_ref().to_string()));
    args
}

/// [`check_attr_args`] split into invocations of bounded length
///
/// Every file lands in exactly one batch, in order. A single path longer than
/// the budget gets a batch of its own.
pub fn check_attr_batches<S: AsRef<str>>(files: &[S]) -> Vec<Vec<String>> {
    let mut batches = Vec::new();
    let mut start = 0;
    let mut bytes = 0;

    for (index, file) in files.iter().enumerate() {
        let len = file.as_ref().len() + 1;
        if index > start && bytes + len > CHECK_ATTR_BATCH_BYTES {
            batches.push(check_attr_args(&files[start..index]));
            start = index;
            bytes = 0;
        }
        bytes += len;
    }
    if start < files.len() {
        batches.push(check_attr_args(&files[start..]));
    }
    batches
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_commit_requires_message() {
        let result = commit_args(&CommitOptions::default());
        assert!(matches!(result, Err(GitError::InvalidArgument(_))));
    }

    #[test]
    fn test_commit_blank_message_rejected() {
        let result = commit_args(&CommitOptions::new("\n\n"));
        assert!(matches!(result, Err(GitError::InvalidArgument(_))));

        let options = CommitOptions {
            amend: true,
            ..CommitOptions::new(" \n")
        };
        assert_eq!(commit_args(&options).unwrap(), vec!["commit", "--amend", "--no-edit"]);
    }

    #[test]
    fn test_commit_message_lines() {
        let options = CommitOptions {
            allow_empty: true,
            ..CommitOptions::new("Title\n\nBody line")
        };
        assert_eq!(
            commit_args(&options).unwrap(),
            vec!["commit", "--allow-empty", "-m", "Title", "-m", "Body line"]
        );
    }

    #[test]
    fn test_commit_amend_no_edit() {
        let options = CommitOptions {
            amend: true,
            ..CommitOptions::default()
        };
        assert_eq!(commit_args(&options).unwrap(), vec!["commit", "--amend", "--no-edit"]);

        let reworded = CommitOptions {
            amend: true,
            ..CommitOptions::new("New message")
        };
        assert_eq!(
            commit_args(&reworded).unwrap(),
            vec!["commit", "--amend", "-m", "New message"]
        );
    }

    #[test]
    fn test_stage_args() {
        assert_eq!(stage_args(Stage::All).unwrap(), vec!["add", "-A"]);
        assert_eq!(stage_args(Stage::Tracked).unwrap(), vec!["add", "-u"]);
        assert!(stage_args(Stage::None).is_none());
    }

    #[test]
    fn test_push_set_upstream_requires_target() {
        let options = PushOptions {
            set_upstream: true,
            ..PushOptions::default()
        };
        assert!(matches!(
            push_args(&options, Some("main")),
            Err(GitError::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_push_set_upstream_defaults_to_current_branch() {
        let options = PushOptions {
            target: Some("origin".to_string()),
            set_upstream: true,
            force_with_lease: true,
            ..PushOptions::default()
        };
        assert_eq!(
            push_args(&options, Some("feature")).unwrap(),
            vec!["push", "--set-upstream", "origin", "feature", "--force-with-lease"]
        );
    }

    #[test]
    fn test_push_target_and_ref() {
        let options = PushOptions {
            target: Some("origin".to_string()),
            ref_name: Some("v1.0".to_string()),
            ..PushOptions::default()
        };
        assert_eq!(push_args(&options, None).unwrap(), vec!["push", "origin", "v1.0"]);
    }

    #[test]
    fn test_tag_args() {
        assert_eq!(tag_args("v1", None), vec!["tag", "v1"]);
        assert_eq!(tag_args("v1", Some("")), vec!["tag", "v1"]);
        assert_eq!(
            tag_args("v1", Some("Release 1")),
            vec!["tag", "-a", "v1", "-m", "Release 1"]
        );
    }

    #[test]
    fn test_log_args_defaults_to_bare_log() {
        assert_eq!(log_args(&LogOptions::default()), vec!["log"]);
    }

    #[test]
    fn test_log_args_all_flags() {
        let options = LogOptions {
            number: Some(5),
            simplify_by_decoration: true,
            tags: TagFilter::Pattern("v*".to_string()),
            pretty: Some("format:%H".to_string()),
            date: Some("iso".to_string()),
            revision_range: Some("v1..HEAD".to_string()),
            paths: vec!["src".to_string(), "docs".to_string()],
        };
        assert_eq!(
            log_args(&options),
            vec![
                "log",
                "-5",
                "--simplify-by-decoration",
                "--tags=v*",
                "--pretty=format:%H",
                "--date=iso",
                "v1..HEAD",
                "--",
                "src",
                "docs"
            ]
        );
    }

    #[test]
    fn test_log_decorations() {
        assert_eq!(
            log_args(&LogOptions::decorations()),
            vec!["log", "--simplify-by-decoration", "--tags", "--pretty=format:%D"]
        );
    }

    #[test]
    fn test_commits_log_args_format() {
        let args = commits_log_args(Some("main..feature"));
        assert_eq!(args[0], "log");
        assert_eq!(
            args[1],
            "--pretty=format:<start new commit>%n%H%n%an%n%ad%n%B%n<end of commit message>"
        );
        assert_eq!(args[2], "--name-only");
        assert_eq!(args[3], "main..feature");
        assert_eq!(commits_log_args(None).len(), 3);
    }

    #[test]
    fn test_checkout_mode_priority() {
        let all = CheckoutOptions {
            create: true,
            reset: true,
            orphan: true,
        };
        assert_eq!(all.mode(), CheckoutMode::Reset);
        assert_eq!(checkout_args("b", all), vec!["checkout", "-B", "b"]);

        let create_orphan = CheckoutOptions {
            create: true,
            orphan: true,
            ..CheckoutOptions::default()
        };
        assert_eq!(checkout_args("b", create_orphan), vec!["checkout", "-b", "b"]);

        let orphan = CheckoutOptions {
            orphan: true,
            ..CheckoutOptions::default()
        };
        assert_eq!(checkout_args("b", orphan), vec!["checkout", "--orphan", "b"]);
        assert_eq!(checkout_args("b", CheckoutOptions::default()), vec!["checkout", "b"]);
    }

    #[test]
    fn test_branch_force_variants() {
        assert_eq!(branch_delete_args("x", false), vec!["branch", "-d", "x"]);
        assert_eq!(branch_delete_args("x", true), vec!["branch", "-D", "x"]);
        assert_eq!(branch_rename_args("y", false), vec!["branch", "-m", "y"]);
        assert_eq!(branch_rename_args("y", true), vec!["branch", "-M", "y"]);
    }

    #[test]
    fn test_fetch_refspecs() {
        let branches = ["main", "dev"];
        assert_eq!(fetch_refspecs(&branches, false), vec!["main:main", "dev:dev"]);
        assert_eq!(fetch_refspecs(&branches, true), vec!["+main:main", "+dev:dev"]);
        assert_eq!(
            fetch_args("origin", &fetch_refspecs(&branches[..1], true)),
            vec!["fetch", "origin", "+main:main"]
        );
    }

    #[test]
    fn test_describe_args() {
        assert_eq!(describe_args(&DescribeOptions::default()), vec!["describe", "--first-parent"]);
        let options = DescribeOptions {
            abbrev: Some(0),
            first_parent: false,
            match_pattern: Some("v*".to_string()),
        };
        assert_eq!(
            describe_args(&options),
            vec!["describe", "--abbrev=0", "--match", "v*"]
        );
    }

    #[test]
    fn test_has_changes_args() {
        assert_eq!(has_changes_args(ChangeScope::Staged), vec![vec!["diff", "--quiet", "--cached"]]);
        assert_eq!(has_changes_args(ChangeScope::All).len(), 2);
    }

    #[test]
    fn test_stash_args() {
        assert_eq!(
            stash_args(StashInclude::Tracked, Some("wip")),
            vec!["stash", "push", "-m", "wip"]
        );
        assert_eq!(
            stash_args(StashInclude::Untracked, None),
            vec!["stash", "push", "--include-untracked"]
        );
        assert_eq!(stash_args(StashInclude::All, None), vec!["stash", "push", "--all"]);
    }

    #[test]
    fn test_misc_args() {
        assert_eq!(commit_hash_args(2), vec!["rev-parse", "HEAD~2"]);
        assert_eq!(distance_args("v1", "HEAD"), vec!["rev-list", "--count", "v1..HEAD"]);
        assert_eq!(file_at_hash_args("abc", "src/lib.rs"), vec!["show", "abc:src/lib.rs"]);
        assert_eq!(pull_args(true), vec!["pull", "--ff-only"]);
        assert_eq!(check_attr_args(&["a", "b"]), vec!["check-attr", "-a", "--", "a", "b"]);
    }

    #[test]
    fn test_check_attr_batches_bounded() {
        let files: Vec<String> = (0..30_000)
            .map(|i| format!("src/generated/module_{:05}/file.rs", i))
            .collect();
        let batches = check_attr_batches(&files);

        assert!(batches.len() > 1);
        for batch in &batches {
            assert_eq!(&batch[..3], ["check-attr", "-a", "--"]);
            let bytes: usize = batch[3..].iter().map(|f| f.len() + 1).sum();
            assert!(bytes <= CHECK_ATTR_BATCH_BYTES);
        }
        let covered: Vec<&String> = batches.iter().flat_map(|b| &b[3..]).collect();
        assert_eq!(covered.len(), files.len());
        assert_eq!(covered[0], &files[0]);
        assert_eq!(covered[29_999], &files[29_999]);
    }

    #[test]
    fn test_check_attr_batches_small_and_empty() {
        assert_eq!(check_attr_batches(&["a", "b"]), vec![check_attr_args(&["a", "b"])]);
        assert!(check_attr_batches::<&str>(&[]).is_empty());

        let long = "x".repeat(CHECK_ATTR_BATCH_BYTES * 2);
        let batches = check_attr_batches(&[long.as_str(), "b"]);
        assert_eq!(batches.len(), 2);
        assert_eq!(batches[1], check_attr_args(&["b"]));
    }
}
