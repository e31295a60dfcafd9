//! Decoders for the text formats git prints.
//!
//! Each decoder is a pure function of one output blob. Lines that break the
//! grammar a decoder documents are reported as [`GitError::Operation`]
//! rather than skipped.

use crate::error::{GitError, GitResult};
use serde::ser::{Serialize, SerializeMap, Serializer};
use std::collections::{BTreeMap, HashSet};
use std::fmt;
use std::str::FromStr;

/// First line of every record in the commit log format
pub const COMMIT_START_MARKER: &str = "<start new commit>";
/// Line that closes the message body of a commit record
pub const COMMIT_END_MARKER: &str = "<end of commit message>";

/// Single-path change categories from `diff --name-status`
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ChangeKind {
    Added,
    Deleted,
    Modified,
    Unmerged,
    Unknown,
    Broken,
}

impl ChangeKind {
    fn from_status(status: &str) -> Option<Self> {
        match status {
            "A" => Some(ChangeKind::Added),
            "D" => Some(ChangeKind::Deleted),
            "M" => Some(ChangeKind::Modified),
            "U" => Some(ChangeKind::Unmerged),
            "X" => Some(ChangeKind::Unknown),
            "B" => Some(ChangeKind::Broken),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ChangeKind::Added => "added",
            ChangeKind::Deleted => "deleted",
            ChangeKind::Modified => "modified",
            ChangeKind::Unmerged => "unmerged",
            ChangeKind::Unknown => "unknown",
            ChangeKind::Broken => "broken",
        }
    }
}

/// Path-pair change categories (copies and renames)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum PairKind {
    Copied,
    CopiedModified,
    Renamed,
    RenamedModified,
}

impl PairKind {
    /// Map a `C`/`R` letter and similarity score to a category
    ///
    /// Only an exact match (score 100) counts as unmodified.
    fn from_status(letter: char, similarity: u32) -> Option<Self> {
        let exact = similarity == 100;
        match (letter, exact) {
            ('C', true) => Some(PairKind::Copied),
            ('C', false) => Some(PairKind::CopiedModified),
            ('R', true) => Some(PairKind::Renamed),
            ('R', false) => Some(PairKind::RenamedModified),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            PairKind::Copied => "copied",
            PairKind::CopiedModified => "copied_modified",
            PairKind::Renamed => "renamed",
            PairKind::RenamedModified => "renamed_modified",
        }
    }
}

/// Index-aligned source and destination paths
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PathPairs {
    from: Vec<String>,
    to: Vec<String>,
}

impl PathPairs {
    fn push(&mut self, from: String, to: String) {
        self.from.push(from);
        self.to.push(to);
    }

    pub fn from(&self) -> &[String] {
        &self.from
    }

    pub fn to(&self) -> &[String] {
        &self.to
    }

    pub fn len(&self) -> usize {
        self.from.len()
    }

    pub fn is_empty(&self) -> bool {
        self.from.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.from
            .iter()
            .zip(self.to.iter())
            .map(|(from, to)| (from.as_str(), to.as_str()))
    }
}

/// Files changed between two revisions, grouped by kind of change
///
/// Serializes as a flat map: `added`, `modified`, ... for single paths and
/// `<category>_from` / `<category>_to` for copies and renames.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChangeSet {
    paths: BTreeMap<ChangeKind, Vec<String>>,
    pairs: BTreeMap<PairKind, PathPairs>,
}

impl ChangeSet {
    pub fn paths(&self, kind: ChangeKind) -> &[String] {
        self.paths.get(&kind).map(Vec::as_slice).unwrap_or_default()
    }

    pub fn pairs(&self, kind: PairKind) -> Option<&PathPairs> {
        self.pairs.get(&kind)
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty() && self.pairs.is_empty()
    }

    /// Look up a list by its flat key, e.g. `"added"` or `"renamed_from"`
    pub fn get(&self, key: &str) -> Option<&[String]> {
        if let Some(found) = self.paths.iter().find(|(kind, _)| kind.as_str() == key) {
            return Some(found.1.as_slice());
        }
        self.pairs.iter().find_map(|(kind, pairs)| {
            let rest = key.strip_prefix(kind.as_str())?;
            match rest {
                "_from" => Some(pairs.from()),
                "_to" => Some(pairs.to()),
                _ => None,
            }
        })
    }

    /// Flatten into the `category -> paths` form
    pub fn to_map(&self) -> BTreeMap<String, Vec<String>> {
        let mut map = BTreeMap::new();
        for (kind, paths) in &self.paths {
            map.insert(kind.as_str().to_string(), paths.clone());
        }
        for (kind, pairs) in &self.pairs {
            map.insert(format!("{}_from", kind.as_str()), pairs.from.clone());
            map.insert(format!("{}_to", kind.as_str()), pairs.to.clone());
        }
        map
    }
}

impl Serialize for ChangeSet {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_map(self.to_map())
    }
}

/// Parse `git diff --name-status` output
///
/// Grammar, one change per line: `STATUS<TAB>PATH` for the letters
/// `A D M U X B`, or `Cnnn<TAB>FROM<TAB>TO` / `Rnnn<TAB>FROM<TAB>TO` where
/// `nnn` is the similarity score. Any other status is an error.
pub fn parse_name_status(output: &str) -> GitResult<ChangeSet> {
    let mut changes = ChangeSet::default();

    for line in output.lines() {
        if line.trim().is_empty() {
            continue;
        }

        let mut fields = line.split('\t');
        let status = fields.next().unwrap_or_default().trim();
        let paths: Vec<&str> = fields.collect();

        if let Some(kind) = ChangeKind::from_status(status) {
            if paths.is_empty() {
                return Err(GitError::operation(format!(
                    "Change '{}' has no path: {:?}",
                    status, line
                )));
            }
            changes
                .paths
                .entry(kind)
                .or_default()
                .extend(paths.iter().map(|p| p.to_string()));
            continue;
        }

        let mut chars = status.chars();
        let letter = chars.next().ok_or_else(|| {
            GitError::operation(format!("Missing change status in line: {:?}", line))
        })?;
        let score = chars.as_str();
        let similarity = if score.is_empty() {
            100
        } else {
            score.parse::<u32>().map_err(|_| {
                GitError::operation(format!("Unknown file change type '{}'", status))
            })?
        };
        let kind = PairKind::from_status(letter, similarity)
            .ok_or_else(|| GitError::operation(format!("Unknown file change type '{}'", status)))?;

        match paths.as_slice() {
            [from, to] => changes
                .pairs
                .entry(kind)
                .or_default()
                .push(from.to_string(), to.to_string()),
            _ => {
                return Err(GitError::operation(format!(
                    "Change '{}' needs a source and a destination path: {:?}",
                    status, line
                )));
            }
        }
    }

    Ok(changes)
}

/// One commit from the sentinel-delimited log format
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct CommitRecord {
    pub hash: String,
    pub author: String,
    /// Date exactly as git formatted it
    pub date: String,
    pub message: String,
    pub files: Vec<String>,
}

/// Parse the output of `git log --name-only` with the commit format built by
/// [`commits_log_args`](crate::git::command::commits_log_args)
///
/// Each record is:
///
/// ```text
/// <start new commit>
/// HASH
/// AUTHOR
/// DATE
/// MESSAGE (any number of lines)
/// <end of commit message>
/// FILE...
/// ```
///
/// and the file list ends at the first blank line or the end of input.
pub fn parse_commits(output: &str) -> GitResult<Vec<CommitRecord>> {
    let mut commits = Vec::new();
    let mut records = output.split(COMMIT_START_MARKER);

    if let Some(leading) = records.next()
        && !leading.trim().is_empty()
    {
        return Err(GitError::operation(format!(
            "Unexpected text before the first commit record: {:?}",
            leading.trim()
        )));
    }

    for record in records {
        let record = record.strip_prefix('\n').unwrap_or(record);
        let (head, tail) = record.split_once(COMMIT_END_MARKER).ok_or_else(|| {
            GitError::operation("Commit record is missing its end-of-message marker")
        })?;

        let mut fields = head.splitn(4, '\n');
        let mut next_field = |name: &str| {
            fields
                .next()
                .map(str::trim)
                .ok_or_else(|| GitError::operation(format!("Commit record is missing its {}", name)))
        };
        let hash = next_field("hash")?.to_string();
        let author = next_field("author")?.to_string();
        let date = next_field("date")?.to_string();
        let message = fields.next().unwrap_or_default().trim().to_string();

        if hash.is_empty() {
            return Err(GitError::operation("Commit record has an empty hash"));
        }

        let file_block = tail.trim_start_matches(['\n', '\r']);
        let file_block = file_block.split("\n\n").next().unwrap_or_default();
        let files = file_block
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(String::from)
            .collect();

        commits.push(CommitRecord {
            hash,
            author,
            date,
            message,
            files,
        });
    }

    Ok(commits)
}

/// Tags grouped per commit, newest commit first
pub type TagGroup = Vec<Vec<String>>;

/// Cluster tags by commit
///
/// `decorations` is `git log --simplify-by-decoration --pretty=format:%D`
/// output: one line per commit, entries separated by `", "`, tags written as
/// `tag: NAME`. `merged_tags` is `git tag --merged`, one name per line; tags
/// missing from it are dropped.
pub fn parse_tags(decorations: &str, merged_tags: &str) -> TagGroup {
    let merged: HashSet<&str> = merged_tags
        .lines()
        .map(str::trim)
        .filter(|tag| !tag.is_empty())
        .collect();

    decorations
        .lines()
        .filter_map(|line| {
            let cluster: Vec<String> = line
                .trim()
                .split(", ")
                .filter_map(|entry| entry.strip_prefix("tag: "))
                .filter(|tag| merged.contains(tag))
                .map(String::from)
                .collect();
            (!cluster.is_empty()).then_some(cluster)
        })
        .collect()
}

/// What a remote URL is used for
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RemotePurpose {
    Fetch,
    Push,
}

impl RemotePurpose {
    pub fn as_str(&self) -> &'static str {
        match self {
            RemotePurpose::Fetch => "fetch",
            RemotePurpose::Push => "push",
        }
    }
}

impl fmt::Display for RemotePurpose {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RemotePurpose {
    type Err = GitError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "fetch" => Ok(RemotePurpose::Fetch),
            "push" => Ok(RemotePurpose::Push),
            other => Err(GitError::invalid_argument(format!(
                "Unknown remote purpose '{}'; expected 'fetch' or 'push'",
                other
            ))),
        }
    }
}

/// Remote URLs keyed by remote name, then purpose
///
/// Remotes keep the order git listed them in.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RemoteTable {
    remotes: Vec<(String, BTreeMap<RemotePurpose, String>)>,
}

impl RemoteTable {
    pub fn get(&self, name: &str) -> Option<&BTreeMap<RemotePurpose, String>> {
        self.remotes
            .iter()
            .find(|(remote, _)| remote == name)
            .map(|(_, urls)| urls)
    }

    pub fn url(&self, name: &str, purpose: RemotePurpose) -> Option<&str> {
        self.get(name)?.get(&purpose).map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &BTreeMap<RemotePurpose, String>)> {
        self.remotes.iter().map(|(name, urls)| (name.as_str(), urls))
    }

    pub fn len(&self) -> usize {
        self.remotes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.remotes.is_empty()
    }

    fn entry(&mut self, name: &str) -> &mut BTreeMap<RemotePurpose, String> {
        let index = match self.remotes.iter().position(|(remote, _)| remote == name) {
            Some(index) => index,
            None => {
                self.remotes.push((name.to_string(), BTreeMap::new()));
                self.remotes.len() - 1
            }
        };
        &mut self.remotes[index].1
    }
}

impl Serialize for RemoteTable {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.remotes.len()))?;
        for (name, urls) in &self.remotes {
            map.serialize_entry(name, urls)?;
        }
        map.end()
    }
}

/// Parse `git remote -v` output
///
/// Grammar, one entry per line: `NAME<WS>URL<WS>(PURPOSE)`. A repeated
/// `(NAME, PURPOSE)` pair is an error.
pub fn parse_remotes(output: &str) -> GitResult<RemoteTable> {
    let mut table = RemoteTable::default();

    for line in output.lines() {
        if line.trim().is_empty() {
            continue;
        }

        let fields: Vec<&str> = line.split_whitespace().collect();
        let [name, url, purpose_raw] = fields.as_slice() else {
            return Err(GitError::operation(format!(
                "Unexpected remote line (expected 3 fields): {:?}",
                line
            )));
        };

        let purpose = purpose_raw
            .strip_prefix('(')
            .and_then(|p| p.strip_suffix(')'))
            .unwrap_or(purpose_raw);
        let purpose = purpose.parse::<RemotePurpose>().map_err(|_| {
            GitError::operation(format!("Unknown purpose '{}' for remote '{}'", purpose, name))
        })?;

        let urls = table.entry(name);
        if urls.contains_key(&purpose) {
            return Err(GitError::operation(format!(
                "Duplicate remote purpose '{}' for remote '{}'",
                purpose, name
            )));
        }
        urls.insert(purpose, url.to_string());
    }

    Ok(table)
}

/// Owner and repository name of a hosted repository
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct RepoName {
    pub owner: String,
    pub repo: String,
}

fn is_word_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

/// Extract `(owner, repo)` from a remote URL on `host`
///
/// Matches `HOST[/:]OWNER/REPO[.git]` at the end of the URL, where OWNER is
/// word characters and `-`, and REPO additionally allows `.`. This covers
/// both `git@HOST:owner/repo.git` and `https://HOST/owner/repo`.
pub fn extract_repo_name(url: &str, host: &str) -> Option<RepoName> {
    if host.is_empty() {
        return None;
    }

    url.match_indices(host).find_map(|(start, _)| {
        let rest = &url[start + host.len()..];
        let rest = rest.strip_prefix('/').or_else(|| rest.strip_prefix(':'))?;
        let (owner, repo) = rest.split_once('/')?;
        let repo = match repo.strip_suffix(".git") {
            Some(stripped) if !stripped.is_empty() => stripped,
            _ => repo,
        };

        let owner_ok = !owner.is_empty() && owner.chars().all(|c| is_word_char(c) || c == '-');
        let repo_ok = !repo.is_empty()
            && repo
                .chars()
                .all(|c| is_word_char(c) || c == '-' || c == '.');
        (owner_ok && repo_ok).then(|| RepoName {
            owner: owner.to_string(),
            repo: repo.to_string(),
        })
    })
}

/// Which remote URL to read a repository name from, and how far to look
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepoNameQuery {
    pub remote: String,
    pub purpose: RemotePurpose,
    /// Try the remaining purposes of the same remote
    pub fallback_purpose: bool,
    /// Try the other remotes
    pub fallback_name: bool,
}

impl Default for RepoNameQuery {
    fn default() -> Self {
        Self {
            remote: "origin".to_string(),
            purpose: RemotePurpose::Push,
            fallback_purpose: true,
            fallback_name: true,
        }
    }
}

/// Resolve a repository name from a remote table
///
/// Order: the exact `(remote, purpose)`; then the other purposes of that
/// remote; then `purpose` on every other remote; then any purpose on any
/// other remote. The first URL that yields a name wins.
pub fn select_repo_name(remotes: &RemoteTable, query: &RepoNameQuery, host: &str) -> Option<RepoName> {
    let extract = |url: &String| extract_repo_name(url, host);

    if let Some(urls) = remotes.get(&query.remote) {
        if let Some(found) = urls.get(&query.purpose).and_then(extract) {
            return Some(found);
        }
        if query.fallback_purpose {
            let found = urls
                .iter()
                .filter(|(purpose, _)| **purpose != query.purpose)
                .find_map(|(_, url)| extract(url));
            if found.is_some() {
                return found;
            }
        }
    }

    if !query.fallback_name {
        return None;
    }

    let others = || remotes.iter().filter(|(name, _)| *name != query.remote);
    others()
        .find_map(|(_, urls)| urls.get(&query.purpose).and_then(extract))
        .or_else(|| {
            others().find_map(|(_, urls)| {
                urls.iter()
                    .filter(|(purpose, _)| **purpose != query.purpose)
                    .find_map(|(_, url)| extract(url))
            })
        })
}

/// The current branch plus every other local branch
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct BranchSet {
    pub current: String,
    pub others: Vec<String>,
}

impl BranchSet {
    /// Current branch first, then the others
    pub fn all(&self) -> impl Iterator<Item = &str> {
        std::iter::once(self.current.as_str()).chain(self.others.iter().map(String::as_str))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.all().any(|branch| branch == name)
    }
}

/// Parse plain `git branch` output
///
/// Exactly one line carries the `*` current-branch marker.
pub fn parse_branch_list(output: &str) -> GitResult<BranchSet> {
    let mut current = Vec::new();
    let mut others = Vec::new();

    for line in output.lines() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        match line.strip_prefix('*') {
            Some(name) => current.push(name.trim().to_string()),
            None => others.push(line.to_string()),
        }
    }

    if current.len() > 1 {
        return Err(GitError::operation(format!(
            "More than one current branch found: {}",
            current.join(", ")
        )));
    }
    let current = current
        .pop()
        .ok_or_else(|| GitError::operation("No current branch found"))?;

    Ok(BranchSet { current, others })
}

/// Whether some leading part of `name` matches `pattern`
fn matches_prefix(pattern: &glob::Pattern, name: &str) -> bool {
    name.char_indices()
        .map(|(index, c)| index + c.len_utf8())
        .any(|end| pattern.matches(&name[..end]))
}

/// Branch names on `remote` from `git branch -r` output, prefix removed
///
/// Symbolic entries (`origin/HEAD -> origin/main`) are skipped. When a
/// pattern is given, only names that start with a match are kept: the pattern
/// is anchored at the beginning of the name but not at its end, so `release`
/// keeps `release/1.0` and drops `prerelease`.
pub fn parse_remote_branches(output: &str, remote: &str, pattern: Option<&glob::Pattern>) -> Vec<String> {
    let prefix = format!("{}/", remote);

    output
        .lines()
        .map(str::trim)
        .filter(|line| !line.contains(" -> "))
        .filter_map(|line| line.strip_prefix(prefix.as_str()))
        .filter(|name| pattern.is_none_or(|p| matches_prefix(p, name)))
        .map(String::from)
        .collect()
}
