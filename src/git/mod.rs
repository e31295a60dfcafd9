pub mod command;
pub mod executor;
pub mod identity;
pub mod parser;
pub mod repository;
pub mod version;

#[cfg(test)]
pub(crate) mod testing;

// Re-export commonly used types
pub use command::{
    ChangeScope, CheckoutMode, CheckoutOptions, CommitOptions, DescribeOptions, LogOptions,
    PushOptions, Stage, StashInclude, TagFilter,
};
pub use executor::{CommandOutput, CommandRunner, GitExecutor, RunOptions};
pub use identity::{ConfigScope, Identity, IdentityGuard, IdentityKind, TemporaryIdentity};
pub use parser::{
    BranchSet, ChangeKind, ChangeSet, CommitRecord, PairKind, PathPairs, RemotePurpose,
    RemoteTable, RepoName, RepoNameQuery, TagGroup, extract_repo_name, parse_branch_list,
    parse_commits, parse_name_status, parse_remote_branches, parse_remotes, parse_tags,
    select_repo_name,
};
pub use repository::{IdentityOverride, Repository, RepositoryOptions};
pub use version::GitVersion;
