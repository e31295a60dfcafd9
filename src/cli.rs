//! Command-line front end: inspect a repository and print the decoded result as JSON.

use crate::config::Config;
use crate::error::AppResult;
use crate::git::command::DescribeOptions;
use crate::git::parser::{RemotePurpose, RepoNameQuery};
use crate::git::repository::Repository;
use clap::{Parser, Subcommand};
use serde::Serialize;
use std::io::Write;
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(name = "gittidy", version, about = "Inspect a git repository as structured data")]
pub struct Cli {
    /// Any path inside the repository
    #[arg(long, short = 'C', default_value = ".")]
    pub repo: PathBuf,

    /// Configuration file (default: ~/.config/gittidy/config.toml)
    #[arg(long, env = "GITTIDY_CONFIG")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Files changed between two revisions, grouped by kind of change
    Changes { from: String, to: String },
    /// Commits with author, date, message and files
    Commits {
        /// Revision range, e.g. `v1.0..HEAD`
        range: Option<String>,
    },
    /// Tags merged into the current branch, grouped by commit
    Tags,
    /// Remote URLs by remote and purpose
    Remotes,
    /// Current and other local branches
    Branches,
    /// Owner and name of the hosted repository
    RepoName {
        #[arg(long, default_value = "origin")]
        remote: String,
        #[arg(long, default_value = "push", value_parser = ["fetch", "push"])]
        purpose: String,
        /// Only look at the requested remote and purpose
        #[arg(long)]
        exact: bool,
    },
    /// Nearest tag reachable from HEAD
    Describe {
        /// Only consider tags matching this glob
        #[arg(long = "match")]
        match_pattern: Option<String>,
    },
}

fn load_config(path: Option<&PathBuf>) -> AppResult<Config> {
    let config = match path {
        Some(path) => Config::load_from(path)?,
        None => Config::load_or_default()?,
    };
    Ok(config)
}

fn print_json<W: Write, T: Serialize>(out: &mut W, value: &T) -> AppResult<()> {
    serde_json::to_writer_pretty(&mut *out, value)?;
    writeln!(out)?;
    Ok(())
}

/// Run one parsed command, writing its JSON result to `out`
pub fn run<W: Write>(cli: &Cli, out: &mut W) -> AppResult<()> {
    let config = load_config(cli.config.as_ref())?;
    let repo = Repository::open_with_config(&cli.repo, &config)?;

    match &cli.command {
        Command::Changes { from, to } => print_json(out, &repo.changed_files(from, to)?),
        Command::Commits { range } => print_json(out, &repo.commits(range.as_deref())?),
        Command::Tags => print_json(out, &repo.tags()?),
        Command::Remotes => print_json(out, &repo.remotes()?),
        Command::Branches => print_json(out, &repo.branch_names()?),
        Command::RepoName {
            remote,
            purpose,
            exact,
        } => {
            let query = RepoNameQuery {
                remote: remote.clone(),
                purpose: purpose.parse::<RemotePurpose>()?,
                fallback_purpose: !exact,
                fallback_name: !exact,
            };
            print_json(out, &repo.remote_repo_name(&query)?)
        }
        Command::Describe { match_pattern } => {
            let options = DescribeOptions {
                match_pattern: match_pattern.clone(),
                ..DescribeOptions::default()
            };
            print_json(out, &repo.describe(&options)?)
        }
    }
}
