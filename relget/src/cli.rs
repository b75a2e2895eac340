use anyhow::Result;
use clap::{Parser, Subcommand};
use relget_lib::cache::VersionCache;
use relget_lib::config::Config;
use relget_lib::error::{Error, ErrorKind};
use relget_lib::repo::RepoIdentity;
use std::path::PathBuf;
use std::process::ExitCode;

use crate::commands::{cache::CacheCommand, fetch::FetchCommand};

/// Exit status when no release satisfies the version requirement.
pub const EXIT_NO_MATCH: u8 = 2;

#[derive(Parser)]
#[command(name = "relget")]
#[command(about = "Download assets of the newest compatible GitHub release")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    #[command(flatten)]
    pub global_args: GlobalArgs,
}

#[derive(clap::Args, Clone)]
pub struct GlobalArgs {
    /// Directory for version cache files (defaults to the platform cache directory)
    #[arg(long, global = true)]
    pub cache_dir: Option<PathBuf>,

    /// Show debug output
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

/// Identifies the repository and its cache record.
#[derive(clap::Args, Clone)]
pub struct RepoArgs {
    /// GitHub repository owner
    #[arg(short, long)]
    pub user: String,

    /// GitHub repository name
    #[arg(short = 'n', long)]
    pub repo_name: String,

    /// Use this file as the version cache instead of one in the cache directory
    #[arg(long)]
    pub cache_file: Option<PathBuf>,
}

impl RepoArgs {
    pub fn identity(&self, token: Option<String>) -> RepoIdentity {
        RepoIdentity::with_env_token(&self.user, &self.repo_name, token)
    }

    pub fn cache(&self, config: &Config, repo: &RepoIdentity) -> VersionCache {
        match &self.cache_file {
            Some(path) => VersionCache::new(path),
            None => VersionCache::new(config.cache_file(repo)),
        }
    }
}

#[derive(Subcommand)]
pub enum Commands {
    /// Download assets of the newest release matching a version requirement
    #[command(alias = "download")]
    Fetch(FetchCommand),

    /// Inspect or reset the cached version of a repository
    Cache(CacheCommand),
}

impl Cli {
    pub async fn run(self) -> Result<ExitCode> {
        match self.command {
            Commands::Fetch(cmd) => cmd.run(self.global_args).await,
            Commands::Cache(cmd) => cmd.run(self.global_args),
        }
    }
}

pub fn exit_code_for(error: &anyhow::Error) -> ExitCode {
    ExitCode::from(exit_status_for(error))
}

pub(crate) fn exit_status_for(error: &anyhow::Error) -> u8 {
    match error.downcast_ref::<Error>().map(Error::kind) {
        Some(ErrorKind::NoMatch) => EXIT_NO_MATCH,
        _ => 1,
    }
}
