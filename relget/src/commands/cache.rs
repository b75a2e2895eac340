use crate::cli::{GlobalArgs, RepoArgs};
use crate::ui;
use anyhow::Result;
use clap::{Args, Subcommand};
use relget_lib::config::Config;
use std::process::ExitCode;

#[derive(Args)]
pub struct CacheCommand {
    #[command(subcommand)]
    pub action: CacheAction,
}

#[derive(Subcommand)]
pub enum CacheAction {
    /// Show the cached version and where it is stored
    Show(RepoArgs),
    /// Forget the cached version so the next fetch downloads again
    Clear(RepoArgs),
}

impl CacheCommand {
    pub fn run(self, global_args: GlobalArgs) -> Result<ExitCode> {
        // Reading or removing a cache file never needs the directory to exist
        let config = Config::for_cache_dir(global_args.cache_dir.as_deref());

        match self.action {
            CacheAction::Show(args) => {
                let repo = args.identity(None);
                let cache = args.cache(&config, &repo);
                match cache.read()? {
                    Some(version) => ui::info(&format!("{repo}: {version}")),
                    None => ui::info(&format!("{repo}: no version cached")),
                }
                ui::info(&format!("Cache file: {}", cache.path().display()));
            }
            CacheAction::Clear(args) => {
                let repo = args.identity(None);
                let cache = args.cache(&config, &repo);
                if cache.clear()? {
                    ui::success(&format!("Cleared cached version of {repo}"));
                } else {
                    ui::success(&format!("Nothing cached for {repo}"));
                }
            }
        }

        Ok(ExitCode::SUCCESS)
    }
}
