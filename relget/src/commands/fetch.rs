use crate::cli::{GlobalArgs, RepoArgs};
use crate::ui;
use anyhow::{Context, Result};
use clap::Args;
use relget_lib::asset_filter::AssetFilter;
use relget_lib::config::Config;
use relget_lib::downloader::DownloadObserver;
use relget_lib::error::Error;
use relget_lib::github::{GitHubAsset, GitHubClient};
use relget_lib::repo::RepoIdentity;
use relget_lib::updater::{UpdateOutcome, UpdateRequest, check_and_download_updates};
use relget_lib::version_matcher::VersionConstraint;
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Args)]
pub struct FetchCommand {
    #[command(flatten)]
    pub repo: RepoArgs,

    /// GitHub token (defaults to $GITHUB_TOKEN)
    #[arg(short, long)]
    pub token: Option<String>,

    /// Version compatibility requirement, e.g. "~1.3" or ">=1.2.0, <2"
    #[arg(short = 'r', long)]
    pub require: Option<String>,

    /// Regex the whole asset name has to match
    #[arg(short, long, default_value = ".*")]
    pub mask: String,

    /// Directory to download the assets into
    #[arg(short, long, default_value = ".")]
    pub output_dir: PathBuf,

    /// Currently installed version, used instead of the cached one
    #[arg(short, long)]
    pub current_version: Option<String>,
}

struct UiObserver;

impl DownloadObserver for UiObserver {
    fn asset_completed(&self, asset: &GitHubAsset, bytes: u64) {
        ui::info(&format!(
            "'{}' downloaded ({})",
            asset.name,
            ui::format_size(bytes)
        ));
    }
}

impl FetchCommand {
    pub async fn run(self, global_args: GlobalArgs) -> Result<ExitCode> {
        let config = Config::setup(global_args.cache_dir.as_deref())?;
        let repo = self.repo.identity(self.token.clone());
        let cache = self.repo.cache(&config, &repo);

        let constraint = self
            .require
            .as_deref()
            .map(str::parse::<VersionConstraint>)
            .transpose()?;
        let request = UpdateRequest {
            constraint,
            asset_filter: AssetFilter::new(&self.mask)?,
            downloads_dir: self.output_dir,
            current_version: self.current_version,
        };

        let client = GitHubClient::new(&config)?;
        let outcome = check_and_download_updates(&client, &repo, &request, &cache, &UiObserver)
            .await
            .with_context(|| format!("Failed to update {repo}"))?;

        report_outcome(outcome, &repo, &request)?;
        Ok(ExitCode::SUCCESS)
    }
}

/// Prints what happened. Finding no compatible release is the one outcome reported as an error.
fn report_outcome(
    outcome: UpdateOutcome,
    repo: &RepoIdentity,
    request: &UpdateRequest,
) -> Result<()> {
    match outcome {
        UpdateOutcome::Updated { version, files } => {
            ui::success(&format!(
                "Downloaded {} asset(s) of {} {}",
                files.len(),
                repo,
                version
            ));
            for file in files {
                ui::info(&format!("  {}", file.display()));
            }
        }
        UpdateOutcome::AlreadyUpToDate { version } => {
            ui::success(&format!("{repo} is already up to date ({version})"));
            ui::tip(&format!(
                "Run `relget cache clear -u {} -n {}` to download it again.",
                repo.owner, repo.repo
            ));
        }
        UpdateOutcome::NothingToDownload { version } => {
            ui::warning(&format!(
                "No assets of {repo} {version} match '{}'",
                request.asset_filter
            ));
        }
        UpdateOutcome::NoCompatibleRelease => {
            return Err(Error::no_match(repo, request.constraint.as_ref()).into());
        }
    }
    Ok(())
}
