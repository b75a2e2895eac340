use crate::error::{Error, Result};
use crate::github::GitHubAsset;
use crate::release_source::ReleaseSource;
use crate::repo::RepoIdentity;
use std::path::{Component, Path, PathBuf};

/// Gets told about every asset that finished downloading.
pub trait DownloadObserver {
    fn asset_completed(&self, _asset: &GitHubAsset, _bytes: u64) {}
}

pub struct NoopObserver;

impl DownloadObserver for NoopObserver {}

/// True for names like `tool.exe`; false for anything with a directory part, `..`, or a root.
pub(crate) fn is_plain_file_name(name: &str) -> bool {
    let mut components = Path::new(name).components();
    matches!(
        (components.next(), components.next()),
        (Some(Component::Normal(_)), None)
    )
}

/// Downloads `assets` one after another into `downloads_dir`, overwriting files of the same name.
/// The first failure stops the run; assets after it are not attempted.
pub async fn download_assets<S, O>(
    source: &S,
    repo: &RepoIdentity,
    assets: &[GitHubAsset],
    downloads_dir: &Path,
    observer: &O,
) -> Result<Vec<PathBuf>>
where
    S: ReleaseSource,
    O: DownloadObserver + ?Sized,
{
    tokio::fs::create_dir_all(downloads_dir)
        .await
        .map_err(|e| Error::io(downloads_dir, e))?;

    tracing::info!(
        "Start downloading assets: {}",
        assets
            .iter()
            .map(|a| a.name.as_str())
            .collect::<Vec<_>>()
            .join(", ")
    );

    let mut written = Vec::with_capacity(assets.len());
    for asset in assets {
        if !is_plain_file_name(&asset.name) {
            return Err(Error::InvalidAssetName(asset.name.clone()));
        }
        let output_path = downloads_dir.join(&asset.name);
        tracing::debug!("Downloading {} to {}", asset.name, output_path.display());
        let bytes = source.download_asset(repo, asset, &output_path).await?;
        observer.asset_completed(asset, bytes);
        written.push(output_path);
    }

    Ok(written)
}
