use crate::error::{Error, Result};
use crate::github::{GitHubAsset, GitHubRelease};
use crate::release_source::{ReleasePage, ReleaseSource};
use crate::repo::RepoIdentity;
use reqwest::StatusCode;
use std::path::Path;
use std::sync::Mutex;

pub fn asset(name: &str) -> GitHubAsset {
    GitHubAsset {
        name: name.to_string(),
        browser_download_url: format!("https://example.com/download/{name}"),
        size: format!("contents of {name}").len() as u64,
    }
}

pub fn release(tag: &str, prerelease: bool, asset_names: &[&str]) -> GitHubRelease {
    GitHubRelease {
        tag_name: tag.to_string(),
        prerelease,
        assets: asset_names.iter().map(|name| asset(name)).collect(),
    }
}

/// In-memory release source. Downloads write `contents of <asset name>`.
pub struct MockReleaseSource {
    pages: Vec<Vec<GitHubRelease>>,
    listing_status: Option<StatusCode>,
    fail_on: Option<String>,
    requested_pages: Mutex<Vec<u32>>,
    downloaded: Mutex<Vec<String>>,
}

impl MockReleaseSource {
    pub fn new(pages: Vec<Vec<GitHubRelease>>) -> Self {
        Self {
            pages,
            listing_status: None,
            fail_on: None,
            requested_pages: Mutex::new(Vec::new()),
            downloaded: Mutex::new(Vec::new()),
        }
    }

    /// Every listing request fails as if the API answered with `status`.
    pub fn with_listing_status(mut self, status: StatusCode) -> Self {
        self.listing_status = Some(status);
        self
    }

    /// Downloading the named asset fails with a server error.
    pub fn failing_on(mut self, asset_name: &str) -> Self {
        self.fail_on = Some(asset_name.to_string());
        self
    }

    pub fn requested_pages(&self) -> Vec<u32> {
        self.requested_pages.lock().unwrap().clone()
    }

    /// Names of all assets a download was attempted for, in order.
    pub fn downloaded(&self) -> Vec<String> {
        self.downloaded.lock().unwrap().clone()
    }
}

impl ReleaseSource for MockReleaseSource {
    async fn release_page(&self, repo: &RepoIdentity, page: u32) -> Result<ReleasePage> {
        self.requested_pages.lock().unwrap().push(page);

        if let Some(status) = self.listing_status {
            return Err(match status {
                StatusCode::NOT_FOUND => Error::NotFound(repo.full_name()),
                StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Error::Auth {
                    repo: repo.full_name(),
                    status,
                },
                _ => Error::Api {
                    url: format!("https://api.github.com/repos/{repo}/releases"),
                    status,
                },
            });
        }

        let index = page as usize - 1;
        Ok(ReleasePage {
            releases: self.pages.get(index).cloned().unwrap_or_default(),
            has_next: index + 1 < self.pages.len(),
        })
    }

    async fn download_asset(
        &self,
        _repo: &RepoIdentity,
        asset: &GitHubAsset,
        output_path: &Path,
    ) -> Result<u64> {
        self.downloaded.lock().unwrap().push(asset.name.clone());

        if self.fail_on.as_deref() == Some(asset.name.as_str()) {
            return Err(Error::Api {
                url: asset.browser_download_url.clone(),
                status: StatusCode::SERVICE_UNAVAILABLE,
            });
        }

        let content = format!("contents of {}", asset.name);
        std::fs::write(output_path, &content).map_err(|e| Error::io(output_path, e))?;
        Ok(content.len() as u64)
    }
}
