use crate::error::Result;
use crate::github::{GitHubAsset, GitHubRelease};
use crate::repo::RepoIdentity;
use std::path::Path;

/// Releases requested per API page.
pub const PER_PAGE: u32 = 100;

/// Hard stop for pagination: 10 pages of 100 releases.
pub const MAX_PAGES: u32 = 10;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReleasePage {
    pub releases: Vec<GitHubRelease>,
    pub has_next: bool,
}

pub trait ReleaseSource {
    /// Fetches one 1-based page of releases, newest first as the forge orders them.
    fn release_page(
        &self,
        repo: &RepoIdentity,
        page: u32,
    ) -> impl Future<Output = Result<ReleasePage>> + Send;

    /// Streams a single asset to `output_path`, returning the number of bytes written.
    fn download_asset(
        &self,
        repo: &RepoIdentity,
        asset: &GitHubAsset,
        output_path: &Path,
    ) -> impl Future<Output = Result<u64>> + Send;
}

/// Walks the release pages of a repository one request at a time, so callers that
/// find what they need early never request the remaining pages.
pub struct ReleasePages<'a, S> {
    source: &'a S,
    repo: &'a RepoIdentity,
    next: Option<u32>,
    fetched: u32,
}

impl<'a, S: ReleaseSource> ReleasePages<'a, S> {
    pub fn new(source: &'a S, repo: &'a RepoIdentity) -> Self {
        Self {
            source,
            repo,
            next: Some(1),
            fetched: 0,
        }
    }

    /// Returns the next page, or `None` once the last page has been consumed.
    pub async fn next_page(&mut self) -> Result<Option<Vec<GitHubRelease>>> {
        let Some(page) = self.next else {
            return Ok(None);
        };

        let ReleasePage { releases, has_next } = self.source.release_page(self.repo, page).await?;
        self.fetched += 1;
        tracing::debug!("Release page #{} loaded ({} releases)", page, releases.len());

        self.next = if has_next && page < MAX_PAGES {
            Some(page + 1)
        } else {
            tracing::debug!("No more release pages");
            None
        };

        Ok(Some(releases))
    }

    /// Number of pages requested so far.
    pub fn pages_fetched(&self) -> u32 {
        self.fetched
    }
}
