use crate::asset_filter::AssetFilter;
use crate::cache::VersionCache;
use crate::downloader::{DownloadObserver, download_assets};
use crate::error::{Error, Result};
use crate::github::GitHubRelease;
use crate::logging::spinner_style;
use crate::release_source::{ReleasePages, ReleaseSource};
use crate::repo::RepoIdentity;
use crate::version_matcher::{VersionConstraint, normalize_tag, parse_tag, select_release};
use semver::Version;
use std::path::PathBuf;
use tracing::instrument;
use tracing_indicatif::span_ext::IndicatifSpanExt;

/// What to look for and where to put it.
#[derive(Debug, Clone)]
pub struct UpdateRequest {
    pub constraint: Option<VersionConstraint>,
    pub asset_filter: AssetFilter,
    pub downloads_dir: PathBuf,
    /// Overrides the cached version for the up-to-date check.
    pub current_version: Option<String>,
}

impl Default for UpdateRequest {
    fn default() -> Self {
        Self {
            constraint: None,
            asset_filter: AssetFilter::all(),
            downloads_dir: PathBuf::from("."),
            current_version: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpdateOutcome {
    /// The matched release was downloaded and recorded in the cache.
    Updated { version: String, files: Vec<PathBuf> },
    /// The known version is at least as new as the matched release.
    AlreadyUpToDate { version: String },
    NoCompatibleRelease,
    /// The matched release has no assets passing the filter. Its version is still cached.
    NothingToDownload { version: String },
}

impl UpdateOutcome {
    /// Turns [UpdateOutcome::NoCompatibleRelease] into [Error::NoMatch] for callers that
    /// treat it as a failure.
    pub fn into_result(
        self,
        repo: &RepoIdentity,
        constraint: Option<&VersionConstraint>,
    ) -> Result<Self> {
        match self {
            UpdateOutcome::NoCompatibleRelease => Err(Error::no_match(repo, constraint)),
            outcome => Ok(outcome),
        }
    }
}

/// Finds the newest release of `repo` that satisfies the request and downloads its matching
/// assets, unless the cached (or explicitly given) version is already as new.
pub async fn check_and_download_updates<S, O>(
    source: &S,
    repo: &RepoIdentity,
    request: &UpdateRequest,
    cache: &VersionCache,
    observer: &O,
) -> Result<UpdateOutcome>
where
    S: ReleaseSource,
    O: DownloadObserver + ?Sized,
{
    let constraint = request.constraint.as_ref();
    tracing::info!("Searching for releases in 'https://github.com/{}/'...", repo);
    if let Some(constraint) = constraint {
        tracing::info!("Compatibility requirement: '{}'", constraint);
    }

    // 1. Fetch & match
    let Some(release) = find_release(source, repo, constraint).await? else {
        tracing::warn!("No compatible release available.");
        return Ok(UpdateOutcome::NoCompatibleRelease);
    };
    tracing::info!("Best matching release: {}", release.tag_name);

    // 2. Compare with what we already have
    let current = match &request.current_version {
        Some(version) => Some(version.clone()),
        None => cache.read()?,
    };
    if let Some(current) = current
        && !is_newer(&release.tag_name, &current, constraint)
    {
        return Ok(UpdateOutcome::AlreadyUpToDate { version: current });
    }

    // 3. Filter
    tracing::info!(
        "Selecting assets of '{}' by pattern: '{}'",
        release.tag_name,
        request.asset_filter
    );
    let assets = request.asset_filter.apply(&release.assets);
    if assets.is_empty() {
        tracing::warn!("No assets found");
        cache.write(&release.tag_name)?;
        return Ok(UpdateOutcome::NothingToDownload {
            version: release.tag_name,
        });
    }

    // 4. Download, then remember the version
    let files = download_assets(source, repo, &assets, &request.downloads_dir, observer).await?;
    cache.write(&release.tag_name)?;
    tracing::info!("Done!");

    Ok(UpdateOutcome::Updated {
        version: release.tag_name,
        files,
    })
}

#[instrument(skip_all)]
async fn find_release<S: ReleaseSource>(
    source: &S,
    repo: &RepoIdentity,
    constraint: Option<&VersionConstraint>,
) -> Result<Option<GitHubRelease>> {
    let current_span = tracing::Span::current();
    if let Ok(style) = spinner_style("{msg} [Fetched pages: {pos}]") {
        current_span.pb_set_style(&style);
    }
    current_span.pb_set_message(&format!("Fetching releases of {}...", repo));
    current_span.pb_set_finish_message(&format!("Fetching releases of {}... Done", repo));

    let mut pages = ReleasePages::new(source, repo);
    while let Some(releases) = pages.next_page().await? {
        current_span.pb_set_position(pages.pages_fetched() as u64);
        if let Some(release) = select_release(&releases, constraint) {
            return Ok(Some(release.clone()));
        }
    }
    Ok(None)
}

/// Whether `candidate` should replace `current`. Versions that do not parse as semver are only
/// considered equal when their normalised tags are identical.
fn is_newer(candidate: &str, current: &str, constraint: Option<&VersionConstraint>) -> bool {
    let (Some(candidate_version), Some(current_version)) = (parse_tag(candidate), parse_tag(current))
    else {
        let newer = normalize_tag(candidate) != normalize_tag(current);
        if !newer {
            tracing::info!("Latest version is already installed: {}", current);
        }
        return newer;
    };

    if precedence(&current_version) < precedence(&candidate_version) {
        return true;
    }

    tracing::info!("Latest version is already installed: {}", current);
    if precedence(&current_version) > precedence(&candidate_version) {
        let still_compatible = constraint.is_none_or(|c| c.matches(&current_version));
        tracing::warn!(
            "Current version newer than latest found ({}){}",
            candidate,
            if still_compatible {
                ", but still compatible."
            } else {
                ", and incompatible!"
            }
        );
    }
    false
}

/// Semver precedence ignores build metadata.
fn precedence(version: &Version) -> (u64, u64, u64, &semver::Prerelease) {
    (version.major, version.minor, version.patch, &version.pre)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::downloader::NoopObserver;
    use crate::error::ErrorKind;
    use crate::test_helpers::mock_release_source::{MockReleaseSource, release};
    use reqwest::StatusCode;
    use tempfile::TempDir;

    struct Fixture {
        tmp_dir: TempDir,
        repo: RepoIdentity,
        cache: VersionCache,
    }

    impl Fixture {
        fn new() -> anyhow::Result<Self> {
            let tmp_dir = tempfile::Builder::new().prefix("relget-test").tempdir()?;
            let cache = VersionCache::new(tmp_dir.path().join("repo-octo-tool.cache"));
            Ok(Self {
                tmp_dir,
                repo: RepoIdentity::new("octo", "tool", None),
                cache,
            })
        }

        fn downloads_dir(&self) -> PathBuf {
            self.tmp_dir.path().join("out")
        }

        fn request(&self, constraint: Option<&str>, pattern: Option<&str>) -> UpdateRequest {
            UpdateRequest {
                constraint: constraint.map(|c| c.parse().unwrap()),
                asset_filter: pattern.map_or_else(AssetFilter::all, |p| p.parse().unwrap()),
                downloads_dir: self.downloads_dir(),
                current_version: None,
            }
        }
    }

    fn sample_releases() -> Vec<GitHubRelease> {
        vec![
            release("2.0.0", true, &["tool.exe", "tool.tar.gz"]),
            release("1.1.3", false, &["tool.exe", "tool.tar.gz"]),
            release("1.0.0", false, &["tool.exe"]),
        ]
    }

    #[tokio::test]
    async fn test_downloads_compatible_release() -> anyhow::Result<()> {
        let fx = Fixture::new()?;
        let source = MockReleaseSource::new(vec![sample_releases()]);
        let request = fx.request(Some("~1.1"), Some(r".*\.exe"));

        let outcome =
            check_and_download_updates(&source, &fx.repo, &request, &fx.cache, &NoopObserver)
                .await?;

        assert_eq!(
            outcome,
            UpdateOutcome::Updated {
                version: "1.1.3".to_string(),
                files: vec![fx.downloads_dir().join("tool.exe")],
            }
        );
        assert_eq!(source.downloaded(), vec!["tool.exe"]);
        assert_eq!(std::fs::read_dir(fx.downloads_dir())?.count(), 1);
        assert_eq!(fx.cache.read()?, Some("1.1.3".to_string()));
        Ok(())
    }

    #[tokio::test]
    async fn test_cached_version_is_up_to_date() -> anyhow::Result<()> {
        let fx = Fixture::new()?;
        fx.cache.write("1.1.3")?;
        let source = MockReleaseSource::new(vec![sample_releases()]);
        let request = fx.request(Some("~1.1"), None);

        let outcome =
            check_and_download_updates(&source, &fx.repo, &request, &fx.cache, &NoopObserver)
                .await?;

        assert_eq!(
            outcome,
            UpdateOutcome::AlreadyUpToDate {
                version: "1.1.3".to_string()
            }
        );
        assert!(source.downloaded().is_empty());
        assert!(!fx.downloads_dir().exists());
        Ok(())
    }

    #[tokio::test]
    async fn test_older_cache_triggers_download() -> anyhow::Result<()> {
        let fx = Fixture::new()?;
        fx.cache.write("v1.1.0")?;
        let source = MockReleaseSource::new(vec![sample_releases()]);
        let request = fx.request(Some("~1.1"), None);

        let outcome =
            check_and_download_updates(&source, &fx.repo, &request, &fx.cache, &NoopObserver)
                .await?;

        assert!(matches!(outcome, UpdateOutcome::Updated { ref version, .. } if version == "1.1.3"));
        assert_eq!(source.downloaded(), vec!["tool.exe", "tool.tar.gz"]);
        assert_eq!(fx.cache.read()?, Some("1.1.3".to_string()));
        Ok(())
    }

    #[tokio::test]
    async fn test_current_version_overrides_cache() -> anyhow::Result<()> {
        let fx = Fixture::new()?;
        fx.cache.write("1.0.0")?;
        let source = MockReleaseSource::new(vec![sample_releases()]);
        let request = UpdateRequest {
            current_version: Some("1.2.0".to_string()),
            ..fx.request(Some("~1.1"), None)
        };

        let outcome =
            check_and_download_updates(&source, &fx.repo, &request, &fx.cache, &NoopObserver)
                .await?;

        assert_eq!(
            outcome,
            UpdateOutcome::AlreadyUpToDate {
                version: "1.2.0".to_string()
            }
        );
        assert_eq!(fx.cache.read()?, Some("1.0.0".to_string()));
        Ok(())
    }

    #[tokio::test]
    async fn test_zero_releases_leave_cache_untouched() -> anyhow::Result<()> {
        let fx = Fixture::new()?;
        let source = MockReleaseSource::new(vec![]);
        let request = fx.request(Some("~1.1"), None);

        let outcome =
            check_and_download_updates(&source, &fx.repo, &request, &fx.cache, &NoopObserver)
                .await?;

        assert_eq!(outcome, UpdateOutcome::NoCompatibleRelease);
        assert!(!fx.cache.path().exists());

        let err = outcome
            .into_result(&fx.repo, request.constraint.as_ref())
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NoMatch);
        Ok(())
    }

    #[tokio::test]
    async fn test_nothing_to_download_still_caches_version() -> anyhow::Result<()> {
        let fx = Fixture::new()?;
        let source = MockReleaseSource::new(vec![sample_releases()]);
        let request = fx.request(Some("~1.0.0"), Some(r".*\.dmg"));

        let outcome =
            check_and_download_updates(&source, &fx.repo, &request, &fx.cache, &NoopObserver)
                .await?;

        assert_eq!(
            outcome,
            UpdateOutcome::NothingToDownload {
                version: "1.0.0".to_string()
            }
        );
        assert!(source.downloaded().is_empty());
        assert_eq!(fx.cache.read()?, Some("1.0.0".to_string()));
        Ok(())
    }

    #[tokio::test]
    async fn test_without_constraint_takes_newest_release() -> anyhow::Result<()> {
        let fx = Fixture::new()?;
        let source = MockReleaseSource::new(vec![sample_releases()]);
        let request = fx.request(None, Some(r".*\.tar\.gz"));

        let outcome =
            check_and_download_updates(&source, &fx.repo, &request, &fx.cache, &NoopObserver)
                .await?;

        assert!(matches!(outcome, UpdateOutcome::Updated { ref version, .. } if version == "2.0.0"));
        assert_eq!(source.downloaded(), vec!["tool.tar.gz"]);
        Ok(())
    }

    #[tokio::test]
    async fn test_stops_paging_after_match() -> anyhow::Result<()> {
        let fx = Fixture::new()?;
        let source = MockReleaseSource::new(vec![
            vec![release("3.0.0", false, &["a.zip"])],
            vec![release("1.2.0", false, &["a.zip"])],
            vec![release("1.1.0", false, &["a.zip"])],
        ]);
        let request = fx.request(Some("^1"), None);

        let outcome =
            check_and_download_updates(&source, &fx.repo, &request, &fx.cache, &NoopObserver)
                .await?;

        assert!(matches!(outcome, UpdateOutcome::Updated { ref version, .. } if version == "1.2.0"));
        assert_eq!(source.requested_pages(), vec![1, 2]);
        Ok(())
    }

    #[tokio::test]
    async fn test_listing_errors_propagate() -> anyhow::Result<()> {
        let fx = Fixture::new()?;
        let request = fx.request(None, None);

        for (status, kind) in [
            (StatusCode::NOT_FOUND, ErrorKind::NotFound),
            (StatusCode::UNAUTHORIZED, ErrorKind::Auth),
            (StatusCode::INTERNAL_SERVER_ERROR, ErrorKind::Network),
        ] {
            let source = MockReleaseSource::new(vec![sample_releases()]).with_listing_status(status);
            let err =
                check_and_download_updates(&source, &fx.repo, &request, &fx.cache, &NoopObserver)
                    .await
                    .unwrap_err();
            assert_eq!(err.kind(), kind);
        }
        assert!(!fx.cache.path().exists());
        Ok(())
    }

    #[tokio::test]
    async fn test_failed_download_does_not_update_cache() -> anyhow::Result<()> {
        let fx = Fixture::new()?;
        fx.cache.write("1.0.0")?;
        let source = MockReleaseSource::new(vec![sample_releases()]).failing_on("tool.tar.gz");
        let request = fx.request(Some("~1.1"), None);

        let err = check_and_download_updates(&source, &fx.repo, &request, &fx.cache, &NoopObserver)
            .await
            .unwrap_err();

        assert_eq!(err.kind(), ErrorKind::Network);
        assert_eq!(fx.cache.read()?, Some("1.0.0".to_string()));
        Ok(())
    }

    #[test]
    fn test_is_newer() {
        assert!(is_newer("1.1.3", "1.1.2", None));
        assert!(is_newer("v1.1.3", "1.1.3-rc.1", None));
        assert!(!is_newer("1.1.3", "v1.1.3", None));
        assert!(!is_newer("1.1.3", "1.1.3+build.7", None));
        assert!(!is_newer("1.1.3", "1.2.0", None));
        // Non-semver tags only compare for equality.
        assert!(is_newer("nightly-2", "nightly-1", None));
        assert!(!is_newer("nightly-2", "nightly-2", None));
    }
}
