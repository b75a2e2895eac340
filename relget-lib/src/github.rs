use crate::config::Config;
use crate::downloader::is_plain_file_name;
use crate::error::{Error, Result};
use crate::logging::progress_bar_style;
use crate::release_source::{PER_PAGE, ReleasePage, ReleaseSource};
use crate::repo::RepoIdentity;
use futures_util::{Stream, StreamExt};
use reqwest::header::{ACCEPT, HeaderMap, LINK};
use reqwest::{Client, RequestBuilder, StatusCode};
use serde::Deserialize;
use std::path::Path;
use tempfile::NamedTempFile;
use tokio::io::AsyncWriteExt;
use tracing::instrument;
use tracing_indicatif::span_ext::IndicatifSpanExt;

const GITHUB_JSON: &str = "application/vnd.github+json";
const API_VERSION: &str = "2022-11-28";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GitHubRelease {
    pub tag_name: String,
    pub prerelease: bool,
    pub assets: Vec<GitHubAsset>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GitHubAsset {
    pub name: String,
    pub browser_download_url: String,
    pub size: u64,
}

/// Matches the GitHub API JSON response for a single release
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
struct GitHubReleaseJson {
    pub tag_name: Option<String>,
    #[serde(default)]
    pub prerelease: bool,
    #[serde(default)]
    pub assets: Vec<GitHubAssetJson>,
}

/// Matches the GitHub API JSON response for a single release asset
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
struct GitHubAssetJson {
    pub name: Option<String>,
    pub browser_download_url: Option<String>,
    pub size: Option<u64>,
}

impl GitHubAssetJson {
    /// Converts to a [GitHubAsset], rejecting entries that could never be downloaded.
    /// Names must be plain file names so they cannot point outside the downloads directory.
    fn validate(&self) -> Option<GitHubAsset> {
        let name = self
            .name
            .as_deref()
            .map(str::trim)
            .filter(|n| is_plain_file_name(n))?;
        let url = self
            .browser_download_url
            .as_deref()
            .map(str::trim)
            .filter(|u| !u.is_empty())?;
        let size = self.size.filter(|s| *s > 0)?;
        Some(GitHubAsset {
            name: name.to_string(),
            browser_download_url: url.to_string(),
            size,
        })
    }
}

impl GitHubRelease {
    fn from_json_struct(json: &GitHubReleaseJson) -> Option<Self> {
        let tag_name = json.tag_name.clone()?;
        let assets = json
            .assets
            .iter()
            .filter_map(|a| {
                let asset = a.validate();
                if asset.is_none() {
                    tracing::warn!(
                        "Skipping invalid asset {:?} of release {}",
                        a.name.as_deref().unwrap_or("<unnamed>"),
                        tag_name
                    );
                }
                asset
            })
            .collect();
        Some(GitHubRelease {
            tag_name,
            prerelease: json.prerelease,
            assets,
        })
    }
}

pub struct GitHubClient {
    config: Config,
    client: Client,
}

impl ReleaseSource for GitHubClient {
    async fn release_page(&self, repo: &RepoIdentity, page: u32) -> Result<ReleasePage> {
        let url = format!(
            "{}/repos/{}/{}/releases?per_page={}&page={}",
            self.config.api_url, repo.owner, repo.repo, PER_PAGE, page
        );
        tracing::debug!("GET {}", url);

        let response = self
            .authorized(self.client.get(&url), repo)
            .header(ACCEPT, GITHUB_JSON)
            .header("X-GitHub-Api-Version", API_VERSION)
            .send()
            .await
            .map_err(|source| Error::Transport {
                url: url.clone(),
                source,
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(api_status_error(status, response.headers(), &url, repo));
        }

        let link_header = response
            .headers()
            .get(LINK)
            .and_then(|h| h.to_str().ok())
            .map(str::to_string);

        let page_json: Vec<GitHubReleaseJson> =
            response.json().await.map_err(|source| Error::Transport {
                url: url.clone(),
                source,
            })?;

        let has_next = page_has_next(link_header.as_deref(), page_json.len());
        let releases = page_json
            .iter()
            .filter_map(|json| {
                let release = GitHubRelease::from_json_struct(json);
                if release.is_none() {
                    tracing::warn!("Skipping release without a tag name in {}", repo);
                }
                release
            })
            .collect();

        Ok(ReleasePage { releases, has_next })
    }

    #[instrument(skip_all)]
    async fn download_asset(
        &self,
        repo: &RepoIdentity,
        asset: &GitHubAsset,
        path: &Path,
    ) -> Result<u64> {
        let current_span = tracing::Span::current();
        if let Ok(style) = progress_bar_style() {
            current_span.pb_set_style(&style);
        }
        current_span.pb_set_length(asset.size);
        current_span.pb_set_message(&format!("Downloading {}...", asset.name));
        current_span.pb_set_finish_message(&format!("Downloading {}... Complete!", asset.name));

        let url = &asset.browser_download_url;
        let transport = |source: reqwest::Error| Error::Transport {
            url: url.clone(),
            source,
        };

        let response = self
            .authorized(self.client.get(url), repo)
            .send()
            .await
            .map_err(transport)?;

        let status = response.status();
        if !status.is_success() {
            return Err(match status {
                StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Error::Auth {
                    repo: repo.full_name(),
                    status,
                },
                _ => Error::Api {
                    url: url.clone(),
                    status,
                },
            });
        }

        let chunks = response.bytes_stream().map(|chunk| chunk.map_err(transport));
        write_atomically(chunks, path, |downloaded| {
            current_span.pb_set_position(downloaded)
        })
        .await
    }
}

/// Streams `chunks` into a temporary file next to `path` and renames it into place once
/// the stream is exhausted. On any error the temporary file is removed and an existing
/// file at `path` is left as it was.
async fn write_atomically<S, B>(
    chunks: S,
    path: &Path,
    mut on_progress: impl FnMut(u64),
) -> Result<u64>
where
    S: Stream<Item = Result<B>>,
    B: AsRef<[u8]>,
{
    let dir = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or(Path::new("."));
    let (file, tmp_path) = NamedTempFile::new_in(dir)
        .map_err(|e| Error::io(dir, e))?
        .into_parts();
    let mut file = tokio::fs::File::from_std(file);

    let mut chunks = std::pin::pin!(chunks);
    let mut downloaded = 0u64;
    while let Some(chunk) = chunks.next().await {
        let chunk = chunk?;
        let bytes = chunk.as_ref();
        file.write_all(bytes)
            .await
            .map_err(|e| Error::io(&*tmp_path, e))?;
        downloaded += bytes.len() as u64;

        on_progress(downloaded);
    }

    file.flush().await.map_err(|e| Error::io(&*tmp_path, e))?;
    drop(file);

    tmp_path
        .persist(path)
        .map_err(|e| Error::io(path, e.error))?;
    Ok(downloaded)
}

impl GitHubClient {
    pub fn new(config: &Config) -> Result<Self> {
        let client = Client::builder()
            .user_agent(&config.user_agent)
            .build()
            .map_err(|source| Error::Transport {
                url: config.api_url.clone(),
                source,
            })?;
        Ok(Self {
            config: config.clone(),
            client,
        })
    }

    fn authorized(&self, request: RequestBuilder, repo: &RepoIdentity) -> RequestBuilder {
        match &repo.token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }
}

/// Maps a failed release listing response onto the error taxonomy.
/// A 403 with an exhausted rate limit is not an authentication problem.
fn api_status_error(
    status: StatusCode,
    headers: &HeaderMap,
    url: &str,
    repo: &RepoIdentity,
) -> Error {
    let rate_limited = headers
        .get("x-ratelimit-remaining")
        .and_then(|h| h.to_str().ok())
        .is_some_and(|remaining| remaining.trim() == "0");

    match status {
        StatusCode::UNAUTHORIZED => Error::Auth {
            repo: repo.full_name(),
            status,
        },
        StatusCode::FORBIDDEN if !rate_limited => Error::Auth {
            repo: repo.full_name(),
            status,
        },
        StatusCode::NOT_FOUND => Error::NotFound(repo.full_name()),
        _ => Error::Api {
            url: url.to_string(),
            status,
        },
    }
}

fn has_next_link(link_header: &str) -> bool {
    link_header
        .split(',')
        .any(|part| part.contains("rel=\"next\""))
}

/// The Link header decides when present. Without one, only a full page suggests more.
fn page_has_next(link_header: Option<&str>, page_len: usize) -> bool {
    match link_header {
        Some(header) => has_next_link(header),
        None => page_len >= PER_PAGE as usize,
    }
}
