use crate::error::{Error, Result};
use crate::repo::RepoIdentity;
use std::path::{Path, PathBuf};

pub const DEFAULT_API_URL: &str = "https://api.github.com";
pub const API_URL_ENV_VAR: &str = "GITHUB_API_URL";

#[derive(Debug, Clone)]
pub struct Config {
    /// Base URL of the GitHub REST API (no trailing slash)
    pub api_url: String,

    /// User agent sent with every request
    pub user_agent: String,

    /// Directory holding the per-repository version cache files
    pub cache_dir: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        Self::new_for_path(&Self::default_cache_dir())
    }
}

impl Config {
    pub fn new_for_path(cache_dir: &Path) -> Self {
        let api_url = std::env::var(API_URL_ENV_VAR)
            .ok()
            .filter(|url| !url.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_API_URL.to_string());
        Self {
            api_url: api_url.trim_end_matches('/').to_string(),
            user_agent: format!("relget/{}", env!("CARGO_PKG_VERSION")),
            cache_dir: cache_dir.to_path_buf(),
        }
    }

    /// Config for the given cache directory, or [Self::default_cache_dir] when there is none.
    /// Nothing is created on disk.
    pub fn for_cache_dir(cache_dir: Option<&Path>) -> Self {
        match cache_dir {
            Some(dir) => Self::new_for_path(dir),
            None => Self::default(),
        }
    }

    /// Like [Self::for_cache_dir], but also makes sure the directory exists.
    pub fn setup(cache_dir: Option<&Path>) -> Result<Self> {
        let config = Self::for_cache_dir(cache_dir);

        std::fs::create_dir_all(&config.cache_dir).map_err(|e| Error::io(&config.cache_dir, e))?;

        Ok(config)
    }

    pub fn default_cache_dir() -> PathBuf {
        dirs::cache_dir()
            .unwrap_or_else(|| dirs::home_dir().unwrap_or_default().join(".cache"))
            .join("relget")
    }

    /// Location of the version cache for one repository.
    pub fn cache_file(&self, repo: &RepoIdentity) -> PathBuf {
        self.cache_dir
            .join(format!("repo-{}-{}.cache", repo.owner, repo.repo))
    }
}
