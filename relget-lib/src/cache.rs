use crate::error::{Error, Result};
use serde::Deserialize;
use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

/// Handle to the file remembering the last version that was downloaded for a repository.
///
/// The file holds exactly one version string. `read` and `write` are the only operations the
/// update pipeline uses; `clear` exists for explicit user requests.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionCache {
    path: PathBuf,
}

/// Cache layout written by older releases: `{"version": "1.2.3"}`.
#[derive(Deserialize)]
struct LegacyCacheRecord {
    version: Option<String>,
}

impl VersionCache {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Returns the stored version. A missing or empty file means nothing was cached yet.
    pub fn read(&self) -> Result<Option<String>> {
        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(Error::io(&self.path, e)),
        };

        let content = content.trim();
        if content.starts_with('{')
            && let Ok(legacy) = serde_json::from_str::<LegacyCacheRecord>(content)
        {
            return Ok(legacy
                .version
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty()));
        }

        Ok(Some(content.to_string()).filter(|v| !v.is_empty()))
    }

    /// Replaces the stored version. The new content is written to a temporary file next to
    /// the cache and renamed over it, so an interrupted write leaves the old value intact.
    pub fn write(&self, version: &str) -> Result<()> {
        let dir = self
            .path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or(Path::new("."));
        fs::create_dir_all(dir).map_err(|e| Error::io(dir, e))?;

        let mut tmp = NamedTempFile::new_in(dir).map_err(|e| Error::io(dir, e))?;
        tmp.write_all(version.as_bytes())
            .and_then(|_| tmp.as_file().sync_all())
            .map_err(|e| Error::io(tmp.path(), e))?;
        tmp.persist(&self.path)
            .map_err(|e| Error::io(&self.path, e.error))?;

        tracing::debug!("Cached version {} in {}", version, self.path.display());
        Ok(())
    }

    /// Removes the cache file. Returns whether there was anything to remove.
    pub fn clear(&self) -> Result<bool> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(Error::io(&self.path, e)),
        }
    }
}
