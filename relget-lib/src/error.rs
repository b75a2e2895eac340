use crate::repo::RepoIdentity;
use crate::version_matcher::VersionConstraint;
use reqwest::StatusCode;
use std::path::PathBuf;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Request to {url} failed: {source}")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("GitHub API returned {status} for {url}")]
    Api { url: String, status: StatusCode },

    #[error("Access to {repo} was denied ({status}). Check the GitHub token.")]
    Auth { repo: String, status: StatusCode },

    #[error("Repository {0} was not found (private repositories need a token)")]
    NotFound(String),

    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("No release of {repo} satisfies '{constraint}'")]
    NoMatch { repo: String, constraint: String },

    #[error("Invalid version constraint '{input}': {source}")]
    InvalidConstraint {
        input: String,
        #[source]
        source: semver::Error,
    },

    #[error("Asset name '{0}' is not a plain file name")]
    InvalidAssetName(String),

    #[error("Invalid asset pattern '{input}': {source}")]
    InvalidPattern {
        input: String,
        #[source]
        source: regex::Error,
    },
}

/// Coarse classification of [`Error`], used by callers that only care about the category.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Network,
    Auth,
    NotFound,
    Io,
    NoMatch,
    InvalidInput,
}

impl Error {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::Transport { .. } | Error::Api { .. } => ErrorKind::Network,
            Error::Auth { .. } => ErrorKind::Auth,
            Error::NotFound(_) => ErrorKind::NotFound,
            Error::Io { .. } => ErrorKind::Io,
            Error::NoMatch { .. } => ErrorKind::NoMatch,
            Error::InvalidConstraint { .. }
            | Error::InvalidPattern { .. }
            | Error::InvalidAssetName(_) => ErrorKind::InvalidInput,
        }
    }

    pub fn no_match(repo: &RepoIdentity, constraint: Option<&VersionConstraint>) -> Self {
        Error::NoMatch {
            repo: repo.full_name(),
            constraint: constraint.map_or("*".to_string(), |c| c.to_string()),
        }
    }

    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Error::Io {
            path: path.into(),
            source,
        }
    }
}
