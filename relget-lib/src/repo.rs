use std::fmt;

pub const TOKEN_ENV_VAR: &str = "GITHUB_TOKEN";

/// Identifies a GitHub repository, optionally with an access token for private repositories.
#[derive(Clone, PartialEq, Eq)]
pub struct RepoIdentity {
    pub owner: String,
    pub repo: String,
    pub token: Option<String>,
}

impl RepoIdentity {
    pub fn new(owner: &str, repo: &str, token: Option<String>) -> Self {
        Self {
            owner: owner.to_string(),
            repo: repo.to_string(),
            token: token.filter(|t| !t.trim().is_empty()),
        }
    }

    /// Like [Self::new], but falls back to `GITHUB_TOKEN` when no token is given.
    pub fn with_env_token(owner: &str, repo: &str, token: Option<String>) -> Self {
        let token = token
            .filter(|t| !t.trim().is_empty())
            .or_else(|| std::env::var(TOKEN_ENV_VAR).ok());
        Self::new(owner, repo, token)
    }

    pub fn full_name(&self) -> String {
        format!("{}/{}", self.owner, self.repo)
    }
}

impl fmt::Display for RepoIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.owner, self.repo)
    }
}

// Hand-written so the token never ends up in logs.
impl fmt::Debug for RepoIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RepoIdentity")
            .field("owner", &self.owner)
            .field("repo", &self.repo)
            .field("token", &self.token.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}
