use crate::error::{Error, Result};
use crate::github::GitHubRelease;
use semver::{Version, VersionReq};
use std::fmt;
use std::str::FromStr;

/// A semantic version range such as `~1.1` or `>=1.2.0, <2`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionConstraint {
    req: VersionReq,
    allows_prerelease: bool,
}

impl VersionConstraint {
    pub fn new(req: VersionReq) -> Self {
        let allows_prerelease = req.comparators.iter().any(|c| !c.pre.is_empty());
        Self {
            req,
            allows_prerelease,
        }
    }

    /// True when at least one comparator names a prerelease, e.g. `>=2.0.0-rc.1`.
    pub fn allows_prerelease(&self) -> bool {
        self.allows_prerelease
    }

    pub fn matches(&self, version: &Version) -> bool {
        self.req.matches(version)
    }

    /// Whether `release` is eligible under this constraint.
    ///
    /// Prereleases (flagged by the forge or carrying a prerelease component) are only
    /// considered when the constraint itself mentions a prerelease. Beyond that,
    /// [VersionReq::matches] decides, which also limits prerelease versions to the
    /// `major.minor.patch` of such a comparator.
    pub fn accepts(&self, release: &GitHubRelease) -> bool {
        let Some(version) = parse_tag(&release.tag_name) else {
            return false;
        };
        let is_prerelease = release.prerelease || !version.pre.is_empty();
        if is_prerelease && !self.allows_prerelease {
            return false;
        }
        self.matches(&version)
    }
}

impl FromStr for VersionConstraint {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let req = VersionReq::parse(s.trim()).map_err(|source| Error::InvalidConstraint {
            input: s.to_string(),
            source,
        })?;
        Ok(Self::new(req))
    }
}

impl fmt::Display for VersionConstraint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.req)
    }
}

/// Parses a release tag such as `v1.2.3` or ` 1.2.3 ` into a semantic version.
pub fn parse_tag(tag_name: &str) -> Option<Version> {
    Version::parse(normalize_tag(tag_name)).ok()
}

pub fn normalize_tag(tag_name: &str) -> &str {
    let trimmed = tag_name.trim();
    trimmed
        .strip_prefix('v')
        .or_else(|| trimmed.strip_prefix('V'))
        .unwrap_or(trimmed)
        .trim()
}

/// Picks the first release, in the order given, that satisfies `constraint`.
/// Without a constraint the first release wins, whatever its tag looks like.
pub fn select_release<'a, I>(
    releases: I,
    constraint: Option<&VersionConstraint>,
) -> Option<&'a GitHubRelease>
where
    I: IntoIterator<Item = &'a GitHubRelease>,
{
    let mut releases = releases.into_iter();
    match constraint {
        None => releases.next(),
        Some(constraint) => releases.find(|release| {
            let accepted = constraint.accepts(release);
            if !accepted && parse_tag(&release.tag_name).is_none() {
                tracing::debug!("Ignoring release with non-semver tag '{}'", release.tag_name);
            }
            accepted
        }),
    }
}
