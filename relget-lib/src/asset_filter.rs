use crate::error::{Error, Result};
use crate::github::GitHubAsset;
use regex::Regex;
use std::fmt;
use std::str::FromStr;

/// Selects release assets whose whole name matches a regular expression.
/// The default filter keeps everything.
#[derive(Debug, Clone, Default)]
pub struct AssetFilter {
    pattern: Option<Pattern>,
}

#[derive(Debug, Clone)]
struct Pattern {
    source: String,
    anchored: Regex,
}

impl AssetFilter {
    pub fn all() -> Self {
        Self::default()
    }

    pub fn new(pattern: &str) -> Result<Self> {
        // Anchor so `.*\.exe` cannot match `tool.exe.sig`.
        let anchored = Regex::new(&format!("^(?:{pattern})$")).map_err(|source| {
            Error::InvalidPattern {
                input: pattern.to_string(),
                source,
            }
        })?;
        Ok(Self {
            pattern: Some(Pattern {
                source: pattern.to_string(),
                anchored,
            }),
        })
    }

    pub fn is_match(&self, name: &str) -> bool {
        self.pattern
            .as_ref()
            .is_none_or(|pattern| pattern.anchored.is_match(name))
    }

    /// Keeps the matching assets in their original order.
    pub fn apply(&self, assets: &[GitHubAsset]) -> Vec<GitHubAsset> {
        assets
            .iter()
            .filter(|asset| self.is_match(&asset.name))
            .cloned()
            .collect()
    }
}

impl FromStr for AssetFilter {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::new(s)
    }
}

impl fmt::Display for AssetFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.pattern {
            Some(pattern) => write!(f, "{}", pattern.source),
            None => write!(f, "<all assets>"),
        }
    }
}
