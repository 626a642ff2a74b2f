//! URL denylist applied to search results before any page is fetched.
//!
//! Search APIs happily return listicles, directories, legal repositories and
//! social media profiles. A substring denylist is the cheapest precision
//! filter, applied before the expensive scrape-based check in
//! [`crate::verifier`].
//!
//! The pattern set is data: the default list is compiled in from
//! `config/denylist.yaml` and can be replaced at runtime with
//! [`Denylist::load`].

use crate::error::ResearchError;
use once_cell::sync::Lazy;
use serde::Deserialize;
use std::path::Path;
use tracing::{info, instrument};

const DEFAULT_DENYLIST_YAML: &str = include_str!("../config/denylist.yaml");

static DEFAULT_PATTERNS: Lazy<Vec<String>> = Lazy::new(|| {
    parse_patterns(DEFAULT_DENYLIST_YAML).unwrap_or_else(|e| {
        tracing::error!(error = %e, "Embedded denylist is invalid; using an empty list");
        Vec::new()
    })
});

#[derive(Debug, Deserialize)]
struct DenylistFile {
    patterns: Vec<String>,
}

/// Ordered set of case-sensitive URL substring patterns.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Denylist {
    patterns: Vec<String>,
}

impl Default for Denylist {
    fn default() -> Self {
        Self::new(DEFAULT_PATTERNS.iter().cloned())
    }
}

impl Denylist {
    /// Build a denylist from explicit patterns, kept verbatim and in order.
    pub fn new<I, S>(patterns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            patterns: patterns.into_iter().map(Into::into).collect(),
        }
    }

    /// Parse a YAML document of the form `patterns: [..]`.
    pub fn from_yaml_str(yaml: &str) -> Result<Self, ResearchError> {
        Ok(Self::new(parse_patterns(yaml)?))
    }

    /// Load a denylist file from disk.
    #[instrument(level = "info", skip_all, fields(path = %path.as_ref().display()))]
    pub async fn load(path: impl AsRef<Path>) -> Result<Self, ResearchError> {
        let path = path.as_ref();
        let yaml = tokio::fs::read_to_string(path).await.map_err(|e| {
            ResearchError::Configuration(format!(
                "cannot read denylist {}: {}",
                path.display(),
                e
            ))
        })?;
        let denylist = Self::from_yaml_str(&yaml)?;
        info!(patterns = denylist.len(), "Loaded denylist");
        Ok(denylist)
    }

    /// True when any pattern occurs as a substring of `url`.
    pub fn is_blocked(&self, url: &str) -> bool {
        self.patterns.iter().any(|p| url.contains(p.as_str()))
    }

    /// Patterns in the order they were given.
    pub fn patterns(&self) -> &[String] {
        &self.patterns
    }

    /// Number of patterns.
    pub fn len(&self) -> usize {
        self.patterns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }
}

fn parse_patterns(yaml: &str) -> Result<Vec<String>, ResearchError> {
    let file: DenylistFile = serde_yaml::from_str(yaml)
        .map_err(|e| ResearchError::Configuration(format!("invalid denylist: {}", e)))?;
    // An empty entry would match every URL.
    Ok(file
        .patterns
        .into_iter()
        .filter(|p| !p.is_empty())
        .collect())
}
