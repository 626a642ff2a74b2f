//! Data models for search candidates, verified news items and batch results.
//!
//! This module defines the core data structures used throughout the application:
//! - [`NewsCandidate`]: Raw search result for one query
//! - [`VerifiedNewsItem`]: Candidate that survived the denylist and page verification
//! - [`BatchResult`]: Aggregate output of one run across all queries
//! - [`Dossier`]: Persisted per-person document with scores and identity status

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};

/// Default number of results requested per query.
pub const DEFAULT_LIMIT: u32 = 10;
/// Default search country.
pub const DEFAULT_GEO: &str = "br";
/// Default search language.
pub const DEFAULT_LANG: &str = "pt-br";

/// A raw news result returned by the search provider for one query.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct NewsCandidate {
    pub title: String,
    pub link: String,
    /// May be empty.
    pub snippet: String,
    /// Loosely formatted ("2 days ago", "12 mar. 2024"), may be empty.
    pub published_date: String,
    /// The query string that produced this result.
    pub source_query: String,
}

/// A candidate that passed the denylist and, when enabled, page verification.
///
/// Only the search client builds these, so holding one means the link was
/// checked.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct VerifiedNewsItem {
    pub title: String,
    pub link: String,
    pub snippet: String,
    pub published_date: String,
    pub source_query: String,
}

impl From<NewsCandidate> for VerifiedNewsItem {
    fn from(c: NewsCandidate) -> Self {
        Self {
            title: c.title,
            link: c.link,
            snippet: c.snippet,
            published_date: c.published_date,
            source_query: c.source_query,
        }
    }
}

/// Link that failed the main-subject check or could not be fetched.
pub type RejectedUrl = String;

/// Country and language hints passed to the search provider.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Locale {
    pub geo: String,
    pub lang: String,
}

impl Default for Locale {
    fn default() -> Self {
        Self {
            geo: DEFAULT_GEO.to_string(),
            lang: DEFAULT_LANG.to_string(),
        }
    }
}

/// Input of one batch: who to research and how to query for them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResearchRequest {
    pub person_name: String,
    pub terms: Vec<String>,
    pub limit: u32,
    pub locale: Locale,
    /// Trade name or other alias, always searched as an exact phrase.
    pub alternate_name: Option<String>,
    /// Search the name unquoted, for organizations with common-word names.
    pub large_company: bool,
}

impl ResearchRequest {
    /// Request for an individual with the default limit and locale.
    pub fn new(person_name: impl Into<String>, terms: Vec<String>) -> Self {
        Self {
            person_name: person_name.into(),
            terms,
            limit: DEFAULT_LIMIT,
            locale: Locale::default(),
            alternate_name: None,
            large_company: false,
        }
    }
}

/// Contribution of a single query to the batch.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryOutcome {
    pub accepted: Vec<VerifiedNewsItem>,
    pub rejected: Vec<RejectedUrl>,
}

/// Aggregate output of one [`crate::aggregator::Aggregator::run`].
///
/// Timestamps and duration are captured once during the run and never
/// recomputed.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct BatchResult {
    pub start_timestamp: DateTime<Local>,
    pub end_timestamp: DateTime<Local>,
    pub duration_seconds: f64,
    /// Completion order of the concurrent queries; not significant.
    pub news_results: Vec<VerifiedNewsItem>,
    pub failed_urls: Vec<RejectedUrl>,
}

/// Outcome of the identity-validation stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum IdentityStatus {
    Validated,
    NotValidated,
    /// No validator with real data was consulted.
    Unchecked,
}

/// A verified item with the relevance score assigned by the scorer, if any.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct ScoredNewsItem {
    #[serde(flatten)]
    pub item: VerifiedNewsItem,
    /// Raw scorer reply (expected 0-10); `None` when scoring was skipped or failed.
    pub relevance_score: Option<String>,
}

/// The document persisted for one researched person.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Dossier {
    pub person_name: String,
    pub identity_status: IdentityStatus,
    pub batch: BatchResult,
    /// Deduplicated (and optionally keyword-filtered) items, scored when enabled.
    pub news: Vec<ScoredNewsItem>,
}
