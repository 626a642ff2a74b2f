//! Runtime bounds for a research batch.

use crate::verifier::DEFAULT_MAX_PAGE_BYTES;
use std::time::Duration;

/// Bounds applied to the network work of a batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResearchConfig {
    /// Queries in flight at once; values below 1 are treated as 1.
    pub max_concurrent_queries: usize,
    /// Timeout of every individual HTTP request.
    pub request_timeout: Duration,
    /// Deadline for one query, including all its page verifications.
    pub query_timeout: Duration,
    /// Fetch each candidate page and check the person is its main subject.
    pub verify_pages: bool,
    /// Relevance scoring calls in flight at once.
    pub max_concurrent_scores: usize,
    /// Largest page body read during verification.
    pub max_page_bytes: usize,
}

impl Default for ResearchConfig {
    fn default() -> Self {
        Self {
            max_concurrent_queries: 8,
            request_timeout: Duration::from_secs(20),
            query_timeout: Duration::from_secs(120),
            verify_pages: true,
            max_concurrent_scores: 4,
            max_page_bytes: DEFAULT_MAX_PAGE_BYTES,
        }
    }
}
