//! Concurrent fan-out of all queries for one person, fanned back into a
//! single [`BatchResult`].
//!
//! Every query runs as an independent future owning its own
//! [`QueryOutcome`]. The futures are driven together with
//! `buffer_unordered` and merged only once all of them have resolved, so no
//! shared accumulator or lock is involved. A failing or slow query only ever
//! costs its own contribution: provider errors are absorbed by the
//! [`SearchClient`], and each query gets a deadline of
//! [`ResearchConfig::query_timeout`] from the moment it starts. Pages verified
//! before the deadline are kept; the rest are reported as failed URLs.

use crate::config::ResearchConfig;
use crate::models::{BatchResult, QueryOutcome, ResearchRequest};
use crate::queries::build_queries;
use crate::search::{NewsSearchProvider, SearchClient};
use crate::verifier::SubjectVerifier;
use chrono::Local;
use futures::stream::{self, StreamExt};
use tokio::time::Instant;
use tracing::{info, instrument};

/// Runs one batch of searches for a person.
#[derive(Debug)]
pub struct Aggregator<P, V> {
    client: SearchClient<P, V>,
    config: ResearchConfig,
}

impl<P, V> Aggregator<P, V>
where
    P: NewsSearchProvider,
    V: SubjectVerifier,
{
    /// Pair a search client with the bounds of the batch.
    pub fn new(client: SearchClient<P, V>, config: ResearchConfig) -> Self {
        Self { client, config }
    }

    /// Bounds this aggregator was built with.
    pub fn config(&self) -> &ResearchConfig {
        &self.config
    }

    /// Search every query variant for the request and merge the outcomes.
    ///
    /// # Returns
    ///
    /// A [`BatchResult`] with the accepted items and rejected URLs of all
    /// queries, plus wall-clock timestamps and duration. Never fails; the
    /// worst case is a batch with no news results.
    #[instrument(level = "info", skip_all, fields(person = %request.person_name))]
    pub async fn run(&self, request: &ResearchRequest) -> BatchResult {
        let start_timestamp = Local::now();
        let t0 = Instant::now();

        let queries = build_queries(
            &request.person_name,
            &request.terms,
            request.alternate_name.as_deref(),
            request.large_company,
        );
        let parallelism = self.config.max_concurrent_queries.max(1);
        info!(queries = queries.len(), parallelism, "Starting batch");

        let client = &self.client;
        let query_timeout = self.config.query_timeout;
        let outcomes: Vec<QueryOutcome> = stream::iter(queries)
            .map(|query| async move {
                let deadline = Instant::now() + query_timeout;
                client
                    .search(
                        &query,
                        request.limit,
                        &request.locale,
                        &request.person_name,
                        deadline,
                    )
                    .await
            })
            .buffer_unordered(parallelism)
            .collect()
            .await;

        let mut news_results = Vec::new();
        let mut failed_urls = Vec::new();
        for outcome in outcomes {
            news_results.extend(outcome.accepted);
            failed_urls.extend(outcome.rejected);
        }

        let end_timestamp = Local::now();
        let duration_seconds = t0.elapsed().as_secs_f64();
        info!(
            news = news_results.len(),
            failed = failed_urls.len(),
            duration_seconds,
            "Batch complete"
        );

        BatchResult {
            start_timestamp,
            end_timestamp,
            duration_seconds,
            news_results,
            failed_urls,
        }
    }
}
