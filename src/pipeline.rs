//! Sequencing of the research stages for one person.
//!
//! 1. **Search**: [`Aggregator::run`] fans out all queries and verifies pages
//! 2. **Deduplicate**: the same article often answers several queries
//! 3. **Keyword filter** (optional): keep snippets mentioning a search term
//! 4. **Identity**: ask the [`IdentityValidator`] about the person
//! 5. **Score**: rate each item with the [`RelevanceScorer`], unless the
//!    identity was explicitly not validated

use crate::aggregator::Aggregator;
use crate::identity::IdentityValidator;
use crate::models::{Dossier, IdentityStatus, ResearchRequest, ScoredNewsItem, VerifiedNewsItem};
use crate::scoring::RelevanceScorer;
use crate::search::NewsSearchProvider;
use crate::verifier::SubjectVerifier;
use futures::stream::{self, StreamExt};
use itertools::Itertools;
use tracing::{info, instrument, warn};

/// Run every stage for `request` and assemble the dossier.
///
/// # Arguments
///
/// * `aggregator` - Runs the concurrent search batch
/// * `validator` - Decides whether the news concerns the intended person
/// * `scorer` - Optional relevance scorer; `None` leaves every score empty
/// * `request` - Who to research and how to query for them
/// * `keyword_filter` - Keep only items whose snippet mentions a search term
///
/// # Returns
///
/// The dossier with the untouched batch (audit trail) and the deduplicated,
/// filtered and scored news list. No stage failure aborts the run.
#[instrument(level = "info", skip_all, fields(person = %request.person_name))]
pub async fn research_person<P, V, I, S>(
    aggregator: &Aggregator<P, V>,
    validator: &I,
    scorer: Option<&S>,
    request: &ResearchRequest,
    keyword_filter: bool,
) -> Dossier
where
    P: NewsSearchProvider,
    V: SubjectVerifier,
    I: IdentityValidator,
    S: RelevanceScorer,
{
    let batch = aggregator.run(request).await;

    let mut news = dedupe_by_link(batch.news_results.clone());
    let unique = news.len();
    if keyword_filter {
        news = filter_by_keywords(news, &request.terms);
    }
    info!(
        found = batch.news_results.len(),
        unique,
        kept = news.len(),
        "Filtered news"
    );

    let identity_status = validator.validate(&request.person_name, &news).await;
    info!(?identity_status, "Identity validation finished");

    let news = match scorer {
        Some(scorer) if identity_status != IdentityStatus::NotValidated => {
            score_items(
                scorer,
                news,
                request,
                aggregator.config().max_concurrent_scores,
            )
            .await
        }
        _ => news
            .into_iter()
            .map(|item| ScoredNewsItem {
                item,
                relevance_score: None,
            })
            .collect(),
    };

    Dossier {
        person_name: request.person_name.clone(),
        identity_status,
        batch,
        news,
    }
}

/// Drop repeated links, keeping the first occurrence.
pub fn dedupe_by_link(items: Vec<VerifiedNewsItem>) -> Vec<VerifiedNewsItem> {
    items.into_iter().unique_by(|i| i.link.clone()).collect()
}

/// Keep items whose snippet mentions any of `keywords`, ignoring case.
pub fn filter_by_keywords(items: Vec<VerifiedNewsItem>, keywords: &[String]) -> Vec<VerifiedNewsItem> {
    let keywords: Vec<String> = keywords.iter().map(|k| k.to_lowercase()).collect();
    items
        .into_iter()
        .filter(|item| {
            let snippet = item.snippet.to_lowercase();
            keywords.iter().any(|k| snippet.contains(k.as_str()))
        })
        .collect()
}

/// Score items concurrently, keeping their order. Failures leave the score empty.
async fn score_items<S: RelevanceScorer>(
    scorer: &S,
    items: Vec<VerifiedNewsItem>,
    request: &ResearchRequest,
    parallelism: usize,
) -> Vec<ScoredNewsItem> {
    stream::iter(items)
        .map(|item| async move {
            let relevance_score = match scorer
                .score(&request.person_name, &item.snippet, &request.terms)
                .await
            {
                Ok(score) => Some(score),
                Err(e) => {
                    warn!(link = %item.link, error = %e, "Scoring failed; leaving item unscored");
                    None
                }
            };
            ScoredNewsItem {
                item,
                relevance_score,
            }
        })
        .buffered(parallelism.max(1))
        .collect()
        .await
}
