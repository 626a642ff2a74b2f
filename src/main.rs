//! # KYC News Dossier
//!
//! Automated adverse-media research on a named person: query a news search
//! API for terms associated with financial crime, drop low-value sources,
//! verify by scraping that the person is the main subject of each article,
//! optionally score relevance with an LLM, and write the evidence to JSON.
//!
//! ## Usage
//!
//! ```sh
//! SERPER_API_KEY=... kyc_news_dossier "João Silva" -o ./dossiers/joao_silva.json
//! ```
//!
//! ## Architecture
//!
//! 1. **Queries**: one query per term (and per alternate name)
//! 2. **Search**: all queries fan out concurrently against Serper
//! 3. **Filtering**: URL denylist, then page verification per candidate
//! 4. **Aggregation**: outcomes merged into a single timed batch
//! 5. **Scoring**: optional LLM relevance score per deduplicated item
//! 6. **Output**: pretty UTF-8 JSON dossier

use clap::Parser;
use std::error::Error;
use tracing::{debug, error, info, instrument, warn};
use tracing_subscriber::{EnvFilter, fmt as tfmt};

mod aggregator;
mod cli;
mod config;
mod denylist;
mod error;
mod identity;
mod models;
mod outputs;
mod pipeline;
mod queries;
mod scoring;
mod search;
mod utils;
mod verifier;

use aggregator::Aggregator;
use cli::Cli;
use denylist::Denylist;
use identity::UncheckedIdentity;
use outputs::json;
use pipeline::research_person;
use scoring::LlmScorer;
use search::{SearchClient, SerperClient};
use utils::ensure_parent_dir;
use verifier::PageVerifier;

#[tokio::main]
#[instrument]
async fn main() -> Result<(), Box<dyn Error>> {
    // --- Tracing init ---
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tfmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_file(false)
        .with_line_number(false)
        .with_timer(tracing_subscriber::fmt::time::UtcTime::rfc_3339())
        .init();

    let start_time = std::time::Instant::now();
    info!("kyc_news_dossier starting up");

    let args = Cli::parse();
    debug!(person = %args.person_name, terms = ?args.terms, output = %args.output.display(), "Parsed CLI arguments");

    let config = args.research_config();
    let request = args.research_request();
    if request.person_name.is_empty() {
        error!("Person name is empty");
        return Err("person name must not be empty".into());
    }

    // Fail before any network work if the dossier cannot be written
    if let Err(e) = ensure_parent_dir(&args.output).await {
        error!(
            path = %args.output.display(),
            error = %e,
            "Output directory is not writable (fix perms or choose a different path)"
        );
        return Err(e);
    }

    // ---- Collaborators ----
    let denylist = match &args.denylist {
        Some(path) => Denylist::load(path).await?,
        None => Denylist::default(),
    };
    if denylist.is_empty() {
        warn!("Denylist is empty; every search result will be fetched");
    } else {
        info!(patterns = denylist.len(), "Denylist ready");
        debug!(patterns = ?denylist.patterns(), "Denylist patterns");
    }

    let provider = SerperClient::new(args.serper_api_key.clone(), config.request_timeout)
        .inspect_err(|e| error!(error = %e, "Search provider is not configured"))?;
    let verifier = PageVerifier::new(config.request_timeout, config.max_page_bytes)?;
    let client = SearchClient::new(provider, verifier, denylist).verify_pages(config.verify_pages);
    let aggregator = Aggregator::new(client, config);

    let scorer = if args.score {
        match LlmScorer::load(args.scorer_config.as_deref(), &args.scorer_template).await {
            Ok(s) => Some(s),
            Err(e) => {
                warn!(error = %e, "Relevance scorer unavailable; continuing without scores");
                None
            }
        }
    } else {
        None
    };

    // ---- Research ----
    let dossier = research_person(
        &aggregator,
        &UncheckedIdentity,
        scorer.as_ref(),
        &request,
        args.keyword_filter,
    )
    .await;

    info!(
        news = dossier.news.len(),
        failed_urls = dossier.batch.failed_urls.len(),
        batch_secs = dossier.batch.duration_seconds,
        identity = ?dossier.identity_status,
        "Research finished"
    );

    // ---- Output ----
    if let Err(e) = json::write_dossier(&dossier, &args.output).await {
        error!(path = %args.output.display(), error = %e, "Failed to write dossier JSON");
        return Err(e);
    }
    println!("Dossier saved to '{}'", args.output.display());

    let elapsed = start_time.elapsed();
    info!(
        ?elapsed,
        secs = elapsed.as_secs(),
        millis = elapsed.subsec_millis(),
        "Execution complete"
    );

    Ok(())
}
