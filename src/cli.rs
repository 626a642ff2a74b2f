//! Command-line interface definitions.
//!
//! This module defines the CLI arguments and options using the `clap` crate.
//! Credentials can be provided via command-line flags or environment variables.

use crate::config::ResearchConfig;
use crate::models::{Locale, ResearchRequest};
use crate::scoring::DEFAULT_SCORER_TEMPLATE;
use clap::Parser;
use std::path::PathBuf;
use std::time::Duration;

/// Research adverse media about a person and write a ranked news dossier.
///
/// # Examples
///
/// ```sh
/// # Search the default financial-crime terms for an individual
/// kyc_news_dossier "João Silva"
///
/// # A company with a trade name, scored by the LLM
/// kyc_news_dossier "ACME COMERCIO LTDA" --large-company --alternate-name ACME --score
/// ```
#[derive(Parser, Debug)]
#[command(author, version, about)]
pub struct Cli {
    /// Full name of the person (or company) to research
    pub person_name: String,

    /// Search term combined with the name; repeat for several terms
    #[arg(
        short,
        long = "term",
        default_values_t = [
            "crime".to_string(),
            "corrupção".to_string(),
            "lavagem de dinheiro".to_string(),
        ]
    )]
    pub terms: Vec<String>,

    /// Results requested per query
    #[arg(short, long, default_value_t = 10)]
    pub limit: u32,

    /// Search country
    #[arg(long, default_value = "br")]
    pub geo: String,

    /// Search language
    #[arg(long, default_value = "pt-br")]
    pub lang: String,

    /// Trade name or alias, also searched as an exact phrase
    #[arg(short, long)]
    pub alternate_name: Option<String>,

    /// Search the name unquoted (medium and large companies)
    #[arg(long)]
    pub large_company: bool,

    /// Skip fetching pages to check the person is the main subject
    #[arg(long)]
    pub no_verify: bool,

    /// Keep only results whose snippet mentions one of the terms
    #[arg(long)]
    pub keyword_filter: bool,

    /// Serper API key
    #[arg(long, env = "SERPER_API_KEY", hide_env_values = true)]
    pub serper_api_key: Option<String>,

    /// YAML file replacing the built-in URL denylist
    #[arg(long)]
    pub denylist: Option<PathBuf>,

    /// Maximum number of queries in flight
    #[arg(long, default_value_t = 8)]
    pub max_concurrent_queries: usize,

    /// Timeout of every HTTP request, in seconds
    #[arg(long, default_value_t = 20)]
    pub request_timeout_secs: u64,

    /// Deadline for one query including page verification, in seconds
    #[arg(long, default_value_t = 120)]
    pub query_timeout_secs: u64,

    /// Score each result with the LLM relevance scorer
    #[arg(long)]
    pub score: bool,

    /// Path to the scorer's config.yaml (defaults to the awful_aj config dir)
    #[arg(long)]
    pub scorer_config: Option<PathBuf>,

    /// awful_aj template used for scoring prompts
    #[arg(long, default_value = DEFAULT_SCORER_TEMPLATE)]
    pub scorer_template: String,

    /// Output file for the JSON dossier
    #[arg(short, long, default_value = "resultado.json")]
    pub output: PathBuf,
}

impl Cli {
    pub fn research_config(&self) -> ResearchConfig {
        ResearchConfig {
            max_concurrent_queries: self.max_concurrent_queries,
            request_timeout: Duration::from_secs(self.request_timeout_secs),
            query_timeout: Duration::from_secs(self.query_timeout_secs),
            verify_pages: !self.no_verify,
            ..ResearchConfig::default()
        }
    }

    pub fn research_request(&self) -> ResearchRequest {
        ResearchRequest {
            person_name: self.person_name.trim().to_string(),
            terms: self.terms.clone(),
            limit: self.limit,
            locale: Locale {
                geo: self.geo.clone(),
                lang: self.lang.clone(),
            },
            alternate_name: self
                .alternate_name
                .as_deref()
                .map(str::trim)
                .filter(|n| !n.is_empty())
                .map(str::to_string),
            large_company: self.large_company,
        }
    }
}
