//! Relevance scoring of verified news items through an LLM, with exponential
//! backoff retry logic.
//!
//! The scorer is a downstream collaborator of the research pipeline: given a
//! snippet, the researched person and the search terms, it returns a 0-10
//! relevance score. The reply is kept as the raw text the model produced;
//! its format is not validated.
//!
//! # Architecture
//!
//! - [`RelevanceScorer`]: what the pipeline calls
//! - [`AskAsync`]: core trait defining async LLM interaction
//! - [`AskFnWrapper`]: wraps the `awful_aj` library's `ask` function
//! - [`RetryAsk`]: decorator that adds retry logic to any `AskAsync` implementation
//! - [`LlmScorer`]: builds the prompt and drives `RetryAsk<AskFnWrapper>`
//!
//! # Retry Strategy
//!
//! - Maximum 3 retry attempts
//! - Exponential backoff starting at 1 second
//! - Maximum delay capped at 30 seconds
//! - Random jitter (0-250ms) added to prevent thundering herd

use awful_aj::api::ask;
use awful_aj::{config, config_dir, config::AwfulJadeConfig, template, template::ChatTemplate};
use once_cell::sync::Lazy;
use rand::{Rng, rng};
use regex::Regex;
use std::error::Error;
use std::fmt;
use std::path::Path;
use std::time::{Duration as StdDuration, Instant};
use tokio::time::sleep;
use tracing::{debug, error, info, instrument, warn};

use crate::utils::truncate_for_log;

/// Default `awful_aj` template used for scoring prompts.
pub const DEFAULT_SCORER_TEMPLATE: &str = "relevance_scorer";

static SCORE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b(10|[0-9])(?:[.,][0-9]+)?\b").expect("valid score regex"));

/// Assigns a relevance score to one news snippet about a person.
pub trait RelevanceScorer {
    async fn score(
        &self,
        person_name: &str,
        snippet: &str,
        terms: &[String],
    ) -> Result<String, Box<dyn Error>>;
}

/// One prompt in, one model reply out.
///
/// [`LlmScorer`] talks to the model only through this seam, so retries wrap
/// the `awful_aj` call and tests can substitute a flaky backend.
pub trait AskAsync {
    type Response;

    /// Send `text` as the user message of a single chat turn.
    async fn ask(&self, text: &str) -> Result<Self::Response, Box<dyn Error>>;
}

/// Retries a failing [`AskAsync`] with capped exponential backoff.
///
/// Retry `n` waits `min(base_delay * 2^(n-1), 30s)` plus up to 250 ms of
/// jitter. After `max_retries` retries the last error is returned.
pub struct RetryAsk<T> {
    inner: T,
    max_retries: usize,
    base_delay: StdDuration,
    max_delay: StdDuration,
}

impl<T> RetryAsk<T>
where
    T: AskAsync,
{
    /// Wrap `inner`; `max_retries` counts retries, not the first attempt.
    pub fn new(inner: T, max_retries: usize, base_delay: StdDuration) -> Self {
        Self {
            inner,
            max_retries,
            base_delay,
            max_delay: StdDuration::from_secs(30),
        }
    }

    /// Delay before retry number `attempt` (1-based), without jitter.
    fn backoff(&self, attempt: usize) -> StdDuration {
        let shift = (attempt.saturating_sub(1)).min(31) as u32;
        self.base_delay.saturating_mul(1 << shift).min(self.max_delay)
    }
}

impl<T> fmt::Debug for RetryAsk<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RetryAsk")
            .field("max_retries", &self.max_retries)
            .field("base_delay", &self.base_delay)
            .field("max_delay", &self.max_delay)
            .finish()
    }
}

impl<T> AskAsync for RetryAsk<T>
where
    T: AskAsync,
{
    type Response = T::Response;

    #[instrument(level = "info", skip_all)]
    async fn ask(&self, text: &str) -> Result<Self::Response, Box<dyn Error>> {
        let total_t0 = Instant::now();
        let mut attempt = 0usize;

        loop {
            let attempt_t0 = Instant::now();
            match self.inner.ask(text).await {
                Ok(resp) => return Ok(resp),
                Err(e) => {
                    attempt += 1;
                    let attempt_dt = attempt_t0.elapsed();
                    let total_dt = total_t0.elapsed();

                    if attempt > self.max_retries {
                        error!(
                            attempt,
                            max = self.max_retries,
                            elapsed_ms_attempt = attempt_dt.as_millis(),
                            elapsed_ms_total = total_dt.as_millis(),
                            error = %e,
                            "ask() exhausted retries"
                        );
                        return Err(e);
                    }

                    let jitter_ms: u64 = rng().random_range(0..=250);
                    let delay = self.backoff(attempt) + StdDuration::from_millis(jitter_ms);

                    warn!(
                        attempt,
                        max = self.max_retries,
                        elapsed_ms_attempt = attempt_dt.as_millis(),
                        elapsed_ms_total = total_dt.as_millis(),
                        ?delay,
                        error = %e,
                        "ask() attempt failed; backing off"
                    );
                    sleep(delay).await;
                }
            }
        }
    }
}

/// [`AskAsync`] over `awful_aj::api::ask` with a borrowed config and template.
#[derive(Debug)]
pub struct AskFnWrapper<'a> {
    pub config: &'a AwfulJadeConfig,
    pub template: &'a ChatTemplate,
}

impl<'a> AskAsync for AskFnWrapper<'a> {
    type Response = String;

    #[instrument(level = "info", skip_all)]
    async fn ask(&self, text: &str) -> Result<Self::Response, Box<dyn Error>> {
        let t0 = Instant::now();
        let res = ask(self.config, text.to_string(), self.template, None, None).await;
        if let Err(e) = &res {
            warn!(elapsed_ms = t0.elapsed().as_millis(), error = %e, "API call failed");
        }
        res
    }
}

/// [`RelevanceScorer`] backed by an OpenAI-compatible model via `awful_aj`.
#[derive(Debug)]
pub struct LlmScorer {
    config: AwfulJadeConfig,
    template: ChatTemplate,
    max_retries: usize,
    base_delay: StdDuration,
}

impl LlmScorer {
    /// Scorer with 3 retries starting at a 1 s backoff.
    pub fn new(config: AwfulJadeConfig, template: ChatTemplate) -> Self {
        Self {
            config,
            template,
            max_retries: 3,
            base_delay: StdDuration::from_secs(1),
        }
    }

    /// Load the `awful_aj` config (explicit path or `config_dir()/config.yaml`)
    /// and the named template.
    #[instrument(level = "info", skip_all, fields(template = %template_name))]
    pub async fn load(
        config_path: Option<&Path>,
        template_name: &str,
    ) -> Result<Self, Box<dyn Error>> {
        let config_path = match config_path {
            Some(p) => p.to_path_buf(),
            None => config_dir()?.join("config.yaml"),
        };
        let config_path = config_path
            .to_str()
            .ok_or("scorer config path is not valid UTF-8")?
            .to_string();
        let config = config::load_config(&config_path)?;
        info!(%config_path, "Loaded scorer configuration");

        let template = template::load_template(template_name).await?;
        info!("Loaded scorer template");
        Ok(Self::new(config, template))
    }
}

impl RelevanceScorer for LlmScorer {
    #[instrument(level = "info", skip_all, fields(person = %person_name))]
    async fn score(
        &self,
        person_name: &str,
        snippet: &str,
        terms: &[String],
    ) -> Result<String, Box<dyn Error>> {
        let t0 = Instant::now();
        let prompt = scoring_prompt(person_name, snippet, terms);
        let client = AskFnWrapper {
            config: &self.config,
            template: &self.template,
        };
        let api = RetryAsk::new(client, self.max_retries, self.base_delay);

        let reply = api.ask(&prompt).await?;
        let reply = reply.trim().to_string();
        debug!(
            elapsed_ms = t0.elapsed().as_millis(),
            parsed = ?extract_score(&reply),
            reply = %truncate_for_log(&reply, 200),
            "Scored snippet"
        );
        Ok(reply)
    }
}

/// Prompt asking the model to rate a snippet from 0 to 10.
pub fn scoring_prompt(person_name: &str, snippet: &str, terms: &[String]) -> String {
    let terms = terms
        .iter()
        .map(|t| format!("'{}'", t))
        .collect::<Vec<_>>()
        .join(", ");
    format!(
        "Classifique a relevância dessa notícia sobre '{}' em relação aos termos {}: {} (Nota 0-10)",
        person_name, terms, snippet
    )
}

/// First 0-10 integer in a model reply, if any.
pub fn extract_score(reply: &str) -> Option<u8> {
    SCORE_RE
        .captures(reply)
        .and_then(|c| c.get(1))
        .and_then(|m| m.as_str().parse().ok())
}
