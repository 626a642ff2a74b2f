//! Page verification: is the researched person the main subject of an article?
//!
//! A person merely mentioned in passing usually appears once or twice in an
//! article. Repeated appearance of the full name in the visible text is used
//! as a cheap, conservative proxy for "this article is about them".
//!
//! # Algorithm
//!
//! 1. GET the page (per-request timeout, browser User-Agent, body size cap)
//! 2. Take the charset from the `Content-Type` header, defaulting to UTF-8
//! 3. Decode strictly; malformed bytes or an unknown label fail verification
//! 4. Extract visible text, skipping `script`, `style`, `noscript` and `template`
//! 5. Count non-overlapping, case-insensitive occurrences of the name
//! 6. The person is the main subject iff the count is above [`MAIN_SUBJECT_THRESHOLD`]
//!
//! Name variants (accents, abbreviations, nicknames) are not normalized, so
//! some genuine articles are undercounted. That is an accepted
//! precision/recall tradeoff.

use crate::error::ResearchError;
use encoding_rs::Encoding;
use reqwest::header::CONTENT_TYPE;
use scraper::Html;
use std::time::Duration;
use tracing::{debug, instrument, warn};

/// A name must appear strictly more than this many times.
pub const MAIN_SUBJECT_THRESHOLD: usize = 3;

/// Pages larger than this are not read.
pub const DEFAULT_MAX_PAGE_BYTES: usize = 5 * 1024 * 1024;

const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

/// Elements whose text content is never shown to the reader.
const HIDDEN_ELEMENTS: [&str; 4] = ["script", "style", "noscript", "template"];

/// Decides whether a person is the primary subject of the page at `url`.
///
/// Implementations never fail: every error path resolves to `false`.
pub trait SubjectVerifier {
    async fn is_person_main_subject(&self, url: &str, person_name: &str) -> bool;
}

/// [`SubjectVerifier`] that fetches and inspects the page over HTTP.
#[derive(Debug, Clone)]
pub struct PageVerifier {
    client: reqwest::Client,
    max_page_bytes: usize,
}

impl PageVerifier {
    /// Build a verifier whose every request is bounded by `timeout`.
    ///
    /// # Arguments
    ///
    /// * `timeout` - Deadline of each page request, connect to last byte
    /// * `max_page_bytes` - Pages with a larger body fail verification
    pub fn new(timeout: Duration, max_page_bytes: usize) -> Result<Self, ResearchError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| ResearchError::Configuration(format!("cannot build HTTP client: {}", e)))?;
        Ok(Self::with_client(client, max_page_bytes))
    }

    /// Use a preconfigured client (custom proxy, TLS or timeout settings).
    pub fn with_client(client: reqwest::Client, max_page_bytes: usize) -> Self {
        Self {
            client,
            max_page_bytes,
        }
    }

    async fn fetch_text(&self, url: &str) -> Result<String, ResearchError> {
        let mut response = self.client.get(url).send().await?.error_for_status()?;
        if response
            .content_length()
            .is_some_and(|len| len > self.max_page_bytes as u64)
        {
            return Err(self.too_large());
        }
        let charset = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .and_then(charset_from_content_type);

        // Content-Length may be absent or wrong; enforce the cap while reading.
        let mut bytes = Vec::new();
        while let Some(chunk) = response.chunk().await? {
            if bytes.len() + chunk.len() > self.max_page_bytes {
                return Err(self.too_large());
            }
            bytes.extend_from_slice(&chunk);
        }
        decode_body(&bytes, charset.as_deref())
    }

    fn too_large(&self) -> ResearchError {
        ResearchError::Transport(format!("page body exceeds {} bytes", self.max_page_bytes))
    }
}

impl SubjectVerifier for PageVerifier {
    #[instrument(level = "info", skip_all, fields(%url))]
    async fn is_person_main_subject(&self, url: &str, person_name: &str) -> bool {
        let html = match self.fetch_text(url).await {
            Ok(html) => html,
            Err(e) => {
                warn!(error = %e, "Page verification fetch failed");
                return false;
            }
        };

        let mentions = count_mentions(&visible_text(&html), person_name);
        let is_subject = mentions > MAIN_SUBJECT_THRESHOLD;
        debug!(mentions, is_subject, "Counted name mentions");
        is_subject
    }
}

/// Extract the `charset` parameter of a `Content-Type` header value.
pub fn charset_from_content_type(content_type: &str) -> Option<String> {
    content_type.split(';').skip(1).find_map(|param| {
        let (key, value) = param.split_once('=')?;
        if !key.trim().eq_ignore_ascii_case("charset") {
            return None;
        }
        let value = value.trim().trim_matches(|c| c == '"' || c == '\'');
        (!value.is_empty()).then(|| value.to_string())
    })
}

/// Decode `bytes` with the named charset (UTF-8 when `None`), without replacement.
pub fn decode_body(bytes: &[u8], charset: Option<&str>) -> Result<String, ResearchError> {
    let label = charset.unwrap_or("utf-8");
    let encoding = Encoding::for_label(label.as_bytes())
        .ok_or_else(|| ResearchError::Parse(format!("unknown charset {:?}", label)))?;
    encoding
        .decode_without_bom_handling_and_without_replacement(bytes)
        .map(|text| text.into_owned())
        .ok_or_else(|| ResearchError::Parse(format!("body is not valid {}", encoding.name())))
}

/// All human-visible text of an HTML document, concatenated in document order.
pub fn visible_text(html: &str) -> String {
    let document = Html::parse_document(html);
    let mut out = String::new();

    for node in document.root_element().descendants() {
        let Some(text) = node.value().as_text() else {
            continue;
        };
        let hidden = node.ancestors().any(|a| {
            a.value()
                .as_element()
                .is_some_and(|e| HIDDEN_ELEMENTS.contains(&e.name()))
        });
        if !hidden {
            out.push_str(text);
        }
    }
    out
}

/// Non-overlapping, case-insensitive occurrences of `name` in `text`.
pub fn count_mentions(text: &str, name: &str) -> usize {
    let needle = name.trim().to_lowercase();
    if needle.is_empty() {
        return 0;
    }
    text.to_lowercase().matches(needle.as_str()).count()
}
