//! News search: provider access and per-query candidate filtering.
//!
//! [`NewsSearchProvider`] is the seam to the external search API, implemented
//! for Serper by [`SerperClient`]. [`SearchClient`] runs one query end to end:
//! it asks the provider for candidates, drops denylisted links, verifies the
//! rest and splits them into accepted items and rejected URLs.
//!
//! A query that fails at the provider contributes nothing. It never aborts
//! the batch.

use crate::denylist::Denylist;
use crate::error::ResearchError;
use crate::models::{Locale, NewsCandidate, QueryOutcome, VerifiedNewsItem};
use crate::utils::truncate_for_log;
use crate::verifier::SubjectVerifier;
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;
use tokio::time::{Instant, timeout_at};
use tracing::{debug, info, instrument, warn};
use url::Url;

/// Serper news endpoint.
pub const SERPER_NEWS_URL: &str = "https://google.serper.dev/news";
/// Environment variable holding the Serper API key.
pub const SERPER_API_KEY_ENV: &str = "SERPER_API_KEY";

/// Parameters of a single search call.
#[derive(Debug, Clone, Copy)]
pub struct SearchParams<'a> {
    pub query: &'a str,
    pub limit: u32,
    pub locale: &'a Locale,
}

/// External news search API.
pub trait NewsSearchProvider {
    /// Run one search and return the candidates in the provider's order.
    ///
    /// # Errors
    ///
    /// * [`ResearchError::Transport`] - network failure, timeout or non-2xx status
    /// * [`ResearchError::Parse`] - the response body is not the expected JSON
    async fn search_news(&self, params: &SearchParams<'_>)
    -> Result<Vec<NewsCandidate>, ResearchError>;
}

/// [`NewsSearchProvider`] backed by the Serper API.
#[derive(Debug, Clone)]
pub struct SerperClient {
    api_key: String,
    client: reqwest::Client,
    endpoint: String,
}

#[derive(Debug, Deserialize)]
struct SerperResponse {
    #[serde(default)]
    organic: Vec<SerperResult>,
    #[serde(default)]
    news: Vec<SerperResult>,
}

#[derive(Debug, Deserialize)]
struct SerperResult {
    title: Option<String>,
    link: Option<String>,
    snippet: Option<String>,
    date: Option<String>,
}

impl SerperClient {
    /// Build a client for [`SERPER_NEWS_URL`]; a missing or blank key is a
    /// configuration error.
    pub fn new(api_key: Option<String>, timeout: Duration) -> Result<Self, ResearchError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ResearchError::Configuration(format!("cannot build HTTP client: {}", e)))?;
        Self::with_client(api_key, client, SERPER_NEWS_URL)
    }

    /// Use a preconfigured HTTP client against `endpoint`.
    ///
    /// # Arguments
    ///
    /// * `api_key` - Serper key, sent as the `X-API-KEY` header
    /// * `client` - HTTP client carrying the request timeout
    /// * `endpoint` - URL the search body is POSTed to
    pub fn with_client(
        api_key: Option<String>,
        client: reqwest::Client,
        endpoint: impl Into<String>,
    ) -> Result<Self, ResearchError> {
        let api_key = api_key
            .map(|k| k.trim().to_string())
            .filter(|k| !k.is_empty())
            .ok_or_else(|| {
                ResearchError::Configuration(format!("{} is not set", SERPER_API_KEY_ENV))
            })?;

        Ok(Self {
            api_key,
            client,
            endpoint: endpoint.into(),
        })
    }
}

impl NewsSearchProvider for SerperClient {
    #[instrument(level = "info", skip_all, fields(query = %params.query))]
    async fn search_news(
        &self,
        params: &SearchParams<'_>,
    ) -> Result<Vec<NewsCandidate>, ResearchError> {
        let body = json!({
            "q": params.query,
            "num": params.limit,
            "gl": params.locale.geo,
            "hl": params.locale.lang,
            "type": "search",
            "page": 1,
            "autocorrect": true,
        });

        let text = self
            .client
            .post(&self.endpoint)
            .header("X-API-KEY", &self.api_key)
            .json(&body)
            .send()
            .await?
            .error_for_status()?
            .text()
            .await?;

        let candidates = parse_serper_response(&text, params.query).inspect_err(|_| {
            debug!(body = %truncate_for_log(&text, 300), "Unparsable Serper response");
        })?;
        info!(count = candidates.len(), "Serper search complete");
        Ok(candidates)
    }
}

/// Map a Serper JSON body to candidates, preferring `organic` over `news`.
pub fn parse_serper_response(
    body: &str,
    query: &str,
) -> Result<Vec<NewsCandidate>, ResearchError> {
    let data: SerperResponse = serde_json::from_str(body)?;
    let results = if data.organic.is_empty() {
        data.news
    } else {
        data.organic
    };

    Ok(results
        .into_iter()
        .map(|r| NewsCandidate {
            title: r.title.unwrap_or_default(),
            link: r.link.unwrap_or_default(),
            snippet: r.snippet.unwrap_or_default(),
            published_date: r.date.unwrap_or_default(),
            source_query: query.to_string(),
        })
        .collect())
}

/// Runs one query: search, denylist, verification.
#[derive(Debug)]
pub struct SearchClient<P, V> {
    provider: P,
    verifier: V,
    denylist: Denylist,
    verify_pages: bool,
}

impl<P, V> SearchClient<P, V>
where
    P: NewsSearchProvider,
    V: SubjectVerifier,
{
    /// Create a client with page verification enabled.
    pub fn new(provider: P, verifier: V, denylist: Denylist) -> Self {
        Self {
            provider,
            verifier,
            denylist,
            verify_pages: true,
        }
    }

    /// Enable or disable the scrape-based main-subject check.
    pub fn verify_pages(mut self, enabled: bool) -> Self {
        self.verify_pages = enabled;
        self
    }

    /// Search `query` and classify every candidate before `deadline`.
    ///
    /// # Arguments
    ///
    /// * `query` - Exact query string sent to the provider
    /// * `limit` - Results requested from the provider
    /// * `locale` - Country and language of the search
    /// * `person_name` - Name whose mentions the verifier counts
    /// * `deadline` - Point after which no further page is verified
    ///
    /// # Returns
    ///
    /// The accepted items and rejected URLs, both in the provider's order.
    /// Denylisted links are dropped without being counted as rejected. Links
    /// that are not absolute URLs, fail verification, or are still unverified
    /// when the deadline passes are rejected. Work completed before the
    /// deadline is always kept.
    #[instrument(level = "info", skip_all, fields(%query))]
    pub async fn search(
        &self,
        query: &str,
        limit: u32,
        locale: &Locale,
        person_name: &str,
        deadline: Instant,
    ) -> QueryOutcome {
        let params = SearchParams {
            query,
            limit,
            locale,
        };
        let candidates = match timeout_at(deadline, self.provider.search_news(&params)).await {
            Ok(Ok(c)) => c,
            Ok(Err(e)) => {
                warn!(error = %e, "News search failed; query contributes nothing");
                return QueryOutcome::default();
            }
            Err(_) => {
                warn!("News search hit the query deadline; query contributes nothing");
                return QueryOutcome::default();
            }
        };

        let mut outcome = QueryOutcome::default();
        let mut blocked = 0usize;
        let mut unverified = 0usize;
        let mut deadline_hit = false;
        for mut candidate in candidates {
            if self.denylist.is_blocked(&candidate.link) {
                blocked += 1;
                debug!(link = %candidate.link, "Denylisted");
                continue;
            }
            if Url::parse(&candidate.link).is_err() {
                debug!(title = %candidate.title, link = %candidate.link, "Result without a valid link");
                outcome.rejected.push(candidate.link);
                continue;
            }

            // `None`: the query deadline passed before the page was verified.
            let verdict = if !self.verify_pages {
                Some(true)
            } else if deadline_hit {
                None
            } else {
                let verify = self
                    .verifier
                    .is_person_main_subject(&candidate.link, person_name);
                match timeout_at(deadline, verify).await {
                    Ok(is_subject) => Some(is_subject),
                    Err(_) => {
                        warn!(link = %candidate.link, "Query deadline reached; remaining pages are not verified");
                        deadline_hit = true;
                        None
                    }
                }
            };

            match verdict {
                Some(true) => {
                    candidate.source_query = query.to_string();
                    outcome.accepted.push(VerifiedNewsItem::from(candidate));
                }
                Some(false) => outcome.rejected.push(candidate.link),
                None => {
                    unverified += 1;
                    outcome.rejected.push(candidate.link);
                }
            }
        }

        info!(
            accepted = outcome.accepted.len(),
            rejected = outcome.rejected.len(),
            blocked,
            unverified,
            "Query classified"
        );
        outcome
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::collections::{HashMap, HashSet};
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;
    use tokio::sync::oneshot;

    fn no_deadline() -> Instant {
        Instant::now() + Duration::from_secs(60)
    }

    /// Provider answering from a fixed table; unknown queries fail.
    #[derive(Debug, Default)]
    pub(crate) struct MockProvider {
        pub(crate) responses: HashMap<String, Vec<NewsCandidate>>,
    }

    impl MockProvider {
        pub(crate) fn with(mut self, query: &str, links: &[&str]) -> Self {
            let candidates = links
                .iter()
                .map(|link| NewsCandidate {
                    title: format!("title of {link}"),
                    link: link.to_string(),
                    snippet: format!("snippet about crime at {link}"),
                    published_date: "1 day ago".to_string(),
                    source_query: String::new(),
                })
                .collect();
            self.responses.insert(query.to_string(), candidates);
            self
        }
    }

    impl NewsSearchProvider for MockProvider {
        async fn search_news(
            &self,
            params: &SearchParams<'_>,
        ) -> Result<Vec<NewsCandidate>, ResearchError> {
            self.responses
                .get(params.query)
                .cloned()
                .ok_or_else(|| ResearchError::Transport("connection reset".to_string()))
        }
    }

    /// Verifier accepting only the listed URLs.
    #[derive(Debug, Default)]
    pub(crate) struct MockVerifier {
        pub(crate) subjects: HashSet<String>,
    }

    impl MockVerifier {
        pub(crate) fn accepting(links: &[&str]) -> Self {
            Self {
                subjects: links.iter().map(|l| l.to_string()).collect(),
            }
        }
    }

    impl SubjectVerifier for MockVerifier {
        async fn is_person_main_subject(&self, url: &str, _person_name: &str) -> bool {
            self.subjects.contains(url)
        }
    }

    #[test]
    fn test_parse_prefers_organic() {
        let body = r#"{
            "organic": [{"title": "A", "link": "https://a.example", "snippet": "s", "date": "1 day ago"}],
            "news": [{"title": "B", "link": "https://b.example"}]
        }"#;
        let candidates = parse_serper_response(body, "q").unwrap();
        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].link, "https://a.example");
        assert_eq!(candidates[0].published_date, "1 day ago");
        assert_eq!(candidates[0].source_query, "q");
    }

    #[test]
    fn test_parse_falls_back_to_news() {
        let body = r#"{"organic": [], "news": [{"title": "B", "link": "https://b.example", "snippet": null}]}"#;
        let candidates = parse_serper_response(body, "q").unwrap();
        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].title, "B");
        assert_eq!(candidates[0].snippet, "");
        assert_eq!(candidates[0].published_date, "");
    }

    #[test]
    fn test_parse_without_results() {
        let candidates = parse_serper_response(r#"{"searchParameters": {}}"#, "q").unwrap();
        assert!(candidates.is_empty());
    }

    #[test]
    fn test_parse_malformed_body() {
        assert!(matches!(
            parse_serper_response("<html>502</html>", "q"),
            Err(ResearchError::Parse(_))
        ));
    }

    #[test]
    fn test_missing_api_key_is_configuration_error() {
        let err = SerperClient::new(None, Duration::from_secs(5)).unwrap_err();
        assert!(matches!(err, ResearchError::Configuration(_)));
        let err = SerperClient::new(Some("  ".to_string()), Duration::from_secs(5)).unwrap_err();
        assert!(matches!(err, ResearchError::Configuration(_)));
    }

    #[tokio::test]
    async fn test_search_classifies_candidates_in_order() {
        let provider = MockProvider::default().with(
            "\"João Silva\" crime",
            &[
                "https://news.example/1",
                "https://www.jusbrasil.com.br/processo",
                "https://news.example/2",
                "https://news.example/3",
                "",
                "/relative/path",
            ],
        );
        let verifier = MockVerifier::accepting(&["https://news.example/1", "https://news.example/3"]);
        let client = SearchClient::new(provider, verifier, Denylist::default());

        let outcome = client
            .search("\"João Silva\" crime", 10, &Locale::default(), "João Silva", no_deadline())
            .await;

        let accepted: Vec<_> = outcome.accepted.iter().map(|i| i.link.as_str()).collect();
        assert_eq!(accepted, vec!["https://news.example/1", "https://news.example/3"]);
        assert_eq!(
            outcome.rejected,
            vec!["https://news.example/2", "", "/relative/path"]
        );
        assert!(outcome
            .accepted
            .iter()
            .all(|i| i.source_query == "\"João Silva\" crime"));
    }

    #[tokio::test]
    async fn test_search_without_verification_accepts_all_allowed() {
        let provider = MockProvider::default().with(
            "q",
            &["https://news.example/1", "https://site.example/doc.pdf"],
        );
        let client = SearchClient::new(provider, MockVerifier::default(), Denylist::default())
            .verify_pages(false);

        let outcome = client
            .search("q", 10, &Locale::default(), "João Silva", no_deadline())
            .await;
        assert_eq!(outcome.accepted.len(), 1);
        assert!(outcome.rejected.is_empty());
    }

    #[tokio::test]
    async fn test_provider_failure_yields_empty_outcome() {
        let client = SearchClient::new(
            MockProvider::default(),
            MockVerifier::default(),
            Denylist::default(),
        );
        let outcome = client
            .search("unknown", 10, &Locale::default(), "João Silva", no_deadline())
            .await;
        assert_eq!(outcome, QueryOutcome::default());
    }

    /// Verifier that answers the first URL at once and never answers the rest.
    struct HangingVerifier {
        fast: &'static str,
    }

    impl SubjectVerifier for HangingVerifier {
        async fn is_person_main_subject(&self, url: &str, _person_name: &str) -> bool {
            if url != self.fast {
                futures::future::pending::<()>().await;
            }
            true
        }
    }

    #[tokio::test]
    async fn test_deadline_keeps_pages_verified_in_time() {
        let provider = MockProvider::default().with(
            "q",
            &["https://news.example/1", "https://news.example/2", "https://news.example/3"],
        );
        let verifier = HangingVerifier {
            fast: "https://news.example/1",
        };
        let client = SearchClient::new(provider, verifier, Denylist::default());

        let deadline = Instant::now() + Duration::from_millis(50);
        let outcome = client
            .search("q", 10, &Locale::default(), "João Silva", deadline)
            .await;

        let accepted: Vec<_> = outcome.accepted.iter().map(|i| i.link.as_str()).collect();
        assert_eq!(accepted, vec!["https://news.example/1"]);
        assert_eq!(
            outcome.rejected,
            vec!["https://news.example/2", "https://news.example/3"]
        );
    }

    /// Answer one HTTP request on an ephemeral port and hand back the raw request.
    async fn capture_once(
        status: &'static str,
        body: &'static str,
    ) -> (String, oneshot::Receiver<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let (tx, rx) = oneshot::channel();
        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut raw = Vec::new();
            let mut buf = [0u8; 4096];
            loop {
                let n = socket.read(&mut buf).await.unwrap();
                if n == 0 {
                    break;
                }
                raw.extend_from_slice(&buf[..n]);
                let text = String::from_utf8_lossy(&raw);
                if let Some((head, rest)) = text.split_once("\r\n\r\n") {
                    let expected = head
                        .lines()
                        .find_map(|line| {
                            let (name, value) = line.split_once(':')?;
                            name.trim()
                                .eq_ignore_ascii_case("content-length")
                                .then(|| value.trim().parse::<usize>().ok())
                                .flatten()
                        })
                        .unwrap_or(0);
                    if rest.len() >= expected {
                        break;
                    }
                }
            }
            let _ = tx.send(String::from_utf8_lossy(&raw).into_owned());

            let head = format!(
                "HTTP/1.1 {status}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
                body.len()
            );
            socket.write_all(head.as_bytes()).await.unwrap();
            socket.write_all(body.as_bytes()).await.unwrap();
            let _ = socket.shutdown().await;
        });
        (format!("http://{}/news", addr), rx)
    }

    fn local_serper(endpoint: String) -> SerperClient {
        let client = reqwest::Client::builder()
            .no_proxy()
            .timeout(Duration::from_secs(5))
            .build()
            .unwrap();
        SerperClient::with_client(Some("test-key".to_string()), client, endpoint).unwrap()
    }

    #[tokio::test]
    async fn test_serper_request_shape() {
        let (endpoint, request) = capture_once(
            "200 OK",
            r#"{"news": [{"title": "Operação", "link": "https://news.example/1", "snippet": "s", "date": "2 days ago"}]}"#,
        )
        .await;
        let locale = Locale::default();
        let params = SearchParams {
            query: "\"João Silva\" crime",
            limit: 7,
            locale: &locale,
        };

        let candidates = local_serper(endpoint).search_news(&params).await.unwrap();
        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].link, "https://news.example/1");
        assert_eq!(candidates[0].source_query, "\"João Silva\" crime");

        let raw = request.await.unwrap();
        let (head, body) = raw.split_once("\r\n\r\n").unwrap();
        assert!(head.starts_with("POST /news HTTP/1.1"));
        assert!(head
            .lines()
            .any(|l| l.to_ascii_lowercase() == "x-api-key: test-key"));

        let sent: serde_json::Value = serde_json::from_str(body).unwrap();
        assert_eq!(
            sent,
            json!({
                "q": "\"João Silva\" crime",
                "num": 7,
                "gl": "br",
                "hl": "pt-br",
                "type": "search",
                "page": 1,
                "autocorrect": true,
            })
        );
    }

    #[tokio::test]
    async fn test_serper_error_status_is_transport_error() {
        let (endpoint, _request) = capture_once("500 Internal Server Error", "{}").await;
        let locale = Locale::default();
        let params = SearchParams {
            query: "q",
            limit: 10,
            locale: &locale,
        };
        let err = local_serper(endpoint).search_news(&params).await.unwrap_err();
        assert!(matches!(err, ResearchError::Transport(_)));
    }

    #[tokio::test]
    async fn test_serper_html_body_is_parse_error() {
        let (endpoint, _request) = capture_once("200 OK", "<html>502 Bad Gateway</html>").await;
        let locale = Locale::default();
        let params = SearchParams {
            query: "q",
            limit: 10,
            locale: &locale,
        };
        let err = local_serper(endpoint).search_news(&params).await.unwrap_err();
        assert!(matches!(err, ResearchError::Parse(_)));
    }
}
