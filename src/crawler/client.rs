//! Map-search HTTP client
//!
//! This module issues one search request per (sector, query, page):
//! - Browser-consistent headers, a rotating User-Agent and a consent cookie
//! - Custom TLS configuration on direct connections
//! - Redirects surfaced as rate-limit signals instead of being followed
//! - Retry with exponential backoff on rate limits only

use crate::crawler::pb::build_pb;
use crate::crawler::retry::{RetryDecision, RetryPolicy};
use crate::crawler::tls::browser_tls_config;
use crate::model::{ClientTuning, Sector};
use reqwest::cookie::Jar;
use reqwest::header::{ACCEPT, ACCEPT_ENCODING, ACCEPT_LANGUAGE, REFERER, USER_AGENT};
use reqwest::{redirect::Policy, Client, Proxy, StatusCode};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use url::Url;

/// Desktop Chrome user agents, one picked at random per request
const USER_AGENTS: &[&str] = &[
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/131.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/131.0.0.0 Safari/537.36",
    "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/131.0.0.0 Safari/537.36",
];

const ACCEPT_VALUE: &str = "text/html,application/xhtml+xml,application/xml;q=0.9,image/avif,image/webp,image/apng,*/*;q=0.8";
const ACCEPT_LANGUAGE_VALUE: &str = "es-ES,es;q=0.9,en;q=0.8";
const REFERER_VALUE: &str = "https://www.google.com/";
const CONSENT_COOKIE: &str = "CONSENT=YES+ES.es+V14+BX; Path=/";

/// Why a search request failed
#[derive(Debug, Clone, PartialEq, Error)]
pub enum FetchError {
    /// The backend pushed back (429, 403 or a redirect)
    #[error("rate limited (status {status})")]
    RateLimited { status: u16 },

    #[error("unexpected status {status}")]
    UnexpectedStatus { status: u16 },

    /// Connection, TLS or timeout failure
    #[error("executing request: {0}")]
    Transport(String),

    #[error("reading body: {0}")]
    Body(String),

    /// The client or request URL could not be built
    #[error("building client: {0}")]
    Build(String),

    #[error("cancelled")]
    Cancelled,
}

impl FetchError {
    /// Returns true for rate-limit signals
    pub fn is_rate_limit(&self) -> bool {
        matches!(self, Self::RateLimited { .. })
    }
}

/// Returns true for statuses the backend uses to push back
pub fn is_rate_limit_status(status: StatusCode) -> bool {
    status == StatusCode::TOO_MANY_REQUESTS
        || status == StatusCode::FORBIDDEN
        || status.is_redirection()
}

/// Client for paged map searches
#[derive(Debug)]
pub struct SearchClient {
    http: Client,
    search_url: Url,
    lang: String,
    zoom: u8,
    retry: RetryPolicy,
    rate_limits: AtomicU64,
}

impl SearchClient {
    /// Builds a client
    ///
    /// # Arguments
    ///
    /// * `tuning` - Endpoint, timeouts and retry policy
    /// * `lang` - Interface language (`hl` parameter)
    /// * `zoom` - Zoom level used to derive the camera altitude
    /// * `proxy` - Optional HTTP or SOCKS5 proxy URL; disables the custom TLS setup
    pub fn new(
        tuning: &ClientTuning,
        lang: &str,
        zoom: u8,
        proxy: Option<&str>,
    ) -> Result<Self, FetchError> {
        let search_url = Url::parse(&tuning.search_url)
            .map_err(|e| FetchError::Build(format!("invalid search URL: {}", e)))?;

        let jar = Jar::default();
        jar.add_cookie_str(CONSENT_COOKIE, &search_url);

        let mut builder = Client::builder()
            .cookie_provider(Arc::new(jar))
            .redirect(Policy::none())
            .timeout(tuning.request_timeout)
            .connect_timeout(tuning.connect_timeout)
            .tcp_keepalive(Duration::from_secs(30))
            .pool_max_idle_per_host(150)
            .pool_idle_timeout(Duration::from_secs(90))
            .http1_only();

        builder = match proxy {
            Some(proxy) => {
                let proxy = Proxy::all(proxy).map_err(|e| FetchError::Build(e.to_string()))?;
                builder.proxy(proxy)
            }
            None => {
                let tls = browser_tls_config().map_err(|e| FetchError::Build(e.to_string()))?;
                builder.use_preconfigured_tls(tls)
            }
        };

        let http = builder
            .build()
            .map_err(|e| FetchError::Build(e.to_string()))?;

        Ok(Self {
            http,
            search_url,
            lang: lang.to_string(),
            zoom,
            retry: tuning.retry.clone(),
            rate_limits: AtomicU64::new(0),
        })
    }

    /// Rate-limited attempts since the last successful request
    pub fn consecutive_rate_limits(&self) -> u64 {
        self.rate_limits.load(Ordering::SeqCst)
    }

    /// Request URL for one page of results around a sector
    pub fn request_url(&self, sector: &Sector, query: &str, offset: u32) -> Url {
        let pb = build_pb(sector.lat, sector.lng, self.zoom, offset);

        let mut url = self.search_url.clone();
        url.query_pairs_mut()
            .append_pair("tbm", "map")
            .append_pair("authuser", "0")
            .append_pair("hl", &self.lang)
            .append_pair("q", query)
            .append_pair("pb", &pb);
        url
    }

    /// Fetches one page of map results, retrying on rate limits
    ///
    /// # Returns
    ///
    /// * `Ok(Vec<u8>)` - Raw response body
    /// * `Err(FetchError::RateLimited)` - Still rate limited after the last attempt
    /// * `Err(FetchError::Cancelled)` - Cancelled during a backoff sleep
    /// * `Err(_)` - Any other failure, returned without retrying
    pub async fn search_map(
        &self,
        sector: &Sector,
        query: &str,
        offset: u32,
        cancel: &CancellationToken,
    ) -> Result<Vec<u8>, FetchError> {
        let url = self.request_url(sector, query, offset);
        let mut attempt = 0;

        loop {
            if cancel.is_cancelled() {
                return Err(FetchError::Cancelled);
            }

            let err = match self.execute(url.clone()).await {
                Ok(body) => {
                    self.rate_limits.store(0, Ordering::SeqCst);
                    return Ok(body);
                }
                Err(e) => e,
            };

            if err.is_rate_limit() {
                self.rate_limits.fetch_add(1, Ordering::SeqCst);
            }

            match self.retry.decide(attempt, &err, rand::random::<f64>()) {
                RetryDecision::GiveUp => return Err(err),
                RetryDecision::Wait(backoff) => {
                    tracing::debug!(
                        "Sector {} attempt {} failed ({}), retrying in {:?}",
                        sector,
                        attempt + 1,
                        err,
                        backoff
                    );
                    tokio::select! {
                        _ = cancel.cancelled() => return Err(FetchError::Cancelled),
                        _ = tokio::time::sleep(backoff) => {}
                    }
                }
            }

            attempt += 1;
        }
    }

    async fn execute(&self, url: Url) -> Result<Vec<u8>, FetchError> {
        let user_agent = USER_AGENTS[rand::random_range(0..USER_AGENTS.len())];

        let response = self
            .http
            .get(url)
            .header(USER_AGENT, user_agent)
            .header(ACCEPT, ACCEPT_VALUE)
            .header(ACCEPT_LANGUAGE, ACCEPT_LANGUAGE_VALUE)
            .header(ACCEPT_ENCODING, "identity")
            .header(REFERER, REFERER_VALUE)
            .send()
            .await
            .map_err(classify_transport_error)?;

        let status = response.status();
        if is_rate_limit_status(status) {
            return Err(FetchError::RateLimited {
                status: status.as_u16(),
            });
        }
        if !status.is_success() {
            return Err(FetchError::UnexpectedStatus {
                status: status.as_u16(),
            });
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| FetchError::Body(e.to_string()))?;

        Ok(body.to_vec())
    }
}

fn classify_transport_error(e: reqwest::Error) -> FetchError {
    if e.is_timeout() {
        FetchError::Transport("request timeout".to_string())
    } else if e.is_connect() {
        FetchError::Transport(format!("connection failed: {}", e))
    } else {
        FetchError::Transport(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn tuning(server: &MockServer) -> ClientTuning {
        ClientTuning {
            search_url: format!("{}/search", server.uri()),
            retry: RetryPolicy {
                max_attempts: 3,
                base_backoff: Duration::from_millis(5),
                max_backoff: Duration::from_millis(20),
                jitter_factor: 0.5,
            },
            ..Default::default()
        }
    }

    fn sector() -> Sector {
        Sector {
            lat: 40.4168,
            lng: -3.7038,
            span: 0.01,
            row: 3,
            col: 7,
        }
    }

    #[test]
    fn test_rate_limit_statuses() {
        assert!(is_rate_limit_status(StatusCode::TOO_MANY_REQUESTS));
        assert!(is_rate_limit_status(StatusCode::FORBIDDEN));
        assert!(is_rate_limit_status(StatusCode::FOUND));
        assert!(is_rate_limit_status(StatusCode::MOVED_PERMANENTLY));
        assert!(is_rate_limit_status(StatusCode::TEMPORARY_REDIRECT));
        assert!(!is_rate_limit_status(StatusCode::OK));
        assert!(!is_rate_limit_status(StatusCode::INTERNAL_SERVER_ERROR));
        assert!(!is_rate_limit_status(StatusCode::NOT_FOUND));
    }

    #[test]
    fn test_invalid_search_url() {
        let tuning = ClientTuning {
            search_url: "not a url".to_string(),
            ..Default::default()
        };
        assert!(matches!(
            SearchClient::new(&tuning, "en", 13, None),
            Err(FetchError::Build(_))
        ));
    }

    #[test]
    fn test_request_url_parameters() {
        let client = SearchClient::new(&ClientTuning::default(), "es", 13, None).unwrap();
        let url = client.request_url(&sector(), "cafés y bares", 20);

        let pairs: Vec<(String, String)> = url.query_pairs().into_owned().collect();
        let get = |k: &str| pairs.iter().find(|(key, _)| key == k).map(|(_, v)| v.as_str());

        assert_eq!(url.host_str(), Some("www.google.com"));
        assert_eq!(get("tbm"), Some("map"));
        assert_eq!(get("authuser"), Some("0"));
        assert_eq!(get("hl"), Some("es"));
        assert_eq!(get("q"), Some("cafés y bares"));
        assert!(get("pb").unwrap().contains("!8i20!"));
    }

    #[tokio::test]
    async fn test_success_returns_body_with_browser_headers() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/search"))
            .and(query_param("tbm", "map"))
            .and(query_param("q", "cafes"))
            .and(header("accept-encoding", "identity"))
            .and(header("referer", REFERER_VALUE))
            .and(header("cookie", "CONSENT=YES+ES.es+V14+BX"))
            .respond_with(ResponseTemplate::new(200).set_body_string(")]}'\n[]"))
            .expect(1)
            .mount(&server)
            .await;

        let client = SearchClient::new(&tuning(&server), "en", 13, None).unwrap();
        let body = client
            .search_map(&sector(), "cafes", 0, &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(body, b")]}'\n[]".to_vec());
    }

    #[tokio::test]
    async fn test_rate_limit_retried_up_to_max_attempts() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(429))
            .expect(3)
            .mount(&server)
            .await;

        let client = SearchClient::new(&tuning(&server), "en", 13, None).unwrap();
        let result = client
            .search_map(&sector(), "cafes", 0, &CancellationToken::new())
            .await;

        assert_eq!(result, Err(FetchError::RateLimited { status: 429 }));
        assert_eq!(client.consecutive_rate_limits(), 3);
    }

    #[tokio::test]
    async fn test_redirect_is_rate_limit_not_followed() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(
                ResponseTemplate::new(302).insert_header("location", "https://consent.example/"),
            )
            .expect(3)
            .mount(&server)
            .await;

        let client = SearchClient::new(&tuning(&server), "en", 13, None).unwrap();
        let result = client
            .search_map(&sector(), "cafes", 0, &CancellationToken::new())
            .await;

        assert_eq!(result, Err(FetchError::RateLimited { status: 302 }));
    }

    #[tokio::test]
    async fn test_server_error_not_retried() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(500))
            .expect(1)
            .mount(&server)
            .await;

        let client = SearchClient::new(&tuning(&server), "en", 13, None).unwrap();
        let result = client
            .search_map(&sector(), "cafes", 0, &CancellationToken::new())
            .await;

        assert_eq!(result, Err(FetchError::UnexpectedStatus { status: 500 }));
        assert_eq!(client.consecutive_rate_limits(), 0);
    }

    #[tokio::test]
    async fn test_success_resets_streak() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(429))
            .up_to_n_times(2)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string("[]"))
            .mount(&server)
            .await;

        let client = SearchClient::new(&tuning(&server), "en", 13, None).unwrap();
        let body = client
            .search_map(&sector(), "cafes", 0, &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(body, b"[]".to_vec());
        assert_eq!(client.consecutive_rate_limits(), 0);
    }

    #[tokio::test]
    async fn test_cancelled_before_request() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let client = SearchClient::new(&tuning(&server), "en", 13, None).unwrap();
        let cancel = CancellationToken::new();
        cancel.cancel();

        let result = client.search_map(&sector(), "cafes", 0, &cancel).await;
        assert_eq!(result, Err(FetchError::Cancelled));
    }

    #[tokio::test]
    async fn test_connection_refused_is_transport_error() {
        let tuning = ClientTuning {
            search_url: "http://127.0.0.1:9/search".to_string(),
            ..Default::default()
        };
        let client = SearchClient::new(&tuning, "en", 13, None).unwrap();

        let result = client
            .search_map(&sector(), "cafes", 0, &CancellationToken::new())
            .await;
        assert!(matches!(result, Err(FetchError::Transport(_))));
    }
}
