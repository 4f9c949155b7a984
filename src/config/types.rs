use crate::crawler::{RetryPolicy, ThrottlePolicy};
use crate::model::{AreaTarget, ClientTuning, SearchParams, DEFAULT_SEARCH_URL};
use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

/// Main configuration structure for geosweep
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub search: SearchConfig,
    pub area: AreaConfig,
    #[serde(default)]
    pub client: ClientConfig,
    #[serde(default)]
    pub throttle: ThrottleConfig,
    pub output: OutputConfig,
}

/// What to search for and how hard
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct SearchConfig {
    /// Search terms, each crawled over every sector
    pub queries: Vec<String>,

    /// Zoom level; defaults to 13 for radius searches and 10 for countries
    #[serde(default)]
    pub zoom: Option<u8>,

    /// Maximum number of concurrent jobs
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,

    /// Maximum pagination rounds per sector
    #[serde(default = "default_max_pages")]
    pub max_pages: u32,

    #[serde(default)]
    pub min_rating: Option<f64>,

    #[serde(default)]
    pub max_rating: Option<f64>,

    /// Interface language sent to the backend
    #[serde(default = "default_lang")]
    pub lang: String,

    /// Dump raw payloads to the output debug directory
    #[serde(default)]
    pub debug: bool,
}

/// Area selection: either a country (optionally narrowed to a region) or a
/// coordinate with a radius
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct AreaConfig {
    /// ISO 3166-1 alpha-2 code
    #[serde(default)]
    pub country: Option<String>,

    /// Free-text region resolved by geocoding
    #[serde(default)]
    pub region: Option<String>,

    #[serde(default)]
    pub lat: Option<f64>,

    #[serde(default)]
    pub lng: Option<f64>,

    #[serde(default)]
    pub radius_km: Option<f64>,
}

/// HTTP client settings
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct ClientConfig {
    #[serde(default = "default_search_url")]
    pub search_url: String,

    /// HTTP or SOCKS5 proxy URL
    #[serde(default)]
    pub proxy: Option<String>,

    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,

    /// Attempts per request when rate limited
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    #[serde(default = "default_base_backoff_ms")]
    pub base_backoff_ms: u64,

    #[serde(default = "default_max_backoff_ms")]
    pub max_backoff_ms: u64,
}

/// Adaptive delay and abort settings
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct ThrottleConfig {
    #[serde(default = "default_step_up_ms")]
    pub step_up_ms: u64,

    #[serde(default = "default_step_down_ms")]
    pub step_down_ms: u64,

    #[serde(default = "default_ceiling_ms")]
    pub ceiling_ms: u64,

    /// Consecutive rate limits tolerated before aborting
    #[serde(default = "default_block_threshold")]
    pub block_threshold: u64,

    /// Time in-flight jobs get to finish after cancellation
    #[serde(default = "default_shutdown_grace_secs")]
    pub shutdown_grace_secs: u64,
}

/// Output configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct OutputConfig {
    /// Path to the SQLite database file
    pub database_path: String,

    /// Directory for debug payload dumps
    #[serde(default = "default_debug_dir")]
    pub debug_dir: String,
}

fn default_concurrency() -> usize {
    10
}

fn default_max_pages() -> u32 {
    1
}

fn default_lang() -> String {
    "en".to_string()
}

fn default_search_url() -> String {
    DEFAULT_SEARCH_URL.to_string()
}

fn default_request_timeout_secs() -> u64 {
    15
}

fn default_connect_timeout_secs() -> u64 {
    10
}

fn default_max_attempts() -> u32 {
    3
}

fn default_base_backoff_ms() -> u64 {
    2_000
}

fn default_max_backoff_ms() -> u64 {
    30_000
}

fn default_step_up_ms() -> u64 {
    500
}

fn default_step_down_ms() -> u64 {
    100
}

fn default_ceiling_ms() -> u64 {
    5_000
}

fn default_block_threshold() -> u64 {
    50
}

fn default_shutdown_grace_secs() -> u64 {
    20
}

fn default_debug_dir() -> String {
    ".".to_string()
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            search_url: default_search_url(),
            proxy: None,
            request_timeout_secs: default_request_timeout_secs(),
            connect_timeout_secs: default_connect_timeout_secs(),
            max_attempts: default_max_attempts(),
            base_backoff_ms: default_base_backoff_ms(),
            max_backoff_ms: default_max_backoff_ms(),
        }
    }
}

impl Default for ThrottleConfig {
    fn default() -> Self {
        Self {
            step_up_ms: default_step_up_ms(),
            step_down_ms: default_step_down_ms(),
            ceiling_ms: default_ceiling_ms(),
            block_threshold: default_block_threshold(),
            shutdown_grace_secs: default_shutdown_grace_secs(),
        }
    }
}

impl AreaConfig {
    /// Resolves the configured area, or `None` if no single mode is set
    pub fn target(&self) -> Option<AreaTarget> {
        match (self.country.as_deref(), self.lat, self.lng, self.radius_km) {
            (Some(country), None, None, None) => Some(AreaTarget::Country {
                country: country.trim().to_uppercase(),
                region: self
                    .region
                    .as_deref()
                    .map(str::trim)
                    .filter(|r| !r.is_empty())
                    .map(str::to_string),
            }),
            (None, Some(lat), Some(lng), Some(radius_km)) => {
                Some(AreaTarget::Radius { lat, lng, radius_km })
            }
            _ => None,
        }
    }
}

impl Config {
    /// Builds the immutable session parameters
    ///
    /// Call on a validated config; an unresolvable area falls back to a
    /// zero-radius search that plans no sectors.
    pub fn to_search_params(&self) -> SearchParams {
        let area = self.area.target().unwrap_or(AreaTarget::Radius {
            lat: 0.0,
            lng: 0.0,
            radius_km: 0.0,
        });

        let queries = self
            .search
            .queries
            .iter()
            .map(|q| q.trim().to_string())
            .filter(|q| !q.is_empty())
            .collect();

        let mut params = SearchParams::new(queries, area, &self.output.database_path);
        if let Some(zoom) = self.search.zoom {
            params.zoom = zoom;
        }
        params.concurrency = self.search.concurrency;
        params.max_pages = self.search.max_pages;
        params.min_rating = self.search.min_rating;
        params.max_rating = self.search.max_rating;
        params.lang = self.search.lang.clone();
        params.debug = self.search.debug;
        params.debug_dir = PathBuf::from(&self.output.debug_dir);
        params.proxy = self.client.proxy.clone().filter(|p| !p.trim().is_empty());

        params.client = ClientTuning {
            search_url: self.client.search_url.clone(),
            request_timeout: Duration::from_secs(self.client.request_timeout_secs),
            connect_timeout: Duration::from_secs(self.client.connect_timeout_secs),
            retry: RetryPolicy {
                max_attempts: self.client.max_attempts,
                base_backoff: Duration::from_millis(self.client.base_backoff_ms),
                max_backoff: Duration::from_millis(self.client.max_backoff_ms),
                ..RetryPolicy::default()
            },
        };

        params.throttle = ThrottlePolicy {
            step_up: Duration::from_millis(self.throttle.step_up_ms),
            step_down: Duration::from_millis(self.throttle.step_down_ms),
            ceiling: Duration::from_millis(self.throttle.ceiling_ms),
            block_threshold: self.throttle.block_threshold,
        };
        params.shutdown_grace = Duration::from_secs(self.throttle.shutdown_grace_secs);

        params
    }
}
