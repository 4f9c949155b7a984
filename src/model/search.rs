//! Session parameters
//!
//! `SearchParams` is constructed once (usually from a TOML config) before the
//! crawl starts and is never mutated afterwards.

use crate::crawler::{RetryPolicy, ThrottlePolicy};
use std::path::PathBuf;
use std::time::Duration;

/// Default endpoint for map searches
pub const DEFAULT_SEARCH_URL: &str = "https://www.google.com/search";

/// Zoom used when a coordinate search does not set one
pub const DEFAULT_RADIUS_ZOOM: u8 = 13;

/// Zoom used when a country search does not set one
pub const DEFAULT_COUNTRY_ZOOM: u8 = 10;

/// What area a session covers
#[derive(Debug, Clone, PartialEq)]
pub enum AreaTarget {
    /// A whole country, or a region inside it resolved by geocoding
    Country {
        country: String,
        region: Option<String>,
    },

    /// A circle around a coordinate
    Radius { lat: f64, lng: f64, radius_km: f64 },
}

impl AreaTarget {
    /// Zoom level to use when none is configured
    pub fn default_zoom(&self) -> u8 {
        match self {
            Self::Country { .. } => DEFAULT_COUNTRY_ZOOM,
            Self::Radius { .. } => DEFAULT_RADIUS_ZOOM,
        }
    }
}

/// Transport-level settings for the search client
#[derive(Debug, Clone)]
pub struct ClientTuning {
    /// Search endpoint (overridable so tests can point at a mock server)
    pub search_url: String,

    /// Total timeout of one request
    pub request_timeout: Duration,

    /// Timeout for establishing a connection
    pub connect_timeout: Duration,

    /// Retry policy applied to rate-limit signals
    pub retry: RetryPolicy,
}

impl Default for ClientTuning {
    fn default() -> Self {
        Self {
            search_url: DEFAULT_SEARCH_URL.to_string(),
            request_timeout: Duration::from_secs(15),
            connect_timeout: Duration::from_secs(10),
            retry: RetryPolicy::default(),
        }
    }
}

/// Immutable configuration snapshot for one crawl session
#[derive(Debug, Clone)]
pub struct SearchParams {
    /// Search terms; every term is crawled over every sector
    pub queries: Vec<String>,

    /// Area to cover
    pub area: AreaTarget,

    /// Zoom level (10-16), controls sector size and simulated altitude
    pub zoom: u8,

    /// Maximum number of jobs in flight
    pub concurrency: usize,

    /// Maximum pagination rounds per job
    pub max_pages: u32,

    /// Discard businesses rated below this
    pub min_rating: Option<f64>,

    /// Discard businesses rated above this
    pub max_rating: Option<f64>,

    /// Interface language sent to the backend
    pub lang: String,

    /// Optional forward proxy (HTTP or SOCKS5 URL)
    pub proxy: Option<String>,

    /// Dump raw payloads to `debug_dir`
    pub debug: bool,

    /// Directory for debug payload dumps
    pub debug_dir: PathBuf,

    /// SQLite database destination
    pub db_path: PathBuf,

    /// Client transport settings
    pub client: ClientTuning,

    /// Adaptive delay and persistent-block settings
    pub throttle: ThrottlePolicy,

    /// How long in-flight jobs may run after cancellation
    pub shutdown_grace: Duration,
}

impl SearchParams {
    /// Creates parameters with default tuning for the given queries and area
    pub fn new(queries: Vec<String>, area: AreaTarget, db_path: impl Into<PathBuf>) -> Self {
        let zoom = area.default_zoom();
        Self {
            queries,
            area,
            zoom,
            concurrency: 10,
            max_pages: 1,
            min_rating: None,
            max_rating: None,
            lang: "en".to_string(),
            proxy: None,
            debug: false,
            debug_dir: PathBuf::from("."),
            db_path: db_path.into(),
            client: ClientTuning::default(),
            throttle: ThrottlePolicy::default(),
            shutdown_grace: Duration::from_secs(20),
        }
    }

    /// Returns true for radius (coordinate) searches
    pub fn is_coordinate_mode(&self) -> bool {
        matches!(self.area, AreaTarget::Radius { .. })
    }

    /// Returns true if a rating bound is set
    pub fn has_rating_filter(&self) -> bool {
        self.min_rating.is_some() || self.max_rating.is_some()
    }
}
