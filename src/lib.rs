//! geosweep: a geo-aware map search crawler
//!
//! This crate turns a country, region, or radius into a grid of search sectors,
//! queries a map search backend for every sector and search term, and stores
//! deduplicated business records in SQLite while adapting to rate limiting.

pub mod area;
pub mod config;
pub mod crawler;
pub mod logging;
pub mod model;
pub mod output;
pub mod storage;

use thiserror::Error;

/// Main error type for geosweep operations
#[derive(Debug, Error)]
pub enum SweepError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Area error: {0}")]
    Area(#[from] area::AreaError),

    #[error("Storage error: {0}")]
    Storage(#[from] storage::StorageError),

    #[error("Fetch error: {0}")]
    Fetch(#[from] crawler::FetchError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("No sectors to search: the area produced an empty grid")]
    NoSectors,

    #[error("Crawl cancelled")]
    Cancelled,

    #[error("Persistent rate limiting: {consecutive_rate_limits} consecutive rate-limited requests")]
    PersistentBlock { consecutive_rate_limits: u64 },
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),
}

/// Result type alias for geosweep operations
pub type Result<T> = std::result::Result<T, SweepError>;

// Re-export commonly used types
pub use area::{plan_sectors, BoundaryStore, Geocoder, SectorPlan};
pub use config::Config;
pub use crawler::{run, CrawlReport, RunOptions, Termination};
pub use model::{AreaTarget, Business, SearchParams, Sector};
pub use output::{CrawlStats, StatsSnapshot};
pub use storage::{SqliteStorage, Storage};
