//! Geographic planning
//!
//! This module turns a session's area target into the list of sectors to crawl:
//! - Country boundary lookups and polygons
//! - Region geocoding
//! - Grid generation and radius pruning
//! - Land filtering against country polygons

pub mod boundaries;
pub mod filter;
pub mod geocoder;
pub mod grid;
pub mod plan;

pub use boundaries::{BoundaryStore, CountryEntry};
pub use filter::{filter_by_polygon, filter_by_rating, filter_to_land};
pub use geocoder::Geocoder;
pub use grid::{generate_grid, generate_radius_grid, haversine_km, radius_bounds, span_degrees};
pub use plan::{plan_sectors, SectorPlan};

use thiserror::Error;

/// Errors raised while resolving an area
#[derive(Debug, Error)]
pub enum AreaError {
    #[error("Country or region not found: {0}")]
    NotFound(String),

    #[error("Boundary data error: {0}")]
    Boundaries(String),

    #[error("Geocoding failed: {0}")]
    Geocoding(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}
