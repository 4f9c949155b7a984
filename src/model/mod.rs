//! Data model shared by the crawl engine
//!
//! This module defines the value types that flow between components:
//! - `Sector`: one grid cell to search
//! - `Business`: one scraped record
//! - `SearchParams`: the immutable configuration snapshot of a session

mod business;
mod search;
mod sector;

pub use business::Business;
pub use search::{
    AreaTarget, ClientTuning, SearchParams, DEFAULT_COUNTRY_ZOOM, DEFAULT_RADIUS_ZOOM,
    DEFAULT_SEARCH_URL,
};
pub use sector::{Bounds, Sector};
