//! Point-in-polygon and rating filters
//!
//! The polygon test is used twice per country crawl: once to drop ocean
//! sectors before the crawl, and once per page to drop businesses the backend
//! returned from across a border.

use crate::model::{Business, Sector};
use geo::{Contains, MultiPolygon, Point};

/// Keeps sectors whose center lies inside the polygon
///
/// Order is preserved.
pub fn filter_to_land(sectors: Vec<Sector>, polygon: &MultiPolygon<f64>) -> Vec<Sector> {
    sectors
        .into_iter()
        .filter(|s| polygon.contains(&Point::new(s.lng, s.lat)))
        .collect()
}

/// Keeps businesses located inside the polygon
///
/// Businesses without coordinates are dropped.
pub fn filter_by_polygon(businesses: Vec<Business>, polygon: &MultiPolygon<f64>) -> Vec<Business> {
    businesses
        .into_iter()
        .filter(|b| b.has_coordinates() && polygon.contains(&Point::new(b.lng, b.lat)))
        .collect()
}

/// Keeps businesses whose rating lies within the given bounds
///
/// A `None` or zero bound is treated as unset.
pub fn filter_by_rating(
    businesses: Vec<Business>,
    min_rating: Option<f64>,
    max_rating: Option<f64>,
) -> Vec<Business> {
    let min = min_rating.filter(|r| *r > 0.0);
    let max = max_rating.filter(|r| *r > 0.0);

    if min.is_none() && max.is_none() {
        return businesses;
    }

    businesses
        .into_iter()
        .filter(|b| min.map_or(true, |m| b.rating >= m))
        .filter(|b| max.map_or(true, |m| b.rating <= m))
        .collect()
}
