//! Sector grid generation
//!
//! Sizes derive from the zoom level: a 256px map tile at zoom `z` spans
//! `360 / 2^z` degrees, and one sector covers a 60px window of it.

use crate::model::{Bounds, Sector};

/// Mean Earth radius used for haversine distances
const EARTH_RADIUS_KM: f64 = 6371.0;

/// Approximate length of one degree of latitude
const KM_PER_DEGREE: f64 = 111.0;

/// Converts a zoom level to the angular span of one sector in degrees
pub fn span_degrees(zoom: u8) -> f64 {
    let tile_span = 360.0 / 2f64.powi(i32::from(zoom));
    tile_span * 60.0 / 256.0
}

/// Tiles a bounding box with sectors
///
/// Rows advance south to north; within a row, columns advance west to east.
/// The longitude step of each row is widened by `1/cos(lat)` so that sectors
/// cover roughly the same ground at every latitude.
///
/// The box is first clamped to valid coordinates. A box with zero area
/// yields no sectors.
pub fn generate_grid(bounds: &Bounds, zoom: u8) -> Vec<Sector> {
    let bounds = bounds.clamped();
    if bounds.is_degenerate() {
        return Vec::new();
    }

    let span = span_degrees(zoom);
    let mut sectors = Vec::new();

    let mut row = 0;
    let mut lat = bounds.min_lat + span / 2.0;
    while lat < bounds.max_lat {
        let cos_lat = lat.to_radians().cos();
        // No longitude extent left at the pole
        if cos_lat <= f64::EPSILON {
            break;
        }
        let lng_span = span / cos_lat;
        let mut col = 0;
        let mut lng = bounds.min_lng + lng_span / 2.0;
        while lng < bounds.max_lng {
            sectors.push(Sector {
                lat,
                lng,
                span,
                row,
                col,
            });
            col += 1;
            lng += lng_span;
        }
        row += 1;
        lat += span;
    }

    sectors
}

/// Builds a grid around a center point and keeps sectors within `radius_km`
///
/// The candidate box comes from an equirectangular approximation; sectors in
/// its corners are then pruned by great-circle distance.
pub fn generate_radius_grid(center_lat: f64, center_lng: f64, radius_km: f64, zoom: u8) -> Vec<Sector> {
    let bounds = radius_bounds(center_lat, center_lng, radius_km);

    generate_grid(&bounds, zoom)
        .into_iter()
        .filter(|s| haversine_km(center_lat, center_lng, s.lat, s.lng) <= radius_km)
        .collect()
}

/// Bounding box enclosing a circle of `radius_km` around a point
///
/// Clamped to valid coordinates, so circles reaching past a pole or the
/// antimeridian are cut off there.
pub fn radius_bounds(center_lat: f64, center_lng: f64, radius_km: f64) -> Bounds {
    let lat_deg = radius_km / KM_PER_DEGREE;
    let lng_deg = radius_km / (KM_PER_DEGREE * center_lat.to_radians().cos());

    Bounds::new(
        center_lat - lat_deg,
        center_lng - lng_deg,
        center_lat + lat_deg,
        center_lng + lng_deg,
    )
    .clamped()
}

/// Great-circle distance between two points in kilometers
pub fn haversine_km(lat1: f64, lng1: f64, lat2: f64, lng2: f64) -> f64 {
    let d_lat = (lat2 - lat1).to_radians();
    let d_lng = (lng2 - lng1).to_radians();

    let a = (d_lat / 2.0).sin().powi(2)
        + lat1.to_radians().cos() * lat2.to_radians().cos() * (d_lng / 2.0).sin().powi(2);
    let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());

    EARTH_RADIUS_KM * c
}
