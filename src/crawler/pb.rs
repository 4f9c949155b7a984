//! Map-search `pb` parameter encoding
//!
//! The backend expects viewport and paging state as a `!`-delimited,
//! protobuf-like string. Only the camera (altitude, center) and paging fields
//! vary; the rest of the template is fixed.

use std::f64::consts::PI;

/// Simulated viewport width in pixels
pub const VIEWPORT_WIDTH: u32 = 1024;

/// Simulated viewport height in pixels
pub const VIEWPORT_HEIGHT: u32 = 768;

/// Results requested per page
pub const PAGE_SIZE: u32 = 20;

/// Earth radius in meters used by the camera altitude formula
const EARTH_RADIUS_M: f64 = 6_371_010.0;

/// Camera altitude in meters for a zoom level at a given latitude
///
/// `alt = 2π·R·viewport_height·cos(lat) / (512·2^zoom)`
pub fn altitude(lat: f64, zoom: u8) -> f64 {
    let lat_rad = lat * PI / 180.0;
    (2.0 * PI * EARTH_RADIUS_M * f64::from(VIEWPORT_HEIGHT) * lat_rad.cos())
        / (512.0 * 2f64.powi(i32::from(zoom)))
}

/// Builds the `pb` parameter for one page of results around a point
pub fn build_pb(lat: f64, lng: f64, zoom: u8, offset: u32) -> String {
    let alt = altitude(lat, zoom);
    format!(
        "!4m12!1m3!1d{alt:.4}!2d{lng:.7}!3d{lat:.7}!2m3!1f0!2f0!3f0!3m2!1i{w}!2i{h}!4f13.1\
         !7i{page}!8i{offset}!10b1\
         !12m22!1m3!18b1!30b1!34e1!2m3!5m1!6e2!20e3!4b0!10b1!12b1!13b1!16b1!17m1!3e1!20m3!5e2!6b1!14b1!46m1!1b0!96b1\
         !19m4!2m3!1i360!2i120!4i8",
        alt = alt,
        lng = lng,
        lat = lat,
        w = VIEWPORT_WIDTH,
        h = VIEWPORT_HEIGHT,
        page = PAGE_SIZE,
        offset = offset,
    )
}
