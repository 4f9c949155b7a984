/// Sector and bounding box definitions
///
/// Sectors are produced by the grid generator and consumed read-only by the
/// orchestrator and the search client.
use std::fmt;

/// A grid cell to search
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sector {
    /// Center latitude in degrees
    pub lat: f64,

    /// Center longitude in degrees
    pub lng: f64,

    /// Angular span (latitude degrees) covered by this sector
    pub span: f64,

    /// Row index, counted from the southern edge of the grid
    pub row: u32,

    /// Column index, counted from the western edge of the row
    pub col: u32,
}

impl fmt::Display for Sector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},{}", self.row, self.col)
    }
}

/// An axis-aligned latitude/longitude box
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bounds {
    pub min_lat: f64,
    pub min_lng: f64,
    pub max_lat: f64,
    pub max_lng: f64,
}

impl Bounds {
    pub fn new(min_lat: f64, min_lng: f64, max_lat: f64, max_lng: f64) -> Self {
        Self {
            min_lat,
            min_lng,
            max_lat,
            max_lng,
        }
    }

    /// Limits the box to valid latitudes and longitudes
    pub fn clamped(&self) -> Self {
        Self {
            min_lat: self.min_lat.clamp(-90.0, 90.0),
            min_lng: self.min_lng.clamp(-180.0, 180.0),
            max_lat: self.max_lat.clamp(-90.0, 90.0),
            max_lng: self.max_lng.clamp(-180.0, 180.0),
        }
    }

    /// Returns true if the box encloses no area
    pub fn is_degenerate(&self) -> bool {
        self.max_lat <= self.min_lat || self.max_lng <= self.min_lng
    }

    /// Returns true if the point lies inside the box (edges included)
    pub fn contains(&self, lat: f64, lng: f64) -> bool {
        lat >= self.min_lat && lat <= self.max_lat && lng >= self.min_lng && lng <= self.max_lng
    }
}

impl fmt::Display for Bounds {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{:.2}, {:.2}] - [{:.2}, {:.2}]",
            self.min_lat, self.min_lng, self.max_lat, self.max_lng
        )
    }
}
