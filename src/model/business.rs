use serde::{Deserialize, Serialize};

/// A business record recovered from one search result entry
///
/// Every field is optional in the upstream payload; absent text fields are
/// empty strings and absent numbers are zero.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Business {
    pub name: String,
    pub rating: f64,
    pub review_count: i64,
    /// Primary category
    pub category: String,
    /// All categories joined with ", "
    pub categories: String,
    pub address: String,
    pub price_range: String,
    pub lat: f64,
    pub lng: f64,
    /// Backend-assigned content identifier
    pub cid: String,
    pub phone: String,
    pub website: String,
    /// Canonical map URL built from the place identifier
    pub map_url: String,
    pub description: String,
    pub place_id: String,
    /// Opening hours, serialized as JSON
    pub open_hours: String,
    pub thumbnail: String,
    pub city: String,
    pub postal_code: String,
    pub country_code: String,
    /// The search term that produced this record
    pub query: String,
}

impl Business {
    /// Returns true if the record carries usable coordinates
    pub fn has_coordinates(&self) -> bool {
        !(self.lat == 0.0 && self.lng == 0.0)
    }
}
