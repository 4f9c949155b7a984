//! Region geocoding
//!
//! Sub-country regions are resolved to a bounding box through an OSM
//! Nominatim-compatible search endpoint. The lookup is never retried here;
//! callers decide what to do with a failure.

use crate::area::AreaError;
use crate::model::Bounds;
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;

/// Public Nominatim search endpoint
pub const NOMINATIM_URL: &str = "https://nominatim.openstreetmap.org/search";

const GEOCODER_USER_AGENT: &str = concat!(
    "geosweep/",
    env!("CARGO_PKG_VERSION"),
    " (geographic data scanner)"
);

#[derive(Debug, Deserialize)]
struct Place {
    /// `[min_lat, max_lat, min_lng, max_lng]` as strings
    #[serde(default)]
    boundingbox: Vec<String>,

    #[serde(default)]
    display_name: String,
}

/// Geocoding client for region lookups
#[derive(Debug, Clone)]
pub struct Geocoder {
    client: Client,
    endpoint: String,
}

impl Geocoder {
    /// Creates a geocoder using the public Nominatim endpoint
    pub fn new() -> Result<Self, AreaError> {
        Self::with_endpoint(NOMINATIM_URL)
    }

    /// Creates a geocoder against a custom endpoint
    pub fn with_endpoint(endpoint: impl Into<String>) -> Result<Self, AreaError> {
        let client = Client::builder()
            .user_agent(GEOCODER_USER_AGENT)
            .timeout(Duration::from_secs(10))
            .build()?;

        Ok(Self {
            client,
            endpoint: endpoint.into(),
        })
    }

    /// Resolves a region (optionally qualified by country) to its bounding box
    ///
    /// # Returns
    ///
    /// * `Ok(Bounds)` - The first match's bounding box
    /// * `Err(AreaError::NotFound)` - The geocoder had no match
    /// * `Err(AreaError::Geocoding)` - Bad status or malformed response
    pub async fn region_bounds(
        &self,
        region: &str,
        country: Option<&str>,
    ) -> Result<Bounds, AreaError> {
        let query = match country {
            Some(c) if !c.is_empty() => format!("{}, {}", region, c),
            _ => region.to_string(),
        };

        tracing::debug!("Geocoding region {:?}", query);

        let response = self
            .client
            .get(&self.endpoint)
            .query(&[("q", query.as_str()), ("format", "json"), ("limit", "1")])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(AreaError::Geocoding(format!(
                "geocoder returned status {}",
                status.as_u16()
            )));
        }

        let places: Vec<Place> = response
            .json()
            .await
            .map_err(|e| AreaError::Geocoding(format!("decoding response: {}", e)))?;

        let place = places
            .into_iter()
            .next()
            .ok_or_else(|| AreaError::NotFound(query.clone()))?;

        let bounds = parse_bounding_box(&place.boundingbox).ok_or_else(|| {
            AreaError::Geocoding(format!("invalid bounding box for {:?}", query))
        })?;

        tracing::info!("Region {:?} resolved to {} {}", query, place.display_name, bounds);
        Ok(bounds)
    }
}

fn parse_bounding_box(raw: &[String]) -> Option<Bounds> {
    let values = raw
        .iter()
        .take(4)
        .map(|v| v.trim().parse::<f64>().ok())
        .collect::<Option<Vec<f64>>>()?;

    match values.as_slice() {
        [min_lat, max_lat, min_lng, max_lng] => {
            Some(Bounds::new(*min_lat, *min_lng, *max_lat, *max_lng))
        }
        _ => None,
    }
}
