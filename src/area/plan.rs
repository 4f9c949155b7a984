//! Sector planning
//!
//! Chooses the grid strategy for a session: coordinate searches get a pruned
//! radius grid, country searches get a grid over the country (or geocoded
//! region) envelope with ocean sectors removed.

use crate::area::{filter_to_land, generate_grid, generate_radius_grid, BoundaryStore, Geocoder};
use crate::model::{AreaTarget, Bounds, SearchParams, Sector};
use crate::{Result, SweepError};
use geo::MultiPolygon;

/// Sectors to crawl plus the polygon used to filter results
#[derive(Debug, Clone)]
pub struct SectorPlan {
    /// Sectors in crawl order
    pub sectors: Vec<Sector>,

    /// Country polygon for country searches, `None` for radius searches
    pub polygon: Option<MultiPolygon<f64>>,

    /// Box the grid was generated over
    pub bounds: Bounds,

    /// Number of grid sectors before land filtering
    pub candidates: usize,
}

impl SectorPlan {
    /// Share of candidate sectors removed by the land filter, in percent
    pub fn ocean_percent(&self) -> f64 {
        if self.candidates == 0 {
            return 0.0;
        }
        let removed = self.candidates - self.sectors.len();
        100.0 * removed as f64 / self.candidates as f64
    }
}

/// Builds the sector plan for a session
///
/// # Arguments
///
/// * `params` - Session parameters
/// * `boundaries` - Country boundary index
/// * `geocoder` - Used only when a region is set
///
/// # Returns
///
/// * `Ok(SectorPlan)` - At least one sector to crawl
/// * `Err(SweepError::Area)` - Unknown country or failed region lookup
/// * `Err(SweepError::NoSectors)` - The area produced an empty grid
pub async fn plan_sectors(
    params: &SearchParams,
    boundaries: &BoundaryStore,
    geocoder: &Geocoder,
) -> Result<SectorPlan> {
    let plan = match &params.area {
        AreaTarget::Radius {
            lat,
            lng,
            radius_km,
        } => {
            tracing::info!(
                "Coordinate search around ({:.4}, {:.4}), radius {:.1} km",
                lat,
                lng,
                radius_km
            );
            let sectors = generate_radius_grid(*lat, *lng, *radius_km, params.zoom);
            tracing::info!("Grid: {} sectors within radius", sectors.len());

            SectorPlan {
                candidates: sectors.len(),
                sectors,
                polygon: None,
                bounds: crate::area::radius_bounds(*lat, *lng, *radius_km),
            }
        }

        AreaTarget::Country { country, region } => {
            tracing::info!("Country search ({})", country);

            let bounds = match region.as_deref().map(str::trim) {
                Some(region) if !region.is_empty() => {
                    tracing::info!("Region: {}", region);
                    geocoder.region_bounds(region, Some(country.as_str())).await?
                }
                _ => boundaries.country_bounds(country)?,
            };
            tracing::info!("Bounds: {}", bounds);

            let grid = generate_grid(&bounds, params.zoom);
            let candidates = grid.len();
            tracing::info!("Grid: {} total sectors", candidates);

            let polygon = boundaries.country_polygon(country)?;
            let sectors = filter_to_land(grid, &polygon);

            let plan = SectorPlan {
                sectors,
                polygon: Some(polygon),
                bounds,
                candidates,
            };
            tracing::info!(
                "Land filter: {} land sectors ({:.1}% ocean removed)",
                plan.sectors.len(),
                plan.ocean_percent()
            );
            plan
        }
    };

    if plan.sectors.is_empty() {
        return Err(SweepError::NoSectors);
    }

    Ok(plan)
}
