//! Country boundary index
//!
//! Boundaries come from an embedded GeoJSON feature collection of the world's
//! countries at Natural Earth 1:110m resolution. Features carry the properties
//! `NAME`, `ADMIN`, `NAME_ES`, `ISO_A2` and `ISO_A3`. Every name and code
//! variant is indexed lower-cased, so lookups are case-insensitive.

use crate::area::AreaError;
use crate::model::Bounds;
use geo::{BoundingRect, Geometry, MultiPolygon};
use geojson::{Feature, FeatureCollection};
use std::collections::HashMap;
use std::path::Path;
use std::sync::OnceLock;

/// Embedded reference geometry
const EMBEDDED_COUNTRIES: &str = include_str!("../../assets/countries.geojson");

/// Placeholder Natural Earth uses for missing ISO codes
const MISSING_CODE: &str = "-99";

/// Display information for one country
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CountryEntry {
    /// Canonical English name
    pub name: String,
    pub name_es: String,
    pub iso2: String,
    pub iso3: String,
}

#[derive(Debug)]
struct Country {
    entry: CountryEntry,
    polygon: MultiPolygon<f64>,
}

/// Read-only index of country polygons
#[derive(Debug)]
pub struct BoundaryStore {
    countries: Vec<Country>,
    index: HashMap<String, usize>,
}

impl BoundaryStore {
    /// Builds the index from the embedded dataset
    pub fn load() -> Result<Self, AreaError> {
        Self::from_geojson(EMBEDDED_COUNTRIES)
    }

    /// Returns the process-wide index, building it on first use
    pub fn global() -> Result<&'static BoundaryStore, AreaError> {
        static STORE: OnceLock<Result<BoundaryStore, String>> = OnceLock::new();

        STORE
            .get_or_init(|| Self::load().map_err(|e| e.to_string()))
            .as_ref()
            .map_err(|msg| AreaError::Boundaries(msg.clone()))
    }

    /// Builds the index from a GeoJSON file on disk
    pub fn from_path(path: &Path) -> Result<Self, AreaError> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| AreaError::Boundaries(format!("{}: {}", path.display(), e)))?;
        Self::from_geojson(&content)
    }

    /// Builds the index from GeoJSON text
    ///
    /// Features without a `NAME` property or without polygonal geometry are
    /// skipped.
    pub fn from_geojson(content: &str) -> Result<Self, AreaError> {
        let collection: FeatureCollection = content
            .parse()
            .map_err(|e: geojson::Error| AreaError::Boundaries(e.to_string()))?;

        let mut countries = Vec::new();
        let mut index = HashMap::new();
        let mut admin_aliases = Vec::new();

        for feature in collection.features {
            let Some(entry) = country_entry(&feature) else {
                continue;
            };
            let admin = string_property(&feature, "ADMIN").map(str::to_lowercase);

            let Some(polygon) = feature_polygon(feature) else {
                tracing::debug!("Skipping {}: geometry is not polygonal", entry.name);
                continue;
            };

            let id = countries.len();
            for key in [&entry.name, &entry.name_es, &entry.iso2, &entry.iso3] {
                if !key.is_empty() && key != MISSING_CODE {
                    index.insert(key.to_lowercase(), id);
                }
            }
            if let Some(admin) = admin {
                admin_aliases.push((admin, id));
            }
            countries.push(Country { entry, polygon });
        }

        // ADMIN names never shadow a canonical name or code
        for (admin, id) in admin_aliases {
            index.entry(admin).or_insert(id);
        }

        if countries.is_empty() {
            return Err(AreaError::Boundaries(
                "boundary dataset contains no countries".to_string(),
            ));
        }

        tracing::debug!(
            "Loaded {} country boundaries ({} lookup keys)",
            countries.len(),
            index.len()
        );

        Ok(Self { countries, index })
    }

    fn lookup(&self, input: &str) -> Option<&Country> {
        self.index
            .get(&input.trim().to_lowercase())
            .map(|&id| &self.countries[id])
    }

    /// Resolves any name or code variant to the canonical country name
    pub fn validate_country(&self, input: &str) -> Option<&str> {
        self.lookup(input).map(|c| c.entry.name.as_str())
    }

    /// Returns the country polygon, promoting single polygons
    pub fn country_polygon(&self, country: &str) -> Result<MultiPolygon<f64>, AreaError> {
        self.lookup(country)
            .map(|c| c.polygon.clone())
            .ok_or_else(|| AreaError::NotFound(country.to_string()))
    }

    /// Returns the envelope of the country polygon
    pub fn country_bounds(&self, country: &str) -> Result<Bounds, AreaError> {
        let found = self
            .lookup(country)
            .ok_or_else(|| AreaError::NotFound(country.to_string()))?;

        let rect = found
            .polygon
            .bounding_rect()
            .ok_or_else(|| AreaError::NotFound(country.to_string()))?;

        Ok(Bounds::new(rect.min().y, rect.min().x, rect.max().y, rect.max().x))
    }

    /// Canonical names of all known countries, sorted
    pub fn list_countries(&self) -> Vec<String> {
        self.list_country_entries()
            .into_iter()
            .map(|e| e.name)
            .collect()
    }

    /// All country entries sorted by canonical name
    pub fn list_country_entries(&self) -> Vec<CountryEntry> {
        let mut entries: Vec<CountryEntry> =
            self.countries.iter().map(|c| c.entry.clone()).collect();
        entries.sort_by(|a, b| a.name.cmp(&b.name));
        entries.dedup_by(|a, b| a.name == b.name);
        entries
    }

    pub fn len(&self) -> usize {
        self.countries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.countries.is_empty()
    }
}

fn string_property<'a>(feature: &'a Feature, key: &str) -> Option<&'a str> {
    feature
        .property(key)
        .and_then(|v| v.as_str())
        .map(str::trim)
        .filter(|s| !s.is_empty())
}

fn country_entry(feature: &Feature) -> Option<CountryEntry> {
    let name = string_property(feature, "NAME")?;
    let field = |key: &str| string_property(feature, key).unwrap_or_default().to_string();

    Some(CountryEntry {
        name: name.to_string(),
        name_es: field("NAME_ES"),
        iso2: field("ISO_A2"),
        iso3: field("ISO_A3"),
    })
}

fn feature_polygon(feature: Feature) -> Option<MultiPolygon<f64>> {
    let geometry = Geometry::<f64>::try_from(feature.geometry?).ok()?;

    match geometry {
        Geometry::MultiPolygon(mp) => Some(mp),
        Geometry::Polygon(p) => Some(MultiPolygon::new(vec![p])),
        _ => None,
    }
}
