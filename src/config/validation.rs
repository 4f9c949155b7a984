use crate::config::types::{
    AreaConfig, ClientConfig, Config, OutputConfig, SearchConfig, ThrottleConfig,
};
use crate::ConfigError;
use url::Url;

const MIN_ZOOM: u8 = 10;
const MAX_ZOOM: u8 = 16;
const MAX_CONCURRENCY: usize = 100;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_search_config(&config.search)?;
    validate_area_config(&config.area)?;
    validate_client_config(&config.client)?;
    validate_throttle_config(&config.throttle)?;
    validate_output_config(&config.output)?;
    Ok(())
}

/// Validates search configuration
fn validate_search_config(config: &SearchConfig) -> Result<(), ConfigError> {
    if config.queries.iter().all(|q| q.trim().is_empty()) {
        return Err(ConfigError::Validation(
            "at least one non-empty query is required".to_string(),
        ));
    }

    if let Some(zoom) = config.zoom {
        if !(MIN_ZOOM..=MAX_ZOOM).contains(&zoom) {
            return Err(ConfigError::Validation(format!(
                "zoom must be between {} and {}, got {}",
                MIN_ZOOM, MAX_ZOOM, zoom
            )));
        }
    }

    if config.concurrency < 1 || config.concurrency > MAX_CONCURRENCY {
        return Err(ConfigError::Validation(format!(
            "concurrency must be between 1 and {}, got {}",
            MAX_CONCURRENCY, config.concurrency
        )));
    }

    if config.max_pages < 1 {
        return Err(ConfigError::Validation(format!(
            "max_pages must be >= 1, got {}",
            config.max_pages
        )));
    }

    validate_rating("min_rating", config.min_rating)?;
    validate_rating("max_rating", config.max_rating)?;

    if let (Some(min), Some(max)) = (config.min_rating, config.max_rating) {
        if min > 0.0 && max > 0.0 && min > max {
            return Err(ConfigError::Validation(format!(
                "min_rating ({}) cannot exceed max_rating ({})",
                min, max
            )));
        }
    }

    if config.lang.trim().is_empty() {
        return Err(ConfigError::Validation("lang cannot be empty".to_string()));
    }

    Ok(())
}

fn validate_rating(name: &str, rating: Option<f64>) -> Result<(), ConfigError> {
    match rating {
        Some(r) if !(0.0..=5.0).contains(&r) => Err(ConfigError::Validation(format!(
            "{} must be between 0 and 5, got {}",
            name, r
        ))),
        _ => Ok(()),
    }
}

/// Validates area configuration: exactly one of country or coordinates
fn validate_area_config(config: &AreaConfig) -> Result<(), ConfigError> {
    let has_country = config
        .country
        .as_deref()
        .is_some_and(|c| !c.trim().is_empty());
    let has_coords = config.lat.is_some() || config.lng.is_some() || config.radius_km.is_some();

    match (has_country, has_coords) {
        (true, true) => {
            return Err(ConfigError::Validation(
                "area must set either country or lat/lng/radius-km, not both".to_string(),
            ))
        }
        (false, false) => {
            return Err(ConfigError::Validation(
                "area must set either country or lat/lng/radius-km".to_string(),
            ))
        }
        _ => {}
    }

    if has_country {
        if config.country.as_deref().map(|c| c.trim().len()) != Some(2) {
            return Err(ConfigError::Validation(format!(
                "country must be a two-letter ISO code, got '{}'",
                config.country.as_deref().unwrap_or_default()
            )));
        }
        return Ok(());
    }

    if config.region.is_some() {
        return Err(ConfigError::Validation(
            "region requires country".to_string(),
        ));
    }

    let (Some(lat), Some(lng), Some(radius_km)) = (config.lat, config.lng, config.radius_km)
    else {
        return Err(ConfigError::Validation(
            "coordinate search requires lat, lng and radius-km".to_string(),
        ));
    };

    if !(-90.0..=90.0).contains(&lat) {
        return Err(ConfigError::Validation(format!(
            "lat must be between -90 and 90, got {}",
            lat
        )));
    }

    if !(-180.0..=180.0).contains(&lng) {
        return Err(ConfigError::Validation(format!(
            "lng must be between -180 and 180, got {}",
            lng
        )));
    }

    if radius_km <= 0.0 || !radius_km.is_finite() {
        return Err(ConfigError::Validation(format!(
            "radius_km must be > 0, got {}",
            radius_km
        )));
    }

    Ok(())
}

/// Validates client configuration
fn validate_client_config(config: &ClientConfig) -> Result<(), ConfigError> {
    Url::parse(&config.search_url)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid search_url: {}", e)))?;

    if let Some(proxy) = config.proxy.as_deref().filter(|p| !p.trim().is_empty()) {
        Url::parse(proxy)
            .map_err(|e| ConfigError::InvalidUrl(format!("Invalid proxy '{}': {}", proxy, e)))?;
    }

    if config.max_attempts < 1 {
        return Err(ConfigError::Validation(format!(
            "max_attempts must be >= 1, got {}",
            config.max_attempts
        )));
    }

    if config.request_timeout_secs == 0 {
        return Err(ConfigError::Validation(
            "request_timeout_secs must be > 0".to_string(),
        ));
    }

    if config.base_backoff_ms > config.max_backoff_ms {
        return Err(ConfigError::Validation(format!(
            "base_backoff_ms ({}) cannot exceed max_backoff_ms ({})",
            config.base_backoff_ms, config.max_backoff_ms
        )));
    }

    Ok(())
}

/// Validates throttle configuration
fn validate_throttle_config(config: &ThrottleConfig) -> Result<(), ConfigError> {
    if config.ceiling_ms < config.step_up_ms {
        return Err(ConfigError::Validation(format!(
            "ceiling_ms ({}) must be >= step_up_ms ({})",
            config.ceiling_ms, config.step_up_ms
        )));
    }

    if config.block_threshold < 1 {
        return Err(ConfigError::Validation(
            "block_threshold must be >= 1".to_string(),
        ));
    }

    Ok(())
}

/// Validates output configuration
fn validate_output_config(config: &OutputConfig) -> Result<(), ConfigError> {
    if config.database_path.trim().is_empty() {
        return Err(ConfigError::Validation(
            "database_path cannot be empty".to_string(),
        ));
    }

    Ok(())
}
