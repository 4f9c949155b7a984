//! Configuration module for geosweep
//!
//! This module handles loading, parsing, and validating TOML configuration files.
//!
//! # Example
//!
//! ```no_run
//! use geosweep::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("geosweep.toml")).unwrap();
//! let params = config.to_search_params();
//! println!("Crawling {} queries at zoom {}", params.queries.len(), params.zoom);
//! ```

mod parser;
mod types;
mod validation;

// Re-export types
pub use types::{AreaConfig, ClientConfig, Config, OutputConfig, SearchConfig, ThrottleConfig};

// Re-export parser functions
pub use parser::{compute_config_hash, load_config, load_config_with_hash, parse_config};
