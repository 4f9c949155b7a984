//! Crawler module for map search fetching and processing
//!
//! This module contains the core crawling logic, including:
//! - Request payload encoding and the fingerprinted HTTP client
//! - Retry and adaptive throttle policies
//! - Positional response parsing
//! - Overall crawl coordination

mod client;
mod coordinator;
mod parser;
mod pb;
mod retry;
mod throttle;
mod tls;

pub use client::{is_rate_limit_status, FetchError, SearchClient};
pub use coordinator::{run, BatchObserver, CrawlReport, RunOptions, Termination};
pub use parser::{parse_map_response, value_at};
pub use pb::{altitude, build_pb, PAGE_SIZE};
pub use retry::{RetryDecision, RetryPolicy};
pub use throttle::{Throttle, ThrottlePolicy};
pub use tls::{browser_crypto_provider, browser_tls_config};
