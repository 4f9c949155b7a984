//! Output module for crawl statistics and reporting
//!
//! This module handles:
//! - Shared atomic counters updated by crawl workers
//! - The periodic progress line and log sidecar
//! - The end-of-session summary

mod progress;
pub mod stats;

pub use progress::ProgressReporter;
pub use stats::{
    format_elapsed, print_summary, render_summary, CrawlStats, StatsSnapshot, SummaryInfo,
};
