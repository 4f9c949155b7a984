//! Live crawl statistics
//!
//! Workers bump the counters; the progress reporter and the caller read them
//! without locking. `StatsSnapshot` is a plain copy for display.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

/// Shared crawl counters
#[derive(Debug, Default)]
pub struct CrawlStats {
    total_jobs: AtomicU64,
    jobs_done: AtomicU64,
    businesses_found: AtomicU64,
    businesses_stored: AtomicU64,
    errors: AtomicU64,
    rate_limits: AtomicU64,
}

/// Point-in-time copy of the counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StatsSnapshot {
    pub total_jobs: u64,
    pub jobs_done: u64,

    /// Businesses parsed, before filtering
    pub businesses_found: u64,

    /// Rows actually inserted, after filtering and deduplication
    pub businesses_stored: u64,

    /// Failed jobs and failed storage writes (rate-limited jobs included)
    pub errors: u64,

    pub rate_limits: u64,
}

impl CrawlStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_total_jobs(&self, total: u64) {
        self.total_jobs.store(total, Ordering::Relaxed);
    }

    pub fn record_job_done(&self) {
        self.jobs_done.fetch_add(1, Ordering::Relaxed);
    }

    pub fn add_found(&self, n: u64) {
        self.businesses_found.fetch_add(n, Ordering::Relaxed);
    }

    pub fn add_stored(&self, n: u64) {
        self.businesses_stored.fetch_add(n, Ordering::Relaxed);
    }

    pub fn record_error(&self) {
        self.errors.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_rate_limit(&self) {
        self.rate_limits.fetch_add(1, Ordering::Relaxed);
    }

    pub fn total_jobs(&self) -> u64 {
        self.total_jobs.load(Ordering::Relaxed)
    }

    pub fn jobs_done(&self) -> u64 {
        self.jobs_done.load(Ordering::Relaxed)
    }

    pub fn businesses_found(&self) -> u64 {
        self.businesses_found.load(Ordering::Relaxed)
    }

    pub fn businesses_stored(&self) -> u64 {
        self.businesses_stored.load(Ordering::Relaxed)
    }

    pub fn errors(&self) -> u64 {
        self.errors.load(Ordering::Relaxed)
    }

    pub fn rate_limits(&self) -> u64 {
        self.rate_limits.load(Ordering::Relaxed)
    }

    /// Copies all counters
    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            total_jobs: self.total_jobs(),
            jobs_done: self.jobs_done(),
            businesses_found: self.businesses_found(),
            businesses_stored: self.businesses_stored(),
            errors: self.errors(),
            rate_limits: self.rate_limits(),
        }
    }
}

impl StatsSnapshot {
    /// Share of jobs finished, in percent
    pub fn percent_done(&self) -> f64 {
        if self.total_jobs == 0 {
            return 100.0;
        }
        100.0 * self.jobs_done as f64 / self.total_jobs as f64
    }

    /// One-line progress display, e.g. for a terminal status line
    pub fn progress_line(&self, elapsed: Duration) -> String {
        let mut line = format!(
            "[{}/{} sectors] {} businesses | {} stored | {} errors",
            self.jobs_done,
            self.total_jobs,
            self.businesses_found,
            self.businesses_stored,
            self.errors
        );
        if self.rate_limits > 0 {
            line.push_str(&format!(" | {} rate-limited", self.rate_limits));
        }
        line.push_str(&format!(" | {}", format_elapsed(elapsed)));
        line
    }
}

impl fmt::Display for StatsSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "sectors={}/{} found={} stored={} errors={} rate_limits={}",
            self.jobs_done,
            self.total_jobs,
            self.businesses_found,
            self.businesses_stored,
            self.errors,
            self.rate_limits
        )
    }
}

/// Formats a duration truncated to whole seconds, e.g. `1h2m3s`
pub fn format_elapsed(elapsed: Duration) -> String {
    let secs = elapsed.as_secs();
    let (h, m, s) = (secs / 3600, (secs % 3600) / 60, secs % 60);

    if h > 0 {
        format!("{}h{}m{}s", h, m, s)
    } else if m > 0 {
        format!("{}m{}s", m, s)
    } else {
        format!("{}s", s)
    }
}

/// Session details shown in the final summary
#[derive(Debug, Clone, Default)]
pub struct SummaryInfo {
    pub queries: Vec<String>,

    /// Country name or radius description
    pub area: String,

    /// Rows in the database after the crawl (all sessions)
    pub total_in_db: Option<u64>,

    pub database: String,
    pub elapsed: Duration,
}

/// Renders the final summary block
pub fn render_summary(stats: &StatsSnapshot, info: &SummaryInfo) -> String {
    let rule = "═".repeat(30);
    let mut out = String::new();

    out.push_str(&format!("{}\n", rule));
    out.push_str("  Crawl Complete\n");
    out.push_str(&format!("{}\n", rule));
    out.push_str(&format!("  Query:      {}\n", info.queries.join(", ")));
    out.push_str(&format!("  Area:       {}\n", info.area));
    out.push_str(&format!("  Sectors:    {}\n", stats.total_jobs));
    out.push_str(&format!("  Found:      {}\n", stats.businesses_found));
    match info.total_in_db {
        Some(total) => out.push_str(&format!(
            "  Stored:     {} new, {} total (unique)\n",
            stats.businesses_stored, total
        )),
        None => out.push_str(&format!("  Stored:     {} (unique)\n", stats.businesses_stored)),
    }
    out.push_str(&format!("  Errors:     {}\n", stats.errors));
    if stats.rate_limits > 0 {
        out.push_str(&format!("  Rate limits: {}\n", stats.rate_limits));
    }
    out.push_str(&format!("  Duration:   {}\n", format_elapsed(info.elapsed)));
    out.push_str(&format!("  Database:   {}\n", info.database));
    out.push_str(&format!("{}\n", rule));
    out
}

/// Prints the final summary to stderr
pub fn print_summary(stats: &StatsSnapshot, info: &SummaryInfo) {
    eprintln!();
    eprint!("{}", render_summary(stats, info));
}
