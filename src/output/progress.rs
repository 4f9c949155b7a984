//! Progress reporting sidecar
//!
//! Polls `CrawlStats` while a crawl runs: a `\r`-refreshed status line on
//! stderr every 2 seconds (unless suppressed) and a `PROGRESS` log line every
//! 10 seconds.

use crate::output::stats::CrawlStats;
use std::io::Write;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

const STATUS_INTERVAL: Duration = Duration::from_secs(2);
const LOG_INTERVAL: Duration = Duration::from_secs(10);

/// Handle to a running reporter
pub struct ProgressReporter {
    stop: CancellationToken,
    handle: JoinHandle<()>,
    started: Instant,
    stats: Arc<CrawlStats>,
    show_status: bool,
}

impl ProgressReporter {
    /// Starts the reporter task
    pub fn spawn(stats: Arc<CrawlStats>, show_status: bool) -> Self {
        let stop = CancellationToken::new();
        let started = Instant::now();

        let handle = tokio::spawn(report_loop(
            Arc::clone(&stats),
            stop.clone(),
            started,
            show_status,
        ));

        Self {
            stop,
            handle,
            started,
            stats,
            show_status,
        }
    }

    /// Time since the reporter started
    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }

    /// Stops the reporter and prints the final status line
    pub async fn finish(self) {
        self.stop.cancel();
        if let Err(e) = self.handle.await {
            tracing::debug!("Progress reporter ended abnormally: {}", e);
        }

        if self.show_status {
            let line = self.stats.snapshot().progress_line(self.started.elapsed());
            eprintln!("\r{}", line);
        }
    }
}

async fn report_loop(
    stats: Arc<CrawlStats>,
    stop: CancellationToken,
    started: Instant,
    show_status: bool,
) {
    let mut status_tick = tokio::time::interval_at(
        tokio::time::Instant::now() + STATUS_INTERVAL,
        STATUS_INTERVAL,
    );
    let mut log_tick =
        tokio::time::interval_at(tokio::time::Instant::now() + LOG_INTERVAL, LOG_INTERVAL);
    status_tick.set_missed_tick_behavior(MissedTickBehavior::Skip);
    log_tick.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            _ = stop.cancelled() => break,
            _ = status_tick.tick(), if show_status => {
                let line = stats.snapshot().progress_line(started.elapsed());
                let mut stderr = std::io::stderr().lock();
                // Status output is best effort
                let _ = write!(stderr, "\r{}", line);
                let _ = stderr.flush();
            }
            _ = log_tick.tick() => {
                tracing::info!(
                    "PROGRESS {} elapsed={}",
                    stats.snapshot(),
                    crate::output::stats::format_elapsed(started.elapsed())
                );
            }
        }
    }
}
